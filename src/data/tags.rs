//! Tag hierarchy with a precomputed transitive closure
//!
//! A filter tag matches itself and every tag below it, so an ability that
//! targets "ground" also hits a unit tagged only "soldier" when soldier sits
//! under ground. The closure is built once when data is loaded.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};

/// Parent tag -> direct child tags, as written in `tags.toml`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TagHierarchy {
    #[serde(default)]
    pub hierarchy: AHashMap<String, Vec<String>>,
}

/// Expanded lookup: tag -> itself plus all descendants
#[derive(Debug, Clone, Default)]
pub struct TagIndex {
    closure: AHashMap<String, AHashSet<String>>,
}

impl TagHierarchy {
    /// Build the closure table; cycles are tolerated
    pub fn closure(&self) -> TagIndex {
        let mut closure = AHashMap::new();
        for root in self.hierarchy.keys() {
            let mut seen: AHashSet<String> = AHashSet::new();
            let mut stack = vec![root.clone()];
            while let Some(tag) = stack.pop() {
                if !seen.insert(tag.clone()) {
                    continue;
                }
                if let Some(children) = self.hierarchy.get(&tag) {
                    stack.extend(children.iter().cloned());
                }
            }
            closure.insert(root.clone(), seen);
        }
        TagIndex { closure }
    }
}

impl TagIndex {
    /// Does a tag (or anything beneath it) appear in `target_tags`?
    pub fn tag_matches(&self, filter_tag: &str, target_tags: &[String]) -> bool {
        match self.closure.get(filter_tag) {
            Some(expanded) => target_tags.iter().any(|t| expanded.contains(t)),
            None => target_tags.iter().any(|t| t == filter_tag),
        }
    }

    /// Empty filter targets everything
    pub fn filter_matches(&self, filter: &[String], target_tags: &[String]) -> bool {
        filter.is_empty() || filter.iter().any(|f| self.tag_matches(f, target_tags))
    }

    /// Number of tags with an expansion entry
    pub fn len(&self) -> usize {
        self.closure.len()
    }

    pub fn is_empty(&self) -> bool {
        self.closure.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    fn sample_index() -> TagIndex {
        let mut hierarchy = AHashMap::new();
        hierarchy.insert("ground".to_string(), tags(&["soldier", "vehicle"]));
        hierarchy.insert("vehicle".to_string(), tags(&["tank"]));
        TagHierarchy { hierarchy }.closure()
    }

    #[test]
    fn test_direct_child_matches() {
        let index = sample_index();
        assert!(index.tag_matches("ground", &tags(&["soldier"])));
    }

    #[test]
    fn test_transitive_child_matches() {
        let index = sample_index();
        assert!(index.tag_matches("ground", &tags(&["tank"])));
        assert!(!index.tag_matches("vehicle", &tags(&["soldier"])));
    }

    #[test]
    fn test_unknown_filter_matches_literally() {
        let index = sample_index();
        assert!(index.tag_matches("aircraft", &tags(&["aircraft"])));
        assert!(!index.tag_matches("aircraft", &tags(&["tank"])));
    }

    #[test]
    fn test_empty_filter_is_unrestricted() {
        let index = sample_index();
        assert!(index.filter_matches(&[], &tags(&["anything"])));
        assert!(index.filter_matches(&[], &[]));
    }

    #[test]
    fn test_cycle_does_not_hang() {
        let mut hierarchy = AHashMap::new();
        hierarchy.insert("a".to_string(), tags(&["b"]));
        hierarchy.insert("b".to_string(), tags(&["a"]));
        let index = TagHierarchy { hierarchy }.closure();
        assert!(index.tag_matches("a", &tags(&["b"])));
        assert!(index.tag_matches("b", &tags(&["a"])));
        assert_eq!(index.len(), 2);
    }
}
