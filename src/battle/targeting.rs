//! Target legality, line-of-fire blocking and area tile sets

use serde::{Deserialize, Serialize};

use crate::battle::ability::AbilityInfo;
use crate::battle::grid::{manhattan_distance, range_between, GridCoord, GridLayout};
use crate::battle::state::{BattleView, CombatUnit};
use crate::core::types::{BlockingTier, LineOfFire, UnitKey};
use crate::data::{AreaTile, GameData, TargetArea, TargetSide};

/// Result of a line-of-fire check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LineOfFireCheck {
    pub blocked: bool,
    /// First unit that stopped the shot
    pub blocker: Option<UnitKey>,
}

impl LineOfFireCheck {
    fn clear() -> Self {
        Self {
            blocked: false,
            blocker: None,
        }
    }
}

/// Blocking tier of a unit; unknown units block like `None`
fn blocking_of(data: &GameData, unit: &CombatUnit) -> BlockingTier {
    data.unit(&unit.unit_id)
        .map(|d| d.blocking)
        .unwrap_or_default()
}

/// Check whether a shot reaches `target` through the units in front of it
///
/// Living units of the target's formation in the same column and a nearer
/// row are scanned front to back; the first whose blocking tier meets the
/// shot's threshold stops it. Lower tiers are transparent.
pub fn check_line_of_fire(
    data: &GameData,
    line_of_fire: LineOfFire,
    target: &CombatUnit,
    defenders: &[CombatUnit],
) -> LineOfFireCheck {
    let threshold = match line_of_fire.blocking_threshold() {
        Some(threshold) => threshold,
        None => return LineOfFireCheck::clear(),
    };

    let mut in_front: Vec<&CombatUnit> = defenders
        .iter()
        .filter(|u| u.is_alive() && u.coord.x == target.coord.x && u.coord.y < target.coord.y)
        .collect();
    in_front.sort_by_key(|u| u.coord.y);

    for unit in in_front {
        if blocking_of(data, unit) >= threshold {
            tracing::debug!(
                "{:?} shot at {} blocked by {}",
                line_of_fire,
                target.key(),
                unit.key()
            );
            return LineOfFireCheck {
                blocked: true,
                blocker: Some(unit.key()),
            };
        }
    }
    LineOfFireCheck::clear()
}

/// Tiles covered by a pattern around an anchor, off-grid tiles dropped
pub fn area_tiles(layout: GridLayout, anchor: GridCoord, tiles: &[AreaTile]) -> Vec<(GridCoord, u32)> {
    let mut covered: Vec<(GridCoord, u32)> = Vec::with_capacity(tiles.len());
    for tile in tiles {
        if let Some(coord) = anchor.offset(tile.x, tile.y, layout) {
            if !covered.iter().any(|(c, _)| *c == coord) {
                covered.push((coord, tile.damage_percent));
            }
        }
    }
    covered
}

/// Anchor of a fixed pattern: the caster's column on the opposing front row
pub fn fixed_anchor(caster: &CombatUnit) -> GridCoord {
    GridCoord::new(caster.coord.x, 0)
}

/// Living unit on a tile
pub fn unit_at(units: &[CombatUnit], coord: GridCoord) -> Option<&CombatUnit> {
    units.iter().find(|u| u.is_alive() && u.coord == coord)
}

/// Formation an ability aims at, with that formation's collapsed rows
fn target_pool<'a>(view: &BattleView<'a>, target_side: TargetSide) -> &'a [CombatUnit] {
    match target_side {
        TargetSide::Enemy => view.opponents,
        TargetSide::Friendly => view.allies,
    }
}

fn matches_filter(data: &GameData, info: &AbilityInfo, unit: &CombatUnit) -> bool {
    if info.targets.is_empty() {
        return true;
    }
    match data.unit(&unit.unit_id) {
        Some(def) => data.tags().filter_matches(&info.targets, &def.tags),
        None => false,
    }
}

/// Occupied, filter-matching tiles a random ability can land on
///
/// Listed tiles are absolute positions; an empty list means the whole grid.
pub fn random_candidate_tiles(
    data: &GameData,
    info: &AbilityInfo,
    pool: &[CombatUnit],
    layout: GridLayout,
) -> Vec<(UnitKey, u32)> {
    let tiles: Vec<(GridCoord, u32)> = match &info.target_area {
        TargetArea::Random { tiles } if !tiles.is_empty() => tiles
            .iter()
            .filter(|t| layout.in_bounds(t.x as i32, t.y as i32))
            .map(|t| (GridCoord::new(t.x as u8, t.y as u8), t.damage_percent))
            .collect(),
        _ => layout.all_coords().into_iter().map(|c| (c, 100)).collect(),
    };

    tiles
        .into_iter()
        .filter_map(|(coord, percent)| {
            unit_at(pool, coord)
                .filter(|u| matches_filter(data, info, u))
                .map(|u| (u.key(), percent))
        })
        .collect()
}

/// Preview estimate of shots landing on each candidate tile
pub fn expected_hits_per_tile(total_shots: u32, num_tiles: usize) -> f32 {
    if num_tiles == 0 {
        return 0.0;
    }
    total_shots as f32 / num_tiles as f32
}

/// Distance check between caster and target for an ability
pub fn in_range(info: &AbilityInfo, caster: &CombatUnit, target: &CombatUnit, view: &BattleView<'_>) -> bool {
    let distance = match info.target_side {
        TargetSide::Enemy => range_between(
            caster.coord,
            view.ally_collapsed,
            target.coord,
            view.opponent_collapsed,
        ),
        TargetSide::Friendly => manhattan_distance(caster.coord, target.coord),
    };
    distance >= info.min_range && distance <= info.max_range
}

/// Units hit by a pattern anchored on a tile, with their damage percents
pub fn area_hits(
    data: &GameData,
    info: &AbilityInfo,
    pool: &[CombatUnit],
    layout: GridLayout,
    anchor: GridCoord,
    tiles: &[AreaTile],
) -> Vec<(UnitKey, u32)> {
    area_tiles(layout, anchor, tiles)
        .into_iter()
        .filter_map(|(coord, percent)| {
            unit_at(pool, coord)
                .filter(|u| matches_filter(data, info, u))
                .map(|u| (u.key(), percent))
        })
        .collect()
}

/// Units hit when the ability is used on `target` (ignored for fixed patterns)
///
/// Random abilities have no fixed hit list and return nothing here.
pub fn units_hit(
    data: &GameData,
    caster: &CombatUnit,
    info: &AbilityInfo,
    target: Option<&CombatUnit>,
    view: BattleView<'_>,
) -> Vec<(UnitKey, u32)> {
    let pool = target_pool(&view, info.target_side);
    match &info.target_area {
        TargetArea::Single => target.map(|t| vec![(t.key(), 100)]).unwrap_or_default(),
        TargetArea::Area { tiles, fixed: true } => {
            area_hits(data, info, pool, view.layout, fixed_anchor(caster), tiles)
        }
        TargetArea::Area { tiles, fixed: false } => match target {
            Some(t) => area_hits(data, info, pool, view.layout, t.coord, tiles),
            None => Vec::new(),
        },
        TargetArea::Random { .. } => Vec::new(),
    }
}

/// Legal targets for an ability
///
/// - random abilities: occupants of candidate tiles, range and blocking ignored
/// - fixed patterns: whatever the pattern covers, range and blocking ignored
/// - friendly abilities: allies within Manhattan range (heals skip full-HP units)
/// - otherwise: living opponents in range, unblocked, matching the tag filter
pub fn get_valid_targets<'a>(
    data: &GameData,
    caster: &CombatUnit,
    info: &AbilityInfo,
    view: BattleView<'a>,
) -> Vec<&'a CombatUnit> {
    let pool = target_pool(&view, info.target_side);
    let lookup = |keys: Vec<(UnitKey, u32)>| -> Vec<&'a CombatUnit> {
        let mut found: Vec<&'a CombatUnit> = Vec::new();
        for (key, _) in keys {
            if let Some(unit) = pool.iter().find(|u| u.grid_id == key.grid_id) {
                if !found.iter().any(|f| f.grid_id == unit.grid_id) {
                    found.push(unit);
                }
            }
        }
        found
    };

    match &info.target_area {
        TargetArea::Random { .. } => {
            return lookup(random_candidate_tiles(data, info, pool, view.layout));
        }
        TargetArea::Area { fixed: true, .. } => {
            return lookup(units_hit(data, caster, info, None, view));
        }
        _ => {}
    }

    pool.iter()
        .filter(|t| t.is_alive())
        .filter(|t| matches_filter(data, info, t))
        .filter(|t| in_range(info, caster, t, &view))
        .filter(|t| match info.target_side {
            TargetSide::Enemy => !check_line_of_fire(data, info.line_of_fire, t, pool).blocked,
            TargetSide::Friendly => !info.is_heal() || t.current_hp < t.max_hp,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::battle::state::FormationSlot;
    use crate::core::types::Side;
    use crate::data::{AbilityDef, RankStats, TagHierarchy, UnitDef, WeaponDef};
    use ahash::AHashMap;
    use std::collections::BTreeSet;

    fn unit_def(id: &str, blocking: BlockingTier, tags: &[&str]) -> UnitDef {
        UnitDef {
            id: id.into(),
            blocking,
            tags: tags.iter().map(|t| t.to_string()).collect(),
            ranks: vec![RankStats {
                hp: 10,
                ..Default::default()
            }],
            weapons: vec![WeaponDef {
                name: "Gun".into(),
                abilities: vec!["shot".into()],
                ..Default::default()
            }],
            ..Default::default()
        }
    }

    fn test_data() -> GameData {
        let mut data = GameData::new();
        data.add_unit(unit_def("wall", BlockingTier::Full, &["structure"]));
        data.add_unit(unit_def("crate", BlockingTier::Partial, &["structure"]));
        data.add_unit(unit_def("scout", BlockingTier::None, &["soldier"]));
        data.add_ability(AbilityDef {
            id: "shot".into(),
            min_damage: 5,
            max_damage: 5,
            max_range: 5,
            ..Default::default()
        });
        let mut hierarchy = AHashMap::new();
        hierarchy.insert("ground".to_string(), vec!["soldier".to_string()]);
        data.set_tag_hierarchy(&TagHierarchy { hierarchy });
        data
    }

    fn spawn(data: &GameData, id: &str, side: Side, grid_id: u8) -> CombatUnit {
        CombatUnit::spawn(
            data,
            GridLayout::standard(),
            side,
            &FormationSlot::new(id, grid_id, 1),
        )
        .unwrap()
    }

    fn info_with(data: &GameData, caster: &CombatUnit, f: impl FnOnce(&mut AbilityInfo)) -> AbilityInfo {
        let mut info = AbilityInfo::resolve(data, caster, "shot").unwrap();
        f(&mut info);
        info
    }

    #[test]
    fn test_indirect_never_blocked() {
        let data = test_data();
        let target = spawn(&data, "scout", Side::Enemy, 10);
        let defenders = vec![
            spawn(&data, "wall", Side::Enemy, 0),
            spawn(&data, "wall", Side::Enemy, 5),
            target.clone(),
        ];
        let check = check_line_of_fire(&data, LineOfFire::Indirect, &target, &defenders);
        assert!(!check.blocked);
        assert_eq!(check.blocker, None);
    }

    #[test]
    fn test_contact_blocked_by_blocking_none() {
        // Presence alone stops contact attacks, even a `BlockingTier::None` unit
        let data = test_data();
        let target = spawn(&data, "scout", Side::Enemy, 5);
        let blocker = spawn(&data, "scout", Side::Enemy, 0);
        let defenders = vec![blocker.clone(), target.clone()];
        let check = check_line_of_fire(&data, LineOfFire::Contact, &target, &defenders);
        assert!(check.blocked);
        assert_eq!(check.blocker, Some(blocker.key()));

        let direct = check_line_of_fire(&data, LineOfFire::Direct, &target, &defenders);
        assert!(!direct.blocked);
    }

    #[test]
    fn test_first_meeting_threshold_blocks() {
        let data = test_data();
        let target = spawn(&data, "scout", Side::Enemy, 10);
        let front = spawn(&data, "crate", Side::Enemy, 0);
        let middle = spawn(&data, "wall", Side::Enemy, 5);
        let defenders = vec![middle.clone(), front.clone(), target.clone()];

        let direct = check_line_of_fire(&data, LineOfFire::Direct, &target, &defenders);
        assert_eq!(direct.blocker, Some(front.key()));

        // Precise sees through the crate and stops at the wall
        let precise = check_line_of_fire(&data, LineOfFire::Precise, &target, &defenders);
        assert_eq!(precise.blocker, Some(middle.key()));
    }

    #[test]
    fn test_dead_and_other_column_units_do_not_block() {
        let data = test_data();
        let target = spawn(&data, "scout", Side::Enemy, 5);
        let mut dead = spawn(&data, "wall", Side::Enemy, 0);
        dead.take_damage(100, 0);
        let beside = spawn(&data, "wall", Side::Enemy, 1);
        let defenders = vec![dead, beside, target.clone()];
        assert!(!check_line_of_fire(&data, LineOfFire::Precise, &target, &defenders).blocked);
    }

    #[test]
    fn test_area_tiles_drop_off_grid() {
        let tiles = vec![
            AreaTile::new(0, 0, 100),
            AreaTile::new(-1, 0, 50),
            AreaTile::new(1, 0, 50),
            AreaTile::new(0, -1, 50),
        ];
        let covered = area_tiles(GridLayout::standard(), GridCoord::new(0, 0), &tiles);
        assert_eq!(
            covered,
            vec![(GridCoord::new(0, 0), 100), (GridCoord::new(1, 0), 50)]
        );
    }

    #[test]
    fn test_expected_hits_per_tile() {
        assert_eq!(expected_hits_per_tile(6, 3), 2.0);
        assert_eq!(expected_hits_per_tile(1, 4), 0.25);
        assert_eq!(expected_hits_per_tile(3, 0), 0.0);
    }

    #[test]
    fn test_valid_targets_respect_range_blocking_and_tags() {
        let data = test_data();
        let caster = spawn(&data, "scout", Side::Friendly, 0);
        let opponents = vec![
            spawn(&data, "crate", Side::Enemy, 4),
            spawn(&data, "scout", Side::Enemy, 9),
            spawn(&data, "scout", Side::Enemy, 3),
        ];
        let allies = vec![caster.clone()];
        let none = BTreeSet::new();
        let view = BattleView {
            layout: GridLayout::standard(),
            allies: &allies,
            opponents: &opponents,
            ally_collapsed: &none,
            opponent_collapsed: &none,
        };

        let info = info_with(&data, &caster, |_| {});
        let ids: Vec<u8> = get_valid_targets(&data, &caster, &info, view)
            .iter()
            .map(|u| u.grid_id)
            .collect();
        // Enemy 9 sits behind the crate in battlefield column 0
        assert_eq!(ids, vec![4, 3]);

        let ground_only = info_with(&data, &caster, |i| i.targets = vec!["ground".into()]);
        let ids: Vec<u8> = get_valid_targets(&data, &caster, &ground_only, view)
            .iter()
            .map(|u| u.grid_id)
            .collect();
        assert_eq!(ids, vec![3]);

        let short = info_with(&data, &caster, |i| i.max_range = 0);
        assert!(get_valid_targets(&data, &caster, &short, view).is_empty());
    }

    #[test]
    fn test_fixed_pattern_hits_caster_column() {
        let data = test_data();
        let caster = spawn(&data, "scout", Side::Friendly, 2);
        let opponents = vec![
            spawn(&data, "scout", Side::Enemy, 2),
            spawn(&data, "scout", Side::Enemy, 7),
            spawn(&data, "scout", Side::Enemy, 0),
        ];
        let allies = vec![caster.clone()];
        let none = BTreeSet::new();
        let view = BattleView {
            layout: GridLayout::standard(),
            allies: &allies,
            opponents: &opponents,
            ally_collapsed: &none,
            opponent_collapsed: &none,
        };
        let info = info_with(&data, &caster, |i| {
            i.target_area = TargetArea::Area {
                tiles: vec![AreaTile::new(0, 0, 100), AreaTile::new(0, 1, 50)],
                fixed: true,
            }
        });
        let hits = units_hit(&data, &caster, &info, None, view);
        assert_eq!(
            hits,
            vec![
                (UnitKey::new(Side::Enemy, 2), 100),
                (UnitKey::new(Side::Enemy, 7), 50)
            ]
        );
        assert_eq!(get_valid_targets(&data, &caster, &info, view).len(), 2);
    }

    #[test]
    fn test_random_candidates_only_occupied_tiles() {
        let data = test_data();
        let caster = spawn(&data, "scout", Side::Friendly, 0);
        let mut dead = spawn(&data, "scout", Side::Enemy, 1);
        dead.take_damage(100, 0);
        let opponents = vec![spawn(&data, "scout", Side::Enemy, 0), dead];
        let info = info_with(&data, &caster, |i| {
            i.target_area = TargetArea::Random { tiles: vec![] }
        });
        let candidates = random_candidate_tiles(&data, &info, &opponents, GridLayout::standard());
        assert_eq!(candidates, vec![(UnitKey::new(Side::Enemy, 0), 100)]);
    }
}
