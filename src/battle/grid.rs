//! Formation grid geometry
//!
//! Each side fields a grid of `columns x 3` slots with row 0 nearest the
//! opponent. Coordinates use battlefield columns: column `x` on the friendly
//! grid faces column `x` on the enemy grid, so a shot "straight ahead" keeps
//! its `x`. Because the grids face each other, the enemy's slot numbering
//! runs mirrored across the columns.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::battle::state::CombatUnit;
use crate::core::types::{GridId, Side};

/// Rows per formation grid
pub const GRID_ROWS: u8 = 3;

/// Position on one side's grid in battlefield columns
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct GridCoord {
    pub x: u8,
    /// Row, 0 = front
    pub y: u8,
}

impl GridCoord {
    pub fn new(x: u8, y: u8) -> Self {
        Self { x, y }
    }

    /// Translate by an offset, returning `None` if it leaves the grid
    pub fn offset(&self, dx: i8, dy: i8, layout: GridLayout) -> Option<GridCoord> {
        let x = self.x as i32 + dx as i32;
        let y = self.y as i32 + dy as i32;
        if layout.in_bounds(x, y) {
            Some(GridCoord::new(x as u8, y as u8))
        } else {
            None
        }
    }
}

/// Grid dimensions shared by both sides of a battle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridLayout {
    pub columns: u8,
}

impl Default for GridLayout {
    fn default() -> Self {
        Self::standard()
    }
}

impl GridLayout {
    /// 5x3 grid
    pub fn standard() -> Self {
        Self { columns: 5 }
    }

    /// 4x3 grid
    pub fn narrow() -> Self {
        Self { columns: 4 }
    }

    pub fn new(columns: u8) -> Self {
        Self {
            columns: columns.max(1),
        }
    }

    pub fn rows(&self) -> u8 {
        GRID_ROWS
    }

    pub fn slot_count(&self) -> u8 {
        self.columns * GRID_ROWS
    }

    pub fn contains(&self, grid_id: GridId) -> bool {
        grid_id < self.slot_count()
    }

    pub fn in_bounds(&self, x: i32, y: i32) -> bool {
        x >= 0 && y >= 0 && x < self.columns as i32 && y < GRID_ROWS as i32
    }

    /// Slot -> coordinate for a side
    pub fn coord(&self, side: Side, grid_id: GridId) -> Option<GridCoord> {
        if !self.contains(grid_id) {
            return None;
        }
        let column = grid_id % self.columns;
        let row = grid_id / self.columns;
        let x = match side {
            Side::Friendly => column,
            Side::Enemy => self.columns - 1 - column,
        };
        Some(GridCoord::new(x, row))
    }

    /// Coordinate -> slot for a side (inverse of `coord`)
    pub fn grid_id(&self, side: Side, coord: GridCoord) -> Option<GridId> {
        if !self.in_bounds(coord.x as i32, coord.y as i32) {
            return None;
        }
        let column = match side {
            Side::Friendly => coord.x,
            Side::Enemy => self.columns - 1 - coord.x,
        };
        Some(coord.y * self.columns + column)
    }

    /// Every coordinate on a grid, front row first
    pub fn all_coords(&self) -> Vec<GridCoord> {
        let mut coords = Vec::with_capacity(self.slot_count() as usize);
        for y in 0..GRID_ROWS {
            for x in 0..self.columns {
                coords.push(GridCoord::new(x, y));
            }
        }
        coords
    }
}

/// Number of collapsed rows in front of a row
pub fn collapsed_rows_in_front(row: u8, collapsed: &BTreeSet<u8>) -> u32 {
    collapsed.range(..row).count() as u32
}

/// Row after collapsed rows in front have closed up
pub fn effective_row(row: u8, collapsed: &BTreeSet<u8>) -> u32 {
    row as u32 - collapsed_rows_in_front(row, collapsed)
}

/// Range between units on opposing grids
///
/// Adjacent front rows are range 1. Every collapsed row in front of either
/// unit shortens the distance by one.
pub fn range_between(
    attacker: GridCoord,
    attacker_collapsed: &BTreeSet<u8>,
    target: GridCoord,
    target_collapsed: &BTreeSet<u8>,
) -> u32 {
    effective_row(attacker.y, attacker_collapsed) + effective_row(target.y, target_collapsed) + 1
}

/// Distance between two units on the same grid
pub fn manhattan_distance(a: GridCoord, b: GridCoord) -> u32 {
    (a.x as i32 - b.x as i32).unsigned_abs() + (a.y as i32 - b.y as i32).unsigned_abs()
}

/// Rows whose occupants are all dead, front to back
fn collapsible_rows(units: &[CombatUnit], rows: u8) -> Vec<u8> {
    (0..rows)
        .filter(|&row| {
            units
                .iter()
                .filter(|u| u.coord.y == row)
                .all(|u| u.is_dead)
        })
        .collect()
}

/// Recompute collapsed rows for one side
///
/// At most `max_new` rows collapse per call, front-most first; rows already
/// collapsed stay collapsed.
pub fn collapse_grid(
    units: &[CombatUnit],
    previous: &BTreeSet<u8>,
    max_new: usize,
) -> BTreeSet<u8> {
    let mut collapsed = previous.clone();
    let newly: Vec<u8> = collapsible_rows(units, GRID_ROWS)
        .into_iter()
        .filter(|row| !previous.contains(row))
        .take(max_new)
        .collect();
    if !newly.is_empty() {
        tracing::debug!("Rows collapsed: {:?}", newly);
    }
    collapsed.extend(newly);
    collapsed
}
