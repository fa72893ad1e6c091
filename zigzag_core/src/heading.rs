//! Agent headings and grid directions.
//!
//! Headings are numbered clockwise from north (0 = North, 3 = West). The
//! same numbering indexes a cell's neighbor array and appears as the
//! `<orientation>` column of the output trace.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One of the four grid directions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Heading {
    North,
    East,
    South,
    West,
}

impl Heading {
    /// All headings in index order.
    pub const ALL: [Heading; 4] = [Heading::North, Heading::East, Heading::South, Heading::West];

    /// Index 0-3, clockwise from north.
    pub fn index(self) -> usize {
        match self {
            Heading::North => 0,
            Heading::East => 1,
            Heading::South => 2,
            Heading::West => 3,
        }
    }

    /// Heading for an index, taken modulo 4.
    pub fn from_index(index: usize) -> Self {
        Self::ALL[index % 4]
    }

    /// (h + 1) mod 4
    pub fn clockwise(self) -> Self {
        Self::from_index(self.index() + 1)
    }

    /// (h + 3) mod 4, which keeps the arithmetic non-negative.
    pub fn counter_clockwise(self) -> Self {
        Self::from_index(self.index() + 3)
    }

    pub fn opposite(self) -> Self {
        Self::from_index(self.index() + 2)
    }

    /// The heading `quarter_turns` clockwise steps from this one.
    pub fn turned(self, quarter_turns: usize) -> Self {
        Self::from_index(self.index() + quarter_turns)
    }

    /// Grid offset `(dx, dy)` with y growing downwards.
    pub fn offset(self) -> (i64, i64) {
        match self {
            Heading::North => (0, -1),
            Heading::East => (1, 0),
            Heading::South => (0, 1),
            Heading::West => (-1, 0),
        }
    }

    /// Upper-case name used in the controller narrative.
    pub fn label(self) -> &'static str {
        match self {
            Heading::North => "NORTH",
            Heading::East => "EAST",
            Heading::South => "SOUTH",
            Heading::West => "WEST",
        }
    }
}

impl fmt::Display for Heading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}
