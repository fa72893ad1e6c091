//! The maze graph: cells in an arena, linked by neighbor ids.
//!
//! A `Maze` is built exactly once per run by `MazeBuilder` and never mutated
//! afterwards; the controller holds it behind an `Arc`. Callers only get the
//! start cell. The goal is found by walking, never by coordinate lookup.

use crate::error::MazeError;
use crate::heading::Heading;
use crate::layout::{Coord, GridFormat, MazeGrid, MazeLayout, WallMask};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use tracing::warn;
use zigzag_env::RunContext;

/// Index of a cell slot inside its maze (row-major).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellId(pub usize);

/// A maze node with up to four neighbors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    coord: Coord,

    /// Indexed by `Heading::index()`; `None` is a wall
    neighbors: [Option<CellId>; 4],

    is_goal: bool,
}

impl Cell {
    fn new(coord: Coord) -> Self {
        Self {
            coord,
            neighbors: [None; 4],
            is_goal: false,
        }
    }

    pub fn coord(&self) -> Coord {
        self.coord
    }

    pub fn neighbor(&self, heading: Heading) -> Option<CellId> {
        self.neighbors[heading.index()]
    }

    pub fn is_goal(&self) -> bool {
        self.is_goal
    }

    /// Wall mask describing this cell's links.
    pub fn wall_mask(&self) -> WallMask {
        Heading::ALL.iter().fold(WallMask::CLOSED, |mask, &h| {
            if self.neighbor(h).is_some() {
                mask.without_wall(h)
            } else {
                mask
            }
        })
    }
}

/// Immutable, fully linked maze.
#[derive(Debug, Clone)]
pub struct Maze {
    rows: usize,
    cols: usize,
    slots: Vec<Option<Cell>>,
    start: CellId,
    format: GridFormat,
}

impl Maze {
    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Encoding of the layout this maze was built from.
    pub fn format(&self) -> GridFormat {
        self.format
    }

    pub fn start(&self) -> CellId {
        self.start
    }

    pub fn cell(&self, id: CellId) -> Option<&Cell> {
        self.slots.get(id.0).and_then(Option::as_ref)
    }

    /// Neighbor of `id` in `heading`, if linked.
    pub fn neighbor(&self, id: CellId, heading: Heading) -> Option<CellId> {
        self.cell(id).and_then(|cell| cell.neighbor(heading))
    }

    /// Present cells in row-major order.
    pub fn cells(&self) -> impl Iterator<Item = &Cell> {
        self.slots.iter().flatten()
    }

    pub fn open_cells(&self) -> usize {
        self.cells().count()
    }

    /// True if some cell was marked goal.
    pub fn has_goal(&self) -> bool {
        self.cells().any(Cell::is_goal)
    }

    /// Number of cells reachable from the start by following links.
    pub fn reachable_from_start(&self) -> usize {
        let mut seen = vec![false; self.slots.len()];
        let mut queue = VecDeque::from([self.start]);
        seen[self.start.0] = true;
        let mut count = 0;

        while let Some(id) = queue.pop_front() {
            count += 1;
            for heading in Heading::ALL {
                if let Some(next) = self.neighbor(id, heading) {
                    if !seen[next.0] {
                        seen[next.0] = true;
                        queue.push_back(next);
                    }
                }
            }
        }
        count
    }

    /// Re-encodes every slot as a wall mask (absent slots are fully walled).
    pub fn to_layout_walls(&self) -> Vec<WallMask> {
        self.slots
            .iter()
            .map(|slot| slot.as_ref().map_or(WallMask::CLOSED, Cell::wall_mask))
            .collect()
    }
}

/// Builds a `Maze` from a layout.
///
/// Linking happens before the goal is marked, and nothing can relink a cell
/// once `build` has returned.
#[derive(Debug)]
pub struct MazeBuilder {
    rows: usize,
    cols: usize,
    slots: Vec<Option<Cell>>,
    format: GridFormat,
}

impl MazeBuilder {
    /// Builds, links and goal-marks a maze for the run behind `ctx`.
    pub fn from_layout(layout: &MazeLayout, ctx: &RunContext) -> Result<Maze, MazeError> {
        let actual = match &layout.grid {
            MazeGrid::Presence(cells) => cells.len(),
            MazeGrid::Walls(masks) => masks.len(),
        };
        if layout.rows.checked_mul(layout.cols) != Some(actual) {
            return Err(MazeError::Generation(format!(
                "grid holds {} cells, expected {}x{}",
                actual, layout.cols, layout.rows
            )));
        }

        let mut builder = Self::with_slots(layout);
        match &layout.grid {
            MazeGrid::Presence(_) => builder.link_adjacent(),
            MazeGrid::Walls(masks) => builder.link_masks(masks),
        }

        check_bounds(layout, layout.goal)?;
        builder.mark_goal(layout.goal, ctx)?;
        builder.build(layout.start)
    }

    fn with_slots(layout: &MazeLayout) -> Self {
        let mut slots = Vec::with_capacity(layout.rows * layout.cols);
        for y in 0..layout.rows {
            for x in 0..layout.cols {
                let coord = Coord::new(x, y);
                slots.push(layout.is_open(coord).then(|| Cell::new(coord)));
            }
        }
        Self {
            rows: layout.rows,
            cols: layout.cols,
            slots,
            format: layout.format(),
        }
    }

    fn index(&self, coord: Coord) -> usize {
        coord.y * self.cols + coord.x
    }

    fn is_present(&self, coord: Coord) -> bool {
        self.slots
            .get(self.index(coord))
            .is_some_and(Option::is_some)
    }

    /// Array form: link present cells that are grid-adjacent.
    fn link_adjacent(&mut self) {
        for i in 0..self.slots.len() {
            let Some(coord) = self.slots[i].as_ref().map(Cell::coord) else {
                continue;
            };
            for heading in Heading::ALL {
                let link = coord
                    .step(heading, self.cols, self.rows)
                    .filter(|next| self.is_present(*next))
                    .map(|next| CellId(self.index(next)));
                if let Some(cell) = self.slots[i].as_mut() {
                    cell.neighbors[heading.index()] = link;
                }
            }
        }
    }

    /// Bitmask form: each cell links wherever its own mask is open.
    fn link_masks(&mut self, masks: &[WallMask]) {
        for (i, mask) in masks.iter().enumerate() {
            let Some(coord) = self.slots[i].as_ref().map(Cell::coord) else {
                continue;
            };
            for heading in Heading::ALL {
                let link = if mask.has_wall(heading) {
                    None
                } else {
                    coord
                        .step(heading, self.cols, self.rows)
                        .map(|next| CellId(self.index(next)))
                };
                if let Some(cell) = self.slots[i].as_mut() {
                    cell.neighbors[heading.index()] = link;
                }
            }
        }
    }

    /// Marks the cell at `coord` as the run's goal.
    ///
    /// Returns `Ok(false)` when the slot is a wall (nothing is marked and the
    /// run's goal slot stays free). Fails with `IllegalAction` once the run
    /// already has a goal.
    pub fn mark_goal(&mut self, coord: Coord, ctx: &RunContext) -> Result<bool, MazeError> {
        if coord.x >= self.cols || coord.y >= self.rows || !self.is_present(coord) {
            warn!(run = %ctx.run_id(), "Goal {} is not an open cell, skipping goal marking", coord);
            return Ok(false);
        }

        ctx.claim_goal()?;
        let index = self.index(coord);
        if let Some(cell) = self.slots[index].as_mut() {
            cell.is_goal = true;
        }
        Ok(true)
    }

    /// Freezes the maze with its start cell.
    pub fn build(self, start: Coord) -> Result<Maze, MazeError> {
        if start.x >= self.cols || start.y >= self.rows {
            return Err(MazeError::OutOfBounds {
                x: start.x as i64,
                y: start.y as i64,
                cols: self.cols,
                rows: self.rows,
            });
        }
        if !self.is_present(start) {
            return Err(MazeError::StartBlocked { x: start.x, y: start.y });
        }

        let start = CellId(self.index(start));
        Ok(Maze {
            rows: self.rows,
            cols: self.cols,
            slots: self.slots,
            start,
            format: self.format,
        })
    }
}

fn check_bounds(layout: &MazeLayout, coord: Coord) -> Result<(), MazeError> {
    if layout.in_bounds(coord.x as i64, coord.y as i64) {
        Ok(())
    } else {
        Err(MazeError::OutOfBounds {
            x: coord.x as i64,
            y: coord.y as i64,
            cols: layout.cols,
            rows: layout.rows,
        })
    }
}
