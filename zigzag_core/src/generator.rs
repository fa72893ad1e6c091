//! Maze generation strategies.
//!
//! Every strategy produces a `MazeLayout`; `MazeBuilder` turns it into a
//! linked `Maze`. Random strategies draw from a `ChaCha8Rng` seeded with a
//! 64-bit seed, so a seed always reproduces the same maze.

use crate::error::MazeError;
use crate::heading::Heading;
use crate::layout::{Coord, GridFormat, MazeGrid, MazeLayout, WallMask};
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;
use zigzag_env::MazeChannel;

/// Anything that can produce a maze description.
pub trait MazeGenerator {
    /// Strategy name for logs.
    fn name(&self) -> &'static str;

    fn generate(&mut self) -> Result<MazeLayout, MazeError>;
}

/// Selectable generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MazeStrategy {
    /// Parse the description from the input channel
    #[default]
    External,
    /// Random noise with one smoothing pass
    Noise,
    /// Recursive backtracker on the array form
    Backtracker,
    /// Randomized DFS on a full grid, producing wall masks
    Walls,
}

impl MazeStrategy {
    pub const ALL: [MazeStrategy; 4] = [
        MazeStrategy::External,
        MazeStrategy::Noise,
        MazeStrategy::Backtracker,
        MazeStrategy::Walls,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            MazeStrategy::External => "external",
            MazeStrategy::Noise => "noise",
            MazeStrategy::Backtracker => "backtracker",
            MazeStrategy::Walls => "walls",
        }
    }

    /// True for strategies that do not read the input channel.
    pub fn is_random(&self) -> bool {
        !matches!(self, MazeStrategy::External)
    }

    /// Creates the random generator for this strategy. `None` for `External`,
    /// which needs a channel.
    pub fn random_generator(
        &self,
        rows: usize,
        cols: usize,
        seed: u64,
    ) -> Option<Box<dyn MazeGenerator + Send>> {
        match self {
            MazeStrategy::External => None,
            MazeStrategy::Noise => Some(Box::new(NoiseGenerator::new(rows, cols, seed))),
            MazeStrategy::Backtracker => Some(Box::new(BacktrackerGenerator::new(rows, cols, seed))),
            MazeStrategy::Walls => Some(Box::new(WallCarverGenerator::new(rows, cols, seed))),
        }
    }
}

impl fmt::Display for MazeStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for MazeStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "external" => Ok(MazeStrategy::External),
            "noise" => Ok(MazeStrategy::Noise),
            "backtracker" => Ok(MazeStrategy::Backtracker),
            "walls" => Ok(MazeStrategy::Walls),
            _ => Err(format!("Unknown maze strategy: {}", s)),
        }
    }
}

/// Picks a random open start and a different random open goal.
///
/// The goal is re-rolled until it differs from the start.
fn random_start_goal(rng: &mut ChaCha8Rng, open: &[Coord]) -> Result<(Coord, Coord), MazeError> {
    if open.len() < 2 {
        return Err(MazeError::Generation(format!(
            "need at least two open cells for start and goal, found {}",
            open.len()
        )));
    }
    let start = open[rng.gen_range(0..open.len())];
    loop {
        let goal = open[rng.gen_range(0..open.len())];
        if goal != start {
            return Ok((start, goal));
        }
    }
}

fn open_coords(cells: &[bool], cols: usize) -> Vec<Coord> {
    cells
        .iter()
        .enumerate()
        .filter(|(_, open)| **open)
        .map(|(i, _)| Coord::new(i % cols, i / cols))
        .collect()
}

/// Noise-with-smoothing generator.
///
/// Each cell is open or closed with equal probability; then a single
/// row-major pass opens every closed cell that has a closed 4-neighbor. The
/// pass works in place, so cells opened earlier affect later decisions.
/// The result is loosely connected and may contain isolated regions.
#[derive(Debug)]
pub struct NoiseGenerator {
    rows: usize,
    cols: usize,
    rng: ChaCha8Rng,
}

impl NoiseGenerator {
    pub fn new(rows: usize, cols: usize, seed: u64) -> Self {
        Self {
            rows,
            cols,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    fn has_closed_neighbor(&self, cells: &[bool], coord: Coord) -> bool {
        Heading::ALL.iter().any(|&h| {
            coord
                .step(h, self.cols, self.rows)
                .is_some_and(|n| !cells[n.y * self.cols + n.x])
        })
    }
}

impl MazeGenerator for NoiseGenerator {
    fn name(&self) -> &'static str {
        "noise"
    }

    fn generate(&mut self) -> Result<MazeLayout, MazeError> {
        if self.rows == 0 || self.cols == 0 {
            return Err(MazeError::Generation("maze must have at least one row and column".into()));
        }

        let mut cells: Vec<bool> = (0..self.rows * self.cols)
            .map(|_| self.rng.gen_bool(0.5))
            .collect();

        for y in 0..self.rows {
            for x in 0..self.cols {
                let i = y * self.cols + x;
                if !cells[i] && self.has_closed_neighbor(&cells, Coord::new(x, y)) {
                    cells[i] = true;
                }
            }
        }

        let open = open_coords(&cells, self.cols);
        let (start, goal) = random_start_goal(&mut self.rng, &open)?;
        debug!("Noise maze {}x{}: {} open cells", self.cols, self.rows, open.len());

        Ok(MazeLayout {
            rows: self.rows,
            cols: self.cols,
            start,
            goal,
            grid: MazeGrid::Presence(cells),
        })
    }
}

/// Recursive backtracker on the array form.
///
/// Starts at the interior cell (1, 1) and carves two cells at a time, so
/// open cells sit on the odd lattice plus the walls knocked out between
/// them. The open cells form a spanning tree. Odd dimensions avoid losing
/// the last row or column.
#[derive(Debug)]
pub struct BacktrackerGenerator {
    rows: usize,
    cols: usize,
    rng: ChaCha8Rng,
    carved: usize,
}

impl BacktrackerGenerator {
    pub fn new(rows: usize, cols: usize, seed: u64) -> Self {
        Self {
            rows,
            cols,
            rng: ChaCha8Rng::seed_from_u64(seed),
            carved: 0,
        }
    }

    /// Number of cells carved by the last `generate` call.
    pub fn carve_count(&self) -> usize {
        self.carved
    }

    fn next_target(&mut self, cells: &[bool], x: usize, y: usize) -> Option<(usize, usize)> {
        let mut steps: [(i64, i64); 4] = [(2, 0), (-2, 0), (0, 2), (0, -2)];
        steps.shuffle(&mut self.rng);

        steps.iter().find_map(|(dx, dy)| {
            let nx = x as i64 + dx;
            let ny = y as i64 + dy;
            let inside = nx > 0 && nx < self.cols as i64 - 1 && ny > 0 && ny < self.rows as i64 - 1;
            if inside && !cells[ny as usize * self.cols + nx as usize] {
                Some((nx as usize, ny as usize))
            } else {
                None
            }
        })
    }
}

impl MazeGenerator for BacktrackerGenerator {
    fn name(&self) -> &'static str {
        "backtracker"
    }

    fn generate(&mut self) -> Result<MazeLayout, MazeError> {
        if self.rows < 3 || self.cols < 3 {
            return Err(MazeError::Generation(format!(
                "backtracker needs at least 3x3 cells, got {}x{}",
                self.cols, self.rows
            )));
        }

        let cols = self.cols;
        let mut cells = vec![false; self.rows * cols];
        let origin = Coord::new(1, 1);
        cells[cols + 1] = true;
        self.carved = 1;

        let mut stack = vec![(1usize, 1usize)];
        while let Some(&(x, y)) = stack.last() {
            match self.next_target(&cells, x, y) {
                Some((nx, ny)) => {
                    cells[ny * cols + nx] = true;
                    cells[((y + ny) / 2) * cols + (x + nx) / 2] = true;
                    self.carved += 2;
                    stack.push((nx, ny));
                }
                None => {
                    stack.pop();
                }
            }
        }

        let open: Vec<Coord> = open_coords(&cells, cols)
            .into_iter()
            .filter(|c| *c != origin)
            .collect();
        let goal = open.choose(&mut self.rng).copied().ok_or_else(|| {
            MazeError::Generation("need at least two open cells for start and goal, found 1".into())
        })?;
        debug!("Backtracker maze {}x{}: {} cells carved", self.cols, self.rows, self.carved);

        Ok(MazeLayout {
            rows: self.rows,
            cols,
            start: origin,
            goal,
            grid: MazeGrid::Presence(cells),
        })
    }
}

/// Randomized depth-first carver producing the wall-mask form.
///
/// Every position is a cell and every wall starts up. Knocking a wall down
/// clears it on both sides, so the masks are symmetric and the border stays
/// walled. The result is a perfect maze.
#[derive(Debug)]
pub struct WallCarverGenerator {
    rows: usize,
    cols: usize,
    rng: ChaCha8Rng,
}

impl WallCarverGenerator {
    pub fn new(rows: usize, cols: usize, seed: u64) -> Self {
        Self {
            rows,
            cols,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }
}

impl MazeGenerator for WallCarverGenerator {
    fn name(&self) -> &'static str {
        "walls"
    }

    fn generate(&mut self) -> Result<MazeLayout, MazeError> {
        let (rows, cols) = (self.rows, self.cols);
        if rows * cols < 2 {
            return Err(MazeError::Generation(format!(
                "wall carver needs at least two cells, got {}x{}",
                cols, rows
            )));
        }

        let mut masks = vec![WallMask::CLOSED; rows * cols];
        let mut visited = vec![false; rows * cols];

        let first = self.rng.gen_range(0..rows * cols);
        visited[first] = true;
        let mut stack = vec![Coord::new(first % cols, first / cols)];

        while let Some(current) = stack.pop() {
            let unvisited: Vec<(Heading, Coord)> = [Heading::North, Heading::South, Heading::East, Heading::West]
                .into_iter()
                .filter_map(|h| current.step(h, cols, rows).map(|n| (h, n)))
                .filter(|(_, n)| !visited[n.y * cols + n.x])
                .collect();

            let Some(&(heading, next)) = unvisited.choose(&mut self.rng) else {
                continue;
            };
            stack.push(current);

            let (ci, ni) = (current.y * cols + current.x, next.y * cols + next.x);
            masks[ci] = masks[ci].without_wall(heading);
            masks[ni] = masks[ni].without_wall(heading.opposite());
            visited[ni] = true;
            stack.push(next);
        }

        Ok(MazeLayout {
            rows,
            cols,
            start: Coord::new(0, 0),
            goal: Coord::new(cols - 1, rows - 1),
            grid: MazeGrid::Walls(masks),
        })
    }
}

/// Reads the maze description from an input channel.
pub struct ExternalGenerator<'a> {
    channel: &'a dyn MazeChannel,
    format: GridFormat,
}

impl<'a> ExternalGenerator<'a> {
    pub fn new(channel: &'a dyn MazeChannel, format: GridFormat) -> Self {
        Self { channel, format }
    }
}

impl MazeGenerator for ExternalGenerator<'_> {
    fn name(&self) -> &'static str {
        "external"
    }

    fn generate(&mut self) -> Result<MazeLayout, MazeError> {
        let lines = self.channel.read_lines()?;
        debug!("Read {} line(s) from {}", lines.len(), self.channel.describe());
        MazeLayout::parse(&lines, self.format)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::maze::MazeBuilder;
    use proptest::prelude::*;
    use zigzag_env::{MemoryChannel, RunContext};

    #[test]
    fn test_noise_is_reproducible() {
        let a = NoiseGenerator::new(8, 8, 99).generate().unwrap();
        let b = NoiseGenerator::new(8, 8, 99).generate().unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_noise_start_and_goal_are_open_and_distinct() {
        for seed in 0..20 {
            let layout = NoiseGenerator::new(6, 6, seed).generate().unwrap();
            assert!(layout.is_open(layout.start));
            assert!(layout.is_open(layout.goal));
            assert_ne!(layout.start, layout.goal);
        }
    }

    #[test]
    fn test_noise_leaves_no_adjacent_closed_cells_after_smoothing() {
        let layout = NoiseGenerator::new(10, 10, 5).generate().unwrap();
        for y in 0..10 {
            for x in 0..10 {
                let here = Coord::new(x, y);
                if layout.is_open(here) {
                    continue;
                }
                let closed_pair = Heading::ALL
                    .iter()
                    .filter_map(|&h| here.step(h, 10, 10))
                    .any(|n| !layout.is_open(n));
                assert!(!closed_pair, "closed pair at {} survived smoothing", here);
            }
        }
    }

    #[test]
    fn test_noise_single_cell_fails() {
        let err = NoiseGenerator::new(1, 1, 0).generate().unwrap_err();
        assert!(matches!(err, MazeError::Generation(_)));
    }

    #[test]
    fn test_backtracker_is_connected_spanning_tree() {
        let mut generator = BacktrackerGenerator::new(11, 11, 7);
        let layout = generator.generate().unwrap();
        let maze = MazeBuilder::from_layout(&layout, &RunContext::new(7)).unwrap();

        assert_eq!(layout.start, Coord::new(1, 1));
        assert_eq!(maze.open_cells(), generator.carve_count());
        assert_eq!(maze.reachable_from_start(), maze.open_cells());

        // A tree on n nodes has n - 1 edges
        let edges: usize = maze
            .cells()
            .map(|c| Heading::ALL.iter().filter(|&&h| c.neighbor(h).is_some()).count())
            .sum::<usize>()
            / 2;
        assert_eq!(edges, maze.open_cells() - 1);
    }

    #[test]
    fn test_backtracker_rejects_tiny_grid() {
        assert!(BacktrackerGenerator::new(2, 5, 0).generate().is_err());
        // 3x3 carves only the start cell
        assert!(BacktrackerGenerator::new(3, 3, 0).generate().is_err());
    }

    #[test]
    fn test_wall_carver_walls_border() {
        let layout = WallCarverGenerator::new(5, 7, 3).generate().unwrap();
        assert_eq!(layout.start, Coord::new(0, 0));
        assert_eq!(layout.goal, Coord::new(6, 4));

        for x in 0..7 {
            assert!(layout.mask(Coord::new(x, 0)).unwrap().has_wall(Heading::North));
            assert!(layout.mask(Coord::new(x, 4)).unwrap().has_wall(Heading::South));
        }
        for y in 0..5 {
            assert!(layout.mask(Coord::new(0, y)).unwrap().has_wall(Heading::West));
            assert!(layout.mask(Coord::new(6, y)).unwrap().has_wall(Heading::East));
        }
    }

    #[test]
    fn test_external_reads_channel() {
        let channel = MemoryChannel::new("3 3\n1 1 1\n1 0 1\n1 1 1\n0 0\n2 2\n");
        let layout = ExternalGenerator::new(&channel, GridFormat::Auto).generate().unwrap();
        assert_eq!(layout.open_count(), 8);
        assert_eq!(channel.write_count(), 0);
    }

    #[test]
    fn test_strategy_names() {
        for strategy in MazeStrategy::ALL {
            assert_eq!(strategy.name().parse::<MazeStrategy>().unwrap(), strategy);
        }
        assert!(MazeStrategy::External.random_generator(5, 5, 0).is_none());
        assert!(MazeStrategy::Walls.random_generator(5, 5, 0).is_some());
    }

    proptest! {
        #[test]
        fn test_wall_masks_round_trip(seed in any::<u64>(), rows in 1usize..9, cols in 2usize..9) {
            let layout = WallCarverGenerator::new(rows, cols, seed).generate().unwrap();
            let maze = MazeBuilder::from_layout(&layout, &RunContext::new(seed)).unwrap();

            let MazeGrid::Walls(masks) = &layout.grid else {
                panic!("wall carver must produce masks");
            };
            prop_assert_eq!(&maze.to_layout_walls(), masks);
            prop_assert_eq!(maze.reachable_from_start(), rows * cols);
        }
    }
}
