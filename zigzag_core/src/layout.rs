//! Maze descriptions and their plain-text codec.
//!
//! A `MazeLayout` is what generators produce and what `MazeBuilder` consumes.
//! The text form is the grader's input protocol:
//!
//! ```text
//! <rows> <cols>
//! <rows lines: cols space-separated ints | cols hex digits>
//! <startX> <startY>
//! <goalX> <goalY>
//! ```
//!
//! Header and coordinate numbers are whitespace-separated tokens and may be
//! split across lines. Grid rows are one per line. Blank lines are ignored.

use crate::error::MazeError;
use crate::heading::Heading;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use tracing::debug;

/// Grid position: `x` is the column, `y` the row, both from the top-left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
}

impl Coord {
    pub const fn new(x: usize, y: usize) -> Self {
        Self { x, y }
    }

    /// Neighboring position in `heading`, if it stays on a `cols`x`rows` grid.
    pub fn step(self, heading: Heading, cols: usize, rows: usize) -> Option<Coord> {
        let (dx, dy) = heading.offset();
        let x = self.x as i64 + dx;
        let y = self.y as i64 + dy;
        if x < 0 || y < 0 || x >= cols as i64 || y >= rows as i64 {
            None
        } else {
            Some(Coord::new(x as usize, y as usize))
        }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Four wall bits for one cell: bit3 = North, bit2 = East, bit1 = South,
/// bit0 = West. A set bit means a wall (no passage) on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WallMask(u8);

impl WallMask {
    /// No walls at all.
    pub const OPEN: WallMask = WallMask(0);

    /// Walls on every side.
    pub const CLOSED: WallMask = WallMask(0b1111);

    /// Mask from the low four bits of `bits`.
    pub fn new(bits: u8) -> Self {
        Self(bits & 0b1111)
    }

    pub fn bits(self) -> u8 {
        self.0
    }

    fn bit(heading: Heading) -> u8 {
        match heading {
            Heading::North => 0b1000,
            Heading::East => 0b0100,
            Heading::South => 0b0010,
            Heading::West => 0b0001,
        }
    }

    pub fn has_wall(self, heading: Heading) -> bool {
        self.0 & Self::bit(heading) != 0
    }

    pub fn with_wall(self, heading: Heading) -> Self {
        Self(self.0 | Self::bit(heading))
    }

    pub fn without_wall(self, heading: Heading) -> Self {
        Self(self.0 & !Self::bit(heading))
    }

    /// Parses a single hex digit, either case.
    pub fn from_hex_digit(c: char) -> Option<Self> {
        c.to_digit(16).map(|d| Self(d as u8))
    }

    /// Lower-case hex digit.
    pub fn to_hex_digit(self) -> char {
        std::char::from_digit(self.0 as u32, 16).unwrap_or('f')
    }
}

/// Text encoding of the grid rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GridFormat {
    /// Detect from the rows themselves
    #[default]
    Auto,
    /// Space-separated integers, nonzero = open cell
    Array,
    /// One hex wall mask per cell, no separators
    Hex,
}

impl GridFormat {
    pub fn name(&self) -> &'static str {
        match self {
            GridFormat::Auto => "auto",
            GridFormat::Array => "array",
            GridFormat::Hex => "hex",
        }
    }
}

impl fmt::Display for GridFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for GridFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "auto" => Ok(GridFormat::Auto),
            "array" => Ok(GridFormat::Array),
            "hex" => Ok(GridFormat::Hex),
            _ => Err(format!("Unknown grid format: {}", s)),
        }
    }
}

/// Cells of a layout, row-major.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum MazeGrid {
    /// true = open cell, false = wall slot
    Presence(Vec<bool>),
    /// Every position is a cell; the mask says which sides are walled
    Walls(Vec<WallMask>),
}

/// A complete maze description: grid plus start and goal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MazeLayout {
    pub rows: usize,
    pub cols: usize,
    pub start: Coord,
    pub goal: Coord,
    pub grid: MazeGrid,
}

impl MazeLayout {
    /// True if `(x, y)` lies on the grid.
    pub fn in_bounds(&self, x: i64, y: i64) -> bool {
        x >= 0 && y >= 0 && (x as usize) < self.cols && (y as usize) < self.rows
    }

    fn index(&self, coord: Coord) -> usize {
        coord.y * self.cols + coord.x
    }

    /// True if the slot at `coord` holds a cell.
    pub fn is_open(&self, coord: Coord) -> bool {
        if coord.x >= self.cols || coord.y >= self.rows {
            return false;
        }
        match &self.grid {
            MazeGrid::Presence(cells) => cells.get(self.index(coord)).copied().unwrap_or(false),
            MazeGrid::Walls(_) => true,
        }
    }

    /// Wall mask at `coord` (bitmask layouts only).
    pub fn mask(&self, coord: Coord) -> Option<WallMask> {
        match &self.grid {
            MazeGrid::Walls(masks) if coord.x < self.cols && coord.y < self.rows => {
                masks.get(self.index(coord)).copied()
            }
            _ => None,
        }
    }

    pub fn open_count(&self) -> usize {
        match &self.grid {
            MazeGrid::Presence(cells) => cells.iter().filter(|open| **open).count(),
            MazeGrid::Walls(masks) => masks.len(),
        }
    }

    pub fn format(&self) -> GridFormat {
        match self.grid {
            MazeGrid::Presence(_) => GridFormat::Array,
            MazeGrid::Walls(_) => GridFormat::Hex,
        }
    }

    /// Parses input text (already split in lines).
    pub fn parse(lines: &[String], format: GridFormat) -> Result<Self, MazeError> {
        let mut reader = LineReader::new(lines);

        let (header_line, header) = reader.numbers(2, "maze dimensions")?;
        let (rows, cols) = (header[0], header[1]);
        if rows <= 0 || cols <= 0 {
            return Err(MazeError::malformed(
                header_line,
                format!("maze dimensions must be positive, found {} {}", rows, cols),
            ));
        }
        let (rows, cols) = (rows as usize, cols as usize);

        let mut grid_rows = Vec::new();
        for _ in 0..rows {
            grid_rows.push(reader.next_line("grid row")?);
        }
        let grid = parse_grid(&grid_rows, cols, format)?;

        let (_, start) = reader.numbers(2, "start coordinate")?;
        let (_, goal) = reader.numbers(2, "goal coordinate")?;
        if reader.remaining() > 0 {
            debug!("Ignoring {} trailing input line(s)", reader.remaining());
        }

        let mut layout = MazeLayout {
            rows,
            cols,
            start: Coord::new(0, 0),
            goal: Coord::new(0, 0),
            grid,
        };
        layout.start = layout.checked_coord(start[0], start[1])?;
        layout.goal = layout.checked_coord(goal[0], goal[1])?;
        Ok(layout)
    }

    /// Parses a whole input text.
    pub fn parse_str(text: &str, format: GridFormat) -> Result<Self, MazeError> {
        let lines: Vec<String> = text.lines().map(str::to_string).collect();
        Self::parse(&lines, format)
    }

    fn checked_coord(&self, x: i64, y: i64) -> Result<Coord, MazeError> {
        if self.in_bounds(x, y) {
            Ok(Coord::new(x as usize, y as usize))
        } else {
            Err(MazeError::OutOfBounds {
                x,
                y,
                cols: self.cols,
                rows: self.rows,
            })
        }
    }

    /// Renders the layout in the input protocol.
    pub fn to_lines(&self) -> Vec<String> {
        let mut lines = Vec::with_capacity(self.rows + 3);
        lines.push(format!("{} {}", self.rows, self.cols));
        for y in 0..self.rows {
            let row = y * self.cols..(y + 1) * self.cols;
            let line = match &self.grid {
                MazeGrid::Presence(cells) => cells[row]
                    .iter()
                    .map(|open| if *open { "1" } else { "0" })
                    .collect::<Vec<_>>()
                    .join(" "),
                MazeGrid::Walls(masks) => masks[row].iter().map(|m| m.to_hex_digit()).collect(),
            };
            lines.push(line);
        }
        lines.push(format!("{} {}", self.start.x, self.start.y));
        lines.push(format!("{} {}", self.goal.x, self.goal.y));
        lines
    }

    /// `to_lines` joined with trailing newlines.
    pub fn to_text(&self) -> String {
        let mut text = String::new();
        for line in self.to_lines() {
            text.push_str(&line);
            text.push('\n');
        }
        text
    }
}

fn parse_grid(rows: &[(usize, &str)], cols: usize, format: GridFormat) -> Result<MazeGrid, MazeError> {
    let format = match format {
        GridFormat::Auto => detect_format(rows, cols).ok_or_else(|| {
            let line = rows.first().map(|(n, _)| *n).unwrap_or(0);
            MazeError::malformed(
                line,
                format!("grid rows are neither {} integers nor {} hex digits", cols, cols),
            )
        })?,
        forced => forced,
    };

    match format {
        GridFormat::Hex => {
            let mut masks = Vec::new();
            for (line, text) in rows {
                let digits: Vec<char> = text.chars().collect();
                if digits.len() != cols {
                    return Err(MazeError::malformed(
                        *line,
                        format!("expected {} hex digits, found {}", cols, digits.len()),
                    ));
                }
                for c in digits {
                    let mask = WallMask::from_hex_digit(c).ok_or_else(|| {
                        MazeError::malformed(*line, format!("'{}' is not a hex digit", c))
                    })?;
                    masks.push(mask);
                }
            }
            Ok(MazeGrid::Walls(masks))
        }
        _ => {
            let mut cells = Vec::new();
            for (line, text) in rows {
                let tokens: Vec<&str> = text.split_whitespace().collect();
                if tokens.len() != cols {
                    return Err(MazeError::malformed(
                        *line,
                        format!("expected {} cells, found {}", cols, tokens.len()),
                    ));
                }
                for token in tokens {
                    let value = token.parse::<i64>().map_err(|_| {
                        MazeError::malformed(*line, format!("'{}' is not an integer", token))
                    })?;
                    cells.push(value != 0);
                }
            }
            Ok(MazeGrid::Presence(cells))
        }
    }
}

/// Array wins when rows are `cols` integer tokens. A single-column grid is
/// only read as an array when every value is 0 or 1, since one digit rows
/// are also valid hex.
fn detect_format(rows: &[(usize, &str)], cols: usize) -> Option<GridFormat> {
    let is_array = rows.iter().all(|(_, text)| {
        let tokens: Vec<&str> = text.split_whitespace().collect();
        tokens.len() == cols
            && tokens.iter().all(|t| {
                if cols == 1 {
                    *t == "0" || *t == "1"
                } else {
                    t.parse::<i64>().is_ok()
                }
            })
    });
    if is_array {
        return Some(GridFormat::Array);
    }

    let is_hex = rows
        .iter()
        .all(|(_, text)| text.chars().count() == cols && text.chars().all(|c| c.is_ascii_hexdigit()));
    if is_hex {
        Some(GridFormat::Hex)
    } else {
        None
    }
}

/// Non-blank input lines with their 1-based line numbers.
struct LineReader<'a> {
    lines: Vec<(usize, &'a str)>,
    pos: usize,
}

impl<'a> LineReader<'a> {
    fn new(source: &'a [String]) -> Self {
        let lines = source
            .iter()
            .enumerate()
            .map(|(i, line)| (i + 1, line.trim()))
            .filter(|(_, line)| !line.is_empty())
            .collect();
        Self { lines, pos: 0 }
    }

    fn remaining(&self) -> usize {
        self.lines.len() - self.pos
    }

    fn next_line(&mut self, what: &str) -> Result<(usize, &'a str), MazeError> {
        match self.lines.get(self.pos).copied() {
            Some(line) => {
                self.pos += 1;
                Ok(line)
            }
            None => {
                let last = self.lines.last().map(|(n, _)| *n).unwrap_or(0);
                Err(MazeError::malformed(last + 1, format!("missing {}", what)))
            }
        }
    }

    /// Reads `count` integer tokens, consuming whole lines.
    fn numbers(&mut self, count: usize, what: &str) -> Result<(usize, Vec<i64>), MazeError> {
        let mut values = Vec::with_capacity(count);
        let mut last_line = 0;
        while values.len() < count {
            let (line, text) = self.next_line(what)?;
            last_line = line;
            for token in text.split_whitespace() {
                let value = token.parse::<i64>().map_err(|_| {
                    MazeError::malformed(line, format!("{} must be integers, found '{}'", what, token))
                })?;
                values.push(value);
            }
        }
        if values.len() > count {
            return Err(MazeError::malformed(
                last_line,
                format!("expected {} values for {}, found {}", count, what, values.len()),
            ));
        }
        Ok((last_line, values))
    }
}
