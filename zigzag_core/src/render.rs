//! ASCII rendering of a maze for debug logs.

use crate::layout::Coord;
use crate::maze::{CellId, Maze};

/// Renders one character per slot, space separated.
///
/// `S` start, `G` goal, `R` robot (takes precedence), `1` open cell, `0`
/// wall slot.
pub fn render_ascii(maze: &Maze, robot: Option<Coord>) -> String {
    let start = maze.cell(maze.start()).map(|cell| cell.coord());
    let mut out = String::new();

    for y in 0..maze.rows() {
        let row: Vec<&str> = (0..maze.cols())
            .map(|x| {
                let coord = Coord::new(x, y);
                match maze.cell(CellId(y * maze.cols() + x)) {
                    _ if robot == Some(coord) => "R",
                    _ if start == Some(coord) => "S",
                    Some(cell) if cell.is_goal() => "G",
                    Some(_) => "1",
                    None => "0",
                }
            })
            .collect();
        out.push_str(&row.join(" "));
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::layout::{GridFormat, MazeLayout};
    use crate::maze::MazeBuilder;
    use zigzag_env::RunContext;

    #[test]
    fn test_render_ring() {
        let layout =
            MazeLayout::parse_str("3 3\n1 1 1\n1 0 1\n1 1 1\n0 0\n2 2\n", GridFormat::Auto).unwrap();
        let maze = MazeBuilder::from_layout(&layout, &RunContext::new(0)).unwrap();

        assert_eq!(render_ascii(&maze, None), "S 1 1\n1 0 1\n1 1 G\n");
        assert_eq!(render_ascii(&maze, Some(Coord::new(2, 0))), "S 1 R\n1 0 1\n1 1 G\n");
    }
}
