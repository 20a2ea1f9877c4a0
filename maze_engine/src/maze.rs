// maze.rs - A committed maze: immutable grid, player cursor and target

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, Dimensions, Grid};
use crate::player::{Cursor, Direction};
use crate::reachability::shortest_path;
use crate::view::{render_level, render_window, Window};

/// Serializable description of a generated maze (used by the dump mode).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MazeSummary {
    pub dimensions: Dimensions,
    pub start: Coord,
    pub target: Coord,
    pub distance: usize,
}

#[derive(Debug, Clone)]
pub struct Maze {
    grid: Grid,
    cursor: Cursor,
    start: Coord,
    target: Coord,
    distance: usize,
}

impl Maze {
    pub fn new(grid: Grid, start: Coord, target: Coord, distance: usize) -> Self {
        Self {
            grid,
            cursor: Cursor::new(start),
            start,
            target,
            distance,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn position(&self) -> Coord {
        self.cursor.position()
    }

    pub fn start(&self) -> Coord {
        self.start
    }

    pub fn target(&self) -> Coord {
        self.target
    }

    /// Quality score: BFS distance from start to target.
    pub fn distance(&self) -> usize {
        self.distance
    }

    pub fn step(&mut self, dir: Direction) -> bool {
        self.cursor.step(&self.grid, dir)
    }

    pub fn up(&mut self) -> bool {
        self.cursor.up(&self.grid)
    }

    pub fn down(&mut self) -> bool {
        self.cursor.down(&self.grid)
    }

    pub fn left(&mut self) -> bool {
        self.cursor.left(&self.grid)
    }

    pub fn right(&mut self) -> bool {
        self.cursor.right(&self.grid)
    }

    /// Connector traversal only; reaching the target is checked separately
    /// with [`Maze::on_target`].
    pub fn enter(&mut self) -> bool {
        self.cursor.enter(&self.grid)
    }

    pub fn on_target(&self) -> bool {
        self.cursor.position() == self.target
    }

    pub fn window(&self) -> Window {
        render_window(&self.grid, self.position(), self.target)
    }

    pub fn render_level(&self, d: usize) -> String {
        render_level(&self.grid, d, Some(self.position()), Some(self.target))
    }

    /// Shortest route from the current position to the target.
    pub fn solution(&self) -> Option<Vec<Coord>> {
        shortest_path(&self.grid, self.position(), self.target)
    }

    pub fn summary(&self) -> MazeSummary {
        MazeSummary {
            dimensions: self.grid.dimensions(),
            start: self.start,
            target: self.target,
            distance: self.distance,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tile::Tile;

    #[test]
    fn test_walk_to_target() {
        let mut grid = Grid::new(Dimensions::new(32, 32, 2).unwrap());
        grid.set(Coord::new(2, 0, 0), Tile::StairDown);
        grid.set(Coord::new(2, 0, 1), Tile::StairUp);
        let mut maze = Maze::new(grid, Coord::new(0, 0, 0), Coord::new(3, 0, 1), 4);

        assert!(!maze.enter());
        assert!(maze.right());
        assert!(maze.right());
        assert!(maze.enter());
        assert_eq!(maze.position(), Coord::new(2, 0, 1));
        assert!(!maze.on_target());
        assert!(maze.right());
        assert!(maze.on_target());
        // the target is an Open tile, so ENTER is not a connector move
        assert!(!maze.enter());
    }

    #[test]
    fn test_solution_follows_connectors() {
        let mut grid = Grid::new(Dimensions::new(32, 32, 2).unwrap());
        for x in 0..32 {
            grid.set(Coord::new(x, 1, 0), Tile::Wall);
        }
        grid.set(Coord::new(4, 0, 0), Tile::StairDown);
        grid.set(Coord::new(4, 0, 1), Tile::StairUp);
        let maze = Maze::new(grid, Coord::new(0, 0, 0), Coord::new(4, 1, 1), 6);

        let path = maze.solution().unwrap();
        assert_eq!(path.first(), Some(&Coord::new(0, 0, 0)));
        assert_eq!(path.last(), Some(&Coord::new(4, 1, 1)));
        assert_eq!(path.len(), 7);
        assert_eq!(maze.summary().distance, 6);
    }
}
