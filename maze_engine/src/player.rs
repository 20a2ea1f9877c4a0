// player.rs - Player cursor: single-step movement validated against the grid

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, Grid};
use crate::tile::Tile;

/// In-plane step. `Up`/`Down` move along y (towards row 0 / away from it).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
    Left,
    Right,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::Up,
        Direction::Down,
        Direction::Left,
        Direction::Right,
    ];

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Up => Direction::Down,
            Direction::Down => Direction::Up,
            Direction::Left => Direction::Right,
            Direction::Right => Direction::Left,
        }
    }

    fn delta(self) -> (i64, i64) {
        match self {
            Direction::Up => (0, -1),
            Direction::Down => (0, 1),
            Direction::Left => (-1, 0),
            Direction::Right => (1, 0),
        }
    }

    /// Direction of a single in-plane step from `from` to `to`, if it is one.
    pub fn between(from: Coord, to: Coord) -> Option<Direction> {
        if from.d != to.d {
            return None;
        }
        let dx = to.x as i64 - from.x as i64;
        let dy = to.y as i64 - from.y as i64;
        Direction::ALL.into_iter().find(|dir| dir.delta() == (dx, dy))
    }
}

/// Current player position. Every mutation keeps it on a non-wall tile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cursor {
    position: Coord,
}

impl Cursor {
    pub fn new(position: Coord) -> Self {
        Self { position }
    }

    pub fn position(&self) -> Coord {
        self.position
    }

    /// Moves one step; `false` and no mutation if the destination is outside
    /// the grid or a wall.
    pub fn step(&mut self, grid: &Grid, dir: Direction) -> bool {
        let (dx, dy) = dir.delta();
        let x = self.position.x as i64 + dx;
        let y = self.position.y as i64 + dy;
        let d = self.position.d as i64;
        if !grid.in_bounds(x, y, d) {
            return false;
        }

        let next = Coord::new(x as usize, y as usize, self.position.d);
        if grid.get(next).is_wall() {
            return false;
        }
        self.position = next;
        true
    }

    pub fn up(&mut self, grid: &Grid) -> bool {
        self.step(grid, Direction::Up)
    }

    pub fn down(&mut self, grid: &Grid) -> bool {
        self.step(grid, Direction::Down)
    }

    pub fn left(&mut self, grid: &Grid) -> bool {
        self.step(grid, Direction::Left)
    }

    pub fn right(&mut self, grid: &Grid) -> bool {
        self.step(grid, Direction::Right)
    }

    /// Takes the connector under the cursor: StairDown goes to `d + 1`,
    /// StairUp to `d - 1`. Any other tile refuses.
    pub fn enter(&mut self, grid: &Grid) -> bool {
        match grid.get(self.position) {
            Tile::StairDown if self.position.d + 1 < grid.depth() => {
                self.position.d += 1;
                true
            }
            Tile::StairUp if self.position.d > 0 => {
                self.position.d -= 1;
                true
            }
            _ => false,
        }
    }
}
