// lib.rs - Multi-level grid maze engine
// Generation, reachability analysis and player movement for labyrinth sessions.

pub mod error;
pub mod generator;
pub mod grid;
pub mod maze;
pub mod player;
pub mod reachability;
pub mod tile;
pub mod view;
pub mod visited;

// Re-export commonly used types
pub use error::{MazeError, Result};
pub use generator::{generate_maze, DensitySweep, SweepProgress};
pub use grid::{Coord, Dimensions, Grid, MemorySize, MAX_CELLS};
pub use maze::{Maze, MazeSummary};
pub use player::{Cursor, Direction};
pub use tile::Tile;
pub use view::{Window, WINDOW_RADIUS};
