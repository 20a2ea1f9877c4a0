// tile.rs - Tile type stored once per grid cell
use serde::{Deserialize, Serialize};
use static_assertions::assert_eq_size;

/// Semantic tile type. One byte per cell keeps the memory requirement of a
/// grid equal to its cell count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u8)]
pub enum Tile {
    #[default]
    Open = 0,
    Wall = 1,
    /// Connector to the same planar coordinate on level `d + 1`.
    StairDown = 2,
    /// Connector to the same planar coordinate on level `d - 1`.
    StairUp = 3,
}

assert_eq_size!(Tile, u8);

impl Tile {
    #[inline]
    pub fn is_wall(self) -> bool {
        self == Tile::Wall
    }

    #[inline]
    pub fn is_stair(self) -> bool {
        matches!(self, Tile::StairDown | Tile::StairUp)
    }

    /// Character used by the PRINT window and the level dump.
    pub fn symbol(self) -> char {
        match self {
            Tile::Open => ' ',
            Tile::Wall => 'W',
            Tile::StairDown => 'D',
            Tile::StairUp => 'U',
        }
    }
}
