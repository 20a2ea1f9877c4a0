// grid.rs - Validated dimensions and the three-dimensional tile store

use std::fmt;
use std::ops::RangeInclusive;

use serde::{Deserialize, Serialize};
use static_assertions::const_assert_eq;

use crate::error::{MazeError, Result};
use crate::tile::Tile;

// ============================================================================
// LIMITS
// ============================================================================

pub const PLANAR_RANGE: RangeInclusive<u32> = 32..=65536;
pub const DEPTH_RANGE: RangeInclusive<u32> = 1..=16;

/// Cell ceiling; one byte per tile makes this the 16 MiB memory budget.
pub const MAX_CELLS: u64 = 16 * 1024 * 1024;

const_assert_eq!(MAX_CELLS, 1 << 24);

/// Byte count rendered the way protocol messages expect ("32MB", "9216KB").
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct MemorySize(pub u64);

impl fmt::Display for MemorySize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size = self.0;
        if size >= 10 * (1 << 30) {
            write!(f, "{}GB", size >> 30)
        } else if size >= 10 * (1 << 20) {
            write!(f, "{}MB", size >> 20)
        } else if size >= 10 * (1 << 10) {
            write!(f, "{}KB", size >> 10)
        } else {
            write!(f, "{}B", size)
        }
    }
}

// ============================================================================
// DIMENSIONS
// ============================================================================

/// Grid extent. Each axis is range-checked on assignment; the cell budget is
/// only checked by [`Dimensions::check_budget`] so a client can fix an
/// oversized product one axis at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dimensions {
    width: u32,
    height: u32,
    depth: u32,
}

impl Default for Dimensions {
    fn default() -> Self {
        Self {
            width: 362,
            height: 362,
            depth: 2,
        }
    }
}

fn checked_axis(parameter: &'static str, value: u64, range: &RangeInclusive<u32>) -> Result<u32> {
    match u32::try_from(value) {
        Ok(v) if range.contains(&v) => Ok(v),
        _ => Err(MazeError::ParameterOutOfRange {
            parameter,
            value,
            min: *range.start(),
            max: *range.end(),
        }),
    }
}

impl Dimensions {
    /// Fully validated dimensions: axis ranges and the cell budget.
    pub fn new(width: u64, height: u64, depth: u64) -> Result<Self> {
        let dims = Self {
            width: checked_axis("width", width, &PLANAR_RANGE)?,
            height: checked_axis("height", height, &PLANAR_RANGE)?,
            depth: checked_axis("depth", depth, &DEPTH_RANGE)?,
        };
        dims.check_budget()?;
        Ok(dims)
    }

    pub fn set_width(&mut self, value: u64) -> Result<()> {
        self.width = checked_axis("width", value, &PLANAR_RANGE)?;
        Ok(())
    }

    pub fn set_height(&mut self, value: u64) -> Result<()> {
        self.height = checked_axis("height", value, &PLANAR_RANGE)?;
        Ok(())
    }

    pub fn set_depth(&mut self, value: u64) -> Result<()> {
        self.depth = checked_axis("depth", value, &DEPTH_RANGE)?;
        Ok(())
    }

    pub fn width(&self) -> usize {
        self.width as usize
    }

    pub fn height(&self) -> usize {
        self.height as usize
    }

    pub fn depth(&self) -> usize {
        self.depth as usize
    }

    pub fn cells(&self) -> u64 {
        self.width as u64 * self.height as u64 * self.depth as u64
    }

    pub fn memory(&self) -> MemorySize {
        MemorySize(self.cells())
    }

    pub fn check_budget(&self) -> Result<()> {
        if self.cells() > MAX_CELLS {
            return Err(MazeError::MemoryBudgetExceeded {
                required: self.memory(),
                maximum: MemorySize(MAX_CELLS),
            });
        }
        Ok(())
    }
}

impl fmt::Display for Dimensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.width, self.height, self.depth)
    }
}

// ============================================================================
// GRID STORE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Coord {
    pub x: usize,
    pub y: usize,
    pub d: usize,
}

impl Coord {
    pub const fn new(x: usize, y: usize, d: usize) -> Self {
        Self { x, y, d }
    }
}

impl fmt::Display for Coord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}x{}", self.x, self.y, self.d)
    }
}

/// `Width × Height × Depth` tiles in level-major, then row-major order.
///
/// Accessors index straight into the backing slice; coordinates outside the
/// grid are a caller bug and panic through the slice bounds check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    dims: Dimensions,
    tiles: Vec<Tile>,
}

impl Grid {
    pub fn new(dims: Dimensions) -> Self {
        Self {
            dims,
            tiles: vec![Tile::Open; dims.cells() as usize],
        }
    }

    pub fn dimensions(&self) -> Dimensions {
        self.dims
    }

    #[inline]
    pub fn width(&self) -> usize {
        self.dims.width()
    }

    #[inline]
    pub fn height(&self) -> usize {
        self.dims.height()
    }

    #[inline]
    pub fn depth(&self) -> usize {
        self.dims.depth()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.tiles.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.tiles.is_empty()
    }

    #[inline]
    pub fn index(&self, c: Coord) -> usize {
        (c.d * self.height() + c.y) * self.width() + c.x
    }

    #[inline]
    pub fn coord(&self, index: usize) -> Coord {
        let plane = self.width() * self.height();
        let d = index / plane;
        let rest = index % plane;
        Coord::new(rest % self.width(), rest / self.width(), d)
    }

    #[inline]
    pub fn get(&self, c: Coord) -> Tile {
        self.tiles[self.index(c)]
    }

    #[inline]
    pub fn set(&mut self, c: Coord, tile: Tile) {
        let i = self.index(c);
        self.tiles[i] = tile;
    }

    #[inline]
    pub fn tile_at(&self, index: usize) -> Tile {
        self.tiles[index]
    }

    /// True if the signed coordinate lies inside the grid.
    pub fn in_bounds(&self, x: i64, y: i64, d: i64) -> bool {
        x >= 0
            && y >= 0
            && d >= 0
            && (x as usize) < self.width()
            && (y as usize) < self.height()
            && (d as usize) < self.depth()
    }

    /// One level as a row-major slice.
    pub fn level(&self, d: usize) -> &[Tile] {
        let plane = self.width() * self.height();
        &self.tiles[d * plane..(d + 1) * plane]
    }

    pub fn levels_mut(&mut self) -> std::slice::ChunksExactMut<'_, Tile> {
        let plane = self.width() * self.height();
        self.tiles.chunks_exact_mut(plane)
    }

    pub fn count(&self, tile: Tile) -> usize {
        self.tiles.iter().filter(|&&t| t == tile).count()
    }
}
