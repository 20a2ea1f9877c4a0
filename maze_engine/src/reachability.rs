// reachability.rs - Breadth-first traversals over the multi-level grid graph
//
// Edges: the four in-plane neighbours whose tile is not a wall, plus the
// vertical edge between a StairDown tile and the StairUp tile directly below
// it (and back). Every traversal owns its visited set and parent links.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use crate::grid::{Coord, Grid};
use crate::tile::Tile;
use crate::visited::VisitedSet;

// ============================================================================
// GRAPH EDGES
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
enum Move {
    West = 1,
    East = 2,
    North = 3,
    South = 4,
    Down = 5,
    Up = 6,
}

impl Move {
    const ALL: [Move; 6] = [
        Move::West,
        Move::East,
        Move::North,
        Move::South,
        Move::Down,
        Move::Up,
    ];

    fn from_code(code: u8) -> Option<Move> {
        Move::ALL.get(code.checked_sub(1)? as usize).copied()
    }

    fn reverse(self) -> Move {
        match self {
            Move::West => Move::East,
            Move::East => Move::West,
            Move::North => Move::South,
            Move::South => Move::North,
            Move::Down => Move::Up,
            Move::Up => Move::Down,
        }
    }

    /// Linear index reached by this move. Only valid where `target` allowed it.
    #[inline]
    fn apply(self, grid: &Grid, index: usize) -> usize {
        let plane = grid.width() * grid.height();
        match self {
            Move::West => index - 1,
            Move::East => index + 1,
            Move::North => index - grid.width(),
            Move::South => index + grid.width(),
            Move::Down => index + plane,
            Move::Up => index - plane,
        }
    }

    #[inline]
    fn target(self, grid: &Grid, at: Coord, index: usize) -> Option<usize> {
        let allowed = match self {
            Move::West => at.x > 0,
            Move::East => at.x + 1 < grid.width(),
            Move::North => at.y > 0,
            Move::South => at.y + 1 < grid.height(),
            Move::Down => grid.tile_at(index) == Tile::StairDown && at.d + 1 < grid.depth(),
            Move::Up => grid.tile_at(index) == Tile::StairUp && at.d > 0,
        };
        if !allowed {
            return None;
        }
        let next = self.apply(grid, index);
        let passable = match self {
            Move::Down => grid.tile_at(next) == Tile::StairUp,
            Move::Up => grid.tile_at(next) == Tile::StairDown,
            _ => !grid.tile_at(next).is_wall(),
        };
        passable.then_some(next)
    }
}

#[inline]
fn edges(grid: &Grid, index: usize) -> impl Iterator<Item = (Move, usize)> + '_ {
    let at = grid.coord(index);
    Move::ALL
        .into_iter()
        .filter_map(move |m| m.target(grid, at, index).map(|next| (m, next)))
}

/// Coordinates reachable from `at` in one step of the grid graph.
pub fn neighbors(grid: &Grid, at: Coord) -> Vec<Coord> {
    edges(grid, grid.index(at))
        .map(|(_, next)| grid.coord(next))
        .collect()
}

// ============================================================================
// FLOOD FILL
// ============================================================================

/// Flood fill from `seed`, marking into `visited`. Returns the number of
/// cells newly reached, 0 if the seed is a wall or already marked.
///
/// Sharing one `visited` across calls lets a caller flood every component
/// exactly once.
pub fn count_reachable(grid: &Grid, seed: Coord, visited: &mut VisitedSet) -> usize {
    let start = grid.index(seed);
    if grid.tile_at(start).is_wall() || !visited.insert(start) {
        return 0;
    }

    let mut queue = VecDeque::from([start]);
    let mut reached = 0;
    while let Some(index) = queue.pop_front() {
        reached += 1;
        for (_, next) in edges(grid, index) {
            if visited.insert(next) {
                queue.push_back(next);
            }
        }
    }
    reached
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Seed {
    pub coord: Coord,
    pub reachable: usize,
}

/// Open cell whose component is largest. Components are scanned in
/// level/row/column order and represented by their first Open cell; ties keep
/// the earlier component.
pub fn best_seed(grid: &Grid) -> Option<Seed> {
    let mut visited = VisitedSet::new(grid.len());
    let mut best: Option<Seed> = None;

    for index in 0..grid.len() {
        if grid.tile_at(index) != Tile::Open || visited.contains(index) {
            continue;
        }
        let coord = grid.coord(index);
        let reachable = count_reachable(grid, coord, &mut visited);
        if best.map_or(true, |b| reachable > b.reachable) {
            best = Some(Seed { coord, reachable });
        }
    }
    best
}

// ============================================================================
// PARENT-LINKED BFS
// ============================================================================

/// BFS that records, per reached cell, the move that first reached it.
struct ParentBfs<'g> {
    grid: &'g Grid,
    visited: VisitedSet,
    parents: Vec<u8>,
    start: usize,
}

impl<'g> ParentBfs<'g> {
    /// Runs the traversal from `start`; stops early once `goal` is dequeued.
    /// Returns the last dequeued index.
    fn run(grid: &'g Grid, start: usize, goal: Option<usize>) -> (Self, usize) {
        let mut bfs = Self {
            grid,
            visited: VisitedSet::new(grid.len()),
            parents: vec![0; grid.len()],
            start,
        };
        bfs.visited.insert(start);

        let mut queue = VecDeque::from([start]);
        let mut last = start;
        while let Some(index) = queue.pop_front() {
            last = index;
            if Some(index) == goal {
                break;
            }
            for (m, next) in edges(grid, index) {
                if bfs.visited.insert(next) {
                    bfs.parents[next] = m as u8;
                    queue.push_back(next);
                }
            }
        }
        (bfs, last)
    }

    fn parent(&self, index: usize) -> Option<usize> {
        if index == self.start {
            return None;
        }
        Move::from_code(self.parents[index]).map(|m| m.reverse().apply(self.grid, index))
    }

    fn depth_of(&self, mut index: usize) -> usize {
        let mut steps = 0;
        while let Some(prev) = self.parent(index) {
            index = prev;
            steps += 1;
        }
        steps
    }

    fn path_to(&self, mut index: usize) -> Vec<Coord> {
        let mut path = vec![self.grid.coord(index)];
        while let Some(prev) = self.parent(index) {
            index = prev;
            path.push(self.grid.coord(index));
        }
        path.reverse();
        path
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Farthest {
    pub endpoint: Coord,
    pub distance: usize,
}

/// Approximate farthest Open cell from `seed`: the last cell a BFS dequeues,
/// walked back along its parent chain to the nearest Open tile so endpoints
/// never land on stairs. Distance counts steps back to `seed`.
pub fn farthest_from(grid: &Grid, seed: Coord) -> Option<Farthest> {
    let start = grid.index(seed);
    if grid.tile_at(start).is_wall() {
        return None;
    }

    let (bfs, mut last) = ParentBfs::run(grid, start, None);
    while grid.tile_at(last) != Tile::Open {
        last = bfs.parent(last)?;
    }

    Some(Farthest {
        endpoint: grid.coord(last),
        distance: bfs.depth_of(last),
    })
}

/// Shortest path from `from` to `to`, both ends included.
pub fn shortest_path(grid: &Grid, from: Coord, to: Coord) -> Option<Vec<Coord>> {
    let start = grid.index(from);
    let goal = grid.index(to);
    if grid.tile_at(start).is_wall() || grid.tile_at(goal).is_wall() {
        return None;
    }

    let (bfs, _) = ParentBfs::run(grid, start, Some(goal));
    bfs.visited.contains(goal).then(|| bfs.path_to(goal))
}

// ============================================================================
// DIAMETER ESTIMATE
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diameter {
    pub start: Coord,
    pub target: Coord,
    pub distance: usize,
}

/// Two-pass approximate diameter of the largest component: best seed, then
/// farthest-from-seed `A`, then farthest-from-`A` `B`. `None` if the grid has
/// no Open cell.
pub fn estimate_diameter(grid: &Grid) -> Option<Diameter> {
    let seed = best_seed(grid)?;
    let a = farthest_from(grid, seed.coord)?;
    let b = farthest_from(grid, a.endpoint)?;
    Some(Diameter {
        start: a.endpoint,
        target: b.endpoint,
        distance: b.distance,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::Dimensions;

    /// Builds a grid from ASCII levels: '#' wall, ' ' open, 'D'/'U' stairs.
    /// Unlisted cells of a 32x32 plane are walls.
    fn grid_from(levels: &[&[&str]]) -> Grid {
        let dims = Dimensions::new(32, 32, levels.len() as u64).unwrap();
        let mut grid = Grid::new(dims);
        for d in 0..grid.depth() {
            for y in 0..grid.height() {
                for x in 0..grid.width() {
                    grid.set(Coord::new(x, y, d), Tile::Wall);
                }
            }
        }
        for (d, rows) in levels.iter().enumerate() {
            for (y, row) in rows.iter().enumerate() {
                for (x, ch) in row.chars().enumerate() {
                    let tile = match ch {
                        ' ' => Tile::Open,
                        'D' => Tile::StairDown,
                        'U' => Tile::StairUp,
                        _ => Tile::Wall,
                    };
                    grid.set(Coord::new(x, y, d), tile);
                }
            }
        }
        grid
    }

    #[test]
    fn test_count_reachable_single_level() {
        let grid = grid_from(&[&["    #  ", "#####  "]]);
        let mut visited = VisitedSet::new(grid.len());
        assert_eq!(count_reachable(&grid, Coord::new(0, 0, 0), &mut visited), 4);
        assert_eq!(count_reachable(&grid, Coord::new(5, 0, 0), &mut visited), 4);
        // already flooded
        assert_eq!(count_reachable(&grid, Coord::new(6, 1, 0), &mut visited), 0);
        // wall seed
        assert_eq!(count_reachable(&grid, Coord::new(4, 0, 0), &mut visited), 0);
    }

    #[test]
    fn test_connector_edges_are_paired() {
        // Stairs at (2,0): level 0 D pairs with level 1 U.
        let grid = grid_from(&[&["  D"], &["# U  "]]);
        let mut visited = VisitedSet::new(grid.len());
        assert_eq!(count_reachable(&grid, Coord::new(0, 0, 0), &mut visited), 7);

        let down = neighbors(&grid, Coord::new(2, 0, 0));
        assert!(down.contains(&Coord::new(2, 0, 1)));
        let up = neighbors(&grid, Coord::new(2, 0, 1));
        assert!(up.contains(&Coord::new(2, 0, 0)));
    }

    #[test]
    fn test_unpaired_stair_has_no_vertical_edge() {
        let grid = grid_from(&[&["  D"], &["#    "]]);
        let n = neighbors(&grid, Coord::new(2, 0, 0));
        assert_eq!(n, vec![Coord::new(1, 0, 0)]);
    }

    #[test]
    fn test_best_seed_picks_largest_component() {
        let grid = grid_from(&[&["  #     ", "#########"]]);
        let seed = best_seed(&grid).unwrap();
        assert_eq!(seed.coord, Coord::new(3, 0, 0));
        assert_eq!(seed.reachable, 5);
    }

    #[test]
    fn test_farthest_walks_back_to_open_tile() {
        // Corridor ending in a stair pair; the deepest cell is a stair on level 1.
        let grid = grid_from(&[&["   D"], &["###U"]]);
        let far = farthest_from(&grid, Coord::new(0, 0, 0)).unwrap();
        assert_eq!(far.endpoint, Coord::new(2, 0, 0));
        assert_eq!(far.distance, 2);
    }

    #[test]
    fn test_diameter_of_corridor() {
        let grid = grid_from(&[&["          "]]);
        let diameter = estimate_diameter(&grid).unwrap();
        assert_eq!(diameter.distance, 9);
        let ends = [diameter.start, diameter.target];
        assert!(ends.contains(&Coord::new(0, 0, 0)));
        assert!(ends.contains(&Coord::new(9, 0, 0)));
    }

    #[test]
    fn test_diameter_spans_levels() {
        let grid = grid_from(&[&["    D"], &["####U    "]]);
        let diameter = estimate_diameter(&grid).unwrap();
        assert_eq!(diameter.distance, 9);

        let path = shortest_path(&grid, diameter.start, diameter.target).unwrap();
        assert_eq!(path.len(), 10);
        assert_eq!(path.first(), Some(&diameter.start));
        assert_eq!(path.last(), Some(&diameter.target));
    }

    #[test]
    fn test_shortest_path_unreachable() {
        let grid = grid_from(&[&["  #  "]]);
        assert!(shortest_path(&grid, Coord::new(0, 0, 0), Coord::new(4, 0, 0)).is_none());
        let path = shortest_path(&grid, Coord::new(0, 0, 0), Coord::new(1, 0, 0)).unwrap();
        assert_eq!(path, vec![Coord::new(0, 0, 0), Coord::new(1, 0, 0)]);
    }

    #[test]
    fn test_all_walls_has_no_diameter() {
        let grid = grid_from(&[&[]]);
        assert!(best_seed(&grid).is_none());
        assert!(estimate_diameter(&grid).is_none());
    }
}
