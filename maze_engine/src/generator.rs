// generator.rs - Random-fill maze generation and the density sweep
//
// Mazes are Bernoulli noise: each cell is a wall with probability `p`, then
// adjacent levels are joined by connector pairs. The sweep samples a narrow
// band of densities and keeps the candidate with the longest diameter.

use std::ops::ControlFlow;
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rayon::prelude::*;

use crate::error::{MazeError, Result};
use crate::grid::{Coord, Dimensions, Grid};
use crate::maze::Maze;
use crate::reachability::{estimate_diameter, Diameter};
use crate::tile::Tile;

/// Planar cells per connector pair between two levels.
const CELLS_PER_TRANSFER: usize = 9216;
const MIN_TRANSFER_NODES: usize = 2;
/// Coordinate picks allowed per requested connector before a level pair gives up.
const TRANSFER_ATTEMPTS_PER_NODE: usize = 64;

/// Diameters at or below this are unusable: start and target coincide or touch.
pub const DEGENERATE_DISTANCE: usize = 1;

// ============================================================================
// SINGLE CANDIDATE
// ============================================================================

/// Connector pairs placed between each pair of adjacent levels.
pub fn transfer_nodes(dims: Dimensions) -> usize {
    if dims.depth() < 2 {
        return 0;
    }
    let planar = dims.width() * dims.height() * (dims.depth() - 1);
    (planar / CELLS_PER_TRANSFER).max(MIN_TRANSFER_NODES)
}

/// Overwrites `grid` with a fresh random fill at `wall_probability` and
/// places connector pairs on cells that are Open on both levels.
pub fn randomize<R: Rng>(grid: &mut Grid, rng: &mut R, wall_probability: f64) {
    for level in grid.levels_mut() {
        for tile in level.iter_mut() {
            *tile = if rng.random::<f64>() <= wall_probability {
                Tile::Wall
            } else {
                Tile::Open
            };
        }
    }

    let wanted = transfer_nodes(grid.dimensions());
    for d in 0..grid.depth().saturating_sub(1) {
        let placed = place_connectors(grid, rng, d, wanted);
        if placed < wanted {
            log::warn!(
                "Level pair {}/{}: placed only {} of {} connectors",
                d,
                d + 1,
                placed,
                wanted
            );
        }
    }
}

fn place_connectors<R: Rng>(grid: &mut Grid, rng: &mut R, d: usize, wanted: usize) -> usize {
    let mut placed = 0;
    let mut attempts = 0;
    let budget = wanted * TRANSFER_ATTEMPTS_PER_NODE;

    while placed < wanted && attempts < budget {
        attempts += 1;
        let x = rng.random_range(0..grid.width());
        let y = rng.random_range(0..grid.height());
        let upper = Coord::new(x, y, d);
        let lower = Coord::new(x, y, d + 1);

        if grid.get(upper) == Tile::Open && grid.get(lower) == Tile::Open {
            grid.set(upper, Tile::StairDown);
            grid.set(lower, Tile::StairUp);
            placed += 1;
        }
    }
    placed
}

/// A scored grid produced during the sweep.
#[derive(Debug, Clone)]
pub struct Candidate {
    pub grid: Grid,
    pub diameter: Option<Diameter>,
    pub wall_probability: f64,
}

impl Candidate {
    pub fn generate<R: Rng>(dims: Dimensions, rng: &mut R, wall_probability: f64) -> Self {
        let mut grid = Grid::new(dims);
        randomize(&mut grid, rng, wall_probability);
        let diameter = estimate_diameter(&grid);
        Self {
            grid,
            diameter,
            wall_probability,
        }
    }

    pub fn score(&self) -> usize {
        self.diameter.map_or(0, |d| d.distance)
    }

    pub fn is_degenerate(&self) -> bool {
        self.score() <= DEGENERATE_DISTANCE
    }

    pub fn into_maze(self) -> Option<Maze> {
        let diameter = self.diameter?;
        Some(Maze::new(
            self.grid,
            diameter.start,
            diameter.target,
            diameter.distance,
        ))
    }
}

// ============================================================================
// DENSITY SWEEP
// ============================================================================

/// Wall densities `start + i * step` for `i in 0..steps`, `samples` candidates each.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DensitySweep {
    pub start: f64,
    pub step: f64,
    pub steps: usize,
    pub samples: usize,
}

impl Default for DensitySweep {
    /// 0.400 ..= 0.420: below the band mazes are trivially open, above it
    /// they fragment into small components.
    fn default() -> Self {
        Self {
            start: 0.400,
            step: 0.001,
            steps: 21,
            samples: 2,
        }
    }
}

impl DensitySweep {
    pub fn density(&self, step: usize) -> f64 {
        self.start + self.step * step as f64
    }

    /// Same band shape shifted towards emptier grids.
    pub fn relaxed(&self, shift: f64) -> Self {
        Self {
            start: (self.start - shift).max(0.0),
            ..*self
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SweepProgress {
    /// 0 for the requested sweep, 1.. for relaxed retries.
    pub pass: usize,
    /// Density steps finished, `1..=total`.
    pub step: usize,
    pub total: usize,
    pub best_score: usize,
}

impl SweepProgress {
    pub fn percent(&self) -> usize {
        self.step * 100 / self.total.max(1)
    }
}

/// Runs one sweep and returns the best candidate, or `Cancelled` if the
/// observer breaks. Candidates of a step are built in parallel, each from its
/// own RNG seeded by `rng`, so results only depend on `rng`.
pub fn find_best_candidate<R, F>(
    dims: Dimensions,
    sweep: &DensitySweep,
    pass: usize,
    rng: &mut R,
    observer: &mut F,
) -> Result<Candidate>
where
    R: Rng,
    F: FnMut(SweepProgress) -> ControlFlow<()>,
{
    let mut best: Option<Candidate> = None;

    for step in 0..sweep.steps {
        let density = sweep.density(step);
        let seeds: Vec<u64> = (0..sweep.samples).map(|_| rng.random()).collect();

        let candidates: Vec<Candidate> = seeds
            .into_par_iter()
            .map(|seed| Candidate::generate(dims, &mut StdRng::seed_from_u64(seed), density))
            .collect();

        for candidate in candidates {
            log::debug!(
                "density {:.3}: candidate distance {}",
                density,
                candidate.score()
            );
            if best.as_ref().map_or(true, |b| candidate.score() > b.score()) {
                best = Some(candidate);
            }
        }

        let progress = SweepProgress {
            pass,
            step: step + 1,
            total: sweep.steps,
            best_score: best.as_ref().map_or(0, Candidate::score),
        };
        if observer(progress).is_break() {
            return Err(MazeError::Cancelled);
        }
    }

    best.ok_or(MazeError::GenerationDegenerate { best_distance: 0 })
}

/// Relaxed re-sweeps attempted after a degenerate result.
pub const RELAXED_RETRIES: usize = 2;
/// Density shift applied per relaxed retry.
pub const RELAXED_SHIFT: f64 = 0.05;

/// Generates a playable maze: the requested sweep, then up to
/// [`RELAXED_RETRIES`] sweeps at lower densities if every candidate was
/// degenerate. Fails with `GenerationDegenerate` when none produced a path
/// longer than [`DEGENERATE_DISTANCE`].
pub fn generate_maze<R, F>(dims: Dimensions, sweep: &DensitySweep, rng: &mut R, mut observer: F) -> Result<Maze>
where
    R: Rng,
    F: FnMut(SweepProgress) -> ControlFlow<()>,
{
    dims.check_budget()?;
    let started = Instant::now();

    let mut best_distance = 0;
    for pass in 0..=RELAXED_RETRIES {
        let band = sweep.relaxed(RELAXED_SHIFT * pass as f64);
        let candidate = find_best_candidate(dims, &band, pass, rng, &mut observer)?;
        best_distance = best_distance.max(candidate.score());

        if candidate.is_degenerate() {
            log::warn!(
                "{} sweep from density {:.3} was degenerate (distance {})",
                dims,
                band.start,
                candidate.score()
            );
            continue;
        }

        let density = candidate.wall_probability;
        if let Some(maze) = candidate.into_maze() {
            log::info!(
                "Generated {} maze in {:?}: density {:.3}, distance {}",
                dims,
                started.elapsed(),
                density,
                maze.distance()
            );
            return Ok(maze);
        }
    }

    Err(MazeError::GenerationDegenerate { best_distance })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reachability::shortest_path;

    fn dims(w: u64, h: u64, d: u64) -> Dimensions {
        Dimensions::new(w, h, d).unwrap()
    }

    #[test]
    fn test_transfer_nodes() {
        assert_eq!(transfer_nodes(dims(32, 32, 1)), 0);
        assert_eq!(transfer_nodes(dims(32, 32, 2)), 2);
        assert_eq!(transfer_nodes(dims(362, 362, 2)), 14);
        assert_eq!(transfer_nodes(dims(1024, 1024, 16)), 1706);
    }

    #[test]
    fn test_randomize_places_paired_connectors() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut grid = Grid::new(dims(64, 64, 3));
        randomize(&mut grid, &mut rng, 0.41);

        let wanted = transfer_nodes(grid.dimensions());
        for d in 0..grid.depth() {
            for y in 0..grid.height() {
                for x in 0..grid.width() {
                    match grid.get(Coord::new(x, y, d)) {
                        Tile::StairDown => {
                            assert!(d + 1 < grid.depth());
                            assert_eq!(grid.get(Coord::new(x, y, d + 1)), Tile::StairUp);
                        }
                        Tile::StairUp => {
                            assert!(d > 0);
                            assert_eq!(grid.get(Coord::new(x, y, d - 1)), Tile::StairDown);
                        }
                        _ => {}
                    }
                }
            }
        }
        assert_eq!(grid.count(Tile::StairDown), wanted * 2);
        assert_eq!(grid.count(Tile::StairUp), wanted * 2);
    }

    #[test]
    fn test_wall_density_tracks_probability() {
        let mut rng = StdRng::seed_from_u64(11);
        let mut grid = Grid::new(dims(256, 256, 1));
        randomize(&mut grid, &mut rng, 0.41);
        let ratio = grid.count(Tile::Wall) as f64 / grid.len() as f64;
        assert!((ratio - 0.41).abs() < 0.01, "wall ratio {}", ratio);
    }

    #[test]
    fn test_solid_grid_gives_up_on_connectors() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut grid = Grid::new(dims(32, 32, 2));
        randomize(&mut grid, &mut rng, 1.0);
        assert_eq!(grid.count(Tile::StairDown), 0);
        assert!(estimate_diameter(&grid).is_none());
    }

    #[test]
    fn test_generated_maze_is_solvable() {
        for (seed, depth) in [(1u64, 1u64), (2, 2), (3, 3)] {
            let mut rng = StdRng::seed_from_u64(seed);
            let maze = generate_maze(dims(32, 32, depth), &DensitySweep::default(), &mut rng, |_| {
                ControlFlow::Continue(())
            })
            .unwrap();

            assert_ne!(maze.start(), maze.target());
            assert_eq!(maze.grid().get(maze.start()), Tile::Open);
            assert_eq!(maze.grid().get(maze.target()), Tile::Open);
            assert!(maze.distance() > DEGENERATE_DISTANCE);

            let path = shortest_path(maze.grid(), maze.start(), maze.target()).unwrap();
            assert_eq!(path.len(), maze.distance() + 1);
        }
    }

    #[test]
    fn test_seeded_sweep_is_reproducible() {
        let sweep = DensitySweep {
            steps: 3,
            ..DensitySweep::default()
        };
        let run = |seed| {
            let mut rng = StdRng::seed_from_u64(seed);
            generate_maze(dims(48, 40, 2), &sweep, &mut rng, |_| ControlFlow::Continue(()))
                .unwrap()
                .summary()
        };
        let a = run(99);
        let b = run(99);
        assert_eq!((a.start, a.target, a.distance), (b.start, b.target, b.distance));
    }

    #[test]
    fn test_progress_and_cancellation() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut seen = Vec::new();
        let result = generate_maze(dims(32, 32, 1), &DensitySweep::default(), &mut rng, |p| {
            seen.push(p.percent());
            if p.step == 4 {
                ControlFlow::Break(())
            } else {
                ControlFlow::Continue(())
            }
        });
        assert_eq!(result.unwrap_err(), MazeError::Cancelled);
        assert_eq!(seen, vec![4, 9, 14, 19]);
    }

    #[test]
    fn test_all_wall_sweep_is_degenerate() {
        // every band stays above 1.0, so each cell is a wall
        let sweep = DensitySweep {
            start: 2.0,
            step: 0.0,
            steps: 2,
            samples: 1,
        };
        let mut rng = StdRng::seed_from_u64(1);
        let mut passes = Vec::new();
        let err = generate_maze(dims(32, 32, 1), &sweep, &mut rng, |p| {
            passes.push(p.pass);
            ControlFlow::Continue(())
        })
        .unwrap_err();
        assert_eq!(err, MazeError::GenerationDegenerate { best_distance: 0 });
        assert_eq!(passes, vec![0, 0, 1, 1, 2, 2]);
    }

    #[test]
    fn test_oversized_dimensions_rejected_before_generation() {
        let mut d = Dimensions::default();
        d.set_width(4096).unwrap();
        d.set_height(4096).unwrap();
        d.set_depth(2).unwrap();
        let mut rng = StdRng::seed_from_u64(1);
        let err = generate_maze(d, &DensitySweep::default(), &mut rng, |_| ControlFlow::Continue(()))
            .unwrap_err();
        assert!(matches!(err, MazeError::MemoryBudgetExceeded { .. }));
    }
}
