// view.rs - ASCII renderings: the player's window and full-level dumps

use crate::grid::{Coord, Grid};
use crate::tile::Tile;

/// Cells shown on each side of the player.
pub const WINDOW_RADIUS: i64 = 5;

const OUTSIDE: char = '.';
const BORDER: char = 'W';
const PLAYER: char = 'P';
const TARGET: char = 'T';

/// `(2r+1) × (2r+1)` neighbourhood of the player on its current level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Window {
    pub position: Coord,
    pub rows: Vec<String>,
}

/// Renders the window around `position`. The ring directly outside the grid
/// shows as wall, anything further out as `.`.
pub fn render_window(grid: &Grid, position: Coord, target: Coord) -> Window {
    let (px, py) = (position.x as i64, position.y as i64);
    let (w, h) = (grid.width() as i64, grid.height() as i64);

    let rows = (py - WINDOW_RADIUS..=py + WINDOW_RADIUS)
        .map(|y| {
            (px - WINDOW_RADIUS..=px + WINDOW_RADIUS)
                .map(|x| {
                    if y < -1 || x < -1 || y > h || x > w {
                        return OUTSIDE;
                    }
                    if y == -1 || x == -1 || y == h || x == w {
                        return BORDER;
                    }
                    let here = Coord::new(x as usize, y as usize, position.d);
                    if here == position {
                        PLAYER
                    } else if here == target {
                        TARGET
                    } else {
                        grid.get(here).symbol()
                    }
                })
                .collect()
        })
        .collect();

    Window { position, rows }
}

/// Whole level framed with `#`, for offline inspection.
pub fn render_level(grid: &Grid, d: usize, position: Option<Coord>, target: Option<Coord>) -> String {
    let frame = "#".repeat(grid.width() + 2);
    let mut out = String::with_capacity((grid.width() + 3) * (grid.height() + 2));
    out.push_str(&frame);
    out.push('\n');

    for (y, row) in grid.level(d).chunks_exact(grid.width()).enumerate() {
        out.push('#');
        for (x, &tile) in row.iter().enumerate() {
            let here = Some(Coord::new(x, y, d));
            out.push(match tile {
                Tile::Wall => '#',
                _ if here == position => PLAYER,
                _ if here == target => TARGET,
                other => other.symbol(),
            });
        }
        out.push_str("#\n");
    }

    out.push_str(&frame);
    out.push('\n');
    out
}
