//! Maze generation - randomized depth-first room carving

use rand::seq::SliceRandom;
use rand::Rng;

use crate::ws::protocol::Position;

/// Cell value for a wall
pub const WALL: u8 = 1;
/// Cell value for an open (carved) cell
pub const OPEN: u8 = 0;

/// Room-to-room step directions as (dx, dy) in room coordinates
const DIRECTIONS: [(i32, i32); 4] = [(0, -1), (1, 0), (0, 1), (-1, 0)];

/// The maze for one round.
///
/// R logical rooms per side map onto a (2R+1)x(2R+1) cell grid: rooms sit at
/// odd-odd coordinates, the cells between them are the walls that carving
/// opens. World position of grid cell (r, c) is (c * cell_size, r * cell_size).
#[derive(Debug, Clone)]
pub struct Maze {
    rooms: usize,
    cell_size: f32,
    grid: Vec<Vec<u8>>,
}

impl Maze {
    /// Carve a fully-connected maze with an iterative depth-first walk.
    ///
    /// Starts at room (0,0) and repeatedly opens the wall towards a random
    /// unvisited neighbor, backtracking when a room has none left. The open
    /// cells form a spanning tree over the RxR rooms. The walk is iterative
    /// (explicit stack) so large room counts cannot blow the call stack, and
    /// the same `rng` sequence always yields the same grid.
    pub fn generate<R: Rng>(rooms: usize, cell_size: f32, rng: &mut R) -> Self {
        assert!(rooms >= 1, "maze needs at least one room");
        let side = 2 * rooms + 1;
        let mut grid = vec![vec![WALL; side]; side];

        struct Frame {
            rx: usize,
            ry: usize,
            dirs: [(i32, i32); 4],
            next: usize,
        }

        let shuffled = |rng: &mut R| {
            let mut dirs = DIRECTIONS;
            dirs.shuffle(rng);
            dirs
        };

        grid[1][1] = OPEN;
        let mut stack = vec![Frame {
            rx: 0,
            ry: 0,
            dirs: shuffled(rng),
            next: 0,
        }];

        while let Some(frame) = stack.last_mut() {
            let mut advanced = None;
            while frame.next < frame.dirs.len() {
                let (dx, dy) = frame.dirs[frame.next];
                frame.next += 1;

                let nx = frame.rx as i32 + dx;
                let ny = frame.ry as i32 + dy;
                if nx < 0 || ny < 0 || nx >= rooms as i32 || ny >= rooms as i32 {
                    continue;
                }
                let (nx, ny) = (nx as usize, ny as usize);
                if grid[2 * ny + 1][2 * nx + 1] == OPEN {
                    // Already visited
                    continue;
                }

                // Open the wall between the two rooms, then the room itself
                let wall_r = (2 * frame.ry as i32 + 1 + dy) as usize;
                let wall_c = (2 * frame.rx as i32 + 1 + dx) as usize;
                grid[wall_r][wall_c] = OPEN;
                grid[2 * ny + 1][2 * nx + 1] = OPEN;
                advanced = Some((nx, ny));
                break;
            }

            match advanced {
                Some((nx, ny)) => stack.push(Frame {
                    rx: nx,
                    ry: ny,
                    dirs: shuffled(rng),
                    next: 0,
                }),
                None => {
                    stack.pop();
                }
            }
        }

        Self {
            rooms,
            cell_size,
            grid,
        }
    }

    /// Grid side length (2R+1)
    pub fn side(&self) -> usize {
        2 * self.rooms + 1
    }

    pub fn rooms(&self) -> usize {
        self.rooms
    }

    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    pub fn grid(&self) -> &[Vec<u8>] {
        &self.grid
    }

    /// Wall test by grid coordinates; anything out of bounds counts as wall.
    pub fn is_wall(&self, row: i32, col: i32) -> bool {
        if row < 0 || col < 0 || row as usize >= self.side() || col as usize >= self.side() {
            return true;
        }
        self.grid[row as usize][col as usize] == WALL
    }

    /// Wall test for a world-space point, snapping to the nearest cell center.
    pub fn wall_at_world(&self, x: f32, z: f32) -> bool {
        let col = (x / self.cell_size).round() as i32;
        let row = (z / self.cell_size).round() as i32;
        self.is_wall(row, col)
    }

    /// World-space center of a grid cell
    pub fn cell_center(&self, row: usize, col: usize) -> (f32, f32) {
        (col as f32 * self.cell_size, row as f32 * self.cell_size)
    }

    /// Fixed spawn point for a player slot: slot 0 at room (0,0), slot 1 at
    /// the diagonally opposite corner room.
    pub fn spawn_point(&self, slot: u8) -> Position {
        let cell = match slot {
            0 => 1,
            _ => 2 * self.rooms - 1,
        };
        let (x, z) = self.cell_center(cell, cell);
        Position { x, y: 0.0, z }
    }

    /// Initial monster cell: the room nearest the grid center.
    pub fn monster_spawn(&self) -> (f32, f32) {
        // Room cells sit at odd indices; step down one if R is even
        let mid = if self.rooms % 2 == 1 {
            self.rooms
        } else {
            self.rooms - 1
        };
        self.cell_center(mid, mid)
    }
}
