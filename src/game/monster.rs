//! Monster ("wolf") state and the fixed-rate AI simulation

use std::f32::consts::{FRAC_PI_2, PI};

use rand::seq::SliceRandom;
use rand::Rng;
use uuid::Uuid;

use crate::game::arena::{ArenaState, Effect};
use crate::game::combat::{self, MAX_HEALTH};
use crate::game::maze::Maze;
use crate::ws::protocol::{Combatant, MonsterInfo, Position, ServerMsg};

/// AI tick rate: 10 Hz
pub const MONSTER_TICK_MS: u64 = 100;
/// Delta-time clamp so scheduling jitter cannot teleport the monster
pub const MAX_TICK_DT: f32 = 0.1;
/// Travel speed in world units per second
pub const MONSTER_SPEED: f32 = 2.5;
/// Kill check distance in world units
pub const KILL_RADIUS: f32 = 1.5;
/// Minimum gap between two monster kills
pub const KILL_COOLDOWN_MS: u64 = 1_500;
/// Wall probe offset as a fraction of the cell size; must stay below half a
/// cell so four open probes imply an open center cell
const WALL_PROBE_FRACTION: f32 = 0.1;
/// Per-tick chance to re-pick a direction at the next junction
const TURN_PROBABILITY: f64 = 0.05;

/// Cardinal travel direction, +x is east and +z is south
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    North,
    East,
    South,
    West,
}

impl Direction {
    pub const ALL: [Direction; 4] = [
        Direction::North,
        Direction::East,
        Direction::South,
        Direction::West,
    ];

    /// Unit vector (dx, dz)
    pub fn vector(self) -> (f32, f32) {
        match self {
            Direction::North => (0.0, -1.0),
            Direction::East => (1.0, 0.0),
            Direction::South => (0.0, 1.0),
            Direction::West => (-1.0, 0.0),
        }
    }

    /// Facing angle derived from the travel vector
    pub fn angle(self) -> f32 {
        match self {
            Direction::North => PI,
            Direction::East => FRAC_PI_2,
            Direction::South => 0.0,
            Direction::West => -FRAC_PI_2,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Monster {
    pub x: f32,
    pub z: f32,
    pub dir: Direction,
    pub health: i32,
    pub dead: bool,
    /// Timestamp of the last kill, for the cooldown window
    pub last_kill_ms: u64,
}

impl Monster {
    /// Fresh monster at the maze's center room
    pub fn spawn(maze: &Maze) -> Self {
        let (x, z) = maze.monster_spawn();
        Self {
            x,
            z,
            dir: Direction::East,
            health: MAX_HEALTH,
            dead: false,
            last_kill_ms: 0,
        }
    }

    pub fn position(&self) -> Position {
        Position {
            x: self.x,
            y: 0.0,
            z: self.z,
        }
    }

    pub fn angle(&self) -> f32 {
        self.dir.angle()
    }

    pub fn info(&self) -> MonsterInfo {
        MonsterInfo {
            position: self.position(),
            angle: self.angle(),
        }
    }
}

/// One 10 Hz simulation step: advance through the maze, then run the
/// proximity kill check against every live player.
pub fn tick(state: &mut ArenaState, dt: f32, now_ms: u64) -> Vec<Effect> {
    let mut effects = Vec::new();
    if state.game_over || state.monster.dead {
        return effects;
    }
    let dt = dt.min(MAX_TICK_DT);

    let (dx, dz) = state.monster.dir.vector();
    let step = MONSTER_SPEED * dt;
    let nx = state.monster.x + dx * step;
    let nz = state.monster.z + dz * step;

    if !blocked(&state.maze, nx, nz) {
        state.monster.x = nx;
        state.monster.z = nz;
        // Occasionally reconsider at the upcoming junction for path variety
        if state.rng.gen_bool(TURN_PROBABILITY) {
            pick_direction(state);
        }
    } else {
        // Wall ahead: turn towards any unobstructed direction, or hold
        pick_direction(state);
    }

    // No broadcast to an empty room
    if !state.players.is_empty() {
        effects.push(Effect::Broadcast(ServerMsg::MonsterMoved {
            position: state.monster.position(),
            angle: state.monster.angle(),
        }));
    }

    let victims: Vec<Uuid> = state
        .players
        .values()
        .filter(|p| {
            let ddx = p.position.x - state.monster.x;
            let ddz = p.position.z - state.monster.z;
            !p.dead && ddx * ddx + ddz * ddz <= KILL_RADIUS * KILL_RADIUS
        })
        .map(|p| p.id)
        .collect();

    for id in victims {
        if state.game_over {
            break;
        }
        if now_ms.saturating_sub(state.monster.last_kill_ms) < KILL_COOLDOWN_MS {
            break;
        }
        state.monster.last_kill_ms = now_ms;
        if let Some(player) = state.players.get_mut(&id) {
            player.health = 0;
        }
        effects.extend(combat::kill_player(state, id, Combatant::Monster));
    }

    effects
}

/// Candidate-center wall test: four point probes at the axis offsets.
fn blocked(maze: &Maze, x: f32, z: f32) -> bool {
    let probe = maze.cell_size() * WALL_PROBE_FRACTION;
    maze.wall_at_world(x - probe, z)
        || maze.wall_at_world(x + probe, z)
        || maze.wall_at_world(x, z - probe)
        || maze.wall_at_world(x, z + probe)
}

/// Pick a random direction whose neighbor cell is clear; keeps the current
/// direction when the monster is fully boxed in. The lookahead is a full
/// cell so the probe lands inside the neighbor, not the current cell.
fn pick_direction(state: &mut ArenaState) {
    let lookahead = state.maze.cell_size();
    let open: Vec<Direction> = Direction::ALL
        .into_iter()
        .filter(|dir| {
            let (dx, dz) = dir.vector();
            !blocked(
                &state.maze,
                state.monster.x + dx * lookahead,
                state.monster.z + dz * lookahead,
            )
        })
        .collect();
    if let Some(&dir) = open.choose(&mut state.rng) {
        state.monster.dir = dir;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::arena::ArenaState;
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    #[test]
    fn direction_vectors_are_cardinal_units() {
        for dir in Direction::ALL {
            let (dx, dz) = dir.vector();
            assert_eq!(dx.abs() + dz.abs(), 1.0);
        }
    }

    #[test]
    fn angle_matches_vector() {
        for dir in Direction::ALL {
            let (dx, dz) = dir.vector();
            let angle = dir.angle();
            assert!((angle.sin() - dx).abs() < 1e-6, "{dir:?}");
            assert!((angle.cos() - dz).abs() < 1e-6, "{dir:?}");
        }
    }

    #[test]
    fn lookahead_probe_matches_neighbor_cell_occupancy() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        let maze = Maze::generate(7, 4.0, &mut rng);
        let cell = maze.cell_size();
        let (x, z) = maze.cell_center(1, 1);
        for dir in Direction::ALL {
            let (dx, dz) = dir.vector();
            assert_eq!(
                blocked(&maze, x + dx * cell, z + dz * cell),
                maze.is_wall(1 + dz as i32, 1 + dx as i32),
                "{dir:?}"
            );
        }
    }

    #[test]
    fn blocked_repick_never_selects_a_wall_neighbor() {
        let mut state = ArenaState::new(7, 4.0, 42);
        // Corridor spot beside the north-west corner room: the western border
        // is dead ahead and the northern border flanks it. Room (0,0) always
        // has a carved exit east or south, so the open set is never empty.
        state.monster.x = 2.5;
        state.monster.z = 4.0;
        state.monster.dir = Direction::West;
        for _ in 0..50 {
            pick_direction(&mut state);
            assert!(
                matches!(state.monster.dir, Direction::East | Direction::South),
                "re-picked towards a wall: {:?}",
                state.monster.dir
            );
            state.monster.dir = Direction::West;
        }
    }
}
