//! Combat resolution - damage, death, respawn scheduling, round termination
//!
//! Hit registration is shooter-authoritative: the server applies whatever the
//! shooting client reports and only enforces state rules (round over, shooter
//! unseated, target already dead, target gone).

use std::time::Duration;

use uuid::Uuid;

use crate::game::arena::{ArenaCommand, ArenaState, Effect};
use crate::game::monster::Monster;
use crate::ws::protocol::{Combatant, ServerMsg};

pub const MAX_HEALTH: i32 = 100;
pub const HIT_DAMAGE: i32 = 25;
pub const START_LIVES: u8 = 3;

pub const PLAYER_RESPAWN_DELAY: Duration = Duration::from_secs(3);
pub const WOLF_RESPAWN_DELAY: Duration = Duration::from_secs(5);
pub const RESTART_DELAY: Duration = Duration::from_secs(5);

/// Subtract one hit of damage, floored at zero. Returns (new_health, died).
pub fn apply_damage(health: i32) -> (i32, bool) {
    let health = (health - HIT_DAMAGE).max(0);
    (health, health == 0)
}

/// Shooter-reported hit on another player. The shooter must hold a slot:
/// a connection rejected at capacity can still push frames for a moment
/// before its session closes.
pub fn resolve_hit(state: &mut ArenaState, shooter: Uuid, target_id: Uuid) -> Vec<Effect> {
    let mut effects = Vec::new();
    if state.game_over || !state.players.contains_key(&shooter) {
        return effects;
    }
    let Some(target) = state.players.get_mut(&target_id) else {
        return effects;
    };
    if target.dead {
        return effects;
    }

    let (health, died) = apply_damage(target.health);
    target.health = health;
    effects.push(Effect::Broadcast(ServerMsg::PlayerHit { target_id, health }));

    if died {
        effects.extend(kill_player(state, target_id, Combatant::Player(shooter)));
    }
    effects
}

/// Shared death path for player- and monster-inflicted kills: mark dead,
/// spend a life, then either schedule a respawn or end the round.
pub fn kill_player(state: &mut ArenaState, target_id: Uuid, killer: Combatant) -> Vec<Effect> {
    let mut effects = Vec::new();
    let Some(target) = state.players.get_mut(&target_id) else {
        return effects;
    };
    target.dead = true;
    target.lives = target.lives.saturating_sub(1);
    let lives = target.lives;

    effects.push(Effect::Broadcast(ServerMsg::PlayerKilled {
        target_id,
        killer_id: killer,
        lives,
    }));

    if lives > 0 {
        effects.push(Effect::After {
            delay: PLAYER_RESPAWN_DELAY,
            cmd: ArenaCommand::RespawnPlayer { id: target_id },
        });
    } else {
        state.game_over = true;
        let winner = match killer {
            Combatant::Player(id) => Combatant::Player(id),
            // Monster kill: the surviving human wins, the monster if none left
            Combatant::Monster => state
                .players
                .values()
                .find(|p| p.id != target_id)
                .map(|p| Combatant::Player(p.id))
                .unwrap_or(Combatant::Monster),
        };
        effects.push(Effect::Broadcast(ServerMsg::GameOver {
            loser_id: target_id,
            winner_id: winner,
        }));
        effects.push(Effect::After {
            delay: RESTART_DELAY,
            cmd: ArenaCommand::Restart,
        });
    }
    effects
}

/// Deferred respawn. The player may have disconnected while the timer was
/// pending, or the round may have been restarted; both cases are no-ops.
pub fn respawn_player(state: &mut ArenaState, id: Uuid) -> Vec<Effect> {
    let Some(player) = state.players.get_mut(&id) else {
        return Vec::new();
    };
    if !player.dead {
        return Vec::new();
    }
    let position = state.maze.spawn_point(player.slot);
    player.health = MAX_HEALTH;
    player.dead = false;
    player.position = position;
    vec![Effect::Broadcast(ServerMsg::PlayerRespawned { id, position })]
}

/// Shooter-reported hit on the monster. Wolf death never ends the round.
pub fn resolve_wolf_hit(state: &mut ArenaState, shooter: Uuid) -> Vec<Effect> {
    if state.game_over || state.monster.dead || !state.players.contains_key(&shooter) {
        return Vec::new();
    }
    let (health, died) = apply_damage(state.monster.health);
    state.monster.health = health;

    let mut effects = Vec::new();
    if died {
        state.monster.dead = true;
        effects.push(Effect::Broadcast(ServerMsg::WolfKilled { killer_id: shooter }));
        effects.push(Effect::After {
            delay: WOLF_RESPAWN_DELAY,
            cmd: ArenaCommand::RespawnWolf,
        });
    }
    effects
}

/// Deferred wolf respawn; skipped when a round restart already revived it.
pub fn respawn_wolf(state: &mut ArenaState) -> Vec<Effect> {
    if !state.monster.dead {
        return Vec::new();
    }
    state.monster = Monster::spawn(&state.maze);
    vec![Effect::Broadcast(ServerMsg::WolfRespawned {
        position: state.monster.position(),
        angle: state.monster.angle(),
    })]
}
