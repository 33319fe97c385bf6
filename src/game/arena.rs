//! Arena state and the owning actor task
//!
//! One tokio task owns the whole game instance; everything else reaches it
//! through [`ArenaCommand`] messages, so every state transition runs to
//! completion before the next is dequeued. State-mutating methods return
//! [`Effect`] lists (sends, broadcasts, deferred commands) that the actor
//! loop executes, which keeps the game logic synchronous and testable.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use tokio::sync::mpsc;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};
use uuid::Uuid;

use crate::config::Config;
use crate::game::combat::{self, MAX_HEALTH, START_LIVES};
use crate::game::maze::Maze;
use crate::game::monster::{self, Monster, MONSTER_TICK_MS};
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, PlayerInfo, Position, ServerMsg};

/// Chat lines are truncated to this many characters
pub const CHAT_MAX_LEN: usize = 200;

/// Authoritative per-player state
#[derive(Debug, Clone)]
pub struct Player {
    pub id: Uuid,
    pub slot: u8,
    pub position: Position,
    pub yaw: f32,
    pub health: i32,
    pub lives: u8,
    pub dead: bool,
}

impl Player {
    fn new(id: Uuid, slot: u8, spawn: Position) -> Self {
        Self {
            id,
            slot,
            position: spawn,
            yaw: 0.0,
            health: MAX_HEALTH,
            lives: START_LIVES,
            dead: false,
        }
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id,
            slot: self.slot,
            position: self.position,
            yaw: self.yaw,
            health: self.health,
            lives: self.lives,
            dead: self.dead,
        }
    }
}

/// Commands delivered to the arena task. Deferred work (respawns, the round
/// restart) re-enters through here carrying entity identity, never a live
/// reference, so a disconnected target is a lookup miss rather than a
/// dangling handle.
#[derive(Debug)]
pub enum ArenaCommand {
    Connect {
        id: Uuid,
        tx: mpsc::UnboundedSender<ServerMsg>,
    },
    Disconnect {
        id: Uuid,
    },
    Client {
        id: Uuid,
        msg: ClientMsg,
    },
    RespawnPlayer {
        id: Uuid,
    },
    RespawnWolf,
    Restart,
}

/// Side effects produced by a state transition
#[derive(Debug)]
pub enum Effect {
    /// Deliver to one connection
    Send { to: Uuid, msg: ServerMsg },
    /// Deliver to every connection
    Broadcast(ServerMsg),
    /// Deliver to every connection except one (movement never echoes back)
    BroadcastExcept { except: Uuid, msg: ServerMsg },
    /// Fire-and-forget timer re-entering the command queue
    After { delay: Duration, cmd: ArenaCommand },
}

/// The shared mutable registry: players, monster, round status.
pub struct ArenaState {
    pub maze: Maze,
    pub players: HashMap<Uuid, Player>,
    pub slots: [Option<Uuid>; 2],
    pub monster: Monster,
    pub game_over: bool,
    pub rng: ChaCha8Rng,
}

impl ArenaState {
    pub fn new(rooms: usize, cell_size: f32, seed: u64) -> Self {
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let maze = Maze::generate(rooms, cell_size, &mut rng);
        let monster = Monster::spawn(&maze);
        Self {
            maze,
            players: HashMap::new(),
            slots: [None, None],
            monster,
            game_over: false,
            rng,
        }
    }

    pub fn connected(&self) -> usize {
        self.players.len()
    }

    fn free_slot(&self) -> Option<u8> {
        self.slots.iter().position(|s| s.is_none()).map(|i| i as u8)
    }

    fn player_infos(&self) -> Vec<PlayerInfo> {
        let mut infos: Vec<PlayerInfo> = self.players.values().map(Player::info).collect();
        infos.sort_by_key(|p| p.slot);
        infos
    }

    /// Seat a new connection, or `None` when both slots are taken.
    pub fn handle_connect(&mut self, id: Uuid) -> Option<Vec<Effect>> {
        let slot = self.free_slot()?;
        self.slots[slot as usize] = Some(id);

        let player = Player::new(id, slot, self.maze.spawn_point(slot));
        let joined = player.info();
        self.players.insert(id, player);

        Some(vec![
            Effect::Send {
                to: id,
                msg: ServerMsg::Init {
                    my_id: id,
                    slot,
                    maze: self.maze.grid().to_vec(),
                    cell_size: self.maze.cell_size(),
                    players: self.player_infos(),
                    monster: self.monster.info(),
                },
            },
            Effect::BroadcastExcept {
                except: id,
                msg: ServerMsg::PlayerJoined { player: joined },
            },
        ])
    }

    pub fn handle_disconnect(&mut self, id: Uuid) -> Vec<Effect> {
        let Some(player) = self.players.remove(&id) else {
            return Vec::new();
        };
        self.slots[player.slot as usize] = None;
        if self.players.is_empty() {
            // A fresh joiner must not land in a finished round
            self.game_over = false;
        }
        vec![Effect::Broadcast(ServerMsg::PlayerLeft { id })]
    }

    pub fn handle_client(&mut self, id: Uuid, msg: ClientMsg) -> Vec<Effect> {
        match msg {
            ClientMsg::Move { position, yaw } => self.handle_move(id, position, yaw),
            ClientMsg::Shoot { origin, direction } => self.handle_shoot(id, origin, direction),
            ClientMsg::Hit { target_id } => combat::resolve_hit(self, id, target_id),
            ClientMsg::HitWolf => combat::resolve_wolf_hit(self, id),
            ClientMsg::Chat { text } => self.handle_chat(id, text),
        }
    }

    /// Overwrite position and yaw verbatim; the server is authoritative over
    /// combat, not movement. Dead or unknown senders are silently ignored.
    fn handle_move(&mut self, id: Uuid, position: Position, yaw: f32) -> Vec<Effect> {
        let Some(player) = self.players.get_mut(&id) else {
            return Vec::new();
        };
        if player.dead {
            return Vec::new();
        }
        player.position = position;
        player.yaw = yaw;
        vec![Effect::BroadcastExcept {
            except: id,
            msg: ServerMsg::PlayerMoved { id, position, yaw },
        }]
    }

    /// Relay only; each client simulates the bolt locally.
    fn handle_shoot(&mut self, id: Uuid, origin: [f32; 3], direction: [f32; 3]) -> Vec<Effect> {
        let Some(player) = self.players.get(&id) else {
            return Vec::new();
        };
        vec![Effect::Broadcast(ServerMsg::PlayerShot {
            shooter_id: id,
            slot: player.slot,
            origin,
            direction,
        })]
    }

    fn handle_chat(&mut self, id: Uuid, text: String) -> Vec<Effect> {
        let Some(player) = self.players.get(&id) else {
            return Vec::new();
        };
        let text: String = text.chars().take(CHAT_MAX_LEN).collect();
        vec![Effect::Broadcast(ServerMsg::ChatMsg {
            slot: player.slot,
            text,
        })]
    }

    /// Atomic round reset: new maze, everyone back to full health and lives
    /// at their slot spawn, monster back to its initial state.
    ///
    /// The deferred timer may fire after the finished round already dissolved
    /// (everyone left, the flag was cleared, fresh players joined); in that
    /// case it must not touch the new round.
    pub fn restart_round(&mut self) -> Vec<Effect> {
        if !self.game_over {
            return Vec::new();
        }
        let rooms = self.maze.rooms();
        let cell_size = self.maze.cell_size();
        self.maze = Maze::generate(rooms, cell_size, &mut self.rng);
        self.game_over = false;

        for player in self.players.values_mut() {
            player.health = MAX_HEALTH;
            player.lives = START_LIVES;
            player.dead = false;
            player.yaw = 0.0;
            player.position = self.maze.spawn_point(player.slot);
        }
        self.monster = Monster::spawn(&self.maze);

        vec![Effect::Broadcast(ServerMsg::GameRestart {
            maze: self.maze.grid().to_vec(),
            players: self.player_infos(),
            monster: self.monster.info(),
        })]
    }
}

/// Cloneable handle for connection handlers and the HTTP surface
#[derive(Clone)]
pub struct ArenaHandle {
    cmd_tx: mpsc::Sender<ArenaCommand>,
    player_count: Arc<AtomicUsize>,
}

impl ArenaHandle {
    pub async fn send(&self, cmd: ArenaCommand) {
        let _ = self.cmd_tx.send(cmd).await;
    }

    pub fn connected_players(&self) -> usize {
        self.player_count.load(Ordering::Relaxed)
    }
}

/// The arena actor: owns the state, the connection senders, and the 10 Hz
/// monster simulation tick.
pub struct Arena {
    state: ArenaState,
    cmd_rx: mpsc::Receiver<ArenaCommand>,
    cmd_tx: mpsc::Sender<ArenaCommand>,
    conns: HashMap<Uuid, mpsc::UnboundedSender<ServerMsg>>,
    player_count: Arc<AtomicUsize>,
}

impl Arena {
    pub fn new(config: &Config) -> (Self, ArenaHandle) {
        let (cmd_tx, cmd_rx) = mpsc::channel(256);
        let player_count = Arc::new(AtomicUsize::new(0));

        let handle = ArenaHandle {
            cmd_tx: cmd_tx.clone(),
            player_count: player_count.clone(),
        };

        let arena = Self {
            state: ArenaState::new(config.maze_rooms, config.cell_size, rand::random()),
            cmd_rx,
            cmd_tx,
            conns: HashMap::new(),
            player_count,
        };

        (arena, handle)
    }

    /// Run the arena loop: inbound commands and the monster tick interleave
    /// on one task, so no two mutations ever race.
    pub async fn run(mut self) {
        info!(
            rooms = self.state.maze.rooms(),
            side = self.state.maze.side(),
            "Arena started"
        );

        let mut tick = interval(Duration::from_millis(MONSTER_TICK_MS));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut last_tick = Instant::now();

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let now = Instant::now();
                    let dt = (now - last_tick).as_secs_f32();
                    last_tick = now;
                    let effects = monster::tick(&mut self.state, dt, unix_millis());
                    self.apply(effects);
                }
                cmd = self.cmd_rx.recv() => match cmd {
                    Some(cmd) => {
                        let effects = self.dispatch(cmd);
                        self.apply(effects);
                    }
                    None => {
                        info!("Arena command channel closed, shutting down");
                        break;
                    }
                }
            }
        }
    }

    fn dispatch(&mut self, cmd: ArenaCommand) -> Vec<Effect> {
        match cmd {
            ArenaCommand::Connect { id, tx } => match self.state.handle_connect(id) {
                Some(effects) => {
                    info!(player_id = %id, connected = self.state.connected(), "Player joined");
                    self.conns.insert(id, tx);
                    effects
                }
                None => {
                    debug!(player_id = %id, "Rejecting connection, arena full");
                    // Dropping the sender closes the session after this lands
                    let _ = tx.send(ServerMsg::GameFull);
                    Vec::new()
                }
            },
            ArenaCommand::Disconnect { id } => {
                if self.conns.remove(&id).is_some() {
                    info!(player_id = %id, "Player left");
                }
                self.state.handle_disconnect(id)
            }
            ArenaCommand::Client { id, msg } => self.state.handle_client(id, msg),
            ArenaCommand::RespawnPlayer { id } => combat::respawn_player(&mut self.state, id),
            ArenaCommand::RespawnWolf => combat::respawn_wolf(&mut self.state),
            ArenaCommand::Restart => self.state.restart_round(),
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::Send { to, msg } => {
                    if let Some(tx) = self.conns.get(&to) {
                        let _ = tx.send(msg);
                    }
                }
                Effect::Broadcast(msg) => {
                    for tx in self.conns.values() {
                        let _ = tx.send(msg.clone());
                    }
                }
                Effect::BroadcastExcept { except, msg } => {
                    for (id, tx) in &self.conns {
                        if *id != except {
                            let _ = tx.send(msg.clone());
                        }
                    }
                }
                Effect::After { delay, cmd } => {
                    let cmd_tx = self.cmd_tx.clone();
                    tokio::spawn(async move {
                        tokio::time::sleep(delay).await;
                        let _ = cmd_tx.send(cmd).await;
                    });
                }
            }
        }
        self.player_count
            .store(self.state.connected(), Ordering::Relaxed);
    }
}
