//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use uuid::Uuid;

/// Sentinel identity used on the wire when the monster is killer or winner
pub const MONSTER_ID: &str = "monster";

/// World-space position in the maze
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Position {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

/// A combat participant: a player id, or the monster.
///
/// Serialized as the player's Uuid string, or the literal `"monster"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combatant {
    Player(Uuid),
    Monster,
}

impl Serialize for Combatant {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Combatant::Player(id) => id.serialize(serializer),
            Combatant::Monster => serializer.serialize_str(MONSTER_ID),
        }
    }
}

impl<'de> Deserialize<'de> for Combatant {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        if raw == MONSTER_ID {
            Ok(Combatant::Monster)
        } else {
            Uuid::parse_str(&raw)
                .map(Combatant::Player)
                .map_err(D::Error::custom)
        }
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ClientMsg {
    /// Position/orientation update; the server relays without validation
    Move { position: Position, yaw: f32 },

    /// A bolt was fired; relayed to every client which simulates it locally
    Shoot {
        origin: [f32; 3],
        direction: [f32; 3],
    },

    /// Shooter-reported hit on another player
    #[serde(rename_all = "camelCase")]
    Hit { target_id: Uuid },

    /// Shooter-reported hit on the monster
    HitWolf,

    /// Chat line; the server truncates to the protocol limit
    Chat { text: String },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ServerMsg {
    /// Full snapshot sent to a freshly accepted connection
    #[serde(rename_all = "camelCase")]
    Init {
        my_id: Uuid,
        slot: u8,
        maze: Vec<Vec<u8>>,
        cell_size: f32,
        players: Vec<PlayerInfo>,
        monster: MonsterInfo,
    },

    /// Both slots occupied; the connection is closed right after this
    GameFull,

    PlayerJoined {
        player: PlayerInfo,
    },

    PlayerLeft {
        id: Uuid,
    },

    PlayerMoved {
        id: Uuid,
        position: Position,
        yaw: f32,
    },

    #[serde(rename_all = "camelCase")]
    PlayerShot {
        shooter_id: Uuid,
        slot: u8,
        origin: [f32; 3],
        direction: [f32; 3],
    },

    #[serde(rename_all = "camelCase")]
    PlayerHit {
        target_id: Uuid,
        health: i32,
    },

    #[serde(rename_all = "camelCase")]
    PlayerKilled {
        target_id: Uuid,
        killer_id: Combatant,
        lives: u8,
    },

    PlayerRespawned {
        id: Uuid,
        position: Position,
    },

    #[serde(rename_all = "camelCase")]
    GameOver {
        loser_id: Uuid,
        winner_id: Combatant,
    },

    /// Round reset snapshot: fresh maze plus every reset entity
    GameRestart {
        maze: Vec<Vec<u8>>,
        players: Vec<PlayerInfo>,
        monster: MonsterInfo,
    },

    ChatMsg {
        slot: u8,
        text: String,
    },

    MonsterMoved {
        position: Position,
        angle: f32,
    },

    #[serde(rename_all = "camelCase")]
    WolfKilled {
        killer_id: Uuid,
    },

    WolfRespawned {
        position: Position,
        angle: f32,
    },
}

/// Full player state as shared with clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: Uuid,
    pub slot: u8,
    pub position: Position,
    pub yaw: f32,
    pub health: i32,
    pub lives: u8,
    pub dead: bool,
}

/// Monster pose as shared with clients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonsterInfo {
    pub position: Position,
    pub angle: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn client_events_use_wire_names() {
        let msg: ClientMsg = serde_json::from_str(
            r#"{"type":"move","position":{"x":4.0,"y":0.0,"z":8.0},"yaw":1.5}"#,
        )
        .unwrap();
        assert!(matches!(msg, ClientMsg::Move { .. }));

        let msg: ClientMsg =
            serde_json::from_str(r#"{"type":"shoot","origin":[0,1,2],"direction":[0,0,-1]}"#)
                .unwrap();
        assert!(matches!(msg, ClientMsg::Shoot { .. }));

        let id = Uuid::new_v4();
        let msg: ClientMsg =
            serde_json::from_str(&format!(r#"{{"type":"hit","targetId":"{id}"}}"#)).unwrap();
        assert!(matches!(msg, ClientMsg::Hit { target_id } if target_id == id));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"hitWolf"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::HitWolf));

        let msg: ClientMsg = serde_json::from_str(r#"{"type":"chat","text":"gg"}"#).unwrap();
        assert!(matches!(msg, ClientMsg::Chat { .. }));
    }

    #[test]
    fn server_events_use_wire_names() {
        let json = serde_json::to_string(&ServerMsg::GameFull).unwrap();
        assert_eq!(json, r#"{"type":"gameFull"}"#);

        let json = serde_json::to_string(&ServerMsg::PlayerHit {
            target_id: Uuid::nil(),
            health: 75,
        })
        .unwrap();
        assert!(json.contains(r#""type":"playerHit""#));
        assert!(json.contains(r#""targetId""#));

        let json = serde_json::to_string(&ServerMsg::MonsterMoved {
            position: Position::default(),
            angle: 0.0,
        })
        .unwrap();
        assert!(json.contains(r#""type":"monsterMoved""#));
    }

    #[test]
    fn monster_killer_serializes_as_sentinel() {
        let json = serde_json::to_string(&ServerMsg::PlayerKilled {
            target_id: Uuid::nil(),
            killer_id: Combatant::Monster,
            lives: 0,
        })
        .unwrap();
        assert!(json.contains(r#""killerId":"monster""#));

        let id = Uuid::new_v4();
        let json = serde_json::to_string(&Combatant::Player(id)).unwrap();
        assert_eq!(json, format!("\"{id}\""));
    }

    #[test]
    fn combatant_round_trips() {
        let back: Combatant = serde_json::from_str("\"monster\"").unwrap();
        assert_eq!(back, Combatant::Monster);

        let id = Uuid::new_v4();
        let back: Combatant = serde_json::from_str(&format!("\"{id}\"")).unwrap();
        assert_eq!(back, Combatant::Player(id));
    }

    #[test]
    fn init_uses_camel_case_fields() {
        let json = serde_json::to_string(&ServerMsg::Init {
            my_id: Uuid::nil(),
            slot: 0,
            maze: vec![vec![1, 0, 1]],
            cell_size: 4.0,
            players: vec![],
            monster: MonsterInfo {
                position: Position::default(),
                angle: 0.0,
            },
        })
        .unwrap();
        assert!(json.contains(r#""type":"init""#));
        assert!(json.contains(r#""myId""#));
        assert!(json.contains(r#""cellSize":4.0"#));
    }
}
