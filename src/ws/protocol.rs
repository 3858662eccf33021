//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::geometry::Vec2;
use crate::game::state::{Arena, Cover, Explosion, Powerup, Projectile, ShotKind, UsedPowerups};
use crate::game::{Intent, RoomPhase};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ClientMsg {
    /// Open a new room and take its first seat
    CreateRoom {
        #[serde(default)]
        name: String,
    },

    /// Join an existing room by code
    JoinRoom {
        code: String,
        #[serde(default)]
        name: String,
    },

    /// Leave the current room
    LeaveRoom,

    /// List rooms waiting for a second player
    ListRooms,

    /// Movement direction for the next tick
    Move {
        dx: f32,
        dy: f32,
        /// Client frame time; the server integrates with its own tick delta
        #[serde(default)]
        dt: f32,
    },

    /// Face toward a point
    Aim { x: f32, y: f32 },

    /// Fire toward a point
    Shoot { x: f32, y: f32 },

    /// Activate a powerup (1 = laser, 2 = explosive, 3 = shield)
    UsePowerup { powerup: u8 },

    /// Vote to play again after a match ended
    RematchVote,

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

impl ClientMsg {
    /// The in-room intent carried by this message, if it is one
    pub fn intent(&self) -> Option<Intent> {
        match *self {
            ClientMsg::Move { dx, dy, dt } => Some(Intent::Move { dx, dy, dt }),
            ClientMsg::Aim { x, y } => Some(Intent::Aim {
                target: Vec2::new(x, y),
            }),
            ClientMsg::Shoot { x, y } => Some(Intent::Shoot {
                target: Vec2::new(x, y),
            }),
            ClientMsg::UsePowerup { powerup } => Some(Intent::UsePowerup { powerup }),
            ClientMsg::RematchVote => Some(Intent::RematchVote),
            ClientMsg::CreateRoom { .. }
            | ClientMsg::JoinRoom { .. }
            | ClientMsg::LeaveRoom
            | ClientMsg::ListRooms
            | ClientMsg::Ping { .. } => None,
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { player_id: Uuid, server_time: u64 },

    /// Room opened; the creator is already seated
    RoomCreated { code: String },

    /// Confirmation of room join
    RoomJoined {
        code: String,
        player_id: Uuid,
        seat: usize,
        occupants: Vec<OccupantInfo>,
    },

    /// The other occupant arrived
    PlayerJoined { player: OccupantInfo },

    /// The other occupant left
    PlayerLeft { player_id: Uuid, reason: String },

    /// Confirmation of leaving a room
    RoomLeft { code: String },

    /// Open rooms
    RoomList { rooms: Vec<RoomSummary> },

    /// Match started; personalized initial state
    GameStart(GameSnapshot),

    /// Per-tick personalized state
    GameState(GameSnapshot),

    /// A projectile was spawned
    ProjectileCreated { projectile: Projectile },

    /// A laser was fired and resolved instantly
    InstantProjectile {
        shooter_id: Uuid,
        /// Omitted for observers who cannot see the shooter
        #[serde(skip_serializing_if = "Option::is_none")]
        from: Option<Vec2>,
        to: Vec2,
        hit: bool,
        color: &'static str,
    },

    /// Damage landed
    PlayerHit {
        target_id: Uuid,
        attacker_id: Option<Uuid>,
        damage: i32,
        absorbed: i32,
        health: i32,
        shield: i32,
        attacker_points: Option<u32>,
        cause: HitCause,
    },

    /// Match has ended
    GameOver {
        winner_id: Option<Uuid>,
        reason: EndReason,
        stats: MatchStats,
        state: BroadcastState,
    },

    /// Powerup activation accepted
    PowerupConfirmed {
        powerup: Powerup,
        points: u32,
        used_powerups: UsedPowerups,
    },

    /// Rematch vote tally
    RematchVote { votes: usize, needed: usize },

    /// Error message
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl ServerMsg {
    pub fn error(code: &str, message: impl Into<String>) -> Self {
        ServerMsg::Error {
            code: code.to_string(),
            message: message.into(),
        }
    }
}

/// What dealt the damage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HitCause {
    Projectile,
    Explosion,
    Laser,
}

/// Why a match ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    Eliminated,
    OpponentLeft,
}

/// Occupant info for lobby/join
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OccupantInfo {
    pub player_id: Uuid,
    pub name: String,
    pub seat: usize,
}

/// Listing entry for an open room
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub code: String,
    pub occupants: usize,
    pub phase: RoomPhase,
}

/// Full state of one player
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerSnapshot {
    pub player_id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    /// Facing in radians
    pub angle: f32,
    pub health: i32,
    pub max_health: i32,
    pub points: u32,
    pub shield: i32,
    pub reloading: bool,
    /// 0 = just fired, 1 = ready
    pub reload_progress: f32,
    pub used_powerups: UsedPowerups,
    pub next_shot: ShotKind,
}

/// What an observer may know about its opponent
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum OpponentView {
    Visible(OpponentSnapshot),
    /// Fog of war: only the marker is sent
    Hidden { visible: bool },
}

/// Opponent details revealed while in line of sight
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpponentSnapshot {
    pub visible: bool,
    pub player_id: Uuid,
    pub name: String,
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    pub health: i32,
    pub max_health: i32,
    pub shield: i32,
}

/// Personalized per-observer state
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameSnapshot {
    pub tick: u64,
    pub server_time: u64,
    pub arena: Arena,
    pub you: PlayerSnapshot,
    pub opponent: Option<OpponentView>,
    pub projectiles: Vec<Projectile>,
    pub covers: Vec<Cover>,
    pub explosions: Vec<Explosion>,
}

/// Unfogged state, identical for every recipient
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BroadcastState {
    pub tick: u64,
    pub arena: Arena,
    pub players: Vec<PlayerSnapshot>,
    pub projectiles: Vec<Projectile>,
    pub covers: Vec<Cover>,
    pub explosions: Vec<Explosion>,
}

/// Match statistics at end
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchStats {
    pub duration_secs: u32,
    pub player_stats: Vec<PlayerMatchStats>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerMatchStats {
    pub player_id: Uuid,
    pub name: String,
    pub shots_fired: u32,
    pub shots_hit: u32,
    pub accuracy: f32,
    pub damage_dealt: i32,
    pub damage_taken: i32,
    pub distance_traveled: f32,
    pub powerups_used: u32,
    pub kills: u32,
    pub deaths: u32,
    pub alive_time_secs: u32,
}
