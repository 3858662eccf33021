//! Room state and lifecycle state machine
//!
//! `Room` is plain data plus transitions. Every transition returns the effects it
//! produced (messages and timer requests) instead of performing them, so the whole
//! lifecycle runs without a scheduler. `runner` owns a `Room` and carries the effects out.

use std::collections::HashSet;
use std::time::Duration;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::ws::protocol::{
    EndReason, MatchStats, OccupantInfo, PlayerMatchStats, ServerMsg,
};

use super::error::{IntentError, RoomError};
use super::snapshot::SnapshotBuilder;
use super::state::{initial_covers, Arena, Cover, Explosion, PlayerState, Projectile};

/// Most occupants a room holds
pub const ROOM_CAPACITY: usize = 2;

/// Room phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomPhase {
    /// Fewer than two occupants, no match yet
    Forming,
    /// Two occupants, match about to start
    Ready,
    /// Match in progress; the tick loop runs
    Active,
    /// Match over
    Ended,
    /// Match over and at least one rematch vote cast
    RematchPending,
}

impl RoomPhase {
    /// Compact encoding for lock-free status sharing
    pub fn as_u8(self) -> u8 {
        match self {
            Self::Forming => 0,
            Self::Ready => 1,
            Self::Active => 2,
            Self::Ended => 3,
            Self::RematchPending => 4,
        }
    }

    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Forming,
            1 => Self::Ready,
            2 => Self::Active,
            3 => Self::Ended,
            _ => Self::RematchPending,
        }
    }

    /// True while the room is waiting for a second occupant
    pub fn is_open(self) -> bool {
        matches!(self, Self::Forming | Self::Ready)
    }
}

/// Side effects requested by a room transition
#[derive(Debug, Clone, PartialEq)]
pub enum RoomEffect {
    /// Deliver to one occupant
    Send { to: Uuid, msg: ServerMsg },
    /// Deliver to every occupant
    Broadcast(ServerMsg),
    /// Deliver to every occupant except one
    BroadcastExcept { except: Uuid, msg: ServerMsg },
    /// Clear the player's shield after `after`, unless the epoch moved on
    ScheduleShieldExpiry {
        player_id: Uuid,
        epoch: u64,
        after: Duration,
    },
    /// Drop any pending shield timer for one player
    CancelShieldExpiry { player_id: Uuid },
    /// Drop every pending shield timer
    CancelAllShieldTimers,
}

/// Authoritative room state (owned by the room task)
#[derive(Debug)]
pub struct Room {
    pub code: String,
    pub phase: RoomPhase,
    pub arena: Arena,
    /// Occupants in join order
    pub players: Vec<PlayerState>,
    pub covers: Vec<Cover>,
    pub projectiles: Vec<Projectile>,
    pub explosions: Vec<Explosion>,
    pub rematch_votes: HashSet<Uuid>,
    pub tick: u64,
    pub winner: Option<Uuid>,
    /// Line of sight between the occupants as of the last tick
    pub visible: bool,
    pub(super) last_tick_at: u64,
    pub(super) started_at: u64,
    rematch_cancelled: bool,
}

impl Room {
    pub fn new(code: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            phase: RoomPhase::Forming,
            arena: Arena::default(),
            players: Vec::with_capacity(ROOM_CAPACITY),
            covers: initial_covers(),
            projectiles: Vec::new(),
            explosions: Vec::new(),
            rematch_votes: HashSet::new(),
            tick: 0,
            winner: None,
            visible: true,
            last_tick_at: 0,
            started_at: 0,
            rematch_cancelled: false,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    pub fn is_active(&self) -> bool {
        self.phase == RoomPhase::Active
    }

    pub fn player(&self, id: Uuid) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id == id)
    }

    pub fn player_mut(&mut self, id: Uuid) -> Option<&mut PlayerState> {
        self.players.iter_mut().find(|p| p.id == id)
    }

    /// The occupant other than `id`
    pub fn opponent_of(&self, id: Uuid) -> Option<&PlayerState> {
        self.players.iter().find(|p| p.id != id)
    }

    fn occupants(&self) -> Vec<OccupantInfo> {
        self.players.iter().map(occupant_info).collect()
    }

    /// Seat an occupant. The second arrival starts the match.
    pub fn join(&mut self, player_id: Uuid, name: String, now: u64) -> Result<Vec<RoomEffect>, RoomError> {
        if self.player(player_id).is_some() {
            return Err(RoomError::AlreadyInRoom);
        }
        if self.players.len() >= ROOM_CAPACITY {
            return Err(RoomError::Full(self.code.clone()));
        }
        if !self.phase.is_open() {
            return Err(RoomError::NotJoinable(self.code.clone()));
        }

        let seat = (0..ROOM_CAPACITY)
            .find(|s| self.players.iter().all(|p| p.seat != *s))
            .unwrap_or(0);
        let player = PlayerState::new(player_id, name, seat);
        let info = occupant_info(&player);
        self.players.push(player);
        self.players.sort_by_key(|p| p.seat);

        info!(
            room = %self.code,
            player_id = %player_id,
            occupants = self.players.len(),
            "Player joined room"
        );

        let mut effects = vec![
            RoomEffect::Send {
                to: player_id,
                msg: ServerMsg::RoomJoined {
                    code: self.code.clone(),
                    player_id,
                    seat,
                    occupants: self.occupants(),
                },
            },
            RoomEffect::BroadcastExcept {
                except: player_id,
                msg: ServerMsg::PlayerJoined { player: info },
            },
        ];

        if self.players.len() == ROOM_CAPACITY {
            self.phase = RoomPhase::Ready;
            effects.extend(self.start_match(now));
        }

        Ok(effects)
    }

    /// Remove an occupant. Unknown players are ignored.
    pub fn leave(&mut self, player_id: Uuid, now: u64) -> Vec<RoomEffect> {
        let Some(index) = self.players.iter().position(|p| p.id == player_id) else {
            return Vec::new();
        };
        self.players.remove(index);
        self.rematch_votes.remove(&player_id);

        info!(
            room = %self.code,
            player_id = %player_id,
            phase = ?self.phase,
            occupants = self.players.len(),
            "Player left room"
        );

        let mut effects = vec![
            RoomEffect::CancelShieldExpiry { player_id },
            RoomEffect::Broadcast(ServerMsg::PlayerLeft {
                player_id,
                reason: "left".to_string(),
            }),
        ];

        match self.phase {
            RoomPhase::Active => {
                let winner = self.players.first().map(|p| p.id);
                effects.extend(self.end_match(winner, EndReason::OpponentLeft, now));
            }
            RoomPhase::Forming | RoomPhase::Ready => {
                self.phase = RoomPhase::Forming;
            }
            RoomPhase::Ended | RoomPhase::RematchPending => {
                self.phase = RoomPhase::Ended;
                self.rematch_votes.clear();
                self.rematch_cancelled = true;
            }
        }

        effects
    }

    /// Record a rematch vote. Both distinct occupants must vote before a restart.
    pub fn vote_rematch(&mut self, player_id: Uuid, now: u64) -> Result<Vec<RoomEffect>, IntentError> {
        if !matches!(self.phase, RoomPhase::Ended | RoomPhase::RematchPending) {
            return Err(IntentError::NoMatchEnded);
        }
        if self.rematch_cancelled || self.players.len() < ROOM_CAPACITY {
            return Err(IntentError::RematchUnavailable);
        }

        if !self.rematch_votes.insert(player_id) {
            return Ok(vec![RoomEffect::Send {
                to: player_id,
                msg: self.vote_tally(),
            }]);
        }

        self.phase = RoomPhase::RematchPending;
        let mut effects = vec![RoomEffect::Broadcast(self.vote_tally())];

        let unanimous = self
            .players
            .iter()
            .all(|p| self.rematch_votes.contains(&p.id));
        if unanimous {
            info!(room = %self.code, "Rematch agreed");
            effects.extend(self.start_match(now));
        }

        Ok(effects)
    }

    fn vote_tally(&self) -> ServerMsg {
        ServerMsg::RematchVote {
            votes: self.rematch_votes.len(),
            needed: ROOM_CAPACITY,
        }
    }

    /// Reset everything to the start layout and enter Active
    pub(super) fn start_match(&mut self, now: u64) -> Vec<RoomEffect> {
        for player in &mut self.players {
            player.reset_for_match();
        }
        self.covers = initial_covers();
        self.projectiles.clear();
        self.explosions.clear();
        self.rematch_votes.clear();
        self.winner = None;
        self.tick = 0;
        self.last_tick_at = now;
        self.started_at = now;
        self.phase = RoomPhase::Active;
        self.update_visibility();

        info!(room = %self.code, "Match started");

        let mut effects = vec![RoomEffect::CancelAllShieldTimers];
        for player in &self.players {
            effects.push(RoomEffect::Send {
                to: player.id,
                msg: ServerMsg::GameStart(SnapshotBuilder::personalized(self, player.id, now)),
            });
        }
        effects
    }

    /// Stop the match and announce the result. Only the first call per match counts.
    pub(super) fn end_match(&mut self, winner: Option<Uuid>, reason: EndReason, now: u64) -> Vec<RoomEffect> {
        if self.phase != RoomPhase::Active {
            return Vec::new();
        }
        self.phase = RoomPhase::Ended;
        self.winner = winner;
        self.rematch_votes.clear();

        info!(
            room = %self.code,
            winner = ?winner,
            reason = ?reason,
            tick = self.tick,
            "Match ended"
        );

        vec![RoomEffect::Broadcast(ServerMsg::GameOver {
            winner_id: winner,
            reason,
            stats: self.build_match_stats(now),
            state: SnapshotBuilder::broadcast(self, now),
        })]
    }

    /// Build match stats
    pub fn build_match_stats(&self, now: u64) -> MatchStats {
        let duration_ms = now.saturating_sub(self.started_at);

        let player_stats = self
            .players
            .iter()
            .map(|p| {
                let alive_ms = p
                    .stats
                    .death_time
                    .map(|death| death.saturating_sub(self.started_at))
                    .unwrap_or(duration_ms);

                PlayerMatchStats {
                    player_id: p.id,
                    name: p.name.clone(),
                    shots_fired: p.stats.shots_fired,
                    shots_hit: p.stats.shots_hit,
                    accuracy: p.stats.accuracy(),
                    damage_dealt: p.stats.damage_dealt,
                    damage_taken: p.stats.damage_taken,
                    distance_traveled: p.stats.distance_traveled,
                    powerups_used: p.stats.powerups_used,
                    kills: p.stats.kills,
                    deaths: p.stats.deaths,
                    alive_time_secs: (alive_ms / 1000) as u32,
                }
            })
            .collect();

        MatchStats {
            duration_secs: (duration_ms / 1000) as u32,
            player_stats,
        }
    }
}

fn occupant_info(player: &PlayerState) -> OccupantInfo {
    OccupantInfo {
        player_id: player.id,
        name: player.name.clone(),
        seat: player.seat,
    }
}
