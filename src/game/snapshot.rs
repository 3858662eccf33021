//! Snapshot building for network transmission

use uuid::Uuid;

use crate::ws::protocol::{
    BroadcastState, GameSnapshot, OpponentSnapshot, OpponentView, PlayerSnapshot,
};

use super::room::Room;
use super::rules::MAX_HEALTH;
use super::state::PlayerState;

/// Builds wire snapshots from room state
pub struct SnapshotBuilder;

impl SnapshotBuilder {
    /// State as seen by `viewer`. The opponent collapses to a marker while out of sight.
    pub fn personalized(room: &Room, viewer: Uuid, now: u64) -> GameSnapshot {
        let you = room
            .player(viewer)
            .map(|p| Self::player_snapshot(p, now))
            .unwrap_or_else(|| Self::missing_player(viewer));

        let opponent = room.opponent_of(viewer).map(|p| {
            if room.visible {
                OpponentView::Visible(OpponentSnapshot {
                    visible: true,
                    player_id: p.id,
                    name: p.name.clone(),
                    x: p.position.x,
                    y: p.position.y,
                    angle: p.angle,
                    health: p.health,
                    max_health: MAX_HEALTH,
                    shield: p.shield,
                })
            } else {
                OpponentView::Hidden { visible: false }
            }
        });

        GameSnapshot {
            tick: room.tick,
            server_time: now,
            arena: room.arena,
            you,
            opponent,
            projectiles: room.projectiles.clone(),
            covers: room.covers.clone(),
            explosions: room.explosions.clone(),
        }
    }

    /// Full unfogged state, the same for every recipient
    pub fn broadcast(room: &Room, now: u64) -> BroadcastState {
        BroadcastState {
            tick: room.tick,
            arena: room.arena,
            players: room
                .players
                .iter()
                .map(|p| Self::player_snapshot(p, now))
                .collect(),
            projectiles: room.projectiles.clone(),
            covers: room.covers.clone(),
            explosions: room.explosions.clone(),
        }
    }

    pub fn player_snapshot(player: &PlayerState, now: u64) -> PlayerSnapshot {
        PlayerSnapshot {
            player_id: player.id,
            name: player.name.clone(),
            x: player.position.x,
            y: player.position.y,
            angle: player.angle,
            health: player.health,
            max_health: MAX_HEALTH,
            points: player.points,
            shield: player.shield,
            reloading: player.reloading,
            reload_progress: player.reload_progress(now),
            used_powerups: player.used_powerups,
            next_shot: player.next_shot,
        }
    }

    // Only reachable if a snapshot is requested for someone who already left
    fn missing_player(viewer: Uuid) -> PlayerSnapshot {
        Self::player_snapshot(&PlayerState::new(viewer, String::new(), 0), 0)
    }
}
