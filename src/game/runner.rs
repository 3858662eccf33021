//! Room task: owns one `Room`, serializes every mutation and drives the tick loop

use std::collections::HashMap;
use std::sync::atomic::{AtomicU8, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::util::time::unix_millis;
use crate::ws::protocol::{RoomSummary, ServerMsg};

use super::error::RoomError;
use super::room::{Room, RoomEffect, RoomPhase};
use super::Intent;

/// Queue depth for commands into one room
const COMMAND_CAPACITY: usize = 256;

/// Commands accepted by a room task
#[derive(Debug)]
pub enum RoomCommand {
    Join {
        player_id: Uuid,
        name: String,
        outbox: mpsc::Sender<ServerMsg>,
        reply: oneshot::Sender<Result<(), RoomError>>,
    },
    Leave {
        player_id: Uuid,
    },
    Intent {
        player_id: Uuid,
        intent: Intent,
    },
    ShieldExpired {
        player_id: Uuid,
        epoch: u64,
    },
}

/// Lock-free view of a room for listings and health checks
#[derive(Debug, Default)]
pub struct RoomStatus {
    occupants: AtomicUsize,
    phase: AtomicU8,
}

impl RoomStatus {
    fn sync(&self, room: &Room) {
        self.occupants.store(room.players.len(), Ordering::Relaxed);
        self.phase.store(room.phase.as_u8(), Ordering::Relaxed);
    }
}

/// Handle to a running room
#[derive(Debug, Clone)]
pub struct RoomHandle {
    pub code: Arc<str>,
    commands: mpsc::Sender<RoomCommand>,
    status: Arc<RoomStatus>,
}

impl RoomHandle {
    pub fn occupants(&self) -> usize {
        self.status.occupants.load(Ordering::Relaxed)
    }

    pub fn phase(&self) -> RoomPhase {
        RoomPhase::from_u8(self.status.phase.load(Ordering::Relaxed))
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            code: self.code.to_string(),
            occupants: self.occupants(),
            phase: self.phase(),
        }
    }

    /// True once the room task has exited
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    /// Same task behind both handles
    pub fn same_room(&self, other: &RoomHandle) -> bool {
        Arc::ptr_eq(&self.status, &other.status)
    }

    /// Seat a player. Messages for them go to `outbox` from now on.
    pub async fn join(
        &self,
        player_id: Uuid,
        name: String,
        outbox: mpsc::Sender<ServerMsg>,
    ) -> Result<(), RoomError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(RoomCommand::Join {
                player_id,
                name,
                outbox,
                reply,
            })
            .await
            .map_err(|_| RoomError::NotFound(self.code.to_string()))?;

        response
            .await
            .unwrap_or_else(|_| Err(RoomError::NotFound(self.code.to_string())))
    }

    pub async fn leave(&self, player_id: Uuid) {
        if self.commands.send(RoomCommand::Leave { player_id }).await.is_err() {
            debug!(room = %self.code, player_id = %player_id, "Leave after room closed");
        }
    }

    pub async fn intent(&self, player_id: Uuid, intent: Intent) {
        if self
            .commands
            .send(RoomCommand::Intent { player_id, intent })
            .await
            .is_err()
        {
            debug!(room = %self.code, player_id = %player_id, "Intent after room closed");
        }
    }
}

/// The authoritative room loop
pub struct RoomTask {
    room: Room,
    commands: mpsc::Receiver<RoomCommand>,
    timer_tx: mpsc::WeakSender<RoomCommand>,
    outboxes: HashMap<Uuid, mpsc::Sender<ServerMsg>>,
    /// Pending shield expiry per player, tagged with the epoch it was armed for
    shield_timers: HashMap<Uuid, (u64, JoinHandle<()>)>,
    status: Arc<RoomStatus>,
    tick_duration: Duration,
}

impl RoomTask {
    /// Create a room task and its handle. The task does nothing until `run` is polled.
    pub fn new(code: &str, tick_duration: Duration) -> (Self, RoomHandle) {
        let (commands_tx, commands) = mpsc::channel(COMMAND_CAPACITY);
        let status = Arc::new(RoomStatus::default());
        let room = Room::new(code);
        status.sync(&room);

        let handle = RoomHandle {
            code: Arc::from(code),
            commands: commands_tx.clone(),
            status: status.clone(),
        };

        let task = Self {
            room,
            commands,
            timer_tx: commands_tx.downgrade(),
            outboxes: HashMap::new(),
            shield_timers: HashMap::new(),
            status,
            tick_duration,
        };

        (task, handle)
    }

    /// Process commands and ticks until the last occupant leaves
    pub async fn run(mut self) {
        info!(room = %self.room.code, "Room opened");

        let mut ticker = interval(self.tick_duration);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                command = self.commands.recv() => {
                    let Some(command) = command else {
                        break;
                    };
                    let was_active = self.room.is_active();
                    let departed = matches!(command, RoomCommand::Leave { .. });

                    self.handle_command(command);

                    if !was_active && self.room.is_active() {
                        ticker.reset();
                    }
                    if departed && self.room.is_empty() {
                        break;
                    }
                }
                _ = ticker.tick(), if self.room.is_active() => {
                    let effects = self.room.run_tick(unix_millis());
                    self.dispatch(effects);
                }
            }
            self.status.sync(&self.room);
        }

        for (_, (_, timer)) in self.shield_timers.drain() {
            timer.abort();
        }
        info!(room = %self.room.code, "Room closed");
    }

    fn handle_command(&mut self, command: RoomCommand) {
        let now = unix_millis();
        match command {
            RoomCommand::Join {
                player_id,
                name,
                outbox,
                reply,
            } => match self.room.join(player_id, name, now) {
                Ok(effects) => {
                    self.outboxes.insert(player_id, outbox);
                    let _ = reply.send(Ok(()));
                    self.dispatch(effects);
                }
                Err(err) => {
                    debug!(room = %self.room.code, player_id = %player_id, error = %err, "Join rejected");
                    let _ = reply.send(Err(err));
                }
            },
            RoomCommand::Leave { player_id } => {
                self.outboxes.remove(&player_id);
                let effects = self.room.leave(player_id, now);
                self.dispatch(effects);
            }
            RoomCommand::Intent { player_id, intent } => {
                let effects = self.room.handle_intent(player_id, intent, now);
                self.dispatch(effects);
            }
            RoomCommand::ShieldExpired { player_id, epoch } => {
                // A stale expiry must not forget the newer timer
                if self.shield_timers.get(&player_id).is_some_and(|(armed, _)| *armed == epoch) {
                    self.shield_timers.remove(&player_id);
                }
                self.room.expire_shield(player_id, epoch);
            }
        }
    }

    fn dispatch(&mut self, effects: Vec<RoomEffect>) {
        for effect in effects {
            match effect {
                RoomEffect::Send { to, msg } => {
                    if let Some(outbox) = self.outboxes.get(&to) {
                        deliver(&self.room.code, to, outbox, msg);
                    }
                }
                RoomEffect::Broadcast(msg) => {
                    for (id, outbox) in &self.outboxes {
                        deliver(&self.room.code, *id, outbox, msg.clone());
                    }
                }
                RoomEffect::BroadcastExcept { except, msg } => {
                    for (id, outbox) in self.outboxes.iter().filter(|(id, _)| **id != except) {
                        deliver(&self.room.code, *id, outbox, msg.clone());
                    }
                }
                RoomEffect::ScheduleShieldExpiry {
                    player_id,
                    epoch,
                    after,
                } => self.schedule_shield_expiry(player_id, epoch, after),
                RoomEffect::CancelShieldExpiry { player_id } => {
                    if let Some((_, timer)) = self.shield_timers.remove(&player_id) {
                        timer.abort();
                    }
                }
                RoomEffect::CancelAllShieldTimers => {
                    for (_, (_, timer)) in self.shield_timers.drain() {
                        timer.abort();
                    }
                }
            }
        }
    }

    fn schedule_shield_expiry(&mut self, player_id: Uuid, epoch: u64, after: Duration) {
        let commands = self.timer_tx.clone();
        let timer = tokio::spawn(async move {
            tokio::time::sleep(after).await;
            if let Some(commands) = commands.upgrade() {
                let _ = commands
                    .send(RoomCommand::ShieldExpired { player_id, epoch })
                    .await;
            }
        });

        if let Some((_, previous)) = self.shield_timers.insert(player_id, (epoch, timer)) {
            previous.abort();
        }
    }
}

/// Non-blocking send; a slow client loses messages instead of stalling the room
fn deliver(room: &str, player_id: Uuid, outbox: &mpsc::Sender<ServerMsg>, msg: ServerMsg) {
    match outbox.try_send(msg) {
        Ok(()) => {}
        Err(mpsc::error::TrySendError::Full(_)) => {
            warn!(room = %room, player_id = %player_id, "Outbox full, dropping message");
        }
        Err(mpsc::error::TrySendError::Closed(_)) => {
            debug!(room = %room, player_id = %player_id, "Outbox closed");
        }
    }
}
