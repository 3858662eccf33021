//! WebSocket upgrade handler and per-connection session

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Intent, RoomError, RoomHandle};
use crate::lobby::RoomRegistry;
use crate::util::rate_limit::PlayerRateLimiter;
use crate::util::time::unix_millis;
use crate::ws::protocol::{ClientMsg, ServerMsg};

/// WebSocket upgrade handler
pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

/// Handle the upgraded WebSocket connection
async fn handle_socket(socket: WebSocket, state: AppState) {
    let player_id = Uuid::new_v4();
    info!(player_id = %player_id, "New WebSocket connection");

    let (mut ws_sink, mut ws_stream) = socket.split();
    let (outbox, mut outbox_rx) = mpsc::channel::<ServerMsg>(state.config.outbox_capacity);

    // Writer task: outbox -> WebSocket
    let writer_handle = tokio::spawn(async move {
        while let Some(msg) = outbox_rx.recv().await {
            if let Err(e) = send_msg(&mut ws_sink, &msg).await {
                debug!(player_id = %player_id, error = %e, "WebSocket send failed");
                break;
            }
        }
    });

    let mut session = Session::new(player_id, state.rooms.clone(), outbox);
    session.send(ServerMsg::Welcome {
        player_id,
        server_time: unix_millis(),
    });

    // Reader loop: WebSocket -> session
    while let Some(result) = ws_stream.next().await {
        match result {
            Ok(Message::Text(text)) => match serde_json::from_str::<ClientMsg>(&text) {
                Ok(client_msg) => session.handle(client_msg).await,
                Err(e) => {
                    warn!(player_id = %player_id, error = %e, "Failed to parse client message");
                    session.send(ServerMsg::error("bad_message", "Unrecognized message"));
                }
            },
            Ok(Message::Binary(_)) => {
                warn!(player_id = %player_id, "Received binary message, ignoring");
            }
            Ok(Message::Ping(_)) | Ok(Message::Pong(_)) => {}
            Ok(Message::Close(_)) => {
                info!(player_id = %player_id, "Client initiated close");
                break;
            }
            Err(e) => {
                error!(player_id = %player_id, error = %e, "WebSocket error");
                break;
            }
        }
    }

    // A dropped connection is a leave
    session.disconnect().await;
    writer_handle.abort();

    info!(player_id = %player_id, "WebSocket connection closed");
}

/// One connected client: at most one room at a time
pub struct Session {
    player_id: Uuid,
    rooms: RoomRegistry,
    outbox: mpsc::Sender<ServerMsg>,
    room: Option<RoomHandle>,
    rate_limiter: PlayerRateLimiter,
}

impl Session {
    pub fn new(player_id: Uuid, rooms: RoomRegistry, outbox: mpsc::Sender<ServerMsg>) -> Self {
        Self {
            player_id,
            rooms,
            outbox,
            room: None,
            rate_limiter: PlayerRateLimiter::new(),
        }
    }

    pub fn player_id(&self) -> Uuid {
        self.player_id
    }

    /// Code of the room this session sits in
    pub fn room_code(&self) -> Option<&str> {
        self.room.as_ref().map(|r| &*r.code)
    }

    /// Queue a message for this client; dropped if the client is not keeping up
    pub fn send(&self, msg: ServerMsg) {
        if self.outbox.try_send(msg).is_err() {
            debug!(player_id = %self.player_id, "Outbox unavailable, dropping message");
        }
    }

    pub async fn handle(&mut self, msg: ClientMsg) {
        if let Some(intent) = msg.intent() {
            self.forward_intent(intent).await;
            return;
        }

        match msg {
            ClientMsg::Ping { t } => self.send(ServerMsg::Pong { t }),
            ClientMsg::LeaveRoom => self.leave_room().await,
            lobby if !self.rate_limiter.check_lobby() => {
                warn!(player_id = %self.player_id, msg = ?lobby, "Rate limited lobby message");
                self.send(ServerMsg::error("rate_limited", "Too many requests"));
            }
            ClientMsg::CreateRoom { name } => {
                if self.room.is_some() {
                    return self.reject(RoomError::AlreadyInRoom);
                }
                let name = display_name(name, self.player_id);
                match self
                    .rooms
                    .create_room(self.player_id, name, self.outbox.clone())
                    .await
                {
                    Ok(handle) => self.room = Some(handle),
                    Err(err) => self.reject(err),
                }
            }
            ClientMsg::JoinRoom { code, name } => {
                if self.room.is_some() {
                    return self.reject(RoomError::AlreadyInRoom);
                }
                let name = display_name(name, self.player_id);
                match self
                    .rooms
                    .join_room(&code, self.player_id, name, self.outbox.clone())
                    .await
                {
                    Ok(handle) => self.room = Some(handle),
                    Err(err) => self.reject(err),
                }
            }
            ClientMsg::ListRooms => self.send(ServerMsg::RoomList {
                rooms: self.rooms.list_open_rooms(),
            }),
            ClientMsg::Move { .. }
            | ClientMsg::Aim { .. }
            | ClientMsg::Shoot { .. }
            | ClientMsg::UsePowerup { .. }
            | ClientMsg::RematchVote => {}
        }
    }

    async fn forward_intent(&mut self, intent: Intent) {
        if !self.rate_limiter.check_input() {
            warn!(player_id = %self.player_id, "Rate limited input message");
            return;
        }
        match &self.room {
            Some(room) => room.intent(self.player_id, intent).await,
            // Movement and aim stream continuously; only discrete actions get an answer
            None if matches!(intent, Intent::Move { .. } | Intent::Aim { .. }) => {}
            None => self.reject(RoomError::NotInRoom),
        }
    }

    async fn leave_room(&mut self) {
        match self.room.take() {
            Some(room) => {
                room.leave(self.player_id).await;
                self.send(ServerMsg::RoomLeft {
                    code: room.code.to_string(),
                });
            }
            None => self.reject(RoomError::NotInRoom),
        }
    }

    /// Leave without acknowledging; the client is gone
    pub async fn disconnect(&mut self) {
        if let Some(room) = self.room.take() {
            room.leave(self.player_id).await;
        }
    }

    fn reject(&self, err: RoomError) {
        debug!(player_id = %self.player_id, reason = err.code(), "Lobby request rejected");
        self.send(ServerMsg::error(err.code(), err.to_string()));
    }
}

fn display_name(name: String, player_id: Uuid) -> String {
    let name = name.trim();
    if name.is_empty() {
        format!("Player_{}", &player_id.simple().to_string()[..8])
    } else {
        name.chars().take(24).collect()
    }
}

/// Send a message over WebSocket
async fn send_msg(
    sink: &mut futures::stream::SplitSink<WebSocket, Message>,
    msg: &ServerMsg,
) -> Result<(), String> {
    let json = serde_json::to_string(msg).map_err(|e| e.to_string())?;
    sink.send(Message::Text(json))
        .await
        .map_err(|e| e.to_string())
}
