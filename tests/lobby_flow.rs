//! Lobby and room tasks driven through client sessions

use arena_duel_server::game::RoomPhase;
use arena_duel_server::lobby::code::CODE_ALPHABET;
use arena_duel_server::lobby::RoomRegistry;
use arena_duel_server::util::time::tick_duration;
use arena_duel_server::ws::handler::Session;
use arena_duel_server::ws::protocol::{ClientMsg, EndReason, ServerMsg};
use tokio::sync::mpsc;
use uuid::Uuid;

fn connect(rooms: &RoomRegistry) -> (Session, mpsc::Receiver<ServerMsg>) {
    let (tx, rx) = mpsc::channel(4096);
    (Session::new(Uuid::new_v4(), rooms.clone(), tx), rx)
}

async fn next_matching<F>(rx: &mut mpsc::Receiver<ServerMsg>, mut pred: F) -> ServerMsg
where
    F: FnMut(&ServerMsg) -> bool,
{
    loop {
        let msg = rx.recv().await.expect("outbox closed");
        if pred(&msg) {
            return msg;
        }
    }
}

#[tokio::test(start_paused = true)]
async fn two_clients_meet_and_play() {
    let rooms = RoomRegistry::new(tick_duration(60));
    let (mut ana, mut ana_rx) = connect(&rooms);
    let (mut bo, mut bo_rx) = connect(&rooms);

    ana.handle(ClientMsg::CreateRoom { name: "ana".into() }).await;
    let code = match ana_rx.recv().await {
        Some(ServerMsg::RoomCreated { code }) => code,
        other => panic!("expected roomCreated, got {other:?}"),
    };
    assert_eq!(code.len(), 6);
    assert!(code.bytes().all(|b| CODE_ALPHABET.contains(&b)));

    bo.handle(ClientMsg::ListRooms).await;
    let listed = next_matching(&mut bo_rx, |m| matches!(m, ServerMsg::RoomList { .. })).await;
    match listed {
        ServerMsg::RoomList { rooms } => {
            assert_eq!(rooms.len(), 1);
            assert_eq!(rooms[0].code, code);
            assert_eq!(rooms[0].phase, RoomPhase::Forming);
        }
        _ => unreachable!(),
    }

    bo.handle(ClientMsg::JoinRoom {
        code: code.clone(),
        name: "bo".into(),
    })
    .await;

    next_matching(&mut ana_rx, |m| matches!(m, ServerMsg::PlayerJoined { .. })).await;
    next_matching(&mut ana_rx, |m| matches!(m, ServerMsg::GameStart(_))).await;
    let start = next_matching(&mut bo_rx, |m| matches!(m, ServerMsg::GameStart(_))).await;
    if let ServerMsg::GameStart(snapshot) = start {
        assert_eq!(snapshot.you.player_id, bo.player_id());
        assert_eq!(snapshot.covers.len(), 7);
    }

    // Ticks are flowing
    next_matching(&mut bo_rx, |m| matches!(m, ServerMsg::GameState(_))).await;
    assert_eq!(rooms.get(&code).unwrap().phase(), RoomPhase::Active);
    assert!(rooms.list_open_rooms().is_empty());

    // Ana drops; Bo wins by default
    ana.disconnect().await;
    let over = next_matching(&mut bo_rx, |m| matches!(m, ServerMsg::GameOver { .. })).await;
    match over {
        ServerMsg::GameOver {
            winner_id, reason, ..
        } => {
            assert_eq!(winner_id, Some(bo.player_id()));
            assert_eq!(reason, EndReason::OpponentLeft);
        }
        _ => unreachable!(),
    }

    // The lone survivor cannot start a rematch
    bo.handle(ClientMsg::RematchVote).await;
    let err = next_matching(&mut bo_rx, |m| matches!(m, ServerMsg::Error { .. })).await;
    assert_eq!(err, ServerMsg::error("rematch_unavailable", "Opponent left; rematch is unavailable"));
}

#[tokio::test(start_paused = true)]
async fn full_room_turns_away_a_third_client() {
    let rooms = RoomRegistry::new(tick_duration(60));
    let (mut ana, mut ana_rx) = connect(&rooms);
    let (mut bo, _bo_rx) = connect(&rooms);
    let (mut cy, mut cy_rx) = connect(&rooms);

    ana.handle(ClientMsg::CreateRoom { name: "ana".into() }).await;
    let code = match ana_rx.recv().await {
        Some(ServerMsg::RoomCreated { code }) => code,
        other => panic!("expected roomCreated, got {other:?}"),
    };

    bo.handle(ClientMsg::JoinRoom {
        code: code.clone(),
        name: "bo".into(),
    })
    .await;
    cy.handle(ClientMsg::JoinRoom {
        code,
        name: "cy".into(),
    })
    .await;

    let err = next_matching(&mut cy_rx, |m| matches!(m, ServerMsg::Error { .. })).await;
    assert!(matches!(err, ServerMsg::Error { ref code, .. } if code == "room_full"));
    assert!(cy.room_code().is_none());
}
