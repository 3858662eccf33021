//! Arena Duel Server - authoritative two-player arena rooms
//!
//! Each room runs as its own task with a fixed-rate simulation: movement with
//! wall sliding, projectiles, explosives with falloff, instant lasers, shields,
//! fog of war and a rematch lifecycle. Clients talk JSON over one WebSocket.

pub mod app;
pub mod config;
pub mod game;
pub mod http;
pub mod lobby;
pub mod util;
pub mod ws;
