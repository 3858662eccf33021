//! Application state shared across routes

use std::sync::Arc;

use crate::config::Config;
use crate::lobby::RoomRegistry;
use crate::util::time::tick_duration;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub rooms: RoomRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let rooms = RoomRegistry::new(tick_duration(config.tick_rate));
        Self {
            config: Arc::new(config),
            rooms,
        }
    }
}
