//! Time utilities for the room simulation

use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Get current Unix timestamp in milliseconds
pub fn unix_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or(Duration::ZERO)
        .as_millis() as u64
}

/// Server start time for uptime tracking
static SERVER_START: std::sync::OnceLock<Instant> = std::sync::OnceLock::new();

/// Initialize server start time (call once at startup)
pub fn init_server_time() {
    SERVER_START.get_or_init(Instant::now);
}

/// Get server uptime in seconds
pub fn uptime_secs() -> u64 {
    SERVER_START
        .get()
        .map(|start| start.elapsed().as_secs())
        .unwrap_or(0)
}

/// Default simulation rate
pub const SIMULATION_TPS: u32 = 60;

/// Longest frame the simulation will integrate in one tick (seconds).
/// Projectile flight is sub-stepped within it.
pub const MAX_TICK_DELTA: f32 = 0.1;

/// Tick period for a given rate
pub fn tick_duration(tps: u32) -> Duration {
    Duration::from_micros(1_000_000 / tps.max(1) as u64)
}

/// Seconds elapsed between two millisecond timestamps, clamped to `[0, MAX_TICK_DELTA]`
pub fn tick_delta(previous_ms: u64, now_ms: u64) -> f32 {
    let elapsed = now_ms.saturating_sub(previous_ms) as f32 / 1000.0;
    elapsed.min(MAX_TICK_DELTA)
}
