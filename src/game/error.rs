//! Rejection reasons surfaced to the originating client

/// An intent that was rejected before any state was touched
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IntentError {
    #[error("Match is not in progress")]
    MatchNotActive,

    #[error("Weapon is reloading")]
    Reloading,

    #[error("Powerup already used this match")]
    PowerupAlreadyUsed,

    #[error("Not enough points")]
    InsufficientPoints,

    #[error("Unknown powerup")]
    UnknownPowerup,

    #[error("Another shot modifier is already loaded")]
    ModifierPending,

    #[error("No finished match to vote on")]
    NoMatchEnded,

    #[error("Opponent left; rematch is unavailable")]
    RematchUnavailable,
}

impl IntentError {
    /// Stable reason code for the wire
    pub fn code(&self) -> &'static str {
        match self {
            Self::MatchNotActive => "match_not_active",
            Self::Reloading => "reloading",
            Self::PowerupAlreadyUsed => "powerup_already_used",
            Self::InsufficientPoints => "insufficient_points",
            Self::UnknownPowerup => "unknown_powerup",
            Self::ModifierPending => "modifier_pending",
            Self::NoMatchEnded => "no_match_ended",
            Self::RematchUnavailable => "rematch_unavailable",
        }
    }
}

/// Control-plane failures (join/leave/lookup)
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room {0} not found")]
    NotFound(String),

    #[error("Room {0} is full")]
    Full(String),

    #[error("Room {0} is not accepting players")]
    NotJoinable(String),

    #[error("Already in a room")]
    AlreadyInRoom,

    #[error("Not in a room")]
    NotInRoom,
}

impl RoomError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "room_not_found",
            Self::Full(_) => "room_full",
            Self::NotJoinable(_) => "room_not_joinable",
            Self::AlreadyInRoom => "already_in_room",
            Self::NotInRoom => "not_in_room",
        }
    }
}
