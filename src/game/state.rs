//! Authoritative per-room entities

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::geometry::{Rect, Vec2};
use super::rules::{
    self, ARENA_HEIGHT, ARENA_WIDTH, EXPLOSIVE_COST, LASER_COST, MAX_HEALTH, PLAYER_RADIUS,
    RELOAD_MS, SHIELD_COST,
};

/// Fixed arena bounds
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Arena {
    pub width: f32,
    pub height: f32,
}

impl Arena {
    /// True iff `p` lies inside the arena (edges inclusive)
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= 0.0 && p.x <= self.width && p.y >= 0.0 && p.y <= self.height
    }

    /// True iff a whole rectangle lies inside the arena
    pub fn contains_rect(&self, r: &Rect) -> bool {
        r.x >= 0.0 && r.y >= 0.0 && r.right() <= self.width && r.bottom() <= self.height
    }

    pub fn diagonal(&self) -> f32 {
        (self.width * self.width + self.height * self.height).sqrt()
    }
}

impl Default for Arena {
    fn default() -> Self {
        Self {
            width: ARENA_WIDTH,
            height: ARENA_HEIGHT,
        }
    }
}

/// Destructible rectangular obstacle
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Cover {
    pub id: u32,
    #[serde(flatten)]
    pub rect: Rect,
}

/// Build the initial cover set from the static layout
pub fn initial_covers() -> Vec<Cover> {
    rules::cover_layout()
        .into_iter()
        .enumerate()
        .map(|(i, rect)| Cover { id: i as u32, rect })
        .collect()
}

/// Purchasable one-shot powerups. Wire ids: 1 = laser, 2 = explosive, 3 = shield.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Powerup {
    Laser,
    Explosive,
    Shield,
}

impl Powerup {
    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            1 => Some(Self::Laser),
            2 => Some(Self::Explosive),
            3 => Some(Self::Shield),
            _ => None,
        }
    }

    pub fn cost(self) -> u32 {
        match self {
            Self::Laser => LASER_COST,
            Self::Explosive => EXPLOSIVE_COST,
            Self::Shield => SHIELD_COST,
        }
    }

    /// The next-shot modifier this powerup queues, if any
    pub fn shot_kind(self) -> Option<ShotKind> {
        match self {
            Self::Laser => Some(ShotKind::Laser),
            Self::Explosive => Some(ShotKind::Explosive),
            Self::Shield => None,
        }
    }
}

/// What the next shot does
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShotKind {
    #[default]
    Normal,
    Explosive,
    Laser,
}

/// Which powerups a player has spent this match
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct UsedPowerups {
    pub laser: bool,
    pub explosive: bool,
    pub shield: bool,
}

impl UsedPowerups {
    pub fn contains(&self, powerup: Powerup) -> bool {
        match powerup {
            Powerup::Laser => self.laser,
            Powerup::Explosive => self.explosive,
            Powerup::Shield => self.shield,
        }
    }

    pub fn insert(&mut self, powerup: Powerup) {
        match powerup {
            Powerup::Laser => self.laser = true,
            Powerup::Explosive => self.explosive = true,
            Powerup::Shield => self.shield = true,
        }
    }
}

/// Per-match statistics
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlayerStats {
    pub shots_fired: u32,
    pub shots_hit: u32,
    pub damage_dealt: i32,
    pub damage_taken: i32,
    pub distance_traveled: f32,
    pub powerups_used: u32,
    pub kills: u32,
    pub deaths: u32,
    /// Set when the player dies; alive time runs to match end otherwise
    pub death_time: Option<u64>,
}

impl PlayerStats {
    pub fn accuracy(&self) -> f32 {
        if self.shots_fired == 0 {
            0.0
        } else {
            self.shots_hit as f32 / self.shots_fired as f32
        }
    }
}

/// Player state in a room (authoritative)
#[derive(Debug, Clone)]
pub struct PlayerState {
    pub id: Uuid,
    pub name: String,
    /// Join order; selects the spawn point
    pub seat: usize,

    pub position: Vec2,
    pub angle: f32,

    pub health: i32,
    pub points: u32,
    pub shield: i32,
    /// Bumped on every shield grant and reset so stale expiry timers are ignored
    pub shield_epoch: u64,

    pub reloading: bool,
    pub last_shot_at: u64,

    pub used_powerups: UsedPowerups,
    pub next_shot: ShotKind,
    /// Whether the opponent is currently in line of sight
    pub sees_opponent: bool,

    /// Held movement direction, length at most 1. Zero means standing still.
    pub move_direction: Vec2,

    pub stats: PlayerStats,
}

impl PlayerState {
    pub fn new(id: Uuid, name: String, seat: usize) -> Self {
        Self {
            id,
            name,
            seat,
            position: rules::spawn_point(seat),
            angle: rules::spawn_angle(seat),
            health: MAX_HEALTH,
            points: 0,
            shield: 0,
            shield_epoch: 0,
            reloading: false,
            last_shot_at: 0,
            used_powerups: UsedPowerups::default(),
            next_shot: ShotKind::Normal,
            sees_opponent: true,
            move_direction: Vec2::ZERO,
            stats: PlayerStats::default(),
        }
    }

    /// Back to spawn with a fresh loadout, keeping identity, seat and shield epoch
    pub fn reset_for_match(&mut self) {
        let epoch = self.shield_epoch + 1;
        *self = Self {
            shield_epoch: epoch,
            ..Self::new(self.id, std::mem::take(&mut self.name), self.seat)
        };
    }

    pub fn is_alive(&self) -> bool {
        self.health > 0
    }

    /// Movement collision box
    pub fn body(&self) -> Rect {
        Rect::around(self.position, PLAYER_RADIUS)
    }

    /// Clears `reloading` once the reload duration has passed
    pub fn advance_reload(&mut self, now: u64) {
        if self.reloading && now.saturating_sub(self.last_shot_at) >= RELOAD_MS {
            self.reloading = false;
        }
    }

    /// Fraction of the reload completed, in `[0, 1]`
    pub fn reload_progress(&self, now: u64) -> f32 {
        if !self.reloading {
            return 1.0;
        }
        let elapsed = now.saturating_sub(self.last_shot_at) as f32;
        (elapsed / RELOAD_MS as f32).clamp(0.0, 1.0)
    }
}

/// Projectile kinds that exist as entities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectileKind {
    Normal,
    Explosive,
}

/// In-flight projectile
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Projectile {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub position: Vec2,
    pub velocity: Vec2,
    pub damage: i32,
    pub kind: ProjectileKind,
    pub color: &'static str,
    pub created_at: u64,
    #[serde(skip)]
    pub exploded: bool,
}

impl Projectile {
    pub fn new(owner_id: Uuid, origin: Vec2, angle: f32, kind: ProjectileKind, now: u64) -> Self {
        let (damage, color) = match kind {
            ProjectileKind::Normal => (rules::NORMAL_DAMAGE, rules::NORMAL_COLOR),
            ProjectileKind::Explosive => (rules::EXPLOSIVE_DAMAGE, rules::EXPLOSIVE_COLOR),
        };
        Self {
            id: Uuid::new_v4(),
            owner_id,
            position: origin,
            velocity: Vec2::from_angle(angle) * rules::PROJECTILE_SPEED,
            damage,
            kind,
            color,
            created_at: now,
            exploded: false,
        }
    }

    /// Advance by `dt` seconds
    pub fn integrate(&mut self, dt: f32) {
        self.position = self.position + self.velocity * dt;
    }

    /// Steps needed so a single step never moves farther than the projectile radius.
    /// Keeps long ticks from carrying a round through a player or a cover.
    pub fn substeps(&self, dt: f32) -> u32 {
        let travel = self.velocity.length() * dt;
        (travel / rules::PROJECTILE_RADIUS).ceil().max(1.0) as u32
    }

    /// Small box used for cover collision
    pub fn body(&self) -> Rect {
        Rect::around(self.position, rules::PROJECTILE_RADIUS)
    }

    pub fn fuse_expired(&self, now: u64) -> bool {
        self.kind == ProjectileKind::Explosive
            && now.saturating_sub(self.created_at) >= rules::EXPLOSIVE_FUSE_MS
    }
}

/// Transient blast, kept for exactly one snapshot
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Explosion {
    pub x: f32,
    pub y: f32,
    pub radius: f32,
}
