//! Combat system - damage, shields, explosions, lasers, powerup economy

use uuid::Uuid;

use super::error::IntentError;
use super::geometry::{circle_vs_circle, Vec2};
use super::rules::{self, PLAYER_RADIUS};
use super::state::{Arena, Cover, PlayerState, Powerup, ShotKind};

/// Result of applying damage to one player
#[derive(Debug, Clone, PartialEq)]
pub struct HitResult {
    pub target_id: Uuid,
    pub attacker_id: Option<Uuid>,
    /// Damage before shields
    pub raw_damage: i32,
    /// Portion soaked by the shield
    pub absorbed: i32,
    /// Health actually removed
    pub dealt: i32,
    pub health: i32,
    pub shield: i32,
    /// Attacker's points after the hit (None for self-damage or unknown attacker)
    pub attacker_points: Option<u32>,
    pub fatal: bool,
}

/// Outcome of one explosion
#[derive(Debug, Clone, Default)]
pub struct ExplosionResult {
    pub hits: Vec<HitResult>,
    pub destroyed_covers: Vec<u32>,
}

/// Where a laser stopped and whether it connected
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LaserTrace {
    pub end: Vec2,
    pub hit: bool,
}

/// Combat rules over room state
pub struct CombatSystem;

impl CombatSystem {
    /// Split incoming damage into (absorbed by shield, passed through to health)
    pub fn absorb(shield: i32, damage: i32) -> (i32, i32) {
        let damage = damage.max(0);
        let absorbed = damage.min(shield.max(0));
        (absorbed, damage - absorbed)
    }

    /// Falloff damage at `distance` from an explosion center.
    /// Full at the epicenter, zero at and beyond the radius.
    pub fn explosion_damage(base: i32, distance: f32, radius: f32) -> i32 {
        if radius <= 0.0 || distance >= radius {
            return 0;
        }
        (base as f32 * (1.0 - distance / radius)).floor() as i32
    }

    /// Apply damage to `target_id`, shield first. The attacker earns the health removed,
    /// except for self-damage. Returns None if the target is not in the room.
    pub fn apply_damage(
        players: &mut [PlayerState],
        target_id: Uuid,
        raw_damage: i32,
        attacker_id: Option<Uuid>,
        now: u64,
    ) -> Option<HitResult> {
        let target = players.iter_mut().find(|p| p.id == target_id)?;
        if !target.is_alive() {
            return None;
        }

        let (absorbed, through) = Self::absorb(target.shield, raw_damage);
        target.shield -= absorbed;
        let dealt = through.min(target.health);
        target.health -= dealt;
        target.stats.damage_taken += dealt;

        let fatal = target.health == 0;
        if fatal {
            target.stats.deaths += 1;
            target.stats.death_time = Some(now);
        }
        let (health, shield) = (target.health, target.shield);

        let mut attacker_points = None;
        if let Some(attacker) = attacker_id
            .filter(|id| *id != target_id)
            .and_then(|id| players.iter_mut().find(|p| p.id == id))
        {
            attacker.points += dealt as u32;
            attacker.stats.damage_dealt += dealt;
            if fatal {
                attacker.stats.kills += 1;
            }
            attacker_points = Some(attacker.points);
        }

        Some(HitResult {
            target_id,
            attacker_id,
            raw_damage,
            absorbed,
            dealt,
            health,
            shield,
            attacker_points,
            fatal,
        })
    }

    /// Damage every player inside the blast with linear falloff and destroy every cover
    /// the blast reaches.
    pub fn resolve_explosion(
        players: &mut [PlayerState],
        covers: &mut Vec<Cover>,
        center: Vec2,
        radius: f32,
        base_damage: i32,
        owner_id: Uuid,
        now: u64,
    ) -> ExplosionResult {
        let mut result = ExplosionResult::default();

        let targets: Vec<(Uuid, i32)> = players
            .iter()
            .map(|p| {
                let damage =
                    Self::explosion_damage(base_damage, p.position.distance(center), radius);
                (p.id, damage)
            })
            .filter(|&(_, damage)| damage > 0)
            .collect();

        for (target_id, damage) in targets {
            if let Some(hit) = Self::apply_damage(players, target_id, damage, Some(owner_id), now) {
                result.hits.push(hit);
            }
        }

        covers.retain(|cover| {
            let reached = cover.rect.distance_to(center) <= radius;
            if reached {
                result.destroyed_covers.push(cover.id);
            }
            !reached
        });

        result
    }

    /// March a laser from `origin` along `angle`. Leaving the arena or entering cover
    /// stops it; the first sample within the target's hit radius is a hit.
    pub fn trace_laser(
        arena: &Arena,
        covers: &[Cover],
        origin: Vec2,
        angle: f32,
        target: Option<Vec2>,
    ) -> LaserTrace {
        let direction = Vec2::from_angle(angle);
        let steps = (arena.diagonal() / rules::LASER_STEP).ceil() as u32;
        let mut last = origin;

        for step in 1..=steps {
            let sample = origin + direction * (step as f32 * rules::LASER_STEP);

            if !arena.contains(sample) {
                return LaserTrace { end: last, hit: false };
            }
            if covers.iter().any(|c| c.rect.contains_point(sample)) {
                return LaserTrace { end: sample, hit: false };
            }
            if let Some(target) = target {
                if circle_vs_circle(sample.distance(target), 0.0, PLAYER_RADIUS) {
                    return LaserTrace { end: sample, hit: true };
                }
            }
            last = sample;
        }

        LaserTrace { end: last, hit: false }
    }

    /// Spend points on a powerup. Validates everything before mutating.
    pub fn purchase_powerup(player: &mut PlayerState, powerup: Powerup) -> Result<(), IntentError> {
        if player.used_powerups.contains(powerup) {
            return Err(IntentError::PowerupAlreadyUsed);
        }
        if player.points < powerup.cost() {
            return Err(IntentError::InsufficientPoints);
        }
        if powerup.shot_kind().is_some() && player.next_shot != ShotKind::Normal {
            return Err(IntentError::ModifierPending);
        }

        player.points -= powerup.cost();
        player.used_powerups.insert(powerup);
        player.stats.powerups_used += 1;

        match powerup.shot_kind() {
            Some(kind) => player.next_shot = kind,
            None => {
                player.shield = rules::SHIELD_AMOUNT;
                player.shield_epoch += 1;
            }
        }
        Ok(())
    }

    /// Drop an expired shield. Ignored if a newer grant or reset superseded `epoch`.
    pub fn expire_shield(player: &mut PlayerState, epoch: u64) -> bool {
        if player.shield_epoch != epoch {
            return false;
        }
        player.shield = 0;
        true
    }
}
