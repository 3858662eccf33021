//! Fixed-tick simulation and direct intent handlers

use std::time::Duration;

use tracing::debug;
use uuid::Uuid;

use crate::util::time::tick_delta;
use crate::ws::protocol::{EndReason, HitCause, ServerMsg};

use super::combat::{CombatSystem, HitResult};
use super::error::IntentError;
use super::geometry::{circle_vs_circle, rect_overlap, Vec2};
use super::physics::PhysicsSystem;
use super::room::{Room, RoomEffect};
use super::rules::{self, PLAYER_RADIUS, PROJECTILE_RADIUS};
use super::snapshot::SnapshotBuilder;
use super::state::{Explosion, Powerup, Projectile, ProjectileKind, ShotKind};
use super::visibility::line_of_sight;
use super::Intent;

/// First thing a projectile runs into during a step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Contact {
    None,
    OutOfBounds,
    Cover,
    Opponent(Uuid),
}

impl Room {
    /// Dispatch one intent. Rejections become an error message to the sender only;
    /// intents from players no longer in the room are dropped.
    pub fn handle_intent(&mut self, player_id: Uuid, intent: Intent, now: u64) -> Vec<RoomEffect> {
        if self.player(player_id).is_none() {
            return Vec::new();
        }

        let result = match intent {
            Intent::Move { dx, dy, .. } => {
                self.queue_move(player_id, dx, dy);
                Ok(Vec::new())
            }
            Intent::Aim { target } => {
                self.aim(player_id, target);
                Ok(Vec::new())
            }
            Intent::Shoot { target } => self.shoot(player_id, target, now),
            Intent::UsePowerup { powerup } => self.use_powerup(player_id, powerup),
            Intent::RematchVote => self.vote_rematch(player_id, now),
        };

        result.unwrap_or_else(|err| {
            debug!(room = %self.code, player_id = %player_id, reason = err.code(), "Intent rejected");
            vec![RoomEffect::Send {
                to: player_id,
                msg: ServerMsg::error(err.code(), err.to_string()),
            }]
        })
    }

    /// Set the held movement direction; a zero vector stops. Ignored outside a match.
    fn queue_move(&mut self, player_id: Uuid, dx: f32, dy: f32) {
        if !self.is_active() {
            return;
        }
        if let Some(player) = self.player_mut(player_id) {
            player.move_direction = PhysicsSystem::sanitize_direction(dx, dy);
        }
    }

    /// Face toward `target` immediately. Ignored outside a match.
    fn aim(&mut self, player_id: Uuid, target: Vec2) {
        if !self.is_active() || !target.is_finite() {
            return;
        }
        if let Some(player) = self.player_mut(player_id) {
            let delta = target - player.position;
            if !delta.is_zero() {
                player.angle = delta.angle();
            }
        }
    }

    /// Fire toward `target`, consuming any loaded modifier
    pub fn shoot(&mut self, player_id: Uuid, target: Vec2, now: u64) -> Result<Vec<RoomEffect>, IntentError> {
        if !self.is_active() {
            return Err(IntentError::MatchNotActive);
        }
        let Some(shooter) = self.player_mut(player_id) else {
            return Ok(Vec::new());
        };

        shooter.advance_reload(now);
        if shooter.reloading {
            return Err(IntentError::Reloading);
        }

        let delta = target - shooter.position;
        let angle = if delta.is_finite() && !delta.is_zero() {
            delta.angle()
        } else {
            shooter.angle
        };
        let origin = shooter.position;
        let kind = std::mem::take(&mut shooter.next_shot);

        shooter.angle = angle;
        shooter.reloading = true;
        shooter.last_shot_at = now;
        shooter.stats.shots_fired += 1;

        match kind {
            ShotKind::Laser => Ok(self.fire_laser(player_id, origin, angle, now)),
            ShotKind::Normal | ShotKind::Explosive => {
                let kind = if kind == ShotKind::Explosive {
                    ProjectileKind::Explosive
                } else {
                    ProjectileKind::Normal
                };
                let projectile = Projectile::new(player_id, origin, angle, kind, now);
                let msg = ServerMsg::ProjectileCreated {
                    projectile: projectile.clone(),
                };
                self.projectiles.push(projectile);
                // A hidden shooter's muzzle position is withheld; the opponent picks the
                // round up from snapshots once it is in flight.
                let effect = if self.visible {
                    RoomEffect::Broadcast(msg)
                } else {
                    RoomEffect::Send { to: player_id, msg }
                };
                Ok(vec![effect])
            }
        }
    }

    fn fire_laser(&mut self, shooter_id: Uuid, origin: Vec2, angle: f32, now: u64) -> Vec<RoomEffect> {
        let target = self.opponent_of(shooter_id).map(|p| (p.id, p.position));
        let trace = CombatSystem::trace_laser(
            &self.arena,
            &self.covers,
            origin,
            angle,
            target.map(|(_, pos)| pos),
        );

        let beam = |from: Option<Vec2>| ServerMsg::InstantProjectile {
            shooter_id,
            from,
            to: trace.end,
            hit: trace.hit,
            color: rules::LASER_COLOR,
        };
        let mut effects = if self.visible {
            vec![RoomEffect::Broadcast(beam(Some(origin)))]
        } else {
            vec![
                RoomEffect::Send {
                    to: shooter_id,
                    msg: beam(Some(origin)),
                },
                RoomEffect::BroadcastExcept {
                    except: shooter_id,
                    msg: beam(None),
                },
            ]
        };

        if let (true, Some((target_id, _))) = (trace.hit, target) {
            if let Some(hit) = CombatSystem::apply_damage(
                &mut self.players,
                target_id,
                rules::LASER_DAMAGE,
                Some(shooter_id),
                now,
            ) {
                self.record_shot_hit(shooter_id);
                effects.extend(self.conclude_hits(vec![hit], HitCause::Laser, now));
            }
        }
        effects
    }

    /// Activate a powerup by wire id
    pub fn use_powerup(&mut self, player_id: Uuid, powerup_id: u8) -> Result<Vec<RoomEffect>, IntentError> {
        if !self.is_active() {
            return Err(IntentError::MatchNotActive);
        }
        let powerup = Powerup::from_id(powerup_id).ok_or(IntentError::UnknownPowerup)?;
        let Some(player) = self.player_mut(player_id) else {
            return Ok(Vec::new());
        };

        CombatSystem::purchase_powerup(player, powerup)?;

        let mut effects = vec![RoomEffect::Send {
            to: player_id,
            msg: ServerMsg::PowerupConfirmed {
                powerup,
                points: player.points,
                used_powerups: player.used_powerups,
            },
        }];
        if powerup == Powerup::Shield {
            effects.push(RoomEffect::ScheduleShieldExpiry {
                player_id,
                epoch: player.shield_epoch,
                after: Duration::from_millis(rules::SHIELD_DURATION_MS),
            });
        }
        Ok(effects)
    }

    /// Shield timer fired. A departed player or a superseded epoch makes this a no-op.
    pub fn expire_shield(&mut self, player_id: Uuid, epoch: u64) {
        if let Some(player) = self.player_mut(player_id) {
            if CombatSystem::expire_shield(player, epoch) {
                debug!(player_id = %player_id, "Shield expired");
            }
        }
    }

    /// Run a single simulation tick
    pub fn run_tick(&mut self, now: u64) -> Vec<RoomEffect> {
        if !self.is_active() {
            return Vec::new();
        }

        let dt = tick_delta(self.last_tick_at, now);
        self.last_tick_at = now;
        self.tick += 1;

        let mut effects = self.update_projectiles(dt, now);
        if !self.is_active() {
            return effects;
        }

        self.apply_movement(dt);

        for player in &mut self.players {
            player.advance_reload(now);
        }

        self.update_visibility();

        for player in &self.players {
            effects.push(RoomEffect::Send {
                to: player.id,
                msg: ServerMsg::GameState(SnapshotBuilder::personalized(self, player.id, now)),
            });
        }

        self.explosions.clear();
        effects
    }

    fn update_projectiles(&mut self, dt: f32, now: u64) -> Vec<RoomEffect> {
        let mut effects = Vec::new();
        let in_flight = std::mem::take(&mut self.projectiles);
        let mut survivors = Vec::with_capacity(in_flight.len());

        for mut projectile in in_flight {
            if !self.is_active() {
                break;
            }

            let steps = projectile.substeps(dt);
            let step_dt = dt / steps as f32;
            let mut contact = Contact::None;
            for _ in 0..steps {
                projectile.integrate(step_dt);
                contact = self.contact(&projectile);
                if contact != Contact::None {
                    break;
                }
            }

            match contact {
                Contact::None => {}
                Contact::OutOfBounds => continue,
                Contact::Cover => {
                    if projectile.kind == ProjectileKind::Explosive {
                        effects.extend(self.detonate(&mut projectile, now));
                    }
                    continue;
                }
                Contact::Opponent(victim_id) => {
                    match projectile.kind {
                        ProjectileKind::Normal => {
                            if let Some(hit) = CombatSystem::apply_damage(
                                &mut self.players,
                                victim_id,
                                projectile.damage,
                                Some(projectile.owner_id),
                                now,
                            ) {
                                self.record_shot_hit(projectile.owner_id);
                                effects.extend(self.conclude_hits(vec![hit], HitCause::Projectile, now));
                            }
                        }
                        ProjectileKind::Explosive => {
                            effects.extend(self.detonate(&mut projectile, now));
                        }
                    }
                    continue;
                }
            }

            if projectile.fuse_expired(now) {
                effects.extend(self.detonate(&mut projectile, now));
                continue;
            }

            survivors.push(projectile);
        }

        if self.is_active() {
            self.projectiles = survivors;
        }
        effects
    }

    /// What a projectile touches at its current position. Bounds, then cover, then opponent.
    fn contact(&self, projectile: &Projectile) -> Contact {
        if !self.arena.contains(projectile.position) {
            return Contact::OutOfBounds;
        }

        let body = projectile.body();
        if self.covers.iter().any(|c| rect_overlap(&body, &c.rect)) {
            return Contact::Cover;
        }

        self.opponent_of(projectile.owner_id)
            .filter(|p| p.is_alive())
            .filter(|p| {
                circle_vs_circle(
                    p.position.distance(projectile.position),
                    PROJECTILE_RADIUS,
                    PLAYER_RADIUS,
                )
            })
            .map_or(Contact::None, |p| Contact::Opponent(p.id))
    }

    /// Explode an explosive projectile where it stands. At most once per projectile.
    fn detonate(&mut self, projectile: &mut Projectile, now: u64) -> Vec<RoomEffect> {
        if projectile.exploded {
            return Vec::new();
        }
        projectile.exploded = true;

        let center = projectile.position;
        self.explosions.push(Explosion {
            x: center.x,
            y: center.y,
            radius: rules::EXPLOSION_RADIUS,
        });

        let result = CombatSystem::resolve_explosion(
            &mut self.players,
            &mut self.covers,
            center,
            rules::EXPLOSION_RADIUS,
            projectile.damage,
            projectile.owner_id,
            now,
        );

        if !result.destroyed_covers.is_empty() {
            debug!(room = %self.code, covers = ?result.destroyed_covers, "Cover destroyed");
        }
        if result.hits.iter().any(|h| h.target_id != projectile.owner_id) {
            self.record_shot_hit(projectile.owner_id);
        }

        self.conclude_hits(result.hits, HitCause::Explosion, now)
    }

    fn record_shot_hit(&mut self, shooter_id: Uuid) {
        if let Some(shooter) = self.player_mut(shooter_id) {
            shooter.stats.shots_hit += 1;
        }
    }

    /// Announce hits and end the match if any was fatal.
    ///
    /// The winner is a surviving attacker who killed someone else; self-inflicted or
    /// mutual deaths have no winner.
    fn conclude_hits(&mut self, hits: Vec<HitResult>, cause: HitCause, now: u64) -> Vec<RoomEffect> {
        let mut effects: Vec<RoomEffect> = hits
            .iter()
            .map(|hit| {
                RoomEffect::Broadcast(ServerMsg::PlayerHit {
                    target_id: hit.target_id,
                    attacker_id: hit.attacker_id,
                    damage: hit.dealt,
                    absorbed: hit.absorbed,
                    health: hit.health,
                    shield: hit.shield,
                    attacker_points: hit.attacker_points,
                    cause,
                })
            })
            .collect();

        if hits.iter().any(|h| h.fatal) {
            let winner = hits
                .iter()
                .filter(|h| h.fatal)
                .filter_map(|h| h.attacker_id.filter(|a| *a != h.target_id))
                .find(|a| self.player(*a).is_some_and(|p| p.is_alive()));
            effects.extend(self.end_match(winner, EndReason::Eliminated, now));
        }
        effects
    }

    fn apply_movement(&mut self, dt: f32) {
        let arena = self.arena;
        for player in &mut self.players {
            let direction = player.move_direction;
            if direction.is_zero() {
                continue;
            }

            player.angle = direction.angle();
            let next = PhysicsSystem::step_player(player.position, direction, dt, &arena, &self.covers);
            player.stats.distance_traveled += player.position.distance(next);
            player.position = next;
        }
    }

    /// Recompute the shared line-of-sight bit
    pub(super) fn update_visibility(&mut self) {
        self.visible = match self.players.as_slice() {
            [a, b] => line_of_sight(a.position, b.position, &self.covers),
            _ => true,
        };
        for player in &mut self.players {
            player.sees_opponent = self.visible;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::room::RoomPhase;
    use crate::game::rules::{MAX_HEALTH, NORMAL_DAMAGE, RELOAD_MS};
    use crate::ws::protocol::OpponentView;

    /// Room with both players seated and the center cleared of cover
    fn open_arena() -> (Room, Uuid, Uuid) {
        let mut room = Room::new("QWERTY");
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());
        room.join(a, "a".into(), 0).unwrap();
        room.join(b, "b".into(), 0).unwrap();
        room.covers.clear();
        room.players[0].position = Vec2::new(200.0, 400.0);
        room.players[1].position = Vec2::new(400.0, 400.0);
        room.update_visibility();
        (room, a, b)
    }

    /// Advance `ticks` ticks of `step_ms` each starting after `from`
    fn run_ticks(room: &mut Room, from: u64, ticks: u64, step_ms: u64) -> u64 {
        let mut now = from;
        for _ in 0..ticks {
            now += step_ms;
            room.run_tick(now);
        }
        now
    }

    /// Advance `ms` in 16 ms ticks starting after `from`
    fn run_for(room: &mut Room, from: u64, ms: u64) -> (u64, Vec<RoomEffect>) {
        let mut now = from;
        let mut effects = Vec::new();
        while now < from + ms {
            now += 16;
            effects.extend(room.run_tick(now));
        }
        (now, effects)
    }

    fn errors_for(effects: &[RoomEffect], player: Uuid) -> Vec<String> {
        effects
            .iter()
            .filter_map(|e| match e {
                RoomEffect::Send { to, msg: ServerMsg::Error { code, .. } } if *to == player => {
                    Some(code.clone())
                }
                _ => None,
            })
            .collect()
    }

    #[test]
    fn test_normal_shot_hits_and_awards_points() {
        let (mut room, a, b) = open_arena();

        let effects = room.handle_intent(a, Intent::Shoot { target: Vec2::new(400.0, 400.0) }, 10);
        assert!(matches!(effects[0], RoomEffect::Broadcast(ServerMsg::ProjectileCreated { .. })));

        run_for(&mut room, 10, 500);
        assert_eq!(room.player(b).unwrap().health, MAX_HEALTH - NORMAL_DAMAGE);
        assert_eq!(room.player(a).unwrap().points, NORMAL_DAMAGE as u32);
        assert_eq!(room.player(a).unwrap().stats.shots_hit, 1);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_reload_blocks_second_shot() {
        let (mut room, a, _) = open_arena();
        let target = Intent::Shoot { target: Vec2::new(400.0, 400.0) };

        assert!(errors_for(&room.handle_intent(a, target, 100), a).is_empty());
        let effects = room.handle_intent(a, target, 100 + RELOAD_MS - 1);
        assert_eq!(errors_for(&effects, a), vec!["reloading".to_string()]);
        assert_eq!(room.projectiles.len(), 1);

        assert!(errors_for(&room.handle_intent(a, target, 100 + RELOAD_MS), a).is_empty());
        assert_eq!(room.player(a).unwrap().stats.shots_fired, 2);
    }

    #[test]
    fn test_projectile_blocked_by_cover() {
        let (mut room, a, b) = open_arena();
        room.covers = vec![crate::game::state::Cover {
            id: 9,
            rect: crate::game::geometry::Rect::new(290.0, 350.0, 20.0, 100.0),
        }];

        room.handle_intent(a, Intent::Shoot { target: Vec2::new(400.0, 400.0) }, 0);
        run_for(&mut room, 0, 500);

        assert_eq!(room.player(b).unwrap().health, MAX_HEALTH);
        assert!(room.projectiles.is_empty());
        // Normal rounds do not damage cover
        assert_eq!(room.covers.len(), 1);
    }

    #[test]
    fn test_projectile_culled_out_of_bounds() {
        let (mut room, a, _) = open_arena();
        room.handle_intent(a, Intent::Shoot { target: Vec2::new(200.0, 0.0) }, 0);
        assert_eq!(room.projectiles.len(), 1);
        run_for(&mut room, 0, 1_000);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_explosive_leaving_arena_is_culled_without_blast() {
        let (mut room, a, b) = open_arena();
        room.players[0].points = 100;
        room.players[1].position = Vec2::new(1000.0, 100.0);

        room.handle_intent(a, Intent::UsePowerup { powerup: 2 }, 0);
        room.players[0].position = Vec2::new(100.0, 20.0);
        room.handle_intent(a, Intent::Shoot { target: Vec2::new(101.0, 800.0) }, 0);
        assert_eq!(room.projectiles[0].kind, ProjectileKind::Explosive);

        // Out of bounds well before the fuse runs out
        let (_, effects) = run_for(&mut room, 0, 2_500);
        assert!(room.projectiles.is_empty());
        let hits = effects
            .iter()
            .filter(|e| matches!(e, RoomEffect::Broadcast(ServerMsg::PlayerHit { .. })))
            .count();
        assert_eq!(hits, 0);
        assert_eq!(room.player(b).unwrap().health, MAX_HEALTH);
    }

    #[test]
    fn test_explosive_fuse_expiry_forces_explosion() {
        let (mut room, a, _) = open_arena();
        let mut shell = Projectile::new(a, Vec2::new(600.0, 600.0), 0.0, ProjectileKind::Explosive, 0);
        shell.velocity = Vec2::ZERO;
        room.projectiles.push(shell);

        let mut exploded_ticks = 0;
        let mut now = 0;
        while now < rules::EXPLOSIVE_FUSE_MS + 200 {
            now += 16;
            room.run_tick(now);
            // Explosions are cleared after the snapshot, so count by projectile removal
            if room.projectiles.is_empty() {
                exploded_ticks += 1;
                break;
            }
        }
        assert_eq!(exploded_ticks, 1);
        assert!(room.explosions.is_empty());
    }

    #[test]
    fn test_explosion_reported_in_snapshot_then_cleared() {
        let (mut room, a, b) = open_arena();
        room.players[1].position = Vec2::new(260.0, 400.0);
        let mut shell = Projectile::new(a, Vec2::new(240.0, 400.0), 0.0, ProjectileKind::Explosive, 0);
        shell.velocity = Vec2::new(60.0, 0.0);
        room.projectiles.push(shell);

        let effects = room.run_tick(16);
        let snapshot = effects
            .iter()
            .find_map(|e| match e {
                RoomEffect::Send { to, msg: ServerMsg::GameState(s) } if *to == b => Some(s.clone()),
                _ => None,
            })
            .unwrap();
        assert_eq!(snapshot.explosions.len(), 1);
        assert!(room.explosions.is_empty());
        assert!(room.player(b).unwrap().health < MAX_HEALTH);
        // The owner was inside the blast too
        assert!(room.player(a).unwrap().health < MAX_HEALTH);
    }

    #[test]
    fn test_movement_wall_slide_in_tick() {
        let (mut room, a, _) = open_arena();
        room.covers = vec![crate::game::state::Cover {
            id: 0,
            rect: crate::game::geometry::Rect::new(220.0, 0.0, 40.0, 300.0),
        }];
        room.players[0].position = Vec2::new(200.0, 200.0);

        room.handle_intent(a, Intent::Move { dx: 1.0, dy: 1.0, dt: 0.016 }, 0);
        room.run_tick(16);

        let player = room.player(a).unwrap();
        assert_eq!(player.position.x, 200.0);
        assert!(player.position.y > 200.0);
        assert!((player.angle - std::f32::consts::FRAC_PI_4).abs() < 1e-5);
        assert!(player.stats.distance_traveled > 0.0);
    }

    #[test]
    fn test_move_direction_is_held_until_stopped() {
        let (mut room, a, _) = open_arena();
        room.handle_intent(a, Intent::Move { dx: 0.0, dy: 1.0, dt: 0.033 }, 0);

        // One intent, several ticks: the player keeps walking
        run_ticks(&mut room, 0, 3, 16);
        let after_three = room.player(a).unwrap().position.y;
        run_ticks(&mut room, 48, 3, 16);
        let after_six = room.player(a).unwrap().position.y;
        assert!(after_three > 400.0);
        assert!((after_six - 400.0 - 2.0 * (after_three - 400.0)).abs() < 1e-3);

        room.handle_intent(a, Intent::Move { dx: 0.0, dy: 0.0, dt: 0.033 }, 96);
        run_ticks(&mut room, 96, 3, 16);
        assert_eq!(room.player(a).unwrap().position.y, after_six);
    }

    #[test]
    fn test_long_ticks_do_not_carry_rounds_through_the_opponent() {
        let (mut room, a, b) = open_arena();
        room.players[1].position = Vec2::new(354.0, 400.0);

        room.handle_intent(a, Intent::Shoot { target: Vec2::new(354.0, 400.0) }, 0);
        run_ticks(&mut room, 0, 20, 100);

        assert_eq!(room.player(b).unwrap().health, MAX_HEALTH - NORMAL_DAMAGE);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_long_ticks_do_not_carry_rounds_through_cover() {
        let (mut room, a, b) = open_arena();
        room.players[1].position = Vec2::new(600.0, 400.0);
        room.covers = vec![crate::game::state::Cover {
            id: 3,
            rect: crate::game::geometry::Rect::new(326.0, 350.0, 40.0, 100.0),
        }];

        room.handle_intent(a, Intent::Shoot { target: Vec2::new(600.0, 400.0) }, 0);
        run_ticks(&mut room, 0, 20, 100);

        assert_eq!(room.player(b).unwrap().health, MAX_HEALTH);
        assert!(room.projectiles.is_empty());
    }

    #[test]
    fn test_hidden_shooter_position_is_withheld() {
        let (mut room, a, b) = open_arena();
        room.players[0].points = rules::LASER_COST;
        room.covers = vec![crate::game::state::Cover {
            id: 0,
            rect: crate::game::geometry::Rect::new(290.0, 300.0, 20.0, 200.0),
        }];
        room.update_visibility();
        assert!(!room.visible);

        let effects = room.handle_intent(a, Intent::Shoot { target: Vec2::new(400.0, 400.0) }, 0);
        assert!(matches!(
            effects.as_slice(),
            [RoomEffect::Send { to, msg: ServerMsg::ProjectileCreated { .. } }] if *to == a
        ));

        room.handle_intent(a, Intent::UsePowerup { powerup: 1 }, 0);
        let effects = room.handle_intent(a, Intent::Shoot { target: Vec2::new(400.0, 400.0) }, RELOAD_MS);
        assert!(effects.iter().any(|e| matches!(
            e,
            RoomEffect::BroadcastExcept { except, msg: ServerMsg::InstantProjectile { from: None, hit: false, .. } }
                if *except == a
        )));
        assert!(effects.iter().any(|e| matches!(
            e,
            RoomEffect::Send { to, msg: ServerMsg::InstantProjectile { from: Some(_), .. } } if *to == a
        )));
        assert!(!effects.iter().any(|e| matches!(
            e,
            RoomEffect::Send { to, msg: ServerMsg::InstantProjectile { .. } } if *to == b
        )));
    }

    #[test]
    fn test_aim_applies_immediately() {
        let (mut room, a, _) = open_arena();
        room.handle_intent(a, Intent::Aim { target: Vec2::new(200.0, 500.0) }, 0);
        let angle = room.player(a).unwrap().angle;
        assert!((angle - std::f32::consts::FRAC_PI_2).abs() < 1e-5);
    }

    #[test]
    fn test_intents_outside_match_rejected_or_ignored() {
        let mut room = Room::new("QWERTY");
        let a = Uuid::new_v4();
        room.join(a, "a".into(), 0).unwrap();

        let effects = room.handle_intent(a, Intent::Shoot { target: Vec2::new(1.0, 1.0) }, 0);
        assert_eq!(errors_for(&effects, a), vec!["match_not_active".to_string()]);

        assert!(room.handle_intent(a, Intent::Move { dx: 1.0, dy: 0.0, dt: 0.0 }, 0).is_empty());
        assert!(room.player(a).unwrap().move_direction.is_zero());

        // Unknown sender: nothing at all
        assert!(room
            .handle_intent(Uuid::new_v4(), Intent::Shoot { target: Vec2::ZERO }, 0)
            .is_empty());
    }

    #[test]
    fn test_powerup_errors_reach_only_the_sender() {
        let (mut room, a, b) = open_arena();
        let effects = room.handle_intent(a, Intent::UsePowerup { powerup: 1 }, 0);
        assert_eq!(errors_for(&effects, a), vec!["insufficient_points".to_string()]);
        assert!(errors_for(&effects, b).is_empty());

        let effects = room.handle_intent(a, Intent::UsePowerup { powerup: 7 }, 0);
        assert_eq!(errors_for(&effects, a), vec!["unknown_powerup".to_string()]);
    }

    #[test]
    fn test_shield_schedules_expiry_and_absorbs() {
        let (mut room, a, b) = open_arena();
        room.players[1].points = rules::SHIELD_COST;

        let effects = room.handle_intent(b, Intent::UsePowerup { powerup: 3 }, 0);
        let epoch = room.player(b).unwrap().shield_epoch;
        assert!(effects.contains(&RoomEffect::ScheduleShieldExpiry {
            player_id: b,
            epoch,
            after: Duration::from_millis(rules::SHIELD_DURATION_MS),
        }));

        room.handle_intent(a, Intent::Shoot { target: Vec2::new(400.0, 400.0) }, 0);
        run_for(&mut room, 0, 500);
        let target = room.player(b).unwrap();
        assert_eq!(target.health, MAX_HEALTH);
        assert_eq!(target.shield, rules::SHIELD_AMOUNT - NORMAL_DAMAGE);
        assert_eq!(room.player(a).unwrap().points, 0);

        room.expire_shield(b, epoch);
        assert_eq!(room.player(b).unwrap().shield, 0);

        // Stale timer for a departed player is harmless
        room.expire_shield(Uuid::new_v4(), epoch);
    }

    #[test]
    fn test_laser_hits_instantly() {
        let (mut room, a, b) = open_arena();
        room.players[0].points = rules::LASER_COST;
        room.handle_intent(a, Intent::UsePowerup { powerup: 1 }, 0);

        let effects = room.handle_intent(a, Intent::Shoot { target: Vec2::new(400.0, 400.0) }, 0);
        assert!(effects
            .iter()
            .any(|e| matches!(e, RoomEffect::Broadcast(ServerMsg::InstantProjectile { hit: true, .. }))));
        assert!(room.projectiles.is_empty());
        assert_eq!(room.player(b).unwrap().health, MAX_HEALTH - rules::LASER_DAMAGE);
        assert_eq!(room.player(a).unwrap().next_shot, ShotKind::Normal);
    }

    #[test]
    fn test_fatal_hit_ends_match_once_with_attacker_as_winner() {
        let (mut room, a, b) = open_arena();
        room.players[1].health = NORMAL_DAMAGE;

        room.handle_intent(a, Intent::Shoot { target: Vec2::new(400.0, 400.0) }, 0);
        let (_, effects) = run_for(&mut room, 0, 600);

        let game_overs: Vec<_> = effects
            .iter()
            .filter_map(|e| match e {
                RoomEffect::Broadcast(ServerMsg::GameOver { winner_id, .. }) => Some(*winner_id),
                _ => None,
            })
            .collect();
        assert_eq!(game_overs, vec![Some(a)]);
        assert_eq!(room.phase, RoomPhase::Ended);
        assert_eq!(room.player(b).unwrap().health, 0);
        assert_eq!(room.winner, Some(a));

        // The loop is idle once the match is over
        assert!(room.run_tick(10_000).is_empty());
    }

    #[test]
    fn test_self_inflicted_death_has_no_winner() {
        let (mut room, a, _) = open_arena();
        room.players[0].health = 5;
        let mut shell = Projectile::new(a, Vec2::new(200.0, 400.0), 0.0, ProjectileKind::Explosive, 0);
        shell.velocity = Vec2::ZERO;
        shell.created_at = 0;
        room.projectiles.push(shell);

        let effects = room.run_tick(rules::EXPLOSIVE_FUSE_MS);
        let winner = effects.iter().find_map(|e| match e {
            RoomEffect::Broadcast(ServerMsg::GameOver { winner_id, .. }) => Some(*winner_id),
            _ => None,
        });
        assert_eq!(winner, Some(None));
        assert_eq!(room.phase, RoomPhase::Ended);
    }

    #[test]
    fn test_fog_of_war_hides_opponent_behind_cover() {
        let (mut room, a, b) = open_arena();
        room.covers = vec![crate::game::state::Cover {
            id: 0,
            rect: crate::game::geometry::Rect::new(290.0, 300.0, 20.0, 200.0),
        }];

        let effects = room.run_tick(16);
        assert!(!room.visible);
        for effect in &effects {
            if let RoomEffect::Send { to, msg: ServerMsg::GameState(snapshot) } = effect {
                assert_eq!(snapshot.opponent, Some(OpponentView::Hidden { visible: false }));
                assert_eq!(snapshot.you.player_id, *to);
            }
        }

        room.covers.clear();
        let effects = room.run_tick(32);
        assert!(room.visible);
        let revealed = effects.iter().any(|e| {
            matches!(e, RoomEffect::Send { to, msg: ServerMsg::GameState(s) }
                if *to == a && matches!(&s.opponent, Some(OpponentView::Visible(o)) if o.player_id == b))
        });
        assert!(revealed);
    }
}
