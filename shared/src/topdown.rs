//! Top-down character: free 2D movement with per-axis acceleration, look direction and
//! the same damage/death rules as the platformer.

use bevy::prelude::*;

use crate::config::{ColliderShape, ConfigError, TopDownConfig};
use crate::controls::ControlSnapshot;
use crate::events::{CharacterEvent, EventBuffer};
use crate::math::{move_towards, sign_or_positive};
use crate::vitals::{DamageOutcome, Vitals};

const MOVE_DEADZONE: f32 = 0.1;
/// Minimum speed before the look direction follows the velocity
const LOOK_THRESHOLD: f32 = 0.1;
/// Minimum |look.x| before the sprite side flips
const SIDE_THRESHOLD: f32 = 0.02;

#[derive(Component, Clone, Debug)]
pub struct TopDownCharacter {
    config: TopDownConfig,
    vitals: Vitals,
    events: EventBuffer,
    position: Vec2,
    velocity: Vec2,
    move_input: Vec2,
    look_at: Vec2,
    side: f32,
}

impl TopDownCharacter {
    pub fn new(config: TopDownConfig, position: Vec2) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            vitals: Vitals::new(config.max_hp, config.hit_cooldown, config.invulnerable),
            config,
            events: EventBuffer::default(),
            position,
            velocity: Vec2::ZERO,
            move_input: Vec2::ZERO,
            look_at: Vec2::ZERO,
            side: 1.0,
        })
    }

    /// Per-frame step: cooldown, controls, look direction.
    pub fn update(&mut self, controls: &ControlSnapshot, dt: f32) {
        if self.vitals.is_dead() {
            return;
        }
        self.vitals.tick(dt);
        self.move_input = controls.sanitized().move_vector;

        if self.velocity.length() > LOOK_THRESHOLD {
            self.look_at = self.velocity.normalize();
        }
        if self.look_at.x.abs() > SIDE_THRESHOLD {
            self.side = sign_or_positive(self.look_at.x);
        }
    }

    /// Fixed-rate step: each axis accelerates toward its target speed independently.
    pub fn fixed_update(&mut self, dt: f32) {
        if self.vitals.is_dead() {
            return;
        }
        self.velocity.x = self.axis_step(self.velocity.x, self.move_input.x, dt);
        self.velocity.y = self.axis_step(self.velocity.y, self.move_input.y, dt);
    }

    fn axis_step(&self, current: f32, input: f32, dt: f32) -> f32 {
        let active = input.abs() > MOVE_DEADZONE;
        let desired = if active { input * self.config.move_max } else { 0.0 };
        let rate = if active { self.config.move_accel } else { self.config.move_deccel };
        move_towards(current, desired, rate * dt)
    }

    pub fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        let outcome = self.vitals.take_damage(amount, &mut self.events);
        if outcome == DamageOutcome::Killed {
            self.stop();
        }
        outcome
    }

    pub fn heal_damage(&mut self, amount: f32) {
        self.vitals.heal(amount);
    }

    pub fn kill(&mut self) -> bool {
        let killed = self.vitals.kill(&mut self.events);
        if killed {
            self.stop();
        }
        killed
    }

    fn stop(&mut self) {
        self.velocity = Vec2::ZERO;
        self.move_input = Vec2::ZERO;
    }

    pub fn teleport(&mut self, position: Vec2) {
        self.position = position;
        self.velocity = Vec2::ZERO;
    }

    pub fn respawn(&mut self, position: Vec2) {
        self.vitals.revive();
        self.teleport(position);
        self.move_input = Vec2::ZERO;
    }

    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, CharacterEvent> {
        self.events.drain()
    }

    pub fn config(&self) -> &TopDownConfig {
        &self.config
    }

    pub fn collider(&self) -> &ColliderShape {
        &self.config.collider
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// Last meaningful movement direction (zero until the character first moves)
    pub fn facing(&self) -> Vec2 {
        self.look_at
    }

    /// +1 when the sprite should face right, -1 for left
    pub fn side(&self) -> f32 {
        self.side
    }

    pub fn health(&self) -> f32 {
        self.vitals.health()
    }

    pub fn max_health(&self) -> f32 {
        self.vitals.max_health()
    }

    pub fn is_dead(&self) -> bool {
        self.vitals.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DT: f32 = 0.02;

    fn walking(dir: Vec2) -> ControlSnapshot {
        ControlSnapshot {
            move_vector: dir,
            ..default()
        }
    }

    #[test]
    fn test_axes_accelerate_independently() {
        let mut ch = TopDownCharacter::new(TopDownConfig::default(), Vec2::ZERO).unwrap();
        ch.update(&walking(Vec2::new(1.0, -1.0)), DT);
        ch.fixed_update(DT);
        let step = ch.config().move_accel * DT;
        assert!((ch.velocity() - Vec2::new(step, -step)).length() < 1e-5);

        for _ in 0..200 {
            ch.fixed_update(DT);
        }
        let max = ch.config().move_max;
        assert_eq!(ch.velocity(), Vec2::new(max, -max));
    }

    #[test]
    fn test_deadzone_decelerates_to_rest() {
        let mut ch = TopDownCharacter::new(TopDownConfig::default(), Vec2::ZERO).unwrap();
        ch.update(&walking(Vec2::X), DT);
        for _ in 0..50 {
            ch.fixed_update(DT);
        }
        ch.update(&walking(Vec2::new(0.05, 0.0)), DT);
        for _ in 0..50 {
            ch.fixed_update(DT);
        }
        assert_eq!(ch.velocity(), Vec2::ZERO);
    }

    #[test]
    fn test_look_and_side_follow_velocity() {
        let mut ch = TopDownCharacter::new(TopDownConfig::default(), Vec2::ZERO).unwrap();
        assert_eq!(ch.facing(), Vec2::ZERO);
        assert_eq!(ch.side(), 1.0);

        ch.update(&walking(Vec2::NEG_X), DT);
        for _ in 0..10 {
            ch.fixed_update(DT);
        }
        ch.update(&walking(Vec2::NEG_X), DT);
        assert!((ch.facing() - Vec2::NEG_X).length() < 1e-5);
        assert_eq!(ch.side(), -1.0);

        // Walking straight up keeps the last side
        ch.update(&walking(Vec2::Y), DT);
        for _ in 0..100 {
            ch.fixed_update(DT);
        }
        ch.update(&walking(Vec2::Y), DT);
        assert_eq!(ch.side(), -1.0);
    }

    #[test]
    fn test_kill_stops_and_blocks() {
        let mut ch = TopDownCharacter::new(TopDownConfig::default(), Vec2::ZERO).unwrap();
        ch.update(&walking(Vec2::X), DT);
        ch.fixed_update(DT);
        assert!(ch.kill());
        assert!(!ch.kill());
        assert_eq!(ch.velocity(), Vec2::ZERO);
        ch.update(&walking(Vec2::X), DT);
        ch.fixed_update(DT);
        assert_eq!(ch.velocity(), Vec2::ZERO);
        assert_eq!(ch.drain_events().collect::<Vec<_>>(), vec![CharacterEvent::Death]);
    }
}
