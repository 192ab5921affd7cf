//! Side-view platformer character: run, variable-height jump, double jump, crouch,
//! fall recovery and damage.
//!
//! The controller is engine-agnostic. Two entry points drive it:
//! - [`PlatformerCharacter::update`] once per rendered frame (controls, timers, fall check)
//! - [`PlatformerCharacter::fixed_update`] once per fixed tick (velocity, probes, jump, crouch)
//!
//! Integrating `velocity` into `position` is the caller's job (see `physics::move_body`).

use bevy::prelude::*;

use crate::config::{CharacterConfig, ColliderShape, ConfigError};
use crate::controls::ControlSnapshot;
use crate::events::{CharacterEvent, EventBuffer};
use crate::math::{move_towards, sign_or_positive};
use crate::probe::{detect_contact, GroundProbe, ProbeDirection};
use crate::vitals::{DamageOutcome, Vitals};

/// Stick deadzone for horizontal movement
const MOVE_DEADZONE: f32 = 0.1;
/// Stick threshold for crouching (downward)
const CROUCH_THRESHOLD: f32 = -0.1;
/// Stick threshold above which holding up requests a jump
const UP_JUMP_THRESHOLD: f32 = 0.5;
/// Minimum |velocity.x| before the facing flips
const FACING_THRESHOLD: f32 = 0.01;
/// Continuous ground time before the fall-recovery checkpoint is refreshed
const CHECKPOINT_DELAY: f32 = 1.0;

#[derive(Component, Clone, Debug)]
pub struct PlatformerCharacter {
    config: CharacterConfig,
    vitals: Vitals,
    events: EventBuffer,
    /// Our own entity, skipped by probes
    body: Option<Entity>,

    position: Vec2,
    velocity: Vec2,
    collider: ColliderShape,
    facing: f32,

    move_input: Vec2,
    jump_hold: bool,

    was_grounded: bool,
    is_grounded: bool,
    is_ceiled: bool,
    is_crouching: bool,
    is_jumping: bool,
    used_double_jump: bool,
    grounded_timer: f32,
    jump_timer: f32,

    last_ground_position: Vec2,
    average_ground_position: Vec2,
}

impl PlatformerCharacter {
    pub fn new(config: CharacterConfig, position: Vec2) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            vitals: Vitals::new(config.max_hp, config.hit_cooldown, config.invulnerable),
            collider: config.collider,
            config,
            events: EventBuffer::default(),
            body: None,
            position,
            velocity: Vec2::ZERO,
            facing: 1.0,
            move_input: Vec2::ZERO,
            jump_hold: false,
            was_grounded: false,
            is_grounded: false,
            is_ceiled: false,
            is_crouching: false,
            is_jumping: false,
            used_double_jump: false,
            grounded_timer: 0.0,
            jump_timer: 0.0,
            last_ground_position: position,
            average_ground_position: position,
        })
    }

    /// Tell the controller which entity it lives on so its own collider is never ground.
    pub fn attach_body(&mut self, entity: Entity) {
        self.body = Some(entity);
    }

    // ---------------------------------------------------------------------
    // Frame tick
    // ---------------------------------------------------------------------

    /// Per-frame step: timers, latch controls, jump requests, fall recovery.
    pub fn update(&mut self, controls: &ControlSnapshot, dt: f32) {
        if self.vitals.is_dead() {
            return;
        }

        self.vitals.tick(dt);
        self.grounded_timer += dt;

        let controls = controls.sanitized();
        self.move_input = controls.move_vector;
        self.jump_hold = controls.jump_held;

        // Up on the stick requests a jump on every frame it is held
        if controls.jump_pressed || controls.move_vector.y > UP_JUMP_THRESHOLD {
            self.jump(false);
        }

        if self.position.y < self.config.fall_pos_y - self.half_height() {
            let damage = self.config.max_hp * self.config.fall_damage_percent;
            self.take_damage(damage);
            if self.config.reset_when_fall {
                self.teleport(self.last_ground_position);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Fixed tick
    // ---------------------------------------------------------------------

    /// Fixed-rate step: horizontal velocity, facing, ground/ceiling probes, jump and crouch.
    pub fn fixed_update(&mut self, probe: &impl GroundProbe, dt: f32) {
        if self.vitals.is_dead() {
            return;
        }

        let active = self.move_input.x.abs() > MOVE_DEADZONE;
        let desired_speed = if active { self.move_input.x * self.config.move_max } else { 0.0 };
        let mut acceleration = if active { self.config.move_accel } else { self.config.move_deccel };
        if !self.is_grounded {
            acceleration *= self.config.jump_move_percent;
        }
        self.velocity.x = move_towards(self.velocity.x, desired_speed, acceleration * dt);

        self.update_facing();
        self.update_jump(probe, dt);
        self.update_crouch();
    }

    fn update_facing(&mut self) {
        if self.velocity.x.abs() > FACING_THRESHOLD {
            self.facing = sign_or_positive(self.velocity.x);
        }
    }

    fn update_jump(&mut self, probe: &impl GroundProbe, dt: f32) {
        self.was_grounded = self.is_grounded;
        self.is_grounded = self.detect(probe, ProbeDirection::Down);
        self.is_ceiled = self.detect(probe, ProbeDirection::Up);
        self.jump_timer += dt;

        // Variable height: release after the minimum, or hit the hard maximum
        if self.is_jumping && !self.jump_hold && self.jump_timer > self.config.jump_time_min {
            self.is_jumping = false;
        }
        if self.is_jumping && self.jump_timer > self.config.jump_time_max {
            self.is_jumping = false;
        }

        if self.is_ceiled {
            self.is_jumping = false;
            self.velocity.y = self.velocity.y.min(0.0);
        }

        if !self.is_grounded {
            // Falls faster than it rises
            let gravity = if self.is_jumping {
                self.config.jump_gravity
            } else {
                self.config.jump_fall_gravity
            };
            self.velocity.y = move_towards(self.velocity.y, -self.config.move_max * 2.0, gravity * dt);
            self.grounded_timer = 0.0;
        } else if !self.is_jumping {
            self.velocity.y = 0.0;
        }

        let landed = !self.was_grounded && self.is_grounded;
        if landed {
            self.average_ground_position = self.position;
        }
        if self.is_grounded {
            self.average_ground_position = self.average_ground_position.lerp(self.position, dt.min(1.0));
            if self.grounded_timer > CHECKPOINT_DELAY {
                self.last_ground_position = self.average_ground_position;
            }
        }
        if landed {
            self.events.push(CharacterEvent::Land);
        }
    }

    fn update_crouch(&mut self) {
        if !self.config.can_crouch {
            return;
        }

        let was_crouching = self.is_crouching;
        if self.move_input.y < CROUCH_THRESHOLD && self.is_grounded {
            self.is_crouching = true;
            self.velocity = Vec2::ZERO;
            self.collider = self.config.collider.crouched(self.config.crouch_coll_percent);
            if !was_crouching {
                self.events.push(CharacterEvent::Crouch);
            }
        } else {
            self.is_crouching = false;
            self.collider = self.config.collider;
        }
    }

    fn detect(&self, probe: &impl GroundProbe, direction: ProbeDirection) -> bool {
        detect_contact(
            probe,
            self.position,
            &self.collider,
            direction,
            self.config.ground_raycast_dist,
            self.config.ground_layer,
            self.body,
        )
    }

    // ---------------------------------------------------------------------
    // Actions
    // ---------------------------------------------------------------------

    /// Try to jump. Returns false (and changes nothing) when the jump isn't allowed.
    pub fn jump(&mut self, force_jump: bool) -> bool {
        if self.vitals.is_dead() || !self.config.can_jump {
            return false;
        }
        if self.is_crouching && !force_jump {
            return false;
        }
        let double_available = self.config.double_jump && !self.used_double_jump;
        if !(self.is_grounded || force_jump || double_available) {
            return false;
        }

        self.used_double_jump = !self.is_grounded;
        self.velocity.y = self.config.jump_strength;
        self.jump_timer = 0.0;
        self.is_jumping = true;
        self.events.push(CharacterEvent::Jump);
        true
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

    /// Terminal death. Only the first call has any effect.
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
        self.is_jumping = false;
    }

    /// Bring a character back at `position`: full health, fresh checkpoint, standing state.
    pub fn respawn(&mut self, position: Vec2) {
        self.vitals.revive();
        self.teleport(position);
        self.move_input = Vec2::ZERO;
        self.jump_hold = false;
        self.is_crouching = false;
        self.collider = self.config.collider;
        self.used_double_jump = false;
        self.grounded_timer = 0.0;
        self.last_ground_position = position;
        self.average_ground_position = position;
    }

    /// Write back the integrated position from the physics step.
    pub fn set_position(&mut self, position: Vec2) {
        self.position = position;
    }

    pub fn drain_events(&mut self) -> std::vec::Drain<'_, CharacterEvent> {
        self.events.drain()
    }

    // ---------------------------------------------------------------------
    // Queries
    // ---------------------------------------------------------------------

    pub fn config(&self) -> &CharacterConfig {
        &self.config
    }

    pub fn position(&self) -> Vec2 {
        self.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.velocity
    }

    /// +1 facing right, -1 facing left
    pub fn facing(&self) -> f32 {
        self.facing
    }

    pub fn collider(&self) -> &ColliderShape {
        &self.collider
    }

    pub fn size(&self) -> Vec2 {
        self.collider.size
    }

    fn half_height(&self) -> f32 {
        self.collider.size.y * 0.5
    }

    pub fn move_input(&self) -> Vec2 {
        self.move_input
    }

    pub fn is_jumping(&self) -> bool {
        self.is_jumping
    }

    pub fn is_grounded(&self) -> bool {
        self.is_grounded
    }

    pub fn was_grounded(&self) -> bool {
        self.was_grounded
    }

    pub fn is_ceiled(&self) -> bool {
        self.is_ceiled
    }

    pub fn is_crouching(&self) -> bool {
        self.is_crouching
    }

    pub fn used_double_jump(&self) -> bool {
        self.used_double_jump
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

    pub fn vitals(&self) -> &Vitals {
        &self.vitals
    }

    pub fn last_ground_position(&self) -> Vec2 {
        self.last_ground_position
    }

    pub fn average_ground_position(&self) -> Vec2 {
        self.average_ground_position
    }
}
