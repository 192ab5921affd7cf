//! Per-character tunables.
//!
//! Loaded from RON level files (every field is optional there) and validated once when a
//! character is spawned. After that they never change.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::probe::LayerMask;

/// Why a set of tunables was rejected at spawn time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ConfigError {
    /// Max health must be finite and strictly positive
    NonPositiveMaxHealth,
    /// A rate or speed was negative or not finite (field name attached)
    InvalidRate(&'static str),
    /// `jump_time_min` is larger than `jump_time_max`
    JumpWindowInverted,
    /// `crouch_coll_percent` must be in (0, 1]
    CrouchPercentOutOfRange,
    /// Collider size must be strictly positive on both axes
    DegenerateCollider,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::NonPositiveMaxHealth => write!(f, "max_hp must be > 0"),
            ConfigError::InvalidRate(field) => write!(f, "{field} must be a finite value >= 0"),
            ConfigError::JumpWindowInverted => write!(f, "jump_time_min must be <= jump_time_max"),
            ConfigError::CrouchPercentOutOfRange => write!(f, "crouch_coll_percent must be in (0, 1]"),
            ConfigError::DegenerateCollider => write!(f, "collider size must be > 0 on both axes"),
        }
    }
}

fn check_rate(field: &'static str, value: f32) -> Result<(), ConfigError> {
    if value.is_finite() && value >= 0.0 {
        Ok(())
    } else {
        Err(ConfigError::InvalidRate(field))
    }
}

fn check_health(max_hp: f32) -> Result<(), ConfigError> {
    if max_hp.is_finite() && max_hp > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::NonPositiveMaxHealth)
    }
}

/// Capsule collider approximated as a box: full size plus offset from the body position.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ColliderShape {
    pub size: Vec2,
    pub offset: Vec2,
}

impl Default for ColliderShape {
    fn default() -> Self {
        Self {
            size: Vec2::new(0.8, 1.6),
            offset: Vec2::ZERO,
        }
    }
}

impl ColliderShape {
    pub fn half_extents(&self) -> Vec2 {
        self.size * 0.5
    }

    /// The crouched version of this shape: shorter, and shifted down so the feet stay put.
    pub fn crouched(&self, percent: f32) -> Self {
        Self {
            size: Vec2::new(self.size.x, self.size.y * percent),
            offset: Vec2::new(
                self.offset.x,
                self.offset.y - self.size.y * (1.0 - percent) / 2.0,
            ),
        }
    }
}

/// Platformer character tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CharacterConfig {
    // Stats
    pub max_hp: f32,
    pub invulnerable: bool,
    /// Invulnerability window after a successful hit, in seconds
    pub hit_cooldown: f32,

    // Movement
    pub move_accel: f32,
    pub move_deccel: f32,
    pub move_max: f32,

    // Jump
    pub can_jump: bool,
    pub double_jump: bool,
    pub jump_strength: f32,
    pub jump_time_min: f32,
    pub jump_time_max: f32,
    pub jump_gravity: f32,
    pub jump_fall_gravity: f32,
    /// Horizontal acceleration multiplier while airborne
    pub jump_move_percent: f32,
    pub ground_layer: LayerMask,
    pub ground_raycast_dist: f32,

    // Crouch
    pub can_crouch: bool,
    pub crouch_coll_percent: f32,

    // Fall below level
    pub reset_when_fall: bool,
    pub fall_pos_y: f32,
    pub fall_damage_percent: f32,

    pub collider: ColliderShape,
}

impl Default for CharacterConfig {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            invulnerable: false,
            hit_cooldown: 1.0,
            move_accel: 40.0,
            move_deccel: 40.0,
            move_max: 5.0,
            can_jump: true,
            double_jump: true,
            jump_strength: 10.0,
            jump_time_min: 0.2,
            jump_time_max: 0.4,
            jump_gravity: 20.0,
            jump_fall_gravity: 40.0,
            jump_move_percent: 0.75,
            ground_layer: LayerMask::ALL,
            ground_raycast_dist: 0.1,
            can_crouch: true,
            crouch_coll_percent: 0.5,
            reset_when_fall: true,
            fall_pos_y: -5.0,
            fall_damage_percent: 0.25,
            collider: ColliderShape::default(),
        }
    }
}

impl CharacterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_health(self.max_hp)?;
        check_rate("hit_cooldown", self.hit_cooldown)?;
        check_rate("move_accel", self.move_accel)?;
        check_rate("move_deccel", self.move_deccel)?;
        check_rate("move_max", self.move_max)?;
        check_rate("jump_strength", self.jump_strength)?;
        check_rate("jump_time_min", self.jump_time_min)?;
        check_rate("jump_time_max", self.jump_time_max)?;
        check_rate("jump_gravity", self.jump_gravity)?;
        check_rate("jump_fall_gravity", self.jump_fall_gravity)?;
        check_rate("jump_move_percent", self.jump_move_percent)?;
        check_rate("ground_raycast_dist", self.ground_raycast_dist)?;
        check_rate("fall_damage_percent", self.fall_damage_percent)?;
        if !self.fall_pos_y.is_finite() {
            return Err(ConfigError::InvalidRate("fall_pos_y"));
        }
        if self.jump_time_min > self.jump_time_max {
            return Err(ConfigError::JumpWindowInverted);
        }
        if !(self.crouch_coll_percent > 0.0 && self.crouch_coll_percent <= 1.0) {
            return Err(ConfigError::CrouchPercentOutOfRange);
        }
        if !(self.collider.size.x > 0.0 && self.collider.size.y > 0.0) {
            return Err(ConfigError::DegenerateCollider);
        }
        Ok(())
    }
}

/// Top-down character tunables.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopDownConfig {
    pub max_hp: f32,
    pub invulnerable: bool,
    pub hit_cooldown: f32,
    pub move_accel: f32,
    pub move_deccel: f32,
    pub move_max: f32,
    pub collider: ColliderShape,
}

impl Default for TopDownConfig {
    fn default() -> Self {
        Self {
            max_hp: 100.0,
            invulnerable: false,
            hit_cooldown: 1.0,
            move_accel: 30.0,
            move_deccel: 30.0,
            move_max: 4.0,
            collider: ColliderShape {
                size: Vec2::new(0.8, 0.8),
                offset: Vec2::ZERO,
            },
        }
    }
}

impl TopDownConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_health(self.max_hp)?;
        check_rate("hit_cooldown", self.hit_cooldown)?;
        check_rate("move_accel", self.move_accel)?;
        check_rate("move_deccel", self.move_deccel)?;
        check_rate("move_max", self.move_max)?;
        if !(self.collider.size.x > 0.0 && self.collider.size.y > 0.0) {
            return Err(ConfigError::DegenerateCollider);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert_eq!(CharacterConfig::default().validate(), Ok(()));
        assert_eq!(TopDownConfig::default().validate(), Ok(()));
    }

    #[test]
    fn test_rejects_bad_tunables() {
        let mut cfg = CharacterConfig::default();
        cfg.max_hp = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::NonPositiveMaxHealth));

        let mut cfg = CharacterConfig::default();
        cfg.jump_time_min = 2.0;
        cfg.jump_time_max = 1.0;
        assert_eq!(cfg.validate(), Err(ConfigError::JumpWindowInverted));

        let mut cfg = CharacterConfig::default();
        cfg.move_accel = f32::NAN;
        assert_eq!(cfg.validate(), Err(ConfigError::InvalidRate("move_accel")));

        let mut cfg = CharacterConfig::default();
        cfg.crouch_coll_percent = 0.0;
        assert_eq!(cfg.validate(), Err(ConfigError::CrouchPercentOutOfRange));
    }

    #[test]
    fn test_partial_ron_uses_defaults() {
        let cfg: CharacterConfig = ron::from_str("(move_max: 7.5, double_jump: false)").unwrap();
        assert_eq!(cfg.move_max, 7.5);
        assert!(!cfg.double_jump);
        assert_eq!(cfg.max_hp, CharacterConfig::default().max_hp);
    }

    #[test]
    fn test_crouched_shape_keeps_feet() {
        let shape = ColliderShape {
            size: Vec2::new(1.0, 2.0),
            offset: Vec2::ZERO,
        };
        let crouched = shape.crouched(0.5);
        assert_eq!(crouched.size, Vec2::new(1.0, 1.0));
        // Bottom edge stays at -1.0
        assert!((crouched.offset.y - crouched.size.y / 2.0 - (-1.0)).abs() < 1e-6);
    }
}
