//! Follow camera: damped follow, optional lock target, bounds and screen shake.
//!
//! Pure state, no rendering. The client copies [`FollowCamera::view_position`] into the
//! camera's `Transform` every frame.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::f32::consts::PI;

use crate::math::smooth_damp;

/// Distance under which the camera doesn't bother moving
const FOLLOW_EPSILON: f32 = 0.1;
/// Shake amplitude per unit of intensity
const SHAKE_AMPLITUDE: f32 = 0.02;

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct CameraBounds {
    pub min: Vec2,
    pub max: Vec2,
}

impl CameraBounds {
    pub fn clamp(&self, point: Vec2) -> Vec2 {
        point.clamp(self.min, self.max.max(self.min))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum CameraLens {
    /// Half the visible height in world units
    Orthographic { size: f32 },
    /// Vertical field of view in degrees
    Perspective { fov_degrees: f32 },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CameraConfig {
    pub target_offset: Vec2,
    /// Per-axis smooth time in seconds
    pub smooth_time: Vec2,
    pub bounds: Option<CameraBounds>,
    pub lens: CameraLens,
    pub aspect: f32,
    /// Shake applied when the followed character is hit
    pub hit_shake: (f32, f32),
    /// Shake applied when the followed character dies
    pub death_shake: (f32, f32),
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            target_offset: Vec2::new(0.0, 1.0),
            smooth_time: Vec2::splat(0.2),
            bounds: None,
            lens: CameraLens::Orthographic { size: 5.0 },
            aspect: 16.0 / 9.0,
            hit_shake: (2.0, 0.5),
            death_shake: (4.0, 0.8),
        }
    }
}

#[derive(Component, Clone, Debug)]
pub struct FollowCamera {
    config: CameraConfig,
    /// Entity followed by default
    pub target: Option<Entity>,
    lock_target: Option<Vec2>,
    position: Vec3,
    velocity: Vec2,
    shake_timer: f32,
    shake_intensity: f32,
}

impl FollowCamera {
    pub fn new(config: CameraConfig, position: Vec3) -> Self {
        Self {
            config,
            target: None,
            lock_target: None,
            position,
            velocity: Vec2::ZERO,
            shake_timer: 0.0,
            shake_intensity: 1.0,
        }
    }

    /// Advance one frame toward `target` (ignored while locked).
    pub fn update(&mut self, target: Option<Vec2>, dt: f32) {
        if let Some(goal) = self.lock_target.or(target) {
            let goal = goal + self.config.target_offset;
            let diff = goal - self.position.truncate();
            if diff.length() > FOLLOW_EPSILON {
                let smooth = self.config.smooth_time;
                self.position.x = smooth_damp(self.position.x, goal.x, &mut self.velocity.x, smooth.x, dt);
                self.position.y = smooth_damp(self.position.y, goal.y, &mut self.velocity.y, smooth.y, dt);
            }
        }

        if let Some(bounds) = self.config.bounds {
            let clamped = bounds.clamp(self.position.truncate());
            self.position.x = clamped.x;
            self.position.y = clamped.y;
        }

        if self.shake_timer > 0.0 {
            self.shake_timer = (self.shake_timer - dt).max(0.0);
        }
    }

    /// Followed position with the current shake offset on top. Depth is left as constructed.
    pub fn view_position(&self) -> Vec3 {
        self.position + self.shake_offset()
    }

    pub fn shake_offset(&self) -> Vec3 {
        if self.shake_timer <= 0.0 {
            return Vec3::ZERO;
        }
        let t = self.shake_timer;
        Vec3::new(
            (t * PI * 8.0).cos() * SHAKE_AMPLITUDE,
            (t * PI * 7.0).sin() * SHAKE_AMPLITUDE,
            0.0,
        ) * self.shake_intensity
    }

    pub fn shake(&mut self, intensity: f32, duration: f32) {
        self.shake_intensity = intensity;
        self.shake_timer = duration.max(0.0);
    }

    pub fn is_shaking(&self) -> bool {
        self.shake_timer > 0.0
    }

    pub fn lock_on(&mut self, point: Vec2) {
        self.lock_target = Some(point);
    }

    pub fn unlock(&mut self) {
        self.lock_target = None;
    }

    pub fn frustum_height(&self) -> f32 {
        match self.config.lens {
            CameraLens::Orthographic { size } => 2.0 * size,
            CameraLens::Perspective { fov_degrees } => {
                2.0 * self.position.z.abs() * (fov_degrees.to_radians() * 0.5).tan()
            }
        }
    }

    pub fn frustum_width(&self) -> f32 {
        self.frustum_height() * self.config.aspect
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn config(&self) -> &CameraConfig {
        &self.config
    }
}
