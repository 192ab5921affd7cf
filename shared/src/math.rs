//! Small scalar/vector helpers shared by the controllers, doors and camera.
//!
//! Everything here is pure and frame-rate aware: callers pass the elapsed time and the
//! helpers never overshoot their target.

use bevy::prelude::*;

/// Move `current` toward `target` by at most `max_delta`, never overshooting.
///
/// A negative `max_delta` is treated as zero so a bad rate can't push away from the target.
#[inline]
pub fn move_towards(current: f32, target: f32, max_delta: f32) -> f32 {
    let max_delta = max_delta.max(0.0);
    let diff = target - current;
    if diff.abs() <= max_delta {
        target
    } else {
        current + diff.signum() * max_delta
    }
}

/// Vector form of [`move_towards`]: moves along the straight line to `target`.
#[inline]
pub fn move_towards_vec3(current: Vec3, target: Vec3, max_delta: f32) -> Vec3 {
    let diff = target - current;
    let dist = diff.length();
    if dist <= max_delta.max(0.0) || dist == 0.0 {
        target
    } else {
        current + diff / dist * max_delta
    }
}

/// Critically damped spring toward `target` (game-engine style `SmoothDamp`).
///
/// `velocity` is the spring state and must be kept between calls. Max speed is unbounded.
pub fn smooth_damp(current: f32, target: f32, velocity: &mut f32, smooth_time: f32, dt: f32) -> f32 {
    if dt <= 0.0 {
        return current;
    }
    let smooth_time = smooth_time.max(0.0001);
    let omega = 2.0 / smooth_time;
    let x = omega * dt;
    let exp = 1.0 / (1.0 + x + 0.48 * x * x + 0.235 * x * x * x);

    let change = current - target;
    let temp = (*velocity + omega * change) * dt;
    *velocity = (*velocity - omega * temp) * exp;
    let mut output = target + (change + temp) * exp;

    // Don't overshoot
    if (target - current > 0.0) == (output > target) {
        output = target;
        *velocity = 0.0;
    }
    output
}

/// Sign that treats zero as positive (matches a sprite's default facing).
#[inline]
pub fn sign_or_positive(value: f32) -> f32 {
    if value < 0.0 {
        -1.0
    } else {
        1.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_move_towards_stops_at_target() {
        assert_eq!(move_towards(0.0, 1.0, 0.4), 0.4);
        assert_eq!(move_towards(0.9, 1.0, 0.4), 1.0);
        assert_eq!(move_towards(0.0, -1.0, 0.25), -0.25);
        // Negative rates don't move
        assert_eq!(move_towards(0.5, 1.0, -3.0), 0.5);
    }

    #[test]
    fn test_move_towards_vec3() {
        let p = move_towards_vec3(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0), 1.0);
        assert!((p - Vec3::new(0.6, 0.8, 0.0)).length() < 1e-5);
        let p = move_towards_vec3(Vec3::ZERO, Vec3::new(3.0, 4.0, 0.0), 10.0);
        assert_eq!(p, Vec3::new(3.0, 4.0, 0.0));
    }

    #[test]
    fn test_smooth_damp_converges_without_overshoot() {
        let mut pos = 0.0;
        let mut vel = 0.0;
        for _ in 0..600 {
            pos = smooth_damp(pos, 10.0, &mut vel, 0.2, 1.0 / 60.0);
            assert!(pos <= 10.0 + 1e-4);
        }
        assert!((pos - 10.0).abs() < 0.01);
    }
}
