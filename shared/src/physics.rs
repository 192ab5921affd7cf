//! Kinematic body integration against level solids.
//!
//! The controllers only produce a velocity. Moving the body and stopping it at walls,
//! floors and ceilings happens here, one axis at a time, at the fixed timestep
//! (see `FIXED_TIMESTEP_HZ`).
//!
//! This is intentionally lightweight (axis-aligned boxes only). Bodies that already
//! overlap a solid before a move are not pushed out of it, so a door closing on a
//! character never launches them.

use bevy::prelude::*;

use crate::config::ColliderShape;
use crate::level::{Aabb, LevelGeometry};

/// Overlaps shallower than this are treated as touching.
pub const SKIN: f32 = 1e-3;

/// Which sides got blocked during a move.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Contacts {
    pub left: bool,
    pub right: bool,
    pub below: bool,
    pub above: bool,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BodyMove {
    pub position: Vec2,
    pub contacts: Contacts,
}

fn body_box(position: Vec2, shape: &ColliderShape) -> Aabb {
    Aabb::from_center_size(position + shape.offset, shape.size)
}

/// Move a body by `velocity * dt`, x first, then y.
///
/// `ignore` is the body's own solid, if it has one.
pub fn move_body(
    geometry: &LevelGeometry,
    position: Vec2,
    shape: &ColliderShape,
    velocity: Vec2,
    dt: f32,
    ignore: Option<Entity>,
) -> BodyMove {
    let mut contacts = Contacts::default();
    let mut pos = position;

    for axis in 0..2 {
        let delta = velocity[axis] * dt;
        if delta == 0.0 || !delta.is_finite() {
            continue;
        }
        let before = body_box(pos, shape).expanded(-SKIN);
        let mut next = pos;
        next[axis] += delta;
        let half = shape.size[axis].abs() * 0.5;

        for solid in geometry.blocking(body_box(next, shape).expanded(-SKIN)) {
            if ignore.is_some() && solid.entity == ignore {
                continue;
            }
            if solid.bounds.overlaps(&before) {
                continue;
            }
            if delta > 0.0 {
                let limit = solid.bounds.min[axis] - half - shape.offset[axis];
                if limit < next[axis] {
                    next[axis] = limit.max(pos[axis]);
                }
                if axis == 0 { contacts.right = true } else { contacts.above = true }
            } else {
                let limit = solid.bounds.max[axis] + half - shape.offset[axis];
                if limit > next[axis] {
                    next[axis] = limit.min(pos[axis]);
                }
                if axis == 0 { contacts.left = true } else { contacts.below = true }
            }
        }
        pos = next;
    }

    BodyMove { position: pos, contacts }
}
