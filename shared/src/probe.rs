//! Ground/ceiling probing.
//!
//! The controllers don't own collision geometry. They issue ray queries through
//! [`GroundProbe`], which the level (or any other collision service) implements.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::config::ColliderShape;

/// Bitmask of collision layers a query accepts.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct LayerMask(pub u32);

impl LayerMask {
    pub const ALL: LayerMask = LayerMask(u32::MAX);
    pub const NONE: LayerMask = LayerMask(0);

    /// Mask containing only `layer` (0..32).
    pub const fn layer(layer: u32) -> Self {
        LayerMask(1 << (layer & 31))
    }

    pub fn contains_layer(&self, layer: u32) -> bool {
        self.0 & (1 << (layer & 31)) != 0
    }
}

impl Default for LayerMask {
    fn default() -> Self {
        LayerMask::ALL
    }
}

/// A single ray query.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ProbeRay {
    pub origin: Vec2,
    /// Unit direction
    pub direction: Vec2,
    pub max_distance: f32,
    pub layers: LayerMask,
    /// The querying body, never reported as a hit
    pub ignore: Option<Entity>,
}

/// Collision-query service consumed by the controllers.
///
/// Implementations report whether any non-trigger solid on `ray.layers` (other than
/// `ray.ignore`) is hit within `ray.max_distance`.
pub trait GroundProbe {
    fn probe(&self, ray: &ProbeRay) -> bool;
}

impl<P: GroundProbe + ?Sized> GroundProbe for &P {
    fn probe(&self, ray: &ProbeRay) -> bool {
        (**self).probe(ray)
    }
}

/// Which way the contact rays are cast.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProbeDirection {
    Down,
    Up,
}

impl ProbeDirection {
    pub fn vector(self) -> Vec2 {
        match self {
            ProbeDirection::Down => Vec2::NEG_Y,
            ProbeDirection::Up => Vec2::Y,
        }
    }
}

/// Build the three parallel contact rays (left, centre, right) for a body.
///
/// Rays start at the end of the capsule's straight section, are spread by half the capsule
/// radius and reach `radius + extra_distance`, so they poke just past the rounded end.
pub fn contact_rays(
    position: Vec2,
    shape: &ColliderShape,
    direction: ProbeDirection,
    extra_distance: f32,
    layers: LayerMask,
    ignore: Option<Entity>,
) -> [ProbeRay; 3] {
    let dir = direction.vector();
    let radius = shape.size.x * 0.5;
    let straight = (shape.size.y * 0.5 - shape.size.x * 0.5).abs();
    let start = position + shape.offset + dir * straight;
    let max_distance = radius + extra_distance;
    let spread = Vec2::X * radius / 2.0;

    [start - spread, start, start + spread].map(|origin| ProbeRay {
        origin,
        direction: dir,
        max_distance,
        layers,
        ignore,
    })
}

/// True if any of the three contact rays hits.
pub fn detect_contact(
    probe: &impl GroundProbe,
    position: Vec2,
    shape: &ColliderShape,
    direction: ProbeDirection,
    extra_distance: f32,
    layers: LayerMask,
    ignore: Option<Entity>,
) -> bool {
    contact_rays(position, shape, direction, extra_distance, layers, ignore)
        .iter()
        .any(|ray| probe.probe(ray))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Records every ray and answers with a fixed result.
    struct RecordingProbe {
        hit: bool,
        rays: RefCell<Vec<ProbeRay>>,
    }

    impl GroundProbe for RecordingProbe {
        fn probe(&self, ray: &ProbeRay) -> bool {
            self.rays.borrow_mut().push(*ray);
            self.hit
        }
    }

    #[test]
    fn test_contact_ray_layout() {
        let shape = ColliderShape {
            size: Vec2::new(1.0, 2.0),
            offset: Vec2::ZERO,
        };
        let rays = contact_rays(Vec2::ZERO, &shape, ProbeDirection::Down, 0.1, LayerMask::ALL, None);
        // Straight section ends half a unit below the centre
        assert_eq!(rays[1].origin, Vec2::new(0.0, -0.5));
        assert_eq!(rays[0].origin, Vec2::new(-0.25, -0.5));
        assert_eq!(rays[2].origin, Vec2::new(0.25, -0.5));
        for ray in &rays {
            assert_eq!(ray.direction, Vec2::NEG_Y);
            assert!((ray.max_distance - 0.6).abs() < 1e-6);
        }

        let up = contact_rays(Vec2::ZERO, &shape, ProbeDirection::Up, 0.1, LayerMask::ALL, None);
        assert_eq!(up[1].origin, Vec2::new(0.0, 0.5));
    }

    #[test]
    fn test_detect_contact_uses_all_rays() {
        let probe = RecordingProbe {
            hit: false,
            rays: RefCell::new(Vec::new()),
        };
        let shape = ColliderShape::default();
        assert!(!detect_contact(&probe, Vec2::ZERO, &shape, ProbeDirection::Up, 0.1, LayerMask::ALL, None));
        assert_eq!(probe.rays.borrow().len(), 3);
    }

    #[test]
    fn test_layer_mask() {
        let mask = LayerMask::layer(3);
        assert!(mask.contains_layer(3));
        assert!(!mask.contains_layer(2));
        assert!(LayerMask::ALL.contains_layer(17));
        assert!(!LayerMask::NONE.contains_layer(0));
    }
}
