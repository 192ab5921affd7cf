//! Level geometry and level files.
//!
//! [`LevelGeometry`] is the collision-query service the controllers probe against: a flat
//! list of axis-aligned solids. Static solids come from the level file, door panels are
//! dynamic solids kept in sync with their door every frame.
//!
//! Level files are RON. Every section is optional:
//!
//! ```ron
//! (
//!     name: "demo",
//!     solids: [(center: (0.0, -0.5), size: (20.0, 1.0))],
//!     players: [(id: 0, spawn: (0.0, 1.0), controller: Platformer(()))],
//! )
//! ```

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::camera::CameraConfig;
use crate::config::{CharacterConfig, TopDownConfig};
use crate::door::{DoorConfig, Key, Lever};
use crate::probe::{GroundProbe, ProbeRay};

/// Axis-aligned box in world units.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size.abs() * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    /// Strict overlap (touching edges don't count).
    pub fn overlaps(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }

    /// Distance along `dir` at which the ray enters the box, if it does within `max_distance`.
    /// A ray starting inside the box hits at 0.
    pub fn ray_distance(&self, origin: Vec2, dir: Vec2, max_distance: f32) -> Option<f32> {
        let mut t_min = 0.0_f32;
        let mut t_max = max_distance;

        for axis in 0..2 {
            let o = origin[axis];
            let d = dir[axis];
            let (lo, hi) = (self.min[axis], self.max[axis]);
            if d.abs() < 1e-8 {
                if o < lo || o > hi {
                    return None;
                }
                continue;
            }
            let inv = 1.0 / d;
            let mut t0 = (lo - o) * inv;
            let mut t1 = (hi - o) * inv;
            if t0 > t1 {
                std::mem::swap(&mut t0, &mut t1);
            }
            t_min = t_min.max(t0);
            t_max = t_max.min(t1);
            if t_min > t_max {
                return None;
            }
        }
        Some(t_min)
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Solid {
    pub bounds: Aabb,
    pub layer: u32,
    /// Triggers never block and never count as ground
    pub trigger: bool,
    /// Owning entity, for solids that move or need to be ignored
    pub entity: Option<Entity>,
}

#[derive(Resource, Default, Debug, Clone)]
pub struct LevelGeometry {
    solids: Vec<Solid>,
}

impl LevelGeometry {
    pub fn add(&mut self, solid: Solid) {
        self.solids.push(solid);
    }

    /// Move (or create) the solid owned by `entity`.
    pub fn set_bounds(&mut self, entity: Entity, bounds: Aabb, layer: u32) {
        match self.solids.iter_mut().find(|s| s.entity == Some(entity)) {
            Some(solid) => solid.bounds = bounds,
            None => self.solids.push(Solid {
                bounds,
                layer,
                trigger: false,
                entity: Some(entity),
            }),
        }
    }

    pub fn remove(&mut self, entity: Entity) {
        self.solids.retain(|s| s.entity != Some(entity));
    }

    pub fn solids(&self) -> &[Solid] {
        &self.solids
    }

    /// Non-trigger solids overlapping `area`.
    pub fn blocking(&self, area: Aabb) -> impl Iterator<Item = &Solid> {
        self.solids
            .iter()
            .filter(move |s| !s.trigger && s.bounds.overlaps(&area))
    }

    pub fn clear(&mut self) {
        self.solids.clear();
    }
}

impl GroundProbe for LevelGeometry {
    fn probe(&self, ray: &ProbeRay) -> bool {
        self.solids.iter().any(|solid| {
            !solid.trigger
                && ray.layers.contains_layer(solid.layer)
                && (ray.ignore.is_none() || solid.entity != ray.ignore)
                && solid
                    .bounds
                    .ray_distance(ray.origin, ray.direction, ray.max_distance)
                    .is_some()
        })
    }
}

// ============================================================================
// Level files
// ============================================================================

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SolidDesc {
    pub center: Vec2,
    pub size: Vec2,
    #[serde(default)]
    pub layer: u32,
    #[serde(default)]
    pub trigger: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ControllerDesc {
    Platformer(CharacterConfig),
    TopDown(TopDownConfig),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PlayerDesc {
    pub id: u32,
    pub spawn: Vec2,
    pub controller: ControllerDesc,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LeverDesc {
    pub position: Vec2,
    #[serde(default)]
    pub lever: Lever,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DoorDesc {
    /// Closed position of the panel centre
    pub position: Vec2,
    /// Slide direction, degrees counter-clockwise from +X
    #[serde(default)]
    pub angle: f32,
    #[serde(default)]
    pub config: DoorConfig,
    /// Indices into the level's `levers`
    #[serde(default)]
    pub levers: Vec<usize>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyDesc {
    pub position: Vec2,
    pub key: Key,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelDesc {
    pub name: String,
    pub solids: Vec<SolidDesc>,
    pub players: Vec<PlayerDesc>,
    pub levers: Vec<LeverDesc>,
    pub doors: Vec<DoorDesc>,
    pub keys: Vec<KeyDesc>,
    pub camera: CameraConfig,
    /// Player the camera follows (first player when unset)
    pub follow: Option<u32>,
}

impl Default for LevelDesc {
    fn default() -> Self {
        Self {
            name: "untitled".to_string(),
            solids: Vec::new(),
            players: Vec::new(),
            levers: Vec::new(),
            doors: Vec::new(),
            keys: Vec::new(),
            camera: CameraConfig::default(),
            follow: None,
        }
    }
}

impl LevelDesc {
    pub fn from_ron_str(text: &str) -> Result<Self, String> {
        let level: LevelDesc = ron::from_str(text).map_err(|e| format!("invalid level RON: {e}"))?;
        level.validate()?;
        Ok(level)
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut seen = std::collections::HashSet::new();
        for player in &self.players {
            if !seen.insert(player.id) {
                return Err(format!("player id {} is used twice", player.id));
            }
            let checked = match &player.controller {
                ControllerDesc::Platformer(config) => config.validate(),
                ControllerDesc::TopDown(config) => config.validate(),
            };
            checked.map_err(|e| format!("player {}: {e}", player.id))?;
        }
        for (i, door) in self.doors.iter().enumerate() {
            if let Some(bad) = door.levers.iter().find(|&&l| l >= self.levers.len()) {
                return Err(format!(
                    "door {i} references lever {bad} but the level has {} levers",
                    self.levers.len()
                ));
            }
        }
        for (i, solid) in self.solids.iter().enumerate() {
            if solid.size.x <= 0.0 || solid.size.y <= 0.0 {
                return Err(format!("solid {i} has a non-positive size"));
            }
        }
        if let Some(follow) = self.follow {
            if !seen.contains(&follow) {
                return Err(format!("camera follows unknown player {follow}"));
            }
        }
        Ok(())
    }

    /// Static part of the collision world.
    pub fn static_geometry(&self) -> LevelGeometry {
        let mut geometry = LevelGeometry::default();
        for solid in &self.solids {
            geometry.add(Solid {
                bounds: Aabb::from_center_size(solid.center, solid.size),
                layer: solid.layer,
                trigger: solid.trigger,
                entity: None,
            });
        }
        geometry
    }
}

pub fn load_level_file(path: impl AsRef<Path>) -> Result<LevelDesc, String> {
    let path = path.as_ref();
    let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
    LevelDesc::from_ron_str(&text).map_err(|e| format!("{}: {e}", path.display()))
}
