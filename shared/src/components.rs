//! ECS components that sit next to the controllers on level entities.

use bevy::prelude::*;

use crate::door::Key;

/// How long a dead character waits before respawning (seconds)
pub const RESPAWN_TIME: f32 = 4.0;

/// Where a character comes back after dying
#[derive(Component, Clone, Copy, Debug, PartialEq)]
pub struct SpawnPoint(pub Vec2);

/// Keys a character picked up and hasn't used yet
#[derive(Component, Clone, Debug, Default)]
pub struct KeyRing {
    pub keys: Vec<Key>,
}

impl KeyRing {
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Component added to dead characters while waiting to respawn
#[derive(Component, Clone, Copy, Debug)]
pub struct RespawnTimer {
    pub time_remaining: f32,
}

impl Default for RespawnTimer {
    fn default() -> Self {
        Self {
            time_remaining: RESPAWN_TIME,
        }
    }
}

/// The character the follow camera tracks
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct CameraTarget;

/// Marker for a key lying in the level (not yet picked up)
#[derive(Component, Clone, Copy, Debug, Default)]
pub struct LooseKey;

/// World-space position of a lever, key or door.
///
/// Characters keep their own position inside the controller; this is for the props.
#[derive(Component, Clone, Copy, Debug, Default, PartialEq)]
pub struct PropPosition(pub Vec2);
