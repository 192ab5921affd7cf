//! Per-player input snapshots.
//!
//! Input sources (keyboard, scripts, soak tests) write into [`PlayerControls`]; the
//! simulation reads one snapshot per player per frame.

use bevy::prelude::*;
use std::collections::{HashMap, HashSet};

use crate::registry::PlayerId;

/// Input state for one player for one frame
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct ControlSnapshot {
    /// Stick / arrow direction, each axis in [-1, 1]
    pub move_vector: Vec2,
    /// Jump went down this frame
    pub jump_pressed: bool,
    /// Jump is held
    pub jump_held: bool,
    /// Interact went down this frame
    pub interact_pressed: bool,
}

impl ControlSnapshot {
    /// Out-of-range or NaN sticks are clamped rather than rejected.
    pub fn sanitized(mut self) -> Self {
        let clean = |v: f32| if v.is_finite() { v.clamp(-1.0, 1.0) } else { 0.0 };
        self.move_vector = Vec2::new(clean(self.move_vector.x), clean(self.move_vector.y));
        self
    }
}

#[derive(Resource, Default, Debug)]
pub struct PlayerControls {
    snapshots: HashMap<PlayerId, ControlSnapshot>,
    disabled: HashSet<PlayerId>,
}

impl PlayerControls {
    pub fn set(&mut self, player: PlayerId, snapshot: ControlSnapshot) {
        self.snapshots.insert(player, snapshot);
    }

    /// Snapshot for `player`; neutral when disabled or when no source wrote one.
    pub fn get(&self, player: PlayerId) -> ControlSnapshot {
        if self.disabled.contains(&player) {
            return ControlSnapshot::default();
        }
        self.snapshots
            .get(&player)
            .copied()
            .unwrap_or_default()
            .sanitized()
    }

    pub fn disable(&mut self, player: PlayerId) {
        self.disabled.insert(player);
    }

    pub fn enable(&mut self, player: PlayerId) {
        self.disabled.remove(&player);
    }

    pub fn is_enabled(&self, player: PlayerId) -> bool {
        !self.disabled.contains(&player)
    }

    /// Clear edge-triggered flags once they've been consumed for this frame.
    pub fn end_frame(&mut self) {
        for snapshot in self.snapshots.values_mut() {
            snapshot.jump_pressed = false;
            snapshot.interact_pressed = false;
        }
    }
}
