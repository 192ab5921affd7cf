//! Keyboard input → `PlayerControls`
//!
//! Each local player has a set of key bindings. Bindings come from `controls.ron` in the
//! asset folder when present, otherwise two players share the keyboard (WASD and arrows).

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::path::Path;

use shared::{ControlSnapshot, PlayerControls, PlayerId};

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyBindings {
    pub player: u32,
    pub left: KeyCode,
    pub right: KeyCode,
    pub up: KeyCode,
    pub down: KeyCode,
    pub jump: KeyCode,
    pub interact: KeyCode,
}

/// Local input configuration
#[derive(Resource, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSettings {
    pub bindings: Vec<KeyBindings>,
}

impl Default for InputSettings {
    fn default() -> Self {
        Self {
            bindings: vec![
                KeyBindings {
                    player: 0,
                    left: KeyCode::KeyA,
                    right: KeyCode::KeyD,
                    up: KeyCode::KeyW,
                    down: KeyCode::KeyS,
                    jump: KeyCode::Space,
                    interact: KeyCode::KeyE,
                },
                KeyBindings {
                    player: 1,
                    left: KeyCode::ArrowLeft,
                    right: KeyCode::ArrowRight,
                    up: KeyCode::ArrowUp,
                    down: KeyCode::ArrowDown,
                    jump: KeyCode::Enter,
                    interact: KeyCode::ShiftRight,
                },
            ],
        }
    }
}

impl InputSettings {
    /// Read bindings from `path`. A missing file gives the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = std::fs::read_to_string(path).map_err(|e| format!("failed to read {path:?}: {e}"))?;
        ron::from_str(&text).map_err(|e| format!("{}: {e}", path.display()))
    }
}

fn axis(keyboard: &ButtonInput<KeyCode>, negative: KeyCode, positive: KeyCode) -> f32 {
    let mut value = 0.0;
    if keyboard.pressed(negative) {
        value -= 1.0;
    }
    if keyboard.pressed(positive) {
        value += 1.0;
    }
    value
}

/// Controls for one player from the current keyboard state.
pub fn snapshot(keyboard: &ButtonInput<KeyCode>, keys: &KeyBindings) -> ControlSnapshot {
    ControlSnapshot {
        move_vector: Vec2::new(axis(keyboard, keys.left, keys.right), axis(keyboard, keys.down, keys.up)),
        jump_pressed: keyboard.just_pressed(keys.jump),
        jump_held: keyboard.pressed(keys.jump),
        interact_pressed: keyboard.just_pressed(keys.interact),
    }
}

pub fn read_keyboard(
    keyboard: Res<ButtonInput<KeyCode>>,
    settings: Res<InputSettings>,
    mut controls: ResMut<PlayerControls>,
) {
    for keys in &settings.bindings {
        controls.set(PlayerId(keys.player), snapshot(&keyboard, keys));
    }
}
