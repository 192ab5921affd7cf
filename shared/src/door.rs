//! Sliding doors opened by levers and keys.
//!
//! A door sums an activation count (matching levers + inserted keys) every fixed tick and
//! picks an open or closed target; the frame tick slides it toward that target.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::math::move_towards_vec3;

/// Moves shorter than this are ignored
const MOVE_EPSILON: f32 = 0.01;
/// Speeds below this disable movement in that direction
const MIN_SPEED: f32 = 0.01;
/// Close speed above which the hard-close cue is used
const HARD_CLOSE_SPEED: f32 = 5.1;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeverState {
    #[default]
    Left,
    Center,
    Right,
    Disabled,
}

#[derive(Component, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Lever {
    pub state: LeverState,
    /// How much this lever contributes to a door when in the door's required state
    pub door_value: i32,
}

impl Default for Lever {
    fn default() -> Self {
        Self {
            state: LeverState::Left,
            door_value: 1,
        }
    }
}

impl Lever {
    /// Flip between Left and Right. Center flips to Right; Disabled never moves.
    pub fn toggle(&mut self) {
        self.state = match self.state {
            LeverState::Left | LeverState::Center => LeverState::Right,
            LeverState::Right => LeverState::Left,
            LeverState::Disabled => LeverState::Disabled,
        };
    }
}

#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Key {
    pub key_index: u32,
    pub key_value: i32,
}

impl Key {
    /// Insert this key into `door` if it fits and the door isn't already open.
    /// On success the key is used up and the caller should discard it.
    pub fn try_open_door(&self, door: &mut Door) -> bool {
        if door.can_key_unlock(self) && !door.is_opened() {
            door.unlock_with_key(self.key_value);
            true
        } else {
            false
        }
    }
}

/// State-entry cue for a door (drives sounds on the client)
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DoorCue {
    Open,
    Close,
    CloseHard,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DoorConfig {
    pub switches_required: i32,
    pub reversed_side: bool,
    pub opened_at_start: bool,
    pub reset_on_death: bool,
    pub open_speed: f32,
    pub close_speed: f32,
    pub max_move: f32,
    pub key_can_open: bool,
    pub key_index: u32,
    pub lever_state_required: LeverState,
    /// Blocking size of the door panel
    pub size: Vec2,
}

impl Default for DoorConfig {
    fn default() -> Self {
        Self {
            switches_required: 1,
            reversed_side: false,
            opened_at_start: false,
            reset_on_death: true,
            open_speed: 2.0,
            close_speed: 2.0,
            max_move: 2.0,
            key_can_open: false,
            key_index: 0,
            lever_state_required: LeverState::Right,
            size: Vec2::new(0.5, 2.0),
        }
    }
}

#[derive(Component, Clone, Debug)]
pub struct Door {
    config: DoorConfig,
    /// Lever entities feeding this door
    pub levers: Vec<Entity>,
    /// Slide direction angle, radians
    angle: f32,
    initial_position: Vec3,
    position: Vec3,
    target_position: Vec3,
    /// Current open/closed polarity (the config value is the reset state)
    opened_at_start: bool,
    should_open: bool,
    keys_inside: i32,
    last_cue: Option<DoorCue>,
}

impl Door {
    pub fn new(config: DoorConfig, position: Vec3, angle: f32, levers: Vec<Entity>) -> Self {
        let initial_position = position.with_z(0.0);
        let mut door = Self {
            opened_at_start: config.opened_at_start,
            should_open: config.opened_at_start,
            config,
            levers,
            angle,
            initial_position,
            position,
            target_position: position,
            keys_inside: 0,
            last_cue: None,
        };
        door.reset();
        door
    }

    /// Sum of `door_value` over levers in `required` state.
    pub fn lever_activation<'a>(levers: impl IntoIterator<Item = &'a Lever>, required: LeverState) -> i32 {
        levers
            .into_iter()
            .filter(|lever| lever.state == required)
            .map(|lever| lever.door_value)
            .sum()
    }

    /// Unit slide direction.
    pub fn move_dir(&self) -> Vec3 {
        let side = if self.config.reversed_side { -1.0 } else { 1.0 };
        Vec3::new(self.angle.cos(), self.angle.sin(), 0.0) * side
    }

    /// Fixed-rate step: choose the target from `lever_activation` + inserted keys.
    /// Returns a cue the first time the door starts heading to a new state.
    pub fn fixed_update(&mut self, lever_activation: i32) -> Option<DoorCue> {
        let activation = lever_activation + self.keys_inside;
        let activated = activation >= self.config.switches_required;
        self.should_open = if self.opened_at_start { !activated } else { activated };
        self.target_position = self.position;

        let diff = self.position - self.initial_position;
        let dir = self.move_dir();
        let mut cue = None;

        if self.should_open {
            if self.config.open_speed >= MIN_SPEED && diff.length() < self.config.max_move {
                self.target_position = (self.initial_position + dir * self.config.max_move).with_z(0.0);
                cue = Some(DoorCue::Open);
            }
        } else if self.config.close_speed >= MIN_SPEED
            && diff.dot(dir) > 0.001
            && diff.length() > MOVE_EPSILON
        {
            self.target_position = self.initial_position;
            cue = Some(if self.config.close_speed > HARD_CLOSE_SPEED {
                DoorCue::CloseHard
            } else {
                DoorCue::Close
            });
        }

        let cue = cue?;
        let same_edge = match (self.last_cue, cue) {
            (Some(DoorCue::Open), DoorCue::Open) => true,
            (Some(DoorCue::Close | DoorCue::CloseHard), DoorCue::Close | DoorCue::CloseHard) => true,
            _ => false,
        };
        if same_edge {
            return None;
        }
        self.last_cue = Some(cue);
        Some(cue)
    }

    /// Frame step: slide toward the target without overshooting.
    pub fn update(&mut self, dt: f32) {
        let to_target = self.target_position - self.position;
        if to_target.length() > MOVE_EPSILON {
            let speed = if self.should_open { self.config.open_speed } else { self.config.close_speed };
            self.position = move_towards_vec3(self.position, self.target_position, speed * dt);
        }
    }

    pub fn is_opened(&self) -> bool {
        (self.position - self.initial_position).length() > self.config.max_move / 2.0
    }

    pub fn open(&mut self) {
        self.opened_at_start = true;
    }

    pub fn close(&mut self) {
        self.opened_at_start = false;
    }

    pub fn toggle(&mut self) {
        self.opened_at_start = !self.opened_at_start;
    }

    pub fn can_key_unlock(&self, key: &Key) -> bool {
        self.config.key_can_open && key.key_index == self.config.key_index
    }

    pub fn unlock_with_key(&mut self, value: i32) {
        self.keys_inside += value;
    }

    /// Back to the configured polarity, snapped into place.
    pub fn reset(&mut self) {
        self.opened_at_start = self.config.opened_at_start;
        self.position = if self.opened_at_start {
            self.initial_position + self.move_dir() * self.config.max_move
        } else {
            self.initial_position
        };
        self.target_position = self.position;
        self.should_open = self.opened_at_start;
        self.last_cue = None;
    }

    pub fn config(&self) -> &DoorConfig {
        &self.config
    }

    pub fn position(&self) -> Vec3 {
        self.position
    }

    pub fn keys_inside(&self) -> i32 {
        self.keys_inside
    }

    pub fn should_open(&self) -> bool {
        self.should_open
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settle(door: &mut Door, activation: i32, seconds: f32) -> Vec<DoorCue> {
        let dt = 0.02;
        let mut cues = Vec::new();
        let steps = (seconds / dt) as usize;
        for _ in 0..steps {
            cues.extend(door.fixed_update(activation));
            door.update(dt);
        }
        cues
    }

    #[test]
    fn test_lever_activation_counts_matching_levers() {
        let levers = [
            Lever { state: LeverState::Right, door_value: 1 },
            Lever { state: LeverState::Left, door_value: 5 },
            Lever { state: LeverState::Right, door_value: 2 },
        ];
        assert_eq!(Door::lever_activation(&levers, LeverState::Right), 3);
        assert_eq!(Door::lever_activation(&levers, LeverState::Left), 5);
        assert_eq!(Door::lever_activation(&levers, LeverState::Center), 0);
    }

    #[test]
    fn test_opens_and_closes_with_one_cue_per_edge() {
        let mut door = Door::new(DoorConfig::default(), Vec3::ZERO, 0.0, Vec::new());
        assert!(!door.is_opened());

        let cues = settle(&mut door, 1, 3.0);
        assert_eq!(cues, vec![DoorCue::Open]);
        assert!(door.is_opened());
        assert!((door.position() - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-3);

        let cues = settle(&mut door, 0, 3.0);
        assert_eq!(cues, vec![DoorCue::Close]);
        assert!(!door.is_opened());
        assert!(door.position().length() < 0.02);
    }

    #[test]
    fn test_fast_close_uses_hard_cue() {
        let config = DoorConfig {
            close_speed: 8.0,
            ..default()
        };
        let mut door = Door::new(config, Vec3::ZERO, 0.0, Vec::new());
        settle(&mut door, 1, 3.0);
        assert_eq!(settle(&mut door, 0, 1.0), vec![DoorCue::CloseHard]);
    }

    #[test]
    fn test_opened_at_start_inverts_polarity() {
        let config = DoorConfig {
            opened_at_start: true,
            ..default()
        };
        let mut door = Door::new(config, Vec3::ZERO, 0.0, Vec::new());
        // Snapped open at construction
        assert!(door.is_opened());
        settle(&mut door, 1, 3.0);
        assert!(!door.is_opened());
    }

    #[test]
    fn test_reversed_and_rotated_direction() {
        let config = DoorConfig {
            reversed_side: true,
            ..default()
        };
        let door = Door::new(config, Vec3::ZERO, std::f32::consts::FRAC_PI_2, Vec::new());
        assert!((door.move_dir() - Vec3::NEG_Y).length() < 1e-5);
    }

    #[test]
    fn test_key_opens_matching_door_once() {
        let config = DoorConfig {
            key_can_open: true,
            key_index: 2,
            ..default()
        };
        let mut door = Door::new(config, Vec3::ZERO, 0.0, Vec::new());
        let wrong = Key { key_index: 1, key_value: 1 };
        let right = Key { key_index: 2, key_value: 1 };

        assert!(!wrong.try_open_door(&mut door));
        assert!(right.try_open_door(&mut door));
        assert_eq!(door.keys_inside(), 1);

        settle(&mut door, 0, 3.0);
        assert!(door.is_opened());
        // Already open: a second key is refused
        assert!(!right.try_open_door(&mut door));
    }

    #[test]
    fn test_toggle_and_reset() {
        let mut door = Door::new(DoorConfig::default(), Vec3::ZERO, 0.0, Vec::new());
        door.toggle();
        settle(&mut door, 0, 3.0);
        assert!(door.is_opened());

        door.reset();
        assert!(!door.is_opened());
        assert_eq!(door.position(), Vec3::ZERO);
    }

    #[test]
    fn test_open_and_close_override_activation() {
        let mut door = Door::new(DoorConfig::default(), Vec3::ZERO, 0.0, Vec::new());
        door.open();
        assert_eq!(settle(&mut door, 0, 3.0), vec![DoorCue::Open]);
        assert!(door.is_opened());
        assert!((door.position() - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-3);

        door.close();
        assert_eq!(settle(&mut door, 0, 3.0), vec![DoorCue::Close]);
        assert!(!door.is_opened());
        assert!(door.position().length() < 0.02);
    }

    #[test]
    fn test_lever_toggle() {
        let mut lever = Lever::default();
        lever.toggle();
        assert_eq!(lever.state, LeverState::Right);
        lever.toggle();
        assert_eq!(lever.state, LeverState::Left);

        let mut stuck = Lever { state: LeverState::Disabled, door_value: 1 };
        stuck.toggle();
        assert_eq!(stuck.state, LeverState::Disabled);
    }
}
