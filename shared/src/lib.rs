//! Shared simulation for the locomotion demos: character controllers, props, level
//! geometry and the Bevy plugin that runs them. Used by both the headless runner and the
//! windowed client.

pub mod camera;
pub mod character;
pub mod components;
pub mod config;
pub mod controls;
pub mod door;
pub mod events;
pub mod level;
pub mod math;
pub mod physics;
pub mod platformer;
pub mod plugin;
pub mod probe;
pub mod registry;
pub mod systems;
pub mod topdown;
pub mod vitals;

pub use camera::{CameraBounds, CameraConfig, CameraLens, FollowCamera};
pub use character::Locomotion;
pub use components::*;
pub use config::{CharacterConfig, ColliderShape, ConfigError, TopDownConfig};
pub use controls::{ControlSnapshot, PlayerControls};
pub use door::{Door, DoorConfig, DoorCue, Key, Lever, LeverState};
pub use events::{CharacterEvent, CharacterMessage, DoorMessage};
pub use level::{load_level_file, Aabb, LevelDesc, LevelGeometry};
pub use platformer::PlatformerCharacter;
pub use plugin::{tick_duration, LocomotionPlugin, LocomotionSet, FIXED_TIMESTEP_HZ};
pub use probe::{GroundProbe, LayerMask, ProbeRay};
pub use registry::{CharacterRegistry, PlayerId};
pub use systems::LoadedLevel;
pub use topdown::TopDownCharacter;
pub use vitals::DamageOutcome;
