//! Bevy wiring for the locomotion simulation.

use bevy::prelude::*;
use std::time::Duration;

use crate::controls::PlayerControls;
use crate::events::{CharacterMessage, DoorMessage};
use crate::level::LevelGeometry;
use crate::platformer::PlatformerCharacter;
use crate::registry::CharacterRegistry;
use crate::systems::*;
use crate::topdown::TopDownCharacter;

/// Fixed timestep for controllers, doors and respawn timers (50 Hz)
pub const FIXED_TIMESTEP_HZ: f64 = 50.0;

pub fn tick_duration() -> Duration {
    Duration::from_secs_f64(1.0 / FIXED_TIMESTEP_HZ)
}

/// Frame-rate system ordering. Input sources go in `Input`.
#[derive(SystemSet, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LocomotionSet {
    /// Write `PlayerControls` (keyboard, scripts, soak)
    Input,
    /// Frame ticks of characters, levers and doors
    Simulate,
    /// React to this frame's messages and sync transforms
    Publish,
}

pub struct LocomotionPlugin;

impl Plugin for LocomotionPlugin {
    fn build(&self, app: &mut App) {
        app.insert_resource(Time::<Fixed>::from_hz(FIXED_TIMESTEP_HZ))
            .init_resource::<CharacterRegistry>()
            .init_resource::<PlayerControls>()
            .init_resource::<LevelGeometry>()
            .add_message::<CharacterMessage>()
            .add_message::<DoorMessage>();

        app.configure_sets(
            Update,
            (LocomotionSet::Input, LocomotionSet::Simulate, LocomotionSet::Publish).chain(),
        );

        app.add_systems(Startup, spawn_loaded_level.run_if(resource_exists::<LoadedLevel>));

        // Fixed tick: doors pick targets, characters move, then props and respawns.
        app.add_systems(
            FixedUpdate,
            (
                step_doors,
                step_characters::<PlatformerCharacter>,
                step_characters::<TopDownCharacter>,
                pickup_keys::<PlatformerCharacter>,
                pickup_keys::<TopDownCharacter>,
                use_keys::<PlatformerCharacter>,
                use_keys::<TopDownCharacter>,
                tick_respawn_timers::<PlatformerCharacter>,
                tick_respawn_timers::<TopDownCharacter>,
            )
                .chain(),
        );

        app.add_systems(
            Update,
            (
                register_characters,
                update_characters::<PlatformerCharacter>,
                update_characters::<TopDownCharacter>,
                interact_levers::<PlatformerCharacter>,
                interact_levers::<TopDownCharacter>,
                move_doors,
            )
                .chain()
                .in_set(LocomotionSet::Simulate),
        );

        app.add_systems(
            Update,
            (
                handle_deaths,
                log_messages,
                sync_character_transforms::<PlatformerCharacter>,
                sync_character_transforms::<TopDownCharacter>,
                sync_prop_transforms,
            )
                .chain()
                .in_set(LocomotionSet::Publish),
        );

        app.add_systems(Last, clear_control_edges);
    }
}
