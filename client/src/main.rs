//! Windowed client - plays a level with keyboard input
//!
//! Usage: `client [level.ron]` (defaults to `levels/platformer.ron` in the asset folder)

mod camera;
mod input;
mod states;
mod visuals;

use bevy::asset::AssetPlugin;
use bevy::prelude::*;
use bevy::window::WindowResolution;
use std::path::Path;

use input::InputSettings;
use shared::{
    load_level_file, LoadedLevel, LocomotionPlugin, LocomotionSet, PlatformerCharacter,
    TopDownCharacter,
};
use states::GameState;

/// Get the asset path - for bundled apps, use path relative to executable
fn get_asset_path() -> String {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let bundled_assets = exe_dir.join("assets");
            if bundled_assets.exists() {
                info!("Using bundled assets at: {:?}", bundled_assets);
                return bundled_assets.to_string_lossy().to_string();
            }
        }
    }
    "assets".to_string()
}

fn main() -> AppExit {
    let asset_path = get_asset_path();

    let mut app = App::new();
    app.add_plugins(
        DefaultPlugins
            .set(WindowPlugin {
                primary_window: Some(Window {
                    title: "Locomotion".to_string(),
                    resolution: WindowResolution::new(1280, 720),
                    ..default()
                }),
                ..default()
            })
            .set(AssetPlugin {
                file_path: asset_path.clone(),
                ..default()
            }),
    );
    app.insert_resource(ClearColor(Color::srgb(0.08, 0.09, 0.12)));

    let level_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| format!("{asset_path}/levels/platformer.ron"));
    let level = match load_level_file(&level_path) {
        Ok(level) => level,
        Err(e) => {
            error!("Failed to load level: {}", e);
            return AppExit::error();
        }
    };
    info!("Loaded level '{}' from {}", level.name, level_path);

    let settings = InputSettings::load(Path::new(&asset_path).join("controls.ron")).unwrap_or_else(|e| {
        warn!("Ignoring controls.ron, using default bindings: {}", e);
        InputSettings::default()
    });

    app.insert_resource(LoadedLevel(level));
    app.insert_resource(settings);
    app.add_plugins(LocomotionPlugin);
    app.add_plugins(states::PausePlugin);

    app.add_systems(
        Startup,
        (camera::setup_camera, visuals::draw_static_solids, visuals::spawn_hud),
    );

    app.add_systems(
        Update,
        input::read_keyboard
            .in_set(LocomotionSet::Input)
            .run_if(in_state(GameState::Playing)),
    );

    app.add_systems(
        Update,
        (
            visuals::decorate_characters::<PlatformerCharacter>,
            visuals::decorate_characters::<TopDownCharacter>,
            visuals::decorate_props,
            visuals::recolor_levers,
            visuals::animate_characters::<PlatformerCharacter>,
            visuals::animate_characters::<TopDownCharacter>,
            visuals::update_hud,
            camera::attach_camera_target,
            camera::shake_on_damage,
            camera::update_camera,
        )
            .chain()
            .after(LocomotionSet::Publish),
    );

    app.run()
}
