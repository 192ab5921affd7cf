//! 2D follow camera
//!
//! Drives the `Camera2d` transform from a [`FollowCamera`] that tracks the level's
//! [`CameraTarget`] and shakes when that character is hurt.

use bevy::camera::ScalingMode;
use bevy::prelude::*;

use shared::{CameraTarget, CharacterEvent, CharacterMessage, FollowCamera, LoadedLevel};

/// Camera depth; perspective lenses measure their frustum from here
const CAMERA_Z: f32 = 10.0;

pub fn setup_camera(mut commands: Commands, level: Res<LoadedLevel>) {
    let level = &level.0;
    let follow_id = level.follow.or_else(|| level.players.first().map(|p| p.id));
    let start = level
        .players
        .iter()
        .find(|p| Some(p.id) == follow_id)
        .map(|p| p.spawn + level.camera.target_offset)
        .unwrap_or(Vec2::ZERO);

    let follow = FollowCamera::new(level.camera.clone(), start.extend(CAMERA_Z));
    let projection = Projection::Orthographic(OrthographicProjection {
        scaling_mode: ScalingMode::FixedVertical {
            viewport_height: follow.frustum_height(),
        },
        ..OrthographicProjection::default_2d()
    });
    commands.spawn((
        Camera2d,
        projection,
        Transform::from_translation(follow.view_position()),
        follow,
        Name::new("Follow Camera"),
    ));
}

/// Pick up the target entity once the level has spawned (or after it was despawned).
pub fn attach_camera_target(
    mut cameras: Query<&mut FollowCamera>,
    targets: Query<Entity, With<CameraTarget>>,
) {
    for mut camera in cameras.iter_mut() {
        let valid = camera.target.is_some_and(|entity| targets.contains(entity));
        if !valid {
            camera.target = targets.iter().next();
        }
    }
}

pub fn shake_on_damage(
    mut cameras: Query<&mut FollowCamera>,
    mut messages: MessageReader<CharacterMessage>,
) {
    for message in messages.read() {
        for mut camera in cameras.iter_mut() {
            if camera.target != Some(message.entity) {
                continue;
            }
            let (intensity, duration) = match message.event {
                CharacterEvent::Hit => camera.config().hit_shake,
                CharacterEvent::Death => camera.config().death_shake,
                _ => continue,
            };
            camera.shake(intensity, duration);
        }
    }
}

pub fn update_camera(
    time: Res<Time>,
    targets: Query<&Transform, (With<CameraTarget>, Without<FollowCamera>)>,
    mut cameras: Query<(&mut FollowCamera, &mut Transform)>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    for (mut camera, mut transform) in cameras.iter_mut() {
        let target = camera
            .target
            .and_then(|entity| targets.get(entity).ok())
            .map(|t| t.translation.truncate());
        camera.update(target, dt);
        transform.translation = camera.view_position();
    }
}
