//! Simulation systems: level spawning, controller ticks, props, death and respawn.
//!
//! Generic over [`Locomotion`] so platformer and top-down characters share one code path.

use bevy::prelude::*;

use crate::character::Locomotion;
use crate::components::{
    CameraTarget, KeyRing, LooseKey, PropPosition, RespawnTimer, SpawnPoint,
};
use crate::controls::PlayerControls;
use crate::door::{Door, Key, Lever};
use crate::events::{CharacterEvent, CharacterMessage, DoorMessage};
use crate::level::{Aabb, ControllerDesc, LevelDesc, LevelGeometry};
use crate::physics::move_body;
use crate::platformer::PlatformerCharacter;
use crate::registry::{CharacterRegistry, PlayerId};
use crate::topdown::TopDownCharacter;

/// Max distance from a character's centre to pick up a key
const KEY_PICKUP_RANGE: f32 = 0.75;
/// Max distance from a character's centre to flip a lever
const LEVER_RANGE: f32 = 1.0;
/// How close a character must be to a door panel to try its keys
const DOOR_TOUCH_MARGIN: f32 = 0.2;
/// Collision layer of door panels
const DOOR_LAYER: u32 = 0;

/// Level to spawn at startup
#[derive(Resource, Clone, Debug)]
pub struct LoadedLevel(pub LevelDesc);

// =============================================================================
// SPAWNING
// =============================================================================

/// Spawn every entity of `level` and rebuild `geometry` from it.
///
/// Returns the spawned characters. Fails if a controller rejects its configuration.
pub fn spawn_level_entities(
    commands: &mut Commands,
    geometry: &mut LevelGeometry,
    level: &LevelDesc,
) -> Result<Vec<(PlayerId, Entity)>, String> {
    *geometry = level.static_geometry();
    let follow = level.follow.or_else(|| level.players.first().map(|p| p.id));

    let mut players = Vec::with_capacity(level.players.len());
    for desc in &level.players {
        let id = PlayerId(desc.id);
        let entity = commands.spawn_empty().id();
        let mut entity_commands = commands.entity(entity);
        entity_commands.insert((
            id,
            SpawnPoint(desc.spawn),
            KeyRing::default(),
            Transform::from_translation(desc.spawn.extend(1.0)),
            Name::new(format!("Player {}", desc.id)),
        ));

        match &desc.controller {
            ControllerDesc::Platformer(config) => {
                let mut character = PlatformerCharacter::new(config.clone(), desc.spawn)
                    .map_err(|e| format!("player {}: {e}", desc.id))?;
                character.attach_body(entity);
                entity_commands.insert(character);
            }
            ControllerDesc::TopDown(config) => {
                let character = TopDownCharacter::new(config.clone(), desc.spawn)
                    .map_err(|e| format!("player {}: {e}", desc.id))?;
                entity_commands.insert(character);
            }
        }

        if follow == Some(desc.id) {
            entity_commands.insert(CameraTarget);
        }
        players.push((id, entity));
    }

    let levers: Vec<Entity> = level
        .levers
        .iter()
        .enumerate()
        .map(|(i, desc)| {
            commands
                .spawn((
                    desc.lever.clone(),
                    PropPosition(desc.position),
                    Transform::from_translation(desc.position.extend(0.0)),
                    Name::new(format!("Lever {i}")),
                ))
                .id()
        })
        .collect();

    for (i, desc) in level.doors.iter().enumerate() {
        let door_levers = desc.levers.iter().filter_map(|&l| levers.get(l).copied()).collect();
        let door = Door::new(
            desc.config.clone(),
            desc.position.extend(0.0),
            desc.angle.to_radians(),
            door_levers,
        );
        let center = door.position().truncate();
        let entity = commands
            .spawn((
                door,
                PropPosition(center),
                Transform::from_translation(center.extend(0.5)),
                Name::new(format!("Door {i}")),
            ))
            .id();
        geometry.set_bounds(entity, Aabb::from_center_size(center, desc.config.size), DOOR_LAYER);
    }

    for desc in &level.keys {
        commands.spawn((
            desc.key,
            LooseKey,
            PropPosition(desc.position),
            Transform::from_translation(desc.position.extend(0.5)),
            Name::new(format!("Key {}", desc.key.key_index)),
        ));
    }

    Ok(players)
}

/// Startup system: spawn the [`LoadedLevel`], or exit with an error.
pub fn spawn_loaded_level(
    mut commands: Commands,
    level: Res<LoadedLevel>,
    mut geometry: ResMut<LevelGeometry>,
    mut exit: MessageWriter<AppExit>,
) {
    match spawn_level_entities(&mut commands, &mut geometry, &level.0) {
        Ok(players) => info!(
            "Level '{}' spawned: {} character(s), {} solid(s)",
            level.0.name,
            players.len(),
            geometry.solids().len()
        ),
        Err(e) => {
            error!("Failed to spawn level '{}': {}", level.0.name, e);
            exit.write(AppExit::error());
        }
    }
}

/// Keep the registry in step with character entities.
pub fn register_characters(
    mut registry: ResMut<CharacterRegistry>,
    added: Query<(Entity, &PlayerId), Added<PlayerId>>,
    mut removed: RemovedComponents<PlayerId>,
) {
    for entity in removed.read() {
        if let Some(player) = registry.unregister(entity) {
            info!("Player {} unregistered", player.0);
        }
    }
    for (entity, player) in added.iter() {
        if let Some(previous) = registry.register(*player, entity) {
            if previous != entity {
                warn!("Player {} re-registered: {:?} replaces {:?}", player.0, entity, previous);
            }
        }
        info!("Player {} registered as {:?}", player.0, entity);
    }
}

// =============================================================================
// CHARACTERS
// =============================================================================

fn publish(
    messages: &mut MessageWriter<CharacterMessage>,
    buffer: &mut Vec<CharacterEvent>,
    entity: Entity,
    player: PlayerId,
) {
    for event in buffer.drain(..) {
        messages.write(CharacterMessage { entity, player, event });
    }
}

/// Frame tick for every character of kind `C`.
pub fn update_characters<C: Locomotion>(
    time: Res<Time>,
    controls: Res<PlayerControls>,
    mut characters: Query<(Entity, &PlayerId, &mut C)>,
    mut messages: MessageWriter<CharacterMessage>,
) {
    let dt = time.delta_secs();
    if dt <= 0.0 {
        return;
    }
    let mut buffer = Vec::new();
    for (entity, player, mut character) in characters.iter_mut() {
        character.frame_step(&controls.get(*player), dt);
        character.drain_into(&mut buffer);
        publish(&mut messages, &mut buffer, entity, *player);
    }
}

/// Fixed tick for every character of kind `C`, then move its body through the level.
pub fn step_characters<C: Locomotion>(
    time: Res<Time>,
    geometry: Res<LevelGeometry>,
    mut characters: Query<(Entity, &PlayerId, &mut C)>,
    mut messages: MessageWriter<CharacterMessage>,
) {
    let dt = time.delta_secs();
    let mut buffer = Vec::new();
    for (entity, player, mut character) in characters.iter_mut() {
        character.fixed_step(&*geometry, dt);
        if !character.is_dead() {
            let moved = move_body(
                &geometry,
                character.position(),
                &character.collider(),
                character.velocity(),
                dt,
                Some(entity),
            );
            character.set_position(moved.position);
        }
        character.drain_into(&mut buffer);
        publish(&mut messages, &mut buffer, entity, *player);
    }
}

pub fn sync_character_transforms<C: Locomotion>(mut characters: Query<(&C, &mut Transform)>) {
    for (character, mut transform) in characters.iter_mut() {
        let position = character.position();
        transform.translation.x = position.x;
        transform.translation.y = position.y;
    }
}

// =============================================================================
// DOORS, LEVERS & KEYS
// =============================================================================

/// Fixed tick: recompute each door's activation and target.
pub fn step_doors(
    levers: Query<&Lever>,
    mut doors: Query<(Entity, &mut Door)>,
    mut messages: MessageWriter<DoorMessage>,
) {
    for (entity, mut door) in doors.iter_mut() {
        let required = door.config().lever_state_required;
        let activation =
            Door::lever_activation(door.levers.iter().filter_map(|&l| levers.get(l).ok()), required);
        if let Some(cue) = door.fixed_update(activation) {
            messages.write(DoorMessage { entity, cue });
        }
    }
}

/// Frame tick: slide doors and move their solids along.
pub fn move_doors(
    time: Res<Time>,
    mut geometry: ResMut<LevelGeometry>,
    mut doors: Query<(Entity, &mut Door, &mut PropPosition)>,
) {
    let dt = time.delta_secs();
    for (entity, mut door, mut position) in doors.iter_mut() {
        door.update(dt);
        let center = door.position().truncate();
        if position.0 != center {
            position.0 = center;
            geometry.set_bounds(entity, Aabb::from_center_size(center, door.config().size), DOOR_LAYER);
        }
    }
}

/// Interact near a lever flips the closest one.
pub fn interact_levers<C: Locomotion>(
    controls: Res<PlayerControls>,
    characters: Query<(&PlayerId, &C)>,
    mut levers: Query<(Entity, &PropPosition, &mut Lever)>,
) {
    for (player, character) in characters.iter() {
        if character.is_dead() || !controls.get(*player).interact_pressed {
            continue;
        }
        let pos = character.position();
        let nearest = levers
            .iter()
            .map(|(entity, lever_pos, _)| (entity, lever_pos.0.distance(pos)))
            .filter(|(_, dist)| *dist < LEVER_RANGE)
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .map(|(entity, _)| entity);

        if let Some(entity) = nearest {
            if let Ok((_, _, mut lever)) = levers.get_mut(entity) {
                lever.toggle();
                info!("Player {} flipped lever {:?} to {:?}", player.0, entity, lever.state);
            }
        }
    }
}

/// Characters pick up loose keys they walk over.
pub fn pickup_keys<C: Locomotion>(
    mut commands: Commands,
    mut characters: Query<(&PlayerId, &C, &mut KeyRing)>,
    keys: Query<(Entity, &Key, &PropPosition), With<LooseKey>>,
) {
    let mut taken = Vec::new();
    for (player, character, mut ring) in characters.iter_mut() {
        if character.is_dead() {
            continue;
        }
        for (entity, key, position) in keys.iter() {
            if taken.contains(&entity) || position.0.distance(character.position()) >= KEY_PICKUP_RANGE {
                continue;
            }
            ring.keys.push(*key);
            taken.push(entity);
            commands.entity(entity).despawn();
            info!("Player {} picked up key {}", player.0, key.key_index);
        }
    }
}

/// Characters touching a door try every key they carry on it.
pub fn use_keys<C: Locomotion>(
    mut characters: Query<(&PlayerId, &C, &mut KeyRing)>,
    mut doors: Query<(Entity, &mut Door)>,
) {
    for (player, character, mut ring) in characters.iter_mut() {
        if character.is_dead() || ring.is_empty() {
            continue;
        }
        let collider = character.collider();
        let body = Aabb::from_center_size(character.position() + collider.offset, collider.size)
            .expanded(DOOR_TOUCH_MARGIN);

        for (entity, mut door) in doors.iter_mut() {
            let panel = Aabb::from_center_size(door.position().truncate(), door.config().size);
            if !panel.overlaps(&body) {
                continue;
            }
            let door: &mut Door = &mut door;
            if let Some(index) = ring.keys.iter().position(|key| key.try_open_door(&mut *door)) {
                let key = ring.keys.remove(index);
                info!("Player {} unlocked door {:?} with key {}", player.0, entity, key.key_index);
            }
        }
    }
}

// =============================================================================
// DEATH & RESPAWN
// =============================================================================

/// Start respawn timers and reset doors when anyone dies.
pub fn handle_deaths(
    mut commands: Commands,
    mut messages: MessageReader<CharacterMessage>,
    mut doors: Query<&mut Door>,
) {
    for message in messages.read() {
        if message.event != CharacterEvent::Death {
            continue;
        }
        info!("Player {} died! Starting respawn timer", message.player.0);
        commands.entity(message.entity).try_insert(RespawnTimer::default());

        for mut door in doors.iter_mut() {
            if door.config().reset_on_death {
                door.reset();
            }
        }
    }
}

/// Tick respawn timers and respawn characters when ready
pub fn tick_respawn_timers<C: Locomotion>(
    mut commands: Commands,
    time: Res<Time>,
    mut characters: Query<(Entity, &PlayerId, &SpawnPoint, &mut C, &mut RespawnTimer)>,
) {
    let dt = time.delta_secs();
    for (entity, player, spawn, mut character, mut timer) in characters.iter_mut() {
        timer.time_remaining -= dt;
        if timer.time_remaining <= 0.0 {
            info!("Respawning player {} ({}) at {:?}", player.0, C::KIND, spawn.0);
            character.respawn(spawn.0);
            commands.entity(entity).remove::<RespawnTimer>();
        }
    }
}

// =============================================================================
// BOOKKEEPING
// =============================================================================

pub fn sync_prop_transforms(mut props: Query<(&PropPosition, &mut Transform), Changed<PropPosition>>) {
    for (position, mut transform) in props.iter_mut() {
        transform.translation.x = position.0.x;
        transform.translation.y = position.0.y;
    }
}

pub fn log_messages(
    mut characters: MessageReader<CharacterMessage>,
    mut doors: MessageReader<DoorMessage>,
) {
    for message in characters.read() {
        match message.event {
            CharacterEvent::Hit | CharacterEvent::Death => {
                info!("Player {}: {:?}", message.player.0, message.event)
            }
            _ => debug!("Player {}: {:?}", message.player.0, message.event),
        }
    }
    for message in doors.read() {
        debug!("Door {:?}: {:?}", message.entity, message.cue);
    }
}

/// Edge-triggered inputs last one frame.
pub fn clear_control_edges(mut controls: ResMut<PlayerControls>) {
    controls.end_frame();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controls::ControlSnapshot;
    use crate::plugin::LocomotionPlugin;
    use bevy::time::TimeUpdateStrategy;
    use std::time::Duration;

    #[derive(Resource, Default)]
    struct Recorded(Vec<CharacterEvent>);

    fn record(mut messages: MessageReader<CharacterMessage>, mut recorded: ResMut<Recorded>) {
        recorded.0.extend(messages.read().map(|m| m.event));
    }

    fn test_app(level: &str) -> App {
        let level = LevelDesc::from_ron_str(level).unwrap();
        let mut app = App::new();
        app.add_plugins((MinimalPlugins, LocomotionPlugin));
        app.insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_millis(20)));
        app.insert_resource(LoadedLevel(level));
        app.init_resource::<Recorded>();
        app.add_systems(Last, record);
        app
    }

    fn run(app: &mut App, frames: usize) {
        for _ in 0..frames {
            app.update();
        }
    }

    fn player(app: &App) -> Entity {
        app.world()
            .resource::<CharacterRegistry>()
            .get(PlayerId(0))
            .unwrap()
    }

    fn platformer(app: &App) -> &PlatformerCharacter {
        app.world().get::<PlatformerCharacter>(player(app)).unwrap()
    }

    fn press(app: &mut App, snapshot: ControlSnapshot) {
        app.world_mut()
            .resource_mut::<PlayerControls>()
            .set(PlayerId(0), snapshot);
    }

    fn first_door(app: &mut App) -> Door {
        let world = app.world_mut();
        let mut doors = world.query::<&Door>();
        doors.iter(world).next().unwrap().clone()
    }

    const FLOOR: &str = "solids: [(center: (0.0, -0.5), size: (40.0, 1.0))]";

    fn level(extra: &str) -> String {
        format!(
            "({FLOOR}, players: [(id: 0, spawn: (0.0, 0.8), controller: Platformer(()))], {extra})"
        )
    }

    #[test]
    fn test_spawned_character_walks_on_floor() {
        let mut app = test_app(&level(""));
        app.update();
        assert_eq!(app.world().resource::<CharacterRegistry>().len(), 1);

        press(&mut app, ControlSnapshot { move_vector: Vec2::X, ..default() });
        run(&mut app, 50);

        let ch = platformer(&app);
        assert!(ch.position().x > 2.0);
        assert!(ch.is_grounded());
        assert!((ch.position().y - 0.8).abs() < 1e-3);

        let transform = app.world().get::<Transform>(player(&app)).unwrap();
        assert_eq!(transform.translation.x, ch.position().x);
    }

    #[test]
    fn test_jump_publishes_jump_then_land() {
        let mut app = test_app(&level(""));
        run(&mut app, 5);
        app.world_mut().resource_mut::<Recorded>().0.clear();

        press(&mut app, ControlSnapshot { jump_pressed: true, jump_held: true, ..default() });
        app.update();
        assert!(platformer(&app).is_jumping());
        run(&mut app, 100);

        assert_eq!(
            app.world().resource::<Recorded>().0,
            vec![CharacterEvent::Jump, CharacterEvent::Land]
        );
        assert!(platformer(&app).is_grounded());
    }

    #[test]
    fn test_lever_opens_door() {
        let mut app = test_app(&level(
            "levers: [(position: (0.5, 0.5))], doors: [(position: (4.0, 1.0), angle: 90.0, levers: [0])]",
        ));
        run(&mut app, 5);
        assert!(!first_door(&mut app).is_opened());

        press(&mut app, ControlSnapshot { interact_pressed: true, ..default() });
        app.update();
        run(&mut app, 100);
        assert!(first_door(&mut app).is_opened());
    }

    #[test]
    fn test_death_resets_doors_and_respawns() {
        let mut app = test_app(&level(
            "levers: [(position: (0.5, 0.5))], doors: [(position: (4.0, 1.0), angle: 90.0, levers: [0])]",
        ));
        run(&mut app, 5);
        press(&mut app, ControlSnapshot { interact_pressed: true, ..default() });
        run(&mut app, 100);
        assert!(first_door(&mut app).is_opened());

        let entity = player(&app);
        assert!(app.world_mut().get_mut::<PlatformerCharacter>(entity).unwrap().kill());
        app.update();
        assert!(app.world().get::<RespawnTimer>(entity).is_some());
        assert!(!first_door(&mut app).is_opened());
        assert!(app.world().resource::<Recorded>().0.contains(&CharacterEvent::Death));

        run(&mut app, 220);
        let ch = platformer(&app);
        assert!(!ch.is_dead());
        assert_eq!(ch.health(), ch.max_health());
        assert!((ch.position() - Vec2::new(0.0, 0.8)).length() < 1e-3);
        assert!(app.world().get::<RespawnTimer>(entity).is_none());
    }

    #[test]
    fn test_key_is_picked_up_and_opens_door() {
        let mut app = test_app(&level(
            "keys: [(position: (2.0, 0.5), key: (key_index: 1, key_value: 1))], \
             doors: [(position: (4.0, 1.0), angle: 90.0, config: (key_can_open: true, key_index: 1))]",
        ));
        run(&mut app, 5);
        press(&mut app, ControlSnapshot { move_vector: Vec2::X, ..default() });
        run(&mut app, 150);

        let world = app.world_mut();
        assert_eq!(world.query::<&LooseKey>().iter(world).count(), 0);
        let entity = player(&app);
        assert!(app.world().get::<KeyRing>(entity).unwrap().is_empty());
        let door = first_door(&mut app);
        assert_eq!(door.keys_inside(), 1);
        assert!(door.is_opened());
        assert!(platformer(&app).position().x > 4.5);
    }

    #[test]
    fn test_despawned_character_is_unregistered() {
        let mut app = test_app(&level(""));
        app.update();
        let entity = player(&app);
        app.world_mut().despawn(entity);
        app.update();
        assert!(app.world().resource::<CharacterRegistry>().is_empty());
    }

    #[test]
    fn test_top_down_character_moves_freely() {
        let mut app = test_app(
            "(players: [(id: 0, spawn: (0.0, 0.0), controller: TopDown(()))])",
        );
        app.update();
        press(&mut app, ControlSnapshot { move_vector: Vec2::new(0.0, 1.0), ..default() });
        run(&mut app, 50);
        let entity = player(&app);
        let ch = app.world().get::<TopDownCharacter>(entity).unwrap();
        assert!(ch.position().y > 2.0);
        assert!(ch.position().x.abs() < 1e-5);
    }
}
