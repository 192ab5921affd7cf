//! Flat-colour sprites for everything the simulation spawns, plus a small HUD.

use bevy::prelude::*;

use shared::{
    CameraTarget, Door, KeyRing, LeverState, Lever, LoadedLevel, Locomotion, LooseKey,
    PlatformerCharacter, PlayerId, TopDownCharacter,
};

const SOLID_COLOR: Color = Color::srgb(0.35, 0.37, 0.42);
const TRIGGER_COLOR: Color = Color::srgba(0.3, 0.8, 0.4, 0.25);
const DOOR_COLOR: Color = Color::srgb(0.55, 0.36, 0.2);
const KEY_COLOR: Color = Color::srgb(0.95, 0.8, 0.2);
const VISOR_COLOR: Color = Color::srgb(0.95, 0.95, 0.95);
const PLAYER_COLORS: [Color; 4] = [
    Color::srgb(0.2, 0.5, 0.95),
    Color::srgb(0.9, 0.3, 0.3),
    Color::srgb(0.3, 0.8, 0.4),
    Color::srgb(0.8, 0.4, 0.9),
];

const LEVER_SIZE: Vec2 = Vec2::new(0.3, 0.6);
const KEY_SIZE: Vec2 = Vec2::new(0.35, 0.2);
const VISOR_SIZE: f32 = 0.2;

/// Sprite child showing a character's collider
#[derive(Component)]
pub struct CharacterBody;

/// Small sprite child showing which way a character faces
#[derive(Component)]
pub struct Visor;

#[derive(Component)]
pub struct HudText;

/// Where a character is looking, for the visor.
pub trait Facing {
    fn look(&self) -> Vec2;
}

impl Facing for PlatformerCharacter {
    fn look(&self) -> Vec2 {
        Vec2::new(self.facing(), 0.0)
    }
}

impl Facing for TopDownCharacter {
    fn look(&self) -> Vec2 {
        self.facing()
    }
}

fn player_color(player: PlayerId) -> Color {
    PLAYER_COLORS[player.0 as usize % PLAYER_COLORS.len()]
}

fn lever_color(state: LeverState) -> Color {
    match state {
        LeverState::Left => Color::srgb(0.8, 0.25, 0.2),
        LeverState::Center => Color::srgb(0.85, 0.65, 0.2),
        LeverState::Right => Color::srgb(0.25, 0.8, 0.3),
        LeverState::Disabled => Color::srgb(0.4, 0.4, 0.4),
    }
}

/// Static level solids never change, so they are drawn once from the level description.
pub fn draw_static_solids(mut commands: Commands, level: Res<LoadedLevel>) {
    for (i, solid) in level.0.solids.iter().enumerate() {
        let color = if solid.trigger { TRIGGER_COLOR } else { SOLID_COLOR };
        commands.spawn((
            Sprite::from_color(color, solid.size),
            Transform::from_translation(solid.center.extend(-1.0)),
            Name::new(format!("Solid {i}")),
        ));
    }
}

pub fn decorate_characters<C: Locomotion>(
    mut commands: Commands,
    added: Query<(Entity, &PlayerId, &C), Added<C>>,
) {
    for (entity, player, character) in added.iter() {
        let collider = character.collider();
        commands
            .entity(entity)
            .insert(Visibility::default())
            .with_children(|parent| {
                parent.spawn((
                    CharacterBody,
                    Sprite::from_color(player_color(*player), collider.size),
                    Transform::from_translation(collider.offset.extend(0.0)),
                ));
                parent.spawn((
                    Visor,
                    Sprite::from_color(VISOR_COLOR, Vec2::splat(VISOR_SIZE)),
                    Transform::from_xyz(0.0, collider.size.y * 0.25, 0.1),
                ));
            });
    }
}

/// Keep body sprites in step with crouching, facing and death.
pub fn animate_characters<C: Locomotion + Facing>(
    characters: Query<(&PlayerId, &C, &Children)>,
    mut bodies: Query<(&mut Sprite, &mut Transform), (With<CharacterBody>, Without<Visor>)>,
    mut visors: Query<&mut Transform, (With<Visor>, Without<CharacterBody>)>,
) {
    for (player, character, children) in characters.iter() {
        let collider = character.collider();
        let look = character.look();
        for &child in &**children {
            if let Ok((mut sprite, mut transform)) = bodies.get_mut(child) {
                sprite.custom_size = Some(collider.size);
                sprite.color = if character.is_dead() {
                    player_color(*player).with_alpha(0.3)
                } else {
                    player_color(*player)
                };
                transform.translation.x = collider.offset.x;
                transform.translation.y = collider.offset.y;
            }
            if let Ok(mut transform) = visors.get_mut(child) {
                let reach = collider.half_extents() * 0.6;
                let head = collider.offset + Vec2::new(0.0, collider.size.y * 0.25);
                transform.translation.x = head.x + look.x * reach.x;
                transform.translation.y = head.y + look.y * reach.y;
            }
        }
    }
}

pub fn decorate_props(
    mut commands: Commands,
    doors: Query<(Entity, &Door), Added<Door>>,
    levers: Query<(Entity, &Lever), Added<Lever>>,
    keys: Query<Entity, Added<LooseKey>>,
) {
    for (entity, door) in doors.iter() {
        commands
            .entity(entity)
            .insert(Sprite::from_color(DOOR_COLOR, door.config().size));
    }
    for (entity, lever) in levers.iter() {
        commands
            .entity(entity)
            .insert(Sprite::from_color(lever_color(lever.state), LEVER_SIZE));
    }
    for entity in keys.iter() {
        commands.entity(entity).insert(Sprite::from_color(KEY_COLOR, KEY_SIZE));
    }
}

pub fn recolor_levers(mut levers: Query<(&Lever, &mut Sprite), Changed<Lever>>) {
    for (lever, mut sprite) in levers.iter_mut() {
        sprite.color = lever_color(lever.state);
    }
}

pub fn spawn_hud(mut commands: Commands) {
    commands.spawn((
        HudText,
        Text::new(""),
        TextFont {
            font_size: 16.0,
            ..default()
        },
        TextColor(Color::WHITE),
        Node {
            position_type: PositionType::Absolute,
            top: Val::Px(10.0),
            left: Val::Px(10.0),
            ..default()
        },
    ));
}

fn hud_line<C: Locomotion>(player: PlayerId, character: &C, ring: &KeyRing) -> String {
    let status = if character.is_dead() { "  (respawning)" } else { "" };
    format!(
        "Player {}  HP {:.0}/{:.0}  keys {}{}",
        player.0,
        character.health(),
        character.max_health(),
        ring.len(),
        status
    )
}

pub fn update_hud(
    platformers: Query<(&PlayerId, &PlatformerCharacter, &KeyRing), With<CameraTarget>>,
    top_downs: Query<(&PlayerId, &TopDownCharacter, &KeyRing), With<CameraTarget>>,
    mut hud: Query<&mut Text, With<HudText>>,
) {
    let Ok(mut text) = hud.single_mut() else {
        return;
    };
    let line = platformers
        .iter()
        .map(|(p, c, r)| hud_line(*p, c, r))
        .chain(top_downs.iter().map(|(p, c, r)| hud_line(*p, c, r)))
        .next()
        .unwrap_or_default();
    if text.0 != line {
        text.0 = line;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{CharacterConfig, TopDownConfig};

    #[test]
    fn test_hud_line() {
        let mut character = PlatformerCharacter::new(CharacterConfig::default(), Vec2::ZERO).unwrap();
        let ring = KeyRing::default();
        assert_eq!(hud_line(PlayerId(0), &character, &ring), "Player 0  HP 100/100  keys 0");
        character.kill();
        assert!(hud_line(PlayerId(0), &character, &ring).ends_with("(respawning)"));
    }

    #[test]
    fn test_facing_directions() {
        let platformer = PlatformerCharacter::new(CharacterConfig::default(), Vec2::ZERO).unwrap();
        assert_eq!(platformer.look().y, 0.0);
        assert_eq!(platformer.look().x.abs(), 1.0);
        let top_down = TopDownCharacter::new(TopDownConfig::default(), Vec2::ZERO).unwrap();
        assert!(top_down.look().is_finite());
    }
}
