//! Runtime checks run every frame of a headless session, plus the end-of-run report.

use bevy::prelude::*;
use std::collections::BTreeMap;

use shared::{
    CharacterEvent, CharacterMessage, CharacterRegistry, DoorMessage, Locomotion,
    PlatformerCharacter, PlayerId, TopDownCharacter,
};

/// Violations beyond this many are counted but not logged
const MAX_LOGGED: usize = 20;

#[derive(Resource, Debug, Default)]
pub struct RunReport {
    pub frames: u64,
    pub violations: Vec<String>,
    pub events: BTreeMap<PlayerId, BTreeMap<String, u32>>,
    pub door_cues: u32,
}

impl RunReport {
    fn violation(&mut self, message: String) {
        if self.violations.len() < MAX_LOGGED {
            error!("Invariant violated: {}", message);
        }
        self.violations.push(message);
    }

    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}

/// Check the state of one character. Returns every broken rule.
pub fn check_character<C: Locomotion>(character: &C) -> Vec<String> {
    let mut broken = Vec::new();
    let health = character.health();
    if !(0.0..=character.max_health()).contains(&health) {
        broken.push(format!("health {health} outside [0, {}]", character.max_health()));
    }
    if !character.position().is_finite() || !character.velocity().is_finite() {
        broken.push(format!(
            "non-finite state: position {:?} velocity {:?}",
            character.position(),
            character.velocity()
        ));
    }
    if character.is_dead() && character.velocity() != Vec2::ZERO {
        broken.push(format!("dead but moving at {:?}", character.velocity()));
    }
    if character.is_dead() != (health <= 0.0) {
        broken.push(format!("dead flag {} with health {health}", character.is_dead()));
    }
    broken
}

pub fn check_invariants(
    mut report: ResMut<RunReport>,
    registry: Res<CharacterRegistry>,
    platformers: Query<(&PlayerId, &PlatformerCharacter)>,
    top_downs: Query<(&PlayerId, &TopDownCharacter)>,
) {
    report.frames += 1;
    let frame = report.frames;

    for (player, character) in platformers.iter() {
        for rule in check_character(character) {
            report.violation(format!("frame {frame}, player {}: {rule}", player.0));
        }
    }
    for (player, character) in top_downs.iter() {
        for rule in check_character(character) {
            report.violation(format!("frame {frame}, player {}: {rule}", player.0));
        }
    }

    for (player, entity) in registry.all() {
        let alive = platformers.get(entity).map(|(id, _)| *id).ok()
            .or_else(|| top_downs.get(entity).map(|(id, _)| *id).ok());
        if alive != Some(player) {
            report.violation(format!("frame {frame}: registry maps player {} to a stale entity", player.0));
        }
    }
}

/// Count every published message per player.
pub fn tally_messages(
    mut report: ResMut<RunReport>,
    mut characters: MessageReader<CharacterMessage>,
    mut doors: MessageReader<DoorMessage>,
) {
    for message in characters.read() {
        let name = match message.event {
            CharacterEvent::Jump => "jump",
            CharacterEvent::Land => "land",
            CharacterEvent::Crouch => "crouch",
            CharacterEvent::Hit => "hit",
            CharacterEvent::Death => "death",
        };
        *report
            .events
            .entry(message.player)
            .or_default()
            .entry(name.to_string())
            .or_default() += 1;
    }
    report.door_cues += doors.read().count() as u32;
}

/// Log the final state of every character and the message tally.
pub fn log_report(
    report: &RunReport,
    platformers: &[(PlayerId, Vec2, f32, bool)],
) {
    info!("Run finished after {} frame(s)", report.frames);
    for (player, position, health, dead) in platformers {
        info!(
            "  player {}: position ({:.2}, {:.2}), health {:.1}{}",
            player.0,
            position.x,
            position.y,
            health,
            if *dead { ", dead" } else { "" }
        );
        if let Some(events) = report.events.get(player) {
            info!("    events: {:?}", events);
        }
    }
    info!("  door cues: {}", report.door_cues);
    if report.is_clean() {
        info!("All invariants held");
    } else {
        error!("{} invariant violation(s)", report.violations.len());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shared::{CharacterConfig, TopDownConfig};

    #[test]
    fn test_fresh_characters_are_clean() {
        let platformer = PlatformerCharacter::new(CharacterConfig::default(), Vec2::ZERO).unwrap();
        assert!(check_character(&platformer).is_empty());
        let top_down = TopDownCharacter::new(TopDownConfig::default(), Vec2::ZERO).unwrap();
        assert!(check_character(&top_down).is_empty());
    }

    #[test]
    fn test_killed_character_stays_clean() {
        let mut platformer = PlatformerCharacter::new(CharacterConfig::default(), Vec2::ZERO).unwrap();
        platformer.kill();
        assert!(check_character(&platformer).is_empty());
    }
}
