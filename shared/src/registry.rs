//! Live character lookup by player id.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Player identifier (one controllable character per id)
#[derive(Component, Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PlayerId(pub u32);

/// Live characters by player id. Mutated only when characters spawn or despawn.
#[derive(Resource, Default, Debug)]
pub struct CharacterRegistry {
    by_id: HashMap<PlayerId, Entity>,
}

impl CharacterRegistry {
    /// Register `entity` as `player`'s character. A later registration replaces an earlier one.
    pub fn register(&mut self, player: PlayerId, entity: Entity) -> Option<Entity> {
        self.by_id.insert(player, entity)
    }

    /// Drop whichever id points at `entity`.
    pub fn unregister(&mut self, entity: Entity) -> Option<PlayerId> {
        let player = self
            .by_id
            .iter()
            .find_map(|(id, e)| (*e == entity).then_some(*id))?;
        self.by_id.remove(&player);
        Some(player)
    }

    pub fn get(&self, player: PlayerId) -> Option<Entity> {
        self.by_id.get(&player).copied()
    }

    /// All registered characters, sorted by player id for stable iteration.
    pub fn all(&self) -> Vec<(PlayerId, Entity)> {
        let mut all: Vec<_> = self.by_id.iter().map(|(id, e)| (*id, *e)).collect();
        all.sort_by_key(|(id, _)| *id);
        all
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }

    /// Closest character strictly within `range` of `pos`.
    ///
    /// `lookup` resolves an entity to its position and death flag; entities it can't
    /// resolve are skipped.
    pub fn nearest(
        &self,
        pos: Vec2,
        range: f32,
        alive_only: bool,
        lookup: impl Fn(Entity) -> Option<(Vec2, bool)>,
    ) -> Option<(PlayerId, Entity)> {
        let mut best = None;
        let mut min_dist = range;
        for (id, entity) in self.all() {
            let Some((position, dead)) = lookup(entity) else {
                continue;
            };
            if alive_only && dead {
                continue;
            }
            let dist = position.distance(pos);
            if dist < min_dist {
                min_dist = dist;
                best = Some((id, entity));
            }
        }
        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_register_lookup_unregister() {
        let mut world = World::new();
        let mut registry = CharacterRegistry::default();
        let a = world.spawn_empty().id();
        let b = world.spawn_empty().id();
        registry.register(PlayerId(0), a);
        registry.register(PlayerId(1), b);

        assert_eq!(registry.get(PlayerId(1)), Some(b));
        assert_eq!(registry.all(), vec![(PlayerId(0), a), (PlayerId(1), b)]);

        assert_eq!(registry.unregister(a), Some(PlayerId(0)));
        assert_eq!(registry.get(PlayerId(0)), None);
        assert_eq!(registry.unregister(a), None);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_nearest_respects_range_and_alive_filter() {
        let mut world = World::new();
        let mut registry = CharacterRegistry::default();
        let near_dead = world.spawn_empty().id();
        let far_alive = world.spawn_empty().id();
        registry.register(PlayerId(0), near_dead);
        registry.register(PlayerId(1), far_alive);

        let lookup = |e: Entity| {
            if e == near_dead {
                Some((Vec2::new(1.0, 0.0), true))
            } else {
                Some((Vec2::new(5.0, 0.0), false))
            }
        };

        assert_eq!(registry.nearest(Vec2::ZERO, 100.0, false, lookup), Some((PlayerId(0), near_dead)));
        assert_eq!(registry.nearest(Vec2::ZERO, 100.0, true, lookup), Some((PlayerId(1), far_alive)));
        assert_eq!(registry.nearest(Vec2::ZERO, 3.0, true, lookup), None);
    }
}
