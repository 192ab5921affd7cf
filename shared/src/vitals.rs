//! Health, invulnerability window and death, shared by every character variant.

use crate::events::{CharacterEvent, EventBuffer};

/// Result of a damage request
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DamageOutcome {
    /// Dead, invulnerable, cooling down, or a non-positive amount
    Ignored,
    Hit,
    Killed,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Vitals {
    health: f32,
    max_health: f32,
    invulnerable: bool,
    dead: bool,
    /// Length of the post-hit window
    hit_cooldown: f32,
    /// Time left in the current post-hit window
    cooldown_remaining: Option<f32>,
}

impl Vitals {
    pub fn new(max_health: f32, hit_cooldown: f32, invulnerable: bool) -> Self {
        Self {
            health: max_health,
            max_health,
            invulnerable,
            dead: false,
            hit_cooldown,
            cooldown_remaining: None,
        }
    }

    pub fn health(&self) -> f32 {
        self.health
    }

    pub fn max_health(&self) -> f32 {
        self.max_health
    }

    pub fn percentage(&self) -> f32 {
        self.health / self.max_health
    }

    pub fn is_dead(&self) -> bool {
        self.dead
    }

    pub fn is_invulnerable(&self) -> bool {
        self.invulnerable
    }

    pub fn set_invulnerable(&mut self, invulnerable: bool) {
        self.invulnerable = invulnerable;
    }

    pub fn in_cooldown(&self) -> bool {
        self.cooldown_remaining.is_some()
    }

    /// Advance the post-hit window.
    pub fn tick(&mut self, dt: f32) {
        if let Some(remaining) = self.cooldown_remaining.as_mut() {
            *remaining -= dt;
            if *remaining < 0.0 {
                self.cooldown_remaining = None;
            }
        }
    }

    pub fn take_damage(&mut self, amount: f32, events: &mut EventBuffer) -> DamageOutcome {
        if self.dead || self.invulnerable || self.in_cooldown() {
            return DamageOutcome::Ignored;
        }
        if !(amount.is_finite() && amount > 0.0) {
            return DamageOutcome::Ignored;
        }

        self.health = (self.health - amount).max(0.0);
        if self.hit_cooldown > 0.0 {
            self.cooldown_remaining = Some(self.hit_cooldown);
        }

        if self.health <= 0.0 {
            self.kill(events);
            DamageOutcome::Killed
        } else {
            events.push(CharacterEvent::Hit);
            DamageOutcome::Hit
        }
    }

    pub fn heal(&mut self, amount: f32) {
        if self.dead || !(amount.is_finite() && amount > 0.0) {
            return;
        }
        self.health = (self.health + amount).min(self.max_health);
    }

    /// Returns true only for the call that actually killed.
    pub fn kill(&mut self, events: &mut EventBuffer) -> bool {
        if self.dead {
            return false;
        }
        self.dead = true;
        self.health = 0.0;
        events.push(CharacterEvent::Death);
        true
    }

    /// Back to full health, alive, no pending window.
    pub fn revive(&mut self) {
        self.dead = false;
        self.health = self.max_health;
        self.cooldown_remaining = None;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    #[test]
    fn test_hit_opens_cooldown_window() {
        let mut events = EventBuffer::default();
        let mut vitals = Vitals::new(100.0, 1.0, false);

        assert_eq!(vitals.take_damage(10.0, &mut events), DamageOutcome::Hit);
        assert_eq!(vitals.take_damage(10.0, &mut events), DamageOutcome::Ignored);
        assert_eq!(vitals.health(), 90.0);

        vitals.tick(0.5);
        assert_eq!(vitals.take_damage(10.0, &mut events), DamageOutcome::Ignored);
        vitals.tick(0.6);
        assert_eq!(vitals.take_damage(10.0, &mut events), DamageOutcome::Hit);
        assert_eq!(vitals.health(), 80.0);
        assert_eq!(events.drain().collect::<Vec<_>>(), vec![CharacterEvent::Hit, CharacterEvent::Hit]);
    }

    #[test]
    fn test_lethal_damage_kills_once() {
        let mut events = EventBuffer::default();
        let mut vitals = Vitals::new(50.0, 0.0, false);

        assert_eq!(vitals.take_damage(80.0, &mut events), DamageOutcome::Killed);
        assert_eq!(vitals.health(), 0.0);
        assert!(vitals.is_dead());
        assert!(!vitals.kill(&mut events));
        assert_eq!(vitals.take_damage(1.0, &mut events), DamageOutcome::Ignored);
        assert_eq!(events.drain().collect::<Vec<_>>(), vec![CharacterEvent::Death]);
    }

    #[test]
    fn test_invulnerable_and_bad_amounts_ignored() {
        let mut events = EventBuffer::default();
        let mut vitals = Vitals::new(100.0, 1.0, true);
        assert!(vitals.is_invulnerable());
        assert_eq!(vitals.take_damage(10.0, &mut events), DamageOutcome::Ignored);
        assert_eq!(vitals.percentage(), 1.0);

        vitals.set_invulnerable(false);
        assert!(!vitals.is_invulnerable());
        assert_eq!(vitals.take_damage(-5.0, &mut events), DamageOutcome::Ignored);
        assert_eq!(vitals.take_damage(f32::NAN, &mut events), DamageOutcome::Ignored);
        assert_eq!(vitals.health(), 100.0);
        assert!(events.is_empty());

        assert_eq!(vitals.take_damage(25.0, &mut events), DamageOutcome::Hit);
        assert_eq!(vitals.percentage(), 0.75);
    }

    #[test]
    fn test_heal_clamps_and_skips_dead() {
        let mut events = EventBuffer::default();
        let mut vitals = Vitals::new(100.0, 0.0, false);
        vitals.take_damage(30.0, &mut events);
        vitals.heal(500.0);
        assert_eq!(vitals.health(), 100.0);

        vitals.kill(&mut events);
        vitals.heal(10.0);
        assert_eq!(vitals.health(), 0.0);

        vitals.revive();
        assert!(!vitals.is_dead());
        assert_eq!(vitals.health(), 100.0);
    }

    #[test]
    fn test_health_stays_in_bounds_under_random_traffic() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut events = EventBuffer::default();
        let mut vitals = Vitals::new(100.0, 0.25, false);

        for _ in 0..5_000 {
            match rng.gen_range(0..4) {
                0 => {
                    vitals.take_damage(rng.gen_range(-20.0..60.0), &mut events);
                }
                1 => vitals.heal(rng.gen_range(-20.0..60.0)),
                2 => vitals.tick(rng.gen_range(0.0..0.1)),
                _ => {
                    if vitals.is_dead() && rng.gen_bool(0.2) {
                        vitals.revive();
                    }
                }
            }
            assert!(vitals.health() >= 0.0 && vitals.health() <= vitals.max_health());
        }
    }
}
