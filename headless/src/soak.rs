//! Seeded random input for soak runs.

use bevy::prelude::*;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::BTreeMap;

use shared::{CharacterRegistry, ControlSnapshot, PlayerControls, PlayerId};

/// Shortest and longest time a random stick direction is kept
const HOLD_RANGE: (f32, f32) = (0.1, 0.8);

#[derive(Debug)]
struct PlayerPlan {
    snapshot: ControlSnapshot,
    remaining: f32,
    jump_hold: f32,
}

#[derive(Resource, Debug)]
pub struct SoakDriver {
    rng: StdRng,
    plans: BTreeMap<PlayerId, PlayerPlan>,
}

impl SoakDriver {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            plans: BTreeMap::new(),
        }
    }

    /// Controls for `player` this frame, picking a new random plan when the old one runs out.
    pub fn next(&mut self, player: PlayerId, dt: f32) -> ControlSnapshot {
        let rng = &mut self.rng;
        let plan = self.plans.entry(player).or_insert(PlayerPlan {
            snapshot: ControlSnapshot::default(),
            remaining: 0.0,
            jump_hold: 0.0,
        });

        plan.remaining -= dt;
        plan.jump_hold = (plan.jump_hold - dt).max(0.0);
        plan.snapshot.jump_pressed = false;
        plan.snapshot.interact_pressed = false;

        if plan.remaining <= 0.0 {
            plan.remaining = rng.gen_range(HOLD_RANGE.0..HOLD_RANGE.1);
            // Mostly walking, sometimes crouching or pushing up
            plan.snapshot.move_vector = Vec2::new(
                rng.gen_range(-1.0..=1.0),
                if rng.gen_bool(0.2) { rng.gen_range(-1.0..=1.0) } else { 0.0 },
            );
            if rng.gen_bool(0.35) {
                plan.snapshot.jump_pressed = true;
                plan.jump_hold = rng.gen_range(0.0..0.5);
            }
            plan.snapshot.interact_pressed = rng.gen_bool(0.1);
        }
        plan.snapshot.jump_held = plan.snapshot.jump_pressed || plan.jump_hold > 0.0;
        plan.snapshot
    }
}

/// Input system: random controls for every registered player.
pub fn drive_soak(
    time: Res<Time>,
    registry: Res<CharacterRegistry>,
    mut driver: ResMut<SoakDriver>,
    mut controls: ResMut<PlayerControls>,
) {
    let dt = time.delta_secs();
    for (player, _) in registry.all() {
        let snapshot = driver.next(player, dt);
        controls.set(player, snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(seed: u64, frames: usize) -> Vec<ControlSnapshot> {
        let mut driver = SoakDriver::new(seed);
        (0..frames).map(|_| driver.next(PlayerId(0), 0.02)).collect()
    }

    #[test]
    fn test_same_seed_same_inputs() {
        assert_eq!(sample(7, 200), sample(7, 200));
        assert_ne!(sample(7, 200), sample(8, 200));
    }

    #[test]
    fn test_inputs_stay_in_range_and_edges_are_single_frame() {
        let inputs = sample(42, 2000);
        assert!(inputs.iter().all(|s| s.move_vector.abs().max_element() <= 1.0));
        assert!(inputs.iter().any(|s| s.jump_pressed));
        for pair in inputs.windows(2) {
            // A new plan is at least HOLD_RANGE.0 long, so presses never repeat back to back
            assert!(!(pair[0].jump_pressed && pair[1].jump_pressed));
        }
    }
}
