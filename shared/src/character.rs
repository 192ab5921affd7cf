//! One interface over both controller variants so the ECS systems can be written once.

use bevy::ecs::component::Mutable;
use bevy::prelude::*;

use crate::config::ColliderShape;
use crate::controls::ControlSnapshot;
use crate::events::CharacterEvent;
use crate::platformer::PlatformerCharacter;
use crate::probe::GroundProbe;
use crate::topdown::TopDownCharacter;
use crate::vitals::DamageOutcome;

pub trait Locomotion: Component<Mutability = Mutable> {
    /// Short name used in logs
    const KIND: &'static str;

    fn frame_step(&mut self, controls: &ControlSnapshot, dt: f32);
    fn fixed_step<P: GroundProbe>(&mut self, probe: &P, dt: f32);

    fn position(&self) -> Vec2;
    fn set_position(&mut self, position: Vec2);
    fn velocity(&self) -> Vec2;
    fn collider(&self) -> ColliderShape;
    fn health(&self) -> f32;
    fn max_health(&self) -> f32;
    fn is_dead(&self) -> bool;

    fn take_damage(&mut self, amount: f32) -> DamageOutcome;
    fn kill(&mut self) -> bool;
    fn respawn(&mut self, position: Vec2);

    /// Move every buffered event into `out`, oldest first.
    fn drain_into(&mut self, out: &mut Vec<CharacterEvent>);
}

impl Locomotion for PlatformerCharacter {
    const KIND: &'static str = "platformer";

    fn frame_step(&mut self, controls: &ControlSnapshot, dt: f32) {
        self.update(controls, dt);
    }

    fn fixed_step<P: GroundProbe>(&mut self, probe: &P, dt: f32) {
        self.fixed_update(probe, dt);
    }

    fn position(&self) -> Vec2 {
        PlatformerCharacter::position(self)
    }

    fn set_position(&mut self, position: Vec2) {
        PlatformerCharacter::set_position(self, position);
    }

    fn velocity(&self) -> Vec2 {
        PlatformerCharacter::velocity(self)
    }

    fn collider(&self) -> ColliderShape {
        *PlatformerCharacter::collider(self)
    }

    fn health(&self) -> f32 {
        PlatformerCharacter::health(self)
    }

    fn max_health(&self) -> f32 {
        PlatformerCharacter::max_health(self)
    }

    fn is_dead(&self) -> bool {
        PlatformerCharacter::is_dead(self)
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        PlatformerCharacter::take_damage(self, amount)
    }

    fn kill(&mut self) -> bool {
        PlatformerCharacter::kill(self)
    }

    fn respawn(&mut self, position: Vec2) {
        PlatformerCharacter::respawn(self, position);
    }

    fn drain_into(&mut self, out: &mut Vec<CharacterEvent>) {
        out.extend(self.drain_events());
    }
}

impl Locomotion for TopDownCharacter {
    const KIND: &'static str = "top-down";

    fn frame_step(&mut self, controls: &ControlSnapshot, dt: f32) {
        self.update(controls, dt);
    }

    fn fixed_step<P: GroundProbe>(&mut self, _probe: &P, dt: f32) {
        self.fixed_update(dt);
    }

    fn position(&self) -> Vec2 {
        TopDownCharacter::position(self)
    }

    fn set_position(&mut self, position: Vec2) {
        TopDownCharacter::set_position(self, position);
    }

    fn velocity(&self) -> Vec2 {
        TopDownCharacter::velocity(self)
    }

    fn collider(&self) -> ColliderShape {
        *TopDownCharacter::collider(self)
    }

    fn health(&self) -> f32 {
        TopDownCharacter::health(self)
    }

    fn max_health(&self) -> f32 {
        TopDownCharacter::max_health(self)
    }

    fn is_dead(&self) -> bool {
        TopDownCharacter::is_dead(self)
    }

    fn take_damage(&mut self, amount: f32) -> DamageOutcome {
        TopDownCharacter::take_damage(self, amount)
    }

    fn kill(&mut self) -> bool {
        TopDownCharacter::kill(self)
    }

    fn respawn(&mut self, position: Vec2) {
        TopDownCharacter::respawn(self, position);
    }

    fn drain_into(&mut self, out: &mut Vec<CharacterEvent>) {
        out.extend(self.drain_events());
    }
}
