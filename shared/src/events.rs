//! Discrete notifications produced by the simulation.
//!
//! Controllers buffer [`CharacterEvent`]s at the exact point of each state transition. The
//! simulation systems drain those buffers every tick and publish them as Bevy messages so
//! animation, audio, HUD and logging can react without the controller knowing about them.

use bevy::prelude::*;

use crate::door::DoorCue;
use crate::registry::PlayerId;

/// A state transition of a single character.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CharacterEvent {
    Jump,
    Land,
    Crouch,
    Hit,
    Death,
}

/// Ordered event buffer owned by a controller.
#[derive(Clone, Debug, Default)]
pub struct EventBuffer {
    pending: Vec<CharacterEvent>,
}

impl EventBuffer {
    pub fn push(&mut self, event: CharacterEvent) {
        self.pending.push(event);
    }

    /// Take every buffered event, oldest first.
    pub fn drain(&mut self) -> std::vec::Drain<'_, CharacterEvent> {
        self.pending.drain(..)
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

/// Character transition, published once per occurrence
#[derive(Message, Clone, Debug)]
pub struct CharacterMessage {
    pub entity: Entity,
    pub player: PlayerId,
    pub event: CharacterEvent,
}

/// Door state-entry cue (open/close), published once per transition edge
#[derive(Message, Clone, Debug)]
pub struct DoorMessage {
    pub entity: Entity,
    pub cue: DoorCue,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_buffer_drains_in_order() {
        let mut buffer = EventBuffer::default();
        buffer.push(CharacterEvent::Jump);
        buffer.push(CharacterEvent::Land);
        assert_eq!(buffer.len(), 2);

        let drained: Vec<_> = buffer.drain().collect();
        assert_eq!(drained, vec![CharacterEvent::Jump, CharacterEvent::Land]);
        assert!(buffer.is_empty());
    }
}
