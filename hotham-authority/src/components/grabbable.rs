use hecs::Entity;

use super::Handedness;

/// Marks an entity as something that can be picked up by a [`Grabber`].
#[derive(Debug, Clone, Copy, Default)]
pub struct Grabbable;

/// Present on an entity while it is held by a grabber whose peer has authority over it.
///
/// Only ever added or removed by [`crate::systems::grabbable_reactor_system`]. To pick something
/// up, call [`crate::systems::grabbing::grab`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Grabbed {
    /// The entity holding this one
    pub grabber_entity: Entity,
    /// Which of the grabber's hands it's held in
    pub attachment_point: Handedness,
}

/// Something that can hold grabbable entities, one per hand. Usually an avatar.
///
/// Like [`Grabbed`], the slots are only written by [`crate::systems::grabbable_reactor_system`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Grabber {
    /// The entity held in the left hand
    pub left: Option<Entity>,
    /// The entity held in the right hand
    pub right: Option<Entity>,
}

impl Grabber {
    /// What's in this hand?
    pub fn get(&self, handedness: Handedness) -> Option<Entity> {
        match handedness {
            Handedness::Left => self.left,
            Handedness::Right => self.right,
        }
    }

    pub(crate) fn set(&mut self, handedness: Handedness, entity: Option<Entity>) {
        match handedness {
            Handedness::Left => self.left = entity,
            Handedness::Right => self.right = entity,
        }
    }

    /// Which hand, if any, is holding `entity`?
    pub fn hand_holding(&self, entity: Entity) -> Option<Handedness> {
        if self.left == Some(entity) {
            Some(Handedness::Left)
        } else if self.right == Some(entity) {
            Some(Handedness::Right)
        } else {
            None
        }
    }

    /// Iterate over every held entity along with the hand holding it
    pub fn held(&self) -> impl Iterator<Item = (Handedness, Entity)> {
        [
            (Handedness::Left, self.left),
            (Handedness::Right, self.right),
        ]
        .into_iter()
        .filter_map(|(handedness, entity)| entity.map(|e| (handedness, e)))
    }
}
