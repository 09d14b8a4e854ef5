use std::fmt::Debug;

use bitflags::bitflags;
use rapier3d::prelude::ColliderHandle;
pub use rapier3d::prelude::SharedShape;

bitflags! {
    /// The collision groups used by the simulation.
    pub struct CollisionGroups: u32 {
        const DEFAULT = 0b0001;
        const AVATARS = 0b0010;
        const GROUND = 0b0100;
        const TRIGGER = 0b1000;
    }
}

/// A component that enables collision detection - essentially a thin wrapper around
/// [`rapier3d::prelude::Collider`].
///
/// While an entity is grabbed, [`crate::systems::grabbable_reactor_system`] removes
/// [`CollisionGroups::AVATARS`] from the `collision_mask` of its colliders (and those of its
/// descendants) so the held object doesn't push avatars around.
#[derive(Clone)]
pub struct Collider {
    /// The shape of this collider
    pub shape: SharedShape,
    /// Is this a sensor collider?
    pub sensor: bool,
    /// What collision groups is this a member of?
    pub collision_groups: CollisionGroups,
    /// What groups can this collider interact with?
    pub collision_mask: CollisionGroups,
    pub(crate) handle: Option<ColliderHandle>,
}

impl Debug for Collider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Collider")
            .field("shape", &self.shape.shape_type())
            .field("sensor", &self.sensor)
            .field("collision_groups", &self.collision_groups)
            .field("collision_mask", &self.collision_mask)
            .field("handle", &self.handle)
            .finish()
    }
}

impl Collider {
    /// Create a new collider
    pub fn new(shape: SharedShape) -> Collider {
        Collider {
            shape,
            ..Default::default()
        }
    }

    /// Create a new sensor collider
    pub fn sensor(shape: SharedShape) -> Collider {
        Collider {
            shape,
            sensor: true,
            collision_groups: CollisionGroups::TRIGGER,
            collision_mask: CollisionGroups::all(),
            ..Default::default()
        }
    }
}

impl Default for Collider {
    fn default() -> Self {
        Self {
            shape: SharedShape::ball(1.0),
            sensor: false,
            collision_groups: CollisionGroups::DEFAULT,
            collision_mask: CollisionGroups::DEFAULT
                | CollisionGroups::AVATARS
                | CollisionGroups::GROUND,
            handle: None,
        }
    }
}
