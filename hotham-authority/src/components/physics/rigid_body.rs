use rapier3d::prelude::{RigidBodyHandle, RigidBodyType as RapierBodyType};

use crate::components::Transform;

/// A component used to synchronise this entity's position in the game simulation with the physics
/// simulation.
///
/// Setting the `body_type` to [`BodyType::Dynamic`] will result in the entity having its
/// [`Transform`] overwritten by its position in the physics simulation.
///
/// Kinematic bodies are treated as *game controlled*: each tick they're moved towards
/// `kinematic_target` if it has been set, which is how grabbed entities follow the hand holding
/// them.
///
/// While an entity is grabbed its `body_type` is owned by
/// [`crate::systems::grabbable_reactor_system`], which restores the original type on release.
#[derive(Debug, Clone)]
pub struct RigidBody {
    pub body_type: BodyType,
    pub kinematic_target: Option<Transform>,
    pub(crate) handle: Option<RigidBodyHandle>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyType {
    KinematicPositionBased,
    KinematicVelocityBased,
    Dynamic,
    Fixed,
}

impl BodyType {
    pub fn is_kinematic(&self) -> bool {
        matches!(
            self,
            BodyType::KinematicPositionBased | BodyType::KinematicVelocityBased
        )
    }
}

impl From<BodyType> for RapierBodyType {
    fn from(r: BodyType) -> Self {
        match r {
            BodyType::KinematicPositionBased => RapierBodyType::KinematicPositionBased,
            BodyType::KinematicVelocityBased => RapierBodyType::KinematicVelocityBased,
            BodyType::Dynamic => RapierBodyType::Dynamic,
            BodyType::Fixed => RapierBodyType::Fixed,
        }
    }
}

impl Default for RigidBody {
    fn default() -> Self {
        Self {
            body_type: BodyType::Dynamic,
            kinematic_target: None,
            handle: None,
        }
    }
}

impl RigidBody {
    pub fn dynamic() -> Self {
        Default::default()
    }

    pub fn kinematic_position_based() -> Self {
        Self {
            body_type: BodyType::KinematicPositionBased,
            ..Default::default()
        }
    }

    /// Has this body been added to the physics simulation yet?
    pub fn is_simulated(&self) -> bool {
        self.handle.is_some()
    }
}
