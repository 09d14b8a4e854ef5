use glam::{Quat, Vec3};
use serde::{Deserialize, Serialize};

/// Component that represents the transform of the entity in world space Overwritten each tick by
/// `physics_system` if the entity also has a dynamic `RigidBody`, and by `grabbing_system` if the
/// entity is grabbed and has no `RigidBody`
#[derive(Clone, PartialEq, Debug, Copy, Deserialize, Serialize)]
pub struct Transform {
    /// The translation of the entity
    pub translation: Vec3,
    /// The rotation of the entity
    pub rotation: Quat,
    /// The non-uniform scale of the entity
    pub scale: Vec3,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            translation: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
        }
    }
}

impl Transform {
    /// Shortcut to create a transform at `translation`
    pub fn from_translation(translation: Vec3) -> Self {
        Self {
            translation,
            ..Default::default()
        }
    }

    /// Copy the translation and rotation of `other`, keeping this transform's scale
    pub fn set_pose_from(&mut self, other: &Transform) {
        self.translation = other.translation;
        self.rotation = other.rotation;
    }
}
