pub mod collider;
pub mod rigid_body;

pub use collider::{Collider, CollisionGroups, SharedShape};
pub use rigid_body::{BodyType, RigidBody};
