pub mod avatar;
pub mod entity_uuid;
pub mod grabbable;
pub mod hand;
pub mod info;
pub mod network_object;
pub mod parent;
pub mod physics;
pub mod transform;

pub use avatar::Avatar;
pub use entity_uuid::EntityUuid;
pub use grabbable::{Grabbable, Grabbed, Grabber};
pub use hand::{Hand, Handedness};
pub use info::Info;
pub use network_object::{NetworkObject, NetworkObjectAuthorityTag, NetworkObjectOwnedTag};
pub use parent::Parent;
pub use physics::{BodyType, Collider, CollisionGroups, RigidBody};
pub use transform::Transform;
