use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::identity::UserId;

/// A stable, universally unique identifier for an entity.
///
/// `hecs::Entity` handles are local to a single `World`; an `EntityUuid` is the same on every peer
/// and is what actions use to address an entity. Resolve it to a local handle with
/// [`crate::contexts::EntityRegistry::entity`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityUuid(pub Uuid);

impl EntityUuid {
    /// Generate a fresh, random UUID
    pub fn new_v4() -> Self {
        EntityUuid(Uuid::new_v4())
    }

    /// The UUID of the avatar belonging to `user_id`. Each user has exactly one avatar.
    pub fn for_avatar(user_id: UserId) -> Self {
        EntityUuid(user_id.0)
    }
}

impl fmt::Display for EntityUuid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
