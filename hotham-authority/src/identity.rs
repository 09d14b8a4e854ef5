use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifies a single live network connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub Uuid);

impl PeerId {
    /// Generate a fresh, random peer ID
    pub fn new_v4() -> Self {
        PeerId(Uuid::new_v4())
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "peer:{}", self.0)
    }
}

/// Identifies a user. A user may be connected through more than one peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(pub Uuid);

impl UserId {
    /// The pseudo-user that owns everything loaded as part of the scene.
    /// It is never backed by a connected peer.
    pub const SCENE: UserId = UserId(Uuid::nil());

    /// Generate a fresh, random user ID
    pub fn new_v4() -> Self {
        UserId(Uuid::new_v4())
    }

    /// Is this the scene pseudo-user?
    pub fn is_scene(&self) -> bool {
        *self == Self::SCENE
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scene() {
            write!(f, "user:scene")
        } else {
            write!(f, "user:{}", self.0)
        }
    }
}
