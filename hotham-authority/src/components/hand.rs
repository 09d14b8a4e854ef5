use serde::{Deserialize, Serialize};

/// A component that represents the "side" or "handedness" that an entity is on
/// Used by components such as `Hand` and `Grabbed` to identify which hand they should map to
#[derive(Debug, PartialEq, Clone, Copy, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Handedness {
    /// Left hand side
    Left,
    /// Right hand side
    Right,
}

/// A component that's added to a child of an avatar to represent a "hand" presence.
/// Its `Transform` is the target that grabbed entities follow.
/// Requires `grabbing_system`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Hand {
    /// Which side is this hand on?
    pub handedness: Handedness,
}

impl Hand {
    /// Shortcut helper to create a Left hand
    pub fn left() -> Hand {
        Hand {
            handedness: Handedness::Left,
        }
    }

    /// Shortcut helper to create a right hand
    pub fn right() -> Hand {
        Hand {
            handedness: Handedness::Right,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handedness_serialization() {
        assert_eq!(
            serde_json::to_string(&Handedness::Right).unwrap(),
            "\"right\""
        );
        let left: Handedness = serde_json::from_str("\"left\"").unwrap();
        assert_eq!(left, Handedness::Left);
    }
}
