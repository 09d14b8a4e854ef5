use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::HothamResult;

/// Tunables for a [`crate::Session`]. Every field has a default, so a config file only needs to
/// name what it changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SessionConfig {
    /// How many cached actions to keep around for late joiners
    pub action_cache_capacity: usize,
    /// How many applied actions to keep in the history
    pub action_history_capacity: usize,
    /// How close (in metres) a hand has to be to a grabbable entity to pick it up
    pub grab_radius: f32,
    /// Length of a fixed simulation step, in seconds
    pub fixed_delta_time: f32,
    pub gravity: [f32; 3],
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            action_cache_capacity: 1024,
            action_history_capacity: 4096,
            grab_radius: 0.15,
            // TODO: This is *usually* 72fps on the Quest 2, but we may want to read it from the
            // display.
            fixed_delta_time: 1. / 72.,
            gravity: [0., -9.81, 0.],
        }
    }
}

impl SessionConfig {
    pub fn from_json_str(json: &str) -> HothamResult<Self> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn from_path(path: impl AsRef<Path>) -> HothamResult<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
