//! A small observer layer: maps that publish their key changes, and effect slots that run cleanup
//! before re-running whenever their dependencies change.
pub mod effect;
pub mod reactive_map;

pub use effect::{EffectSlot, Reactor};
pub use reactive_map::{KeyChange, ReactiveMap};
