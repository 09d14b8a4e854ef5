use hecs::Entity;

/// Component added to indicate that an entity has a parent
/// Used to find hand targets and the descendant colliders of a grabbed entity
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Parent(pub Entity);
