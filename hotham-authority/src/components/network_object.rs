use crate::identity::{PeerId, UserId};

/// The local view of an entity's network state.
///
/// This is a mirror of [`crate::contexts::EntityNetworkState`] maintained by
/// [`crate::systems::authority_system`] - don't write to it yourself, your changes will be
/// overwritten next tick. To change who has authority over an entity, dispatch
/// [`crate::action::Action::RequestAuthorityOverObject`] instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkObject {
    /// The user that owns this entity. May be [`UserId::SCENE`]
    pub owner_id: UserId,
    /// The peer currently permitted to simulate this entity, if any
    pub authority_peer_id: Option<PeerId>,
}

/// Present on an entity if and only if the local peer has authority over it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkObjectAuthorityTag;

/// Present on an entity if and only if the local user owns it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct NetworkObjectOwnedTag;
