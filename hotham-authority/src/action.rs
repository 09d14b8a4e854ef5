use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{
    components::{EntityUuid, Handedness},
    identity::{PeerId, UserId},
    HothamResult,
};

/// What kind of entity a [`Action::SpawnObject`] creates on each peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SpawnKind {
    /// An avatar with a `Grabber` and a pair of hands
    Avatar,
    /// A plain networked object. Its other components (`Grabbable`, `RigidBody`, etc.) are added by
    /// the application.
    Object,
}

/// Every state change that is shared between peers.
///
/// Consumers match on this exhaustively; adding a variant means deciding what every receptor does
/// with it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Action {
    #[serde(rename_all = "camelCase")]
    SpawnObject {
        entity_uuid: EntityUuid,
        owner_id: UserId,
        authority_peer_id: Option<PeerId>,
        kind: SpawnKind,
        name: String,
        translation: Vec3,
    },
    #[serde(rename_all = "camelCase")]
    DestroyObject { entity_uuid: EntityUuid },
    /// Ask the current authority (or ourselves, for an unowned object) to hand over authority.
    #[serde(rename_all = "camelCase")]
    RequestAuthorityOverObject {
        entity_uuid: EntityUuid,
        new_authority: PeerId,
    },
    /// Move authority to `new_authority`. Only honoured when sent by the current authority, or as a
    /// self-grant over an unowned object.
    #[serde(rename_all = "camelCase")]
    TransferAuthorityOfObject {
        entity_uuid: EntityUuid,
        owner_id: UserId,
        new_authority: PeerId,
    },
    #[serde(rename_all = "camelCase")]
    SetGrabbedObject {
        entity_uuid: EntityUuid,
        grabbed: bool,
        attachment_point: Handedness,
        grabber_entity_uuid: EntityUuid,
    },
}

impl Action {
    /// The entity this action is about.
    pub fn entity_uuid(&self) -> EntityUuid {
        match self {
            Action::SpawnObject { entity_uuid, .. }
            | Action::DestroyObject { entity_uuid }
            | Action::RequestAuthorityOverObject { entity_uuid, .. }
            | Action::TransferAuthorityOfObject { entity_uuid, .. }
            | Action::SetGrabbedObject { entity_uuid, .. } => *entity_uuid,
        }
    }

    /// Does this action refer to `entity_uuid`, either as its subject or as the grabber?
    pub fn involves(&self, entity_uuid: EntityUuid) -> bool {
        match self {
            Action::SetGrabbedObject {
                grabber_entity_uuid,
                ..
            } if *grabber_entity_uuid == entity_uuid => true,
            _ => self.entity_uuid() == entity_uuid,
        }
    }

    /// Should this action be kept for peers that join later?
    pub fn is_cached_by_default(&self) -> bool {
        match self {
            Action::SpawnObject { .. }
            | Action::TransferAuthorityOfObject { .. }
            | Action::SetGrabbedObject { .. } => true,
            Action::DestroyObject { .. } | Action::RequestAuthorityOverObject { .. } => false,
        }
    }

    pub(crate) fn kind_name(&self) -> &'static str {
        match self {
            Action::SpawnObject { .. } => "spawnObject",
            Action::DestroyObject { .. } => "destroyObject",
            Action::RequestAuthorityOverObject { .. } => "requestAuthorityOverObject",
            Action::TransferAuthorityOfObject { .. } => "transferAuthorityOfObject",
            Action::SetGrabbedObject { .. } => "setGrabbedObject",
        }
    }
}

/// Who an action is addressed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Recipients {
    /// Every peer, including the sender
    All,
    /// Every peer except the sender
    Others,
    /// Only the sender
    Local,
    /// A single peer
    Peer(PeerId),
}

impl Recipients {
    /// Is `peer` addressed by an action sent from `from`?
    pub fn includes(&self, from: PeerId, peer: PeerId) -> bool {
        match self {
            Recipients::All => true,
            Recipients::Others => peer != from,
            Recipients::Local => peer == from,
            Recipients::Peer(target) => *target == peer,
        }
    }

    /// Does this need to go over the wire at all?
    pub fn includes_remote(&self, from: PeerId) -> bool {
        match self {
            Recipients::All | Recipients::Others => true,
            Recipients::Local => false,
            Recipients::Peer(target) => *target != from,
        }
    }
}

/// Uniquely identifies an action: the peer that dispatched it, and its position in that peer's
/// stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ActionId {
    pub from: PeerId,
    pub seq: u64,
}

/// An action along with everything needed to route and order it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActionEnvelope {
    pub id: ActionId,
    /// Lamport timestamp. Actions are applied in `(time, from, seq)` order.
    pub time: u64,
    pub to: Recipients,
    /// Keep this action around for late joiners?
    pub cache: bool,
    pub action: Action,
}

impl ActionEnvelope {
    pub fn from(&self) -> PeerId {
        self.id.from
    }

    pub(crate) fn sort_key(&self) -> (u64, PeerId, u64) {
        (self.time, self.id.from, self.id.seq)
    }

    /// Serialize for the transport
    pub fn to_json(&self) -> HothamResult<String> {
        Ok(serde_json::to_string(self)?)
    }

    /// Deserialize an envelope received from the transport
    pub fn from_json(json: &str) -> HothamResult<Self> {
        Ok(serde_json::from_str(json)?)
    }
}
