use std::collections::HashMap;

use crossbeam::channel::Receiver;
use log::{debug, info, warn};

use crate::{
    action::{Action, ActionEnvelope},
    components::EntityUuid,
    identity::{PeerId, UserId},
    reactive::{KeyChange, ReactiveMap},
};

/// Who owns a networked entity, who may simulate it, and who is asking to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntityNetworkState {
    pub owner_id: UserId,
    /// The single peer permitted to write this entity's simulation state. `None` while unowned.
    pub authority_peer_id: Option<PeerId>,
    /// Set while a transfer is pending, cleared whenever authority moves.
    pub requesting_peer_id: Option<PeerId>,
    /// Did the current authority grant itself authority over an unowned entity? Such a grant can
    /// still be contested by a concurrent self-grant from a peer with a lower ID.
    pub self_granted: bool,
}

impl EntityNetworkState {
    pub fn new(owner_id: UserId, authority_peer_id: Option<PeerId>) -> Self {
        Self {
            owner_id,
            authority_peer_id,
            requesting_peer_id: None,
            self_granted: false,
        }
    }

    pub fn authority_state(&self) -> AuthorityState {
        match (self.authority_peer_id, self.requesting_peer_id) {
            (None, None) => AuthorityState::Unowned,
            (Some(authority), None) => AuthorityState::Owned(authority),
            (authority, Some(requesting)) => AuthorityState::TransferRequested {
                authority,
                requesting,
            },
        }
    }

    pub fn is_scene_owned(&self) -> bool {
        self.owner_id.is_scene()
    }
}

/// A projection of [`EntityNetworkState`] onto the authority state machine:
///
/// `Unowned -> Owned(a) -> TransferRequested(a, r) -> Owned(r)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthorityState {
    Unowned,
    Owned(PeerId),
    TransferRequested {
        authority: Option<PeerId>,
        requesting: PeerId,
    },
}

/// Where an action sits in the total order of actions: `(time, from, seq)`.
type Stamp = (u64, PeerId, u64);

#[derive(Debug, Clone, Copy)]
struct Transfer {
    stamp: Stamp,
    sender: PeerId,
    new_authority: PeerId,
}

/// Every transfer of one entity that might still be overtaken by one we haven't heard about yet.
///
/// Authority is whatever replaying them in action order from `base` gives, so two peers that have
/// applied the same transfers agree on it regardless of the order they arrived in.
#[derive(Debug, Clone)]
struct TransferLog {
    base: (Option<PeerId>, bool),
    /// The last transfer folded into `base`.
    settled: Option<Stamp>,
    transfers: Vec<Transfer>,
}

impl TransferLog {
    fn new(authority_peer_id: Option<PeerId>) -> Self {
        Self {
            base: (authority_peer_id, false),
            settled: None,
            transfers: Vec::new(),
        }
    }

    /// Returns `false` if the transfer was already recorded.
    fn insert(&mut self, transfer: Transfer) -> bool {
        if self.settled.map_or(false, |settled| transfer.stamp <= settled) {
            return false;
        }
        match self
            .transfers
            .binary_search_by_key(&transfer.stamp, |t| t.stamp)
        {
            Ok(_) => false,
            Err(index) => {
                self.transfers.insert(index, transfer);
                true
            }
        }
    }

    fn resolve(&self) -> (Option<PeerId>, bool) {
        replay(self.base, &self.transfers)
    }

    /// Fold every transfer at or before `stable` into the base. Nothing that arrives later can sort
    /// before them.
    fn compact(&mut self, stable: u64) {
        let settled = self.transfers.partition_point(|t| t.stamp.0 <= stable);
        if settled == 0 {
            return;
        }
        self.base = replay(self.base, &self.transfers[..settled]);
        self.settled = Some(self.transfers[settled - 1].stamp);
        self.transfers.drain(..settled);
    }
}

fn replay(base: (Option<PeerId>, bool), transfers: &[Transfer]) -> (Option<PeerId>, bool) {
    transfers
        .iter()
        .fold(base, |(authority, self_granted), transfer| {
            match transfer_outcome(
                authority,
                self_granted,
                transfer.sender,
                transfer.new_authority,
            ) {
                Some(self_granted) => (Some(transfer.new_authority), self_granted),
                None => (authority, self_granted),
            }
        })
}

/// Arbitrates who may write to each networked entity, and keeps track of which peers are connected.
#[derive(Debug)]
pub struct NetworkContext {
    local_peer_id: PeerId,
    local_user_id: UserId,
    peers: HashMap<PeerId, UserId>,
    objects: ReactiveMap<EntityUuid, EntityNetworkState>,
    transfers: HashMap<EntityUuid, TransferLog>,
    /// The time of the latest action applied from each remote peer.
    last_heard: HashMap<PeerId, u64>,
    latest: u64,
}

impl NetworkContext {
    pub fn new(local_peer_id: PeerId, local_user_id: UserId) -> Self {
        let mut peers = HashMap::new();
        peers.insert(local_peer_id, local_user_id);
        Self {
            local_peer_id,
            local_user_id,
            peers,
            objects: Default::default(),
            transfers: HashMap::new(),
            last_heard: HashMap::new(),
            latest: 0,
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    pub fn local_user_id(&self) -> UserId {
        self.local_user_id
    }

    pub fn state(&self, entity_uuid: EntityUuid) -> Option<&EntityNetworkState> {
        self.objects.get(&entity_uuid)
    }

    pub fn authority(&self, entity_uuid: EntityUuid) -> Option<PeerId> {
        self.state(entity_uuid)?.authority_peer_id
    }

    pub fn has_local_authority(&self, entity_uuid: EntityUuid) -> bool {
        self.authority(entity_uuid) == Some(self.local_peer_id)
    }

    pub fn objects(&self) -> impl Iterator<Item = (&EntityUuid, &EntityNetworkState)> {
        self.objects.iter()
    }

    pub fn subscribe(&mut self) -> Receiver<KeyChange<EntityUuid>> {
        self.objects.subscribe()
    }

    pub fn is_connected(&self, peer_id: PeerId) -> bool {
        self.peers.contains_key(&peer_id)
    }

    pub fn user_of(&self, peer_id: PeerId) -> Option<UserId> {
        self.peers.get(&peer_id).copied()
    }

    /// Record an entity that was loaded as part of the scene. Every peer loads the same scene, so
    /// this is recorded locally rather than dispatched. The entity starts out unowned.
    pub fn register_scene_object(&mut self, entity_uuid: EntityUuid) {
        if self.objects.contains_key(&entity_uuid) {
            return;
        }
        self.objects
            .insert(entity_uuid, EntityNetworkState::new(UserId::SCENE, None));
        self.transfers.insert(entity_uuid, TransferLog::new(None));
    }

    pub fn peer_joined(&mut self, peer_id: PeerId, user_id: UserId) {
        info!("[HOTHAM_AUTHORITY] {peer_id} joined as {user_id}");
        self.peers.insert(peer_id, user_id);
    }

    /// Forget `peer_id`. Pending requests from it are dropped and anything it had authority over
    /// goes back to another peer of the owning user, or becomes unowned. If that was the user's
    /// last peer, the user's entities are removed and their UUIDs returned so the caller can
    /// despawn them.
    pub fn peer_left(&mut self, peer_id: PeerId) -> Vec<EntityUuid> {
        let Some(user_id) = self.peers.remove(&peer_id) else {
            return Vec::new();
        };
        info!("[HOTHAM_AUTHORITY] {peer_id} ({user_id}) left");
        self.last_heard.remove(&peer_id);

        let keys = self.objects.keys().copied().collect::<Vec<_>>();
        for entity_uuid in &keys {
            let fallback = self
                .state(*entity_uuid)
                .and_then(|state| self.fallback_authority(state.owner_id));
            let mut handed_back = false;
            self.objects.update(entity_uuid, |state| {
                if state.requesting_peer_id == Some(peer_id) {
                    state.requesting_peer_id = None;
                }
                if state.authority_peer_id == Some(peer_id) {
                    state.authority_peer_id = fallback;
                    state.self_granted = false;
                    handed_back = true;
                }
            });
            // Nobody sent an action for this, so start the entity's transfers again from here.
            if handed_back {
                self.transfers
                    .insert(*entity_uuid, TransferLog::new(fallback));
            }
        }

        if self.peers.values().any(|u| *u == user_id) {
            return Vec::new();
        }

        let orphaned = self
            .objects
            .iter()
            .filter(|(_, state)| state.owner_id == user_id)
            .map(|(uuid, _)| *uuid)
            .collect::<Vec<_>>();
        for entity_uuid in &orphaned {
            debug!("[HOTHAM_AUTHORITY] Removing {entity_uuid}, its owner {user_id} has left");
            self.objects.remove(entity_uuid);
            self.transfers.remove(entity_uuid);
        }
        orphaned
    }

    /// Transfers at or before this time can no longer be overtaken. Every peer's later actions are
    /// stamped after the latest one we've applied from it, and a peer that joins catches up first.
    fn stable_time(&self) -> u64 {
        self.peers
            .keys()
            .filter(|peer_id| **peer_id != self.local_peer_id)
            .map(|peer_id| self.last_heard.get(peer_id).copied().unwrap_or(0))
            .min()
            .unwrap_or(self.latest)
    }

    fn fallback_authority(&self, owner_id: UserId) -> Option<PeerId> {
        if owner_id.is_scene() {
            return None;
        }
        self.peers
            .iter()
            .filter(|(_, user)| **user == owner_id)
            .map(|(peer, _)| *peer)
            .min()
    }

    /// The authority receptor. Returns `true` if the action was accepted.
    pub fn receive(&mut self, envelope: &ActionEnvelope) -> bool {
        let sender = envelope.from();
        self.latest = self.latest.max(envelope.time);
        if sender != self.local_peer_id {
            let last_heard = self.last_heard.entry(sender).or_insert(0);
            *last_heard = (*last_heard).max(envelope.time);
        }

        match &envelope.action {
            Action::SpawnObject {
                entity_uuid,
                owner_id,
                authority_peer_id,
                ..
            } => {
                // Authority may have moved on since the spawn was cached, don't clobber it on
                // replay.
                if self.objects.contains_key(entity_uuid) {
                    return false;
                }
                self.objects.insert(
                    *entity_uuid,
                    EntityNetworkState::new(*owner_id, *authority_peer_id),
                );
                self.transfers
                    .insert(*entity_uuid, TransferLog::new(*authority_peer_id));
                true
            }
            Action::DestroyObject { entity_uuid } => {
                self.transfers.remove(entity_uuid);
                self.objects.remove(entity_uuid).is_some()
            }
            Action::RequestAuthorityOverObject {
                entity_uuid,
                new_authority,
            } => {
                let new_authority = *new_authority;
                let updated = self.objects.update(entity_uuid, |state| {
                    if state.authority_peer_id != Some(new_authority) {
                        state.requesting_peer_id = Some(new_authority);
                    }
                });
                if updated {
                    debug!(
                        "[HOTHAM_AUTHORITY] {new_authority} requested authority over {entity_uuid}"
                    );
                }
                updated
            }
            Action::TransferAuthorityOfObject {
                entity_uuid,
                owner_id,
                new_authority,
            } => {
                let Some(state) = self.objects.get(entity_uuid) else {
                    debug!("[HOTHAM_AUTHORITY] Ignoring transfer of unknown entity {entity_uuid}");
                    return false;
                };
                if state.owner_id != *owner_id {
                    warn!(
                        "[HOTHAM_AUTHORITY] Ignoring transfer of {entity_uuid} from {sender}: \
                         owner is {}, not {owner_id}",
                        state.owner_id
                    );
                    return false;
                }
                let transfer = Transfer {
                    stamp: envelope.sort_key(),
                    sender,
                    new_authority: *new_authority,
                };
                let recorded = self
                    .transfers
                    .entry(*entity_uuid)
                    .or_insert_with(|| TransferLog::new(state.authority_peer_id))
                    .insert(transfer);
                if recorded {
                    self.resolve(*entity_uuid);
                }
                recorded
            }
            Action::SetGrabbedObject { .. } => false,
        }
    }

    /// Replay the transfers of `entity_uuid` and record who ends up with authority.
    fn resolve(&mut self, entity_uuid: EntityUuid) {
        let stable = self.stable_time();
        let Some(transfers) = self.transfers.get_mut(&entity_uuid) else {
            return;
        };
        transfers.compact(stable);
        let (authority, self_granted) = transfers.resolve();

        let Some(before) = self.objects.get(&entity_uuid).map(|s| s.authority_peer_id) else {
            return;
        };
        self.objects.update(&entity_uuid, |state| {
            if state.authority_peer_id != authority || state.requesting_peer_id == authority {
                state.requesting_peer_id = None;
            }
            state.authority_peer_id = authority;
            state.self_granted = self_granted;
        });
        match authority {
            Some(authority) if before != Some(authority) => {
                debug!("[HOTHAM_AUTHORITY] {authority} now has authority over {entity_uuid}")
            }
            _ => {}
        }
    }
}

/// Should a transfer from `sender` be accepted? Returns the new value of `self_granted` if so.
///
/// * The current authority may hand authority to anyone.
/// * Anyone may grant themselves authority over an unowned entity.
/// * Two peers may self-grant the same unowned entity before hearing about each other. The lower
///   `PeerId` wins, whichever order the grants arrive in.
fn transfer_outcome(
    authority: Option<PeerId>,
    self_granted: bool,
    sender: PeerId,
    new_authority: PeerId,
) -> Option<bool> {
    let self_grant = sender == new_authority;
    match authority {
        Some(authority) if authority == sender => Some(self_grant && self_granted),
        None if self_grant => Some(true),
        Some(authority) if self_grant && self_granted && sender < authority => Some(true),
        _ => None,
    }
}
