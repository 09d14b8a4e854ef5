use std::collections::{HashMap, VecDeque};

use log::{debug, trace};

use crate::{
    action::{Action, ActionEnvelope, ActionId, Recipients},
    components::EntityUuid,
    config::SessionConfig,
    identity::PeerId,
};

/// The ordered log of actions shared between peers.
///
/// Actions dispatched locally and actions received from the transport are queued, then applied
/// together by [`ActionBus::apply_incoming_actions`] in Lamport time order. Each peer's own stream
/// is applied in the order it was dispatched; nothing stronger is promised across peers.
///
/// Applying an action that was already applied (eg. a cached action re-delivered to a late joiner)
/// is a no-op.
#[derive(Debug)]
pub struct ActionBus {
    local_peer_id: PeerId,
    clock: u64,
    next_seq: u64,
    pending: Vec<ActionEnvelope>,
    outgoing: Vec<ActionEnvelope>,
    history: VecDeque<ActionEnvelope>,
    history_capacity: usize,
    cached: VecDeque<ActionEnvelope>,
    cache_capacity: usize,
    applied_up_to: HashMap<PeerId, u64>,
}

impl ActionBus {
    pub fn new(local_peer_id: PeerId, config: &SessionConfig) -> Self {
        Self {
            local_peer_id,
            clock: 0,
            next_seq: 0,
            pending: Vec::new(),
            outgoing: Vec::new(),
            history: VecDeque::new(),
            history_capacity: config.action_history_capacity,
            cached: VecDeque::new(),
            cache_capacity: config.action_cache_capacity,
            applied_up_to: HashMap::new(),
        }
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.local_peer_id
    }

    /// Dispatch an action to every peer, including this one.
    pub fn dispatch(&mut self, action: Action) -> ActionId {
        self.dispatch_to(action, Recipients::All)
    }

    /// Dispatch an action to a specific set of peers.
    pub fn dispatch_to(&mut self, action: Action, to: Recipients) -> ActionId {
        self.clock += 1;
        self.next_seq += 1;
        let id = ActionId {
            from: self.local_peer_id,
            seq: self.next_seq,
        };
        let cache = action.is_cached_by_default() && to.includes_remote(self.local_peer_id);
        let envelope = ActionEnvelope {
            id,
            time: self.clock,
            to,
            cache,
            action,
        };
        trace!(
            "[HOTHAM_ACTIONS] Dispatching {} #{} to {:?}",
            envelope.action.kind_name(),
            id.seq,
            to
        );

        if to.includes_remote(self.local_peer_id) {
            self.outgoing.push(envelope.clone());
        }
        if to.includes(self.local_peer_id, self.local_peer_id) {
            self.pending.push(envelope);
        }
        id
    }

    /// Hand an envelope received from the transport to the bus. Returns `false` if it wasn't
    /// addressed to us.
    pub fn receive(&mut self, envelope: ActionEnvelope) -> bool {
        if !envelope.to.includes(envelope.from(), self.local_peer_id) {
            trace!(
                "[HOTHAM_ACTIONS] Ignoring {} from {} - not addressed to us",
                envelope.action.kind_name(),
                envelope.from()
            );
            return false;
        }
        self.clock = self.clock.max(envelope.time);
        self.pending.push(envelope);
        true
    }

    /// Drain every queued action in order, skipping any that were already applied. The returned
    /// actions are recorded in the history and must now be run through the receptors. Those that
    /// changed anything should then be handed to [`ActionBus::cache`].
    pub fn apply_incoming_actions(&mut self) -> Vec<ActionEnvelope> {
        let mut pending = std::mem::take(&mut self.pending);
        pending.sort_by_key(|e| e.sort_key());

        let mut applied = Vec::with_capacity(pending.len());
        for envelope in pending {
            let last_applied = self.applied_up_to.entry(envelope.from()).or_insert(0);
            if envelope.id.seq <= *last_applied {
                trace!(
                    "[HOTHAM_ACTIONS] Skipping replayed {} #{} from {}",
                    envelope.action.kind_name(),
                    envelope.id.seq,
                    envelope.from()
                );
                continue;
            }
            *last_applied = envelope.id.seq;

            if let Action::DestroyObject { entity_uuid } = envelope.action {
                self.forget_entity(entity_uuid);
            }

            self.history.push_back(envelope.clone());
            while self.history.len() > self.history_capacity {
                self.history.pop_front();
            }
            applied.push(envelope);
        }
        applied
    }

    /// Envelopes waiting to go out over the transport.
    pub fn drain_outgoing(&mut self) -> Vec<ActionEnvelope> {
        std::mem::take(&mut self.outgoing)
    }

    /// Actions a newly connected peer needs to catch up, oldest first.
    pub fn cached_actions(&self) -> impl Iterator<Item = &ActionEnvelope> {
        self.cached.iter()
    }

    /// Every action applied so far, oldest first, up to `action_history_capacity`.
    pub fn history(&self) -> impl Iterator<Item = &ActionEnvelope> {
        self.history.iter()
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Keep an applied action for peers that join later, if it's cached. Only actions that changed
    /// state belong here: a late joiner replays the cache instead of the whole history.
    pub fn cache(&mut self, envelope: &ActionEnvelope) {
        if !envelope.cache {
            return;
        }
        // Each transfer is only accepted from the authority the ones before it made, so keep them
        // all. Anything else is superseded by the latest applied action of its kind.
        if !matches!(envelope.action, Action::TransferAuthorityOfObject { .. }) {
            let entity_uuid = envelope.action.entity_uuid();
            let kind = envelope.action.kind_name();
            self.cached.retain(|c| {
                !(c.action.entity_uuid() == entity_uuid && c.action.kind_name() == kind)
            });
        }

        self.cached.push_back(envelope.clone());
        if self.cached.len() > self.cache_capacity {
            if let Some(evicted) = self.cached.pop_front() {
                debug!(
                    "[HOTHAM_ACTIONS] Action cache is full, evicting {} for {}",
                    evicted.action.kind_name(),
                    evicted.action.entity_uuid()
                );
            }
        }
    }

    /// Drop every cached action that refers to `entity_uuid`, so late joiners never hear about it.
    pub fn forget_entity(&mut self, entity_uuid: EntityUuid) {
        self.cached.retain(|c| !c.action.involves(entity_uuid));
    }

    /// Drop the cached transfers of `entity_uuid`. Used when its authority moves without an action
    /// (eg. its authority disconnected), so late joiners start again from the spawn.
    pub fn forget_transfers(&mut self, entity_uuid: EntityUuid) {
        self.cached.retain(|c| {
            !matches!(
                c.action,
                Action::TransferAuthorityOfObject { entity_uuid: transferred, .. }
                    if transferred == entity_uuid
            )
        });
    }

    /// Forget a peer that has disconnected. Its actions are no longer expected.
    pub fn forget_peer(&mut self, peer_id: PeerId) {
        self.applied_up_to.remove(&peer_id);
    }
}
