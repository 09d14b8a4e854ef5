use hecs::{Entity, World};
use log::info;

use crate::{
    action::ActionEnvelope,
    components::{EntityUuid, Handedness},
    config::SessionConfig,
    contexts::{
        ActionBus, EntityRegistry, GrabbableState, InputContext, NetworkContext, PhysicsContext,
    },
    identity::{PeerId, UserId},
    reactive::Reactor,
    systems::{
        authority_system, grab_input_system, grabbable_reactor_system, grabbing,
        grabbing_system, physics_system, spawning, AuthorityReactor, GrabbableReactor,
        GrantReactor,
    },
    HothamResult,
};

/// Builder for `Session`.
#[derive(Debug, Default)]
pub struct SessionBuilder {
    local_peer_id: Option<PeerId>,
    local_user_id: Option<UserId>,
    config: SessionConfig,
    edit_mode: bool,
}

impl SessionBuilder {
    /// Create a `SessionBuilder`
    pub fn new() -> Self {
        Default::default()
    }

    /// Set the ID of this connection. A random one is used if this isn't set.
    pub fn local_peer_id(mut self, peer_id: PeerId) -> Self {
        self.local_peer_id = Some(peer_id);
        self
    }

    /// Set the ID of the user this connection belongs to. A random one is used if this isn't set.
    pub fn local_user_id(mut self, user_id: UserId) -> Self {
        self.local_user_id = Some(user_id);
        self
    }

    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = config;
        self
    }

    /// In edit mode, grabbed entities don't follow their grabber and physics is paused.
    pub fn edit_mode(mut self, edit_mode: bool) -> Self {
        self.edit_mode = edit_mode;
        self
    }

    /// Build the `Session`
    pub fn build(self) -> Session {
        let local_peer_id = self.local_peer_id.unwrap_or_else(PeerId::new_v4);
        let local_user_id = self.local_user_id.unwrap_or_else(UserId::new_v4);
        info!("[HOTHAM_SESSION] Starting session for {local_peer_id} ({local_user_id})");

        let mut network_context = NetworkContext::new(local_peer_id, local_user_id);
        let mut grabbable_state = GrabbableState::default();
        Session {
            world: World::new(),
            action_bus: ActionBus::new(local_peer_id, &self.config),
            authority_reactor: Reactor::new(network_context.subscribe()),
            grant_reactor: Reactor::new(network_context.subscribe()),
            grabbable_reactor: Reactor::new(grabbable_state.subscribe()),
            network_context,
            grabbable_state,
            physics_context: PhysicsContext::new(&self.config),
            input_context: Default::default(),
            entity_registry: Default::default(),
            config: self.config,
            edit_mode: self.edit_mode,
            tick_count: 0,
        }
    }
}

/// A single peer's view of a shared session.
///
/// Owns the world and every context the systems need. The transport is up to the application: each
/// tick, hand any envelopes that arrived to [`Session::receive`], call [`Session::tick`], then send
/// whatever [`Session::drain_outgoing`] returns.
pub struct Session {
    /// World
    pub world: World,
    /// Action bus
    pub action_bus: ActionBus,
    /// Network context
    pub network_context: NetworkContext,
    /// Grabbable state
    pub grabbable_state: GrabbableState,
    /// Physics context
    pub physics_context: PhysicsContext,
    /// Input context
    pub input_context: InputContext,
    /// Entity registry
    pub entity_registry: EntityRegistry,
    pub config: SessionConfig,
    /// In edit mode, `grabbing_system` and `physics_system` are skipped
    pub edit_mode: bool,
    pub(crate) authority_reactor: AuthorityReactor,
    pub(crate) grant_reactor: GrantReactor,
    pub(crate) grabbable_reactor: GrabbableReactor,
    tick_count: u64,
}

impl Session {
    /// Create a session for a new peer of a new user, with the default configuration
    pub fn new() -> Self {
        SessionBuilder::new().build()
    }

    pub fn local_peer_id(&self) -> PeerId {
        self.network_context.local_peer_id()
    }

    pub fn local_user_id(&self) -> UserId {
        self.network_context.local_user_id()
    }

    /// How many times `tick` has been called.
    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    /// Run every system once: apply incoming actions, then react to them, then simulate.
    pub fn tick(&mut self) {
        self.apply_incoming_actions();
        authority_system(self);
        grabbable_reactor_system(self);
        grab_input_system(self);
        if !self.edit_mode {
            grabbing_system(self);
            physics_system(self);
        }
        self.tick_count += 1;
    }

    /// Run every queued action through the receptors, in order. Returns how many were applied.
    ///
    /// Only actions a receptor accepted are cached for late joiners, so a grab or release that lost
    /// to a later one is never replayed to them.
    pub fn apply_incoming_actions(&mut self) -> usize {
        let applied = self.action_bus.apply_incoming_actions();
        for envelope in &applied {
            spawning::spawning_receptor(&mut self.world, &mut self.entity_registry, envelope);
            let authority_changed = self.network_context.receive(envelope);
            let grab_changed = self.grabbable_state.receive(envelope);
            if authority_changed || grab_changed {
                self.action_bus.cache(envelope);
            }
        }
        applied.len()
    }

    /// Hand an envelope from the transport to the session. It'll be applied on the next `tick`.
    pub fn receive(&mut self, envelope: ActionEnvelope) -> bool {
        self.action_bus.receive(envelope)
    }

    /// As [`Session::receive`], for envelopes that arrive as JSON.
    pub fn receive_json(&mut self, json: &str) -> HothamResult<bool> {
        let envelope = ActionEnvelope::from_json(json)?;
        Ok(self.receive(envelope))
    }

    /// Envelopes waiting to be sent to other peers.
    pub fn drain_outgoing(&mut self) -> Vec<ActionEnvelope> {
        self.action_bus.drain_outgoing()
    }

    /// What a peer that has just connected needs to be sent to catch up.
    pub fn cached_actions(&self) -> Vec<ActionEnvelope> {
        self.action_bus.cached_actions().cloned().collect()
    }

    pub fn peer_joined(&mut self, peer_id: PeerId, user_id: UserId) {
        self.network_context.peer_joined(peer_id, user_id);
    }

    /// Forget a peer that has disconnected. If it was the last peer of its user, the user's
    /// entities (their avatar, and anything else they owned) are despawned.
    pub fn peer_left(&mut self, peer_id: PeerId) {
        let reassigned = self
            .network_context
            .objects()
            .filter(|(_, state)| state.authority_peer_id == Some(peer_id))
            .map(|(entity_uuid, _)| *entity_uuid)
            .collect::<Vec<_>>();
        for entity_uuid in reassigned {
            self.action_bus.forget_transfers(entity_uuid);
        }

        for entity_uuid in self.network_context.peer_left(peer_id) {
            spawning::despawn(&mut self.world, &mut self.entity_registry, entity_uuid);
            self.grabbable_state.forget(entity_uuid);
            self.action_bus.forget_entity(entity_uuid);
        }
        self.action_bus.forget_peer(peer_id);
    }

    /// Give an entity that was loaded as part of the scene a network identity. Every peer must
    /// register the same scene entities with the same UUIDs. The entity starts out unowned, so any
    /// peer may take it.
    pub fn register_scene_object(
        &mut self,
        entity: Entity,
        entity_uuid: EntityUuid,
    ) -> HothamResult<()> {
        self.entity_registry
            .register(&mut self.world, entity, entity_uuid)?;
        self.network_context.register_scene_object(entity_uuid);
        Ok(())
    }

    /// Find the local entity for `entity_uuid`.
    pub fn entity(&self, entity_uuid: EntityUuid) -> Option<Entity> {
        self.entity_registry.entity(&self.world, entity_uuid)
    }

    /// The local user's avatar, once it has been spawned.
    pub fn local_avatar(&self) -> Option<Entity> {
        self.entity(EntityUuid::for_avatar(self.local_user_id()))
    }

    /// See [`grabbing::grab`].
    pub fn grab(&mut self, grabber: Entity, grabbable: Entity, handedness: Handedness) -> bool {
        grabbing::grab(
            &self.world,
            &self.grabbable_state,
            &mut self.action_bus,
            grabber,
            grabbable,
            handedness,
        )
    }

    /// See [`grabbing::drop`].
    pub fn drop(&mut self, grabber: Entity, grabbable: Entity) -> bool {
        grabbing::drop(
            &self.world,
            &self.grabbable_state,
            &mut self.action_bus,
            grabber,
            grabbable,
        )
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}
