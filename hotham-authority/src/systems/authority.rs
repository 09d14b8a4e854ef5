use hecs::{Entity, World};
use log::{debug, trace};

use crate::{
    action::Action,
    components::{EntityUuid, NetworkObject, NetworkObjectAuthorityTag, NetworkObjectOwnedTag},
    contexts::{ActionBus, EntityNetworkState, EntityRegistry, NetworkContext},
    reactive::Reactor,
    Session,
};

/// Mirrors network state onto the world: one slot per networked entity, keyed by its UUID.
pub type AuthorityReactor = Reactor<EntityUuid, AuthorityDeps, AuthorityCleanup>;

/// Grants pending authority transfers: one slot per networked entity, re-run whenever its state
/// changes.
pub type GrantReactor = Reactor<EntityUuid, EntityNetworkState, ()>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthorityDeps {
    entity: Option<Entity>,
    state: EntityNetworkState,
}

#[derive(Debug, Clone, Copy)]
pub struct AuthorityCleanup {
    entity: Entity,
}

/// Authority system
/// Keeps `NetworkObject`, `NetworkObjectAuthorityTag` and `NetworkObjectOwnedTag` in step with the
/// `NetworkContext`, and hands authority over when another peer asks for it.
pub fn authority_system(session: &mut Session) {
    authority_system_inner(
        &mut session.world,
        &session.entity_registry,
        &session.network_context,
        &mut session.action_bus,
        &mut session.authority_reactor,
        &mut session.grant_reactor,
    );
}

pub(crate) fn authority_system_inner(
    world: &mut World,
    registry: &EntityRegistry,
    network_context: &NetworkContext,
    action_bus: &mut ActionBus,
    authority_reactor: &mut AuthorityReactor,
    grant_reactor: &mut GrantReactor,
) {
    authority_reactor.sync(world, remove_tags);
    for entity_uuid in authority_reactor.keys() {
        let Some(state) = network_context.state(entity_uuid).copied() else {
            continue;
        };
        let deps = AuthorityDeps {
            entity: registry.entity(world, entity_uuid),
            state,
        };
        let Some(slot) = authority_reactor.slot_mut(&entity_uuid) else {
            continue;
        };
        slot.update(
            world,
            deps,
            |world, deps| apply_tags(world, network_context, deps),
            remove_tags,
        );
    }

    grant_reactor.sync(action_bus, |_, _| {});
    for entity_uuid in grant_reactor.keys() {
        let Some(state) = network_context.state(entity_uuid).copied() else {
            continue;
        };
        let Some(slot) = grant_reactor.slot_mut(&entity_uuid) else {
            continue;
        };
        slot.update(
            action_bus,
            state,
            |action_bus, state| {
                grant(action_bus, network_context, entity_uuid, state);
                None
            },
            |_, _| {},
        );
    }
}

fn apply_tags(
    world: &mut World,
    network_context: &NetworkContext,
    deps: &AuthorityDeps,
) -> Option<AuthorityCleanup> {
    let entity = deps.entity?;
    let state = deps.state;
    let network_object = NetworkObject {
        owner_id: state.owner_id,
        authority_peer_id: state.authority_peer_id,
    };
    world.insert_one(entity, network_object).ok()?;

    if state.authority_peer_id == Some(network_context.local_peer_id()) {
        trace!("[HOTHAM_AUTHORITY] Tagging {entity:?} as under local authority");
        let _ = world.insert_one(entity, NetworkObjectAuthorityTag);
    }
    if state.owner_id == network_context.local_user_id() {
        let _ = world.insert_one(entity, NetworkObjectOwnedTag);
    }
    Some(AuthorityCleanup { entity })
}

fn remove_tags(world: &mut World, cleanup: AuthorityCleanup) {
    let entity = cleanup.entity;
    if !world.contains(entity) {
        return;
    }
    let _ = world.remove_one::<NetworkObject>(entity);
    let _ = world.remove_one::<NetworkObjectAuthorityTag>(entity);
    let _ = world.remove_one::<NetworkObjectOwnedTag>(entity);
}

fn grant(
    action_bus: &mut ActionBus,
    network_context: &NetworkContext,
    entity_uuid: EntityUuid,
    state: &EntityNetworkState,
) {
    let local_peer_id = network_context.local_peer_id();
    let Some(requesting) = state.requesting_peer_id else {
        return;
    };

    match state.authority_peer_id {
        // We're in charge, and someone else wants it.
        Some(authority) if authority == local_peer_id && requesting != local_peer_id => {
            if !network_context.is_connected(requesting) {
                debug!(
                    "[HOTHAM_AUTHORITY] Not granting {entity_uuid} to {requesting}, \
                     which has disconnected"
                );
                return;
            }
            debug!("[HOTHAM_AUTHORITY] Granting authority over {entity_uuid} to {requesting}");
        }
        // Nobody's in charge, and we're asking.
        None if requesting == local_peer_id => {
            debug!("[HOTHAM_AUTHORITY] Granting ourselves authority over unowned {entity_uuid}");
        }
        _ => return,
    }

    action_bus.dispatch(Action::TransferAuthorityOfObject {
        entity_uuid,
        owner_id: state.owner_id,
        new_authority: requesting,
    });
}
