use hecs::{Entity, World};
use log::{debug, trace};

use crate::{
    action::{Action, Recipients},
    components::{
        BodyType, Collider, CollisionGroups, EntityUuid, Grabbed, Grabber, Handedness, RigidBody,
    },
    contexts::{ActionBus, EntityRegistry, GrabbableState, NetworkContext},
    identity::PeerId,
    reactive::Reactor,
    util::entity_and_descendants,
    Session,
};

/// Materializes `GrabbableState` onto the world: one slot per grabbed entity, keyed by its UUID.
pub type GrabbableReactor = Reactor<EntityUuid, GrabDeps, GrabCleanup>;

/// Everything the reaction to a single grab depends on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GrabDeps {
    entity: Option<Entity>,
    grabber_entity: Option<Entity>,
    attachment_point: Handedness,
    /// The grabbable and the grabber are under the same peer's authority.
    has_authority: bool,
    /// Set when the local peer should ask for authority over the grabbable. Holds who to ask.
    request_authority_from: Option<PeerId>,
}

/// What a grab changed, so it can be put back exactly.
#[derive(Debug, Clone)]
pub struct GrabCleanup {
    entity: Entity,
    grabber_entity: Entity,
    attachment_point: Handedness,
    previous_body_type: Option<BodyType>,
    masked_colliders: Vec<Entity>,
}

struct GrabContext<'a> {
    world: &'a mut World,
    action_bus: &'a mut ActionBus,
}

/// Grabbable reactor system Walks through each grab in the `GrabbableState`. Once the grabbable and
/// the grabber are under the same authority, the grab is materialized with `Grabber` and `Grabbed`
/// and the grabbable is made kinematic so it can follow the hand. Until then, the peer in charge of
/// the grabber asks for authority over the grabbable.
pub fn grabbable_reactor_system(session: &mut Session) {
    grabbable_reactor_system_inner(
        &mut session.world,
        &session.entity_registry,
        &session.network_context,
        &session.grabbable_state,
        &mut session.action_bus,
        &mut session.grabbable_reactor,
    );
}

pub(crate) fn grabbable_reactor_system_inner(
    world: &mut World,
    registry: &EntityRegistry,
    network_context: &NetworkContext,
    grabbable_state: &GrabbableState,
    action_bus: &mut ActionBus,
    reactor: &mut GrabbableReactor,
) {
    let mut cx = GrabContext { world, action_bus };
    reactor.sync(&mut cx, release);

    for entity_uuid in reactor.keys() {
        let Some(entry) = grabbable_state.get(entity_uuid).copied() else {
            continue;
        };
        let entity = registry.entity(cx.world, entity_uuid);
        let grabber_entity = registry.entity(cx.world, entry.grabber_entity_uuid);

        let authority = network_context.authority(entity_uuid);
        let grabber_authority = network_context.authority(entry.grabber_entity_uuid);
        let has_authority = authority.is_some() && authority == grabber_authority;

        let scene_owned = network_context
            .state(entity_uuid)
            .map(|s| s.is_scene_owned())
            .unwrap_or(false);
        let local_peer_id = network_context.local_peer_id();
        let needs_to_request_authority = entity.is_some()
            && grabber_entity.is_some()
            && (scene_owned || authority != grabber_authority)
            && grabber_authority == Some(local_peer_id)
            && network_context.state(entity_uuid).is_some();

        let deps = GrabDeps {
            entity,
            grabber_entity,
            attachment_point: entry.attachment_point,
            has_authority,
            request_authority_from: if needs_to_request_authority && !has_authority {
                Some(authority.unwrap_or(local_peer_id))
            } else {
                None
            },
        };

        let Some(slot) = reactor.slot_mut(&entity_uuid) else {
            continue;
        };
        slot.update(
            &mut cx,
            deps,
            |cx, deps| react(cx, entity_uuid, deps),
            release,
        );
    }
}

fn react(cx: &mut GrabContext, entity_uuid: EntityUuid, deps: &GrabDeps) -> Option<GrabCleanup> {
    let (Some(entity), Some(grabber_entity)) = (deps.entity, deps.grabber_entity) else {
        trace!("[HOTHAM_GRAB] Waiting for {entity_uuid} and its grabber to be spawned");
        return None;
    };

    if deps.has_authority {
        return grab(cx.world, entity, grabber_entity, deps.attachment_point);
    }

    if let Some(authority) = deps.request_authority_from {
        let new_authority = cx.action_bus.local_peer_id();
        debug!("[HOTHAM_GRAB] Requesting authority over {entity_uuid} from {authority}");
        cx.action_bus.dispatch_to(
            Action::RequestAuthorityOverObject {
                entity_uuid,
                new_authority,
            },
            Recipients::Peer(authority),
        );
    }
    None
}

fn grab(
    world: &mut World,
    entity: Entity,
    grabber_entity: Entity,
    attachment_point: Handedness,
) -> Option<GrabCleanup> {
    {
        let mut grabber = world.get::<&mut Grabber>(grabber_entity).ok()?;
        grabber.set(attachment_point, Some(entity));
    }
    world
        .insert_one(
            entity,
            Grabbed {
                grabber_entity,
                attachment_point,
            },
        )
        .ok()?;

    // Make the grabbed entity follow the hand, rather than fall.
    let previous_body_type = world.get::<&mut RigidBody>(entity).ok().map(|mut rigid_body| {
        let previous = rigid_body.body_type;
        rigid_body.body_type = BodyType::KinematicPositionBased;
        previous
    });

    // Don't let the grabbed entity push its grabber around.
    let mut masked_colliders = Vec::new();
    for e in entity_and_descendants(world, entity) {
        if let Ok(mut collider) = world.get::<&mut Collider>(e) {
            if collider.collision_mask.contains(CollisionGroups::AVATARS) {
                collider.collision_mask.remove(CollisionGroups::AVATARS);
                masked_colliders.push(e);
            }
        }
    }

    debug!("[HOTHAM_GRAB] {grabber_entity:?} grabbed {entity:?} with {attachment_point:?} hand");
    Some(GrabCleanup {
        entity,
        grabber_entity,
        attachment_point,
        previous_body_type,
        masked_colliders,
    })
}

fn release(cx: &mut GrabContext, cleanup: GrabCleanup) {
    let world = &mut *cx.world;
    let GrabCleanup {
        entity,
        grabber_entity,
        attachment_point,
        previous_body_type,
        masked_colliders,
    } = cleanup;

    if let Ok(mut grabber) = world.get::<&mut Grabber>(grabber_entity) {
        if grabber.get(attachment_point) == Some(entity) {
            grabber.set(attachment_point, None);
        }
    }

    if !world.contains(entity) {
        return;
    }
    let _ = world.remove_one::<Grabbed>(entity);
    if let Some(previous_body_type) = previous_body_type {
        if let Ok(mut rigid_body) = world.get::<&mut RigidBody>(entity) {
            rigid_body.body_type = previous_body_type;
        }
    }
    for e in masked_colliders {
        if let Ok(mut collider) = world.get::<&mut Collider>(e) {
            collider.collision_mask.insert(CollisionGroups::AVATARS);
        }
    }
    debug!("[HOTHAM_GRAB] {grabber_entity:?} released {entity:?}");
}
