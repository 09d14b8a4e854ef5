use glam::Vec3;
use hecs::World;
use log::{debug, warn};

use crate::{
    action::{Action, ActionEnvelope, SpawnKind},
    components::{Avatar, EntityUuid, Grabber, Hand, Info, Parent, Transform},
    contexts::EntityRegistry,
    util::entity_and_descendants,
    Session,
};

/// Where an avatar's hands start out, relative to the avatar.
const LEFT_HAND_OFFSET: Vec3 = Vec3::new(-0.2, 1.4, -0.5);
const RIGHT_HAND_OFFSET: Vec3 = Vec3::new(0.2, 1.4, -0.5);

/// Spawn an avatar for the local user, owned by them and under the local peer's authority.
pub fn spawn_avatar(session: &mut Session, translation: Vec3) -> EntityUuid {
    let entity_uuid = EntityUuid::for_avatar(session.network_context.local_user_id());
    dispatch_spawn(session, entity_uuid, SpawnKind::Avatar, "Avatar", translation);
    entity_uuid
}

/// Spawn a networked object owned by the local user. Any other components (`Grabbable`,
/// `RigidBody`..) are up to the application to add once the entity exists.
pub fn spawn_object(session: &mut Session, name: &str, translation: Vec3) -> EntityUuid {
    let entity_uuid = EntityUuid::new_v4();
    dispatch_spawn(session, entity_uuid, SpawnKind::Object, name, translation);
    entity_uuid
}

/// Destroy a networked object on every peer.
pub fn destroy_object(session: &mut Session, entity_uuid: EntityUuid) {
    session
        .action_bus
        .dispatch(Action::DestroyObject { entity_uuid });
}

fn dispatch_spawn(
    session: &mut Session,
    entity_uuid: EntityUuid,
    kind: SpawnKind,
    name: &str,
    translation: Vec3,
) {
    let action = Action::SpawnObject {
        entity_uuid,
        owner_id: session.network_context.local_user_id(),
        authority_peer_id: Some(session.network_context.local_peer_id()),
        kind,
        name: name.to_string(),
        translation,
    };
    session.action_bus.dispatch(action);
}

/// The spawning receptor. Creates and removes entities in the world; runs before every other
/// receptor so the others can resolve the entities it creates.
pub fn spawning_receptor(
    world: &mut World,
    registry: &mut EntityRegistry,
    envelope: &ActionEnvelope,
) {
    match &envelope.action {
        Action::SpawnObject {
            entity_uuid,
            kind,
            name,
            translation,
            ..
        } => {
            if registry.entity(world, *entity_uuid).is_some() {
                return;
            }
            let transform = Transform::from_translation(*translation);
            let spawned = match kind {
                SpawnKind::Avatar => registry
                    .spawn(
                        world,
                        *entity_uuid,
                        (Avatar, Grabber::default(), transform, Info::new(name.as_str())),
                    )
                    .map(|avatar| {
                        for (hand, offset) in [
                            (Hand::left(), LEFT_HAND_OFFSET),
                            (Hand::right(), RIGHT_HAND_OFFSET),
                        ] {
                            world.spawn((
                                hand,
                                Parent(avatar),
                                Transform::from_translation(*translation + offset),
                                Info::new(format!("{name} {:?} Hand", hand.handedness)),
                            ));
                        }
                    }),
                SpawnKind::Object => registry
                    .spawn(world, *entity_uuid, (transform, Info::new(name.as_str())))
                    .map(|_| ()),
            };
            match spawned {
                Ok(()) => debug!("[HOTHAM_SESSION] Spawned {kind:?} {name} ({entity_uuid})"),
                Err(e) => warn!("[HOTHAM_SESSION] Unable to spawn {entity_uuid}: {e:?}"),
            }
        }
        Action::DestroyObject { entity_uuid } => {
            despawn(world, registry, *entity_uuid);
        }
        Action::RequestAuthorityOverObject { .. }
        | Action::TransferAuthorityOfObject { .. }
        | Action::SetGrabbedObject { .. } => {}
    }
}

/// Despawn the entity for `entity_uuid` along with its children, eg. an avatar's hands.
pub(crate) fn despawn(world: &mut World, registry: &mut EntityRegistry, entity_uuid: EntityUuid) {
    let Some(entity) = registry.entity(world, entity_uuid) else {
        return;
    };
    for child in entity_and_descendants(world, entity).into_iter().skip(1) {
        let _ = world.despawn(child);
    }
    registry.despawn(world, entity_uuid);
    debug!("[HOTHAM_SESSION] Destroyed {entity_uuid}");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::{ActionId, Recipients},
        identity::{PeerId, UserId},
    };

    fn envelope(action: Action) -> ActionEnvelope {
        ActionEnvelope {
            id: ActionId {
                from: PeerId::new_v4(),
                seq: 1,
            },
            time: 1,
            to: Recipients::All,
            cache: true,
            action,
        }
    }

    #[test]
    fn test_spawn_and_destroy_avatar() {
        let mut world = World::new();
        let mut registry = EntityRegistry::default();
        let avatar_uuid = EntityUuid::for_avatar(UserId::new_v4());
        let spawn = envelope(Action::SpawnObject {
            entity_uuid: avatar_uuid,
            owner_id: UserId::new_v4(),
            authority_peer_id: None,
            kind: SpawnKind::Avatar,
            name: "Avatar".into(),
            translation: Vec3::ZERO,
        });

        spawning_receptor(&mut world, &mut registry, &spawn);
        // Replays don't spawn a second avatar.
        spawning_receptor(&mut world, &mut registry, &spawn);

        let avatar = registry.entity(&world, avatar_uuid).unwrap();
        assert!(world.get::<&Grabber>(avatar).is_ok());
        assert_eq!(world.query::<&Avatar>().iter().count(), 1);
        assert_eq!(entity_and_descendants(&world, avatar).len(), 3);

        spawning_receptor(
            &mut world,
            &mut registry,
            &envelope(Action::DestroyObject {
                entity_uuid: avatar_uuid,
            }),
        );
        assert!(registry.entity(&world, avatar_uuid).is_none());
        assert_eq!(world.len(), 0);
    }
}
