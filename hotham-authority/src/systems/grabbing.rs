use hecs::{Entity, World};
use log::trace;

use crate::{
    action::Action,
    components::{
        EntityUuid, Grabbable, Grabbed, Grabber, Handedness, NetworkObjectAuthorityTag, RigidBody,
        Transform,
    },
    contexts::{ActionBus, GrabbableState},
    util::hand_target,
    Session,
};

/// Ask for `grabbable` to be held in `grabber`'s `handedness` hand. Nothing changes in the world
/// until the resulting action has been applied and the grab has authority; see
/// [`super::grabbable_reactor_system`].
///
/// Returns `false` without dispatching anything if `grabber` is not a `Grabber`, `grabbable` is not
/// `Grabbable`, or that hand is already full.
pub fn grab(
    world: &World,
    grabbable_state: &GrabbableState,
    action_bus: &mut ActionBus,
    grabber: Entity,
    grabbable: Entity,
    handedness: Handedness,
) -> bool {
    let Some((grabber_entity_uuid, entity_uuid)) = uuids(world, grabber, grabbable) else {
        return false;
    };
    let Ok(hand) = world.get::<&Grabber>(grabber).map(|g| g.get(handedness)) else {
        return false;
    };
    let hand_is_full = hand.is_some()
        || grabbable_state.iter().any(|(_, entry)| {
            entry.grabber_entity_uuid == grabber_entity_uuid && entry.attachment_point == handedness
        });
    if hand_is_full {
        trace!("[HOTHAM_GRAB] Not grabbing {entity_uuid}, {handedness:?} hand is full");
        return false;
    }

    action_bus.dispatch(Action::SetGrabbedObject {
        entity_uuid,
        grabbed: true,
        attachment_point: handedness,
        grabber_entity_uuid,
    });
    true
}

/// Ask for `grabber` to let go of `grabbable`. Returns `false` without dispatching anything if
/// `grabbable` isn't held by `grabber`.
pub fn drop(
    world: &World,
    grabbable_state: &GrabbableState,
    action_bus: &mut ActionBus,
    grabber: Entity,
    grabbable: Entity,
) -> bool {
    let Some((grabber_entity_uuid, entity_uuid)) = uuids(world, grabber, grabbable) else {
        return false;
    };
    let Ok(held_in) = world.get::<&Grabber>(grabber).map(|g| g.hand_holding(grabbable)) else {
        return false;
    };
    let attachment_point = held_in.or_else(|| {
        grabbable_state
            .get(entity_uuid)
            .filter(|entry| entry.grabber_entity_uuid == grabber_entity_uuid)
            .map(|entry| entry.attachment_point)
    });
    let Some(attachment_point) = attachment_point else {
        trace!("[HOTHAM_GRAB] Not dropping {entity_uuid}, it isn't held by {grabber_entity_uuid}");
        return false;
    };

    action_bus.dispatch(Action::SetGrabbedObject {
        entity_uuid,
        grabbed: false,
        attachment_point,
        grabber_entity_uuid,
    });
    true
}

fn uuids(world: &World, grabber: Entity, grabbable: Entity) -> Option<(EntityUuid, EntityUuid)> {
    if world.get::<&Grabbable>(grabbable).is_err() {
        return None;
    }
    let grabber_uuid = *world.get::<&EntityUuid>(grabber).ok()?;
    let grabbable_uuid = *world.get::<&EntityUuid>(grabbable).ok()?;
    Some((grabber_uuid, grabbable_uuid))
}

/// Grabbing system Walks through each grabbed entity this peer has authority over, and moves it to
/// its grabber's hand.
pub fn grabbing_system(session: &mut Session) {
    grabbing_system_inner(&mut session.world);
}

pub(crate) fn grabbing_system_inner(world: &mut World) {
    for (entity, target) in hand_targets(world) {
        if let Ok(mut rigid_body) = world.get::<&mut RigidBody>(entity) {
            rigid_body.kinematic_target = Some(target);
            continue;
        }
        if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
            transform.set_pose_from(&target);
        }
    }
}

fn hand_targets(world: &World) -> Vec<(Entity, Transform)> {
    world
        .query::<&Grabbed>()
        .with::<(&Grabbable, &NetworkObjectAuthorityTag)>()
        .iter()
        .filter_map(|(entity, grabbed)| {
            let target = hand_target(world, grabbed.grabber_entity, grabbed.attachment_point)?;
            Some((entity, target))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        components::{Hand, Parent},
        identity::PeerId,
    };
    use approx::assert_relative_eq;
    use glam::{Quat, Vec3};

    fn spawn_avatar(world: &mut World) -> (Entity, EntityUuid) {
        let uuid = EntityUuid::new_v4();
        let avatar = world.spawn((Grabber::default(), uuid, Transform::default()));
        world.spawn((
            Hand::right(),
            Parent(avatar),
            Transform {
                translation: Vec3::new(0.2, 1.4, -0.5),
                rotation: Quat::from_rotation_y(1.0),
                scale: Vec3::ONE,
            },
        ));
        (avatar, uuid)
    }

    #[test]
    fn test_grab_and_drop_dispatch() {
        let mut world = World::new();
        let mut grabbable_state = GrabbableState::default();
        let mut action_bus = ActionBus::new(PeerId::new_v4(), &Default::default());
        let (avatar, avatar_uuid) = spawn_avatar(&mut world);
        let cube_uuid = EntityUuid::new_v4();
        let cube = world.spawn((Grabbable, cube_uuid));
        let not_grabbable = world.spawn((EntityUuid::new_v4(),));

        assert!(!grab(
            &world,
            &grabbable_state,
            &mut action_bus,
            avatar,
            not_grabbable,
            Handedness::Right
        ));
        assert!(!grab(&world, &grabbable_state, &mut action_bus, cube, avatar, Handedness::Right));
        // Can't drop what we're not holding.
        assert!(!drop(&world, &grabbable_state, &mut action_bus, avatar, cube));

        assert!(grab(&world, &grabbable_state, &mut action_bus, avatar, cube, Handedness::Right));
        let applied = action_bus.apply_incoming_actions();
        assert_eq!(applied.len(), 1);
        assert_eq!(
            applied[0].action,
            Action::SetGrabbedObject {
                entity_uuid: cube_uuid,
                grabbed: true,
                attachment_point: Handedness::Right,
                grabber_entity_uuid: avatar_uuid,
            }
        );
        // Nothing changes in the world until the grab has been reacted to.
        assert_eq!(world.get::<&Grabber>(avatar).unwrap().right, None);
        assert!(world.get::<&Grabbed>(cube).is_err());

        grabbable_state.receive(&applied[0]);
        // The hand is already spoken for..
        let sphere = world.spawn((Grabbable, EntityUuid::new_v4()));
        assert!(!grab(
            &world,
            &grabbable_state,
            &mut action_bus,
            avatar,
            sphere,
            Handedness::Right
        ));
        // ..but the cube can be dropped, even though the grab hasn't been materialized.
        assert!(drop(&world, &grabbable_state, &mut action_bus, avatar, cube));
        let applied = action_bus.apply_incoming_actions();
        assert!(matches!(
            applied[0].action,
            Action::SetGrabbedObject {
                grabbed: false,
                attachment_point: Handedness::Right,
                ..
            }
        ));
    }

    #[test]
    fn test_grabbing_system_follows_hand() {
        let mut world = World::new();
        let (avatar, _) = spawn_avatar(&mut world);
        let grabbed = Grabbed {
            grabber_entity: avatar,
            attachment_point: Handedness::Right,
        };
        let with_body = world.spawn((
            Grabbable,
            grabbed,
            NetworkObjectAuthorityTag,
            RigidBody::kinematic_position_based(),
            Transform::default(),
        ));
        let without_body = world.spawn((
            Grabbable,
            grabbed,
            NetworkObjectAuthorityTag,
            Transform {
                scale: Vec3::splat(2.0),
                ..Default::default()
            },
        ));
        // Someone else is in charge of this one.
        let remote = world.spawn((Grabbable, grabbed, Transform::default()));

        grabbing_system_inner(&mut world);

        let target = world.get::<&RigidBody>(with_body).unwrap().kinematic_target.unwrap();
        assert_relative_eq!(target.translation, Vec3::new(0.2, 1.4, -0.5));
        assert_relative_eq!(target.rotation, Quat::from_rotation_y(1.0));

        let transform = *world.get::<&Transform>(without_body).unwrap();
        assert_relative_eq!(transform.translation, Vec3::new(0.2, 1.4, -0.5));
        assert_relative_eq!(transform.scale, Vec3::splat(2.0));

        assert_relative_eq!(
            world.get::<&Transform>(remote).unwrap().translation,
            Vec3::ZERO
        );
    }
}
