mod common;

use common::{cube_collider, Peers};
use hotham_authority::{
    components::{
        BodyType, Collider, CollisionGroups, EntityUuid, Grabbed, Grabber, Handedness, Parent,
        RigidBody, Transform,
    },
    glam::Vec3,
    systems::{spawn_avatar, spawn_object},
};

fn host_cube_and_two_avatars() -> (Peers, EntityUuid) {
    let mut peers = Peers::new(2);
    spawn_avatar(&mut peers.sessions[0], Vec3::ZERO);
    spawn_avatar(&mut peers.sessions[1], Vec3::new(2., 0., 0.));
    let cube_uuid = spawn_object(&mut peers.sessions[0], "Cube", Vec3::new(1., 1., 0.));
    peers.settle();
    peers.make_grabbable(cube_uuid);
    (peers, cube_uuid)
}

#[test]
fn test_grab_then_drop_restores_everything() {
    let (mut peers, cube_uuid) = host_cube_and_two_avatars();

    // Give the host's cube two parts: one that collides with avatars, and one that never did.
    let cube = peers.entity(0, cube_uuid);
    let host_world = &mut peers.sessions[0].world;
    let handle = host_world.spawn((Parent(cube), Transform::default(), cube_collider()));
    let mut no_avatars = cube_collider();
    no_avatars.collision_mask = CollisionGroups::DEFAULT;
    let label = host_world.spawn((Parent(cube), Transform::default(), no_avatars));

    let avatar = peers.avatar(0);
    assert!(peers.sessions[0].grab(avatar, cube, Handedness::Left));
    // The host already has authority over its own cube, so there's nothing to wait for.
    peers.step();
    {
        let world = &peers.sessions[0].world;
        assert_eq!(world.get::<&Grabber>(avatar).unwrap().left, Some(cube));
        assert_eq!(
            world.get::<&RigidBody>(cube).unwrap().body_type,
            BodyType::KinematicPositionBased
        );
        for part in [cube, handle] {
            let collider = world.get::<&Collider>(part).unwrap();
            assert!(!collider.collision_mask.contains(CollisionGroups::AVATARS));
        }
    }

    peers.settle();
    for (index, session) in peers.sessions.iter().enumerate() {
        let cube = peers.entity(index, cube_uuid);
        let grabbed = session.world.get::<&Grabbed>(cube).unwrap();
        assert_eq!(grabbed.grabber_entity, peers.avatar_of(index, 0));
        assert_eq!(grabbed.attachment_point, Handedness::Left);
    }

    assert!(peers.sessions[0].drop(avatar, cube));
    peers.settle();
    for (index, session) in peers.sessions.iter().enumerate() {
        let world = &session.world;
        let cube = peers.entity(index, cube_uuid);
        assert!(session.grabbable_state.is_empty());
        assert!(world.get::<&Grabbed>(cube).is_err());
        assert_eq!(world.get::<&RigidBody>(cube).unwrap().body_type, BodyType::Dynamic);
        assert_eq!(
            world.get::<&Grabber>(peers.avatar_of(index, 0)).unwrap().left,
            None
        );
        assert!(world
            .get::<&Collider>(cube)
            .unwrap()
            .collision_mask
            .contains(CollisionGroups::AVATARS));
    }

    let world = &peers.sessions[0].world;
    assert!(world
        .get::<&Collider>(handle)
        .unwrap()
        .collision_mask
        .contains(CollisionGroups::AVATARS));
    assert_eq!(
        world.get::<&Collider>(label).unwrap().collision_mask,
        CollisionGroups::DEFAULT
    );
}

#[test]
fn test_latest_grab_wins() {
    let (mut peers, cube_uuid) = host_cube_and_two_avatars();

    let guest_avatar = peers.avatar(1);
    let guest_cube = peers.entity(1, cube_uuid);
    assert!(peers.sessions[1].grab(guest_avatar, guest_cube, Handedness::Right));
    peers.settle();

    // The host takes it straight out of the guest's hand.
    let host_avatar = peers.avatar(0);
    let host_cube = peers.entity(0, cube_uuid);
    assert!(peers.sessions[0].grab(host_avatar, host_cube, Handedness::Left));
    peers.settle();

    let host = peers.sessions[0].local_peer_id();
    let host_avatar_uuid = EntityUuid::for_avatar(peers.sessions[0].local_user_id());
    for (index, session) in peers.sessions.iter().enumerate() {
        let cube = peers.entity(index, cube_uuid);
        assert_eq!(session.grabbable_state.len(), 1);
        assert_eq!(
            session.grabbable_state.get(cube_uuid).unwrap().grabber_entity_uuid,
            host_avatar_uuid
        );
        assert_eq!(session.network_context.authority(cube_uuid), Some(host));

        let world = &session.world;
        assert_eq!(
            world.get::<&Grabber>(peers.avatar_of(index, 0)).unwrap().left,
            Some(cube)
        );
        assert_eq!(
            world.get::<&Grabber>(peers.avatar_of(index, 1)).unwrap().right,
            None
        );
    }

    // The guest no longer holds it, so it can't let go of it either.
    assert!(!peers.sessions[1].drop(guest_avatar, guest_cube));
}

#[test]
fn test_replaying_the_log_changes_nothing() {
    let (mut peers, cube_uuid) = host_cube_and_two_avatars();
    let guest_avatar = peers.avatar(1);
    let cube = peers.entity(1, cube_uuid);
    assert!(peers.sessions[1].grab(guest_avatar, cube, Handedness::Right));
    peers.settle();

    let entities = peers.sessions[1].world.len();
    let entry = peers.sessions[1].grabbable_state.get(cube_uuid).copied();
    let authority = peers.sessions[1].network_context.authority(cube_uuid);

    let replay = peers.sessions[0].cached_actions();
    assert!(!replay.is_empty());
    for _ in 0..2 {
        for envelope in replay.clone() {
            peers.sessions[1].receive(envelope);
        }
    }
    assert_eq!(peers.sessions[1].apply_incoming_actions(), 0);
    peers.settle();

    let guest = &peers.sessions[1];
    assert_eq!(guest.world.len(), entities);
    assert_eq!(guest.grabbable_state.len(), 1);
    assert_eq!(guest.grabbable_state.get(cube_uuid).copied(), entry);
    assert_eq!(guest.network_context.authority(cube_uuid), authority);
    assert_eq!(
        guest.world.get::<&Grabber>(guest_avatar).unwrap().right,
        Some(cube)
    );
}
