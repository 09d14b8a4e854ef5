use hecs::{Entity, World};
use itertools::Itertools;

use crate::{
    components::{EntityUuid, Grabbable, Grabber, Handedness, Transform},
    contexts::{ActionBus, EntityRegistry, GrabbableState, InputContext},
    systems::grabbing::{drop, grab},
    util::hand_target,
    Session,
};

/// Grab input system
/// Turns the local user's input into grabs and drops for their avatar:
///
/// * Squeezing a grip grabs the closest free `Grabbable` within `grab_radius` of that hand
/// * Releasing a grip drops whatever that hand is holding
/// * The drop key drops everything
pub fn grab_input_system(session: &mut Session) {
    let avatar_uuid = EntityUuid::for_avatar(session.network_context.local_user_id());
    grab_input_system_inner(
        &session.world,
        &session.entity_registry,
        &session.grabbable_state,
        &mut session.action_bus,
        &session.input_context,
        avatar_uuid,
        session.config.grab_radius,
    );
}

pub(crate) fn grab_input_system_inner(
    world: &World,
    registry: &EntityRegistry,
    grabbable_state: &GrabbableState,
    action_bus: &mut ActionBus,
    input_context: &InputContext,
    avatar_uuid: EntityUuid,
    grab_radius: f32,
) {
    let Some(avatar) = registry.entity(world, avatar_uuid) else {
        return;
    };

    if input_context.drop_just_pressed() {
        for (_, held) in held_by(world, registry, grabbable_state, avatar, avatar_uuid) {
            drop(world, grabbable_state, action_bus, avatar, held);
        }
        return;
    }

    for handedness in [Handedness::Left, Handedness::Right] {
        if input_context.grip_just_released(handedness) {
            for (_, held) in held_by(world, registry, grabbable_state, avatar, avatar_uuid)
                .into_iter()
                .filter(|(h, _)| *h == handedness)
            {
                drop(world, grabbable_state, action_bus, avatar, held);
            }
        }

        if input_context.grip_just_pressed(handedness) {
            let Some(hand) = hand_target(world, avatar, handedness) else {
                continue;
            };
            let nearest = nearest_free_grabbable(world, grabbable_state, &hand, grab_radius);
            if let Some(nearest) = nearest {
                grab(world, grabbable_state, action_bus, avatar, nearest, handedness);
            }
        }
    }
}

/// Everything `avatar` is holding, or has asked to hold.
fn held_by(
    world: &World,
    registry: &EntityRegistry,
    grabbable_state: &GrabbableState,
    avatar: Entity,
    avatar_uuid: EntityUuid,
) -> Vec<(Handedness, Entity)> {
    let materialized = world
        .get::<&Grabber>(avatar)
        .map(|grabber| grabber.held().collect_vec())
        .unwrap_or_default();
    let pending = grabbable_state
        .iter()
        .filter(|(_, entry)| entry.grabber_entity_uuid == avatar_uuid)
        .filter_map(|(entity_uuid, entry)| {
            Some((entry.attachment_point, registry.entity(world, *entity_uuid)?))
        })
        .collect_vec();

    materialized
        .into_iter()
        .chain(pending)
        .unique_by(|(_, entity)| *entity)
        .collect()
}

fn nearest_free_grabbable(
    world: &World,
    grabbable_state: &GrabbableState,
    hand: &Transform,
    grab_radius: f32,
) -> Option<Entity> {
    world
        .query::<(&Transform, &EntityUuid)>()
        .with::<&Grabbable>()
        .iter()
        .filter(|(_, (_, entity_uuid))| !grabbable_state.is_grabbed(**entity_uuid))
        .map(|(entity, (transform, _))| {
            (entity, transform.translation.distance(hand.translation))
        })
        .filter(|(_, distance)| *distance <= grab_radius)
        .min_by(|(_, a), (_, b)| a.total_cmp(b))
        .map(|(entity, _)| entity)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        action::Action,
        components::{Hand, Parent},
        contexts::InputSample,
        identity::PeerId,
    };
    use glam::Vec3;

    struct Fixture {
        world: World,
        registry: EntityRegistry,
        grabbable_state: GrabbableState,
        action_bus: ActionBus,
        input_context: InputContext,
        avatar_uuid: EntityUuid,
    }

    impl Fixture {
        fn new() -> Self {
            let mut world = World::new();
            let mut registry = EntityRegistry::default();
            let avatar_uuid = EntityUuid::new_v4();
            let avatar = registry
                .spawn(&mut world, avatar_uuid, (Grabber::default(), Transform::default()))
                .unwrap();
            world.spawn((
                Hand::right(),
                Parent(avatar),
                Transform::from_translation(Vec3::new(0.2, 1.4, -0.5)),
            ));
            Fixture {
                world,
                registry,
                grabbable_state: Default::default(),
                action_bus: ActionBus::new(PeerId::new_v4(), &Default::default()),
                input_context: Default::default(),
                avatar_uuid,
            }
        }

        fn spawn_grabbable(&mut self, translation: Vec3) -> EntityUuid {
            let entity_uuid = EntityUuid::new_v4();
            self.registry
                .spawn(
                    &mut self.world,
                    entity_uuid,
                    (Grabbable, Transform::from_translation(translation)),
                )
                .unwrap();
            entity_uuid
        }

        fn tick(&mut self, sample: InputSample) -> Vec<Action> {
            self.input_context.update(sample);
            grab_input_system_inner(
                &self.world,
                &self.registry,
                &self.grabbable_state,
                &mut self.action_bus,
                &self.input_context,
                self.avatar_uuid,
                0.15,
            );
            let applied = self.action_bus.apply_incoming_actions();
            for envelope in &applied {
                self.grabbable_state.receive(envelope);
            }
            applied.into_iter().map(|e| e.action).collect()
        }
    }

    #[test]
    fn test_grip_grabs_nearest_and_release_drops() {
        let mut fixture = Fixture::new();
        let _far = fixture.spawn_grabbable(Vec3::new(0.2, 1.4, -0.4));
        let near = fixture.spawn_grabbable(Vec3::new(0.2, 1.45, -0.5));
        let _out_of_reach = fixture.spawn_grabbable(Vec3::new(0.2, 1.4, 0.5));

        let squeeze = InputSample {
            right_grip: true,
            ..Default::default()
        };
        let actions = fixture.tick(squeeze);
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            actions[0],
            Action::SetGrabbedObject {
                entity_uuid,
                grabbed: true,
                attachment_point: Handedness::Right,
                ..
            } if entity_uuid == near
        ));

        // Holding the grip doesn't grab anything else.
        assert!(fixture.tick(squeeze).is_empty());

        let actions = fixture.tick(InputSample::default());
        assert_eq!(actions.len(), 1);
        assert!(matches!(
            actions[0],
            Action::SetGrabbedObject { entity_uuid, grabbed: false, .. } if entity_uuid == near
        ));
        assert!(fixture.grabbable_state.is_empty());
    }

    #[test]
    fn test_drop_key_drops_everything() {
        let mut fixture = Fixture::new();
        let cube = fixture.spawn_grabbable(Vec3::new(0.2, 1.4, -0.5));
        let sphere = fixture.spawn_grabbable(Vec3::new(5.0, 0.0, 0.0));
        let grabs = [(cube, Handedness::Right), (sphere, Handedness::Left)];
        for (entity_uuid, attachment_point) in grabs {
            fixture.action_bus.dispatch(Action::SetGrabbedObject {
                entity_uuid,
                grabbed: true,
                attachment_point,
                grabber_entity_uuid: fixture.avatar_uuid,
            });
        }
        fixture.tick(InputSample::default());
        assert_eq!(fixture.grabbable_state.len(), 2);

        let actions = fixture.tick(InputSample {
            drop: true,
            ..Default::default()
        });
        assert_eq!(actions.len(), 2);
        assert!(fixture.grabbable_state.is_empty());
    }
}
