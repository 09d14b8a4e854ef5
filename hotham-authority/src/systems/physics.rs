use std::collections::HashMap;

use hecs::{Entity, World};

use crate::{
    components::{BodyType, Collider, Parent, RigidBody, Transform},
    contexts::PhysicsContext,
    Session,
};

/// Physics system
/// Mirrors `RigidBody` and `Collider` components into the simulation, steps it, then writes the new
/// positions of dynamic bodies back to their `Transform`s.
pub fn physics_system(session: &mut Session) {
    physics_system_inner(&mut session.world, &mut session.physics_context);
}

pub(crate) fn physics_system_inner(world: &mut World, physics_context: &mut PhysicsContext) {
    physics_context.remove_stale(
        |entity| world.get::<&RigidBody>(entity).is_ok(),
        |entity| world.get::<&Collider>(entity).is_ok(),
    );

    let mut bodies = HashMap::new();
    for (entity, (rigid_body, transform)) in world.query_mut::<(&mut RigidBody, &Transform)>() {
        physics_context.sync_rigid_body(entity, rigid_body, transform);
        if let Some(handle) = rigid_body.handle {
            bodies.insert(entity, (handle, *transform));
        }
    }

    // A collider belongs to its own entity's body if it has one, otherwise to its parent's.
    let parents = world
        .query::<&Parent>()
        .iter()
        .map(|(entity, parent)| (entity, parent.0))
        .collect::<HashMap<Entity, Entity>>();
    for (entity, (collider, transform)) in world.query_mut::<(&mut Collider, &Transform)>() {
        let body = bodies
            .get(&entity)
            .or_else(|| parents.get(&entity).and_then(|parent| bodies.get(parent)))
            .copied();
        physics_context.sync_collider(entity, collider, transform, body);
    }

    physics_context.update();

    for (_, (rigid_body, transform)) in world.query_mut::<(&RigidBody, &mut Transform)>() {
        if rigid_body.body_type == BodyType::Fixed {
            continue;
        }
        let Some((translation, rotation)) = rigid_body
            .handle
            .and_then(|handle| physics_context.position(handle))
        else {
            continue;
        };
        transform.translation = translation;
        transform.rotation = rotation;
    }
}
