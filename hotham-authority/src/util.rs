use hecs::{Entity, World};
use itertools::Itertools;

use crate::components::{Hand, Handedness, Parent, Transform};

/// `root`, followed by every entity whose chain of `Parent`s leads back to it.
pub fn entity_and_descendants(world: &World, root: Entity) -> Vec<Entity> {
    let parents = world
        .query::<&Parent>()
        .iter()
        .map(|(entity, parent)| (entity, parent.0))
        .collect_vec();

    let mut found = vec![root];
    let mut next = 0;
    while let Some(current) = found.get(next).copied() {
        let children = parents
            .iter()
            .filter(|(child, parent)| *parent == current && !found.contains(child))
            .map(|(child, _)| *child)
            .collect_vec();
        found.extend(children);
        next += 1;
    }
    found
}

/// The hand entity of `grabber` with the given `handedness`, if it has one.
pub fn hand_entity(world: &World, grabber: Entity, handedness: Handedness) -> Option<Entity> {
    world
        .query::<(&Hand, &Parent)>()
        .iter()
        .find(|(_, (hand, parent))| hand.handedness == handedness && parent.0 == grabber)
        .map(|(entity, _)| entity)
}

/// Where a grabbed entity should be held: the pose of the grabber's hand, falling back to the
/// grabber itself if it has no hands.
pub fn hand_target(world: &World, grabber: Entity, handedness: Handedness) -> Option<Transform> {
    let target = hand_entity(world, grabber, handedness).unwrap_or(grabber);
    world.get::<&Transform>(target).ok().map(|t| *t)
}
