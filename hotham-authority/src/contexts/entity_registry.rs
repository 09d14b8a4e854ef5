use std::collections::HashMap;

use hecs::{DynamicBundle, Entity, World};

use crate::{components::EntityUuid, HothamError, HothamResult};

/// Resolves stable [`EntityUuid`]s to local `hecs::Entity` handles.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: HashMap<EntityUuid, Entity>,
}

impl EntityRegistry {
    /// Spawn a new entity carrying `uuid` along with `components`.
    pub fn spawn(
        &mut self,
        world: &mut World,
        uuid: EntityUuid,
        components: impl DynamicBundle,
    ) -> HothamResult<Entity> {
        if self.entity(world, uuid).is_some() {
            return Err(HothamError::DuplicateUuid(uuid));
        }
        let entity = world.spawn(components);
        world.insert_one(entity, uuid)?;
        self.entities.insert(uuid, entity);
        Ok(entity)
    }

    /// Give an existing entity a UUID.
    pub fn register(
        &mut self,
        world: &mut World,
        entity: Entity,
        uuid: EntityUuid,
    ) -> HothamResult<()> {
        match self.entity(world, uuid) {
            Some(existing) if existing != entity => return Err(HothamError::DuplicateUuid(uuid)),
            _ => {}
        }
        world.insert_one(entity, uuid)?;
        self.entities.insert(uuid, entity);
        Ok(())
    }

    /// Find the local entity for `uuid`. Returns `None` if it hasn't been replicated yet, or has
    /// been despawned.
    pub fn entity(&self, world: &World, uuid: EntityUuid) -> Option<Entity> {
        let entity = *self.entities.get(&uuid)?;
        match world.get::<&EntityUuid>(entity) {
            Ok(found) if *found == uuid => Some(entity),
            _ => None,
        }
    }

    /// Despawn the entity for `uuid`, if there is one.
    pub fn despawn(&mut self, world: &mut World, uuid: EntityUuid) -> Option<Entity> {
        let entity = self.entity(world, uuid);
        self.entities.remove(&uuid);
        let entity = entity?;
        world.despawn(entity).ok()?;
        Some(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::Info;

    #[test]
    fn test_resolve_uuids() {
        let mut world = World::new();
        let mut registry = EntityRegistry::default();
        let uuid = EntityUuid::new_v4();

        assert!(registry.entity(&world, uuid).is_none());
        let entity = registry.spawn(&mut world, uuid, (Info::new("cube"),)).unwrap();
        assert_eq!(registry.entity(&world, uuid), Some(entity));
        assert_eq!(*world.get::<&EntityUuid>(entity).unwrap(), uuid);

        assert!(matches!(
            registry.spawn(&mut world, uuid, ()),
            Err(HothamError::DuplicateUuid(_))
        ));

        assert_eq!(registry.despawn(&mut world, uuid), Some(entity));
        assert!(registry.entity(&world, uuid).is_none());
        assert!(!world.contains(entity));
        assert_eq!(registry.despawn(&mut world, uuid), None);
    }

    #[test]
    fn test_stale_handles_do_not_resolve() {
        let mut world = World::new();
        let mut registry = EntityRegistry::default();
        let uuid = EntityUuid::new_v4();

        let entity = registry.spawn(&mut world, uuid, ()).unwrap();
        // Despawned behind the registry's back
        world.despawn(entity).unwrap();
        assert!(registry.entity(&world, uuid).is_none());

        let replacement = world.spawn(());
        registry.register(&mut world, replacement, uuid).unwrap();
        assert_eq!(registry.entity(&world, uuid), Some(replacement));
    }
}
