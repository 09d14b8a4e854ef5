use std::collections::HashMap;

use glam::{Quat, Vec3};
use hecs::Entity;
use log::trace;
use rapier3d::na::{Matrix3x1, Quaternion, UnitQuaternion};
use rapier3d::prelude::*;

use crate::{
    components::{
        physics::{Collider as ColliderComponent, RigidBody as RigidBodyComponent},
        Transform,
    },
    config::SessionConfig,
};

pub struct PhysicsContext {
    pub physics_pipeline: PhysicsPipeline,
    pub gravity: Matrix3x1<f32>,
    pub colliders: ColliderSet,
    pub broad_phase: BroadPhase,
    pub narrow_phase: NarrowPhase,
    pub rigid_bodies: RigidBodySet,
    pub island_manager: IslandManager,
    pub integration_parameters: IntegrationParameters,
    pub impulse_joints: ImpulseJointSet,
    pub multibody_joints: MultibodyJointSet,
    pub ccd_solver: CCDSolver,
    bodies_by_entity: HashMap<Entity, RigidBodyHandle>,
    colliders_by_entity: HashMap<Entity, ColliderHandle>,
}

impl Default for PhysicsContext {
    fn default() -> Self {
        PhysicsContext::new(&SessionConfig::default())
    }
}

impl PhysicsContext {
    pub fn new(config: &SessionConfig) -> Self {
        let [x, y, z] = config.gravity;
        let mut integration_parameters = IntegrationParameters::default();
        integration_parameters.dt = config.fixed_delta_time;

        PhysicsContext {
            physics_pipeline: PhysicsPipeline::new(),
            gravity: vector![x, y, z],
            colliders: ColliderSet::new(),
            broad_phase: BroadPhase::new(),
            narrow_phase: NarrowPhase::new(),
            rigid_bodies: RigidBodySet::new(),
            island_manager: IslandManager::new(),
            integration_parameters,
            impulse_joints: ImpulseJointSet::new(),
            multibody_joints: MultibodyJointSet::new(),
            ccd_solver: CCDSolver::new(),
            bodies_by_entity: Default::default(),
            colliders_by_entity: Default::default(),
        }
    }

    pub fn update(&mut self) {
        self.physics_pipeline.step(
            &self.gravity,
            &self.integration_parameters,
            &mut self.island_manager,
            &mut self.broad_phase,
            &mut self.narrow_phase,
            &mut self.rigid_bodies,
            &mut self.colliders,
            &mut self.impulse_joints,
            &mut self.multibody_joints,
            &mut self.ccd_solver,
            None,
            &(),
            &(),
        );
    }

    /// Make the simulation match `rigid_body`, creating the rapier body on first sight.
    pub fn sync_rigid_body(
        &mut self,
        entity: Entity,
        rigid_body: &mut RigidBodyComponent,
        transform: &Transform,
    ) {
        let body_type: RigidBodyType = rigid_body.body_type.into();
        let handle = match rigid_body.handle {
            Some(handle) if self.rigid_bodies.contains(handle) => handle,
            _ => {
                let body = RigidBodyBuilder::new(body_type)
                    .position(to_isometry(transform))
                    .user_data(entity.to_bits().get() as _)
                    .build();
                let handle = self.rigid_bodies.insert(body);
                self.bodies_by_entity.insert(entity, handle);
                rigid_body.handle = Some(handle);
                handle
            }
        };

        let Some(body) = self.rigid_bodies.get_mut(handle) else {
            return;
        };
        if body.body_type() != body_type {
            trace!("[HOTHAM_PHYSICS] {entity:?} is now {body_type:?}");
            body.set_body_type(body_type, true);
        }
        if body.is_kinematic() {
            if let Some(target) = rigid_body.kinematic_target.take() {
                body.set_next_kinematic_position(to_isometry(&target));
            }
        }
    }

    /// Make the simulation match `collider`, creating the rapier collider on first sight. `parent`
    /// is the body the collider is attached to, along with that body's transform.
    pub fn sync_collider(
        &mut self,
        entity: Entity,
        collider: &mut ColliderComponent,
        transform: &Transform,
        parent: Option<(RigidBodyHandle, Transform)>,
    ) {
        let groups = InteractionGroups::new(
            collider.collision_groups.bits().into(),
            collider.collision_mask.bits().into(),
        );

        let handle = match collider.handle {
            Some(handle) if self.colliders.contains(handle) => handle,
            _ => {
                let builder = ColliderBuilder::new(collider.shape.clone())
                    .sensor(collider.sensor)
                    .collision_groups(groups)
                    .user_data(entity.to_bits().get() as _);
                let handle = match parent {
                    Some((body_handle, body_transform)) => {
                        let relative =
                            to_isometry(&body_transform).inverse() * to_isometry(transform);
                        self.colliders.insert_with_parent(
                            builder.position(relative).build(),
                            body_handle,
                            &mut self.rigid_bodies,
                        )
                    }
                    None => self
                        .colliders
                        .insert(builder.position(to_isometry(transform)).build()),
                };
                self.colliders_by_entity.insert(entity, handle);
                collider.handle = Some(handle);
                return;
            }
        };

        let Some(rapier_collider) = self.colliders.get_mut(handle) else {
            return;
        };
        if rapier_collider.collision_groups() != groups {
            rapier_collider.set_collision_groups(groups);
            if let Some(body_handle) = rapier_collider.parent() {
                self.wake_up(body_handle);
            }
        }
    }

    pub fn wake_up(&mut self, handle: RigidBodyHandle) {
        if let Some(body) = self.rigid_bodies.get_mut(handle) {
            body.wake_up(true);
        }
    }

    /// Where the simulation has moved this body to.
    pub fn position(&self, handle: RigidBodyHandle) -> Option<(Vec3, Quat)> {
        let position = self.rigid_bodies.get(handle)?.position();
        let t = position.translation.vector;
        let r = position.rotation;
        Some((Vec3::new(t.x, t.y, t.z), Quat::from_xyzw(r.i, r.j, r.k, r.w)))
    }

    /// Remove bodies and colliders whose entities no longer have a `RigidBody` or `Collider`.
    pub fn remove_stale(
        &mut self,
        has_rigid_body: impl Fn(Entity) -> bool,
        has_collider: impl Fn(Entity) -> bool,
    ) {
        let stale_bodies = self
            .bodies_by_entity
            .iter()
            .filter(|(entity, _)| !has_rigid_body(**entity))
            .map(|(entity, handle)| (*entity, *handle))
            .collect::<Vec<_>>();
        for (entity, handle) in stale_bodies {
            self.bodies_by_entity.remove(&entity);
            self.rigid_bodies.remove(
                handle,
                &mut self.island_manager,
                &mut self.colliders,
                &mut self.impulse_joints,
                &mut self.multibody_joints,
                true,
            );
        }

        let stale_colliders = self
            .colliders_by_entity
            .iter()
            .filter(|(entity, _)| !has_collider(**entity))
            .map(|(entity, handle)| (*entity, *handle))
            .collect::<Vec<_>>();
        for (entity, handle) in stale_colliders {
            self.colliders_by_entity.remove(&entity);
            self.colliders.remove(
                handle,
                &mut self.island_manager,
                &mut self.rigid_bodies,
                true,
            );
        }
    }

    pub fn rigid_body_handle(&self, entity: Entity) -> Option<RigidBodyHandle> {
        self.bodies_by_entity.get(&entity).copied()
    }
}

pub(crate) fn to_isometry(transform: &Transform) -> Isometry<Real> {
    let t = transform.translation;
    let r = transform.rotation;
    Isometry::from_parts(
        vector![t.x, t.y, t.z].into(),
        UnitQuaternion::new_normalize(Quaternion::new(r.w, r.x, r.y, r.z)),
    )
}
