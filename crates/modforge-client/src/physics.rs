//! Collision shapes for spawned objects, built in rapier for pick raycasts.
//!
//! The physics world is rebuilt from the hecs world on demand and never
//! stepped: bodies sit at the poses of their nodes.

use std::collections::HashMap;

use glam::{Mat4, Quat, Vec3};
use rapier3d::prelude::*;

use modforge_core::components::{BodyKind, CollisionShape, PhysicsBody, Transform};

use crate::transform::world_matrix_of;

/// Central physics world state.
pub struct PhysicsWorld {
    pub rigid_body_set: RigidBodySet,
    pub collider_set: ColliderSet,
    pub query_pipeline: QueryPipeline,

    // Mapping from Rapier handles to ECS entities
    pub body_to_entity: HashMap<RigidBodyHandle, hecs::Entity>,
    pub collider_to_entity: HashMap<ColliderHandle, hecs::Entity>,
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}

struct BuiltBody {
    handle: RigidBodyHandle,
    world: Mat4,
    body: PhysicsBody,
}

impl PhysicsWorld {
    pub fn new() -> Self {
        Self {
            rigid_body_set: RigidBodySet::new(),
            collider_set: ColliderSet::new(),
            query_pipeline: QueryPipeline::new(),
            body_to_entity: HashMap::new(),
            collider_to_entity: HashMap::new(),
        }
    }

    pub fn clear(&mut self) {
        self.rigid_body_set = RigidBodySet::new();
        self.collider_set = ColliderSet::new();
        self.body_to_entity.clear();
        self.collider_to_entity.clear();
        self.query_pipeline.update(&self.collider_set);
    }

    /// Rebuild every body and collider from the scene.
    ///
    /// Each entity with a [`PhysicsBody`] becomes a rapier body at its world
    /// pose. Each [`CollisionShape`] attaches to the nearest ancestor body,
    /// itself included. Shapes with no body above them are ignored.
    pub fn rebuild(&mut self, world: &hecs::World) {
        self.clear();

        let mut bodies: HashMap<hecs::Entity, BuiltBody> = HashMap::new();
        for (entity, body) in world.query::<&PhysicsBody>().iter() {
            let matrix = world_matrix_of(world, entity);
            let (_, rotation, position) = matrix.to_scale_rotation_translation();
            let builder = match body.kind {
                BodyKind::Static | BodyKind::Area => RigidBodyBuilder::fixed(),
                BodyKind::RigidBody | BodyKind::Vehicle if body.frozen => {
                    RigidBodyBuilder::kinematic_position_based()
                }
                BodyKind::RigidBody | BodyKind::Vehicle => RigidBodyBuilder::dynamic(),
            };
            let rb = builder
                .translation(vector![position.x, position.y, position.z])
                .rotation(quat_to_angvector(rotation))
                .build();
            let handle = self.rigid_body_set.insert(rb);
            self.body_to_entity.insert(handle, entity);
            bodies.insert(
                entity,
                BuiltBody {
                    handle,
                    world: Mat4::from_rotation_translation(rotation, position),
                    body: body.clone(),
                },
            );
        }

        for (entity, shape) in world.query::<&CollisionShape>().iter() {
            let Some(owner) = owning_body(world, entity, &bodies) else {
                tracing::debug!("Collision shape {:?} has no body, ignored", entity);
                continue;
            };
            let built = &bodies[&owner];

            let relative = built.world.inverse() * world_matrix_of(world, entity);
            let (scale, rotation, position) = relative.to_scale_rotation_translation();
            let Some(builder) = shape_to_collider(shape, scale.abs()) else {
                tracing::warn!("Collision shape {:?} is empty, ignored", entity);
                continue;
            };

            let mut builder = builder
                .translation(vector![position.x, position.y, position.z])
                .rotation(quat_to_angvector(rotation))
                .sensor(built.body.kind == BodyKind::Area);
            if matches!(built.body.kind, BodyKind::RigidBody | BodyKind::Vehicle) {
                builder = builder.mass(built.body.mass);
            }

            let col_handle = self.collider_set.insert_with_parent(
                builder.build(),
                built.handle,
                &mut self.rigid_body_set,
            );
            self.collider_to_entity.insert(col_handle, owner);
        }

        self.query_pipeline.update(&self.collider_set);
        tracing::debug!(
            "Physics rebuilt: {} bodies, {} colliders",
            self.rigid_body_set.len(),
            self.collider_set.len()
        );
    }

    /// Cast a ray against every collider and return the first hit.
    pub fn raycast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<(hecs::Entity, f32, Vec3)> {
        self.cast(origin, direction, max_distance, QueryFilter::default())
    }

    /// Cast a ray against pick areas only.
    pub fn pick(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
    ) -> Option<(hecs::Entity, f32, Vec3)> {
        let sensors_only = |_: ColliderHandle, collider: &Collider| collider.is_sensor();
        self.cast(
            origin,
            direction,
            max_distance,
            QueryFilter::default().predicate(&sensors_only),
        )
    }

    fn cast(
        &self,
        origin: Vec3,
        direction: Vec3,
        max_distance: f32,
        filter: QueryFilter,
    ) -> Option<(hecs::Entity, f32, Vec3)> {
        let dir = direction.normalize_or_zero();
        let ray = Ray::new(
            point![origin.x, origin.y, origin.z],
            vector![dir.x, dir.y, dir.z],
        );

        let (handle, intersection) = self.query_pipeline.cast_ray_and_get_normal(
            &self.rigid_body_set,
            &self.collider_set,
            &ray,
            max_distance,
            true,
            filter,
        )?;
        let entity = *self.collider_to_entity.get(&handle)?;
        let normal = Vec3::new(
            intersection.normal.x,
            intersection.normal.y,
            intersection.normal.z,
        );
        Some((entity, intersection.time_of_impact, normal))
    }
}

fn owning_body(
    world: &hecs::World,
    entity: hecs::Entity,
    bodies: &HashMap<hecs::Entity, BuiltBody>,
) -> Option<hecs::Entity> {
    let mut current = Some(entity);
    while let Some(e) = current {
        if bodies.contains_key(&e) {
            return Some(e);
        }
        current = world.get::<&Transform>(e).ok().and_then(|t| t.parent);
    }
    None
}

fn shape_to_collider(shape: &CollisionShape, scale: Vec3) -> Option<ColliderBuilder> {
    match shape {
        CollisionShape::Box { half_extents } => {
            let h = *half_extents * scale;
            Some(ColliderBuilder::cuboid(h.x, h.y, h.z))
        }
        CollisionShape::ConcaveMesh {
            vertices,
            triangles,
        } => {
            if triangles.is_empty() {
                return None;
            }
            let points: Vec<rapier3d::na::Point3<f32>> = vertices
                .iter()
                .map(|v| {
                    let p = *v * scale;
                    point![p.x, p.y, p.z]
                })
                .collect();
            Some(ColliderBuilder::new(SharedShape::trimesh(
                points,
                triangles.to_vec(),
            )))
        }
    }
}

fn quat_to_angvector(q: Quat) -> rapier3d::na::Vector3<f32> {
    let (axis, angle) = q.to_axis_angle();
    vector![axis.x * angle, axis.y * angle, axis.z * angle]
}
