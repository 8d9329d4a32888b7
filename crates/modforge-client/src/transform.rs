use std::collections::HashMap;

use glam::Mat4;
use hecs::{Entity, World};

use modforge_core::components::Transform;

/// Deepest parent chain walked by [`world_matrix_of`].
const MAX_HIERARCHY_DEPTH: usize = 256;

/// Compute world matrices for all entities with Transform components.
///
/// Parents resolve before their children at any depth. An entity whose
/// parent no longer exists is treated as a root.
pub fn update_transforms(world: &mut World) {
    let mut pending: Vec<(Entity, Option<Entity>, Mat4)> = Vec::new();
    for (entity, transform) in world.query_mut::<&Transform>() {
        pending.push((entity, transform.parent, transform.local_matrix()));
    }

    let mut resolved: HashMap<Entity, Mat4> = HashMap::with_capacity(pending.len());
    while !pending.is_empty() {
        let before = pending.len();
        pending.retain(|(entity, parent, local)| {
            let parent_matrix = match parent {
                None => Mat4::IDENTITY,
                Some(p) => match resolved.get(p) {
                    Some(m) => *m,
                    None => return true,
                },
            };
            resolved.insert(*entity, parent_matrix * *local);
            false
        });

        if pending.len() == before {
            for (entity, _, local) in pending.drain(..) {
                tracing::warn!("Entity {:?} has a dangling parent, treating it as a root", entity);
                resolved.insert(entity, local);
            }
        }
    }

    for (entity, world_matrix) in resolved {
        if let Ok(mut transform) = world.get::<&mut Transform>(entity) {
            transform.world_matrix = world_matrix;
            transform.dirty = false;
        }
    }
}

/// World matrix of one entity computed from its parent chain, without
/// touching the cached `world_matrix` fields.
pub fn world_matrix_of(world: &World, entity: Entity) -> Mat4 {
    let mut matrix = Mat4::IDENTITY;
    let mut current = Some(entity);
    let mut depth = 0;
    while let Some(e) = current {
        let Ok(transform) = world.get::<&Transform>(e) else {
            break;
        };
        matrix = transform.local_matrix() * matrix;
        current = transform.parent;
        depth += 1;
        if depth > MAX_HIERARCHY_DEPTH {
            tracing::warn!("Parent chain of {:?} is too deep", entity);
            break;
        }
    }
    matrix
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::{Quat, Vec3};

    fn spawn(world: &mut World, position: Vec3, parent: Option<Entity>) -> Entity {
        world.spawn((Transform {
            position,
            parent,
            ..Default::default()
        },))
    }

    #[test]
    fn test_three_levels() {
        let mut world = World::new();
        let root = spawn(&mut world, Vec3::new(1.0, 0.0, 0.0), None);
        let child = spawn(&mut world, Vec3::new(0.0, 2.0, 0.0), Some(root));
        let grandchild = spawn(&mut world, Vec3::new(0.0, 0.0, 3.0), Some(child));

        update_transforms(&mut world);

        let t = world.get::<&Transform>(grandchild).unwrap();
        assert_eq!(t.world_position(), Vec3::new(1.0, 2.0, 3.0));
        assert!(!t.dirty);
        assert_eq!(world_matrix_of(&world, grandchild), t.world_matrix);
    }

    #[test]
    fn test_parent_rotation_and_scale() {
        let mut world = World::new();
        let root = world.spawn((Transform {
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::splat(2.0),
            ..Default::default()
        },));
        let child = spawn(&mut world, Vec3::new(1.0, 0.0, 0.0), Some(root));

        update_transforms(&mut world);

        let p = world.get::<&Transform>(child).unwrap().world_position();
        assert!((p - Vec3::new(0.0, 0.0, -2.0)).length() < 1e-5);
    }

    #[test]
    fn test_parent_non_uniform_scale_stretches_parent_axes() {
        let mut world = World::new();
        let root = world.spawn((Transform {
            rotation: Quat::from_rotation_y(std::f32::consts::FRAC_PI_2),
            scale: Vec3::new(2.0, 1.0, 1.0),
            ..Default::default()
        },));
        let along_x = spawn(&mut world, Vec3::new(1.0, 0.0, 0.0), Some(root));
        let along_z = spawn(&mut world, Vec3::new(0.0, 0.0, 1.0), Some(root));

        update_transforms(&mut world);

        let p = world.get::<&Transform>(along_x).unwrap().world_position();
        assert!((p - Vec3::new(0.0, 0.0, -1.0)).length() < 1e-5, "got {:?}", p);
        let q = world.get::<&Transform>(along_z).unwrap().world_position();
        assert!((q - Vec3::new(2.0, 0.0, 0.0)).length() < 1e-5, "got {:?}", q);
    }

    #[test]
    fn test_dangling_parent_is_root() {
        let mut world = World::new();
        let gone = spawn(&mut world, Vec3::new(5.0, 0.0, 0.0), None);
        let orphan = spawn(&mut world, Vec3::new(0.0, 1.0, 0.0), Some(gone));
        world.despawn(gone).unwrap();

        update_transforms(&mut world);

        let t = world.get::<&Transform>(orphan).unwrap();
        assert_eq!(t.world_position(), Vec3::new(0.0, 1.0, 0.0));
    }
}
