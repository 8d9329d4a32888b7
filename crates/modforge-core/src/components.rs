use std::collections::BTreeMap;
use std::sync::Arc;

use glam::{Mat4, Quat, Vec3};

use crate::math::{compose_transform, TransformDef};
use crate::mesh::{MeshData, TextureData};
use crate::objects::{PhysicsType, ProjectileProperties};

/// Local transform plus cached world matrix. Present on every spawned node.
#[derive(Debug, Clone)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub world_matrix: Mat4,
    pub parent: Option<hecs::Entity>,
    pub dirty: bool,
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            world_matrix: Mat4::IDENTITY,
            parent: None,
            dirty: true,
        }
    }
}

impl Transform {
    pub fn from_def(def: &TransformDef) -> Self {
        Self {
            position: def.position(),
            rotation: def.rotation(),
            scale: def.scale(),
            ..Default::default()
        }
    }

    pub fn local_matrix(&self) -> Mat4 {
        compose_transform(self.position, self.rotation, self.scale)
    }

    pub fn world_position(&self) -> Vec3 {
        self.world_matrix.w_axis.truncate()
    }

    /// Full transform as written back to a level file.
    pub fn to_def(&self) -> TransformDef {
        TransformDef::from_parts(self.position, self.rotation, self.scale)
    }
}

/// Node name, unique only among siblings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name(pub String);

/// Definition id a spawned instance was stamped from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectRef(pub String);

/// Free-form level tags copied onto the instance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Tags(pub BTreeMap<String, String>);

/// Renderable mesh. Mesh and texture data are shared by every instance.
#[derive(Debug, Clone)]
pub struct MeshInstance {
    pub mesh: Arc<MeshData>,
    pub texture: Option<Arc<TextureData>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    Static,
    RigidBody,
    Vehicle,
    /// Detects pointer picks only; never collides.
    Area,
}

impl From<PhysicsType> for BodyKind {
    fn from(kind: PhysicsType) -> Self {
        match kind {
            PhysicsType::Static => BodyKind::Static,
            PhysicsType::RigidBody => BodyKind::RigidBody,
        }
    }
}

/// Physics body on the node. Child nodes carrying a [`CollisionShape`] attach to it.
#[derive(Debug, Clone, PartialEq)]
pub struct PhysicsBody {
    pub kind: BodyKind,
    pub mass: f32,
    /// Frozen bodies keep their pose relative to the parent (mounted weapons).
    pub frozen: bool,
}

#[derive(Debug, Clone)]
pub enum CollisionShape {
    Box {
        half_extents: Vec3,
    },
    /// Concave triangle soup, usable only on static bodies.
    ConcaveMesh {
        vertices: Arc<Vec<Vec3>>,
        triangles: Arc<Vec<[u32; 3]>>,
    },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Wheel {
    pub traction: bool,
    pub steering: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub struct VehicleController {
    pub engine_force: f32,
    pub brake_force: f32,
    pub steering_angle: f32,
    pub weapon_slots: Vec<Vec3>,
    pub controlled_by_player: bool,
}

/// Shooting behavior of a weapon.
#[derive(Debug, Clone, PartialEq)]
pub struct Shooter {
    pub projectile: ProjectileProperties,
    pub origin: Mat4,
    pub num_projectiles: u32,
    pub shoot_delay: f32,
}

/// Behavior script source loaded at instantiation time.
#[derive(Debug, Clone)]
pub struct ScriptBehavior {
    pub path: String,
    pub source: Arc<str>,
}

/// Marks the root of an editor-side instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EditorObject {
    pub object_id: String,
}

/// Marks the editor instance under the pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Highlighted;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;

    #[test]
    fn test_transform_from_def() {
        let def = TransformDef {
            position: Some(Vector3::new(1.0, 2.0, 3.0)),
            rotation: None,
            scale: Some(Vector3::new(2.0, 2.0, 2.0)),
        };
        let t = Transform::from_def(&def);
        assert_eq!(t.position, Vec3::new(1.0, 2.0, 3.0));
        assert_eq!(t.rotation, Quat::IDENTITY);
        assert_eq!(t.local_matrix(), def.to_matrix());
        assert!(t.dirty);
    }

    #[test]
    fn test_to_def_writes_every_part() {
        let t = Transform::default();
        let def = t.to_def();
        assert!(def.position.is_some());
        assert!(def.rotation.is_some());
        assert_eq!(def.scale, Some(Vector3::new(1.0, 1.0, 1.0)));
    }
}
