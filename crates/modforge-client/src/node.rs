//! Node templates: the instantiated form of an object definition.
//!
//! A [`Node`] tree is built once per definition and then cloned for every
//! placed instance. Cloning shares mesh and collision data through `Arc`, so
//! instances stay cheap. [`Node::spawn`] materializes a tree into a hecs world.

use glam::{Mat4, Quat, Vec3};
use hecs::{Entity, EntityBuilder, World};

use modforge_core::components::{
    CollisionShape, EditorObject, MeshInstance, Name, PhysicsBody, ScriptBehavior, Shooter,
    Transform, VehicleController, Wheel,
};
use modforge_core::math::{compose_transform, TransformDef};
use modforge_core::mesh::Aabb;

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub position: Vec3,
    pub rotation: Quat,
    pub scale: Vec3,
    pub mesh: Option<MeshInstance>,
    pub body: Option<PhysicsBody>,
    pub shape: Option<CollisionShape>,
    pub wheel: Option<Wheel>,
    pub vehicle: Option<VehicleController>,
    pub shooter: Option<Shooter>,
    pub script: Option<ScriptBehavior>,
    pub editor: Option<EditorObject>,
    pub children: Vec<Node>,
}

impl Default for Node {
    fn default() -> Self {
        Self {
            name: String::new(),
            position: Vec3::ZERO,
            rotation: Quat::IDENTITY,
            scale: Vec3::ONE,
            mesh: None,
            body: None,
            shape: None,
            wheel: None,
            vehicle: None,
            shooter: None,
            script: None,
            editor: None,
            children: Vec::new(),
        }
    }
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn add_child(&mut self, child: Node) {
        self.children.push(child);
    }

    /// Replace position, rotation and scale. Absent parts reset to identity.
    pub fn set_transform(&mut self, def: &TransformDef) {
        self.position = def.position();
        self.rotation = def.rotation();
        self.scale = def.scale();
    }

    pub fn transform_def(&self) -> TransformDef {
        TransformDef::from_parts(self.position, self.rotation, self.scale)
    }

    pub fn local_matrix(&self) -> Mat4 {
        compose_transform(self.position, self.rotation, self.scale)
    }

    /// Bounding box used to fit default colliders.
    ///
    /// A node with a mesh reports that mesh's box, scaled and offset by the
    /// node. Otherwise the boxes of direct children that carry a mesh are
    /// merged; grandchildren are not visited. Rotation is ignored.
    pub fn aabb(&self) -> Aabb {
        if let Some(mesh) = &self.mesh {
            return mesh.mesh.aabb().placed(self.position, self.scale);
        }

        let mut merged: Option<Aabb> = None;
        for child in &self.children {
            let Some(mesh) = &child.mesh else {
                continue;
            };
            let aabb = mesh.mesh.aabb().placed(child.position, child.scale);
            merged = Some(match merged {
                Some(m) => m.merge(&aabb),
                None => aabb,
            });
        }
        merged.unwrap_or_default()
    }

    /// Depth-first search of this subtree, including the node itself.
    pub fn find(&self, name: &str) -> Option<&Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    pub fn find_mut(&mut self, name: &str) -> Option<&mut Node> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter_mut().find_map(|c| c.find_mut(name))
    }

    /// Nodes in this subtree, including the node itself.
    pub fn count(&self) -> usize {
        1 + self.children.iter().map(Node::count).sum::<usize>()
    }

    /// Spawn this subtree. Returns the entity created for this node.
    pub fn spawn(&self, world: &mut World, parent: Option<Entity>) -> Entity {
        let mut builder = EntityBuilder::new();
        builder.add(Name(self.name.clone()));
        builder.add(Transform {
            position: self.position,
            rotation: self.rotation,
            scale: self.scale,
            parent,
            ..Default::default()
        });
        if let Some(mesh) = &self.mesh {
            builder.add(mesh.clone());
        }
        if let Some(body) = &self.body {
            builder.add(body.clone());
        }
        if let Some(shape) = &self.shape {
            builder.add(shape.clone());
        }
        if let Some(wheel) = self.wheel {
            builder.add(wheel);
        }
        if let Some(vehicle) = &self.vehicle {
            builder.add(vehicle.clone());
        }
        if let Some(shooter) = &self.shooter {
            builder.add(shooter.clone());
        }
        if let Some(script) = &self.script {
            builder.add(script.clone());
        }
        if let Some(editor) = &self.editor {
            builder.add(editor.clone());
        }

        let entity = world.spawn(builder.build());
        for child in &self.children {
            child.spawn(world, Some(entity));
        }
        entity
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modforge_core::components::BodyKind;
    use modforge_core::mesh::MeshData;
    use std::sync::Arc;

    fn mesh_node(name: &str, position: Vec3, scale: Vec3) -> Node {
        Node {
            mesh: Some(MeshInstance {
                mesh: Arc::new(MeshData::cube()),
                texture: None,
            }),
            position,
            scale,
            ..Node::new(name)
        }
    }

    #[test]
    fn test_aabb_of_mesh_node() {
        let node = mesh_node("Mesh", Vec3::new(0.0, 1.0, 0.0), Vec3::splat(2.0));
        let aabb = node.aabb();
        assert_eq!(aabb.position, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(aabb.size, Vec3::splat(2.0));
    }

    #[test]
    fn test_aabb_merges_direct_children_only() {
        let mut root = Node::new("Root");
        root.add_child(mesh_node("A", Vec3::ZERO, Vec3::ONE));
        root.add_child(mesh_node("B", Vec3::new(2.0, 0.0, 0.0), Vec3::ONE));

        let mut group = Node::new("Group");
        group.add_child(mesh_node("Far", Vec3::new(100.0, 0.0, 0.0), Vec3::ONE));
        root.add_child(group);

        let aabb = root.aabb();
        assert_eq!(aabb.position, Vec3::new(-0.5, -0.5, -0.5));
        assert_eq!(aabb.size, Vec3::new(3.0, 1.0, 1.0));
    }

    #[test]
    fn test_aabb_empty_is_zero() {
        assert_eq!(Node::new("Empty").aabb(), Aabb::default());
    }

    #[test]
    fn test_clone_shares_mesh_data() {
        let node = mesh_node("Mesh", Vec3::ZERO, Vec3::ONE);
        let copy = node.clone();
        let a = &node.mesh.as_ref().unwrap().mesh;
        let b = &copy.mesh.as_ref().unwrap().mesh;
        assert!(Arc::ptr_eq(a, b));
    }

    #[test]
    fn test_spawn_links_children() {
        let mut root = Node::new("Root");
        root.body = Some(PhysicsBody {
            kind: BodyKind::Static,
            mass: 1.0,
            frozen: false,
        });
        root.add_child(mesh_node("Mesh", Vec3::ZERO, Vec3::ONE));
        assert_eq!(root.count(), 2);

        let mut world = World::new();
        let entity = root.spawn(&mut world, None);
        assert_eq!(world.len(), 2);
        assert!(world.get::<&PhysicsBody>(entity).is_ok());

        let children: Vec<Entity> = world
            .query::<&Transform>()
            .iter()
            .filter(|(_, t)| t.parent == Some(entity))
            .map(|(e, _)| e)
            .collect();
        assert_eq!(children.len(), 1);
        assert_eq!(world.get::<&Name>(children[0]).unwrap().0, "Mesh");
        assert!(world.get::<&MeshInstance>(children[0]).is_ok());
    }
}
