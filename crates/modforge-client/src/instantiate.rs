//! Object instantiation: definition in, [`Node`] template out.

use std::collections::HashMap;
use std::sync::Arc;

use glam::{Mat4, Vec3};

use modforge_core::components::{
    BodyKind, CollisionShape, EditorObject, MeshInstance, PhysicsBody, ScriptBehavior, Shooter,
    VehicleController, Wheel,
};
use modforge_core::mesh::{Aabb, TextureData};
use modforge_core::objects::{
    BoxCollider, ColliderProperties, MeshCollider, MeshProperties, ObjectDefinition,
    PhysicsProperties, PropDefinition, VehicleDefinition, WeaponDefinition,
};

use crate::node::Node;
use crate::resources::{wrong_kind, Resource, ResourceError, ResourceLoader, SubScene, SubSceneNode};

/// Sub-scenes may reference other sub-scenes up to this depth.
pub const MAX_SUB_SCENE_DEPTH: usize = 8;

pub const VISUAL_NODE: &str = "Mesh";
pub const COLLISION_NODE: &str = "CollisionShape";
pub const AREA_NODE: &str = "Area";
pub const SCRIPT_NODE: &str = "Script";

#[derive(Debug)]
pub enum InstantiateError {
    Resource(ResourceError),
}

impl std::fmt::Display for InstantiateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Resource(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for InstantiateError {}

impl From<ResourceError> for InstantiateError {
    fn from(e: ResourceError) -> Self {
        Self::Resource(e)
    }
}

/// Builds node templates from definitions, loading resources on demand.
pub struct ObjectsLoader<'a> {
    resources: &'a mut dyn ResourceLoader,
}

impl<'a> ObjectsLoader<'a> {
    pub fn new(resources: &'a mut dyn ResourceLoader) -> Self {
        Self { resources }
    }

    /// Full gameplay form of a definition. The root node is named after the id.
    pub fn instantiate(&mut self, definition: &ObjectDefinition) -> Result<Node, InstantiateError> {
        let mut root = match definition {
            ObjectDefinition::Prop(prop) => self.prop(prop)?,
            ObjectDefinition::Vehicle(vehicle) => self.vehicle(vehicle)?,
            ObjectDefinition::Weapon(weapon) => self.weapon(weapon)?,
            ObjectDefinition::Scene(scene) => self.sub_scene_file(&scene.file)?,
        };
        root.name = definition.id().to_string();

        if let Some(script) = definition.script() {
            root.add_child(self.script(script)?);
        }
        Ok(root)
    }

    /// Editor form: the visual plus a pick-only area carrying the collider.
    pub fn instantiate_editor(
        &mut self,
        definition: &ObjectDefinition,
    ) -> Result<Node, InstantiateError> {
        let mut root = Node::new(definition.id());
        root.editor = Some(EditorObject {
            object_id: definition.id().to_string(),
        });

        let visual = match definition {
            ObjectDefinition::Scene(scene) => self.sub_scene_file(&scene.file)?,
            _ => match definition.mesh() {
                Some(mesh) => self.load_visual(mesh)?,
                None => return Ok(root),
            },
        };

        if let Some(physics) = definition.physics() {
            let mut area = Node::new(AREA_NODE);
            area.body = Some(PhysicsBody {
                kind: BodyKind::Area,
                mass: 0.0,
                frozen: false,
            });
            area.add_child(self.collision_shape(&physics.collider, &visual)?);
            root.add_child(area);
        }
        root.add_child(visual);
        Ok(root)
    }

    /// Renderable node for mesh properties: a mesh instance or a sub-scene.
    pub fn load_visual(&mut self, props: &MeshProperties) -> Result<Node, InstantiateError> {
        let path = &props.render.mesh;
        let mut node = match self.resources.load(path)? {
            Resource::Mesh(mesh) => {
                let texture = self.optional_texture(props.render.texture.as_deref());
                Node {
                    mesh: Some(MeshInstance { mesh, texture }),
                    ..Node::new(VISUAL_NODE)
                }
            }
            Resource::Scene(scene) => {
                let mut node = self.sub_scene(path, &scene, 0)?;
                node.name = VISUAL_NODE.to_string();
                node
            }
            other => return Err(wrong_kind(path, "mesh or sub-scene", &other).into()),
        };

        if let Some(transform) = &props.transform {
            node.set_transform(transform);
        }
        Ok(node)
    }

    /// Collision shape node for a collider, fitted to `visual` when needed.
    pub fn collision_shape(
        &mut self,
        collider: &ColliderProperties,
        visual: &Node,
    ) -> Result<Node, InstantiateError> {
        match collider {
            ColliderProperties::Box(props) => Ok(box_collider(props, &visual.aabb())),
            ColliderProperties::Mesh(props) => self.mesh_collider(props),
        }
    }

    pub fn mesh_collider(&mut self, props: &MeshCollider) -> Result<Node, InstantiateError> {
        let mesh = self.resources.load_mesh(&props.mesh)?;
        let triangles = mesh.triangles();
        if triangles.is_empty() {
            return Err(ResourceError::EmptyMesh(props.mesh.clone()).into());
        }

        let mut node = Node::new(COLLISION_NODE);
        node.shape = Some(CollisionShape::ConcaveMesh {
            vertices: Arc::new(mesh.positions.clone()),
            triangles: Arc::new(triangles),
        });
        if let Some(transform) = &props.transform {
            node.set_transform(transform);
        }
        Ok(node)
    }

    fn optional_texture(&mut self, path: Option<&str>) -> Option<Arc<TextureData>> {
        let path = path?;
        match self.resources.load_texture(path) {
            Ok(texture) => Some(texture),
            Err(e) => {
                tracing::warn!("Texture '{}' not loaded, mesh stays untextured: {}", path, e);
                None
            }
        }
    }

    /// Body root with its shape attached.
    fn physics_root(
        &mut self,
        name: &str,
        physics: &PhysicsProperties,
        kind: BodyKind,
        visual: &Node,
    ) -> Result<Node, InstantiateError> {
        let mut root = Node::new(name);
        root.body = Some(PhysicsBody {
            kind,
            mass: match kind {
                BodyKind::Static | BodyKind::Area => 0.0,
                _ => physics.mass(),
            },
            frozen: false,
        });
        root.add_child(self.collision_shape(&physics.collider, visual)?);
        Ok(root)
    }

    fn prop(&mut self, def: &PropDefinition) -> Result<Node, InstantiateError> {
        let visual = self.load_visual(&def.mesh)?;
        let mut root = match &def.physics {
            Some(physics) => self.physics_root(&def.id, physics, physics.kind.into(), &visual)?,
            None => Node::new(&def.id),
        };
        root.add_child(visual);
        Ok(root)
    }

    fn vehicle(&mut self, def: &VehicleDefinition) -> Result<Node, InstantiateError> {
        let visual = self.load_visual(&def.mesh)?;
        let mut root = match &def.physics {
            Some(physics) => self.physics_root(&def.id, physics, BodyKind::Vehicle, &visual)?,
            None => Node {
                body: Some(PhysicsBody {
                    kind: BodyKind::Vehicle,
                    mass: 1.0,
                    frozen: false,
                }),
                ..Node::new(&def.id)
            },
        };
        root.vehicle = Some(VehicleController {
            engine_force: def.vehicle.engine_force,
            brake_force: def.vehicle.brake_force,
            steering_angle: def.vehicle.steering_angle,
            weapon_slots: def.weapon_slots().iter().copied().map(Vec3::from).collect(),
            controlled_by_player: false,
        });
        root.add_child(visual);

        for (index, props) in def.wheels().iter().enumerate() {
            let mut wheel = Node::new(format!("Wheel{}", index + 1));
            wheel.wheel = Some(Wheel {
                traction: props.traction(),
                steering: props.steering(),
            });
            if let Some(transform) = &props.transform {
                wheel.set_transform(transform);
            }
            wheel.add_child(self.load_visual(&props.mesh)?);
            root.add_child(wheel);
        }
        Ok(root)
    }

    fn weapon(&mut self, def: &WeaponDefinition) -> Result<Node, InstantiateError> {
        let visual = self.load_visual(&def.mesh)?;
        let mut root = match &def.physics {
            Some(physics) => self.physics_root(&def.id, physics, physics.kind.into(), &visual)?,
            None => Node::new(&def.id),
        };
        root.shooter = Some(Shooter {
            projectile: def.projectile.clone(),
            origin: def
                .projectile
                .transform()
                .map_or(Mat4::IDENTITY, |t| t.to_matrix()),
            num_projectiles: def.num_projectiles(),
            shoot_delay: def.shoot_delay(),
        });
        root.add_child(visual);
        Ok(root)
    }

    fn script(&mut self, path: &str) -> Result<Node, InstantiateError> {
        let source = self.resources.read_text(path)?;
        Ok(Node {
            script: Some(ScriptBehavior {
                path: path.to_string(),
                source: Arc::from(source),
            }),
            ..Node::new(SCRIPT_NODE)
        })
    }

    fn sub_scene_file(&mut self, path: &str) -> Result<Node, InstantiateError> {
        match self.resources.load(path)? {
            Resource::Scene(scene) => self.sub_scene(path, &scene, 0),
            other => Err(wrong_kind(path, "sub-scene", &other).into()),
        }
    }

    fn sub_scene(
        &mut self,
        path: &str,
        scene: &SubScene,
        depth: usize,
    ) -> Result<Node, InstantiateError> {
        if depth >= MAX_SUB_SCENE_DEPTH {
            return Err(ResourceError::NestingTooDeep(path.to_string()).into());
        }
        let mut root = Node::new(&scene.name);
        for node in &scene.nodes {
            root.add_child(self.sub_scene_node(node, depth)?);
        }
        Ok(root)
    }

    fn sub_scene_node(
        &mut self,
        def: &SubSceneNode,
        depth: usize,
    ) -> Result<Node, InstantiateError> {
        let mut node = match &def.mesh {
            None => Node::new(&def.name),
            Some(path) => match self.resources.load(path)? {
                Resource::Mesh(mesh) => {
                    let texture = self.optional_texture(def.texture.as_deref());
                    Node {
                        mesh: Some(MeshInstance { mesh, texture }),
                        ..Node::new(&def.name)
                    }
                }
                Resource::Scene(nested) => {
                    let mut node = self.sub_scene(path, &nested, depth + 1)?;
                    node.name = def.name.clone();
                    node
                }
                other => return Err(wrong_kind(path, "mesh or sub-scene", &other).into()),
            },
        };

        if let Some(transform) = &def.transform {
            node.set_transform(transform);
        }
        for child in &def.children {
            node.add_child(self.sub_scene_node(child, depth)?);
        }
        Ok(node)
    }
}

/// Box collider node. Without an explicit transform the box is centered on
/// `aabb`; without an explicit size it takes the size of `aabb`.
pub fn box_collider(props: &BoxCollider, aabb: &Aabb) -> Node {
    let size = props.size.map_or(aabb.size, Vec3::from);
    let mut node = Node::new(COLLISION_NODE);
    node.shape = Some(CollisionShape::Box {
        half_extents: size / 2.0,
    });
    match &props.transform {
        Some(transform) => node.set_transform(transform),
        None => node.position = aabb.center(),
    }
    node
}

/// Gameplay templates for every definition of a mod, keyed by id.
#[derive(Default)]
pub struct ObjectsCollection {
    templates: HashMap<String, Node>,
}

impl ObjectsCollection {
    /// Instantiate every definition. Failures are logged and the definition is skipped.
    pub fn load<'d>(
        definitions: impl IntoIterator<Item = &'d ObjectDefinition>,
        resources: &mut dyn ResourceLoader,
    ) -> Self {
        let mut loader = ObjectsLoader::new(resources);
        let mut templates = HashMap::new();
        for definition in definitions {
            match loader.instantiate(definition) {
                Ok(node) => {
                    templates.insert(definition.id().to_string(), node);
                }
                Err(e) => {
                    tracing::error!("Failed to instantiate object '{}': {}", definition.id(), e);
                }
            }
        }
        tracing::info!("Instantiated {} object templates", templates.len());
        Self { templates }
    }

    pub fn get(&self, id: &str) -> Option<&Node> {
        self.templates.get(id)
    }

    /// A fresh instance of a template.
    pub fn instance(&self, id: &str) -> Option<Node> {
        self.templates.get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.templates.contains_key(id)
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }
}
