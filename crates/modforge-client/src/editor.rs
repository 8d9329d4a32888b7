//! Level editor controller.
//!
//! Holds the editable scene built from editor templates, the selection and
//! the translate gizmo. Pointer input arrives as viewport pixels together
//! with the camera that produced them.

use std::collections::HashMap;
use std::path::PathBuf;

use glam::{Vec2, Vec3};

use modforge_core::components::{EditorObject, Highlighted, Tags, Transform};
use modforge_core::events::{Event, EventBus};
use modforge_core::gizmo::{DragMode, TranslateGizmo};
use modforge_core::level::{Level, LevelObject, NEW_LEVEL_ID, NEW_LEVEL_NAME};
use modforge_core::math::euler_degrees_to_quat;

use crate::camera::ViewCamera;
use crate::instantiate::{InstantiateError, ObjectsLoader};
use crate::mod_registry::{Mod, ModError};
use crate::node::Node;
use crate::physics::PhysicsWorld;
use crate::resources::ResourceLoader;
use crate::transform::update_transforms;
use crate::world::SceneWorld;

/// Offset applied to a duplicated object.
pub const DUPLICATE_OFFSET: Vec3 = Vec3::new(1.0, 0.0, 1.0);

#[derive(Debug)]
pub enum EditorError {
    UnknownObject(String),
    UnknownName(String),
    NameTaken(String),
    NoSelection,
    Instantiate { id: String, source: InstantiateError },
    Mod(ModError),
}

impl std::fmt::Display for EditorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownObject(id) => write!(f, "no object definition with id '{}'", id),
            Self::UnknownName(name) => write!(f, "no object named '{}' in the level", name),
            Self::NameTaken(name) => write!(f, "the name '{}' is already used", name),
            Self::NoSelection => write!(f, "nothing is selected"),
            Self::Instantiate { id, source } => {
                write!(f, "failed to instantiate '{}': {}", id, source)
            }
            Self::Mod(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for EditorError {}

impl From<ModError> for EditorError {
    fn from(e: ModError) -> Self {
        Self::Mod(e)
    }
}

pub struct LevelEditor {
    registry: Mod,
    resources: Box<dyn ResourceLoader>,
    templates: HashMap<String, Node>,
    level_id: String,
    level_name: String,
    pub scene: SceneWorld,
    pub physics: PhysicsWorld,
    pub gizmo: TranslateGizmo,
    pub events: EventBus,
    selected: Option<String>,
    hovered: Option<String>,
}

impl LevelEditor {
    /// Start editing a blank level.
    pub fn new(registry: Mod, resources: Box<dyn ResourceLoader>) -> Self {
        Self {
            registry,
            resources,
            templates: HashMap::new(),
            level_id: NEW_LEVEL_ID.to_string(),
            level_name: NEW_LEVEL_NAME.to_string(),
            scene: SceneWorld::new(),
            physics: PhysicsWorld::new(),
            gizmo: TranslateGizmo::new(),
            events: EventBus::default(),
            selected: None,
            hovered: None,
        }
    }

    /// Editor over a mod's own `objects/` directory.
    pub fn open(registry: Mod) -> Self {
        let resources = Box::new(registry.resources());
        Self::new(registry, resources)
    }

    pub fn registry(&self) -> &Mod {
        &self.registry
    }

    pub fn level_id(&self) -> &str {
        &self.level_id
    }

    pub fn level_name(&self) -> &str {
        &self.level_name
    }

    pub fn set_level_name(&mut self, name: &str) {
        self.level_name = name.to_string();
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn hovered(&self) -> Option<&str> {
        self.hovered.as_deref()
    }

    fn template(&mut self, id: &str) -> Result<Node, EditorError> {
        if let Some(node) = self.templates.get(id) {
            return Ok(node.clone());
        }
        let definition = self
            .registry
            .definition(id)
            .ok_or_else(|| EditorError::UnknownObject(id.to_string()))?;
        let node = ObjectsLoader::new(self.resources.as_mut())
            .instantiate_editor(definition)
            .map_err(|source| EditorError::Instantiate {
                id: id.to_string(),
                source,
            })?;
        self.templates.insert(id.to_string(), node.clone());
        Ok(node)
    }

    fn refresh_physics(&mut self) {
        update_transforms(&mut self.scene.world);
        self.physics.rebuild(&self.scene.world);
    }

    /// Replace the scene with an empty `new_level`.
    pub fn new_level(&mut self) {
        self.scene.clear();
        self.level_id = NEW_LEVEL_ID.to_string();
        self.level_name = NEW_LEVEL_NAME.to_string();
        self.hovered = None;
        self.select(None);
        self.refresh_physics();
        tracing::info!("New level");
    }

    /// Load `levels/<name>.json`. On error the current level stays as it was.
    /// Objects with unknown ids or failing templates are logged and skipped.
    pub fn load_level(&mut self, name: &str) -> Result<usize, EditorError> {
        let level = self.registry.load_level(name)?;
        let placed: Vec<LevelObject> = self
            .registry
            .resolve_objects(&level)
            .into_iter()
            .map(|(object, _)| object.clone())
            .collect();

        let mut scene = SceneWorld::new();
        for object in &placed {
            let mut node = match self.template(object.object_id()) {
                Ok(node) => node,
                Err(e) => {
                    tracing::error!("Skipping '{}': {}", object.display_name(), e);
                    continue;
                }
            };
            node.set_transform(&object.transform());
            let (_, entity) = scene.spawn_object(object.display_name(), &node);
            let tags = object.tags.clone().unwrap_or_default();
            let _ = scene.world.insert_one(entity, Tags(tags));
        }

        self.scene = scene;
        self.level_id = level.id().to_string();
        self.level_name = level.name().to_string();
        self.hovered = None;
        self.select(None);
        self.refresh_physics();

        let count = self.scene.len();
        tracing::info!("Loaded level '{}' with {} objects", self.level_id, count);
        self.events.emit(Event::LevelLoaded {
            id: self.level_id.clone(),
            objects: count,
        });
        Ok(count)
    }

    /// Collect the editor instances back into a level record.
    pub fn to_level(&self) -> Level {
        let mut objects = Vec::with_capacity(self.scene.len());
        for name in self.scene.names() {
            let Some(entity) = self.scene.entity(name) else {
                continue;
            };
            let Ok(editor) = self.scene.world.get::<&EditorObject>(entity) else {
                continue;
            };
            let transform = self
                .scene
                .world
                .get::<&Transform>(entity)
                .map(|t| t.to_def())
                .unwrap_or_default();
            let tags = self
                .scene
                .world
                .get::<&Tags>(entity)
                .ok()
                .filter(|t| !t.0.is_empty())
                .map(|t| t.0.clone());
            objects.push(LevelObject {
                name: Some(name.clone()),
                object_id: Some(editor.object_id.clone()),
                transform: Some(transform),
                tags,
            });
        }
        Level {
            id: Some(self.level_id.clone()),
            name: Some(self.level_name.clone()),
            objects: Some(objects),
        }
    }

    /// Save to `levels/<name>.json`, or under the current level id. The level
    /// id becomes the file stem. Nothing is written if validation fails.
    pub fn save_level(&mut self, name: Option<&str>) -> Result<PathBuf, EditorError> {
        let id = name.unwrap_or(&self.level_id).to_string();
        let mut level = self.to_level();
        level.id = Some(id.clone());

        let path = self.registry.save_level(&id, &level)?;
        self.level_id = id.clone();
        tracing::info!("Saved level '{}' to {:?}", id, path);
        self.events.emit(Event::LevelSaved {
            id,
            path: path.display().to_string(),
        });
        Ok(path)
    }

    /// Place a new instance of `id` and select it.
    pub fn place_object(&mut self, id: &str, position: Vec3) -> Result<String, EditorError> {
        let mut node = self.template(id)?;
        node.position = position;
        let (name, entity) = self.scene.spawn_object(id, &node);
        let _ = self.scene.world.insert_one(entity, Tags::default());
        self.refresh_physics();
        self.select(Some(&name));
        Ok(name)
    }

    /// Copy the selection, offset by [`DUPLICATE_OFFSET`], and select the copy.
    pub fn duplicate_selected(&mut self) -> Result<String, EditorError> {
        let source = self.selected.clone().ok_or(EditorError::NoSelection)?;
        let entity = self
            .scene
            .entity(&source)
            .ok_or_else(|| EditorError::UnknownName(source.clone()))?;
        let object_id = self
            .scene
            .world
            .get::<&EditorObject>(entity)
            .map(|e| e.object_id.clone())
            .map_err(|_| EditorError::UnknownName(source.clone()))?;
        let transform = self
            .scene
            .transform(&source)
            .unwrap_or_default();
        let tags = self
            .scene
            .world
            .get::<&Tags>(entity)
            .map(|t| t.0.clone())
            .unwrap_or_default();

        let mut node = self.template(&object_id)?;
        node.position = transform.position + DUPLICATE_OFFSET;
        node.rotation = transform.rotation;
        node.scale = transform.scale;
        let (name, copy) = self.scene.spawn_object(&source, &node);
        let _ = self.scene.world.insert_one(copy, Tags(tags));
        self.refresh_physics();
        self.select(Some(&name));
        Ok(name)
    }

    pub fn delete_selected(&mut self) -> Result<String, EditorError> {
        let name = self.selected.clone().ok_or(EditorError::NoSelection)?;
        self.scene.destroy(&name);
        if self.hovered.as_deref() == Some(name.as_str()) {
            self.hovered = None;
        }
        self.select(None);
        self.refresh_physics();
        Ok(name)
    }

    pub fn rename_selected(&mut self, new_name: &str) -> Result<(), EditorError> {
        let old = self.selected.clone().ok_or(EditorError::NoSelection)?;
        if new_name.is_empty() || !self.scene.rename(&old, new_name) {
            return Err(EditorError::NameTaken(new_name.to_string()));
        }
        self.selected = Some(new_name.to_string());
        if self.hovered.as_deref() == Some(old.as_str()) {
            self.hovered = Some(new_name.to_string());
        }
        self.events.emit(Event::ObjectSelected {
            name: Some(new_name.to_string()),
        });
        Ok(())
    }

    pub fn set_selected_position(&mut self, position: Vec3) -> Result<(), EditorError> {
        let name = self.selected.clone().ok_or(EditorError::NoSelection)?;
        self.scene.set_position(&name, position);
        self.gizmo.set_target(Some(position));
        self.transformed(&name);
        Ok(())
    }

    pub fn set_selected_rotation_degrees(&mut self, degrees: Vec3) -> Result<(), EditorError> {
        let name = self.selected.clone().ok_or(EditorError::NoSelection)?;
        let rotation = euler_degrees_to_quat(degrees.to_array());
        self.scene.update_transform(&name, |t| t.rotation = rotation);
        self.transformed(&name);
        Ok(())
    }

    fn transformed(&mut self, name: &str) {
        self.refresh_physics();
        if let Some(position) = self.scene.position(name) {
            self.events.emit(Event::ObjectTransformed {
                name: name.to_string(),
                position,
            });
        }
    }

    /// Change the selection. Unknown names clear it.
    pub fn select(&mut self, name: Option<&str>) {
        let name = name.filter(|n| self.scene.entity(n).is_some());
        if self.selected.as_deref() == name {
            return;
        }
        self.gizmo.end_drag();
        self.selected = name.map(str::to_string);
        self.gizmo
            .set_target(name.and_then(|n| self.scene.position(n)));
        self.events.emit(Event::ObjectSelected {
            name: self.selected.clone(),
        });
    }

    fn object_under(&self, camera: &ViewCamera, pointer: Vec2) -> Option<String> {
        let ray = camera.ray(pointer);
        let (entity, _, _) = self.physics.pick(ray.origin, ray.direction, camera.far)?;
        self.scene.object_name_of(entity)
    }

    /// Press: grab a gizmo handle if one is under the pointer, otherwise
    /// select whatever object the pointer hits (or clear the selection).
    pub fn pointer_pressed(&mut self, camera: &ViewCamera, pointer: Vec2) {
        let ray = camera.ray(pointer);
        let handle = self.gizmo.pick(&ray);
        if handle != DragMode::None && self.gizmo.begin_drag(&ray, handle, camera.position) {
            return;
        }
        let hit = self.object_under(camera, pointer);
        self.select(hit.as_deref());
    }

    /// Move: drag the selection, or update hover state.
    pub fn pointer_moved(&mut self, camera: &ViewCamera, pointer: Vec2) {
        let ray = camera.ray(pointer);
        if self.gizmo.is_dragging() {
            if let (Some(position), Some(name)) = (self.gizmo.update_drag(&ray), &self.selected) {
                self.scene.set_position(name, position);
            }
            return;
        }

        let hovered = if self.gizmo.hover(&ray) != DragMode::None {
            None
        } else {
            self.object_under(camera, pointer)
        };
        self.set_hovered(hovered);
    }

    /// Release: finish a drag.
    pub fn pointer_released(&mut self) {
        if !self.gizmo.is_dragging() {
            return;
        }
        self.gizmo.end_drag();
        if let Some(name) = self.selected.clone() {
            self.transformed(&name);
        }
    }

    fn set_hovered(&mut self, name: Option<String>) {
        if self.hovered == name {
            return;
        }
        if let Some(entity) = self.hovered.as_deref().and_then(|n| self.scene.entity(n)) {
            let _ = self.scene.world.remove_one::<Highlighted>(entity);
        }
        if let Some(entity) = name.as_deref().and_then(|n| self.scene.entity(n)) {
            let _ = self.scene.world.insert_one(entity, Highlighted);
        }
        self.hovered = name;
    }

    pub fn flush_events(&mut self) -> Vec<Event> {
        self.events.flush()
    }
}
