use std::collections::HashMap;

use glam::{Mat4, Vec3};
use hecs::{Entity, World};

use modforge_core::components::{Name, ObjectRef, Tags, Transform, VehicleController};
use modforge_core::events::{Event, EventBus};
use modforge_core::level::Level;
use modforge_core::objects::ObjectDefinition;

use crate::instantiate::ObjectsCollection;
use crate::mod_registry::Mod;
use crate::node::Node;
use crate::transform::world_matrix_of;

pub const PLAYER_TAG: &str = "player";

/// Central scene state: the ECS world plus the registry of named objects.
pub struct SceneWorld {
    pub world: World,
    /// Maps object names to their root entities.
    pub entity_registry: HashMap<String, Entity>,
    /// Registered names in spawn order.
    order: Vec<String>,
}

impl Default for SceneWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl SceneWorld {
    pub fn new() -> Self {
        Self {
            world: World::new(),
            entity_registry: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// `base` if free, otherwise `base_2`, `base_3`, ...
    pub fn unique_name(&self, base: &str) -> String {
        if !self.entity_registry.contains_key(base) {
            return base.to_string();
        }
        (2..)
            .map(|n| format!("{}_{}", base, n))
            .find(|name| !self.entity_registry.contains_key(name))
            .unwrap_or_else(|| base.to_string())
    }

    /// Spawn `node` as a named root object. The name is made unique and returned.
    pub fn spawn_object(&mut self, name: &str, node: &Node) -> (String, Entity) {
        let name = self.unique_name(name);
        let mut node = node.clone();
        node.name = name.clone();
        let entity = node.spawn(&mut self.world, None);
        self.register(&name, entity);
        (name, entity)
    }

    /// Register an already spawned entity under a name.
    pub fn register(&mut self, name: &str, entity: Entity) {
        if self.entity_registry.insert(name.to_string(), entity).is_none() {
            self.order.push(name.to_string());
        }
    }

    pub fn entity(&self, name: &str) -> Option<Entity> {
        self.entity_registry.get(name).copied()
    }

    /// Registered names in spawn order.
    pub fn names(&self) -> &[String] {
        &self.order
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Registered name of an entity or, failing that, of its nearest registered ancestor.
    pub fn object_name_of(&self, entity: Entity) -> Option<String> {
        let mut current = Some(entity);
        while let Some(e) = current {
            if let Ok(name) = self.world.get::<&Name>(e) {
                if self.entity_registry.get(&name.0) == Some(&e) {
                    return Some(name.0.clone());
                }
            }
            current = self.world.get::<&Transform>(e).ok().and_then(|t| t.parent);
        }
        None
    }

    pub fn world_matrix(&self, name: &str) -> Option<Mat4> {
        self.entity(name).map(|e| world_matrix_of(&self.world, e))
    }

    /// World-space position of a named object.
    pub fn position(&self, name: &str) -> Option<Vec3> {
        self.world_matrix(name).map(|m| m.w_axis.truncate())
    }

    pub fn set_position(&mut self, name: &str, position: Vec3) -> bool {
        self.update_transform(name, |t| t.position = position)
    }

    pub fn update_transform(&mut self, name: &str, f: impl FnOnce(&mut Transform)) -> bool {
        let Some(entity) = self.entity(name) else {
            return false;
        };
        match self.world.get::<&mut Transform>(entity) {
            Ok(mut transform) => {
                f(&mut transform);
                transform.dirty = true;
                true
            }
            Err(_) => false,
        }
    }

    pub fn transform(&self, name: &str) -> Option<Transform> {
        let entity = self.entity(name)?;
        self.world.get::<&Transform>(entity).ok().map(|t| (*t).clone())
    }

    pub fn children(&self, entity: Entity) -> Vec<Entity> {
        self.world
            .query::<&Transform>()
            .iter()
            .filter(|(_, t)| t.parent == Some(entity))
            .map(|(e, _)| e)
            .collect()
    }

    /// Every entity below `entity`, depth first.
    pub fn descendants(&self, entity: Entity) -> Vec<Entity> {
        let mut out = Vec::new();
        let mut stack = self.children(entity);
        while let Some(e) = stack.pop() {
            stack.extend(self.children(e));
            out.push(e);
        }
        out
    }

    /// Rename a registered object. Fails when `new_name` is taken.
    pub fn rename(&mut self, old_name: &str, new_name: &str) -> bool {
        if old_name == new_name {
            return self.entity_registry.contains_key(old_name);
        }
        if self.entity_registry.contains_key(new_name) {
            return false;
        }
        let Some(entity) = self.entity_registry.remove(old_name) else {
            return false;
        };
        self.entity_registry.insert(new_name.to_string(), entity);
        if let Some(slot) = self.order.iter_mut().find(|n| n.as_str() == old_name) {
            *slot = new_name.to_string();
        }
        if let Ok(mut name) = self.world.get::<&mut Name>(entity) {
            name.0 = new_name.to_string();
        }
        true
    }

    /// Despawn a named object with its whole subtree. Registered descendants
    /// are unregistered too. Returns every name removed.
    pub fn destroy(&mut self, name: &str) -> Vec<String> {
        let Some(root) = self.entity(name) else {
            return Vec::new();
        };

        let mut entities = self.descendants(root);
        entities.push(root);

        let mut removed = Vec::new();
        for entity in entities {
            if let Some(object) = self.registered_name(entity) {
                self.entity_registry.remove(&object);
                self.order.retain(|n| *n != object);
                removed.push(object);
            }
            let _ = self.world.despawn(entity);
        }
        removed
    }

    fn registered_name(&self, entity: Entity) -> Option<String> {
        let name = self.world.get::<&Name>(entity).ok()?;
        (self.entity_registry.get(&name.0) == Some(&entity)).then(|| name.0.clone())
    }

    pub fn clear(&mut self) {
        self.world.clear();
        self.entity_registry.clear();
        self.order.clear();
    }
}

/// Structural changes requested mid-frame, applied at the end of the frame.
#[derive(Debug, Default)]
pub struct CommandQueue {
    destroys: Vec<String>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn destroy(&mut self, name: &str) {
        if !self.destroys.iter().any(|n| n == name) {
            self.destroys.push(name.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.destroys.is_empty()
    }

    /// Apply queued destroys. Returns the names actually removed.
    pub fn apply(&mut self, scene: &mut SceneWorld) -> Vec<String> {
        let mut removed = Vec::new();
        for name in self.destroys.drain(..) {
            let names = scene.destroy(&name);
            if names.is_empty() {
                tracing::error!("DestroyObject: no object named '{}'", name);
            }
            removed.extend(names);
        }
        removed
    }
}

/// Outcome of [`create_level_scene`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct LevelScene {
    pub spawned: Vec<String>,
    pub skipped: Vec<String>,
    pub player: Option<String>,
}

/// Spawn a level for play. An invalid level is logged and spawns nothing.
/// Objects whose id is unknown or whose template failed are skipped.
pub fn create_level_scene(
    scene: &mut SceneWorld,
    level: &Level,
    registry: &Mod,
    objects: &ObjectsCollection,
    events: &mut EventBus,
) -> LevelScene {
    let mut result = LevelScene::default();

    if let Err(errors) = level.validate() {
        for error in &errors {
            tracing::error!("Level '{}': {}", level.id(), error);
        }
        return result;
    }

    for object in level.objects() {
        let id = object.object_id();
        let (Some(definition), Some(template)) = (registry.definition(id), objects.get(id)) else {
            tracing::error!("Object '{}' not found, skipping '{}'", id, object.display_name());
            result.skipped.push(object.display_name().to_string());
            continue;
        };

        let mut node = template.clone();
        node.set_transform(&object.transform());

        let mut mounted = Vec::new();
        if let ObjectDefinition::Vehicle(vehicle) = definition {
            if let Some(controller) = node.vehicle.as_mut() {
                controller.controlled_by_player = object.has_tag(PLAYER_TAG);
            }
            for (index, offset) in vehicle.weapon_slots().iter().enumerate() {
                let slot = format!("slot{}", index + 1);
                let Some(weapon_id) = object.tag_value(&slot) else {
                    continue;
                };
                match (registry.definition(weapon_id), objects.get(weapon_id)) {
                    (Some(ObjectDefinition::Weapon(_)), Some(weapon)) => {
                        let mut weapon = weapon.clone();
                        weapon.name = slot.clone();
                        weapon.position = Vec3::from(*offset);
                        if let Some(body) = weapon.body.as_mut() {
                            body.frozen = true;
                        }
                        mounted.push(slot);
                        node.add_child(weapon);
                    }
                    _ => tracing::error!(
                        "Weapon '{}' for {} of '{}' not found",
                        weapon_id,
                        slot,
                        object.display_name()
                    ),
                }
            }
        }

        let (name, entity) = scene.spawn_object(object.display_name(), &node);
        let _ = scene.world.insert(
            entity,
            (
                ObjectRef(id.to_string()),
                Tags(object.tags.clone().unwrap_or_default()),
            ),
        );

        // Mounted weapons become addressable objects of their own.
        for child in scene.children(entity) {
            let Ok(slot) = scene.world.get::<&Name>(child).map(|n| n.0.clone()) else {
                continue;
            };
            if !mounted.contains(&slot) {
                continue;
            }
            let qualified = format!("{}/{}", name, slot);
            if let Ok(mut child_name) = scene.world.get::<&mut Name>(child) {
                child_name.0 = qualified.clone();
            }
            scene.register(&qualified, child);
        }

        let possessed = scene
            .world
            .get::<&VehicleController>(entity)
            .map_or(false, |v| v.controlled_by_player);
        if possessed {
            if let Some(previous) = &result.player {
                tracing::warn!("'{}' replaces '{}' as the player vehicle", name, previous);
            }
            events.emit(Event::VehiclePossessed { name: name.clone() });
            result.player = Some(name.clone());
        }
        result.spawned.push(name);
    }

    tracing::info!(
        "Level '{}' created: {} spawned, {} skipped",
        level.id(),
        result.spawned.len(),
        result.skipped.len()
    );
    result
}
