//! A play session: a level spawned for gameplay with its scripts running.

use std::cell::{Ref, RefCell};
use std::rc::Rc;

use glam::Vec3;

use modforge_core::components::ScriptBehavior;
use modforge_core::events::{Event, EventBus};
use modforge_core::level::Level;

use crate::instantiate::ObjectsCollection;
use crate::mod_registry::Mod;
use crate::physics::PhysicsWorld;
use crate::scripting::{HostApi, ScriptError, ScriptRuntime};
use crate::services::{GameServices, StoredValue};
use crate::transform::update_transforms;
use crate::world::{create_level_scene, CommandQueue, LevelScene, SceneWorld};

/// Everything scripts can reach through the host API.
#[derive(Default)]
pub struct SessionState {
    pub scene: SceneWorld,
    pub commands: CommandQueue,
    pub services: GameServices,
    pub events: EventBus,
}

impl HostApi for SessionState {
    fn debug_print(&mut self, message: &str) {
        tracing::info!(target: "script", "{}", message);
    }

    fn destroy_object(&mut self, id: &str) {
        self.commands.destroy(id);
    }

    fn object_position(&self, id: &str) -> Option<Vec3> {
        self.scene.position(id)
    }

    fn show_message(&mut self, text: &str) {
        self.services.messages.show(text);
    }

    fn set_value(&mut self, key: &str, value: Option<StoredValue>) {
        match value {
            Some(value) => self.services.store.set(key, value),
            None => self.services.store.remove(key),
        }
    }

    fn get_value(&self, key: &str) -> Option<StoredValue> {
        self.services.store.get(key).cloned()
    }

    fn play_effect(&mut self, name: &str, position: Vec3) {
        self.services.effects.play(name, position);
    }
}

pub struct GameSession {
    state: Rc<RefCell<SessionState>>,
    scripts: ScriptRuntime,
    pub physics: PhysicsWorld,
    level: LevelScene,
}

impl GameSession {
    /// Spawn `level` and load the scripts of every spawned object.
    /// A script that fails to load is logged and its object runs without it.
    pub fn start(
        registry: &Mod,
        objects: &ObjectsCollection,
        level: &Level,
    ) -> Result<Self, ScriptError> {
        let mut state = SessionState::default();
        let created = create_level_scene(
            &mut state.scene,
            level,
            registry,
            objects,
            &mut state.events,
        );
        update_transforms(&mut state.scene.world);

        let mut physics = PhysicsWorld::new();
        physics.rebuild(&state.scene.world);

        let scripts = ScriptRuntime::new();
        let state = Rc::new(RefCell::new(state));
        scripts.register_api(state.clone())?;

        let mut session = Self {
            state,
            scripts,
            physics,
            level: created,
        };
        session.load_scripts();
        Ok(session)
    }

    fn load_scripts(&mut self) {
        let mut found: Vec<(usize, String, ScriptBehavior)> = {
            let state = self.state.borrow();
            let scene = &state.scene;
            let mut query = scene.world.query::<&ScriptBehavior>();
            let found = query
                .iter()
                .filter_map(|(entity, script)| {
                    let owner = scene.object_name_of(entity)?;
                    let order = scene.names().iter().position(|n| *n == owner)?;
                    Some((order, owner, script.clone()))
                })
                .collect();
            found
        };
        found.sort_by_key(|(order, _, _)| *order);

        for (_, owner, script) in found {
            if let Err(e) = self.scripts.load_script(&owner, &script.path, &script.source) {
                tracing::error!("{}", e);
            }
        }
    }

    pub fn state(&self) -> Ref<'_, SessionState> {
        self.state.borrow()
    }

    pub fn level_scene(&self) -> &LevelScene {
        &self.level
    }

    pub fn scripted_objects(&self) -> &[String] {
        self.scripts.owners()
    }

    /// Run every `Ready` hook, then apply what the scripts requested.
    pub fn ready(&mut self) -> Vec<Event> {
        for owner in self.scripts.owners().to_vec() {
            self.scripts.call_ready(&owner);
        }
        self.end_frame(0.0)
    }

    /// One frame: `Update(delta)` on every script, then deferred commands.
    pub fn update(&mut self, delta: f32) -> Vec<Event> {
        for owner in self.scripts.owners().to_vec() {
            self.scripts.call_update(&owner, delta);
        }
        self.end_frame(delta as f64)
    }

    /// Deliver damage to an object's `OnDamage` hook. Returns false when the
    /// object has no script.
    pub fn damage(&mut self, name: &str, amount: f32) -> bool {
        if !self.scripts.owners().iter().any(|o| o == name) {
            return false;
        }
        self.scripts.call_on_damage(name, amount);
        true
    }

    fn end_frame(&mut self, delta: f64) -> Vec<Event> {
        let mut guard = self.state.borrow_mut();
        let state = &mut *guard;

        let removed = state.commands.apply(&mut state.scene);
        for name in &removed {
            self.scripts.unload(name);
            state.events.emit(Event::ObjectDestroyed { name: name.clone() });
        }
        if !removed.is_empty() {
            update_transforms(&mut state.scene.world);
            self.physics.rebuild(&state.scene.world);
        }

        state.events.advance(delta);
        state.events.flush()
    }
}
