//! Lua behavior scripts.
//!
//! Every script runs in its own environment table that falls back to the
//! shared globals. Scripts reach the game only through the closed set of
//! host functions registered by [`ScriptRuntime::register_api`].

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use glam::Vec3;
use mlua::prelude::*;
use mlua::IntoLuaMulti;

use crate::services::StoredValue;

/// What scripts may ask of the game.
pub trait HostApi {
    fn debug_print(&mut self, message: &str);
    /// Queue an object for removal at the end of the frame.
    fn destroy_object(&mut self, id: &str);
    fn object_position(&self, id: &str) -> Option<Vec3>;
    fn show_message(&mut self, text: &str);
    /// `None` clears the key.
    fn set_value(&mut self, key: &str, value: Option<StoredValue>);
    fn get_value(&self, key: &str) -> Option<StoredValue>;
    fn play_effect(&mut self, name: &str, position: Vec3);
}

#[derive(Debug)]
pub enum ScriptError {
    Lua(LuaError),
    Load { path: String, source: LuaError },
}

impl std::fmt::Display for ScriptError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lua(e) => write!(f, "Lua error: {}", e),
            Self::Load { path, source } => write!(f, "Script error in '{}': {}", path, source),
        }
    }
}

impl std::error::Error for ScriptError {}

impl From<LuaError> for ScriptError {
    fn from(e: LuaError) -> Self {
        Self::Lua(e)
    }
}

/// Central scripting runtime. Environments are keyed by the owning object's name.
pub struct ScriptRuntime {
    pub lua: Lua,
    envs: HashMap<String, LuaRegistryKey>,
    order: Vec<String>,
}

impl Default for ScriptRuntime {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptRuntime {
    pub fn new() -> Self {
        let lua = Lua::new();

        // Disable dangerous standard library functions
        lua.globals().set("os", LuaNil).unwrap_or(());
        lua.globals().set("io", LuaNil).unwrap_or(());
        lua.globals().set("loadfile", LuaNil).unwrap_or(());
        lua.globals().set("dofile", LuaNil).unwrap_or(());

        Self {
            lua,
            envs: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Run a script's top level in a fresh environment owned by `owner`.
    /// A previous script of the same owner is replaced.
    pub fn load_script(&mut self, owner: &str, path: &str, code: &str) -> Result<(), ScriptError> {
        let env = self.lua.create_table()?;

        let meta = self.lua.create_table()?;
        meta.set("__index", self.lua.globals())?;
        env.set_metatable(Some(meta));

        let parent = owner.to_string();
        let get_parent = self
            .lua
            .create_function(move |_, ()| Ok(parent.clone()))?;
        env.set("GetScriptParent", get_parent)?;
        env.set("self", self.lua.create_table()?)?;

        self.lua
            .load(code)
            .set_name(path)
            .set_environment(env.clone())
            .exec()
            .map_err(|source| ScriptError::Load {
                path: path.to_string(),
                source,
            })?;

        let key = self.lua.create_registry_value(env)?;
        if let Some(old) = self.envs.insert(owner.to_string(), key) {
            let _ = self.lua.remove_registry_value(old);
        } else {
            self.order.push(owner.to_string());
        }

        tracing::info!("Loaded script '{}' for '{}'", path, owner);
        Ok(())
    }

    pub fn unload(&mut self, owner: &str) {
        if let Some(key) = self.envs.remove(owner) {
            let _ = self.lua.remove_registry_value(key);
            self.order.retain(|o| o != owner);
        }
    }

    /// Owners with a loaded script, in load order.
    pub fn owners(&self) -> &[String] {
        &self.order
    }

    pub fn has_hook(&self, owner: &str, name: &str) -> bool {
        self.env(owner)
            .and_then(|env| env.get::<LuaFunction>(name).ok())
            .is_some()
    }

    pub fn call_ready(&self, owner: &str) {
        self.call_hook(owner, "Ready", ());
    }

    pub fn call_update(&self, owner: &str, delta: f32) {
        self.call_hook(owner, "Update", delta);
    }

    pub fn call_on_damage(&self, owner: &str, damage: f32) {
        self.call_hook(owner, "OnDamage", damage);
    }

    fn env(&self, owner: &str) -> Option<LuaTable> {
        let key = self.envs.get(owner)?;
        self.lua.registry_value(key).ok()
    }

    /// Internal: call a named function in an owner's environment.
    fn call_hook<A: IntoLuaMulti>(&self, owner: &str, name: &str, args: A) {
        let Some(env) = self.env(owner) else {
            return;
        };
        let func: LuaFunction = match env.get(name) {
            Ok(f) => f,
            Err(_) => return, // Hook not defined
        };
        if let Err(e) = func.call::<()>(args) {
            tracing::error!("Script error in '{}'.{}: {}", owner, name, e);
        }
    }

    /// Register the host functions as globals.
    pub fn register_api<H: HostApi + 'static>(&self, host: Rc<RefCell<H>>) -> Result<(), ScriptError> {
        let globals = self.lua.globals();

        let h = host.clone();
        let debug_print = self.lua.create_function(move |_, message: LuaValue| {
            let text = describe(&message);
            with_host(&h, |host| host.debug_print(&text))
        })?;
        globals.set("DebugPrint", debug_print)?;

        let h = host.clone();
        let destroy = self.lua.create_function(move |_, id: String| {
            with_host(&h, |host| host.destroy_object(&id))
        })?;
        globals.set("DestroyObject", destroy)?;

        let h = host.clone();
        let position = self.lua.create_function(move |lua, id: String| {
            let p = h
                .try_borrow()
                .map_err(|_| busy())?
                .object_position(&id)
                .unwrap_or_else(|| {
                    tracing::error!("GetObjectPosition: no object named '{}'", id);
                    Vec3::ZERO
                });
            lua.create_sequence_from([p.x, p.y, p.z])
        })?;
        globals.set("GetObjectPosition", position)?;

        let h = host.clone();
        let show = self.lua.create_function(move |_, text: String| {
            with_host(&h, |host| host.show_message(&text))
        })?;
        globals.set("ShowMessage", show)?;

        let h = host.clone();
        let set_value = self.lua.create_function(move |_, (key, value): (String, LuaValue)| {
            let value = to_stored(&value)?;
            with_host(&h, |host| host.set_value(&key, value))
        })?;
        globals.set("SetValue", set_value)?;

        let h = host.clone();
        let get_value =
            self.lua
                .create_function(move |lua, (key, default): (String, LuaValue)| {
                    let stored = h.try_borrow().map_err(|_| busy())?.get_value(&key);
                    match stored {
                        Some(value) => from_stored(lua, &value),
                        None => Ok(default),
                    }
                })?;
        globals.set("GetValue", get_value)?;

        let h = host;
        let play_effect =
            self.lua
                .create_function(move |_, (name, position): (String, LuaTable)| {
                    if position.raw_len() != 3 {
                        tracing::error!(
                            "PlayEffect('{}'): position needs 3 components, got {}",
                            name,
                            position.raw_len()
                        );
                        return Ok(());
                    }
                    let p = Vec3::new(position.get(1)?, position.get(2)?, position.get(3)?);
                    with_host(&h, |host| host.play_effect(&name, p))
                })?;
        globals.set("PlayEffect", play_effect)?;

        Ok(())
    }
}

fn busy() -> LuaError {
    LuaError::RuntimeError("host state is already borrowed".to_string())
}

fn with_host<H, R>(host: &RefCell<H>, f: impl FnOnce(&mut H) -> R) -> LuaResult<R> {
    let mut host = host.try_borrow_mut().map_err(|_| busy())?;
    Ok(f(&mut host))
}

fn describe(value: &LuaValue) -> String {
    match value {
        LuaValue::Nil => "nil".to_string(),
        LuaValue::Boolean(b) => b.to_string(),
        LuaValue::Integer(i) => i.to_string(),
        LuaValue::Number(n) => n.to_string(),
        LuaValue::String(s) => s.to_string_lossy().to_string(),
        other => format!("<{}>", other.type_name()),
    }
}

fn to_stored(value: &LuaValue) -> LuaResult<Option<StoredValue>> {
    match value {
        LuaValue::Nil => Ok(None),
        LuaValue::Boolean(b) => Ok(Some(StoredValue::Bool(*b))),
        LuaValue::Integer(i) => Ok(Some(StoredValue::Number(*i as f64))),
        LuaValue::Number(n) => Ok(Some(StoredValue::Number(*n))),
        LuaValue::String(s) => Ok(Some(StoredValue::Text(s.to_string_lossy().to_string()))),
        other => Err(LuaError::RuntimeError(format!(
            "SetValue cannot store a {}",
            other.type_name()
        ))),
    }
}

fn from_stored(lua: &Lua, value: &StoredValue) -> LuaResult<LuaValue> {
    Ok(match value {
        StoredValue::Bool(b) => LuaValue::Boolean(*b),
        StoredValue::Number(n) => LuaValue::Number(*n),
        StoredValue::Text(t) => LuaValue::String(lua.create_string(t)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingHost {
        printed: Vec<String>,
        destroyed: Vec<String>,
        messages: Vec<String>,
        values: HashMap<String, StoredValue>,
        effects: Vec<(String, Vec3)>,
    }

    impl HostApi for RecordingHost {
        fn debug_print(&mut self, message: &str) {
            self.printed.push(message.to_string());
        }
        fn destroy_object(&mut self, id: &str) {
            self.destroyed.push(id.to_string());
        }
        fn object_position(&self, id: &str) -> Option<Vec3> {
            (id == "buggy").then_some(Vec3::new(1.0, 2.0, 3.0))
        }
        fn show_message(&mut self, text: &str) {
            self.messages.push(text.to_string());
        }
        fn set_value(&mut self, key: &str, value: Option<StoredValue>) {
            match value {
                Some(v) => {
                    self.values.insert(key.to_string(), v);
                }
                None => {
                    self.values.remove(key);
                }
            }
        }
        fn get_value(&self, key: &str) -> Option<StoredValue> {
            self.values.get(key).cloned()
        }
        fn play_effect(&mut self, name: &str, position: Vec3) {
            self.effects.push((name.to_string(), position));
        }
    }

    fn runtime() -> (ScriptRuntime, Rc<RefCell<RecordingHost>>) {
        let runtime = ScriptRuntime::new();
        let host = Rc::new(RefCell::new(RecordingHost::default()));
        runtime.register_api(host.clone()).unwrap();
        (runtime, host)
    }

    #[test]
    fn test_dangerous_globals_removed() {
        let runtime = ScriptRuntime::new();
        let globals = runtime.lua.globals();
        assert!(globals.get::<LuaValue>("os").unwrap().is_nil());
        assert!(globals.get::<LuaValue>("io").unwrap().is_nil());
        assert!(globals.get::<LuaValue>("dofile").unwrap().is_nil());
    }

    #[test]
    fn test_hooks_and_parent() {
        let (mut runtime, host) = runtime();
        runtime
            .load_script(
                "crate_2",
                "crate.lua",
                r#"
                self.ticks = 0
                function Ready()
                    DebugPrint("ready " .. GetScriptParent())
                end
                function Update(delta)
                    self.ticks = self.ticks + 1
                    SetValue("ticks", self.ticks)
                end
                function OnDamage(damage)
                    if damage > 10 then DestroyObject(GetScriptParent()) end
                end
                "#,
            )
            .unwrap();

        runtime.call_ready("crate_2");
        runtime.call_update("crate_2", 0.5);
        runtime.call_update("crate_2", 0.5);
        runtime.call_on_damage("crate_2", 5.0);
        runtime.call_on_damage("crate_2", 50.0);

        let host = host.borrow();
        assert_eq!(host.printed, vec!["ready crate_2".to_string()]);
        assert_eq!(host.values.get("ticks"), Some(&StoredValue::Number(2.0)));
        assert_eq!(host.destroyed, vec!["crate_2".to_string()]);
    }

    #[test]
    fn test_missing_hooks_are_ignored() {
        let (mut runtime, _host) = runtime();
        runtime.load_script("rock", "rock.lua", "x = 1").unwrap();
        assert!(!runtime.has_hook("rock", "Ready"));
        runtime.call_ready("rock");
        runtime.call_update("nobody", 0.1);
        assert_eq!(runtime.owners(), &["rock".to_string()]);
    }

    #[test]
    fn test_environments_are_isolated() {
        let (mut runtime, host) = runtime();
        runtime
            .load_script("a", "a.lua", "name = 'a' function Ready() DebugPrint(name) end")
            .unwrap();
        runtime
            .load_script("b", "b.lua", "name = 'b' function Ready() DebugPrint(name) end")
            .unwrap();
        runtime.call_ready("a");
        runtime.call_ready("b");
        assert_eq!(host.borrow().printed, vec!["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn test_host_functions() {
        let (mut runtime, host) = runtime();
        runtime
            .load_script(
                "buggy",
                "buggy.lua",
                r#"
                function Ready()
                    local p = GetObjectPosition("buggy")
                    PlayEffect("Explosion", p)
                    PlayEffect("Explosion", { 1, 2 })
                    local q = GetObjectPosition("ghost")
                    DebugPrint(q[1] + q[2] + q[3])
                    ShowMessage("Go!")
                    SetValue("name", "buggy")
                    DebugPrint(GetValue("name"))
                    DebugPrint(GetValue("missing", "fallback"))
                    DebugPrint(GetValue("missing"))
                end
                "#,
            )
            .unwrap();
        runtime.call_ready("buggy");

        let host = host.borrow();
        assert_eq!(
            host.effects,
            vec![("Explosion".to_string(), Vec3::new(1.0, 2.0, 3.0))]
        );
        assert_eq!(host.messages, vec!["Go!".to_string()]);
        assert_eq!(
            host.printed,
            vec![
                "0".to_string(),
                "buggy".to_string(),
                "fallback".to_string(),
                "nil".to_string()
            ]
        );
    }

    #[test]
    fn test_load_error_reports_path() {
        let (mut runtime, _host) = runtime();
        let err = runtime
            .load_script("bad", "bad.lua", "function (")
            .unwrap_err();
        assert!(matches!(err, ScriptError::Load { ref path, .. } if path == "bad.lua"));
        assert!(runtime.owners().is_empty());
    }

    #[test]
    fn test_unload() {
        let (mut runtime, host) = runtime();
        runtime
            .load_script("a", "a.lua", "function Ready() DebugPrint('hi') end")
            .unwrap();
        runtime.unload("a");
        runtime.call_ready("a");
        assert!(host.borrow().printed.is_empty());
        assert!(runtime.owners().is_empty());
    }
}
