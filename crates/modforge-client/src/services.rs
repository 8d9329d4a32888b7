//! Game services handed to scripts: UI messages, a key/value store and
//! visual effects. They are owned by the session, never global.

use std::collections::HashMap;

use glam::Vec3;

/// A value scripts may store with `SetValue`.
#[derive(Debug, Clone, PartialEq)]
pub enum StoredValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

/// Messages shown to the player, newest last.
#[derive(Debug, Default)]
pub struct MessageLog {
    messages: Vec<String>,
}

impl MessageLog {
    pub fn show(&mut self, text: &str) {
        tracing::info!("Message: {}", text);
        self.messages.push(text.to_string());
    }

    pub fn latest(&self) -> Option<&str> {
        self.messages.last().map(String::as_str)
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }
}

#[derive(Debug, Default)]
pub struct KeyValueStore {
    values: HashMap<String, StoredValue>,
}

impl KeyValueStore {
    pub fn set(&mut self, key: &str, value: StoredValue) {
        self.values.insert(key.to_string(), value);
    }

    pub fn remove(&mut self, key: &str) {
        self.values.remove(key);
    }

    pub fn get(&self, key: &str) -> Option<&StoredValue> {
        self.values.get(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    Explosion,
    MushroomExplosion,
}

impl EffectKind {
    /// Effect for a script-facing name. `BulletHit` reuses the explosion.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "Explosion" | "BulletHit" => Some(EffectKind::Explosion),
            "MushroomExplosion" => Some(EffectKind::MushroomExplosion),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EffectRequest {
    pub kind: EffectKind,
    pub position: Vec3,
}

/// Effects requested this frame, drained by whoever renders them.
#[derive(Debug, Default)]
pub struct EffectQueue {
    pending: Vec<EffectRequest>,
}

impl EffectQueue {
    /// Queue an effect by name. Unknown names are logged and dropped.
    pub fn play(&mut self, name: &str, position: Vec3) -> bool {
        match EffectKind::from_name(name) {
            Some(kind) => {
                self.pending.push(EffectRequest { kind, position });
                true
            }
            None => {
                tracing::error!("Unknown effect '{}'", name);
                false
            }
        }
    }

    pub fn drain(&mut self) -> Vec<EffectRequest> {
        std::mem::take(&mut self.pending)
    }

    pub fn pending(&self) -> &[EffectRequest] {
        &self.pending
    }
}

#[derive(Debug, Default)]
pub struct GameServices {
    pub messages: MessageLog,
    pub store: KeyValueStore,
    pub effects: EffectQueue,
}
