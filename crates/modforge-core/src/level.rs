use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::math::TransformDef;

pub const NEW_LEVEL_ID: &str = "new_level";
pub const NEW_LEVEL_NAME: &str = "New Level";

#[derive(Debug)]
pub enum LevelError {
    Io(std::io::Error),
    Parse(serde_json::Error),
    Invalid(Vec<ValidationError>),
}

impl std::fmt::Display for LevelError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(e) => write!(f, "IO error: {}", e),
            Self::Parse(e) => write!(f, "Level parse error: {}", e),
            Self::Invalid(errors) => {
                write!(f, "Level is invalid:")?;
                for e in errors {
                    write!(f, "\n  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for LevelError {}

impl From<std::io::Error> for LevelError {
    fn from(e: std::io::Error) -> Self {
        Self::Io(e)
    }
}

impl From<serde_json::Error> for LevelError {
    fn from(e: serde_json::Error) -> Self {
        Self::Parse(e)
    }
}

/// A missing required field in a level.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingId,
    MissingName,
    NoObjects,
    /// Carries the object's display name.
    MissingObjectId(String),
    /// Carries the object's `objectId`.
    MissingTransform(String),
    MissingPosition(String),
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingId => write!(f, "Level ID is required"),
            Self::MissingName => write!(f, "Level name is required"),
            Self::NoObjects => write!(f, "Level must contain at least one object"),
            Self::MissingObjectId(name) => {
                write!(f, "ObjectId is required for level object '{}'", name)
            }
            Self::MissingTransform(id) => write!(f, "Transform is required for object '{}'", id),
            Self::MissingPosition(id) => {
                write!(f, "Position is required in transform for object '{}'", id)
            }
        }
    }
}

/// A placed instance of an object definition.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct LevelObject {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(rename = "objectId", default, skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<BTreeMap<String, String>>,
}

impl LevelObject {
    pub fn new(object_id: &str, transform: TransformDef) -> Self {
        Self {
            object_id: Some(object_id.to_string()),
            transform: Some(transform),
            ..Default::default()
        }
    }

    pub fn object_id(&self) -> &str {
        self.object_id.as_deref().unwrap_or("")
    }

    /// Name shown in the editor: the explicit name, else the object id.
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.object_id())
    }

    pub fn has_tag(&self, key: &str) -> bool {
        self.tags.as_ref().is_some_and(|t| t.contains_key(key))
    }

    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags.as_ref()?.get(key).map(String::as_str)
    }

    pub fn transform(&self) -> TransformDef {
        self.transform.unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Level {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub objects: Option<Vec<LevelObject>>,
}

impl Level {
    /// The blank level an editor session starts with.
    pub fn new_blank() -> Self {
        Self {
            id: Some(NEW_LEVEL_ID.to_string()),
            name: Some(NEW_LEVEL_NAME.to_string()),
            objects: Some(Vec::new()),
        }
    }

    pub fn objects(&self) -> &[LevelObject] {
        self.objects.as_deref().unwrap_or(&[])
    }

    pub fn objects_mut(&mut self) -> &mut Vec<LevelObject> {
        self.objects.get_or_insert_with(Vec::new)
    }

    pub fn id(&self) -> &str {
        self.id.as_deref().unwrap_or("")
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or("")
    }

    pub fn from_json(text: &str) -> Result<Self, LevelError> {
        Ok(serde_json::from_str(text)?)
    }

    pub fn to_json(&self) -> Result<String, LevelError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Check every required field, returning all violations found.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if is_blank(&self.id) {
            errors.push(ValidationError::MissingId);
        }
        if is_blank(&self.name) {
            errors.push(ValidationError::MissingName);
        }
        if self.objects().is_empty() {
            errors.push(ValidationError::NoObjects);
            return Err(errors);
        }

        for (index, object) in self.objects().iter().enumerate() {
            if is_blank(&object.object_id) {
                let name = match object.name.as_deref() {
                    Some(name) if !name.is_empty() => name.to_string(),
                    _ => format!("#{}", index),
                };
                errors.push(ValidationError::MissingObjectId(name));
            }

            let id = object.object_id().to_string();
            match &object.transform {
                None => errors.push(ValidationError::MissingTransform(id)),
                Some(t) if t.position.is_none() => errors.push(ValidationError::MissingPosition(id)),
                Some(_) => {}
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn is_blank(value: &Option<String>) -> bool {
    value.as_deref().map_or(true, |s| s.trim().is_empty())
}

/// Read and parse a level file. No validation is applied.
pub fn load_level(path: &Path) -> Result<Level, LevelError> {
    let contents = std::fs::read_to_string(path)?;
    let level = Level::from_json(&contents)?;
    tracing::info!(
        "Loaded level '{}' from {:?}: {} objects",
        level.id(),
        path,
        level.objects().len()
    );
    Ok(level)
}

/// Validate, then write a level file.
pub fn save_level(path: &Path, level: &Level) -> Result<(), LevelError> {
    level.validate().map_err(LevelError::Invalid)?;
    let json = level.to_json()?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, json)?;
    tracing::info!("Saved level '{}' to {:?}", level.id(), path);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::Vector3;
    use serde_json::json;

    fn sample() -> Level {
        Level {
            id: Some("arena".to_string()),
            name: Some("Arena".to_string()),
            objects: Some(vec![LevelObject::new("crate", TransformDef::at(glam::Vec3::ZERO))]),
        }
    }

    #[test]
    fn test_round_trip_keeps_omissions() {
        let original = json!({
            "id": "arena",
            "name": "Arena",
            "objects": [
                {
                    "objectId": "buggy",
                    "transform": { "position": { "x": 1.0, "y": 0.0, "z": -2.5 } },
                    "tags": { "player": "", "slot1": "blaster" }
                },
                {
                    "name": "Crate A",
                    "objectId": "crate",
                    "transform": {
                        "position": { "x": 0.0, "y": 0.0, "z": 0.0 },
                        "rotation": { "x": 0.0, "y": 90.0, "z": 0.0 }
                    }
                }
            ]
        });
        let level: Level = serde_json::from_value(original.clone()).unwrap();
        assert_eq!(serde_json::to_value(&level).unwrap(), original);
    }

    #[test]
    fn test_tags() {
        let level: Level = serde_json::from_value(json!({
            "id": "l", "name": "L",
            "objects": [{ "objectId": "buggy", "tags": { "slot1": "blaster" } }]
        }))
        .unwrap();
        let obj = &level.objects()[0];
        assert!(obj.has_tag("slot1"));
        assert!(!obj.has_tag("player"));
        assert_eq!(obj.tag_value("slot1"), Some("blaster"));
        assert_eq!(obj.display_name(), "buggy");
    }

    #[test]
    fn test_valid_level() {
        assert!(sample().validate().is_ok());
    }

    #[test]
    fn test_zero_objects_fails() {
        let mut level = sample();
        level.objects_mut().clear();
        let errors = level.validate().unwrap_err();
        assert_eq!(errors, vec![ValidationError::NoObjects]);
        assert_eq!(errors[0].to_string(), "Level must contain at least one object");
        assert!(Level::new_blank().validate().is_err());
    }

    #[test]
    fn test_missing_position_names_object() {
        let mut level = sample();
        level.objects_mut().push(LevelObject {
            object_id: Some("barrel".to_string()),
            transform: Some(TransformDef {
                scale: Some(Vector3::new(1.0, 1.0, 1.0)),
                ..Default::default()
            }),
            ..Default::default()
        });
        let errors = level.validate().unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "Position is required in transform for object 'barrel'"
        );
    }

    #[test]
    fn test_collects_every_violation() {
        let level = Level {
            id: None,
            name: Some("  ".to_string()),
            objects: Some(vec![
                LevelObject {
                    name: Some("Mystery".to_string()),
                    ..Default::default()
                },
                LevelObject {
                    object_id: Some("tree".to_string()),
                    ..Default::default()
                },
                LevelObject {
                    name: Some("Ghost".to_string()),
                    transform: Some(TransformDef::default()),
                    ..Default::default()
                },
            ]),
        };
        let messages: Vec<String> = level
            .validate()
            .unwrap_err()
            .iter()
            .map(|e| e.to_string())
            .collect();
        assert_eq!(
            messages,
            vec![
                "Level ID is required",
                "Level name is required",
                "ObjectId is required for level object 'Mystery'",
                "Transform is required for object ''",
                "Transform is required for object 'tree'",
                "ObjectId is required for level object 'Ghost'",
                "Position is required in transform for object ''",
            ]
        );
    }

    #[test]
    fn test_absent_objects_stay_absent() {
        let original = json!({ "id": "draft", "name": "Draft" });
        let level: Level = serde_json::from_value(original.clone()).unwrap();
        assert!(level.objects.is_none());
        assert!(level.objects().is_empty());
        assert_eq!(serde_json::to_value(&level).unwrap(), original);

        let empty = json!({ "id": "draft", "name": "Draft", "objects": [] });
        let level: Level = serde_json::from_value(empty.clone()).unwrap();
        assert_eq!(serde_json::to_value(&level).unwrap(), empty);
        assert_eq!(level.validate().unwrap_err(), vec![ValidationError::NoObjects]);
    }

    #[test]
    fn test_save_refuses_invalid_level() {
        let path = std::env::temp_dir().join("modforge_test_invalid_level.json");
        let err = save_level(&path, &Level::new_blank()).unwrap_err();
        assert!(matches!(err, LevelError::Invalid(_)));
        assert!(!path.exists());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join("modforge_test_levels");
        let path = dir.join("arena.json");
        let level = sample();
        save_level(&path, &level).unwrap();
        let loaded = load_level(&path).unwrap();
        assert_eq!(loaded, level);
        let _ = std::fs::remove_dir_all(&dir);
    }
}
