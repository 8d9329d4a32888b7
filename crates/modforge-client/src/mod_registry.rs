//! A mod on disk: `objects.json`, the `objects/` resource tree and `levels/`.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use modforge_core::level::{self, Level, LevelError, LevelObject};
use modforge_core::objects::{ObjectDefinition, ObjectsFile};
use modforge_core::schema::SchemaError;

use crate::resources::FsResources;

pub const OBJECTS_FILE: &str = "objects.json";
pub const OBJECTS_DIR: &str = "objects";
pub const LEVELS_DIR: &str = "levels";

#[derive(Debug)]
pub enum ModError {
    Io { path: PathBuf, source: std::io::Error },
    Schema(SchemaError),
    DuplicateObject(String),
    Level(LevelError),
    LevelNotFound(String),
}

impl std::fmt::Display for ModError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io { path, source } => write!(f, "IO error at {:?}: {}", path, source),
            Self::Schema(e) => write!(f, "objects file error: {}", e),
            Self::DuplicateObject(id) => write!(f, "object id '{}' is defined twice", id),
            Self::Level(e) => write!(f, "{}", e),
            Self::LevelNotFound(name) => write!(f, "level '{}' not found", name),
        }
    }
}

impl std::error::Error for ModError {}

impl From<SchemaError> for ModError {
    fn from(e: SchemaError) -> Self {
        Self::Schema(e)
    }
}

impl From<LevelError> for ModError {
    fn from(e: LevelError) -> Self {
        Self::Level(e)
    }
}

/// Owns the parsed definition table of one mod. Definitions keep file order.
#[derive(Debug)]
pub struct Mod {
    root: PathBuf,
    definitions: Vec<ObjectDefinition>,
    index: HashMap<String, usize>,
}

impl Mod {
    /// Read `<root>/objects.json`.
    pub fn open(root: &Path) -> Result<Self, ModError> {
        let path = root.join(OBJECTS_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|source| ModError::Io {
            path: path.clone(),
            source,
        })?;
        let file = ObjectsFile::from_json(&contents)?;
        let registry = Self::from_definitions(root, file.objects)?;
        tracing::info!(
            "Opened mod at {:?}: {} object definitions",
            root,
            registry.definitions.len()
        );
        Ok(registry)
    }

    pub fn from_definitions(
        root: &Path,
        definitions: Vec<ObjectDefinition>,
    ) -> Result<Self, ModError> {
        let mut index = HashMap::new();
        for (i, definition) in definitions.iter().enumerate() {
            if index.insert(definition.id().to_string(), i).is_some() {
                return Err(ModError::DuplicateObject(definition.id().to_string()));
            }
        }
        Ok(Self {
            root: root.to_path_buf(),
            definitions,
            index,
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn objects_dir(&self) -> PathBuf {
        self.root.join(OBJECTS_DIR)
    }

    pub fn levels_dir(&self) -> PathBuf {
        self.root.join(LEVELS_DIR)
    }

    /// A loader over this mod's `objects/` directory.
    pub fn resources(&self) -> FsResources {
        FsResources::new(self.objects_dir())
    }

    pub fn definition(&self, id: &str) -> Option<&ObjectDefinition> {
        self.index.get(id).map(|&i| &self.definitions[i])
    }

    pub fn definitions(&self) -> &[ObjectDefinition] {
        &self.definitions
    }

    /// Level names (file stems) under `levels/`, sorted.
    pub fn level_names(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(self.levels_dir())
            .into_iter()
            .flatten()
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.extension().map_or(false, |ext| ext == "json"))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(str::to_string))
            .collect();
        names.sort();
        names
    }

    pub fn level_path(&self, name: &str) -> PathBuf {
        self.levels_dir().join(format!("{}.json", name))
    }

    pub fn load_level(&self, name: &str) -> Result<Level, ModError> {
        let path = self.level_path(name);
        if !path.is_file() {
            return Err(ModError::LevelNotFound(name.to_string()));
        }
        Ok(level::load_level(&path)?)
    }

    /// Validate and write `levels/<name>.json`.
    pub fn save_level(&self, name: &str, level: &Level) -> Result<PathBuf, ModError> {
        let path = self.level_path(name);
        level::save_level(&path, level)?;
        Ok(path)
    }

    /// Pair each level object with its definition. Unknown or missing ids are
    /// logged and skipped; the rest keep their order.
    pub fn resolve_objects<'l>(
        &self,
        level: &'l Level,
    ) -> Vec<(&'l LevelObject, &ObjectDefinition)> {
        let mut resolved = Vec::with_capacity(level.objects().len());
        for object in level.objects() {
            match self.definition(object.object_id()) {
                Some(definition) => resolved.push((object, definition)),
                None => tracing::error!(
                    "Level '{}': object '{}' references unknown id '{}', skipping",
                    level.id(),
                    object.display_name(),
                    object.object_id()
                ),
            }
        }
        resolved
    }
}
