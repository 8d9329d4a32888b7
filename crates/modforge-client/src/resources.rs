//! Resource loading for a mod's `objects/` directory.
//!
//! Paths in definitions are relative to that directory. The extension picks
//! the loader: glTF for meshes, common image formats for textures, YAML for
//! pre-built sub-scenes. Loaded resources are cached by path and shared.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;

use modforge_core::math::TransformDef;
use modforge_core::mesh::{MeshData, TextureData};

#[derive(Debug)]
pub enum ResourceError {
    NotFound(String),
    Io { path: String, source: std::io::Error },
    Gltf { path: String, source: gltf::Error },
    Image { path: String, source: image::ImageError },
    Yaml { path: String, source: serde_yaml::Error },
    UnsupportedExtension(String),
    /// The file loaded but produced no usable geometry.
    EmptyMesh(String),
    WrongKind {
        path: String,
        expected: &'static str,
        found: &'static str,
    },
    NestingTooDeep(String),
}

impl std::fmt::Display for ResourceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NotFound(path) => write!(f, "resource not found: {}", path),
            Self::Io { path, source } => write!(f, "IO error reading '{}': {}", path, source),
            Self::Gltf { path, source } => write!(f, "glTF error in '{}': {}", path, source),
            Self::Image { path, source } => write!(f, "image error in '{}': {}", path, source),
            Self::Yaml { path, source } => write!(f, "sub-scene parse error in '{}': {}", path, source),
            Self::UnsupportedExtension(path) => {
                write!(f, "no loader for resource '{}'", path)
            }
            Self::EmptyMesh(path) => write!(f, "mesh '{}' contains no triangles", path),
            Self::WrongKind {
                path,
                expected,
                found,
            } => write!(f, "resource '{}' is a {}, expected a {}", path, found, expected),
            Self::NestingTooDeep(path) => {
                write!(f, "sub-scene '{}' nests too deeply", path)
            }
        }
    }
}

impl std::error::Error for ResourceError {}

/// A pre-built sub-scene: a named tree of mesh nodes.
///
/// ```yaml
/// name: Tower
/// nodes:
///   - name: Base
///     mesh: tower_base.gltf
///     texture: stone.png
///     children:
///       - name: Top
///         mesh: tower_top.gltf
///         transform:
///           position: { x: 0, y: 4, z: 0 }
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubScene {
    pub name: String,
    #[serde(default)]
    pub nodes: Vec<SubSceneNode>,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SubSceneNode {
    pub name: String,
    /// Mesh file, or another sub-scene.
    #[serde(default)]
    pub mesh: Option<String>,
    #[serde(default)]
    pub texture: Option<String>,
    #[serde(default)]
    pub transform: Option<TransformDef>,
    #[serde(default)]
    pub children: Vec<SubSceneNode>,
}

#[derive(Debug, Clone)]
pub enum Resource {
    Mesh(Arc<MeshData>),
    Texture(Arc<TextureData>),
    Scene(Arc<SubScene>),
}

impl Resource {
    pub fn kind(&self) -> &'static str {
        match self {
            Resource::Mesh(_) => "mesh",
            Resource::Texture(_) => "texture",
            Resource::Scene(_) => "sub-scene",
        }
    }
}

/// Source of mod resources.
pub trait ResourceLoader {
    fn load(&mut self, path: &str) -> Result<Resource, ResourceError>;

    /// Raw text of a file such as a behavior script.
    fn read_text(&mut self, path: &str) -> Result<String, ResourceError>;

    fn load_mesh(&mut self, path: &str) -> Result<Arc<MeshData>, ResourceError> {
        match self.load(path)? {
            Resource::Mesh(mesh) => Ok(mesh),
            other => Err(wrong_kind(path, "mesh", &other)),
        }
    }

    fn load_texture(&mut self, path: &str) -> Result<Arc<TextureData>, ResourceError> {
        match self.load(path)? {
            Resource::Texture(texture) => Ok(texture),
            other => Err(wrong_kind(path, "texture", &other)),
        }
    }
}

pub(crate) fn wrong_kind(path: &str, expected: &'static str, found: &Resource) -> ResourceError {
    ResourceError::WrongKind {
        path: path.to_string(),
        expected,
        found: found.kind(),
    }
}

/// Loads resources from disk, caching by relative path.
pub struct FsResources {
    root: PathBuf,
    cache: HashMap<String, Resource>,
}

impl FsResources {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            cache: HashMap::new(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn cached_count(&self) -> usize {
        self.cache.len()
    }

    fn load_uncached(&self, path: &str) -> Result<Resource, ResourceError> {
        let full_path = self.root.join(path);
        if !full_path.is_file() {
            return Err(ResourceError::NotFound(path.to_string()));
        }

        let extension = full_path
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match extension.as_str() {
            "gltf" | "glb" => Ok(Resource::Mesh(Arc::new(load_gltf(&full_path, path)?))),
            "png" | "jpg" | "jpeg" | "bmp" => {
                let (width, height) =
                    image::image_dimensions(&full_path).map_err(|source| ResourceError::Image {
                        path: path.to_string(),
                        source,
                    })?;
                Ok(Resource::Texture(Arc::new(TextureData {
                    path: path.to_string(),
                    width,
                    height,
                })))
            }
            "yaml" | "yml" => {
                let contents = read_file(&full_path, path)?;
                let scene: SubScene =
                    serde_yaml::from_str(&contents).map_err(|source| ResourceError::Yaml {
                        path: path.to_string(),
                        source,
                    })?;
                Ok(Resource::Scene(Arc::new(scene)))
            }
            _ => Err(ResourceError::UnsupportedExtension(path.to_string())),
        }
    }
}

impl ResourceLoader for FsResources {
    fn load(&mut self, path: &str) -> Result<Resource, ResourceError> {
        if let Some(cached) = self.cache.get(path) {
            return Ok(cached.clone());
        }

        let resource = self.load_uncached(path)?;
        tracing::info!("Loaded {} '{}'", resource.kind(), path);
        self.cache.insert(path.to_string(), resource.clone());
        Ok(resource)
    }

    fn read_text(&mut self, path: &str) -> Result<String, ResourceError> {
        let full_path = self.root.join(path);
        if !full_path.is_file() {
            return Err(ResourceError::NotFound(path.to_string()));
        }
        read_file(&full_path, path)
    }
}

fn read_file(full_path: &Path, path: &str) -> Result<String, ResourceError> {
    std::fs::read_to_string(full_path).map_err(|source| ResourceError::Io {
        path: path.to_string(),
        source,
    })
}

/// Load a glTF file, merging every primitive of every node into one mesh
/// with node transforms applied.
fn load_gltf(full_path: &Path, path: &str) -> Result<MeshData, ResourceError> {
    let (document, buffers, _images) =
        gltf::import(full_path).map_err(|source| ResourceError::Gltf {
            path: path.to_string(),
            source,
        })?;

    let mut mesh = MeshData::default();
    let mut primitives = 0u32;

    for scene in document.scenes() {
        for node in scene.nodes() {
            collect_node_meshes(&node, glam::Mat4::IDENTITY, &buffers, &mut mesh, &mut primitives);
        }
    }

    if mesh.positions.is_empty() {
        return Err(ResourceError::EmptyMesh(path.to_string()));
    }

    tracing::debug!(
        "glTF '{}': merged {} primitives, {} verts, {} indices",
        path,
        primitives,
        mesh.positions.len(),
        mesh.indices.len()
    );
    Ok(mesh)
}

fn collect_node_meshes(
    node: &gltf::Node,
    parent_transform: glam::Mat4,
    buffers: &[gltf::buffer::Data],
    mesh: &mut MeshData,
    primitives: &mut u32,
) {
    let local = glam::Mat4::from_cols_array_2d(&node.transform().matrix());
    let world = parent_transform * local;

    if let Some(gltf_mesh) = node.mesh() {
        for primitive in gltf_mesh.primitives() {
            let reader = primitive.reader(|buf| Some(&buffers[buf.index()]));

            let positions: Vec<[f32; 3]> = match reader.read_positions() {
                Some(p) => p.collect(),
                None => continue,
            };

            let base_vertex = mesh.positions.len() as u32;
            match reader.read_indices() {
                Some(read_indices) => {
                    mesh.indices
                        .extend(read_indices.into_u32().map(|i| base_vertex + i));
                }
                None => mesh.indices.extend(base_vertex..base_vertex + positions.len() as u32),
            }
            mesh.positions.extend(
                positions
                    .iter()
                    .map(|p| world.transform_point3(glam::Vec3::from(*p))),
            );

            *primitives += 1;
        }
    }

    for child in node.children() {
        collect_node_meshes(&child, world, buffers, mesh, primitives);
    }
}

/// In-memory resources, for tools and tests that have no mod on disk.
#[derive(Default)]
pub struct MemoryResources {
    resources: HashMap<String, Resource>,
    texts: HashMap<String, String>,
}

impl MemoryResources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: &str, resource: Resource) {
        self.resources.insert(path.to_string(), resource);
    }

    pub fn with_mesh(mut self, path: &str, mesh: MeshData) -> Self {
        self.insert(path, Resource::Mesh(Arc::new(mesh)));
        self
    }

    pub fn with_texture(mut self, path: &str, width: u32, height: u32) -> Self {
        let texture = TextureData {
            path: path.to_string(),
            width,
            height,
        };
        self.insert(path, Resource::Texture(Arc::new(texture)));
        self
    }

    pub fn with_scene(mut self, path: &str, scene: SubScene) -> Self {
        self.insert(path, Resource::Scene(Arc::new(scene)));
        self
    }

    pub fn with_text(mut self, path: &str, text: &str) -> Self {
        self.texts.insert(path.to_string(), text.to_string());
        self
    }
}

impl ResourceLoader for MemoryResources {
    fn load(&mut self, path: &str) -> Result<Resource, ResourceError> {
        self.resources
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }

    fn read_text(&mut self, path: &str) -> Result<String, ResourceError> {
        self.texts
            .get(path)
            .cloned()
            .ok_or_else(|| ResourceError::NotFound(path.to_string()))
    }
}
