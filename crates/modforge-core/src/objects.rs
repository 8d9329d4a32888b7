//! Object definitions: the reusable templates a mod declares in `objects.json`.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use crate::math::{Color, TransformDef, Vector3};
use crate::polymorphic_serde;
use crate::schema::{self, Polymorphic, SchemaError, Variant};

// --- Shared properties ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderProperties {
    pub mesh: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub texture: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshProperties {
    pub render: RenderProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDef>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PhysicsType {
    Static,
    RigidBody,
}

impl PhysicsType {
    pub fn as_str(self) -> &'static str {
        match self {
            PhysicsType::Static => "static",
            PhysicsType::RigidBody => "rigid_body",
        }
    }
}

impl Serialize for PhysicsType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for PhysicsType {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        match s.to_ascii_lowercase().as_str() {
            "static" => Ok(PhysicsType::Static),
            "rigid_body" => Ok(PhysicsType::RigidBody),
            _ => Err(serde::de::Error::unknown_variant(&s, &["static", "rigid_body"])),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhysicsProperties {
    #[serde(rename = "type")]
    pub kind: PhysicsType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mass: Option<f32>,
    pub collider: ColliderProperties,
}

impl PhysicsProperties {
    pub fn mass(&self) -> f32 {
        self.mass.unwrap_or(1.0)
    }
}

// --- Colliders ---

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct BoxCollider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<Vector3>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeshCollider {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDef>,
    pub mesh: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColliderProperties {
    Box(BoxCollider),
    Mesh(MeshCollider),
}

fn parse_box_collider(v: Value) -> serde_json::Result<ColliderProperties> {
    serde_json::from_value(v).map(ColliderProperties::Box)
}

fn parse_mesh_collider(v: Value) -> serde_json::Result<ColliderProperties> {
    serde_json::from_value(v).map(ColliderProperties::Mesh)
}

impl Polymorphic for ColliderProperties {
    const CONTEXT: &'static str = "collider";
    const VARIANTS: &'static [Variant<Self>] = &[
        Variant { tag: "box", parse: parse_box_collider },
        Variant { tag: "mesh", parse: parse_mesh_collider },
    ];

    fn tag(&self) -> &'static str {
        match self {
            ColliderProperties::Box(_) => "box",
            ColliderProperties::Mesh(_) => "mesh",
        }
    }

    fn fields(&self) -> serde_json::Result<Value> {
        match self {
            ColliderProperties::Box(c) => serde_json::to_value(c),
            ColliderProperties::Mesh(c) => serde_json::to_value(c),
        }
    }
}

polymorphic_serde!(ColliderProperties);

// --- Projectiles ---

pub const DEFAULT_SPREAD_DEGREES: f32 = 15.0;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BulletProjectile {
    pub damage: f32,
    pub color: Color,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spread: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDef>,
}

impl BulletProjectile {
    pub fn spread(&self) -> f32 {
        self.spread.unwrap_or(DEFAULT_SPREAD_DEGREES)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ProjectileProperties {
    Bullet(BulletProjectile),
}

impl ProjectileProperties {
    pub fn damage(&self) -> f32 {
        match self {
            ProjectileProperties::Bullet(b) => b.damage,
        }
    }

    /// Spawn offset relative to the weapon.
    pub fn transform(&self) -> Option<&TransformDef> {
        match self {
            ProjectileProperties::Bullet(b) => b.transform.as_ref(),
        }
    }
}

fn parse_bullet(v: Value) -> serde_json::Result<ProjectileProperties> {
    serde_json::from_value(v).map(ProjectileProperties::Bullet)
}

impl Polymorphic for ProjectileProperties {
    const CONTEXT: &'static str = "projectile";
    const VARIANTS: &'static [Variant<Self>] = &[Variant { tag: "bullet", parse: parse_bullet }];

    fn tag(&self) -> &'static str {
        match self {
            ProjectileProperties::Bullet(_) => "bullet",
        }
    }

    fn fields(&self) -> serde_json::Result<Value> {
        match self {
            ProjectileProperties::Bullet(b) => serde_json::to_value(b),
        }
    }
}

polymorphic_serde!(ProjectileProperties);

// --- Definitions ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub mesh: MeshProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics: Option<PhysicsProperties>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VehicleProperties {
    pub engine_force: f32,
    pub brake_force: f32,
    pub steering_angle: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WheelProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform: Option<TransformDef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_as_traction: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub use_as_steering: Option<bool>,
    pub mesh: MeshProperties,
}

impl WheelProperties {
    pub fn traction(&self) -> bool {
        self.use_as_traction.unwrap_or(false)
    }

    pub fn steering(&self) -> bool {
        self.use_as_steering.unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VehicleDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub mesh: MeshProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics: Option<PhysicsProperties>,
    pub vehicle: VehicleProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wheels: Option<Vec<WheelProperties>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub weapon_slots: Option<Vec<Vector3>>,
}

impl VehicleDefinition {
    pub fn wheels(&self) -> &[WheelProperties] {
        self.wheels.as_deref().unwrap_or_default()
    }

    pub fn weapon_slots(&self) -> &[Vector3] {
        self.weapon_slots.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeaponDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    pub mesh: MeshProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub physics: Option<PhysicsProperties>,
    pub projectile: ProjectileProperties,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_projectiles: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shoot_delay: Option<f32>,
}

impl WeaponDefinition {
    pub fn num_projectiles(&self) -> u32 {
        self.num_projectiles.unwrap_or(1)
    }

    pub fn shoot_delay(&self) -> f32 {
        self.shoot_delay.unwrap_or(0.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDefinition {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
    /// Sub-scene resource instantiated as-is.
    pub file: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ObjectDefinition {
    Prop(PropDefinition),
    Vehicle(VehicleDefinition),
    Weapon(WeaponDefinition),
    Scene(SceneDefinition),
}

impl ObjectDefinition {
    /// The `type` discriminator this definition was parsed from.
    pub fn type_name(&self) -> &'static str {
        match self {
            ObjectDefinition::Prop(_) => "prop",
            ObjectDefinition::Vehicle(_) => "vehicle",
            ObjectDefinition::Weapon(_) => "weapon",
            ObjectDefinition::Scene(_) => "scene",
        }
    }

    pub fn id(&self) -> &str {
        match self {
            ObjectDefinition::Prop(d) => &d.id,
            ObjectDefinition::Vehicle(d) => &d.id,
            ObjectDefinition::Weapon(d) => &d.id,
            ObjectDefinition::Scene(d) => &d.id,
        }
    }

    /// Path of the behavior script, relative to the mod's objects directory.
    pub fn script(&self) -> Option<&str> {
        match self {
            ObjectDefinition::Prop(d) => d.script.as_deref(),
            ObjectDefinition::Vehicle(d) => d.script.as_deref(),
            ObjectDefinition::Weapon(d) => d.script.as_deref(),
            ObjectDefinition::Scene(d) => d.script.as_deref(),
        }
    }

    pub fn mesh(&self) -> Option<&MeshProperties> {
        match self {
            ObjectDefinition::Prop(d) => Some(&d.mesh),
            ObjectDefinition::Vehicle(d) => Some(&d.mesh),
            ObjectDefinition::Weapon(d) => Some(&d.mesh),
            ObjectDefinition::Scene(_) => None,
        }
    }

    pub fn physics(&self) -> Option<&PhysicsProperties> {
        match self {
            ObjectDefinition::Prop(d) => d.physics.as_ref(),
            ObjectDefinition::Vehicle(d) => d.physics.as_ref(),
            ObjectDefinition::Weapon(d) => d.physics.as_ref(),
            ObjectDefinition::Scene(_) => None,
        }
    }
}

fn parse_prop(v: Value) -> serde_json::Result<ObjectDefinition> {
    serde_json::from_value(v).map(ObjectDefinition::Prop)
}

fn parse_vehicle(v: Value) -> serde_json::Result<ObjectDefinition> {
    serde_json::from_value(v).map(ObjectDefinition::Vehicle)
}

fn parse_weapon(v: Value) -> serde_json::Result<ObjectDefinition> {
    serde_json::from_value(v).map(ObjectDefinition::Weapon)
}

fn parse_scene(v: Value) -> serde_json::Result<ObjectDefinition> {
    serde_json::from_value(v).map(ObjectDefinition::Scene)
}

impl Polymorphic for ObjectDefinition {
    const CONTEXT: &'static str = "object";
    const VARIANTS: &'static [Variant<Self>] = &[
        Variant { tag: "prop", parse: parse_prop },
        Variant { tag: "vehicle", parse: parse_vehicle },
        Variant { tag: "scene", parse: parse_scene },
        Variant { tag: "weapon", parse: parse_weapon },
    ];

    fn tag(&self) -> &'static str {
        match self {
            ObjectDefinition::Prop(_) => "prop",
            ObjectDefinition::Vehicle(_) => "vehicle",
            ObjectDefinition::Weapon(_) => "weapon",
            ObjectDefinition::Scene(_) => "scene",
        }
    }

    fn fields(&self) -> serde_json::Result<Value> {
        match self {
            ObjectDefinition::Prop(d) => serde_json::to_value(d),
            ObjectDefinition::Vehicle(d) => serde_json::to_value(d),
            ObjectDefinition::Weapon(d) => serde_json::to_value(d),
            ObjectDefinition::Scene(d) => serde_json::to_value(d),
        }
    }
}

polymorphic_serde!(ObjectDefinition);

/// Top-level `objects.json`: `{"objects": [...]}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ObjectsFile {
    pub objects: Vec<ObjectDefinition>,
}

impl ObjectsFile {
    /// Parse an objects document, keeping the schema error of the first bad entry.
    pub fn from_json(text: &str) -> Result<Self, SchemaError> {
        let value: Value = serde_json::from_str(text)?;
        Self::from_value(value)
    }

    pub fn from_value(value: Value) -> Result<Self, SchemaError> {
        let mut map = match value {
            Value::Object(map) => map,
            _ => return Err(SchemaError::NotAnObject { context: "objects file" }),
        };
        let items = match map.remove("objects") {
            Some(Value::Array(items)) => items,
            Some(Value::Null) | None => {
                return Err(SchemaError::MissingField {
                    context: "objects file",
                    field: "objects",
                })
            }
            Some(_) => return Err(SchemaError::NotAnObject { context: "objects list" }),
        };
        Ok(Self {
            objects: schema::resolve_all(items)?,
        })
    }

    pub fn to_json(&self) -> Result<String, SchemaError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
