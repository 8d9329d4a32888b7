use glam::{EulerRot, Mat4, Quat, Vec3};
use serde::{Deserialize, Serialize};

/// `{x, y, z}` as it appears in mod JSON. Missing components read as zero.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vector3 {
    #[serde(default)]
    pub x: f32,
    #[serde(default)]
    pub y: f32,
    #[serde(default)]
    pub z: f32,
}

impl Vector3 {
    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }
}

impl From<Vector3> for Vec3 {
    fn from(v: Vector3) -> Self {
        Vec3::new(v.x, v.y, v.z)
    }
}

impl From<Vec3> for Vector3 {
    fn from(v: Vec3) -> Self {
        Self::new(v.x, v.y, v.z)
    }
}

/// RGB color, components in 0..1.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Color {
    #[serde(default)]
    pub r: f32,
    #[serde(default)]
    pub g: f32,
    #[serde(default)]
    pub b: f32,
}

impl Color {
    pub fn to_array(self) -> [f32; 3] {
        [self.r, self.g, self.b]
    }
}

/// Transform as written in objects and level files.
///
/// Every part is optional and stays absent on save when it was absent on load.
/// Rotation is Euler degrees `{x: pitch, y: yaw, z: roll}`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct TransformDef {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub position: Option<Vector3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<Vector3>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scale: Option<Vector3>,
}

impl TransformDef {
    /// Build a fully specified transform from engine values.
    pub fn from_parts(position: Vec3, rotation: Quat, scale: Vec3) -> Self {
        Self {
            position: Some(position.into()),
            rotation: Some(Vec3::from(quat_to_euler_degrees(rotation)).into()),
            scale: Some(scale.into()),
        }
    }

    pub fn at(position: Vec3) -> Self {
        Self {
            position: Some(position.into()),
            ..Default::default()
        }
    }

    pub fn position(&self) -> Vec3 {
        self.position.map(Vec3::from).unwrap_or(Vec3::ZERO)
    }

    pub fn rotation_degrees(&self) -> Vec3 {
        self.rotation.map(Vec3::from).unwrap_or(Vec3::ZERO)
    }

    pub fn rotation(&self) -> Quat {
        euler_degrees_to_quat(self.rotation_degrees().to_array())
    }

    pub fn scale(&self) -> Vec3 {
        self.scale.map(Vec3::from).unwrap_or(Vec3::ONE)
    }

    pub fn to_matrix(&self) -> Mat4 {
        compose_transform(self.position(), self.rotation(), self.scale())
    }
}

/// Rotate an identity basis, scale it along the parent axes, then translate.
///
/// The scale is applied after the rotation, so a non-uniform scale stretches
/// along parent space rather than along the rotated local axes.
pub fn compose_transform(position: Vec3, rotation: Quat, scale: Vec3) -> Mat4 {
    Mat4::from_translation(position) * Mat4::from_scale(scale) * Mat4::from_quat(rotation)
}

/// Convert Euler angles in degrees (pitch, yaw, roll) to a quaternion.
pub fn euler_degrees_to_quat(euler: [f32; 3]) -> Quat {
    let pitch = euler[0].to_radians();
    let yaw = euler[1].to_radians();
    let roll = euler[2].to_radians();
    Quat::from_euler(EulerRot::YXZ, yaw, pitch, roll)
}

/// Inverse of [`euler_degrees_to_quat`].
pub fn quat_to_euler_degrees(q: Quat) -> [f32; 3] {
    let (yaw, pitch, roll) = q.to_euler(EulerRot::YXZ);
    [pitch.to_degrees(), yaw.to_degrees(), roll.to_degrees()]
}

/// A half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub origin: Vec3,
    pub direction: Vec3,
}

impl Ray {
    pub fn new(origin: Vec3, direction: Vec3) -> Self {
        Self {
            origin,
            direction: direction.normalize_or_zero(),
        }
    }

    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn test_transform_defaults() {
        let t = TransformDef::default();
        assert_eq!(t.position(), Vec3::ZERO);
        assert_eq!(t.scale(), Vec3::ONE);
        assert_eq!(t.to_matrix(), Mat4::IDENTITY);
    }

    #[test]
    fn test_transform_applies_scale_before_translation() {
        let t = TransformDef {
            position: Some(Vector3::new(10.0, 0.0, 0.0)),
            rotation: Some(Vector3::new(0.0, 90.0, 0.0)),
            scale: Some(Vector3::new(2.0, 2.0, 2.0)),
        };
        // +X scaled to 2, yawed 90 degrees onto -Z, then moved by +10 X.
        let p = t.to_matrix().transform_point3(Vec3::X);
        assert!(approx(p, Vec3::new(10.0, 0.0, -2.0)), "got {:?}", p);
    }

    #[test]
    fn test_non_uniform_scale_follows_parent_axes() {
        let t = TransformDef {
            position: Some(Vector3::new(10.0, 0.0, 0.0)),
            rotation: Some(Vector3::new(0.0, 90.0, 0.0)),
            scale: Some(Vector3::new(2.0, 1.0, 1.0)),
        };
        // +X yaws onto -Z, which the X-only scale leaves alone.
        let p = t.to_matrix().transform_point3(Vec3::X);
        assert!(approx(p, Vec3::new(10.0, 0.0, -1.0)), "got {:?}", p);

        // -Z yaws onto -X and is stretched.
        let q = t.to_matrix().transform_point3(Vec3::NEG_Z);
        assert!(approx(q, Vec3::new(8.0, 0.0, 0.0)), "got {:?}", q);
    }

    #[test]
    fn test_euler_round_trip() {
        let q = euler_degrees_to_quat([30.0, 45.0, -10.0]);
        let back = quat_to_euler_degrees(q);
        assert!(approx(Vec3::from(back), Vec3::new(30.0, 45.0, -10.0)), "got {:?}", back);
    }

    #[test]
    fn test_omitted_parts_stay_omitted() {
        let json = serde_json::json!({ "position": { "x": 1.0, "y": 2.0, "z": 3.0 } });
        let t: TransformDef = serde_json::from_value(json.clone()).unwrap();
        assert_eq!(serde_json::to_value(t).unwrap(), json);
    }

    #[test]
    fn test_vector_components_default_to_zero() {
        let v: Vector3 = serde_json::from_str(r#"{"y": 4}"#).unwrap();
        assert_eq!(v, Vector3::new(0.0, 4.0, 0.0));
    }
}
