//! Translation gizmo: handle hit-testing and drag projection.
//!
//! The gizmo has three axis handles and three plane handles centered on the
//! selected object. Handle sizes grow with camera distance so they stay
//! clickable at any zoom.

use glam::{Mat4, Vec3};

use crate::math::Ray;

pub const BASE_AXIS_LENGTH: f32 = 1.0;
pub const BASE_PLANE_SIZE: f32 = 0.8;
pub const BASE_AXIS_THRESHOLD: f32 = 0.1;

const PARALLEL_DOT: f32 = 0.999;
const PLANE_EPSILON: f32 = 1e-6;

/// Visual scale of the gizmo at a given camera distance.
pub fn gizmo_scale(distance: f32) -> f32 {
    (distance * 0.1).clamp(0.5, 5.0)
}

fn axis_threshold(distance: f32) -> f32 {
    (BASE_AXIS_THRESHOLD * distance * 0.1)
        .clamp(BASE_AXIS_THRESHOLD * 0.5, BASE_AXIS_THRESHOLD * 5.0)
}

fn axis_length(distance: f32) -> f32 {
    (BASE_AXIS_LENGTH * distance * 0.1).clamp(0.5, 5.0)
}

fn plane_size(distance: f32) -> f32 {
    (BASE_PLANE_SIZE * distance * 0.1).clamp(0.4, 4.0)
}

/// Which handle is pressed or hovered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DragMode {
    #[default]
    None,
    XAxis,
    YAxis,
    ZAxis,
    XYPlane,
    XZPlane,
    YZPlane,
}

impl DragMode {
    /// Components of a world-space delta this mode is allowed to change.
    pub fn mask(self) -> Vec3 {
        match self {
            DragMode::None => Vec3::ZERO,
            DragMode::XAxis => Vec3::X,
            DragMode::YAxis => Vec3::Y,
            DragMode::ZAxis => Vec3::Z,
            DragMode::XYPlane => Vec3::new(1.0, 1.0, 0.0),
            DragMode::XZPlane => Vec3::new(1.0, 0.0, 1.0),
            DragMode::YZPlane => Vec3::new(0.0, 1.0, 1.0),
        }
    }

    pub fn is_axis(self) -> bool {
        matches!(self, DragMode::XAxis | DragMode::YAxis | DragMode::ZAxis)
    }

    /// Normal of the plane the pointer is projected onto while dragging.
    ///
    /// Axis drags use the plane containing the axis that faces the camera
    /// most directly; plane drags use the cardinal plane itself.
    pub fn drag_plane_normal(self, to_camera: Vec3) -> Vec3 {
        let axis = match self {
            DragMode::XAxis => Vec3::X,
            DragMode::YAxis => Vec3::Y,
            DragMode::ZAxis => Vec3::NEG_Z,
            DragMode::XYPlane => return Vec3::NEG_Z,
            DragMode::XZPlane | DragMode::None => return Vec3::Y,
            DragMode::YZPlane => return Vec3::X,
        };
        to_camera.cross(axis).cross(axis).normalize_or_zero()
    }
}

/// An accepted handle hit, `distance` measured along the pointer ray.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GizmoHit {
    pub mode: DragMode,
    pub distance: f32,
    pub point: Vec3,
}

/// Closest points between two infinite lines and their separation.
///
/// For (nearly) parallel lines every point pairs up equally well, so the
/// second origin is paired with its projection onto the first line.
pub fn closest_points_between_lines(
    origin1: Vec3,
    dir1: Vec3,
    origin2: Vec3,
    dir2: Vec3,
) -> (Vec3, Vec3, f32) {
    let d1 = dir1.normalize_or_zero();
    let d2 = dir2.normalize_or_zero();

    if d1.dot(d2).abs() > PARALLEL_DOT {
        let p1 = origin1 + d1 * d1.dot(origin2 - origin1);
        return (p1, origin2, p1.distance(origin2));
    }

    let w0 = origin1 - origin2;
    let a = d1.dot(d1);
    let b = d1.dot(d2);
    let c = d2.dot(d2);
    let d = d1.dot(w0);
    let e = d2.dot(w0);
    let denominator = a * c - b * b;

    let s = (b * e - c * d) / denominator;
    let t = (a * e - b * d) / denominator;

    let p1 = origin1 + d1 * s;
    let p2 = origin2 + d2 * t;
    (p1, p2, p1.distance(p2))
}

/// Test the pointer ray against one axis handle.
pub fn test_axis(ray: &Ray, origin: Vec3, axis: Vec3, mode: DragMode) -> Option<GizmoHit> {
    let (ray_point, axis_point, separation) =
        closest_points_between_lines(ray.origin, ray.direction, origin, axis);

    let distance_to_gizmo = origin.distance(ray.origin);
    let offset = axis_point.distance(origin);

    if separation <= axis_threshold(distance_to_gizmo) && offset <= axis_length(distance_to_gizmo) {
        Some(GizmoHit {
            mode,
            distance: ray_point.distance(ray.origin),
            point: axis_point,
        })
    } else {
        None
    }
}

/// Test the pointer ray against one square plane handle.
pub fn test_plane(ray: &Ray, origin: Vec3, normal: Vec3, mode: DragMode) -> Option<GizmoHit> {
    let t = intersect_plane(ray, origin, normal)?;
    let hit = ray.at(t);
    let to_hit = hit - origin;

    let mut u = normal.cross(Vec3::Y);
    if u.length_squared() < PLANE_EPSILON {
        u = normal.cross(Vec3::X);
    }
    let u = u.normalize();
    let v = normal.cross(u).normalize();

    let half = plane_size(origin.distance(ray.origin)) * 0.5;
    if to_hit.dot(u).abs() <= half && to_hit.dot(v).abs() <= half {
        Some(GizmoHit {
            mode,
            distance: t,
            point: hit,
        })
    } else {
        None
    }
}

/// Ray parameter where it meets the plane, if in front of the ray origin.
pub fn intersect_plane(ray: &Ray, origin: Vec3, normal: Vec3) -> Option<f32> {
    let denominator = normal.dot(ray.direction);
    if denominator.abs() < PLANE_EPSILON {
        return None;
    }
    let t = normal.dot(origin - ray.origin) / denominator;
    if t < 0.0 {
        None
    } else {
        Some(t)
    }
}

/// Nearest accepted handle under the ray, testing axes X, Y, Z then planes XY, XZ, YZ.
/// Ties keep the earlier handle.
pub fn test_gizmo(ray: &Ray, gizmo: &Mat4) -> Option<GizmoHit> {
    let origin = gizmo.w_axis.truncate();
    let x = gizmo.x_axis.truncate();
    let y = gizmo.y_axis.truncate();
    let z = gizmo.z_axis.truncate();

    let candidates = [
        test_axis(ray, origin, x, DragMode::XAxis),
        test_axis(ray, origin, y, DragMode::YAxis),
        test_axis(ray, origin, z, DragMode::ZAxis),
        test_plane(ray, origin, z, DragMode::XYPlane),
        test_plane(ray, origin, y, DragMode::XZPlane),
        test_plane(ray, origin, x, DragMode::YZPlane),
    ];

    let mut best: Option<GizmoHit> = None;
    for hit in candidates.into_iter().flatten() {
        if best.map_or(true, |b| hit.distance < b.distance) {
            best = Some(hit);
        }
    }
    best
}

#[derive(Debug, Clone, Copy)]
struct DragState {
    mode: DragMode,
    plane_normal: Vec3,
    plane_origin: Vec3,
    anchor: Vec3,
    start_position: Vec3,
}

/// Drag state machine: `None -> hovering handle -> dragging -> None`.
#[derive(Debug, Clone, Default)]
pub struct TranslateGizmo {
    target: Option<Vec3>,
    hovered: DragMode,
    drag: Option<DragState>,
}

impl TranslateGizmo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach to (or detach from) the selected object's position.
    pub fn set_target(&mut self, position: Option<Vec3>) {
        self.target = position;
        if position.is_none() {
            self.drag = None;
            self.hovered = DragMode::None;
        }
    }

    pub fn is_visible(&self) -> bool {
        self.target.is_some()
    }

    pub fn position(&self) -> Option<Vec3> {
        self.target
    }

    pub fn is_dragging(&self) -> bool {
        self.drag.is_some()
    }

    /// Active drag mode, `None` when idle.
    pub fn mode(&self) -> DragMode {
        self.drag.map_or(DragMode::None, |d| d.mode)
    }

    pub fn hovered(&self) -> DragMode {
        self.hovered
    }

    /// Visual scale for the current camera.
    pub fn scale(&self, camera_position: Vec3) -> f32 {
        self.target
            .map_or(1.0, |p| gizmo_scale(p.distance(camera_position)))
    }

    /// Handle under the pointer ray.
    pub fn pick(&self, ray: &Ray) -> DragMode {
        let Some(position) = self.target else {
            return DragMode::None;
        };
        test_gizmo(ray, &Mat4::from_translation(position)).map_or(DragMode::None, |h| h.mode)
    }

    /// Update the highlighted handle. Returns the new hover mode.
    pub fn hover(&mut self, ray: &Ray) -> DragMode {
        self.hovered = self.pick(ray);
        self.hovered
    }

    /// Start dragging `mode`. Fails when nothing is selected or no handle is given.
    pub fn begin_drag(&mut self, ray: &Ray, mode: DragMode, camera_position: Vec3) -> bool {
        let Some(position) = self.target else {
            return false;
        };
        if mode == DragMode::None {
            return false;
        }

        let to_camera = (camera_position - position).normalize_or_zero();
        let plane_normal = mode.drag_plane_normal(to_camera);
        let anchor = project_onto_plane(ray, position, plane_normal);

        self.drag = Some(DragState {
            mode,
            plane_normal,
            plane_origin: position,
            anchor,
            start_position: position,
        });
        true
    }

    /// Move the drag to a new pointer ray. Returns the object's new position.
    pub fn update_drag(&mut self, ray: &Ray) -> Option<Vec3> {
        let drag = self.drag?;
        let current = project_onto_plane(ray, drag.plane_origin, drag.plane_normal);
        let delta = (current - drag.anchor) * drag.mode.mask();
        let position = drag.start_position + delta;
        self.target = Some(position);
        Some(position)
    }

    pub fn end_drag(&mut self) {
        self.drag = None;
    }
}

/// Pointer position on the drag plane, or the plane origin when the ray runs parallel.
fn project_onto_plane(ray: &Ray, origin: Vec3, normal: Vec3) -> Vec3 {
    let denominator = normal.dot(ray.direction);
    if denominator.abs() < PLANE_EPSILON {
        return origin;
    }
    let t = normal.dot(origin - ray.origin) / denominator;
    ray.at(t)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[test]
    fn test_scale_is_clamped() {
        assert_eq!(gizmo_scale(1.0), 0.5);
        assert!(approx(gizmo_scale(20.0), 2.0));
        assert_eq!(gizmo_scale(500.0), 5.0);
    }

    #[test]
    fn test_closest_points_skew_lines() {
        // X axis through origin vs a Z-directed line at y = 2.
        let (p1, p2, d) =
            closest_points_between_lines(Vec3::ZERO, Vec3::X, Vec3::new(3.0, 2.0, -5.0), Vec3::Z);
        assert!(p1.distance(Vec3::new(3.0, 0.0, 0.0)) < 1e-4);
        assert!(p2.distance(Vec3::new(3.0, 2.0, 0.0)) < 1e-4);
        assert!(approx(d, 2.0));
    }

    #[test]
    fn test_closest_points_parallel_lines() {
        let (p1, p2, d) = closest_points_between_lines(
            Vec3::new(0.0, 1.0, 0.0),
            Vec3::X,
            Vec3::new(5.0, 0.0, 0.0),
            Vec3::NEG_X,
        );
        assert!(p1.distance(Vec3::new(5.0, 1.0, 0.0)) < 1e-4);
        assert_eq!(p2, Vec3::new(5.0, 0.0, 0.0));
        assert!(approx(d, 1.0));
    }

    #[test]
    fn test_ray_along_axis_always_hits() {
        let origin = Vec3::new(2.0, 1.0, -3.0);
        for axis in [Vec3::X, Vec3::Y, Vec3::Z] {
            for distance in [0.5, 4.0, 30.0, 400.0] {
                let ray = Ray::new(origin - axis * distance, axis);
                let hit = test_axis(&ray, origin, axis, DragMode::XAxis);
                assert!(hit.is_some(), "axis {:?} at distance {}", axis, distance);
                let (_, _, separation) =
                    closest_points_between_lines(ray.origin, ray.direction, origin, axis);
                assert!(approx(separation, 0.0));
            }
        }
    }

    #[test]
    fn test_axis_miss_beyond_length() {
        // Camera 10 units away: axis length is 1, so a point 3 units out misses.
        let ray = Ray::new(Vec3::new(3.0, 0.0, 10.0), Vec3::NEG_Z);
        assert!(test_axis(&ray, Vec3::ZERO, Vec3::X, DragMode::XAxis).is_none());
        let near = Ray::new(Vec3::new(0.8, 0.0, 10.0), Vec3::NEG_Z);
        assert!(test_axis(&near, Vec3::ZERO, Vec3::X, DragMode::XAxis).is_some());
    }

    #[test]
    fn test_parallel_plane_never_hits() {
        let normal = Vec3::Y;
        for dir in [Vec3::X, Vec3::Z, Vec3::new(1.0, 0.0, 1.0)] {
            let ray = Ray::new(Vec3::new(0.0, 0.0, -0.1), dir);
            assert!(test_plane(&ray, Vec3::ZERO, normal, DragMode::XZPlane).is_none());
        }
    }

    #[test]
    fn test_plane_behind_ray_is_rejected() {
        let ray = Ray::new(Vec3::new(0.1, 5.0, 0.1), Vec3::Y);
        assert!(test_plane(&ray, Vec3::ZERO, Vec3::Y, DragMode::XZPlane).is_none());
        let down = Ray::new(Vec3::new(0.1, 5.0, 0.1), Vec3::NEG_Y);
        let hit = test_plane(&down, Vec3::ZERO, Vec3::Y, DragMode::XZPlane).unwrap();
        assert!(approx(hit.distance, 5.0));
    }

    #[test]
    fn test_gizmo_prefers_nearest_hit() {
        // Looking straight down at the XZ plane handle, away from the axes.
        let ray = Ray::new(Vec3::new(0.15, 5.0, 0.15), Vec3::NEG_Y);
        let hit = test_gizmo(&ray, &Mat4::IDENTITY).unwrap();
        assert_eq!(hit.mode, DragMode::XZPlane);

        // Nothing near the gizmo.
        let miss = Ray::new(Vec3::new(50.0, 5.0, 50.0), Vec3::NEG_Y);
        assert!(test_gizmo(&miss, &Mat4::IDENTITY).is_none());
    }

    #[test]
    fn test_gizmo_axis_outside_plane_square() {
        // Pointing at the X axis beyond the XY plane handle's half extent.
        let ray = Ray::new(Vec3::new(0.45, 0.0, 5.0), Vec3::NEG_Z);
        let hit = test_gizmo(&ray, &Mat4::IDENTITY).unwrap();
        assert_eq!(hit.mode, DragMode::XAxis);
    }

    #[test]
    fn test_axis_drag_masks_other_components() {
        let mut gizmo = TranslateGizmo::new();
        gizmo.set_target(Some(Vec3::ZERO));
        let camera = Vec3::new(0.0, 3.0, 10.0);

        let start = Ray::new(camera, Vec3::new(0.2, 0.0, 0.0) - camera);
        assert!(gizmo.begin_drag(&start, DragMode::XAxis, camera));
        assert_eq!(gizmo.mode(), DragMode::XAxis);

        let moved = Ray::new(camera, Vec3::new(2.0, 1.0, 0.5) - camera);
        let position = gizmo.update_drag(&moved).unwrap();
        assert!(position.x > 1.0);
        assert_eq!(position.y, 0.0);
        assert_eq!(position.z, 0.0);
        assert_eq!(gizmo.position(), Some(position));
    }

    #[test]
    fn test_plane_drag_masks_normal_component() {
        let mut gizmo = TranslateGizmo::new();
        gizmo.set_target(Some(Vec3::new(1.0, 0.0, 1.0)));
        let camera = Vec3::new(4.0, 8.0, 6.0);

        let start = Ray::new(camera, Vec3::new(1.1, 0.0, 1.1) - camera);
        assert!(gizmo.begin_drag(&start, DragMode::XZPlane, camera));
        let moved = Ray::new(camera, Vec3::new(3.0, 0.0, -2.0) - camera);
        let position = gizmo.update_drag(&moved).unwrap();
        assert_eq!(position.y, 0.0);
        assert!(approx(position.x, 2.9));
        assert!(approx(position.z, -2.1));

        let mut yz = TranslateGizmo::new();
        yz.set_target(Some(Vec3::ZERO));
        let camera = Vec3::new(10.0, 1.0, 1.0);
        assert!(yz.begin_drag(&Ray::new(camera, -camera), DragMode::YZPlane, camera));
        let position = yz
            .update_drag(&Ray::new(camera, Vec3::new(0.0, 2.0, 3.0) - camera))
            .unwrap();
        assert_eq!(position.x, 0.0);
    }

    #[test]
    fn test_end_drag_resets() {
        let mut gizmo = TranslateGizmo::new();
        let ray = Ray::new(Vec3::new(0.0, 0.0, 5.0), Vec3::NEG_Z);
        assert!(!gizmo.begin_drag(&ray, DragMode::XAxis, ray.origin));

        gizmo.set_target(Some(Vec3::ZERO));
        assert!(!gizmo.begin_drag(&ray, DragMode::None, ray.origin));
        assert!(gizmo.begin_drag(&ray, DragMode::YAxis, ray.origin));
        gizmo.end_drag();
        assert!(!gizmo.is_dragging());
        assert_eq!(gizmo.mode(), DragMode::None);
        assert!(gizmo.update_drag(&ray).is_none());
    }
}
