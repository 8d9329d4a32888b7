use glam::Vec3;

/// Axis-aligned box stored as its minimum corner plus size.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub position: Vec3,
    pub size: Vec3,
}

impl Aabb {
    pub fn new(position: Vec3, size: Vec3) -> Self {
        Self { position, size }
    }

    /// Tight box around a point set. Empty input gives a zero box at the origin.
    pub fn from_points(points: &[Vec3]) -> Self {
        let Some(first) = points.first() else {
            return Self::default();
        };
        let (min, max) = points
            .iter()
            .fold((*first, *first), |(min, max), p| (min.min(*p), max.max(*p)));
        Self::new(min, max - min)
    }

    pub fn end(&self) -> Vec3 {
        self.position + self.size
    }

    pub fn center(&self) -> Vec3 {
        self.position + self.size / 2.0
    }

    /// Smallest box containing both.
    pub fn merge(&self, other: &Aabb) -> Aabb {
        let min = self.position.min(other.position);
        let max = self.end().max(other.end());
        Aabb::new(min, max - min)
    }

    /// Box of a mesh placed with a node scale and offset. Rotation is ignored.
    pub fn placed(&self, position: Vec3, scale: Vec3) -> Aabb {
        Aabb::new(self.position * scale + position, self.size * scale)
    }
}

/// CPU-side triangle mesh. Positions are in the mesh's own space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    pub indices: Vec<u32>,
}

impl MeshData {
    pub fn new(positions: Vec<Vec3>, indices: Vec<u32>) -> Self {
        Self { positions, indices }
    }

    pub fn aabb(&self) -> Aabb {
        Aabb::from_points(&self.positions)
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    /// Triangle index triples, skipping any that point outside the vertex list.
    pub fn triangles(&self) -> Vec<[u32; 3]> {
        let count = self.positions.len() as u32;
        self.indices
            .chunks_exact(3)
            .filter(|tri| tri.iter().all(|&i| i < count))
            .map(|tri| [tri[0], tri[1], tri[2]])
            .collect()
    }

    /// Every face as three corner positions.
    pub fn faces(&self) -> Vec<[Vec3; 3]> {
        self.triangles()
            .into_iter()
            .map(|[a, b, c]| {
                [
                    self.positions[a as usize],
                    self.positions[b as usize],
                    self.positions[c as usize],
                ]
            })
            .collect()
    }

    /// Unit cube centered on the origin.
    pub fn cube() -> Self {
        let positions = vec![
            Vec3::new(-0.5, -0.5, -0.5),
            Vec3::new(0.5, -0.5, -0.5),
            Vec3::new(0.5, 0.5, -0.5),
            Vec3::new(-0.5, 0.5, -0.5),
            Vec3::new(-0.5, -0.5, 0.5),
            Vec3::new(0.5, -0.5, 0.5),
            Vec3::new(0.5, 0.5, 0.5),
            Vec3::new(-0.5, 0.5, 0.5),
        ];
        let indices = vec![
            0, 2, 1, 0, 3, 2, // back
            4, 5, 6, 4, 6, 7, // front
            0, 1, 5, 0, 5, 4, // bottom
            3, 6, 2, 3, 7, 6, // top
            0, 4, 7, 0, 7, 3, // left
            1, 2, 6, 1, 6, 5, // right
        ];
        Self::new(positions, indices)
    }
}

/// Decoded texture metadata. Pixel data stays with the host renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureData {
    pub path: String,
    pub width: u32,
    pub height: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cube_bounds() {
        let aabb = MeshData::cube().aabb();
        assert_eq!(aabb.position, Vec3::splat(-0.5));
        assert_eq!(aabb.size, Vec3::ONE);
        assert_eq!(aabb.center(), Vec3::ZERO);
    }

    #[test]
    fn test_merge() {
        let a = Aabb::new(Vec3::ZERO, Vec3::ONE);
        let b = Aabb::new(Vec3::new(2.0, -1.0, 0.0), Vec3::ONE);
        let m = a.merge(&b);
        assert_eq!(m.position, Vec3::new(0.0, -1.0, 0.0));
        assert_eq!(m.size, Vec3::new(3.0, 2.0, 1.0));
    }

    #[test]
    fn test_placed_scales_then_offsets() {
        let a = Aabb::new(Vec3::splat(-0.5), Vec3::ONE);
        let p = a.placed(Vec3::new(0.0, 1.0, 0.0), Vec3::splat(2.0));
        assert_eq!(p.position, Vec3::new(-1.0, 0.0, -1.0));
        assert_eq!(p.size, Vec3::splat(2.0));
    }

    #[test]
    fn test_faces_skip_bad_indices() {
        let mesh = MeshData::new(vec![Vec3::ZERO, Vec3::X, Vec3::Y], vec![0, 1, 2, 0, 1, 9]);
        assert_eq!(mesh.faces().len(), 1);
        assert_eq!(MeshData::cube().faces().len(), 12);
    }
}
