use glam::{Vec2, Vec3};

const EPSILON: f32 = 1e-7;

/// Indexed triangle mesh in world coordinates, with optional per-vertex UV
/// coordinates for texture lookup.
#[derive(Debug, Clone)]
pub struct TriangleMesh {
    pub vertices: Vec<Vec3>,
    pub faces: Vec<[u32; 3]>,
    pub uvs: Option<Vec<Vec2>>,
}

/// Closest intersection of a ray with a single mesh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeshHit {
    pub location: Vec3,
    pub normal: Vec3,
    pub face_index: usize,
    pub distance: f32,
}

impl TriangleMesh {
    pub fn new(vertices: Vec<Vec3>, faces: Vec<[u32; 3]>) -> Self {
        Self {
            vertices,
            faces,
            uvs: None,
        }
    }

    /// A rectangle built from four corners in winding order, split into two
    /// triangles.
    pub fn quad(corners: [Vec3; 4]) -> Self {
        Self::new(corners.to_vec(), vec![[0, 1, 2], [0, 2, 3]])
    }

    pub fn with_uvs(mut self, uvs: Vec<Vec2>) -> Self {
        self.uvs = Some(uvs);
        self
    }

    fn corners(&self, face: [u32; 3]) -> [Vec3; 3] {
        [
            self.vertices[face[0] as usize],
            self.vertices[face[1] as usize],
            self.vertices[face[2] as usize],
        ]
    }

    /// Closest hit along `direction` (unit length) within `max_range`,
    /// Möller–Trumbore over every face. Both face sides intersect; the
    /// returned normal is the geometric one and may point away from the ray.
    pub fn closest_hit(&self, origin: Vec3, direction: Vec3, max_range: f32) -> Option<MeshHit> {
        let mut closest: Option<MeshHit> = None;
        let mut closest_distance = max_range;

        for (face_index, &face) in self.faces.iter().enumerate() {
            let [a, b, c] = self.corners(face);
            let edge1 = b - a;
            let edge2 = c - a;

            let p = direction.cross(edge2);
            let determinant = edge1.dot(p);
            if determinant.abs() < EPSILON {
                continue;
            }

            let inv_determinant = 1.0 / determinant;
            let s = origin - a;
            let u = s.dot(p) * inv_determinant;
            if !(0.0..=1.0).contains(&u) {
                continue;
            }

            let q = s.cross(edge1);
            let v = direction.dot(q) * inv_determinant;
            if v < 0.0 || u + v > 1.0 {
                continue;
            }

            let t = edge2.dot(q) * inv_determinant;
            if t > EPSILON && t < closest_distance {
                closest_distance = t;
                closest = Some(MeshHit {
                    location: origin + direction * t,
                    normal: edge1.cross(edge2).normalize(),
                    face_index,
                    distance: t,
                });
            }
        }

        closest
    }

    /// UV coordinate of a point on the given face, interpolated with
    /// barycentric weights of the face's vertices. `None` without a UV map.
    pub fn uv_at(&self, face_index: usize, point: Vec3) -> Option<Vec2> {
        let uvs = self.uvs.as_ref()?;
        let face = *self.faces.get(face_index)?;
        let [a, b, c] = self.corners(face);
        let weights = barycentric(point, a, b, c);

        Some(
            *uvs.get(face[0] as usize)? * weights.x
                + *uvs.get(face[1] as usize)? * weights.y
                + *uvs.get(face[2] as usize)? * weights.z,
        )
    }
}

/// Barycentric weights of `point` with respect to triangle `a`, `b`, `c`.
fn barycentric(point: Vec3, a: Vec3, b: Vec3, c: Vec3) -> Vec3 {
    let v0 = b - a;
    let v1 = c - a;
    let v2 = point - a;

    let d00 = v0.dot(v0);
    let d01 = v0.dot(v1);
    let d11 = v1.dot(v1);
    let d20 = v2.dot(v0);
    let d21 = v2.dot(v1);

    let denominator = d00 * d11 - d01 * d01;
    if denominator.abs() < EPSILON {
        return glam::vec3(1., 0., 0.);
    }

    let v = (d11 * d20 - d01 * d21) / denominator;
    let w = (d00 * d21 - d01 * d20) / denominator;

    glam::vec3(1.0 - v - w, v, w)
}
