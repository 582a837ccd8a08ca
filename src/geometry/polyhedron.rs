use crate::error::{GeometryError, Result};
use crate::math::distance_3d::point_triangle_distance;
use crate::math::intersect_3d::{ray_triangle_intersect, RayTriangleHit};
use crate::math::{Aabb, Point3, Vector3, TOLERANCE};
use crate::tessellation::{MeshParams, TessellateFace, TriangleMesh};

use super::{PlanarFace, Solid};

/// Ray directions tried in turn when classifying a point. Skewed so that
/// rays from voxel centers do not run along the diagonals of axis-aligned
/// quads.
const RAY_DIRECTIONS: [[f64; 3]; 4] = [
    [1.0, 0.317_2, 0.128_9],
    [0.273_1, 1.0, 0.311_7],
    [0.163_5, 0.243_9, 1.0],
    [-0.579_3, 0.691_1, -1.0],
];

/// Barycentric margin within which a ray hit counts as grazing an edge.
const EDGE_TOLERANCE: f64 = 1e-9;

/// A closed, consistently oriented triangle mesh.
///
/// Membership is decided by ray casting against the triangles; points within
/// the tolerance of any triangle are on the boundary.
#[derive(Debug, Clone)]
pub struct Polyhedron {
    vertices: Vec<Point3>,
    triangles: Vec<[u32; 3]>,
    bbox: Aabb,
}

/// Classification of a point relative to a polyhedron.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointClassification {
    Inside,
    Outside,
    OnBoundary,
}

impl Polyhedron {
    /// Creates a polyhedron from vertices and outward-facing triangles.
    ///
    /// # Errors
    ///
    /// Returns an error if there are fewer than four triangles or an index
    /// is out of range.
    pub fn from_mesh(vertices: Vec<Point3>, triangles: Vec<[u32; 3]>) -> Result<Self> {
        if triangles.len() < 4 {
            return Err(GeometryError::Degenerate(format!(
                "closed mesh needs at least 4 triangles, got {}",
                triangles.len()
            ))
            .into());
        }
        let n = vertices.len();
        if triangles.iter().flatten().any(|&i| i as usize >= n) {
            return Err(GeometryError::Degenerate("triangle index out of range".into()).into());
        }
        let bbox = Aabb::from_points(&vertices);
        Ok(Self {
            vertices,
            triangles,
            bbox,
        })
    }

    /// Creates a polyhedron bounded by planar faces whose normals point
    /// outward.
    ///
    /// # Errors
    ///
    /// Returns an error if a face cannot be triangulated or the result is
    /// not a valid closed mesh.
    pub fn from_faces(faces: &[PlanarFace]) -> Result<Self> {
        let mut mesh = TriangleMesh::default();
        for face in faces {
            mesh.merge(&TessellateFace::new(face).execute()?);
        }
        Self::from_mesh(mesh.vertices, mesh.indices)
    }

    /// Prism swept from `profile` along `direction`.
    ///
    /// # Errors
    ///
    /// Returns an error if `direction` is parallel to the profile plane.
    pub fn extrude(profile: &PlanarFace, direction: Vector3) -> Result<Self> {
        let along = profile.normal().dot(&direction);
        if along.abs() < TOLERANCE {
            return Err(
                GeometryError::Degenerate("extrusion direction lies in the profile plane".into())
                    .into(),
            );
        }
        // Loop wound counter-clockwise around `direction`.
        let base = if along > 0.0 {
            profile.clone()
        } else {
            profile.reversed()?
        };
        let ring = base.vertices();
        let n = ring.len();

        let mut faces = Vec::with_capacity(n + 2);
        faces.push(base.reversed()?);
        faces.push(base.translated(&direction));
        for i in 0..n {
            let a = ring[i];
            let b = ring[(i + 1) % n];
            faces.push(PlanarFace::new(vec![a, b, b + direction, a + direction])?);
        }
        Self::from_faces(&faces)
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    #[must_use]
    pub fn triangles(&self) -> &[[u32; 3]] {
        &self.triangles
    }

    fn triangle(&self, t: &[u32; 3]) -> [Point3; 3] {
        [
            self.vertices[t[0] as usize],
            self.vertices[t[1] as usize],
            self.vertices[t[2] as usize],
        ]
    }

    /// Classifies a point as inside, outside, or within `tolerance` of the
    /// surface.
    #[must_use]
    pub fn classify(&self, point: &Point3, tolerance: f64) -> PointClassification {
        if !self.bbox.contains_point(point, tolerance) {
            return PointClassification::Outside;
        }
        let on_surface = self
            .triangles
            .iter()
            .any(|t| point_triangle_distance(point, &self.triangle(t)) <= tolerance);
        if on_surface {
            return PointClassification::OnBoundary;
        }

        for dir in &RAY_DIRECTIONS {
            let dir = Vector3::from(*dir).normalize();
            if let Some(inside) = self.ray_parity(point, &dir) {
                return if inside {
                    PointClassification::Inside
                } else {
                    PointClassification::Outside
                };
            }
        }

        // Every direction grazed an edge; treat as outside.
        PointClassification::Outside
    }

    /// Odd crossing count along `dir`, or `None` when the ray grazes an edge.
    fn ray_parity(&self, point: &Point3, dir: &Vector3) -> Option<bool> {
        let mut crossings = 0u32;
        for t in &self.triangles {
            match ray_triangle_intersect(point, dir, &self.triangle(t), EDGE_TOLERANCE) {
                RayTriangleHit::Hit { t } if t > 0.0 => crossings += 1,
                RayTriangleHit::Grazing { t } if t >= 0.0 => return None,
                _ => {}
            }
        }
        Some(crossings % 2 == 1)
    }
}

impl Solid for Polyhedron {
    fn bounding_box(&self) -> Aabb {
        self.bbox
    }

    fn contains_point(&self, point: &Point3, tolerance: f64, include_boundary: bool) -> bool {
        match self.classify(point, tolerance) {
            PointClassification::Inside => true,
            PointClassification::Outside => false,
            PointClassification::OnBoundary => include_boundary,
        }
    }

    fn triangulate(&self, _params: &MeshParams) -> Result<TriangleMesh> {
        let mut mesh = TriangleMesh::default();
        for t in &self.triangles {
            let [a, b, c] = self.triangle(t);
            let normal = (b - a).cross(&(c - a));
            let normal = if normal.norm() > TOLERANCE {
                normal.normalize()
            } else {
                Vector3::zeros()
            };
            let base = u32::try_from(mesh.vertices.len()).map_err(|_| {
                GeometryError::Degenerate("mesh exceeds u32 vertex indices".into())
            })?;
            mesh.vertices.extend([a, b, c]);
            mesh.normals.extend([normal; 3]);
            mesh.indices.push([base, base + 1, base + 2]);
        }
        Ok(mesh)
    }
}
