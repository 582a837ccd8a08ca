mod tessellate_face;

pub use tessellate_face::TessellateFace;

use crate::math::{Aabb, Point3, Vector3};

/// Parameters controlling tessellation quality.
#[derive(Debug, Clone, Copy)]
pub struct MeshParams {
    /// Maximum allowed chord deviation from the true surface.
    pub linear_deflection: f64,
    /// Maximum angle (radians) subtended by one facet of a curved surface.
    pub angular_deflection: f64,
    /// Minimum number of facets around a curved surface.
    pub min_segments: usize,
    /// Maximum number of facets around a curved surface.
    pub max_segments: usize,
}

impl Default for MeshParams {
    fn default() -> Self {
        Self {
            linear_deflection: 0.01,
            angular_deflection: 30f64.to_radians(),
            min_segments: 4,
            max_segments: 512,
        }
    }
}

impl MeshParams {
    /// Parameters used when voxelizing at pitch `delta`: linear deflection
    /// of one fifth of a voxel, 30 degrees of angular deflection.
    #[must_use]
    pub fn for_pitch(delta: f64) -> Self {
        Self {
            linear_deflection: delta / 5.0,
            ..Self::default()
        }
    }

    /// Number of segments needed to approximate an arc of `radius` sweeping
    /// `sweep` radians within both deflection limits.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn angular_segments(&self, radius: f64, sweep: f64) -> usize {
        let by_angle = (sweep / self.angular_deflection).ceil() as usize;
        let by_chord = if radius > self.linear_deflection {
            let half_angle = (1.0 - self.linear_deflection / radius).acos();
            (sweep / (2.0 * half_angle)).ceil() as usize
        } else {
            self.min_segments
        };
        by_angle
            .max(by_chord)
            .clamp(self.min_segments, self.max_segments)
    }
}

/// A triangle mesh approximation of a surface.
#[derive(Debug, Clone, Default)]
pub struct TriangleMesh {
    /// Vertex positions.
    pub vertices: Vec<Point3>,
    /// Vertex normals.
    pub normals: Vec<Vector3>,
    /// Triangle indices, counter-clockwise seen from outside.
    pub indices: Vec<[u32; 3]>,
}

impl TriangleMesh {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.indices.is_empty()
    }

    #[must_use]
    pub fn triangle_count(&self) -> usize {
        self.indices.len()
    }

    /// Iterates over the triangles as vertex triples.
    pub fn triangles(&self) -> impl Iterator<Item = [Point3; 3]> + '_ {
        self.indices.iter().map(|tri| {
            [
                self.vertices[tri[0] as usize],
                self.vertices[tri[1] as usize],
                self.vertices[tri[2] as usize],
            ]
        })
    }

    /// Appends another mesh, re-indexing its triangles.
    #[allow(clippy::cast_possible_truncation)]
    pub fn merge(&mut self, other: &Self) {
        let offset = self.vertices.len() as u32;
        self.vertices.extend_from_slice(&other.vertices);
        self.normals.extend_from_slice(&other.normals);
        self.indices.extend(
            other
                .indices
                .iter()
                .map(|t| [t[0] + offset, t[1] + offset, t[2] + offset]),
        );
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }
}
