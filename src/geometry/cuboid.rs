use crate::error::{GeometryError, Result};
use crate::math::{Aabb, Isometry3, Point3, Vector3};
use crate::tessellation::{MeshParams, TriangleMesh};

use super::Solid;

/// Entries of a rotation matrix this close to 0 or ±1 count as exact.
const AXIS_EPS: f64 = 1e-12;

/// A rectangular box with a rigid placement.
#[derive(Debug, Clone)]
pub struct Cuboid {
    half_extents: Vector3,
    placement: Isometry3,
}

impl Cuboid {
    /// Axis-aligned box spanning `min..max`.
    ///
    /// # Errors
    ///
    /// Returns an error if any edge length is not positive.
    pub fn new(min: Point3, max: Point3) -> Result<Self> {
        let half = (max - min) * 0.5;
        let center = nalgebra::center(&min, &max);
        Self::with_placement(half, Isometry3::translation(center.x, center.y, center.z))
    }

    /// Box with the given half extents, centered on the placement origin.
    ///
    /// # Errors
    ///
    /// Returns an error if any half extent is not positive.
    pub fn with_placement(half_extents: Vector3, placement: Isometry3) -> Result<Self> {
        for (i, name) in ["half_extents.x", "half_extents.y", "half_extents.z"]
            .into_iter()
            .enumerate()
        {
            let value = half_extents[i];
            if !(value > 0.0 && value.is_finite()) {
                return Err(GeometryError::NonPositive {
                    parameter: name,
                    value,
                }
                .into());
            }
        }
        Ok(Self {
            half_extents,
            placement,
        })
    }

    #[must_use]
    pub fn half_extents(&self) -> &Vector3 {
        &self.half_extents
    }

    #[must_use]
    pub fn placement(&self) -> &Isometry3 {
        &self.placement
    }

    /// World-space corners, indexed by bit pattern `(x, y, z)` of the sign.
    fn corners(&self) -> [Point3; 8] {
        let h = self.half_extents;
        std::array::from_fn(|bits| {
            let sx = if bits & 1 == 0 { -h.x } else { h.x };
            let sy = if bits & 2 == 0 { -h.y } else { h.y };
            let sz = if bits & 4 == 0 { -h.z } else { h.z };
            self.placement * Point3::new(sx, sy, sz)
        })
    }

    fn is_axis_aligned(&self) -> bool {
        self.placement
            .rotation
            .to_rotation_matrix()
            .matrix()
            .iter()
            .all(|v| v.abs() < AXIS_EPS || (v.abs() - 1.0).abs() < AXIS_EPS)
    }
}

/// Face loops over corner indices, counter-clockwise seen from outside.
const FACES: [[usize; 4]; 6] = [
    [0, 4, 6, 2], // -x
    [1, 3, 7, 5], // +x
    [0, 1, 5, 4], // -y
    [2, 6, 7, 3], // +y
    [0, 2, 3, 1], // -z
    [4, 5, 7, 6], // +z
];

impl Solid for Cuboid {
    fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.corners())
    }

    fn contains_point(&self, point: &Point3, tolerance: f64, include_boundary: bool) -> bool {
        let local = self.placement.inverse_transform_point(point);
        if include_boundary {
            (0..3).all(|i| local[i].abs() <= self.half_extents[i] + tolerance)
        } else {
            (0..3).all(|i| local[i].abs() < self.half_extents[i] - tolerance)
        }
    }

    #[allow(clippy::cast_possible_truncation)]
    fn triangulate(&self, _params: &MeshParams) -> Result<TriangleMesh> {
        let corners = self.corners();
        let mut mesh = TriangleMesh::default();
        for quad in &FACES {
            let [a, b, c, d] = quad.map(|i| corners[i]);
            let normal = (b - a).cross(&(c - a)).normalize();
            let base = mesh.vertices.len() as u32;
            mesh.vertices.extend([a, b, c, d]);
            mesh.normals.extend([normal; 4]);
            mesh.indices.push([base, base + 1, base + 2]);
            mesh.indices.push([base, base + 2, base + 3]);
        }
        Ok(mesh)
    }

    fn as_axis_aligned_box(&self) -> Option<Aabb> {
        self.is_axis_aligned().then(|| self.bounding_box())
    }
}
