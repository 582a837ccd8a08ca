use std::f64::consts::{PI, TAU};

use crate::error::{GeometryError, Result};
use crate::math::{Aabb, Point3, Vector3};
use crate::tessellation::{MeshParams, TriangleMesh};

use super::Solid;

/// A ball of given center and radius.
#[derive(Debug, Clone)]
pub struct Sphere {
    center: Point3,
    radius: f64,
}

impl Sphere {
    /// # Errors
    ///
    /// Returns an error if the radius is not positive.
    pub fn new(center: Point3, radius: f64) -> Result<Self> {
        if !(radius > 0.0 && radius.is_finite()) {
            return Err(GeometryError::NonPositive {
                parameter: "radius",
                value: radius,
            }
            .into());
        }
        Ok(Self { center, radius })
    }

    #[must_use]
    pub fn center(&self) -> &Point3 {
        &self.center
    }

    #[must_use]
    pub fn radius(&self) -> f64 {
        self.radius
    }

    fn point_at(&self, u: f64, v: f64) -> (Point3, Vector3) {
        let n = Vector3::new(v.sin() * u.cos(), v.sin() * u.sin(), v.cos());
        (self.center + n * self.radius, n)
    }
}

impl Solid for Sphere {
    fn bounding_box(&self) -> Aabb {
        Aabb::from_half_extents(self.center, Vector3::repeat(self.radius))
    }

    fn contains_point(&self, point: &Point3, tolerance: f64, include_boundary: bool) -> bool {
        let d = (point - self.center).norm();
        if include_boundary {
            d <= self.radius + tolerance
        } else {
            d < self.radius - tolerance
        }
    }

    /// Latitude/longitude grid with pole fans. Vertices lie on the sphere and
    /// a facet sags about twice as deep as its edges, so edges are sized for
    /// half the requested deflection.
    #[allow(clippy::cast_possible_truncation, clippy::cast_precision_loss)]
    fn triangulate(&self, params: &MeshParams) -> Result<TriangleMesh> {
        let edge_params = MeshParams {
            linear_deflection: params.linear_deflection * 0.5,
            ..*params
        };
        let n_u = edge_params.angular_segments(self.radius, TAU).max(3);
        let n_v = edge_params.angular_segments(self.radius, PI).max(2);

        let mut mesh = TriangleMesh::default();
        let (north, n_north) = self.point_at(0.0, 0.0);
        mesh.vertices.push(north);
        mesh.normals.push(n_north);

        for j in 1..n_v {
            let lat = PI * j as f64 / n_v as f64;
            for i in 0..n_u {
                let lon = TAU * i as f64 / n_u as f64;
                let (vertex, normal) = self.point_at(lon, lat);
                mesh.vertices.push(vertex);
                mesh.normals.push(normal);
            }
        }

        let (south, n_south) = self.point_at(0.0, PI);
        mesh.vertices.push(south);
        mesh.normals.push(n_south);
        let south_idx = (mesh.vertices.len() - 1) as u32;

        let ring = |j: usize, i: usize| -> u32 { (1 + (j - 1) * n_u + i % n_u) as u32 };

        for i in 0..n_u {
            mesh.indices.push([0, ring(1, i), ring(1, i + 1)]);
        }
        for j in 1..n_v - 1 {
            for i in 0..n_u {
                let upper = ring(j, i);
                let lower = ring(j + 1, i);
                let lower_next = ring(j + 1, i + 1);
                let upper_next = ring(j, i + 1);
                mesh.indices.push([upper, lower, lower_next]);
                mesh.indices.push([upper, lower_next, upper_next]);
            }
        }
        for i in 0..n_u {
            mesh.indices.push([south_idx, ring(n_v - 1, i + 1), ring(n_v - 1, i)]);
        }

        Ok(mesh)
    }
}
