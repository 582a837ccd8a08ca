use crate::error::{GeometryError, Result};
use crate::math::polygon_3d::point_polygon_distance;
use crate::math::{Aabb, Point3, Vector3, TOLERANCE};

use super::Plane;

/// A planar polygon with an orientation given by its vertex order.
///
/// Used for voxel shell quads, port contact faces and capacitance panels.
#[derive(Debug, Clone)]
pub struct PlanarFace {
    vertices: Vec<Point3>,
    plane: Plane,
    area: f64,
}

impl PlanarFace {
    /// Creates a face from a closed loop of vertices (last vertex not
    /// repeated). The normal follows the right-hand rule.
    ///
    /// # Errors
    ///
    /// Returns an error if fewer than three vertices are given or the loop
    /// encloses no area.
    pub fn new(vertices: Vec<Point3>) -> Result<Self> {
        if vertices.len() < 3 {
            return Err(GeometryError::Degenerate(format!(
                "face needs at least 3 vertices, got {}",
                vertices.len()
            ))
            .into());
        }
        let newell = newell_vector(&vertices);
        let len = newell.norm();
        if len < TOLERANCE {
            return Err(GeometryError::Degenerate("face encloses no area".into()).into());
        }
        let plane = Plane::from_normal(vertices[0], newell)?;
        Ok(Self {
            vertices,
            plane,
            area: len * 0.5,
        })
    }

    #[must_use]
    pub fn vertices(&self) -> &[Point3] {
        &self.vertices
    }

    #[must_use]
    pub fn plane(&self) -> &Plane {
        &self.plane
    }

    /// Unit normal.
    #[must_use]
    pub fn normal(&self) -> Vector3 {
        *self.plane.plane_normal()
    }

    #[must_use]
    pub fn area(&self) -> f64 {
        self.area
    }

    /// Vertex average.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn centroid(&self) -> Point3 {
        let sum = self
            .vertices
            .iter()
            .fold(Vector3::zeros(), |acc, p| acc + p.coords);
        Point3::from(sum / self.vertices.len() as f64)
    }

    /// Mean edge length.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean_edge_length(&self) -> f64 {
        let n = self.vertices.len();
        let total: f64 = (0..n)
            .map(|i| (self.vertices[(i + 1) % n] - self.vertices[i]).norm())
            .sum();
        total / n as f64
    }

    #[must_use]
    pub fn bounding_box(&self) -> Aabb {
        Aabb::from_points(&self.vertices)
    }

    /// Exact distance from `p` to the face (interior included).
    #[must_use]
    pub fn distance_to_point(&self, p: &Point3) -> f64 {
        point_polygon_distance(p, &self.vertices, &self.plane)
    }

    /// The same face with opposite orientation.
    ///
    /// # Errors
    ///
    /// Never fails for a face that was valid to begin with; the `Result`
    /// mirrors [`PlanarFace::new`].
    pub fn reversed(&self) -> Result<Self> {
        Self::new(self.vertices.iter().rev().copied().collect())
    }

    /// The face moved by `offset`.
    #[must_use]
    pub fn translated(&self, offset: &Vector3) -> Self {
        let vertices: Vec<Point3> = self.vertices.iter().map(|p| p + offset).collect();
        let mut plane = self.plane.clone();
        plane.translate(offset);
        Self {
            vertices,
            plane,
            area: self.area,
        }
    }
}

/// Newell's method: normal scaled by twice the enclosed area.
fn newell_vector(points: &[Point3]) -> Vector3 {
    let n = points.len();
    let mut normal = Vector3::zeros();
    for i in 0..n {
        let curr = &points[i];
        let next = &points[(i + 1) % n];
        normal.x += (curr.y - next.y) * (curr.z + next.z);
        normal.y += (curr.z - next.z) * (curr.x + next.x);
        normal.z += (curr.x - next.x) * (curr.y + next.y);
    }
    normal
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn unit_square() -> PlanarFace {
        PlanarFace::new(vec![
            p(0.0, 0.0, 0.0),
            p(1.0, 0.0, 0.0),
            p(1.0, 1.0, 0.0),
            p(0.0, 1.0, 0.0),
        ])
        .unwrap()
    }

    #[test]
    fn normal_follows_vertex_order() {
        let face = unit_square();
        assert_relative_eq!(face.normal(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(face.reversed().unwrap().normal(), -Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(face.area(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn collinear_points_are_rejected() {
        let res = PlanarFace::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(2.0, 0.0, 0.0)]);
        assert!(res.is_err());
        assert!(PlanarFace::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0)]).is_err());
    }

    #[test]
    fn centroid_and_edge_length() {
        let face = unit_square();
        assert_relative_eq!(face.centroid(), p(0.5, 0.5, 0.0), epsilon = 1e-12);
        assert_relative_eq!(face.mean_edge_length(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn distance_covers_interior_and_outside() {
        let face = unit_square();
        assert_relative_eq!(face.distance_to_point(&p(0.5, 0.5, 2.0)), 2.0, epsilon = 1e-12);
        assert_relative_eq!(face.distance_to_point(&p(2.0, 0.5, 0.0)), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn translated_face_keeps_orientation() {
        let moved = unit_square().translated(&Vector3::new(0.0, 0.0, 3.0));
        assert_relative_eq!(moved.normal(), Vector3::z(), epsilon = 1e-12);
        assert_relative_eq!(moved.distance_to_point(&p(0.5, 0.5, 3.0)), 0.0, epsilon = 1e-12);
    }
}
