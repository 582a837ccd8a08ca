use crate::geometry::Plane;

use super::distance_3d::point_segment_distance;
use super::Point3;

/// Projects a 3D point onto the UV coordinate system of a plane.
fn project_to_uv(point: &Point3, plane: &Plane) -> (f64, f64) {
    let diff = point - plane.origin();
    (diff.dot(plane.u_dir()), diff.dot(plane.v_dir()))
}

/// Point-in-polygon test for the projection of a point onto the polygon's
/// plane.
///
/// Winding number in the plane's UV space. Returns `true` if the projection
/// is inside or on the boundary.
#[must_use]
pub fn point_in_polygon_3d(point: &Point3, polygon: &[Point3], plane: &Plane) -> bool {
    if polygon.len() < 3 {
        return false;
    }

    let (px, py) = project_to_uv(point, plane);
    let uvs: Vec<(f64, f64)> = polygon.iter().map(|p| project_to_uv(p, plane)).collect();

    winding_number_2d(px, py, &uvs) != 0
}

/// Exact distance from a point to a planar polygon (interior included).
#[must_use]
pub fn point_polygon_distance(point: &Point3, polygon: &[Point3], plane: &Plane) -> f64 {
    if point_in_polygon_3d(point, polygon, plane) {
        return plane.signed_distance(point).abs();
    }
    let n = polygon.len();
    (0..n)
        .map(|i| point_segment_distance(point, &polygon[i], &polygon[(i + 1) % n]))
        .fold(f64::INFINITY, f64::min)
}

/// Winding number of point `(px, py)` with respect to polygon `verts`.
///
/// Non-zero => inside, zero => outside.
fn winding_number_2d(px: f64, py: f64, verts: &[(f64, f64)]) -> i32 {
    let n = verts.len();
    let mut winding = 0i32;
    for i in 0..n {
        let (x0, y0) = verts[i];
        let (x1, y1) = verts[(i + 1) % n];
        let side = (x1 - x0) * (py - y0) - (y1 - y0) * (px - x0);

        if y0 <= py {
            if y1 > py && side > 0.0 {
                winding += 1;
            }
        } else if y1 <= py && side < 0.0 {
            winding -= 1;
        }
    }
    winding
}
