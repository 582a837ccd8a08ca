use super::{Point3, Vector3, TOLERANCE};

/// Tests whether a triangle overlaps an axis-aligned box given by its
/// center and half extents.
///
/// Separating-axis test over the 13 candidate axes: the three box face
/// normals, the triangle normal, and the nine cross products of box axes
/// with triangle edges. Touching counts as overlapping.
#[must_use]
pub fn triangle_aabb_intersect(tri: &[Point3; 3], center: &Point3, half: &Vector3) -> bool {
    // Work in box-local coordinates.
    let v = [tri[0] - center, tri[1] - center, tri[2] - center];

    // Box face normals: plain interval overlap.
    for axis in 0..3 {
        let lo = v[0][axis].min(v[1][axis]).min(v[2][axis]);
        let hi = v[0][axis].max(v[1][axis]).max(v[2][axis]);
        if lo > half[axis] || hi < -half[axis] {
            return false;
        }
    }

    let edges = [v[1] - v[0], v[2] - v[1], v[0] - v[2]];

    // Triangle normal.
    let normal = edges[0].cross(&edges[1]);
    if normal.norm_squared() > TOLERANCE * TOLERANCE && separated_on(&normal, &v, half) {
        return false;
    }

    // Edge-edge axes.
    for edge in &edges {
        for axis in 0..3 {
            let dir = Vector3::ith(axis, 1.0).cross(edge);
            if dir.norm_squared() <= TOLERANCE * TOLERANCE {
                continue;
            }
            if separated_on(&dir, &v, half) {
                return false;
            }
        }
    }

    true
}

/// Returns `true` when the triangle projection on `axis` misses the box
/// projection.
fn separated_on(axis: &Vector3, v: &[Vector3; 3], half: &Vector3) -> bool {
    let p0 = axis.dot(&v[0]);
    let p1 = axis.dot(&v[1]);
    let p2 = axis.dot(&v[2]);
    let radius = half.x * axis.x.abs() + half.y * axis.y.abs() + half.z * axis.z.abs();
    p0.min(p1).min(p2) > radius || p0.max(p1).max(p2) < -radius
}

/// Result of casting a ray against a triangle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RayTriangleHit {
    /// The ray crosses the triangle interior at parameter `t`.
    Hit { t: f64 },
    /// The ray crosses the triangle plane within `edge_tolerance` of an edge
    /// or vertex, or runs inside the triangle plane.
    Grazing { t: f64 },
    /// No intersection.
    Miss,
}

/// Intersects the ray `origin + t * dir` with a triangle (Möller–Trumbore).
///
/// Barycentric coordinates closer than `edge_tolerance` to an edge are
/// reported as [`RayTriangleHit::Grazing`] so callers can retry with another
/// direction.
#[must_use]
pub fn ray_triangle_intersect(
    origin: &Point3,
    dir: &Vector3,
    tri: &[Point3; 3],
    edge_tolerance: f64,
) -> RayTriangleHit {
    let e1 = tri[1] - tri[0];
    let e2 = tri[2] - tri[0];
    let pvec = dir.cross(&e2);
    let det = e1.dot(&pvec);

    if det.abs() < TOLERANCE {
        // Ray parallel to the plane: grazing if it lies in it.
        let normal = e1.cross(&e2);
        let offset = normal.dot(&(origin - tri[0]));
        let n = normal.norm();
        if n > TOLERANCE && (offset / n).abs() < TOLERANCE {
            return RayTriangleHit::Grazing { t: 0.0 };
        }
        return RayTriangleHit::Miss;
    }

    let inv_det = 1.0 / det;
    let tvec = origin - tri[0];
    let u = tvec.dot(&pvec) * inv_det;
    if u < -edge_tolerance || u > 1.0 + edge_tolerance {
        return RayTriangleHit::Miss;
    }
    let qvec = tvec.cross(&e1);
    let v = dir.dot(&qvec) * inv_det;
    if v < -edge_tolerance || u + v > 1.0 + edge_tolerance {
        return RayTriangleHit::Miss;
    }
    let t = e2.dot(&qvec) * inv_det;

    if u < edge_tolerance || v < edge_tolerance || u + v > 1.0 - edge_tolerance {
        RayTriangleHit::Grazing { t }
    } else {
        RayTriangleHit::Hit { t }
    }
}
