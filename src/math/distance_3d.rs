use super::{Point3, TOLERANCE};

/// Closest point to `p` on the segment `[a, b]`.
#[must_use]
pub fn closest_point_on_segment(p: &Point3, a: &Point3, b: &Point3) -> Point3 {
    let ab = b - a;
    let len_sq = ab.norm_squared();
    if len_sq < TOLERANCE * TOLERANCE {
        return *a;
    }
    let t = ((p - a).dot(&ab) / len_sq).clamp(0.0, 1.0);
    a + ab * t
}

/// Distance from `p` to the segment `[a, b]`.
#[must_use]
pub fn point_segment_distance(p: &Point3, a: &Point3, b: &Point3) -> f64 {
    (p - closest_point_on_segment(p, a, b)).norm()
}

/// Closest point to `p` on the triangle `tri`.
///
/// Voronoi-region walk over vertices, edges and face.
#[must_use]
pub fn closest_point_on_triangle(p: &Point3, tri: &[Point3; 3]) -> Point3 {
    let [a, b, c] = tri;
    let ab = b - a;
    let ac = c - a;
    let ap = p - a;

    let d1 = ab.dot(&ap);
    let d2 = ac.dot(&ap);
    if d1 <= 0.0 && d2 <= 0.0 {
        return *a;
    }

    let bp = p - b;
    let d3 = ab.dot(&bp);
    let d4 = ac.dot(&bp);
    if d3 >= 0.0 && d4 <= d3 {
        return *b;
    }

    let vc = d1 * d4 - d3 * d2;
    if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
        let along = d1 / (d1 - d3);
        return a + ab * along;
    }

    let cp = p - c;
    let d5 = ab.dot(&cp);
    let d6 = ac.dot(&cp);
    if d6 >= 0.0 && d5 <= d6 {
        return *c;
    }

    let vb = d5 * d2 - d1 * d6;
    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
        let along = d2 / (d2 - d6);
        return a + ac * along;
    }

    let va = d3 * d6 - d5 * d4;
    if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
        let along = (d4 - d3) / ((d4 - d3) + (d5 - d6));
        return b + (c - b) * along;
    }

    let denom = 1.0 / (va + vb + vc);
    let bary_b = vb * denom;
    let bary_c = vc * denom;
    a + ab * bary_b + ac * bary_c
}

/// Distance from `p` to the triangle `tri`.
#[must_use]
pub fn point_triangle_distance(p: &Point3, tri: &[Point3; 3]) -> f64 {
    (p - closest_point_on_triangle(p, tri)).norm()
}
