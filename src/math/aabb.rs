use super::{Point3, Vector3};

/// Axis-aligned bounding box.
///
/// A box whose `min` exceeds its `max` on any axis is empty; [`Aabb::empty`]
/// is the identity for [`Aabb::merged`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Aabb {
    pub min: Point3,
    pub max: Point3,
}

impl Default for Aabb {
    fn default() -> Self {
        Self::empty()
    }
}

impl Aabb {
    /// Creates a box from its two corners.
    #[must_use]
    pub fn new(min: Point3, max: Point3) -> Self {
        Self { min, max }
    }

    /// The empty box.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            min: Point3::new(f64::INFINITY, f64::INFINITY, f64::INFINITY),
            max: Point3::new(f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    /// Creates a box centered at `center` with the given half extents.
    #[must_use]
    pub fn from_half_extents(center: Point3, half: Vector3) -> Self {
        Self {
            min: center - half,
            max: center + half,
        }
    }

    /// Smallest box enclosing every point of the iterator.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Point3>) -> Self {
        let mut aabb = Self::empty();
        for p in points {
            aabb.grow(p);
        }
        aabb
    }

    /// Returns `true` when the box is non-empty and finite.
    #[must_use]
    pub fn is_valid(&self) -> bool {
        (0..3).all(|i| {
            self.min[i].is_finite() && self.max[i].is_finite() && self.min[i] <= self.max[i]
        })
    }

    /// Edge lengths along x, y, z.
    #[must_use]
    pub fn extents(&self) -> Vector3 {
        self.max - self.min
    }

    #[must_use]
    pub fn half_extents(&self) -> Vector3 {
        self.extents() * 0.5
    }

    #[must_use]
    pub fn center(&self) -> Point3 {
        nalgebra::center(&self.min, &self.max)
    }

    #[must_use]
    pub fn diagonal_length(&self) -> f64 {
        self.extents().norm()
    }

    /// Extends the box to enclose `p`.
    pub fn grow(&mut self, p: &Point3) {
        self.min = self.min.inf(p);
        self.max = self.max.sup(p);
    }

    /// Union of two boxes.
    #[must_use]
    pub fn merged(&self, other: &Self) -> Self {
        Self {
            min: self.min.inf(&other.min),
            max: self.max.sup(&other.max),
        }
    }

    /// Box enlarged by `margin` on every side.
    #[must_use]
    pub fn inflated(&self, margin: f64) -> Self {
        let m = Vector3::repeat(margin);
        Self {
            min: self.min - m,
            max: self.max + m,
        }
    }

    /// Returns `true` when `other` lies inside this box, allowing `tolerance`
    /// of overhang on every side.
    #[must_use]
    pub fn contains_aabb(&self, other: &Self, tolerance: f64) -> bool {
        (0..3).all(|i| {
            other.min[i] >= self.min[i] - tolerance && other.max[i] <= self.max[i] + tolerance
        })
    }

    #[must_use]
    pub fn contains_point(&self, p: &Point3, tolerance: f64) -> bool {
        (0..3).all(|i| p[i] >= self.min[i] - tolerance && p[i] <= self.max[i] + tolerance)
    }

    /// Component-wise comparison of both corners.
    #[must_use]
    pub fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (0..3).all(|i| {
            (self.min[i] - other.min[i]).abs() <= tolerance
                && (self.max[i] - other.max[i]).abs() <= tolerance
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    #[test]
    fn empty_box_is_invalid() {
        assert!(!Aabb::empty().is_valid());
        assert!(!Aabb::default().is_valid());
    }

    #[test]
    fn from_points_encloses_all() {
        let pts = [p(1.0, -2.0, 0.0), p(-1.0, 3.0, 5.0), p(0.0, 0.0, -4.0)];
        let b = Aabb::from_points(&pts);
        assert!(b.is_valid());
        assert_eq!(b.min, p(-1.0, -2.0, -4.0));
        assert_eq!(b.max, p(1.0, 3.0, 5.0));
    }

    #[test]
    fn merged_with_empty_is_identity() {
        let b = Aabb::new(p(0.0, 0.0, 0.0), p(1.0, 2.0, 3.0));
        assert_eq!(b.merged(&Aabb::empty()), b);
        assert_eq!(Aabb::empty().merged(&b), b);
    }

    #[test]
    fn extents_center_and_diagonal() {
        let b = Aabb::new(p(0.0, 0.0, 0.0), p(2.0, 4.0, 4.0));
        assert_relative_eq!(b.extents().y, 4.0);
        assert_relative_eq!(b.center().x, 1.0);
        assert_relative_eq!(b.diagonal_length(), 6.0);
    }

    #[test]
    fn containment_honours_tolerance() {
        let outer = Aabb::new(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0));
        let inner = Aabb::new(p(-1e-12, 0.0, 0.0), p(10.0, 5.0, 5.0));
        assert!(outer.contains_aabb(&inner, 1e-10));
        assert!(!outer.contains_aabb(&inner.inflated(1.0), 1e-10));
        assert!(outer.contains_point(&p(10.0, 10.0, 10.0), 0.0));
        assert!(!outer.contains_point(&p(10.1, 0.0, 0.0), 0.0));
    }
}
