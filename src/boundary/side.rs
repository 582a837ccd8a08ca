use std::fmt;
use std::str::FromStr;

use crate::grid::{GridIndex, VoxelIndex};
use crate::math::{Point3, Vector3};

/// One of the six faces of a voxel, in the solver's order
/// `+x, -x, +y, -y, +z, -z`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Side {
    PosX,
    NegX,
    PosY,
    NegY,
    PosZ,
    NegZ,
}

impl Side {
    pub const ALL: [Self; 6] = [
        Self::PosX,
        Self::NegX,
        Self::PosY,
        Self::NegY,
        Self::PosZ,
        Self::NegZ,
    ];

    /// Position in [`Side::ALL`].
    #[must_use]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Axis the side is normal to (0 = x).
    #[must_use]
    pub fn axis(self) -> usize {
        self.index() / 2
    }

    #[must_use]
    pub fn is_positive(self) -> bool {
        matches!(self, Self::PosX | Self::PosY | Self::PosZ)
    }

    /// Side facing `axis` in the given direction.
    #[must_use]
    pub fn from_axis(axis: usize, positive: bool) -> Self {
        Self::ALL[axis * 2 + usize::from(!positive)]
    }

    #[must_use]
    pub fn opposite(self) -> Self {
        Self::from_axis(self.axis(), !self.is_positive())
    }

    /// Outward unit normal.
    #[must_use]
    pub fn normal(self) -> Vector3 {
        let sign = if self.is_positive() { 1.0 } else { -1.0 };
        Vector3::ith(self.axis(), sign)
    }

    /// Index of the face neighbour across this side, `None` below zero.
    #[must_use]
    pub fn neighbor(self, idx: &VoxelIndex) -> Option<VoxelIndex> {
        let mut n = *idx;
        let axis = self.axis();
        if self.is_positive() {
            n[axis] += 1;
        } else {
            n[axis] = n[axis].checked_sub(1)?;
        }
        Some(n)
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::PosX => "+x",
            Self::NegX => "-x",
            Self::PosY => "+y",
            Self::NegY => "-y",
            Self::PosZ => "+z",
            Self::NegZ => "-z",
        }
    }

    /// Corner offsets of the side, in voxel units, counter-clockwise seen
    /// from outside.
    fn unit_corners(self) -> [[f64; 3]; 4] {
        match self {
            Self::PosX => [[1., 0., 0.], [1., 1., 0.], [1., 1., 1.], [1., 0., 1.]],
            Self::NegX => [[0., 0., 0.], [0., 0., 1.], [0., 1., 1.], [0., 1., 0.]],
            Self::PosY => [[0., 1., 0.], [0., 1., 1.], [1., 1., 1.], [1., 1., 0.]],
            Self::NegY => [[0., 0., 0.], [1., 0., 0.], [1., 0., 1.], [0., 0., 1.]],
            Self::PosZ => [[0., 0., 1.], [1., 0., 1.], [1., 1., 1.], [0., 1., 1.]],
            Self::NegZ => [[0., 0., 0.], [0., 1., 0.], [1., 1., 0.], [1., 0., 0.]],
        }
    }
}

impl fmt::Display for Side {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Side {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|side| side.as_str() == s)
            .ok_or_else(|| format!("unknown voxel side '{s}'"))
    }
}

/// A single external side of a voxel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct VoxelFace {
    pub voxel: VoxelIndex,
    pub side: Side,
}

impl VoxelFace {
    #[must_use]
    pub fn new(voxel: VoxelIndex, side: Side) -> Self {
        Self { voxel, side }
    }

    /// World-space corners, counter-clockwise seen from outside.
    #[must_use]
    pub fn corners(&self, grid: &GridIndex) -> [Point3; 4] {
        let base = grid.corner_of_voxel(&self.voxel);
        let delta = grid.delta();
        self.side
            .unit_corners()
            .map(|c| base + Vector3::from(c) * delta)
    }

    /// World-space center of the side.
    #[must_use]
    pub fn center(&self, grid: &GridIndex) -> Point3 {
        grid.center_of_voxel(&self.voxel) + self.side.normal() * (grid.delta() * 0.5)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::math::Aabb;
    use approx::assert_relative_eq;

    fn grid() -> GridIndex {
        GridIndex::new(&Aabb::new(Point3::origin(), Point3::new(4.0, 4.0, 4.0)), 2.0).unwrap()
    }

    #[test]
    fn order_and_names_match_solver_convention() {
        let names: Vec<_> = Side::ALL.iter().map(|s| s.to_string()).collect();
        assert_eq!(names, ["+x", "-x", "+y", "-y", "+z", "-z"]);
        for side in Side::ALL {
            assert_eq!(side.as_str().parse::<Side>().unwrap(), side);
            assert_eq!(Side::ALL[side.index()], side);
            assert_eq!(side.opposite().opposite(), side);
            assert_eq!(side.normal(), -side.opposite().normal());
        }
        assert!("x".parse::<Side>().is_err());
    }

    #[test]
    fn neighbor_steps_across_side() {
        assert_eq!(Side::PosY.neighbor(&[1, 1, 1]), Some([1, 2, 1]));
        assert_eq!(Side::NegZ.neighbor(&[1, 1, 0]), None);
    }

    #[test]
    fn corners_wind_around_outward_normal() {
        let g = grid();
        for side in Side::ALL {
            let face = VoxelFace::new([1, 0, 1], side);
            let [a, b, c, d] = face.corners(&g);
            let n = (b - a).cross(&(c - a));
            assert!(n.dot(&side.normal()) > 0.0, "{side}");
            let centroid = Point3::from((a.coords + b.coords + c.coords + d.coords) / 4.0);
            assert_relative_eq!(centroid, face.center(&g), epsilon = 1e-12);
        }
    }
}
