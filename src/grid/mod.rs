pub mod occupancy;

pub use occupancy::{ConductorTag, OccupancySnapshot, OccupancyTensor};

use crate::error::GridError;
use crate::math::{Aabb, Point3, Vector3};

/// Integer voxel coordinates `(ix, iy, iz)`, 0-based.
pub type VoxelIndex = [usize; 3];

/// Fraction of a voxel by which coordinates are nudged up before flooring,
/// so that `0.3 / 0.1` lands on 3 rather than 2.
const INDEX_SNAP: f64 = 1e-9;

/// Largest occupancy tensor, in cells, a grid may allocate (2 GiB of tags).
pub const MAX_CELLS: usize = 1 << 30;

/// Maps between world coordinates and voxel indices of the domain grid.
///
/// Voxel `(i, j, k)` spans `origin + [i, i+1) * delta` on each axis. The grid
/// has `floor(length / delta) + 1` voxels per axis; the occupancy tensor
/// carries one extra layer on the high side of every axis.
#[derive(Debug, Clone, PartialEq)]
pub struct GridIndex {
    bbox: Aabb,
    delta: f64,
    dims: [usize; 3],
}

impl GridIndex {
    /// Creates the grid for a domain bounding box and voxel pitch.
    ///
    /// # Errors
    ///
    /// Returns an error if the box is empty, the pitch is not a positive
    /// finite number, or the tensor would exceed [`MAX_CELLS`].
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn new(bbox: &Aabb, delta: f64) -> Result<Self, GridError> {
        if !bbox.is_valid() {
            return Err(GridError::EmptyBoundingBox);
        }
        if !(delta > 0.0 && delta.is_finite()) {
            return Err(GridError::InvalidPitch(delta));
        }
        let len = bbox.extents();
        let dims = [0, 1, 2].map(|i| (snap_floor(len[i] / delta) as usize).saturating_add(1));
        let cells = dims
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d.checked_add(1)?));
        if cells.is_none_or(|c| c > MAX_CELLS) {
            return Err(GridError::TooLarge {
                dims,
                max: MAX_CELLS,
            });
        }
        Ok(Self {
            bbox: *bbox,
            delta,
            dims,
        })
    }

    #[must_use]
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    #[must_use]
    pub fn origin(&self) -> &Point3 {
        &self.bbox.min
    }

    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Voxel counts per axis (`L`, `M`, `N` of the solver header).
    #[must_use]
    pub fn dims(&self) -> [usize; 3] {
        self.dims
    }

    /// Shape of the backing occupancy tensor: one more than `dims` per axis.
    #[must_use]
    pub fn storage_shape(&self) -> [usize; 3] {
        self.dims.map(|d| d + 1)
    }

    /// Voxel containing `p`, or `None` when `p` falls outside the tensor.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn voxel_of_point(&self, p: &Point3) -> Option<VoxelIndex> {
        let shape = self.storage_shape();
        let mut idx = [0usize; 3];
        for axis in 0..3 {
            let f = snap_floor((p[axis] - self.bbox.min[axis]) / self.delta);
            if !(f >= 0.0 && f < shape[axis] as f64) {
                return None;
            }
            idx[axis] = f as usize;
        }
        Some(idx)
    }

    /// Voxel containing `p`, clamped into the tensor.
    #[must_use]
    pub fn nearest_voxel(&self, p: &Point3) -> VoxelIndex {
        let shape = self.storage_shape();
        [0, 1, 2].map(|axis| {
            clamp_index((p[axis] - self.bbox.min[axis]) / self.delta, shape[axis] - 1)
        })
    }

    /// World position of the center of voxel `idx`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn center_of_voxel(&self, idx: &VoxelIndex) -> Point3 {
        self.bbox.min + Vector3::new(idx[0] as f64 + 0.5, idx[1] as f64 + 0.5, idx[2] as f64 + 0.5) * self.delta
    }

    /// World position of the low corner of voxel `idx`.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn corner_of_voxel(&self, idx: &VoxelIndex) -> Point3 {
        self.bbox.min + Vector3::new(idx[0] as f64, idx[1] as f64, idx[2] as f64) * self.delta
    }

    /// Inclusive index range of the voxels overlapping `aabb`, clamped to the
    /// tensor. `None` if the box is empty or entirely outside.
    #[must_use]
    pub fn index_range(&self, aabb: &Aabb) -> Option<IndexRange> {
        if !aabb.is_valid() {
            return None;
        }
        let shape = self.storage_shape();
        let mut min = [0usize; 3];
        let mut max = [0usize; 3];
        for axis in 0..3 {
            let lo = (aabb.min[axis] - self.bbox.min[axis]) / self.delta;
            let hi = (aabb.max[axis] - self.bbox.min[axis]) / self.delta;
            if snap_floor(hi) < 0.0 {
                return None;
            }
            min[axis] = clamp_index(lo, shape[axis] - 1);
            max[axis] = clamp_index(hi, shape[axis] - 1);
            if snap_floor(lo) > max[axis] as f64 {
                return None;
            }
        }
        Some(IndexRange { min, max })
    }

    /// The whole tensor as a range.
    #[must_use]
    pub fn full_range(&self) -> IndexRange {
        IndexRange {
            min: [0; 3],
            max: self.dims,
        }
    }
}

fn snap_floor(x: f64) -> f64 {
    (x + INDEX_SNAP).floor()
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
fn clamp_index(x: f64, max: usize) -> usize {
    let f = snap_floor(x);
    if f <= 0.0 || f.is_nan() {
        0
    } else if f >= max as f64 {
        max
    } else {
        f as usize
    }
}

/// Inclusive box of voxel indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IndexRange {
    pub min: VoxelIndex,
    pub max: VoxelIndex,
}

impl IndexRange {
    #[must_use]
    pub fn new(min: VoxelIndex, max: VoxelIndex) -> Self {
        Self { min, max }
    }

    /// Number of indices along each axis.
    #[must_use]
    pub fn extent(&self) -> [usize; 3] {
        [0, 1, 2].map(|a| self.max[a] + 1 - self.min[a])
    }

    #[must_use]
    pub fn cell_count(&self) -> usize {
        self.extent().iter().product()
    }

    #[must_use]
    pub fn contains(&self, idx: &VoxelIndex) -> bool {
        (0..3).all(|a| idx[a] >= self.min[a] && idx[a] <= self.max[a])
    }

    /// Range grown by `n` on every side, clamped to `[0, limit]`.
    #[must_use]
    pub fn expanded(&self, n: usize, limit: &VoxelIndex) -> Self {
        Self {
            min: self.min.map(|v| v.saturating_sub(n)),
            max: [0, 1, 2].map(|a| (self.max[a] + n).min(limit[a])),
        }
    }

    /// Iterates the indices with x varying fastest.
    pub fn iter(&self) -> impl Iterator<Item = VoxelIndex> {
        let (min, max) = (self.min, self.max);
        (min[2]..=max[2]).flat_map(move |k| {
            (min[1]..=max[1]).flat_map(move |j| (min[0]..=max[0]).map(move |i| [i, j, k]))
        })
    }
}
