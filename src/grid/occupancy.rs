use serde::{Deserialize, Serialize};

use crate::error::GridError;

use super::{GridIndex, IndexRange, VoxelIndex, MAX_CELLS};

/// Conductor identifier stored in the occupancy tensor; 0 marks empty cells.
pub type ConductorTag = u16;

/// Dense 3D array of conductor tags, x varying fastest.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OccupancyTensor {
    shape: [usize; 3],
    data: Vec<ConductorTag>,
}

impl OccupancyTensor {
    /// Tensor with no cells.
    #[must_use]
    pub fn empty() -> Self {
        Self::default()
    }

    /// All-empty tensor of the given shape.
    ///
    /// # Panics
    ///
    /// Panics if the cell count overflows `usize`. Grids never produce such
    /// shapes; see [`crate::grid::MAX_CELLS`].
    #[must_use]
    pub fn new(shape: [usize; 3]) -> Self {
        Self {
            shape,
            data: vec![0; shape.iter().product()],
        }
    }

    /// All-empty tensor sized for `grid`.
    #[must_use]
    pub fn for_grid(grid: &GridIndex) -> Self {
        Self::new(grid.storage_shape())
    }

    #[must_use]
    pub fn shape(&self) -> [usize; 3] {
        self.shape
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Highest valid index on each axis. Meaningless for an empty tensor.
    #[must_use]
    pub fn max_index(&self) -> VoxelIndex {
        self.shape.map(|s| s.saturating_sub(1))
    }

    #[must_use]
    pub fn in_bounds(&self, idx: &VoxelIndex) -> bool {
        (0..3).all(|a| idx[a] < self.shape[a])
    }

    fn linear(&self, idx: &VoxelIndex) -> usize {
        idx[0] + self.shape[0] * (idx[1] + self.shape[1] * idx[2])
    }

    fn unlinear(&self, i: usize) -> VoxelIndex {
        let plane = self.shape[0] * self.shape[1];
        [i % self.shape[0], (i % plane) / self.shape[0], i / plane]
    }

    /// Tag at `idx`, or `None` outside the tensor.
    #[must_use]
    pub fn get(&self, idx: &VoxelIndex) -> Option<ConductorTag> {
        self.in_bounds(idx).then(|| self.data[self.linear(idx)])
    }

    /// Returns `true` if `idx` is inside the tensor and holds any tag.
    #[must_use]
    pub fn is_occupied(&self, idx: &VoxelIndex) -> bool {
        self.get(idx).is_some_and(|t| t != 0)
    }

    /// Stores `tag` at `idx` and returns the previous tag, or `None` without
    /// writing anything when `idx` is outside the tensor.
    pub fn set(&mut self, idx: &VoxelIndex, tag: ConductorTag) -> Option<ConductorTag> {
        if !self.in_bounds(idx) {
            return None;
        }
        let i = self.linear(idx);
        Some(std::mem::replace(&mut self.data[i], tag))
    }

    /// Zeroes every cell holding `tag`; returns how many were cleared.
    pub fn clear_tag(&mut self, tag: ConductorTag) -> usize {
        let mut cleared = 0;
        for cell in self.data.iter_mut().filter(|c| **c == tag) {
            *cell = 0;
            cleared += 1;
        }
        cleared
    }

    /// Assigns `tag` to every cell of `range` (clipped to the tensor).
    pub fn fill_region(&mut self, range: &IndexRange, tag: ConductorTag) {
        if self.is_empty() {
            return;
        }
        let max = self.max_index();
        let clipped = IndexRange::new(range.min, [0, 1, 2].map(|a| range.max[a].min(max[a])));
        for idx in clipped.iter() {
            let i = self.linear(&idx);
            self.data[i] = tag;
        }
    }

    /// Number of cells holding `tag`.
    #[must_use]
    pub fn count(&self, tag: ConductorTag) -> usize {
        self.data.iter().filter(|&&c| c == tag).count()
    }

    /// Indices of the cells holding `tag` within `range`, x fastest.
    #[must_use]
    pub fn cells_of(&self, tag: ConductorTag, range: &IndexRange) -> Vec<VoxelIndex> {
        range
            .iter()
            .filter(|idx| self.get(idx) == Some(tag))
            .collect()
    }

    /// Tight index range of the cells holding `tag`.
    #[must_use]
    pub fn extent_of(&self, tag: ConductorTag) -> Option<IndexRange> {
        let mut found: Option<IndexRange> = None;
        for (i, _) in self.data.iter().enumerate().filter(|(_, &c)| c == tag) {
            let idx = self.unlinear(i);
            found = Some(match found {
                None => IndexRange::new(idx, idx),
                Some(r) => IndexRange::new(
                    [0, 1, 2].map(|a| r.min[a].min(idx[a])),
                    [0, 1, 2].map(|a| r.max[a].max(idx[a])),
                ),
            });
        }
        found
    }

    /// Iterates over all non-empty cells.
    pub fn occupied(&self) -> impl Iterator<Item = (VoxelIndex, ConductorTag)> + '_ {
        self.data
            .iter()
            .enumerate()
            .filter(|(_, &c)| c != 0)
            .map(|(i, &c)| (self.unlinear(i), c))
    }

    /// Sparse copy of the non-empty cells.
    #[must_use]
    pub fn snapshot(&self) -> OccupancySnapshot {
        OccupancySnapshot {
            shape: self.shape,
            cells: self
                .occupied()
                .map(|(index, tag)| SparseCell { index, tag })
                .collect(),
        }
    }

    /// Rebuilds a tensor from a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the shape exceeds [`MAX_CELLS`] or a cell lies
    /// outside it.
    pub fn from_snapshot(snapshot: &OccupancySnapshot) -> Result<Self, GridError> {
        let cells = snapshot
            .shape
            .iter()
            .try_fold(1usize, |acc, &d| acc.checked_mul(d));
        if cells.is_none_or(|c| c > MAX_CELLS) {
            return Err(GridError::TooLarge {
                dims: snapshot.shape,
                max: MAX_CELLS,
            });
        }
        let mut tensor = Self::new(snapshot.shape);
        for cell in &snapshot.cells {
            if tensor.set(&cell.index, cell.tag).is_none() {
                return Err(GridError::CellOutOfRange(cell.index));
            }
        }
        Ok(tensor)
    }
}

/// Persistent form of an [`OccupancyTensor`]: shape plus non-empty cells.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OccupancySnapshot {
    pub shape: [usize; 3],
    pub cells: Vec<SparseCell>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SparseCell {
    pub index: VoxelIndex,
    pub tag: ConductorTag,
}
