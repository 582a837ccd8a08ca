use std::collections::VecDeque;

use crate::grid::{IndexRange, VoxelIndex};

/// A box of voxels addressed locally, x varying fastest.
#[derive(Debug, Clone, Copy)]
pub struct Block {
    origin: VoxelIndex,
    extent: [usize; 3],
}

impl Block {
    #[must_use]
    pub fn new(range: &IndexRange) -> Self {
        Self {
            origin: range.min,
            extent: range.extent(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.extent.iter().product()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Local linear index of a global voxel index inside the block.
    #[must_use]
    pub fn linear(&self, idx: &VoxelIndex) -> usize {
        let [x, y, z] = [0, 1, 2].map(|a| idx[a] - self.origin[a]);
        x + self.extent[0] * (y + self.extent[1] * z)
    }

    /// Global voxel index of a local linear index.
    #[must_use]
    pub fn global(&self, i: usize) -> VoxelIndex {
        let plane = self.extent[0] * self.extent[1];
        [
            self.origin[0] + i % self.extent[0],
            self.origin[1] + (i % plane) / self.extent[0],
            self.origin[2] + i / plane,
        ]
    }

    /// Local linear indices of the face neighbours of `i` that lie in the
    /// block.
    fn neighbors(&self, i: usize) -> impl Iterator<Item = usize> {
        let [ex, ey, ez] = self.extent;
        let plane = ex * ey;
        let (x, y, z) = (i % ex, (i % plane) / ex, i / plane);
        [
            (x > 0).then(|| i - 1),
            (x + 1 < ex).then(|| i + 1),
            (y > 0).then(|| i - ex),
            (y + 1 < ey).then(|| i + ex),
            (z > 0).then(|| i - plane),
            (z + 1 < ez).then(|| i + plane),
        ]
        .into_iter()
        .flatten()
    }
}

/// Connected regions of the free cells of a block.
#[derive(Debug, Clone)]
pub struct Regions {
    /// Region of each cell, `None` for blocked cells.
    pub labels: Vec<Option<u32>>,
    /// One local cell index per region, in label order.
    pub seeds: Vec<usize>,
}

impl Regions {
    #[must_use]
    pub fn count(&self) -> usize {
        self.seeds.len()
    }
}

/// Labels the 6-connected regions of cells where `blocked` is false.
///
/// Breadth-first flood fill from every unlabeled free cell in scan order.
#[must_use]
#[allow(clippy::cast_possible_truncation)]
pub fn label_regions(block: &Block, blocked: &[bool]) -> Regions {
    let mut labels: Vec<Option<u32>> = vec![None; block.len()];
    let mut seeds = Vec::new();
    let mut queue = VecDeque::new();

    for start in 0..block.len() {
        if blocked[start] || labels[start].is_some() {
            continue;
        }
        let label = seeds.len() as u32;
        seeds.push(start);
        labels[start] = Some(label);
        queue.push_back(start);

        while let Some(cell) = queue.pop_front() {
            for n in block.neighbors(cell) {
                if !blocked[n] && labels[n].is_none() {
                    labels[n] = Some(label);
                    queue.push_back(n);
                }
            }
        }
    }

    Regions { labels, seeds }
}
