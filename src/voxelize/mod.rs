pub mod labeling;

use tracing::{debug, error, info, instrument, warn};

use crate::error::{Result, VoxelizeError};
use crate::geometry::Solid;
use crate::grid::{ConductorTag, GridIndex, IndexRange, OccupancyTensor, VoxelIndex};
use crate::math::intersect_3d::triangle_aabb_intersect;
use crate::math::{Aabb, Point3, Vector3, TOLERANCE};
use crate::tessellation::MeshParams;

use labeling::{label_regions, Block};

/// Triangles or voxels processed between two progress reports.
const PROGRESS_STRIDE: usize = 4096;

/// How the voxelizer may treat the solid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoxelizeStrategy {
    /// Use the box fast path whenever the solid reports an axis-aligned box.
    #[default]
    Auto,
    /// Always run the mesh-guided path.
    ForceGeneral,
}

/// The path a voxelization actually took.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelizePath {
    AxisAlignedBox,
    MeshGuided,
}

/// Stage reported through the progress callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VoxelizeStage {
    Meshing,
    MarkingSurface,
    Labeling,
    Classifying,
    Writing,
}

/// Progress notification: `done` of `total` units of the current stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VoxelizeProgress {
    pub stage: VoxelizeStage,
    pub done: usize,
    pub total: usize,
}

/// Outcome of a voxelization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoxelizeReport {
    pub path: VoxelizePath,
    /// Cells now holding the conductor tag.
    pub occupied: usize,
    /// Point-in-solid queries issued.
    pub exact_queries: usize,
    /// Connected regions of non-surface voxels (mesh-guided path only).
    pub regions: usize,
    /// Voxels touched by the surface mesh (mesh-guided path only).
    pub surface_voxels: usize,
    /// Cells inside the solid left to the conductor that already held them.
    pub skipped_foreign: usize,
}

impl VoxelizeReport {
    fn new(path: VoxelizePath) -> Self {
        Self {
            path,
            occupied: 0,
            exact_queries: 0,
            regions: 0,
            surface_voxels: 0,
            skipped_foreign: 0,
        }
    }
}

/// Marks the voxels of one conductor in the occupancy tensor.
///
/// A voxel belongs to the conductor iff its center lies in the closed solid
/// (inside, or on the surface within [`TOLERANCE`]). Previous cells of the
/// tag are cleared first. Cells already held by another conductor are
/// never overwritten.
pub struct Voxelize<'a> {
    solid: &'a dyn Solid,
    tag: ConductorTag,
    strategy: VoxelizeStrategy,
}

impl<'a> Voxelize<'a> {
    /// Creates a new `Voxelize` operation.
    #[must_use]
    pub fn new(solid: &'a dyn Solid, tag: ConductorTag) -> Self {
        Self {
            solid,
            tag,
            strategy: VoxelizeStrategy::Auto,
        }
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: VoxelizeStrategy) -> Self {
        self.strategy = strategy;
        self
    }

    /// Executes the voxelization.
    ///
    /// # Errors
    ///
    /// See [`Voxelize::execute_with_progress`].
    pub fn execute(&self, grid: &GridIndex, tensor: &mut OccupancyTensor) -> Result<VoxelizeReport> {
        self.execute_with_progress(grid, tensor, &mut |_| {})
    }

    /// Executes the voxelization, reporting progress through `progress`.
    ///
    /// # Errors
    ///
    /// Returns an error if the tag is 0, the tensor does not match the grid,
    /// the solid escapes the domain bounding box, or the solid cannot be
    /// triangulated. The tensor is left untouched on error.
    #[instrument(level = "debug", skip_all, fields(tag = self.tag))]
    pub fn execute_with_progress(
        &self,
        grid: &GridIndex,
        tensor: &mut OccupancyTensor,
        progress: &mut dyn FnMut(VoxelizeProgress),
    ) -> Result<VoxelizeReport> {
        if self.tag == 0 {
            return Err(VoxelizeError::ReservedTag.into());
        }
        if tensor.shape() != grid.storage_shape() {
            return Err(VoxelizeError::ShapeMismatch {
                tensor: tensor.shape(),
                grid: grid.storage_shape(),
            }
            .into());
        }
        let bbox = self.solid.bounding_box();
        let slack = TOLERANCE * grid.bbox().diagonal_length().max(1.0);
        if !grid.bbox().contains_aabb(&bbox, slack) {
            error!(tag = self.tag, "conductor bounding box escapes the domain");
            return Err(VoxelizeError::OutsideDomain.into());
        }

        info!(tag = self.tag, "voxelizing conductor");
        let fast_box = match self.strategy {
            VoxelizeStrategy::Auto => self.solid.as_axis_aligned_box(),
            VoxelizeStrategy::ForceGeneral => None,
        };

        let report = if let Some(b) = fast_box {
            debug!("axis-aligned box path");
            tensor.clear_tag(self.tag);
            self.fill_box(grid, tensor, &b, progress)
        } else {
            debug!("mesh-guided path");
            // Triangulate before touching the tensor so a failure leaves it intact.
            progress(VoxelizeProgress {
                stage: VoxelizeStage::Meshing,
                done: 0,
                total: 1,
            });
            let params = MeshParams::for_pitch(grid.delta());
            let mesh = self.solid.triangulate(&params)?;
            tensor.clear_tag(self.tag);
            self.fill_general(grid, tensor, &mesh.triangles().collect::<Vec<_>>(), &params, progress)
        };

        if report.skipped_foreign > 0 {
            warn!(
                tag = self.tag,
                skipped = report.skipped_foreign,
                "cells already held by another conductor were left untouched"
            );
        }
        info!(
            tag = self.tag,
            occupied = report.occupied,
            exact_queries = report.exact_queries,
            "voxelization complete"
        );
        Ok(report)
    }

    /// Box fast path: the index range of the box, shrunk where the boundary
    /// voxel centers fall outside it.
    fn fill_box(
        &self,
        grid: &GridIndex,
        tensor: &mut OccupancyTensor,
        b: &Aabb,
        progress: &mut dyn FnMut(VoxelizeProgress),
    ) -> VoxelizeReport {
        let mut report = VoxelizeReport::new(VoxelizePath::AxisAlignedBox);
        let Some(mut range) = grid.index_range(b) else {
            return report;
        };

        for axis in 0..3 {
            if grid.center_of_voxel(&range.min)[axis] < b.min[axis] - TOLERANCE {
                range.min[axis] += 1;
            }
            if grid.center_of_voxel(&range.max)[axis] > b.max[axis] + TOLERANCE {
                if range.max[axis] == 0 {
                    return report;
                }
                range.max[axis] -= 1;
            }
            if range.min[axis] > range.max[axis] {
                return report;
            }
        }

        let total = range.cell_count();
        progress(VoxelizeProgress {
            stage: VoxelizeStage::Writing,
            done: 0,
            total,
        });
        let foreign = range
            .iter()
            .filter(|idx| tensor.get(idx).is_some_and(|t| t != 0))
            .count();
        if foreign == 0 {
            tensor.fill_region(&range, self.tag);
            report.occupied = total;
        } else {
            for idx in range.iter() {
                self.claim(tensor, &idx, &mut report);
            }
        }
        progress(VoxelizeProgress {
            stage: VoxelizeStage::Writing,
            done: total,
            total,
        });
        report
    }

    /// Mesh-guided path: surface voxels are classified one by one, every
    /// other connected region with a single query.
    fn fill_general(
        &self,
        grid: &GridIndex,
        tensor: &mut OccupancyTensor,
        triangles: &[[Point3; 3]],
        params: &MeshParams,
        progress: &mut dyn FnMut(VoxelizeProgress),
    ) -> VoxelizeReport {
        let mut report = VoxelizeReport::new(VoxelizePath::MeshGuided);
        let Some(range) = grid.index_range(&self.solid.bounding_box()) else {
            return report;
        };
        let block = Block::new(&range);

        let surface = mark_surface(grid, &range, &block, triangles, params, progress);
        report.surface_voxels = surface.iter().filter(|s| **s).count();

        progress(VoxelizeProgress {
            stage: VoxelizeStage::Labeling,
            done: 0,
            total: block.len(),
        });
        let regions = label_regions(&block, &surface);
        report.regions = regions.count();

        let total = regions.count() + report.surface_voxels;
        let mut done = 0;
        let mut region_inside = Vec::with_capacity(regions.count());
        for &seed in &regions.seeds {
            region_inside.push(self.center_in_solid(grid, &block.global(seed), &mut report));
            done += 1;
        }

        for i in 0..block.len() {
            let idx = block.global(i);
            let inside = match regions.labels[i] {
                Some(label) => region_inside[label as usize],
                None => {
                    done += 1;
                    if done % PROGRESS_STRIDE == 0 {
                        progress(VoxelizeProgress {
                            stage: VoxelizeStage::Classifying,
                            done,
                            total,
                        });
                    }
                    self.center_in_solid(grid, &idx, &mut report)
                }
            };
            if inside {
                self.claim(tensor, &idx, &mut report);
            }
        }
        progress(VoxelizeProgress {
            stage: VoxelizeStage::Classifying,
            done: total,
            total,
        });
        report
    }

    fn center_in_solid(&self, grid: &GridIndex, idx: &VoxelIndex, report: &mut VoxelizeReport) -> bool {
        report.exact_queries += 1;
        self.solid
            .contains_point(&grid.center_of_voxel(idx), TOLERANCE, true)
    }

    /// Writes the tag unless another conductor holds the cell.
    fn claim(&self, tensor: &mut OccupancyTensor, idx: &VoxelIndex, report: &mut VoxelizeReport) {
        match tensor.get(idx) {
            Some(0) => {
                tensor.set(idx, self.tag);
                report.occupied += 1;
            }
            Some(t) if t == self.tag => {}
            Some(_) => report.skipped_foreign += 1,
            None => {}
        }
    }
}

/// Flags the voxels of `range` whose box, inflated by the mesh deflection,
/// overlaps a triangle.
fn mark_surface(
    grid: &GridIndex,
    range: &IndexRange,
    block: &Block,
    triangles: &[[Point3; 3]],
    params: &MeshParams,
    progress: &mut dyn FnMut(VoxelizeProgress),
) -> Vec<bool> {
    let delta = grid.delta();
    let margin = params.linear_deflection + delta * 1e-6;
    let half = Vector3::repeat(0.5 * delta + margin);
    let mut surface = vec![false; block.len()];

    for (n, tri) in triangles.iter().enumerate() {
        if n % PROGRESS_STRIDE == 0 {
            progress(VoxelizeProgress {
                stage: VoxelizeStage::MarkingSurface,
                done: n,
                total: triangles.len(),
            });
        }
        let tri_box = Aabb::from_points(tri).inflated(margin);
        let Some(cover) = grid.index_range(&tri_box) else {
            continue;
        };
        let Some(cover) = intersect_ranges(&cover, range) else {
            continue;
        };
        for idx in cover.iter() {
            let cell = block.linear(&idx);
            if surface[cell] {
                continue;
            }
            if triangle_aabb_intersect(tri, &grid.center_of_voxel(&idx), &half) {
                surface[cell] = true;
            }
        }
    }
    surface
}

fn intersect_ranges(a: &IndexRange, b: &IndexRange) -> Option<IndexRange> {
    let min = [0, 1, 2].map(|i| a.min[i].max(b.min[i]));
    let max = [0, 1, 2].map(|i| a.max[i].min(b.max[i]));
    (0..3)
        .all(|i| min[i] <= max[i])
        .then(|| IndexRange::new(min, max))
}
