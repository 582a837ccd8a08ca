pub mod side;

pub use side::{Side, VoxelFace};

use tracing::debug;

use crate::error::Result;
use crate::geometry::PlanarFace;
use crate::grid::{ConductorTag, GridIndex, IndexRange, OccupancyTensor};
use crate::math::Point3;

/// Output representation of a voxel shell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellRepr {
    /// One [`PlanarFace`] per quad.
    #[default]
    Faces,
    /// Flat point list, four consecutive points per quad.
    Points,
}

/// The external quads of a set of voxels.
#[derive(Debug, Clone)]
pub enum VoxelShell {
    Faces(Vec<PlanarFace>),
    Points(Vec<Point3>),
}

impl VoxelShell {
    #[must_use]
    pub fn quad_count(&self) -> usize {
        match self {
            Self::Faces(faces) => faces.len(),
            Self::Points(points) => points.len() / 4,
        }
    }

    /// Converts voxel sides into the requested representation.
    ///
    /// # Errors
    ///
    /// Returns an error if a quad cannot form a face, which only happens for
    /// a degenerate grid.
    pub fn build(grid: &GridIndex, faces: &[VoxelFace], repr: ShellRepr) -> Result<Self> {
        match repr {
            ShellRepr::Faces => faces
                .iter()
                .map(|f| PlanarFace::new(f.corners(grid).to_vec()))
                .collect::<Result<Vec<_>>>()
                .map(Self::Faces),
            ShellRepr::Points => Ok(Self::Points(
                faces.iter().flat_map(|f| f.corners(grid)).collect(),
            )),
        }
    }
}

/// Finds the external sides of a conductor's voxels by finite differences.
///
/// The conductor's cells within the scan range are copied into a binary
/// mask padded by one empty layer on every side; every nonzero first
/// difference along an axis is one external side. Cells outside the scan
/// range count as empty.
pub struct ExtractBoundary {
    tag: ConductorTag,
    range: Option<IndexRange>,
}

impl ExtractBoundary {
    /// Creates a new `ExtractBoundary` operation scanning the tight extent of
    /// `tag`.
    #[must_use]
    pub fn new(tag: ConductorTag) -> Self {
        Self { tag, range: None }
    }

    /// Restricts the scan to `range`.
    #[must_use]
    pub fn with_range(mut self, range: IndexRange) -> Self {
        self.range = Some(range);
        self
    }

    /// The external voxel sides, grouped by axis.
    #[must_use]
    pub fn faces(&self, tensor: &OccupancyTensor) -> Vec<VoxelFace> {
        let range = match self.range {
            Some(requested) => {
                let max = tensor.max_index();
                IndexRange::new(requested.min, [0, 1, 2].map(|a| requested.max[a].min(max[a])))
            }
            None => match tensor.extent_of(self.tag) {
                Some(extent) => extent,
                None => return Vec::new(),
            },
        };
        if tensor.is_empty() || (0..3).any(|a| range.min[a] > range.max[a]) {
            return Vec::new();
        }

        let ext = range.extent();
        let padded = ext.map(|len| len + 2);
        let at = |x: usize, y: usize, z: usize| x + padded[0] * (y + padded[1] * z);

        let mut mask = vec![false; padded.iter().product()];
        for idx in range.iter() {
            if tensor.get(&idx) == Some(self.tag) {
                let [x, y, z] = [0, 1, 2].map(|a| idx[a] - range.min[a] + 1);
                mask[at(x, y, z)] = true;
            }
        }

        let mut faces = Vec::new();
        for axis in 0..3 {
            let step = [0, 1, 2].map(|a| usize::from(a == axis));
            let bounds = [0, 1, 2].map(|a| if a == axis { 0..=ext[a] } else { 1..=ext[a] });
            for z in bounds[2].clone() {
                for y in bounds[1].clone() {
                    for x in bounds[0].clone() {
                        let here = mask[at(x, y, z)];
                        let next = mask[at(x + step[0], y + step[1], z + step[2])];
                        if here == next {
                            continue;
                        }
                        // Padded coordinate p maps to tensor index range.min + p - 1.
                        let (p, side) = if next {
                            ([x + step[0], y + step[1], z + step[2]], Side::from_axis(axis, false))
                        } else {
                            ([x, y, z], Side::from_axis(axis, true))
                        };
                        let voxel = [0, 1, 2].map(|a| range.min[a] + p[a] - 1);
                        faces.push(VoxelFace::new(voxel, side));
                    }
                }
            }
        }

        debug!(tag = self.tag, quads = faces.len(), "extracted voxel boundary");
        faces
    }

    /// Builds the shell in the requested representation.
    ///
    /// # Errors
    ///
    /// See [`VoxelShell::build`].
    pub fn execute(
        &self,
        grid: &GridIndex,
        tensor: &OccupancyTensor,
        repr: ShellRepr,
    ) -> Result<VoxelShell> {
        VoxelShell::build(grid, &self.faces(tensor), repr)
    }
}

/// Reference extraction: every side of every cell of `tag` whose neighbour
/// is not `tag` or lies outside the tensor.
#[must_use]
pub fn boundary_faces_by_neighbors(tensor: &OccupancyTensor, tag: ConductorTag) -> Vec<VoxelFace> {
    let mut faces = Vec::new();
    for (idx, t) in tensor.occupied() {
        if t != tag {
            continue;
        }
        for side in Side::ALL {
            let exposed = side
                .neighbor(&idx)
                .and_then(|n| tensor.get(&n))
                .is_none_or(|n| n != tag);
            if exposed {
                faces.push(VoxelFace::new(idx, side));
            }
        }
    }
    faces
}
