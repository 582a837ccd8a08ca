use tracing::{debug, warn};

use crate::boundary::{Side, VoxelFace};
use crate::error::{DomainError, Result};
use crate::geometry::PlanarFace;
use crate::grid::{GridIndex, OccupancyTensor};
use crate::math::{Aabb, Point3, TOLERANCE};

/// Default contact distance as a fraction of the voxel pitch: half a voxel
/// plus a tenth of that.
pub const DEFAULT_CONTACT_FRACTION: f64 = 0.55;

/// Voxels of slack around the contact faces' bounding box.
const SEARCH_SLACK: usize = 2;

/// Outward offset of contact quads, as a fraction of the pitch.
const SHELL_OFFSET: f64 = 0.1;

/// Finds the exterior voxel sides lying on a set of contact faces.
///
/// Every occupied voxel near the faces is scanned, whatever conductor holds
/// it. A side is exterior when the neighbour across it is empty or outside
/// the tensor, and it becomes a contact when its center lies closer than
/// `delta * fraction` to any of the faces.
pub struct LocateContacts<'a> {
    faces: &'a [PlanarFace],
    fraction: f64,
}

impl<'a> LocateContacts<'a> {
    /// Creates a new `LocateContacts` operation with the default distance
    /// fraction.
    #[must_use]
    pub fn new(faces: &'a [PlanarFace]) -> Self {
        Self {
            faces,
            fraction: DEFAULT_CONTACT_FRACTION,
        }
    }

    /// Sets the distance fraction of the pitch.
    #[must_use]
    pub fn with_fraction(mut self, fraction: f64) -> Self {
        self.fraction = fraction;
        self
    }

    /// Executes the search.
    ///
    /// Returns an empty list, with a warning, if no exterior side is close to
    /// the faces.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::PortOutsideDomain`] if the faces' bounding box
    /// is not contained in the grid's bounding box.
    pub fn execute(&self, grid: &GridIndex, tensor: &OccupancyTensor) -> Result<Vec<VoxelFace>> {
        if self.faces.is_empty() || tensor.is_empty() {
            return Ok(Vec::new());
        }
        let bbox = self
            .faces
            .iter()
            .fold(Aabb::empty(), |acc, f| acc.merged(&f.bounding_box()));
        if !grid.bbox().contains_aabb(&bbox, grid.delta() * 1e-6 + TOLERANCE) {
            warn!("contact faces extend beyond the domain bounding box");
            return Err(DomainError::PortOutsideDomain.into());
        }
        let Some(range) = grid.index_range(&bbox) else {
            return Ok(Vec::new());
        };
        let range = range.expanded(SEARCH_SLACK, &tensor.max_index());

        let limit = grid.delta() * self.fraction;
        let mut contacts = Vec::new();
        for idx in range.iter() {
            if !tensor.is_occupied(&idx) {
                continue;
            }
            for side in Side::ALL {
                let exterior = side
                    .neighbor(&idx)
                    .and_then(|n| tensor.get(&n))
                    .is_none_or(|t| t == 0);
                if !exterior {
                    continue;
                }
                let face = VoxelFace::new(idx, side);
                let center = face.center(grid);
                if self.min_distance(&center) < limit {
                    contacts.push(face);
                }
            }
        }

        if contacts.is_empty() {
            warn!(
                faces = self.faces.len(),
                "no conductor voxel lies on the contact faces"
            );
        } else {
            debug!(contacts = contacts.len(), "located contact sides");
        }
        Ok(contacts)
    }

    fn min_distance(&self, p: &Point3) -> f64 {
        self.faces
            .iter()
            .map(|f| f.distance_to_point(p))
            .fold(f64::INFINITY, f64::min)
    }
}

/// Quad vertices of the given contacts, four per contact, pushed slightly
/// outward so they sit just above the conductor shell.
#[must_use]
pub fn contact_shell_points(grid: &GridIndex, contacts: &[VoxelFace]) -> Vec<Point3> {
    let offset = grid.delta() * SHELL_OFFSET;
    contacts
        .iter()
        .flat_map(|c| {
            let shift = c.side.normal() * offset;
            c.corners(grid).map(|p| p + shift)
        })
        .collect()
}
