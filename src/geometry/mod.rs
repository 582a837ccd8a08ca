pub mod cuboid;
pub mod planar_face;
pub mod plane;
pub mod polyhedron;
pub mod sphere;

pub use cuboid::Cuboid;
pub use planar_face::PlanarFace;
pub use plane::Plane;
pub use polyhedron::Polyhedron;
pub use sphere::Sphere;

use std::fmt::Debug;
use std::sync::Arc;

use crate::error::Result;
use crate::math::{Aabb, Point3};
use crate::tessellation::{MeshParams, TriangleMesh};

/// The geometric queries the voxelizer needs from a conductor body.
///
/// Any closed, bounded solid can be voxelized once it answers these four
/// questions. Implementations must be consistent: `contains_point` and the
/// triangulated surface describe the same body up to the requested
/// deflection.
pub trait Solid: Debug {
    /// Tight axis-aligned bounds.
    fn bounding_box(&self) -> Aabb;

    /// Point membership. Points within `tolerance` of the surface count as
    /// inside exactly when `include_boundary` is set.
    fn contains_point(&self, point: &Point3, tolerance: f64, include_boundary: bool) -> bool;

    /// Closed surface mesh with outward-facing triangles whose distance to the
    /// true surface stays within `params.linear_deflection`.
    ///
    /// # Errors
    ///
    /// Returns an error if the surface cannot be tessellated.
    fn triangulate(&self, params: &MeshParams) -> Result<TriangleMesh>;

    /// The exact box when the solid is an axis-aligned rectangular box.
    fn as_axis_aligned_box(&self) -> Option<Aabb> {
        None
    }
}

/// Solid shared between the caller and the domain.
pub type SharedSolid = Arc<dyn Solid + Send + Sync>;
