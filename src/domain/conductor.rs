use crate::boundary::{ShellRepr, VoxelShell};
use crate::geometry::SharedSolid;
use crate::grid::ConductorTag;

slotmap::new_key_type! {
    /// Unique identifier for a conductor in a domain.
    pub struct ConductorId;
}

/// Default conductivity, copper (S/m).
pub const DEFAULT_SIGMA: f64 = 5.8e7;

/// User-supplied description of a conductor.
#[derive(Debug, Clone)]
pub struct ConductorData {
    pub label: String,
    pub solid: SharedSolid,
    /// Conductivity in S/m.
    pub sigma: f64,
    /// London penetration depth in meters, for superconductors.
    pub lambda: Option<f64>,
}

impl ConductorData {
    /// Creates a copper conductor.
    #[must_use]
    pub fn new(label: impl Into<String>, solid: SharedSolid) -> Self {
        Self {
            label: label.into(),
            solid,
            sigma: DEFAULT_SIGMA,
            lambda: None,
        }
    }

    #[must_use]
    pub fn with_sigma(mut self, sigma: f64) -> Self {
        self.sigma = sigma;
        self
    }

    #[must_use]
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.lambda = Some(lambda);
        self
    }

    /// Returns `true` when a positive penetration depth is set.
    #[must_use]
    pub fn is_superconductor(&self) -> bool {
        self.lambda.is_some_and(|l| l > 0.0)
    }
}

/// A conductor as tracked by the domain.
#[derive(Debug, Clone)]
pub struct ConductorRecord {
    pub(crate) data: ConductorData,
    pub(crate) tag: ConductorTag,
    pub(crate) voxelized: bool,
    pub(crate) shell: Option<(ShellRepr, VoxelShell)>,
}

impl ConductorRecord {
    pub(crate) fn new(data: ConductorData, tag: ConductorTag) -> Self {
        Self {
            data,
            tag,
            voxelized: false,
            shell: None,
        }
    }

    #[must_use]
    pub fn data(&self) -> &ConductorData {
        &self.data
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.data.label
    }

    /// Identifier of the conductor's cells in the occupancy tensor.
    #[must_use]
    pub fn tag(&self) -> ConductorTag {
        self.tag
    }

    #[must_use]
    pub fn is_voxelized(&self) -> bool {
        self.voxelized
    }

    pub(crate) fn invalidate(&mut self) {
        self.voxelized = false;
        self.shell = None;
    }
}
