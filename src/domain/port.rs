use crate::boundary::VoxelFace;
use crate::geometry::PlanarFace;

slotmap::new_key_type! {
    /// Unique identifier for a port in a domain.
    pub struct PortId;
}

/// User-supplied description of a port: the faces of its two terminals.
#[derive(Debug, Clone)]
pub struct PortData {
    pub label: String,
    pub positive: Vec<PlanarFace>,
    pub negative: Vec<PlanarFace>,
}

impl PortData {
    #[must_use]
    pub fn new(label: impl Into<String>, positive: Vec<PlanarFace>, negative: Vec<PlanarFace>) -> Self {
        Self {
            label: label.into(),
            positive,
            negative,
        }
    }
}

/// A port as tracked by the domain, with its located contacts.
#[derive(Debug, Clone)]
pub struct PortRecord {
    pub(crate) data: PortData,
    pub(crate) positive_contacts: Vec<VoxelFace>,
    pub(crate) negative_contacts: Vec<VoxelFace>,
    pub(crate) voxelized: bool,
}

impl PortRecord {
    pub(crate) fn new(data: PortData) -> Self {
        Self {
            data,
            positive_contacts: Vec::new(),
            negative_contacts: Vec::new(),
            voxelized: false,
        }
    }

    #[must_use]
    pub fn data(&self) -> &PortData {
        &self.data
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.data.label
    }

    #[must_use]
    pub fn positive_contacts(&self) -> &[VoxelFace] {
        &self.positive_contacts
    }

    #[must_use]
    pub fn negative_contacts(&self) -> &[VoxelFace] {
        &self.negative_contacts
    }

    /// Returns `true` once both terminals have located contacts.
    #[must_use]
    pub fn is_voxelized(&self) -> bool {
        self.voxelized
    }

    pub(crate) fn invalidate(&mut self) {
        self.voxelized = false;
        self.positive_contacts.clear();
        self.negative_contacts.clear();
    }
}
