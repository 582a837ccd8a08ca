pub mod conductor;
pub mod port;

pub use conductor::{ConductorData, ConductorId, ConductorRecord, DEFAULT_SIGMA};
pub use port::{PortData, PortId, PortRecord};

use std::collections::BTreeSet;

use slotmap::SlotMap;
use tracing::{debug, info, warn};

use crate::boundary::{ExtractBoundary, ShellRepr, VoxelShell};
use crate::config::SolverSettings;
use crate::contact::{contact_shell_points, LocateContacts, DEFAULT_CONTACT_FRACTION};
use crate::error::{DomainError, GridError, Result, VoxelizeError};
use crate::geometry::SharedSolid;
use crate::grid::{ConductorTag, GridIndex, OccupancySnapshot, OccupancyTensor};
use crate::math::{Aabb, Point3};
use crate::voxelize::{Voxelize, VoxelizeProgress, VoxelizeReport, VoxelizeStrategy};

/// Lifecycle of the domain's occupancy tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DomainState {
    /// No conductors, hence no bounding box.
    Empty,
    /// Bounding box known, no tensor allocated yet.
    BBoxComputed,
    /// A tensor exists but no longer matches the bounding box or pitch.
    TensorAllocated,
    /// The tensor matches the current grid.
    TensorValid,
}

/// Outcome of [`Domain::voxelize_all`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VoxelizeSummary {
    pub conductors: usize,
    pub ports: usize,
    pub failed_conductors: Vec<ConductorId>,
    pub failed_ports: Vec<PortId>,
}

impl VoxelizeSummary {
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.failed_conductors.is_empty() && self.failed_ports.is_empty()
    }
}

/// A simulation domain: the conductors and ports sharing one voxel grid.
///
/// The domain is the only writer of its occupancy tensor. Any change to the
/// bounding box or pitch invalidates the tensor and clears the voxelization
/// of every conductor and port; [`Domain::generation`] is bumped each time so
/// external caches can detect staleness.
#[derive(Debug)]
pub struct Domain {
    delta: f64,
    contact_fraction: f64,
    strategy: VoxelizeStrategy,
    conductors: SlotMap<ConductorId, ConductorRecord>,
    ports: SlotMap<PortId, PortRecord>,
    bbox: Aabb,
    grid: Option<GridIndex>,
    tensor: OccupancyTensor,
    tensor_valid: bool,
    generation: u64,
    tag_generator: u32,
}

impl Domain {
    /// Creates an empty domain with pitch `delta`.
    ///
    /// # Errors
    ///
    /// Returns an error if `delta` is not a positive finite number.
    pub fn new(delta: f64) -> Result<Self> {
        if !delta.is_finite() || delta <= 0.0 {
            return Err(GridError::InvalidPitch(delta).into());
        }
        Ok(Self {
            delta,
            contact_fraction: DEFAULT_CONTACT_FRACTION,
            strategy: VoxelizeStrategy::default(),
            conductors: SlotMap::with_key(),
            ports: SlotMap::with_key(),
            bbox: Aabb::empty(),
            grid: None,
            tensor: OccupancyTensor::empty(),
            tensor_valid: false,
            generation: 0,
            tag_generator: 0,
        })
    }

    /// Creates an empty domain from validated settings.
    ///
    /// # Errors
    ///
    /// Returns an error if the settings fail validation.
    pub fn from_settings(settings: &SolverSettings) -> Result<Self> {
        settings.validate()?;
        let mut domain = Self::new(settings.delta)?;
        domain.contact_fraction = settings.contact_distance;
        Ok(domain)
    }

    // --- Parameters ---

    #[must_use]
    pub fn delta(&self) -> f64 {
        self.delta
    }

    /// Changes the voxel pitch, invalidating the tensor if it differs.
    ///
    /// # Errors
    ///
    /// Returns an error, keeping the current pitch and state, if `delta` is
    /// not a positive finite number or would make the grid of the current
    /// bounding box too large.
    #[allow(clippy::float_cmp)]
    pub fn set_delta(&mut self, delta: f64) -> Result<()> {
        if !delta.is_finite() || delta <= 0.0 {
            warn!(delta, "ignoring invalid voxel pitch");
            return Err(GridError::InvalidPitch(delta).into());
        }
        if self.bbox.is_valid() {
            if let Err(e) = GridIndex::new(&self.bbox, delta) {
                warn!(delta, error = %e, "ignoring voxel pitch");
                return Err(e.into());
            }
        }
        if delta != self.delta {
            self.delta = delta;
            self.invalidate();
        }
        Ok(())
    }

    #[must_use]
    pub fn contact_fraction(&self) -> f64 {
        self.contact_fraction
    }

    /// Sets the contact distance fraction used by later port voxelizations.
    pub fn set_contact_fraction(&mut self, fraction: f64) {
        self.contact_fraction = fraction;
    }

    #[must_use]
    pub fn strategy(&self) -> VoxelizeStrategy {
        self.strategy
    }

    pub fn set_strategy(&mut self, strategy: VoxelizeStrategy) {
        self.strategy = strategy;
    }

    // --- State ---

    #[must_use]
    pub fn state(&self) -> DomainState {
        if !self.bbox.is_valid() {
            DomainState::Empty
        } else if self.tensor_valid {
            DomainState::TensorValid
        } else if self.tensor.is_empty() {
            DomainState::BBoxComputed
        } else {
            DomainState::TensorAllocated
        }
    }

    /// Incremented on every invalidation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// The global bounding box; empty when there are no conductors.
    #[must_use]
    pub fn bbox(&self) -> &Aabb {
        &self.bbox
    }

    /// The grid, once a tensor has been allocated for the current state.
    #[must_use]
    pub fn grid(&self) -> Option<&GridIndex> {
        self.grid.as_ref().filter(|_| self.tensor_valid)
    }

    /// The occupancy tensor, if valid.
    #[must_use]
    pub fn tensor(&self) -> Option<&OccupancyTensor> {
        self.tensor_valid.then_some(&self.tensor)
    }

    /// Returns `true` when any conductor has a penetration depth.
    #[must_use]
    pub fn is_superconductive(&self) -> bool {
        self.conductors.values().any(|c| c.data.is_superconductor())
    }

    /// Drops the tensor's validity and every voxelization built on it.
    pub fn invalidate(&mut self) {
        self.tensor_valid = false;
        self.generation += 1;
        for record in self.conductors.values_mut() {
            record.invalidate();
        }
        for record in self.ports.values_mut() {
            record.invalidate();
        }
        debug!(generation = self.generation, "domain invalidated");
    }

    /// Rebuilds the tensor if needed and voxelizes every conductor and port.
    ///
    /// # Errors
    ///
    /// See [`Domain::voxelize_all`].
    pub fn revalidate(&mut self) -> Result<VoxelizeSummary> {
        self.voxel_space()?;
        self.voxelize_all()
    }

    // --- Conductors ---

    /// Adds a conductor and allocates its tag.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::TagOverflow`] once 65535 tags have been handed
    /// out.
    pub fn add_conductor(&mut self, data: ConductorData) -> Result<ConductorId> {
        let tag = self.next_tag()?;
        debug!(label = %data.label, tag, "adding conductor");
        let id = self.conductors.insert(ConductorRecord::new(data, tag));
        self.compute_containing_bbox();
        Ok(id)
    }

    /// Removes a conductor, clearing its cells.
    ///
    /// # Errors
    ///
    /// Returns an error if the conductor does not exist.
    pub fn remove_conductor(&mut self, id: ConductorId) -> Result<ConductorData> {
        let record = self
            .conductors
            .remove(id)
            .ok_or(DomainError::NotFound("conductor"))?;
        self.tensor.clear_tag(record.tag);
        self.invalidate_ports();
        self.compute_containing_bbox();
        Ok(record.data)
    }

    /// Replaces the solid of a conductor.
    ///
    /// The conductor's voxelization is cleared; if the global bounding box
    /// changes as a result, the whole domain is invalidated.
    ///
    /// # Errors
    ///
    /// Returns an error if the conductor does not exist.
    pub fn set_conductor_solid(&mut self, id: ConductorId, solid: SharedSolid) -> Result<()> {
        let record = self
            .conductors
            .get_mut(id)
            .ok_or(DomainError::NotFound("conductor"))?;
        record.data.solid = solid;
        record.invalidate();
        self.tensor.clear_tag(record.tag);
        self.invalidate_ports();
        self.compute_containing_bbox();
        Ok(())
    }

    /// Updates conductivity and penetration depth. Voxelization is kept.
    ///
    /// # Errors
    ///
    /// Returns an error if the conductor does not exist.
    pub fn set_conductor_material(
        &mut self,
        id: ConductorId,
        sigma: f64,
        lambda: Option<f64>,
    ) -> Result<()> {
        let record = self
            .conductors
            .get_mut(id)
            .ok_or(DomainError::NotFound("conductor"))?;
        record.data.sigma = sigma;
        record.data.lambda = lambda;
        Ok(())
    }

    /// # Errors
    ///
    /// Returns an error if the conductor does not exist.
    pub fn conductor(&self, id: ConductorId) -> Result<&ConductorRecord> {
        self.conductors
            .get(id)
            .ok_or_else(|| DomainError::NotFound("conductor").into())
    }

    pub fn conductors(&self) -> impl Iterator<Item = (ConductorId, &ConductorRecord)> {
        self.conductors.iter()
    }

    // --- Ports ---

    pub fn add_port(&mut self, data: PortData) -> PortId {
        debug!(label = %data.label, "adding port");
        self.ports.insert(PortRecord::new(data))
    }

    /// # Errors
    ///
    /// Returns an error if the port does not exist.
    pub fn remove_port(&mut self, id: PortId) -> Result<PortData> {
        self.ports
            .remove(id)
            .map(|r| r.data)
            .ok_or_else(|| DomainError::NotFound("port").into())
    }

    /// # Errors
    ///
    /// Returns an error if the port does not exist.
    pub fn port(&self, id: PortId) -> Result<&PortRecord> {
        self.ports
            .get(id)
            .ok_or_else(|| DomainError::NotFound("port").into())
    }

    pub fn ports(&self) -> impl Iterator<Item = (PortId, &PortRecord)> {
        self.ports.iter()
    }

    // --- Grid ---

    /// Recomputes the union of the conductor bounding boxes.
    ///
    /// Any change of the box, including to or from empty, invalidates the
    /// domain.
    pub fn compute_containing_bbox(&mut self) -> Aabb {
        let bbox = self
            .conductors
            .values()
            .fold(Aabb::empty(), |acc, c| acc.merged(&c.data.solid.bounding_box()));
        let unchanged = match (bbox.is_valid(), self.bbox.is_valid()) {
            (true, true) => bbox.approx_eq(&self.bbox, 0.0),
            (false, false) => true,
            _ => false,
        };
        self.bbox = bbox;
        if !unchanged {
            debug!(?bbox, "domain bounding box changed");
            self.invalidate();
        }
        bbox
    }

    /// Returns the occupancy tensor, allocating a fresh one if the current
    /// one is missing or stale.
    ///
    /// With no conductors the tensor is empty. Allocation clears the
    /// voxelization of every conductor and port.
    ///
    /// # Errors
    ///
    /// Returns an error if the grid cannot be built from the bounding box and
    /// pitch.
    pub fn voxel_space(&mut self) -> Result<&OccupancyTensor> {
        self.compute_containing_bbox();
        if !self.bbox.is_valid() {
            self.grid = None;
            self.tensor = OccupancyTensor::empty();
            self.tensor_valid = false;
            return Ok(&self.tensor);
        }
        if !self.tensor_valid {
            let grid = GridIndex::new(&self.bbox, self.delta).inspect_err(|e| {
                warn!(delta = self.delta, error = %e, "cannot build voxel space");
            })?;
            self.tensor = OccupancyTensor::for_grid(&grid);
            info!(dims = ?grid.dims(), delta = self.delta, "allocated voxel space");
            self.grid = Some(grid);
            self.invalidate();
            self.tensor_valid = true;
        }
        Ok(&self.tensor)
    }

    // --- Voxelization ---

    /// Voxelizes one conductor.
    ///
    /// # Errors
    ///
    /// Returns an error if the conductor does not exist or voxelization
    /// fails; the conductor then stays un-voxelized.
    pub fn voxelize_conductor(&mut self, id: ConductorId) -> Result<VoxelizeReport> {
        self.voxelize_conductor_with_progress(id, &mut |_| {})
    }

    /// Voxelizes one conductor, reporting progress.
    ///
    /// # Errors
    ///
    /// See [`Domain::voxelize_conductor`].
    pub fn voxelize_conductor_with_progress(
        &mut self,
        id: ConductorId,
        progress: &mut dyn FnMut(VoxelizeProgress),
    ) -> Result<VoxelizeReport> {
        if !self.conductors.contains_key(id) {
            return Err(DomainError::NotFound("conductor").into());
        }
        self.voxel_space()?;
        self.invalidate_ports();
        let grid = self.grid.as_ref().ok_or(DomainError::NoConductors)?;
        let record = self
            .conductors
            .get_mut(id)
            .ok_or(DomainError::NotFound("conductor"))?;
        record.invalidate();
        let result = Voxelize::new(record.data.solid.as_ref(), record.tag)
            .with_strategy(self.strategy)
            .execute_with_progress(grid, &mut self.tensor, progress);
        match result {
            Ok(report) => {
                if report.occupied == 0 {
                    warn!(
                        conductor = %record.data.label,
                        skipped_foreign = report.skipped_foreign,
                        "conductor covers no voxel center"
                    );
                }
                record.voxelized = true;
                Ok(report)
            }
            Err(e) => {
                self.tensor.clear_tag(record.tag);
                Err(e)
            }
        }
    }

    /// Locates the contacts of one port on the current voxelization.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NoContactFaces`] if either terminal has no
    /// faces or no located contacts, and propagates locator errors. The port
    /// is voxelized only on success.
    pub fn voxelize_port(&mut self, id: PortId) -> Result<()> {
        if !self.ports.contains_key(id) {
            return Err(DomainError::NotFound("port").into());
        }
        self.voxel_space()?;
        let grid = self.grid.as_ref().ok_or(DomainError::NoConductors)?;
        let record = self
            .ports
            .get_mut(id)
            .ok_or(DomainError::NotFound("port"))?;
        record.invalidate();
        if record.data.positive.is_empty() && record.data.negative.is_empty() {
            warn!(port = %record.data.label, "port has no faces");
            return Err(DomainError::NoContactFaces(record.data.label.clone()).into());
        }

        info!(port = %record.data.label, "voxelizing port");
        record.positive_contacts = LocateContacts::new(&record.data.positive)
            .with_fraction(self.contact_fraction)
            .execute(grid, &self.tensor)?;
        record.negative_contacts = LocateContacts::new(&record.data.negative)
            .with_fraction(self.contact_fraction)
            .execute(grid, &self.tensor)?;

        if record.positive_contacts.is_empty() || record.negative_contacts.is_empty() {
            warn!(
                port = %record.data.label,
                "no contacts located, is a voxelized conductor next to the port?"
            );
            return Err(DomainError::NoContactFaces(record.data.label.clone()).into());
        }
        record.voxelized = true;
        Ok(())
    }

    /// Voxelizes every conductor, then every port. Failing objects are
    /// logged and listed in the summary; the others proceed.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NoConductors`] if the domain has no conductors,
    /// or an error if the voxel space cannot be allocated.
    pub fn voxelize_all(&mut self) -> Result<VoxelizeSummary> {
        if self.conductors.is_empty() {
            warn!("no conductors to voxelize");
            return Err(DomainError::NoConductors.into());
        }
        self.voxel_space()?;
        let mut summary = VoxelizeSummary::default();

        let ids: Vec<ConductorId> = self.conductors.keys().collect();
        for id in ids {
            match self.voxelize_conductor(id) {
                Ok(_) => summary.conductors += 1,
                Err(e) => {
                    warn!(error = %e, "conductor skipped");
                    summary.failed_conductors.push(id);
                }
            }
        }
        let ids: Vec<PortId> = self.ports.keys().collect();
        for id in ids {
            match self.voxelize_port(id) {
                Ok(()) => summary.ports += 1,
                Err(e) => {
                    warn!(error = %e, "port skipped");
                    summary.failed_ports.push(id);
                }
            }
        }
        info!(
            conductors = summary.conductors,
            ports = summary.ports,
            failed = summary.failed_conductors.len() + summary.failed_ports.len(),
            "domain voxelized"
        );
        Ok(summary)
    }

    // --- Shells ---

    /// The boundary shell of a voxelized conductor, cached until the next
    /// invalidation.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotVoxelized`] if the conductor has not been
    /// voxelized since the last invalidation.
    pub fn conductor_shell(&mut self, id: ConductorId, repr: ShellRepr) -> Result<&VoxelShell> {
        let record = self
            .conductors
            .get_mut(id)
            .ok_or(DomainError::NotFound("conductor"))?;
        let grid = match self.grid.as_ref() {
            Some(g) if record.voxelized && self.tensor_valid => g,
            _ => {
                warn!(conductor = %record.data.label, "conductor not voxelized, no shell");
                return Err(DomainError::NotVoxelized(record.data.label.clone()).into());
            }
        };
        let cached = matches!(&record.shell, Some((r, _)) if *r == repr);
        if !cached {
            let shell = ExtractBoundary::new(record.tag).execute(grid, &self.tensor, repr)?;
            record.shell = Some((repr, shell));
        }
        match &record.shell {
            Some((_, shell)) => Ok(shell),
            None => Err(DomainError::NotVoxelized(record.data.label.clone()).into()),
        }
    }

    /// Quad vertices of a voxelized port's positive and negative contacts.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotVoxelized`] if the port is not voxelized.
    pub fn port_contact_shells(&self, id: PortId) -> Result<(Vec<Point3>, Vec<Point3>)> {
        let record = self.port(id)?;
        match self.grid() {
            Some(grid) if record.voxelized => Ok((
                contact_shell_points(grid, &record.positive_contacts),
                contact_shell_points(grid, &record.negative_contacts),
            )),
            _ => {
                warn!(port = %record.data.label, "port not voxelized, no contact shell");
                Err(DomainError::NotVoxelized(record.data.label.clone()).into())
            }
        }
    }

    // --- Snapshots ---

    /// Sparse copy of the tensor, if valid.
    #[must_use]
    pub fn snapshot(&self) -> Option<OccupancySnapshot> {
        self.tensor().map(OccupancyTensor::snapshot)
    }

    /// Replaces the tensor with a snapshot taken on the same grid.
    ///
    /// Conductors whose tag appears in the snapshot become voxelized; ports
    /// must be voxelized again. Cells whose tag belongs to no conductor of
    /// the domain are dropped.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot does not fit the current grid.
    pub fn restore_snapshot(&mut self, snapshot: &OccupancySnapshot) -> Result<()> {
        let expected = match self.voxel_space()? {
            t if t.is_empty() => return Err(DomainError::NoConductors.into()),
            t => t.shape(),
        };
        if snapshot.shape != expected {
            return Err(VoxelizeError::ShapeMismatch {
                tensor: snapshot.shape,
                grid: expected,
            }
            .into());
        }
        self.tensor = OccupancyTensor::from_snapshot(snapshot)?;
        let live: BTreeSet<ConductorTag> = self.conductors.values().map(|c| c.tag).collect();
        let orphans: BTreeSet<ConductorTag> = snapshot
            .cells
            .iter()
            .map(|c| c.tag)
            .filter(|t| *t != 0 && !live.contains(t))
            .collect();
        for tag in orphans {
            let dropped = self.tensor.clear_tag(tag);
            warn!(tag, dropped, "dropped snapshot cells of an unknown conductor");
        }
        for record in self.conductors.values_mut() {
            record.invalidate();
            record.voxelized = self.tensor.count(record.tag) > 0;
        }
        self.invalidate_ports();
        info!(cells = snapshot.cells.len(), "restored voxel space snapshot");
        Ok(())
    }

    // --- Internals ---

    fn next_tag(&mut self) -> Result<ConductorTag> {
        let next = self.tag_generator + 1;
        match ConductorTag::try_from(next) {
            Ok(tag) => {
                self.tag_generator = next;
                Ok(tag)
            }
            Err(_) => {
                warn!("conductor tag space exhausted");
                Err(DomainError::TagOverflow {
                    max: ConductorTag::MAX,
                }
                .into())
            }
        }
    }

    fn invalidate_ports(&mut self) {
        for record in self.ports.values_mut() {
            record.invalidate();
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::geometry::{Cuboid, PlanarFace};
    use std::sync::Arc;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn block(min: Point3, max: Point3) -> SharedSolid {
        Arc::new(Cuboid::new(min, max).unwrap())
    }

    fn cube_domain() -> (Domain, ConductorId) {
        let mut d = Domain::new(1.0).unwrap();
        let id = d
            .add_conductor(ConductorData::new("cube", block(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0))))
            .unwrap();
        (d, id)
    }

    fn x_square(x: f64, size: f64) -> PlanarFace {
        PlanarFace::new(vec![p(x, 0.0, 0.0), p(x, size, 0.0), p(x, size, size), p(x, 0.0, size)]).unwrap()
    }

    #[test]
    fn lifecycle_states() {
        let mut d = Domain::new(1.0).unwrap();
        assert_eq!(d.state(), DomainState::Empty);
        assert!(d.voxel_space().unwrap().is_empty());

        let id = d
            .add_conductor(ConductorData::new("a", block(p(0.0, 0.0, 0.0), p(2.0, 2.0, 2.0))))
            .unwrap();
        assert_eq!(d.state(), DomainState::BBoxComputed);
        assert_eq!(d.voxel_space().unwrap().shape(), [4, 4, 4]);
        assert_eq!(d.state(), DomainState::TensorValid);

        d.set_delta(0.5).unwrap();
        assert_eq!(d.state(), DomainState::TensorAllocated);
        assert!(d.tensor().is_none());
        d.voxelize_conductor(id).unwrap();
        assert_eq!(d.state(), DomainState::TensorValid);
        assert_eq!(d.grid().unwrap().dims(), [5, 5, 5]);

        d.remove_conductor(id).unwrap();
        assert_eq!(d.state(), DomainState::Empty);
    }

    #[test]
    fn tags_are_monotonic_and_bounded() {
        let (mut d, a) = cube_domain();
        let b = d
            .add_conductor(ConductorData::new("b", block(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))))
            .unwrap();
        assert_eq!(d.conductor(a).unwrap().tag(), 1);
        assert_eq!(d.conductor(b).unwrap().tag(), 2);
        d.remove_conductor(b).unwrap();
        let c = d
            .add_conductor(ConductorData::new("c", block(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))))
            .unwrap();
        assert_eq!(d.conductor(c).unwrap().tag(), 3);

        d.tag_generator = u32::from(u16::MAX);
        let err = d
            .add_conductor(ConductorData::new("d", block(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))))
            .unwrap_err();
        assert!(matches!(
            err,
            crate::error::EmvoxError::Domain(DomainError::TagOverflow { max: 65535 })
        ));
        assert_eq!(d.conductors().count(), 2);
    }

    #[test]
    fn invalid_pitch_keeps_state() {
        let (mut d, id) = cube_domain();
        d.voxelize_conductor(id).unwrap();
        let generation = d.generation();
        assert!(d.set_delta(0.0).is_err());
        assert!(d.set_delta(f64::NAN).is_err());
        assert_eq!(d.generation(), generation);
        assert!(d.conductor(id).unwrap().is_voxelized());
        assert!(Domain::new(-1.0).is_err());
    }

    #[test]
    fn unchanged_pitch_does_not_invalidate() {
        let (mut d, id) = cube_domain();
        d.voxelize_conductor(id).unwrap();
        d.set_delta(1.0).unwrap();
        assert!(d.conductor(id).unwrap().is_voxelized());
    }

    #[test]
    fn moving_inside_bbox_only_resets_that_conductor() {
        let mut d = Domain::new(1.0).unwrap();
        let a = d
            .add_conductor(ConductorData::new("a", block(p(0.0, 0.0, 0.0), p(4.0, 4.0, 10.0))))
            .unwrap();
        let b = d
            .add_conductor(ConductorData::new("b", block(p(6.0, 6.0, 6.0), p(10.0, 10.0, 10.0))))
            .unwrap();
        d.voxelize_all().unwrap();
        assert_eq!(d.tensor().unwrap().count(2), 64);
        let generation = d.generation();

        d.set_conductor_solid(b, block(p(6.0, 6.0, 0.0), p(10.0, 10.0, 4.0))).unwrap();
        assert_eq!(d.generation(), generation);
        assert!(d.conductor(a).unwrap().is_voxelized());
        assert!(!d.conductor(b).unwrap().is_voxelized());
        assert_eq!(d.tensor().unwrap().count(1), 160);
        assert_eq!(d.tensor().unwrap().count(2), 0);

        d.voxelize_conductor(b).unwrap();
        assert_eq!(d.generation(), generation);
        assert_eq!(d.tensor().unwrap().count(2), 64);
        assert!(d.tensor().unwrap().is_occupied(&[7, 7, 1]));
    }

    #[test]
    fn oversized_pitch_is_refused_without_panicking() {
        let (mut d, id) = cube_domain();
        d.voxelize_conductor(id).unwrap();
        let generation = d.generation();
        assert!(matches!(
            d.set_delta(1e-6).unwrap_err(),
            crate::error::EmvoxError::Grid(GridError::TooLarge { .. })
        ));
        assert!((d.delta() - 1.0).abs() < f64::EPSILON);
        assert_eq!(d.generation(), generation);
        assert!(d.conductor(id).unwrap().is_voxelized());

        // A conductor that blows up the bounding box fails at allocation.
        d.add_conductor(ConductorData::new("far", block(p(1e6, 1e6, 1e6), p(1e6 + 1.0, 1e6 + 1.0, 1e6 + 1.0))))
            .unwrap();
        assert!(d.voxelize_conductor(id).is_err());
        assert!(d.tensor().is_none());
    }

    #[test]
    fn sub_voxel_solid_voxelizes_to_nothing() {
        let mut d = Domain::new(1.0).unwrap();
        d.add_conductor(ConductorData::new("anchor", block(p(0.0, 0.0, 0.0), p(4.0, 4.0, 4.0))))
            .unwrap();
        let speck = d
            .add_conductor(ConductorData::new("speck", block(p(2.1, 2.1, 2.1), p(2.3, 2.3, 2.3))))
            .unwrap();
        let report = d.voxelize_conductor(speck).unwrap();
        assert_eq!(report.occupied, 0);
        assert!(d.conductor(speck).unwrap().is_voxelized());
        assert_eq!(d.tensor().unwrap().count(2), 0);
    }

    #[test]
    fn shell_requires_voxelization() {
        let (mut d, id) = cube_domain();
        assert!(d.conductor_shell(id, ShellRepr::Points).is_err());
        d.voxelize_conductor(id).unwrap();
        assert_eq!(d.conductor_shell(id, ShellRepr::Points).unwrap().quad_count(), 600);
        assert_eq!(d.conductor_shell(id, ShellRepr::Faces).unwrap().quad_count(), 600);
        d.set_delta(2.0).unwrap();
        assert!(d.conductor_shell(id, ShellRepr::Faces).is_err());
    }

    #[test]
    fn superconductivity_follows_lambda() {
        let (mut d, id) = cube_domain();
        assert!(!d.is_superconductive());
        d.set_conductor_material(id, 1e6, Some(5e-8)).unwrap();
        assert!(d.is_superconductive());
        d.set_conductor_material(id, 1e6, Some(0.0)).unwrap();
        assert!(!d.is_superconductive());
    }

    #[test]
    fn port_needs_contacts_on_both_terminals() {
        let (mut d, id) = cube_domain();
        let good = d.add_port(PortData::new("p1", vec![x_square(0.0, 10.0)], vec![x_square(10.0, 10.0)]));
        let half = d.add_port(PortData::new("p2", vec![x_square(0.0, 10.0)], Vec::new()));
        let summary = d.voxelize_all().unwrap();
        assert_eq!(summary.conductors, 1);
        assert_eq!(summary.ports, 1);
        assert_eq!(summary.failed_ports, vec![half]);

        let port = d.port(good).unwrap();
        assert!(port.is_voxelized());
        assert!(port.positive_contacts().iter().any(|c| c.side == crate::boundary::Side::NegX));
        let (pos, neg) = d.port_contact_shells(good).unwrap();
        assert_eq!(pos.len(), port.positive_contacts().len() * 4);
        assert_eq!(neg.len(), port.negative_contacts().len() * 4);
        assert!(d.port_contact_shells(half).is_err());

        d.set_delta(0.5).unwrap();
        assert!(!d.port(good).unwrap().is_voxelized());
        assert!(!d.conductor(id).unwrap().is_voxelized());
    }

    #[test]
    fn voxelize_all_without_conductors_fails() {
        let mut d = Domain::new(1.0).unwrap();
        assert!(d.voxelize_all().is_err());
    }

    #[test]
    fn snapshot_restores_cells_and_flags() {
        let (mut d, id) = cube_domain();
        d.voxelize_conductor(id).unwrap();
        let snap = d.snapshot().unwrap();
        assert_eq!(snap.cells.len(), 1000);

        d.invalidate();
        assert!(d.snapshot().is_none());
        d.restore_snapshot(&snap).unwrap();
        assert!(d.conductor(id).unwrap().is_voxelized());
        assert_eq!(d.tensor().unwrap().count(1), 1000);

        d.set_delta(2.0).unwrap();
        assert!(d.restore_snapshot(&snap).is_err());
    }

    #[test]
    fn snapshot_cells_of_removed_conductors_are_dropped() {
        let mut d = Domain::new(1.0).unwrap();
        d.add_conductor(ConductorData::new("low", block(p(0.0, 0.0, 0.0), p(1.0, 1.0, 1.0))))
            .unwrap();
        d.add_conductor(ConductorData::new("high", block(p(9.0, 9.0, 9.0), p(10.0, 10.0, 10.0))))
            .unwrap();
        let a = d
            .add_conductor(ConductorData::new("a", block(p(2.0, 2.0, 2.0), p(6.0, 6.0, 6.0))))
            .unwrap();
        d.voxelize_all().unwrap();
        let snap = d.snapshot().unwrap();
        assert_eq!(snap.cells.len(), 66);

        d.remove_conductor(a).unwrap();
        let b = d
            .add_conductor(ConductorData::new("b", block(p(2.0, 2.0, 2.0), p(6.0, 6.0, 6.0))))
            .unwrap();
        d.restore_snapshot(&snap).unwrap();
        let tensor = d.tensor().unwrap();
        assert_eq!(tensor.count(1), 1);
        assert_eq!(tensor.count(2), 1);
        assert_eq!(tensor.count(3), 0);
        assert!(!d.conductor(b).unwrap().is_voxelized());

        let report = d.voxelize_conductor(b).unwrap();
        assert_eq!(report.occupied, 64);
        assert_eq!(report.skipped_foreign, 0);
    }

    #[test]
    fn settings_configure_domain() {
        let settings = SolverSettings {
            delta: 0.25,
            contact_distance: 0.7,
            ..SolverSettings::default()
        };
        let d = Domain::from_settings(&settings).unwrap();
        assert!((d.delta() - 0.25).abs() < 1e-15);
        assert!((d.contact_fraction() - 0.7).abs() < 1e-15);
    }
}
