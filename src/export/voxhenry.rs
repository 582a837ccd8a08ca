use std::io::{self, Write};
use std::path::Path;

use tracing::{info, warn};

use crate::boundary::{Side, VoxelFace};
use crate::config::SolverSettings;
use crate::domain::Domain;
use crate::error::{DomainError, ExportError, Result};
use crate::grid::{GridIndex, OccupancyTensor, VoxelIndex};

use super::{create_output, format_g, token};

/// Counts of what a deck contains.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeckSummary {
    pub conductors: usize,
    pub voxels: usize,
    pub ports: usize,
    pub contacts: usize,
    /// Conductors and ports left out because they were not voxelized.
    pub skipped: usize,
}

/// Writes a VoxHenry input deck for a voxelized domain.
///
/// Voxel indices are written 1-based. Conductors and ports that are not
/// voxelized are skipped with a warning.
pub struct VoxHenryDeck<'a> {
    domain: &'a Domain,
    settings: &'a SolverSettings,
}

impl<'a> VoxHenryDeck<'a> {
    #[must_use]
    pub fn new(domain: &'a Domain, settings: &'a SolverSettings) -> Self {
        Self { domain, settings }
    }

    /// Writes the deck to `out`.
    ///
    /// # Errors
    ///
    /// Returns [`DomainError::NotVoxelized`] if the domain has no valid voxel
    /// space, or an I/O error.
    pub fn write<W: Write>(&self, out: &mut W) -> Result<DeckSummary> {
        let (Some(grid), Some(tensor)) = (self.domain.grid(), self.domain.tensor()) else {
            warn!("voxel space not valid, nothing to export");
            return Err(DomainError::NotVoxelized("voxel space".into()).into());
        };
        let summary = self.write_deck(out, grid, tensor).map_err(ExportError::from)?;
        info!(
            voxels = summary.voxels,
            contacts = summary.contacts,
            skipped = summary.skipped,
            "VoxHenry deck written"
        );
        Ok(summary)
    }

    /// Writes the deck to a file, creating missing directories.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists and `overwrite` is false, or for
    /// the reasons listed on [`VoxHenryDeck::write`].
    pub fn write_to_path(&self, path: &Path, overwrite: bool) -> Result<DeckSummary> {
        let mut out = create_output(path, overwrite)?;
        let summary = self.write(&mut out)?;
        out.flush().map_err(ExportError::from)?;
        Ok(summary)
    }

    /// Writes the deck into `folder` under the configured file name.
    ///
    /// # Errors
    ///
    /// See [`VoxHenryDeck::write_to_path`].
    pub fn write_to_folder(&self, folder: &Path, overwrite: bool) -> Result<DeckSummary> {
        self.write_to_path(&folder.join(&self.settings.filename), overwrite)
    }

    fn write_deck<W: Write>(
        &self,
        out: &mut W,
        grid: &GridIndex,
        tensor: &OccupancyTensor,
    ) -> io::Result<DeckSummary> {
        let mut summary = DeckSummary::default();
        let superconductive = self.domain.is_superconductive();

        writeln!(out, "* VoxHenry input file created by emvox")?;
        writeln!(out)?;
        writeln!(out, "* Frequency points (Hz)")?;
        write!(out, "freq=")?;
        for freq in self.settings.frequencies() {
            write!(out, " {}", format_g(freq))?;
        }
        writeln!(out)?;
        writeln!(out)?;
        writeln!(out, "* Voxel size (m)")?;
        writeln!(out, "dx={}", format_g(grid.delta() * self.settings.units.scale()))?;
        writeln!(out)?;
        writeln!(out, "* Voxel grid dimension in voxel units: x, y, z")?;
        let dims = grid.dims();
        writeln!(out, "LMN={},{},{}", dims[0], dims[1], dims[2])?;
        writeln!(out)?;
        if superconductive {
            writeln!(out, "* Specify there are superconductors")?;
            writeln!(out, "Superconductor")?;
            writeln!(out)?;
        }

        writeln!(out, "* Voxel list")?;
        writeln!(out, "* Format is:")?;
        if superconductive {
            writeln!(
                out,
                "* V <index_x> <index_y> <index_z> <conductivity S/m> <penetration depth m>"
            )?;
        } else {
            writeln!(out, "* V <index_x> <index_y> <index_z> <conductivity S/m>")?;
        }
        writeln!(out, "*")?;
        writeln!(out, "StartVoxelList")?;
        for (_, record) in self.domain.conductors() {
            if !record.is_voxelized() {
                warn!(conductor = record.label(), "conductor not voxelized, skipped");
                summary.skipped += 1;
                continue;
            }
            let data = record.data();
            let material = if superconductive {
                format!("{} {}", format_g(data.sigma), format_g(data.lambda.unwrap_or(0.0)))
            } else {
                format_g(data.sigma)
            };
            let Some(range) = tensor.extent_of(record.tag()) else {
                summary.conductors += 1;
                continue;
            };
            for [x, y, z] in tensor.cells_of(record.tag(), &range) {
                writeln!(out, "V {} {} {} {material}", x + 1, y + 1, z + 1)?;
                summary.voxels += 1;
            }
            summary.conductors += 1;
        }
        writeln!(out, "EndVoxelList")?;
        writeln!(out)?;

        if self.domain.ports().next().is_some() {
            writeln!(out, "* Port nodes list")?;
            writeln!(out, "* Format is:")?;
            writeln!(
                out,
                "* N <portname> <excitation or ground (P/N)> <voxel_index_x> <voxel_index_y> <voxel_index_z> <node (+z,-z,+x,-x,+y,-y)>"
            )?;
            writeln!(out, "*")?;
            for (_, record) in self.domain.ports() {
                if !record.is_voxelized() {
                    warn!(port = record.label(), "port not voxelized, skipped");
                    summary.skipped += 1;
                    continue;
                }
                let name = token(record.label());
                writeln!(out, "* Port {}", record.label())?;
                for (polarity, contacts) in [
                    ('P', record.positive_contacts()),
                    ('N', record.negative_contacts()),
                ] {
                    for contact in contacts {
                        let [x, y, z] = contact.voxel;
                        writeln!(out, "N {name} {polarity} {} {} {} {}", x + 1, y + 1, z + 1, contact.side)?;
                        summary.contacts += 1;
                    }
                }
                summary.ports += 1;
            }
            writeln!(out)?;
        }
        Ok(summary)
    }
}

/// One `V` line of a deck, with 0-based indices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VoxelRecord {
    pub index: VoxelIndex,
    pub sigma: f64,
    pub lambda: Option<f64>,
}

/// One `N` line of a deck, with a 0-based voxel index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortNode {
    pub port: String,
    pub positive: bool,
    pub face: VoxelFace,
}

/// Reads the `V` lines of a deck.
///
/// # Errors
///
/// Returns [`ExportError::Parse`] with the 1-based line number of the first
/// malformed record.
pub fn parse_voxel_records(text: &str) -> Result<Vec<VoxelRecord>> {
    let mut records = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() != Some(&"V") {
            continue;
        }
        let line = n + 1;
        if !(5..=6).contains(&tokens.len()) {
            return Err(parse_error(line, format!("expected 4 or 5 fields, got {}", tokens.len() - 1)).into());
        }
        records.push(VoxelRecord {
            index: parse_voxel(&tokens[1..4], line)?,
            sigma: parse_float(tokens[4], line)?,
            lambda: tokens.get(5).map(|t| parse_float(t, line)).transpose()?,
        });
    }
    Ok(records)
}

/// Reads the `N` lines of a deck.
///
/// # Errors
///
/// Returns [`ExportError::Parse`] with the 1-based line number of the first
/// malformed node.
pub fn parse_port_nodes(text: &str) -> Result<Vec<PortNode>> {
    let mut nodes = Vec::new();
    for (n, line) in text.lines().enumerate() {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.first() != Some(&"N") {
            continue;
        }
        let line = n + 1;
        if tokens.len() != 7 {
            return Err(parse_error(line, format!("expected 6 fields, got {}", tokens.len() - 1)).into());
        }
        let positive = match tokens[2] {
            "P" => true,
            "N" => false,
            other => return Err(parse_error(line, format!("polarity must be P or N, got '{other}'")).into()),
        };
        let side: Side = tokens[6].parse().map_err(|e: String| parse_error(line, e))?;
        nodes.push(PortNode {
            port: tokens[1].to_string(),
            positive,
            face: VoxelFace::new(parse_voxel(&tokens[3..6], line)?, side),
        });
    }
    Ok(nodes)
}

fn parse_voxel(tokens: &[&str], line: usize) -> std::result::Result<VoxelIndex, ExportError> {
    let mut index = [0; 3];
    for (slot, t) in index.iter_mut().zip(tokens) {
        let one_based: usize = t
            .parse()
            .map_err(|_| parse_error(line, format!("invalid voxel index '{t}'")))?;
        *slot = one_based
            .checked_sub(1)
            .ok_or_else(|| parse_error(line, "voxel indices are 1-based".into()))?;
    }
    Ok(index)
}

fn parse_float(token: &str, line: usize) -> std::result::Result<f64, ExportError> {
    token
        .parse()
        .map_err(|_| parse_error(line, format!("invalid number '{token}'")))
}

fn parse_error(line: usize, message: String) -> ExportError {
    ExportError::Parse { line, message }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::domain::{ConductorData, PortData};
    use crate::geometry::{Cuboid, PlanarFace};
    use crate::math::Point3;
    use std::collections::BTreeSet;
    use std::sync::Arc;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn deck_text(domain: &Domain, settings: &SolverSettings) -> String {
        let mut buf = Vec::new();
        VoxHenryDeck::new(domain, settings).write(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    fn two_bars() -> Domain {
        let mut d = Domain::new(1.0).unwrap();
        d.add_conductor(ConductorData::new(
            "a",
            Arc::new(Cuboid::new(p(0.0, 0.0, 0.0), p(3.0, 1.0, 1.0)).unwrap()),
        ))
        .unwrap();
        d.add_conductor(
            ConductorData::new("b", Arc::new(Cuboid::new(p(0.0, 2.0, 0.0), p(3.0, 3.0, 1.0)).unwrap()))
                .with_sigma(1e6),
        )
        .unwrap();
        d
    }

    #[test]
    fn header_and_voxel_list() {
        let mut d = two_bars();
        d.voxelize_all().unwrap();
        let settings = SolverSettings::default();
        let text = deck_text(&d, &settings);

        assert!(text.contains("freq= 2.5e+09\n"));
        assert!(text.contains("dx=1e-06\n"));
        assert!(text.contains("LMN=4,4,2\n"));
        assert!(!text.contains("Superconductor"));
        assert!(text.contains("V 1 1 1 5.8e+07\n"));
        assert!(text.contains("V 3 3 1 1e+06\n"));
        assert!(!text.contains("Port nodes"));

        let start = text.find("StartVoxelList").unwrap();
        let end = text.find("EndVoxelList").unwrap();
        assert!(start < end);
        assert_eq!(parse_voxel_records(&text).unwrap().len(), 6);
    }

    #[test]
    fn records_round_trip_to_tensor_cells() {
        let mut d = two_bars();
        d.voxelize_all().unwrap();
        let text = deck_text(&d, &SolverSettings::default());
        let parsed: BTreeSet<VoxelIndex> = parse_voxel_records(&text)
            .unwrap()
            .into_iter()
            .filter(|r| (r.sigma - 1e6).abs() < 1.0)
            .map(|r| r.index)
            .collect();
        let tensor = d.tensor().unwrap();
        let expected: BTreeSet<VoxelIndex> = tensor
            .occupied()
            .filter(|(_, tag)| *tag == 2)
            .map(|(idx, _)| idx)
            .collect();
        assert_eq!(parsed, expected);
    }

    #[test]
    fn superconductor_adds_lambda_everywhere() {
        let mut d = two_bars();
        let b = d.conductors().nth(1).map(|(id, _)| id).unwrap();
        d.set_conductor_material(b, 1e6, Some(5e-8)).unwrap();
        d.voxelize_all().unwrap();
        let text = deck_text(&d, &SolverSettings::default());
        assert!(text.contains("Superconductor\n"));
        let records = parse_voxel_records(&text).unwrap();
        assert!(records.iter().all(|r| r.lambda.is_some()));
        assert!(records.iter().any(|r| r.lambda == Some(0.0)));
        assert!(records.iter().any(|r| r.lambda == Some(5e-8)));
    }

    #[test]
    fn unvoxelized_objects_are_skipped() {
        let mut d = two_bars();
        let a = d.conductors().next().map(|(id, _)| id).unwrap();
        d.voxelize_conductor(a).unwrap();
        let mut buf = Vec::new();
        let summary = VoxHenryDeck::new(&d, &SolverSettings::default())
            .write(&mut buf)
            .unwrap();
        assert_eq!(summary.conductors, 1);
        assert_eq!(summary.voxels, 3);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn invalid_voxel_space_is_an_error() {
        let d = two_bars();
        let mut buf = Vec::new();
        assert!(VoxHenryDeck::new(&d, &SolverSettings::default()).write(&mut buf).is_err());
    }

    #[test]
    fn port_nodes_are_written_one_based() {
        let mut d = two_bars();
        let end = |x: f64| {
            PlanarFace::new(vec![p(x, 0.0, 0.0), p(x, 1.0, 0.0), p(x, 1.0, 1.0), p(x, 0.0, 1.0)]).unwrap()
        };
        d.add_port(PortData::new("in port", vec![end(0.0)], vec![end(3.0)]));
        d.voxelize_all().unwrap();
        let text = deck_text(&d, &SolverSettings::default());
        assert!(text.contains("* Port in port\n"));
        assert!(text.contains("N in_port P 1 1 1 -x\n"));
        assert!(text.contains("N in_port N 3 1 1 +x\n"));

        let nodes = parse_port_nodes(&text).unwrap();
        let port = d.ports().next().unwrap().1;
        assert_eq!(
            nodes.iter().filter(|n| n.positive).count(),
            port.positive_contacts().len()
        );
        assert!(nodes.contains(&PortNode {
            port: "in_port".into(),
            positive: true,
            face: VoxelFace::new([0, 0, 0], Side::NegX),
        }));
    }

    #[test]
    fn malformed_lines_report_line_numbers() {
        let err = parse_voxel_records("* c\nV 1 2 3 1e7\nV 0 1 1 1e7\n").unwrap_err();
        assert!(err.to_string().starts_with("line 3:"));
        let err = parse_voxel_records("V 1 2 x 1e7\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
        let err = parse_port_nodes("N p Q 1 1 1 +x\n").unwrap_err();
        assert!(err.to_string().contains("polarity"));
        let err = parse_port_nodes("N p P 1 1 1 +w\n").unwrap_err();
        assert!(err.to_string().contains("line 1"));
    }

    #[test]
    fn deck_file_lands_in_folder() {
        let mut d = two_bars();
        d.voxelize_all().unwrap();
        let settings = SolverSettings {
            filename: "bars.vhr".into(),
            ..SolverSettings::default()
        };
        let dir = std::env::temp_dir().join(format!("emvox-deck-{}", std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let deck = VoxHenryDeck::new(&d, &settings);
        deck.write_to_folder(&dir, false).unwrap();
        assert!(deck.write_to_folder(&dir, false).is_err());
        let text = std::fs::read_to_string(dir.join("bars.vhr")).unwrap();
        assert_eq!(parse_voxel_records(&text).unwrap().len(), 6);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
