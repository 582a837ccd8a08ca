use std::io::{self, Write};
use std::path::Path;

use tracing::{debug, warn};

use crate::boundary::VoxelShell;
use crate::error::{ExportError, Result};
use crate::geometry::PlanarFace;
use crate::math::{Point3, Vector3};
use crate::tessellation::{TessellateFace, TriangleMesh};

use super::create_output;

/// Whether panels bound a conductor or separate two dielectrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PanelKind {
    Conductor,
    /// Each panel carries a reference point on the side of its normal.
    Dielectric,
}

/// Writes a FasterCap panel file.
///
/// Triangles become `T` lines, quadrilaterals `Q` lines. Panels with more
/// than four vertices are triangulated first. Dielectric panels end with a
/// reference point offset from the panel center along its normal by the
/// mean edge length.
///
/// # Errors
///
/// Returns an error if a large panel cannot be triangulated or on I/O
/// failure.
pub fn write_panels<W: Write>(
    out: &mut W,
    name: &str,
    panels: &[PlanarFace],
    kind: PanelKind,
) -> Result<usize> {
    let panels = split_large_panels(panels)?;
    let name = name.split_whitespace().collect::<Vec<_>>().join("_");
    write_lines(out, &name, &panels, kind).map_err(ExportError::from)?;
    debug!(panels = panels.len(), "panel file written");
    Ok(panels.len())
}

/// Writes a FasterCap panel file to `path`.
///
/// # Errors
///
/// Returns an error if the file exists and `overwrite` is false, or for the
/// reasons listed on [`write_panels`].
pub fn write_panels_to_path(
    path: &Path,
    overwrite: bool,
    name: &str,
    panels: &[PlanarFace],
    kind: PanelKind,
) -> Result<usize> {
    let mut out = create_output(path, overwrite)?;
    let count = write_panels(&mut out, name, panels, kind)?;
    out.flush().map_err(ExportError::from)?;
    Ok(count)
}

/// Panels of a triangle mesh. Degenerate triangles are dropped.
#[must_use]
pub fn panels_from_mesh(mesh: &TriangleMesh) -> Vec<PlanarFace> {
    let panels: Vec<PlanarFace> = mesh
        .triangles()
        .filter_map(|t| PlanarFace::new(t.to_vec()).ok())
        .collect();
    let dropped = mesh.triangle_count() - panels.len();
    if dropped > 0 {
        warn!(dropped, "degenerate mesh triangles skipped");
    }
    panels
}

/// Panels of a voxel shell, one quadrilateral per voxel side.
///
/// # Errors
///
/// Returns an error if a quad of a point shell is degenerate.
pub fn panels_from_shell(shell: &VoxelShell) -> Result<Vec<PlanarFace>> {
    match shell {
        VoxelShell::Faces(faces) => Ok(faces.clone()),
        VoxelShell::Points(points) => points
            .chunks_exact(4)
            .map(|quad| PlanarFace::new(quad.to_vec()))
            .collect(),
    }
}

fn split_large_panels(panels: &[PlanarFace]) -> Result<Vec<PlanarFace>> {
    let mut out = Vec::with_capacity(panels.len());
    for panel in panels {
        if panel.vertices().len() <= 4 {
            out.push(panel.clone());
        } else {
            let mesh = TessellateFace::new(panel).execute()?;
            out.extend(panels_from_mesh(&mesh));
        }
    }
    Ok(out)
}

#[allow(clippy::cast_precision_loss)]
fn write_lines<W: Write>(out: &mut W, name: &str, panels: &[PlanarFace], kind: PanelKind) -> io::Result<()> {
    let what = match kind {
        PanelKind::Conductor => "conductor",
        PanelKind::Dielectric => "dielectric",
    };
    writeln!(out, "0 {what} definition file for '{name}' created by emvox")?;
    writeln!(out, "*")?;
    for panel in panels {
        let vertices = panel.vertices();
        let letter = if vertices.len() == 3 { 'T' } else { 'Q' };
        write!(out, "{letter} {name}")?;
        for v in vertices {
            write!(out, "  {} {} {}", v.x, v.y, v.z)?;
        }
        if kind == PanelKind::Dielectric {
            let center = vertices.iter().fold(Vector3::zeros(), |acc, v| acc + v.coords) / vertices.len() as f64;
            let reference = Point3::from(center + panel.normal() * panel.mean_edge_length());
            write!(out, "  {} {} {}", reference.x, reference.y, reference.z)?;
        }
        writeln!(out)?;
    }
    Ok(())
}

/// One panel read back from a FasterCap file.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelRecord {
    pub conductor: String,
    /// Three or four vertices.
    pub vertices: Vec<Point3>,
    /// Dielectric reference point.
    pub reference: Option<Point3>,
    /// Charge density appended by the solver.
    pub charge: Option<f64>,
}

/// Reads the `T` and `Q` lines of a FasterCap panel file.
///
/// The first line is the title and is skipped, as are comments and other
/// statements. A panel line may end with a dielectric reference point, a
/// charge density, or both.
///
/// # Errors
///
/// Returns [`ExportError::Parse`] with the 1-based line number of the first
/// malformed panel.
pub fn read_panels(text: &str) -> Result<Vec<PanelRecord>> {
    let mut panels = Vec::new();
    for (n, line) in text.lines().enumerate().skip(1) {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        let corners = match tokens.first() {
            Some(&"T") => 3,
            Some(&"Q") => 4,
            _ => continue,
        };
        let line = n + 1;
        let base = 2 + 3 * corners;
        let values = tokens
            .get(2..)
            .unwrap_or_default()
            .iter()
            .map(|t| {
                t.parse::<f64>()
                    .map_err(|_| ExportError::Parse { line, message: format!("invalid number '{t}'") })
            })
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let (reference, charge) = match tokens.len().checked_sub(base) {
            Some(0) => (None, None),
            Some(1) => (None, Some(values[base - 2])),
            Some(3) => (Some(point(&values[base - 2..])), None),
            Some(4) => (Some(point(&values[base - 2..])), Some(values[base + 1])),
            _ => {
                return Err(ExportError::Parse {
                    line,
                    message: format!("unexpected field count {} for a {corners}-vertex panel", tokens.len() - 1),
                }
                .into())
            }
        };
        panels.push(PanelRecord {
            conductor: tokens.get(1).copied().unwrap_or_default().to_string(),
            vertices: values[..3 * corners].chunks_exact(3).map(point).collect(),
            reference,
            charge,
        });
    }
    Ok(panels)
}

fn point(v: &[f64]) -> Point3 {
    Point3::new(v[0], v[1], v[2])
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::boundary::{ExtractBoundary, ShellRepr};
    use crate::grid::{GridIndex, IndexRange, OccupancyTensor};
    use crate::math::Aabb;
    use approx::assert_relative_eq;

    fn p(x: f64, y: f64, z: f64) -> Point3 {
        Point3::new(x, y, z)
    }

    fn text_of(panels: &[PlanarFace], kind: PanelKind) -> String {
        let mut buf = Vec::new();
        write_panels(&mut buf, "plate one", panels, kind).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn conductor_panels_read_back() {
        let tri = PlanarFace::new(vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0)]).unwrap();
        let quad = PlanarFace::new(vec![p(0.0, 0.0, 1.0), p(2.0, 0.0, 1.0), p(2.0, 2.0, 1.0), p(0.0, 2.0, 1.0)]).unwrap();
        let text = text_of(&[tri.clone(), quad.clone()], PanelKind::Conductor);
        assert!(text.starts_with("0 conductor"));
        assert!(text.contains("\nT plate_one  0 0 0  1 0 0  0 1 0\n"));

        let panels = read_panels(&text).unwrap();
        assert_eq!(panels.len(), 2);
        assert_eq!(panels[0].vertices, tri.vertices());
        assert_eq!(panels[1].vertices, quad.vertices());
        assert_eq!(panels[1].conductor, "plate_one");
        assert!(panels.iter().all(|p| p.reference.is_none() && p.charge.is_none()));
    }

    #[test]
    fn dielectric_reference_point_follows_normal() {
        let quad = PlanarFace::new(vec![p(0.0, 0.0, 0.0), p(2.0, 0.0, 0.0), p(2.0, 2.0, 0.0), p(0.0, 2.0, 0.0)]).unwrap();
        let panels = read_panels(&text_of(&[quad], PanelKind::Dielectric)).unwrap();
        let reference = panels[0].reference.unwrap();
        assert_relative_eq!(reference, p(1.0, 1.0, 2.0), epsilon = 1e-12);
    }

    #[test]
    fn large_polygons_are_triangulated() {
        let hexagon: Vec<Point3> = (0..6)
            .map(|i| {
                let a = f64::from(i) * std::f64::consts::FRAC_PI_3;
                p(a.cos(), a.sin(), 0.0)
            })
            .collect();
        let face = PlanarFace::new(hexagon).unwrap();
        let mut buf = Vec::new();
        let count = write_panels(&mut buf, "hex", &[face.clone()], PanelKind::Conductor).unwrap();
        assert_eq!(count, 4);
        let panels = read_panels(&String::from_utf8(buf).unwrap()).unwrap();
        let area: f64 = panels
            .iter()
            .map(|p| PlanarFace::new(p.vertices.clone()).unwrap().area())
            .sum();
        assert_relative_eq!(area, face.area(), epsilon = 1e-9);
    }

    #[test]
    fn trailing_charge_and_reference_are_recognized() {
        let text = "0 title\n\
                    * comment\n\
                    T c 0 0 0 1 0 0 0 1 0 2.5\n\
                    Q c 0 0 0 1 0 0 1 1 0 0 1 0 0.5 0.5 1 -1e-3\n\
                    N c d\n\
                    T c 0 0 0 1 0 0 0 1 0 0 0 1\n";
        let panels = read_panels(text).unwrap();
        assert_eq!(panels.len(), 3);
        assert_eq!(panels[0].charge, Some(2.5));
        assert_eq!(panels[1].reference, Some(p(0.5, 0.5, 1.0)));
        assert_eq!(panels[1].charge, Some(-1e-3));
        assert_eq!(panels[2].reference, Some(p(0.0, 0.0, 1.0)));
        assert_eq!(panels[2].charge, None);
    }

    #[test]
    fn malformed_panels_report_line_numbers() {
        let err = read_panels("0 t\nT c 0 0 0 1 0 0 0 1\n").unwrap_err();
        assert!(err.to_string().starts_with("line 2:"));
        let err = read_panels("0 t\n\nQ c 0 0 0 1 0 0 1 1 0 0 one 0\n").unwrap_err();
        assert!(err.to_string().contains("line 3"));
    }

    #[test]
    fn voxel_shell_exports_one_quad_per_side() {
        let grid = GridIndex::new(&Aabb::new(p(0.0, 0.0, 0.0), p(2.0, 1.0, 1.0)), 1.0).unwrap();
        let mut tensor = OccupancyTensor::for_grid(&grid);
        tensor.fill_region(&IndexRange::new([0, 0, 0], [1, 0, 0]), 1);
        let shell = ExtractBoundary::new(1).execute(&grid, &tensor, ShellRepr::Points).unwrap();
        let panels = panels_from_shell(&shell).unwrap();
        assert_eq!(panels.len(), 10);
        let text = text_of(&panels, PanelKind::Conductor);
        assert_eq!(text.lines().filter(|l| l.starts_with("Q ")).count(), 10);
    }

    #[test]
    fn mesh_panels_skip_degenerate_triangles() {
        let mesh = TriangleMesh {
            vertices: vec![p(0.0, 0.0, 0.0), p(1.0, 0.0, 0.0), p(0.0, 1.0, 0.0), p(2.0, 0.0, 0.0)],
            normals: Vec::new(),
            indices: vec![[0, 1, 2], [0, 1, 3]],
        };
        assert_eq!(panels_from_mesh(&mesh).len(), 1);
    }
}
