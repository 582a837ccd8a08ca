//! Voxelizes a small two-conductor layout and writes the solver decks.
//!
//! Usage:
//! ```text
//! cargo run --example voxelize                               # defaults, writes to ./emvox-out
//! cargo run --example voxelize -- settings.toml out_dir      # custom settings and folder
//! RUST_LOG=emvox=debug cargo run --example voxelize          # per-stage logging
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use emvox::boundary::ShellRepr;
use emvox::config::SolverSettings;
use emvox::domain::{ConductorData, Domain, PortData};
use emvox::export::fastercap::{panels_from_shell, write_panels_to_path};
use emvox::export::{FastHenryDeck, PanelKind, Segment, VoxHenryDeck};
use emvox::geometry::{Cuboid, PlanarFace, Polyhedron, Sphere};
use emvox::math::{Point3, Vector3};
use emvox::Result;

fn main() -> Result<()> {
    // Default: WARN for everything, INFO for emvox.
    // Override with RUST_LOG env var (e.g. RUST_LOG=emvox=debug).
    let env_filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing_subscriber::filter::LevelFilter::WARN.into())
        .add_directive("emvox=info".parse().unwrap_or_default());
    tracing_subscriber::fmt().with_env_filter(env_filter).init();

    let mut args = std::env::args().skip(1);
    let settings = match args.next() {
        Some(path) => {
            let text = std::fs::read_to_string(&path).map_err(emvox::error::ExportError::from)?;
            SolverSettings::from_toml_str(&text)?
        }
        None => SolverSettings::default(),
    };
    let folder = args.next().map_or_else(|| PathBuf::from("emvox-out"), PathBuf::from);

    let mut domain = Domain::from_settings(&settings)?;

    // A trace with a bent end, a via-like sphere, and a ground plate.
    let trace = domain.add_conductor(ConductorData::new(
        "trace",
        Arc::new(Cuboid::new(Point3::new(0.0, 4.0, 2.0), Point3::new(16.0, 6.0, 3.0))?),
    ))?;
    let profile = PlanarFace::new(vec![
        Point3::new(16.0, 4.0, 2.0),
        Point3::new(20.0, 4.0, 2.0),
        Point3::new(20.0, 14.0, 2.0),
        Point3::new(18.0, 14.0, 2.0),
        Point3::new(18.0, 6.0, 2.0),
        Point3::new(16.0, 6.0, 2.0),
    ])?;
    let bend = domain.add_conductor(ConductorData::new(
        "bend",
        Arc::new(Polyhedron::extrude(&profile, Vector3::new(0.0, 0.0, 1.0))?),
    ))?;
    let via = domain.add_conductor(
        ConductorData::new("via", Arc::new(Sphere::new(Point3::new(8.0, 10.0, 6.0), 2.5)?))
            .with_sigma(1e7),
    )?;
    domain.add_conductor(ConductorData::new(
        "ground",
        Arc::new(Cuboid::new(Point3::new(0.0, 0.0, 0.0), Point3::new(20.0, 14.0, 1.0))?),
    ))?;

    // Driven across the free end of the trace and the far end of the bend.
    let start = PlanarFace::new(vec![
        Point3::new(0.0, 4.0, 2.0),
        Point3::new(0.0, 6.0, 2.0),
        Point3::new(0.0, 6.0, 3.0),
        Point3::new(0.0, 4.0, 3.0),
    ])?;
    let end = PlanarFace::new(vec![
        Point3::new(18.0, 14.0, 2.0),
        Point3::new(20.0, 14.0, 2.0),
        Point3::new(20.0, 14.0, 3.0),
        Point3::new(18.0, 14.0, 3.0),
    ])?;
    domain.add_port(PortData::new("p1", vec![start], vec![end]));

    let summary = domain.voxelize_all()?;
    println!(
        "voxelized {} conductors and {} ports ({} failed)",
        summary.conductors,
        summary.ports,
        summary.failed_conductors.len() + summary.failed_ports.len()
    );
    if let Some(grid) = domain.grid() {
        println!("grid {:?} at pitch {}", grid.dims(), grid.delta());
    }

    for id in [trace, bend, via] {
        let label = domain.conductor(id)?.label().to_string();
        let shell = domain.conductor_shell(id, ShellRepr::Faces)?;
        println!("{label}: {} boundary quads", shell.quad_count());
        let panels = panels_from_shell(shell)?;
        let path = folder.join(format!("{label}.txt"));
        write_panels_to_path(&path, true, &label, &panels, PanelKind::Conductor)?;
    }

    let deck = VoxHenryDeck::new(&domain, &settings).write_to_folder(&folder, true)?;
    println!(
        "wrote {} voxels and {} contacts to {}",
        deck.voxels,
        deck.contacts,
        folder.join(&settings.filename).display()
    );

    // The same trace as a single FastHenry bar, for a filament cross-check.
    let mut bar = FastHenryDeck::from_settings(&settings)?;
    let near = bar.add_node("near", Point3::new(0.0, 5.0, 2.5))?;
    let far = bar.add_node("far", Point3::new(16.0, 5.0, 2.5))?;
    bar.add_segment(Segment::new("trace", near, far, 2.0, 1.0).with_filaments(3, 5))?;
    bar.add_port(near, far)?;
    bar.write_to_path(&folder.join(emvox::export::fasthenry::DEFAULT_FILENAME), true)?;
    Ok(())
}
