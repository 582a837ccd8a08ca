#![allow(clippy::unwrap_used)]

use std::collections::BTreeSet;
use std::sync::Arc;

use emvox::boundary::{boundary_faces_by_neighbors, ExtractBoundary, ShellRepr, Side};
use emvox::config::SolverSettings;
use emvox::domain::{ConductorData, ConductorId, Domain, PortData};
use emvox::export::{parse_voxel_records, VoxHenryDeck};
use emvox::geometry::{Cuboid, PlanarFace, Polyhedron, SharedSolid, Sphere};
use emvox::grid::VoxelIndex;
use emvox::math::{Point3, Vector3};
use emvox::voxelize::VoxelizeStrategy;

fn p(x: f64, y: f64, z: f64) -> Point3 {
    Point3::new(x, y, z)
}

fn block(min: Point3, max: Point3) -> SharedSolid {
    Arc::new(Cuboid::new(min, max).unwrap())
}

fn add(d: &mut Domain, label: &str, solid: SharedSolid) -> ConductorId {
    d.add_conductor(ConductorData::new(label, solid)).unwrap()
}

fn cells(d: &Domain, id: ConductorId) -> BTreeSet<VoxelIndex> {
    let tag = d.conductor(id).unwrap().tag();
    let range = d.grid().unwrap().full_range();
    d.tensor().unwrap().cells_of(tag, &range).into_iter().collect()
}

#[test]
fn overlapping_conductors_never_share_a_cell() {
    let mut d = Domain::new(1.0).unwrap();
    let a = add(&mut d, "a", block(p(0.0, 0.0, 0.0), p(6.0, 6.0, 6.0)));
    let b = add(&mut d, "b", block(p(4.0, 4.0, 4.0), p(10.0, 10.0, 10.0)));
    d.voxelize_all().unwrap();

    let cells_a = cells(&d, a);
    let cells_b = cells(&d, b);
    assert!(cells_a.is_disjoint(&cells_b));
    assert_eq!(cells_a.len(), 216);
    assert_eq!(cells_b.len(), 216 - 8);

    let tensor = d.tensor().unwrap();
    assert_eq!(tensor.occupied().count(), cells_a.len() + cells_b.len());
}

#[test]
fn revoxelizing_an_unchanged_conductor_is_idempotent() {
    let mut d = Domain::new(0.5).unwrap();
    let id = add(&mut d, "ball", Arc::new(Sphere::new(p(0.0, 0.0, 0.0), 2.2).unwrap()));
    d.voxelize_conductor(id).unwrap();
    let first = cells(&d, id);
    d.voxelize_conductor(id).unwrap();
    assert_eq!(cells(&d, id), first);
    assert!(!first.is_empty());
}

#[test]
fn boundary_matches_brute_force_neighbor_scan() {
    let profile = PlanarFace::new(vec![
        p(0.0, 0.0, 0.0),
        p(4.0, 0.0, 0.0),
        p(4.0, 2.0, 0.0),
        p(2.0, 2.0, 0.0),
        p(2.0, 4.0, 0.0),
        p(0.0, 4.0, 0.0),
    ])
    .unwrap();
    let mut d = Domain::new(0.5).unwrap();
    let prism = add(
        &mut d,
        "prism",
        Arc::new(Polyhedron::extrude(&profile, Vector3::new(0.0, 0.0, 1.5)).unwrap()),
    );
    let ball = add(&mut d, "ball", Arc::new(Sphere::new(p(6.0, 6.0, 2.0), 1.7).unwrap()));
    d.voxelize_all().unwrap();

    let tensor = d.tensor().unwrap();
    for id in [prism, ball] {
        let tag = d.conductor(id).unwrap().tag();
        let fast: BTreeSet<_> = ExtractBoundary::new(tag).faces(tensor).into_iter().collect();
        let brute: BTreeSet<_> = boundary_faces_by_neighbors(tensor, tag).into_iter().collect();
        assert!(!fast.is_empty());
        assert_eq!(fast, brute);
    }
}

#[test]
fn fast_path_and_mesh_path_agree_on_boxes() {
    let build = |strategy| {
        let mut d = Domain::new(1.0).unwrap();
        d.set_strategy(strategy);
        add(&mut d, "anchor", block(p(-2.0, -2.0, -2.0), p(-1.0, -1.0, -1.0)));
        let id = add(&mut d, "bar", block(p(0.3, 1.2, 0.0), p(7.7, 5.4, 3.3)));
        d.voxelize_all().unwrap();
        cells(&d, id)
    };
    let fast = build(VoxelizeStrategy::Auto);
    let general = build(VoxelizeStrategy::ForceGeneral);
    assert_eq!(fast.len(), 8 * 4 * 3);
    assert_eq!(fast, general);
}

#[test]
fn pitch_change_and_bbox_growth_invalidate_everything() {
    let end_face = |x: f64| {
        PlanarFace::new(vec![p(x, 0.0, 0.0), p(x, 2.0, 0.0), p(x, 2.0, 2.0), p(x, 0.0, 2.0)]).unwrap()
    };
    let mut d = Domain::new(1.0).unwrap();
    let a = add(&mut d, "a", block(p(0.0, 0.0, 0.0), p(6.0, 2.0, 2.0)));
    let b = add(&mut d, "b", block(p(0.0, 4.0, 0.0), p(6.0, 6.0, 2.0)));
    let port = d.add_port(PortData::new("p", vec![end_face(0.0)], vec![end_face(6.0)]));

    let all_voxelized = |d: &Domain| {
        d.conductor(a).unwrap().is_voxelized()
            && d.conductor(b).unwrap().is_voxelized()
            && d.port(port).unwrap().is_voxelized()
    };
    let none_voxelized = |d: &Domain| {
        !d.conductor(a).unwrap().is_voxelized()
            && !d.conductor(b).unwrap().is_voxelized()
            && !d.port(port).unwrap().is_voxelized()
    };

    assert!(d.voxelize_all().unwrap().is_complete());
    assert!(all_voxelized(&d));
    d.set_delta(0.5).unwrap();
    assert!(none_voxelized(&d));

    assert!(d.voxelize_all().unwrap().is_complete());
    assert!(all_voxelized(&d));
    d.set_conductor_solid(b, block(p(0.0, 4.0, 0.0), p(6.0, 6.0, 5.0))).unwrap();
    assert!(none_voxelized(&d));
    assert!(d.tensor().is_none());
}

#[test]
fn voxel_records_recover_the_occupied_cells() {
    let mut d = Domain::new(0.5).unwrap();
    let id = add(&mut d, "ball", Arc::new(Sphere::new(p(1.0, 1.0, 1.0), 1.3).unwrap()));
    d.voxelize_all().unwrap();

    let settings = SolverSettings::default();
    let mut out = Vec::new();
    let summary = VoxHenryDeck::new(&d, &settings).write(&mut out).unwrap();
    let text = String::from_utf8(out).unwrap();

    let parsed: BTreeSet<_> = parse_voxel_records(&text)
        .unwrap()
        .into_iter()
        .map(|r| r.index)
        .collect();
    let expected = cells(&d, id);
    assert_eq!(summary.voxels, expected.len());
    assert_eq!(parsed, expected);
}

#[test]
fn unit_cube_fills_1000_cells_with_600_quads() {
    let mut d = Domain::new(1.0).unwrap();
    let id = add(&mut d, "cube", block(p(0.0, 0.0, 0.0), p(10.0, 10.0, 10.0)));
    d.voxelize_all().unwrap();

    let tag = d.conductor(id).unwrap().tag();
    assert_eq!(d.tensor().unwrap().count(tag), 1000);
    let faces = ExtractBoundary::new(tag).faces(d.tensor().unwrap());
    assert_eq!(faces.len(), 600);
    for side in Side::ALL {
        assert_eq!(faces.iter().filter(|f| f.side == side).count(), 100);
    }
    assert_eq!(d.conductor_shell(id, ShellRepr::Faces).unwrap().quad_count(), 600);
}

#[test]
fn touching_cubes_both_keep_the_shared_interface() {
    let mut d = Domain::new(1.0).unwrap();
    let left = add(&mut d, "left", block(p(0.0, 0.0, 0.0), p(5.0, 5.0, 5.0)));
    let right = add(&mut d, "right", block(p(5.0, 0.0, 0.0), p(10.0, 5.0, 5.0)));
    d.voxelize_all().unwrap();

    assert_eq!(d.conductor(left).unwrap().tag(), 1);
    assert_eq!(d.conductor(right).unwrap().tag(), 2);
    let tensor = d.tensor().unwrap();
    assert_eq!(tensor.count(1), 125);
    assert_eq!(tensor.count(2), 125);

    let left_faces = ExtractBoundary::new(1).faces(tensor);
    let right_faces = ExtractBoundary::new(2).faces(tensor);
    assert_eq!(left_faces.len(), 150);
    assert_eq!(right_faces.len(), 150);

    let shared_left = left_faces
        .iter()
        .filter(|f| f.side == Side::PosX && f.voxel[0] == 4)
        .count();
    let shared_right = right_faces
        .iter()
        .filter(|f| f.side == Side::NegX && f.voxel[0] == 5)
        .count();
    assert_eq!(shared_left, 25);
    assert_eq!(shared_right, 25);
}
