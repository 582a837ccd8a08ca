use std::collections::{HashMap, HashSet, VecDeque};

use spade::handles::{FixedFaceHandle, InnerTag};
use spade::{
    ConstrainedDelaunayTriangulation, InsertionError, Point2 as SpadePoint2, Triangulation,
};

use crate::error::{Result, TessellationError};
use crate::geometry::PlanarFace;

use super::TriangleMesh;

/// Triangulates a planar polygon face.
///
/// Triangles share the face orientation: counter-clockwise around the face
/// normal. Concave outlines are handled by a constrained Delaunay
/// triangulation of the outline projected onto the face plane.
pub struct TessellateFace<'a> {
    face: &'a PlanarFace,
}

impl<'a> TessellateFace<'a> {
    /// Creates a new `TessellateFace` operation.
    #[must_use]
    pub fn new(face: &'a PlanarFace) -> Self {
        Self { face }
    }

    /// Executes the tessellation.
    ///
    /// # Errors
    ///
    /// Returns an error if the outline cannot be inserted into the
    /// triangulation.
    #[allow(clippy::cast_possible_truncation)]
    pub fn execute(&self) -> Result<TriangleMesh> {
        let plane = self.face.plane();
        let normal = *plane.plane_normal();
        let vertices = self.face.vertices();

        if vertices.len() == 3 {
            return Ok(TriangleMesh {
                vertices: vertices.to_vec(),
                normals: vec![normal; 3],
                indices: vec![[0, 1, 2]],
            });
        }

        let outline: Vec<SpadePoint2<f64>> = vertices
            .iter()
            .map(|p| {
                let (u, v) = plane.project(p);
                SpadePoint2::new(u, v)
            })
            .collect();

        let mut cdt = ConstrainedDelaunayTriangulation::<SpadePoint2<f64>>::new();
        insert_constraint_loop(&mut cdt, &outline)?;
        let interior = classify_interior_faces(&cdt);

        let mut mesh = TriangleMesh::default();
        let mut vertex_map: HashMap<usize, u32> = HashMap::new();

        for face_handle in cdt.inner_faces() {
            if !interior.contains(&face_handle.fix().index()) {
                continue;
            }
            let mut tri = [0u32; 3];
            for (slot, vh) in face_handle.vertices().iter().enumerate() {
                let key = vh.fix().index();
                tri[slot] = *vertex_map.entry(key).or_insert_with(|| {
                    let pos = vh.position();
                    mesh.vertices.push(plane.lift(pos.x, pos.y));
                    mesh.normals.push(normal);
                    (mesh.vertices.len() - 1) as u32
                });
            }
            mesh.indices.push(tri);
        }

        if mesh.is_empty() {
            return Err(TessellationError::Failed("face produced no interior triangles".into()).into());
        }
        Ok(mesh)
    }
}

/// Inserts a closed polygon as constraint edges into the CDT.
fn insert_constraint_loop(
    cdt: &mut ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
    points: &[SpadePoint2<f64>],
) -> Result<()> {
    if points.len() < 3 {
        return Err(
            TessellationError::Failed("constraint loop needs at least 3 points".into()).into(),
        );
    }

    let mut handles = Vec::with_capacity(points.len());
    for &pt in points {
        let h = cdt
            .insert(pt)
            .map_err(|e: InsertionError| TessellationError::Failed(format!("CDT insert: {e}")))?;
        handles.push(h);
    }

    for i in 0..handles.len() {
        let from = handles[i];
        let to = handles[(i + 1) % handles.len()];
        if from != to {
            cdt.add_constraint(from, to);
        }
    }

    Ok(())
}

/// Flood-fills the CDT faces from the outer face, counting crossed
/// constraint edges. Odd depth = interior.
fn classify_interior_faces(
    cdt: &ConstrainedDelaunayTriangulation<SpadePoint2<f64>>,
) -> HashSet<usize> {
    let mut interior = HashSet::new();
    let mut depth_map: HashMap<usize, u32> = HashMap::new();
    let mut queue: VecDeque<(FixedFaceHandle<InnerTag>, u32)> = VecDeque::new();

    let outer_fix = cdt.outer_face().fix();

    for edge in cdt.directed_edges() {
        if edge.face().fix() != outer_fix {
            continue;
        }
        if let Some(inner) = edge.rev().face().as_inner() {
            let idx = inner.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let depth = u32::from(cdt.is_constraint_edge(edge.as_undirected().fix()));
            depth_map.insert(idx, depth);
            if depth % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((inner.fix(), depth));
        }
    }

    while let Some((face_fix, depth)) = queue.pop_front() {
        for edge in cdt.face(face_fix).adjacent_edges() {
            let Some(neighbor) = edge.rev().face().as_inner() else {
                continue;
            };
            let idx = neighbor.fix().index();
            if depth_map.contains_key(&idx) {
                continue;
            }
            let crossed = cdt.is_constraint_edge(edge.as_undirected().fix());
            let next = depth + u32::from(crossed);
            depth_map.insert(idx, next);
            if next % 2 == 1 {
                interior.insert(idx);
            }
            queue.push_back((neighbor.fix(), next));
        }
    }

    interior
}
