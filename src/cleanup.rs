//! Mesh cleanup applied to every imported mesh: uniform rescale, duplicate
//! vertex merge, and hard-edge splitting.
//!
//! The operations work on a plain indexed triangle list ([`MeshData`]) that is
//! read from and written back to a Bevy [`Mesh`].

use crate::config::MeshCleanup;
use bevy::log::warn;
use bevy::math::Vec3;
use bevy::render::mesh::{Indices, Mesh, PrimitiveTopology, VertexAttributeValues};
use std::collections::HashMap;

/// Indexed triangle list with optional per-vertex normals and UVs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct MeshData {
    pub positions: Vec<[f32; 3]>,
    pub normals: Option<Vec<[f32; 3]>>,
    pub uvs: Option<Vec<[f32; 2]>>,
    /// Three indices per triangle
    pub indices: Vec<u32>,
}

/// Counts reported by [`apply`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CleanupStats {
    pub vertices_before: usize,
    pub vertices_after: usize,
    /// Vertices folded into another by remove doubles
    pub doubles_removed: usize,
    /// Triangles dropped because two corners merged
    pub degenerate_triangles_removed: usize,
}

impl std::fmt::Display for CleanupStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "vertices {} -> {}, doubles removed: {}, degenerate triangles removed: {}",
            self.vertices_before,
            self.vertices_after,
            self.doubles_removed,
            self.degenerate_triangles_removed
        )
    }
}

/// Spatial hash of merge representatives, bucketed by `distance`-sized cells.
struct MergeGrid {
    cell: f32,
    distance_sq: f32,
    cells: HashMap<(i64, i64, i64), Vec<[f32; 3]>>,
}

impl MergeGrid {
    fn new(distance: f32) -> Self {
        let distance = distance.max(0.0);
        Self {
            cell: distance.max(f32::MIN_POSITIVE),
            distance_sq: distance * distance,
            cells: HashMap::new(),
        }
    }

    fn cell_of(&self, p: [f32; 3]) -> (i64, i64, i64) {
        (
            (p[0] / self.cell).floor() as i64,
            (p[1] / self.cell).floor() as i64,
            (p[2] / self.cell).floor() as i64,
        )
    }

    /// Closest earlier representative within `distance` of `p`, or `p` itself
    /// registered as a new one. A cell is as wide as `distance`, so the 27
    /// cells around `p` hold every candidate.
    fn representative(&mut self, p: [f32; 3]) -> [f32; 3] {
        let (cx, cy, cz) = self.cell_of(p);
        let point = Vec3::from(p);

        let mut best: Option<([f32; 3], f32)> = None;
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(reps) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    for &rep in reps {
                        let d = point.distance_squared(Vec3::from(rep));
                        if d <= self.distance_sq && best.map_or(true, |(_, b)| d < b) {
                            best = Some((rep, d));
                        }
                    }
                }
            }
        }

        match best {
            Some((rep, _)) => rep,
            None => {
                self.cells.entry((cx, cy, cz)).or_default().push(p);
                p
            }
        }
    }
}

/// One vertex with every attribute, used as the unit of welding.
#[derive(Clone, Copy, Debug, PartialEq)]
struct Corner {
    position: [f32; 3],
    normal: Option<[f32; 3]>,
    uv: Option<[f32; 2]>,
}

impl Corner {
    // Bit-exact key; `+ 0.0` folds -0.0 into 0.0.
    fn key(&self) -> [u32; 8] {
        let n = self.normal.unwrap_or([f32::NAN; 3]);
        let uv = self.uv.unwrap_or([f32::NAN; 2]);
        [
            (self.position[0] + 0.0).to_bits(),
            (self.position[1] + 0.0).to_bits(),
            (self.position[2] + 0.0).to_bits(),
            (n[0] + 0.0).to_bits(),
            (n[1] + 0.0).to_bits(),
            (n[2] + 0.0).to_bits(),
            (uv[0] + 0.0).to_bits(),
            (uv[1] + 0.0).to_bits(),
        ]
    }
}

fn position_key(p: [f32; 3]) -> [u32; 3] {
    [
        (p[0] + 0.0).to_bits(),
        (p[1] + 0.0).to_bits(),
        (p[2] + 0.0).to_bits(),
    ]
}

impl MeshData {
    /// Read a triangle-list mesh. Returns `None` for other topologies or when
    /// positions are missing.
    pub fn from_mesh(mesh: &Mesh) -> Option<Self> {
        if mesh.primitive_topology() != PrimitiveTopology::TriangleList {
            return None;
        }

        let positions = match mesh.attribute(Mesh::ATTRIBUTE_POSITION)? {
            VertexAttributeValues::Float32x3(values) => values.clone(),
            _ => return None,
        };
        let normals = match mesh.attribute(Mesh::ATTRIBUTE_NORMAL) {
            Some(VertexAttributeValues::Float32x3(values)) => Some(values.clone()),
            _ => None,
        };
        let uvs = match mesh.attribute(Mesh::ATTRIBUTE_UV_0) {
            Some(VertexAttributeValues::Float32x2(values)) => Some(values.clone()),
            _ => None,
        };
        let indices = match mesh.indices() {
            Some(indices) => indices.iter().map(|i| i as u32).collect(),
            None => (0..positions.len() as u32).collect(),
        };

        Some(Self {
            positions,
            normals,
            uvs,
            indices,
        })
    }

    /// Write the data back, replacing positions, normals, UVs and indices.
    ///
    /// Any other vertex attribute no longer lines up with the rewritten
    /// vertex buffer and is removed.
    pub fn write_to(&self, mesh: &mut Mesh) {
        let stale: Vec<_> = mesh
            .attributes()
            .map(|(attribute, _)| attribute.id)
            .filter(|id| {
                *id != Mesh::ATTRIBUTE_POSITION.id
                    && *id != Mesh::ATTRIBUTE_NORMAL.id
                    && *id != Mesh::ATTRIBUTE_UV_0.id
            })
            .collect();
        for id in stale {
            mesh.remove_attribute(id);
        }

        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, self.positions.clone());
        match &self.normals {
            Some(normals) => mesh.insert_attribute(Mesh::ATTRIBUTE_NORMAL, normals.clone()),
            None => {
                mesh.remove_attribute(Mesh::ATTRIBUTE_NORMAL);
            }
        }
        match &self.uvs {
            Some(uvs) => mesh.insert_attribute(Mesh::ATTRIBUTE_UV_0, uvs.clone()),
            None => {
                mesh.remove_attribute(Mesh::ATTRIBUTE_UV_0);
            }
        }
        mesh.insert_indices(Indices::U32(self.indices.clone()));
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    fn corner(&self, vertex: usize) -> Corner {
        Corner {
            position: self.positions[vertex],
            normal: self.normals.as_ref().map(|n| n[vertex]),
            uv: self.uvs.as_ref().map(|uv| uv[vertex]),
        }
    }

    fn triangles(&self) -> impl Iterator<Item = [usize; 3]> + '_ {
        self.indices
            .chunks_exact(3)
            .map(|t| [t[0] as usize, t[1] as usize, t[2] as usize])
    }

    /// Multiply every position by `factor`.
    pub fn scale(&mut self, factor: f32) {
        for p in &mut self.positions {
            for c in p.iter_mut() {
                *c *= factor;
            }
        }
    }

    /// Merge vertices closer than `distance`.
    ///
    /// Each position is replaced by the first earlier position within
    /// `distance` of it, if any. Vertices that then agree in every
    /// attribute are welded, triangles with two corners at the same position
    /// are dropped, and unreferenced vertices are removed.
    ///
    /// Returns `(vertices removed, triangles removed)`.
    pub fn remove_doubles(&mut self, distance: f32) -> (usize, usize) {
        let before_vertices = self.vertex_count();
        let before_triangles = self.triangle_count();
        if before_vertices == 0 {
            return (0, 0);
        }

        let mut grid = MergeGrid::new(distance);
        for p in &mut self.positions {
            *p = grid.representative(*p);
        }

        let corners: Vec<[Corner; 3]> = self
            .triangles()
            .filter(|t| t.iter().all(|&i| i < before_vertices))
            .map(|[a, b, c]| [self.corner(a), self.corner(b), self.corner(c)])
            .filter(|[a, b, c]| {
                a.position != b.position && b.position != c.position && a.position != c.position
            })
            .collect();

        *self = Self::weld(&corners, self.normals.is_some(), self.uvs.is_some());

        (
            before_vertices.saturating_sub(self.vertex_count()),
            before_triangles - self.triangle_count(),
        )
    }

    /// Recompute normals so edges sharper than `split_angle` (radians) shade
    /// hard and everything else shades smooth.
    ///
    /// Every triangle corner gets the area-weighted sum of the normals of the
    /// triangles sharing its position whose normal lies within `split_angle`
    /// of its own triangle's normal. Corners that end up identical are welded.
    pub fn edge_split(&mut self, split_angle: f32) {
        let triangles: Vec<[usize; 3]> = self
            .triangles()
            .filter(|t| t.iter().all(|&i| i < self.positions.len()))
            .collect();

        // Unnormalized face normals, length is twice the area.
        let face_normals: Vec<Vec3> = triangles
            .iter()
            .map(|&[a, b, c]| {
                let (pa, pb, pc) = (
                    Vec3::from(self.positions[a]),
                    Vec3::from(self.positions[b]),
                    Vec3::from(self.positions[c]),
                );
                (pb - pa).cross(pc - pa)
            })
            .collect();

        let mut faces_at: HashMap<[u32; 3], Vec<usize>> = HashMap::new();
        for (face, tri) in triangles.iter().enumerate() {
            for &v in tri {
                faces_at
                    .entry(position_key(self.positions[v]))
                    .or_default()
                    .push(face);
            }
        }

        let cos_limit = split_angle.cos();
        let mut corners = Vec::with_capacity(triangles.len());
        for (face, tri) in triangles.iter().enumerate() {
            let own = face_normals[face].normalize_or_zero();
            let mut tri_corners = [Corner {
                position: [0.0; 3],
                normal: None,
                uv: None,
            }; 3];

            for (slot, &v) in tri.iter().enumerate() {
                let mut sum = Vec3::ZERO;
                if let Some(neighbours) = faces_at.get(&position_key(self.positions[v])) {
                    let mut seen: Vec<usize> = Vec::with_capacity(neighbours.len());
                    for &other in neighbours {
                        if seen.contains(&other) {
                            continue;
                        }
                        seen.push(other);
                        let n = face_normals[other];
                        if n.normalize_or_zero().dot(own) >= cos_limit {
                            sum += n;
                        }
                    }
                }
                let normal = if sum.length_squared() > 0.0 {
                    sum.normalize()
                } else {
                    own
                };

                let mut corner = self.corner(v);
                corner.normal = Some(normal.to_array());
                tri_corners[slot] = corner;
            }
            corners.push(tri_corners);
        }

        *self = Self::weld(&corners, true, self.uvs.is_some());
    }

    fn weld(triangles: &[[Corner; 3]], has_normals: bool, has_uvs: bool) -> Self {
        let mut out = MeshData {
            normals: has_normals.then(Vec::new),
            uvs: has_uvs.then(Vec::new),
            ..Default::default()
        };
        let mut lookup: HashMap<[u32; 8], u32> = HashMap::new();

        for tri in triangles {
            for corner in tri {
                let index = *lookup.entry(corner.key()).or_insert_with(|| {
                    out.positions.push(corner.position);
                    if let Some(normals) = out.normals.as_mut() {
                        normals.push(corner.normal.unwrap_or([0.0; 3]));
                    }
                    if let Some(uvs) = out.uvs.as_mut() {
                        uvs.push(corner.uv.unwrap_or([0.0; 2]));
                    }
                    (out.positions.len() - 1) as u32
                });
                out.indices.push(index);
            }
        }
        out
    }
}

/// Apply `cleanup` to a Bevy mesh in place.
///
/// Returns `None` and leaves the mesh untouched when it is not a triangle
/// list with float positions.
pub fn apply(mesh: &mut Mesh, cleanup: &MeshCleanup) -> Option<CleanupStats> {
    let Some(mut data) = MeshData::from_mesh(mesh) else {
        warn!(
            "Skipping cleanup of mesh with topology {:?}",
            mesh.primitive_topology()
        );
        return None;
    };

    let mut stats = CleanupStats {
        vertices_before: data.vertex_count(),
        ..Default::default()
    };

    if cleanup.scale != 1.0 {
        data.scale(cleanup.scale);
    }
    if cleanup.remove_doubles {
        let (vertices, triangles) = data.remove_doubles(cleanup.merge_distance);
        stats.doubles_removed = vertices;
        stats.degenerate_triangles_removed = triangles;
    }
    if cleanup.edge_split {
        data.edge_split(cleanup.split_angle);
    }

    stats.vertices_after = data.vertex_count();
    data.write_to(mesh);
    Some(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bevy::render::render_asset::RenderAssetUsages;

    /// Unit quad split into two triangles with four shared corners duplicated
    /// the way an unindexed export would write them.
    fn unwelded_quad() -> MeshData {
        MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [1.0, 1.0, 0.0],
                [0.0, 1.0, 0.0],
            ],
            normals: None,
            uvs: None,
            indices: vec![0, 1, 2, 3, 4, 5],
        }
    }

    /// Two triangles meeting at a right angle along the X axis.
    fn folded_pair() -> MeshData {
        MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.0, 0.0, 1.0],
                [1.0, 0.0, 0.0],
            ],
            normals: None,
            uvs: None,
            indices: vec![0, 1, 2, 3, 4, 5],
        }
    }

    #[test]
    fn test_scale() {
        let mut data = unwelded_quad();
        data.scale(2.0);
        assert_eq!(data.positions[2], [2.0, 2.0, 0.0]);
    }

    #[test]
    fn test_remove_doubles_welds_exact_duplicates() {
        let mut data = unwelded_quad();
        let (removed, dropped) = data.remove_doubles(1e-4);
        assert_eq!(removed, 2);
        assert_eq!(dropped, 0);
        assert_eq!(data.vertex_count(), 4);
        assert_eq!(data.triangle_count(), 2);
    }

    #[test]
    fn test_remove_doubles_snaps_close_positions() {
        let mut data = unwelded_quad();
        data.positions[3] = [0.00002, -0.00001, 0.0];
        let (removed, _) = data.remove_doubles(1e-4);
        assert_eq!(removed, 2);
    }

    #[test]
    fn test_remove_doubles_merges_across_cell_boundary() {
        let mut data = unwelded_quad();
        data.positions[0] = [0.49999e-4, 0.0, 0.0];
        data.positions[3] = [0.50001e-4, 0.0, 0.0];
        let (removed, dropped) = data.remove_doubles(1e-4);
        assert_eq!(removed, 2);
        assert_eq!(dropped, 0);
        assert!(data.positions.contains(&[0.49999e-4, 0.0, 0.0]));
    }

    #[test]
    fn test_remove_doubles_keeps_points_beyond_distance() {
        let mut data = unwelded_quad();
        data.positions[3] = [1.5e-4, 0.0, 0.0];
        let (removed, _) = data.remove_doubles(1e-4);
        assert_eq!(removed, 1);
        assert_eq!(data.vertex_count(), 5);
    }

    #[test]
    fn test_remove_doubles_keeps_uv_seams() {
        let mut data = unwelded_quad();
        data.uvs = Some(vec![
            [0.0, 0.0],
            [1.0, 0.0],
            [1.0, 1.0],
            [0.5, 0.5], // different UV at a shared position
            [1.0, 1.0],
            [0.0, 1.0],
        ]);
        let (removed, _) = data.remove_doubles(1e-4);
        assert_eq!(removed, 1);
        assert_eq!(data.vertex_count(), 5);
    }

    #[test]
    fn test_remove_doubles_drops_collapsed_triangles() {
        let mut data = MeshData {
            positions: vec![
                [0.0, 0.0, 0.0],
                [1.0, 0.0, 0.0],
                [0.0, 1.0, 0.0],
                [0.0, 0.0, 0.0],
                [0.00001, 0.0, 0.0],
                [0.0, 0.0, 1.0],
            ],
            normals: None,
            uvs: None,
            indices: vec![0, 1, 2, 3, 4, 5],
        };
        let (_, dropped) = data.remove_doubles(1e-4);
        assert_eq!(dropped, 1);
        assert_eq!(data.triangle_count(), 1);
        assert_eq!(data.vertex_count(), 3);
    }

    #[test]
    fn test_remove_doubles_empty() {
        let mut data = MeshData::default();
        assert_eq!(data.remove_doubles(1e-4), (0, 0));
    }

    #[test]
    fn test_edge_split_smooths_flat_surface() {
        let mut data = unwelded_quad();
        data.edge_split(1.32645);

        let normals = data.normals.as_ref().unwrap();
        for n in normals {
            assert!((Vec3::from(*n) - Vec3::Z).length() < 1e-5);
        }
        // Coplanar corners at shared positions weld.
        assert_eq!(data.vertex_count(), 4);
    }

    #[test]
    fn test_edge_split_keeps_sharp_fold_hard() {
        let mut data = folded_pair();
        data.edge_split(1.32645);

        // The 90 degree fold is sharper than 76 degrees, so shared corners
        // keep one normal per face and are not welded.
        assert_eq!(data.vertex_count(), 6);
        let normals = data.normals.as_ref().unwrap();
        assert!((Vec3::from(normals[0]) - Vec3::Z).length() < 1e-5);
        assert!((Vec3::from(normals[3]) - Vec3::Y).length() < 1e-5);
    }

    #[test]
    fn test_edge_split_smooths_shallow_fold() {
        let mut data = folded_pair();
        data.edge_split(std::f32::consts::PI);

        // Everything within the angle: shared corners average and weld.
        assert_eq!(data.vertex_count(), 4);
        let normals = data.normals.as_ref().unwrap();
        let expected = (Vec3::Z + Vec3::Y).normalize();
        assert!((Vec3::from(normals[0]) - expected).length() < 1e-5);
    }

    #[test]
    fn test_apply_to_bevy_mesh() {
        let mut mesh = Mesh::new(
            PrimitiveTopology::TriangleList,
            RenderAssetUsages::default(),
        );
        let data = unwelded_quad();
        mesh.insert_attribute(Mesh::ATTRIBUTE_POSITION, data.positions.clone());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_UV_0,
            vec![[0.0_f32, 0.0]; data.positions.len()],
        );

        let cleanup = MeshCleanup {
            scale: 3.0,
            ..MeshCleanup::default()
        };
        let stats = apply(&mut mesh, &cleanup).unwrap();

        assert_eq!(stats.vertices_before, 6);
        assert_eq!(stats.doubles_removed, 2);
        assert_eq!(stats.vertices_after, 4);
        assert!(mesh.attribute(Mesh::ATTRIBUTE_NORMAL).is_some());
        assert_eq!(mesh.indices().unwrap().len(), 6);

        let back = MeshData::from_mesh(&mesh).unwrap();
        assert!(back.positions.contains(&[3.0, 3.0, 0.0]));
    }

    #[test]
    fn test_apply_skips_non_triangle_meshes() {
        let mut mesh = Mesh::new(PrimitiveTopology::LineList, RenderAssetUsages::default());
        mesh.insert_attribute(
            Mesh::ATTRIBUTE_POSITION,
            vec![[0.0_f32, 0.0, 0.0], [1.0, 0.0, 0.0]],
        );
        assert!(apply(&mut mesh, &MeshCleanup::default()).is_none());
    }

    #[test]
    fn test_stats_display() {
        let stats = CleanupStats {
            vertices_before: 6,
            vertices_after: 4,
            doubles_removed: 2,
            degenerate_triangles_removed: 0,
        };
        assert!(stats.to_string().contains("6 -> 4"));
    }
}
