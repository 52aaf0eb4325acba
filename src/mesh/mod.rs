pub mod flatten;
pub mod normals;
pub mod obj;

use std::path::Path;

use anyhow::Result;
use glam::{Vec2, Vec3};
use log::{info, warn};

use flatten::flatten;
use normals::{needs_synthesis, synthesize_smooth_normals};
use obj::{ObjModel, load_obj};

/// Non-indexed triangle list: every three consecutive vertices form one triangle.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct MeshData {
    pub positions: Vec<Vec3>,
    /// Empty unless the source declared texture coordinates.
    pub uvs: Vec<Vec2>,
    pub normals: Vec<Vec3>,
}

impl MeshData {
    pub fn with_capacity(vertices: usize, with_uvs: bool) -> Self {
        Self {
            positions: Vec::with_capacity(vertices),
            uvs: Vec::with_capacity(if with_uvs { vertices } else { 0 }),
            normals: Vec::with_capacity(vertices),
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    pub fn triangle_count(&self) -> usize {
        self.positions.len() / 3
    }

    pub fn bounds(&self) -> Bounds {
        Bounds::from_positions(&self.positions)
    }
}

/// Centroid and bounding radius used to fit the model into the view volume.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub center: Vec3,
    pub radius: f32,
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            center: Vec3::ZERO,
            radius: 1.0,
        }
    }
}

impl Bounds {
    pub fn from_positions(positions: &[Vec3]) -> Self {
        if positions.is_empty() {
            return Self::default();
        }

        let center = positions.iter().sum::<Vec3>() / positions.len() as f32;
        let radius = positions
            .iter()
            .map(|p| p.distance(center))
            .fold(0.0_f32, f32::max);

        // a single point (or a cloud of identical ones) would scale to infinity
        let radius = if radius > 0.0 { radius } else { 1.0 };

        Self { center, radius }
    }

    pub fn scale(&self) -> f32 {
        1.0 / self.radius
    }
}

pub struct LoadedMesh {
    pub data: MeshData,
    pub normals_synthesized: bool,
    pub dropped_corners: usize,
}

/// Reads, flattens and (if needed) smooths the mesh at `path`. Any I/O or parse failure aborts
/// the whole load.
pub fn load_mesh(path: &Path) -> Result<LoadedMesh> {
    info!("loading mesh: {}", path.display());
    let model = load_obj(path)?;
    info!(
        "parsed {} positions, {} texture coords, {} normals, {} faces",
        model.pool.positions.len(),
        model.pool.tex_coords.len(),
        model.pool.normals.len(),
        model.faces.len()
    );

    let mesh = build_mesh(&model);
    if mesh.dropped_corners > 0 {
        warn!(
            "skipped {} face corners with out-of-range position indices",
            mesh.dropped_corners
        );
    }
    info!(
        "mesh ready: {} vertices, {} triangles, normals {}",
        mesh.data.vertex_count(),
        mesh.data.triangle_count(),
        if mesh.normals_synthesized {
            "synthesized"
        } else {
            "from file"
        }
    );

    Ok(mesh)
}

pub fn build_mesh(model: &ObjModel) -> LoadedMesh {
    let (mut data, report) = flatten(model);

    let normals_synthesized = needs_synthesis(data.vertex_count(), report.file_normals);
    if normals_synthesized {
        synthesize_smooth_normals(&data.positions, &mut data.normals);
    }

    LoadedMesh {
        data,
        normals_synthesized,
        dropped_corners: report.dropped_corners,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::obj::parse_obj;

    fn build(src: &str) -> LoadedMesh {
        build_mesh(&parse_obj(src.as_bytes()).unwrap())
    }

    #[test]
    fn quad_without_normals_is_smoothed() {
        let mesh = build("v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nf 1 2 3 4\n");

        assert!(mesh.normals_synthesized);
        assert_eq!(mesh.data.positions.len(), 6);
        assert!(mesh.data.uvs.is_empty());
        assert_eq!(mesh.data.normals.len(), 6);
        for n in &mesh.data.normals {
            assert!((n.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn complete_file_normals_are_kept() {
        let mesh = build(
            "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0.6 0 0.8\nvn 0 0.6 0.8\n\
             f 1//1 2//2 3//1\n",
        );

        assert!(!mesh.normals_synthesized);
        assert_eq!(
            mesh.data.normals,
            vec![
                Vec3::new(0.6, 0.0, 0.8),
                Vec3::new(0.0, 0.6, 0.8),
                Vec3::new(0.6, 0.0, 0.8)
            ]
        );
    }

    #[test]
    fn partial_file_normals_are_replaced() {
        let mesh = build("v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 1 0 0\nf 1//1 2 3\n");

        assert!(mesh.normals_synthesized);
        for n in &mesh.data.normals {
            assert!(n.abs_diff_eq(Vec3::Z, 1e-6), "{n}");
        }
    }

    #[test]
    fn uv_and_normal_lengths_match_positions() {
        let mesh = build(
            "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\nvt 0 0\nvt 1 1\n\
             f 1/1 2/2 3 4/9\nf 1 7 3\n",
        );

        assert_eq!(mesh.dropped_corners, 1);
        assert_eq!(mesh.data.vertex_count(), 8);
        assert_eq!(mesh.data.uvs.len(), 8);
        assert_eq!(mesh.data.normals.len(), 8);
    }

    #[test]
    fn tiny_meshes_are_still_fitted() {
        let bounds = Bounds::from_positions(&[Vec3::ZERO, Vec3::new(1e-8, 0.0, 0.0)]);
        assert!((bounds.radius - 5e-9).abs() < 1e-12, "{}", bounds.radius);
        assert!((bounds.scale() * 1e-8 - 2.0).abs() < 1e-4);
    }

    #[test]
    fn bounds_center_and_radius() {
        let bounds = Bounds::from_positions(&[
            Vec3::new(-1.0, 0.0, 0.0),
            Vec3::new(3.0, 0.0, 0.0),
            Vec3::new(1.0, 2.0, 0.0),
            Vec3::new(1.0, -2.0, 0.0),
        ]);

        assert_eq!(bounds.center, Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(bounds.radius, 2.0);
        assert_eq!(bounds.scale(), 0.5);
    }

    #[test]
    fn degenerate_bounds_stay_finite() {
        assert_eq!(Bounds::from_positions(&[]), Bounds::default());

        let single = Bounds::from_positions(&[Vec3::new(4.0, 5.0, 6.0); 3]);
        assert_eq!(single.center, Vec3::new(4.0, 5.0, 6.0));
        assert_eq!(single.radius, 1.0);
    }

    #[test]
    fn missing_file_fails_the_load() {
        assert!(load_mesh(Path::new("/nonexistent/objview/none.obj")).is_err());
    }
}
