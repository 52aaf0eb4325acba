use glam::{Vec2, Vec3};

use crate::mesh::MeshData;
use crate::mesh::obj::ObjModel;

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlattenReport {
    /// Corners whose position index was zero, negative or past the end of the pool.
    pub dropped_corners: usize,
    /// Output vertices that received a normal from the file.
    pub file_normals: usize,
}

/// Expands every face into three vertices per triangle, in face order, with no sharing.
///
/// A corner with an unresolvable position is dropped outright, so the output shrinks by one
/// vertex and later triangles shift. UVs are emitted for every vertex once the file declares
/// any `vt` record, falling back to (0, 0). Normals are only taken from the corner's own index;
/// anything else leaves a zero normal for [`synthesize_smooth_normals`] to fill.
///
/// [`synthesize_smooth_normals`]: crate::mesh::normals::synthesize_smooth_normals
pub fn flatten(model: &ObjModel) -> (MeshData, FlattenReport) {
    let pool = &model.pool;
    let corner_count: usize = model.faces.iter().map(|f| f.triangles().count() * 3).sum();

    let mut mesh = MeshData::with_capacity(corner_count, !pool.tex_coords.is_empty());
    let mut report = FlattenReport::default();

    for face in &model.faces {
        for triangle in face.triangles() {
            for corner in triangle {
                let Some(position) = resolve(&pool.positions, corner.position) else {
                    report.dropped_corners += 1;
                    continue;
                };
                mesh.positions.push(position);

                if !pool.tex_coords.is_empty() {
                    let uv = corner
                        .texture
                        .and_then(|index| resolve(&pool.tex_coords, index))
                        .unwrap_or(Vec2::ZERO);
                    mesh.uvs.push(uv);
                }

                let normal = corner
                    .normal
                    .and_then(|index| resolve(&pool.normals, index));
                if normal.is_some() {
                    report.file_normals += 1;
                }
                mesh.normals.push(normal.unwrap_or(Vec3::ZERO));
            }
        }
    }

    (mesh, report)
}

fn resolve<T: Copy>(items: &[T], index: i64) -> Option<T> {
    if index <= 0 {
        return None;
    }
    let slot = usize::try_from(index - 1).ok()?;
    items.get(slot).copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mesh::obj::parse_obj;

    fn flatten_src(src: &str) -> (MeshData, FlattenReport) {
        flatten(&parse_obj(src.as_bytes()).unwrap())
    }

    const SQUARE: &str = "v 0 0 0\nv 1 0 0\nv 1 1 0\nv 0 1 0\n";

    #[test]
    fn quad_becomes_two_triangles() {
        let (mesh, report) = flatten_src(&format!("{SQUARE}f 1 2 3 4\n"));

        assert_eq!(
            mesh.positions,
            vec![
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 0.0, 0.0),
                Vec3::new(1.0, 1.0, 0.0),
                Vec3::new(0.0, 1.0, 0.0),
            ]
        );
        assert!(mesh.uvs.is_empty());
        assert_eq!(mesh.normals, vec![Vec3::ZERO; 6]);
        assert_eq!(report, FlattenReport::default());
    }

    #[test]
    fn file_normals_are_copied_exactly() {
        let src = "v 0 0 0\nv 1 0 0\nv 0 1 0\nvn 0.1 0.2 0.97\nvn 0 0 1\n\
                   f 1//1 2//2 3//1\n";
        let (mesh, report) = flatten_src(src);

        assert_eq!(
            mesh.normals,
            vec![Vec3::new(0.1, 0.2, 0.97), Vec3::Z, Vec3::new(0.1, 0.2, 0.97)]
        );
        assert_eq!(report.file_normals, 3);
    }

    #[test]
    fn out_of_range_position_drops_only_that_corner() {
        let (mesh, report) = flatten_src(&format!("{SQUARE}f 1 2 3\nf 0 2 9\nf 4 3 2\n"));

        assert_eq!(report.dropped_corners, 2);
        assert_eq!(mesh.vertex_count(), 7);
        assert_eq!(mesh.normals.len(), 7);
        assert_eq!(mesh.positions[3], Vec3::new(1.0, 0.0, 0.0));
        assert_eq!(mesh.positions[4], Vec3::new(0.0, 1.0, 0.0));
    }

    #[test]
    fn negative_position_index_is_dropped() {
        let (mesh, report) = flatten_src(&format!("{SQUARE}f -1 2 3\n"));
        assert_eq!(report.dropped_corners, 1);
        assert_eq!(mesh.vertex_count(), 2);
    }

    #[test]
    fn uvs_default_per_corner_once_any_are_declared() {
        let src = format!("{SQUARE}vt 0.25 0.75\nf 1/1 2 3/7\n");
        let (mesh, _) = flatten_src(&src);

        assert_eq!(
            mesh.uvs,
            vec![Vec2::new(0.25, 0.75), Vec2::ZERO, Vec2::ZERO]
        );
    }

    #[test]
    fn texture_indices_without_vt_records_produce_no_uvs() {
        let (mesh, _) = flatten_src(&format!("{SQUARE}f 1/1 2/2 3/3\n"));
        assert!(mesh.uvs.is_empty());
        assert_eq!(mesh.vertex_count(), 3);
    }

    #[test]
    fn normals_resolve_per_corner() {
        let src = format!("{SQUARE}vn 0 0 1\nf 1//1 2 3//5\n");
        let (mesh, report) = flatten_src(&src);

        assert_eq!(mesh.normals, vec![Vec3::Z, Vec3::ZERO, Vec3::ZERO]);
        assert_eq!(report.file_normals, 1);
    }

    #[test]
    fn resolve_bounds() {
        let items = [10, 20, 30];
        assert_eq!(resolve(&items, 1), Some(10));
        assert_eq!(resolve(&items, 3), Some(30));
        assert_eq!(resolve(&items, 0), None);
        assert_eq!(resolve(&items, 4), None);
        assert_eq!(resolve(&items, -1), None);
        assert_eq!(resolve::<i32>(&[], 1), None);
    }
}
