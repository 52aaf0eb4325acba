use std::collections::HashMap;

use glam::Vec3;

/// Synthesis is needed when the file supplied no normals at all, or not one per vertex.
pub fn needs_synthesis(vertex_count: usize, file_normals: usize) -> bool {
    file_normals == 0 || file_normals != vertex_count
}

/// Replaces every normal with a smooth one.
///
/// Positions are read three at a time as triangles; each unnormalized face normal is added to its
/// three vertices (a trailing partial triangle contributes nothing). Vertices whose positions are
/// bit-identical then share the normalized sum of their accumulators. A group whose sum is zero
/// gets the zero vector.
pub fn synthesize_smooth_normals(positions: &[Vec3], normals: &mut Vec<Vec3>) {
    normals.clear();
    normals.resize(positions.len(), Vec3::ZERO);

    let mut shared: HashMap<[u32; 3], Vec<usize>> = HashMap::new();
    for (i, p) in positions.iter().enumerate() {
        shared.entry(position_key(*p)).or_default().push(i);
    }

    for (i, triangle) in positions.chunks_exact(3).enumerate() {
        let face_normal = face_normal(triangle[0], triangle[1], triangle[2]);
        for n in &mut normals[i * 3..i * 3 + 3] {
            *n += face_normal;
        }
    }

    for members in shared.values() {
        let sum: Vec3 = members.iter().map(|&i| normals[i]).sum();
        let smooth = sum.normalize_or_zero();
        for &i in members {
            normals[i] = smooth;
        }
    }
}

/// Unnormalized, so larger triangles weigh more in the average.
pub fn face_normal(v0: Vec3, v1: Vec3, v2: Vec3) -> Vec3 {
    (v1 - v0).cross(v2 - v0)
}

fn position_key(p: Vec3) -> [u32; 3] {
    [p.x.to_bits(), p.y.to_bits(), p.z.to_bits()]
}
