//! Preprocessing steps applied to parsed meshes before extraction:
//! triangulation, smooth normals, UV flip, tangent space and transform baking.

use std::collections::HashMap;

use glam::{Mat3, Mat4, Vec2, Vec3};

use crate::scene::RawMesh;

/// Below this |det| a triangle's UV mapping is treated as degenerate.
const UV_DET_EPSILON: f32 = 1e-12;

/// Fan-triangulate every polygon. Faces with fewer than three indices
/// (points and lines) are dropped; returns how many were dropped.
pub fn triangulate(mesh: &mut RawMesh) -> usize {
    if mesh.faces.iter().all(|f| f.len() == 3) {
        return 0;
    }

    let mut dropped = 0;
    let mut faces = Vec::with_capacity(mesh.faces.len());
    for face in mesh.faces.drain(..) {
        match face.len() {
            0..=2 => dropped += 1,
            3 => faces.push(face),
            _ => {
                for i in 1..face.len() - 1 {
                    faces.push(vec![face[0], face[i], face[i + 1]]);
                }
            }
        }
    }
    mesh.faces = faces;
    dropped
}

/// Quantised position key. `+ 0.0` folds `-0.0` into `0.0`.
fn position_key(p: [f32; 3]) -> [u32; 3] {
    [(p[0] + 0.0).to_bits(), (p[1] + 0.0).to_bits(), (p[2] + 0.0).to_bits()]
}

fn position(mesh: &RawMesh, index: u32) -> Option<Vec3> {
    mesh.positions.get(index as usize).copied().map(Vec3::from_array)
}

/// Area-weighted smooth normals, shared between vertices at the same
/// position. No-op when the mesh already has normals.
pub fn generate_smooth_normals(mesh: &mut RawMesh) {
    if mesh.normals.is_some() {
        return;
    }

    let mut accumulated: HashMap<[u32; 3], Vec3> = HashMap::new();
    for face in &mesh.faces {
        if face.len() < 3 {
            continue;
        }
        let Some(origin) = position(mesh, face[0]) else {
            continue;
        };
        // Fan sum: the cross products' magnitudes are twice the triangle areas.
        let mut normal = Vec3::ZERO;
        for i in 1..face.len() - 1 {
            if let (Some(a), Some(b)) = (position(mesh, face[i]), position(mesh, face[i + 1])) {
                normal += (a - origin).cross(b - origin);
            }
        }
        for &index in face {
            if let Some(&p) = mesh.positions.get(index as usize) {
                *accumulated.entry(position_key(p)).or_insert(Vec3::ZERO) += normal;
            }
        }
    }

    let normals = mesh
        .positions
        .iter()
        .map(|&p| {
            accumulated
                .get(&position_key(p))
                .map_or(Vec3::ZERO, |n| n.normalize_or_zero())
                .to_array()
        })
        .collect();
    mesh.normals = Some(normals);
}

/// `v' = 1 - v` on the first UV channel. Source bitangents follow `v`,
/// so they are negated too.
pub fn flip_uvs(mesh: &mut RawMesh) {
    let Some(uvs) = mesh.uvs.as_mut() else {
        return;
    };
    for uv in uvs {
        uv[1] = 1.0 - uv[1];
    }
    for b in mesh.bitangents.iter_mut().flatten() {
        *b = [-b[0], -b[1], -b[2]];
    }
}

/// Per-vertex tangents and bitangents from positions and UVs. Needs UVs;
/// keeps tangents the source already provided.
pub fn calc_tangent_space(mesh: &mut RawMesh) {
    if mesh.tangents.is_some() {
        return;
    }
    let Some(uvs) = mesh.uvs.as_ref() else {
        return;
    };

    let count = mesh.positions.len();
    let mut tangents = vec![Vec3::ZERO; count];
    let mut bitangents = vec![Vec3::ZERO; count];

    for face in mesh.faces.iter().filter(|f| f.len() == 3) {
        let [i0, i1, i2] = [face[0] as usize, face[1] as usize, face[2] as usize];
        if i0 >= count || i1 >= count || i2 >= count {
            continue;
        }
        let p0 = Vec3::from_array(mesh.positions[i0]);
        let e1 = Vec3::from_array(mesh.positions[i1]) - p0;
        let e2 = Vec3::from_array(mesh.positions[i2]) - p0;
        let uv0 = Vec2::from_array(uvs[i0]);
        let d1 = Vec2::from_array(uvs[i1]) - uv0;
        let d2 = Vec2::from_array(uvs[i2]) - uv0;

        let det = d1.x * d2.y - d2.x * d1.y;
        if det.abs() < UV_DET_EPSILON {
            continue;
        }
        let r = det.recip();
        let t = (e1 * d2.y - e2 * d1.y) * r;
        let b = (e2 * d1.x - e1 * d2.x) * r;
        for i in [i0, i1, i2] {
            tangents[i] += t;
            bitangents[i] += b;
        }
    }

    let normals = mesh.normals.as_deref();
    let mut out_t = Vec::with_capacity(count);
    let mut out_b = Vec::with_capacity(count);
    for i in 0..count {
        let n = normals
            .and_then(|ns| ns.get(i))
            .map_or(Vec3::ZERO, |&n| Vec3::from_array(n));
        // Gram-Schmidt against the normal, then the bitangent against both.
        let mut t = (tangents[i] - n * n.dot(tangents[i])).normalize_or_zero();
        let mut b = bitangents[i] - n * n.dot(bitangents[i]);
        b = (b - t * t.dot(b)).normalize_or_zero();
        if t == Vec3::ZERO && n != Vec3::ZERO {
            (t, b) = n.normalize().any_orthonormal_pair();
        }
        out_t.push(t.to_array());
        out_b.push(b.to_array());
    }
    mesh.tangents = Some(out_t);
    mesh.bitangents = Some(out_b);
}

/// Bake `transform` into positions and direction attributes.
pub fn bake_transform(mesh: &mut RawMesh, transform: &Mat4) {
    if *transform == Mat4::IDENTITY {
        return;
    }
    let normal_matrix = corelib::transform::normal_matrix(transform);
    let linear = Mat3::from_mat4(*transform);

    for p in &mut mesh.positions {
        *p = transform.transform_point3(Vec3::from_array(*p)).to_array();
    }
    let directions = [
        (mesh.normals.as_mut(), normal_matrix),
        (mesh.tangents.as_mut(), linear),
        (mesh.bitangents.as_mut(), linear),
    ];
    for (attribute, matrix) in directions {
        if let Some(values) = attribute {
            for v in values {
                *v = (matrix * Vec3::from_array(*v)).normalize_or_zero().to_array();
            }
        }
    }
}
