//! Triangle meshes for the analytic visual primitives.
//!
//! Axial shapes (capsule, cylinder) run along local Y to match
//! [`Geometry`]. Every generated mesh has unit normals, UVs and
//! counter-clockwise outward-facing triangles.

use std::f32::consts::{PI, TAU};

use glam::Vec3;

use super::graph::{Geometry, MeshData};

/// Segments around the axis of revolved shapes.
const SEGMENTS: u32 = 32;
/// Latitude rings of a full sphere.
const RINGS: u32 = 16;

/// Mesh for `geometry`. Imported meshes are looked up in `meshes`; returns
/// `None` when that lookup fails.
#[must_use]
pub fn tessellate(geometry: &Geometry, meshes: &[MeshData]) -> Option<MeshData> {
    let mesh = match *geometry {
        Geometry::Plane { width, depth } => plane(width * 0.5, depth * 0.5),
        Geometry::Sphere { radius } => sphere(radius),
        Geometry::Ellipsoid { radii } => ellipsoid(radii),
        Geometry::Capsule { radius, length } => capsule(radius, length * 0.5),
        Geometry::Cylinder { radius, length } => cylinder(radius, length * 0.5),
        Geometry::Box { half_extents } => cuboid(half_extents),
        Geometry::Mesh { mesh } => return meshes.get(mesh).cloned(),
    };
    Some(mesh)
}

/// One point of a revolved profile: radius, height, and the 2D outward
/// normal `(radial, y)`.
#[derive(Clone, Copy)]
struct ProfilePoint {
    r: f32,
    y: f32,
    nr: f32,
    ny: f32,
}

/// Revolve `profile` (bottom to top) around Y.
fn lathe(profile: &[ProfilePoint]) -> MeshData {
    let ring = SEGMENTS + 1;
    let mut mesh = MeshData {
        uvs: Some(Vec::with_capacity(profile.len() * ring as usize)),
        ..MeshData::default()
    };
    let last = profile.len().saturating_sub(1).max(1) as f32;

    for (i, p) in profile.iter().enumerate() {
        for j in 0..ring {
            let phi = TAU * j as f32 / SEGMENTS as f32;
            let (s, c) = phi.sin_cos();
            mesh.positions.push([p.r * c, p.y, p.r * s]);
            mesh.normals
                .push(Vec3::new(p.nr * c, p.ny, p.nr * s).normalize_or_zero().to_array());
            if let Some(uvs) = mesh.uvs.as_mut() {
                uvs.push([j as f32 / SEGMENTS as f32, 1.0 - i as f32 / last]);
            }
        }
    }

    for i in 0..profile.len().saturating_sub(1) as u32 {
        for j in 0..SEGMENTS {
            let a = i * ring + j;
            let b = a + 1;
            let d = a + ring;
            let c = d + 1;
            mesh.indices.extend_from_slice(&[a, d, c, a, c, b]);
        }
    }
    mesh
}

/// Hemisphere (or full sphere) profile points from polar angle `from` to
/// `to`, measured from -Y, offset vertically by `dy`.
fn arc(radius: f32, from: f32, to: f32, rings: u32, dy: f32, out: &mut Vec<ProfilePoint>) {
    for i in 0..=rings {
        let theta = from + (to - from) * i as f32 / rings as f32;
        let (s, c) = theta.sin_cos();
        out.push(ProfilePoint {
            r: radius * s,
            y: dy - radius * c,
            nr: s,
            ny: -c,
        });
    }
}

fn sphere(radius: f32) -> MeshData {
    let mut profile = Vec::with_capacity(RINGS as usize + 1);
    arc(radius, 0.0, PI, RINGS, 0.0, &mut profile);
    lathe(&profile)
}

fn ellipsoid(radii: Vec3) -> MeshData {
    let mut mesh = sphere(1.0);
    let inv = radii.max(Vec3::splat(f32::EPSILON)).recip();
    for (p, n) in mesh.positions.iter_mut().zip(&mut mesh.normals) {
        *p = (Vec3::from_array(*p) * radii).to_array();
        *n = (Vec3::from_array(*n) * inv).normalize_or_zero().to_array();
    }
    mesh
}

fn capsule(radius: f32, half_length: f32) -> MeshData {
    let half = RINGS / 2;
    let mut profile = Vec::with_capacity(2 * (half as usize + 1));
    arc(radius, 0.0, PI * 0.5, half, -half_length, &mut profile);
    arc(radius, PI * 0.5, PI, half, half_length, &mut profile);
    lathe(&profile)
}

fn cylinder(radius: f32, half_length: f32) -> MeshData {
    let point = |r, y, nr, ny| ProfilePoint { r, y, nr, ny };
    lathe(&[
        point(0.0, -half_length, 0.0, -1.0),
        point(radius, -half_length, 0.0, -1.0),
        point(radius, -half_length, 1.0, 0.0),
        point(radius, half_length, 1.0, 0.0),
        point(radius, half_length, 0.0, 1.0),
        point(0.0, half_length, 0.0, 1.0),
    ])
}

/// Append one quad with normal `u × v`.
fn quad(mesh: &mut MeshData, center: Vec3, u: Vec3, v: Vec3) {
    let base = mesh.positions.len() as u32;
    let normal = u.cross(v).normalize_or_zero().to_array();
    let corners = [(-1.0, -1.0), (1.0, -1.0), (1.0, 1.0), (-1.0, 1.0)];
    for (a, b) in corners {
        mesh.positions.push((center + u * a + v * b).to_array());
        mesh.normals.push(normal);
        if let Some(uvs) = mesh.uvs.as_mut() {
            uvs.push([(a + 1.0) * 0.5, (1.0 - b) * 0.5]);
        }
    }
    mesh.indices
        .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
}

fn cuboid(half: Vec3) -> MeshData {
    let mut mesh = MeshData {
        uvs: Some(Vec::with_capacity(24)),
        ..MeshData::default()
    };
    let (x, y, z) = (Vec3::X * half.x, Vec3::Y * half.y, Vec3::Z * half.z);
    quad(&mut mesh, x, y, z);
    quad(&mut mesh, -x, z, y);
    quad(&mut mesh, y, z, x);
    quad(&mut mesh, -y, x, z);
    quad(&mut mesh, z, x, y);
    quad(&mut mesh, -z, y, x);
    mesh
}

fn plane(half_width: f32, half_depth: f32) -> MeshData {
    let mut mesh = MeshData {
        uvs: Some(Vec::with_capacity(4)),
        ..MeshData::default()
    };
    quad(&mut mesh, Vec3::ZERO, Vec3::Z * half_depth, Vec3::X * half_width);
    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bounds(mesh: &MeshData) -> (Vec3, Vec3) {
        mesh.positions.iter().map(|p| Vec3::from_array(*p)).fold(
            (Vec3::splat(f32::MAX), Vec3::splat(f32::MIN)),
            |(lo, hi), p| (lo.min(p), hi.max(p)),
        )
    }

    fn check_well_formed(mesh: &MeshData) {
        assert_eq!(mesh.positions.len(), mesh.normals.len());
        assert_eq!(mesh.uvs.as_ref().map(Vec::len), Some(mesh.positions.len()));
        assert_eq!(mesh.indices.len() % 3, 0);
        assert!(mesh.indices.iter().all(|&i| (i as usize) < mesh.positions.len()));
        for n in &mesh.normals {
            assert!((Vec3::from_array(*n).length() - 1.0).abs() < 1e-4);
        }
        // Convex shapes centred on the origin: every non-degenerate face
        // points away from the centre.
        for tri in mesh.indices.chunks_exact(3) {
            let [a, b, c] = [tri[0], tri[1], tri[2]].map(|i| Vec3::from_array(mesh.positions[i as usize]));
            let n = (b - a).cross(c - a);
            if n.length() > 1e-6 {
                assert!(n.dot((a + b + c) / 3.0) > -1e-5);
            }
        }
    }

    #[test]
    fn primitives_have_expected_extents() {
        let cases = [
            (Geometry::Sphere { radius: 0.5 }, Vec3::splat(0.5)),
            (Geometry::Box { half_extents: Vec3::new(1.0, 2.0, 3.0) }, Vec3::new(1.0, 2.0, 3.0)),
            (Geometry::Capsule { radius: 0.2, length: 1.0 }, Vec3::new(0.2, 0.7, 0.2)),
            (Geometry::Cylinder { radius: 0.3, length: 2.0 }, Vec3::new(0.3, 1.0, 0.3)),
            (Geometry::Ellipsoid { radii: Vec3::new(1.0, 0.5, 0.25) }, Vec3::new(1.0, 0.5, 0.25)),
        ];
        for (geometry, half) in cases {
            let mesh = tessellate(&geometry, &[]).unwrap();
            check_well_formed(&mesh);
            let (lo, hi) = bounds(&mesh);
            assert!((hi - half).abs().max_element() < 1e-4, "{geometry:?}");
            assert!((lo + half).abs().max_element() < 1e-4, "{geometry:?}");
        }
    }

    #[test]
    fn plane_faces_up() {
        let mesh = tessellate(&Geometry::Plane { width: 4.0, depth: 2.0 }, &[]).unwrap();
        assert_eq!(mesh.indices.len(), 6);
        let (lo, hi) = bounds(&mesh);
        assert_eq!(lo, Vec3::new(-2.0, 0.0, -1.0));
        assert_eq!(hi, Vec3::new(2.0, 0.0, 1.0));
        let [a, b, c] = [0, 1, 2].map(|i| Vec3::from_array(mesh.positions[mesh.indices[i] as usize]));
        assert!((b - a).cross(c - a).y > 0.0);
        assert!(mesh.normals.iter().all(|n| *n == [0.0, 1.0, 0.0]));
    }

    #[test]
    fn imported_meshes_are_looked_up() {
        let imported = MeshData {
            positions: vec![[0.0; 3]; 3],
            normals: vec![[0.0, 1.0, 0.0]; 3],
            uvs: None,
            indices: vec![0, 1, 2],
        };
        let found = tessellate(&Geometry::Mesh { mesh: 0 }, std::slice::from_ref(&imported));
        assert_eq!(found, Some(imported));
        assert!(tessellate(&Geometry::Mesh { mesh: 1 }, &[]).is_none());
    }
}
