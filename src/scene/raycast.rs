//! Ray intersection against scene visuals.
//!
//! Every visual is tested analytically in its own local frame; triangle
//! meshes fall back to a per-triangle test. Distances are measured along the
//! world ray, which is unchanged by rigid transforms.

use glam::Vec3;

use super::graph::{Geometry, MeshData, SceneGraph, Visual};

/// Half-line with a unit direction.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    /// Start point.
    pub origin: Vec3,
    /// Unit direction.
    pub direction: Vec3,
}

impl Ray {
    /// Ray from `origin` towards `direction` (normalized here). Returns
    /// `None` for a zero or non-finite direction.
    #[must_use]
    pub fn new(origin: Vec3, direction: Vec3) -> Option<Self> {
        let direction = direction.try_normalize()?;
        origin.is_finite().then_some(Self { origin, direction })
    }

    /// Point at distance `t`.
    #[must_use]
    pub fn at(&self, t: f32) -> Vec3 {
        self.origin + self.direction * t
    }
}

/// Nearest intersection found by [`raycast`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    /// Body owning the hit visual.
    pub body: usize,
    /// Index into [`SceneGraph::visuals`].
    pub visual: usize,
    /// Distance along the ray.
    pub distance: f32,
    /// World-space hit point.
    pub point: Vec3,
}

/// Nearest hit among the visuals accepted by `accept`.
pub fn raycast(
    graph: &SceneGraph,
    ray: &Ray,
    mut accept: impl FnMut(&Visual) -> bool,
) -> Option<RayHit> {
    let mut best: Option<RayHit> = None;
    for (index, visual) in graph.visuals().iter().enumerate() {
        if !accept(visual) {
            continue;
        }
        let world = graph.visual_world(visual);
        let local = Ray {
            origin: world.inverse_transform_point(ray.origin),
            direction: world.rotation.inverse() * ray.direction,
        };
        let Some(t) = intersect_geometry(&visual.geometry, graph.meshes(), &local) else {
            continue;
        };
        if best.is_none_or(|b| t < b.distance) {
            best = Some(RayHit {
                body: visual.body,
                visual: index,
                distance: t,
                point: ray.at(t),
            });
        }
    }
    best
}

/// Distance to the first intersection with `geometry` in its local frame.
fn intersect_geometry(geometry: &Geometry, meshes: &[MeshData], ray: &Ray) -> Option<f32> {
    match *geometry {
        Geometry::Plane { width, depth } => plane(ray, width * 0.5, depth * 0.5),
        Geometry::Sphere { radius } => sphere(ray.origin, ray.direction, radius),
        Geometry::Ellipsoid { radii } => {
            if radii.min_element() <= 0.0 {
                return None;
            }
            // Scale to a unit sphere; t is preserved because the origin and
            // direction are scaled by the same factor.
            sphere(ray.origin / radii, ray.direction / radii, 1.0)
        }
        Geometry::Capsule { radius, length } => capsule(ray, radius, length * 0.5),
        Geometry::Cylinder { radius, length } => cylinder(ray, radius, length * 0.5),
        Geometry::Box { half_extents } => aabb(ray, half_extents),
        Geometry::Mesh { mesh } => meshes.get(mesh).and_then(|m| triangles(ray, m)),
    }
}

fn nearest_positive(t0: f32, t1: f32) -> Option<f32> {
    if t0 > 0.0 {
        Some(t0)
    } else if t1 > 0.0 {
        Some(t1)
    } else {
        None
    }
}

/// Sphere at the origin. `dir` need not be unit length.
fn sphere(origin: Vec3, dir: Vec3, radius: f32) -> Option<f32> {
    let a = dir.dot(dir);
    let b = 2.0 * origin.dot(dir);
    let c = origin.dot(origin) - radius * radius;
    let discriminant = b * b - 4.0 * a * c;
    if discriminant < 0.0 || a <= 0.0 {
        return None;
    }
    let sq = discriminant.sqrt();
    nearest_positive((-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a))
}

fn plane(ray: &Ray, half_width: f32, half_depth: f32) -> Option<f32> {
    if ray.direction.y.abs() < f32::EPSILON {
        return None;
    }
    let t = -ray.origin.y / ray.direction.y;
    if t <= 0.0 {
        return None;
    }
    let p = ray.at(t);
    (p.x.abs() <= half_width && p.z.abs() <= half_depth).then_some(t)
}

fn aabb(ray: &Ray, half: Vec3) -> Option<f32> {
    let inv = ray.direction.recip();
    let t1 = (-half - ray.origin) * inv;
    let t2 = (half - ray.origin) * inv;
    let t_near = t1.min(t2).max_element();
    let t_far = t1.max(t2).min_element();
    if t_near > t_far || t_far <= 0.0 {
        return None;
    }
    nearest_positive(t_near, t_far)
}

/// Infinite cylinder along Y intersected with the slab `|y| <= half_length`,
/// closed by flat caps.
fn cylinder(ray: &Ray, radius: f32, half_length: f32) -> Option<f32> {
    let mut best = f32::INFINITY;

    let (ox, oz, dx, dz) = (ray.origin.x, ray.origin.z, ray.direction.x, ray.direction.z);
    let a = dx * dx + dz * dz;
    if a > f32::EPSILON {
        let b = 2.0 * (ox * dx + oz * dz);
        let c = ox * ox + oz * oz - radius * radius;
        let discriminant = b * b - 4.0 * a * c;
        if discriminant >= 0.0 {
            let sq = discriminant.sqrt();
            for t in [(-b - sq) / (2.0 * a), (-b + sq) / (2.0 * a)] {
                if t > 0.0 && ray.at(t).y.abs() <= half_length {
                    best = best.min(t);
                }
            }
        }
    }

    if ray.direction.y.abs() > f32::EPSILON {
        for cap in [-half_length, half_length] {
            let t = (cap - ray.origin.y) / ray.direction.y;
            if t > 0.0 {
                let p = ray.at(t);
                if p.x * p.x + p.z * p.z <= radius * radius {
                    best = best.min(t);
                }
            }
        }
    }

    best.is_finite().then_some(best)
}

fn capsule(ray: &Ray, radius: f32, half_length: f32) -> Option<f32> {
    let shaft = cylinder(ray, radius, half_length);
    let top = sphere(ray.origin - Vec3::Y * half_length, ray.direction, radius);
    let bottom = sphere(ray.origin + Vec3::Y * half_length, ray.direction, radius);
    [shaft, top, bottom]
        .into_iter()
        .flatten()
        .min_by(f32::total_cmp)
}

/// Möller–Trumbore over every triangle, double sided.
fn triangles(ray: &Ray, mesh: &MeshData) -> Option<f32> {
    let mut best: Option<f32> = None;
    for tri in mesh.indices.chunks_exact(3) {
        let fetch = |i: u32| mesh.positions.get(i as usize).map(|p| Vec3::from_array(*p));
        let (Some(v0), Some(v1), Some(v2)) = (fetch(tri[0]), fetch(tri[1]), fetch(tri[2])) else {
            continue;
        };
        let e1 = v1 - v0;
        let e2 = v2 - v0;
        let p = ray.direction.cross(e2);
        let det = e1.dot(p);
        if det.abs() < 1e-9 {
            continue;
        }
        let inv_det = 1.0 / det;
        let s = ray.origin - v0;
        let u = s.dot(p) * inv_det;
        if !(0.0..=1.0).contains(&u) {
            continue;
        }
        let q = s.cross(e1);
        let v = ray.direction.dot(q) * inv_det;
        if v < 0.0 || u + v > 1.0 {
            continue;
        }
        let t = e2.dot(q) * inv_det;
        if t > 0.0 && best.is_none_or(|b| t < b) {
            best = Some(t);
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use glam::Quat;

    use super::*;
    use crate::scene::graph::{Material, SceneNode, Transform};

    fn graph_with(visuals: Vec<Visual>, nodes: Vec<SceneNode>) -> SceneGraph {
        SceneGraph {
            nodes,
            visuals,
            ..SceneGraph::default()
        }
    }

    fn node(body: usize, world: Transform) -> SceneNode {
        SceneNode {
            body,
            name: String::new(),
            parent: (body > 0).then_some(0),
            children: Vec::new(),
            local: world,
            world,
            visuals: Vec::new(),
            selected: false,
        }
    }

    fn visual(body: usize, geometry: Geometry) -> Visual {
        Visual {
            geom: 0,
            body,
            geometry,
            local: Transform::IDENTITY,
            material: Material::default(),
            cast_shadow: true,
            receive_shadow: true,
        }
    }

    fn down_from(x: f32, z: f32) -> Ray {
        Ray::new(Vec3::new(x, 10.0, z), Vec3::NEG_Y).unwrap()
    }

    #[test]
    fn primitive_distances() {
        let shapes = [
            (Geometry::Sphere { radius: 1.0 }, 9.0),
            (Geometry::Box { half_extents: Vec3::new(1.0, 2.0, 1.0) }, 8.0),
            (Geometry::Capsule { radius: 0.5, length: 2.0 }, 8.5),
            (Geometry::Cylinder { radius: 0.5, length: 2.0 }, 9.0),
            (Geometry::Ellipsoid { radii: Vec3::new(1.0, 3.0, 1.0) }, 7.0),
            (Geometry::Plane { width: 4.0, depth: 4.0 }, 10.0),
        ];
        for (geometry, expected) in shapes {
            let t = intersect_geometry(&geometry, &[], &down_from(0.0, 0.0)).unwrap();
            assert!((t - expected).abs() < 1e-4, "{geometry:?}: {t}");
        }
    }

    #[test]
    fn misses_outside_extent() {
        let ray = down_from(3.0, 0.0);
        assert!(intersect_geometry(&Geometry::Sphere { radius: 1.0 }, &[], &ray).is_none());
        assert!(
            intersect_geometry(&Geometry::Plane { width: 4.0, depth: 4.0 }, &[], &ray).is_none()
        );
        let away = Ray::new(Vec3::new(0.0, 10.0, 0.0), Vec3::Y).unwrap();
        assert!(intersect_geometry(&Geometry::Sphere { radius: 1.0 }, &[], &away).is_none());
    }

    #[test]
    fn mesh_triangles() {
        let mesh = MeshData {
            positions: vec![[-1.0, 0.0, -1.0], [1.0, 0.0, -1.0], [0.0, 0.0, 1.0]],
            normals: vec![[0.0, 1.0, 0.0]; 3],
            uvs: None,
            indices: vec![0, 1, 2],
        };
        let t = intersect_geometry(&Geometry::Mesh { mesh: 0 }, &[mesh.clone()], &down_from(0.0, 0.0));
        assert!((t.unwrap() - 10.0).abs() < 1e-5);
        assert!(intersect_geometry(&Geometry::Mesh { mesh: 0 }, &[mesh], &down_from(0.0, 2.0)).is_none());
        assert!(intersect_geometry(&Geometry::Mesh { mesh: 3 }, &[], &down_from(0.0, 0.0)).is_none());
    }

    #[test]
    fn nearest_accepted_visual_wins() {
        let nodes = vec![
            node(0, Transform::IDENTITY),
            node(1, Transform::new(Vec3::new(0.0, 1.0, 0.0), Quat::IDENTITY)),
            node(2, Transform::new(Vec3::new(0.0, 3.0, 0.0), Quat::from_rotation_z(0.7))),
        ];
        let visuals = vec![
            visual(0, Geometry::Plane { width: 100.0, depth: 100.0 }),
            visual(1, Geometry::Sphere { radius: 0.5 }),
            visual(2, Geometry::Box { half_extents: Vec3::splat(0.25) }),
        ];
        let graph = graph_with(visuals, nodes);

        let hit = raycast(&graph, &down_from(0.0, 0.0), |v| v.body > 0).unwrap();
        assert_eq!(hit.body, 2);
        assert_eq!(hit.visual, 2);
        assert!((hit.point.y - (3.0 + 0.25 / 0.7f32.cos())).abs() < 1e-4);

        let hit = raycast(&graph, &down_from(0.0, 0.0), |v| v.body == 1).unwrap();
        assert!((hit.point - Vec3::new(0.0, 1.5, 0.0)).length() < 1e-4);

        let ground = raycast(&graph, &down_from(20.0, 0.0), |_| true).unwrap();
        assert_eq!(ground.body, 0);
        assert!(raycast(&graph, &down_from(20.0, 0.0), |v| v.body > 0).is_none());
    }

    #[test]
    fn degenerate_ray_is_rejected() {
        assert!(Ray::new(Vec3::ZERO, Vec3::ZERO).is_none());
        assert!(Ray::new(Vec3::NAN, Vec3::X).is_none());
    }
}
