//! Per-frame copy of simulation poses into the scene graph.

use crate::coords::{to_render_orientation, to_render_position};
use crate::sim::Simulation;

use super::graph::{SceneGraph, Transform};

/// Outcome of one [`sync`] call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SyncReport {
    /// Bodies whose pose was non-finite and kept their last good transform.
    pub skipped_bodies: usize,
    /// Lights or cameras skipped for the same reason.
    pub skipped_decorations: usize,
}

/// Copy body, light, camera and tendon state from `sim` into `graph`.
///
/// Idempotent: calling it again with unchanged simulation state leaves every
/// transform unchanged. Non-finite poses are never written; the affected
/// node keeps its previous transform and is counted in the returned
/// report; logging it is left to the caller. Does not allocate.
pub fn sync(graph: &mut SceneGraph, sim: &dyn Simulation) -> SyncReport {
    let model = sim.model();
    let data = sim.data();
    let mut report = SyncReport::default();

    let nbody = graph.nodes.len().min(model.nbody);
    for b in 1..nbody {
        let world = Transform::new(
            to_render_position(&data.xpos, b),
            to_render_orientation(&data.xquat, b),
        );
        if !world.is_finite() || world.rotation.length_squared() < 1e-12 {
            report.skipped_bodies += 1;
            continue;
        }
        graph.nodes[b].world = Transform::new(world.translation, world.rotation.normalize());
    }

    // Locals are derived after all worlds are current so parent order does
    // not matter.
    for b in 1..nbody {
        if let Some(p) = graph.nodes[b].parent {
            let parent_world = graph.nodes[p].world;
            let node = &mut graph.nodes[b];
            node.local = parent_world.inverse().compose(&node.world);
        }
    }

    for light in &mut graph.lights {
        let Some(l) = light.source else {
            continue;
        };
        let position = to_render_position(&data.light_xpos, l);
        let direction = to_render_position(&data.light_xdir, l);
        let Some(direction) = direction.try_normalize().filter(|_| position.is_finite()) else {
            report.skipped_decorations += 1;
            continue;
        };
        light.position = position;
        light.direction = direction;
        light.target = position + direction;
    }

    for camera in &mut graph.cameras {
        let c = camera.camera;
        let position = to_render_position(&data.cam_xpos, c);
        let direction = to_render_position(&data.cam_xdir, c);
        let Some(direction) = direction.try_normalize().filter(|_| position.is_finite()) else {
            report.skipped_decorations += 1;
            continue;
        };
        camera.position = position;
        camera.direction = direction;
        camera.target = position + direction;
    }

    graph.tendons.update(model, data);
    report
}

#[cfg(test)]
mod tests {
    use glam::Vec3;

    use super::*;
    use crate::options::SceneOptions;
    use crate::scene::builder::build;
    use crate::sim::{
        BodySpec, CameraSpec, JointSpec, JointType, LightSpec, ModelBuilder, RapierSimulation,
    };

    fn sim() -> RapierSimulation {
        let mut b = ModelBuilder::new().gravity([0.0, 0.0, 0.0]);
        let base = b.add_body(BodySpec {
            name: "base".to_owned(),
            pos: [1.0, 2.0, 3.0],
            ..BodySpec::default()
        });
        let _ = b.add_joint(JointSpec {
            body: base,
            kind: JointType::Free,
            ..JointSpec::default()
        });
        let arm = b.add_body(BodySpec {
            parent: base,
            pos: [0.0, 0.0, 0.5],
            ..BodySpec::default()
        });
        let _ = b.add_joint(JointSpec {
            body: arm,
            kind: JointType::Hinge,
            axis: [1.0, 0.0, 0.0],
            ..JointSpec::default()
        });
        b.add_light(LightSpec {
            body: arm,
            directional: true,
            ..LightSpec::default()
        });
        b.add_camera(CameraSpec {
            body: base,
            ..CameraSpec::default()
        });
        RapierSimulation::new(b.build().unwrap()).unwrap()
    }

    #[test]
    fn world_and_local_transforms_follow_bodies() {
        let sim = sim();
        let graph = build(&sim, &SceneOptions::default(), &mut |_| {});
        let base = graph.node(1).unwrap();
        assert!((base.world.translation - Vec3::new(1.0, 3.0, -2.0)).length() < 1e-5);
        let arm = graph.node(2).unwrap();
        assert!((arm.local.translation - Vec3::new(0.0, 0.5, 0.0)).length() < 1e-5);
        assert!((arm.world.translation - Vec3::new(1.0, 3.5, -2.0)).length() < 1e-5);
    }

    #[test]
    fn sync_is_idempotent() {
        let sim = sim();
        let mut graph = build(&sim, &SceneOptions::default(), &mut |_| {});
        let before: Vec<_> = graph.nodes().iter().map(|n| (n.local, n.world)).collect();
        let _ = sync(&mut graph, &sim);
        let _ = sync(&mut graph, &sim);
        let after: Vec<_> = graph.nodes().iter().map(|n| (n.local, n.world)).collect();
        assert_eq!(before, after);
    }

    #[test]
    fn lights_and_cameras_look_along_direction() {
        let sim = sim();
        let graph = build(&sim, &SceneOptions::default(), &mut |_| {});
        let light = &graph.lights()[0];
        // Physics -Z is render -Y.
        assert!((light.direction - Vec3::NEG_Y).length() < 1e-5);
        assert!((light.target - (light.position + Vec3::NEG_Y)).length() < 1e-5);
        let camera = &graph.cameras()[0];
        assert!((camera.direction - Vec3::X).length() < 1e-5);
    }

    #[test]
    fn non_finite_pose_keeps_last_good_transform() {
        let mut sim = sim();
        let mut graph = build(&sim, &SceneOptions::default(), &mut |_| {});
        let good = graph.node(1).unwrap().world;

        sim.data_mut().xpos[3] = f64::NAN;
        let report = sync(&mut graph, &sim);
        assert_eq!(report.skipped_bodies, 1);
        assert_eq!(graph.node(1).unwrap().world, good);
        assert!(graph.node(1).unwrap().world.is_finite());

        sim.data_mut().xquat[4..8].copy_from_slice(&[f64::INFINITY, 0.0, 0.0, 0.0]);
        sim.data_mut().xpos[3] = 1.0;
        let report = sync(&mut graph, &sim);
        assert_eq!(report.skipped_bodies, 1);
        assert_eq!(graph.node(1).unwrap().world, good);
    }
}
