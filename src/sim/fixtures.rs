//! Small models shared by tests across the crate.

use super::{
    ActuatorSpec, BodySpec, GeomSpec, GeomType, JointSpec, JointType, Model, ModelBuilder,
};

/// Ground plane on the world body plus one free sphere (radius 0.1, at
/// physics `(0, 0, 1)`) with no gravity.
pub(crate) fn floating_sphere(mass: f64) -> Model {
    let mut b = ModelBuilder::new().gravity([0.0; 3]);
    b.add_geom(GeomSpec {
        body: 0,
        kind: GeomType::Plane,
        size: [5.0, 5.0, 0.1],
        ..GeomSpec::default()
    });
    let ball = b.add_body(BodySpec {
        name: "ball".to_owned(),
        pos: [0.0, 0.0, 1.0],
        mass,
        inertia: [0.01; 3],
        ..BodySpec::default()
    });
    let _ = b.add_joint(JointSpec {
        name: "ball_free".to_owned(),
        body: ball,
        kind: JointType::Free,
        ..JointSpec::default()
    });
    b.add_geom(GeomSpec {
        body: ball,
        kind: GeomType::Sphere,
        size: [0.1, 0.0, 0.0],
        ..GeomSpec::default()
    });
    b.build().unwrap()
}

/// Two separated jointless boxes (welded to the world) and no gravity.
pub(crate) fn two_bodies() -> Model {
    let mut b = ModelBuilder::new().timestep(0.002).gravity([0.0; 3]);
    for (i, x) in [-0.5, 0.5].into_iter().enumerate() {
        let body = b.add_body(BodySpec {
            name: format!("box{i}"),
            pos: [x, 0.0, 0.5],
            mass: 1.0,
            ..BodySpec::default()
        });
        b.add_geom(GeomSpec {
            body,
            kind: GeomType::Box,
            size: [0.1, 0.1, 0.1],
            ..GeomSpec::default()
        });
    }
    b.build().unwrap()
}

/// Free torso with two hinged legs, each driven by a limited actuator.
/// Joint names match the default control pose.
pub(crate) fn walker() -> Model {
    let mut b = ModelBuilder::new().gravity([0.0; 3]);
    let torso = b.add_body(BodySpec {
        name: "torso".to_owned(),
        pos: [0.0, 0.0, 1.0],
        mass: 5.0,
        ..BodySpec::default()
    });
    let _ = b.add_joint(JointSpec {
        name: "root".to_owned(),
        body: torso,
        kind: JointType::Free,
        ..JointSpec::default()
    });
    b.add_geom(GeomSpec {
        body: torso,
        kind: GeomType::Box,
        size: [0.1, 0.15, 0.2],
        ..GeomSpec::default()
    });
    for (side, y) in [("left", 0.1), ("right", -0.1)] {
        let leg = b.add_body(BodySpec {
            name: format!("{side}_leg"),
            parent: torso,
            pos: [0.0, y, -0.3],
            mass: 1.0,
            ..BodySpec::default()
        });
        let joint = b.add_joint(JointSpec {
            name: format!("{side}_knee_pitch"),
            body: leg,
            kind: JointType::Hinge,
            pos: [0.0, 0.0, 0.1],
            axis: [0.0, 1.0, 0.0],
            range: Some([-1.0, 1.5]),
        });
        b.add_geom(GeomSpec {
            body: leg,
            kind: GeomType::Capsule,
            size: [0.04, 0.1, 0.0],
            ..GeomSpec::default()
        });
        let _ = b.add_actuator(ActuatorSpec {
            name: format!("knee_{side}"),
            joint,
            gear: 1.0,
            ctrlrange: Some([-150.0, 150.0]),
        });
    }
    b.build().unwrap()
}
