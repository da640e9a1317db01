use std::path::PathBuf;

use simview::error::SimviewError;
use simview::options::Options;
use simview::sim::{
    ActuatorSpec, BodySpec, FnLoader, GeomSpec, GeomType, JointSpec, JointType, LightSpec,
    Model, ModelBuilder, ModelFileLoader, RapierSimulation, SimulationHandle, SiteSpec,
    TendonSpec,
};
use simview::Viewer;

/// Command-line arguments.
#[derive(Debug, Default)]
struct Args {
    model: Option<PathBuf>,
    options: Option<PathBuf>,
}

fn parse_args() -> Result<Args, String> {
    let mut args = Args::default();
    let mut iter = std::env::args().skip(1);
    while let Some(arg) = iter.next() {
        match arg.as_str() {
            "-o" | "--options" => {
                let path = iter.next().ok_or("--options needs a path")?;
                args.options = Some(PathBuf::from(path));
            }
            "-h" | "--help" => {
                return Err("usage: simview [MODEL.json] [--options OPTIONS.toml]".into());
            }
            _ if args.model.is_none() => args.model = Some(PathBuf::from(arg)),
            _ => return Err(format!("unexpected argument: {arg}")),
        }
    }
    Ok(args)
}

/// Ground, a two-link actuated arm with a tendon, and a loose crate to drag.
fn demo_model() -> Result<Model, SimviewError> {
    let mut b = ModelBuilder::new();
    b.add_light(LightSpec {
        dir: [0.3, 0.2, -1.0],
        directional: true,
        ..LightSpec::default()
    });
    b.add_geom(GeomSpec {
        kind: GeomType::Plane,
        size: [4.0, 4.0, 0.1],
        rgba: [0.35, 0.38, 0.42, 1.0],
        ..GeomSpec::default()
    });

    let mount = b.add_body(BodySpec {
        name: "mount".to_owned(),
        pos: [0.0, 0.0, 1.6],
        mass: 2.0,
        ..BodySpec::default()
    });
    b.add_geom(GeomSpec {
        body: mount,
        kind: GeomType::Box,
        size: [0.1, 0.1, 0.05],
        rgba: [0.25, 0.25, 0.3, 1.0],
        ..GeomSpec::default()
    });

    let mut parent = mount;
    let mut last_site = b.add_site(SiteSpec {
        name: "anchor".to_owned(),
        body: 0,
        pos: [0.3, 0.0, 1.6],
    });
    let links = [
        ("knee_upper", [0.85, 0.45, 0.2, 1.0]),
        ("knee_lower", [0.2, 0.55, 0.85, 1.0]),
    ];
    for (name, rgba) in links {
        let link = b.add_body(BodySpec {
            name: format!("{name}_link"),
            parent,
            pos: [0.0, 0.0, -0.3],
            mass: 1.0,
            ..BodySpec::default()
        });
        let joint = b.add_joint(JointSpec {
            name: format!("{name}_joint"),
            body: link,
            kind: JointType::Hinge,
            pos: [0.0, 0.0, 0.15],
            axis: [0.0, 1.0, 0.0],
            range: Some([-2.0, 2.0]),
        });
        b.add_geom(GeomSpec {
            body: link,
            kind: GeomType::Capsule,
            size: [0.04, 0.12, 0.0],
            rgba,
            ..GeomSpec::default()
        });
        let _ = b.add_actuator(ActuatorSpec {
            name: name.to_owned(),
            joint,
            gear: 1.0,
            ctrlrange: Some([-40.0, 40.0]),
        });
        let site = b.add_site(SiteSpec {
            name: format!("{name}_site"),
            body: link,
            pos: [0.05, 0.0, 0.0],
        });
        b.add_tendon(TendonSpec {
            sites: vec![last_site, site],
            width: 0.01,
            ..TendonSpec::default()
        });
        last_site = site;
        parent = link;
    }

    let crate_body = b.add_body(BodySpec {
        name: "crate".to_owned(),
        pos: [0.8, 0.3, 0.5],
        mass: 1.5,
        ..BodySpec::default()
    });
    let _ = b.add_joint(JointSpec {
        name: "crate_free".to_owned(),
        body: crate_body,
        kind: JointType::Free,
        ..JointSpec::default()
    });
    b.add_geom(GeomSpec {
        body: crate_body,
        kind: GeomType::Box,
        size: [0.15, 0.15, 0.15],
        rgba: [0.7, 0.6, 0.4, 1.0],
        ..GeomSpec::default()
    });

    b.build()
}

fn run(args: Args) -> Result<(), SimviewError> {
    let options = match &args.options {
        Some(path) => Options::load(path)?,
        None => Options::default(),
    };

    let builder = Viewer::builder().with_options(options);
    let builder = match args.model {
        Some(path) => {
            let title = format!("simview - {}", path.display());
            builder.with_loader(ModelFileLoader::new(path)).with_title(title)
        }
        None => builder.with_loader(FnLoader::new("demo arm", || {
            let sim: SimulationHandle = Box::new(RapierSimulation::new(demo_model()?)?);
            Ok(sim)
        })),
    };
    builder.build().run()
}

fn main() {
    env_logger::init();

    let args = match parse_args() {
        Ok(args) => args,
        Err(e) => {
            log::error!("{e}");
            std::process::exit(2);
        }
    };

    if let Err(e) = run(args) {
        log::error!("{e}");
        std::process::exit(1);
    }
}
