//! Producing fresh [`SimulationHandle`]s on load and reload.

use std::path::PathBuf;

use super::model::Model;
use super::rapier::RapierSimulation;
use super::SimulationHandle;
use crate::error::SimviewError;

/// Something that can (re)create a simulation from scratch.
///
/// Reload always goes through the loader again: a loaded model is never
/// mutated in place.
pub trait SimulationLoader {
    /// Human-readable name for logs.
    fn describe(&self) -> String;

    /// Build a brand-new simulation.
    ///
    /// # Errors
    ///
    /// Returns an error if the scene cannot be loaded.
    fn load(&mut self) -> Result<SimulationHandle, SimviewError>;
}

/// Loader wrapping a closure.
pub struct FnLoader<F> {
    name: String,
    f: F,
}

impl<F> FnLoader<F>
where
    F: FnMut() -> Result<SimulationHandle, SimviewError>,
{
    /// Wrap `f` under `name`.
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self { name: name.into(), f }
    }
}

impl<F> SimulationLoader for FnLoader<F>
where
    F: FnMut() -> Result<SimulationHandle, SimviewError>,
{
    fn describe(&self) -> String {
        self.name.clone()
    }

    fn load(&mut self) -> Result<SimulationHandle, SimviewError> {
        (self.f)()
    }
}

/// Reads a serialized [`Model`] (JSON) from disk on every load and runs it
/// with [`RapierSimulation`].
#[derive(Debug, Clone)]
pub struct ModelFileLoader {
    path: PathBuf,
}

impl ModelFileLoader {
    /// Loader for the model file at `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Parse a model from JSON text and check it is self-consistent.
    ///
    /// # Errors
    ///
    /// Returns [`SimviewError::Load`] on malformed JSON, and the
    /// [`Model::validate`] error when the counts and buffers disagree.
    pub fn parse(text: &str) -> Result<Model, SimviewError> {
        let model: Model =
            serde_json::from_str(text).map_err(|e| SimviewError::Load(e.to_string()))?;
        model.validate()?;
        Ok(model)
    }
}

impl SimulationLoader for ModelFileLoader {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn load(&mut self) -> Result<SimulationHandle, SimviewError> {
        let text = std::fs::read_to_string(&self.path)?;
        let model = Self::parse(&text)?;
        Ok(Box::new(RapierSimulation::new(model)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sim::builder::{BodySpec, GeomSpec, ModelBuilder};

    #[test]
    fn model_json_round_trip_loads() {
        let mut b = ModelBuilder::new();
        let _ = b.add_body(BodySpec {
            name: "box".to_owned(),
            ..BodySpec::default()
        });
        let model = b.build().unwrap();
        let text = serde_json::to_string(&model).unwrap();
        let parsed = ModelFileLoader::parse(&text).unwrap();
        assert_eq!(parsed.nbody, 2);
        assert_eq!(parsed.body_id("box"), Some(1));
    }

    #[test]
    fn malformed_model_is_a_load_error() {
        assert!(matches!(
            ModelFileLoader::parse("{ not json"),
            Err(SimviewError::Load(_))
        ));
    }

    #[test]
    fn inconsistent_counts_are_rejected_not_indexed() {
        let mut b = ModelBuilder::new();
        let _ = b.add_body(BodySpec::default());
        let model = b.build().unwrap();
        let mut json = serde_json::to_value(&model).unwrap();
        json["nbody"] = serde_json::json!(3);

        let err = ModelFileLoader::parse(&json.to_string()).unwrap_err();
        assert!(matches!(err, SimviewError::InvalidModel(_)), "{err}");
    }

    #[test]
    fn dangling_geom_body_is_rejected() {
        let mut b = ModelBuilder::new();
        b.add_geom(GeomSpec::default());
        let mut model = b.build().unwrap();
        model.geom_bodyid[0] = 7;
        let text = serde_json::to_string(&model).unwrap();
        assert!(matches!(
            ModelFileLoader::parse(&text),
            Err(SimviewError::MissingReference { kind: "body", index: 7 })
        ));
        assert!(RapierSimulation::new(model).is_err());
    }

    #[test]
    fn fn_loader_invokes_closure_each_time() {
        let mut calls = 0;
        let mut loader = FnLoader::new("counter", || {
            calls += 1;
            let model = ModelBuilder::new().build()?;
            let sim: SimulationHandle = Box::new(RapierSimulation::new(model)?);
            Ok(sim)
        });
        assert!(loader.load().is_ok());
        assert!(loader.load().is_ok());
        assert_eq!(loader.describe(), "counter");
        drop(loader);
        assert_eq!(calls, 2);
    }
}
