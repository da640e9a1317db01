// -- Lint policy ---------------------------------------------------------
// This is the single source of truth for crate-wide lints.

// Broad lint groups
#![deny(clippy::all)]
#![deny(clippy::pedantic)]
#![deny(clippy::nursery)]
// Documentation
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]
#![deny(rustdoc::bare_urls)]
// No panicking in library code
#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]
#![deny(clippy::panic)]
#![deny(clippy::todo)]
#![deny(clippy::unimplemented)]
// No debug/print artifacts
#![deny(clippy::dbg_macro)]
#![deny(clippy::print_stdout)]
#![deny(clippy::print_stderr)]
// Import hygiene
#![deny(clippy::wildcard_imports)]
// Complexity limits (thresholds in clippy.toml)
#![deny(clippy::cognitive_complexity)]
#![deny(clippy::too_many_lines)]
#![deny(clippy::excessive_nesting)]
// Function signature hygiene
#![deny(clippy::too_many_arguments)]
#![deny(clippy::fn_params_excessive_bools)]
// Clone / pass-by-value hygiene
#![deny(clippy::needless_pass_by_value)]
#![deny(clippy::implicit_clone)]
// String hygiene
#![deny(clippy::inefficient_to_string)]
#![deny(clippy::redundant_closure_for_method_calls)]
#![deny(clippy::manual_string_new)]
#![deny(clippy::str_to_string)]
// Cargo lints (warn, not deny since cargo lints can be noisy)
#![warn(clippy::cargo)]
// Unused / redundant code
#![deny(unused_results)]
#![deny(unused_qualifications)]
// Cast hygiene
#![deny(trivial_casts)]
#![deny(trivial_numeric_casts)]

//! Interactive bridge between a rigid-body physics simulation and a
//! retained-mode 3D scene.
//!
//! simview loads a simulation, mirrors its body tree as a scene graph, and
//! keeps the two in step: physics advances on a fixed timestep decoupled
//! from the frame rate, poses flow into the scene every frame, and pointer
//! drags flow back into the simulation as spring forces. An optional control
//! loop drives actuators from a locomotion policy or from manual setpoints.
//!
//! # Key entry points
//!
//! - [`engine::SimEngine`] - owns the loaded simulation and scene and runs
//!   the frame loop
//! - [`sim::Simulation`] / [`sim::SimulationLoader`] - the physics boundary,
//!   with a bundled rapier3d backend
//! - [`scene::SceneGraph`] - the render-side mirror of the body tree
//! - [`options::Options`] - runtime configuration with TOML presets
//! - `Viewer` (feature `viewer`) - a winit + wgpu window around the engine
//!
//! # Coordinates
//!
//! Physics is Z-up, rendering is Y-up. Every crossing goes through
//! [`coords`], so nothing else in the crate converts axes by hand.

pub mod camera;
pub mod control;
pub mod coords;
pub mod engine;
pub mod error;
#[cfg(feature = "viewer")]
pub mod gpu;
pub mod input;
pub mod interaction;
pub mod options;
pub mod scene;
pub mod sim;
pub mod stepping;
pub mod util;
#[cfg(feature = "viewer")]
mod viewer;

pub use engine::{EngineCommand, SimEngine};
pub use error::SimviewError;
pub use input::{InputEvent, MouseButton};
pub use options::Options;
#[cfg(feature = "viewer")]
pub use viewer::{Viewer, ViewerBuilder};
