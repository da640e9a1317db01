//! Camera system for 3D scene viewing.
//!
//! Provides the projection camera used for picking and rendering and an
//! orbit controller with rotation, panning, zoom, and body following.

/// Orbit controller managing rotation, pan, zoom, and following.
pub mod controller;
/// Core camera struct and GPU uniform types.
pub mod core;

pub use controller::OrbitCamera;
pub use self::core::{Camera, CameraUniform};
