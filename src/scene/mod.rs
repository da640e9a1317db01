//! Retained-mode render scene mirroring the simulated body tree.
//!
//! A [`SceneGraph`] is built once per load by [`builder::build`] and updated
//! every frame by [`sync::sync`]. It holds exactly one [`SceneNode`] per
//! body (node index == body index, body 0 is the root), the visual shapes
//! attached to them, lights, model cameras, and the pooled tendon instances.
//! All transforms are in render axes (Y-up).

pub mod builder;
mod graph;
pub mod raycast;
pub mod sync;
pub mod tendon;
pub mod tessellate;

pub use builder::{build, Diagnostic};
pub use graph::{
    CameraNode, Geometry, LightKind, LightNode, Material, MeshData, SceneGraph, SceneNode,
    Texture, Transform, Visual,
};
pub use raycast::{Ray, RayHit};
pub use tendon::{Instance, InstancePool, TendonPools};
