//! GPU rendering for the standalone viewer.
//!
//! Provides wgpu device/surface initialization, growable instance buffers,
//! and the instanced mesh pass that draws a [`SceneGraph`](crate::scene::SceneGraph).

/// Growable GPU buffers with automatic reallocation.
pub mod dynamic_buffer;
/// Instanced, lit mesh pass for scene visuals and tendons.
pub mod mesh_renderer;
/// wgpu device, surface, and queue initialization.
pub mod render_context;
