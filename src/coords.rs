//! Axis conversion between the physics convention (right-handed, Z-up) and
//! the render convention (right-handed, Y-up).
//!
//! Physics buffers store positions as 3 consecutive `f64` values and
//! orientations as scalar-first quaternions `(w, x, y, z)`. Render values are
//! `glam` single-precision types.
//!
//! Position: render `(x, y, z)` = physics `(x, z, -y)`.
//! Orientation: render `(x, y, z, w)` = physics `(-q1, -q3, q2, -q0)`.
//!
//! None of these functions allocate.

use glam::{Quat, Vec3};

/// Read entity `index` from a packed position buffer and convert it to render
/// space.
#[inline]
#[must_use]
pub fn to_render_position(buffer: &[f64], index: usize) -> Vec3 {
    let i = index * 3;
    Vec3::new(buffer[i] as f32, buffer[i + 2] as f32, -buffer[i + 1] as f32)
}

/// Read entity `index` from a packed scalar-first quaternion buffer and
/// convert it to a render-space rotation.
#[inline]
#[must_use]
pub fn to_render_orientation(buffer: &[f64], index: usize) -> Quat {
    let i = index * 4;
    Quat::from_xyzw(
        -buffer[i + 1] as f32,
        -buffer[i + 3] as f32,
        buffer[i + 2] as f32,
        -buffer[i] as f32,
    )
}

/// Write a render-space position into entity `index` of a packed physics
/// position buffer.
#[inline]
pub fn to_physics_position(position: Vec3, buffer: &mut [f64], index: usize) {
    let i = index * 3;
    buffer[i] = f64::from(position.x);
    buffer[i + 1] = -f64::from(position.z);
    buffer[i + 2] = f64::from(position.y);
}

/// Write a render-space rotation into entity `index` of a packed
/// scalar-first physics quaternion buffer.
#[inline]
pub fn to_physics_orientation(rotation: Quat, buffer: &mut [f64], index: usize) {
    let i = index * 4;
    buffer[i] = -f64::from(rotation.w);
    buffer[i + 1] = -f64::from(rotation.x);
    buffer[i + 2] = f64::from(rotation.z);
    buffer[i + 3] = -f64::from(rotation.y);
}

/// Convert a free-standing physics vector (direction, force, offset).
#[inline]
#[must_use]
pub fn render_vector(v: [f64; 3]) -> Vec3 {
    to_render_position(&v, 0)
}

/// Convert a free-standing render vector into physics axes.
#[inline]
#[must_use]
pub fn physics_vector(v: Vec3) -> [f64; 3] {
    let mut out = [0.0; 3];
    to_physics_position(v, &mut out, 0);
    out
}

/// Convert a free-standing physics quaternion `(w, x, y, z)`.
#[inline]
#[must_use]
pub fn render_rotation(q: [f64; 4]) -> Quat {
    to_render_orientation(&q, 0)
}

/// Convert a render rotation into a physics quaternion `(w, x, y, z)`.
#[inline]
#[must_use]
pub fn physics_rotation(q: Quat) -> [f64; 4] {
    let mut out = [0.0; 4];
    to_physics_orientation(q, &mut out, 0);
    out
}
