use glam::{Mat3, Quat, Vec2, Vec3};

use crate::camera::core::Camera;
use crate::options::CameraOptions;

/// Closest the eye may get to the focus point.
const MIN_DISTANCE: f32 = 0.01;

/// Orbit camera: an orientation and distance around a focus point.
///
/// Mouse deltas are in physical pixels; speeds come from
/// [`CameraOptions`].
#[derive(Debug, Clone)]
pub struct OrbitCamera {
    orientation: Quat,
    distance: f32,
    focus_point: Vec3,
    /// Last tracked point while following a body.
    follow_anchor: Option<Vec3>,

    camera: Camera,
    rotate_speed: f32,
    pan_speed: f32,
    zoom_speed: f32,
    home_eye: Vec3,
    home_target: Vec3,
}

impl OrbitCamera {
    /// Camera at the configured home pose.
    #[must_use]
    pub fn new(options: &CameraOptions, aspect: f32) -> Self {
        let home_eye = Vec3::from_array(options.home_eye);
        let home_target = Vec3::from_array(options.home_target);
        let mut cam = Self {
            orientation: Quat::IDENTITY,
            distance: 1.0,
            focus_point: home_target,
            follow_anchor: None,
            camera: Camera {
                eye: home_eye,
                target: home_target,
                up: Vec3::Y,
                aspect,
                fovy: options.fovy,
                znear: options.znear,
                zfar: options.zfar,
            },
            rotate_speed: options.rotate_speed,
            pan_speed: options.pan_speed,
            zoom_speed: options.zoom_speed,
            home_eye,
            home_target,
        };
        cam.reset();
        cam
    }

    /// Re-read speeds and projection from `options` without moving.
    pub fn apply_options(&mut self, options: &CameraOptions) {
        self.camera.fovy = options.fovy;
        self.camera.znear = options.znear;
        self.camera.zfar = options.zfar;
        self.rotate_speed = options.rotate_speed;
        self.pan_speed = options.pan_speed;
        self.zoom_speed = options.zoom_speed;
        self.home_eye = Vec3::from_array(options.home_eye);
        self.home_target = Vec3::from_array(options.home_target);
    }

    /// Current view parameters.
    #[must_use]
    pub fn camera(&self) -> &Camera {
        &self.camera
    }

    /// Point the camera orbits around.
    #[must_use]
    pub fn focus_point(&self) -> Vec3 {
        self.focus_point
    }

    /// Eye to focus distance.
    #[must_use]
    pub fn distance(&self) -> f32 {
        self.distance
    }

    /// Return to the home eye and target.
    pub fn reset(&mut self) {
        let offset = self.home_eye - self.home_target;
        self.distance = offset.length().max(MIN_DISTANCE);
        self.orientation = look_orientation(offset);
        self.focus_point = self.home_target;
        self.follow_anchor = None;
        self.update_camera_pos();
    }

    fn update_camera_pos(&mut self) {
        let dir = self.orientation * Vec3::Z;

        self.camera.eye = self.focus_point + (dir * self.distance);
        self.camera.target = self.focus_point;
        self.camera.up = self.orientation * Vec3::Y;
    }

    /// Viewport resized.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width > 0 && height > 0 {
            self.camera.aspect = width as f32 / height as f32;
        }
    }

    /// Orbit by a mouse delta: yaw about world up, pitch about the camera's
    /// right axis.
    pub fn rotate(&mut self, delta: Vec2) {
        let yaw = Quat::from_axis_angle(Vec3::Y, -delta.x * self.rotate_speed);
        self.orientation = yaw * self.orientation;

        let right = self.orientation * Vec3::X;
        let pitch = Quat::from_axis_angle(right, -delta.y * self.rotate_speed);
        let pitched = (pitch * self.orientation).normalize();
        // Stop short of the poles so world up stays meaningful.
        if (pitched * Vec3::Z).dot(Vec3::Y).abs() < 0.995 {
            self.orientation = pitched;
        }

        self.update_camera_pos();
    }

    /// Slide eye and focus together in the view plane. Scaled by distance
    /// so the scene tracks the cursor at any zoom.
    pub fn pan(&mut self, delta: Vec2) {
        let right = self.orientation * Vec3::X;
        let up = self.orientation * Vec3::Y;
        let speed = self.pan_speed * self.distance;

        let translation = right * (-delta.x * speed) + up * (delta.y * speed);

        self.focus_point += translation;
        self.update_camera_pos();
    }

    /// Dolly towards (positive) or away from the focus point.
    pub fn zoom(&mut self, delta: f32) {
        let max = (self.camera.zfar * 0.5).max(MIN_DISTANCE);
        self.distance *= 1.0 - delta * self.zoom_speed;
        self.distance = self.distance.clamp(MIN_DISTANCE, max);
        self.update_camera_pos();
    }

    /// Adjust camera to fit the given positions, centering on their centroid
    /// and setting distance so all points are visible.
    pub fn fit_to_positions(&mut self, positions: &[Vec3]) {
        if positions.is_empty() {
            return;
        }

        let centroid: Vec3 = positions.iter().copied().sum::<Vec3>() / positions.len() as f32;
        let radius = positions
            .iter()
            .map(|p| (*p - centroid).length())
            .fold(0.0f32, f32::max);

        self.focus_point = centroid;

        let fovy_rad = self.camera.fovy.to_radians();
        let fit_distance = radius / (fovy_rad / 2.0).tan();
        self.distance = (fit_distance * 1.5).max(MIN_DISTANCE);

        self.update_camera_pos();
    }

    /// Keep the current view offset relative to a moving point. The first
    /// call only records the point.
    pub fn follow(&mut self, point: Vec3) {
        if !point.is_finite() {
            return;
        }
        if let Some(prev) = self.follow_anchor {
            self.focus_point += point - prev;
            self.update_camera_pos();
        }
        self.follow_anchor = Some(point);
    }

    /// Stop following.
    pub fn stop_following(&mut self) {
        self.follow_anchor = None;
    }
}

/// Orientation whose local +Z points along `offset` (target to eye) with
/// local +Y as close to world up as possible.
fn look_orientation(offset: Vec3) -> Quat {
    let z = offset.try_normalize().unwrap_or(Vec3::Z);
    let x = Vec3::Y.cross(z).try_normalize().unwrap_or(Vec3::X);
    let y = z.cross(x);
    Quat::from_mat3(&Mat3::from_cols(x, y, z)).normalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn orbit() -> OrbitCamera {
        OrbitCamera::new(&CameraOptions::default(), 1.5)
    }

    fn close(a: Vec3, b: Vec3) -> bool {
        (a - b).length() < 1e-4
    }

    #[test]
    fn starts_at_home() {
        let cam = orbit();
        assert!(close(cam.camera().eye, Vec3::new(2.0, 1.7, 1.7)));
        assert!(close(cam.camera().target, Vec3::new(0.0, 0.7, 0.0)));
        assert!(cam.camera().up.y > 0.0);
        assert_eq!(cam.camera().fovy, 45.0);
    }

    #[test]
    fn rotate_keeps_distance_and_reset_restores() {
        let mut cam = orbit();
        let d = cam.distance();
        cam.rotate(Vec2::new(120.0, -40.0));
        assert!(((cam.camera().eye - cam.focus_point()).length() - d).abs() < 1e-4);
        assert!(!close(cam.camera().eye, Vec3::new(2.0, 1.7, 1.7)));
        cam.reset();
        assert!(close(cam.camera().eye, Vec3::new(2.0, 1.7, 1.7)));
    }

    #[test]
    fn pan_moves_eye_and_target_together() {
        let mut cam = orbit();
        let offset = cam.camera().eye - cam.camera().target;
        cam.pan(Vec2::new(10.0, 5.0));
        assert!(!close(cam.camera().target, Vec3::new(0.0, 0.7, 0.0)));
        assert!(close(cam.camera().eye - cam.camera().target, offset));
    }

    #[test]
    fn zoom_is_clamped() {
        let mut cam = orbit();
        for _ in 0..200 {
            cam.zoom(5.0);
        }
        assert!(cam.distance() >= MIN_DISTANCE);
        for _ in 0..200 {
            cam.zoom(-5.0);
        }
        assert!(cam.distance() <= 50.0);
    }

    #[test]
    fn fit_centres_on_centroid() {
        let mut cam = orbit();
        cam.fit_to_positions(&[Vec3::new(-1.0, 0.0, 0.0), Vec3::new(1.0, 0.0, 0.0)]);
        assert!(close(cam.focus_point(), Vec3::ZERO));
        assert!(cam.distance() > 1.0);
    }

    #[test]
    fn follow_keeps_offset() {
        let mut cam = orbit();
        let offset = cam.camera().eye - cam.camera().target;
        cam.follow(Vec3::new(1.0, 0.0, 0.0));
        assert!(close(cam.focus_point(), Vec3::new(0.0, 0.7, 0.0)));
        cam.follow(Vec3::new(3.0, 0.0, 1.0));
        assert!(close(cam.focus_point(), Vec3::new(2.0, 0.7, 1.0)));
        assert!(close(cam.camera().eye - cam.camera().target, offset));
    }
}
