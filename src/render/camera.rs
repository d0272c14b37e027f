//! Perspective camera and pointer-driven orbit controls.

use glam::{Mat4, Vec3};

#[derive(Debug, Clone, Copy)]
pub struct PerspectiveCamera {
    pub fov_y_deg: f32,
    pub aspect: f32,
    pub z_near: f32,
    pub z_far: f32,
}

impl PerspectiveCamera {
    pub fn new(fov_y_deg: f32, aspect: f32, z_near: f32, z_far: f32) -> Self {
        Self {
            fov_y_deg,
            aspect,
            z_near,
            z_far,
        }
    }

    pub fn set_aspect(&mut self, width: u32, height: u32) {
        self.aspect = width.max(1) as f32 / height.max(1) as f32;
    }

    pub fn projection(&self) -> Mat4 {
        Mat4::perspective_rh(
            self.fov_y_deg.to_radians(),
            self.aspect.max(1e-4),
            self.z_near,
            self.z_far,
        )
    }
}

const MIN_DISTANCE: f32 = 0.05;
const MAX_PITCH: f32 = 1.54; // just shy of straight up/down
/// Velocity half-life for inertial damping, in seconds.
const DAMPING_HALF_LIFE: f32 = 0.08;

/// Orbit/pan/zoom controller around a target point, with inertial damping.
/// Gestures accumulate velocity; `update` integrates and decays it once per
/// frame before the render.
#[derive(Debug, Clone, Copy)]
pub struct OrbitController {
    pub target: Vec3,
    yaw: f32,
    pitch: f32,
    distance: f32,
    yaw_vel: f32,
    pitch_vel: f32,
    zoom_vel: f32,
    pan_vel: Vec3,
}

impl OrbitController {
    /// Controller looking from `eye` towards `target`.
    pub fn from_position(eye: Vec3, target: Vec3) -> Self {
        let offset = eye - target;
        let distance = offset.length().max(MIN_DISTANCE);
        let yaw = offset.z.atan2(offset.x);
        let pitch = (offset.y / distance).clamp(-1.0, 1.0).asin();
        Self {
            target,
            yaw,
            pitch,
            distance,
            yaw_vel: 0.0,
            pitch_vel: 0.0,
            zoom_vel: 0.0,
            pan_vel: Vec3::ZERO,
        }
    }

    pub fn eye(&self) -> Vec3 {
        let cos_pitch = self.pitch.cos();
        self.target
            + Vec3::new(
                self.yaw.cos() * cos_pitch,
                self.pitch.sin(),
                self.yaw.sin() * cos_pitch,
            ) * self.distance
    }

    pub fn distance(&self) -> f32 {
        self.distance
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.eye(), self.target, Vec3::Y)
    }

    /// Pointer drag in pixels to orbit velocity.
    pub fn rotate(&mut self, dx: f32, dy: f32) {
        self.yaw_vel += dx * 0.005;
        self.pitch_vel += dy * 0.005;
    }

    /// Pointer drag in pixels to a pan velocity in the camera plane.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        let forward = (self.target - self.eye()).normalize_or_zero();
        let right = forward.cross(Vec3::Y).normalize_or_zero();
        let up = right.cross(forward);
        let scale = self.distance * 0.0015;
        self.pan_vel += (-right * dx + up * dy) * scale;
    }

    /// Scroll steps to zoom velocity; positive zooms in.
    pub fn zoom(&mut self, amount: f32) {
        self.zoom_vel += amount * 0.1;
    }

    /// Integrate velocities with exponential decay. Returns whether the
    /// camera moved this frame.
    pub fn update(&mut self, dt: f32) -> bool {
        let speed = self.yaw_vel.abs()
            + self.pitch_vel.abs()
            + self.zoom_vel.abs()
            + self.pan_vel.length();
        if speed < 1e-5 {
            return false;
        }
        self.yaw += self.yaw_vel;
        self.pitch = (self.pitch + self.pitch_vel).clamp(-MAX_PITCH, MAX_PITCH);
        self.distance = (self.distance * (1.0 - self.zoom_vel)).max(MIN_DISTANCE);
        self.target += self.pan_vel;

        let decay = (-dt.max(0.0) * std::f32::consts::LN_2 / DAMPING_HALF_LIFE).exp();
        self.yaw_vel *= decay;
        self.pitch_vel *= decay;
        self.zoom_vel *= decay;
        self.pan_vel *= decay;
        true
    }

    /// Reframe for a model of the given world-space size, centered at the
    /// origin: camera at (0, maxDim/2, 2*maxDim) looking at the origin.
    pub fn frame_size(&mut self, size: Vec3) {
        let max_dim = size.max_element().max(1e-3);
        *self = Self::from_position(Vec3::new(0.0, max_dim * 0.5, max_dim * 2.0), Vec3::ZERO);
    }
}

impl Default for OrbitController {
    fn default() -> Self {
        Self::from_position(Vec3::new(0.0, 1.2, 3.2), Vec3::ZERO)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn from_position_roundtrips_eye() {
        let eye = Vec3::new(1.0, 2.0, 3.0);
        let controls = OrbitController::from_position(eye, Vec3::ZERO);
        assert!((controls.eye() - eye).length() < 1e-4);
    }

    #[test]
    fn framing_places_camera_per_bounds() {
        let mut controls = OrbitController::default();
        controls.frame_size(Vec3::new(4.0, 2.0, 1.0));
        let eye = controls.eye();
        assert!((eye - Vec3::new(0.0, 2.0, 8.0)).length() < 1e-3);
        assert_eq!(controls.target, Vec3::ZERO);
    }

    #[test]
    fn orbit_preserves_distance() {
        let mut controls = OrbitController::default();
        let before = controls.distance();
        controls.rotate(120.0, -40.0);
        controls.update(1.0 / 60.0);
        assert!((controls.distance() - before).abs() < 1e-5);
    }

    #[test]
    fn pitch_is_clamped() {
        let mut controls = OrbitController::default();
        for _ in 0..200 {
            controls.rotate(0.0, 500.0);
            controls.update(1.0 / 60.0);
        }
        assert!(controls.eye().y <= controls.distance() + 1e-3);
        assert!(controls.pitch <= MAX_PITCH);
    }

    #[test]
    fn damping_settles_to_rest() {
        let mut controls = OrbitController::default();
        controls.zoom(1.0);
        let mut moved_frames = 0;
        for _ in 0..600 {
            if controls.update(1.0 / 60.0) {
                moved_frames += 1;
            }
        }
        assert!(moved_frames > 0);
        assert!(!controls.update(1.0 / 60.0));
        assert!(controls.distance() >= MIN_DISTANCE);
    }

    #[test]
    fn aspect_never_degenerates() {
        let mut camera = PerspectiveCamera::new(45.0, 1.0, 0.1, 500.0);
        camera.set_aspect(1280, 0);
        assert!(camera.aspect.is_finite() && camera.aspect > 0.0);
    }
}
