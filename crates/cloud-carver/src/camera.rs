use crate::filter::Extent;
use crate::picking::{Ray, Viewport};
use glam::{Mat4, Quat, Vec2, Vec3};
use std::f32::consts::PI;

/// World up. The reference plane is z = 0.
pub const WORLD_UP: Vec3 = Vec3::Z;

/// Keeps the orbit off the poles, where the yaw axis and view axis coincide.
const MIN_POLAR: f32 = 1.0e-3;

const MIN_RADIUS: f32 = 1.0e-3;
const MAX_RADIUS: f32 = 1.0e7;

/// Position, target and up; what a view reset restores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CameraPose {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
}

/// Orbit camera around `target`, in centered world coordinates.
#[derive(Debug, Clone)]
pub struct Camera {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,

    /// Latched polar angle (radians from +Z); pitch is ignored while set.
    polar_lock: Option<f32>,
    /// Latched azimuth (radians around +Z from +X); yaw is ignored while set.
    azimuth_lock: Option<f32>,

    pub fov_y: f32,
    pub aspect: f32,
    pub near: f32,
    pub far: f32,
}

impl Camera {
    pub fn new(pose: CameraPose, aspect: f32) -> Self {
        let mut camera = Self {
            position: pose.position,
            target: pose.target,
            up: pose.up,
            polar_lock: None,
            azimuth_lock: None,
            fov_y: 45.0f32.to_radians(),
            aspect,
            near: 0.01,
            far: 1000.0,
        };
        camera.orthonormalize_up();
        camera.update_clip_planes();
        camera
    }

    /// Frames the whole cloud from the front (-Y side), 60 degrees off vertical.
    pub fn framing(observed: [Extent; 3], aspect: f32) -> Self {
        let target = Vec3::new(observed[0].center(), observed[1].center(), observed[2].center());
        let diag = Vec3::new(observed[0].span(), observed[1].span(), observed[2].span())
            .length()
            .max(1.0);

        let fov_y = 45.0f32.to_radians();
        let radius = 0.6 * diag / (0.5 * fov_y).tan();

        let (polar, azimuth) = (60.0f32.to_radians(), -90.0f32.to_radians());
        let offset = Vec3::new(
            polar.sin() * azimuth.cos(),
            polar.sin() * azimuth.sin(),
            polar.cos(),
        ) * radius;

        Self::new(
            CameraPose {
                position: target + offset,
                target,
                up: WORLD_UP,
            },
            aspect,
        )
    }

    pub fn pose(&self) -> CameraPose {
        CameraPose {
            position: self.position,
            target: self.target,
            up: self.up,
        }
    }

    /// Restores a pose. Latches stay as they are.
    pub fn set_pose(&mut self, pose: CameraPose) {
        self.position = pose.position;
        self.target = pose.target;
        self.up = pose.up;
        self.orthonormalize_up();
        self.update_clip_planes();
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if aspect.is_finite() && aspect > 0.0 {
            self.aspect = aspect;
        }
    }

    pub fn view(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    /// Perspective with wgpu's [0, 1] depth range.
    pub fn proj(&self) -> Mat4 {
        Mat4::perspective_rh(self.fov_y, self.aspect, self.near, self.far)
    }

    pub fn view_proj(&self) -> Mat4 {
        self.proj() * self.view()
    }

    #[inline]
    pub fn forward(&self) -> Vec3 {
        (self.target - self.position).normalize_or_zero()
    }

    pub fn radius(&self) -> f32 {
        (self.position - self.target).length()
    }

    /// Angle between the target-to-camera offset and world up.
    pub fn polar_angle(&self) -> f32 {
        let o = (self.position - self.target).normalize_or_zero();
        o.dot(WORLD_UP).clamp(-1.0, 1.0).acos()
    }

    /// Angle of the offset around world up, measured from +X.
    pub fn azimuth_angle(&self) -> f32 {
        let o = self.position - self.target;
        o.y.atan2(o.x)
    }

    pub fn polar_lock(&self) -> Option<f32> {
        self.polar_lock
    }

    pub fn azimuth_lock(&self) -> Option<f32> {
        self.azimuth_lock
    }

    /// Latches the polar angle at its current value, or releases it.
    pub fn set_polar_lock(&mut self, locked: bool) {
        self.polar_lock = locked.then(|| self.polar_angle());
    }

    pub fn set_azimuth_lock(&mut self, locked: bool) {
        self.azimuth_lock = locked.then(|| self.azimuth_angle());
    }

    /// Orbits the camera around the target. `yaw` turns around world up,
    /// `pitch` increases the polar angle. Latched angles ignore their delta.
    pub fn orbit(&mut self, yaw: f32, pitch: f32) {
        let yaw = if self.azimuth_lock.is_some() { 0.0 } else { yaw };
        let pitch = if self.polar_lock.is_some() { 0.0 } else { pitch };

        if yaw != 0.0 {
            let rot = Quat::from_axis_angle(WORLD_UP, yaw);
            self.position = self.target + rot * (self.position - self.target);
            self.up = rot * self.up;
        }

        if pitch != 0.0 {
            let polar = self.polar_angle();
            let lo = MIN_POLAR.min(polar);
            let hi = (PI - MIN_POLAR).max(polar);
            let delta = (polar + pitch).clamp(lo, hi) - polar;

            let offset = self.position - self.target;
            let axis = WORLD_UP
                .cross(offset)
                .try_normalize()
                .or_else(|| (-offset).cross(self.up).try_normalize());

            if let Some(axis) = axis {
                let rot = Quat::from_axis_angle(axis, delta);
                self.position = self.target + rot * offset;
                self.up = rot * self.up;
            }
        }

        self.orthonormalize_up();
    }

    /// Rotates position (about the target) and up around the view axis, then
    /// re-aims at the target.
    pub fn roll(&mut self, angle: f32) {
        let axis = self.forward();
        if axis == Vec3::ZERO || angle == 0.0 {
            return;
        }
        let rot = Quat::from_axis_angle(axis, angle);
        self.position = self.target + rot * (self.position - self.target);
        self.up = rot * self.up;
        self.orthonormalize_up();
    }

    /// Scales the orbit radius by `factor`.
    pub fn zoom(&mut self, factor: f32) {
        if !factor.is_finite() || factor <= 0.0 {
            return;
        }
        let offset = self.position - self.target;
        let radius = offset.length();
        if radius == 0.0 {
            return;
        }
        let next = (radius * factor).clamp(MIN_RADIUS, MAX_RADIUS);
        self.position = self.target + offset * (next / radius);
        self.update_clip_planes();
    }

    /// Ray from the camera through the pixel `cursor` (top-left origin).
    pub fn screen_ray(&self, viewport: Viewport, cursor: Vec2) -> Option<Ray> {
        let ndc = viewport.to_ndc(cursor)?;
        let inv = self.view_proj().inverse();
        let near = inv.project_point3(ndc.extend(0.0));
        let far = inv.project_point3(ndc.extend(1.0));
        let dir = (far - near).try_normalize()?;
        Some(Ray {
            origin: self.position,
            dir,
        })
    }

    /// Removes drift so `up` stays a unit vector orthogonal to the view axis.
    fn orthonormalize_up(&mut self) {
        let f = self.forward();
        if let Some(up) = (self.up - f * self.up.dot(f)).try_normalize() {
            self.up = up;
        }
    }

    fn update_clip_planes(&mut self) {
        let r = self.radius().max(MIN_RADIUS);
        self.near = (r * 1.0e-3).max(1.0e-4);
        self.far = r * 100.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    fn test_camera() -> Camera {
        Camera::new(
            CameraPose {
                position: Vec3::new(0.0, -10.0, 10.0),
                target: Vec3::ZERO,
                up: WORLD_UP,
            },
            1.0,
        )
    }

    #[test]
    fn yaw_keeps_polar_and_pitch_keeps_azimuth() {
        let mut cam = test_camera();
        let (polar, azimuth, radius) = (cam.polar_angle(), cam.azimuth_angle(), cam.radius());

        cam.orbit(0.3, 0.0);
        assert!(close(cam.polar_angle(), polar));
        assert!(close(cam.azimuth_angle(), azimuth + 0.3));

        let azimuth = cam.azimuth_angle();
        cam.orbit(0.0, 0.2);
        assert!(close(cam.azimuth_angle(), azimuth));
        assert!(close(cam.polar_angle(), polar + 0.2));
        assert!(close(cam.radius(), radius));
    }

    #[test]
    fn pitch_stops_short_of_the_pole() {
        let mut cam = test_camera();
        cam.orbit(0.0, -10.0);
        assert!(cam.polar_angle() >= MIN_POLAR - 1e-4);
        assert!(cam.up.is_finite());
    }

    #[test]
    fn latched_angles_ignore_deltas() {
        let mut cam = test_camera();
        cam.set_polar_lock(true);
        let polar = cam.polar_angle();
        cam.orbit(0.5, 0.5);
        assert!(close(cam.polar_angle(), polar));
        assert_eq!(cam.polar_lock(), Some(polar));

        cam.set_polar_lock(false);
        cam.set_azimuth_lock(true);
        let azimuth = cam.azimuth_angle();
        cam.orbit(0.5, 0.5);
        assert!(close(cam.azimuth_angle(), azimuth));
        assert!(close(cam.polar_angle(), polar + 0.5));
    }

    #[test]
    fn roll_turns_up_about_the_view_axis() {
        let mut cam = test_camera();
        let before = cam.pose();
        cam.roll(std::f32::consts::FRAC_PI_2);

        assert!(cam.position.abs_diff_eq(before.position, 1e-4));
        assert!(close(cam.up.dot(cam.forward()), 0.0));
        assert!(close(cam.up.dot(before.up), 0.0));

        cam.roll(-std::f32::consts::FRAC_PI_2);
        assert!(cam.up.abs_diff_eq(before.up, 1e-4));
    }

    #[test]
    fn zoom_scales_radius() {
        let mut cam = test_camera();
        let r = cam.radius();
        cam.zoom(0.5);
        assert!(close(cam.radius(), r * 0.5));
        cam.zoom(f32::NAN);
        assert!(close(cam.radius(), r * 0.5));
    }

    #[test]
    fn center_ray_points_at_target() {
        let cam = test_camera();
        let ray = cam
            .screen_ray(Viewport::new(800.0, 800.0), Vec2::new(400.0, 400.0))
            .unwrap();
        assert!(ray.dir.abs_diff_eq(cam.forward(), 1e-4));
    }

    #[test]
    fn framing_looks_at_cloud_center() {
        let cam = Camera::framing(
            [
                Extent::new(-5.0, 5.0),
                Extent::new(-2.0, 2.0),
                Extent::new(0.0, 4.0),
            ],
            1.5,
        );
        assert_eq!(cam.target, Vec3::new(0.0, 0.0, 2.0));
        assert!(close(cam.polar_angle(), 60.0f32.to_radians()));
        assert!(cam.position.y < 0.0);
    }
}
