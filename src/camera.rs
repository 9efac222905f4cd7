//! Camera, projection, and the orbit controller that drives them.
//!
//! The [`OrbitController`] keeps the camera on a sphere around a fixed target.
//! Pointer input accumulates spherical deltas that `update` applies once per
//! frame. With damping enabled the deltas are eased in over several frames, so
//! `update` has to run every frame even when no input arrives.

use std::{collections::HashMap, f32::consts::PI};

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};
use instant::Duration;
use winit::{
    dpi::PhysicalPosition,
    event::{ElementState, MouseButton, MouseScrollDelta, TouchPhase, WindowEvent},
};

#[rustfmt::skip]
pub const OPENGL_TO_WGPU_MATRIX: Matrix4<f32> = Matrix4::new(
    1.0, 0.0, 0.0, 0.0,
    0.0, 1.0, 0.0, 0.0,
    0.0, 0.0, 0.5, 0.0,
    0.0, 0.0, 0.5, 1.0,
);

const EPS: f32 = 0.000001;

#[derive(Clone, Debug, PartialEq)]
pub struct Camera {
    pub position: Point3<f32>,
    pub target: Point3<f32>,
    pub up: Vector3<f32>,
}

impl Camera {
    pub fn new<V: Into<Point3<f32>>, T: Into<Point3<f32>>>(position: V, target: T) -> Self {
        Self {
            position: position.into(),
            target: target.into(),
            up: Vector3::unit_y(),
        }
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        Matrix4::look_at_rh(self.position, self.target, self.up)
    }

    /// Distance between camera and target.
    pub fn distance(&self) -> f32 {
        (self.position - self.target).magnitude()
    }

    /// Angle between the world up axis and the target-to-camera vector.
    pub fn polar_angle(&self) -> Rad<f32> {
        Rad(Spherical::from_vector(self.position - self.target).phi)
    }
}

#[derive(Clone, Debug)]
pub struct Projection {
    aspect: f32,
    fovy: Rad<f32>,
    znear: f32,
    zfar: f32,
}

impl Projection {
    pub fn new<F: Into<Rad<f32>>>(width: u32, height: u32, fovy: F, znear: f32, zfar: f32) -> Self {
        Self {
            aspect: width as f32 / height.max(1) as f32,
            fovy: fovy.into(),
            znear,
            zfar,
        }
    }

    pub fn resize(&mut self, width: u32, height: u32) {
        self.aspect = width as f32 / height as f32;
    }

    pub fn aspect(&self) -> f32 {
        self.aspect
    }

    pub fn fovy(&self) -> Rad<f32> {
        self.fovy
    }

    pub fn calc_matrix(&self) -> Matrix4<f32> {
        OPENGL_TO_WGPU_MATRIX * cgmath::perspective(self.fovy, self.aspect, self.znear, self.zfar)
    }
}

#[repr(C)]
#[derive(Debug, Copy, Clone, bytemuck::Pod, bytemuck::Zeroable)]
pub struct CameraUniform {
    view_position: [f32; 4],
    view_proj: [[f32; 4]; 4],
}

impl CameraUniform {
    pub fn new() -> Self {
        use cgmath::SquareMatrix;
        Self {
            view_position: [0.0; 4],
            view_proj: Matrix4::identity().into(),
        }
    }

    pub fn update_view_proj(&mut self, camera: &Camera, projection: &Projection) {
        self.view_position = camera.position.to_homogeneous().into();
        self.view_proj = (projection.calc_matrix() * camera.calc_matrix()).into();
    }
}

impl Default for CameraUniform {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug)]
pub struct CameraResources {
    pub camera: Camera,
    pub controller: OrbitController,
    pub uniform: CameraUniform,
    pub buffer: wgpu::Buffer,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
}

/// Radius, polar angle `phi` (from +Y) and azimuth `theta` (around +Y,
/// measured from +Z towards +X).
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Spherical {
    pub radius: f32,
    pub phi: f32,
    pub theta: f32,
}

impl Spherical {
    pub fn from_vector(v: Vector3<f32>) -> Self {
        let radius = v.magnitude();
        if radius == 0.0 {
            return Self {
                radius,
                phi: 0.0,
                theta: 0.0,
            };
        }
        Self {
            radius,
            phi: (v.y / radius).clamp(-1.0, 1.0).acos(),
            theta: v.x.atan2(v.z),
        }
    }

    pub fn to_vector(&self) -> Vector3<f32> {
        let sin_phi_radius = self.phi.sin() * self.radius;
        Vector3::new(
            sin_phi_radius * self.theta.sin(),
            self.phi.cos() * self.radius,
            sin_phi_radius * self.theta.cos(),
        )
    }

    /// Keep `phi` away from the poles where the azimuth is undefined.
    fn make_safe(&mut self) {
        self.phi = self.phi.clamp(EPS, PI - EPS);
    }
}

/// Clamp `theta` into `[min, max]`. When `min > max` the range wraps across
/// +-PI and `theta` snaps to the closer end.
fn clamp_azimuth(theta: f32, min: f32, max: f32) -> f32 {
    if min <= max {
        theta.clamp(min, max)
    } else if theta > (min + max) / 2.0 {
        theta.max(min)
    } else {
        theta.min(max)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct OrbitSettings {
    pub target: Point3<f32>,
    pub enable_damping: bool,
    pub damping_factor: f32,
    pub enable_pan: bool,
    pub min_distance: f32,
    pub max_distance: f32,
    pub min_polar_angle: Rad<f32>,
    pub max_polar_angle: Rad<f32>,
    /// Optional `(min, max)` azimuth bounds in `[-PI, PI]`; unbounded if `None`.
    /// `min > max` selects the range that wraps through +-PI.
    pub azimuth_range: Option<(Rad<f32>, Rad<f32>)>,
    pub auto_rotate: bool,
    /// Full orbits per minute when auto-rotating, 2.0 means one orbit every 30s.
    pub auto_rotate_speed: f32,
    pub rotate_speed: f32,
    pub zoom_speed: f32,
    pub pan_speed: f32,
}

impl Default for OrbitSettings {
    fn default() -> Self {
        Self {
            target: Point3::new(0.0, 1.0, 0.0),
            enable_damping: true,
            damping_factor: 0.05,
            enable_pan: false,
            min_distance: 5.0,
            max_distance: 20.0,
            min_polar_angle: Rad(0.5),
            max_polar_angle: Rad(1.5),
            azimuth_range: None,
            auto_rotate: false,
            auto_rotate_speed: 2.0,
            rotate_speed: 1.0,
            zoom_speed: 1.0,
            pan_speed: 1.0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum PointerAction {
    None,
    Rotate,
    Dolly,
    Pan,
}

#[derive(Debug)]
pub struct OrbitController {
    settings: OrbitSettings,
    target: Point3<f32>,
    fovy: Rad<f32>,
    viewport_height: f32,
    spherical_delta: Spherical,
    scale: f32,
    pan_offset: Vector3<f32>,
    pan_pixels: (f32, f32),
    zoom_changed: bool,
    last_position: Option<Point3<f32>>,
    last_target: Point3<f32>,
    action: PointerAction,
    cursor: Option<PhysicalPosition<f64>>,
    touches: HashMap<u64, PhysicalPosition<f64>>,
}

impl OrbitController {
    /// `fovy` is the vertical field of view of the driven camera, used to
    /// scale pan distances to screen space.
    pub fn new<F: Into<Rad<f32>>>(settings: OrbitSettings, fovy: F) -> Self {
        let target = settings.target;
        Self {
            settings,
            target,
            fovy: fovy.into(),
            viewport_height: 1.0,
            spherical_delta: Spherical {
                radius: 0.0,
                phi: 0.0,
                theta: 0.0,
            },
            scale: 1.0,
            pan_offset: Vector3::new(0.0, 0.0, 0.0),
            pan_pixels: (0.0, 0.0),
            zoom_changed: false,
            last_position: None,
            last_target: target,
            action: PointerAction::None,
            cursor: None,
            touches: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &OrbitSettings {
        &self.settings
    }

    pub fn target(&self) -> Point3<f32> {
        self.target
    }

    pub fn set_viewport_height(&mut self, height: u32) {
        self.viewport_height = height.max(1) as f32;
    }

    /// Whether eased motion is still pending.
    pub fn is_settling(&self) -> bool {
        self.spherical_delta.theta.abs() > EPS
            || self.spherical_delta.phi.abs() > EPS
            || self.pan_offset.magnitude2() > EPS
    }

    pub fn rotate_left(&mut self, angle: f32) {
        self.spherical_delta.theta -= angle;
    }

    pub fn rotate_up(&mut self, angle: f32) {
        self.spherical_delta.phi -= angle;
    }

    /// Rotate by a pointer drag of `(dx, dy)` pixels; a drag across the full
    /// viewport height turns the camera once around.
    pub fn rotate(&mut self, dx: f32, dy: f32, viewport_height: f32) {
        let height = viewport_height.max(1.0);
        let speed = self.settings.rotate_speed;
        self.rotate_left(2.0 * PI * dx / height * speed);
        self.rotate_up(2.0 * PI * dy / height * speed);
    }

    /// Move closer by `scale` (< 1 for a small step in).
    pub fn dolly_in(&mut self, scale: f32) {
        if scale > 0.0 {
            self.scale *= scale;
            self.zoom_changed = true;
        }
    }

    pub fn dolly_out(&mut self, scale: f32) {
        if scale > 0.0 {
            self.scale /= scale;
            self.zoom_changed = true;
        }
    }

    pub fn zoom_scale(&self) -> f32 {
        0.95_f32.powf(self.settings.zoom_speed)
    }

    /// Screen-space pan by `(dx, dy)` pixels. Ignored unless panning is enabled.
    pub fn pan(&mut self, dx: f32, dy: f32) {
        if !self.settings.enable_pan {
            return;
        }
        self.pan_pixels.0 += dx * self.settings.pan_speed;
        self.pan_pixels.1 += dy * self.settings.pan_speed;
    }

    fn auto_rotation_angle(&self, dt: Duration) -> f32 {
        2.0 * PI / 60.0 * self.settings.auto_rotate_speed * dt.as_secs_f32()
    }

    /// Advance the controller one frame and move `camera` accordingly.
    ///
    /// Returns whether the camera position or target changed. Distance and
    /// polar angle are clamped to the configured bounds on every call.
    pub fn update(&mut self, camera: &mut Camera, dt: Duration) -> bool {
        let mut spherical = Spherical::from_vector(camera.position - camera.target);

        if self.settings.auto_rotate && self.action == PointerAction::None {
            let angle = self.auto_rotation_angle(dt);
            self.rotate_left(angle);
        }

        let damping = self.settings.damping_factor.clamp(0.0, 1.0);
        if self.settings.enable_damping {
            spherical.theta += self.spherical_delta.theta * damping;
            spherical.phi += self.spherical_delta.phi * damping;
        } else {
            spherical.theta += self.spherical_delta.theta;
            spherical.phi += self.spherical_delta.phi;
        }

        if let Some((min, max)) = self.settings.azimuth_range {
            let mut theta = spherical.theta;
            while theta > PI {
                theta -= 2.0 * PI;
            }
            while theta < -PI {
                theta += 2.0 * PI;
            }
            spherical.theta = clamp_azimuth(theta, min.0, max.0);
        }

        spherical.phi = spherical
            .phi
            .clamp(self.settings.min_polar_angle.0, self.settings.max_polar_angle.0);
        spherical.make_safe();

        self.accumulate_pan(camera, spherical.radius);
        if self.settings.enable_damping {
            self.target = self.target + self.pan_offset * damping;
        } else {
            self.target = self.target + self.pan_offset;
        }

        spherical.radius = (spherical.radius * self.scale)
            .clamp(self.settings.min_distance, self.settings.max_distance);

        camera.target = self.target;
        camera.position = self.target + spherical.to_vector();

        if self.settings.enable_damping {
            self.spherical_delta.theta *= 1.0 - damping;
            self.spherical_delta.phi *= 1.0 - damping;
            self.pan_offset *= 1.0 - damping;
        } else {
            self.spherical_delta.theta = 0.0;
            self.spherical_delta.phi = 0.0;
            self.pan_offset = Vector3::new(0.0, 0.0, 0.0);
        }
        self.scale = 1.0;

        let moved = match self.last_position {
            Some(last) => (camera.position - last).magnitude2() > EPS,
            None => true,
        };
        let retargeted = (self.target - self.last_target).magnitude2() > EPS;
        let changed = moved || retargeted || self.zoom_changed;

        self.last_position = Some(camera.position);
        self.last_target = self.target;
        self.zoom_changed = false;
        changed
    }

    fn accumulate_pan(&mut self, camera: &Camera, radius: f32) {
        let (dx, dy) = self.pan_pixels;
        if dx == 0.0 && dy == 0.0 {
            return;
        }
        self.pan_pixels = (0.0, 0.0);
        let forward = (camera.target - camera.position).normalize();
        let right = forward.cross(camera.up).normalize();
        let up = right.cross(forward);
        let target_distance = radius * (self.fovy.0 / 2.0).tan();
        let per_pixel = 2.0 * target_distance / self.viewport_height;
        self.pan_offset += right * (-dx * per_pixel) + up * (dy * per_pixel);
    }

    /// Map pointer, wheel and touch input to orbit operations.
    ///
    /// Left drag rotates, middle drag dollies, right drag pans (when enabled).
    /// One finger rotates, two fingers pinch to dolly.
    pub fn handle_window_events(&mut self, event: &WindowEvent) {
        match event {
            WindowEvent::Resized(size) => self.set_viewport_height(size.height),
            WindowEvent::MouseInput { state, button, .. } => {
                self.action = match (state, button) {
                    (ElementState::Pressed, MouseButton::Left) => PointerAction::Rotate,
                    (ElementState::Pressed, MouseButton::Middle) => PointerAction::Dolly,
                    (ElementState::Pressed, MouseButton::Right) if self.settings.enable_pan => {
                        PointerAction::Pan
                    }
                    (ElementState::Pressed, _) => self.action,
                    (ElementState::Released, _) => PointerAction::None,
                };
            }
            WindowEvent::CursorMoved { position, .. } => {
                if let Some(last) = self.cursor.replace(*position) {
                    let dx = (position.x - last.x) as f32;
                    let dy = (position.y - last.y) as f32;
                    self.on_drag(dx, dy);
                }
            }
            WindowEvent::CursorLeft { .. } => {
                self.cursor = None;
                self.action = PointerAction::None;
            }
            WindowEvent::MouseWheel { delta, .. } => {
                let y = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y,
                    MouseScrollDelta::PixelDelta(pos) => pos.y as f32,
                };
                if y > 0.0 {
                    self.dolly_in(self.zoom_scale());
                } else if y < 0.0 {
                    self.dolly_out(self.zoom_scale());
                }
            }
            WindowEvent::PinchGesture { delta, .. } => {
                let factor = 1.0 + *delta as f32;
                if factor > 0.0 {
                    self.dolly_out(factor);
                }
            }
            WindowEvent::Touch(touch) => self.on_touch(touch.id, touch.phase, touch.location),
            _ => (),
        }
    }

    fn on_drag(&mut self, dx: f32, dy: f32) {
        match self.action {
            PointerAction::Rotate => self.rotate(dx, dy, self.viewport_height),
            PointerAction::Dolly => {
                if dy > 0.0 {
                    self.dolly_out(self.zoom_scale());
                } else if dy < 0.0 {
                    self.dolly_in(self.zoom_scale());
                }
            }
            PointerAction::Pan => self.pan(dx, dy),
            PointerAction::None => (),
        }
    }

    fn on_touch(&mut self, id: u64, phase: TouchPhase, location: PhysicalPosition<f64>) {
        match phase {
            TouchPhase::Started => {
                self.touches.insert(id, location);
            }
            TouchPhase::Moved => {
                let previous_spread = self.touch_spread();
                let Some(last) = self.touches.insert(id, location) else {
                    return;
                };
                match self.touches.len() {
                    1 => {
                        let dx = (location.x - last.x) as f32;
                        let dy = (location.y - last.y) as f32;
                        self.rotate(dx, dy, self.viewport_height);
                    }
                    2 => {
                        if let (Some(before), Some(after)) = (previous_spread, self.touch_spread()) {
                            if before > 0.0 && after > 0.0 {
                                let ratio = (after / before).powf(self.settings.zoom_speed);
                                self.dolly_out(ratio);
                            }
                        }
                    }
                    _ => (),
                }
            }
            TouchPhase::Ended | TouchPhase::Cancelled => {
                self.touches.remove(&id);
            }
        }
    }

    fn touch_spread(&self) -> Option<f32> {
        if self.touches.len() != 2 {
            return None;
        }
        let mut points = self.touches.values();
        let a = points.next()?;
        let b = points.next()?;
        Some(((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt() as f32)
    }
}

