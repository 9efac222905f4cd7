//! The viewer's single shadow-casting spot light.
//!
//! Shading follows a physical punctual-light model: inverse-square falloff
//! (`decay = 2`) with a smooth cut-off at `range`, and a cone whose edge is
//! softened across the `penumbra` fraction of the cone angle. No tone mapping
//! is applied afterwards, so `intensity` is tuned for that model directly.

use cgmath::{InnerSpace, Matrix4, Point3, Rad, Vector3};

use crate::camera::OPENGL_TO_WGPU_MATRIX;

#[derive(Clone, Debug, PartialEq)]
pub struct SpotLight {
    /// Linear RGB.
    pub color: [f32; 3],
    pub intensity: f32,
    /// Distance at which the light reaches zero. Also the shadow camera's far plane.
    pub range: f32,
    /// Half-angle of the cone.
    pub angle: Rad<f32>,
    /// Fraction of the cone over which the edge fades out, in `[0, 1]`.
    pub penumbra: f32,
    pub decay: f32,
    pub position: Vector3<f32>,
    pub target: Vector3<f32>,
    /// Added to the receiver's depth in light space before the comparison.
    pub shadow_bias: f32,
    pub shadow_map_size: u32,
    pub shadow_near: f32,
}

impl Default for SpotLight {
    fn default() -> Self {
        Self {
            color: [1.0, 1.0, 1.0],
            intensity: 3000.0,
            range: 100.0,
            angle: Rad(0.22),
            penumbra: 1.0,
            decay: 2.0,
            position: Vector3::new(0.0, 25.0, 0.0),
            target: Vector3::new(0.0, 0.0, 0.0),
            shadow_bias: -0.0001,
            shadow_map_size: 1024,
            shadow_near: 0.5,
        }
    }
}

impl SpotLight {
    pub fn direction(&self) -> Vector3<f32> {
        let dir = self.target - self.position;
        if dir.magnitude2() == 0.0 {
            -Vector3::unit_y()
        } else {
            dir.normalize()
        }
    }

    pub fn cone_cos(&self) -> f32 {
        self.angle.0.cos()
    }

    pub fn penumbra_cos(&self) -> f32 {
        (self.angle.0 * (1.0 - self.penumbra.clamp(0.0, 1.0))).cos()
    }

    /// Smooth-step cone falloff for a direction whose angle to the light axis
    /// has cosine `angle_cos`.
    pub fn cone_attenuation(&self, angle_cos: f32) -> f32 {
        smoothstep(self.cone_cos(), self.penumbra_cos(), angle_cos)
    }

    /// Inverse-square falloff windowed to zero at `range`.
    pub fn distance_attenuation(&self, distance: f32) -> f32 {
        let falloff = 1.0 / distance.powf(self.decay).max(0.01);
        if self.range > 0.0 {
            let ratio = (distance / self.range).powi(4);
            falloff * (1.0 - ratio).clamp(0.0, 1.0).powi(2)
        } else {
            falloff
        }
    }

    /// View-projection of the perspective camera the shadow map is rendered with.
    pub fn shadow_view_proj(&self) -> Matrix4<f32> {
        let dir = self.direction();
        // looking straight down makes the usual +Y up vector degenerate
        let up = if dir.y.abs() > 0.999 {
            Vector3::unit_z()
        } else {
            Vector3::unit_y()
        };
        let eye = Point3::new(self.position.x, self.position.y, self.position.z);
        let view = Matrix4::look_to_rh(eye, dir, up);
        let proj = cgmath::perspective(Rad(2.0 * self.angle.0), 1.0, self.shadow_near, self.range);
        OPENGL_TO_WGPU_MATRIX * proj * view
    }
}

fn smoothstep(edge0: f32, edge1: f32, x: f32) -> f32 {
    if edge0 == edge1 {
        return if x < edge0 { 0.0 } else { 1.0 };
    }
    let t = ((x - edge0) / (edge1 - edge0)).clamp(0.0, 1.0);
    t * t * (3.0 - 2.0 * t)
}
