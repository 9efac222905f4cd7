//! Render-target settings that live next to the `wgpu::Surface`.
//!
//! [`SurfaceSettings`] is the CPU-side record of the output: its size in
//! physical pixels, pixel density, clear colour, colour space and shadow
//! filtering. Resizing always goes through [`resize_viewport`] so the camera
//! aspect ratio can never drift from the surface dimensions.

use crate::camera::Projection;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColorSpace {
    /// Output is sRGB encoded by the surface format; assets authored in sRGB
    /// render with their intended brightness.
    Srgb,
    Linear,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ShadowFilter {
    Off,
    /// One hardware-filtered comparison tap.
    Pcf,
    /// 3x3 hardware-filtered comparison taps.
    PcfSoft,
}

impl ShadowFilter {
    /// Value read by the shader: number of taps per axis, zero disables shadows.
    pub fn kernel_width(&self) -> f32 {
        match self {
            ShadowFilter::Off => 0.0,
            ShadowFilter::Pcf => 1.0,
            ShadowFilter::PcfSoft => 3.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct SurfaceSettings {
    pub width: u32,
    pub height: u32,
    pub pixel_density: f64,
    pub clear_colour: wgpu::Color,
    pub color_space: ColorSpace,
    pub shadow_filter: ShadowFilter,
}

impl SurfaceSettings {
    pub fn initialize(width: u32, height: u32, pixel_density: f64) -> Self {
        Self {
            width,
            height,
            pixel_density,
            clear_colour: wgpu::Color::BLACK,
            color_space: ColorSpace::Srgb,
            shadow_filter: ShadowFilter::PcfSoft,
        }
    }

    /// Store a new size. Zero-sized surfaces (minimised windows) are ignored.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        self.width = width;
        self.height = height;
        true
    }

    pub fn aspect(&self) -> f32 {
        self.width as f32 / self.height.max(1) as f32
    }

    /// Pick the surface texture format matching the configured colour space,
    /// falling back to the first supported one.
    pub fn choose_format(&self, formats: &[wgpu::TextureFormat]) -> Option<wgpu::TextureFormat> {
        let wants_srgb = self.color_space == ColorSpace::Srgb;
        formats
            .iter()
            .copied()
            .find(|f| f.is_srgb() == wants_srgb)
            .or_else(|| formats.first().copied())
    }
}

/// Apply a viewport size to both the surface settings and the projection.
///
/// Returns `false` and changes nothing when either dimension is zero.
pub fn resize_viewport(
    settings: &mut SurfaceSettings,
    projection: &mut Projection,
    width: u32,
    height: u32,
) -> bool {
    if !settings.resize(width, height) {
        return false;
    }
    projection.resize(width, height);
    true
}
