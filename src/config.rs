//! Viewer configuration.
//!
//! All tunables of the scene live here as plain values; nothing is read from
//! the environment except what the native binary passes on the command line.

use cgmath::{Deg, Point3, Vector3};

use crate::{
    camera::OrbitSettings,
    light::SpotLight,
    surface::{ColorSpace, ShadowFilter},
};

#[derive(Clone, Debug, PartialEq)]
pub struct CameraConfig {
    pub fovy: Deg<f32>,
    pub znear: f32,
    pub zfar: f32,
    pub position: Point3<f32>,
}

impl Default for CameraConfig {
    fn default() -> Self {
        Self {
            fovy: Deg(45.0),
            znear: 1.0,
            zfar: 1000.0,
            position: Point3::new(4.0, 5.0, 11.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct GroundConfig {
    pub size: f32,
    /// Subdivisions per side. Only affects vertex density.
    pub segments: u32,
    /// sRGB hex colour.
    pub colour: u32,
}

impl Default for GroundConfig {
    fn default() -> Self {
        Self {
            size: 20.0,
            segments: 32,
            colour: 0x555555,
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct AssetConfig {
    /// Directory (or URL path on the web) every asset file is resolved against.
    pub base_path: String,
    pub entry: String,
    /// Local position given to the loaded model's root node.
    pub offset: Vector3<f32>,
}

impl Default for AssetConfig {
    fn default() -> Self {
        Self {
            #[cfg(not(target_arch = "wasm32"))]
            base_path: "assets/model/".to_string(),
            #[cfg(target_arch = "wasm32")]
            base_path: "/model/".to_string(),
            entry: "scene.gltf".to_string(),
            offset: Vector3::new(0.0, 1.05, -1.0),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct ViewerConfig {
    pub title: String,
    /// Default log level; `RUST_LOG` overrides it on native builds.
    pub log_level: log::LevelFilter,
    pub clear_colour: wgpu::Color,
    pub color_space: ColorSpace,
    pub shadow_filter: ShadowFilter,
    pub camera: CameraConfig,
    pub orbit: OrbitSettings,
    pub ground: GroundConfig,
    pub light: SpotLight,
    pub asset: AssetConfig,
}

impl Default for ViewerConfig {
    fn default() -> Self {
        Self {
            title: "model-viewer".to_string(),
            log_level: log::LevelFilter::Info,
            clear_colour: wgpu::Color::BLACK,
            color_space: ColorSpace::Srgb,
            shadow_filter: ShadowFilter::PcfSoft,
            camera: CameraConfig::default(),
            orbit: OrbitSettings::default(),
            ground: GroundConfig::default(),
            light: SpotLight::default(),
            asset: AssetConfig::default(),
        }
    }
}
