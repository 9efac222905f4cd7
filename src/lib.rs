//! model-viewer
//!
//! A minimal native + WASM glTF scene viewer built on wgpu and winit. It shows
//! one model on a shadow-receiving ground plane, lit by a single
//! shadow-casting spot light, and lets the user orbit around it.
//!
//! High-level modules
//! - `camera`: camera, projection, uniforms and the orbit controller
//! - `config`: every tunable of the viewer with its default
//! - `context`: window, GPU device, surface and pipelines
//! - `data_structures`: geometry, meshes, materials, textures and the scene graph
//! - `flow`: the winit event loop and background model loading
//! - `light`: the spot light and its shadow camera
//! - `pipelines`: the lit main pipeline and the shadow pipeline
//! - `progress`: loading indicator
//! - `render`: frame composition (shadow pass, then main pass)
//! - `resources`: asset sources, the load state machine and glTF parsing
//! - `scene`: the viewer's scene (ground, light, model)
//! - `surface`: render target settings and resize handling
//!

pub mod camera;
pub mod config;
pub mod context;
pub mod data_structures;
pub mod flow;
pub mod light;
pub mod pipelines;
pub mod progress;
pub mod render;
pub mod resources;
pub mod scene;
pub mod surface;

pub use config::ViewerConfig;
pub use flow::run;
