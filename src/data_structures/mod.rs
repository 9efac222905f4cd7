//! Engine data structures: geometry, models, textures, scene graphs, and instances.
//!
//! - `geometry` holds CPU-side triangle lists and the ground plane builder
//! - `model` contains mesh and material definitions, GPU resources for 3D models
//! - `texture` contains GPU texture wrapper and creation utilities
//! - `instance` holds per-node transformation data
//! - `scene_graph` enables hierarchical scene organization

pub mod geometry;
pub mod instance;
pub mod model;
pub mod scene_graph;
pub mod texture;
