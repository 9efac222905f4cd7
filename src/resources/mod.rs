/**
 * This module contains all logic for loading models and textures from external files.
 *
 * - `source` fetches raw bytes (file system natively, HTTP on the web)
 * - `loader` drives a load request and reports progress and the outcome
 * - `gltf` parses glTF into CPU-side nodes and materials
 * - `texture` decodes images and describes the material bind group
 */
pub mod gltf;
pub mod loader;
pub mod source;
pub mod texture;

pub use loader::{load, AssetLoadError, LoadEvent, LoadRequest, LoadSink, LoadState, Progress};
pub use source::{resolve, AssetSource};
