use std::{collections::HashMap, io::Cursor};

use model_viewer::resources::{
    source::{AssetSource, FetchFuture},
    AssetLoadError, LoadEvent, LoadSink, Progress,
};

pub const BASE_PATH: &str = "/model/";
pub const ENTRY: &str = "scene.gltf";
pub const BUFFER_URI: &str = "triangle.bin";

/// In-memory files keyed by their resolved path, delivered in fixed chunks.
pub struct MemorySource {
    files: HashMap<String, Vec<u8>>,
    chunk: usize,
    report_total: bool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self {
            files: HashMap::new(),
            chunk: 64,
            report_total: true,
        }
    }

    /// Behave like a server that sends no content length.
    pub fn without_total(mut self) -> Self {
        self.report_total = false;
        self
    }

    pub fn with_file(mut self, path: &str, data: Vec<u8>) -> Self {
        self.files.insert(path.to_string(), data);
        self
    }

    /// Entry file and its buffer under [`BASE_PATH`].
    pub fn with_triangle_model() -> Self {
        let (json, bin) = triangle_gltf(BUFFER_URI);
        Self::new()
            .with_file(&format!("{BASE_PATH}{ENTRY}"), json.into_bytes())
            .with_file(&format!("{BASE_PATH}{BUFFER_URI}"), bin)
    }
}

impl AssetSource for MemorySource {
    fn fetch<'a>(&'a self, path: &'a str, on_progress: &'a mut dyn FnMut(Progress)) -> FetchFuture<'a> {
        Box::pin(async move {
            let data = self
                .files
                .get(path)
                .ok_or_else(|| AssetLoadError::NotFound { path: path.to_string() })?;
            let total = self.report_total.then_some(data.len() as u64);
            on_progress(Progress::new(0, total));
            let mut loaded = 0;
            for chunk in data.chunks(self.chunk) {
                loaded += chunk.len() as u64;
                on_progress(Progress::new(loaded, total));
            }
            Ok::<_, AssetLoadError>(data.clone())
        })
    }
}

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<LoadEvent>,
}

impl RecordingSink {
    pub fn progress(&self) -> Vec<Progress> {
        self.events
            .iter()
            .filter_map(|event| match event {
                LoadEvent::Progress(progress) => Some(*progress),
                _ => None,
            })
            .collect()
    }

    pub fn terminal_count(&self) -> usize {
        self.events
            .iter()
            .filter(|event| !matches!(event, LoadEvent::Progress(_)))
            .count()
    }
}

impl LoadSink for RecordingSink {
    fn emit(&mut self, event: LoadEvent) {
        self.events.push(event);
    }
}

/// Binary buffer of one triangle: three positions followed by three u16 indices.
pub fn triangle_bin() -> Vec<u8> {
    let positions: [f32; 9] = [0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 1.0, 0.0];
    let indices: [u16; 3] = [0, 1, 2];
    let mut bin: Vec<u8> = bytemuck::cast_slice::<f32, u8>(&positions).to_vec();
    bin.extend_from_slice(bytemuck::cast_slice::<u16, u8>(&indices));
    bin
}

/// Two-by-two PNG of a single colour.
pub fn png_bytes(rgba: [u8; 4]) -> Vec<u8> {
    let mut bytes = Vec::new();
    image::RgbaImage::from_pixel(2, 2, image::Rgba(rgba))
        .write_to(&mut Cursor::new(&mut bytes), image::ImageFormat::Png)
        .expect("encode png");
    bytes
}

/// A scene with two nodes: `tri` (one primitive, lifted by 0.5) and `pair`
/// (two primitives of the same triangle). Neither ships normals.
pub fn triangle_gltf(buffer_uri: &str) -> (String, Vec<u8>) {
    let bin = triangle_bin();
    let buffer = format!(r#"{{ "uri": "{buffer_uri}", "byteLength": {} }}"#, bin.len());
    (scene_json(&buffer, "", None), bin)
}

/// The triangle scene with `red` textured by a single external image.
pub fn textured_triangle_gltf(image_uri: &str) -> String {
    let buffer = format!(r#"{{ "uri": "{BUFFER_URI}", "byteLength": {} }}"#, triangle_bin().len());
    let image = format!(r#"{{ "uri": "{image_uri}" }}"#);
    scene_json(&buffer, "", Some(&image))
}

/// Binary glTF of the triangle scene. The geometry and a PNG base colour
/// texture (`rgba`) share the embedded BIN chunk.
pub fn triangle_glb(rgba: [u8; 4]) -> Vec<u8> {
    let png = png_bytes(rgba);
    let mut bin = triangle_bin();
    bin.resize(44, 0);
    let image_offset = bin.len();
    bin.extend_from_slice(&png);
    while bin.len() % 4 != 0 {
        bin.push(0);
    }

    let buffer = format!(r#"{{ "byteLength": {} }}"#, bin.len());
    let view = format!(
        r#", {{ "buffer": 0, "byteOffset": {image_offset}, "byteLength": {} }}"#,
        png.len()
    );
    let image = r#"{ "bufferView": 2, "mimeType": "image/png" }"#;
    let mut json = scene_json(&buffer, &view, Some(image)).into_bytes();
    while json.len() % 4 != 0 {
        json.push(b' ');
    }

    let total = 12 + 8 + json.len() + 8 + bin.len();
    let mut glb = Vec::with_capacity(total);
    glb.extend_from_slice(b"glTF");
    glb.extend_from_slice(&2u32.to_le_bytes());
    glb.extend_from_slice(&(total as u32).to_le_bytes());
    glb.extend_from_slice(&(json.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"JSON");
    glb.extend_from_slice(&json);
    glb.extend_from_slice(&(bin.len() as u32).to_le_bytes());
    glb.extend_from_slice(b"BIN\0");
    glb.extend_from_slice(&bin);
    glb
}

/// `buffer` is the JSON of buffer 0, `extra_views` is appended to the buffer
/// views, `image` becomes the base colour texture of `red` when given.
fn scene_json(buffer: &str, extra_views: &str, image: Option<&str>) -> String {
    let (texture_ref, textures) = match image {
        Some(image) => (
            r#", "baseColorTexture": { "index": 0 }"#.to_string(),
            format!(r#""images": [{image}], "textures": [{{ "source": 0 }}],"#),
        ),
        None => (String::new(), String::new()),
    };
    format!(
        r#"{{
  "asset": {{ "version": "2.0" }},
  "scene": 0,
  "scenes": [{{ "name": "Scene", "nodes": [0, 1] }}],
  "nodes": [
    {{ "name": "tri", "mesh": 0, "translation": [0.0, 0.5, 0.0] }},
    {{ "name": "pair", "mesh": 1 }}
  ],
  "meshes": [
    {{ "primitives": [{{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }}] }},
    {{ "primitives": [
      {{ "attributes": {{ "POSITION": 0 }}, "indices": 1, "material": 0 }},
      {{ "attributes": {{ "POSITION": 0 }}, "indices": 1 }}
    ] }}
  ],
  "materials": [{{
    "name": "red",
    "pbrMetallicRoughness": {{ "baseColorFactor": [1.0, 0.0, 0.0, 1.0], "metallicFactor": 0.0, "roughnessFactor": 0.5{texture_ref} }}
  }}],
  {textures}
  "buffers": [{buffer}],
  "bufferViews": [
    {{ "buffer": 0, "byteOffset": 0, "byteLength": 36, "target": 34962 }},
    {{ "buffer": 0, "byteOffset": 36, "byteLength": 6, "target": 34963 }}{extra_views}
  ],
  "accessors": [
    {{ "bufferView": 0, "componentType": 5126, "count": 3, "type": "VEC3", "min": [0.0, 0.0, 0.0], "max": [1.0, 1.0, 0.0] }},
    {{ "bufferView": 1, "componentType": 5123, "count": 3, "type": "SCALAR" }}
  ]
}}"#
    )
}
