//! glTF parsing into a CPU-side [`LoadedAsset`].
//!
//! Parsing never touches the GPU, so the result can be produced off the
//! render thread and handed over whole. [`LoadedAsset::into_scene_node`] turns
//! it into scene nodes once it has arrived.

use std::{collections::HashMap, sync::Arc};

use cgmath::{InnerSpace, Vector3};

use crate::{
    data_structures::{
        geometry::Geometry,
        instance::Instance,
        model::{MaterialData, ModelVertex},
        scene_graph::{ContainerNode, MeshNode, SceneNode},
    },
    resources::{
        loader::AssetLoadError,
        source::{resolve, AssetSource},
        texture::decode_image,
    },
};

#[derive(Clone, Debug)]
pub struct PrimitiveData {
    pub geometry: Geometry,
    /// Index into [`LoadedAsset::materials`]; `None` uses the default material.
    pub material: Option<usize>,
}

#[derive(Clone, Debug)]
pub struct AssetNode {
    pub name: String,
    pub transform: Instance,
    pub primitives: Vec<PrimitiveData>,
    pub children: Vec<AssetNode>,
}

impl AssetNode {
    fn count(&self) -> usize {
        1 + self.children.iter().map(AssetNode::count).sum::<usize>()
    }
}

#[derive(Clone, Debug)]
pub struct LoadedAsset {
    /// Synthetic root holding the scene's top-level nodes, identity transform.
    pub root: AssetNode,
    pub materials: Vec<MaterialData>,
}

impl LoadedAsset {
    pub fn node_count(&self) -> usize {
        self.root.count()
    }

    pub fn primitive_count(&self) -> usize {
        fn count(node: &AssetNode) -> usize {
            node.primitives.len() + node.children.iter().map(count).sum::<usize>()
        }
        count(&self.root)
    }

    /// Build scene nodes. Meshes start with both shadow flags off.
    pub fn into_scene_node(self) -> Box<dyn SceneNode> {
        let materials: Vec<Arc<MaterialData>> = self.materials.into_iter().map(Arc::new).collect();
        let fallback = Arc::new(MaterialData::default());
        convert(self.root, &materials, &fallback)
    }
}

fn convert(node: AssetNode, materials: &[Arc<MaterialData>], fallback: &Arc<MaterialData>) -> Box<dyn SceneNode> {
    let material_for = |primitive: &PrimitiveData| {
        primitive
            .material
            .and_then(|idx| materials.get(idx))
            .unwrap_or(fallback)
            .clone()
    };
    let AssetNode {
        name,
        transform,
        mut primitives,
        children,
    } = node;

    let mut scene_node: Box<dyn SceneNode> = if primitives.len() == 1 {
        let primitive = primitives.remove(0);
        let material = material_for(&primitive);
        Box::new(MeshNode::new(&name, primitive.geometry, material))
    } else {
        let mut container = ContainerNode::new(&name);
        for (idx, primitive) in primitives.into_iter().enumerate() {
            let material = material_for(&primitive);
            let mesh = MeshNode::new(&format!("{name}#{idx}"), primitive.geometry, material);
            container.add_child(Box::new(mesh));
        }
        Box::new(container)
    };
    scene_node.set_local_transform(transform);
    for child in children {
        scene_node.add_child(convert(child, materials, fallback));
    }
    scene_node
}

/// Parse a `.gltf` or `.glb` file, fetching external buffers and images
/// relative to `base_path`.
pub async fn parse(source: &dyn AssetSource, base_path: &str, bytes: &[u8]) -> Result<LoadedAsset, AssetLoadError> {
    let gltf = ::gltf::Gltf::from_slice(bytes)?;

    let mut buffers: Vec<Vec<u8>> = Vec::new();
    for buffer in gltf.buffers() {
        let data = match buffer.source() {
            ::gltf::buffer::Source::Bin => gltf
                .blob
                .clone()
                .ok_or(AssetLoadError::MissingBuffer { index: buffer.index() })?,
            ::gltf::buffer::Source::Uri(uri) => {
                let path = resolve(base_path, uri)?;
                log::debug!("Fetching buffer {path}");
                source.fetch(&path, &mut |_| {}).await?
            }
        };
        if data.len() < buffer.length() {
            return Err(AssetLoadError::MissingBuffer { index: buffer.index() });
        }
        buffers.push(data);
    }

    let mut images: HashMap<usize, image::RgbaImage> = HashMap::new();
    let mut materials = Vec::new();
    for material in gltf.materials() {
        let pbr = material.pbr_metallic_roughness();
        let base_color_image = match pbr.base_color_texture() {
            Some(info) => {
                let image = info.texture().source();
                if !images.contains_key(&image.index()) {
                    let decoded = load_image(source, base_path, &buffers, &image).await?;
                    images.insert(image.index(), decoded);
                }
                images.get(&image.index()).cloned()
            }
            None => None,
        };
        materials.push(MaterialData {
            name: material
                .name()
                .map(str::to_string)
                .unwrap_or_else(|| format!("material {}", materials.len())),
            base_color_factor: pbr.base_color_factor(),
            metallic_factor: pbr.metallic_factor(),
            roughness_factor: pbr.roughness_factor(),
            double_sided: material.double_sided(),
            base_color_image,
        });
    }

    let mut root = AssetNode {
        name: "model".to_string(),
        transform: Instance::new(),
        primitives: Vec::new(),
        children: Vec::new(),
    };
    if let Some(scene) = gltf.default_scene().or_else(|| gltf.scenes().next()) {
        if let Some(name) = scene.name() {
            root.name = name.to_string();
        }
        for node in scene.nodes() {
            root.children.push(read_node(&node, &buffers));
        }
    }

    Ok(LoadedAsset { root, materials })
}

async fn load_image(
    source: &dyn AssetSource,
    base_path: &str,
    buffers: &[Vec<u8>],
    image: &::gltf::Image<'_>,
) -> Result<image::RgbaImage, AssetLoadError> {
    match image.source() {
        ::gltf::image::Source::View { view, mime_type } => {
            let buffer = buffers
                .get(view.buffer().index())
                .ok_or(AssetLoadError::MissingBuffer { index: view.buffer().index() })?;
            let bytes = buffer
                .get(view.offset()..view.offset() + view.length())
                .ok_or(AssetLoadError::MissingBuffer { index: view.buffer().index() })?;
            decode_image(&format!("image {}", image.index()), bytes, Some(mime_type))
        }
        ::gltf::image::Source::Uri { uri, mime_type } => {
            let path = resolve(base_path, uri)?;
            log::debug!("Fetching image {path}");
            let bytes = source.fetch(&path, &mut |_| {}).await?;
            decode_image(&path, &bytes, mime_type)
        }
    }
}

fn read_node(node: &::gltf::Node<'_>, buffers: &[Vec<u8>]) -> AssetNode {
    let (translation, rotation, scale) = node.transform().decomposed();
    let transform = Instance {
        position: translation.into(),
        rotation: cgmath::Quaternion::new(rotation[3], rotation[0], rotation[1], rotation[2]),
        scale: scale.into(),
    };
    let name = node
        .name()
        .map(str::to_string)
        .unwrap_or_else(|| format!("node {}", node.index()));

    let primitives = match node.mesh() {
        Some(mesh) => mesh
            .primitives()
            .filter_map(|primitive| read_primitive(&name, &primitive, buffers))
            .collect(),
        None => Vec::new(),
    };
    let children = node.children().map(|child| read_node(&child, buffers)).collect();

    AssetNode {
        name,
        transform,
        primitives,
        children,
    }
}

fn read_primitive(node_name: &str, primitive: &::gltf::Primitive<'_>, buffers: &[Vec<u8>]) -> Option<PrimitiveData> {
    if primitive.mode() != ::gltf::mesh::Mode::Triangles {
        log::warn!("Skipping {:?} primitive of {node_name}", primitive.mode());
        return None;
    }
    let reader = primitive.reader(|buffer| buffers.get(buffer.index()).map(Vec::as_slice));

    let Some(positions) = reader.read_positions() else {
        log::warn!("Skipping primitive {} of {node_name} without positions", primitive.index());
        return None;
    };
    let mut vertices: Vec<ModelVertex> = positions
        .map(|position| ModelVertex {
            position,
            ..Default::default()
        })
        .collect();

    let has_normals = match reader.read_normals() {
        Some(normals) => {
            vertices.iter_mut().zip(normals).for_each(|(vertex, normal)| vertex.normal = normal);
            true
        }
        None => false,
    };
    if let Some(tex_coords) = reader.read_tex_coords(0).map(|v| v.into_f32()) {
        vertices
            .iter_mut()
            .zip(tex_coords)
            .for_each(|(vertex, tex_coord)| vertex.tex_coords = tex_coord);
    }

    let indices: Vec<u32> = match reader.read_indices() {
        Some(indices) => indices.into_u32().collect(),
        None => (0..vertices.len() as u32).collect(),
    };
    if indices.iter().any(|idx| *idx as usize >= vertices.len()) {
        log::warn!("Skipping primitive {} of {node_name} with out of range indices", primitive.index());
        return None;
    }

    let mut geometry = Geometry { vertices, indices };
    if !has_normals {
        compute_normals(&mut geometry);
    }
    Some(PrimitiveData {
        geometry,
        material: primitive.material().index(),
    })
}

/// Area-weighted vertex normals for meshes that ship without any.
fn compute_normals(geometry: &mut Geometry) {
    let mut sums = vec![Vector3::new(0.0f32, 0.0, 0.0); geometry.vertices.len()];
    for tri in geometry.indices.chunks_exact(3) {
        let [a, b, c] = [tri[0] as usize, tri[1] as usize, tri[2] as usize];
        let pa: Vector3<f32> = geometry.vertices[a].position.into();
        let pb: Vector3<f32> = geometry.vertices[b].position.into();
        let pc: Vector3<f32> = geometry.vertices[c].position.into();
        let face = (pb - pa).cross(pc - pa);
        sums[a] += face;
        sums[b] += face;
        sums[c] += face;
    }
    for (vertex, sum) in geometry.vertices.iter_mut().zip(sums) {
        vertex.normal = if sum.magnitude2() > 0.0 {
            sum.normalize().into()
        } else {
            [0.0, 1.0, 0.0]
        };
    }
}
