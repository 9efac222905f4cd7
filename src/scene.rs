//! The viewer's scene: a ground plane, the spot light and, once loaded, the model.

use std::sync::Arc;

use cgmath::{Rad, Vector3};

use crate::{
    config::ViewerConfig,
    data_structures::{
        geometry,
        instance::Instance,
        model::MaterialData,
        scene_graph::{ContainerNode, LightNode, MaterialCache, MeshNode, SceneNode},
    },
    light::SpotLight,
    resources::gltf::LoadedAsset,
};

pub const GROUND_NAME: &str = "ground";
pub const LIGHT_NAME: &str = "spot light";

pub struct Scene {
    root: ContainerNode,
    materials: MaterialCache,
    model_attached: bool,
}

impl Scene {
    /// Ground and light are in place before anything is loaded or drawn.
    pub fn new(config: &ViewerConfig) -> Self {
        let mut root = ContainerNode::new("root");
        root.add_child(Box::new(ground(config)));
        root.add_child(Box::new(LightNode::new(LIGHT_NAME, config.light.clone())));
        Self {
            root,
            materials: MaterialCache::default(),
            model_attached: false,
        }
    }

    pub fn root(&self) -> &dyn SceneNode {
        &self.root
    }

    pub fn light(&self) -> Option<&SpotLight> {
        self.root.find_light()
    }

    pub fn model_attached(&self) -> bool {
        self.model_attached
    }

    pub fn materials(&self) -> &MaterialCache {
        &self.materials
    }

    /// Append a loaded model under the root. Every mesh in it casts and
    /// receives shadows, and its root is moved to `offset`.
    pub fn attach_model(&mut self, asset: LoadedAsset, offset: Vector3<f32>) {
        let mut node = asset.into_scene_node();
        node.for_each_renderable_mut(&mut |renderable| {
            renderable.set_cast_shadow(true);
            renderable.set_receive_shadow(true);
        });
        let mut transform = node.get_local_transform().clone();
        transform.position = offset;
        node.set_local_transform(transform);
        log::debug!("Attaching {} ({} nodes)", node.name(), node.count_nodes());
        self.root.add_child(node);
        self.model_attached = true;
    }

    /// Propagate transforms and upload whatever is not on the GPU yet.
    pub fn prepare(&mut self, device: &wgpu::Device, queue: &wgpu::Queue, material_layout: &wgpu::BindGroupLayout) {
        self.root.update_world_transforms(&Instance::new());
        let materials = &mut self.materials;
        self.root.for_each_renderable_mut(&mut |renderable| {
            if let Err(e) = renderable.write_to_buffers(device, queue, materials, material_layout) {
                log::error!("Failed to upload mesh: {e:#}");
            }
        });
    }
}

fn ground(config: &ViewerConfig) -> MeshNode {
    let ground = &config.ground;
    let mut plane = geometry::plane(ground.size, ground.size, ground.segments, ground.segments);
    plane.rotate_x(Rad(-std::f32::consts::FRAC_PI_2));
    let material = MaterialData {
        double_sided: true,
        ..MaterialData::from_srgb_hex(GROUND_NAME, ground.colour)
    };
    MeshNode::new(GROUND_NAME, plane, Arc::new(material)).with_shadows(false, true)
}
