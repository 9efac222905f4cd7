//! Scene graph and hierarchical scene organization.
//!
//! Nodes form a tree of boxed [`SceneNode`] trait objects. What a node can do
//! beyond holding a transform and children is discovered through capability
//! checks: [`SceneNode::as_renderable`] for meshes and [`SceneNode::as_light`]
//! for lights. Traversals that only care about meshes (shadow flag policies,
//! GPU uploads, draw collection) never need to know the concrete node types.

use std::{collections::HashMap, rc::Rc, sync::Arc};

use wgpu::util::DeviceExt;

use crate::{
    data_structures::{
        geometry::Geometry,
        instance::{Instance, InstanceRaw},
        model::{Material, MaterialData, Mesh},
    },
    light::SpotLight,
};

/// State shared by every node kind: name, transforms and children.
pub struct NodeCore {
    pub name: String,
    pub local: Instance,
    world: Instance,
    pub children: Vec<Box<dyn SceneNode>>,
}

impl NodeCore {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            local: Instance::default(),
            world: Instance::default(),
            children: Vec::new(),
        }
    }
}

pub trait SceneNode {
    fn core(&self) -> &NodeCore;

    fn core_mut(&mut self) -> &mut NodeCore;

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        None
    }

    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        None
    }

    fn as_light(&self) -> Option<&SpotLight> {
        None
    }

    fn name(&self) -> &str {
        &self.core().name
    }

    fn get_local_transform(&self) -> &Instance {
        &self.core().local
    }

    fn set_local_transform(&mut self, instance: Instance) {
        self.core_mut().local = instance;
    }

    fn get_world_transform(&self) -> &Instance {
        &self.core().world
    }

    fn get_children(&self) -> &Vec<Box<dyn SceneNode>> {
        &self.core().children
    }

    fn get_children_mut(&mut self) -> &mut Vec<Box<dyn SceneNode>> {
        &mut self.core_mut().children
    }

    fn add_child(&mut self, child: Box<dyn SceneNode>) {
        self.core_mut().children.push(child);
    }

    /// Recompute `world = parent * local` for this node and all descendants.
    fn update_world_transforms(&mut self, parent: &Instance) {
        let core = self.core_mut();
        core.world = parent * &core.local;
        let world = core.world.clone();
        for child in core.children.iter_mut() {
            child.update_world_transforms(&world);
        }
    }

    fn for_each_renderable(&self, f: &mut dyn FnMut(&dyn Renderable)) {
        if let Some(renderable) = self.as_renderable() {
            f(renderable);
        }
        for child in self.get_children() {
            child.for_each_renderable(f);
        }
    }

    fn for_each_renderable_mut(&mut self, f: &mut dyn FnMut(&mut dyn Renderable)) {
        if let Some(renderable) = self.as_renderable_mut() {
            f(renderable);
        }
        for child in self.get_children_mut() {
            child.for_each_renderable_mut(f);
        }
    }

    /// Depth-first list of all renderables, for draw collection.
    fn collect_renderables<'a>(&'a self, out: &mut Vec<&'a dyn Renderable>) {
        if let Some(renderable) = self.as_renderable() {
            out.push(renderable);
        }
        for child in self.get_children() {
            child.collect_renderables(out);
        }
    }

    /// Depth-first search for the first light in this subtree.
    fn find_light(&self) -> Option<&SpotLight> {
        self.as_light()
            .or_else(|| self.get_children().iter().find_map(|child| child.find_light()))
    }

    fn count_nodes(&self) -> usize {
        1 + self
            .get_children()
            .iter()
            .map(|child| child.count_nodes())
            .sum::<usize>()
    }
}

/// Capability of nodes that draw geometry.
pub trait Renderable {
    fn cast_shadow(&self) -> bool;

    fn set_cast_shadow(&mut self, cast_shadow: bool);

    fn receive_shadow(&self) -> bool;

    fn set_receive_shadow(&mut self, receive_shadow: bool);

    fn geometry(&self) -> &Geometry;

    fn material(&self) -> &MaterialData;

    /// Create GPU resources on first use and write the current world
    /// transform into the instance buffer.
    fn write_to_buffers(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        materials: &mut MaterialCache,
        material_layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<()>;

    fn gpu(&self) -> Option<&GpuMesh>;
}

/// Uploaded materials, shared between all meshes using the same
/// [`MaterialData`].
#[derive(Default)]
pub struct MaterialCache {
    entries: HashMap<usize, (Arc<MaterialData>, Rc<Material>)>,
}

impl MaterialCache {
    pub fn get_or_create(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        data: &Arc<MaterialData>,
        layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<Rc<Material>> {
        // The cache keeps its own Arc, so the address stays unique while cached
        let key = Arc::as_ptr(data) as usize;
        if let Some((_, material)) = self.entries.get(&key) {
            return Ok(material.clone());
        }
        let material = Rc::new(Material::new(device, queue, data, layout)?);
        self.entries
            .insert(key, (data.clone(), material.clone()));
        Ok(material)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

pub struct GpuMesh {
    pub mesh: Mesh,
    pub material: Rc<Material>,
    pub instance_buffer: wgpu::Buffer,
}

pub struct ContainerNode {
    core: NodeCore,
}

impl ContainerNode {
    pub fn new(name: &str) -> Self {
        Self {
            core: NodeCore::new(name),
        }
    }
}

impl SceneNode for ContainerNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }
}

pub struct MeshNode {
    core: NodeCore,
    geometry: Geometry,
    material: Arc<MaterialData>,
    cast_shadow: bool,
    receive_shadow: bool,
    gpu: Option<GpuMesh>,
    upload_failed: bool,
}

impl MeshNode {
    /// New meshes neither cast nor receive shadows until told to.
    pub fn new(name: &str, geometry: Geometry, material: Arc<MaterialData>) -> Self {
        Self {
            core: NodeCore::new(name),
            geometry,
            material,
            cast_shadow: false,
            receive_shadow: false,
            gpu: None,
            upload_failed: false,
        }
    }

    pub fn with_shadows(mut self, cast_shadow: bool, receive_shadow: bool) -> Self {
        self.cast_shadow = cast_shadow;
        self.receive_shadow = receive_shadow;
        self
    }
}

impl SceneNode for MeshNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn as_renderable(&self) -> Option<&dyn Renderable> {
        Some(self)
    }

    fn as_renderable_mut(&mut self) -> Option<&mut dyn Renderable> {
        Some(self)
    }
}

impl Renderable for MeshNode {
    fn cast_shadow(&self) -> bool {
        self.cast_shadow
    }

    fn set_cast_shadow(&mut self, cast_shadow: bool) {
        self.cast_shadow = cast_shadow;
    }

    fn receive_shadow(&self) -> bool {
        self.receive_shadow
    }

    fn set_receive_shadow(&mut self, receive_shadow: bool) {
        self.receive_shadow = receive_shadow;
    }

    fn geometry(&self) -> &Geometry {
        &self.geometry
    }

    fn material(&self) -> &MaterialData {
        &self.material
    }

    fn write_to_buffers(
        &mut self,
        device: &wgpu::Device,
        queue: &wgpu::Queue,
        materials: &mut MaterialCache,
        material_layout: &wgpu::BindGroupLayout,
    ) -> anyhow::Result<()> {
        if self.upload_failed || self.geometry.indices.is_empty() {
            return Ok(());
        }
        let raw: InstanceRaw = self.core.world.to_raw(self.receive_shadow);
        match &self.gpu {
            Some(gpu) => queue.write_buffer(&gpu.instance_buffer, 0, bytemuck::cast_slice(&[raw])),
            None => {
                let material = match materials.get_or_create(device, queue, &self.material, material_layout) {
                    Ok(material) => material,
                    Err(e) => {
                        self.upload_failed = true;
                        return Err(e.context(format!("material of mesh {}", self.core.name)));
                    }
                };
                let mesh = Mesh::new(
                    device,
                    &self.core.name,
                    &self.geometry.vertices,
                    &self.geometry.indices,
                );
                let instance_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some("Instance Buffer"),
                    contents: bytemuck::cast_slice(&[raw]),
                    usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                });
                self.gpu = Some(GpuMesh {
                    mesh,
                    material,
                    instance_buffer,
                });
            }
        }
        Ok(())
    }

    fn gpu(&self) -> Option<&GpuMesh> {
        self.gpu.as_ref()
    }
}

/// Places a [`SpotLight`] in the tree. Lights are not renderable, so shadow
/// policies applied to a subtree never touch them.
pub struct LightNode {
    core: NodeCore,
    light: SpotLight,
}

impl LightNode {
    pub fn new(name: &str, light: SpotLight) -> Self {
        let mut core = NodeCore::new(name);
        core.local = Instance::from(light.position);
        Self { core, light }
    }
}

impl SceneNode for LightNode {
    fn core(&self) -> &NodeCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut NodeCore {
        &mut self.core
    }

    fn as_light(&self) -> Option<&SpotLight> {
        Some(&self.light)
    }
}
