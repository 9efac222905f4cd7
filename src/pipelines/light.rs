use wgpu::util::DeviceExt;

use crate::{
    data_structures::texture::Texture,
    light::SpotLight,
    surface::ShadowFilter,
};

/// GPU side of the spot light: its uniform, the shadow map and the bind
/// groups for the main pass (uniform + shadow map) and the shadow pass
/// (uniform only).
pub struct LightResources {
    pub uniform: LightUniform,
    pub buffer: wgpu::Buffer,
    pub shadow_map: Texture,
    pub bind_group: wgpu::BindGroup,
    pub bind_group_layout: wgpu::BindGroupLayout,
    pub shadow_bind_group: wgpu::BindGroup,
    pub shadow_bind_group_layout: wgpu::BindGroupLayout,
}

#[repr(C)]
#[derive(Debug, Copy, Clone, PartialEq, bytemuck::Pod, bytemuck::Zeroable)]
pub struct LightUniform {
    /// xyz position, w range
    position_range: [f32; 4],
    /// xyz direction, w cos(angle)
    direction_cone: [f32; 4],
    /// rgb colour, w cos(angle * (1 - penumbra))
    color_penumbra: [f32; 4],
    view_proj: [[f32; 4]; 4],
    /// intensity, bias, shadow map size, PCF kernel width (0 = no shadows)
    params: [f32; 4],
}

impl LightUniform {
    pub fn new(light: &SpotLight, filter: ShadowFilter) -> Self {
        let direction = light.direction();
        let p = light.position;
        Self {
            position_range: [p.x, p.y, p.z, light.range],
            direction_cone: [direction.x, direction.y, direction.z, light.cone_cos()],
            color_penumbra: [light.color[0], light.color[1], light.color[2], light.penumbra_cos()],
            view_proj: light.shadow_view_proj().into(),
            params: [
                light.intensity,
                light.shadow_bias,
                light.shadow_map_size as f32,
                filter.kernel_width(),
            ],
        }
    }
}

impl LightResources {
    pub fn new(device: &wgpu::Device, light: &SpotLight, filter: ShadowFilter) -> Self {
        let uniform = LightUniform::new(light, filter);
        let buffer = mk_buffer(device, uniform);
        let texel_filter = match filter {
            ShadowFilter::Off => wgpu::FilterMode::Nearest,
            ShadowFilter::Pcf | ShadowFilter::PcfSoft => wgpu::FilterMode::Linear,
        };
        let shadow_map = Texture::create_shadow_map(device, light.shadow_map_size.max(1), texel_filter);

        let bind_group_layout = mk_bind_group_layout(device);
        let bind_group = mk_bind_group(device, &bind_group_layout, &buffer, &shadow_map);
        let shadow_bind_group_layout = mk_shadow_bind_group_layout(device);
        let shadow_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &shadow_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.as_entire_binding(),
            }],
            label: Some("light_shadow_bind_group"),
        });

        Self {
            uniform,
            buffer,
            shadow_map,
            bind_group,
            bind_group_layout,
            shadow_bind_group,
            shadow_bind_group_layout,
        }
    }

    /// Rewrite the uniform, e.g. after the light was replaced.
    pub fn update(&mut self, queue: &wgpu::Queue, light: &SpotLight, filter: ShadowFilter) {
        let uniform = LightUniform::new(light, filter);
        if uniform != self.uniform {
            self.uniform = uniform;
            queue.write_buffer(&self.buffer, 0, bytemuck::cast_slice(&[uniform]));
        }
    }
}

pub fn mk_buffer(device: &wgpu::Device, light_uniform: LightUniform) -> wgpu::Buffer {
    device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
        label: Some("Light Uniform Buffer"),
        contents: bytemuck::cast_slice(&[light_uniform]),
        usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
    })
}

pub fn mk_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[
            wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 1,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Texture {
                    multisampled: false,
                    view_dimension: wgpu::TextureViewDimension::D2,
                    sample_type: wgpu::TextureSampleType::Depth,
                },
                count: None,
            },
            wgpu::BindGroupLayoutEntry {
                binding: 2,
                visibility: wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Comparison),
                count: None,
            },
        ],
        label: Some("light_bind_group_layout"),
    })
}

/// The shadow pass only needs the light's view-projection.
pub fn mk_shadow_bind_group_layout(device: &wgpu::Device) -> wgpu::BindGroupLayout {
    device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
        entries: &[wgpu::BindGroupLayoutEntry {
            binding: 0,
            visibility: wgpu::ShaderStages::VERTEX,
            ty: wgpu::BindingType::Buffer {
                ty: wgpu::BufferBindingType::Uniform,
                has_dynamic_offset: false,
                min_binding_size: None,
            },
            count: None,
        }],
        label: Some("light_shadow_bind_group_layout"),
    })
}

pub fn mk_bind_group(
    device: &wgpu::Device,
    bind_group_layout: &wgpu::BindGroupLayout,
    light_buffer: &wgpu::Buffer,
    shadow_map: &Texture,
) -> wgpu::BindGroup {
    device.create_bind_group(&wgpu::BindGroupDescriptor {
        layout: bind_group_layout,
        entries: &[
            wgpu::BindGroupEntry {
                binding: 0,
                resource: light_buffer.as_entire_binding(),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::TextureView(&shadow_map.view),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: wgpu::BindingResource::Sampler(&shadow_map.sampler),
            },
        ],
        label: Some("light_bind_group"),
    })
}
