use std::sync::Arc;

use anyhow::Context as _;
use wgpu::util::DeviceExt;
use winit::window::Window;

use crate::{
    camera::{Camera, CameraResources, CameraUniform, OrbitController, Projection},
    config::ViewerConfig,
    data_structures::texture,
    pipelines::{basic::mk_pbr_pipeline, light::LightResources, shadow::mk_shadow_pipeline},
    resources::texture::material_layout,
    surface::{self, SurfaceSettings},
};

/// Window, GPU device and everything bound to the surface.
pub struct Context {
    pub(crate) window: Arc<Window>,
    pub(crate) depth_texture: texture::DepthTarget,
    pub surface: wgpu::Surface<'static>,
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub config: wgpu::SurfaceConfiguration,
    pub settings: SurfaceSettings,
    pub camera: CameraResources,
    pub projection: Projection,
    pub light: LightResources,
    pub material_layout: wgpu::BindGroupLayout,
    pub pbr_pipeline: wgpu::RenderPipeline,
    pub pbr_double_sided_pipeline: wgpu::RenderPipeline,
    pub shadow_pipeline: wgpu::RenderPipeline,
}

impl Context {
    pub async fn new(window: Arc<Window>, viewer: &ViewerConfig) -> anyhow::Result<Self> {
        let size = window.inner_size();
        let mut settings = SurfaceSettings::initialize(size.width.max(1), size.height.max(1), window.scale_factor());
        settings.clear_colour = viewer.clear_colour;
        settings.color_space = viewer.color_space;
        settings.shadow_filter = viewer.shadow_filter;

        log::debug!("WGPU setup");
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            #[cfg(not(target_arch = "wasm32"))]
            backends: wgpu::Backends::PRIMARY,
            #[cfg(target_arch = "wasm32")]
            backends: wgpu::Backends::GL,
            ..Default::default()
        });

        let surface = instance
            .create_surface(window.clone())
            .context("Cannot create a surface for the window")?;

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::default(),
                compatible_surface: Some(&surface),
                force_fallback_adapter: false,
            })
            .await
            .context("No suitable GPU adapter")?;
        log::debug!("device and queue");
        let (device, queue) = adapter
            .request_device(&wgpu::DeviceDescriptor {
                label: None,
                required_features: wgpu::Features::empty(),
                // WebGL doesn't support all of wgpu's features, so if
                // we're building for the web we'll have to disable some.
                required_limits: if cfg!(target_arch = "wasm32") {
                    wgpu::Limits::downlevel_webgl2_defaults()
                } else {
                    wgpu::Limits::default()
                },
                memory_hints: Default::default(),
                trace: wgpu::Trace::Off,
            })
            .await
            .context("Cannot open the GPU device")?;

        let surface_caps = surface.get_capabilities(&adapter);
        let surface_format = settings
            .choose_format(&surface_caps.formats)
            .context("Surface supports no texture format")?;
        if surface_format.is_srgb() != (settings.color_space == surface::ColorSpace::Srgb) {
            log::warn!("Surface format {surface_format:?} does not match {:?} output", settings.color_space);
        }
        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format: surface_format,
            width: settings.width,
            height: settings.height,
            present_mode: surface_caps.present_modes[0],
            alpha_mode: surface_caps.alpha_modes[0],
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&device, &config);

        let camera = Camera::new(viewer.camera.position, viewer.orbit.target);
        let projection = Projection::new(
            config.width,
            config.height,
            viewer.camera.fovy,
            viewer.camera.znear,
            viewer.camera.zfar,
        );
        let mut controller = OrbitController::new(viewer.orbit.clone(), viewer.camera.fovy);
        controller.set_viewport_height(config.height);

        let mut camera_uniform = CameraUniform::new();
        camera_uniform.update_view_proj(&camera, &projection);

        let camera_buffer = device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some("Camera Buffer"),
            contents: bytemuck::cast_slice(&[camera_uniform]),
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        let camera_bind_group_layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX | wgpu::ShaderStages::FRAGMENT,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
            label: Some("camera_bind_group_layout"),
        });

        let camera_bind_group = device.create_bind_group(&wgpu::BindGroupDescriptor {
            layout: &camera_bind_group_layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: camera_buffer.as_entire_binding(),
            }],
            label: Some("camera_bind_group"),
        });

        let camera = CameraResources {
            camera,
            controller,
            uniform: camera_uniform,
            buffer: camera_buffer,
            bind_group: camera_bind_group,
            bind_group_layout: camera_bind_group_layout,
        };

        let depth_texture =
            texture::DepthTarget::new(&device, [config.width, config.height], "depth_texture");

        let light = LightResources::new(&device, &viewer.light, settings.shadow_filter);
        let material_layout = material_layout(&device);
        let pbr_pipeline = mk_pbr_pipeline(
            &device,
            config.format,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            Some(wgpu::Face::Back),
        );
        let pbr_double_sided_pipeline = mk_pbr_pipeline(
            &device,
            config.format,
            &material_layout,
            &camera.bind_group_layout,
            &light.bind_group_layout,
            None,
        );
        let shadow_pipeline = mk_shadow_pipeline(&device, &light.shadow_bind_group_layout);

        log::info!(
            "Surface {}x{} ({surface_format:?}, density {})",
            settings.width,
            settings.height,
            settings.pixel_density
        );

        Ok(Self {
            window,
            depth_texture,
            surface,
            device,
            queue,
            config,
            settings,
            camera,
            projection,
            light,
            material_layout,
            pbr_pipeline,
            pbr_double_sided_pipeline,
            shadow_pipeline,
        })
    }

    /// Resize the render target and keep the camera aspect in step.
    ///
    /// Zero sizes (minimised windows) leave everything as it was.
    pub fn resize(&mut self, width: u32, height: u32) -> bool {
        if !surface::resize_viewport(&mut self.settings, &mut self.projection, width, height) {
            return false;
        }
        self.config.width = width;
        self.config.height = height;
        self.surface.configure(&self.device, &self.config);
        self.depth_texture = texture::DepthTarget::new(&self.device, [width, height], "depth_texture");
        self.camera.controller.set_viewport_height(height);
        log::debug!("Resized to {width}x{height}");
        true
    }

    pub fn set_pixel_density(&mut self, pixel_density: f64) {
        self.settings.pixel_density = pixel_density;
    }
}
