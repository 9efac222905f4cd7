//! Application event loop.
//!
//! [`App`] implements winit's `ApplicationHandler`. It creates the window and
//! the GPU [`Context`] on `resumed`, builds the [`Scene`] and immediately starts
//! loading the configured model in the background. The load reports back
//! through the event loop proxy as [`ViewerEvent::Load`], so all scene
//! mutation happens on the event-loop thread.
//!
//! # Frame order
//!
//! On every `RedrawRequested`:
//! 1. advance the orbit controller and write the camera uniform
//! 2. propagate transforms and upload new meshes
//! 3. shadow pass, then the main pass
//! 4. present and request the next redraw

use std::{fmt::Debug, sync::Arc};

use instant::{Duration, Instant};
use winit::{
    application::ApplicationHandler,
    event::WindowEvent,
    event_loop::{ActiveEventLoop, EventLoop, EventLoopProxy},
    window::Window,
};

use crate::{
    config::ViewerConfig,
    context::Context,
    progress::ProgressSink,
    render,
    resources::{load, LoadEvent, LoadRequest, LoadSink},
    scene::Scene,
};

#[cfg(target_arch = "wasm32")]
use wasm_bindgen::prelude::*;

/// Everything that exists once the window and GPU are up.
pub struct AppState {
    pub(crate) ctx: Context,
    pub(crate) scene: Scene,
    progress: Box<dyn ProgressSink>,
}

impl Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("model_attached", &self.scene.model_attached())
            .finish()
    }
}

impl AppState {
    async fn new(window: Arc<Window>, config: &ViewerConfig) -> anyhow::Result<Self> {
        let ctx = Context::new(window, config).await?;
        let scene = Scene::new(config);
        #[cfg(not(target_arch = "wasm32"))]
        let progress: Box<dyn ProgressSink> = Box::new(crate::progress::LogProgress::default());
        #[cfg(target_arch = "wasm32")]
        let progress: Box<dyn ProgressSink> =
            Box::new(crate::progress::DomProgress::new(crate::progress::DomProgress::DEFAULT_ID));
        Ok(Self { ctx, scene, progress })
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.ctx.resize(width, height);
    }

    fn render(&mut self, dt: Duration) -> Result<(), wgpu::SurfaceError> {
        // invoke main render loop
        self.ctx.window.request_redraw();

        let camera = &mut self.ctx.camera;
        camera.controller.update(&mut camera.camera, dt);
        camera.uniform.update_view_proj(&camera.camera, &self.ctx.projection);
        self.ctx
            .queue
            .write_buffer(&camera.buffer, 0, bytemuck::cast_slice(&[camera.uniform]));

        if let Some(light) = self.scene.light() {
            let filter = self.ctx.settings.shadow_filter;
            self.ctx.light.update(&self.ctx.queue, light, filter);
        }
        self.scene
            .prepare(&self.ctx.device, &self.ctx.queue, &self.ctx.material_layout);
        render::render(&self.ctx, &self.scene)
    }

    fn on_load_event(&mut self, event: LoadEvent, config: &ViewerConfig) {
        match event {
            LoadEvent::Progress(progress) => self.progress.update(progress),
            LoadEvent::Succeeded(asset) => {
                self.scene.attach_model(asset, config.asset.offset);
                self.progress.hide();
                log::info!("Model attached");
            }
            LoadEvent::Failed(e) => {
                log::error!("Failed to load model: {:#}", anyhow::Error::from(e));
            }
        }
    }
}

pub enum ViewerEvent {
    /// The web build initialises the GPU asynchronously and hands the result over.
    #[cfg(target_arch = "wasm32")]
    Initialized(AppState),
    Load(LoadEvent),
}

impl Debug for ViewerEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            #[cfg(target_arch = "wasm32")]
            Self::Initialized(state) => f.debug_tuple("Initialized").field(state).finish(),
            Self::Load(event) => f.debug_tuple("Load").field(event).finish(),
        }
    }
}

/// Forwards load events into the event loop.
struct ProxySink {
    proxy: EventLoopProxy<ViewerEvent>,
}

impl LoadSink for ProxySink {
    fn emit(&mut self, event: LoadEvent) {
        if self.proxy.send_event(ViewerEvent::Load(event)).is_err() {
            log::warn!("Event loop closed before the load finished");
        }
    }
}

pub struct App {
    #[cfg(not(target_arch = "wasm32"))]
    async_runtime: tokio::runtime::Runtime,
    proxy: EventLoopProxy<ViewerEvent>,
    config: ViewerConfig,
    state: Option<AppState>,
    initializing: bool,
    last_time: Instant,
}

impl App {
    fn new(event_loop: &EventLoop<ViewerEvent>, config: ViewerConfig) -> anyhow::Result<Self> {
        let proxy = event_loop.create_proxy();
        #[cfg(not(target_arch = "wasm32"))]
        let async_runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            #[cfg(not(target_arch = "wasm32"))]
            async_runtime,
            proxy,
            config,
            state: None,
            initializing: false,
            last_time: Instant::now(),
        })
    }

    /// Issue the single model load. Results arrive as [`ViewerEvent::Load`].
    fn start_load(&self) {
        let mut request = LoadRequest::new(&self.config.asset.base_path, &self.config.asset.entry);
        let mut sink = ProxySink {
            proxy: self.proxy.clone(),
        };

        #[cfg(not(target_arch = "wasm32"))]
        {
            use crate::resources::source::FileSource;

            let handle = self.async_runtime.handle().clone();
            self.async_runtime.spawn_blocking(move || {
                handle.block_on(load(&FileSource, &mut request, &mut sink));
            });
        }

        #[cfg(target_arch = "wasm32")]
        {
            use crate::resources::source::HttpSource;

            wasm_bindgen_futures::spawn_local(async move {
                load(&HttpSource, &mut request, &mut sink).await;
            });
        }
    }

    fn window_attributes(&self) -> winit::window::WindowAttributes {
        #[allow(unused_mut)]
        let mut window_attributes = Window::default_attributes().with_title(self.config.title.clone());

        #[cfg(target_arch = "wasm32")]
        {
            use wasm_bindgen::JsCast;
            use winit::platform::web::WindowAttributesExtWebSys;

            const CANVAS_ID: &str = "canvas";

            let canvas = web_sys::window()
                .and_then(|window| window.document())
                .and_then(|document| document.get_element_by_id(CANVAS_ID))
                .and_then(|canvas| canvas.dyn_into::<web_sys::HtmlCanvasElement>().ok());
            window_attributes = match canvas {
                Some(canvas) => window_attributes.with_canvas(Some(canvas)),
                None => {
                    log::warn!("No #{CANVAS_ID} element, appending a new canvas");
                    window_attributes.with_append(true)
                }
            };
        }
        window_attributes
    }
}

impl ApplicationHandler<ViewerEvent> for App {
    fn resumed(&mut self, event_loop: &ActiveEventLoop) {
        if self.state.is_some() || self.initializing {
            return;
        }
        let window = match event_loop.create_window(self.window_attributes()) {
            Ok(window) => Arc::new(window),
            Err(e) => {
                log::error!("Cannot create the window: {e}");
                event_loop.exit();
                return;
            }
        };
        self.initializing = true;

        #[cfg(not(target_arch = "wasm32"))]
        {
            match self.async_runtime.block_on(AppState::new(window, &self.config)) {
                Ok(state) => {
                    self.state = Some(state);
                    self.initializing = false;
                    self.start_load();
                    self.last_time = Instant::now();
                }
                Err(e) => {
                    log::error!("App initialization failed: {e:#}");
                    event_loop.exit();
                }
            }
        }

        #[cfg(target_arch = "wasm32")]
        {
            let proxy = self.proxy.clone();
            let config = self.config.clone();
            wasm_bindgen_futures::spawn_local(async move {
                match AppState::new(window, &config).await {
                    Ok(state) => {
                        if proxy.send_event(ViewerEvent::Initialized(state)).is_err() {
                            log::error!("Event loop closed during initialization");
                        }
                    }
                    Err(e) => log::error!("App initialization failed: {e:#}"),
                }
            });
        }
    }

    fn user_event(&mut self, _event_loop: &ActiveEventLoop, event: ViewerEvent) {
        match event {
            #[cfg(target_arch = "wasm32")]
            ViewerEvent::Initialized(mut state) => {
                // the canvas may have been resized while the GPU was set up
                let size = state.ctx.window.inner_size();
                state.resize(size.width, size.height);
                state.ctx.window.request_redraw();
                self.state = Some(state);
                self.initializing = false;
                self.start_load();
                self.last_time = Instant::now();
            }
            ViewerEvent::Load(load_event) => match &mut self.state {
                Some(state) => state.on_load_event(load_event, &self.config),
                None => log::warn!("Dropping {load_event:?} received before initialization"),
            },
        }
    }

    fn window_event(
        &mut self,
        event_loop: &ActiveEventLoop,
        _window_id: winit::window::WindowId,
        event: WindowEvent,
    ) {
        let state = match &mut self.state {
            Some(state) => state,
            None => return,
        };

        state.ctx.camera.controller.handle_window_events(&event);

        match event {
            WindowEvent::CloseRequested => event_loop.exit(),
            WindowEvent::Resized(size) => state.resize(size.width, size.height),
            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                state.ctx.set_pixel_density(scale_factor);
            }
            WindowEvent::RedrawRequested => {
                let dt = self.last_time.elapsed();
                self.last_time = Instant::now();

                match state.render(dt) {
                    Ok(_) => {}
                    // Reconfigure the surface if it's lost or outdated
                    Err(wgpu::SurfaceError::Lost | wgpu::SurfaceError::Outdated) => {
                        let size = state.ctx.window.inner_size();
                        state.resize(size.width, size.height);
                    }
                    Err(e) => {
                        log::error!("Unable to render {}", e);
                    }
                }
            }
            _ => {}
        }
    }
}

fn init_logging(config: &ViewerConfig) {
    #[cfg(not(target_arch = "wasm32"))]
    {
        let result = env_logger::Builder::new()
            .filter_level(config.log_level)
            .filter_module("wgpu_core", log::LevelFilter::Warn)
            .filter_module("wgpu_hal", log::LevelFilter::Warn)
            .filter_module("naga", log::LevelFilter::Warn)
            .parse_default_env()
            .try_init();
        if let Err(e) = result {
            eprintln!("Warning: Could not initialize logger: {}", e);
        }
    }

    #[cfg(target_arch = "wasm32")]
    {
        let level = config.log_level.to_level().unwrap_or(log::Level::Info);
        let _ = console_log::init_with_level(level);
    }
}

/// Open the viewer and block until its window is closed.
pub fn run(config: ViewerConfig) -> anyhow::Result<()> {
    init_logging(&config);

    let event_loop: EventLoop<ViewerEvent> = EventLoop::with_user_event().build()?;
    let mut app = App::new(&event_loop, config)?;

    event_loop.run_app(&mut app)?;

    Ok(())
}

#[cfg(target_arch = "wasm32")]
#[wasm_bindgen(start)]
pub fn run_web() -> Result<(), JsValue> {
    run(ViewerConfig::default()).map_err(|e| JsValue::from_str(&format!("{e:#}")))
}
