use cgmath::Deg;
use model_viewer::{
    camera::Projection,
    data_structures::texture::attachment_extent,
    surface::{resize_viewport, ColorSpace, ShadowFilter, SurfaceSettings},
    ViewerConfig,
};

fn viewport(width: u32, height: u32) -> (SurfaceSettings, Projection) {
    let camera = ViewerConfig::default().camera;
    (
        SurfaceSettings::initialize(width, height, 1.0),
        Projection::new(width, height, camera.fovy, camera.znear, camera.zfar),
    )
}

#[test]
fn resize_keeps_aspect_in_sync() {
    let (mut settings, mut projection) = viewport(800, 600);

    for (width, height) in [(1920, 1080), (300, 900), (1, 1), (4096, 17)] {
        assert!(resize_viewport(&mut settings, &mut projection, width, height));
        assert_eq!((settings.width, settings.height), (width, height));
        let expected = width as f32 / height as f32;
        assert!((projection.aspect() - expected).abs() < 1e-6);
        assert!((settings.aspect() - projection.aspect()).abs() < 1e-6);
    }
}

#[test]
fn zero_sized_viewport_is_ignored() {
    let (mut settings, mut projection) = viewport(800, 600);

    assert!(!resize_viewport(&mut settings, &mut projection, 0, 600));
    assert!(!resize_viewport(&mut settings, &mut projection, 800, 0));
    assert!(!resize_viewport(&mut settings, &mut projection, 0, 0));

    assert_eq!((settings.width, settings.height), (800, 600));
    assert!((projection.aspect() - 800.0 / 600.0).abs() < 1e-6);
}

#[test]
fn surface_defaults() {
    let settings = SurfaceSettings::initialize(640, 480, 2.0);

    assert_eq!(settings.pixel_density, 2.0);
    assert_eq!(settings.clear_colour, wgpu::Color::BLACK);
    assert_eq!(settings.color_space, ColorSpace::Srgb);
    assert_eq!(settings.shadow_filter, ShadowFilter::PcfSoft);
}

#[test]
fn format_choice_follows_colour_space() {
    let formats = [
        wgpu::TextureFormat::Bgra8Unorm,
        wgpu::TextureFormat::Bgra8UnormSrgb,
    ];
    let mut settings = SurfaceSettings::initialize(640, 480, 1.0);
    assert_eq!(settings.choose_format(&formats), Some(wgpu::TextureFormat::Bgra8UnormSrgb));

    settings.color_space = ColorSpace::Linear;
    assert_eq!(settings.choose_format(&formats), Some(wgpu::TextureFormat::Bgra8Unorm));

    // falls back to whatever the surface offers
    assert_eq!(
        settings.choose_format(&[wgpu::TextureFormat::Rgba8UnormSrgb]),
        Some(wgpu::TextureFormat::Rgba8UnormSrgb)
    );
    assert_eq!(settings.choose_format(&[]), None);
}

#[test]
fn shadow_filter_kernels() {
    assert_eq!(ShadowFilter::Off.kernel_width(), 0.0);
    assert_eq!(ShadowFilter::Pcf.kernel_width(), 1.0);
    assert_eq!(ShadowFilter::PcfSoft.kernel_width(), 3.0);
}

#[test]
fn viewer_defaults_match_the_scene_layout() {
    let config = ViewerConfig::default();

    assert_eq!(config.camera.fovy, Deg(45.0));
    assert_eq!(config.camera.znear, 1.0);
    assert_eq!(config.camera.zfar, 1000.0);
    assert_eq!(config.ground.size, 20.0);
    assert_eq!(config.ground.colour, 0x555555);
    assert_eq!(config.orbit.min_distance, 5.0);
    assert_eq!(config.orbit.max_distance, 20.0);
    assert!(!config.orbit.enable_pan);
    assert!(config.orbit.enable_damping);
    assert_eq!(config.asset.entry, "scene.gltf");
}

#[test]
fn depth_attachment_never_has_a_zero_extent() {
    let extent = attachment_extent([1280, 720]);
    assert_eq!((extent.width, extent.height, extent.depth_or_array_layers), (1280, 720, 1));

    let extent = attachment_extent([0, 0]);
    assert_eq!((extent.width, extent.height), (1, 1));
}
