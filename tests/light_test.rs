use cgmath::{Vector3, Vector4};
use model_viewer::{
    light::SpotLight,
    pipelines::light::LightUniform,
    progress::{LogProgress, ProgressSink},
    resources::Progress,
    surface::ShadowFilter,
};

#[test]
fn default_light_points_straight_down() {
    let light = SpotLight::default();

    assert_eq!(light.position, Vector3::new(0.0, 25.0, 0.0));
    assert!((light.direction() - Vector3::new(0.0, -1.0, 0.0)).x.abs() < 1e-6);
    assert!((light.direction().y + 1.0).abs() < 1e-6);
    assert!(light.color.iter().all(|c| *c == 1.0));
}

#[test]
fn coincident_target_falls_back_to_down() {
    let light = SpotLight {
        target: Vector3::new(0.0, 25.0, 0.0),
        ..Default::default()
    };
    assert_eq!(light.direction(), Vector3::new(0.0, -1.0, 0.0));
}

#[test]
fn cone_fades_to_zero_at_its_edge() {
    let light = SpotLight::default();

    assert!((light.cone_attenuation(1.0) - 1.0).abs() < 1e-6);
    assert_eq!(light.cone_attenuation((light.angle.0 + 0.05).cos()), 0.0);
    let inside = light.cone_attenuation((light.angle.0 * 0.5).cos());
    assert!(inside > 0.0 && inside < 1.0, "{inside}");
}

#[test]
fn hard_cone_without_penumbra() {
    let light = SpotLight {
        penumbra: 0.0,
        ..Default::default()
    };
    assert_eq!(light.cone_attenuation((light.angle.0 * 0.99).cos()), 1.0);
    assert_eq!(light.cone_attenuation((light.angle.0 * 1.01).cos()), 0.0);
}

#[test]
fn distance_falloff_reaches_zero_at_range() {
    let light = SpotLight::default();

    assert_eq!(light.distance_attenuation(light.range), 0.0);
    assert_eq!(light.distance_attenuation(light.range * 2.0), 0.0);
    let near = light.distance_attenuation(10.0);
    let far = light.distance_attenuation(25.0);
    assert!(near > far && far > 0.0);
    assert!((near - 0.01).abs() < 1e-4);
}

#[test]
fn shadow_camera_centres_the_target() {
    let light = SpotLight::default();
    let clip = light.shadow_view_proj() * Vector4::new(0.0, 0.0, 0.0, 1.0);
    let ndc = clip.truncate() / clip.w;

    assert!(clip.w > 0.0);
    assert!(ndc.x.abs() < 1e-5 && ndc.y.abs() < 1e-5);
    assert!(ndc.z > 0.0 && ndc.z < 1.0, "depth {}", ndc.z);
}

#[test]
fn light_uniform_layout_and_filter() {
    assert_eq!(std::mem::size_of::<LightUniform>(), 128);

    let light = SpotLight::default();
    let soft = LightUniform::new(&light, ShadowFilter::PcfSoft);
    assert_eq!(soft, LightUniform::new(&light, ShadowFilter::PcfSoft));
    assert_ne!(soft, LightUniform::new(&light, ShadowFilter::Off));
}

#[test]
fn log_progress_hides_once_done() {
    let mut progress = LogProgress::default();
    progress.update(Progress::new(5, Some(10)));
    progress.update(Progress::new(7, None));
    assert!(!progress.is_hidden());

    progress.hide();
    assert!(progress.is_hidden());
}
