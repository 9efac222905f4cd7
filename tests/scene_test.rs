use cgmath::{InnerSpace, Quaternion, Rad, Rotation3, SquareMatrix, Vector3};
use futures::executor::block_on;
use model_viewer::{
    data_structures::{
        geometry,
        instance::Instance,
        model::srgb_to_linear,
        scene_graph::{ContainerNode, Renderable, SceneNode},
    },
    resources::{gltf::LoadedAsset, load, LoadEvent, LoadRequest},
    scene::{Scene, GROUND_NAME, LIGHT_NAME},
    ViewerConfig,
};

use crate::common::test_utils::{MemorySource, RecordingSink, BASE_PATH, ENTRY};

mod common;

fn loaded_triangle_model() -> LoadedAsset {
    let source = MemorySource::with_triangle_model();
    let mut request = LoadRequest::new(BASE_PATH, ENTRY);
    let mut sink = RecordingSink::default();
    block_on(load(&source, &mut request, &mut sink));
    match sink.events.pop() {
        Some(LoadEvent::Succeeded(asset)) => asset,
        other => panic!("load failed: {other:?}"),
    }
}

fn child<'a>(scene: &'a Scene, name: &str) -> &'a dyn SceneNode {
    scene
        .root()
        .get_children()
        .iter()
        .find(|node| node.name() == name)
        .map(|node| &**node)
        .unwrap_or_else(|| panic!("no {name} node"))
}

#[test]
fn ground_receives_but_does_not_cast() {
    let scene = Scene::new(&ViewerConfig::default());
    let ground = child(&scene, GROUND_NAME)
        .as_renderable()
        .expect("ground is a mesh");

    assert!(!ground.cast_shadow());
    assert!(ground.receive_shadow());
    assert!(ground.material().double_sided);

    let expected = srgb_to_linear(0x55 as f32 / 255.0);
    for channel in &ground.material().base_color_factor[..3] {
        assert!((channel - expected).abs() < 1e-6);
    }
}

#[test]
fn ground_plane_is_horizontal_and_faces_up() {
    let scene = Scene::new(&ViewerConfig::default());
    let geometry = child(&scene, GROUND_NAME).as_renderable().unwrap().geometry();

    assert_eq!(geometry.vertices.len(), 33 * 33);
    assert_eq!(geometry.triangle_count(), 32 * 32 * 2);
    for vertex in &geometry.vertices {
        assert!(vertex.position[1].abs() < 1e-5);
        assert!((vertex.normal[1] - 1.0).abs() < 1e-5);
        assert!(vertex.position[0].abs() <= 10.0 + 1e-4);
        assert!(vertex.position[2].abs() <= 10.0 + 1e-4);
    }
    for tri in geometry.indices.chunks_exact(3) {
        let p = |i: u32| Vector3::from(geometry.vertices[i as usize].position);
        let face = (p(tri[1]) - p(tri[0])).cross(p(tri[2]) - p(tri[0]));
        assert!(face.y > 0.0, "triangle {tri:?} faces down");
    }
}

#[test]
fn light_is_in_place_before_loading() {
    let config = ViewerConfig::default();
    let scene = Scene::new(&config);

    assert!(!scene.model_attached());
    assert_eq!(scene.root().get_children().len(), 2);
    let light = scene.light().expect("scene has a light");
    assert_eq!(light.position, Vector3::new(0.0, 25.0, 0.0));
    assert_eq!(light, &config.light);
    assert!(child(&scene, LIGHT_NAME).as_renderable().is_none());
}

#[test]
fn attached_model_casts_and_receives_everywhere() {
    let config = ViewerConfig::default();
    let mut scene = Scene::new(&config);
    scene.attach_model(loaded_triangle_model(), config.asset.offset);

    assert!(scene.model_attached());
    assert_eq!(scene.root().get_children().len(), 3);

    let model = child(&scene, "Scene");
    assert_eq!(model.get_local_transform().position, Vector3::new(0.0, 1.05, -1.0));

    let mut meshes = 0;
    model.for_each_renderable(&mut |renderable| {
        meshes += 1;
        assert!(renderable.cast_shadow());
        assert!(renderable.receive_shadow());
    });
    assert_eq!(meshes, 3);

    // the ground keeps its own policy
    let ground = child(&scene, GROUND_NAME).as_renderable().unwrap();
    assert!(!ground.cast_shadow());
}

#[test]
fn multi_primitive_node_becomes_a_container() {
    let node = loaded_triangle_model().into_scene_node();
    let pair = node
        .get_children()
        .iter()
        .find(|child| child.name() == "pair")
        .unwrap();

    assert!(pair.as_renderable().is_none());
    let names: Vec<&str> = pair.get_children().iter().map(|c| c.name()).collect();
    assert_eq!(names, ["pair#0", "pair#1"]);
    assert_eq!(pair.get_children()[1].as_renderable().unwrap().material().name, "default");
}

#[test]
fn failed_load_leaves_scene_untouched() {
    let mut scene = Scene::new(&ViewerConfig::default());
    let mut request = LoadRequest::new(BASE_PATH, ENTRY);
    let mut sink = RecordingSink::default();
    block_on(load(&MemorySource::new(), &mut request, &mut sink));

    for event in sink.events {
        if let LoadEvent::Succeeded(asset) = event {
            scene.attach_model(asset, Vector3::new(0.0, 0.0, 0.0));
        }
    }
    assert!(!scene.model_attached());
    assert_eq!(scene.root().get_children().len(), 2);
}

#[test]
fn world_transforms_compose_parent_first() {
    let mut parent = ContainerNode::new("parent");
    parent.set_local_transform(Instance {
        position: Vector3::new(1.0, 0.0, 0.0),
        rotation: Quaternion::from_angle_y(Rad(std::f32::consts::FRAC_PI_2)),
        scale: Vector3::new(2.0, 2.0, 2.0),
    });
    let mut child = ContainerNode::new("child");
    child.set_local_transform(Instance::from(Vector3::new(0.0, 0.0, 1.0)));
    parent.add_child(Box::new(child));

    parent.update_world_transforms(&Instance::new());

    let world = parent.get_children()[0].get_world_transform();
    // (0,0,1) scaled by 2 and turned a quarter around +Y lands on +X
    let expected = Vector3::new(3.0, 0.0, 0.0);
    assert!((world.position - expected).magnitude() < 1e-5, "{:?}", world.position);
    assert_eq!(world.scale, Vector3::new(2.0, 2.0, 2.0));
}

#[test]
fn plane_is_centred_and_subdivided() {
    let plane = geometry::plane(2.0, 4.0, 2, 1);

    assert_eq!(plane.vertices.len(), 3 * 2);
    assert_eq!(plane.triangle_count(), 4);
    let xs: Vec<f32> = plane.vertices.iter().map(|v| v.position[0]).collect();
    assert_eq!(xs, [-1.0, 0.0, 1.0, -1.0, 0.0, 1.0]);
    assert!(plane.vertices.iter().all(|v| v.normal == [0.0, 0.0, 1.0]));
}

#[test]
fn normals_stay_perpendicular_under_non_uniform_scale() {
    let transform = Instance {
        position: Vector3::new(0.0, 0.0, 0.0),
        rotation: Quaternion::from_angle_y(Rad(0.3)),
        scale: Vector3::new(2.0, 1.0, 1.0),
    };
    let linear = cgmath::Matrix3::from(transform.rotation)
        * cgmath::Matrix3::from_diagonal(transform.scale);

    // a 45 degree slope in the xy plane, stretched along x
    let tangent = linear * Vector3::new(1.0, 1.0, 0.0);
    let normal = transform.normal_matrix() * Vector3::new(1.0, -1.0, 0.0);
    assert!(normal.dot(tangent).abs() < 1e-5, "{}", normal.dot(tangent));

    // rotation alone would tilt the normal off the surface
    let rotated = cgmath::Matrix3::from(transform.rotation) * Vector3::new(1.0, -1.0, 0.0);
    assert!(rotated.dot(tangent).abs() > 0.5);
}

#[test]
fn collapsed_scale_keeps_a_usable_normal_matrix() {
    let transform = Instance {
        scale: Vector3::new(1.0, 0.0, 1.0),
        ..Instance::new()
    };
    let normal = transform.normal_matrix() * Vector3::unit_y();
    assert!((normal.magnitude() - 1.0).abs() < 1e-6);
}
