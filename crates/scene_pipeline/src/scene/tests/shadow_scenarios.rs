//! Light and shadow bookkeeping scenarios

use std::sync::Arc;

use crate::core::config::{CullConfig, PipelineConfig, ShadowConfig};
use crate::foundation::math::{Mat4, Vec3};
use crate::render::{
    shadow_map_for, Command, DeferredRenderer, HeadlessBackend, PassKind, RenderBackend, RenderError, SceneRenderer,
    ShaderCache, ShaderFeatures, ShadowPass, TextureHandle, TextureKind,
};
use crate::scene::{
    cull, Camera, CameraView, Geometry, Light, Material, MaterialTextures, Mesh, NodeId, Object3D, SceneGraph,
    TagFilter,
};

fn origin_camera() -> CameraView {
    Camera::perspective(90.0, 1.0, 0.1, 100.0).view(&Mat4::identity()).unwrap()
}

fn floor() -> Object3D {
    let mesh = Mesh::new(
        Arc::new(Geometry::cube(1.0)),
        vec![Arc::new(Material::new("floor"))],
    );
    Object3D::mesh("floor", mesh).with_position(Vec3::new(0.0, -2.0, -10.0))
}

#[test]
fn test_only_the_first_cap_lights_get_shadow_maps() {
    let mut scene = SceneGraph::new();
    let root = scene.root();
    scene.add(root, floor()).unwrap();
    let lights: Vec<NodeId> = (0..7)
        .map(|i| {
            let x = i as f32 - 3.0;
            scene
                .add(
                    root,
                    Object3D::light(format!("spot {i}"), Light::spot(1.0, 30.0, 20.0).with_cast_shadow(true))
                        .with_position(Vec3::new(x, 5.0, -10.0)),
                )
                .unwrap()
        })
        .collect();

    let cap = 3;
    let config = ShadowConfig {
        max_shadow_casters: cap,
        ..ShadowConfig::default()
    };
    let bin = cull(&scene, &origin_camera(), TagFilter::all(), &CullConfig::default());
    assert_eq!(bin.lights.len(), lights.len());

    let mut backend = HeadlessBackend::new();
    let shaders = ShaderCache::build(&mut backend, [(ShaderFeatures::empty(), PassKind::Depth)]).unwrap();
    let maps = ShadowPass::new(config, CullConfig::default())
        .render(&mut backend, &shaders, &bin)
        .unwrap();

    assert_eq!(maps.len(), cap);
    for (i, light) in lights.iter().enumerate() {
        assert_eq!(shadow_map_for(&maps, *light).is_some(), i < cap, "light {i}");
    }
}

#[test]
fn test_point_light_gets_a_cube_map_and_directional_light_a_2d_map() {
    let mut scene = SceneGraph::new();
    let root = scene.root();
    scene.add(root, floor()).unwrap();
    let point = scene
        .add(
            root,
            Object3D::light("bulb", Light::point(1.0, 50.0).with_cast_shadow(true))
                .with_position(Vec3::new(0.0, 3.0, -8.0)),
        )
        .unwrap();
    let sun = scene
        .add(
            root,
            Object3D::light("sun", Light::directional(1.0).with_cast_shadow(true))
                .with_position(Vec3::new(0.0, 20.0, -10.0)),
        )
        .unwrap();

    let bin = cull(&scene, &origin_camera(), TagFilter::all(), &CullConfig::default());
    let mut backend = HeadlessBackend::new();
    let shaders = ShaderCache::build(&mut backend, [(ShaderFeatures::empty(), PassKind::Depth)]).unwrap();
    let maps = ShadowPass::new(ShadowConfig::default(), CullConfig::default())
        .render(&mut backend, &shaders, &bin)
        .unwrap();
    assert_eq!(maps.len(), 2);

    let point_map = shadow_map_for(&maps, point).unwrap();
    assert_eq!(point_map.kind, TextureKind::DepthCube);
    assert_eq!(backend.texture_kind(point_map.texture), Some(TextureKind::DepthCube));

    let sun_map = shadow_map_for(&maps, sun).unwrap();
    assert_eq!(sun_map.kind, TextureKind::Depth2D);
    assert_eq!(backend.texture_kind(sun_map.texture), Some(TextureKind::Depth2D));

    let layers: Vec<usize> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::RenderDepth { layers, .. } => Some(*layers),
            _ => None,
        })
        .collect();
    assert_eq!(layers, [6, 1]);
}

#[test]
fn test_environment_is_baked_once_across_frames() {
    let mut backend = HeadlessBackend::new();
    let source = backend.create_cubemap(128, 1).unwrap();

    let mut scene = SceneGraph::new();
    scene.add(scene.root(), floor()).unwrap();
    let sky_material = Material::new("sky").with_textures(MaterialTextures {
        environment: Some(source),
        ..MaterialTextures::default()
    });
    let sky = scene
        .add(
            scene.root(),
            Object3D::mesh("sky", Mesh::new(Arc::new(Geometry::cube(50.0)), vec![Arc::new(sky_material)]))
                .with_tag("no_cull"),
        )
        .unwrap();
    scene.set_skybox(Some(sky)).unwrap();

    let mut config = PipelineConfig::default();
    config.environment.specular_size = 64;
    let mut renderer = DeferredRenderer::new(&mut backend, config, [ShaderFeatures::empty()]).unwrap();

    for _ in 0..4 {
        let stats = renderer
            .render(&mut backend, &scene, &origin_camera(), &TagFilter::all())
            .unwrap();
        assert!(stats.environment);
    }
    assert_eq!(renderer.environment().bake_count(), 1);

    let uploads: Vec<(u32, u32)> = backend
        .commands()
        .iter()
        .filter_map(|c| match c {
            Command::UploadCubemapLevel { level, size, .. } => Some((*level, *size)),
            _ => None,
        })
        .collect();
    // log2(64) - 1 levels, halving each time
    assert_eq!(uploads, [(0, 64), (1, 32), (2, 16), (3, 8), (4, 4)]);
}

#[test]
fn test_unknown_material_features_fail_the_frame() {
    let mut backend = HeadlessBackend::new();
    let mut renderer = SceneRenderer::new(
        &mut backend,
        PipelineConfig::default(),
        [ShaderFeatures::empty(), ShaderFeatures::ALBEDO_MAP],
    )
    .unwrap();

    let mut scene = SceneGraph::new();
    scene.add(scene.root(), floor()).unwrap();
    assert!(renderer
        .render(&mut backend, &scene, &origin_camera(), &TagFilter::all())
        .is_ok());

    let normal_mapped = Material::new("normal mapped").with_textures(MaterialTextures {
        albedo: Some(TextureHandle(7)),
        normal: Some(TextureHandle(8)),
        ..MaterialTextures::default()
    });
    scene
        .add(
            scene.root(),
            Object3D::mesh("statue", Mesh::new(Arc::new(Geometry::cube(1.0)), vec![Arc::new(normal_mapped)]))
                .with_position(Vec3::new(0.0, 0.0, -6.0)),
        )
        .unwrap();

    let err = renderer
        .render(&mut backend, &scene, &origin_camera(), &TagFilter::all())
        .unwrap_err();
    assert_eq!(
        err,
        RenderError::MissingShaderVariant {
            features: ShaderFeatures::ALBEDO_MAP | ShaderFeatures::NORMAL_MAP,
            pass: PassKind::Forward,
        }
    );
}

#[test]
fn test_forward_and_deferred_agree_on_visibility() {
    let mut scene = SceneGraph::new();
    let root = scene.root();
    scene.add(root, floor()).unwrap();
    scene
        .add(
            root,
            Object3D::light("bulb", Light::point(1.0, 15.0).with_cast_shadow(true))
                .with_position(Vec3::new(0.0, 2.0, -8.0)),
        )
        .unwrap();

    let mut backend = HeadlessBackend::new();
    let mut forward = SceneRenderer::new(&mut backend, PipelineConfig::default(), [ShaderFeatures::empty()]).unwrap();
    let mut deferred =
        DeferredRenderer::new(&mut backend, PipelineConfig::default(), [ShaderFeatures::empty()]).unwrap();

    let a = forward.render(&mut backend, &scene, &origin_camera(), &TagFilter::all()).unwrap();
    let b = deferred.render(&mut backend, &scene, &origin_camera(), &TagFilter::all()).unwrap();
    assert_eq!(a.visible_items(), b.visible_items());
    assert_eq!(a.shadow_maps, b.shadow_maps);
    assert_eq!(b.light_passes, 1);

    forward.release(&mut backend);
    deferred.release(&mut backend);
    assert_eq!(backend.texture_count(), 0);
}
