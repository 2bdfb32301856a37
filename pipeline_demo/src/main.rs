//! Pipeline demo application
//!
//! Scatters meshes and lights around a camera, then renders a few frames
//! with the forward and deferred renderers on the headless backend and logs
//! what each frame did. Pass a `.toml` or `.ron` file to override the
//! pipeline configuration.

use std::sync::Arc;

use log::{info, warn};
use rand::Rng;
use scene_pipeline::prelude::*;
use scene_pipeline::render::TextureHandle;
use scene_pipeline::scene::MaterialTextures;

const FRAMES: usize = 3;
const MESH_COUNT: usize = 40;
const LIGHT_COUNT: usize = 10;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("scene: {0}")]
    Scene(#[from] SceneError),
    #[error("render: {0}")]
    Render(#[from] RenderError),
}

fn load_config() -> Result<PipelineConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            info!("Loading pipeline configuration from {}", path);
            Ok(PipelineConfig::load_from_file(path)?)
        }
        None => Ok(PipelineConfig::default()),
    }
}

fn build_scene(environment: TextureHandle) -> Result<(SceneGraph, NodeId), DemoError> {
    let mut rng = rand::thread_rng();
    let mut scene = SceneGraph::new();
    let root = scene.root();

    let camera = scene.add(
        root,
        Object3D::camera("main camera", Camera::perspective(60.0, 16.0 / 9.0, 0.1, 200.0))
            .with_position(Vec3::new(0.0, 2.0, 10.0)),
    )?;

    let geometry = Arc::new(Geometry::cube(0.5));
    let materials = [
        Arc::new(Material::new("stone")),
        Arc::new(Material::new("metal").with_diffuse([0.6, 0.6, 0.7, 1.0])),
        Arc::new(Material::new("glass").with_opacity(0.4)),
    ];

    let props = scene.add(root, Object3D::new("props"))?;
    for i in 0..MESH_COUNT {
        let material = materials[rng.gen_range(0..materials.len())].clone();
        let position = Vec3::new(
            rng.gen_range(-20.0..20.0),
            rng.gen_range(-2.0..4.0),
            rng.gen_range(-40.0..15.0),
        );
        scene.add(
            props,
            Object3D::mesh(format!("prop {i}"), Mesh::new(geometry.clone(), vec![material])).with_position(position),
        )?;
    }

    scene.add(
        root,
        Object3D::light("sun", Light::directional(1.0).with_cast_shadow(true))
            .with_position(Vec3::new(0.0, 30.0, -10.0)),
    )?;
    for i in 0..LIGHT_COUNT {
        let light = if rng.gen_bool(0.5) {
            Light::point(rng.gen_range(0.5..2.0), rng.gen_range(5.0..15.0))
        } else {
            Light::spot(rng.gen_range(0.5..2.0), rng.gen_range(8.0..20.0), 35.0)
        };
        let position = Vec3::new(rng.gen_range(-15.0..15.0), 6.0, rng.gen_range(-30.0..5.0));
        scene.add(
            root,
            Object3D::light(format!("lamp {i}"), light.with_cast_shadow(rng.gen_bool(0.5))).with_position(position),
        )?;
    }

    let sky_material = Material::new("sky").with_textures(MaterialTextures {
        environment: Some(environment),
        ..MaterialTextures::default()
    });
    let sky = scene.add(
        root,
        Object3D::mesh("skybox", Mesh::new(Arc::new(Geometry::cube(100.0)), vec![Arc::new(sky_material)]))
            .with_tag("no_cull"),
    )?;
    scene.set_skybox(Some(sky))?;

    info!("Scene built with {} nodes", scene.len());
    Ok((scene, camera))
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    let mut backend = HeadlessBackend::new();
    let environment = backend.create_cubemap(256, 1)?;
    let (mut scene, camera) = build_scene(environment)?;

    let variants = [ShaderFeatures::empty()];
    let mut forward = SceneRenderer::new(&mut backend, config.clone(), variants)?;
    let mut deferred = DeferredRenderer::new(&mut backend, config, variants)?;
    let filter = TagFilter::all();

    for frame in 0..FRAMES {
        if let Some(node) = scene.get_mut(camera) {
            node.set_position(Vec3::new(frame as f32 * 2.0, 2.0, 10.0));
        }
        let view = scene.camera_view(camera)?;

        let stats = forward.render(&mut backend, &scene, &view, &filter)?;
        info!("Forward frame {}: {:?}", frame, stats);
        let stats = deferred.render(&mut backend, &scene, &view, &filter)?;
        info!("Deferred frame {}: {:?}", frame, stats);
    }

    info!(
        "{} commands recorded, {} environment bake(s)",
        backend.commands().len(),
        deferred.environment().bake_count()
    );

    forward.release(&mut backend);
    deferred.release(&mut backend);
    backend.destroy_texture(environment);
    if backend.texture_count() != 0 {
        warn!("{} texture(s) still alive after release", backend.texture_count());
    }
    Ok(())
}

fn main() {
    scene_pipeline::foundation::logging::init();
    info!("Starting pipeline demo...");

    if let Err(e) = run() {
        log::error!("Pipeline demo failed: {}", e);
        std::process::exit(1);
    }
}
