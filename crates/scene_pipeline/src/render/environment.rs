//! Image-based lighting cache
//!
//! Convolving a skybox into irradiance and prefiltered specular maps is by
//! far the most expensive thing the pipeline does, so the results are kept
//! across frames and only rebuilt when the scene's skybox node changes.
//!
//! The specular chain has `log2(size) - 1` mips. Each level is rendered at
//! half the size of the previous one into a scratch cubemap, read back and
//! uploaded into the matching mip of the destination.

use log::{debug, info};

use crate::core::config::EnvironmentConfig;
use crate::render::backend::{BackendResult, Convolution, EnvironmentMaps, RenderBackend, TextureHandle};
use crate::render::RenderError;
use crate::scene::object::NodeId;
use crate::scene::scene_graph::SceneGraph;

#[derive(Debug, Clone, Copy)]
struct Baked {
    skybox: NodeId,
    maps: EnvironmentMaps,
}

/// Environment convolution maps keyed by skybox node
#[derive(Debug, Clone)]
pub struct EnvironmentCache {
    config: EnvironmentConfig,
    baked: Option<Baked>,
    bake_count: usize,
}

impl EnvironmentCache {
    /// Create an empty cache
    pub fn new(config: EnvironmentConfig) -> Self {
        Self {
            config,
            baked: None,
            bake_count: 0,
        }
    }

    /// Maps of the last baked skybox
    pub fn maps(&self) -> Option<EnvironmentMaps> {
        self.baked.map(|baked| baked.maps)
    }

    /// Skybox the current maps were baked from
    pub fn skybox(&self) -> Option<NodeId> {
        self.baked.map(|baked| baked.skybox)
    }

    /// How many times maps have been baked
    pub fn bake_count(&self) -> usize {
        self.bake_count
    }

    /// Maps for the scene's current skybox, baking them if the skybox changed
    ///
    /// Returns `None` when the scene has no skybox. The skybox node must be
    /// a mesh whose first material carries an environment texture.
    pub fn update<B>(&mut self, backend: &mut B, scene: &SceneGraph) -> BackendResult<Option<EnvironmentMaps>>
    where
        B: RenderBackend + ?Sized,
    {
        let Some(skybox) = scene.skybox() else {
            return Ok(None);
        };
        if let Some(baked) = self.baked.filter(|baked| baked.skybox == skybox) {
            return Ok(Some(baked.maps));
        }

        let source = scene
            .get(skybox)
            .and_then(|node| node.as_mesh())
            .and_then(|mesh| mesh.material())
            .and_then(|material| material.textures().environment)
            .ok_or(RenderError::MissingEnvironmentTexture(skybox))?;

        self.release(backend);
        let maps = self.bake(backend, source)?;
        self.baked = Some(Baked { skybox, maps });
        self.bake_count += 1;

        info!(
            "Baked environment maps for skybox '{}' ({} specular mip(s))",
            scene.get(skybox).map_or("?", |node| node.name()),
            maps.specular_mips
        );
        Ok(Some(maps))
    }

    /// Release the baked maps
    pub fn release<B>(&mut self, backend: &mut B)
    where
        B: RenderBackend + ?Sized,
    {
        if let Some(baked) = self.baked.take() {
            backend.destroy_texture(baked.maps.irradiance);
            backend.destroy_texture(baked.maps.specular);
            backend.destroy_texture(baked.maps.brdf_lut);
        }
    }

    /// Bake all maps; on failure every texture created so far is destroyed
    fn bake<B>(&self, backend: &mut B, source: TextureHandle) -> BackendResult<EnvironmentMaps>
    where
        B: RenderBackend + ?Sized,
    {
        let mut created = Vec::with_capacity(3);
        let maps = self.bake_into(backend, source, &mut created);
        if maps.is_err() {
            for texture in created {
                backend.destroy_texture(texture);
            }
        }
        maps
    }

    fn bake_into<B>(
        &self,
        backend: &mut B,
        source: TextureHandle,
        created: &mut Vec<TextureHandle>,
    ) -> BackendResult<EnvironmentMaps>
    where
        B: RenderBackend + ?Sized,
    {
        let config = &self.config;

        let irradiance = backend.create_cubemap(config.irradiance_size, 1)?;
        created.push(irradiance);
        backend.render_convolution(Convolution::Irradiance, Some(source), irradiance, config.irradiance_size)?;

        let levels = config.specular_mip_levels();
        let specular = backend.create_cubemap(config.specular_size, levels)?;
        created.push(specular);
        let scratch = backend.create_cubemap(config.specular_size, 1)?;
        let chain = self.bake_specular_chain(backend, source, scratch, specular, levels);
        backend.destroy_texture(scratch);
        chain?;

        let brdf_lut = backend.create_texture_2d(config.brdf_lut_size)?;
        created.push(brdf_lut);
        backend.render_convolution(Convolution::BrdfLut, None, brdf_lut, config.brdf_lut_size)?;

        Ok(EnvironmentMaps {
            irradiance,
            specular,
            specular_mips: levels,
            brdf_lut,
        })
    }

    fn bake_specular_chain<B>(
        &self,
        backend: &mut B,
        source: TextureHandle,
        scratch: TextureHandle,
        specular: TextureHandle,
        levels: u32,
    ) -> BackendResult<()>
    where
        B: RenderBackend + ?Sized,
    {
        let mut size = self.config.specular_size;
        for level in 0..levels {
            let roughness = if levels > 1 {
                level as f32 / (levels - 1) as f32
            } else {
                0.0
            };
            backend.render_convolution(Convolution::Prefilter { roughness }, Some(source), scratch, size)?;
            let texels = backend.read_cubemap(scratch, size)?;
            backend.upload_cubemap_level(specular, level, size, &texels)?;
            debug!("Specular mip {} baked at {}x{} (roughness {:.2})", level, size, size, roughness);
            size = (size / 2).max(1);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render::backend::TextureKind;
    use crate::render::headless::{Command, HeadlessBackend};
    use crate::scene::mesh::{Geometry, Material, MaterialTextures, Mesh};
    use crate::scene::object::Object3D;
    use std::sync::Arc;

    fn sky(backend: &mut HeadlessBackend) -> Object3D {
        let texture = backend.create_cubemap(256, 1).unwrap();
        let material = Material::new("sky").with_textures(MaterialTextures {
            environment: Some(texture),
            ..MaterialTextures::default()
        });
        Object3D::mesh("sky", Mesh::new(Arc::new(Geometry::cube(50.0)), vec![Arc::new(material)]))
    }

    fn small_config() -> EnvironmentConfig {
        EnvironmentConfig {
            irradiance_size: 8,
            specular_size: 32,
            brdf_lut_size: 16,
        }
    }

    #[test]
    fn test_no_skybox_means_no_maps() {
        let mut backend = HeadlessBackend::new();
        let mut cache = EnvironmentCache::new(small_config());
        assert_eq!(cache.update(&mut backend, &SceneGraph::new()).unwrap(), None);
        assert_eq!(cache.bake_count(), 0);
    }

    #[test]
    fn test_mip_chain_halves_each_level() {
        let mut backend = HeadlessBackend::new();
        let mut scene = SceneGraph::new();
        let node = sky(&mut backend);
        let id = scene.add(scene.root(), node).unwrap();
        scene.set_skybox(Some(id)).unwrap();

        let mut cache = EnvironmentCache::new(small_config());
        let maps = cache.update(&mut backend, &scene).unwrap().unwrap();
        assert_eq!(maps.specular_mips, 4);
        assert_eq!(backend.texture_kind(maps.brdf_lut), Some(TextureKind::Texture2D));

        let uploads: Vec<_> = backend
            .commands()
            .iter()
            .filter_map(|c| match c {
                Command::UploadCubemapLevel { level, size, .. } => Some((*level, *size)),
                _ => None,
            })
            .collect();
        assert_eq!(uploads, [(0, 32), (1, 16), (2, 8), (3, 4)]);

        let readbacks = backend
            .commands()
            .iter()
            .filter(|c| matches!(c, Command::ReadCubemap { .. }))
            .count();
        assert_eq!(readbacks, 4);
    }

    #[test]
    fn test_bakes_once_per_skybox() {
        let mut backend = HeadlessBackend::new();
        let mut scene = SceneGraph::new();
        let first_node = sky(&mut backend);
        let first = scene.add(scene.root(), first_node).unwrap();
        scene.set_skybox(Some(first)).unwrap();

        let mut cache = EnvironmentCache::new(small_config());
        let maps = cache.update(&mut backend, &scene).unwrap();
        for _ in 0..3 {
            assert_eq!(cache.update(&mut backend, &scene).unwrap(), maps);
        }
        assert_eq!(cache.bake_count(), 1);

        let second_node = sky(&mut backend);
        let second = scene.add(scene.root(), second_node).unwrap();
        scene.set_skybox(Some(second)).unwrap();
        cache.update(&mut backend, &scene).unwrap();
        assert_eq!(cache.bake_count(), 2);
        assert_eq!(cache.skybox(), Some(second));

        // two source cubemaps plus irradiance, specular and LUT of the latest bake
        assert_eq!(backend.texture_count(), 5);
    }

    #[test]
    fn test_skybox_without_environment_texture() {
        let mut backend = HeadlessBackend::new();
        let mut scene = SceneGraph::new();
        let plain = scene.add(scene.root(), Object3D::new("not a sky")).unwrap();
        scene.set_skybox(Some(plain)).unwrap();

        let mut cache = EnvironmentCache::new(small_config());
        let err = cache.update(&mut backend, &scene).unwrap_err();
        assert!(matches!(err, RenderError::MissingEnvironmentTexture(id) if id == plain));
    }

    #[test]
    fn test_failed_bake_leaves_no_textures_behind() {
        let mut backend = HeadlessBackend::new();
        let mut scene = SceneGraph::new();
        let node = sky(&mut backend);
        let id = scene.add(scene.root(), node).unwrap();
        scene.set_skybox(Some(id)).unwrap();

        // the LUT is created last, after irradiance and specular
        let mut cache = EnvironmentCache::new(EnvironmentConfig {
            brdf_lut_size: 0,
            ..small_config()
        });
        assert!(cache.update(&mut backend, &scene).is_err());
        assert_eq!(cache.maps(), None);
        assert_eq!(cache.bake_count(), 0);
        // only the source cubemap is left
        assert_eq!(backend.texture_count(), 1);
    }
}
