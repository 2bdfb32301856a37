//! # Pipeline Configuration
//!
//! Consolidates the tunables of the culling, sorting, shadow and
//! environment-lighting stages into one serializable structure.
//!
//! ## Configuration Categories
//!
//! - **Cull Config**: reserved tags and light culling policy
//! - **Sort Config**: draw ordering of transparent items
//! - **Shadow Config**: shadow-caster cap and depth target sizes
//! - **Environment Config**: image-based lighting bake sizes
//! - **Forward Config**: per-pass light budget of the forward renderer

use serde::{Deserialize, Serialize};

pub use crate::config::{Config, ConfigError};

/// Tag that exempts a mesh from frustum testing
pub const DEFAULT_NO_CULL_TAG: &str = "no_cull";

/// # Cull Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CullConfig {
    /// Meshes carrying this tag are always put into the render bin
    pub no_cull_tag: String,
    /// Test directional lights against the frustum with their finite radius
    ///
    /// Directional lights have no spatial extent, so a `true` value can drop
    /// a light whose sphere happens to lie outside the view. Turning this off
    /// always keeps directional lights.
    pub cull_directional_lights: bool,
}

impl Default for CullConfig {
    fn default() -> Self {
        Self {
            no_cull_tag: DEFAULT_NO_CULL_TAG.to_string(),
            cull_directional_lights: true,
        }
    }
}

/// Draw order used for transparent items
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum TransparentOrder {
    /// Group by material first, then ascending eye-space Z
    ///
    /// Keeps same-material draws adjacent for batching. Overlapping
    /// transparent meshes of different materials can blend in the wrong order.
    #[default]
    MaterialThenDepth,
    /// Strict back-to-front by eye-space Z, material only breaks ties
    BackToFront,
}

/// # Sort Configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SortConfig {
    /// Ordering of the transparent list
    pub transparent_order: TransparentOrder,
}

/// # Shadow Configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShadowConfig {
    /// Enable/disable shadow passes
    pub enabled: bool,
    /// Number of pre-allocated shadow framebuffers (lights past it get none)
    pub max_shadow_casters: usize,
    /// Resolution of 2D shadow maps (spot and directional lights)
    pub map_resolution: u32,
    /// Face resolution of cube shadow maps (point lights)
    pub cube_resolution: u32,
    /// Near plane of every shadow camera
    pub near_plane: f32,
}

impl Default for ShadowConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_shadow_casters: 4,
            map_resolution: 2048,
            cube_resolution: 1024,
            near_plane: 0.1,
        }
    }
}

impl ShadowConfig {
    /// Disable shadows entirely
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Default::default()
        }
    }
}

/// # Environment Configuration
///
/// Sizes of the textures baked from a skybox cubemap.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Face size of the diffuse irradiance cubemap
    pub irradiance_size: u32,
    /// Face size of mip 0 of the prefiltered specular cubemap
    pub specular_size: u32,
    /// Size of the BRDF integration lookup texture
    pub brdf_lut_size: u32,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            irradiance_size: 32,
            specular_size: 512,
            brdf_lut_size: 512,
        }
    }
}

impl EnvironmentConfig {
    /// Number of specular mip levels: `log2(specular_size) - 1`
    pub fn specular_mip_levels(&self) -> u32 {
        self.specular_size.max(1).ilog2().saturating_sub(1).max(1)
    }
}

/// # Forward Renderer Configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ForwardConfig {
    /// Lights uploaded per forward pass; extra lights are dropped
    pub max_lights: usize,
}

impl Default for ForwardConfig {
    fn default() -> Self {
        Self { max_lights: 8 }
    }
}

/// # Pipeline Configuration
///
/// Root configuration for the cull/sort/render pipeline.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Culling policy
    pub culling: CullConfig,
    /// Sorting policy
    pub sorting: SortConfig,
    /// Shadow mapping
    pub shadows: ShadowConfig,
    /// Image-based lighting
    pub environment: EnvironmentConfig,
    /// Forward renderer
    pub forward: ForwardConfig,
}

fn require_power_of_two(name: &str, value: u32) -> Result<(), ConfigError> {
    if value.is_power_of_two() {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!("{name} must be a non-zero power of two, got {value}")))
    }
}

impl Config for PipelineConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        require_power_of_two("shadows.map_resolution", self.shadows.map_resolution)?;
        require_power_of_two("shadows.cube_resolution", self.shadows.cube_resolution)?;
        require_power_of_two("environment.irradiance_size", self.environment.irradiance_size)?;
        require_power_of_two("environment.specular_size", self.environment.specular_size)?;
        require_power_of_two("environment.brdf_lut_size", self.environment.brdf_lut_size)?;

        if self.environment.specular_size < 4 {
            return Err(ConfigError::Invalid(format!(
                "environment.specular_size must be at least 4, got {}",
                self.environment.specular_size
            )));
        }
        if !(self.shadows.near_plane > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "shadows.near_plane must be positive, got {}",
                self.shadows.near_plane
            )));
        }
        if self.culling.no_cull_tag.is_empty() {
            return Err(ConfigError::Invalid("culling.no_cull_tag must not be empty".into()));
        }
        Ok(())
    }
}
