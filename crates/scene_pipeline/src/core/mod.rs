//! Core configuration shared by the scene and render layers

pub mod config;

pub use config::{
    CullConfig, EnvironmentConfig, ForwardConfig, PipelineConfig, ShadowConfig, SortConfig,
    TransparentOrder,
};
