//! Material data consumed by the caches.
//!
//! - [`property`]: single properties and their GPU byte widths
//! - [`properties`]: sorted per-material property tables
//! - [`shader_properties`]: sorted `(id, i32)` shader property sets
//! - [`global`]: renderer-wide global property table
//! - [`blueprint`]: loaded material / shader blueprints and layouts

pub mod blueprint;
pub mod global;
pub mod properties;
pub mod property;
pub mod shader_properties;

pub use blueprint::{
    BlendFactor, BlendOperation, BlendState, CompareFunction, CullMode, GraphicsPipelineState,
    GraphicsShaderStage, MANDATORY_SHADER_PROPERTY, MaterialBlueprint, PipelineShaders,
    PrimitiveTopology, ShaderBlueprint, UniformBufferLayout, UniformBufferUsage,
};
pub use global::{GlobalMaterialProperties, SharedGlobalMaterialProperties};
pub use properties::{MaterialProperties, SharedMaterialProperties};
pub use property::{MaterialProperty, PropertyId, PropertyUsage, PropertyValue, ValueType};
pub use shader_properties::{ShaderProperties, ShaderProperty};
