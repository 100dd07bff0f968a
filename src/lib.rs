#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::too_many_arguments)]

//! Material uniform buffer pooling and pipeline state caching.
//!
//! Two halves:
//!
//! - [`buffer`]: packs per-material uniform data into pooled GPU buffers
//!   ([`BufferSlotManager`]) using constant-buffer packing rules.
//! - [`pipeline`]: memoizes graphics / compute pipeline objects keyed by a
//!   32-bit signature ([`PipelineStateCacheManager`]), with asynchronous
//!   compilation that borrows a fallback pipeline while the exact one builds.
//!
//! The graphics API is reached only through [`rhi::RenderDevice`]; the
//! shader compiler only through [`pipeline::PipelineBackend`].

pub mod buffer;
pub mod errors;
pub mod hash;
pub mod material;
pub mod pipeline;
pub mod rhi;
pub mod settings;

pub use buffer::{BufferSlotManager, MaterialBufferSlot, SlotKey, SlotPool};
pub use errors::{Error, Result};
pub use material::{
    GlobalMaterialProperties, MaterialBlueprint, MaterialProperties, MaterialProperty,
    PropertyUsage, PropertyValue, ShaderBlueprint, ShaderProperties, UniformBufferLayout,
    ValueType,
};
pub use pipeline::{
    ComputePipelineSignature, ComputePipelineStateCacheManager, GraphicsPipelineSignature,
    GraphicsPipelineStateCacheManager, MaterialBlueprintCaches, PipelineBackend, PipelineObject,
    PipelineStateCache, PipelineStateCacheManager, PipelineStateCompiler,
    ShaderCombinationEnumerator,
};
pub use rhi::{CommandBuffer, PipelineKind, RenderDevice};
pub use settings::CacheSettings;
