//! Pipeline state caching.
//!
//! - [`signature`]: stable 32-bit identities of pipeline variants
//! - [`cache`]: cache entries and opaque pipeline objects
//! - [`compiler`]: backend seam plus the asynchronous worker pool
//! - [`manager`]: per-blueprint memoization with fallback search
//! - [`cache_file`]: persisted cache blobs
//! - [`combination`]: shader combination enumeration for pre-warming
//! - [`blueprint_caches`]: the graphics + compute managers of a blueprint

pub mod blueprint_caches;
pub mod cache;
pub mod cache_file;
pub mod combination;
pub mod compiler;
pub mod manager;
pub mod signature;

pub use blueprint_caches::MaterialBlueprintCaches;
pub use cache::{CacheState, PipelineObject, PipelineStateCache};
pub use combination::{CombinationAxis, MixedRadixCounter, ShaderCombinationEnumerator};
pub use compiler::{PipelineBackend, PipelineStateCompiler};
pub use manager::{
    ComputePipelineStateCacheManager, GraphicsPipelineStateCacheManager, PipelineStateCacheManager,
};
pub use signature::{
    ComputePipelineSignature, GraphicsPipelineSignature, PipelineSignature,
    generate_shader_combination_id,
};
