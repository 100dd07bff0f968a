//! Cache Settings
//!
//! Runtime configuration shared by the buffer slot managers and the pipeline
//! state cache managers.
//!
//! # Quick Start
//!
//! ```rust
//! use myth_material_cache::CacheSettings;
//!
//! // Default: asynchronous compilation with two worker threads
//! let settings = CacheSettings::default();
//!
//! // Tools that pre-bake caches usually want blocking compiles
//! let settings = CacheSettings {
//!     asynchronous_compilation: false,
//!     ..Default::default()
//! };
//! # let _ = settings;
//! ```

/// Upper bound for a single slot pool buffer, in bytes.
///
/// Matches the smallest constant buffer size every supported backend can
/// bind in one go.
pub const DEFAULT_MAX_SLOT_POOL_BYTES: u32 = 64 * 1024;

/// Configuration for material buffer pooling and pipeline state caching.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheSettings {
    /// Compile pipeline state on background workers and hand out a fallback
    /// pipeline until the exact one is ready.
    ///
    /// When `false`, every cache miss compiles on the calling thread.
    pub asynchronous_compilation: bool,

    /// Number of background compiler threads. Clamped to at least one.
    pub compiler_threads: usize,

    /// Upper bound for one slot pool buffer. The effective size is
    /// `min(device maximum uniform buffer size, max_slot_pool_bytes)`.
    pub max_slot_pool_bytes: u32,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            asynchronous_compilation: true,
            compiler_threads: 2,
            max_slot_pool_bytes: DEFAULT_MAX_SLOT_POOL_BYTES,
        }
    }
}

impl CacheSettings {
    /// Size of one slot pool buffer for a device reporting
    /// `device_max_uniform_buffer_size`.
    #[inline]
    #[must_use]
    pub fn slot_pool_bytes(&self, device_max_uniform_buffer_size: u32) -> u32 {
        device_max_uniform_buffer_size.min(self.max_slot_pool_bytes)
    }

    /// Worker count actually spawned by the compiler.
    #[inline]
    #[must_use]
    pub fn effective_compiler_threads(&self) -> usize {
        self.compiler_threads.max(1)
    }
}
