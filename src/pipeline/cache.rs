//! Pipeline State Cache entries.
//!
//! An entry is created once per unique signature and never reallocated.
//! While the exact pipeline compiles in the background the entry may lend a
//! fallback entry's pipeline object; completion swaps the object in place,
//! so every `Arc` handed out earlier observes the finished pipeline.

use std::any::Any;
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;

use super::compiler::PipelineBackend;
use super::signature::PipelineSignature;
use crate::errors::Result;
use crate::material::MaterialBlueprint;

// ─── Pipeline Object ─────────────────────────────────────────────────────────

/// Reference-counted, backend-defined compiled pipeline.
#[derive(Clone)]
pub struct PipelineObject(Arc<dyn Any + Send + Sync>);

impl PipelineObject {
    pub fn new<T: Any + Send + Sync>(pipeline: T) -> Self {
        Self(Arc::new(pipeline))
    }

    #[inline]
    #[must_use]
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    /// Whether both handles point at the same pipeline.
    #[inline]
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for PipelineObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PipelineObject")
            .field(&Arc::as_ptr(&self.0).cast::<()>())
            .finish()
    }
}

// ─── Cache Entry ─────────────────────────────────────────────────────────────

/// Compilation state of an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheState {
    /// No pipeline object yet (compute entries queued without a fallback).
    Pending,
    /// Borrowing a fallback entry's pipeline until compilation completes.
    UsingFallback,
    Ready,
}

/// One memoized pipeline.
pub struct PipelineStateCache<S: PipelineSignature> {
    signature: S,
    blueprint: Arc<MaterialBlueprint>,
    pipeline: RwLock<Option<PipelineObject>>,
    using_fallback: AtomicBool,
}

impl<S: PipelineSignature> PipelineStateCache<S> {
    pub(crate) fn new(
        blueprint: Arc<MaterialBlueprint>,
        signature: S,
        fallback: Option<PipelineObject>,
    ) -> Self {
        Self {
            signature,
            blueprint,
            using_fallback: AtomicBool::new(fallback.is_some()),
            pipeline: RwLock::new(fallback),
        }
    }

    #[inline]
    #[must_use]
    pub fn signature(&self) -> &S {
        &self.signature
    }

    #[inline]
    #[must_use]
    pub fn signature_id(&self) -> u32 {
        self.signature.signature_id()
    }

    #[inline]
    #[must_use]
    pub fn material_blueprint(&self) -> &Arc<MaterialBlueprint> {
        &self.blueprint
    }

    /// Current pipeline object, possibly a borrowed fallback.
    ///
    /// `None` means nothing may be drawn or dispatched with this entry yet.
    #[must_use]
    pub fn pipeline(&self) -> Option<PipelineObject> {
        self.pipeline.read().clone()
    }

    #[inline]
    #[must_use]
    pub fn is_using_fallback(&self) -> bool {
        self.using_fallback.load(Ordering::Acquire)
    }

    #[must_use]
    pub fn state(&self) -> CacheState {
        match (self.pipeline.read().is_some(), self.is_using_fallback()) {
            (false, _) => CacheState::Pending,
            (true, true) => CacheState::UsingFallback,
            (true, false) => CacheState::Ready,
        }
    }

    /// Compiles on the calling thread and stores the result in place.
    pub(crate) fn compile(&self, backend: &dyn PipelineBackend) -> Result<()> {
        let pipeline = self.signature.create_pipeline(backend, &self.blueprint)?;
        *self.pipeline.write() = Some(pipeline);
        self.using_fallback.store(false, Ordering::Release);
        Ok(())
    }
}

impl<S: PipelineSignature + fmt::Debug> fmt::Debug for PipelineStateCache<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineStateCache")
            .field("signature", &self.signature)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Type-erased entry handed to the compiler workers.
pub(crate) trait CompileRequest: Send + Sync {
    fn compile(&self, backend: &dyn PipelineBackend) -> Result<()>;

    fn signature_id(&self) -> u32;
}

impl<S: PipelineSignature> CompileRequest for PipelineStateCache<S> {
    fn compile(&self, backend: &dyn PipelineBackend) -> Result<()> {
        PipelineStateCache::compile(self, backend)
    }

    fn signature_id(&self) -> u32 {
        PipelineStateCache::signature_id(self)
    }
}
