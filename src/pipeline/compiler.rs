//! Pipeline State Compiler
//!
//! Bridges the caches to the backend that actually builds pipeline objects.
//!
//! - Asynchronous requests are queued on a `flume` channel and drained by a
//!   fixed set of worker threads. The queue holds the cache entry object
//!   itself, so a late completion always lands in the entry it was issued
//!   for, even if its manager was cleared meanwhile.
//! - Synchronous requests compile on the calling thread.
//!
//! Failed asynchronous compiles are logged and leave the entry unchanged
//! (still pending or still borrowing its fallback).

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::JoinHandle;

use parking_lot::{Condvar, Mutex};

use super::cache::{CompileRequest, PipelineObject, PipelineStateCache};
use super::signature::{ComputePipelineSignature, GraphicsPipelineSignature, PipelineSignature};
use crate::errors::Result;
use crate::material::MaterialBlueprint;
use crate::settings::CacheSettings;

/// Builds pipeline objects. Implemented by the renderer on top of its
/// shader compiler and graphics API.
pub trait PipelineBackend: Send + Sync {
    fn create_graphics_pipeline(
        &self,
        blueprint: &MaterialBlueprint,
        signature: &GraphicsPipelineSignature,
    ) -> Result<PipelineObject>;

    fn create_compute_pipeline(
        &self,
        blueprint: &MaterialBlueprint,
        signature: &ComputePipelineSignature,
    ) -> Result<PipelineObject>;
}

type QueuedRequest = Arc<dyn CompileRequest>;

/// Count of queued plus running asynchronous requests.
#[derive(Default)]
struct InFlight {
    count: Mutex<usize>,
    idle: Condvar,
}

impl InFlight {
    fn begin(&self) {
        *self.count.lock() += 1;
    }

    fn finish(&self) {
        let mut count = self.count.lock();
        *count = count.saturating_sub(1);
        if *count == 0 {
            self.idle.notify_all();
        }
    }
}

/// Decrements the in-flight count even if the backend panics.
struct FinishGuard<'a>(&'a InFlight);

impl Drop for FinishGuard<'_> {
    fn drop(&mut self) {
        self.0.finish();
    }
}

/// Synchronous and asynchronous pipeline compilation.
///
/// Worker threads are started on the first asynchronous request, so a
/// compiler created with asynchronous compilation disabled owns no threads
/// until the mode is switched on at runtime.
pub struct PipelineStateCompiler {
    backend: Arc<dyn PipelineBackend>,
    asynchronous: AtomicBool,
    worker_count: usize,
    sender: Option<flume::Sender<QueuedRequest>>,
    receiver: flume::Receiver<QueuedRequest>,
    workers: Mutex<Vec<JoinHandle<()>>>,
    in_flight: Arc<InFlight>,
}

impl PipelineStateCompiler {
    /// Creates the compiler. Workers are spawned right away only when
    /// `settings.asynchronous_compilation` is set.
    pub fn new(backend: Arc<dyn PipelineBackend>, settings: &CacheSettings) -> Result<Self> {
        let (sender, receiver) = flume::unbounded::<QueuedRequest>();
        let compiler = Self {
            backend,
            asynchronous: AtomicBool::new(settings.asynchronous_compilation),
            worker_count: settings.effective_compiler_threads(),
            sender: Some(sender),
            receiver,
            workers: Mutex::new(Vec::new()),
            in_flight: Arc::new(InFlight::default()),
        };
        if settings.asynchronous_compilation {
            compiler.ensure_workers()?;
        }
        Ok(compiler)
    }

    /// Spawns the worker threads unless they are already running.
    fn ensure_workers(&self) -> Result<()> {
        let mut workers = self.workers.lock();
        if !workers.is_empty() {
            return Ok(());
        }

        for i in 0..self.worker_count {
            let receiver = self.receiver.clone();
            let backend = Arc::clone(&self.backend);
            let in_flight = Arc::clone(&self.in_flight);
            let handle = std::thread::Builder::new()
                .name(format!("pipeline-compiler-{i}"))
                .spawn(move || {
                    while let Ok(request) = receiver.recv() {
                        let _finish = FinishGuard(&in_flight);
                        if let Err(err) = request.compile(backend.as_ref()) {
                            log::error!(
                                "Asynchronous pipeline compilation failed for signature {:#010x}: {err}",
                                request.signature_id()
                            );
                        }
                    }
                });
            match handle {
                Ok(handle) => workers.push(handle),
                // Partial pools still drain the queue
                Err(err) if !workers.is_empty() => {
                    log::warn!("Pipeline compiler worker {i} failed to start: {err}");
                    break;
                }
                Err(err) => return Err(err.into()),
            }
        }
        log::debug!("Pipeline state compiler started with {} workers", workers.len());
        Ok(())
    }

    /// Number of running worker threads.
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.lock().len()
    }

    #[inline]
    #[must_use]
    pub fn backend(&self) -> &Arc<dyn PipelineBackend> {
        &self.backend
    }

    #[inline]
    #[must_use]
    pub fn is_asynchronous_compilation_enabled(&self) -> bool {
        self.asynchronous.load(Ordering::Relaxed)
    }

    pub fn set_asynchronous_compilation_enabled(&self, enabled: bool) {
        self.asynchronous.store(enabled, Ordering::Relaxed);
    }

    /// Queues `entry` for background compilation. Returns immediately.
    pub fn add_asynchronous_compiler_request<S: PipelineSignature>(
        &self,
        entry: Arc<PipelineStateCache<S>>,
    ) {
        let request: QueuedRequest = entry;
        self.in_flight.begin();
        let rejected = match (self.ensure_workers(), &self.sender) {
            (Ok(()), Some(sender)) => sender.send(request).err().map(|err| err.into_inner()),
            (Ok(()), None) => Some(request),
            (Err(err), _) => {
                log::error!("Pipeline compiler workers could not be started: {err}");
                Some(request)
            }
        };

        // Workers are gone; compile here rather than losing the request
        if let Some(request) = rejected {
            let _finish = FinishGuard(&self.in_flight);
            log::warn!(
                "Pipeline compiler workers unavailable, compiling {:#010x} synchronously",
                request.signature_id()
            );
            if let Err(err) = request.compile(self.backend.as_ref()) {
                log::error!(
                    "Pipeline compilation failed for signature {:#010x}: {err}",
                    request.signature_id()
                );
            }
        }
    }

    /// Compiles `entry` on the calling thread.
    pub fn instant_synchronous_compiler_request<S: PipelineSignature>(
        &self,
        entry: &PipelineStateCache<S>,
    ) -> Result<()> {
        entry.compile(self.backend.as_ref())
    }

    /// Queued plus running asynchronous requests.
    #[must_use]
    pub fn pending_request_count(&self) -> usize {
        *self.in_flight.count.lock()
    }

    /// Blocks until every asynchronous request issued so far has finished.
    pub fn flush(&self) {
        let mut count = self.in_flight.count.lock();
        while *count > 0 {
            self.in_flight.idle.wait(&mut count);
        }
    }
}

impl Drop for PipelineStateCompiler {
    fn drop(&mut self) {
        // Closing the channel lets workers drain the queue and exit
        self.sender.take();
        for worker in self.workers.get_mut().drain(..) {
            if worker.join().is_err() {
                log::error!("Pipeline compiler worker panicked");
            }
        }
    }
}
