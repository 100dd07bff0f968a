//! Pipeline State Cache Manager
//!
//! Memoizes pipeline objects of one material blueprint by signature id.
//!
//! # Cache miss policy
//!
//! | async enabled | fallback found | sync allowed | result                                   |
//! |---------------|----------------|--------------|------------------------------------------|
//! | yes           | yes            | any          | borrows fallback, queued on the workers  |
//! | no            | -              | any          | compiled on the calling thread           |
//! | yes           | no             | yes          | compiled on the calling thread           |
//! | yes           | no             | no           | queued, no pipeline object until ready   |
//!
//! The last row is only acceptable for compute work that can be deferred;
//! callers check [`PipelineStateCache::pipeline`] before drawing.
//!
//! The map lock only guards lookups and inserts. Compiles, including the
//! ones issued by [`load_cache`](PipelineStateCacheManager::load_cache),
//! run without it, so hits never wait on a compile.
//!
//! # Fallback search
//!
//! Starting from the requested (optimized) property set, the removable
//! property with the lowest visual importance is dropped one at a time and
//! the cache is probed after each removal. Ties go to the first property in
//! the set. Mandatory properties are never dropped.

use std::collections::hash_map::Entry;
use std::io::{Read, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::cache::{PipelineObject, PipelineStateCache};
use super::cache_file::{read_cache_blob, write_cache_blob};
use super::compiler::PipelineStateCompiler;
use super::signature::{ComputePipelineSignature, GraphicsPipelineSignature, PipelineSignature};
use crate::errors::{Error, Result};
use crate::material::{MANDATORY_SHADER_PROPERTY, MaterialBlueprint, ShaderProperties};

/// Cache manager for graphics pipelines.
pub type GraphicsPipelineStateCacheManager = PipelineStateCacheManager<GraphicsPipelineSignature>;

/// Cache manager for compute pipelines.
pub type ComputePipelineStateCacheManager = PipelineStateCacheManager<ComputePipelineSignature>;

type CacheMap<S> = FxHashMap<u32, Arc<PipelineStateCache<S>>>;

/// Signature-keyed pipeline cache of one material blueprint.
pub struct PipelineStateCacheManager<S: PipelineSignature> {
    blueprint: Arc<MaterialBlueprint>,
    compiler: Arc<PipelineStateCompiler>,
    caches: Mutex<CacheMap<S>>,
    needs_saving: AtomicBool,
}

impl<S: PipelineSignature> PipelineStateCacheManager<S> {
    #[must_use]
    pub fn new(blueprint: Arc<MaterialBlueprint>, compiler: Arc<PipelineStateCompiler>) -> Self {
        Self {
            blueprint,
            compiler,
            caches: Mutex::new(FxHashMap::default()),
            needs_saving: AtomicBool::new(false),
        }
    }

    /// Cache entry for a shader property combination, creating (and
    /// compiling or queueing) it on a miss.
    ///
    /// Existing entries are returned as they are, even while still
    /// borrowing a fallback pipeline.
    pub fn get_cache_by_combination(
        &self,
        shader_properties: &ShaderProperties,
        allow_emergency_synchronous_compilation: bool,
    ) -> Result<Arc<PipelineStateCache<S>>> {
        let optimized = self.blueprint.optimize_shader_properties(shader_properties);
        let signature = S::new(&self.blueprint, optimized);
        let signature_id = signature.signature_id();

        let asynchronous = self.compiler.is_asynchronous_compilation_enabled();
        let fallback = {
            let caches = self.caches.lock();
            if let Some(entry) = caches.get(&signature_id) {
                return Ok(Arc::clone(entry));
            }
            if asynchronous {
                self.find_fallback_locked(&caches, signature.shader_properties())
            } else {
                None
            }
        };

        // Compiles run without the map lock; a racing miss on the same
        // signature keeps whichever entry was inserted first.
        let entry = match fallback {
            Some((fallback_id, pipeline)) => {
                let entry = Arc::new(PipelineStateCache::new(
                    Arc::clone(&self.blueprint),
                    signature,
                    Some(pipeline),
                ));
                let (entry, inserted) = self.insert_or_existing(entry, true);
                if inserted {
                    log::debug!(
                        "Pipeline {signature_id:#010x} queued, borrowing fallback {fallback_id:#010x}"
                    );
                    self.compiler.add_asynchronous_compiler_request(Arc::clone(&entry));
                }
                entry
            }
            None if !asynchronous || allow_emergency_synchronous_compilation => {
                let entry = Arc::new(PipelineStateCache::new(
                    Arc::clone(&self.blueprint),
                    signature,
                    None,
                ));
                self.compiler.instant_synchronous_compiler_request(&entry)?;
                log::debug!("Pipeline {signature_id:#010x} compiled synchronously");
                self.insert_or_existing(entry, true).0
            }
            None => {
                let entry = Arc::new(PipelineStateCache::new(
                    Arc::clone(&self.blueprint),
                    signature,
                    None,
                ));
                let (entry, inserted) = self.insert_or_existing(entry, true);
                if inserted {
                    log::warn!(
                        "Pipeline {signature_id:#010x} of blueprint {:#010x} has no fallback; \
                         entry stays without a pipeline until compiled",
                        self.blueprint.id()
                    );
                    self.compiler.add_asynchronous_compiler_request(Arc::clone(&entry));
                }
                entry
            }
        };
        Ok(entry)
    }

    /// Inserts `entry` unless its signature is already cached. Returns the
    /// cached entry and whether it is the one passed in.
    fn insert_or_existing(
        &self,
        entry: Arc<PipelineStateCache<S>>,
        mark_needs_saving: bool,
    ) -> (Arc<PipelineStateCache<S>>, bool) {
        let mut caches = self.caches.lock();
        match caches.entry(entry.signature_id()) {
            Entry::Occupied(existing) => (Arc::clone(existing.get()), false),
            Entry::Vacant(slot) => {
                slot.insert(Arc::clone(&entry));
                if mark_needs_saving {
                    self.needs_saving.store(true, Ordering::Relaxed);
                }
                (entry, true)
            }
        }
    }

    /// Entry whose pipeline would stand in for `shader_properties`, if any.
    #[must_use]
    pub fn find_fallback(
        &self,
        shader_properties: &ShaderProperties,
    ) -> Option<Arc<PipelineStateCache<S>>> {
        let optimized = self.blueprint.optimize_shader_properties(shader_properties);
        let caches = self.caches.lock();
        self.find_fallback_locked(&caches, &optimized)
            .and_then(|(id, _)| caches.get(&id).cloned())
    }

    fn find_fallback_locked(
        &self,
        caches: &CacheMap<S>,
        shader_properties: &ShaderProperties,
    ) -> Option<(u32, PipelineObject)> {
        let mut candidate = shader_properties.clone();
        loop {
            let mut lowest: Option<(usize, i32)> = None;
            for (index, property) in candidate.iter().enumerate() {
                let importance = self.blueprint.visual_importance(property.id);
                if importance == MANDATORY_SHADER_PROPERTY {
                    continue;
                }
                if lowest.is_none_or(|(_, lowest_importance)| importance < lowest_importance) {
                    lowest = Some((index, importance));
                }
            }

            let (index, _) = lowest?;
            candidate.remove_at(index);

            let signature_id = S::new(&self.blueprint, candidate.clone()).signature_id();
            if let Some(pipeline) = caches.get(&signature_id).and_then(|e| e.pipeline()) {
                return Some((signature_id, pipeline));
            }
        }
    }

    /// Forgets every entry. Queued compiles still complete into the
    /// forgotten entry objects.
    pub fn clear_cache(&self) {
        self.caches.lock().clear();
        self.needs_saving.store(true, Ordering::Relaxed);
    }

    // ─── Persistence ─────────────────────────────────────────────────────────

    /// Reads one blob and compiles every entry synchronously.
    ///
    /// Returns the number of entries added. Loading does not by itself make
    /// the cache need saving.
    pub fn load_cache<R: Read + ?Sized>(&self, reader: &mut R) -> Result<usize> {
        let entries = read_cache_blob(reader, self.blueprint.id())?;

        let mut added = 0;
        for shader_properties in entries {
            let signature = S::new(&self.blueprint, shader_properties);
            if self.caches.lock().contains_key(&signature.signature_id()) {
                continue;
            }
            let entry = Arc::new(PipelineStateCache::new(
                Arc::clone(&self.blueprint),
                signature,
                None,
            ));
            self.compiler.instant_synchronous_compiler_request(&entry)?;
            if self.insert_or_existing(entry, false).1 {
                added += 1;
            }
        }

        log::info!(
            "Loaded {added} {:?} pipeline cache entries for blueprint {:#010x}",
            S::KIND,
            self.blueprint.id()
        );
        Ok(added)
    }

    /// Writes the property set of every entry as one blob.
    pub fn save_cache<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        let caches = self.caches.lock();

        let mut entries: Vec<&Arc<PipelineStateCache<S>>> = caches.values().collect();
        entries.sort_unstable_by_key(|entry| entry.signature_id());
        if let Some(foreign) = entries
            .iter()
            .find(|e| e.signature().material_blueprint_id() != self.blueprint.id())
        {
            return Err(Error::BlueprintMismatch {
                expected: self.blueprint.id(),
                found: foreign.signature().material_blueprint_id(),
            });
        }

        write_cache_blob(
            writer,
            self.blueprint.id(),
            entries.iter().map(|e| e.signature().shader_properties()),
        )?;
        self.needs_saving.store(false, Ordering::Relaxed);

        log::info!(
            "Saved {} {:?} pipeline cache entries for blueprint {:#010x}",
            entries.len(),
            S::KIND,
            self.blueprint.id()
        );
        Ok(())
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn get_cache_by_signature_id(&self, signature_id: u32) -> Option<Arc<PipelineStateCache<S>>> {
        self.caches.lock().get(&signature_id).cloned()
    }

    /// Whether entries were added or cleared since the last save.
    #[inline]
    #[must_use]
    pub fn needs_saving(&self) -> bool {
        self.needs_saving.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.caches.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.caches.lock().is_empty()
    }

    #[inline]
    #[must_use]
    pub fn material_blueprint(&self) -> &Arc<MaterialBlueprint> {
        &self.blueprint
    }

    #[inline]
    #[must_use]
    pub fn compiler(&self) -> &Arc<PipelineStateCompiler> {
        &self.compiler
    }
}
