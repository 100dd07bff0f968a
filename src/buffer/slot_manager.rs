//! Buffer Slot Manager
//!
//! Hands out per-material slots in pooled uniform buffers for one material
//! blueprint, uploads dirty slot data and emits resource group binds only
//! when the pool changes between consecutive draws.
//!
//! # Slot bookkeeping
//!
//! Slots live in a [`SlotMap`] arena owned by the manager and are addressed
//! by [`SlotKey`]. Every assigned slot is in the dense `active_slots` list
//! and stores its own position there (`global_index`). Removal swaps the
//! last element into the hole and patches the moved slot's position, so
//! `active_slots[slot.global_index] == key` holds for every assigned slot.
//! The dirty list is maintained the same way.
//!
//! # Uploads
//!
//! A pool buffer is always mapped with write-discard. Uploading therefore
//! repacks *every* assigned slot of each pool that has at least one dirty
//! slot, then writes the whole pool buffer with a single map. Pools without
//! dirty slots are left untouched.
//!
//! The manager is not thread-safe; it belongs to the render thread.

use std::sync::Arc;

use slotmap::{SlotMap, new_key_type};
use smallvec::SmallVec;

use super::packing::{PropertyResolver, UnresolvedPropertyFn, write_element};
use super::slot_pool::SlotPool;
use crate::errors::{Error, Result};
use crate::material::{
    MaterialBlueprint, SharedGlobalMaterialProperties, SharedMaterialProperties,
    UniformBufferLayout,
};
use crate::rhi::{CommandBuffer, MapMode, PipelineKind, RenderDevice};
use crate::settings::CacheSettings;

new_key_type! {
    /// Handle to a slot owned by a [`BufferSlotManager`].
    pub struct SlotKey;
}

/// Index of a pool inside its manager. Pools are only destroyed with the
/// manager, so the index stays valid for the manager's lifetime.
pub type PoolId = usize;

/// Per-material slot state.
#[derive(Debug)]
pub struct MaterialBufferSlot {
    properties: SharedMaterialProperties,
    pool: Option<PoolId>,
    index: Option<u32>,
    global_index: Option<usize>,
    /// Position in the dirty list while dirty.
    dirty_index: Option<usize>,
}

impl MaterialBufferSlot {
    fn new(properties: SharedMaterialProperties) -> Self {
        Self {
            properties,
            pool: None,
            index: None,
            global_index: None,
            dirty_index: None,
        }
    }

    /// Material properties uploaded into this slot.
    #[inline]
    #[must_use]
    pub fn properties(&self) -> &SharedMaterialProperties {
        &self.properties
    }

    #[inline]
    #[must_use]
    pub fn pool(&self) -> Option<PoolId> {
        self.pool
    }

    /// Element index inside the pool buffer.
    #[inline]
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        self.index
    }

    /// Position in the manager's dense active slot list.
    #[inline]
    #[must_use]
    pub fn global_index(&self) -> Option<usize> {
        self.global_index
    }

    #[inline]
    #[must_use]
    pub fn is_assigned(&self) -> bool {
        self.pool.is_some()
    }

    #[inline]
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.dirty_index.is_some()
    }
}

#[inline]
const fn kind_index(kind: PipelineKind) -> usize {
    match kind {
        PipelineKind::Graphics => 0,
        PipelineKind::Compute => 1,
    }
}

/// Pools material uniform buffer slots for one material blueprint.
pub struct BufferSlotManager {
    device: Arc<dyn RenderDevice>,
    blueprint: Arc<MaterialBlueprint>,
    globals: SharedGlobalMaterialProperties,
    layout: UniformBufferLayout,
    unresolved: Option<Box<UnresolvedPropertyFn>>,

    buffer_size_bytes: u32,
    slots_per_pool: u32,

    slots: SlotMap<SlotKey, MaterialBufferSlot>,
    pools: Vec<SlotPool>,
    active_slots: Vec<SlotKey>,
    dirty_slots: Vec<SlotKey>,
    last_bound_pool: [Option<PoolId>; 2],

    /// Host copy of one pool buffer, reused for every upload.
    scratch: Vec<u8>,
}

impl BufferSlotManager {
    /// Creates a manager for the material uniform buffer of `blueprint`.
    ///
    /// Pools are `min(device maximum uniform buffer size,
    /// settings.max_slot_pool_bytes)` bytes; none is created up front.
    pub fn new(
        device: Arc<dyn RenderDevice>,
        blueprint: Arc<MaterialBlueprint>,
        globals: SharedGlobalMaterialProperties,
        settings: &CacheSettings,
    ) -> Result<Self> {
        let layout = blueprint
            .material_uniform_buffer()
            .cloned()
            .ok_or(Error::MissingMaterialUniformBuffer(blueprint.id()))?;

        let buffer_size_bytes =
            settings.slot_pool_bytes(device.capabilities().maximum_uniform_buffer_size);
        let stride = layout.element_stride_bytes();
        let slots_per_pool = buffer_size_bytes.checked_div(stride).unwrap_or(0);
        if slots_per_pool == 0 {
            return Err(Error::LayoutOverflow {
                required: stride as usize,
                available: buffer_size_bytes as usize,
            });
        }

        Ok(Self {
            device,
            blueprint,
            globals,
            layout,
            unresolved: None,
            buffer_size_bytes,
            slots_per_pool,
            slots: SlotMap::with_key(),
            pools: Vec::new(),
            active_slots: Vec::new(),
            dirty_slots: Vec::new(),
            last_bound_pool: [None; 2],
            scratch: vec![0; buffer_size_bytes as usize],
        })
    }

    /// Installs the callback consulted for material references the owning
    /// material does not define.
    pub fn set_unresolved_property_callback(&mut self, callback: Box<UnresolvedPropertyFn>) {
        self.unresolved = Some(callback);
    }

    // ─── Slot Arena ──────────────────────────────────────────────────────────

    /// Creates an unassigned slot uploading `properties`.
    pub fn create_slot(&mut self, properties: SharedMaterialProperties) -> SlotKey {
        self.slots.insert(MaterialBufferSlot::new(properties))
    }

    /// Releases the slot if assigned and forgets it.
    pub fn destroy_slot(&mut self, key: SlotKey) -> Result<()> {
        let assigned = self.slot_ref(key)?.is_assigned();
        if assigned {
            self.release_slot(key)?;
        }
        self.slots.remove(key);
        Ok(())
    }

    // ─── Assignment ──────────────────────────────────────────────────────────

    /// Assigns the slot to a pool index (releasing any previous assignment)
    /// and schedules it for upload.
    ///
    /// Existing pools are scanned in creation order; a new pool is created
    /// only when every pool is full.
    pub fn request_slot(&mut self, key: SlotKey) -> Result<()> {
        if self.slot_ref(key)?.is_assigned() {
            self.release_slot(key)?;
        }

        let pool_id = match self.pools.iter().position(SlotPool::has_free_slot) {
            Some(pool_id) => pool_id,
            None => self.create_pool()?,
        };
        let index = self.pools[pool_id]
            .allocate()
            .ok_or(Error::LayoutOverflow {
                required: self.layout.element_stride_bytes() as usize,
                available: self.buffer_size_bytes as usize,
            })?;

        let global_index = self.active_slots.len();
        self.active_slots.push(key);

        let slot = self.slot_mut(key)?;
        slot.pool = Some(pool_id);
        slot.index = Some(index);
        slot.global_index = Some(global_index);

        self.schedule_for_update(key)
    }

    /// Returns the slot's index to its pool and clears its assignment.
    pub fn release_slot(&mut self, key: SlotKey) -> Result<()> {
        let slot = self.slot_ref(key)?;
        let (Some(pool_id), Some(index), Some(global_index)) =
            (slot.pool, slot.index, slot.global_index)
        else {
            return Err(Error::SlotNotAssigned);
        };
        let dirty_index = slot.dirty_index;

        if let Some(dirty_index) = dirty_index {
            self.dirty_slots.swap_remove(dirty_index);
            if let Some(&moved) = self.dirty_slots.get(dirty_index) {
                self.slot_mut(moved)?.dirty_index = Some(dirty_index);
            }
        }

        self.pools[pool_id].free(index);

        debug_assert_eq!(self.active_slots[global_index], key);
        self.active_slots.swap_remove(global_index);
        if let Some(&moved) = self.active_slots.get(global_index) {
            self.slot_mut(moved)?.global_index = Some(global_index);
        }

        let slot = self.slot_mut(key)?;
        slot.pool = None;
        slot.index = None;
        slot.global_index = None;
        slot.dirty_index = None;
        Ok(())
    }

    /// Marks an assigned slot dirty. Idempotent.
    pub fn schedule_for_update(&mut self, key: SlotKey) -> Result<()> {
        let next_dirty_index = self.dirty_slots.len();
        let slot = self.slot_mut(key)?;
        if !slot.is_assigned() {
            return Err(Error::SlotNotAssigned);
        }
        if slot.dirty_index.is_none() {
            slot.dirty_index = Some(next_dirty_index);
            self.dirty_slots.push(key);
        }
        Ok(())
    }

    // ─── Frame ───────────────────────────────────────────────────────────────

    /// Starts a new pass for `kind`: uploads pending slot data, then forgets
    /// the last bound pool so the next bind is always emitted.
    pub fn reset_last_bound_pool(&mut self, kind: PipelineKind) -> Result<()> {
        self.last_bound_pool[kind_index(kind)] = None;
        if !self.dirty_slots.is_empty() {
            self.upload_dirty_slots()?;
        }
        Ok(())
    }

    /// Binds the slot's pool unless it is already the last bound one.
    ///
    /// Does not upload; slot data is flushed by
    /// [`reset_last_bound_pool`](Self::reset_last_bound_pool).
    pub fn fill_command_buffer(
        &mut self,
        key: SlotKey,
        command_buffer: &mut CommandBuffer,
        kind: PipelineKind,
    ) -> Result<()> {
        let pool_id = self.slot_ref(key)?.pool.ok_or(Error::SlotNotAssigned)?;
        let last_bound = &mut self.last_bound_pool[kind_index(kind)];
        if *last_bound != Some(pool_id) {
            command_buffer.set_resource_group(
                kind,
                self.layout.root_parameter_index(),
                self.pools[pool_id].resource_group(),
            );
            *last_bound = Some(pool_id);
        }
        Ok(())
    }

    fn upload_dirty_slots(&mut self) -> Result<()> {
        let mut touched_pools: SmallVec<[PoolId; 4]> = SmallVec::new();
        for key in &self.dirty_slots {
            if let Some(pool_id) = self.slots.get(*key).and_then(|s| s.pool)
                && !touched_pools.contains(&pool_id)
            {
                touched_pools.push(pool_id);
            }
        }

        let stride = self.layout.element_stride_bytes() as usize;
        let globals = self.globals.read();
        for &pool_id in &touched_pools {
            self.scratch.fill(0);
            for key in &self.active_slots {
                let Some(slot) = self.slots.get(*key) else {
                    continue;
                };
                let (Some(slot_pool), Some(index)) = (slot.pool, slot.index) else {
                    continue;
                };
                if slot_pool != pool_id {
                    continue;
                }

                let material = slot.properties.read();
                let resolver = PropertyResolver::new(
                    &material,
                    &globals,
                    self.blueprint.material_properties(),
                )
                .with_unresolved(self.unresolved.as_deref());

                let start = stride * index as usize;
                let available = self.scratch.len();
                let element = self
                    .scratch
                    .get_mut(start..start + stride)
                    .ok_or(Error::LayoutOverflow {
                        required: start + stride,
                        available,
                    })?;
                write_element(element, self.layout.properties(), &resolver)?;
            }

            let scratch = &self.scratch;
            self.device.map_buffer(
                self.pools[pool_id].buffer(),
                MapMode::WriteDiscard,
                &mut |mapped: &mut [u8]| {
                    let len = mapped.len().min(scratch.len());
                    mapped[..len].copy_from_slice(&scratch[..len]);
                },
            )?;
        }
        drop(globals);

        for key in self.dirty_slots.drain(..) {
            if let Some(slot) = self.slots.get_mut(key) {
                slot.dirty_index = None;
            }
        }
        Ok(())
    }

    fn create_pool(&mut self) -> Result<PoolId> {
        let pool = SlotPool::new(
            self.device.as_ref(),
            self.buffer_size_bytes,
            self.slots_per_pool,
            self.layout.root_parameter_index(),
        )?;
        self.pools.push(pool);
        log::debug!(
            "Material blueprint {:#010x}: created slot pool #{} ({} slots, {} bytes)",
            self.blueprint.id(),
            self.pools.len() - 1,
            self.slots_per_pool,
            self.buffer_size_bytes
        );
        Ok(self.pools.len() - 1)
    }

    // ─── Accessors ───────────────────────────────────────────────────────────

    fn slot_ref(&self, key: SlotKey) -> Result<&MaterialBufferSlot> {
        self.slots.get(key).ok_or(Error::UnknownSlot)
    }

    fn slot_mut(&mut self, key: SlotKey) -> Result<&mut MaterialBufferSlot> {
        self.slots.get_mut(key).ok_or(Error::UnknownSlot)
    }

    #[must_use]
    pub fn slot(&self, key: SlotKey) -> Option<&MaterialBufferSlot> {
        self.slots.get(key)
    }

    #[must_use]
    pub fn pool(&self, pool_id: PoolId) -> Option<&SlotPool> {
        self.pools.get(pool_id)
    }

    #[inline]
    #[must_use]
    pub fn pool_count(&self) -> usize {
        self.pools.len()
    }

    #[inline]
    #[must_use]
    pub fn slots_per_pool(&self) -> u32 {
        self.slots_per_pool
    }

    #[inline]
    #[must_use]
    pub fn buffer_size_bytes(&self) -> u32 {
        self.buffer_size_bytes
    }

    #[inline]
    #[must_use]
    pub fn layout(&self) -> &UniformBufferLayout {
        &self.layout
    }

    #[inline]
    #[must_use]
    pub fn active_slot_count(&self) -> usize {
        self.active_slots.len()
    }

    /// Slot at position `global_index` of the dense active list.
    #[inline]
    #[must_use]
    pub fn active_slot_at(&self, global_index: usize) -> Option<SlotKey> {
        self.active_slots.get(global_index).copied()
    }

    #[inline]
    #[must_use]
    pub fn dirty_slot_count(&self) -> usize {
        self.dirty_slots.len()
    }

    #[inline]
    #[must_use]
    pub fn last_bound_pool(&self, kind: PipelineKind) -> Option<PoolId> {
        self.last_bound_pool[kind_index(kind)]
    }
}

impl Drop for BufferSlotManager {
    fn drop(&mut self) {
        if !self.pools.is_empty() {
            log::debug!(
                "Material blueprint {:#010x}: releasing {} slot pools",
                self.blueprint.id(),
                self.pools.len()
            );
        }
        for pool in self.pools.drain(..) {
            pool.release(self.device.as_ref());
        }
    }
}
