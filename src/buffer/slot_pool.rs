//! Slot Pool
//!
//! One uniform buffer split into `slots_per_pool` equally sized elements,
//! one resource group wrapping it, and a LIFO stack of free element indices.

use crate::errors::Result;
use crate::rhi::{BufferHandle, BufferUsage, RenderDevice, ResourceGroupHandle};

/// Fixed-capacity pool of uniform buffer slots.
#[derive(Debug)]
pub struct SlotPool {
    buffer: BufferHandle,
    resource_group: ResourceGroupHandle,
    slots_per_pool: u32,
    /// Free indices; the back is handed out next.
    free_indices: Vec<u32>,
}

impl SlotPool {
    /// Creates the pool buffer (zero-initialized) and its resource group.
    pub fn new(
        device: &dyn RenderDevice,
        buffer_size_bytes: u32,
        slots_per_pool: u32,
        root_parameter_index: u32,
    ) -> Result<Self> {
        let buffer = device.create_uniform_buffer(buffer_size_bytes, None, BufferUsage::DynamicDraw)?;
        let resource_group = match device.create_resource_group(root_parameter_index, &[buffer]) {
            Ok(group) => group,
            Err(err) => {
                device.destroy_buffer(buffer);
                return Err(err);
            }
        };

        // From slots_per_pool - 1 down to 0, so pop() hands out low indices first
        let free_indices = (0..slots_per_pool).rev().collect();

        Ok(Self {
            buffer,
            resource_group,
            slots_per_pool,
            free_indices,
        })
    }

    #[inline]
    #[must_use]
    pub fn has_free_slot(&self) -> bool {
        !self.free_indices.is_empty()
    }

    /// Takes a free index, `None` when the pool is full.
    #[inline]
    pub fn allocate(&mut self) -> Option<u32> {
        self.free_indices.pop()
    }

    /// Returns `index` to the pool. Freeing an index twice corrupts the pool.
    pub fn free(&mut self, index: u32) {
        debug_assert!(index < self.slots_per_pool, "slot index {index} out of range");
        debug_assert!(
            !self.free_indices.contains(&index),
            "slot index {index} freed twice"
        );
        self.free_indices.push(index);
    }

    #[inline]
    #[must_use]
    pub fn free_slot_count(&self) -> usize {
        self.free_indices.len()
    }

    #[inline]
    #[must_use]
    pub fn slots_per_pool(&self) -> u32 {
        self.slots_per_pool
    }

    #[inline]
    #[must_use]
    pub fn buffer(&self) -> BufferHandle {
        self.buffer
    }

    #[inline]
    #[must_use]
    pub fn resource_group(&self) -> ResourceGroupHandle {
        self.resource_group
    }

    /// Destroys the resource group and then the buffer.
    pub fn release(self, device: &dyn RenderDevice) {
        device.destroy_resource_group(self.resource_group);
        device.destroy_buffer(self.buffer);
    }
}
