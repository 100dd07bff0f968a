//! CPU-only render device.
//!
//! Buffers live in host memory. Every map is counted so callers can verify
//! upload batching without a GPU.

use parking_lot::Mutex;
use slotmap::SlotMap;

use super::{
    BufferHandle, BufferUsage, Capabilities, MapMode, RenderDevice, ResourceGroupHandle,
};
use crate::errors::{Error, Result};

struct HeadlessBuffer {
    data: Vec<u8>,
    map_count: u64,
}

struct HeadlessResourceGroup {
    root_parameter_index: u32,
    resources: Vec<BufferHandle>,
}

#[derive(Default)]
struct HeadlessState {
    buffers: SlotMap<BufferHandle, HeadlessBuffer>,
    resource_groups: SlotMap<ResourceGroupHandle, HeadlessResourceGroup>,
}

/// Render device backed by host memory.
pub struct HeadlessDevice {
    capabilities: Capabilities,
    state: Mutex<HeadlessState>,
}

impl Default for HeadlessDevice {
    fn default() -> Self {
        Self::new(Capabilities::default())
    }
}

impl HeadlessDevice {
    #[must_use]
    pub fn new(capabilities: Capabilities) -> Self {
        Self {
            capabilities,
            state: Mutex::new(HeadlessState::default()),
        }
    }

    /// Copy of a buffer's current contents.
    #[must_use]
    pub fn buffer_contents(&self, buffer: BufferHandle) -> Option<Vec<u8>> {
        self.state.lock().buffers.get(buffer).map(|b| b.data.clone())
    }

    /// How many times `buffer` has been mapped.
    #[must_use]
    pub fn map_count(&self, buffer: BufferHandle) -> u64 {
        self.state.lock().buffers.get(buffer).map_or(0, |b| b.map_count)
    }

    /// Total maps across every live buffer.
    #[must_use]
    pub fn total_map_count(&self) -> u64 {
        self.state.lock().buffers.values().map(|b| b.map_count).sum()
    }

    #[must_use]
    pub fn buffer_count(&self) -> usize {
        self.state.lock().buffers.len()
    }

    #[must_use]
    pub fn resource_group_count(&self) -> usize {
        self.state.lock().resource_groups.len()
    }

    /// Root parameter index and wrapped buffers of a resource group.
    #[must_use]
    pub fn resource_group(&self, group: ResourceGroupHandle) -> Option<(u32, Vec<BufferHandle>)> {
        self.state
            .lock()
            .resource_groups
            .get(group)
            .map(|g| (g.root_parameter_index, g.resources.clone()))
    }
}

impl RenderDevice for HeadlessDevice {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_uniform_buffer(
        &self,
        size_bytes: u32,
        initial_data: Option<&[u8]>,
        _usage: BufferUsage,
    ) -> Result<BufferHandle> {
        if size_bytes > self.capabilities.maximum_uniform_buffer_size {
            return Err(Error::Device(format!(
                "uniform buffer of {size_bytes} bytes exceeds device maximum {}",
                self.capabilities.maximum_uniform_buffer_size
            )));
        }
        let mut data = vec![0u8; size_bytes as usize];
        if let Some(initial) = initial_data {
            let len = initial.len().min(data.len());
            data[..len].copy_from_slice(&initial[..len]);
        }
        Ok(self.state.lock().buffers.insert(HeadlessBuffer { data, map_count: 0 }))
    }

    fn create_resource_group(
        &self,
        root_parameter_index: u32,
        resources: &[BufferHandle],
    ) -> Result<ResourceGroupHandle> {
        let mut state = self.state.lock();
        if let Some(missing) = resources.iter().find(|&&r| !state.buffers.contains_key(r)) {
            return Err(Error::Device(format!(
                "resource group references unknown buffer {missing:?}"
            )));
        }
        Ok(state.resource_groups.insert(HeadlessResourceGroup {
            root_parameter_index,
            resources: resources.to_vec(),
        }))
    }

    fn map_buffer(
        &self,
        buffer: BufferHandle,
        mode: MapMode,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .buffers
            .get_mut(buffer)
            .ok_or_else(|| Error::Device(format!("map of unknown buffer {buffer:?}")))?;
        if mode == MapMode::WriteDiscard {
            // Poison discarded contents so partial writes show up in tests
            entry.data.fill(0xCD);
        }
        entry.map_count += 1;
        write(&mut entry.data);
        Ok(())
    }

    fn destroy_resource_group(&self, resource_group: ResourceGroupHandle) {
        self.state.lock().resource_groups.remove(resource_group);
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        self.state.lock().buffers.remove(buffer);
    }
}
