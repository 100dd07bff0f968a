//! `wgpu` render device.
//!
//! Resource groups map to bind groups holding a single uniform buffer at
//! binding 0. `wgpu` cannot map uniform buffers synchronously, so a mapped
//! buffer is a host staging copy that is pushed through `Queue::write_buffer`
//! when the map scope ends. The queue orders that write before any
//! subsequently submitted command encoder, which is the guarantee the slot
//! manager needs.

use parking_lot::Mutex;
use slotmap::SlotMap;
use wgpu::util::DeviceExt;

use super::{
    BufferHandle, BufferUsage, Capabilities, Command, CommandBuffer, MapMode, RenderDevice,
    ResourceGroupHandle,
};
use crate::errors::{Error, Result};

struct WgpuBuffer {
    buffer: wgpu::Buffer,
    staging: Vec<u8>,
}

#[derive(Default)]
struct WgpuState {
    buffers: SlotMap<BufferHandle, WgpuBuffer>,
    bind_groups: SlotMap<ResourceGroupHandle, wgpu::BindGroup>,
}

/// Render device on top of `wgpu`.
pub struct WgpuDevice {
    device: wgpu::Device,
    queue: wgpu::Queue,
    layout: wgpu::BindGroupLayout,
    capabilities: Capabilities,
    state: Mutex<WgpuState>,
}

impl WgpuDevice {
    #[must_use]
    pub fn new(device: wgpu::Device, queue: wgpu::Queue) -> Self {
        let layout = device.create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
            label: Some("Material Slot Pool Layout"),
            entries: &[wgpu::BindGroupLayoutEntry {
                binding: 0,
                visibility: wgpu::ShaderStages::VERTEX_FRAGMENT | wgpu::ShaderStages::COMPUTE,
                ty: wgpu::BindingType::Buffer {
                    ty: wgpu::BufferBindingType::Uniform,
                    has_dynamic_offset: false,
                    min_binding_size: None,
                },
                count: None,
            }],
        });

        let limit = device.limits().max_uniform_buffer_binding_size;
        let capabilities = Capabilities {
            maximum_uniform_buffer_size: u32::try_from(limit).unwrap_or(u32::MAX),
        };

        Self {
            device,
            queue,
            layout,
            capabilities,
            state: Mutex::new(WgpuState::default()),
        }
    }

    /// Layout every slot pool bind group is created with. Pipeline layouts
    /// place it at the pool's root parameter index.
    #[inline]
    #[must_use]
    pub fn slot_pool_layout(&self) -> &wgpu::BindGroupLayout {
        &self.layout
    }

    /// Replays recorded graphics binds into a render pass.
    pub fn replay_render(&self, commands: &CommandBuffer, pass: &mut wgpu::RenderPass<'_>) {
        let state = self.state.lock();
        for command in commands.commands() {
            if let Command::SetGraphicsResourceGroup {
                root_parameter_index,
                resource_group,
            } = *command
            {
                if let Some(bind_group) = state.bind_groups.get(resource_group) {
                    pass.set_bind_group(root_parameter_index, bind_group, &[]);
                } else {
                    log::warn!("Skipping bind of destroyed resource group {resource_group:?}");
                }
            }
        }
    }

    /// Replays recorded compute binds into a compute pass.
    pub fn replay_compute(&self, commands: &CommandBuffer, pass: &mut wgpu::ComputePass<'_>) {
        let state = self.state.lock();
        for command in commands.commands() {
            if let Command::SetComputeResourceGroup {
                root_parameter_index,
                resource_group,
            } = *command
            {
                if let Some(bind_group) = state.bind_groups.get(resource_group) {
                    pass.set_bind_group(root_parameter_index, bind_group, &[]);
                } else {
                    log::warn!("Skipping bind of destroyed resource group {resource_group:?}");
                }
            }
        }
    }
}

impl RenderDevice for WgpuDevice {
    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn create_uniform_buffer(
        &self,
        size_bytes: u32,
        initial_data: Option<&[u8]>,
        usage: BufferUsage,
    ) -> Result<BufferHandle> {
        if size_bytes > self.capabilities.maximum_uniform_buffer_size {
            return Err(Error::Device(format!(
                "uniform buffer of {size_bytes} bytes exceeds device maximum {}",
                self.capabilities.maximum_uniform_buffer_size
            )));
        }

        let mut staging = vec![0u8; size_bytes as usize];
        if let Some(initial) = initial_data {
            let len = initial.len().min(staging.len());
            staging[..len].copy_from_slice(&initial[..len]);
        }

        let label = match usage {
            BufferUsage::StaticDraw => "Material Slot Pool (static)",
            BufferUsage::DynamicDraw => "Material Slot Pool",
            BufferUsage::StreamDraw => "Material Slot Pool (stream)",
        };
        let buffer = self.device.create_buffer_init(&wgpu::util::BufferInitDescriptor {
            label: Some(label),
            contents: &staging,
            usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
        });

        Ok(self.state.lock().buffers.insert(WgpuBuffer { buffer, staging }))
    }

    fn create_resource_group(
        &self,
        root_parameter_index: u32,
        resources: &[BufferHandle],
    ) -> Result<ResourceGroupHandle> {
        let mut state = self.state.lock();
        let &[resource] = resources else {
            return Err(Error::Device(format!(
                "slot pool resource group expects one buffer, got {}",
                resources.len()
            )));
        };
        let buffer = state
            .buffers
            .get(resource)
            .ok_or_else(|| Error::Device(format!("unknown buffer {resource:?}")))?;

        let label = format!("Material Slot Pool Group (root {root_parameter_index})");
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(&label),
            layout: &self.layout,
            entries: &[wgpu::BindGroupEntry {
                binding: 0,
                resource: buffer.buffer.as_entire_binding(),
            }],
        });

        Ok(state.bind_groups.insert(bind_group))
    }

    fn map_buffer(
        &self,
        buffer: BufferHandle,
        _mode: MapMode,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<()> {
        let mut state = self.state.lock();
        let entry = state
            .buffers
            .get_mut(buffer)
            .ok_or_else(|| Error::Device(format!("map of unknown buffer {buffer:?}")))?;
        write(&mut entry.staging);
        self.queue.write_buffer(&entry.buffer, 0, &entry.staging);
        Ok(())
    }

    fn destroy_resource_group(&self, resource_group: ResourceGroupHandle) {
        self.state.lock().bind_groups.remove(resource_group);
    }

    fn destroy_buffer(&self, buffer: BufferHandle) {
        if let Some(entry) = self.state.lock().buffers.remove(buffer) {
            entry.buffer.destroy();
        }
    }
}
