//! Render Hardware Interface
//!
//! The narrow slice of the graphics API this crate talks to:
//! uniform buffers, resource groups (bind groups) wrapping them, scoped
//! buffer mapping, and recorded "bind resource group" commands.
//!
//! Two devices are provided:
//! - [`headless::HeadlessDevice`]: CPU memory only, used by tests and
//!   offline tools that pre-bake pipeline caches.
//! - [`wgpu_device::WgpuDevice`] (feature `wgpu`): backed by a real
//!   `wgpu::Device` / `wgpu::Queue`.

pub mod headless;
#[cfg(feature = "wgpu")]
pub mod wgpu_device;

use slotmap::new_key_type;

use crate::errors::Result;

new_key_type! {
    /// Handle to a device uniform buffer.
    pub struct BufferHandle;
    /// Handle to a device resource group (bind group).
    pub struct ResourceGroupHandle;
}

/// Device limits relevant to buffer pooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Capabilities {
    /// Largest uniform buffer that can be bound at once, in bytes.
    pub maximum_uniform_buffer_size: u32,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self {
            maximum_uniform_buffer_size: 64 * 1024,
        }
    }
}

/// Update frequency hint for buffer creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BufferUsage {
    StaticDraw,
    #[default]
    DynamicDraw,
    StreamDraw,
}

/// How a buffer is mapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MapMode {
    /// Whole buffer is rewritten; previous contents are undefined while mapped.
    WriteDiscard,
    /// Only touched bytes change.
    Write,
}

/// Which pipeline family a bind or a cache refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineKind {
    Graphics,
    Compute,
}

/// Graphics API operations consumed by the buffer slot manager.
///
/// Implementations use interior mutability; a device is shared between the
/// render thread and loading code through an `Arc`.
pub trait RenderDevice: Send + Sync {
    fn capabilities(&self) -> Capabilities;

    fn create_uniform_buffer(
        &self,
        size_bytes: u32,
        initial_data: Option<&[u8]>,
        usage: BufferUsage,
    ) -> Result<BufferHandle>;

    fn create_resource_group(
        &self,
        root_parameter_index: u32,
        resources: &[BufferHandle],
    ) -> Result<ResourceGroupHandle>;

    /// Maps `buffer`, hands the mapped bytes to `write`, then unmaps.
    fn map_buffer(
        &self,
        buffer: BufferHandle,
        mode: MapMode,
        write: &mut dyn FnMut(&mut [u8]),
    ) -> Result<()>;

    fn destroy_resource_group(&self, resource_group: ResourceGroupHandle);

    fn destroy_buffer(&self, buffer: BufferHandle);
}

// ─── Command Buffer ──────────────────────────────────────────────────────────

/// A recorded command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    SetGraphicsResourceGroup {
        root_parameter_index: u32,
        resource_group: ResourceGroupHandle,
    },
    SetComputeResourceGroup {
        root_parameter_index: u32,
        resource_group: ResourceGroupHandle,
    },
}

/// Backend-agnostic command list, replayed by the device that owns the
/// referenced resource groups.
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    commands: Vec<Command>,
}

impl CommandBuffer {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_graphics_resource_group(
        &mut self,
        root_parameter_index: u32,
        resource_group: ResourceGroupHandle,
    ) {
        self.commands.push(Command::SetGraphicsResourceGroup {
            root_parameter_index,
            resource_group,
        });
    }

    pub fn set_compute_resource_group(
        &mut self,
        root_parameter_index: u32,
        resource_group: ResourceGroupHandle,
    ) {
        self.commands.push(Command::SetComputeResourceGroup {
            root_parameter_index,
            resource_group,
        });
    }

    /// Emits the bind command matching `kind`.
    pub fn set_resource_group(
        &mut self,
        kind: PipelineKind,
        root_parameter_index: u32,
        resource_group: ResourceGroupHandle,
    ) {
        match kind {
            PipelineKind::Graphics => {
                self.set_graphics_resource_group(root_parameter_index, resource_group);
            }
            PipelineKind::Compute => {
                self.set_compute_resource_group(root_parameter_index, resource_group);
            }
        }
    }

    #[inline]
    #[must_use]
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.commands.clear();
    }
}
