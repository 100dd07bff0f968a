//! Material uniform buffers.
//!
//! - [`packing`]: constant buffer packing of one layout element
//! - [`slot_pool`]: one pooled uniform buffer with a free index stack
//! - [`slot_manager`]: slot assignment, dirty tracking, uploads and binds

pub mod packing;
pub mod slot_manager;
pub mod slot_pool;

pub use packing::{PackingCursor, PropertyResolver, packed_size, property_offsets, write_element};
pub use slot_manager::{BufferSlotManager, MaterialBufferSlot, PoolId, SlotKey};
pub use slot_pool::SlotPool;
