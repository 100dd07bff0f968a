//! Global material properties.
//!
//! Values shared by every material of a renderer context (time, sun
//! direction, quality switches...). The table is created by the renderer
//! context and handed to every consumer explicitly, never reached through a
//! static.

use std::sync::Arc;

use parking_lot::RwLock;

use super::properties::MaterialProperties;
use super::property::{MaterialProperty, PropertyId, PropertyValue};

/// Global material property table shared across threads.
pub type SharedGlobalMaterialProperties = Arc<RwLock<GlobalMaterialProperties>>;

/// Renderer-wide material property values.
#[derive(Debug, Clone, Default)]
pub struct GlobalMaterialProperties {
    properties: MaterialProperties,
}

impl GlobalMaterialProperties {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn into_shared(self) -> SharedGlobalMaterialProperties {
        Arc::new(RwLock::new(self))
    }

    #[inline]
    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&MaterialProperty> {
        self.properties.get(id)
    }

    /// Sets a global value. Returns `true` when it changed.
    #[inline]
    pub fn set_value(&mut self, id: PropertyId, value: PropertyValue) -> bool {
        self.properties.set_value(id, value)
    }

    #[inline]
    pub fn remove(&mut self, id: PropertyId) -> Option<MaterialProperty> {
        self.properties.remove(id)
    }

    #[inline]
    #[must_use]
    pub fn properties(&self) -> &MaterialProperties {
        &self.properties
    }
}
