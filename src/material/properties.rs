//! Sorted material property table.
//!
//! Stored as a `Vec` ordered by property id, so lookups are a binary search
//! and iteration order is deterministic.

use std::sync::Arc;

use parking_lot::RwLock;

use super::property::{MaterialProperty, PropertyId, PropertyUsage, PropertyValue};

/// Material properties shared between a material and the slot that uploads it.
pub type SharedMaterialProperties = Arc<RwLock<MaterialProperties>>;

/// Ordered-by-id set of material properties without duplicate ids.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MaterialProperties {
    properties: Vec<MaterialProperty>,
}

impl MaterialProperties {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    /// Wraps the table for sharing with a buffer slot.
    #[must_use]
    pub fn into_shared(self) -> SharedMaterialProperties {
        Arc::new(RwLock::new(self))
    }

    /// Inserts or replaces the property with the same id.
    pub fn set(&mut self, property: MaterialProperty) {
        match self
            .properties
            .binary_search_by_key(&property.id(), MaterialProperty::id)
        {
            Ok(idx) => self.properties[idx] = property,
            Err(idx) => self.properties.insert(idx, property),
        }
    }

    /// Replaces the value of an existing property, keeping its usage, or
    /// inserts a static value.
    ///
    /// Returns `true` when the stored value changed.
    pub fn set_value(&mut self, id: PropertyId, value: PropertyValue) -> bool {
        match self.properties.binary_search_by_key(&id, MaterialProperty::id) {
            Ok(idx) => {
                let current = self.properties[idx];
                if *current.value() == value {
                    return false;
                }
                self.properties[idx] = MaterialProperty::new(id, current.usage(), value);
                true
            }
            Err(idx) => {
                self.properties
                    .insert(idx, MaterialProperty::new(id, PropertyUsage::StaticValue, value));
                true
            }
        }
    }

    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<&MaterialProperty> {
        self.properties
            .binary_search_by_key(&id, MaterialProperty::id)
            .ok()
            .map(|idx| &self.properties[idx])
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.get(id).is_some()
    }

    pub fn remove(&mut self, id: PropertyId) -> Option<MaterialProperty> {
        self.properties
            .binary_search_by_key(&id, MaterialProperty::id)
            .ok()
            .map(|idx| self.properties.remove(idx))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &MaterialProperty> {
        self.properties.iter()
    }
}

impl FromIterator<MaterialProperty> for MaterialProperties {
    fn from_iter<I: IntoIterator<Item = MaterialProperty>>(iter: I) -> Self {
        let mut result = Self::new();
        for property in iter {
            result.set(property);
        }
        result
    }
}
