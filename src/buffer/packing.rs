//! Constant buffer packing.
//!
//! Writes one element of a uniform buffer layout into host memory following
//! GPU constant buffer packing rules: a value never straddles a 16-byte
//! boundary. When the next value would cross one, the write position skips
//! ahead to the boundary first.
//!
//! ```text
//! sizes [4, 16, 4]      -> offsets [0, 16, 32]
//! sizes [4, 4, 4, 4, 4] -> offsets [0, 4, 8, 12, 16]
//! sizes [12, 8, 12]     -> offsets [0, 16, 32]
//! ```

use crate::errors::{Error, Result};
use crate::material::{
    GlobalMaterialProperties, MaterialProperties, MaterialProperty, PropertyId, PropertyUsage,
    PropertyValue,
};

/// Size of one constant buffer register, the packing unit.
pub const PACKING_CHUNK_BYTES: usize = 16;

/// Write position tracker implementing the packing rules.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PackingCursor {
    offset: usize,
    bytes_in_chunk: usize,
}

impl PackingCursor {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves `size` bytes and returns the offset they start at.
    pub fn place(&mut self, size: usize) -> usize {
        if self.bytes_in_chunk != 0 && self.bytes_in_chunk + size > PACKING_CHUNK_BYTES {
            self.offset += PACKING_CHUNK_BYTES - self.bytes_in_chunk;
            self.bytes_in_chunk = 0;
        }
        self.bytes_in_chunk += size % PACKING_CHUNK_BYTES;
        let start = self.offset;
        self.offset += size;
        start
    }

    /// End of the last placed value.
    #[inline]
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Offsets the properties of an element layout are written at.
#[must_use]
pub fn property_offsets(properties: &[MaterialProperty]) -> Vec<usize> {
    let mut cursor = PackingCursor::new();
    properties
        .iter()
        .map(|p| cursor.place(p.value_type().byte_size()))
        .collect()
}

/// Bytes one packed element occupies (without trailing padding).
#[must_use]
pub fn packed_size(properties: &[MaterialProperty]) -> usize {
    let mut cursor = PackingCursor::new();
    for property in properties {
        cursor.place(property.value_type().byte_size());
    }
    cursor.offset()
}

/// Callback for material references the material itself cannot satisfy.
pub type UnresolvedPropertyFn = dyn Fn(PropertyId) -> Option<PropertyValue> + Send + Sync;

/// Resolves layout properties to concrete values.
pub struct PropertyResolver<'a> {
    material: &'a MaterialProperties,
    globals: &'a GlobalMaterialProperties,
    blueprint_properties: &'a MaterialProperties,
    unresolved: Option<&'a UnresolvedPropertyFn>,
}

impl<'a> PropertyResolver<'a> {
    #[must_use]
    pub fn new(
        material: &'a MaterialProperties,
        globals: &'a GlobalMaterialProperties,
        blueprint_properties: &'a MaterialProperties,
    ) -> Self {
        Self {
            material,
            globals,
            blueprint_properties,
            unresolved: None,
        }
    }

    #[must_use]
    pub fn with_unresolved(mut self, unresolved: Option<&'a UnresolvedPropertyFn>) -> Self {
        self.unresolved = unresolved;
        self
    }

    /// Value a layout property contributes to the buffer.
    pub fn resolve(&self, property: &MaterialProperty) -> Result<PropertyValue> {
        let usage = property.usage();
        let value = match (usage, property.reference_id()) {
            (PropertyUsage::MaterialReference, Some(referenced)) => self
                .material
                .get(referenced)
                .map(|p| *p.value())
                .or_else(|| self.unresolved.and_then(|f| f(referenced)))
                .ok_or(Error::UnresolvedProperty {
                    property_id: referenced,
                    usage,
                })?,
            (PropertyUsage::GlobalReference, Some(referenced)) => self
                .globals
                .get(referenced)
                .or_else(|| self.blueprint_properties.get(referenced))
                .map(|p| *p.value())
                .ok_or(Error::UnresolvedProperty {
                    property_id: referenced,
                    usage,
                })?,
            (usage, None) if !usage.is_reference() => *property.value(),
            _ => {
                return Err(Error::UnsupportedPropertyUsage {
                    property_id: property.id(),
                    usage,
                });
            }
        };

        if value.value_type() != property.value_type() {
            return Err(Error::PropertyTypeMismatch {
                property_id: property.id(),
                expected: property.value_type(),
                found: value.value_type(),
            });
        }
        Ok(value)
    }
}

/// Packs one element into `dst` and returns the number of bytes spanned.
///
/// `dst` starts at the element (`element_stride * slot_index` into the
/// buffer). Bytes skipped as padding are left untouched.
pub fn write_element(
    dst: &mut [u8],
    properties: &[MaterialProperty],
    resolver: &PropertyResolver<'_>,
) -> Result<usize> {
    let mut cursor = PackingCursor::new();
    for property in properties {
        let size = property.value_type().byte_size();
        let start = cursor.place(size);
        let value = resolver.resolve(property)?;
        let available = dst.len();
        let region = dst
            .get_mut(start..start + size)
            .ok_or(Error::LayoutOverflow {
                required: start + size,
                available,
            })?;
        value.write_bytes(region);
    }
    Ok(cursor.offset())
}
