//! Shader property set.
//!
//! An ordered-by-id list of `(property id, i32 value)` pairs. The order is
//! load-bearing: signatures hash the pairs in sequence, so two sets built in
//! different insertion orders must end up byte-identical.
//!
//! # Usage
//!
//! ```rust
//! use myth_material_cache::ShaderProperties;
//!
//! let mut properties = ShaderProperties::new();
//! properties.set(20, 1);
//! properties.set(10, 3);
//!
//! assert_eq!(properties.get(10), Some(3));
//! assert_eq!(properties.iter().map(|p| p.id).collect::<Vec<_>>(), vec![10, 20]);
//! ```

use super::property::PropertyId;

/// Persisted record layout of one shader property: `{id: u32, value: i32}`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, bytemuck::Pod, bytemuck::Zeroable)]
pub struct ShaderProperty {
    pub id: PropertyId,
    pub value: i32,
}

impl ShaderProperty {
    #[inline]
    #[must_use]
    pub const fn new(id: PropertyId, value: i32) -> Self {
        Self { id, value }
    }
}

/// Sorted shader property set without duplicate ids.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct ShaderProperties {
    properties: Vec<ShaderProperty>,
}

impl ShaderProperties {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            properties: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            properties: Vec::with_capacity(capacity),
        }
    }

    /// Builds a set from records that may be unsorted or contain duplicates;
    /// later duplicates win.
    #[must_use]
    pub fn from_records(records: &[ShaderProperty]) -> Self {
        let mut result = Self::with_capacity(records.len());
        for record in records {
            result.set(record.id, record.value);
        }
        result
    }

    /// Inserts or updates a value (maintains sorted order).
    pub fn set(&mut self, id: PropertyId, value: i32) {
        match self.properties.binary_search_by_key(&id, |p| p.id) {
            Ok(idx) => self.properties[idx].value = value,
            Err(idx) => self.properties.insert(idx, ShaderProperty::new(id, value)),
        }
    }

    #[must_use]
    pub fn get(&self, id: PropertyId) -> Option<i32> {
        self.properties
            .binary_search_by_key(&id, |p| p.id)
            .ok()
            .map(|idx| self.properties[idx].value)
    }

    /// Value of `id`, or `default` when absent.
    #[inline]
    #[must_use]
    pub fn get_or(&self, id: PropertyId, default: i32) -> i32 {
        self.get(id).unwrap_or(default)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, id: PropertyId) -> bool {
        self.properties.binary_search_by_key(&id, |p| p.id).is_ok()
    }

    pub fn remove(&mut self, id: PropertyId) -> bool {
        if let Ok(idx) = self.properties.binary_search_by_key(&id, |p| p.id) {
            self.properties.remove(idx);
            true
        } else {
            false
        }
    }

    /// Removes the pair at `index` (position in iteration order).
    pub fn remove_at(&mut self, index: usize) -> ShaderProperty {
        self.properties.remove(index)
    }

    /// Keeps only pairs for which `keep` returns `true`.
    pub fn retain(&mut self, mut keep: impl FnMut(&ShaderProperty) -> bool) {
        self.properties.retain(|p| keep(p));
    }

    #[inline]
    pub fn clear(&mut self) {
        self.properties.clear();
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
    pub fn iter(&self) -> impl Iterator<Item = &ShaderProperty> {
        self.properties.iter()
    }

    /// Pairs as persisted records, in sorted order.
    #[inline]
    #[must_use]
    pub fn as_records(&self) -> &[ShaderProperty] {
        &self.properties
    }
}

impl FromIterator<(PropertyId, i32)> for ShaderProperties {
    fn from_iter<I: IntoIterator<Item = (PropertyId, i32)>>(iter: I) -> Self {
        let mut result = Self::new();
        for (id, value) in iter {
            result.set(id, value);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insertion_order_independent() {
        let a: ShaderProperties = [(3, 1), (1, 2), (2, 3)].into_iter().collect();
        let b: ShaderProperties = [(2, 3), (3, 1), (1, 2)].into_iter().collect();
        assert_eq!(a, b);
        assert_eq!(a.as_records()[0], ShaderProperty::new(1, 2));
    }

    #[test]
    fn test_set_overwrites() {
        let mut props = ShaderProperties::new();
        props.set(7, 1);
        props.set(7, 4);
        assert_eq!(props.len(), 1);
        assert_eq!(props.get(7), Some(4));
        assert_eq!(props.get_or(8, -1), -1);
    }

    #[test]
    fn test_remove() {
        let mut props: ShaderProperties = [(1, 1), (2, 2)].into_iter().collect();
        assert!(props.remove(1));
        assert!(!props.remove(1));
        assert_eq!(props.len(), 1);
        assert_eq!(props.remove_at(0), ShaderProperty::new(2, 2));
        assert!(props.is_empty());
    }

    #[test]
    fn test_from_records_sorts() {
        let records = [ShaderProperty::new(9, 1), ShaderProperty::new(4, 2)];
        let props = ShaderProperties::from_records(&records);
        assert_eq!(props.iter().map(|p| p.id).collect::<Vec<_>>(), vec![4, 9]);
    }
}
