//! Shader combination enumeration.
//!
//! Pre-warms pipeline caches by requesting every combination of the
//! boolean / integer shader combination properties a blueprint declares.
//! Each property is one axis of a mixed-radix counter:
//!
//! ```text
//! Bool            -> radix 2        (0, 1)
//! Int             -> radix max + 1  (0 ..= maximum integer value)
//! global property -> resolved, then as above
//! ```
//!
//! Zero is the implicit default of every shader property, so zero digits
//! are left out of the requested property set.

use smallvec::SmallVec;

use super::blueprint_caches::MaterialBlueprintCaches;
use crate::errors::{Error, Result};
use crate::material::{
    GlobalMaterialProperties, MANDATORY_SHADER_PROPERTY, MaterialBlueprint, MaterialProperty,
    PropertyId, PropertyUsage, PropertyValue, ShaderProperties, ValueType,
};

// ─── Mixed Radix Counter ─────────────────────────────────────────────────────

/// Odometer over axes with individual radices.
///
/// Starts at all zeros, increments the first digit and carries into the
/// following ones, and stops once every digit wrapped back to zero. With no
/// axes it yields the single empty combination.
#[derive(Debug, Clone)]
pub struct MixedRadixCounter {
    radices: SmallVec<[u32; 8]>,
    digits: SmallVec<[u32; 8]>,
    exhausted: bool,
}

impl MixedRadixCounter {
    #[must_use]
    pub fn new(radices: impl IntoIterator<Item = u32>) -> Self {
        let radices: SmallVec<[u32; 8]> = radices.into_iter().collect();
        let digits = SmallVec::from_elem(0, radices.len());
        let exhausted = radices.contains(&0);
        Self {
            radices,
            digits,
            exhausted,
        }
    }

    /// Restarts from all zeros.
    pub fn reset(&mut self) {
        self.digits.iter_mut().for_each(|d| *d = 0);
        self.exhausted = self.radices.contains(&0);
    }

    /// Number of combinations a full run yields.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.radices.iter().map(|&r| u64::from(r)).product()
    }

    #[inline]
    #[must_use]
    pub fn radices(&self) -> &[u32] {
        &self.radices
    }
}

impl Iterator for MixedRadixCounter {
    type Item = Vec<u32>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.exhausted {
            return None;
        }
        let current = self.digits.to_vec();

        let mut wrapped = true;
        for (digit, &radix) in self.digits.iter_mut().zip(&self.radices) {
            *digit += 1;
            if *digit < radix {
                wrapped = false;
                break;
            }
            *digit = 0;
        }
        self.exhausted = wrapped;

        Some(current)
    }
}

// ─── Enumerator ──────────────────────────────────────────────────────────────

/// One enumerated shader combination property.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CombinationAxis {
    pub property_id: PropertyId,
    /// Number of values, `0 ..= radix - 1`.
    pub radix: u32,
}

/// Requests cache entries for the shader combinations of one blueprint.
pub struct ShaderCombinationEnumerator<'a> {
    caches: &'a MaterialBlueprintCaches,
    globals: &'a GlobalMaterialProperties,
}

impl<'a> ShaderCombinationEnumerator<'a> {
    #[must_use]
    pub fn new(caches: &'a MaterialBlueprintCaches, globals: &'a GlobalMaterialProperties) -> Self {
        Self { caches, globals }
    }

    /// Axes of the blueprint's shader combination properties, in property
    /// id order. With `mandatory_only`, only mandatory properties.
    pub fn gather_axes(&self, mandatory_only: bool) -> Result<Vec<CombinationAxis>> {
        let blueprint = self.caches.material_blueprint();
        let mut axes = Vec::new();
        for property in blueprint.material_properties().iter() {
            if property.usage() != PropertyUsage::ShaderCombination {
                continue;
            }
            if mandatory_only
                && blueprint.visual_importance(property.id()) != MANDATORY_SHADER_PROPERTY
            {
                continue;
            }
            axes.push(CombinationAxis {
                property_id: property.id(),
                radix: self.axis_radix(blueprint, property)?,
            });
        }
        Ok(axes)
    }

    fn axis_radix(&self, blueprint: &MaterialBlueprint, property: &MaterialProperty) -> Result<u32> {
        let value = match *property.value() {
            PropertyValue::GlobalMaterialPropertyId(global_id) => *self
                .globals
                .get(global_id)
                .or_else(|| blueprint.material_properties().get(global_id))
                .ok_or(Error::UnresolvedProperty {
                    property_id: global_id,
                    usage: PropertyUsage::GlobalReference,
                })?
                .value(),
            value => value,
        };

        match value.value_type() {
            ValueType::Bool => Ok(2),
            ValueType::Int => {
                let maximum = blueprint.maximum_integer_value(property.id());
                Ok(u32::try_from(maximum).map_or(1, |m| m.saturating_add(1)))
            }
            value_type => Err(Error::UnsupportedCombinationValueType {
                property_id: property.id(),
                value_type,
            }),
        }
    }

    /// Requests a cache entry for every combination and returns how many
    /// were requested.
    ///
    /// Requests allow synchronous compilation, so the first (all-default)
    /// combination is compiled right away and later ones can borrow it.
    pub fn enumerate(&self, mandatory_only: bool) -> Result<usize> {
        let axes = self.gather_axes(mandatory_only)?;
        let is_compute = self.caches.material_blueprint().is_compute();

        let mut requested = 0;
        for digits in MixedRadixCounter::new(axes.iter().map(|a| a.radix)) {
            let shader_properties: ShaderProperties = axes
                .iter()
                .zip(digits)
                .filter(|&(_, digit)| digit != 0)
                .map(|(axis, digit)| (axis.property_id, digit as i32))
                .collect();

            if is_compute {
                self.caches.compute().get_cache_by_combination(&shader_properties, true)?;
            } else {
                self.caches.graphics().get_cache_by_combination(&shader_properties, true)?;
            }
            requested += 1;
        }

        log::debug!(
            "Enumerated {requested} shader combinations for blueprint {:#010x}",
            self.caches.material_blueprint().id()
        );
        Ok(requested)
    }
}
