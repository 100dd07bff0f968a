//! Material properties.
//!
//! A property is an id, a usage describing where its value comes from, and a
//! typed value with a fixed GPU byte width. Properties are immutable once
//! constructed; tables replace them wholesale.

use glam::{IVec2, IVec3, IVec4, Mat3, Mat4, Vec2, Vec3, Vec4};

/// Stable 32-bit property id, usually [`string_id`](crate::hash::string_id) of the property name.
pub type PropertyId = u32;

/// Where a property's value comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PropertyUsage {
    #[default]
    Unknown,
    /// Value is embedded in the property itself.
    StaticValue,
    /// Value is looked up in the owning material's properties.
    MaterialReference,
    /// Value is looked up in the global material properties.
    GlobalReference,
    /// Default for a global property, used when the global table lacks it.
    GlobalReferenceFallback,
    /// Property selects a shader variant instead of feeding a buffer.
    ShaderCombination,
}

impl PropertyUsage {
    /// Usages whose value is an id pointing at another property.
    #[inline]
    #[must_use]
    pub fn is_reference(self) -> bool {
        matches!(self, Self::MaterialReference | Self::GlobalReference)
    }
}

/// Value type of a property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueType {
    Unknown,
    Bool,
    Int,
    Int2,
    Int3,
    Int4,
    Float,
    Float2,
    Float3,
    Float4,
    Float3x3,
    Float4x4,
    TextureAssetId,
    GlobalMaterialPropertyId,
}

impl ValueType {
    /// Bytes the value occupies in a uniform buffer.
    ///
    /// Booleans are 32-bit on the GPU.
    #[must_use]
    pub const fn byte_size(self) -> usize {
        match self {
            Self::Unknown => 0,
            Self::Bool
            | Self::Int
            | Self::Float
            | Self::TextureAssetId
            | Self::GlobalMaterialPropertyId => 4,
            Self::Int2 | Self::Float2 => 8,
            Self::Int3 | Self::Float3 => 12,
            Self::Int4 | Self::Float4 => 16,
            Self::Float3x3 => 36,
            Self::Float4x4 => 64,
        }
    }
}

/// A typed property value.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum PropertyValue {
    #[default]
    Unknown,
    Bool(bool),
    Int(i32),
    Int2(IVec2),
    Int3(IVec3),
    Int4(IVec4),
    Float(f32),
    Float2(Vec2),
    Float3(Vec3),
    Float4(Vec4),
    Float3x3(Mat3),
    Float4x4(Mat4),
    TextureAssetId(u32),
    GlobalMaterialPropertyId(PropertyId),
    /// Points at another property holding a value of `value_type`.
    Reference { value_type: ValueType, id: PropertyId },
}

impl PropertyValue {
    /// Type of the value. For references, the type of the referenced value.
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        match self {
            Self::Unknown => ValueType::Unknown,
            Self::Bool(_) => ValueType::Bool,
            Self::Int(_) => ValueType::Int,
            Self::Int2(_) => ValueType::Int2,
            Self::Int3(_) => ValueType::Int3,
            Self::Int4(_) => ValueType::Int4,
            Self::Float(_) => ValueType::Float,
            Self::Float2(_) => ValueType::Float2,
            Self::Float3(_) => ValueType::Float3,
            Self::Float4(_) => ValueType::Float4,
            Self::Float3x3(_) => ValueType::Float3x3,
            Self::Float4x4(_) => ValueType::Float4x4,
            Self::TextureAssetId(_) => ValueType::TextureAssetId,
            Self::GlobalMaterialPropertyId(_) => ValueType::GlobalMaterialPropertyId,
            Self::Reference { value_type, .. } => *value_type,
        }
    }

    #[inline]
    #[must_use]
    pub const fn byte_size(&self) -> usize {
        self.value_type().byte_size()
    }

    /// Writes the GPU representation into `dst`, which must be exactly
    /// [`byte_size`](Self::byte_size) long.
    ///
    /// References and unknown values carry no data and write nothing.
    pub fn write_bytes(&self, dst: &mut [u8]) {
        match self {
            Self::Unknown | Self::Reference { .. } => {}
            Self::Bool(b) => dst.copy_from_slice(bytemuck::bytes_of(&u32::from(*b))),
            Self::Int(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Int2(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Int3(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Int4(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Float(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Float2(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Float3(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Float4(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Float3x3(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::Float4x4(v) => dst.copy_from_slice(bytemuck::bytes_of(v)),
            Self::TextureAssetId(v) | Self::GlobalMaterialPropertyId(v) => {
                dst.copy_from_slice(bytemuck::bytes_of(v));
            }
        }
    }
}

/// A material property.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MaterialProperty {
    id: PropertyId,
    usage: PropertyUsage,
    value: PropertyValue,
}

impl MaterialProperty {
    #[inline]
    #[must_use]
    pub const fn new(id: PropertyId, usage: PropertyUsage, value: PropertyValue) -> Self {
        Self { id, usage, value }
    }

    /// Property with a value embedded in it.
    #[inline]
    #[must_use]
    pub const fn static_value(id: PropertyId, value: PropertyValue) -> Self {
        Self::new(id, PropertyUsage::StaticValue, value)
    }

    /// Layout element reading `referenced_id` from the owning material.
    #[inline]
    #[must_use]
    pub const fn material_reference(
        id: PropertyId,
        value_type: ValueType,
        referenced_id: PropertyId,
    ) -> Self {
        Self::new(
            id,
            PropertyUsage::MaterialReference,
            PropertyValue::Reference {
                value_type,
                id: referenced_id,
            },
        )
    }

    /// Layout element reading `referenced_id` from the global properties.
    #[inline]
    #[must_use]
    pub const fn global_reference(
        id: PropertyId,
        value_type: ValueType,
        referenced_id: PropertyId,
    ) -> Self {
        Self::new(
            id,
            PropertyUsage::GlobalReference,
            PropertyValue::Reference {
                value_type,
                id: referenced_id,
            },
        )
    }

    /// Shader combination property with its default value.
    #[inline]
    #[must_use]
    pub const fn shader_combination(id: PropertyId, value: PropertyValue) -> Self {
        Self::new(id, PropertyUsage::ShaderCombination, value)
    }

    #[inline]
    #[must_use]
    pub const fn id(&self) -> PropertyId {
        self.id
    }

    #[inline]
    #[must_use]
    pub const fn usage(&self) -> PropertyUsage {
        self.usage
    }

    #[inline]
    #[must_use]
    pub const fn value(&self) -> &PropertyValue {
        &self.value
    }

    #[inline]
    #[must_use]
    pub const fn value_type(&self) -> ValueType {
        self.value.value_type()
    }

    /// Referenced property id, for reference usages.
    #[inline]
    #[must_use]
    pub const fn reference_id(&self) -> Option<PropertyId> {
        match self.value {
            PropertyValue::Reference { id, .. } => Some(id),
            _ => None,
        }
    }
}
