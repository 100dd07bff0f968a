//! Material blueprints.
//!
//! A blueprint is the loaded, immutable description of a family of
//! materials: which shaders it runs, which uniform buffers it feeds, which
//! material properties it declares and how important each shader property
//! is visually. Loading and validation happen elsewhere; everything here is
//! assumed to be consistent authoring data.

use std::sync::Arc;

use xxhash_rust::xxh3::xxh3_64;

use super::properties::MaterialProperties;
use super::property::{MaterialProperty, PropertyId};
use super::shader_properties::ShaderProperties;
use crate::buffer::packing::packed_size;

/// Visual importance marking a shader property that must never be dropped
/// when searching for a fallback pipeline.
pub const MANDATORY_SHADER_PROPERTY: i32 = i32::MAX;

// ─── Shader Blueprints ───────────────────────────────────────────────────────

/// Graphics pipeline shader stages, in signature folding order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GraphicsShaderStage {
    Vertex,
    TessellationControl,
    TessellationEvaluation,
    Geometry,
    Fragment,
}

impl GraphicsShaderStage {
    pub const COUNT: usize = 5;

    pub const ALL: [Self; Self::COUNT] = [
        Self::Vertex,
        Self::TessellationControl,
        Self::TessellationEvaluation,
        Self::Geometry,
        Self::Fragment,
    ];

    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }
}

/// Loaded shader blueprint: an id plus the shader properties its source
/// actually reads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShaderBlueprint {
    id: u32,
    referenced_properties: ShaderProperties,
}

impl ShaderBlueprint {
    #[must_use]
    pub fn new(id: u32, referenced: impl IntoIterator<Item = PropertyId>) -> Self {
        Self {
            id,
            referenced_properties: referenced.into_iter().map(|id| (id, 0)).collect(),
        }
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    /// Whether the shader source reads shader property `id`.
    #[inline]
    #[must_use]
    pub fn references(&self, id: PropertyId) -> bool {
        self.referenced_properties.contains(id)
    }

    #[inline]
    #[must_use]
    pub fn referenced_properties(&self) -> &ShaderProperties {
        &self.referenced_properties
    }
}

/// Shaders of a blueprint. Graphics and compute are mutually exclusive.
#[derive(Debug, Clone)]
pub enum PipelineShaders {
    Graphics([Option<Arc<ShaderBlueprint>>; GraphicsShaderStage::COUNT]),
    Compute(Arc<ShaderBlueprint>),
}

impl PipelineShaders {
    /// Graphics shaders from `(stage, shader)` pairs; missing stages stay unbound.
    #[must_use]
    pub fn graphics(
        stages: impl IntoIterator<Item = (GraphicsShaderStage, Arc<ShaderBlueprint>)>,
    ) -> Self {
        let mut bound: [Option<Arc<ShaderBlueprint>>; GraphicsShaderStage::COUNT] =
            Default::default();
        for (stage, shader) in stages {
            bound[stage.index()] = Some(shader);
        }
        Self::Graphics(bound)
    }
}

// ─── Uniform Buffer Layout ───────────────────────────────────────────────────

/// What a uniform buffer is fed with.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UniformBufferUsage {
    Unknown,
    Pass,
    Material,
    Instance,
}

/// Element layout of a uniform buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct UniformBufferLayout {
    usage: UniformBufferUsage,
    root_parameter_index: u32,
    properties: Vec<MaterialProperty>,
    number_of_elements: u32,
    element_stride_bytes: u32,
}

impl UniformBufferLayout {
    /// Layout with a device-reported element stride.
    #[must_use]
    pub fn new(
        usage: UniformBufferUsage,
        root_parameter_index: u32,
        properties: Vec<MaterialProperty>,
        number_of_elements: u32,
        element_stride_bytes: u32,
    ) -> Self {
        debug_assert!(element_stride_bytes > 0, "element stride must be non-zero");
        Self {
            usage,
            root_parameter_index,
            properties,
            number_of_elements,
            element_stride_bytes,
        }
    }

    /// Layout whose stride is the packed element size rounded up to 16 bytes.
    #[must_use]
    pub fn with_packed_stride(
        usage: UniformBufferUsage,
        root_parameter_index: u32,
        properties: Vec<MaterialProperty>,
        number_of_elements: u32,
    ) -> Self {
        let stride = (packed_size(&properties).max(1) as u32).next_multiple_of(16);
        Self::new(usage, root_parameter_index, properties, number_of_elements, stride)
    }

    #[inline]
    #[must_use]
    pub fn usage(&self) -> UniformBufferUsage {
        self.usage
    }

    #[inline]
    #[must_use]
    pub fn root_parameter_index(&self) -> u32 {
        self.root_parameter_index
    }

    #[inline]
    #[must_use]
    pub fn properties(&self) -> &[MaterialProperty] {
        &self.properties
    }

    #[inline]
    #[must_use]
    pub fn number_of_elements(&self) -> u32 {
        self.number_of_elements
    }

    #[inline]
    #[must_use]
    pub fn element_stride_bytes(&self) -> u32 {
        self.element_stride_bytes
    }

    /// `element_stride_bytes * number_of_elements`.
    #[inline]
    #[must_use]
    pub fn total_bytes(&self) -> u32 {
        self.element_stride_bytes * self.number_of_elements
    }
}

// ─── Pipeline State ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PrimitiveTopology {
    PointList,
    LineList,
    LineStrip,
    #[default]
    TriangleList,
    TriangleStrip,
    PatchList,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CullMode {
    None,
    Front,
    #[default]
    Back,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum CompareFunction {
    Never,
    Less,
    Equal,
    LessEqual,
    Greater,
    NotEqual,
    #[default]
    GreaterEqual,
    Always,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    DstAlpha,
    OneMinusDstAlpha,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BlendOperation {
    Add,
    Subtract,
    ReverseSubtract,
    Min,
    Max,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlendState {
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    pub operation: BlendOperation,
}

impl BlendState {
    pub const ALPHA_BLENDING: Self = Self {
        src_factor: BlendFactor::SrcAlpha,
        dst_factor: BlendFactor::OneMinusSrcAlpha,
        operation: BlendOperation::Add,
    };
}

/// Fixed-function state of a graphics pipeline that affects its identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct GraphicsPipelineState {
    pub topology: PrimitiveTopology,
    pub cull_mode: CullMode,
    pub front_face_ccw: bool,
    pub depth_test: bool,
    pub depth_write: bool,
    pub depth_compare: CompareFunction,
    pub blend: Option<BlendState>,
    pub sample_count: u32,
    pub alpha_to_coverage: bool,
}

impl Default for GraphicsPipelineState {
    fn default() -> Self {
        Self {
            topology: PrimitiveTopology::default(),
            cull_mode: CullMode::default(),
            front_face_ccw: false,
            depth_test: true,
            depth_write: true,
            depth_compare: CompareFunction::default(),
            blend: None,
            sample_count: 1,
            alpha_to_coverage: false,
        }
    }
}

impl GraphicsPipelineState {
    const SERIALIZED_WORDS: usize = 11;

    /// Platform-independent serialization (little-endian 32-bit words).
    #[must_use]
    pub fn serialize(&self) -> [u8; Self::SERIALIZED_WORDS * 4] {
        let (blend_enabled, src, dst, op) = match self.blend {
            Some(b) => (1, b.src_factor as u32, b.dst_factor as u32, b.operation as u32),
            None => (0, 0, 0, 0),
        };
        let words: [u32; Self::SERIALIZED_WORDS] = [
            self.topology as u32,
            self.cull_mode as u32,
            u32::from(self.front_face_ccw),
            u32::from(self.depth_test) | (u32::from(self.depth_write) << 1),
            self.depth_compare as u32,
            blend_enabled,
            src,
            dst,
            op,
            self.sample_count,
            u32::from(self.alpha_to_coverage),
        ];

        let mut bytes = [0u8; Self::SERIALIZED_WORDS * 4];
        for (chunk, word) in bytes.chunks_exact_mut(4).zip(words) {
            chunk.copy_from_slice(&word.to_le_bytes());
        }
        bytes
    }

    /// 32-bit hash of the serialized state, folded into graphics signatures.
    #[must_use]
    pub fn serialized_hash(&self) -> u32 {
        xxh3_64(&self.serialize()) as u32
    }
}

// ─── Material Blueprint ──────────────────────────────────────────────────────

/// Loaded material blueprint.
#[derive(Debug, Clone)]
pub struct MaterialBlueprint {
    id: u32,
    shaders: PipelineShaders,
    uniform_buffers: Vec<UniformBufferLayout>,
    material_properties: MaterialProperties,
    visual_importance: ShaderProperties,
    maximum_integer_values: ShaderProperties,
    pipeline_state: GraphicsPipelineState,
}

impl MaterialBlueprint {
    #[must_use]
    pub fn new(id: u32, shaders: PipelineShaders) -> Self {
        Self {
            id,
            shaders,
            uniform_buffers: Vec::new(),
            material_properties: MaterialProperties::new(),
            visual_importance: ShaderProperties::new(),
            maximum_integer_values: ShaderProperties::new(),
            pipeline_state: GraphicsPipelineState::default(),
        }
    }

    #[must_use]
    pub fn with_uniform_buffer(mut self, layout: UniformBufferLayout) -> Self {
        self.uniform_buffers.push(layout);
        self
    }

    #[must_use]
    pub fn with_material_property(mut self, property: MaterialProperty) -> Self {
        self.material_properties.set(property);
        self
    }

    /// Declares a shader property with its visual importance and, for
    /// integer properties, its maximum value.
    #[must_use]
    pub fn with_shader_property(
        mut self,
        id: PropertyId,
        visual_importance: i32,
        maximum_integer_value: Option<i32>,
    ) -> Self {
        self.visual_importance.set(id, visual_importance);
        if let Some(max) = maximum_integer_value {
            self.maximum_integer_values.set(id, max);
        }
        self
    }

    #[must_use]
    pub fn with_pipeline_state(mut self, pipeline_state: GraphicsPipelineState) -> Self {
        self.pipeline_state = pipeline_state;
        self
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> u32 {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn shaders(&self) -> &PipelineShaders {
        &self.shaders
    }

    #[inline]
    #[must_use]
    pub fn is_compute(&self) -> bool {
        matches!(self.shaders, PipelineShaders::Compute(_))
    }

    #[inline]
    #[must_use]
    pub fn graphics_shader(&self, stage: GraphicsShaderStage) -> Option<&Arc<ShaderBlueprint>> {
        match &self.shaders {
            PipelineShaders::Graphics(stages) => stages[stage.index()].as_ref(),
            PipelineShaders::Compute(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn compute_shader(&self) -> Option<&Arc<ShaderBlueprint>> {
        match &self.shaders {
            PipelineShaders::Compute(shader) => Some(shader),
            PipelineShaders::Graphics(_) => None,
        }
    }

    #[inline]
    #[must_use]
    pub fn uniform_buffers(&self) -> &[UniformBufferLayout] {
        &self.uniform_buffers
    }

    /// The uniform buffer fed from per-material data, if any.
    #[must_use]
    pub fn material_uniform_buffer(&self) -> Option<&UniformBufferLayout> {
        self.uniform_buffers
            .iter()
            .find(|layout| layout.usage() == UniformBufferUsage::Material)
    }

    #[inline]
    #[must_use]
    pub fn material_properties(&self) -> &MaterialProperties {
        &self.material_properties
    }

    #[inline]
    #[must_use]
    pub fn pipeline_state(&self) -> &GraphicsPipelineState {
        &self.pipeline_state
    }

    #[inline]
    #[must_use]
    pub fn serialized_pipeline_state_hash(&self) -> u32 {
        self.pipeline_state.serialized_hash()
    }

    /// Visual importance of a shader property; unknown properties read as 0.
    #[inline]
    #[must_use]
    pub fn visual_importance(&self, id: PropertyId) -> i32 {
        self.visual_importance.get_or(id, 0)
    }

    /// Largest value an integer shader property can take; unknown reads as 0.
    #[inline]
    #[must_use]
    pub fn maximum_integer_value(&self, id: PropertyId) -> i32 {
        self.maximum_integer_values.get_or(id, 0)
    }

    /// Whether the blueprint declares shader property `id`.
    #[inline]
    #[must_use]
    pub fn knows_shader_property(&self, id: PropertyId) -> bool {
        self.visual_importance.contains(id)
    }

    /// Drops zero values and properties this blueprint does not declare.
    ///
    /// Zero is every shader property's implicit default, so the optimized
    /// set is the canonical form signatures are computed from.
    #[must_use]
    pub fn optimize_shader_properties(&self, shader_properties: &ShaderProperties) -> ShaderProperties {
        let mut optimized = shader_properties.clone();
        optimized.retain(|p| p.value != 0 && self.knows_shader_property(p.id));
        optimized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn compute_blueprint() -> MaterialBlueprint {
        MaterialBlueprint::new(1, PipelineShaders::Compute(Arc::new(ShaderBlueprint::new(2, []))))
            .with_shader_property(10, 1, None)
            .with_shader_property(20, MANDATORY_SHADER_PROPERTY, Some(3))
    }

    #[test]
    fn test_optimize_strips_zero_and_unknown() {
        let blueprint = compute_blueprint();
        let props: ShaderProperties = [(10, 0), (20, 2), (99, 1)].into_iter().collect();
        let optimized = blueprint.optimize_shader_properties(&props);
        assert_eq!(optimized.len(), 1);
        assert_eq!(optimized.get(20), Some(2));
    }

    #[test]
    fn test_pipeline_state_hash_changes_with_state() {
        let opaque = GraphicsPipelineState::default();
        let blended = GraphicsPipelineState {
            blend: Some(BlendState::ALPHA_BLENDING),
            depth_write: false,
            ..opaque
        };
        assert_eq!(opaque.serialized_hash(), GraphicsPipelineState::default().serialized_hash());
        assert_ne!(opaque.serialized_hash(), blended.serialized_hash());
    }

    #[test]
    fn test_packed_stride_rounds_to_16() {
        use super::super::property::{PropertyValue, ValueType};
        let layout = UniformBufferLayout::with_packed_stride(
            UniformBufferUsage::Material,
            0,
            vec![
                MaterialProperty::static_value(1, PropertyValue::Float(1.0)),
                MaterialProperty::material_reference(2, ValueType::Float4, 3),
            ],
            8,
        );
        // 4 bytes, pad to 16, then 16 bytes
        assert_eq!(layout.element_stride_bytes(), 32);
        assert_eq!(layout.total_bytes(), 256);
        assert_eq!(compute_blueprint().maximum_integer_value(20), 3);
    }
}
