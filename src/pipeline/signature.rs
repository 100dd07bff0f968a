//! Pipeline Signatures
//!
//! A signature is the 32-bit identity of "this blueprint, this pipeline
//! state and this shader property combination". It is the key of the
//! pipeline state caches and is persisted indirectly through the property
//! sets it was built from, so it must be stable across runs.
//!
//! # Folding order
//!
//! ```text
//! graphics: FNV(blueprint id) -> pipeline state hash -> stage ids (vertex .. fragment)
//! compute:  FNV(blueprint id) -> compute stage id
//! ```
//!
//! Unbound graphics stages are skipped. A stage id ("shader combination
//! id") folds the shader blueprint id and then only the shader properties
//! the shader actually references, in ascending id order, so properties a
//! shader never reads do not fragment the cache.

use crate::errors::Result;
use crate::hash::Fnv1a32;
use crate::material::{GraphicsShaderStage, MaterialBlueprint, ShaderBlueprint, ShaderProperties};
use crate::pipeline::cache::PipelineObject;
use crate::pipeline::compiler::PipelineBackend;
use crate::rhi::PipelineKind;

/// Shader combination id of one shader stage.
#[must_use]
pub fn generate_shader_combination_id(
    shader_blueprint: &ShaderBlueprint,
    shader_properties: &ShaderProperties,
) -> u32 {
    let mut hash = Fnv1a32::seeded(shader_blueprint.id());
    for property in shader_properties.iter() {
        if shader_blueprint.references(property.id) {
            hash.write_u32(property.id);
            hash.write_i32(property.value);
        }
    }
    hash.finish()
}

/// Common interface of graphics and compute signatures.
pub trait PipelineSignature: Clone + Send + Sync + 'static {
    /// Pipeline family the signature describes.
    const KIND: PipelineKind;

    /// Computes the signature of `shader_properties` (expected to be
    /// optimized already) for `blueprint`.
    fn new(blueprint: &MaterialBlueprint, shader_properties: ShaderProperties) -> Self;

    fn signature_id(&self) -> u32;

    fn material_blueprint_id(&self) -> u32;

    fn shader_properties(&self) -> &ShaderProperties;

    /// Builds the pipeline object this signature describes.
    fn create_pipeline(
        &self,
        backend: &dyn PipelineBackend,
        blueprint: &MaterialBlueprint,
    ) -> Result<PipelineObject>;
}

// ─── Graphics ────────────────────────────────────────────────────────────────

/// Signature of a graphics pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphicsPipelineSignature {
    material_blueprint_id: u32,
    serialized_pipeline_state_hash: u32,
    shader_properties: ShaderProperties,
    signature_id: u32,
    shader_combination_ids: [Option<u32>; GraphicsShaderStage::COUNT],
}

impl GraphicsPipelineSignature {
    #[inline]
    #[must_use]
    pub fn serialized_pipeline_state_hash(&self) -> u32 {
        self.serialized_pipeline_state_hash
    }

    /// Combination id of `stage`, `None` when no shader is bound there.
    #[inline]
    #[must_use]
    pub fn shader_combination_id(&self, stage: GraphicsShaderStage) -> Option<u32> {
        self.shader_combination_ids[stage.index()]
    }
}

impl PipelineSignature for GraphicsPipelineSignature {
    const KIND: PipelineKind = PipelineKind::Graphics;

    fn new(blueprint: &MaterialBlueprint, shader_properties: ShaderProperties) -> Self {
        let serialized_pipeline_state_hash = blueprint.serialized_pipeline_state_hash();
        let mut hash = Fnv1a32::seeded(blueprint.id()).with_u32(serialized_pipeline_state_hash);

        let mut shader_combination_ids = [None; GraphicsShaderStage::COUNT];
        for stage in GraphicsShaderStage::ALL {
            if let Some(shader) = blueprint.graphics_shader(stage) {
                let id = generate_shader_combination_id(shader, &shader_properties);
                hash.write_u32(id);
                shader_combination_ids[stage.index()] = Some(id);
            }
        }

        Self {
            material_blueprint_id: blueprint.id(),
            serialized_pipeline_state_hash,
            shader_properties,
            signature_id: hash.finish(),
            shader_combination_ids,
        }
    }

    #[inline]
    fn signature_id(&self) -> u32 {
        self.signature_id
    }

    #[inline]
    fn material_blueprint_id(&self) -> u32 {
        self.material_blueprint_id
    }

    #[inline]
    fn shader_properties(&self) -> &ShaderProperties {
        &self.shader_properties
    }

    fn create_pipeline(
        &self,
        backend: &dyn PipelineBackend,
        blueprint: &MaterialBlueprint,
    ) -> Result<PipelineObject> {
        backend.create_graphics_pipeline(blueprint, self)
    }
}

// ─── Compute ─────────────────────────────────────────────────────────────────

/// Signature of a compute pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComputePipelineSignature {
    material_blueprint_id: u32,
    shader_properties: ShaderProperties,
    signature_id: u32,
    shader_combination_id: Option<u32>,
}

impl ComputePipelineSignature {
    /// Combination id of the compute shader, `None` for graphics blueprints.
    #[inline]
    #[must_use]
    pub fn shader_combination_id(&self) -> Option<u32> {
        self.shader_combination_id
    }
}

impl PipelineSignature for ComputePipelineSignature {
    const KIND: PipelineKind = PipelineKind::Compute;

    fn new(blueprint: &MaterialBlueprint, shader_properties: ShaderProperties) -> Self {
        let mut hash = Fnv1a32::seeded(blueprint.id());
        let shader_combination_id = blueprint
            .compute_shader()
            .map(|shader| generate_shader_combination_id(shader, &shader_properties));
        if let Some(id) = shader_combination_id {
            hash.write_u32(id);
        }

        Self {
            material_blueprint_id: blueprint.id(),
            shader_properties,
            signature_id: hash.finish(),
            shader_combination_id,
        }
    }

    #[inline]
    fn signature_id(&self) -> u32 {
        self.signature_id
    }

    #[inline]
    fn material_blueprint_id(&self) -> u32 {
        self.material_blueprint_id
    }

    #[inline]
    fn shader_properties(&self) -> &ShaderProperties {
        &self.shader_properties
    }

    fn create_pipeline(
        &self,
        backend: &dyn PipelineBackend,
        blueprint: &MaterialBlueprint,
    ) -> Result<PipelineObject> {
        backend.create_compute_pipeline(blueprint, self)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::material::PipelineShaders;

    #[test]
    fn test_unreferenced_property_is_ignored() {
        let shader = ShaderBlueprint::new(5, [1]);
        let a: ShaderProperties = [(1, 1)].into_iter().collect();
        let b: ShaderProperties = [(1, 1), (2, 7)].into_iter().collect();
        assert_eq!(
            generate_shader_combination_id(&shader, &a),
            generate_shader_combination_id(&shader, &b)
        );
    }

    #[test]
    fn test_unbound_stages_are_skipped() {
        let vertex = Arc::new(ShaderBlueprint::new(10, []));
        let blueprint = MaterialBlueprint::new(
            3,
            PipelineShaders::graphics([(GraphicsShaderStage::Vertex, vertex)]),
        );
        let signature = GraphicsPipelineSignature::new(&blueprint, ShaderProperties::new());

        let vertex_id = Fnv1a32::seeded(10).finish();
        let expected = Fnv1a32::seeded(3)
            .with_u32(blueprint.serialized_pipeline_state_hash())
            .with_u32(vertex_id)
            .finish();
        assert_eq!(signature.signature_id(), expected);
        assert_eq!(
            signature.shader_combination_id(GraphicsShaderStage::Vertex),
            Some(vertex_id)
        );
        assert_eq!(signature.shader_combination_id(GraphicsShaderStage::Fragment), None);
    }
}
