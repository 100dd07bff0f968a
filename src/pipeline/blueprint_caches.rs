//! Graphics and compute pipeline caches of one material blueprint.

use std::io::{Read, Write};
use std::sync::Arc;

use super::combination::ShaderCombinationEnumerator;
use super::compiler::PipelineStateCompiler;
use super::manager::{ComputePipelineStateCacheManager, GraphicsPipelineStateCacheManager};
use crate::errors::Result;
use crate::material::{GlobalMaterialProperties, MaterialBlueprint};

/// Both cache managers of a blueprint, persisted as one stream.
pub struct MaterialBlueprintCaches {
    blueprint: Arc<MaterialBlueprint>,
    graphics: GraphicsPipelineStateCacheManager,
    compute: ComputePipelineStateCacheManager,
}

impl MaterialBlueprintCaches {
    #[must_use]
    pub fn new(blueprint: Arc<MaterialBlueprint>, compiler: Arc<PipelineStateCompiler>) -> Self {
        Self {
            graphics: GraphicsPipelineStateCacheManager::new(
                Arc::clone(&blueprint),
                Arc::clone(&compiler),
            ),
            compute: ComputePipelineStateCacheManager::new(Arc::clone(&blueprint), compiler),
            blueprint,
        }
    }

    #[inline]
    #[must_use]
    pub fn material_blueprint(&self) -> &Arc<MaterialBlueprint> {
        &self.blueprint
    }

    #[inline]
    #[must_use]
    pub fn graphics(&self) -> &GraphicsPipelineStateCacheManager {
        &self.graphics
    }

    #[inline]
    #[must_use]
    pub fn compute(&self) -> &ComputePipelineStateCacheManager {
        &self.compute
    }

    #[must_use]
    pub fn needs_saving(&self) -> bool {
        self.graphics.needs_saving() || self.compute.needs_saving()
    }

    pub fn clear_caches(&self) {
        self.graphics.clear_cache();
        self.compute.clear_cache();
    }

    /// Writes the graphics blob followed by the compute blob.
    pub fn save_caches<W: Write + ?Sized>(&self, writer: &mut W) -> Result<()> {
        self.graphics.save_cache(writer)?;
        self.compute.save_cache(writer)
    }

    /// Reads the graphics blob followed by the compute blob and compiles
    /// every entry. Returns the number of entries added.
    pub fn load_caches<R: Read + ?Sized>(&self, reader: &mut R) -> Result<usize> {
        let graphics = self.graphics.load_cache(reader)?;
        let compute = self.compute.load_cache(reader)?;
        Ok(graphics + compute)
    }

    /// Pre-warms the cache matching the blueprint's pipeline kind.
    pub fn enumerate_shader_combinations(
        &self,
        globals: &GlobalMaterialProperties,
        mandatory_only: bool,
    ) -> Result<usize> {
        ShaderCombinationEnumerator::new(self, globals).enumerate(mandatory_only)
    }
}
