//! Hot paths of material rendering: signature hashing, fallback search and
//! element packing.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use glam::Vec4;

use myth_material_cache::buffer::packing::{PropertyResolver, write_element};
use myth_material_cache::material::{
    GlobalMaterialProperties, GraphicsShaderStage, MANDATORY_SHADER_PROPERTY, MaterialBlueprint,
    MaterialProperties, MaterialProperty, PipelineShaders, PropertyValue, ShaderBlueprint,
    ShaderProperties, ValueType,
};
use myth_material_cache::pipeline::{
    ComputePipelineSignature, GraphicsPipelineSignature, GraphicsPipelineStateCacheManager,
    PipelineBackend, PipelineObject, PipelineSignature, PipelineStateCompiler,
};
use myth_material_cache::{CacheSettings, Result};

const PROPERTY_COUNT: u32 = 16;

struct NoopBackend;

impl PipelineBackend for NoopBackend {
    fn create_graphics_pipeline(
        &self,
        _blueprint: &MaterialBlueprint,
        signature: &GraphicsPipelineSignature,
    ) -> Result<PipelineObject> {
        Ok(PipelineObject::new(signature.signature_id()))
    }

    fn create_compute_pipeline(
        &self,
        _blueprint: &MaterialBlueprint,
        signature: &ComputePipelineSignature,
    ) -> Result<PipelineObject> {
        Ok(PipelineObject::new(signature.signature_id()))
    }
}

fn blueprint() -> Arc<MaterialBlueprint> {
    let ids: Vec<u32> = (1..=PROPERTY_COUNT).collect();
    let vertex = Arc::new(ShaderBlueprint::new(1, ids.iter().copied()));
    let fragment = Arc::new(ShaderBlueprint::new(2, ids.iter().copied().step_by(2)));
    let mut blueprint = MaterialBlueprint::new(
        7,
        PipelineShaders::graphics([
            (GraphicsShaderStage::Vertex, vertex),
            (GraphicsShaderStage::Fragment, fragment),
        ]),
    )
    .with_shader_property(1, MANDATORY_SHADER_PROPERTY, None);
    for id in 2..=PROPERTY_COUNT {
        blueprint = blueprint.with_shader_property(id, id as i32, None);
    }
    Arc::new(blueprint)
}

fn full_combination() -> ShaderProperties {
    (1..=PROPERTY_COUNT).map(|id| (id, 1)).collect()
}

fn signature(c: &mut Criterion) {
    let blueprint = blueprint();
    let properties = full_combination();

    c.bench_function("graphics_signature_16_properties", |b| {
        b.iter(|| {
            let signature = GraphicsPipelineSignature::new(&blueprint, black_box(properties.clone()));
            black_box(signature.signature_id())
        });
    });
}

fn fallback(c: &mut Criterion) {
    let blueprint = blueprint();
    let settings = CacheSettings {
        asynchronous_compilation: false,
        ..Default::default()
    };
    let compiler = match PipelineStateCompiler::new(Arc::new(NoopBackend), &settings) {
        Ok(compiler) => Arc::new(compiler),
        Err(err) => panic!("compiler creation failed: {err}"),
    };
    let manager = GraphicsPipelineStateCacheManager::new(blueprint, compiler);
    let root: ShaderProperties = [(1, 1)].into_iter().collect();
    if let Err(err) = manager.get_cache_by_combination(&root, true) {
        panic!("root compile failed: {err}");
    }

    // Worst case: every removable property is dropped before the hit
    let properties = full_combination();
    c.bench_function("fallback_search_worst_case", |b| {
        b.iter(|| black_box(manager.find_fallback(black_box(&properties)).is_some()));
    });
}

fn packing(c: &mut Criterion) {
    let layout: Vec<MaterialProperty> = (0..8)
        .map(|i| MaterialProperty::material_reference(100 + i, ValueType::Float4, i))
        .chain((0..8).map(|i| MaterialProperty::static_value(200 + i, PropertyValue::Float(i as f32))))
        .collect();
    let mut material = MaterialProperties::new();
    for i in 0..8 {
        material.set_value(i, PropertyValue::Float4(Vec4::splat(i as f32)));
    }
    let globals = GlobalMaterialProperties::new();
    let defaults = MaterialProperties::new();
    let resolver = PropertyResolver::new(&material, &globals, &defaults);
    let mut element = vec![0u8; 256];

    c.bench_function("write_element_16_properties", |b| {
        b.iter(|| black_box(write_element(&mut element, &layout, &resolver).is_ok()));
    });
}

criterion_group!(benches, signature, fallback, packing);
criterion_main!(benches);
