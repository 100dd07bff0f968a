//! Shader Combination Enumerator Tests
//!
//! Tests for:
//! - Axis gathering (bool, int, global-referenced, mandatory filter)
//! - Full and mandatory-only enumeration counts
//! - Routing to the compute cache for compute blueprints
//! - Typed errors for unresolvable or unsupported axes

mod common;

use std::sync::Arc;

use common::*;
use myth_material_cache::material::{
    GlobalMaterialProperties, GraphicsShaderStage, MANDATORY_SHADER_PROPERTY, MaterialBlueprint,
    MaterialProperty, PipelineShaders, PropertyUsage, PropertyValue, ShaderBlueprint, ValueType,
};
use myth_material_cache::pipeline::{
    CacheState, CombinationAxis, MaterialBlueprintCaches, ShaderCombinationEnumerator,
};
use myth_material_cache::Error;

const FLAG: u32 = 1;
const LEVEL: u32 = 2;
const MODE: u32 = 3;
const GLOBAL_MODE: u32 = 900;

fn shaders(compute: bool, referenced: &[u32]) -> PipelineShaders {
    let shader = Arc::new(ShaderBlueprint::new(30, referenced.iter().copied()));
    if compute {
        PipelineShaders::Compute(shader)
    } else {
        PipelineShaders::graphics([(GraphicsShaderStage::Vertex, shader)])
    }
}

/// FLAG: mandatory bool. LEVEL: int 0..=3, importance 1.
fn flag_level_blueprint(compute: bool) -> Arc<MaterialBlueprint> {
    Arc::new(
        MaterialBlueprint::new(400, shaders(compute, &[FLAG, LEVEL]))
            .with_material_property(combination(FLAG, PropertyValue::Bool(false)))
            .with_material_property(combination(LEVEL, PropertyValue::Int(0)))
            .with_shader_property(FLAG, MANDATORY_SHADER_PROPERTY, None)
            .with_shader_property(LEVEL, 1, Some(3)),
    )
}

fn caches(blueprint: Arc<MaterialBlueprint>, backend: &Arc<MockBackend>) -> MaterialBlueprintCaches {
    MaterialBlueprintCaches::new(blueprint, compiler(backend, true))
}

// ============================================================================
// Axes
// ============================================================================

#[test]
fn bool_and_int_axes() {
    let backend = MockBackend::new();
    let caches = caches(flag_level_blueprint(false), &backend);
    let globals = GlobalMaterialProperties::new();
    let enumerator = ShaderCombinationEnumerator::new(&caches, &globals);

    assert_eq!(
        enumerator.gather_axes(false).unwrap(),
        vec![
            CombinationAxis { property_id: FLAG, radix: 2 },
            CombinationAxis { property_id: LEVEL, radix: 4 },
        ]
    );
    assert_eq!(
        enumerator.gather_axes(true).unwrap(),
        vec![CombinationAxis { property_id: FLAG, radix: 2 }]
    );
}

#[test]
fn negative_maximum_gives_single_value_axis() {
    let backend = MockBackend::new();
    let blueprint = Arc::new(
        MaterialBlueprint::new(401, shaders(false, &[LEVEL]))
            .with_material_property(combination(LEVEL, PropertyValue::Int(0)))
            .with_shader_property(LEVEL, 1, Some(-1)),
    );
    let caches = caches(blueprint, &backend);
    let globals = GlobalMaterialProperties::new();
    let axes = ShaderCombinationEnumerator::new(&caches, &globals)
        .gather_axes(false)
        .unwrap();
    assert_eq!(axes, vec![CombinationAxis { property_id: LEVEL, radix: 1 }]);
}

#[test]
fn global_axis_resolves_through_globals_then_blueprint() {
    let backend = MockBackend::new();
    let builder = || {
        MaterialBlueprint::new(402, shaders(false, &[MODE]))
            .with_material_property(combination(
                MODE,
                PropertyValue::GlobalMaterialPropertyId(GLOBAL_MODE),
            ))
            .with_shader_property(MODE, 1, Some(2))
    };

    let mut globals = GlobalMaterialProperties::new();
    globals.set_value(GLOBAL_MODE, PropertyValue::Bool(true));
    let from_globals = caches(Arc::new(builder()), &backend);
    assert_eq!(
        ShaderCombinationEnumerator::new(&from_globals, &globals)
            .gather_axes(false)
            .unwrap(),
        vec![CombinationAxis { property_id: MODE, radix: 2 }]
    );

    let with_default = builder().with_material_property(MaterialProperty::new(
        GLOBAL_MODE,
        PropertyUsage::GlobalReferenceFallback,
        PropertyValue::Int(0),
    ));
    let from_blueprint = caches(Arc::new(with_default), &backend);
    let empty = GlobalMaterialProperties::new();
    assert_eq!(
        ShaderCombinationEnumerator::new(&from_blueprint, &empty)
            .gather_axes(false)
            .unwrap(),
        vec![CombinationAxis { property_id: MODE, radix: 3 }]
    );

    let unresolved = caches(Arc::new(builder()), &backend);
    let err = ShaderCombinationEnumerator::new(&unresolved, &empty)
        .gather_axes(false)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnresolvedProperty {
            property_id: GLOBAL_MODE,
            usage: PropertyUsage::GlobalReference
        }
    ));
}

#[test]
fn float_axis_is_rejected() {
    let backend = MockBackend::new();
    let blueprint = Arc::new(
        MaterialBlueprint::new(403, shaders(false, &[MODE]))
            .with_material_property(combination(MODE, PropertyValue::Float(0.0)))
            .with_shader_property(MODE, 1, None),
    );
    let caches = caches(blueprint, &backend);
    let err = caches
        .enumerate_shader_combinations(&GlobalMaterialProperties::new(), false)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::UnsupportedCombinationValueType {
            property_id: MODE,
            value_type: ValueType::Float
        }
    ));
    assert!(caches.graphics().is_empty());
}

// ============================================================================
// Enumeration
// ============================================================================

#[test]
fn full_enumeration_requests_every_combination() {
    let backend = MockBackend::new();
    let caches = caches(flag_level_blueprint(false), &backend);

    let requested = caches
        .enumerate_shader_combinations(&GlobalMaterialProperties::new(), false)
        .unwrap();
    caches.graphics().compiler().flush();

    assert_eq!(requested, 8);
    assert_eq!(caches.graphics().len(), 8);
    assert_eq!(backend.graphics_compiles(), 8);
    assert!(caches.compute().is_empty());
    assert!(caches.needs_saving());

    let all_default = caches
        .graphics()
        .get_cache_by_combination(&props(&[]), false)
        .unwrap();
    assert_eq!(all_default.state(), CacheState::Ready);
    let deepest = caches
        .graphics()
        .get_cache_by_combination(&props(&[(FLAG, 1), (LEVEL, 3)]), false)
        .unwrap();
    assert_eq!(deepest.state(), CacheState::Ready);
    assert_eq!(caches.graphics().len(), 8);
}

#[test]
fn mandatory_only_enumeration() {
    let backend = MockBackend::new();
    let caches = caches(flag_level_blueprint(false), &backend);

    let requested = caches
        .enumerate_shader_combinations(&GlobalMaterialProperties::new(), true)
        .unwrap();
    assert_eq!(requested, 2);
    assert_eq!(caches.graphics().len(), 2);
}

#[test]
fn enumeration_is_idempotent() {
    let backend = MockBackend::new();
    let caches = caches(flag_level_blueprint(false), &backend);
    let globals = GlobalMaterialProperties::new();

    caches.enumerate_shader_combinations(&globals, false).unwrap();
    caches.graphics().compiler().flush();
    caches.enumerate_shader_combinations(&globals, false).unwrap();

    assert_eq!(caches.graphics().len(), 8);
    assert_eq!(backend.graphics_compiles(), 8);
}

#[test]
fn compute_blueprint_fills_compute_cache() {
    let backend = MockBackend::new();
    let caches = caches(flag_level_blueprint(true), &backend);

    let requested = caches
        .enumerate_shader_combinations(&GlobalMaterialProperties::new(), false)
        .unwrap();
    caches.compute().compiler().flush();

    assert_eq!(requested, 8);
    assert_eq!(caches.compute().len(), 8);
    assert!(caches.graphics().is_empty());
    assert_eq!(backend.compute_compiles(), 8);
    assert_eq!(backend.graphics_compiles(), 0);
}

#[test]
fn blueprint_without_combination_properties_requests_default() {
    let backend = MockBackend::new();
    let caches = caches(graphics_blueprint(), &backend);
    let requested = caches
        .enumerate_shader_combinations(&GlobalMaterialProperties::new(), false)
        .unwrap();
    assert_eq!(requested, 1);
    assert_eq!(caches.graphics().len(), 1);
}
