//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::{Duration, Instant};

use glam::Vec4;
use parking_lot::{Condvar, Mutex};

use myth_material_cache::buffer::BufferSlotManager;
use myth_material_cache::hash::string_id;
use myth_material_cache::material::{
    GraphicsShaderStage, MANDATORY_SHADER_PROPERTY, MaterialBlueprint, MaterialProperties,
    MaterialProperty, PipelineShaders, PropertyId, PropertyUsage, PropertyValue, ShaderBlueprint,
    SharedGlobalMaterialProperties, SharedMaterialProperties, UniformBufferLayout,
    UniformBufferUsage, ValueType,
};
use myth_material_cache::pipeline::{
    ComputePipelineSignature, GraphicsPipelineSignature, PipelineBackend, PipelineObject,
    PipelineSignature, PipelineStateCompiler,
};
use myth_material_cache::rhi::headless::HeadlessDevice;
use myth_material_cache::rhi::{Capabilities, PipelineKind, RenderDevice};
use myth_material_cache::{CacheSettings, Error, GlobalMaterialProperties, Result};

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

// ============================================================================
// Property ids
// ============================================================================

pub const COLOR: PropertyId = string_id("color");
pub const TIME: PropertyId = string_id("time");

pub const LAYOUT_COLOR: PropertyId = string_id("layout.color");
pub const LAYOUT_TIME: PropertyId = string_id("layout.time");
pub const LAYOUT_FLAG: PropertyId = string_id("layout.flag");

/// Shader properties, importance: A mandatory, B 1, C 2, D 5, E 5.
pub const PROP_A: PropertyId = 1;
pub const PROP_B: PropertyId = 2;
pub const PROP_C: PropertyId = 3;
pub const PROP_D: PropertyId = 4;
pub const PROP_E: PropertyId = 5;
/// Not referenced by any shader.
pub const PROP_UNREFERENCED: PropertyId = 6;

pub const GRAPHICS_BLUEPRINT_ID: u32 = 100;
pub const COMPUTE_BLUEPRINT_ID: u32 = 200;

// ============================================================================
// Buffer fixtures
// ============================================================================

/// Element layout: color (Float4, material), time (Float, global), flag
/// (Bool, static). Packed to 24 bytes, stride 32.
pub fn slot_layout() -> UniformBufferLayout {
    UniformBufferLayout::with_packed_stride(
        UniformBufferUsage::Material,
        2,
        vec![
            MaterialProperty::material_reference(LAYOUT_COLOR, ValueType::Float4, COLOR),
            MaterialProperty::global_reference(LAYOUT_TIME, ValueType::Float, TIME),
            MaterialProperty::static_value(LAYOUT_FLAG, PropertyValue::Bool(true)),
        ],
        64,
    )
}

pub fn slot_blueprint() -> Arc<MaterialBlueprint> {
    Arc::new(
        MaterialBlueprint::new(
            GRAPHICS_BLUEPRINT_ID,
            PipelineShaders::graphics([(
                GraphicsShaderStage::Vertex,
                Arc::new(ShaderBlueprint::new(1, [])),
            )]),
        )
        .with_uniform_buffer(slot_layout()),
    )
}

pub fn globals_with_time(time: f32) -> SharedGlobalMaterialProperties {
    let mut globals = GlobalMaterialProperties::new();
    globals.set_value(TIME, PropertyValue::Float(time));
    globals.into_shared()
}

pub fn material(color: Vec4) -> SharedMaterialProperties {
    let mut properties = MaterialProperties::new();
    properties.set_value(COLOR, PropertyValue::Float4(color));
    properties.into_shared()
}

/// Headless device plus a manager whose pools hold `slots_per_pool` slots
/// of the 32-byte layout.
pub fn slot_manager(slots_per_pool: u32) -> (Arc<HeadlessDevice>, BufferSlotManager) {
    slot_manager_with(slot_blueprint(), globals_with_time(0.5), slots_per_pool)
}

pub fn slot_manager_with(
    blueprint: Arc<MaterialBlueprint>,
    globals: SharedGlobalMaterialProperties,
    slots_per_pool: u32,
) -> (Arc<HeadlessDevice>, BufferSlotManager) {
    init_logger();
    let device = Arc::new(HeadlessDevice::new(Capabilities::default()));
    let settings = CacheSettings {
        max_slot_pool_bytes: slots_per_pool * 32,
        ..Default::default()
    };
    let render_device: Arc<dyn RenderDevice> = device.clone();
    let manager = BufferSlotManager::new(render_device, blueprint, globals, &settings)
        .expect("manager creation");
    (device, manager)
}

/// Expected bytes of one 32-byte element.
pub fn expected_element(color: Vec4, time: f32, flag: bool) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(32);
    bytes.extend_from_slice(bytemuck::bytes_of(&color));
    bytes.extend_from_slice(&time.to_ne_bytes());
    bytes.extend_from_slice(&u32::from(flag).to_ne_bytes());
    bytes.resize(32, 0);
    bytes
}

// ============================================================================
// Pipeline fixtures
// ============================================================================

/// Graphics blueprint whose vertex shader reads A..E and whose fragment
/// shader reads A and C.
pub fn graphics_blueprint() -> Arc<MaterialBlueprint> {
    Arc::new(graphics_blueprint_builder(GRAPHICS_BLUEPRINT_ID))
}

pub fn graphics_blueprint_builder(id: u32) -> MaterialBlueprint {
    let vertex = Arc::new(ShaderBlueprint::new(
        10,
        [PROP_A, PROP_B, PROP_C, PROP_D, PROP_E],
    ));
    let fragment = Arc::new(ShaderBlueprint::new(11, [PROP_A, PROP_C]));
    with_test_importance(MaterialBlueprint::new(
        id,
        PipelineShaders::graphics([
            (GraphicsShaderStage::Vertex, vertex),
            (GraphicsShaderStage::Fragment, fragment),
        ]),
    ))
}

pub fn compute_blueprint() -> Arc<MaterialBlueprint> {
    let shader = Arc::new(ShaderBlueprint::new(
        20,
        [PROP_A, PROP_B, PROP_C, PROP_D, PROP_E],
    ));
    Arc::new(with_test_importance(MaterialBlueprint::new(
        COMPUTE_BLUEPRINT_ID,
        PipelineShaders::Compute(shader),
    )))
}

fn with_test_importance(blueprint: MaterialBlueprint) -> MaterialBlueprint {
    blueprint
        .with_shader_property(PROP_A, MANDATORY_SHADER_PROPERTY, None)
        .with_shader_property(PROP_B, 1, None)
        .with_shader_property(PROP_C, 2, None)
        .with_shader_property(PROP_D, 5, None)
        .with_shader_property(PROP_E, 5, None)
        .with_shader_property(PROP_UNREFERENCED, 3, None)
}

pub fn props(pairs: &[(PropertyId, i32)]) -> myth_material_cache::ShaderProperties {
    pairs.iter().copied().collect()
}

/// Pipeline object produced by [`MockBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockPipeline {
    pub signature_id: u32,
    pub kind: PipelineKind,
}

/// Backend counting compiles. Compiles block while the gate is closed and
/// fail while failing is set.
#[derive(Default)]
pub struct MockBackend {
    graphics_compiles: AtomicUsize,
    compute_compiles: AtomicUsize,
    failing: AtomicBool,
    blocked: AtomicUsize,
    gate_closed: Mutex<bool>,
    gate: Condvar,
}

impl MockBackend {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn close_gate(&self) {
        *self.gate_closed.lock() = true;
    }

    pub fn open_gate(&self) {
        *self.gate_closed.lock() = false;
        self.gate.notify_all();
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn graphics_compiles(&self) -> usize {
        self.graphics_compiles.load(Ordering::SeqCst)
    }

    pub fn compute_compiles(&self) -> usize {
        self.compute_compiles.load(Ordering::SeqCst)
    }

    /// Compiles currently waiting at the closed gate.
    pub fn blocked(&self) -> usize {
        self.blocked.load(Ordering::SeqCst)
    }

    /// Waits until `count` compiles are held at the gate.
    pub fn wait_until_blocked(&self, count: usize) {
        let deadline = Instant::now() + Duration::from_secs(10);
        while self.blocked() < count {
            assert!(Instant::now() < deadline, "compiles never reached the gate");
            std::thread::sleep(Duration::from_millis(1));
        }
    }

    fn build(&self, signature_id: u32, kind: PipelineKind) -> Result<PipelineObject> {
        {
            let mut closed = self.gate_closed.lock();
            if *closed {
                self.blocked.fetch_add(1, Ordering::SeqCst);
                while *closed {
                    self.gate.wait(&mut closed);
                }
                self.blocked.fetch_sub(1, Ordering::SeqCst);
            }
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::Compilation {
                signature_id,
                message: "mock failure".into(),
            });
        }
        let counter = match kind {
            PipelineKind::Graphics => &self.graphics_compiles,
            PipelineKind::Compute => &self.compute_compiles,
        };
        counter.fetch_add(1, Ordering::SeqCst);
        Ok(PipelineObject::new(MockPipeline { signature_id, kind }))
    }
}

impl PipelineBackend for MockBackend {
    fn create_graphics_pipeline(
        &self,
        _blueprint: &MaterialBlueprint,
        signature: &GraphicsPipelineSignature,
    ) -> Result<PipelineObject> {
        self.build(signature.signature_id(), PipelineKind::Graphics)
    }

    fn create_compute_pipeline(
        &self,
        _blueprint: &MaterialBlueprint,
        signature: &ComputePipelineSignature,
    ) -> Result<PipelineObject> {
        self.build(signature.signature_id(), PipelineKind::Compute)
    }
}

pub fn compiler(backend: &Arc<MockBackend>, asynchronous: bool) -> Arc<PipelineStateCompiler> {
    init_logger();
    let backend: Arc<dyn PipelineBackend> = backend.clone();
    let settings = CacheSettings {
        asynchronous_compilation: asynchronous,
        ..Default::default()
    };
    Arc::new(PipelineStateCompiler::new(backend, &settings).expect("compiler creation"))
}

/// Property usage shorthand for combination tests.
pub fn combination(id: PropertyId, value: PropertyValue) -> MaterialProperty {
    MaterialProperty::new(id, PropertyUsage::ShaderCombination, value)
}

// ============================================================================
// Randomness
// ============================================================================

/// Deterministic xorshift64* generator for fuzz tests.
pub struct XorShift(u64);

impl XorShift {
    pub fn new(seed: u64) -> Self {
        Self(seed.max(1))
    }

    pub fn next_u64(&mut self) -> u64 {
        let mut x = self.0;
        x ^= x >> 12;
        x ^= x << 25;
        x ^= x >> 27;
        self.0 = x;
        x.wrapping_mul(0x2545_F491_4F6C_DD1D)
    }

    /// Uniform-ish value in `0..bound`.
    pub fn below(&mut self, bound: u32) -> u32 {
        (self.next_u64() >> 32) as u32 % bound
    }
}
