//! Error Types
//!
//! This module defines the error types used throughout the crate.
//!
//! # Overview
//!
//! The main error type [`Error`] covers:
//! - Data-integrity failures (unresolved property references, bad layouts,
//!   mismatched cache files). These indicate authoring data that was not
//!   validated upstream and are never expected on a healthy content set.
//! - Slot bookkeeping misuse (binding a slot that was never assigned).
//! - Render device and pipeline compiler failures reported by collaborators.
//! - File I/O while persisting pipeline caches.
//!
//! # Usage
//!
//! All fallible APIs return [`Result<T>`] which is an alias for
//! `std::result::Result<T, Error>`.

use thiserror::Error;

use crate::material::{PropertyId, PropertyUsage, ValueType};

/// The main error type for the material cache.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Data Integrity Errors
    // ========================================================================
    /// A material or global property reference could not be resolved.
    #[error("Unresolved {usage:?} property reference {property_id:#010x}")]
    UnresolvedProperty {
        property_id: PropertyId,
        usage: PropertyUsage,
    },

    /// The usage / value combination cannot be written to a uniform buffer.
    #[error("Unsupported usage {usage:?} for uniform buffer property {property_id:#010x}")]
    UnsupportedPropertyUsage {
        property_id: PropertyId,
        usage: PropertyUsage,
    },

    /// A resolved value does not have the type the layout expects.
    #[error(
        "Property {property_id:#010x} resolved to {found:?} but the layout expects {expected:?}"
    )]
    PropertyTypeMismatch {
        property_id: PropertyId,
        expected: ValueType,
        found: ValueType,
    },

    /// Packed element data does not fit into the destination region.
    #[error("Uniform buffer element overflow: needs {required} bytes, {available} available")]
    LayoutOverflow { required: usize, available: usize },

    /// A shader combination property has a value type that cannot form an axis.
    #[error("Shader combination property {property_id:#010x} has unsupported type {value_type:?}")]
    UnsupportedCombinationValueType {
        property_id: PropertyId,
        value_type: ValueType,
    },

    /// A persisted pipeline cache belongs to another material blueprint.
    #[error("Pipeline cache blueprint mismatch: expected {expected:#010x}, found {found:#010x}")]
    BlueprintMismatch { expected: u32, found: u32 },

    /// A persisted pipeline cache ended early.
    #[error("Truncated pipeline cache file: {0}")]
    TruncatedCacheFile(&'static str),

    /// The material blueprint declares no material uniform buffer.
    #[error("Material blueprint {0:#010x} has no material uniform buffer")]
    MissingMaterialUniformBuffer(u32),

    // ========================================================================
    // Slot Errors
    // ========================================================================
    /// The slot key does not belong to this manager (or was destroyed).
    #[error("Unknown buffer slot")]
    UnknownSlot,

    /// The slot has no pool assignment.
    #[error("Buffer slot is not assigned to a pool")]
    SlotNotAssigned,

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// The render device rejected a request.
    #[error("Render device error: {0}")]
    Device(String),

    /// The pipeline backend failed to build a pipeline object.
    #[error("Pipeline compilation failed for signature {signature_id:#010x}: {message}")]
    Compilation { signature_id: u32, message: String },

    // ========================================================================
    // I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
