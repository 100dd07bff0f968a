//! Persisted pipeline cache blobs.
//!
//! One blob per cache manager, all integers little-endian:
//!
//! ```text
//! u32 blueprint id
//! u32 entry count
//! entry count times:
//!     u32 property count
//!     property count times: { u32 id, i32 value }
//! ```
//!
//! A blueprint writes its graphics blob and then its compute blob back to
//! back into the same stream.

use std::io::{ErrorKind, Read, Write};

use bytemuck::Zeroable;

use crate::errors::{Error, Result};
use crate::material::{ShaderProperties, ShaderProperty};

/// Records moved per `read_exact` / `write_all` call.
const RECORD_CHUNK: usize = 64;

fn read_exact<R: Read + ?Sized>(reader: &mut R, buf: &mut [u8], what: &'static str) -> Result<()> {
    match reader.read_exact(buf) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => Err(Error::TruncatedCacheFile(what)),
        Err(err) => Err(err.into()),
    }
}

fn read_u32<R: Read + ?Sized>(reader: &mut R, what: &'static str) -> Result<u32> {
    let mut word = [0u8; 4];
    read_exact(reader, &mut word, what)?;
    Ok(u32::from_le_bytes(word))
}

#[inline]
fn record_to_le(record: ShaderProperty) -> ShaderProperty {
    ShaderProperty::new(record.id.to_le(), record.value.to_le())
}

#[inline]
fn record_from_le(record: ShaderProperty) -> ShaderProperty {
    ShaderProperty::new(u32::from_le(record.id), i32::from_le(record.value))
}

/// Writes one blob holding `entries` for `blueprint_id`.
pub fn write_cache_blob<'a, W, I>(writer: &mut W, blueprint_id: u32, entries: I) -> Result<()>
where
    W: Write + ?Sized,
    I: ExactSizeIterator<Item = &'a ShaderProperties>,
{
    writer.write_all(&blueprint_id.to_le_bytes())?;
    writer.write_all(&(entries.len() as u32).to_le_bytes())?;

    let mut chunk = [ShaderProperty::zeroed(); RECORD_CHUNK];
    for properties in entries {
        writer.write_all(&(properties.len() as u32).to_le_bytes())?;
        for records in properties.as_records().chunks(RECORD_CHUNK) {
            let chunk = &mut chunk[..records.len()];
            for (dst, src) in chunk.iter_mut().zip(records) {
                *dst = record_to_le(*src);
            }
            writer.write_all(bytemuck::cast_slice(chunk))?;
        }
    }
    Ok(())
}

/// Reads one blob, checking that it belongs to `expected_blueprint_id`.
pub fn read_cache_blob<R: Read + ?Sized>(
    reader: &mut R,
    expected_blueprint_id: u32,
) -> Result<Vec<ShaderProperties>> {
    let blueprint_id = read_u32(reader, "blueprint id")?;
    if blueprint_id != expected_blueprint_id {
        return Err(Error::BlueprintMismatch {
            expected: expected_blueprint_id,
            found: blueprint_id,
        });
    }

    let entry_count = read_u32(reader, "entry count")? as usize;
    let mut entries = Vec::with_capacity(entry_count.min(1024));
    let mut chunk = [ShaderProperty::zeroed(); RECORD_CHUNK];
    for _ in 0..entry_count {
        let mut remaining = read_u32(reader, "property count")? as usize;
        let mut records = Vec::with_capacity(remaining.min(RECORD_CHUNK));
        while remaining > 0 {
            let chunk = &mut chunk[..remaining.min(RECORD_CHUNK)];
            read_exact(reader, bytemuck::cast_slice_mut(chunk), "property records")?;
            records.extend(chunk.iter().copied().map(record_from_le));
            remaining -= chunk.len();
        }
        entries.push(ShaderProperties::from_records(&records));
    }
    Ok(entries)
}
