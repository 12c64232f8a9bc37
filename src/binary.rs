//! Fixed-offset field access shared by the STX and RESPACK layouts.
//!
//! Every record in both formats is a little-endian struct with documented byte offsets.
//! Fields are read and written through these helpers instead of casting buffers, so a bad
//! offset or a short file surfaces as an [`OutOfBounds`] error rather than a panic.

use byteorder::{ByteOrder, LE};
use std::borrow::Cow;
use thiserror::Error;
use tracing::warn;

/// A read that does not fit inside the buffer it targets.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("read of {len} bytes at offset {offset:#x} exceeds buffer of {available} bytes")]
pub struct OutOfBounds {
    pub offset: usize,
    pub len: usize,
    pub available: usize,
}

/// Text that cannot be stored in a fixed-width, NUL-terminated field.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextFieldError {
    #[error("text of {len} bytes does not fit a field holding at most {max} bytes")]
    Overflow { len: usize, max: usize },
    #[error("text contains a NUL byte at {position}")]
    InteriorNul { position: usize },
}

pub fn slice(buf: &[u8], offset: usize, len: usize) -> Result<&[u8], OutOfBounds> {
    offset
        .checked_add(len)
        .and_then(|end| buf.get(offset..end))
        .ok_or(OutOfBounds {
            offset,
            len,
            available: buf.len(),
        })
}

pub fn read_u32(buf: &[u8], offset: usize) -> Result<u32, OutOfBounds> {
    Ok(LE::read_u32(slice(buf, offset, 4)?))
}

pub fn read_f32(buf: &[u8], offset: usize) -> Result<f32, OutOfBounds> {
    Ok(LE::read_f32(slice(buf, offset, 4)?))
}

/// Reads a NUL-terminated string from a field of `width` bytes.
///
/// A field without a terminator is taken whole. Bytes that are not UTF-8 become U+FFFD.
pub fn read_cstr(buf: &[u8], offset: usize, width: usize) -> Result<String, OutOfBounds> {
    let field = slice(buf, offset, width)?;
    let end = field.iter().position(|&b| b == 0).unwrap_or(field.len());
    Ok(match String::from_utf8_lossy(&field[..end]) {
        Cow::Borrowed(text) => text.to_owned(),
        Cow::Owned(text) => {
            warn!("text at {offset:#x} is not UTF-8, read as {text:?}");
            text
        }
    })
}

// Writers only ever target buffers they sized themselves, so they index directly.

pub fn write_u32(buf: &mut [u8], offset: usize, value: u32) {
    LE::write_u32(&mut buf[offset..offset + 4], value);
}

pub fn write_f32(buf: &mut [u8], offset: usize, value: f32) {
    LE::write_f32(&mut buf[offset..offset + 4], value);
}

/// Writes `value` and its terminator into a zero-filled field of `width` bytes.
pub fn write_cstr(
    buf: &mut [u8],
    offset: usize,
    width: usize,
    value: &str,
) -> Result<(), TextFieldError> {
    let bytes = value.as_bytes();
    if let Some(position) = bytes.iter().position(|&b| b == 0) {
        return Err(TextFieldError::InteriorNul { position });
    }
    if bytes.len() >= width {
        return Err(TextFieldError::Overflow {
            len: bytes.len(),
            max: width - 1,
        });
    }

    let field = &mut buf[offset..offset + width];
    field.fill(0);
    field[..bytes.len()].copy_from_slice(bytes);
    Ok(())
}
