//! Identifier <-> RGBA pixel encoding.
//!
//! Object identifiers are stored inside ordinary 8-bit image channels: the low
//! 24 bits are split little-endian across red, green and blue, and alpha is
//! always fully opaque. Every layer above this module relies on the encoding
//! being lossless.

use crate::error::{AnnotationError, Result};

/// Largest identifier that fits in three 8-bit channels.
pub const MAX_IDENTIFIER: u32 = 0x00FF_FFFF;

/// Alpha value written with every encoded identifier.
pub const OPAQUE: u8 = 255;

/// Bytes per RGBA pixel.
pub const CHANNELS: usize = 4;

/// Encode an identifier into an RGBA pixel.
///
/// Identifiers above [`MAX_IDENTIFIER`] are rejected rather than clamped.
pub fn encode(identifier: u32) -> Result<[u8; 4]> {
    if identifier > MAX_IDENTIFIER {
        return Err(AnnotationError::InvalidIdentifier {
            identifier,
            limit: MAX_IDENTIFIER,
        });
    }
    let [b0, b1, b2, _] = identifier.to_le_bytes();
    Ok([b0, b1, b2, OPAQUE])
}

/// Decode an identifier from the three color channels of a pixel.
#[inline]
pub fn decode(byte0: u8, byte1: u8, byte2: u8) -> u32 {
    u32::from(byte0) | (u32::from(byte1) << 8) | (u32::from(byte2) << 16)
}

/// Decode an RGBA pixel. Alpha is ignored.
#[inline]
pub fn decode_pixel(pixel: &[u8; 4]) -> u32 {
    decode(pixel[0], pixel[1], pixel[2])
}

/// Check that an identifier is encodable without producing a pixel.
pub fn validate(identifier: u32) -> Result<()> {
    encode(identifier).map(|_| ())
}
