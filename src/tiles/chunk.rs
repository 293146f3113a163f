//! PNG chunk scanning and splicing.
//!
//! A PNG stream is the 8-byte signature followed by chunks laid out as
//! `[length: u32 BE][type: 4 bytes][data: length bytes][crc: u32 BE]`, where the
//! CRC covers type and data. The first chunk is always `IHDR`.

use crate::error::{AnnotationError, Result};
use crate::tiles::crc::Crc32;

/// Magic bytes every PNG stream starts with.
pub const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Chunk type of the image header.
pub const HEADER_CHUNK: [u8; 4] = *b"IHDR";

/// Length, type and CRC fields around each chunk's data.
const CHUNK_OVERHEAD: usize = 12;

/// One chunk borrowed from a PNG stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunk<'a> {
    /// Byte offset of the chunk's length field in the stream
    pub offset: usize,
    pub kind: [u8; 4],
    pub data: &'a [u8],
    /// CRC stored in the stream
    pub crc: u32,
}

impl Chunk<'_> {
    /// CRC computed over type and data.
    pub fn computed_crc(&self) -> u32 {
        Crc32::new().update(&self.kind).update(self.data).finish()
    }

    /// Whether the stored CRC matches the chunk contents.
    pub fn is_intact(&self) -> bool {
        self.crc == self.computed_crc()
    }

    /// Offset of the first byte after this chunk.
    pub fn end(&self) -> usize {
        self.offset + CHUNK_OVERHEAD + self.data.len()
    }
}

/// Iterator over the chunks of a PNG stream.
///
/// Yields an error (and then stops) on a truncated chunk.
#[derive(Debug, Clone)]
pub struct Chunks<'a> {
    bytes: &'a [u8],
    position: usize,
    failed: bool,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Result<Chunk<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.position >= self.bytes.len() {
            return None;
        }
        let chunk = read_chunk(self.bytes, self.position);
        match &chunk {
            Ok(chunk) => self.position = chunk.end(),
            Err(_) => self.failed = true,
        }
        Some(chunk)
    }
}

fn read_u32(bytes: &[u8], at: usize) -> Option<u32> {
    let field: [u8; 4] = bytes.get(at..at + 4)?.try_into().ok()?;
    Some(u32::from_be_bytes(field))
}

fn read_chunk(bytes: &[u8], offset: usize) -> Result<Chunk<'_>> {
    let truncated =
        || AnnotationError::import_failed(format!("truncated chunk at byte {}", offset));

    let length = read_u32(bytes, offset).ok_or_else(truncated)? as usize;
    let kind: [u8; 4] = bytes
        .get(offset + 4..offset + 8)
        .and_then(|kind| kind.try_into().ok())
        .ok_or_else(truncated)?;
    let data_start = offset + 8;
    let data_end = data_start.checked_add(length).ok_or_else(truncated)?;
    let data = bytes.get(data_start..data_end).ok_or_else(truncated)?;
    let crc = read_u32(bytes, data_end).ok_or_else(truncated)?;

    Ok(Chunk {
        offset,
        kind,
        data,
        crc,
    })
}

/// Iterate the chunks of a PNG stream after checking its signature.
pub fn chunks(bytes: &[u8]) -> Result<Chunks<'_>> {
    if !bytes.starts_with(&PNG_SIGNATURE) {
        return Err(AnnotationError::import_failed("not a PNG stream"));
    }
    Ok(Chunks {
        bytes,
        position: PNG_SIGNATURE.len(),
        failed: false,
    })
}

/// First chunk of the given type, if present.
pub fn find_chunk<'a>(bytes: &'a [u8], kind: [u8; 4]) -> Result<Option<Chunk<'a>>> {
    for chunk in chunks(bytes)? {
        let chunk = chunk?;
        if chunk.kind == kind {
            return Ok(Some(chunk));
        }
    }
    Ok(None)
}

/// Serialize one chunk with its length prefix and CRC.
pub fn encode_chunk(kind: [u8; 4], data: &[u8]) -> Result<Vec<u8>> {
    let length = u32::try_from(data.len())
        .ok()
        .filter(|&length| length <= i32::MAX as u32)
        .ok_or_else(|| AnnotationError::export_failed("chunk data too large"))?;
    let crc = Crc32::new().update(&kind).update(data).finish();

    let mut out = Vec::with_capacity(CHUNK_OVERHEAD + data.len());
    out.extend_from_slice(&length.to_be_bytes());
    out.extend_from_slice(&kind);
    out.extend_from_slice(data);
    out.extend_from_slice(&crc.to_be_bytes());
    Ok(out)
}

/// Insert an encoded chunk directly after the `IHDR` chunk.
///
/// For a standard PNG that is byte offset 33.
pub fn insert_after_header(png: &[u8], encoded_chunk: &[u8]) -> Result<Vec<u8>> {
    let header = chunks(png)
        .ok()
        .and_then(|mut chunks| chunks.next())
        .and_then(|chunk| chunk.ok())
        .filter(|chunk| chunk.kind == HEADER_CHUNK)
        .ok_or_else(|| AnnotationError::export_failed("PNG stream does not start with IHDR"))?;

    let at = header.end();
    let mut out = Vec::with_capacity(png.len() + encoded_chunk.len());
    out.extend_from_slice(&png[..at]);
    out.extend_from_slice(encoded_chunk);
    out.extend_from_slice(&png[at..]);
    Ok(out)
}
