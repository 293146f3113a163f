//! Packing label planes into one tiled PNG and reading them back.

use std::io::Cursor;

use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder, ImageFormat, RgbaImage};

use crate::codec::{CHANNELS, OPAQUE};
use crate::error::{AnnotationError, Result};
use crate::tiles::chunk::{encode_chunk, find_chunk, insert_after_header};
use crate::tiles::metadata::TileMetadata;
use crate::tiles::METADATA_CHUNK;

/// One label's identifiers, one byte per pixel, ready for packing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelPlane {
    pub label: String,
    /// Row-major, `width * height` bytes
    pub values: Vec<u8>,
}

/// Pack planes into a canvas of `ceil(n / 3)` bands stacked vertically.
///
/// Plane `k` lands in band `k / 3`, channel `k % 3`. Alpha is opaque
/// everywhere; unused channels stay zero.
pub fn pack(width: u32, height: u32, planes: &[LabelPlane]) -> Result<(RgbaImage, TileMetadata)> {
    let mut metadata = TileMetadata::new();
    for plane in planes {
        metadata.push(plane.label.clone());
    }

    let bands = u32::try_from(metadata.tile_count())
        .ok()
        .and_then(|bands| bands.checked_mul(height))
        .ok_or_else(|| AnnotationError::export_failed("packed canvas too tall"))?;
    let mut canvas = RgbaImage::from_pixel(width, bands, image::Rgba([0, 0, 0, OPAQUE]));

    let band_pixels = width as usize * height as usize;
    let raw: &mut [u8] = &mut canvas;
    for ((_, placement), plane) in metadata.entries().zip(planes) {
        if plane.values.len() != band_pixels {
            return Err(AnnotationError::export_failed(format!(
                "plane '{}' has {} pixels, expected {}",
                plane.label,
                plane.values.len(),
                band_pixels
            )));
        }
        let band_start = placement.tile * band_pixels * CHANNELS;
        for (i, &value) in plane.values.iter().enumerate() {
            raw[band_start + i * CHANNELS + placement.channel] = value;
        }
    }

    Ok((canvas, metadata))
}

/// Encode a canvas as PNG.
pub fn encode_png(canvas: &RgbaImage) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    PngEncoder::new(Cursor::new(&mut buffer)).write_image(
        canvas.as_raw(),
        canvas.width(),
        canvas.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(buffer)
}

/// Encode a canvas and splice the metadata chunk in after the PNG header.
pub fn write_artifact(canvas: &RgbaImage, metadata: &TileMetadata) -> Result<Vec<u8>> {
    let png = encode_png(canvas)?;
    let text = metadata.to_text()?;
    let chunk = encode_chunk(METADATA_CHUNK, text.as_bytes())?;
    insert_after_header(&png, &chunk)
}

/// Read the metadata chunk and the decoded canvas of an artifact.
///
/// The chunk is located by its type tag and its CRC is verified before the
/// text is parsed.
pub fn read_artifact(bytes: &[u8]) -> Result<(TileMetadata, RgbaImage)> {
    let chunk = find_chunk(bytes, METADATA_CHUNK)?
        .ok_or_else(|| AnnotationError::import_failed("no metadata chunk"))?;
    if !chunk.is_intact() {
        return Err(AnnotationError::import_failed(format!(
            "metadata checksum mismatch (stored {:#010x}, computed {:#010x})",
            chunk.crc,
            chunk.computed_crc()
        )));
    }
    let text = std::str::from_utf8(chunk.data)
        .map_err(|e| AnnotationError::import_failed(format!("metadata is not UTF-8: {}", e)))?;
    let metadata = TileMetadata::parse(text)?;

    let canvas = image::load_from_memory_with_format(bytes, ImageFormat::Png)
        .map_err(|e| AnnotationError::import_failed(format!("failed to decode PNG: {}", e)))?
        .to_rgba8();

    Ok((metadata, canvas))
}
