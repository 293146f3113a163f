//! Per-label identifier raster.
//!
//! An [`AnnotationSurface`] is the single source of truth for one label's
//! annotation state. Identifiers are kept PixelCodec-encoded inside an RGBA
//! buffer so the surface can be handed to image tooling unchanged; pixel
//! offsets are byte offsets into that buffer and must be channel-aligned.

use std::collections::HashSet;

use image::imageops::{self, FilterType};
use image::{Rgba, RgbaImage};
use ndarray::Array2;

use crate::codec::{self, CHANNELS, OPAQUE};
use crate::error::{AnnotationError, Result};

/// Dense raster of object identifiers for a single label.
///
/// Width and height are fixed at creation. `0` marks an unlabeled pixel.
#[derive(Debug, Clone, PartialEq)]
pub struct AnnotationSurface {
    pixels: RgbaImage,
}

impl AnnotationSurface {
    /// Create a surface of the given size with every pixel unlabeled.
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            pixels: RgbaImage::from_pixel(width, height, Rgba([0, 0, 0, OPAQUE])),
        }
    }

    /// Build a surface from row-major identifiers.
    pub fn from_identifiers(width: u32, height: u32, identifiers: &[u32]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if identifiers.len() != expected {
            return Err(AnnotationError::LengthMismatch {
                offsets: expected,
                values: identifiers.len(),
            });
        }
        let mut raw = Vec::with_capacity(expected * CHANNELS);
        for &identifier in identifiers {
            raw.extend_from_slice(&codec::encode(identifier)?);
        }
        // Length was checked above, so the buffer always fits.
        let pixels = RgbaImage::from_raw(width, height, raw).ok_or(
            AnnotationError::LengthMismatch {
                offsets: expected,
                values: identifiers.len(),
            },
        )?;
        Ok(Self { pixels })
    }

    /// Build a surface from a `(height, width)` identifier array.
    pub fn from_array(identifiers: &Array2<u32>) -> Result<Self> {
        let (height, width) = identifiers.dim();
        let mismatch = || AnnotationError::LengthMismatch {
            offsets: u32::MAX as usize,
            values: identifiers.len(),
        };
        let width = u32::try_from(width).map_err(|_| mismatch())?;
        let height = u32::try_from(height).map_err(|_| mismatch())?;
        let row_major: Vec<u32> = identifiers.iter().copied().collect();
        Self::from_identifiers(width, height, &row_major)
    }

    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    /// Number of pixels on the surface.
    pub fn pixel_count(&self) -> usize {
        self.width() as usize * self.height() as usize
    }

    /// Length of the underlying RGBA buffer in bytes.
    pub fn byte_len(&self) -> usize {
        self.pixels.as_raw().len()
    }

    /// Byte offset of the pixel at `(x, y)`, if it lies on the surface.
    pub fn offset_of(&self, x: u32, y: u32) -> Option<usize> {
        (x < self.width() && y < self.height())
            .then(|| (y as usize * self.width() as usize + x as usize) * CHANNELS)
    }

    /// Validate a byte offset: in bounds and channel-aligned.
    pub fn check_offset(&self, offset: usize) -> Result<()> {
        if offset % CHANNELS != 0 || offset >= self.byte_len() {
            return Err(AnnotationError::OutOfBounds {
                offset,
                len: self.byte_len(),
            });
        }
        Ok(())
    }

    /// Read the identifier stored at a byte offset.
    pub fn get(&self, offset: usize) -> Result<u32> {
        self.check_offset(offset)?;
        let index = offset / CHANNELS;
        let width = self.width() as usize;
        let pixel = self
            .pixels
            .get_pixel((index % width) as u32, (index / width) as u32);
        Ok(codec::decode_pixel(&pixel.0))
    }

    /// Store an identifier at a byte offset.
    pub fn set(&mut self, offset: usize, identifier: u32) -> Result<()> {
        self.check_offset(offset)?;
        let pixel = codec::encode(identifier)?;
        self.write(offset, pixel);
        Ok(())
    }

    /// Write an already encoded pixel. Callers validate first.
    pub(crate) fn write(&mut self, offset: usize, pixel: [u8; 4]) {
        let raw: &mut [u8] = &mut self.pixels;
        raw[offset..offset + CHANNELS].copy_from_slice(&pixel);
    }

    /// Set every pixel to the same identifier.
    pub fn fill(&mut self, identifier: u32) -> Result<()> {
        let pixel = codec::encode(identifier)?;
        for p in self.pixels.pixels_mut() {
            *p = Rgba(pixel);
        }
        Ok(())
    }

    /// Resample the rendered pixels to a new size.
    ///
    /// This interpolates encoded colors, not identifiers: pixels along object
    /// edges can decode to identifiers that were never written. Only resize a
    /// surface before any annotation exists on it.
    pub fn resize(&mut self, width: u32, height: u32) {
        let mut resized = imageops::resize(&self.pixels, width, height, FilterType::Triangle);
        for p in resized.pixels_mut() {
            p[3] = OPAQUE;
        }
        log::debug!(
            "Resized surface {}x{} -> {}x{}",
            self.width(),
            self.height(),
            width,
            height
        );
        self.pixels = resized;
    }

    /// Iterate identifiers in row-major order.
    pub fn identifiers(&self) -> impl Iterator<Item = u32> + '_ {
        self.pixels.pixels().map(|p| codec::decode_pixel(&p.0))
    }

    /// Copy identifiers into a `(height, width)` array.
    pub fn to_array(&self) -> Array2<u32> {
        let shape = (self.height() as usize, self.width() as usize);
        Array2::from_shape_vec(shape, self.identifiers().collect())
            .unwrap_or_else(|_| Array2::zeros(shape))
    }

    /// Largest identifier present, `0` for an empty surface.
    pub fn max_identifier(&self) -> u32 {
        self.identifiers().max().unwrap_or(0)
    }

    /// Whether any pixel carries `identifier`.
    pub fn contains(&self, identifier: u32) -> bool {
        self.identifiers().any(|id| id == identifier)
    }

    /// Rewrite every pixel carrying `from` to `to`. Returns the pixel count.
    pub fn replace(&mut self, from: u32, to: u32) -> Result<usize> {
        let pixel = codec::encode(to)?;
        let mut count = 0;
        for p in self.pixels.pixels_mut() {
            if codec::decode_pixel(&p.0) == from {
                *p = Rgba(pixel);
                count += 1;
            }
        }
        Ok(count)
    }

    /// Close gaps in the identifier space below `upper`.
    ///
    /// Every value in `1..upper` that never occurs is treated as missing, and
    /// each stored identifier is lowered by the number of missing values below
    /// it, so surviving objects end up numbered contiguously from 1. Returns
    /// the missing values in ascending order.
    pub fn compact(&mut self, upper: u32) -> Vec<u32> {
        let present: HashSet<u32> = self.identifiers().collect();
        let missing: Vec<u32> = (1..upper).filter(|id| !present.contains(id)).collect();
        if missing.is_empty() {
            return missing;
        }

        for p in self.pixels.pixels_mut() {
            let identifier = codec::decode_pixel(&p.0);
            if identifier == 0 {
                continue;
            }
            let shift = missing.partition_point(|&m| m < identifier) as u32;
            if shift > 0 {
                let [b0, b1, b2, _] = (identifier - shift).to_le_bytes();
                *p = Rgba([b0, b1, b2, OPAQUE]);
            }
        }
        log::debug!("Compacted surface, closed {} gaps", missing.len());
        missing
    }

    /// The encoded RGBA buffer.
    pub fn as_raw(&self) -> &[u8] {
        self.pixels.as_raw()
    }

    /// The encoded surface as an image.
    pub fn as_image(&self) -> &RgbaImage {
        &self.pixels
    }
}
