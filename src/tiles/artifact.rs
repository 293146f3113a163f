//! Read-only view of an exported artifact.
//!
//! Offline tooling uses this to list the labels packed in an annotation file
//! and pull out per-label masks without an [`crate::Annotator`].

use image::RgbaImage;
use ndarray::Array2;

use crate::codec::CHANNELS;
use crate::error::{AnnotationError, Result};
use crate::tiles::data_uri;
use crate::tiles::metadata::{TileMetadata, TilePlacement};
use crate::tiles::pack::read_artifact;

/// A parsed tile artifact.
#[derive(Debug, Clone)]
pub struct TileArtifact {
    metadata: TileMetadata,
    canvas: RgbaImage,
    tile_height: u32,
}

impl TileArtifact {
    /// Parse artifact bytes.
    pub fn parse(bytes: &[u8]) -> Result<Self> {
        let (metadata, canvas) = read_artifact(bytes)?;
        let tiles = u32::try_from(metadata.tile_count())
            .map_err(|_| AnnotationError::import_failed("too many tiles"))?;
        let tile_height = match tiles {
            0 => canvas.height(),
            tiles if canvas.height() % tiles == 0 => canvas.height() / tiles,
            tiles => {
                return Err(AnnotationError::import_failed(format!(
                    "canvas height {} does not split into {} tiles",
                    canvas.height(),
                    tiles
                )));
            }
        };
        Ok(Self {
            metadata,
            canvas,
            tile_height,
        })
    }

    /// Parse a `data:image/png;base64,` URI.
    pub fn from_data_uri(uri: &str) -> Result<Self> {
        Self::parse(&data_uri::from_data_uri(uri)?)
    }

    /// Width of one tile (and of the annotated image).
    pub fn width(&self) -> u32 {
        self.canvas.width()
    }

    /// Height of one tile (and of the annotated image).
    pub fn tile_height(&self) -> u32 {
        self.tile_height
    }

    pub fn metadata(&self) -> &TileMetadata {
        &self.metadata
    }

    /// The packed canvas as decoded.
    pub fn canvas(&self) -> &RgbaImage {
        &self.canvas
    }

    /// Label names in pack order.
    pub fn classes(&self) -> Vec<&str> {
        self.metadata.entries().map(|(label, _)| label).collect()
    }

    /// Placement of a label, if packed.
    pub fn placement(&self, label: &str) -> Option<TilePlacement> {
        self.metadata.get(label)
    }

    /// The raw byte plane of a label, shaped `(tile_height, width)`.
    ///
    /// `None` when the label is not packed or its band lies outside the canvas.
    pub fn plane(&self, label: &str) -> Option<Array2<u8>> {
        let placement = self.placement(label)?;
        let width = self.width() as usize;
        let height = self.tile_height as usize;
        let band_len = width.checked_mul(height)?.checked_mul(CHANNELS)?;
        let band_start = placement.tile.checked_mul(band_len)?;
        let band = self
            .canvas
            .as_raw()
            .get(band_start..band_start.checked_add(band_len)?)?;
        Some(Array2::from_shape_fn((height, width), |(y, x)| {
            band[(y * width + x) * CHANNELS + placement.channel]
        }))
    }

    /// Object mask of a label. With `binary`, every object pixel becomes `1`;
    /// otherwise object numbers are kept.
    pub fn mask(&self, label: &str, binary: bool) -> Option<Array2<u8>> {
        let plane = self.plane(label)?;
        Some(if binary {
            plane.mapv(|value| u8::from(value != 0))
        } else {
            plane
        })
    }
}
