//! TileCodec: the exported annotation artifact.
//!
//! All exported labels are packed into one PNG. Each label's object numbers
//! occupy a single byte plane: one color channel of one horizontal band
//! ("tile") of the canvas, three labels per band. A custom ancillary chunk of
//! type `tEXT`, spliced in right after `IHDR`, maps label names to their
//! `[tile, channel]` placement and is guarded by a CRC-32.
//!
//! ```text
//! [PNG signature][IHDR][len BE]["tEXT"][metadata][CRC32 BE over tag+metadata][IDAT..][IEND]
//! ```
//!
//! The [`crate::Annotator`] drives export and import; [`TileArtifact`] reads
//! artifacts on its own.

mod artifact;
pub mod chunk;
pub mod crc;
pub mod data_uri;
mod metadata;
mod pack;

#[cfg(test)]
mod tests;

pub use artifact::TileArtifact;
pub use data_uri::{from_data_uri, to_data_uri};
pub use metadata::{TileMetadata, TilePlacement};
pub use pack::{LabelPlane, encode_png, pack, read_artifact, write_artifact};

/// Chunk type tag of the metadata chunk.
pub const METADATA_CHUNK: [u8; 4] = *b"tEXT";

/// Label planes per tile band (R, G and B).
pub const CHANNELS_PER_TILE: usize = 3;
