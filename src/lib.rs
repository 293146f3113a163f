//! Segment Annotation - per-pixel annotation model
//!
//! The data model behind a segmentation annotation widget. Every label owns an
//! [`AnnotationSurface`] storing one object identifier per pixel (encoded into
//! ordinary RGBA channels by [`codec`]), and a bounded [`HistoryLedger`] of
//! differential edits. The [`Annotator`] is the single write path over both,
//! and the [`tiles`] module packs all labels into one PNG artifact with an
//! embedded, checksummed placement table.
//!
//! Rendering, superpixel segmentation and network transport belong to the
//! host; the core only ever sees pixel offsets, identifiers and byte buffers.

pub mod annotator;
pub mod codec;
pub mod config;
pub mod error;
pub mod history;
pub mod morph;
pub mod palette;
pub mod region;
pub mod snapshot;
pub mod surface;
pub mod tiles;

pub use annotator::{
    Annotator, ApplyOutcome, FillTarget, ImportSummary, LabelIndex, ObjectNumbers,
};
pub use config::AnnotatorConfig;
pub use error::{AnnotationError, Result};
pub use history::{DiffRecord, HistoryConfig, HistoryLedger, HistoryStep};
pub use palette::Palette;
pub use region::{Point, PolygonTrace, SegmentIndex};
pub use snapshot::{LabelSnapshot, Snapshot};
pub use surface::AnnotationSurface;
pub use tiles::TileArtifact;
