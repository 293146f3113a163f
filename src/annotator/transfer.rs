//! Export to and import from tile artifacts.

use web_time::Instant;

use crate::annotator::{Annotator, LabelIndex};
use crate::error::{AnnotationError, Result};
use crate::surface::AnnotationSurface;
use crate::tiles::{self, LabelPlane, TileArtifact};

/// What an import changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportSummary {
    /// Labels whose surfaces were replaced, in pack order
    pub imported: Vec<LabelIndex>,
    /// Label names found in the artifact but not registered here
    pub skipped: Vec<String>,
}

/// A label ready to be committed after export succeeds.
struct Compacted {
    label: LabelIndex,
    surface: AnnotationSurface,
    gaps: usize,
}

impl Annotator {
    /// Pack every label that has objects into one PNG artifact.
    ///
    /// Object numbers are compacted first so the artifact never contains
    /// gaps; the compacted numbering is then committed to the labels (a label
    /// whose numbering changed loses its history). Returns `None` when no label
    /// has any object.
    pub fn export_artifact(&mut self) -> Result<Option<Vec<u8>>> {
        let started = Instant::now();

        let mut compacted = Vec::new();
        let mut planes = Vec::new();
        for (i, state) in self.labels.iter().enumerate() {
            if state.max_object_number() == 0 {
                continue;
            }
            let mut surface = state.surface.clone();
            let gaps = surface.compact(state.current_object_number).len();
            let values = surface
                .identifiers()
                .map(|identifier| {
                    u8::try_from(identifier).map_err(|_| AnnotationError::InvalidIdentifier {
                        identifier,
                        limit: u32::from(u8::MAX),
                    })
                })
                .collect::<Result<Vec<u8>>>()?;
            planes.push(LabelPlane {
                label: state.name.clone(),
                values,
            });
            compacted.push(Compacted {
                label: LabelIndex(i),
                surface,
                gaps,
            });
        }

        if planes.is_empty() {
            log::info!("Nothing to export: no label has objects");
            return Ok(None);
        }

        let (canvas, metadata) = tiles::pack(self.width, self.height, &planes)?;
        let bytes = tiles::write_artifact(&canvas, &metadata)?;

        for Compacted {
            label,
            surface,
            gaps,
        } in compacted
        {
            let state = self.state_mut(label)?;
            state.surface = surface;
            state.deleted.clear();
            if gaps > 0 {
                state.current_object_number -= gaps as u32;
                state.ledger.clear();
                log::debug!(
                    "Label {}: closed {} gaps, open object is now {}",
                    label,
                    gaps,
                    state.current_object_number
                );
            }
        }

        log::info!(
            "Exported {} labels in {} tiles ({} bytes) in {:?}",
            metadata.len(),
            metadata.tile_count(),
            bytes.len(),
            started.elapsed()
        );
        Ok(Some(bytes))
    }

    /// [`Annotator::export_artifact`] wrapped in a PNG data URI.
    pub fn export_artifact_uri(&mut self) -> Result<Option<String>> {
        Ok(self
            .export_artifact()?
            .map(|bytes| tiles::to_data_uri(&bytes)))
    }

    /// Replace label surfaces with the planes of an artifact.
    ///
    /// Unknown labels are skipped with a warning. Every plane is decoded and
    /// checked before any label is touched, so a failed import leaves the
    /// session unchanged. An imported label's open object number becomes its
    /// largest object number plus one; its history and deleted set are
    /// cleared.
    pub fn import_artifact(&mut self, bytes: &[u8]) -> Result<ImportSummary> {
        let started = Instant::now();
        let artifact = TileArtifact::parse(bytes).inspect_err(|e| {
            log::warn!("Artifact import failed: {}", e);
        })?;

        if artifact.width() != self.width || artifact.tile_height() != self.height {
            let err = AnnotationError::import_failed(format!(
                "artifact tiles are {}x{}, image is {}x{}",
                artifact.width(),
                artifact.tile_height(),
                self.width,
                self.height
            ));
            log::warn!("Artifact import failed: {}", err);
            return Err(err);
        }

        let mut summary = ImportSummary::default();
        let mut staged = Vec::new();
        for label_name in artifact.classes() {
            let Some(label) = self.label_index(label_name) else {
                log::warn!("Skipping unknown label '{}' in artifact", label_name);
                summary.skipped.push(label_name.to_string());
                continue;
            };
            let Some(plane) = artifact.plane(label_name) else {
                continue;
            };
            let identifiers = plane.mapv(u32::from);
            let surface = AnnotationSurface::from_array(&identifiers)?;
            let max = surface.max_identifier();
            staged.push((label, surface, max));
        }

        for (label, surface, max) in staged {
            let state = self.state_mut(label)?;
            state.replace_surface(surface, max + 1);
            self.palette.ensure_index(max);
            summary.imported.push(label);
        }

        log::info!(
            "Imported {} labels ({} skipped) in {:?}",
            summary.imported.len(),
            summary.skipped.len(),
            started.elapsed()
        );
        Ok(summary)
    }

    /// [`Annotator::import_artifact`] from a PNG data URI.
    pub fn import_artifact_uri(&mut self, uri: &str) -> Result<ImportSummary> {
        let bytes = tiles::from_data_uri(uri)?;
        self.import_artifact(&bytes)
    }
}
