//! Per-label annotation session.
//!
//! [`Annotator`] owns exactly one [`AnnotationSurface`] and one
//! [`HistoryLedger`] per registered label, plus the shared display palette.
//! All identifier writes go through [`Annotator::apply`], [`Annotator::undo`]
//! and [`Annotator::redo`]; the host UI re-derives its visual layers from the
//! surfaces after each call.
//!
//! ## Usage
//!
//! ```rust,ignore
//! let config = AnnotatorConfig::new(["leaf", "stem"]);
//! let mut annotator = Annotator::new(config, 640, 480)?;
//! let leaf = annotator.label_index("leaf").unwrap();
//!
//! annotator.apply(leaf, &pixels, 1)?;
//! annotator.create_new_object(leaf)?;
//! annotator.undo(leaf)?;
//!
//! if let Some(png) = annotator.export_artifact()? {
//!     // hand the bytes to the host for upload
//! }
//! ```

mod engine;
mod objects;
mod transfer;

use std::collections::BTreeSet;
use std::fmt;

use crate::config::AnnotatorConfig;
use crate::error::{AnnotationError, Result};
use crate::history::HistoryLedger;
use crate::palette::Palette;
use crate::surface::AnnotationSurface;

pub use engine::{ApplyOutcome, FillTarget, ObjectNumbers};
pub use transfer::ImportSummary;

/// Stable index of a registered label.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelIndex(pub usize);

impl fmt::Display for LabelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Everything the core tracks for one label.
#[derive(Debug, Clone)]
pub(crate) struct LabelState {
    pub(crate) name: String,
    pub(crate) surface: AnnotationSurface,
    pub(crate) ledger: HistoryLedger,
    /// Object number new pixels are assigned to (the "open" object)
    pub(crate) current_object_number: u32,
    /// At least one pixel was committed to the open object since it was created
    pub(crate) pending: bool,
    /// Object numbers removed with `delete_object`, closed on export
    pub(crate) deleted: BTreeSet<u32>,
}

impl LabelState {
    fn new(name: String, width: u32, height: u32, config: &AnnotatorConfig) -> Result<Self> {
        let mut state = Self {
            name,
            surface: AnnotationSurface::new(width, height),
            ledger: HistoryLedger::with_config(config.history()),
            current_object_number: 0,
            pending: false,
            deleted: BTreeSet::new(),
        };
        state.reset(config.default_object_number)?;
        Ok(state)
    }

    fn reset(&mut self, default_object_number: u32) -> Result<()> {
        self.surface.fill(default_object_number)?;
        self.current_object_number = default_object_number + 1;
        self.pending = false;
        self.ledger.clear();
        self.deleted.clear();
        Ok(())
    }

    /// Largest object number that may carry pixels.
    pub(crate) fn max_object_number(&self) -> u32 {
        if self.pending {
            self.current_object_number
        } else {
            self.current_object_number.saturating_sub(1)
        }
    }

    /// Bookkeeping after identifiers were written to the surface: writing the
    /// open object marks it pending, and a written object is live again.
    pub(crate) fn note_written(&mut self, identifiers: impl IntoIterator<Item = u32>) {
        for identifier in identifiers {
            if identifier == 0 {
                continue;
            }
            if identifier == self.current_object_number {
                self.pending = true;
            }
            self.deleted.remove(&identifier);
        }
    }

    /// Replace the whole label state with imported data.
    pub(crate) fn replace_surface(&mut self, surface: AnnotationSurface, current_object_number: u32) {
        self.pending = surface.contains(current_object_number);
        self.surface = surface;
        self.current_object_number = current_object_number;
        self.ledger.clear();
        self.deleted.clear();
    }
}

/// Annotation state for every label of one image.
#[derive(Debug, Clone)]
pub struct Annotator {
    config: AnnotatorConfig,
    width: u32,
    height: u32,
    labels: Vec<LabelState>,
    palette: Palette,
}

impl Annotator {
    /// Create a session with one empty surface per configured label.
    pub fn new(config: AnnotatorConfig, width: u32, height: u32) -> Result<Self> {
        config.validate()?;
        let labels = config
            .labels
            .iter()
            .map(|name| LabelState::new(name.clone(), width, height, &config))
            .collect::<Result<Vec<_>>>()?;
        let mut palette = Palette::from_colors(config.palette.clone());
        palette.ensure_len(labels.len().max(2));

        log::debug!(
            "Annotator created: {}x{}, {} labels",
            width,
            height,
            labels.len()
        );

        Ok(Self {
            config,
            width,
            height,
            labels,
            palette,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn config(&self) -> &AnnotatorConfig {
        &self.config
    }

    /// Number of registered labels.
    pub fn label_count(&self) -> usize {
        self.labels.len()
    }

    /// All label indices in registration order.
    pub fn labels(&self) -> impl Iterator<Item = LabelIndex> + '_ {
        (0..self.labels.len()).map(LabelIndex)
    }

    /// Look up a label by name.
    pub fn label_index(&self, name: &str) -> Option<LabelIndex> {
        self.labels
            .iter()
            .position(|state| state.name == name)
            .map(LabelIndex)
    }

    /// Name of a label.
    pub fn label_name(&self, label: LabelIndex) -> Result<&str> {
        Ok(&self.state(label)?.name)
    }

    /// The canonical surface of a label.
    pub fn surface(&self, label: LabelIndex) -> Result<&AnnotationSurface> {
        Ok(&self.state(label)?.surface)
    }

    /// The history ledger of a label.
    pub fn history(&self, label: LabelIndex) -> Result<&HistoryLedger> {
        Ok(&self.state(label)?.ledger)
    }

    /// The open object number of a label.
    pub fn current_object_number(&self, label: LabelIndex) -> Result<u32> {
        Ok(self.state(label)?.current_object_number)
    }

    /// Whether the open object of a label already holds pixels.
    pub fn has_pending_object(&self, label: LabelIndex) -> Result<bool> {
        Ok(self.state(label)?.pending)
    }

    /// Object numbers removed since the last export.
    pub fn deleted_objects(&self, label: LabelIndex) -> Result<&BTreeSet<u32>> {
        Ok(&self.state(label)?.deleted)
    }

    /// The shared display palette.
    pub fn palette(&self) -> &Palette {
        &self.palette
    }

    /// Reinitialize a label: default identifier everywhere, history and
    /// deleted set cleared.
    pub fn reset_label(&mut self, label: LabelIndex) -> Result<()> {
        let default_object_number = self.config.default_object_number;
        self.state_mut(label)?.reset(default_object_number)?;
        log::debug!("Label {} reinitialized", label);
        Ok(())
    }

    /// Resample every label surface to a new image size.
    ///
    /// Lossy along object edges (see [`AnnotationSurface::resize`]); histories
    /// are cleared since their offsets no longer apply.
    pub fn resize(&mut self, width: u32, height: u32) {
        for state in &mut self.labels {
            state.surface.resize(width, height);
            state.ledger.clear();
        }
        self.width = width;
        self.height = height;
    }

    pub(crate) fn palette_mut(&mut self) -> &mut Palette {
        &mut self.palette
    }

    pub(crate) fn state(&self, label: LabelIndex) -> Result<&LabelState> {
        self.labels
            .get(label.0)
            .ok_or(AnnotationError::UnknownLabel(label))
    }

    pub(crate) fn state_mut(&mut self, label: LabelIndex) -> Result<&mut LabelState> {
        self.labels
            .get_mut(label.0)
            .ok_or(AnnotationError::UnknownLabel(label))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn annotator() -> Annotator {
        Annotator::new(AnnotatorConfig::new(["person", "car"]), 4, 3).unwrap()
    }

    #[test]
    fn test_new_registers_labels() {
        let annotator = annotator();
        assert_eq!(annotator.label_count(), 2);
        assert_eq!(annotator.label_index("car"), Some(LabelIndex(1)));
        assert_eq!(annotator.label_index("bus"), None);
        assert_eq!(annotator.label_name(LabelIndex(0)).unwrap(), "person");
        assert_eq!(
            annotator.labels().collect::<Vec<_>>(),
            vec![LabelIndex(0), LabelIndex(1)]
        );
    }

    #[test]
    fn test_new_label_state() {
        let annotator = annotator();
        let label = LabelIndex(0);
        assert_eq!(annotator.current_object_number(label).unwrap(), 1);
        assert!(!annotator.has_pending_object(label).unwrap());
        assert!(!annotator.history(label).unwrap().can_undo());
        let surface = annotator.surface(label).unwrap();
        assert_eq!((surface.width(), surface.height()), (4, 3));
        assert!(surface.identifiers().all(|id| id == 0));
    }

    #[test]
    fn test_unknown_label() {
        let annotator = annotator();
        assert!(matches!(
            annotator.surface(LabelIndex(7)),
            Err(AnnotationError::UnknownLabel(LabelIndex(7)))
        ));
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = AnnotatorConfig::new(["a", "a"]);
        assert!(Annotator::new(config, 2, 2).is_err());
    }

    #[test]
    fn test_reset_label() {
        let mut annotator = annotator();
        let label = LabelIndex(1);
        annotator.apply(label, &[0, 4], 1).unwrap();
        annotator.reset_label(label).unwrap();

        assert!(annotator.surface(label).unwrap().identifiers().all(|id| id == 0));
        assert!(!annotator.history(label).unwrap().can_undo());
        assert_eq!(annotator.current_object_number(label).unwrap(), 1);
        assert!(!annotator.has_pending_object(label).unwrap());
    }

    #[test]
    fn test_resize_unannotated_labels() {
        let mut annotator = annotator();
        annotator.resize(8, 6);
        assert_eq!((annotator.width(), annotator.height()), (8, 6));
        let surface = annotator.surface(LabelIndex(0)).unwrap();
        assert_eq!(surface.pixel_count(), 48);
        assert!(surface.identifiers().all(|id| id == 0));
    }

    #[test]
    fn test_default_object_number_initializes_surface() {
        let mut config = AnnotatorConfig::new(["a"]);
        config.default_object_number = 2;
        let annotator = Annotator::new(config, 2, 2).unwrap();
        let label = LabelIndex(0);
        assert!(annotator.surface(label).unwrap().identifiers().all(|id| id == 2));
        assert_eq!(annotator.current_object_number(label).unwrap(), 3);
    }
}
