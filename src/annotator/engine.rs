//! The single write path: differential apply, undo and redo.

use std::collections::HashMap;

use ndarray::Array2;

use crate::annotator::{Annotator, LabelIndex};
use crate::codec::{self, CHANNELS};
use crate::error::{AnnotationError, Result};
use crate::history::{DiffRecord, HistoryStep};
use crate::morph;

// ============================================================================
// Request / Outcome Types
// ============================================================================

/// Object numbers for a write batch: one for every pixel, or one per pixel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObjectNumbers {
    /// Every offset receives the same object number
    Uniform(u32),
    /// Parallel to the offsets
    PerPixel(Vec<u32>),
}

impl ObjectNumbers {
    fn get(&self, index: usize) -> u32 {
        match self {
            ObjectNumbers::Uniform(value) => *value,
            ObjectNumbers::PerPixel(values) => values[index],
        }
    }

    fn check_len(&self, offsets: usize) -> Result<()> {
        match self {
            ObjectNumbers::PerPixel(values) if values.len() != offsets => {
                Err(AnnotationError::LengthMismatch {
                    offsets,
                    values: values.len(),
                })
            }
            _ => Ok(()),
        }
    }
}

impl From<u32> for ObjectNumbers {
    fn from(value: u32) -> Self {
        ObjectNumbers::Uniform(value)
    }
}

impl From<Vec<u32>> for ObjectNumbers {
    fn from(values: Vec<u32>) -> Self {
        ObjectNumbers::PerPixel(values)
    }
}

impl From<&[u32]> for ObjectNumbers {
    fn from(values: &[u32]) -> Self {
        ObjectNumbers::PerPixel(values.to_vec())
    }
}

/// Result of an [`Annotator::apply`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ApplyOutcome {
    /// Whether any pixel changed (and a history record was written)
    pub changed: bool,
    /// Number of pixels that changed
    pub changed_pixels: usize,
}

impl ApplyOutcome {
    fn unchanged() -> Self {
        Self {
            changed: false,
            changed_pixels: 0,
        }
    }
}

/// Which pixels [`Annotator::fill`] assigns to the open object.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillTarget {
    /// Every pixel of the surface
    All,
    /// Only pixels not yet assigned to any object
    Unlabeled,
    /// Only pixels already labeled
    Labeled,
}

// ============================================================================
// Apply / Undo / Redo
// ============================================================================

impl Annotator {
    /// Write `objects` at `offsets` on a label's surface.
    ///
    /// The request is validated as a whole before anything is touched. Only
    /// pixels whose value actually changes are written and recorded; a batch
    /// with no effective change records nothing and reports `changed: false`.
    /// Object number `0` erases.
    pub fn apply(
        &mut self,
        label: LabelIndex,
        offsets: &[usize],
        objects: impl Into<ObjectNumbers>,
    ) -> Result<ApplyOutcome> {
        let objects = objects.into();
        let state = self.state(label)?;
        objects.check_len(offsets.len())?;

        let limit = state.current_object_number;
        for (i, &offset) in offsets.iter().enumerate() {
            state.surface.check_offset(offset)?;
            let identifier = objects.get(i);
            codec::validate(identifier)?;
            if identifier > limit {
                return Err(AnnotationError::InvalidIdentifier { identifier, limit });
            }
        }

        let diff = self.differential(label, offsets, &objects)?;
        if diff.is_empty() {
            log::trace!("Apply on label {}: no change", label);
            return Ok(ApplyOutcome::unchanged());
        }

        let changed_pixels = diff.len();
        let max_written = diff.next_object_numbers.iter().copied().max().unwrap_or(0);
        self.palette.ensure_index(max_written);

        let state = self.state_mut(label)?;
        for (offset, identifier) in diff.redo_writes() {
            state.surface.write(offset, codec::encode(identifier)?);
        }
        state.note_written(diff.next_object_numbers.iter().copied());
        state.ledger.record(diff);

        log::trace!("Apply on label {}: {} pixels changed", label, changed_pixels);
        Ok(ApplyOutcome {
            changed: true,
            changed_pixels,
        })
    }

    /// Positions whose (label, identifier) pair differs from the request.
    fn differential(
        &self,
        label: LabelIndex,
        offsets: &[usize],
        objects: &ObjectNumbers,
    ) -> Result<DiffRecord> {
        let surface = &self.state(label)?.surface;
        let mut diff = DiffRecord::new();
        // Values already requested earlier in this batch; later writes see them.
        let mut staged: HashMap<usize, u32> = HashMap::new();
        for (i, &offset) in offsets.iter().enumerate() {
            let current = match staged.get(&offset) {
                Some(&value) => value,
                None => surface.get(offset)?,
            };
            // Identifiers are label-local: nonzero on this surface means "labeled as `label`".
            let current_label = (current != 0).then_some(label);
            let requested = objects.get(i);
            let requested_label = (requested != 0).then_some(label);
            if current_label != requested_label || current != requested {
                diff.push(offset, (current_label, current), (requested_label, requested));
                staged.insert(offset, requested);
            }
        }
        Ok(diff)
    }

    /// Revert the most recent applied record of a label.
    pub fn undo(&mut self, label: LabelIndex) -> Result<HistoryStep> {
        let state = self.state_mut(label)?;
        let Some(record) = state.ledger.step_back() else {
            return Ok(HistoryStep::Exhausted);
        };
        for (offset, identifier) in record.undo_writes() {
            state.surface.set(offset, identifier)?;
        }
        let written: Vec<u32> = record.prev_object_numbers.clone();
        state.note_written(written);
        let more = state.ledger.can_undo();
        log::debug!("⏪ Undo on label {} (more: {})", label, more);
        Ok(HistoryStep::Applied { more })
    }

    /// Reapply the next undone record of a label.
    pub fn redo(&mut self, label: LabelIndex) -> Result<HistoryStep> {
        let state = self.state_mut(label)?;
        let Some(record) = state.ledger.step_forward() else {
            return Ok(HistoryStep::Exhausted);
        };
        for (offset, identifier) in record.redo_writes() {
            state.surface.set(offset, identifier)?;
        }
        let written: Vec<u32> = record.next_object_numbers.clone();
        state.note_written(written);
        let more = state.ledger.can_redo();
        log::debug!("⏩ Redo on label {} (more: {})", label, more);
        Ok(HistoryStep::Applied { more })
    }

    /// Assign the open object to every pixel matching `target`, as one undo step.
    pub fn fill(&mut self, label: LabelIndex, target: FillTarget) -> Result<ApplyOutcome> {
        let state = self.state(label)?;
        let open = state.current_object_number;
        let offsets: Vec<usize> = state
            .surface
            .identifiers()
            .enumerate()
            .filter(|&(_, id)| match target {
                FillTarget::All => true,
                FillTarget::Unlabeled => id == 0,
                FillTarget::Labeled => id != 0,
            })
            .map(|(i, _)| i * CHANNELS)
            .collect();
        self.apply(label, &offsets, open)
    }

    /// Smooth a label with a 3×3 mode filter, as one undo step.
    pub fn denoise(&mut self, label: LabelIndex) -> Result<ApplyOutcome> {
        let identifiers: Array2<u32> = self.state(label)?.surface.to_array();
        let filtered = morph::mode_filter(&identifiers);
        let offsets: Vec<usize> = (0..filtered.len()).map(|i| i * CHANNELS).collect();
        let objects: Vec<u32> = filtered.iter().copied().collect();
        self.apply(label, &offsets, objects)
    }

    /// Whether a label has an undo step available.
    pub fn can_undo(&self, label: LabelIndex) -> Result<bool> {
        Ok(self.state(label)?.ledger.can_undo())
    }

    /// Whether a label has a redo step available.
    pub fn can_redo(&self, label: LabelIndex) -> Result<bool> {
        Ok(self.state(label)?.ledger.can_redo())
    }
}
