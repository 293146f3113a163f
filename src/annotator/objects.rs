//! Object lifecycle: opening new objects and deleting existing ones.

use crate::annotator::{Annotator, LabelIndex};
use crate::codec::MAX_IDENTIFIER;
use crate::error::{AnnotationError, Result};

impl Annotator {
    /// Open a new object on a label.
    ///
    /// Only allowed once the current open object holds at least one pixel, so
    /// object numbers are never handed out for empty objects. Returns the new
    /// object number, or `None` when the request is rejected.
    pub fn create_new_object(&mut self, label: LabelIndex) -> Result<Option<u32>> {
        let state = self.state_mut(label)?;
        if !state.pending {
            log::debug!(
                "Label {}: object {} is still empty, not creating a new one",
                label,
                state.current_object_number
            );
            return Ok(None);
        }
        let next = state.current_object_number + 1;
        if next > MAX_IDENTIFIER {
            return Err(AnnotationError::InvalidIdentifier {
                identifier: next,
                limit: MAX_IDENTIFIER,
            });
        }
        state.current_object_number = next;
        state.pending = false;

        let added = self.palette.ensure_index(next);
        log::debug!(
            "Label {}: opened object {} ({} palette colors added)",
            label,
            next,
            added
        );
        Ok(Some(next))
    }

    /// Erase every pixel of an object.
    ///
    /// Remaining objects keep their numbers; the gap is closed on the next
    /// export. Deletion bypasses the history ledger and cannot be undone.
    /// Returns the number of pixels cleared.
    pub fn delete_object(&mut self, label: LabelIndex, object_number: u32) -> Result<usize> {
        let state = self.state_mut(label)?;
        if object_number == 0 {
            return Ok(0);
        }
        let cleared = state.surface.replace(object_number, 0)?;
        state.deleted.insert(object_number);
        if object_number == state.current_object_number {
            state.pending = false;
        }
        log::debug!(
            "Label {}: deleted object {} ({} pixels)",
            label,
            object_number,
            cleared
        );
        Ok(cleared)
    }

    /// Live object numbers of a label, in ascending order.
    ///
    /// Deleted objects are left out; the open object is listed once it holds
    /// pixels.
    pub fn object_numbers(&self, label: LabelIndex) -> Result<Vec<u32>> {
        let state = self.state(label)?;
        Ok((1..=state.max_object_number())
            .filter(|n| !state.deleted.contains(n))
            .collect())
    }

    /// Largest object number of a label that may hold pixels; `0` if none.
    pub fn max_object_number(&self, label: LabelIndex) -> Result<u32> {
        Ok(self.state(label)?.max_object_number())
    }
}
