//! Bounded per-label undo/redo log.
//!
//! Every accepted write batch is recorded as a [`DiffRecord`] holding only the
//! pixels that actually changed, with their previous and next values. The
//! [`HistoryLedger`] keeps a linear history with a cursor:
//!
//! - recording after one or more undos discards the redo branch
//! - once `max_history_record` records are held, the oldest is evicted and the
//!   cursor stays where it is

use std::collections::VecDeque;

use crate::annotator::LabelIndex;

// ============================================================================
// Diff Records
// ============================================================================

/// The differential of one accepted write batch.
///
/// All vectors are parallel and the same length as `offsets`. A record is
/// never empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct DiffRecord {
    /// Byte offsets of the pixels that changed, in request order
    pub offsets: Vec<usize>,
    /// Label of each pixel before the write (`None` = unlabeled)
    pub prev_labels: Vec<Option<LabelIndex>>,
    /// Identifier of each pixel before the write
    pub prev_object_numbers: Vec<u32>,
    /// Label of each pixel after the write
    pub next_labels: Vec<Option<LabelIndex>>,
    /// Identifier of each pixel after the write
    pub next_object_numbers: Vec<u32>,
}

impl DiffRecord {
    /// Create an empty record to accumulate changes into.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one changed pixel.
    pub fn push(
        &mut self,
        offset: usize,
        prev: (Option<LabelIndex>, u32),
        next: (Option<LabelIndex>, u32),
    ) {
        self.offsets.push(offset);
        self.prev_labels.push(prev.0);
        self.prev_object_numbers.push(prev.1);
        self.next_labels.push(next.0);
        self.next_object_numbers.push(next.1);
    }

    /// Number of changed pixels.
    pub fn len(&self) -> usize {
        self.offsets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.offsets.is_empty()
    }

    /// `(offset, identifier)` pairs that undo this record, newest change first.
    pub fn undo_writes(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.offsets
            .iter()
            .copied()
            .zip(self.prev_object_numbers.iter().copied())
            .rev()
    }

    /// `(offset, identifier)` pairs that redo this record, in request order.
    pub fn redo_writes(&self) -> impl Iterator<Item = (usize, u32)> + '_ {
        self.offsets
            .iter()
            .copied()
            .zip(self.next_object_numbers.iter().copied())
    }
}

// ============================================================================
// Ledger
// ============================================================================

/// Configuration for a history ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    /// Maximum number of records kept
    pub max_history_record: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            max_history_record: 15,
        }
    }
}

/// Outcome of an undo or redo request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistoryStep {
    /// A record was applied; `more` tells whether another step in the same
    /// direction is available.
    Applied { more: bool },
    /// Already at the boundary; nothing changed.
    Exhausted,
}

impl HistoryStep {
    /// Whether the step changed the surface.
    pub fn applied(self) -> bool {
        matches!(self, HistoryStep::Applied { .. })
    }

    /// Whether another step in the same direction is available.
    pub fn has_more(self) -> bool {
        matches!(self, HistoryStep::Applied { more: true })
    }
}

/// Linear undo/redo history for one label.
///
/// `cursor` is the index of the most recently applied record, `None` when
/// nothing is applied (no history, or everything undone).
#[derive(Debug, Clone, Default)]
pub struct HistoryLedger {
    records: VecDeque<DiffRecord>,
    cursor: Option<usize>,
    config: HistoryConfig,
}

impl HistoryLedger {
    /// Create an empty ledger with the default capacity.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create with custom configuration
    pub fn with_config(config: HistoryConfig) -> Self {
        Self {
            config,
            ..Default::default()
        }
    }

    /// Record a new diff, discarding any redo branch.
    ///
    /// Empty diffs are ignored.
    pub fn record(&mut self, diff: DiffRecord) {
        if diff.is_empty() {
            return;
        }
        let keep = self.cursor.map_or(0, |c| c + 1);
        self.records.truncate(keep);
        log::debug!("📝 History: recorded {} changed pixels", diff.len());
        self.records.push_back(diff);

        if self.records.len() > self.config.max_history_record {
            // Oldest state becomes unreachable; cursor index now names the new record.
            self.records.pop_front();
            if self.records.is_empty() {
                self.cursor = None;
            }
        } else {
            self.cursor = Some(keep);
        }
    }

    /// Move the cursor back and return the record to revert.
    pub fn step_back(&mut self) -> Option<&DiffRecord> {
        let current = self.cursor?;
        self.cursor = current.checked_sub(1);
        log::debug!("⏪ History: undo record {}", current);
        self.records.get(current)
    }

    /// Move the cursor forward and return the record to reapply.
    pub fn step_forward(&mut self) -> Option<&DiffRecord> {
        let next = self.cursor.map_or(0, |c| c + 1);
        if next >= self.records.len() {
            return None;
        }
        self.cursor = Some(next);
        log::debug!("⏩ History: redo record {}", next);
        self.records.get(next)
    }

    /// Check if undo is available
    pub fn can_undo(&self) -> bool {
        self.cursor.is_some()
    }

    /// Check if redo is available
    pub fn can_redo(&self) -> bool {
        self.cursor.map_or(0, |c| c + 1) < self.records.len()
    }

    /// Index of the most recently applied record.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    /// Number of records held.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Number of undo steps available.
    pub fn undo_count(&self) -> usize {
        self.cursor.map_or(0, |c| c + 1)
    }

    /// Number of redo steps available.
    pub fn redo_count(&self) -> usize {
        self.records.len() - self.undo_count()
    }

    pub fn config(&self) -> HistoryConfig {
        self.config
    }

    /// Clear all history
    pub fn clear(&mut self) {
        self.records.clear();
        self.cursor = None;
        log::debug!("🗑️ History cleared");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn diff(offset: usize, prev: u32, next: u32) -> DiffRecord {
        let mut record = DiffRecord::new();
        let label = Some(LabelIndex(0));
        record.push(
            offset,
            ((prev > 0).then_some(LabelIndex(0)), prev),
            (label, next),
        );
        record
    }

    #[test]
    fn test_ledger_basic() {
        let mut ledger = HistoryLedger::new();
        assert!(!ledger.can_undo());
        assert!(!ledger.can_redo());

        ledger.record(diff(0, 0, 1));
        assert!(ledger.can_undo());
        assert!(!ledger.can_redo());
        assert_eq!(ledger.cursor(), Some(0));

        assert!(ledger.step_back().is_some());
        assert!(!ledger.can_undo());
        assert!(ledger.can_redo());
        assert_eq!(ledger.cursor(), None);

        assert!(ledger.step_forward().is_some());
        assert!(ledger.can_undo());
        assert!(!ledger.can_redo());
    }

    #[test]
    fn test_empty_diff_not_recorded() {
        let mut ledger = HistoryLedger::new();
        ledger.record(DiffRecord::new());
        assert!(ledger.is_empty());
        assert!(!ledger.can_undo());
    }

    #[test]
    fn test_record_discards_redo_branch() {
        let mut ledger = HistoryLedger::new();
        ledger.record(diff(0, 0, 1));
        ledger.record(diff(4, 0, 1));
        ledger.step_back();
        assert!(ledger.can_redo());

        ledger.record(diff(8, 0, 1));
        assert!(!ledger.can_redo());
        assert_eq!(ledger.len(), 2);
        assert_eq!(ledger.cursor(), Some(1));
    }

    #[test]
    fn test_record_after_full_undo_replaces_everything() {
        let mut ledger = HistoryLedger::new();
        ledger.record(diff(0, 0, 1));
        ledger.record(diff(4, 0, 1));
        ledger.step_back();
        ledger.step_back();
        ledger.record(diff(8, 0, 1));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.cursor(), Some(0));
    }

    #[test]
    fn test_eviction_keeps_cursor() {
        let mut ledger = HistoryLedger::with_config(HistoryConfig {
            max_history_record: 3,
        });
        for i in 0..5 {
            ledger.record(diff(i * 4, 0, 1));
        }
        assert_eq!(ledger.len(), 3);
        assert_eq!(ledger.cursor(), Some(2));
        assert_eq!(ledger.undo_count(), 3);

        let mut undone = 0;
        while ledger.step_back().is_some() {
            undone += 1;
        }
        assert_eq!(undone, 3);
    }

    #[test]
    fn test_eviction_drops_oldest_record() {
        let mut ledger = HistoryLedger::with_config(HistoryConfig {
            max_history_record: 2,
        });
        ledger.record(diff(0, 0, 1));
        ledger.record(diff(4, 0, 1));
        ledger.record(diff(8, 0, 1));
        let newest = ledger.step_back().map(|r| r.offsets.clone());
        assert_eq!(newest, Some(vec![8]));
        let oldest = ledger.step_back().map(|r| r.offsets.clone());
        assert_eq!(oldest, Some(vec![4]));
        assert!(ledger.step_back().is_none());
    }

    #[test]
    fn test_undo_writes_reverse_order() {
        let mut record = DiffRecord::new();
        record.push(0, (None, 0), (Some(LabelIndex(1)), 2));
        record.push(0, (Some(LabelIndex(1)), 2), (Some(LabelIndex(1)), 3));
        assert_eq!(record.undo_writes().collect::<Vec<_>>(), vec![(0, 2), (0, 0)]);
        assert_eq!(record.redo_writes().collect::<Vec<_>>(), vec![(0, 2), (0, 3)]);
    }

    #[test]
    fn test_history_step_flags() {
        assert!(HistoryStep::Applied { more: false }.applied());
        assert!(!HistoryStep::Applied { more: false }.has_more());
        assert!(HistoryStep::Applied { more: true }.has_more());
        assert!(!HistoryStep::Exhausted.applied());
    }
}
