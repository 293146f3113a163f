//! JSON snapshots of per-label annotation state.
//!
//! A snapshot lists, for each label, its open object number and its row-major
//! identifiers:
//!
//! ```json
//! {
//!   "leaf": { "currentObjectNumber": 3, "annotatedObjects": [0, 1, 1, 2] }
//! }
//! ```
//!
//! Unlike the tile artifact it keeps full 24-bit identifiers and does not
//! compact object numbers.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use web_time::Instant;

use crate::annotator::{Annotator, ImportSummary};
use crate::codec;
use crate::error::{AnnotationError, Result};
use crate::surface::AnnotationSurface;

/// State of one label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSnapshot {
    pub current_object_number: u32,
    pub annotated_objects: Vec<u32>,
}

/// Label name → state.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Snapshot {
    pub labels: BTreeMap<String, LabelSnapshot>,
}

impl Snapshot {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| AnnotationError::import_failed(format!("malformed snapshot: {}", e)))
    }
}

impl Annotator {
    /// Capture every label's surface and open object number.
    pub fn snapshot(&self) -> Result<Snapshot> {
        let mut labels = BTreeMap::new();
        for label in self.labels() {
            let state = self.state(label)?;
            labels.insert(
                state.name.clone(),
                LabelSnapshot {
                    current_object_number: state.current_object_number,
                    annotated_objects: state.surface.identifiers().collect(),
                },
            );
        }
        Ok(Snapshot { labels })
    }

    /// Replace label states from a snapshot.
    ///
    /// Every entry is validated before any label changes. Unknown labels are
    /// skipped; history and deleted sets of restored labels are cleared.
    pub fn restore_snapshot(&mut self, snapshot: &Snapshot) -> Result<ImportSummary> {
        let started = Instant::now();
        let mut summary = ImportSummary::default();
        let mut staged = Vec::new();

        for (name, entry) in &snapshot.labels {
            let Some(label) = self.label_index(name) else {
                log::warn!("Skipping unknown label '{}' in snapshot", name);
                summary.skipped.push(name.clone());
                continue;
            };
            let current = entry.current_object_number;
            codec::validate(current)?;
            if current == 0 {
                return Err(AnnotationError::import_failed(format!(
                    "label '{}' has no open object",
                    name
                )));
            }
            let surface = AnnotationSurface::from_identifiers(
                self.width(),
                self.height(),
                &entry.annotated_objects,
            )?;
            let max = surface.max_identifier();
            if max > current {
                return Err(AnnotationError::InvalidIdentifier {
                    identifier: max,
                    limit: current,
                });
            }
            staged.push((label, surface, current));
        }
        staged.sort_by_key(|(label, _, _)| *label);

        for (label, surface, current) in staged {
            self.state_mut(label)?.replace_surface(surface, current);
            self.palette_mut().ensure_index(current);
            summary.imported.push(label);
        }

        log::info!(
            "Restored {} labels from snapshot ({} skipped) in {:?}",
            summary.imported.len(),
            summary.skipped.len(),
            started.elapsed()
        );
        Ok(summary)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::annotator::LabelIndex;
    use crate::config::AnnotatorConfig;

    fn annotator() -> Annotator {
        Annotator::new(AnnotatorConfig::new(["leaf", "stem"]), 2, 2).unwrap()
    }

    #[test]
    fn test_snapshot_json_shape() {
        let mut annotator = annotator();
        annotator.apply(LabelIndex(0), &[4, 8], 1).unwrap();
        let json = annotator.snapshot().unwrap().to_json().unwrap();
        assert_eq!(
            json,
            r#"{"leaf":{"currentObjectNumber":1,"annotatedObjects":[0,1,1,0]},"stem":{"currentObjectNumber":1,"annotatedObjects":[0,0,0,0]}}"#
        );
    }

    #[test]
    fn test_restore_round_trip() {
        let mut source = annotator();
        let leaf = LabelIndex(0);
        source.apply(leaf, &[0], 1).unwrap();
        source.create_new_object(leaf).unwrap();
        source.apply(leaf, &[12], 2).unwrap();
        let json = source.snapshot().unwrap().to_json().unwrap();
        let snapshot = Snapshot::from_json(&json).unwrap();

        let mut target = annotator();
        let summary = target.restore_snapshot(&snapshot).unwrap();
        assert_eq!(summary.imported, vec![LabelIndex(0), LabelIndex(1)]);
        assert_eq!(target.surface(leaf).unwrap(), source.surface(leaf).unwrap());
        assert_eq!(target.current_object_number(leaf).unwrap(), 2);
        assert!(target.has_pending_object(leaf).unwrap());
        assert!(!target.can_undo(leaf).unwrap());
    }

    #[test]
    fn test_restore_skips_unknown_labels() {
        let snapshot = Snapshot::from_json(
            r#"{"root":{"currentObjectNumber":1,"annotatedObjects":[0,0,0,0]}}"#,
        )
        .unwrap();
        let mut annotator = annotator();
        let summary = annotator.restore_snapshot(&snapshot).unwrap();
        assert!(summary.imported.is_empty());
        assert_eq!(summary.skipped, vec!["root".to_string()]);
    }

    #[test]
    fn test_restore_is_all_or_nothing() {
        let mut annotator = annotator();
        annotator.apply(LabelIndex(1), &[0], 1).unwrap();
        let before = annotator.surface(LabelIndex(1)).unwrap().clone();

        // "leaf" is fine, "stem" has the wrong length.
        let snapshot = Snapshot::from_json(
            r#"{"leaf":{"currentObjectNumber":2,"annotatedObjects":[1,1,1,1]},
                "stem":{"currentObjectNumber":1,"annotatedObjects":[0,0]}}"#,
        )
        .unwrap();
        assert!(annotator.restore_snapshot(&snapshot).is_err());
        assert_eq!(annotator.surface(LabelIndex(1)).unwrap(), &before);
        assert!(annotator.surface(LabelIndex(0)).unwrap().identifiers().all(|id| id == 0));
    }

    #[test]
    fn test_restore_rejects_identifiers_above_open_object() {
        let snapshot = Snapshot::from_json(
            r#"{"leaf":{"currentObjectNumber":1,"annotatedObjects":[0,5,0,0]}}"#,
        )
        .unwrap();
        let err = annotator().restore_snapshot(&snapshot).unwrap_err();
        assert!(matches!(
            err,
            AnnotationError::InvalidIdentifier {
                identifier: 5,
                limit: 1
            }
        ));
    }

    #[test]
    fn test_malformed_snapshot_is_recoverable() {
        assert!(Snapshot::from_json("[1,2").unwrap_err().is_recoverable_import());
    }
}
