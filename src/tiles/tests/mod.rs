//! Scenario tests for the tile artifact.
//!
//! These drive export and import through a full [`crate::Annotator`] and
//! inspect the resulting bytes at the PNG chunk level.

mod chunk_tests;

use crate::{Annotator, AnnotatorConfig, LabelIndex};

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// A session over a small image with the given labels.
fn annotator(labels: &[&str], width: u32, height: u32) -> Annotator {
    init_logging();
    Annotator::new(AnnotatorConfig::new(labels.iter().copied()), width, height).unwrap()
}

/// Paint each `(offset, object)` pair, opening a new object whenever the
/// painted object is the open one.
fn paint(annotator: &mut Annotator, label: LabelIndex, strokes: &[(usize, u32)]) {
    for &(offset, object) in strokes {
        annotator.apply(label, &[offset], object).unwrap();
        if object == annotator.current_object_number(label).unwrap() {
            annotator.create_new_object(label).unwrap();
        }
    }
}

fn identifiers(annotator: &Annotator, label: LabelIndex) -> Vec<u32> {
    annotator.surface(label).unwrap().identifiers().collect()
}
