//! Pixel selection helpers feeding [`crate::Annotator::apply`].
//!
//! Both helpers turn a user gesture into the byte offsets `apply` expects:
//! a superpixel click selects every pixel of one segment, and a traced
//! polygon selects every pixel whose centre lies inside it.

use std::collections::BTreeMap;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

use crate::codec::{self, CHANNELS};
use crate::error::{AnnotationError, Result};

// ============================================================================
// Superpixel segments
// ============================================================================

/// Segment id → pixel offsets, built from an external superpixel partition.
#[derive(Debug, Clone, Default)]
pub struct SegmentIndex {
    segments: BTreeMap<u32, Vec<usize>>,
    /// Segment id of every pixel, row-major
    assignment: Vec<u32>,
}

impl SegmentIndex {
    /// Index a row-major per-pixel segment id array.
    pub fn from_partition(width: u32, height: u32, segment_ids: &[u32]) -> Result<Self> {
        let expected = width as usize * height as usize;
        if segment_ids.len() != expected {
            return Err(AnnotationError::LengthMismatch {
                offsets: expected,
                values: segment_ids.len(),
            });
        }
        Ok(Self::build(segment_ids.to_vec()))
    }

    /// Index a partition whose segment ids are encoded like identifiers.
    pub fn from_encoded(image: &RgbaImage) -> Self {
        Self::build(image.pixels().map(|p| codec::decode_pixel(&p.0)).collect())
    }

    fn build(assignment: Vec<u32>) -> Self {
        let mut segments: BTreeMap<u32, Vec<usize>> = BTreeMap::new();
        for (i, &segment) in assignment.iter().enumerate() {
            segments.entry(segment).or_default().push(i * CHANNELS);
        }
        log::debug!(
            "Indexed {} segments over {} pixels",
            segments.len(),
            assignment.len()
        );
        Self {
            segments,
            assignment,
        }
    }

    /// Number of distinct segments.
    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Offsets of every pixel in a segment; empty for an unknown segment.
    pub fn pixels(&self, segment: u32) -> &[usize] {
        self.segments
            .get(&segment)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// Segment containing the pixel at a byte offset.
    pub fn segment_at(&self, offset: usize) -> Option<u32> {
        if offset % CHANNELS != 0 {
            return None;
        }
        self.assignment.get(offset / CHANNELS).copied()
    }

    /// Offsets of the whole segment under a byte offset.
    pub fn pixels_at(&self, offset: usize) -> &[usize] {
        self.segment_at(offset)
            .map(|segment| self.pixels(segment))
            .unwrap_or(&[])
    }
}

// ============================================================================
// Polygons
// ============================================================================

/// A 2D point in image coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f32,
    pub y: f32,
}

impl Point {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    /// Calculate distance to another point.
    pub fn distance_to(&self, other: &Point) -> f32 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }
}

/// Check if a point is inside a closed polygon (ray casting algorithm).
pub fn polygon_contains(vertices: &[Point], point: &Point) -> bool {
    if vertices.len() < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = vertices.len() - 1;
    for (i, vi) in vertices.iter().enumerate() {
        let vj = &vertices[j];
        if ((vi.y > point.y) != (vj.y > point.y))
            && (point.x < (vj.x - vi.x) * (point.y - vi.y) / (vj.y - vi.y) + vi.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Offsets of the pixels whose centres lie inside the polygon, row-major.
///
/// The polygon is implicitly closed; pixels outside the `width × height`
/// image are never returned.
pub fn polygon_offsets(vertices: &[Point], width: u32, height: u32) -> Vec<usize> {
    if vertices.len() < 3 || width == 0 || height == 0 {
        return Vec::new();
    }

    let (mut min_x, mut min_y) = (f32::INFINITY, f32::INFINITY);
    let (mut max_x, mut max_y) = (f32::NEG_INFINITY, f32::NEG_INFINITY);
    for p in vertices {
        min_x = min_x.min(p.x);
        min_y = min_y.min(p.y);
        max_x = max_x.max(p.x);
        max_y = max_y.max(p.y);
    }

    // Pixel (x, y) has its centre at (x + 0.5, y + 0.5).
    let clamp = |value: f32, limit: u32| value.max(0.0).min(limit as f32) as u32;
    let (x0, x1) = (clamp(min_x - 0.5, width), clamp(max_x + 0.5, width));
    let (y0, y1) = (clamp(min_y - 0.5, height), clamp(max_y + 0.5, height));

    let mut offsets = Vec::new();
    for y in y0..y1 {
        for x in x0..x1 {
            let centre = Point::new(x as f32 + 0.5, y as f32 + 0.5);
            if polygon_contains(vertices, &centre) {
                offsets.push((y as usize * width as usize + x as usize) * CHANNELS);
            }
        }
    }
    offsets
}

/// Minimum clicks before a traced polygon may close.
const MIN_TRACE_POINTS: usize = 4;

/// Distance (in pixels) from the first point that counts as "back at the start".
const CLOSE_DISTANCE: f32 = 4.0;

/// Vertices clicked so far for a polygon selection.
///
/// The trace closes once it has at least four points, has moved more than
/// four pixels away from its first point, and its latest point comes
/// back within that distance.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PolygonTrace {
    points: Vec<Point>,
    can_close: bool,
}

impl PolygonTrace {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a clicked point. Returns `true` when this point closes the polygon.
    pub fn push(&mut self, point: Point) -> bool {
        self.points.push(point);
        if self.points.len() < MIN_TRACE_POINTS {
            return false;
        }
        let distance = point.distance_to(&self.points[0]);
        if distance > CLOSE_DISTANCE {
            self.can_close = true;
        }
        distance < CLOSE_DISTANCE && self.can_close
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Drop all points.
    pub fn clear(&mut self) {
        self.points.clear();
        self.can_close = false;
    }

    /// Offsets covered by the trace, leaving the trace empty.
    pub fn finish(&mut self, width: u32, height: u32) -> Vec<usize> {
        let offsets = polygon_offsets(&self.points, width, height);
        self.clear();
        offsets
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_segment_index_groups_pixels() {
        let index = SegmentIndex::from_partition(3, 2, &[0, 0, 1, 2, 1, 1]).unwrap();
        assert_eq!(index.segment_count(), 3);
        assert_eq!(index.pixels(0), &[0, 4]);
        assert_eq!(index.pixels(1), &[8, 16, 20]);
        assert_eq!(index.pixels(9), &[] as &[usize]);
        assert_eq!(index.segment_at(12), Some(2));
        assert_eq!(index.segment_at(13), None);
        assert_eq!(index.pixels_at(16), &[8, 16, 20]);
    }

    #[test]
    fn test_segment_index_length_mismatch() {
        assert!(matches!(
            SegmentIndex::from_partition(2, 2, &[0, 1, 2]),
            Err(AnnotationError::LengthMismatch {
                offsets: 4,
                values: 3
            })
        ));
    }

    #[test]
    fn test_segment_index_from_encoded_image() {
        let mut image = RgbaImage::new(2, 1);
        image.put_pixel(0, 0, image::Rgba([0x01, 0x01, 0x00, 255]));
        image.put_pixel(1, 0, image::Rgba([0x05, 0x00, 0x00, 255]));
        let index = SegmentIndex::from_encoded(&image);
        assert_eq!(index.pixels(257), &[0]);
        assert_eq!(index.pixels(5), &[4]);
    }

    #[test]
    fn test_point_in_polygon() {
        let square = [
            Point::new(0.0, 0.0),
            Point::new(10.0, 0.0),
            Point::new(10.0, 10.0),
            Point::new(0.0, 10.0),
        ];
        assert!(polygon_contains(&square, &Point::new(5.0, 5.0)));
        assert!(!polygon_contains(&square, &Point::new(15.0, 5.0)));
        assert!(!polygon_contains(&square[..2], &Point::new(5.0, 0.0)));
    }

    #[test]
    fn test_polygon_offsets_square() {
        let square = [
            Point::new(1.0, 1.0),
            Point::new(3.0, 1.0),
            Point::new(3.0, 3.0),
            Point::new(1.0, 3.0),
        ];
        // Pixels (1,1), (2,1), (1,2), (2,2) on a 4-wide image.
        assert_eq!(polygon_offsets(&square, 4, 4), vec![20, 24, 36, 40]);
    }

    #[test]
    fn test_polygon_offsets_clipped_to_image() {
        let big = [
            Point::new(-5.0, -5.0),
            Point::new(50.0, -5.0),
            Point::new(50.0, 50.0),
            Point::new(-5.0, 50.0),
        ];
        assert_eq!(polygon_offsets(&big, 2, 2), vec![0, 4, 8, 12]);
    }

    #[test]
    fn test_trace_closes_after_returning_to_start() {
        let mut trace = PolygonTrace::new();
        assert!(!trace.push(Point::new(0.0, 0.0)));
        assert!(!trace.push(Point::new(20.0, 0.0)));
        assert!(!trace.push(Point::new(20.0, 20.0)));
        assert!(!trace.push(Point::new(0.0, 20.0)));
        assert!(trace.push(Point::new(1.0, 1.0)));
        assert_eq!(trace.len(), 5);
    }

    #[test]
    fn test_trace_needs_four_points() {
        let mut trace = PolygonTrace::new();
        trace.push(Point::new(0.0, 0.0));
        trace.push(Point::new(20.0, 0.0));
        assert!(!trace.push(Point::new(1.0, 0.0)));
    }

    #[test]
    fn test_trace_does_not_close_before_moving_away() {
        let mut trace = PolygonTrace::new();
        for _ in 0..5 {
            assert!(!trace.push(Point::new(1.0, 1.0)));
        }
    }

    #[test]
    fn test_finish_clears_trace() {
        let mut trace = PolygonTrace::new();
        for (x, y) in [(0.0, 0.0), (2.0, 0.0), (2.0, 2.0), (0.0, 2.0)] {
            trace.push(Point::new(x, y));
        }
        assert_eq!(trace.finish(2, 2), vec![0, 4, 8, 12]);
        assert!(trace.is_empty());
    }
}
