//! CRC-32 and PNG chunk handling.

use image::RgbaImage;

use crate::LabelIndex;
use crate::tiles::chunk::{self, PNG_SIGNATURE, encode_chunk, find_chunk, insert_after_header};
use crate::tiles::crc::{Crc32, crc32};
use crate::tiles::{
    METADATA_CHUNK, TileArtifact, TileMetadata, encode_png, read_artifact, write_artifact,
};

use super::{annotator, identifiers, paint};

const LEAF: LabelIndex = LabelIndex(0);

fn small_png() -> Vec<u8> {
    encode_png(&RgbaImage::from_pixel(3, 2, image::Rgba([1, 2, 3, 255]))).unwrap()
}

/// A checksummed artifact carrying arbitrary metadata text.
fn forged_artifact(width: u32, height: u32, metadata: &str) -> Vec<u8> {
    let canvas = RgbaImage::from_pixel(width, height, image::Rgba([1, 0, 0, 255]));
    let chunk = encode_chunk(METADATA_CHUNK, metadata.as_bytes()).unwrap();
    insert_after_header(&encode_png(&canvas).unwrap(), &chunk).unwrap()
}

#[test]
fn test_crc32_check_value() {
    assert_eq!(crc32(b"123456789"), 0xCBF4_3926);
    assert_eq!(crc32(b""), 0);
    assert_eq!(crc32(b"IEND"), 0xAE42_6082);
}

#[test]
fn test_crc32_incremental_matches_one_shot() {
    let mut crc = Crc32::new();
    crc.update(b"tEXT").update(br#"{"leaf":[[0,0]]}"#);
    assert_eq!(crc.finish(), crc32(br#"tEXT{"leaf":[[0,0]]}"#));
}

#[test]
fn test_encode_chunk_layout() {
    let encoded = encode_chunk(METADATA_CHUNK, b"{}").unwrap();
    assert_eq!(&encoded[..4], &[0, 0, 0, 2]);
    assert_eq!(&encoded[4..8], b"tEXT");
    assert_eq!(&encoded[8..10], b"{}");
    assert_eq!(&encoded[10..], &crc32(b"tEXT{}").to_be_bytes());
}

#[test]
fn test_encoded_png_chunks_are_intact() {
    let png = small_png();
    let kinds: Vec<[u8; 4]> = chunk::chunks(&png)
        .unwrap()
        .map(|chunk| {
            let chunk = chunk.unwrap();
            assert!(chunk.is_intact());
            chunk.kind
        })
        .collect();
    assert_eq!(kinds.first(), Some(b"IHDR"));
    assert_eq!(kinds.last(), Some(b"IEND"));
}

#[test]
fn test_metadata_spliced_at_offset_33() {
    let chunk = encode_chunk(METADATA_CHUNK, b"{}").unwrap();
    let artifact = insert_after_header(&small_png(), &chunk).unwrap();
    assert!(artifact.starts_with(&PNG_SIGNATURE));
    assert_eq!(&artifact[33..33 + chunk.len()], chunk.as_slice());

    let found = find_chunk(&artifact, METADATA_CHUNK).unwrap().unwrap();
    assert_eq!(found.offset, 33);
    assert_eq!(found.data, b"{}");
    assert!(found.is_intact());
}

#[test]
fn test_artifact_still_decodes_as_png() {
    let mut metadata = TileMetadata::new();
    metadata.push("leaf");
    let canvas = RgbaImage::from_pixel(3, 2, image::Rgba([7, 0, 0, 255]));
    let artifact = write_artifact(&canvas, &metadata).unwrap();

    let decoded = image::load_from_memory(&artifact).unwrap().to_rgba8();
    assert_eq!(decoded, canvas);

    let (read_metadata, read_canvas) = read_artifact(&artifact).unwrap();
    assert_eq!(read_metadata, metadata);
    assert_eq!(read_canvas, canvas);
}

#[test]
fn test_corrupt_metadata_fails_checksum() {
    let mut metadata = TileMetadata::new();
    metadata.push("leaf");
    let canvas = RgbaImage::from_pixel(2, 2, image::Rgba([1, 0, 0, 255]));
    let mut artifact = write_artifact(&canvas, &metadata).unwrap();

    // First byte of the label name inside the metadata text.
    artifact[33 + 8 + 2] ^= 0x20;
    let err = read_artifact(&artifact).unwrap_err();
    assert!(err.is_recoverable_import());
    assert!(err.to_string().contains("checksum"));
}

#[test]
fn test_missing_metadata_chunk() {
    let err = read_artifact(&small_png()).unwrap_err();
    assert!(err.is_recoverable_import());
}

#[test]
fn test_not_a_png() {
    assert!(read_artifact(b"GIF89a....").unwrap_err().is_recoverable_import());
    assert!(find_chunk(b"", METADATA_CHUNK).is_err());
}

#[test]
fn test_truncated_stream() {
    let png = small_png();
    let truncated = &png[..40];
    assert!(find_chunk(truncated, METADATA_CHUNK).is_err());
}

#[test]
fn test_unaddressable_tile_is_rejected() {
    let bytes = forged_artifact(2, 2, &format!(r#"{{"a":[[{},0]]}}"#, usize::MAX));
    let err = TileArtifact::parse(&bytes).unwrap_err();
    assert!(matches!(err, crate::AnnotationError::ImportFailed { .. }));
}

#[test]
fn test_hostile_placements_leave_session_unchanged() {
    let hostile = [
        (2, 2, format!(r#"{{"leaf":[[{},0]]}}"#, usize::MAX)),
        (2, 2, format!(r#"{{"leaf":[[{},0]]}}"#, u32::MAX - 1)),
        (2, 4, r#"{"leaf":[[2,0]]}"#.to_string()),
        (2, 2, r#"{"leaf":[[0,3]]}"#.to_string()),
        (2, 2, r#"{"leaf":[[0,0]],"leaf":[[0,1]]}"#.to_string()),
    ];
    for (width, height, metadata) in hostile {
        let mut annotator = annotator(&["leaf"], 2, 2);
        paint(&mut annotator, LEAF, &[(0, 1), (12, 2)]);
        let before = identifiers(&annotator, LEAF);
        let current = annotator.current_object_number(LEAF).unwrap();

        let bytes = forged_artifact(width, height, &metadata);
        let chunk = find_chunk(&bytes, METADATA_CHUNK).unwrap().unwrap();
        assert!(chunk.is_intact());

        let err = annotator.import_artifact(&bytes).unwrap_err();
        assert!(err.is_recoverable_import(), "{}: {}", metadata, err);
        assert_eq!(identifiers(&annotator, LEAF), before);
        assert_eq!(annotator.current_object_number(LEAF).unwrap(), current);
        assert!(TileArtifact::parse(&bytes).is_err());
    }
}
