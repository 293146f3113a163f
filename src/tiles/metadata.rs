//! Tile placement metadata carried in the artifact's `tEXT` chunk.
//!
//! The text form is a compact JSON object in pack order:
//!
//! ```text
//! {"leaf":[[0,0]],"stem":[[0,1]],"root":[[0,2]],"fruit":[[1,0]]}
//! ```

use std::collections::HashSet;
use std::fmt;

use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
use serde_json::Value;

use crate::error::{AnnotationError, Result};
use crate::tiles::CHANNELS_PER_TILE;

/// Tile indices at or above this cannot address a band of a PNG canvas.
const TILE_LIMIT: usize = u32::MAX as usize;

/// Where one label's byte plane lives in the packed canvas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TilePlacement {
    /// Horizontal band, counted from the top
    pub tile: usize,
    /// Color channel within the band (0 = R, 1 = G, 2 = B)
    pub channel: usize,
}

impl TilePlacement {
    /// Placement of the `position`-th packed label.
    pub fn for_position(position: usize) -> Self {
        Self {
            tile: position / CHANNELS_PER_TILE,
            channel: position % CHANNELS_PER_TILE,
        }
    }
}

/// Ordered label → placement mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TileMetadata {
    entries: Vec<(String, TilePlacement)>,
}

impl TileMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a label at the next free placement.
    pub fn push(&mut self, label: impl Into<String>) -> TilePlacement {
        let placement = TilePlacement::for_position(self.entries.len());
        self.entries.push((label.into(), placement));
        placement
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in pack order.
    pub fn entries(&self) -> impl Iterator<Item = (&str, TilePlacement)> + '_ {
        self.entries
            .iter()
            .map(|(label, placement)| (label.as_str(), *placement))
    }

    /// Placement of a label.
    pub fn get(&self, label: &str) -> Option<TilePlacement> {
        self.entries
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, placement)| *placement)
    }

    /// Number of tile bands the placements span.
    pub fn tile_count(&self) -> usize {
        self.entries
            .iter()
            .map(|(_, placement)| placement.tile.saturating_add(1))
            .max()
            .unwrap_or(0)
    }

    /// Serialize to the chunk text.
    pub fn to_text(&self) -> Result<String> {
        let mut text = String::from("{");
        for (i, (label, placement)) in self.entries.iter().enumerate() {
            if i > 0 {
                text.push(',');
            }
            text.push_str(&serde_json::to_string(label)?);
            text.push_str(&format!(":[[{},{}]]", placement.tile, placement.channel));
        }
        text.push('}');
        Ok(text)
    }

    /// Parse the chunk text.
    ///
    /// Entries come back ordered by placement, which is the pack order the
    /// writer used. Fails when a placement is malformed or out of range, when
    /// two labels share a placement, or when a label appears twice.
    pub fn parse(text: &str) -> Result<Self> {
        let RawEntries(object) = serde_json::from_str::<RawEntries>(text)
            .map_err(|e| AnnotationError::import_failed(format!("malformed metadata: {}", e)))?;

        let mut entries = Vec::with_capacity(object.len());
        let mut seen = HashSet::new();
        let mut labels = HashSet::new();
        for (label, value) in object {
            if !labels.insert(label.clone()) {
                return Err(AnnotationError::import_failed(format!(
                    "label '{}' listed twice",
                    label
                )));
            }
            let placements: Vec<[usize; 2]> = serde_json::from_value(value).map_err(|e| {
                AnnotationError::import_failed(format!("bad placement for '{}': {}", label, e))
            })?;
            let [tile, channel] = placements.first().copied().ok_or_else(|| {
                AnnotationError::import_failed(format!("no placement for '{}'", label))
            })?;
            if channel >= CHANNELS_PER_TILE {
                return Err(AnnotationError::import_failed(format!(
                    "channel {} of '{}' is outside the tile",
                    channel, label
                )));
            }
            if tile >= TILE_LIMIT {
                return Err(AnnotationError::import_failed(format!(
                    "tile {} of '{}' is out of range",
                    tile, label
                )));
            }
            let placement = TilePlacement { tile, channel };
            if !seen.insert(placement) {
                return Err(AnnotationError::import_failed(format!(
                    "placement [{},{}] used twice",
                    tile, channel
                )));
            }
            entries.push((label, placement));
        }
        entries.sort_by_key(|(_, placement)| *placement);
        Ok(Self { entries })
    }
}

/// Top-level object members in document order, repeated keys included.
struct RawEntries(Vec<(String, Value)>);

impl<'de> Deserialize<'de> for RawEntries {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct EntriesVisitor;

        impl<'de> Visitor<'de> for EntriesVisitor {
            type Value = RawEntries;

            fn expecting(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
                formatter.write_str("an object of label placements")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<RawEntries, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(RawEntries(entries))
            }
        }

        deserializer.deserialize_map(EntriesVisitor)
    }
}
