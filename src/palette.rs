//! Display palette shared by all labels.
//!
//! Label indices and object numbers both index into the same palette. The
//! palette only ever grows: when an identifier has no color yet, new colors
//! are appended, skipping any candidate that is already present.

use serde::{Deserialize, Serialize};

/// An RGB color with 8-bit channels.
pub type Rgb = [u8; 3];

/// Golden angle in degrees; consecutive hues stay well separated.
const GOLDEN_ANGLE: f32 = 137.507_76;

/// Number of hue-walk candidates tried before switching to hashed colors.
const HUE_CANDIDATES: u32 = 720;

/// Upper bound on candidate attempts for one new color (size of RGB space).
const MAX_ATTEMPTS: u32 = 1 << 24;

/// Ordered list of display colors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Palette {
    colors: Vec<Rgb>,
}

impl Default for Palette {
    /// White for the background, red for the first entry.
    fn default() -> Self {
        Self {
            colors: vec![[255, 255, 255], [255, 0, 0]],
        }
    }
}

impl Palette {
    pub fn from_colors(colors: Vec<Rgb>) -> Self {
        Self { colors }
    }

    pub fn len(&self) -> usize {
        self.colors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty()
    }

    /// Color at an index, if assigned.
    pub fn color(&self, index: usize) -> Option<Rgb> {
        self.colors.get(index).copied()
    }

    pub fn as_slice(&self) -> &[Rgb] {
        &self.colors
    }

    /// Make sure `index` has a color. Returns how many colors were added.
    pub fn ensure_index(&mut self, index: u32) -> usize {
        self.ensure_len(index as usize + 1)
    }

    /// Grow to at least `len` colors. Returns how many colors were added.
    pub fn ensure_len(&mut self, len: usize) -> usize {
        let before = self.colors.len();
        while self.colors.len() < len {
            let color = self.next_color();
            self.colors.push(color);
        }
        let added = self.colors.len() - before;
        if added > 0 {
            log::trace!("Palette grew by {} to {} colors", added, self.colors.len());
        }
        added
    }

    fn next_color(&self) -> Rgb {
        let start = self.colors.len() as u32;
        let mut fallback = candidate(start);
        for attempt in 0..MAX_ATTEMPTS {
            let color = candidate(start.wrapping_add(attempt));
            if attempt == 0 {
                fallback = color;
            }
            if !self.colors.contains(&color) {
                return color;
            }
        }
        fallback
    }
}

/// Candidate color number `k`: a golden-angle hue walk first, then a
/// bijective scramble of the 24-bit color space.
fn candidate(k: u32) -> Rgb {
    if k < HUE_CANDIDATES {
        let hue = (k as f32 * GOLDEN_ANGLE) % 360.0;
        let saturation = if k % 2 == 0 { 1.0 } else { 0.65 };
        let (r, g, b) = hsv_to_rgb(hue, saturation, 1.0);
        [to_byte(r), to_byte(g), to_byte(b)]
    } else {
        let scrambled = k.wrapping_mul(0x9E37_79B1) & 0x00FF_FFFF;
        let [r, g, b, _] = scrambled.to_le_bytes();
        [r, g, b]
    }
}

fn to_byte(channel: f32) -> u8 {
    (channel.clamp(0.0, 1.0) * 255.0).round() as u8
}

/// Convert HSV to RGB.
///
/// # Arguments
/// * `h` - Hue in degrees (0-360)
/// * `s` - Saturation (0.0-1.0)
/// * `v` - Value/brightness (0.0-1.0)
///
/// # Returns
/// RGB tuple with values in range 0.0-1.0
pub fn hsv_to_rgb(h: f32, s: f32, v: f32) -> (f32, f32, f32) {
    let c = v * s;
    let x = c * (1.0 - ((h / 60.0) % 2.0 - 1.0).abs());
    let m = v - c;

    let (r, g, b) = match h {
        h if h < 60.0 => (c, x, 0.0),
        h if h < 120.0 => (x, c, 0.0),
        h if h < 180.0 => (0.0, c, x),
        h if h < 240.0 => (0.0, x, c),
        h if h < 300.0 => (x, 0.0, c),
        _ => (c, 0.0, x),
    };

    (r + m, g + m, b + m)
}
