//! Morphological clean-up of identifier arrays.

use std::collections::HashMap;

use ndarray::Array2;

/// Window radius of [`mode_filter`].
const RADIUS: isize = 1;

/// 3×3 mode (majority) filter over an identifier array.
///
/// The window is clamped at the borders, so edge pixels count their nearest
/// neighbours more than once. Ties keep the centre identifier when it is among
/// the most frequent values, otherwise the smallest tied identifier wins.
pub fn mode_filter(identifiers: &Array2<u32>) -> Array2<u32> {
    let (rows, cols) = identifiers.dim();
    if rows == 0 || cols == 0 {
        return identifiers.clone();
    }

    let mut counts: HashMap<u32, u32> = HashMap::with_capacity(9);
    Array2::from_shape_fn((rows, cols), |(y, x)| {
        counts.clear();
        for dy in -RADIUS..=RADIUS {
            let sy = (y as isize + dy).clamp(0, rows as isize - 1) as usize;
            for dx in -RADIUS..=RADIUS {
                let sx = (x as isize + dx).clamp(0, cols as isize - 1) as usize;
                *counts.entry(identifiers[[sy, sx]]).or_insert(0) += 1;
            }
        }
        majority(&counts, identifiers[[y, x]])
    })
}

fn majority(counts: &HashMap<u32, u32>, centre: u32) -> u32 {
    let best = counts.values().copied().max().unwrap_or(0);
    if counts.get(&centre).copied() == Some(best) {
        return centre;
    }
    counts
        .iter()
        .filter(|&(_, &count)| count == best)
        .map(|(&id, _)| id)
        .min()
        .unwrap_or(centre)
}
