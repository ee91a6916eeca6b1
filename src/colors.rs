//! Diverging pink-to-green scale for the attention score.
//!
//! Nine PiYG anchor colors are linearly interpolated into [`SCALE_BINS`] bins. Low ratios (a target
//! far below its peak publication rate) land on the pink end, ratios near 1.0 on the green end.

use std::sync::OnceLock;

pub const SCALE_BINS: usize = 500;

/// Forced color for lines outside an active highlight.
pub const UNSELECTED: &str = "lightgrey";
/// Darkened variant used when a highlighted line would otherwise be [`UNSELECTED`].
pub const SELECTED_GREY: &str = "grey";

const PIYG_9: [(u8, u8, u8); 9] = [
    (197, 27, 125),
    (222, 119, 174),
    (241, 182, 218),
    (253, 224, 239),
    (247, 247, 247),
    (230, 245, 208),
    (184, 225, 134),
    (127, 188, 65),
    (77, 146, 33),
];

#[derive(Debug, Clone)]
pub struct ColorScale {
    bins: Vec<String>,
}

impl ColorScale {
    pub fn interpolate(anchors: &[(u8, u8, u8)], bins: usize) -> Self {
        let count = bins.max(1);
        let segments = anchors.len().saturating_sub(1);
        let bins = (0..count)
            .map(|i| {
                if segments == 0 {
                    let (r, g, b) = anchors.first().copied().unwrap_or((0, 0, 0));
                    return rgb(r as f64, g as f64, b as f64);
                }
                let t = if count == 1 { 0.0 } else { i as f64 / (count - 1) as f64 } * segments as f64;
                let seg = (t.floor() as usize).min(segments - 1);
                let frac = t - seg as f64;
                let (r0, g0, b0) = anchors[seg];
                let (r1, g1, b1) = anchors[seg + 1];
                rgb(
                    lerp(r0 as f64, r1 as f64, frac),
                    lerp(g0 as f64, g1 as f64, frac),
                    lerp(b0 as f64, b1 as f64, frac),
                )
            })
            .collect();
        Self { bins }
    }

    /// Bin index for a peak-to-current ratio: `floor(ratio * bins) - 1`, clamped to the scale.
    /// Non-finite ratios map to the first bin.
    pub fn index_for(&self, ratio: f64) -> usize {
        let last = self.bins.len().saturating_sub(1) as f64;
        let raw = (ratio * self.bins.len() as f64).floor() - 1.0;
        if raw.is_nan() {
            return 0;
        }
        raw.clamp(0.0, last) as usize
    }

    pub fn color_for(&self, ratio: f64) -> &str {
        &self.bins[self.index_for(ratio)]
    }

    pub fn bin(&self, index: usize) -> Option<&str> {
        self.bins.get(index).map(String::as_str)
    }
}

/// The process-wide attention scale.
pub fn attention_scale() -> &'static ColorScale {
    static SCALE: OnceLock<ColorScale> = OnceLock::new();
    SCALE.get_or_init(|| ColorScale::interpolate(&PIYG_9, SCALE_BINS))
}

fn lerp(a: f64, b: f64, t: f64) -> f64 {
    a + (b - a) * t
}

fn rgb(r: f64, g: f64, b: f64) -> String {
    format!("rgb({},{},{})", r.round() as u8, g.round() as u8, b.round() as u8)
}
