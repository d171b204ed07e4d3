//! Authored filter settings: either a simple cut/peak pair or a multi-point
//! filter with optional morph sub-filters (spec §4.7).

use serde::{Deserialize, Serialize};

/// The RBJ filter shape a control point applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterPointKind {
    LowPass,
    HighPass,
    PeakingEq,
    LowShelf,
    HighShelf,
    Notch,
}

/// One point in a multi-point filter: shape, normalized frequency, and gain
/// in dB (meaningful only for shelf/peaking kinds).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterControlPoint {
    pub kind: FilterPointKind,
    pub freq: f32,
    pub gain: f32,
}

/// Either the legacy simple cut+peak filter or a full multi-point filter,
/// optionally with a second sub-filter used as a morph target (spec §4.7,
/// "dot 0" filter modulators lerp between the two).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum FilterSettings {
    /// A single cut (lowpass-like) and peak (resonance-like) scalar,
    /// converted to RBJ coefficients via a fixed mapping curve.
    Simple { cut: f32, peak: f32 },
    /// Up to `filter_max_points` control points, each independently
    /// modulatable, plus an optional second set of points to morph toward.
    MultiPoint {
        points: Vec<FilterControlPoint>,
        morph_target: Option<Vec<FilterControlPoint>>,
    },
}

impl FilterSettings {
    /// Linearly interpolate the control points of two multi-point filters.
    /// Point `kind` is taken from `self`; only `freq`/`gain` are blended.
    /// No-op (returns a clone of `self`) for the `Simple` variant or when
    /// point counts differ.
    pub fn lerp(&self, other: &FilterSettings, ratio: f32) -> FilterSettings {
        match (self, other) {
            (
                FilterSettings::MultiPoint { points: a, .. },
                FilterSettings::MultiPoint { points: b, .. },
            ) if a.len() == b.len() => {
                let points = a
                    .iter()
                    .zip(b.iter())
                    .map(|(pa, pb)| FilterControlPoint {
                        kind: pa.kind,
                        freq: pa.freq + (pb.freq - pa.freq) * ratio,
                        gain: pa.gain + (pb.gain - pa.gain) * ratio,
                    })
                    .collect();
                FilterSettings::MultiPoint {
                    points,
                    morph_target: None,
                }
            }
            _ => self.clone(),
        }
    }
}
