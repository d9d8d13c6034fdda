//! Aspect-ratio conversion planning.
//!
//! Computed once per job by comparing the source canvas to the desired
//! output dimensions. Cropping and transform-positioning are mutually
//! exclusive strategies for the same stream, so the choice is a closed enum
//! matched exhaustively by the compiler.

use crate::models::{Dimensions, Transform};

/// Ratio differences below this are treated as floating-point noise.
const RATIO_TOLERANCE: f64 = 0.01;

/// Crop window, in source-canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CropWindow {
    pub width: u32,
    pub height: u32,
    pub x: u32,
    pub y: u32,
}

/// How the compiled graph reconciles the source canvas with the desired
/// output shape.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AspectStrategy {
    /// Ratios match within tolerance; nothing to do here.
    Passthrough,
    /// Cut the source down to the desired ratio, dimension-preserving on
    /// the axis that survives.
    Crop(CropWindow),
    /// Portrait source to landscape output: never cut content, let the
    /// final scale+pad letterbox it.
    Letterbox,
    /// The first visible video segment carries a scale/rotation transform:
    /// build a black canvas at target size and scale/position the stream
    /// onto it instead of cropping.
    TransformComposite(Transform),
}

/// Parse an aspect string such as `"16:9"`.
///
/// Malformed strings are edit-state noise, not errors: the caller falls
/// back to the canvas ratio.
pub fn parse_aspect(value: &str) -> Option<f64> {
    let (w, h) = value.split_once([':', '/'])?;
    let w: f64 = w.trim().parse().ok()?;
    let h: f64 = h.trim().parse().ok()?;
    if w <= 0.0 || h <= 0.0 {
        tracing::warn!("Ignoring non-positive aspect ratio '{}'", value);
        return None;
    }
    Some(w / h)
}

/// Plan the aspect conversion from `source` to `desired`.
///
/// `transform` is the first visible video segment's transform, when it has
/// one. A pan-only transform biases the crop window; a scale or rotation
/// switches to the composite strategy.
pub fn plan_aspect(
    source: Dimensions,
    desired: Dimensions,
    transform: Option<Transform>,
) -> AspectStrategy {
    if let Some(t) = transform {
        if !t.is_identity() && !t.is_pan_only() {
            return AspectStrategy::TransformComposite(t);
        }
    }

    let source_ratio = source.ratio();
    let desired_ratio = desired.ratio();
    let relative = (source_ratio - desired_ratio).abs() / desired_ratio;
    if relative < RATIO_TOLERANCE {
        return AspectStrategy::Passthrough;
    }

    let pan = transform.filter(|t| t.is_pan_only()).unwrap_or_default();

    if desired_ratio < source_ratio {
        // Output narrower than source: keep full height, cut the sides.
        // Covers both same-orientation narrowing and the landscape-to-
        // portrait vertical export.
        let width = (source.height as f64 * desired_ratio).round() as u32;
        let x = offset_with_pan(source.width, width, pan.x);
        AspectStrategy::Crop(CropWindow {
            width,
            height: source.height,
            x,
            y: 0,
        })
    } else if source.is_landscape() == desired.is_landscape() {
        // Output wider than source, same orientation: keep full width, cut
        // top and bottom.
        let height = (source.width as f64 / desired_ratio).round() as u32;
        let y = offset_with_pan(source.height, height, pan.y);
        AspectStrategy::Crop(CropWindow {
            width: source.width,
            height,
            x: 0,
            y,
        })
    } else {
        // Portrait source to landscape output: letterbox, never cut.
        AspectStrategy::Letterbox
    }
}

/// Centered crop offset, biased by a normalized pan value in `[-1, 1]`.
fn offset_with_pan(full: u32, kept: u32, pan: f64) -> u32 {
    let slack = (full.saturating_sub(kept)) as f64;
    let centered = slack / 2.0;
    let biased = centered + pan.clamp(-1.0, 1.0) * centered;
    biased.round().clamp(0.0, slack) as u32
}
