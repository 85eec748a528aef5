//! Viewport edge snapping and containment for the trigger control

use crate::types::{Position, Size};

/// Axis-aligned rectangle in viewport coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(origin: Position, size: Size) -> Self {
        Self {
            x: origin.x,
            y: origin.y,
            width: size.width,
            height: size.height,
        }
    }

    pub fn left(&self) -> f64 {
        self.x
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn top(&self) -> f64 {
        self.y
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }
}

#[derive(Debug)]
struct SnapCandidate {
    /// Origin value on this axis once snapped
    target: f64,
    distance: f64,
}

/// Snap a dropped control to the nearest viewport edge on each axis.
///
/// An edge is eligible when the control's corresponding side is within
/// `threshold` of it (including past it). The snapped side lands `margin`
/// inside the viewport. Returns `None` when no axis snaps.
pub fn find_edge_snap(control: Rect, viewport: Size, threshold: f64, margin: f64) -> Option<Position> {
    if threshold <= 0.0 {
        return None; // Snapping disabled
    }

    let mut best_x: Option<SnapCandidate> = None;
    let mut best_y: Option<SnapCandidate> = None;

    // Left edge
    check_snap(&mut best_x, control.left(), margin, threshold);
    // Right edge
    check_snap(
        &mut best_x,
        viewport.width - control.right(),
        viewport.width - control.width - margin,
        threshold,
    );
    // Top edge
    check_snap(&mut best_y, control.top(), margin, threshold);
    // Bottom edge
    check_snap(
        &mut best_y,
        viewport.height - control.bottom(),
        viewport.height - control.height - margin,
        threshold,
    );

    match (best_x, best_y) {
        (None, None) => None,
        (x, y) => Some(Position::new(
            x.map_or(control.x, |c| c.target),
            y.map_or(control.y, |c| c.target),
        )),
    }
}

/// `gap` is the signed distance from the control side to the edge
/// (negative once the control crosses the edge).
fn check_snap(best: &mut Option<SnapCandidate>, gap: f64, target: f64, threshold: f64) {
    if gap <= threshold {
        let candidate = SnapCandidate {
            target,
            distance: gap.abs(),
        };

        // Keep this candidate if it's closer than the current best
        if best.as_ref().is_none_or(|b| candidate.distance < b.distance) {
            *best = Some(candidate);
        }
    }
}

/// Clamp an origin so the control sits inside the viewport inset by
/// `margin`. When the viewport is too small to fit, the low bound wins.
pub fn clamp_to_viewport(origin: Position, control: Size, viewport: Size, margin: f64) -> Position {
    Position::new(
        clamp_axis(origin.x, margin, viewport.width - control.width - margin),
        clamp_axis(origin.y, margin, viewport.height - control.height - margin),
    )
}

fn clamp_axis(value: f64, low: f64, high: f64) -> f64 {
    value.min(high).max(low)
}
