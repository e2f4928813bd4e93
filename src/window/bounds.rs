//! Clamped, boundary-balanced search windows.
//!
//! A window that would spill past one edge of an axis is translated back
//! inside rather than shrunk, so every window keeps its full extent unless
//! the axis itself is shorter than the window.

use crate::util::math::to_usize;
use crate::util::{PatchSearchError, PatchSearchResult};

/// Half-open range of patch anchors `[start, end)` along one axis.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AxisRange {
    pub start: usize,
    pub end: usize,
}

impl AxisRange {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }

    pub fn contains(&self, value: usize) -> bool {
        value >= self.start && value < self.end
    }
}

/// Computes the anchor range of a window of `window_size` centered on `center`.
///
/// With `r = (window_size - 1) / 2`, any overflow past `0` or past
/// `dim - patch` shifts the whole window back inside the axis. The result
/// always satisfies `0 <= start < end <= dim - patch + 1`.
pub fn axis_bounds(
    center: usize,
    dim: usize,
    window_size: usize,
    patch: usize,
) -> PatchSearchResult<AxisRange> {
    if dim < patch || patch == 0 {
        return Err(PatchSearchError::DegenerateWindow { dim, patch });
    }
    let c = center as isize;
    let r = (window_size.saturating_sub(1) / 2) as isize;
    let last = (dim - patch) as isize;
    let shift = (c - r).min(0) + (c + r - last).max(0);
    let start = (c - r - shift).max(0);
    let end = (c + r - shift).min(last) + 1;
    Ok(AxisRange {
        start: to_usize(start),
        end: to_usize(end).max(to_usize(start) + 1),
    })
}

/// Inclusive frame range searched around reference frame `reference`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TemporalRange {
    /// Reference frame.
    pub reference: usize,
    /// First searched frame.
    pub start: usize,
    /// Last searched frame (inclusive).
    pub end: usize,
}

impl TemporalRange {
    /// Number of frames in the range.
    pub fn len(&self) -> usize {
        self.end - self.start + 1
    }

    pub fn is_empty(&self) -> bool {
        false
    }

    /// Position of `frame` inside the range.
    #[inline]
    pub(crate) fn slot(&self, frame: usize) -> usize {
        frame - self.start
    }
}

/// Balances `forward` / `backward` frame spans around `reference`.
///
/// Uses the same translate-not-shrink rule as [`axis_bounds`], with the last
/// anchor frame at `frames - patch_frames`.
pub fn temporal_range(
    reference: usize,
    frames: usize,
    forward: usize,
    backward: usize,
    patch_frames: usize,
) -> PatchSearchResult<TemporalRange> {
    if frames < patch_frames || patch_frames == 0 {
        return Err(PatchSearchError::DegenerateWindow {
            dim: frames,
            patch: patch_frames,
        });
    }
    let last = frames - patch_frames;
    if reference > last {
        return Err(PatchSearchError::InvalidConfiguration(
            "reference frame leaves no room for the temporal patch extent",
        ));
    }
    let t = reference as isize;
    let fwd = forward as isize;
    let bwd = backward as isize;
    let last = last as isize;
    let shift = (t - bwd).min(0) + (t + fwd - last).max(0);
    let start = (t - bwd - shift).max(0);
    let end = (t + fwd - shift).min(last);
    Ok(TemporalRange {
        reference,
        start: to_usize(start).min(reference),
        end: to_usize(end).max(reference),
    })
}

/// Per-frame search window: anchor ranges plus the tracked center.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct WindowBounds {
    /// Frame the window lives in.
    pub frame: usize,
    /// Tracked center `(row, col)`.
    pub center: (usize, usize),
    pub rows: AxisRange,
    pub cols: AxisRange,
}

impl WindowBounds {
    /// Builds the clamped window around a tracked center.
    pub fn build(
        frame: usize,
        center: (usize, usize),
        height: usize,
        width: usize,
        window_size: usize,
        patch: usize,
    ) -> PatchSearchResult<Self> {
        let rows = axis_bounds(center.0, height, window_size, patch)?;
        let cols = axis_bounds(center.1, width, window_size, patch)?;
        Ok(Self {
            frame,
            center,
            rows,
            cols,
        })
    }

    /// Number of candidate anchors in the window.
    pub fn area(&self) -> usize {
        self.rows.len() * self.cols.len()
    }
}
