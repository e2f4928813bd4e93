//! Patch distance kernels and the dense score volume they fill.
//!
//! Every kernel computes the same normalized squared difference
//!
//! ```text
//! d = 1 / (ps * ps * ps_t * chnls) * sum((ref / 255 - cand / 255)^2)
//! ```
//!
//! accumulated in `[pt][c][pi][pj]` order, so scalar, SIMD and parallel
//! scans agree exactly.

use crate::candidate::topk::Candidate;
use crate::video::{PixelCoord, VideoShape, VideoView};
use crate::window::{AxisRange, WindowBounds};

/// Patch extent and channel subset compared by a kernel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ScanParams {
    /// Spatial patch side (`ps`).
    pub patch_size: usize,
    /// Temporal patch depth (`ps_t`).
    pub patch_frames: usize,
    /// Leading channels compared (1 for luma-only matching).
    pub channels: usize,
}

impl ScanParams {
    /// Normalization factor `ps * ps * ps_t * chnls`.
    #[inline]
    pub fn norm(&self) -> f32 {
        (self.patch_size * self.patch_size * self.patch_frames * self.channels) as f32
    }
}

/// Kernel trait for distance evaluation.
pub trait DistanceKernel {
    /// Distance between the reference patch and the patch anchored at
    /// `(frame, row, col)`. Both patches must lie inside the video.
    fn distance_at(
        video: VideoView<'_>,
        params: &ScanParams,
        reference: PixelCoord,
        frame: usize,
        row: usize,
        col: usize,
    ) -> f32;

    /// Scores the anchors `cols` of row `row` in `frame` into `out`,
    /// one value per anchor.
    fn scan_row(
        video: VideoView<'_>,
        params: &ScanParams,
        reference: PixelCoord,
        frame: usize,
        row: usize,
        cols: AxisRange,
        out: &mut [f32],
    ) {
        for (slot, col) in out.iter_mut().zip(cols.start..cols.end) {
            *slot = Self::distance_at(video, params, reference, frame, row, col);
        }
    }
}

pub mod scalar;

#[cfg(feature = "simd")]
pub mod simd;

#[cfg(feature = "rayon")]
pub mod rayon;

/// Dense per-frame window scores for one reference patch.
///
/// Slot `(visit, dr, dc)` holds the score of anchor
/// `(rows.start + dr, cols.start + dc)` in the `visit`-th visited frame.
/// Every visited frame owns a `window_size x window_size` slab; slots past
/// the clamped window keep `+inf` and no index.
#[derive(Clone, Debug)]
pub struct ScoreVolume {
    window_size: usize,
    windows: Vec<WindowBounds>,
    scores: Vec<f32>,
    indices: Vec<Option<usize>>,
}

impl ScoreVolume {
    /// Allocates the volume and fills the anchor index of every valid slot.
    pub fn new(shape: VideoShape, windows: Vec<WindowBounds>, window_size: usize) -> Self {
        let slab = window_size * window_size;
        let mut indices = vec![None; slab * windows.len()];
        for (visit, window) in windows.iter().enumerate() {
            let base = visit * slab;
            for (dr, row) in (window.rows.start..window.rows.end).enumerate() {
                for (dc, col) in (window.cols.start..window.cols.end).enumerate() {
                    indices[base + dr * window_size + dc] =
                        Some(shape.anchor_index(row, col, window.frame));
                }
            }
        }
        Self {
            window_size,
            scores: vec![f32::INFINITY; slab * windows.len()],
            windows,
            indices,
        }
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    /// Windows in visiting order.
    pub fn windows(&self) -> &[WindowBounds] {
        &self.windows
    }

    pub fn scores(&self) -> &[f32] {
        &self.scores
    }

    pub fn indices(&self) -> &[Option<usize>] {
        &self.indices
    }

    /// Number of scored anchors (valid slots).
    pub fn scored_positions(&self) -> usize {
        self.windows.iter().map(WindowBounds::area).sum()
    }

    /// Candidate at `(visit, dr, dc)`, if that slot lies inside its window.
    pub fn get(&self, visit: usize, dr: usize, dc: usize) -> Option<Candidate> {
        if dr >= self.window_size || dc >= self.window_size {
            return None;
        }
        let idx = (visit * self.window_size + dr) * self.window_size + dc;
        let index = (*self.indices.get(idx)?)?;
        Some(Candidate {
            distance: self.scores[idx],
            index,
        })
    }

    /// Flattened `(distance, index)` pairs of all valid slots.
    pub fn candidates(&self) -> impl Iterator<Item = Candidate> + '_ {
        self.scores
            .iter()
            .zip(self.indices.iter())
            .filter_map(|(&distance, index)| index.map(|index| Candidate { distance, index }))
    }

    pub(crate) fn parts_mut(&mut self) -> (&[WindowBounds], &mut [f32], usize) {
        (&self.windows, &mut self.scores, self.window_size)
    }
}

/// Fills every valid slot of `volume` with kernel `K`, row by row.
pub fn scan_volume<K: DistanceKernel>(
    video: VideoView<'_>,
    params: &ScanParams,
    reference: PixelCoord,
    volume: &mut ScoreVolume,
) {
    let (windows, scores, window_size) = volume.parts_mut();
    let slab = window_size * window_size;
    for (visit, window) in windows.iter().enumerate() {
        let base = visit * slab;
        let ncols = window.cols.len();
        for (dr, row) in (window.rows.start..window.rows.end).enumerate() {
            let start = base + dr * window_size;
            K::scan_row(
                video,
                params,
                reference,
                window.frame,
                row,
                window.cols,
                &mut scores[start..start + ncols],
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{scan_volume, ScanParams, ScoreVolume};
    use crate::kernel::scalar::SsdScalar;
    use crate::video::{OwnedVideo, PixelCoord, VideoShape};
    use crate::window::WindowBounds;

    #[test]
    fn volume_pads_slots_outside_window() {
        let shape = VideoShape::new(2, 1, 6, 6).unwrap();
        let window = WindowBounds::build(1, (0, 0), 6, 6, 5, 3).unwrap();
        let volume = ScoreVolume::new(shape, vec![window], 5);
        // anchors 0..4 along each axis fit, the fifth row/col is padding
        assert_eq!(volume.scored_positions(), 16);
        assert_eq!(volume.indices().iter().filter(|i| i.is_some()).count(), 16);
        assert!(volume.get(0, 4, 0).is_none());
        assert_eq!(volume.get(0, 1, 2).unwrap().index, shape.anchor_index(1, 2, 1));
    }

    #[test]
    fn scan_fills_only_valid_slots() {
        let shape = VideoShape::new(2, 1, 6, 6).unwrap();
        let video = OwnedVideo::from_fn(shape, |t, _, row, col| ((t + row * 3 + col) % 7) as f32);
        let window = WindowBounds::build(0, (2, 2), 6, 6, 5, 3).unwrap();
        let mut volume = ScoreVolume::new(shape, vec![window], 5);
        let params = ScanParams {
            patch_size: 3,
            patch_frames: 1,
            channels: 1,
        };
        let reference = PixelCoord {
            t: 0,
            c: 0,
            row: 2,
            col: 2,
        };
        scan_volume::<SsdScalar>(video.view(), &params, reference, &mut volume);
        let finite = volume.scores().iter().filter(|s| s.is_finite()).count();
        assert_eq!(finite, volume.scored_positions());
        let own = volume.get(0, 2, 2).unwrap();
        assert_eq!(own.index, shape.anchor_index(2, 2, 0));
        assert_eq!(own.distance, 0.0);
    }
}
