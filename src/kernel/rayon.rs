//! Rayon-parallel volume scan (feature-gated).
//!
//! Parallelizes over window rows of every visited frame. Each task owns one
//! disjoint `window_size`-long chunk of the score buffer, so no
//! synchronization is needed beyond the final join.

use crate::kernel::{DistanceKernel, ScanParams, ScoreVolume};
use crate::video::{PixelCoord, VideoView};
use rayon::prelude::*;

/// Row-parallel equivalent of [`scan_volume`](crate::kernel::scan_volume).
pub fn scan_volume_par<K: DistanceKernel>(
    video: VideoView<'_>,
    params: &ScanParams,
    reference: PixelCoord,
    volume: &mut ScoreVolume,
) {
    let (windows, scores, window_size) = volume.parts_mut();
    if window_size == 0 {
        return;
    }
    scores
        .par_chunks_mut(window_size)
        .enumerate()
        .for_each(|(chunk_idx, chunk)| {
            let visit = chunk_idx / window_size;
            let dr = chunk_idx % window_size;
            let window = &windows[visit];
            if dr >= window.rows.len() {
                return;
            }
            let ncols = window.cols.len();
            K::scan_row(
                video,
                params,
                reference,
                window.frame,
                window.rows.start + dr,
                window.cols,
                &mut chunk[..ncols],
            );
        });
}
