//! SIMD-accelerated kernel using the `wide` crate.
//!
//! Patches are small (typically 5x5 to 7x7), so vectorizing inside one patch
//! wastes lanes. Instead eight horizontally adjacent candidate anchors are
//! scored at once: for each patch pixel the reference sample is broadcast and
//! compared against eight consecutive samples of the candidate row. Each lane
//! accumulates in the same order as [`SsdScalar`](crate::kernel::scalar::SsdScalar),
//! so results are identical to the scalar kernel.

use crate::kernel::scalar::SsdScalar;
use crate::kernel::{DistanceKernel, ScanParams};
use crate::video::{PixelCoord, VideoView};
use crate::window::AxisRange;
use wide::f32x8;

const LANES: usize = 8;
const SCALE: f32 = 255.0;

/// Load 8 f32 values into f32x8.
#[inline]
fn load_f32x8(slice: &[f32]) -> f32x8 {
    f32x8::from([
        slice[0], slice[1], slice[2], slice[3], slice[4], slice[5], slice[6], slice[7],
    ])
}

/// SIMD normalized squared-difference kernel.
pub struct SsdSimd;

impl SsdSimd {
    /// Scores anchors `col..col + 8` of `row` in `frame`.
    fn distance_x8(
        video: VideoView<'_>,
        params: &ScanParams,
        reference: PixelCoord,
        frame: usize,
        row: usize,
        col: usize,
    ) -> [f32; LANES] {
        let ps = params.patch_size;
        let scale = f32x8::splat(SCALE);
        let mut acc = f32x8::ZERO;
        for pt in 0..params.patch_frames {
            for c in 0..params.channels {
                for pi in 0..ps {
                    let ref_row = video.row(reference.t + pt, c, reference.row + pi);
                    let cand_row = video.row(frame + pt, c, row + pi);
                    for pj in 0..ps {
                        let a = f32x8::splat(ref_row[reference.col + pj] / SCALE);
                        let b = load_f32x8(&cand_row[col + pj..]) / scale;
                        let diff = a - b;
                        acc += diff * diff;
                    }
                }
            }
        }
        let norm = params.norm();
        let mut out = acc.to_array();
        for value in out.iter_mut() {
            *value /= norm;
        }
        out
    }
}

impl DistanceKernel for SsdSimd {
    fn distance_at(
        video: VideoView<'_>,
        params: &ScanParams,
        reference: PixelCoord,
        frame: usize,
        row: usize,
        col: usize,
    ) -> f32 {
        SsdScalar::distance_at(video, params, reference, frame, row, col)
    }

    fn scan_row(
        video: VideoView<'_>,
        params: &ScanParams,
        reference: PixelCoord,
        frame: usize,
        row: usize,
        cols: AxisRange,
        out: &mut [f32],
    ) {
        let count = cols.len().min(out.len());
        let simd_end = count / LANES * LANES;

        // SIMD portion: 8 anchors at a time
        let mut offset = 0;
        while offset < simd_end {
            let col = cols.start + offset;
            let scores = Self::distance_x8(video, params, reference, frame, row, col);
            out[offset..offset + LANES].copy_from_slice(&scores);
            offset += LANES;
        }

        // Scalar remainder
        while offset < count {
            out[offset] =
                SsdScalar::distance_at(video, params, reference, frame, row, cols.start + offset);
            offset += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::SsdSimd;
    use crate::kernel::scalar::SsdScalar;
    use crate::kernel::{DistanceKernel, ScanParams};
    use crate::video::{OwnedVideo, PixelCoord, VideoShape};
    use crate::window::AxisRange;

    #[test]
    fn simd_row_scan_matches_scalar_exactly() {
        let shape = VideoShape::new(3, 3, 24, 29).unwrap();
        let video = OwnedVideo::from_fn(shape, |t, c, row, col| {
            ((t * 53 + c * 11 + row * 29 + col * 7 + (row ^ col)) % 256) as f32 + 0.25
        });
        let params = ScanParams {
            patch_size: 5,
            patch_frames: 2,
            channels: 3,
        };
        let reference = PixelCoord {
            t: 1,
            c: 0,
            row: 9,
            col: 11,
        };
        let cols = AxisRange { start: 2, end: 21 };
        let mut simd = vec![0.0f32; cols.len()];
        let mut scalar = vec![0.0f32; cols.len()];
        SsdSimd::scan_row(video.view(), &params, reference, 0, 7, cols, &mut simd);
        SsdScalar::scan_row(video.view(), &params, reference, 0, 7, cols, &mut scalar);
        assert_eq!(simd, scalar);
    }
}
