//! Scalar reference kernel.

use crate::kernel::{DistanceKernel, ScanParams};
use crate::video::{PixelCoord, VideoView};

const SCALE: f32 = 255.0;

/// Scalar normalized squared-difference kernel.
pub struct SsdScalar;

impl DistanceKernel for SsdScalar {
    fn distance_at(
        video: VideoView<'_>,
        params: &ScanParams,
        reference: PixelCoord,
        frame: usize,
        row: usize,
        col: usize,
    ) -> f32 {
        let ps = params.patch_size;
        let mut delta = 0.0f32;
        for pt in 0..params.patch_frames {
            for c in 0..params.channels {
                for pi in 0..ps {
                    let ref_row = video.row(reference.t + pt, c, reference.row + pi);
                    let cand_row = video.row(frame + pt, c, row + pi);
                    let ref_px = &ref_row[reference.col..reference.col + ps];
                    let cand_px = &cand_row[col..col + ps];
                    for (&a, &b) in ref_px.iter().zip(cand_px) {
                        let diff = a / SCALE - b / SCALE;
                        delta += diff * diff;
                    }
                }
            }
        }
        delta / params.norm()
    }
}
