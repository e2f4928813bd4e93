//! Copies matched patches out of a video into contiguous buffers.

use crate::util::{PatchSearchError, PatchSearchResult};
use crate::video::{VideoShape, VideoView};

/// Extent of one gathered patch, stored `[pt][c][pi][pj]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PatchLayout {
    pub patch_size: usize,
    pub patch_frames: usize,
    pub channels: usize,
}

impl PatchLayout {
    /// Layout covering every channel of `shape`.
    pub fn for_video(shape: VideoShape, patch_size: usize, patch_frames: usize) -> Self {
        Self {
            patch_size,
            patch_frames,
            channels: shape.channels(),
        }
    }

    /// Samples per gathered patch.
    pub fn patch_len(&self) -> usize {
        self.patch_frames * self.channels * self.patch_size * self.patch_size
    }
}

/// Gathers one patch per entry of `indices` into `out`.
///
/// Each index is the channel-0 anchor of a patch; the patch is copied
/// across `layout.channels` channels. `None` entries (short candidate sets)
/// leave a zero-filled slot. `out` must hold exactly
/// `indices.len() * layout.patch_len()` samples.
pub fn gather_patches(
    video: VideoView<'_>,
    indices: &[Option<usize>],
    layout: PatchLayout,
    out: &mut [f32],
) -> PatchSearchResult<()> {
    let shape = video.shape();
    let patch_len = layout.patch_len();
    if patch_len == 0 {
        return Err(PatchSearchError::InvalidConfiguration(
            "patch layout has an empty axis",
        ));
    }
    if layout.channels > shape.channels() {
        return Err(PatchSearchError::InvalidConfiguration(
            "patch layout has more channels than the video",
        ));
    }
    let expected = indices.len() * patch_len;
    if out.len() != expected {
        return Err(PatchSearchError::OutputLengthMismatch {
            expected,
            got: out.len(),
        });
    }

    let ps = layout.patch_size;
    for (slot, index) in out.chunks_exact_mut(patch_len).zip(indices) {
        let Some(index) = *index else {
            slot.fill(0.0);
            continue;
        };
        if index >= shape.num_samples() {
            return Err(PatchSearchError::PatchOutOfBounds { index });
        }
        let anchor = shape.from_linear(index);
        if !shape.patch_fits(anchor, ps, layout.patch_frames) {
            return Err(PatchSearchError::PatchOutOfBounds { index });
        }
        let mut offset = 0;
        for pt in 0..layout.patch_frames {
            for c in 0..layout.channels {
                for pi in 0..ps {
                    let row = video.row(anchor.t + pt, c, anchor.row + pi);
                    slot[offset..offset + ps].copy_from_slice(&row[anchor.col..anchor.col + ps]);
                    offset += ps;
                }
            }
        }
    }
    Ok(())
}
