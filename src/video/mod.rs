//! Video volumes and linear pixel indexing.
//!
//! A video is a dense `[time][channel][row][col]` buffer of `f32` samples.
//! `VideoShape` owns the index arithmetic shared by every stage of the
//! search: a pixel is addressed either by its coordinates or by a single
//! linear index in that layout. `VideoView` is a borrowed, zero-copy view;
//! `OwnedVideo` holds its own buffer.

use crate::util::{PatchSearchError, PatchSearchResult};

pub mod flow;

/// Coordinates of one sample in a video volume.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct PixelCoord {
    /// Frame index.
    pub t: usize,
    /// Channel index.
    pub c: usize,
    /// Row (y).
    pub row: usize,
    /// Column (x).
    pub col: usize,
}

/// Dimensions of a video volume and the linear index mapping over them.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct VideoShape {
    frames: usize,
    channels: usize,
    height: usize,
    width: usize,
}

impl VideoShape {
    /// Creates a shape, rejecting zero-sized or overflowing volumes.
    pub fn new(
        frames: usize,
        channels: usize,
        height: usize,
        width: usize,
    ) -> PatchSearchResult<Self> {
        let err = PatchSearchError::InvalidDimensions {
            frames,
            channels,
            height,
            width,
        };
        if frames == 0 || channels == 0 || height == 0 || width == 0 {
            return Err(err);
        }
        frames
            .checked_mul(channels)
            .and_then(|v| v.checked_mul(height))
            .and_then(|v| v.checked_mul(width))
            .ok_or(err)?;
        Ok(Self {
            frames,
            channels,
            height,
            width,
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Samples in one channel plane (`height * width`).
    pub fn plane_len(&self) -> usize {
        self.height * self.width
    }

    /// Samples in one frame across all channels.
    pub fn frame_len(&self) -> usize {
        self.plane_len() * self.channels
    }

    /// Total number of samples.
    pub fn num_samples(&self) -> usize {
        self.frame_len() * self.frames
    }

    /// Maps coordinates to a linear index.
    #[inline]
    pub fn to_linear(&self, t: usize, c: usize, row: usize, col: usize) -> usize {
        t * self.frame_len() + c * self.plane_len() + row * self.width + col
    }

    /// Inverse of [`VideoShape::to_linear`].
    #[inline]
    pub fn from_linear(&self, idx: usize) -> PixelCoord {
        let frame_len = self.frame_len();
        let plane_len = self.plane_len();
        PixelCoord {
            t: idx / frame_len,
            c: (idx % frame_len) / plane_len,
            row: (idx % plane_len) / self.width,
            col: idx % self.width,
        }
    }

    /// Linear index of the channel-0 sample at `(frame, row, col)`.
    ///
    /// Match indices are always reported in this form: they name the
    /// top-left anchor of a patch that spans every channel.
    #[inline]
    pub fn anchor_index(&self, row: usize, col: usize, frame: usize) -> usize {
        frame * self.frame_len() + row * self.width + col
    }

    /// Returns true when a `ps x ps x ps_t` patch anchored at `coord` fits.
    pub fn patch_fits(&self, coord: PixelCoord, patch_size: usize, patch_frames: usize) -> bool {
        coord.t + patch_frames <= self.frames
            && coord.row + patch_size <= self.height
            && coord.col + patch_size <= self.width
    }
}

/// Borrowed view over a `[t][c][h][w]` sample buffer.
#[derive(Copy, Clone)]
pub struct VideoView<'a> {
    data: &'a [f32],
    shape: VideoShape,
}

impl<'a> VideoView<'a> {
    /// Wraps a buffer that holds at least `shape.num_samples()` samples.
    pub fn new(data: &'a [f32], shape: VideoShape) -> PatchSearchResult<Self> {
        let needed = shape.num_samples();
        if data.len() < needed {
            return Err(PatchSearchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            shape,
        })
    }

    /// Shorthand for building the shape and the view in one step.
    pub fn from_slice(
        data: &'a [f32],
        frames: usize,
        channels: usize,
        height: usize,
        width: usize,
    ) -> PatchSearchResult<Self> {
        Self::new(data, VideoShape::new(frames, channels, height, width)?)
    }

    pub fn shape(&self) -> VideoShape {
        self.shape
    }

    pub fn as_slice(&self) -> &'a [f32] {
        self.data
    }

    /// Returns the sample at the given coordinates, if in bounds.
    pub fn get(&self, t: usize, c: usize, row: usize, col: usize) -> Option<f32> {
        let s = &self.shape;
        if t >= s.frames || c >= s.channels || row >= s.height || col >= s.width {
            return None;
        }
        self.data.get(s.to_linear(t, c, row, col)).copied()
    }

    /// Returns row `row` of channel `c` in frame `t`.
    ///
    /// Callers inside the crate only pass coordinates already clamped by
    /// window construction, so this indexes directly.
    #[inline]
    pub(crate) fn row(&self, t: usize, c: usize, row: usize) -> &'a [f32] {
        let start = self.shape.to_linear(t, c, row, 0);
        &self.data[start..start + self.shape.width]
    }
}

/// Video volume that owns its samples.
#[derive(Clone, Debug)]
pub struct OwnedVideo {
    data: Vec<f32>,
    shape: VideoShape,
}

impl OwnedVideo {
    /// Takes ownership of `data`, which must hold exactly `shape.num_samples()` samples.
    pub fn new(data: Vec<f32>, shape: VideoShape) -> PatchSearchResult<Self> {
        if data.len() != shape.num_samples() {
            return Err(PatchSearchError::BufferTooSmall {
                needed: shape.num_samples(),
                got: data.len(),
            });
        }
        Ok(Self { data, shape })
    }

    /// Builds a video by evaluating `f(t, c, row, col)` for every sample.
    pub fn from_fn<F>(shape: VideoShape, mut f: F) -> Self
    where
        F: FnMut(usize, usize, usize, usize) -> f32,
    {
        let mut data = Vec::with_capacity(shape.num_samples());
        for t in 0..shape.frames() {
            for c in 0..shape.channels() {
                for row in 0..shape.height() {
                    for col in 0..shape.width() {
                        data.push(f(t, c, row, col));
                    }
                }
            }
        }
        Self { data, shape }
    }

    pub fn shape(&self) -> VideoShape {
        self.shape
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn view(&self) -> VideoView<'_> {
        VideoView {
            data: &self.data,
            shape: self.shape,
        }
    }
}
