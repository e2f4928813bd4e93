//! Optical-flow fields used to steer search windows across frames.
//!
//! A field is laid out `[time][2][row][col]`; component 0 is the column
//! displacement (dx) and component 1 the row displacement (dy). Flow
//! estimation itself happens elsewhere: estimators produce `frames - 1`
//! fields, and [`OwnedFlow::expand_forward`] / [`OwnedFlow::expand_backward`]
//! pad them to one field per frame before a search.

use crate::util::{PatchSearchError, PatchSearchResult};
use crate::video::VideoShape;

/// Borrowed flow field.
#[derive(Copy, Clone)]
pub struct FlowView<'a> {
    data: &'a [f32],
    frames: usize,
    height: usize,
    width: usize,
}

impl<'a> FlowView<'a> {
    /// Wraps a `[frames][2][height][width]` buffer.
    pub fn new(
        data: &'a [f32],
        frames: usize,
        height: usize,
        width: usize,
    ) -> PatchSearchResult<Self> {
        if frames == 0 || height == 0 || width == 0 {
            return Err(PatchSearchError::InvalidDimensions {
                frames,
                channels: 2,
                height,
                width,
            });
        }
        let needed = frames * 2 * height * width;
        if data.len() < needed {
            return Err(PatchSearchError::BufferTooSmall {
                needed,
                got: data.len(),
            });
        }
        Ok(Self {
            data: &data[..needed],
            frames,
            height,
            width,
        })
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn width(&self) -> usize {
        self.width
    }

    /// Returns `(dx, dy)` stored for pixel `(row, col)` of frame `t`.
    ///
    /// Panics when `(t, row, col)` lies outside the field.
    #[inline]
    pub fn displacement(&self, t: usize, row: usize, col: usize) -> (f32, f32) {
        let plane = self.height * self.width;
        let base = t * 2 * plane + row * self.width + col;
        (self.data[base], self.data[base + plane])
    }
}

/// Forward/backward flow pair consumed by the window tracker.
#[derive(Copy, Clone)]
pub struct FlowFields<'a> {
    /// Displacement from frame `t` to `t + 1`.
    pub forward: FlowView<'a>,
    /// Displacement from frame `t` to `t - 1`.
    pub backward: FlowView<'a>,
}

impl<'a> FlowFields<'a> {
    pub fn new(forward: FlowView<'a>, backward: FlowView<'a>) -> Self {
        Self { forward, backward }
    }

    /// Checks the pair against the video it will steer.
    ///
    /// Both fields must carry one entry per video frame (already expanded)
    /// and the video's spatial size.
    pub fn validate(&self, shape: VideoShape) -> PatchSearchResult<()> {
        if self.forward.frames != self.backward.frames {
            return Err(PatchSearchError::InvalidConfiguration(
                "forward and backward flows have different frame counts",
            ));
        }
        if self.forward.frames != shape.frames() {
            return Err(PatchSearchError::InvalidConfiguration(
                "flow frame count must equal video frame count (expand flows first)",
            ));
        }
        for field in [&self.forward, &self.backward] {
            if field.height != shape.height() || field.width != shape.width() {
                return Err(PatchSearchError::InvalidConfiguration(
                    "flow spatial size differs from video",
                ));
            }
        }
        Ok(())
    }
}

/// Flow field that owns its buffer.
#[derive(Clone, Debug)]
pub struct OwnedFlow {
    data: Vec<f32>,
    frames: usize,
    height: usize,
    width: usize,
}

impl OwnedFlow {
    /// Takes ownership of a `[frames][2][height][width]` buffer.
    pub fn new(
        data: Vec<f32>,
        frames: usize,
        height: usize,
        width: usize,
    ) -> PatchSearchResult<Self> {
        FlowView::new(&data, frames, height, width)?;
        if data.len() != frames * 2 * height * width {
            return Err(PatchSearchError::BufferTooSmall {
                needed: frames * 2 * height * width,
                got: data.len(),
            });
        }
        Ok(Self {
            data,
            frames,
            height,
            width,
        })
    }

    /// All-zero field (no motion).
    pub fn zeros(frames: usize, height: usize, width: usize) -> PatchSearchResult<Self> {
        Self::new(vec![0.0; frames * 2 * height * width], frames, height, width)
    }

    /// Field with the same `(dx, dy)` at every pixel and frame.
    pub fn uniform(
        frames: usize,
        height: usize,
        width: usize,
        dx: f32,
        dy: f32,
    ) -> PatchSearchResult<Self> {
        let plane = height * width;
        let mut data = Vec::with_capacity(frames * 2 * plane);
        for _ in 0..frames {
            data.extend(std::iter::repeat(dx).take(plane));
            data.extend(std::iter::repeat(dy).take(plane));
        }
        Self::new(data, frames, height, width)
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn view(&self) -> FlowView<'_> {
        FlowView {
            data: &self.data,
            frames: self.frames,
            height: self.height,
            width: self.width,
        }
    }

    fn field_len(&self) -> usize {
        2 * self.height * self.width
    }

    /// Appends a copy of the last field (forward flows: `T-1 -> T`).
    pub fn expand_forward(mut self) -> Self {
        let len = self.field_len();
        let start = self.data.len() - len;
        self.data.extend_from_within(start..);
        self.frames += 1;
        self
    }

    /// Prepends a copy of the first field (backward flows: `T-1 -> T`).
    pub fn expand_backward(mut self) -> Self {
        let len = self.field_len();
        let mut data = Vec::with_capacity(self.data.len() + len);
        data.extend_from_slice(&self.data[..len]);
        data.append(&mut self.data);
        self.data = data;
        self.frames += 1;
        self
    }
}

/// Expands an estimator's `frames - 1` flow pair to one field per frame.
///
/// Pairs that already match the frame count are returned untouched; fewer
/// fields than `frames - 1`, or unequal counts, are rejected.
pub fn expand_flow_pair(
    forward: OwnedFlow,
    backward: OwnedFlow,
    frames: usize,
) -> PatchSearchResult<(OwnedFlow, OwnedFlow)> {
    if forward.frames != backward.frames {
        return Err(PatchSearchError::InvalidConfiguration(
            "forward and backward flows have different frame counts",
        ));
    }
    if forward.frames == frames {
        return Ok((forward, backward));
    }
    if forward.frames + 1 != frames {
        return Err(PatchSearchError::InvalidConfiguration(
            "flow frame count must be frames - 1 or frames",
        ));
    }
    Ok((forward.expand_forward(), backward.expand_backward()))
}
