//! Per-pixel occupancy mask driving batch selection.

use crate::util::{PatchSearchError, PatchSearchResult};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Lifecycle of one reference pixel: `Unclaimed -> Claimed -> Done`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[repr(u8)]
pub enum MaskState {
    /// Waiting to be picked by a batch.
    Unclaimed,
    /// Frozen into a dispatched batch.
    Claimed,
    /// Processed, or never eligible as a reference.
    Done,
}

/// How each batch picks its pixels among the unclaimed ones.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SelectionPolicy {
    /// Lowest linear positions first.
    Scan,
    /// Uniform random subset, reproducible from `seed`.
    Random { seed: u64 },
}

pub(crate) enum Selector {
    Scan,
    Random {
        rng: StdRng,
        // open positions, filled on the first claim; may hold stale entries
        pool: Option<Vec<usize>>,
    },
}

impl Selector {
    pub(crate) fn from_policy(policy: SelectionPolicy) -> Self {
        match policy {
            SelectionPolicy::Scan => Selector::Scan,
            SelectionPolicy::Random { seed } => Selector::Random {
                rng: StdRng::seed_from_u64(seed),
                pool: None,
            },
        }
    }
}

/// Tri-state mask over `(t, row, col)` positions, indexed
/// `t * height * width + row * width + col`.
///
/// Only the batch scheduler mutates it; batches receive frozen copies of
/// their pixel lists.
#[derive(Clone, Debug)]
pub struct OccupancyMask {
    frames: usize,
    height: usize,
    width: usize,
    states: Vec<MaskState>,
    unclaimed: usize,
    // every position below the cursor is already claimed or done
    cursor: usize,
}

impl OccupancyMask {
    /// Mask with every position unclaimed.
    pub fn new(frames: usize, height: usize, width: usize) -> PatchSearchResult<Self> {
        if frames == 0 || height == 0 || width == 0 {
            return Err(PatchSearchError::InvalidDimensions {
                frames,
                channels: 1,
                height,
                width,
            });
        }
        let len = frames * height * width;
        Ok(Self {
            frames,
            height,
            width,
            states: vec![MaskState::Unclaimed; len],
            unclaimed: len,
            cursor: 0,
        })
    }

    /// Mask whose unclaimed positions are the patch anchors to process.
    ///
    /// A position is eligible when a `patch_size x patch_size x patch_frames`
    /// patch anchored there fits the volume and its row and column lie on the
    /// `proc_step` grid (the last valid row and column are always included so
    /// the borders are covered). Everything else starts as `Done`.
    pub fn for_anchors(
        frames: usize,
        height: usize,
        width: usize,
        patch_size: usize,
        patch_frames: usize,
        proc_step: usize,
    ) -> PatchSearchResult<Self> {
        if proc_step == 0 {
            return Err(PatchSearchError::InvalidConfiguration(
                "processing step must be at least 1",
            ));
        }
        if height < patch_size || width < patch_size {
            return Err(PatchSearchError::DegenerateWindow {
                dim: height.min(width),
                patch: patch_size,
            });
        }
        if frames < patch_frames {
            return Err(PatchSearchError::DegenerateWindow {
                dim: frames,
                patch: patch_frames,
            });
        }
        let mut mask = Self::new(frames, height, width)?;
        let last_row = height - patch_size;
        let last_col = width - patch_size;
        let last_t = frames - patch_frames;
        let on_grid = |v: usize, last: usize| v <= last && (v % proc_step == 0 || v == last);

        let mut unclaimed = 0;
        for t in 0..frames {
            for row in 0..height {
                for col in 0..width {
                    let idx = (t * height + row) * width + col;
                    if t <= last_t && on_grid(row, last_row) && on_grid(col, last_col) {
                        unclaimed += 1;
                    } else {
                        mask.states[idx] = MaskState::Done;
                    }
                }
            }
        }
        mask.unclaimed = unclaimed;
        Ok(mask)
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

    /// Number of positions.
    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn state(&self, idx: usize) -> Option<MaskState> {
        self.states.get(idx).copied()
    }

    pub fn states(&self) -> &[MaskState] {
        &self.states
    }

    /// Positions still waiting for a batch.
    pub fn unclaimed(&self) -> usize {
        self.unclaimed
    }

    /// Count of positions in `state`.
    pub fn count(&self, state: MaskState) -> usize {
        self.states.iter().filter(|&&s| s == state).count()
    }

    /// `(t, row, col)` of a mask position.
    #[inline]
    pub fn coords(&self, idx: usize) -> (usize, usize, usize) {
        let plane = self.height * self.width;
        (idx / plane, (idx % plane) / self.width, idx % self.width)
    }

    /// Claims up to `max` unclaimed positions and returns them ascending.
    pub(crate) fn claim(&mut self, max: usize, selector: &mut Selector) -> Vec<usize> {
        if max == 0 || self.unclaimed == 0 {
            return Vec::new();
        }
        let picked = match selector {
            Selector::Scan => {
                let mut picked = Vec::with_capacity(max.min(self.unclaimed));
                let mut pos = self.cursor;
                while pos < self.states.len() && picked.len() < max {
                    if self.states[pos] == MaskState::Unclaimed {
                        picked.push(pos);
                    }
                    pos += 1;
                }
                self.cursor = pos;
                picked
            }
            Selector::Random { rng, pool } => {
                let states = &self.states;
                let cursor = self.cursor;
                let pool = pool.get_or_insert_with(|| {
                    (cursor..states.len())
                        .filter(|&pos| states[pos] == MaskState::Unclaimed)
                        .collect()
                });
                // partial Fisher-Yates: each draw is O(1), stale entries are dropped once
                let mut picked = Vec::with_capacity(max.min(self.unclaimed));
                while picked.len() < max && !pool.is_empty() {
                    let pos = pool.swap_remove(rng.random_range(0..pool.len()));
                    if states[pos] == MaskState::Unclaimed {
                        picked.push(pos);
                    }
                }
                picked.sort_unstable();
                picked
            }
        };
        for &pos in &picked {
            self.states[pos] = MaskState::Claimed;
        }
        self.unclaimed -= picked.len();
        picked
    }

    /// Marks a dispatched batch as processed.
    pub(crate) fn complete(&mut self, pixels: &[usize]) {
        for &pos in pixels {
            debug_assert_eq!(self.states[pos], MaskState::Claimed);
            self.states[pos] = MaskState::Done;
        }
    }
}
