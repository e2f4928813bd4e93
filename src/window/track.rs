//! Flow-guided window tracking across the temporal search range.
//!
//! Centers are chained frame to frame: each frame starts from the center of
//! its neighbour toward the reference and follows the flow stored there, so
//! a patch moving along a curved trajectory stays inside the windows.

use crate::util::math::round_clamp;
use crate::util::{PatchSearchError, PatchSearchResult};
use crate::video::flow::{FlowFields, FlowView};
use crate::window::bounds::TemporalRange;

/// Tracked window center for one visited frame.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TrackedCenter {
    pub frame: usize,
    pub row: usize,
    pub col: usize,
}

/// Frames in visiting order: the reference, then later frames ascending,
/// then earlier frames descending.
pub fn visiting_order(range: &TemporalRange) -> Vec<usize> {
    let mut order = Vec::with_capacity(range.len());
    order.push(range.reference);
    order.extend(range.reference + 1..=range.end);
    order.extend((range.start..range.reference).rev());
    order
}

/// Computes one tracked center per visited frame, in visiting order.
///
/// `reference` is the `(row, col)` of the reference patch in
/// `range.reference`. Moving to a later frame applies the forward flow of
/// the previous frame, moving to an earlier one the backward flow. Without
/// flows every center stays at the reference position.
///
/// Fails when the reference lies outside the `height x width` frame, or
/// when a flow field does not cover every frame of `range` at that size.
pub fn track_centers(
    reference: (usize, usize),
    range: &TemporalRange,
    flows: Option<&FlowFields<'_>>,
    height: usize,
    width: usize,
) -> PatchSearchResult<Vec<TrackedCenter>> {
    if reference.0 >= height || reference.1 >= width {
        return Err(PatchSearchError::InvalidConfiguration(
            "reference center lies outside the frame",
        ));
    }
    if let Some(fields) = flows {
        for field in [&fields.forward, &fields.backward] {
            check_coverage(field, range, height, width)?;
        }
    }
    let order = visiting_order(range);
    // per-slot state indexed by position in the temporal range
    let mut state: Vec<Option<(usize, usize)>> = vec![None; range.len()];
    let mut out = Vec::with_capacity(order.len());

    for frame in order {
        let slot = range.slot(frame);
        let (row, col) = if frame == range.reference {
            reference
        } else {
            let forward = frame > range.reference;
            let prev_slot = if forward { slot - 1 } else { slot + 1 };
            let prev_frame = if forward { frame - 1 } else { frame + 1 };
            let (row0, col0) = state[prev_slot].unwrap_or(reference);
            match flows {
                Some(fields) => {
                    let field = if forward {
                        &fields.forward
                    } else {
                        &fields.backward
                    };
                    let (dx, dy) = field.displacement(prev_frame, row0, col0);
                    (
                        round_clamp(row0 as f32 + dy, height - 1),
                        round_clamp(col0 as f32 + dx, width - 1),
                    )
                }
                None => (row0, col0),
            }
        };
        state[slot] = Some((row, col));
        out.push(TrackedCenter { frame, row, col });
    }
    Ok(out)
}

fn check_coverage(
    field: &FlowView<'_>,
    range: &TemporalRange,
    height: usize,
    width: usize,
) -> PatchSearchResult<()> {
    if field.height() != height || field.width() != width {
        return Err(PatchSearchError::InvalidConfiguration(
            "flow spatial size differs from video",
        ));
    }
    if field.frames() <= range.end {
        return Err(PatchSearchError::InvalidConfiguration(
            "flow does not cover the temporal search range",
        ));
    }
    Ok(())
}
