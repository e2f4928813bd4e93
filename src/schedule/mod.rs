//! Batched, multi-lane scheduling over an occupancy mask.
//!
//! The host loop is strictly sequential: it claims a batch of pixels, hands
//! a frozen copy to the next lane in round-robin order, and marks the batch
//! done. Lanes run concurrently on scoped threads and never see the mask.
//! A lane holds at most one batch; before it is reused the scheduler joins
//! its previous batch, and after the last batch every lane is joined.

mod mask;

pub use mask::{MaskState, OccupancyMask, SelectionPolicy};

use crate::trace::{trace_debug, trace_event, trace_span};
use crate::util::math::div_up;
use crate::util::{PatchSearchError, PatchSearchResult};
use mask::Selector;
use std::sync::Arc;
use std::thread::ScopedJoinHandle;

/// One dispatched batch.
#[derive(Clone, Debug)]
pub struct Batch {
    /// Dispatch order, starting at 0.
    pub id: usize,
    /// Lane the batch runs on.
    pub lane: usize,
    /// Mask positions of the batch (ascending, disjoint from other batches).
    pub pixels: Arc<[usize]>,
}

/// Outputs of a full scheduling run, in dispatch order.
#[derive(Debug)]
pub struct ScheduleReport<R> {
    pub outputs: Vec<R>,
    pub batch_sizes: Vec<usize>,
}

impl<R> ScheduleReport<R> {
    /// Total number of pixels dispatched.
    pub fn dispatched(&self) -> usize {
        self.batch_sizes.iter().sum()
    }
}

/// Round-robin scheduler over a fixed pool of execution lanes.
#[derive(Clone, Copy, Debug)]
pub struct BatchScheduler {
    batch_size: usize,
    lanes: usize,
    policy: SelectionPolicy,
}

impl BatchScheduler {
    pub fn new(
        batch_size: usize,
        lanes: usize,
        policy: SelectionPolicy,
    ) -> PatchSearchResult<Self> {
        if batch_size == 0 {
            return Err(PatchSearchError::InvalidConfiguration(
                "batch size must be at least 1",
            ));
        }
        if lanes == 0 {
            return Err(PatchSearchError::InvalidConfiguration(
                "at least one execution lane is required",
            ));
        }
        Ok(Self {
            batch_size,
            lanes,
            policy,
        })
    }

    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub fn lanes(&self) -> usize {
        self.lanes
    }

    /// Drains `mask`, running `dispatch` once per batch.
    ///
    /// Returns when no unclaimed pixel remains and every lane has finished.
    /// The first failing batch stops further dispatch; in-flight lanes are
    /// still joined and the error is returned without partial outputs.
    pub fn run<R, F>(
        &self,
        mask: &mut OccupancyMask,
        dispatch: F,
    ) -> PatchSearchResult<ScheduleReport<R>>
    where
        F: Fn(&Batch) -> PatchSearchResult<R> + Sync,
        R: Send,
    {
        let _span = trace_span!(
            "schedule",
            pending = mask.unclaimed(),
            batch_size = self.batch_size,
            lanes = self.lanes
        )
        .entered();

        let dispatch = &dispatch;
        let mut selector = Selector::from_policy(self.policy);
        let expected_batches = div_up(mask.unclaimed(), self.batch_size);
        let mut batch_sizes = Vec::with_capacity(expected_batches);
        let mut finished: Vec<(usize, R)> = Vec::with_capacity(expected_batches);

        let outcome = std::thread::scope(|scope| -> PatchSearchResult<()> {
            let mut lanes: Vec<Option<ScopedJoinHandle<'_, PatchSearchResult<(usize, R)>>>> =
                (0..self.lanes).map(|_| None).collect();
            let mut failure = None;
            let mut id = 0usize;

            loop {
                let lane = id % self.lanes;
                if let Some(handle) = lanes[lane].take() {
                    match join_lane(handle, lane) {
                        Ok(done) => finished.push(done),
                        Err(err) => {
                            failure = Some(err);
                            break;
                        }
                    }
                }

                let pixels = mask.claim(self.batch_size, &mut selector);
                if pixels.is_empty() {
                    break;
                }
                let batch = Batch {
                    id,
                    lane,
                    pixels: Arc::from(pixels),
                };
                let snapshot = Arc::clone(&batch.pixels);
                batch_sizes.push(snapshot.len());
                trace_debug!("batch_dispatched", batch = id, lane = lane, size = snapshot.len());

                lanes[lane] =
                    Some(scope.spawn(move || dispatch(&batch).map(|out| (batch.id, out))));
                mask.complete(&snapshot);
                id += 1;
            }

            // global barrier
            for (lane, slot) in lanes.iter_mut().enumerate() {
                if let Some(handle) = slot.take() {
                    match join_lane(handle, lane) {
                        Ok(done) => finished.push(done),
                        Err(err) => {
                            failure.get_or_insert(err);
                        }
                    }
                }
            }
            failure.map_or(Ok(()), Err)
        });
        outcome?;

        finished.sort_by_key(|(id, _)| *id);
        let outputs: Vec<R> = finished.into_iter().map(|(_, out)| out).collect();
        trace_event!("schedule_done", batches = outputs.len());
        Ok(ScheduleReport {
            outputs,
            batch_sizes,
        })
    }
}

fn join_lane<T>(
    handle: ScopedJoinHandle<'_, PatchSearchResult<T>>,
    lane: usize,
) -> PatchSearchResult<T> {
    let result = handle
        .join()
        .map_err(|_| PatchSearchError::LaneFailure { lane })?;
    trace_debug!("lane_joined", lane = lane, ok = result.is_ok());
    result
}

#[cfg(test)]
mod tests {
    use super::{BatchScheduler, MaskState, OccupancyMask, SelectionPolicy};
    use crate::PatchSearchError;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn scan_run_covers_mask_exactly_once() {
        let mut mask = OccupancyMask::new(3, 5, 7).unwrap();
        let scheduler = BatchScheduler::new(16, 3, SelectionPolicy::Scan).unwrap();
        let report = scheduler
            .run(&mut mask, |batch| Ok(batch.pixels.to_vec()))
            .unwrap();
        assert_eq!(report.dispatched(), 105);
        assert_eq!(report.batch_sizes.len(), 7);
        assert_eq!(*report.batch_sizes.last().unwrap(), 105 - 6 * 16);
        let mut seen: Vec<usize> = report.outputs.concat();
        seen.sort_unstable();
        assert_eq!(seen, (0..105).collect::<Vec<_>>());
        assert_eq!(mask.count(MaskState::Done), 105);
    }

    #[test]
    fn lanes_rotate_round_robin() {
        let mut mask = OccupancyMask::new(1, 4, 4).unwrap();
        let scheduler = BatchScheduler::new(3, 2, SelectionPolicy::Scan).unwrap();
        let report = scheduler
            .run(&mut mask, |batch| Ok((batch.id, batch.lane)))
            .unwrap();
        for (id, lane) in report.outputs {
            assert_eq!(lane, id % 2);
        }
    }

    #[test]
    fn lane_holds_one_batch_at_a_time() {
        let lanes = 3;
        let mut mask = OccupancyMask::new(2, 6, 6).unwrap();
        let scheduler = BatchScheduler::new(5, lanes, SelectionPolicy::Scan).unwrap();
        let busy: Vec<AtomicBool> = (0..lanes).map(|_| AtomicBool::new(false)).collect();
        let in_flight = AtomicUsize::new(0);
        let peak = AtomicUsize::new(0);
        let report = scheduler
            .run(&mut mask, |batch| {
                let overlapped = busy[batch.lane].swap(true, Ordering::SeqCst);
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                thread::sleep(Duration::from_millis(5));
                in_flight.fetch_sub(1, Ordering::SeqCst);
                busy[batch.lane].store(false, Ordering::SeqCst);
                Ok(overlapped)
            })
            .unwrap();
        assert_eq!(report.outputs.len(), 15);
        assert!(report.outputs.iter().all(|&overlapped| !overlapped));
        assert!(peak.load(Ordering::SeqCst) <= lanes);
        assert_eq!(mask.count(MaskState::Done), mask.len());
    }

    #[test]
    fn failing_batch_aborts_the_run() {
        let mut mask = OccupancyMask::new(1, 8, 8).unwrap();
        let scheduler = BatchScheduler::new(4, 2, SelectionPolicy::Scan).unwrap();
        let calls = AtomicUsize::new(0);
        let err = scheduler
            .run(&mut mask, |batch| {
                calls.fetch_add(1, Ordering::SeqCst);
                if batch.id == 1 {
                    Err(PatchSearchError::InvalidConfiguration("boom"))
                } else {
                    Ok(())
                }
            })
            .err();
        assert_eq!(err, Some(PatchSearchError::InvalidConfiguration("boom")));
        // batch 1 fails on lane 1, detected before lane 1 is reused
        assert!(calls.load(Ordering::SeqCst) < 16);
    }

    #[test]
    fn panicking_lane_is_reported() {
        let mut mask = OccupancyMask::new(1, 2, 2).unwrap();
        let scheduler = BatchScheduler::new(2, 1, SelectionPolicy::Scan).unwrap();
        let err = scheduler
            .run(&mut mask, |batch| -> Result<(), PatchSearchError> {
                if batch.id == 0 {
                    panic!("lane crashed");
                }
                Ok(())
            })
            .err();
        assert_eq!(err, Some(PatchSearchError::LaneFailure { lane: 0 }));
    }

    #[test]
    fn zero_sized_configuration_is_rejected() {
        assert!(BatchScheduler::new(0, 1, SelectionPolicy::Scan).is_err());
        assert!(BatchScheduler::new(4, 0, SelectionPolicy::Scan).is_err());
    }
}
