//! Batched search over every reference pixel of a video.
//!
//! References are claimed from an [`OccupancyMask`] in batches and run on
//! the [`BatchScheduler`] lanes. Each batch searches its references against
//! the selected video, then gathers the noisy patches of the winners (plus
//! basic and oracle patches when present).

use crate::candidate::filter::SubsetFilter;
use crate::candidate::topk::{Candidate, CandidateSet};
use crate::schedule::{Batch, BatchScheduler, OccupancyMask, SelectionPolicy};
use crate::search::gather::{gather_patches, PatchLayout};
use crate::search::single::Searcher;
use crate::search::{SearchConfig, SearchInputs};
use crate::trace::{trace_event, trace_span};
use crate::util::{PatchSearchError, PatchSearchResult};
use crate::video::{PixelCoord, VideoView};

#[cfg(feature = "rayon")]
use rayon::prelude::*;

/// Scheduling parameters of a batched search.
#[derive(Clone, Copy, Debug)]
pub struct BatchConfig {
    /// Maximum references per batch.
    pub batch_size: usize,
    /// Concurrent execution lanes.
    pub lanes: usize,
    /// How each batch picks its references.
    pub policy: SelectionPolicy,
    /// Reference stride along rows and columns.
    pub proc_step: usize,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            batch_size: 4096,
            lanes: 1,
            policy: SelectionPolicy::Random { seed: 0 },
            proc_step: 1,
        }
    }
}

/// Results of a batched search, one record per processed reference.
///
/// Records are ordered by batch, and by ascending linear position inside a
/// batch. Every record owns `num_similar` match slots; slots past a short
/// candidate set hold `+inf`, no index and zero-filled patches.
#[derive(Clone, Debug, Default)]
pub struct BatchedMatches {
    num_similar: usize,
    patch_len: usize,
    references: Vec<usize>,
    distances: Vec<f32>,
    indices: Vec<Option<usize>>,
    noisy: Vec<f32>,
    basic: Option<Vec<f32>>,
    oracle: Option<Vec<f32>>,
    batch_sizes: Vec<usize>,
}

impl BatchedMatches {
    /// Number of processed references.
    pub fn len(&self) -> usize {
        self.references.len()
    }

    pub fn is_empty(&self) -> bool {
        self.references.is_empty()
    }

    pub fn num_similar(&self) -> usize {
        self.num_similar
    }

    /// Samples per gathered patch.
    pub fn patch_len(&self) -> usize {
        self.patch_len
    }

    /// Channel-0 anchor index of every processed reference.
    pub fn references(&self) -> &[usize] {
        &self.references
    }

    /// References per dispatched batch, in dispatch order.
    pub fn batch_sizes(&self) -> &[usize] {
        &self.batch_sizes
    }

    /// Match distances of record `i`, padded to `num_similar`.
    pub fn distances(&self, i: usize) -> &[f32] {
        &self.distances[i * self.num_similar..(i + 1) * self.num_similar]
    }

    /// Match indices of record `i`, padded to `num_similar`.
    pub fn indices(&self, i: usize) -> &[Option<usize>] {
        &self.indices[i * self.num_similar..(i + 1) * self.num_similar]
    }

    /// Valid matches of record `i`, ascending by distance.
    pub fn matches(&self, i: usize) -> impl Iterator<Item = Candidate> + '_ {
        self.distances(i)
            .iter()
            .zip(self.indices(i))
            .filter_map(|(&distance, index)| index.map(|index| Candidate { distance, index }))
    }

    fn patch_block<'s>(&self, buf: &'s [f32], i: usize) -> &'s [f32] {
        let block = self.num_similar * self.patch_len;
        &buf[i * block..(i + 1) * block]
    }

    /// Noisy patches of record `i`, `num_similar * patch_len` samples.
    pub fn noisy_patches(&self, i: usize) -> &[f32] {
        self.patch_block(&self.noisy, i)
    }

    /// Basic-estimate patches of record `i` (second step only).
    pub fn basic_patches(&self, i: usize) -> Option<&[f32]> {
        self.basic.as_deref().map(|buf| self.patch_block(buf, i))
    }

    /// Oracle patches of record `i`, when an oracle video was given.
    pub fn oracle_patches(&self, i: usize) -> Option<&[f32]> {
        self.oracle.as_deref().map(|buf| self.patch_block(buf, i))
    }

    fn append(&mut self, part: BatchOutput) {
        self.references.extend(part.references);
        self.distances.extend(part.distances);
        self.indices.extend(part.indices);
        self.noisy.extend(part.noisy);
        if let (Some(dst), Some(src)) = (self.basic.as_mut(), part.basic) {
            dst.extend(src);
        }
        if let (Some(dst), Some(src)) = (self.oracle.as_mut(), part.oracle) {
            dst.extend(src);
        }
    }
}

struct BatchOutput {
    references: Vec<usize>,
    distances: Vec<f32>,
    indices: Vec<Option<usize>>,
    noisy: Vec<f32>,
    basic: Option<Vec<f32>>,
    oracle: Option<Vec<f32>>,
}

/// Per-batch state shared by every lane.
struct BatchJob<'s, 'a> {
    searcher: &'s Searcher<'a>,
    noisy: VideoView<'a>,
    basic: Option<VideoView<'a>>,
    oracle: Option<VideoView<'a>>,
    layout: PatchLayout,
    parallel: bool,
}

impl BatchJob<'_, '_> {
    fn run(&self, batch: &Batch) -> PatchSearchResult<BatchOutput> {
        let _span = trace_span!(
            "schedule_batch",
            batch = batch.id,
            lane = batch.lane,
            size = batch.pixels.len()
        )
        .entered();

        let sets = self.search_all(&batch.pixels)?;
        let k = self.searcher.config().num_similar;
        let shape = self.searcher.shape();
        let slots = sets
            .len()
            .checked_mul(k)
            .ok_or(PatchSearchError::InvalidConfiguration(
                "batch output size overflows",
            ))?;
        let mut references = Vec::with_capacity(sets.len());
        let mut distances = Vec::with_capacity(slots);
        let mut indices = Vec::with_capacity(slots);
        for (&pos, set) in batch.pixels.iter().zip(&sets) {
            let coord = self.pixel_coord(pos);
            references.push(shape.anchor_index(coord.row, coord.col, coord.t));
            for slot in 0..k {
                match set.as_slice().get(slot) {
                    Some(c) => {
                        distances.push(c.distance);
                        indices.push(Some(c.index));
                    }
                    None => {
                        distances.push(f32::INFINITY);
                        indices.push(None);
                    }
                }
            }
        }

        let noisy = self.gather(self.noisy, &indices)?;
        let basic = self
            .basic
            .map(|video| self.gather(video, &indices))
            .transpose()?;
        let oracle = self
            .oracle
            .map(|video| self.gather(video, &indices))
            .transpose()?;
        Ok(BatchOutput {
            references,
            distances,
            indices,
            noisy,
            basic,
            oracle,
        })
    }

    // mask positions index (t, row, col) without the channel axis
    fn pixel_coord(&self, pos: usize) -> PixelCoord {
        let shape = self.searcher.shape();
        let plane = shape.plane_len();
        PixelCoord {
            t: pos / plane,
            c: 0,
            row: (pos % plane) / shape.width(),
            col: pos % shape.width(),
        }
    }

    fn search_one(&self, pos: usize) -> PatchSearchResult<CandidateSet> {
        self.searcher.search_at(self.pixel_coord(pos), false)
    }

    #[cfg(feature = "rayon")]
    fn search_all(&self, pixels: &[usize]) -> PatchSearchResult<Vec<CandidateSet>> {
        if self.parallel {
            pixels.par_iter().map(|&pos| self.search_one(pos)).collect()
        } else {
            pixels.iter().map(|&pos| self.search_one(pos)).collect()
        }
    }

    #[cfg(not(feature = "rayon"))]
    fn search_all(&self, pixels: &[usize]) -> PatchSearchResult<Vec<CandidateSet>> {
        let _ = self.parallel;
        pixels.iter().map(|&pos| self.search_one(pos)).collect()
    }

    fn gather(
        &self,
        video: VideoView<'_>,
        indices: &[Option<usize>],
    ) -> PatchSearchResult<Vec<f32>> {
        let mut out = vec![0.0; indices.len() * self.layout.patch_len()];
        gather_patches(video, indices, self.layout, &mut out)?;
        Ok(out)
    }
}

/// Searches every eligible reference of `inputs.noisy`.
///
/// Eligible references are the anchors whose patch fits the volume, thinned
/// by `batch.proc_step`. The call fails before any search work on invalid
/// configuration, and fails as a whole if any batch fails.
pub fn search_batched(
    inputs: &SearchInputs<'_>,
    cfg: &SearchConfig,
    batch: &BatchConfig,
    filter: Option<&dyn SubsetFilter>,
) -> PatchSearchResult<BatchedMatches> {
    if cfg.patch_frames != 2 {
        return Err(PatchSearchError::InvalidConfiguration(
            "batched search requires patch_frames == 2",
        ));
    }
    let mut searcher = Searcher::from_inputs(inputs, *cfg)?;
    if let Some(filter) = filter {
        searcher = searcher.with_filter(filter);
    }
    let scheduler = BatchScheduler::new(batch.batch_size, batch.lanes, batch.policy)?;
    let shape = inputs.shape();
    let mut mask = OccupancyMask::for_anchors(
        shape.frames(),
        shape.height(),
        shape.width(),
        cfg.patch_size,
        cfg.patch_frames,
        batch.proc_step,
    )?;

    let _span = trace_span!(
        "search_batched",
        references = mask.unclaimed(),
        batch_size = batch.batch_size,
        lanes = batch.lanes
    )
    .entered();

    let layout = PatchLayout::for_video(shape, cfg.patch_size, cfg.patch_frames);
    let job = BatchJob {
        searcher: &searcher,
        noisy: inputs.noisy,
        basic: if cfg.step1 { None } else { inputs.basic },
        oracle: inputs.oracle,
        layout,
        parallel: cfg.parallel,
    };
    let report = scheduler.run(&mut mask, |b| job.run(b))?;

    let mut matches = BatchedMatches {
        num_similar: cfg.num_similar,
        patch_len: layout.patch_len(),
        basic: job.basic.map(|_| Vec::new()),
        oracle: job.oracle.map(|_| Vec::new()),
        batch_sizes: report.batch_sizes,
        ..BatchedMatches::default()
    };
    for part in report.outputs {
        matches.append(part);
    }
    trace_event!("search_batched_done", references = matches.len());
    Ok(matches)
}
