//! Sequential search for one reference patch.

use crate::candidate::filter::SubsetFilter;
use crate::candidate::topk::{select_topk, Candidate, CandidateSet};
use crate::kernel::{scan_volume, ScanParams, ScoreVolume};
use crate::search::{SearchConfig, SearchInputs};
use crate::trace::{trace_event, trace_span};
use crate::util::{PatchSearchError, PatchSearchResult};
use crate::video::flow::FlowFields;
use crate::video::{PixelCoord, VideoShape, VideoView};
use crate::window::{temporal_range, track_centers, WindowBounds};

#[cfg(feature = "rayon")]
use crate::kernel::rayon::scan_volume_par;

#[cfg(not(feature = "simd"))]
use crate::kernel::scalar::SsdScalar as Ssd;
#[cfg(feature = "simd")]
use crate::kernel::simd::SsdSimd as Ssd;

/// Searches the K nearest patches of reference patches in one video.
///
/// Construction validates the configuration, the video dimensions and the
/// flows once; every [`Searcher::search`] call after that only checks the
/// reference index.
pub struct Searcher<'a> {
    video: VideoView<'a>,
    flows: Option<FlowFields<'a>>,
    cfg: SearchConfig,
    params: ScanParams,
    filter: Option<&'a dyn SubsetFilter>,
}

impl<'a> Searcher<'a> {
    pub fn new(
        video: VideoView<'a>,
        flows: Option<FlowFields<'a>>,
        cfg: SearchConfig,
    ) -> PatchSearchResult<Self> {
        cfg.validate()?;
        let shape = video.shape();
        let spatial = shape.height().min(shape.width());
        if spatial < cfg.patch_size {
            return Err(PatchSearchError::DegenerateWindow {
                dim: spatial,
                patch: cfg.patch_size,
            });
        }
        if shape.frames() < cfg.patch_frames {
            return Err(PatchSearchError::DegenerateWindow {
                dim: shape.frames(),
                patch: cfg.patch_frames,
            });
        }
        if let Some(flows) = &flows {
            flows.validate(shape)?;
        }
        Ok(Self {
            video,
            flows,
            params: cfg.scan_params(shape),
            cfg,
            filter: None,
        })
    }

    /// Searcher over the video `inputs` select for this configuration.
    pub fn from_inputs(inputs: &SearchInputs<'a>, cfg: SearchConfig) -> PatchSearchResult<Self> {
        inputs.validate(cfg.step1)?;
        Self::new(inputs.search_video(cfg.step1)?, inputs.flows, cfg)
    }

    /// Routes the best `filter_pool` candidates through `filter` before the K cut.
    pub fn with_filter(mut self, filter: &'a dyn SubsetFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn config(&self) -> &SearchConfig {
        &self.cfg
    }

    pub fn shape(&self) -> VideoShape {
        self.video.shape()
    }

    /// Decodes a reference index, rejecting patches that leave the volume.
    pub fn reference_coord(&self, index: usize) -> PatchSearchResult<PixelCoord> {
        let shape = self.shape();
        if index >= shape.num_samples() {
            return Err(PatchSearchError::PatchOutOfBounds { index });
        }
        let coord = PixelCoord {
            c: 0,
            ..shape.from_linear(index)
        };
        if !shape.patch_fits(coord, self.cfg.patch_size, self.cfg.patch_frames) {
            return Err(PatchSearchError::PatchOutOfBounds { index });
        }
        Ok(coord)
    }

    /// Search windows of `index`, one per visited frame in visiting order.
    pub fn windows(&self, index: usize) -> PatchSearchResult<Vec<WindowBounds>> {
        let coord = self.reference_coord(index)?;
        self.windows_at(coord)
    }

    /// Dense scores of every window anchor around `index`.
    pub fn score_volume(&self, index: usize) -> PatchSearchResult<ScoreVolume> {
        let coord = self.reference_coord(index)?;
        self.volume_at(coord, self.cfg.parallel)
    }

    /// The K nearest patches of the reference patch anchored at `index`.
    ///
    /// The reference itself is among the candidates (at distance 0). Fewer
    /// than K results come back when the windows hold fewer anchors.
    pub fn search(&self, index: usize) -> PatchSearchResult<CandidateSet> {
        let coord = self.reference_coord(index)?;
        let _span = trace_span!(
            "search_reference",
            t = coord.t,
            row = coord.row,
            col = coord.col
        )
        .entered();
        self.search_at(coord, self.cfg.parallel)
    }

    pub(crate) fn search_at(
        &self,
        coord: PixelCoord,
        parallel_scan: bool,
    ) -> PatchSearchResult<CandidateSet> {
        let volume = self.volume_at(coord, parallel_scan)?;
        let set = self.select(volume.candidates());
        trace_event!("topk", selected = set.len(), requested = set.requested());
        Ok(set)
    }

    fn windows_at(&self, coord: PixelCoord) -> PatchSearchResult<Vec<WindowBounds>> {
        let shape = self.shape();
        let range = temporal_range(
            coord.t,
            shape.frames(),
            self.cfg.frames_forward,
            self.cfg.frames_backward,
            self.cfg.patch_frames,
        )?;
        track_centers(
            (coord.row, coord.col),
            &range,
            self.flows.as_ref(),
            shape.height(),
            shape.width(),
        )?
        .into_iter()
        .map(|center| {
            WindowBounds::build(
                center.frame,
                (center.row, center.col),
                shape.height(),
                shape.width(),
                self.cfg.window_size,
                self.cfg.patch_size,
            )
        })
        .collect()
    }

    fn volume_at(&self, coord: PixelCoord, parallel_scan: bool) -> PatchSearchResult<ScoreVolume> {
        let windows = self.windows_at(coord)?;
        let mut volume = ScoreVolume::new(self.shape(), windows, self.cfg.window_size);
        fill_volume(self.video, &self.params, coord, &mut volume, parallel_scan);
        trace_event!(
            "window_scan",
            frames = volume.windows().len(),
            scored = volume.scored_positions()
        );
        Ok(volume)
    }

    fn select<I>(&self, pairs: I) -> CandidateSet
    where
        I: IntoIterator<Item = Candidate>,
    {
        let k = self.cfg.num_similar;
        match self.filter {
            Some(filter) => {
                let pool = match self.cfg.filter_pool {
                    0 => usize::MAX,
                    n => n,
                };
                let kept = filter.filter(select_topk(pairs, pool).into_vec());
                select_topk(kept, k)
            }
            None => select_topk(pairs, k),
        }
    }
}

#[cfg(feature = "rayon")]
fn fill_volume(
    video: VideoView<'_>,
    params: &ScanParams,
    reference: PixelCoord,
    volume: &mut ScoreVolume,
    parallel: bool,
) {
    if parallel {
        scan_volume_par::<Ssd>(video, params, reference, volume);
    } else {
        scan_volume::<Ssd>(video, params, reference, volume);
    }
}

#[cfg(not(feature = "rayon"))]
fn fill_volume(
    video: VideoView<'_>,
    params: &ScanParams,
    reference: PixelCoord,
    volume: &mut ScoreVolume,
    _parallel: bool,
) {
    scan_volume::<Ssd>(video, params, reference, volume);
}

/// One-shot search of the reference patch anchored at `reference`.
///
/// Builds a [`Searcher`] for this call only; reuse a `Searcher` when
/// querying many references of the same video.
pub fn search_reference(
    video: VideoView<'_>,
    flows: Option<&FlowFields<'_>>,
    reference: usize,
    cfg: &SearchConfig,
) -> PatchSearchResult<CandidateSet> {
    Searcher::new(video, flows.copied(), *cfg)?.search(reference)
}
