//! Flow-guided K-nearest patch search.
//!
//! [`Searcher`] answers one reference at a time; [`search_batched`] drains a
//! whole video through the batch scheduler and gathers the matched patches.

pub mod batched;
pub mod gather;
pub mod single;

pub use batched::{search_batched, BatchConfig, BatchedMatches};
pub use gather::{gather_patches, PatchLayout};
pub use single::{search_reference, Searcher};

use crate::kernel::ScanParams;
use crate::util::{PatchSearchError, PatchSearchResult};
use crate::video::flow::FlowFields;
use crate::video::{VideoShape, VideoView};

/// Search configuration.
#[derive(Clone, Copy, Debug)]
pub struct SearchConfig {
    /// Spatial patch side (`ps`).
    pub patch_size: usize,
    /// Temporal patch depth (`ps_t`).
    pub patch_frames: usize,
    /// Number of neighbours kept per reference (K).
    pub num_similar: usize,
    /// Spatial window side; anchors within `(window_size - 1) / 2` of the
    /// tracked center are scored.
    pub window_size: usize,
    /// Frames searched after the reference (`nWt_f`).
    pub frames_forward: usize,
    /// Frames searched before the reference (`nWt_b`).
    pub frames_backward: usize,
    /// First denoising step: match on channel 0 of the noisy video.
    /// Otherwise match on all channels of the basic estimate.
    pub step1: bool,
    /// Scan window rows in parallel (single search) or references in
    /// parallel (batched search). Requires the `rayon` feature.
    pub parallel: bool,
    /// Candidates handed to a subset filter before the K cut; 0 hands over
    /// every scored candidate.
    pub filter_pool: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            patch_size: 7,
            patch_frames: 2,
            num_similar: 100,
            window_size: 27,
            frames_forward: 6,
            frames_backward: 6,
            step1: true,
            parallel: false,
            filter_pool: 0,
        }
    }
}

impl SearchConfig {
    /// Rejects parameter combinations that cannot produce a search.
    pub fn validate(&self) -> PatchSearchResult<()> {
        if self.patch_size == 0 || self.patch_frames == 0 {
            return Err(PatchSearchError::InvalidConfiguration(
                "patch extent must be at least 1 along every axis",
            ));
        }
        if self.num_similar == 0 {
            return Err(PatchSearchError::InvalidConfiguration(
                "num_similar must be at least 1",
            ));
        }
        if self.window_size < self.patch_size {
            return Err(PatchSearchError::InvalidConfiguration(
                "search window is smaller than the patch",
            ));
        }
        match self.window_capacity() {
            Some(capacity) if self.num_similar <= capacity => {}
            _ => {
                return Err(PatchSearchError::InvalidConfiguration(
                    "num_similar exceeds the anchors a search window can hold",
                ));
            }
        }
        if self.filter_pool != 0 && self.filter_pool < self.num_similar {
            return Err(PatchSearchError::InvalidConfiguration(
                "filter_pool must be 0 or at least num_similar",
            ));
        }
        Ok(())
    }

    /// Most anchors one reference can score: a full window in every frame
    /// of the temporal range. `None` on overflow.
    pub fn window_capacity(&self) -> Option<usize> {
        let frames = self
            .frames_forward
            .checked_add(self.frames_backward)?
            .checked_add(1)?;
        self.window_size
            .checked_mul(self.window_size)?
            .checked_mul(frames)
    }

    /// Kernel parameters for a video of `shape`.
    pub fn scan_params(&self, shape: VideoShape) -> ScanParams {
        ScanParams {
            patch_size: self.patch_size,
            patch_frames: self.patch_frames,
            channels: if self.step1 { 1 } else { shape.channels() },
        }
    }
}

/// Videos and flows taking part in a search.
///
/// `noisy` is always present. The basic estimate is required when
/// `step1` is off. The oracle (clean video) is optional: its patches are
/// gathered for evaluation, and with `search_clean` it replaces the matched
/// video.
#[derive(Copy, Clone)]
pub struct SearchInputs<'a> {
    pub noisy: VideoView<'a>,
    pub basic: Option<VideoView<'a>>,
    pub oracle: Option<VideoView<'a>>,
    pub flows: Option<FlowFields<'a>>,
    pub search_clean: bool,
}

impl<'a> SearchInputs<'a> {
    pub fn new(noisy: VideoView<'a>) -> Self {
        Self {
            noisy,
            basic: None,
            oracle: None,
            flows: None,
            search_clean: false,
        }
    }

    pub fn with_basic(mut self, basic: VideoView<'a>) -> Self {
        self.basic = Some(basic);
        self
    }

    pub fn with_oracle(mut self, oracle: VideoView<'a>) -> Self {
        self.oracle = Some(oracle);
        self
    }

    pub fn with_flows(mut self, flows: FlowFields<'a>) -> Self {
        self.flows = Some(flows);
        self
    }

    /// Matches on the oracle instead of the noisy/basic video.
    pub fn searching_clean(mut self, search_clean: bool) -> Self {
        self.search_clean = search_clean;
        self
    }

    pub fn shape(&self) -> VideoShape {
        self.noisy.shape()
    }

    /// Checks that every provided video and flow agrees with `noisy`.
    pub fn validate(&self, step1: bool) -> PatchSearchResult<()> {
        let shape = self.shape();
        match self.basic {
            Some(basic) if basic.shape() != shape => {
                return Err(PatchSearchError::InvalidConfiguration(
                    "basic estimate shape differs from the noisy video",
                ));
            }
            None if !step1 => {
                return Err(PatchSearchError::InvalidConfiguration(
                    "second step search requires a basic estimate",
                ));
            }
            _ => {}
        }
        match self.oracle {
            Some(oracle) if oracle.shape() != shape => {
                return Err(PatchSearchError::InvalidConfiguration(
                    "oracle shape differs from the noisy video",
                ));
            }
            None if self.search_clean => {
                return Err(PatchSearchError::InvalidConfiguration(
                    "search_clean requires an oracle video",
                ));
            }
            _ => {}
        }
        if let Some(flows) = &self.flows {
            flows.validate(shape)?;
        }
        Ok(())
    }

    /// Video the distances are computed on.
    pub fn search_video(&self, step1: bool) -> PatchSearchResult<VideoView<'a>> {
        if self.search_clean {
            return self.oracle.ok_or(PatchSearchError::InvalidConfiguration(
                "search_clean requires an oracle video",
            ));
        }
        if step1 {
            return Ok(self.noisy);
        }
        self.basic.ok_or(PatchSearchError::InvalidConfiguration(
            "second step search requires a basic estimate",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::{SearchConfig, SearchInputs};
    use crate::video::{OwnedVideo, VideoShape};
    use crate::PatchSearchError;

    #[test]
    fn default_config_is_valid() {
        assert!(SearchConfig::default().validate().is_ok());
    }

    #[test]
    fn window_smaller_than_patch_is_rejected() {
        let cfg = SearchConfig {
            patch_size: 5,
            window_size: 3,
            ..SearchConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(PatchSearchError::InvalidConfiguration(_))
        ));
    }

    #[test]
    fn oversized_k_is_rejected() {
        let cfg = SearchConfig {
            window_size: 5,
            frames_forward: 1,
            frames_backward: 1,
            patch_size: 3,
            num_similar: 75,
            ..SearchConfig::default()
        };
        assert_eq!(cfg.window_capacity(), Some(75));
        assert!(cfg.validate().is_ok());
        let too_many = SearchConfig {
            num_similar: 76,
            ..cfg
        };
        assert!(matches!(
            too_many.validate(),
            Err(PatchSearchError::InvalidConfiguration(_))
        ));
        let absurd = SearchConfig {
            num_similar: usize::MAX,
            frames_forward: usize::MAX,
            ..cfg
        };
        assert_eq!(absurd.window_capacity(), None);
        assert!(absurd.validate().is_err());
    }

    #[test]
    fn step1_matches_luma_only() {
        let shape = VideoShape::new(4, 3, 16, 16).unwrap();
        let cfg = SearchConfig::default();
        assert_eq!(cfg.scan_params(shape).channels, 1);
        let step2 = SearchConfig {
            step1: false,
            ..cfg
        };
        assert_eq!(step2.scan_params(shape).channels, 3);
    }

    #[test]
    fn second_step_needs_basic_estimate() {
        let shape = VideoShape::new(2, 1, 8, 8).unwrap();
        let noisy = OwnedVideo::from_fn(shape, |_, _, _, _| 0.0);
        let basic = OwnedVideo::from_fn(shape, |_, _, _, _| 1.0);
        let inputs = SearchInputs::new(noisy.view());
        assert!(inputs.validate(true).is_ok());
        assert!(inputs.validate(false).is_err());

        let inputs = inputs.with_basic(basic.view());
        assert!(inputs.validate(false).is_ok());
        assert_eq!(inputs.search_video(false).unwrap().get(0, 0, 0, 0), Some(1.0));
        assert_eq!(inputs.search_video(true).unwrap().get(0, 0, 0, 0), Some(0.0));
    }

    #[test]
    fn oracle_shape_must_match() {
        let noisy = OwnedVideo::from_fn(VideoShape::new(2, 1, 8, 8).unwrap(), |_, _, _, _| 0.0);
        let clean = OwnedVideo::from_fn(VideoShape::new(2, 1, 8, 9).unwrap(), |_, _, _, _| 0.0);
        let inputs = SearchInputs::new(noisy.view()).with_oracle(clean.view());
        assert!(inputs.validate(true).is_err());
        assert!(SearchInputs::new(noisy.view())
            .searching_clean(true)
            .search_video(true)
            .is_err());
    }
}
