//! patchsearch finds, for every reference patch of a video, the K most
//! similar patches inside flow-guided spatiotemporal windows.
//!
//! It is the similarity-search stage of video non-local Bayes denoising:
//! windows are chained along optical flow from the reference frame, patches
//! are compared with a normalized squared difference, and the K nearest
//! anchors are returned per reference. [`Searcher`] handles one reference at
//! a time; [`search_batched`] drains a whole video through a multi-lane
//! batch scheduler and gathers the matched patches.
//!
//! Features: `rayon` (parallel window scans and per-batch references),
//! `simd` (8-wide distance kernel), `tracing` (spans and events).

mod candidate;
pub mod kernel;
pub mod lowlevel;
pub mod schedule;
pub mod search;
mod trace;
pub mod util;
pub mod video;
pub mod window;

pub use candidate::filter::SubsetFilter;
pub use candidate::topk::{select_topk, Candidate, CandidateSet, TopK};
pub use schedule::{BatchScheduler, SelectionPolicy};
pub use search::{
    search_batched, search_reference, BatchConfig, BatchedMatches, SearchConfig, SearchInputs,
    Searcher,
};
pub use util::{PatchSearchError, PatchSearchResult};
pub use video::flow::{FlowFields, FlowView, OwnedFlow};
pub use video::{OwnedVideo, PixelCoord, VideoShape, VideoView};
