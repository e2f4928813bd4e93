//! Low-level building blocks for custom search pipelines.
//!
//! These expose the window, kernel, scheduling and gather stages on their
//! own, for callers that drive the search loop themselves. Most users
//! should prefer [`Searcher`](crate::Searcher) and
//! [`search_batched`](crate::search_batched).

pub use crate::kernel::scalar::SsdScalar;
#[cfg(feature = "simd")]
pub use crate::kernel::simd::SsdSimd;
pub use crate::kernel::{scan_volume, DistanceKernel, ScanParams, ScoreVolume};
#[cfg(feature = "rayon")]
pub use crate::kernel::rayon::scan_volume_par;
pub use crate::schedule::{Batch, MaskState, OccupancyMask, ScheduleReport};
pub use crate::search::gather::{gather_patches, PatchLayout};
pub use crate::window::{
    axis_bounds, temporal_range, track_centers, visiting_order, AxisRange, TemporalRange,
    TrackedCenter, WindowBounds,
};
