//! Search-window construction.
//!
//! `bounds` clamps windows to the volume; `track` chains flow displacements
//! to place one window center per searched frame.

pub mod bounds;
pub mod track;

pub use bounds::{axis_bounds, temporal_range, AxisRange, TemporalRange, WindowBounds};
pub use track::{track_centers, visiting_order, TrackedCenter};
