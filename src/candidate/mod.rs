//! Candidate selection.
//!
//! Includes K-smallest selection over scored positions and the hook for an
//! external subset filter applied before the final cut.

pub(crate) mod filter;
pub(crate) mod topk;
