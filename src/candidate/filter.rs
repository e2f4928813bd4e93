//! Hook for an external patch-subset filter.

use crate::candidate::topk::Candidate;

/// Reduces a candidate pool before the final K cut.
///
/// The filtering policy belongs to the caller; the search only hands over
/// the best `filter_pool` candidates (ascending) and keeps the first K of
/// whatever comes back, re-sorted by distance.
pub trait SubsetFilter: Sync {
    fn filter(&self, candidates: Vec<Candidate>) -> Vec<Candidate>;
}

impl<F> SubsetFilter for F
where
    F: Fn(Vec<Candidate>) -> Vec<Candidate> + Sync,
{
    fn filter(&self, candidates: Vec<Candidate>) -> Vec<Candidate> {
        self(candidates)
    }
}
