//! K-nearest candidate selection.

use std::cmp::Ordering;

// upfront reservation cap; larger collectors grow on demand
const PREALLOC_LIMIT: usize = 1024;

/// Scored candidate patch.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Candidate {
    /// Normalized squared difference to the reference patch.
    pub distance: f32,
    /// Channel-0 linear index of the candidate's top-left anchor.
    pub index: usize,
}

fn candidate_cmp_asc(a: &Candidate, b: &Candidate) -> Ordering {
    a.distance
        .total_cmp(&b.distance)
        .then_with(|| a.index.cmp(&b.index))
}

/// Sorts candidates by ascending distance, ties by ascending index.
pub(crate) fn sort_candidates_asc(candidates: &mut [Candidate]) {
    candidates.sort_by(candidate_cmp_asc);
}

/// Streaming collector of the K smallest candidates, O(k) per insertion.
pub struct TopK {
    k: usize,
    items: Vec<Candidate>,
}

impl TopK {
    /// Creates a collector keeping at most `k` candidates.
    pub fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k.min(PREALLOC_LIMIT)),
        }
    }

    /// Offers a candidate; non-finite distances are ignored.
    pub fn push(&mut self, candidate: Candidate) {
        if self.k == 0 || !candidate.distance.is_finite() {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(candidate);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if candidate_cmp_asc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if candidate_cmp_asc(&candidate, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = candidate;
        }
    }

    /// Returns the collected candidates as a sorted set.
    pub fn into_set(mut self) -> CandidateSet {
        sort_candidates_asc(&mut self.items);
        CandidateSet {
            candidates: self.items,
            requested: self.k,
        }
    }
}

/// Up to K candidates in ascending distance order.
///
/// A set shorter than the requested K is a valid outcome (small windows,
/// borders); check [`CandidateSet::is_short`].
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CandidateSet {
    candidates: Vec<Candidate>,
    requested: usize,
}

impl CandidateSet {
    pub(crate) fn from_sorted(candidates: Vec<Candidate>, requested: usize) -> Self {
        Self {
            candidates,
            requested,
        }
    }

    /// Number of candidates found.
    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// K requested by the caller.
    pub fn requested(&self) -> usize {
        self.requested
    }

    /// True when fewer than the requested K candidates exist.
    pub fn is_short(&self) -> bool {
        self.candidates.len() < self.requested
    }

    /// Closest candidate, if any.
    pub fn best(&self) -> Option<Candidate> {
        self.candidates.first().copied()
    }

    pub fn as_slice(&self) -> &[Candidate] {
        &self.candidates
    }

    pub fn into_vec(self) -> Vec<Candidate> {
        self.candidates
    }

    pub fn distances(&self) -> impl Iterator<Item = f32> + '_ {
        self.candidates.iter().map(|c| c.distance)
    }

    pub fn indices(&self) -> impl Iterator<Item = usize> + '_ {
        self.candidates.iter().map(|c| c.index)
    }
}

/// Selects the `k` smallest finite-distance candidates.
///
/// Entries with non-finite distance (unused window slots) never qualify, so
/// the result may be shorter than `k`.
pub fn select_topk<I>(pairs: I, k: usize) -> CandidateSet
where
    I: IntoIterator<Item = Candidate>,
{
    if k == 0 {
        return CandidateSet::from_sorted(Vec::new(), 0);
    }
    let mut valid: Vec<Candidate> = pairs
        .into_iter()
        .filter(|c| c.distance.is_finite())
        .collect();
    if valid.len() > k {
        valid.select_nth_unstable_by(k, candidate_cmp_asc);
        valid.truncate(k);
    }
    sort_candidates_asc(&mut valid);
    CandidateSet::from_sorted(valid, k)
}
