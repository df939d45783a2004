//! Top-K tracking of accumulator peaks.

use std::cmp::Ordering;

/// Strongest accumulator cell found for one candidate rotation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct VotePeak {
    /// Position of the rotation in its task list; breaks vote ties.
    pub(crate) order: usize,
    pub(crate) angle_deg: f32,
    pub(crate) col: usize,
    pub(crate) row: usize,
    pub(crate) votes: u32,
}

fn peak_cmp_desc(a: &VotePeak, b: &VotePeak) -> Ordering {
    b.votes.cmp(&a.votes).then_with(|| a.order.cmp(&b.order))
}

/// Sorts peaks by descending votes, earlier tasks first on ties.
pub(crate) fn sort_peaks_desc(peaks: &mut [VotePeak]) {
    peaks.sort_by(peak_cmp_desc);
}

/// Keeps the `k` best peaks pushed so far.
pub(crate) struct TopK<T> {
    k: usize,
    items: Vec<T>,
}

impl TopK<VotePeak> {
    pub(crate) fn new(k: usize) -> Self {
        Self {
            k,
            items: Vec::with_capacity(k),
        }
    }

    /// Pushes a peak, evicting the weakest one when full.
    pub(crate) fn push(&mut self, peak: VotePeak) {
        if self.k == 0 {
            return;
        }
        if self.items.len() < self.k {
            self.items.push(peak);
            return;
        }

        let mut worst_idx = 0usize;
        for (idx, item) in self.items.iter().enumerate().skip(1) {
            if peak_cmp_desc(item, &self.items[worst_idx]) == Ordering::Greater {
                worst_idx = idx;
            }
        }

        if peak_cmp_desc(&peak, &self.items[worst_idx]) == Ordering::Less {
            self.items[worst_idx] = peak;
        }
    }

    pub(crate) fn into_sorted_desc(mut self) -> Vec<VotePeak> {
        sort_peaks_desc(&mut self.items);
        self.items
    }
}
