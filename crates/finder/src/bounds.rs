use bridge_primitives::{BlockAnchor, BlockData, BracketingAnchors};

/// The finder's current search window: a lower bound anchor that is always
/// known, and an upper bound that may be absent ("open above") until some
/// round observes a block strictly after the target time.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Bounds {
    lower: BlockAnchor,
    upper: Option<BlockAnchor>,
}

impl Bounds {
    /// Seed the bounds from a `FindBracketingAnchors` lookup. `genesis` is
    /// the lower-bound fallback when the store had no anchor at or before
    /// the target time (an empty anchor index, or a target time older than
    /// anything observed so far).
    ///
    /// Two anchors with identical timestamps are treated as "no interval":
    /// extrapolate from the lower one rather than divide by a zero time
    /// span (spec §4.E edge policy).
    pub(crate) fn initial(genesis: BlockAnchor, bracketing: BracketingAnchors) -> Self {
        let lower = bracketing.before.unwrap_or(genesis);
        let upper = match bracketing.after {
            Some(after) if after.block_timestamp != lower.block_timestamp => Some(after),
            _ => None,
        };
        Self { lower, upper }
    }

    pub(crate) const fn lower(&self) -> BlockAnchor {
        self.lower
    }

    pub(crate) fn upper_limit(&self) -> Option<u64> {
        self.upper.map(|anchor| anchor.block_number)
    }

    /// Linearly interpolate a block-number estimate for `target_time`.
    /// With both bounds present: `lower.block + round((target - lower.time)
    /// * (upper.block - lower.block) / (upper.time - lower.time))`, clamped
    /// to `[lower.block, upper.block]`. With only a lower bound,
    /// extrapolate at `default_rate_ms` per block.
    pub(crate) fn estimate(&self, target_time: u64, default_rate_ms: u64) -> u64 {
        match self.upper {
            Some(upper) => {
                let time_span = upper.block_timestamp.saturating_sub(self.lower.block_timestamp);
                if time_span == 0 {
                    return self.lower.block_number;
                }
                let block_span = upper.block_number.saturating_sub(self.lower.block_number);
                let elapsed = target_time.saturating_sub(self.lower.block_timestamp);
                // Round-to-nearest integer division: add half the divisor
                // before truncating.
                let delta = (elapsed * block_span + time_span / 2) / time_span;
                (self.lower.block_number + delta).clamp(self.lower.block_number, upper.block_number)
            }
            None => {
                let elapsed = target_time.saturating_sub(self.lower.block_timestamp);
                self.lower.block_number + elapsed / default_rate_ms.max(1)
            }
        }
    }

    /// Tighten bounds from a round's fetched blocks: the largest block with
    /// `timestamp <= target_time` raises `lower`; the smallest with
    /// `timestamp > target_time` lowers `upper` — each only if strictly
    /// tighter than the current bound. An empty `fetched` slice is a no-op
    /// (spec §4.E edge policy: an empty fetch does not terminate the
    /// search, and the bounds don't change that round).
    pub(crate) fn tighten(&mut self, target_time: u64, fetched: &[BlockData]) {
        for block in fetched {
            let candidate = BlockAnchor { block_number: block.number, block_timestamp: block.timestamp };
            if block.timestamp <= target_time {
                if candidate.block_number > self.lower.block_number {
                    self.lower = candidate;
                }
            } else {
                let tighter = match self.upper {
                    Some(upper) => candidate.block_number < upper.block_number,
                    None => true,
                };
                if tighter {
                    self.upper = Some(candidate);
                }
            }
        }
    }

    /// `true` once the window has collapsed to adjacent (or equal) block
    /// numbers with no match found — the transfer is definitively absent.
    pub(crate) fn is_collapsed(&self) -> bool {
        match self.upper {
            Some(upper) => upper.block_number <= self.lower.block_number + 1,
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn anchor(block_number: u64, block_timestamp: u64) -> BlockAnchor {
        BlockAnchor { block_number, block_timestamp }
    }

    #[test]
    fn estimate_interpolates_between_both_bounds() {
        let bounds = Bounds { lower: anchor(1_000, 1_700_000_000_000), upper: Some(anchor(2_000, 1_700_001_000_000)) };
        assert_eq!(bounds.estimate(1_700_000_500_000, 1_000), 1_500);
    }

    #[test]
    fn estimate_extrapolates_with_no_upper_bound() {
        let bounds = Bounds { lower: anchor(1_000, 1_700_000_000_000), upper: None };
        assert_eq!(bounds.estimate(1_700_000_010_000, 1_000), 1_010);
    }

    #[test]
    fn identical_timestamp_anchors_treated_as_no_interval() {
        let bracketing = BracketingAnchors { before: Some(anchor(5, 100)), after: Some(anchor(9, 100)) };
        let bounds = Bounds::initial(anchor(1, 0), bracketing);
        assert_eq!(bounds.upper_limit(), None);
    }

    #[test]
    fn tighten_only_moves_bounds_closer() {
        let mut bounds = Bounds { lower: anchor(1_000, 1_700_000_000_000), upper: Some(anchor(2_000, 1_700_001_000_000)) };
        let fetched = vec![
            BlockData { number: 1_400, hash: Default::default(), timestamp: 1_700_000_400_000, system_txs: vec![] },
            BlockData { number: 1_600, hash: Default::default(), timestamp: 1_700_000_600_000, system_txs: vec![] },
        ];
        bounds.tighten(1_700_000_500_000, &fetched);
        assert_eq!(bounds.lower().block_number, 1_400);
        assert_eq!(bounds.upper_limit(), Some(1_600));
    }

    #[test]
    fn adjacent_bounds_are_collapsed() {
        let bounds = Bounds { lower: anchor(10, 0), upper: Some(anchor(11, 10)) };
        assert!(bounds.is_collapsed());
        let bounds = Bounds { lower: anchor(10, 0), upper: Some(anchor(12, 10)) };
        assert!(!bounds.is_collapsed());
    }
}
