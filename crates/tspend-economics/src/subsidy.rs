// crates/tspend-economics/src/subsidy.rs
//
// Treasury subsidy schedule.
//
// The block subsidy starts at `base_subsidy` and is multiplied by
// `mul_subsidy / div_subsidy` (with integer truncation) once every
// `subsidy_reduction_interval` blocks. The treasury receives
// `treasury_subsidy_proportion / total_subsidy_proportions` of it, so the
// treasury base is constant within each reduction interval.

use std::collections::HashMap;

use tspend_core::{Amount, ChainParams};

/// Memoizes the block subsidy per reduction interval.
#[derive(Debug)]
pub struct SubsidyCache<'a> {
    params: &'a ChainParams,
    by_interval: HashMap<i64, i64>,
}

impl<'a> SubsidyCache<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self {
            params,
            by_interval: HashMap::new(),
        }
    }

    pub fn reduction_interval(&self) -> i64 {
        self.params.subsidy_reduction_interval
    }

    /// Full block subsidy for blocks in the given reduction interval.
    fn interval_subsidy(&mut self, interval: i64) -> i64 {
        if let Some(v) = self.by_interval.get(&interval) {
            return *v;
        }

        // Start from the closest lower interval already known.
        let (mut at, mut subsidy) = self
            .by_interval
            .iter()
            .filter(|(k, _)| **k < interval)
            .max_by_key(|(k, _)| **k)
            .map(|(k, v)| (*k, *v))
            .unwrap_or((0, self.params.base_subsidy));
        while at < interval && subsidy > 0 {
            subsidy = (subsidy as i128 * self.params.mul_subsidy as i128
                / self.params.div_subsidy as i128) as i64;
            at += 1;
        }
        self.by_interval.insert(interval, subsidy);
        subsidy
    }

    /// Block subsidy at `height`. Zero at and below the genesis block.
    pub fn block_subsidy(&mut self, height: i64) -> i64 {
        if height <= 0 {
            return 0;
        }
        self.interval_subsidy(height / self.reduction_interval())
    }

    /// Treasury base paid by the block at `height`.
    pub fn treasury_subsidy(&mut self, height: i64) -> Amount {
        let subsidy = self.block_subsidy(height);
        Amount(
            (subsidy as i128 * self.params.treasury_subsidy_proportion as i128
                / self.params.total_subsidy_proportions as i128) as i64,
        )
    }
}

/// Sum of treasury bases over the `window` blocks ending at `end_height`
/// (inclusive of both ends). Walks one reduction interval at a time.
pub fn sum_subsidy(cache: &mut SubsidyCache<'_>, end_height: i64, window: i64) -> Amount {
    let interval = cache.reduction_interval();
    // Heights at or below genesis contribute nothing.
    let mut height = (end_height - window + 1).max(1);
    let mut total = Amount::ZERO;
    while height <= end_height {
        let to_boundary = interval - height % interval;
        let chunk = to_boundary.min(end_height - height + 1);
        let tbase = cache.treasury_subsidy(height);
        total += Amount(tbase.atoms() * chunk);
        height += chunk;
    }
    total
}
