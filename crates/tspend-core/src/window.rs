// crates/tspend-core/src/window.rs
//
// Expiry and voting window placement.
//
// The mapping from a block height to a tspend expiry, and from an expiry to
// its voting window, is a consensus rule. It sits behind `ExpiryRule` so the
// placement policy can be exercised against any rule that is deterministic
// and periodic in `tvi * multiplier`.

use serde::Serialize;
use tracing::info;

use crate::error::TspendError;
use crate::params::ChainParams;

/// Consensus mapping between heights, expiries and voting windows.
pub trait ExpiryRule: Send + Sync {
    /// Expiry for a tspend that could be mined starting at `next_height`.
    fn tspend_expiry(&self, next_height: u64, tvi: u64, multiplier: u64) -> u32;

    /// Inclusive voting window `(start, end)` for a tspend with `expiry`.
    fn tspend_window(&self, expiry: u32, tvi: u64, multiplier: u64)
        -> Result<(u32, u32), TspendError>;
}

/// The network's rule: voting ends on the first TVI after the vote has run
/// for `multiplier` full intervals, and the expiry sits two blocks later.
#[derive(Debug, Clone, Copy, Default)]
pub struct TreasuryVoteRule;

pub fn is_treasury_vote_interval(height: u64, tvi: u64) -> bool {
    height % tvi == 0
}

impl ExpiryRule for TreasuryVoteRule {
    fn tspend_expiry(&self, next_height: u64, tvi: u64, multiplier: u64) -> u32 {
        let next_tvi = next_height + (tvi - next_height % tvi);
        let max_expiry = next_tvi + tvi * multiplier;
        (max_expiry + 2) as u32
    }

    fn tspend_window(
        &self,
        expiry: u32,
        tvi: u64,
        multiplier: u64,
    ) -> Result<(u32, u32), TspendError> {
        let end = (expiry as u64).checked_sub(2).ok_or_else(|| {
            TspendError::Config(format!("invalid tspend expiry {}", expiry))
        })?;
        if !is_treasury_vote_interval(end, tvi) {
            return Err(TspendError::Config(format!(
                "expiry {} does not end on a treasury vote interval",
                expiry
            )));
        }
        let start = end.checked_sub(tvi * multiplier).ok_or_else(|| {
            TspendError::Config(format!("expiry {} is too low", expiry))
        })?;
        Ok((start as u32, end as u32))
    }
}

/// Outcome of placing a tspend relative to the current chain height.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Placement {
    /// Height the expiry was derived from (after any advance).
    pub next_height: u64,
    /// Blocks from `current + 1` to the next TVI.
    pub blocks_to_tvi: u64,
    pub too_close_threshold: u64,
    /// Whether `next_height` was pushed to the following TVI.
    pub advanced: bool,
    pub expiry: u32,
    pub vote_start: u32,
    pub vote_end: u32,
}

/// Decides where a new tspend's vote lands.
pub struct WindowPolicy<'a, R: ExpiryRule = TreasuryVoteRule> {
    params: &'a ChainParams,
    rule: R,
}

impl<'a> WindowPolicy<'a, TreasuryVoteRule> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self {
            params,
            rule: TreasuryVoteRule,
        }
    }
}

impl<'a, R: ExpiryRule> WindowPolicy<'a, R> {
    pub fn with_rule(params: &'a ChainParams, rule: R) -> Self {
        Self { params, rule }
    }

    fn tvi(&self) -> u64 {
        self.params.treasury_vote_interval
    }

    fn multiplier(&self) -> u64 {
        self.params.treasury_vote_interval_multiplier
    }

    /// Place a tspend built while the chain tip is at `current_height`.
    ///
    /// If the next block is within a quarter TVI of the next boundary the
    /// vote would start too soon to move the signed transaction through
    /// review and distribution, so placement advances to that boundary.
    pub fn place(&self, current_height: u64) -> Result<Placement, TspendError> {
        let tvi = self.tvi();
        let mut next_height = current_height + 1;
        let blocks_to_tvi = tvi - (next_height % tvi);
        let too_close_threshold = tvi / 4;
        let advanced = blocks_to_tvi < too_close_threshold;
        if advanced {
            next_height += blocks_to_tvi;
            info!(
                "Next block height too close to next TVI ({} blocks to TVI; thresh={}). Using {} as next height.",
                blocks_to_tvi, too_close_threshold, next_height
            );
        }
        let expiry = self.rule.tspend_expiry(next_height, tvi, self.multiplier());
        let (vote_start, vote_end) = self.window_for(expiry)?;
        Ok(Placement {
            next_height,
            blocks_to_tvi,
            too_close_threshold,
            advanced,
            expiry,
            vote_start,
            vote_end,
        })
    }

    /// Resolve the expiry to use. An explicit expiry always wins.
    pub fn compute_expiry(
        &self,
        current_height: u64,
        explicit_expiry: Option<u32>,
    ) -> Result<u32, TspendError> {
        if let Some(expiry) = explicit_expiry {
            return Ok(expiry);
        }
        Ok(self.place(current_height)?.expiry)
    }

    /// Voting window `(start, end)` for an expiry.
    pub fn window_for(&self, expiry: u32) -> Result<(u32, u32), TspendError> {
        self.rule.tspend_window(expiry, self.tvi(), self.multiplier())
    }
}
