// crates/tspend-economics/src/balance.rs
//
// Spendable treasury balance projection.
//
// Treasury spends are limited to 150% of what was added to the treasury over
// the expenditure policy window (`tvi * multiplier * window` blocks). The
// projector scans that window backwards from the tip, collects treasury adds
// and past spends, and projects how much becomes spendable as each past
// spend leaves the window and at the vote end of a tspend created now.

use std::time::Duration;

use serde::{Serialize, Serializer};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use tspend_core::cancel::cancellable;
use tspend_core::{is_tspend, Amount, ChainParams, ChainSource, Hash, TspendError, WindowPolicy};

use crate::format::blocks_duration;
use crate::subsidy::{sum_subsidy, SubsidyCache};

fn as_secs<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_u64(d.as_secs())
}

/// A tspend mined inside the policy window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HistoricalSpend {
    pub hash: Hash,
    pub mined_hash: Hash,
    pub mined_height: u64,
    pub amount: Amount,
}

/// Treasury activity over a run of blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TreasuryChanges {
    pub added: Amount,
    pub spent: Amount,
    /// Balance at the earliest visited block.
    pub initial_balance: Amount,
    /// Balance at the tip.
    pub final_balance: Amount,
    pub spends: Vec<HistoricalSpend>,
    /// Parent of the earliest visited block.
    pub prev_block: Hash,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SpendProjection {
    pub spend: HistoricalSpend,
    /// Height at which the spend exits the policy window.
    pub leave_height: u64,
    pub blocks_to_leave: i64,
    #[serde(serialize_with = "as_secs")]
    pub time_to_leave: Duration,
    /// Spendable balance once the spend has left the window.
    pub projected_spendable: Amount,
    /// Blocks until the spend is reflected in the treasury balance.
    pub blocks_to_maturity: Option<u64>,
}

/// Projection for a tspend generated at the tip.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewSpendProjection {
    pub expiry: u32,
    pub vote_end: u32,
    #[serde(serialize_with = "as_secs")]
    pub time_to_expiry: Duration,
    pub projected_spendable: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BalanceReport {
    pub network: String,
    pub tip_height: u64,
    pub tip_hash: Hash,
    pub policy_window: u64,
    pub added: Amount,
    pub spent: Amount,
    pub total_balance: Amount,
    pub spendable_now: Amount,
    pub spends: Vec<SpendProjection>,
    pub new_spend: NewSpendProjection,
}

pub struct BalanceProjector<'a, C: ChainSource + ?Sized> {
    chain: &'a C,
    params: &'a ChainParams,
    cancel: CancellationToken,
}

impl<'a, C: ChainSource + ?Sized> BalanceProjector<'a, C> {
    pub fn new(chain: &'a C, params: &'a ChainParams, cancel: CancellationToken) -> Self {
        Self {
            chain,
            params,
            cancel,
        }
    }

    /// Walk back `blocks` blocks from `tip`, one block at a time.
    pub async fn past_treasury_changes(
        &self,
        tip: Hash,
        blocks: u64,
    ) -> Result<TreasuryChanges, TspendError> {
        let mut changes = TreasuryChanges {
            added: Amount::ZERO,
            spent: Amount::ZERO,
            initial_balance: Amount::ZERO,
            final_balance: Amount::ZERO,
            spends: Vec::new(),
            prev_block: tip,
        };
        let mut node = tip;
        let mut at_tip = true;

        for _ in 0..blocks {
            if node.is_zero() {
                break;
            }
            let header = cancellable(&self.cancel, self.chain.block_header(&node)).await?;
            let tbalance = cancellable(&self.cancel, self.chain.treasury_balance(&node)).await?;

            for v in &tbalance.updates {
                if *v > 0 {
                    changes.added += Amount(*v);
                } else if *v < 0 {
                    changes.spent += Amount(-*v);
                }
            }
            let negative = tbalance.negative_updates();

            changes.initial_balance = tbalance.balance;
            if at_tip {
                changes.final_balance = tbalance.balance;
                at_tip = false;
            }

            if negative > 0 {
                let block = cancellable(&self.cancel, self.chain.block(&node)).await?;
                let found: Vec<HistoricalSpend> = block
                    .stake_transactions
                    .iter()
                    .filter(|tx| is_tspend(tx))
                    .map(|tx| HistoricalSpend {
                        hash: tx.tx_hash(),
                        mined_hash: node,
                        mined_height: header.height as u64,
                        amount: Amount(tx.inputs[0].value_in),
                    })
                    .collect();
                if found.len() != negative {
                    return Err(TspendError::DataIntegrity(format!(
                        "found only {} tspends while expected {} in block {}",
                        found.len(),
                        negative,
                        node
                    )));
                }
                debug!("Block {} ({}) has {} tspends", header.height, node, negative);
                changes.spends.extend(found);
            }

            node = header.prev_block;
            changes.prev_block = node;
        }

        Ok(changes)
    }

    /// Project the spendable balance from the current tip, or from the main
    /// chain block at `height` when given.
    pub async fn project(&self, height: Option<u64>) -> Result<BalanceReport, TspendError> {
        let (tip_hash, tip_height) = match height {
            Some(h) => (
                cancellable(&self.cancel, self.chain.block_hash(h)).await?,
                h,
            ),
            None => {
                let best = cancellable(&self.cancel, self.chain.best_block()).await?;
                (best.hash, best.height)
            }
        };

        let window = self.params.policy_window_blocks();
        info!(
            "Scanning {} blocks back from {} ({})",
            window, tip_height, tip_hash
        );
        let changes = self.past_treasury_changes(tip_hash, window).await?;
        self.report(tip_height, tip_hash, changes)
    }

    /// Build the projection report from already collected treasury changes.
    pub fn report(
        &self,
        tip_height: u64,
        tip_hash: Hash,
        mut changes: TreasuryChanges,
    ) -> Result<BalanceReport, TspendError> {
        let params = self.params;
        let window = params.policy_window_blocks() as i64;
        let tvi = params.treasury_vote_interval as i64;
        let tip = tip_height as i64;
        let mut cache = SubsidyCache::new(params);

        changes.spends.sort_by_key(|s| s.mined_height);

        let allowance = changes.added.with_allowance();
        let spendable_now = if allowance > changes.spent {
            allowance - changes.spent
        } else {
            Amount::ZERO
        };

        let mut spends = Vec::with_capacity(changes.spends.len());
        for (i, ts) in changes.spends.iter().enumerate() {
            let mined = ts.mined_height as i64;
            let leave_height = mined + window;
            let blocks_to_leave = leave_height - tip;

            let mut projected = sum_subsidy(&mut cache, leave_height, window).with_allowance();
            for (j, other) in changes.spends.iter().enumerate() {
                if j == i {
                    continue;
                }
                let remaining = (window + 2 * tvi) - (leave_height - other.mined_height as i64);
                if remaining > 0 {
                    projected -= other.amount;
                }
            }

            let to_maturity = params.coinbase_maturity as i64 - (tip - mined);
            spends.push(SpendProjection {
                spend: ts.clone(),
                leave_height: leave_height.max(0) as u64,
                blocks_to_leave,
                time_to_leave: blocks_duration(blocks_to_leave, params.target_time_per_block),
                projected_spendable: projected,
                blocks_to_maturity: (to_maturity > 0).then_some(to_maturity as u64),
            });
        }

        let placement = WindowPolicy::new(params).place(tip_height)?;
        let vote_end = placement.vote_end as i64;
        let mut projected = sum_subsidy(&mut cache, vote_end, window).with_allowance();
        for ts in &changes.spends {
            if window - (vote_end - ts.mined_height as i64) > 0 {
                projected -= ts.amount;
            }
        }
        let new_spend = NewSpendProjection {
            expiry: placement.expiry,
            vote_end: placement.vote_end,
            time_to_expiry: blocks_duration(
                placement.expiry as i64 - tip,
                params.target_time_per_block,
            ),
            projected_spendable: projected,
        };

        Ok(BalanceReport {
            network: params.name.to_string(),
            tip_height,
            tip_hash,
            policy_window: window as u64,
            added: changes.added,
            spent: changes.spent,
            total_balance: changes.final_balance,
            spendable_now,
            spends,
            new_spend,
        })
    }
}
