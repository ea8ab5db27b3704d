// crates/tspend-economics/src/lib.rs
//
// tspend-economics: Treasury subsidy accrual and the two projection engines.
//
// `BalanceProjector` walks the chain backwards over the expenditure policy
// window and projects how much the treasury may spend now and as past spends
// leave the window. `VoteProjector` projects when (and whether) a tspend's
// vote can pass. All monetary values are in atoms.

pub mod balance;
pub mod format;
pub mod subsidy;
pub mod vote;

pub use balance::{
    BalanceProjector, BalanceReport, HistoricalSpend, NewSpendProjection, SpendProjection,
    TreasuryChanges,
};
pub use format::{format_duration, plural};
pub use subsidy::{sum_subsidy, SubsidyCache};
pub use vote::{Milestone, Verdict, VoteOutcome, VoteProjection, VoteProjector, VoteStats};
