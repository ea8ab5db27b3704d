// crates/tspend-economics/src/vote.rs
//
// Vote outcome projection for tspends in the mempool.
//
// A vote passes early ("shortcut" approval) once the yes votes reach the
// required share of all votes that could still be cast by the end of the
// window. Given a tally snapshot the projector reports progress, quorum and
// three independent scenarios for when that happens.

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use tspend_core::cancel::cancellable;
use tspend_core::params::div_ceil;
use tspend_core::{ChainParams, ChainSource, Hash, TspendError, TspendVotes, VoteTally};

/// An approval height and the inclusion opportunity that follows it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Milestone {
    pub approval_height: u64,
    pub blocks_to_approval: u64,
    pub days_to_approval: f64,
    /// First TVI boundary after approval, where the tspend can be mined.
    pub inclusion_height: u64,
    pub blocks_to_inclusion: u64,
    pub days_to_inclusion: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "verdict", rename_all = "snake_case")]
pub enum Verdict {
    /// Enough yes votes are in that no remaining votes can change the result.
    Approved { inclusion: Milestone },
    /// Even if every remaining vote were yes, the vote fails.
    Disapproved,
    Pending {
        /// Every remaining vote is yes.
        best_case: Option<Milestone>,
        /// Participation and yes share hold at their current levels.
        steady: Option<Milestone>,
        /// No further votes are cast.
        no_more_votes: Option<Milestone>,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteStats {
    pub cast_votes: u64,
    /// Fraction of the voting window elapsed, 0 to 1.
    pub progress: f64,
    pub max_votes_so_far: u64,
    /// Cast votes over possible votes so far, 0 to 1.
    pub participation: f64,
    pub max_votes: u64,
    pub quorum: u64,
    pub has_quorum: bool,
    pub remaining_blocks: u64,
    pub days_to_end: f64,
    pub max_remaining_votes: u64,
    pub required_yes: u64,
    pub missing_yes: u64,
    pub verdict: Verdict,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum VoteOutcome {
    NotStarted { blocks_to_start: u64 },
    Voting(VoteStats),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VoteProjection {
    pub hash: Hash,
    pub yes_votes: u64,
    pub no_votes: u64,
    /// Yes over cast votes, 0 to 1 (0 when nothing was cast).
    pub yes_share: f64,
    pub vote_start: u64,
    pub vote_end: u64,
    pub current_height: u64,
    pub outcome: VoteOutcome,
}

pub struct VoteProjector<'a> {
    params: &'a ChainParams,
}

impl<'a> VoteProjector<'a> {
    pub fn new(params: &'a ChainParams) -> Self {
        Self { params }
    }

    fn days(&self, blocks: u64) -> f64 {
        blocks as f64 / self.params.blocks_per_day() as f64
    }

    fn inclusion_after(&self, height: u64) -> u64 {
        let tvi = self.params.treasury_vote_interval;
        height + (tvi - height % tvi)
    }

    fn milestone(&self, current: u64, approval_height: u64) -> Milestone {
        let inclusion_height = self.inclusion_after(approval_height);
        let blocks_to_approval = approval_height.saturating_sub(current);
        let blocks_to_inclusion = inclusion_height - current.min(inclusion_height);
        Milestone {
            approval_height,
            blocks_to_approval,
            days_to_approval: self.days(blocks_to_approval),
            inclusion_height,
            blocks_to_inclusion,
            days_to_inclusion: self.days(blocks_to_inclusion),
        }
    }

    /// Yes votes needed for shortcut approval when `counted` votes are in
    /// and `remaining` more may still be cast.
    fn required_yes(&self, counted: u64, remaining: u64) -> u64 {
        self.params.treasury_vote_required.of_ceil(counted + remaining)
    }

    /// Project one tally as of `current_height`.
    pub fn project(&self, tally: &VoteTally, current_height: u64) -> VoteProjection {
        let yes = tally.yes_votes;
        let no = tally.no_votes;
        let start = tally.vote_start as u64;
        let end = tally.vote_end as u64;
        let cast = yes + no;
        let yes_share = if cast > 0 {
            yes as f64 / cast as f64
        } else {
            0.0
        };

        let outcome = if current_height <= start {
            VoteOutcome::NotStarted {
                blocks_to_start: start - current_height,
            }
        } else {
            VoteOutcome::Voting(self.stats(tally, current_height, yes_share))
        };

        VoteProjection {
            hash: tally.hash,
            yes_votes: yes,
            no_votes: no,
            yes_share,
            vote_start: start,
            vote_end: end,
            current_height,
            outcome,
        }
    }

    fn stats(&self, tally: &VoteTally, current_height: u64, yes_share: f64) -> VoteStats {
        let vpb = self.params.votes_per_block;
        let yes = tally.yes_votes;
        let no = tally.no_votes;
        let start = tally.vote_start as u64;
        let end = (tally.vote_end as u64).max(start);
        let cast = yes + no;
        let current = current_height.min(end);

        let elapsed = current - start;
        let length = end - start;
        let progress = if length > 0 {
            elapsed as f64 / length as f64
        } else {
            1.0
        };
        let max_votes_so_far = elapsed * vpb;
        let participation = if max_votes_so_far > 0 {
            cast as f64 / max_votes_so_far as f64
        } else {
            0.0
        };
        let max_votes = vpb * length;
        let quorum = self.params.treasury_vote_quorum.of_floor(max_votes);
        let has_quorum = cast >= quorum;

        let remaining_blocks = end - current;
        let max_remaining_votes = remaining_blocks * vpb;
        let required_yes = self.required_yes(cast, max_remaining_votes);
        let missing_yes = required_yes.saturating_sub(yes);

        let verdict = if missing_yes == 0 {
            Verdict::Approved {
                inclusion: self.milestone(current, current),
            }
        } else if missing_yes > max_remaining_votes {
            Verdict::Disapproved
        } else {
            Verdict::Pending {
                best_case: Some(self.best_case(current, missing_yes)),
                steady: self.steady(tally, current, participation, yes_share),
                no_more_votes: self.no_more_votes(tally, current),
            }
        };
        debug!(
            "tspend {}: cast {} required {} missing {}",
            tally.hash, cast, required_yes, missing_yes
        );

        VoteStats {
            cast_votes: cast,
            progress,
            max_votes_so_far,
            participation,
            max_votes,
            quorum,
            has_quorum,
            remaining_blocks,
            days_to_end: self.days(remaining_blocks),
            max_remaining_votes,
            required_yes,
            missing_yes,
            verdict,
        }
    }

    /// Every remaining vote is yes.
    fn best_case(&self, current: u64, missing_yes: u64) -> Milestone {
        let blocks = div_ceil(missing_yes, self.params.votes_per_block);
        self.milestone(current, current + blocks)
    }

    /// Yes votes keep arriving at the current participation and yes share.
    /// The required threshold shrinks each block as fewer votes remain.
    /// Meeting it only on the last block of the window is not a shortcut
    /// approval.
    fn steady(
        &self,
        tally: &VoteTally,
        current: u64,
        participation: f64,
        yes_share: f64,
    ) -> Option<Milestone> {
        let vpb = self.params.votes_per_block;
        let end = tally.vote_end as u64;
        let per_block = vpb as f64 * participation * yes_share;

        let mut frac_yes = tally.yes_votes as f64;
        let mut height = current;
        let mut required =
            self.required_yes(tally.yes_votes + tally.no_votes, (end - current) * vpb);
        while (frac_yes as u64) < required {
            height += 1;
            if height >= end {
                return None;
            }
            frac_yes += per_block;
            let remaining = (end - height) * vpb;
            required = self.required_yes(tally.no_votes + frac_yes as u64, remaining);
        }
        Some(self.milestone(current, height))
    }

    /// No more votes arrive. Approval happens once the votes that could still
    /// be cast are too few to pull the yes share below the requirement.
    fn no_more_votes(&self, tally: &VoteTally, current: u64) -> Option<Milestone> {
        let vpb = self.params.votes_per_block;
        let req = self.params.treasury_vote_required;
        let cast = tally.yes_votes + tally.no_votes;
        let end = tally.vote_end as u64;

        // Total votes at which the current yes count is exactly the
        // required share.
        let threshold_yes = (tally.yes_votes as u128 * req.den as u128 / req.num as u128) as u64;
        if threshold_yes <= cast {
            return None;
        }
        let tolerable = threshold_yes - cast;
        let threshold_block = end.saturating_sub(tolerable / vpb).max(current);
        Some(self.milestone(current, threshold_block))
    }

    /// Fetch all mempool tspend tallies and project each one.
    pub async fn project_all<C: ChainSource + ?Sized>(
        &self,
        chain: &C,
        cancel: &CancellationToken,
    ) -> Result<(TspendVotes, Vec<VoteProjection>), TspendError> {
        let votes = cancellable(cancel, chain.tspend_votes()).await?;
        if votes.votes.is_empty() {
            return Err(TspendError::NotFound(
                "no tspends in dcrd mempool".to_string(),
            ));
        }
        let projections = votes
            .votes
            .iter()
            .map(|t| self.project(t, votes.height))
            .collect();
        Ok((votes, projections))
    }
}
