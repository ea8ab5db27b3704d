// crates/tspend-cli/src/commands/progress.rs
//
// `tspend progress`: vote progress and approval scenarios for every tspend
// in the node's mempool.

use clap::Args;
use serde::Serialize;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use tspend_core::{Hash, TspendError};
use tspend_economics::{Milestone, Verdict, VoteOutcome, VoteProjection, VoteProjector};

use crate::config::Context;
use crate::output::{format_json, format_table, write_out, OutputFormat};

#[derive(Args, Debug, Clone, Default)]
pub struct ProgressCmd {
    /// Print the projections as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Serialize)]
struct ProgressReport<'a> {
    height: u64,
    hash: Hash,
    tspends: &'a [VoteProjection],
}

#[derive(Tabled)]
struct SummaryRow {
    #[tabled(rename = "TSpend")]
    hash: String,
    #[tabled(rename = "Yes")]
    yes: u64,
    #[tabled(rename = "No")]
    no: u64,
    #[tabled(rename = "Yes %")]
    yes_pct: String,
    #[tabled(rename = "Window")]
    window: String,
    #[tabled(rename = "Status")]
    status: String,
}

fn status(p: &VoteProjection) -> String {
    match &p.outcome {
        VoteOutcome::NotStarted { .. } => "not started".to_string(),
        VoteOutcome::Voting(stats) => match stats.verdict {
            Verdict::Approved { .. } => "approved".to_string(),
            Verdict::Disapproved => "disapproved".to_string(),
            Verdict::Pending { .. } => format!("voting ({:.0}%)", stats.progress * 100.0),
        },
    }
}

fn scenario(out: &mut Vec<String>, title: &str, m: Option<&Milestone>) {
    out.push(String::new());
    out.push(title.to_string());
    match m {
        Some(m) => {
            out.push(format!(
                "  Blocks to Shortcut Approval: {} (block {})     Days {:.2}",
                m.blocks_to_approval, m.approval_height, m.days_to_approval
            ));
            out.push(format!(
                "  Blocks to inclusion opportunity: {} (block {})   Days To Opportunity: {:.2}",
                m.blocks_to_inclusion, m.inclusion_height, m.days_to_inclusion
            ));
        }
        None => out.push("  Impossible to approve tspend in this scenario".to_string()),
    }
}

/// Detailed text for one projection.
pub fn render_projection(p: &VoteProjection) -> String {
    let mut out = vec![
        format!("TSpend {}", p.hash),
        format!(
            "Votes Yes: {}  ({:.2}%) No: {}   Vote Interval: {} - {}",
            p.yes_votes,
            p.yes_share * 100.0,
            p.no_votes,
            p.vote_start,
            p.vote_end
        ),
    ];

    let stats = match &p.outcome {
        VoteOutcome::NotStarted { blocks_to_start } => {
            out.push(format!(
                "Voting hasn't started yet ({} blocks to start)",
                blocks_to_start
            ));
            return out.join("\n");
        }
        VoteOutcome::Voting(stats) => stats,
    };

    out.push(format!(
        "Cast Votes: {}    Voting Progress: {:.0}%",
        stats.cast_votes,
        stats.progress * 100.0
    ));
    out.push(format!(
        "Possible votes so far: {}    Participation: {:.2}%",
        stats.max_votes_so_far,
        stats.participation * 100.0
    ));
    out.push(format!(
        "Max votes: {}   Quorum: {}   Has Quorum: {}",
        stats.max_votes, stats.quorum, stats.has_quorum
    ));
    out.push(format!(
        "Blocks to end of voting: {} ({:.2} days)    Max Remaining Votes {}",
        stats.remaining_blocks, stats.days_to_end, stats.max_remaining_votes
    ));

    match &stats.verdict {
        Verdict::Approved { inclusion } => {
            out.push("Tspend Approved!".to_string());
            out.push(format!(
                "  Blocks to inclusion opportunity: {} (block {})   Days To Opportunity: {:.2}",
                inclusion.blocks_to_inclusion,
                inclusion.inclusion_height,
                inclusion.days_to_inclusion
            ));
        }
        Verdict::Disapproved => {
            out.push(format!(
                "Required Yes Votes: {}     Missing Yes Votes: {}",
                stats.required_yes, stats.missing_yes
            ));
            out.push("Tspend Disapproved!".to_string());
        }
        Verdict::Pending {
            best_case,
            steady,
            no_more_votes,
        } => {
            out.push(format!(
                "Required Yes Votes: {}     Missing Yes Votes: {}",
                stats.required_yes, stats.missing_yes
            ));
            scenario(
                &mut out,
                "Scenario 1 - Every possible vote is cast as yes vote from now on",
                best_case.as_ref(),
            );
            scenario(
                &mut out,
                "Scenario 2 - Yes votes at current participation and approval levels",
                steady.as_ref(),
            );
            scenario(
                &mut out,
                "Scenario 3 - No more votes come in",
                no_more_votes.as_ref(),
            );
        }
    }
    out.join("\n")
}

pub fn render_text(height: u64, hash: Hash, projections: &[VoteProjection]) -> String {
    let rows: Vec<SummaryRow> = projections
        .iter()
        .map(|p| SummaryRow {
            hash: p.hash.to_string(),
            yes: p.yes_votes,
            no: p.no_votes,
            yes_pct: format!("{:.2}", p.yes_share * 100.0),
            window: format!("{} - {}", p.vote_start, p.vote_end),
            status: status(p),
        })
        .collect();

    let mut out = vec![
        format!(
            "Checking {} tspends at block {} ({})",
            projections.len(),
            height,
            hash
        ),
        format_table(&rows),
    ];
    for p in projections {
        out.push(String::new());
        out.push(render_projection(p));
    }
    out.join("\n")
}

/// Run the progress command.
pub async fn run(
    ctx: &Context,
    cmd: &ProgressCmd,
    cancel: &CancellationToken,
) -> Result<(), TspendError> {
    let client = ctx.connect(cancel).await?;
    let (votes, projections) = VoteProjector::new(&ctx.params)
        .project_all(&client, cancel)
        .await?;

    let text = match OutputFormat::from_json_flag(cmd.json) {
        OutputFormat::Json => format_json(&ProgressReport {
            height: votes.height,
            hash: votes.hash,
            tspends: &projections,
        })?,
        OutputFormat::Text => render_text(votes.height, votes.hash, &projections),
    };
    write_out(None, &text)
}
