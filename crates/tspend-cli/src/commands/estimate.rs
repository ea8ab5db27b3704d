// crates/tspend-cli/src/commands/estimate.rs
//
// `tspend estimate`: spendable treasury balance now and as past spends
// leave the expenditure policy window.

use clap::Args;
use tabled::Tabled;
use tokio_util::sync::CancellationToken;

use tspend_core::TspendError;
use tspend_economics::{format_duration, plural, BalanceProjector, BalanceReport};

use crate::config::Context;
use crate::output::{format_json, format_table, write_out, OutputFormat};

#[derive(Args, Debug, Clone, Default)]
pub struct EstimateCmd {
    /// Perform the estimate for the main chain block at this height instead
    /// of the tip.
    #[arg(long)]
    pub height: Option<u64>,

    /// Print the report as JSON.
    #[arg(long)]
    pub json: bool,
}

#[derive(Tabled)]
struct SpendRow {
    #[tabled(rename = "Mined")]
    mined: u64,
    #[tabled(rename = "Amount")]
    amount: String,
    #[tabled(rename = "Leaves window")]
    leaves: u64,
    #[tabled(rename = "Blocks left")]
    blocks_left: String,
    #[tabled(rename = "Time left")]
    time_left: String,
    #[tabled(rename = "Spendable after")]
    spendable_after: String,
    #[tabled(rename = "TSpend")]
    hash: String,
}

pub fn render_text(report: &BalanceReport) -> String {
    let mut out = Vec::new();
    out.push(format!(
        "Network: {}   Block: {} ({})",
        report.network, report.tip_height, report.tip_hash
    ));
    out.push(format!("Policy window: {} blocks", report.policy_window));
    out.push(format!(
        "Added to treasury in window: {}   Spent in window: {}",
        report.added, report.spent
    ));
    out.push(format!("Total Treasury Balance: {}", report.total_balance));
    out.push(format!("Current Spendable Balance: {}", report.spendable_now));
    out.push(String::new());

    if report.spends.is_empty() {
        out.push("No tspends within policy window".to_string());
    } else {
        let rows: Vec<SpendRow> = report
            .spends
            .iter()
            .map(|p| SpendRow {
                mined: p.spend.mined_height,
                amount: p.spend.amount.to_string(),
                leaves: p.leave_height,
                blocks_left: format!(
                    "{} {}",
                    p.blocks_to_leave,
                    plural(p.blocks_to_leave, "block", "blocks")
                ),
                time_left: format_duration(p.time_to_leave),
                spendable_after: p.projected_spendable.to_string(),
                hash: p.spend.hash.to_string(),
            })
            .collect();
        out.push(format_table(&rows));
        for p in &report.spends {
            if let Some(blocks) = p.blocks_to_maturity {
                out.push(format!(
                    "NOTE: TSpend {} is not yet reflected in the total treasury balance ({} {} to maturity)",
                    p.spend.hash,
                    blocks,
                    plural(blocks as i64, "block", "blocks")
                ));
            }
        }
    }

    let new = &report.new_spend;
    out.push(String::new());
    out.push(format!(
        "Estimated new TSpend expiry: {} ({} from now)",
        new.expiry,
        format_duration(new.time_to_expiry)
    ));
    out.push(format!(
        "Estimated spendable amount at block {}: {}",
        new.vote_end, new.projected_spendable
    ));
    out.push(String::new());
    out.push(
        "Note: estimation is solely based on treasury bases added to the treasury and does not \
         account for any treasury adds or any new treasury spends included in the blockchain or \
         currently in the mempool."
            .to_string(),
    );
    out.join("\n")
}

/// Run the estimate command.
pub async fn run(
    ctx: &Context,
    cmd: &EstimateCmd,
    cancel: &CancellationToken,
) -> Result<(), TspendError> {
    let client = ctx.connect(cancel).await?;
    let projector = BalanceProjector::new(&client, &ctx.params, cancel.clone());
    let report = projector.project(cmd.height).await?;

    let text = match OutputFormat::from_json_flag(cmd.json) {
        OutputFormat::Json => format_json(&report)?,
        OutputFormat::Text => render_text(&report),
    };
    write_out(None, &text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tspend_core::{Amount, Hash};
    use tspend_economics::{HistoricalSpend, NewSpendProjection, SpendProjection};

    fn report(spends: Vec<SpendProjection>) -> BalanceReport {
        BalanceReport {
            network: "simnet".to_string(),
            tip_height: 300,
            tip_hash: Hash::ZERO,
            policy_window: 256,
            added: Amount(256_000),
            spent: Amount(5_000),
            total_balance: Amount(1_000_000),
            spendable_now: Amount(379_000),
            spends,
            new_spend: NewSpendProjection {
                expiry: 370,
                vote_end: 368,
                time_to_expiry: Duration::from_secs(70),
                projected_spendable: Amount(384_000),
            },
        }
    }

    #[test]
    fn test_render_without_spends() {
        let text = render_text(&report(Vec::new()));
        assert!(text.contains("No tspends within policy window"));
        assert!(text.contains("Estimated new TSpend expiry: 370 (0h1m from now)"));
        assert!(text.contains("at block 368"));
    }

    #[test]
    fn test_render_spend_with_maturity_note() {
        let spend = SpendProjection {
            spend: HistoricalSpend {
                hash: Hash::ZERO,
                mined_hash: Hash::ZERO,
                mined_height: 290,
                amount: Amount(5_000),
            },
            leave_height: 546,
            blocks_to_leave: 246,
            time_to_leave: Duration::from_secs(246),
            projected_spendable: Amount(384_000),
            blocks_to_maturity: Some(6),
        };
        let text = render_text(&report(vec![spend]));
        assert!(text.contains("546"));
        assert!(text.contains("246 blocks"));
        assert!(text.contains("(6 blocks to maturity)"));
    }

    #[test]
    fn test_json_report() {
        let json = format_json(&report(Vec::new())).unwrap();
        let v: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(v["new_spend"]["expiry"], 370);
        assert_eq!(v["new_spend"]["time_to_expiry"], 70);
        assert_eq!(v["spendable_now"], 379_000);
    }
}
