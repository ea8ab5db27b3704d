// crates/tspend-cli/src/commands/expiry.rs
//
// `tspend expiry`: offline expiry and voting window for a mined height.

use clap::Args;
use serde::Serialize;

use tspend_core::window::is_treasury_vote_interval;
use tspend_core::{ChainParams, ExpiryRule, Placement, TreasuryVoteRule, TspendError, WindowPolicy};

use crate::config::Context;
use crate::output::{format_json, write_out, OutputFormat};

#[derive(Args, Debug, Clone, Default)]
pub struct ExpiryCmd {
    /// Height of the last mined block. The expiry is computed for the
    /// block after it.
    pub height: u64,

    /// Print the result as JSON.
    #[arg(long)]
    pub json: bool,
}

/// Expiry information for one height.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ExpiryReport {
    pub chain: &'static str,
    pub tvi: u64,
    pub multiplier: u64,
    /// The height the calculation starts from (mined height + 1).
    pub next_height: u64,
    pub is_tvi: bool,
    pub blocks_to_tvi: u64,
    pub too_close_threshold: u64,
    /// Expiry and window without the too-close adjustment.
    pub expiry: u32,
    pub vote_start: u32,
    pub vote_end: u32,
    /// Set when the next height is too close to a TVI.
    pub advanced: Option<Placement>,
}

pub fn expiry_report(params: &ChainParams, height: u64) -> Result<ExpiryReport, TspendError> {
    let tvi = params.treasury_vote_interval;
    let mul = params.treasury_vote_interval_multiplier;
    let next_height = height + 1;

    let policy = WindowPolicy::new(params);
    let placement = policy.place(height)?;
    let expiry = TreasuryVoteRule.tspend_expiry(next_height, tvi, mul);
    let (vote_start, vote_end) = policy.window_for(expiry)?;

    Ok(ExpiryReport {
        chain: params.name,
        tvi,
        multiplier: mul,
        next_height,
        is_tvi: is_treasury_vote_interval(next_height, tvi),
        blocks_to_tvi: placement.blocks_to_tvi,
        too_close_threshold: placement.too_close_threshold,
        expiry,
        vote_start,
        vote_end,
        advanced: placement.advanced.then_some(placement),
    })
}

pub fn render_text(r: &ExpiryReport) -> String {
    let mut out = vec![
        format!("Chain: {} TVI {} MUL {}", r.chain, r.tvi, r.multiplier),
        format!("Height {}: IsTVI: {}", r.next_height, r.is_tvi),
        format!("To TVI: {} (thresh {})", r.blocks_to_tvi, r.too_close_threshold),
        format!("Expiry: {}", r.expiry),
        format!("Voting interval: {} - {}", r.vote_start, r.vote_end),
    ];
    if let Some(p) = &r.advanced {
        out.push(String::new());
        out.push("Height too close to TVI. Advancing to next one.".to_string());
        out.push(format!("Expiry: {}", p.expiry));
        out.push(format!("Voting interval: {} - {}", p.vote_start, p.vote_end));
    }
    out.join("\n")
}

/// Run the expiry command. Never touches the network.
pub fn run(ctx: &Context, cmd: &ExpiryCmd) -> Result<(), TspendError> {
    let report = expiry_report(&ctx.params, cmd.height)?;
    let text = match OutputFormat::from_json_flag(cmd.json) {
        OutputFormat::Json => format_json(&report)?,
        OutputFormat::Text => render_text(&report),
    };
    write_out(None, &text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mainnet_not_close() {
        let params = ChainParams::mainnet();
        let r = expiry_report(&params, 1000).unwrap();
        assert_eq!(r.next_height, 1001);
        assert!(!r.is_tvi);
        assert_eq!(r.blocks_to_tvi, 151);
        assert_eq!(r.too_close_threshold, 72);
        assert_eq!(r.expiry, 1152 + 3456 + 2);
        assert_eq!((r.vote_start, r.vote_end), (1152, 4608));
        assert!(r.advanced.is_none());
    }

    #[test]
    fn test_mainnet_too_close_advances() {
        let params = ChainParams::mainnet();
        let r = expiry_report(&params, 1098).unwrap();
        assert_eq!(r.next_height, 1099);
        assert_eq!(r.blocks_to_tvi, 53);
        assert_eq!(r.expiry, 4610);
        let adv = r.advanced.unwrap();
        assert_eq!(adv.next_height, 1152);
        assert_eq!(adv.expiry, 1440 + 3456 + 2);
        assert_eq!((adv.vote_start, adv.vote_end), (1440, 4896));

        let text = render_text(&r);
        assert!(text.contains("Advancing to next one"));
        assert!(text.contains("Voting interval: 1440 - 4896"));
    }

    #[test]
    fn test_next_height_on_tvi() {
        let params = ChainParams::simnet();
        let r = expiry_report(&params, 15).unwrap();
        assert_eq!(r.next_height, 16);
        assert!(r.is_tvi);
        assert_eq!(r.blocks_to_tvi, 16);
        assert_eq!(r.expiry, 32 + 64 + 2);
        assert!(r.advanced.is_none());
        assert!(render_text(&r).starts_with("Chain: simnet TVI 16 MUL 4"));
    }
}
