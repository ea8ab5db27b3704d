// crates/tspend-cli/src/commands/gen.rs
//
// `tspend gen`: build, sign and optionally publish a treasury spend.
//
// The hex encoded transaction goes to stdout (or --out); the report is
// logged to stderr.

use std::path::PathBuf;

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use zeroize::Zeroizing;

use tspend_builder::{
    publish, BuildRequest, BuiltTspend, ExpirySource, OpReturnPolicy, PublishOutcome, TxBuilder,
};
use tspend_core::cancel::cancellable;
use tspend_core::policy::DEFAULT_RELAY_FEE_PER_KB;
use tspend_core::{ChainSource, TspendError};

use crate::config::Context;
use crate::keys::KeySource;
use crate::output::write_out;
use crate::payouts::{load_csv, payouts_from_flags};

#[derive(Args, Debug, Clone, Default)]
pub struct GenCmd {
    /// Fee rate for the tspend in atoms/kB.
    #[arg(long, default_value_t = DEFAULT_RELAY_FEE_PER_KB)]
    pub feerate: i64,

    /// Expiry to use as is.
    #[arg(long)]
    pub expiry: Option<u32>,

    /// Current blockchain height to derive the expiry from, instead of
    /// asking the node.
    #[arg(short = 'c', long)]
    pub currentheight: Option<u64>,

    /// Address to pay. Repeat with --amount; counts must match.
    #[arg(long = "address")]
    pub addresses: Vec<String>,

    /// Amount to pay in atoms. Repeat with --address.
    #[arg(long = "amount", allow_negative_numbers = true)]
    pub amounts: Vec<i64>,

    /// CSV file of `address,amount` records (amount in coins).
    #[arg(long, conflicts_with_all = ["addresses", "amounts"])]
    pub csv: Option<PathBuf>,

    /// OP_RETURN data (hex). Random data if unspecified. Extra hash input in
    /// deterministic mode.
    #[arg(long)]
    pub opreturndata: Option<String>,

    /// Derive the OP_RETURN data from the payouts so independent signers
    /// produce the same transaction.
    #[arg(long)]
    pub deterministic: bool,

    /// Hex private key to sign with, or "-" to read it from stdin.
    #[arg(long)]
    pub privkey: Option<String>,

    /// File holding the hex private key.
    #[arg(long)]
    pub privkeyfile: Option<PathBuf>,

    /// Publish the tspend to the node.
    #[arg(long)]
    pub publish: bool,

    /// Write the transaction hex to this file instead of stdout.
    #[arg(long)]
    pub out: Option<PathBuf>,

    /// Dump the decoded transaction.
    #[arg(long)]
    pub spew: bool,
}

impl GenCmd {
    /// Zero means "not given" for both height flags.
    fn explicit_expiry(&self) -> Option<u32> {
        self.expiry.filter(|e| *e != 0)
    }

    fn current_height(&self) -> Option<u64> {
        self.currentheight.filter(|h| *h != 0)
    }

    /// Whether the node must be contacted: to learn the tip height or to
    /// publish.
    pub fn needs_node(&self) -> bool {
        let needs_best_height = self.explicit_expiry().is_none() && self.current_height().is_none();
        needs_best_height || self.publish
    }
}

/// Report lines for a built (and possibly published) tspend.
pub fn report_lines(
    built: &BuiltTspend,
    outcome: Option<PublishOutcome>,
    host: &str,
) -> Vec<String> {
    let mut lines = vec![
        format!("TSpend Hash: {}", built.hash),
        format!("TSpend PubKey: {}", built.signer),
        format!("Expiry: {}", built.expiry),
    ];
    if let Some((start, end)) = built.vote_window {
        lines.push(format!("Voting interval: {} - {}", start, end));
    }
    lines.push(format!("Total output amount: {}", built.total_payout));
    lines.push(format!("Total tx size: {} bytes", built.size));
    lines.push(format!("Total fees: {}", built.fee));
    match outcome {
        Some(PublishOutcome::Published(_)) => {
            lines.push(format!("Published TSpend to node at {}", host))
        }
        Some(PublishOutcome::Duplicate) => {
            lines.push(format!("Generated duplicated TSpend at node {}", host))
        }
        None => {}
    }
    lines
}

/// Run the gen command. Takes the command by value so the key given on the
/// command line is moved into a zeroizing buffer instead of copied.
pub async fn run(
    ctx: &Context,
    mut cmd: GenCmd,
    cancel: &CancellationToken,
) -> Result<(), TspendError> {
    let privkey = cmd.privkey.take().map(Zeroizing::new);

    if cmd.feerate < 0 {
        return Err(TspendError::Config(format!(
            "fee rate must not be negative ({})",
            cmd.feerate
        )));
    }

    let payouts = match &cmd.csv {
        Some(path) => load_csv(path, &ctx.params)?,
        None => payouts_from_flags(&cmd.addresses, &cmd.amounts, &ctx.params)?,
    };
    if payouts.is_empty() {
        return Err(TspendError::Config(
            "at least one payout must be specified".to_string(),
        ));
    }
    let op_return = OpReturnPolicy::from_flags(cmd.opreturndata.as_deref(), cmd.deterministic)?;

    let key_source = KeySource::from_flags(
        privkey,
        cmd.privkeyfile.as_deref(),
        ctx.network,
    )?;
    if let KeySource::File(path) = &key_source {
        if !path.exists() {
            return Err(TspendError::Config(format!(
                "private key file {} does not exist",
                path.display()
            )));
        }
    }

    let client = if cmd.needs_node() {
        Some(ctx.connect(cancel).await?)
    } else {
        None
    };

    let expiry = match (cmd.explicit_expiry(), cmd.current_height(), &client) {
        (Some(expiry), _, _) => ExpirySource::Explicit(expiry),
        (None, Some(height), _) => ExpirySource::Height(height),
        (None, None, Some(chain)) => {
            let best = cancellable(cancel, chain.best_block()).await?;
            debug!("Best block: Height {} Hash {}", best.height, best.hash);
            ExpirySource::Height(best.height)
        }
        (None, None, None) => {
            return Err(TspendError::Config(
                "no expiry, current height or node to derive one from".to_string(),
            ))
        }
    };

    let req = BuildRequest {
        payouts,
        fee_rate_per_kb: cmd.feerate,
        expiry,
        op_return,
    };
    let secret = key_source.read()?;
    let built = TxBuilder::new(&ctx.params).build(&req, secret)?;

    let outcome = match (&client, cmd.publish) {
        (Some(chain), true) => Some(publish(chain, &built.tx, cancel).await?),
        _ => None,
    };

    write_out(cmd.out.as_deref(), &built.to_hex())?;

    if cmd.spew {
        info!("{:#?}", built.tx);
    }
    for line in report_lines(&built, outcome, &ctx.rpc_host) {
        info!("{}", line);
    }
    if !built.is_pi_key {
        warn!("Private key does not correspond to a public Pi Key for the specified chain");
    }

    Ok(())
}
