// crates/tspend-cli/src/main.rs
//
// CLI entrypoint for the treasury spend tools.
//
// Provides subcommands for generating and publishing a tspend, estimating
// the spendable treasury balance, tracking vote progress of mempool tspends,
// and computing the expiry for a height.

mod commands;
mod config;
mod keys;
mod output;
mod payouts;

use clap::{Parser, Subcommand};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use commands::estimate::EstimateCmd;
use commands::expiry::ExpiryCmd;
use commands::gen::GenCmd;
use commands::progress::ProgressCmd;
use config::{Context, FileConfig, GlobalOpts};
use tspend_core::TspendError;

/// Treasury spend tools.
#[derive(Parser, Debug)]
#[command(
    name = "tspend",
    version = "0.1.0",
    about = "Generate treasury spends and track treasury balance and votes"
)]
struct Cli {
    #[command(flatten)]
    global: GlobalOpts,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level subcommands.
#[derive(Debug, Subcommand)]
enum Commands {
    /// Build and sign a tspend, optionally publishing it.
    Gen(GenCmd),

    /// Estimate the spendable treasury balance.
    Estimate(EstimateCmd),

    /// Show vote progress for tspends in the mempool.
    Progress(ProgressCmd),

    /// Compute the tspend expiry for a mined height (offline).
    Expiry(ExpiryCmd),
}

/// Log filter precedence: --debuglevel, then RUST_LOG, then the config file.
fn init_tracing(debuglevel: Option<&str>, file_level: &str) -> Result<(), TspendError> {
    let filter = match debuglevel {
        Some(level) => EnvFilter::try_new(level).map_err(|e| {
            TspendError::Config(format!("the specified debug level [{}] is invalid: {}", level, e))
        })?,
        None => match EnvFilter::try_from_default_env() {
            Ok(filter) => filter,
            Err(_) => EnvFilter::try_new(file_level).map_err(|e| {
                TspendError::Config(format!(
                    "the configured log level [{}] is invalid: {}",
                    file_level, e
                ))
            })?,
        },
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
    Ok(())
}

async fn run(cli: Cli) -> Result<(), TspendError> {
    let file = FileConfig::load_or_default(cli.global.configfile.as_deref())?;
    init_tracing(cli.global.debuglevel.as_deref(), &file.log_level)?;
    let ctx = Context::build(&cli.global, &file)?;
    tracing::debug!("Network: {}", ctx.network);

    // Ctrl-C cancels whatever request is in flight.
    let cancel = CancellationToken::new();
    let token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received interrupt, shutting down");
            token.cancel();
        }
    });

    match cli.command {
        Commands::Gen(cmd) => commands::gen::run(&ctx, cmd, &cancel).await,
        Commands::Estimate(cmd) => commands::estimate::run(&ctx, &cmd, &cancel).await,
        Commands::Progress(cmd) => commands::progress::run(&ctx, &cmd, &cancel).await,
        Commands::Expiry(cmd) => commands::expiry::run(&ctx, &cmd),
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_gen_flags() {
        let cli = Cli::try_parse_from([
            "tspend",
            "--testnet",
            "gen",
            "--address",
            "Tsaaaa",
            "--amount",
            "100",
            "--address",
            "Tsbbbb",
            "--amount",
            "200",
            "-c",
            "5000",
            "--deterministic",
        ])
        .unwrap();
        assert!(cli.global.testnet);
        match cli.command {
            Commands::Gen(cmd) => {
                assert_eq!(cmd.addresses, vec!["Tsaaaa", "Tsbbbb"]);
                assert_eq!(cmd.amounts, vec![100, 200]);
                assert_eq!(cmd.currentheight, Some(5000));
                assert_eq!(cmd.feerate, 10_000);
                assert!(cmd.deterministic);
            }
            other => panic!("unexpected command {:?}", other),
        }
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["tspend", "expiry", "1000", "--simnet", "--json"]).unwrap();
        assert!(cli.global.simnet);
        assert!(matches!(cli.command, Commands::Expiry(ExpiryCmd { height: 1000, json: true })));
    }

    #[test]
    fn test_csv_conflicts_with_pairs() {
        let res = Cli::try_parse_from([
            "tspend", "gen", "--csv", "p.csv", "--address", "Dsaaaa", "--amount", "1",
        ]);
        assert!(res.is_err());
    }
}
