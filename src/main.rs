//! Swap Advisor CLI
//!
//! One-shot access to the route optimizer and risk scorer. Every command
//! prints its result as JSON on stdout; logs go to stderr.
//!
//! Examples:
//!   swap_advisor route WETH DAI 1 --max-hops 2
//!   swap_advisor impact WETH USDC --amounts 1,10,100
//!   swap_advisor analyze --to 0x7a25... --data 0x095ea7b3...
//!   swap_advisor check-address 0x1f9840a85d5af5bf1d1762f925bdaddc4201f984
//!   swap_advisor advise ETH USDC 1.5 --sender 0x...

use clap::{Parser, Subcommand};
use eyre::Result;
use serde::Serialize;
use std::path::PathBuf;
use swap_advisor::models::types::NumericField;
use swap_advisor::{AdviseRequest, Advisor, AdvisorConfig, RawTransaction};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser, Debug)]
#[command(
    name = "swap_advisor",
    version,
    about = "Swap route optimizer and pre-signing risk scorer"
)]
struct Cli {
    /// Pool registry JSON (overrides ADVISOR_POOLS_FILE)
    #[arg(long, global = true)]
    pools: Option<PathBuf>,

    /// Reputation table JSON (overrides ADVISOR_REPUTATION_FILE)
    #[arg(long, global = true)]
    reputation: Option<PathBuf>,

    /// Signature table JSON (overrides ADVISOR_SIGNATURES_FILE)
    #[arg(long, global = true)]
    signatures: Option<PathBuf>,

    /// Single-line JSON output
    #[arg(long, global = true)]
    compact: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Find the lowest-cost route between two assets
    Route {
        source: String,
        destination: String,
        amount: f64,
        #[arg(long)]
        max_hops: Option<usize>,
    },
    /// Price impact of the best route across several amounts
    Impact {
        source: String,
        destination: String,
        #[arg(long, value_delimiter = ',', default_values_t = vec![1.0, 10.0, 100.0, 1000.0])]
        amounts: Vec<f64>,
        #[arg(long)]
        max_hops: Option<usize>,
    },
    /// Score a transaction before signing it
    Analyze {
        #[arg(long)]
        to: String,
        #[arg(long)]
        from: Option<String>,
        /// Native value in wei (decimal or 0x)
        #[arg(long)]
        value: Option<String>,
        /// Calldata hex
        #[arg(long)]
        data: Option<String>,
        #[arg(long)]
        gas: Option<u64>,
        /// Gas price in wei (decimal or 0x)
        #[arg(long)]
        gas_price: Option<String>,
    },
    /// Reputation check for a single address
    CheckAddress { address: String },
    /// Route, build the swap transaction and score it
    Advise {
        source: String,
        destination: String,
        amount: f64,
        #[arg(long)]
        max_hops: Option<usize>,
        /// Wallet that signs and receives the output
        #[arg(long)]
        sender: Option<String>,
    },
}

fn main() -> Result<()> {
    FmtSubscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact()
        .init();

    let cli = Cli::parse();

    let mut config = AdvisorConfig::from_env()?;
    if cli.pools.is_some() {
        config.pools_file = cli.pools.clone();
    }
    if cli.reputation.is_some() {
        config.reputation_file = cli.reputation.clone();
    }
    if cli.signatures.is_some() {
        config.signatures_file = cli.signatures.clone();
    }

    let advisor = Advisor::from_config(config)?;

    match cli.command {
        Command::Route {
            source,
            destination,
            amount,
            max_hops,
        } => {
            let outcome = advisor.find_best_route(&source, &destination, amount, max_hops)?;
            print_json(&outcome, cli.compact)
        }
        Command::Impact {
            source,
            destination,
            amounts,
            max_hops,
        } => {
            let simulation =
                advisor.simulate_price_impact(&source, &destination, &amounts, max_hops)?;
            print_json(&simulation, cli.compact)
        }
        Command::Analyze {
            to,
            from,
            value,
            data,
            gas,
            gas_price,
        } => {
            let raw = RawTransaction {
                to: Some(to),
                from,
                value: value.map(NumericField::Text),
                data,
                gas: gas.map(NumericField::from),
                gas_price: gas_price.map(NumericField::Text),
            };
            let assessment = advisor.analyze(raw)?;
            print_json(&assessment, cli.compact)
        }
        Command::CheckAddress { address } => {
            let assessment = advisor.check_address(&address)?;
            print_json(&assessment, cli.compact)
        }
        Command::Advise {
            source,
            destination,
            amount,
            max_hops,
            sender,
        } => {
            let advisory = advisor.advise(&AdviseRequest {
                source,
                destination,
                amount,
                max_hops,
                sender,
            })?;
            print_json(&advisory, cli.compact)
        }
    }
}

fn print_json<T: Serialize>(value: &T, compact: bool) -> Result<()> {
    let out = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    println!("{}", out);
    Ok(())
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
    fn test_parse_impact_amounts() {
        let cli = Cli::parse_from([
            "swap_advisor",
            "impact",
            "WETH",
            "USDC",
            "--amounts",
            "1,5,25",
        ]);
        match cli.command {
            Command::Impact { amounts, .. } => assert_eq!(amounts, vec![1.0, 5.0, 25.0]),
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_check_address() {
        let cli = Cli::parse_from(["swap_advisor", "check-address", "0xabc", "--compact"]);
        assert!(cli.compact);
        assert!(matches!(cli.command, Command::CheckAddress { .. }));
    }
}
