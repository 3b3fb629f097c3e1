use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use escrow_types::Address;

#[derive(Parser)]
#[command(
    name = "escrow",
    about = "Two-party atomic swaps through a custodian",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Ledger configuration file (TOML)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Clone, Copy, Debug, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run a trade between Alice and Bob with Carol as custodian
    Trade(TradeArgs),
    /// Print the effective ledger configuration
    Config,
}

#[derive(Args)]
pub struct TradeArgs {
    /// Which variant of the trade to run
    #[arg(long, default_value = "matched")]
    pub scenario: Scenario,

    /// Custodian address (64 hex chars); a fresh one is generated if omitted
    #[arg(long, value_parser = parse_address)]
    pub custodian: Option<Address>,
}

fn parse_address(s: &str) -> Result<Address, String> {
    Address::from_hex(s).map_err(|e| e.to_string())
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum Scenario {
    /// Both proposals name each other; the swap settles
    Matched,
    /// Alice names the wrong counterparty; the swap is rejected
    WrongRecipient,
    /// Alice asks for an asset Bob never escrowed; the swap is rejected
    WrongExchangeKey,
    /// Carol cancels both proposals instead of settling
    Abort,
}

impl std::fmt::Display for Scenario {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Matched => write!(f, "matched"),
            Self::WrongRecipient => write!(f, "wrong-recipient"),
            Self::WrongExchangeKey => write!(f, "wrong-exchange-key"),
            Self::Abort => write!(f, "abort"),
        }
    }
}
