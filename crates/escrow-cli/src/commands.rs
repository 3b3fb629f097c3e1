use std::path::Path;

use anyhow::Context;
use colored::Colorize;
use escrow_ledger::{InMemoryLedger, LedgerConfig};

use crate::cli::*;
use crate::scenario::{self, Outcome, TradeReport};

pub fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = load_config(cli.config.as_deref())?;
    match cli.command {
        Command::Trade(args) => cmd_trade(config, args, cli.format),
        Command::Config => cmd_config(&config, cli.format),
    }
}

fn load_config(path: Option<&Path>) -> anyhow::Result<LedgerConfig> {
    let Some(path) = path else {
        return Ok(LedgerConfig::default());
    };
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;
    let config = toml::from_str(&text)
        .with_context(|| format!("parsing config file {}", path.display()))?;
    tracing::debug!(path = %path.display(), "loaded ledger config");
    Ok(config)
}

fn cmd_trade(config: LedgerConfig, args: TradeArgs, format: OutputFormat) -> anyhow::Result<()> {
    let ledger = InMemoryLedger::new(config);
    let report = scenario::run(&ledger, args.scenario, args.custodian)?;
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => print_report(&report),
    }
    Ok(())
}

fn print_report(report: &TradeReport) {
    println!("Trade scenario {}", report.scenario.bold());
    for party in &report.parties {
        let short = party.address.get(..16).unwrap_or(&party.address);
        println!("  {:<6} {}", party.name.cyan(), short.dimmed());
    }
    println!();
    for step in &report.steps {
        match &step.outcome {
            Outcome::Committed { effects } => {
                println!(
                    "  {} {:<6} {:<20} {}",
                    "✓".green(),
                    step.actor.cyan(),
                    step.action,
                    format!("tx {}", effects.digest.short_hex()).dimmed()
                );
            }
            Outcome::Aborted { reason } => {
                println!(
                    "  {} {:<6} {:<20} {}",
                    "✗".red().bold(),
                    step.actor.cyan(),
                    step.action,
                    reason.red()
                );
            }
        }
    }
    println!();
    for holding in &report.holdings {
        println!("  {:<8} owned by {}", holding.asset, holding.owner.yellow().bold());
    }
}

fn cmd_config(config: &LedgerConfig, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(config)?),
        OutputFormat::Text => print!("{}", toml::to_string_pretty(config)?),
    }
    Ok(())
}
