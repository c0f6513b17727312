use std::path::PathBuf;

use alloy_core::primitives::Address;
use clap::{Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use url::Url;

/// Output format of the inspection report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ReportFormat {
    Table,
    Json,
}

#[derive(Parser)]
#[command(name = "pocdeploy")]
#[command(
    author,
    version,
    about = "Deploy the POC token and its auction, and inspect POC balances"
)]
pub struct Cli {
    /// The verbosity level.
    #[arg(short, long, global = true, env = "POCDEPLOY_VERBOSITY", default_value_t = LevelFilter::INFO)]
    pub verbosity: LevelFilter,

    /// Path to a PocDeploy.toml configuration file (or the directory holding it).
    ///
    /// Defaults to ./PocDeploy.toml when it exists.
    #[arg(long, global = true, alias = "conf", env = "POCDEPLOY_CONFIG")]
    pub config: Option<PathBuf>,

    /// The network to target, as named in the configuration's `[networks]` table.
    #[arg(short, long, global = true, env = "POCDEPLOY_NETWORK")]
    pub network: Option<String>,

    /// Override the JSON-RPC URL of the selected network.
    #[arg(long, global = true, alias = "rpc", env = "POCDEPLOY_RPC_URL")]
    pub rpc_url: Option<Url>,

    /// Root directory of the per-network deployment records.
    #[arg(long, global = true, env = "POCDEPLOY_DEPLOYMENTS_DIR")]
    pub deployments_dir: Option<PathBuf>,

    /// Directory holding the compiled contract artifacts.
    #[arg(long, global = true, env = "POCDEPLOY_ARTIFACTS_DIR")]
    pub artifacts_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Deploy POC, then POCAuction with POC's address.
    Deploy(DeployArgs),
    /// Print the deployed contracts and each account's POC balance.
    Inspect(InspectArgs),
    /// Write a starter PocDeploy.toml.
    Init(InitArgs),
}

#[derive(Debug, Args)]
pub struct DeployArgs {
    /// Only run the steps carrying one of these tags (e.g. `POC`, `POCAuction`).
    #[arg(long, value_delimiter = ',', env = "POCDEPLOY_TAGS")]
    pub tags: Vec<String>,

    /// Drop the network's existing deployment records before running.
    #[arg(long, env = "POCDEPLOY_RESET")]
    pub reset: bool,

    /// Keep an existing deployment whose bytecode and constructor arguments are unchanged.
    #[arg(long, env = "POCDEPLOY_SKIP_UNCHANGED")]
    pub skip_unchanged: bool,

    /// Account to deploy from. Defaults to the configured deployer, then the node's first account.
    #[arg(long, env = "POCDEPLOY_DEPLOYER")]
    pub deployer: Option<Address>,
}

#[derive(Debug, Args)]
pub struct InspectArgs {
    /// Accounts to report. Defaults to every account of the node.
    #[arg(long, value_delimiter = ',')]
    pub accounts: Vec<Address>,

    /// Report format.
    #[arg(long, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,
}

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Overwrite an existing configuration file.
    #[arg(long)]
    pub force: bool,
}
