//! pocdeploy deploys the POC token and its auction contract, then reports POC balances.

mod cli;

use std::{
    collections::BTreeSet,
    path::{Path, PathBuf},
};

use alloy_core::primitives::Address;
use anyhow::{Context, Result};
use clap::Parser;

use cli::{Cli, Command, DeployArgs, InitArgs, InspectArgs, ReportFormat};
use pocdeploy_core::{
    ArtifactStore, CONFIG_FILENAME, ChainClient, DeployConfig, DeploymentRecordStore, Inspector,
    NetworkContext, PocStepOptions, RpcChain, Sequencer, StoreAccess, inspection_accounts,
    poc_registry,
};

/// Everything a command needs to reach the selected network.
struct Target {
    network: String,
    chain: RpcChain,
    deployer: Option<Address>,
    deployments_dir: PathBuf,
    artifacts_dir: PathBuf,
}

impl Target {
    fn from_cli(cli: &Cli, config: &DeployConfig) -> Result<Self> {
        let network = cli
            .network
            .clone()
            .unwrap_or_else(|| config.default_network.clone());

        let (url, deployer) = match (&cli.rpc_url, config.network(&network)) {
            (Some(url), configured) => (url.clone(), configured.ok().and_then(|n| n.deployer)),
            (None, configured) => {
                let configured = configured?;
                (configured.url.clone(), configured.deployer)
            }
        };

        tracing::debug!(network = %network, rpc_url = %url, "Selected network");

        Ok(Self {
            chain: RpcChain::new(url, config.receipt_timeout())?,
            network,
            deployer,
            deployments_dir: cli
                .deployments_dir
                .clone()
                .unwrap_or_else(|| config.deployments_dir.clone()),
            artifacts_dir: cli
                .artifacts_dir
                .clone()
                .unwrap_or_else(|| config.artifacts_dir.clone()),
        })
    }
}

async fn deploy(target: &Target, args: &DeployArgs) -> Result<()> {
    let network =
        NetworkContext::resolve(&target.network, &target.chain, args.deployer.or(target.deployer))
            .await?;

    let mut store = DeploymentRecordStore::open(
        &target.deployments_dir,
        &network.name,
        network.chain_id,
        StoreAccess::ReadWrite,
    )?;

    if args.reset {
        store.clear()?;
    }

    let registry = poc_registry(
        ArtifactStore::new(&target.artifacts_dir),
        &PocStepOptions {
            skip_unchanged: args.skip_unchanged,
        },
    )?;

    let tags: BTreeSet<String> = args.tags.iter().cloned().collect();
    let selected = (!tags.is_empty()).then_some(&tags);

    let deployed = Sequencer::new(&registry, &mut store, &network, &target.chain)
        .run(selected)
        .await
        .context("Deployment aborted")?;

    tracing::info!("✓ Deployment complete!");
    for record in &deployed {
        tracing::info!("{:<12} {}", record.name, record.address);
    }
    if let Some(dir) = store.dir() {
        tracing::info!("Records written to {}", dir.display());
    }

    Ok(())
}

async fn inspect(target: &Target, args: &InspectArgs) -> Result<()> {
    let chain_id = target
        .chain
        .chain_id()
        .await
        .with_context(|| format!("Failed to query chain id of network {}", target.network))?;

    let store = DeploymentRecordStore::open(
        &target.deployments_dir,
        &target.network,
        chain_id,
        StoreAccess::ReadOnly,
    )?;

    let accounts = inspection_accounts(&target.chain, &args.accounts).await?;

    let report = Inspector::new(&store, &target.chain)
        .inspect(&accounts)
        .await
        .context("Inspection aborted")?;

    match args.format {
        ReportFormat::Table => println!("{report}"),
        ReportFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report.to_json())
                .context("Failed to serialize inspection report")?
        ),
    }

    if !report.is_success() {
        for (account, err) in report.failures() {
            tracing::error!(account = %account, "{err}");
        }
        anyhow::bail!(
            "{} of {} balance queries failed",
            report.failure_count(),
            report.balances.len()
        );
    }

    Ok(())
}

fn init(config_path: Option<&Path>, config: &DeployConfig, args: &InitArgs) -> Result<()> {
    let path = config_path
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from(CONFIG_FILENAME));
    let path = if path.is_dir() {
        path.join(CONFIG_FILENAME)
    } else {
        path
    };

    if path.exists() && !args.force {
        anyhow::bail!(
            "{} already exists; pass --force to overwrite it",
            path.display()
        );
    }

    config.save_to_file(&path)
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize the logger.
    tracing_subscriber::fmt()
        .with_max_level(cli.verbosity)
        .init();

    let config = DeployConfig::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Init(args) => init(cli.config.as_deref(), &config, args),
        Command::Deploy(args) => deploy(&Target::from_cli(&cli, &config)?, args).await,
        Command::Inspect(args) => inspect(&Target::from_cli(&cli, &config)?, args).await,
    }
}

#[cfg(test)]
mod tests {
    use pocdeploy_core::DEFAULT_NETWORK;
    use tempdir::TempDir;

    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("pocdeploy").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_init_writes_loadable_config() {
        let dir = TempDir::new("pocdeploy-init").unwrap();
        let config = DeployConfig::default();

        init(Some(dir.path()), &config, &InitArgs { force: false }).unwrap();

        let loaded = DeployConfig::load(Some(dir.path())).unwrap();
        assert_eq!(loaded.default_network, config.default_network);
        assert_eq!(loaded.networks.len(), config.networks.len());
    }

    #[test]
    fn test_init_refuses_to_overwrite_without_force() {
        let dir = TempDir::new("pocdeploy-init").unwrap();
        let path = dir.path().join(CONFIG_FILENAME);
        std::fs::write(&path, "default_network = \"localhost\"\n").unwrap();
        let config = DeployConfig::default();

        assert!(init(Some(&path), &config, &InitArgs { force: false }).is_err());
        init(Some(&path), &config, &InitArgs { force: true }).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().contains("[networks"));
    }

    #[test]
    fn test_rpc_url_overrides_configured_network() {
        let cli = parse(&["--rpc-url", "http://10.0.0.1:8545", "inspect"]);
        let target = Target::from_cli(&cli, &DeployConfig::default()).unwrap();

        assert_eq!(target.network, DEFAULT_NETWORK);
        assert_eq!(target.chain.url().as_str(), "http://10.0.0.1:8545/");
    }

    #[test]
    fn test_unknown_network_without_rpc_url_fails() {
        let cli = parse(&["--network", "mainnet", "inspect"]);
        assert!(Target::from_cli(&cli, &DeployConfig::default()).is_err());
    }

    #[test]
    fn test_cli_dirs_override_config() {
        let cli = parse(&[
            "--deployments-dir",
            "out/deployments",
            "--artifacts-dir",
            "out/artifacts",
            "deploy",
        ]);
        let target = Target::from_cli(&cli, &DeployConfig::default()).unwrap();

        assert_eq!(target.deployments_dir, PathBuf::from("out/deployments"));
        assert_eq!(target.artifacts_dir, PathBuf::from("out/artifacts"));
    }
}
