//! Contract deployment steps, and the POC / POCAuction step set.

use std::sync::Arc;

use futures::{FutureExt, future::BoxFuture};

use crate::{
    artifact::ArtifactStore,
    chain::DeployRequest,
    context::StepContext,
    contracts::{POC, POC_AUCTION},
    error::{DeployError, DeployResult},
    fingerprint::InitCode,
    record::{ConstructorArg, DeployedContract},
    registry::{DeploymentStep, StepAction, StepRegistry},
};

/// Where a constructor argument comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArgSource {
    /// A literal value.
    Value(ConstructorArg),
    /// The address recorded for another contract on the same network.
    AddressOf(String),
}

impl ArgSource {
    pub fn address_of(name: impl Into<String>) -> Self {
        Self::AddressOf(name.into())
    }

    fn resolve(&self, ctx: &StepContext<'_>) -> DeployResult<ConstructorArg> {
        match self {
            ArgSource::Value(value) => Ok(value.clone()),
            ArgSource::AddressOf(name) => Ok(ConstructorArg::Address(ctx.get(name)?.address)),
        }
    }
}

impl From<ConstructorArg> for ArgSource {
    fn from(value: ConstructorArg) -> Self {
        Self::Value(value)
    }
}

/// Deploys one compiled contract from the network's deployer account.
#[derive(Debug, Clone)]
pub struct ContractDeployment {
    artifact: String,
    args: Vec<ArgSource>,
    artifacts: Arc<ArtifactStore>,
    skip_unchanged: bool,
}

impl ContractDeployment {
    pub fn new(artifact: impl Into<String>, artifacts: Arc<ArtifactStore>) -> Self {
        Self {
            artifact: artifact.into(),
            args: Vec::new(),
            artifacts,
            skip_unchanged: false,
        }
    }

    pub fn arg(mut self, arg: impl Into<ArgSource>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Reuse the existing record when the init code is byte-identical to the
    /// one it was deployed from and the recorded address still holds code.
    pub fn skip_unchanged(mut self, skip: bool) -> Self {
        self.skip_unchanged = skip;
        self
    }

    /// Names of the records the constructor arguments read.
    pub fn dependencies(&self) -> Vec<String> {
        self.args
            .iter()
            .filter_map(|arg| match arg {
                ArgSource::AddressOf(name) => Some(name.clone()),
                ArgSource::Value(_) => None,
            })
            .collect()
    }

    async fn deploy(&self, ctx: StepContext<'_>) -> DeployResult<DeployedContract> {
        let args = self
            .args
            .iter()
            .map(|arg| arg.resolve(&ctx))
            .collect::<DeployResult<Vec<_>>>()?;

        let artifact = self
            .artifacts
            .load(&self.artifact)
            .map_err(|e| DeployError::action(ctx.step, e))?;
        let init_code = InitCode::new(&artifact.bytecode, &args);
        let fingerprint = init_code.fingerprint();

        if self.skip_unchanged {
            if let Ok(existing) = ctx.get(ctx.step) {
                if init_code.matches(existing) {
                    let code = ctx
                        .chain
                        .code(existing.address)
                        .await
                        .map_err(|e| DeployError::action(ctx.step, e))?;

                    if !code.is_empty() {
                        tracing::info!(
                            step = ctx.step,
                            address = %existing.address,
                            "Init code unchanged, reusing existing deployment"
                        );
                        return Ok(existing.clone());
                    }

                    tracing::warn!(
                        step = ctx.step,
                        address = %existing.address,
                        "Recorded contract has no code on chain, redeploying"
                    );
                }
            }
        }

        tracing::info!(
            step = ctx.step,
            artifact = %self.artifact,
            from = %ctx.deployer(),
            args = ?args,
            "Deploying contract..."
        );

        let receipt = ctx
            .chain
            .deploy(DeployRequest {
                from: ctx.deployer(),
                init_code: init_code.into_bytes().into(),
            })
            .await
            .map_err(|e| DeployError::action(ctx.step, e))?;

        tracing::info!(
            step = ctx.step,
            address = %receipt.contract_address,
            tx_hash = %receipt.transaction_hash,
            gas_used = ?receipt.gas_used,
            "Contract deployed"
        );

        Ok(DeployedContract::new(ctx.step, receipt.contract_address, args)
            .with_artifact(&self.artifact)
            .with_receipt(&receipt)
            .with_init_code_hash(fingerprint))
    }
}

impl StepAction for ContractDeployment {
    fn execute<'a>(&'a self, ctx: StepContext<'a>) -> BoxFuture<'a, DeployResult<DeployedContract>> {
        self.deploy(ctx).boxed()
    }
}

/// Options shared by the POC step set.
#[derive(Debug, Clone, Default)]
pub struct PocStepOptions {
    pub skip_unchanged: bool,
}

/// The POC token step: no constructor arguments, tag `POC`.
pub fn poc_step(artifacts: Arc<ArtifactStore>, options: &PocStepOptions) -> DeploymentStep {
    let action = ContractDeployment::new(POC, artifacts).skip_unchanged(options.skip_unchanged);
    DeploymentStep::new(POC, action).tags([POC])
}

/// The POCAuction step: constructed with the POC address, tag `POCAuction`.
pub fn poc_auction_step(artifacts: Arc<ArtifactStore>, options: &PocStepOptions) -> DeploymentStep {
    let action = ContractDeployment::new(POC_AUCTION, artifacts)
        .arg(ArgSource::address_of(POC))
        .skip_unchanged(options.skip_unchanged);
    let dependencies = action.dependencies();
    DeploymentStep::new(POC_AUCTION, action)
        .tags([POC_AUCTION])
        .depends_on(dependencies)
}

/// Registry holding the POC and POCAuction steps.
pub fn poc_registry(artifacts: ArtifactStore, options: &PocStepOptions) -> DeployResult<StepRegistry> {
    let artifacts = Arc::new(artifacts);
    let mut registry = StepRegistry::new();
    registry.register(poc_step(artifacts.clone(), options))?;
    registry.register(poc_auction_step(artifacts, options))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_poc_registry_layout() {
        let registry =
            poc_registry(ArtifactStore::new("artifacts"), &PocStepOptions::default()).unwrap();
        let order: Vec<_> = registry
            .execution_order()
            .unwrap()
            .into_iter()
            .map(|step| step.name().to_string())
            .collect();

        assert_eq!(order, vec![POC, POC_AUCTION]);
        assert!(registry.get(POC).unwrap().tag_set().contains(POC));
        assert!(registry.get(POC_AUCTION).unwrap().tag_set().contains(POC_AUCTION));
        assert_eq!(registry.get(POC_AUCTION).unwrap().dependencies(), &[POC.to_string()]);
        assert!(registry.get(POC).unwrap().dependencies().is_empty());
    }

    #[test]
    fn test_dependencies_come_from_address_args() {
        let action = ContractDeployment::new("Thing", Arc::new(ArtifactStore::new("artifacts")))
            .arg(ConstructorArg::Bool(true))
            .arg(ArgSource::address_of("POC"));

        assert_eq!(action.dependencies(), vec!["POC".to_string()]);
    }
}
