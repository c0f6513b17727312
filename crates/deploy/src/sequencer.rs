//! Runs registered steps one at a time against a network.

use std::collections::BTreeSet;

use crate::{
    chain::ChainClient,
    context::{NetworkContext, StepContext},
    error::{DeployError, DeployResult},
    record::DeployedContract,
    registry::StepRegistry,
    store::DeploymentRecordStore,
};

/// Applies the steps of a [`StepRegistry`] in dependency order, recording each
/// result in the store before the next step starts.
pub struct Sequencer<'a> {
    registry: &'a StepRegistry,
    store: &'a mut DeploymentRecordStore,
    network: &'a NetworkContext,
    chain: &'a dyn ChainClient,
}

impl<'a> Sequencer<'a> {
    pub fn new(
        registry: &'a StepRegistry,
        store: &'a mut DeploymentRecordStore,
        network: &'a NetworkContext,
        chain: &'a dyn ChainClient,
    ) -> Self {
        Self {
            registry,
            store,
            network,
            chain,
        }
    }

    /// Run every step, or only the steps carrying one of `selected_tags`.
    ///
    /// Returns the records produced, in execution order. The first failure
    /// aborts the run; records written by earlier steps are kept.
    pub async fn run(
        &mut self,
        selected_tags: Option<&BTreeSet<String>>,
    ) -> DeployResult<Vec<DeployedContract>> {
        let order = self.registry.execution_order()?;
        let selected: Vec<_> = order
            .into_iter()
            .filter(|step| selected_tags.is_none_or(|tags| step.matches_tags(tags)))
            .collect();

        tracing::info!(
            network = %self.network.name,
            steps = ?selected.iter().map(|step| step.name()).collect::<Vec<_>>(),
            "Starting deployment run"
        );

        let mut deployed = Vec::with_capacity(selected.len());

        for step in selected {
            if let Some(missing) = step
                .dependencies()
                .iter()
                .find(|dep| !self.store.contains(dep))
            {
                tracing::error!(step = step.name(), dependency = %missing, "Dependency has not been deployed");
                return Err(DeployError::NotFound {
                    name: missing.clone(),
                    network: self.network.name.clone(),
                });
            }

            tracing::info!(step = step.name(), "Running deployment step...");

            let ctx = StepContext::new(step.name(), self.network, self.chain, self.store);
            let record = match step.action().execute(ctx).await {
                Ok(record) => record,
                Err(err) => {
                    tracing::error!(step = step.name(), error = %err, "Deployment step failed");
                    return Err(err);
                }
            };

            tracing::info!(
                step = step.name(),
                address = %record.address,
                tx_hash = ?record.transaction_hash,
                "✓ Deployment step complete"
            );

            self.store.put(step.name(), record.clone())?;
            deployed.push(record);
        }

        tracing::info!(network = %self.network.name, deployed = deployed.len(), "Deployment run complete");

        Ok(deployed)
    }
}
