//! Error taxonomy for the deployment sequencer.

use std::path::PathBuf;

use alloy_core::primitives::Address;

/// Result alias used across the sequencer, registry, store and inspection.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors surfaced to the operator by a deploy or inspect run.
///
/// Chain and filesystem helpers report through [`anyhow::Error`]; the variants
/// below attach the step, account or path that was being processed.
#[derive(Debug, thiserror::Error)]
pub enum DeployError {
    /// Two steps were registered under the same name.
    #[error("a deployment step named `{name}` is already registered")]
    DuplicateName { name: String },

    /// A contract name is absent from the record store of the active network.
    #[error("no deployment record for `{name}` on network `{network}`")]
    NotFound { name: String, network: String },

    /// The chain call that deploys a contract failed.
    #[error("step `{step}` failed to deploy: {cause:#}")]
    DeploymentAction { step: String, cause: anyhow::Error },

    /// A read-only call against a deployed contract failed for one account.
    #[error("query for account {account} failed: {cause:#}")]
    Query { account: Address, cause: anyhow::Error },

    /// Declared step dependencies form a cycle.
    #[error("deployment steps have a cyclic dependency: {}", .steps.join(" -> "))]
    CyclicDependency { steps: Vec<String> },

    /// The record store was written for another chain.
    #[error(
        "deployments for network `{network}` belong to chain {expected}, but the node reports chain {actual}"
    )]
    ChainMismatch {
        network: String,
        expected: u64,
        actual: u64,
    },

    /// Another process holds the record store lock.
    #[error("record store {} is locked by another deploy or inspect run", .path.display())]
    StoreLocked { path: PathBuf },

    /// Reading or writing the record store failed.
    #[error("record store error at {}: {cause:#}", .path.display())]
    Store { path: PathBuf, cause: anyhow::Error },
}

impl DeployError {
    /// Wrap a chain failure raised while running `step`.
    pub fn action(step: impl Into<String>, cause: impl Into<anyhow::Error>) -> Self {
        Self::DeploymentAction {
            step: step.into(),
            cause: cause.into(),
        }
    }

    /// Wrap a failed read-only call made on behalf of `account`.
    pub fn query(account: Address, cause: impl Into<anyhow::Error>) -> Self {
        Self::Query {
            account,
            cause: cause.into(),
        }
    }

    pub(crate) fn store(path: impl Into<PathBuf>, cause: impl Into<anyhow::Error>) -> Self {
        Self::Store {
            path: path.into(),
            cause: cause.into(),
        }
    }

    /// Returns `true` for a missing-record error.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_action_error_keeps_context_chain() {
        let cause = anyhow::anyhow!("insufficient funds").context("eth_sendTransaction failed");
        let err = DeployError::action("POCAuction", cause);

        let message = err.to_string();
        assert!(message.contains("POCAuction"));
        assert!(message.contains("eth_sendTransaction failed"));
        assert!(message.contains("insufficient funds"));
    }

    #[test]
    fn test_cycle_message_lists_steps() {
        let err = DeployError::CyclicDependency {
            steps: vec!["A".to_string(), "B".to_string(), "A".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "deployment steps have a cyclic dependency: A -> B -> A"
        );
    }
}
