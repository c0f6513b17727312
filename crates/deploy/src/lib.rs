//! pocdeploy-core - Deployment sequencing for the POC token and its auction.
//!
//! Named deployment steps run in dependency order against a chain node. Each
//! step's result is recorded per network so later steps, later runs and the
//! inspection report can find the deployed addresses.

mod artifact;
mod chain;
mod config;
mod context;
mod contracts;
mod error;
mod fingerprint;
mod fs;
mod inspect;
mod record;
mod registry;
pub mod rpc;
mod sequencer;
mod steps;
mod store;

pub use artifact::{ArtifactStore, ContractArtifact};
pub use chain::{ChainClient, DeployReceipt, DeployRequest};
pub use config::{CONFIG_FILENAME, DEFAULT_NETWORK, DeployConfig, ENV_PREFIX, NetworkConfig};
pub use context::{NetworkContext, StepContext};
pub use contracts::{IPoc, POC, POC_AUCTION, PocAuction, PocToken, TokenMetadata};
pub use error::{DeployError, DeployResult};
pub use fingerprint::InitCode;
pub use inspect::{AccountBalance, InspectionReport, Inspector, inspection_accounts};
pub use record::{ConstructorArg, DeployedContract};
pub use registry::{DeploymentStep, StepAction, StepRegistry};
pub use rpc::RpcChain;
pub use sequencer::Sequencer;
pub use steps::{ArgSource, ContractDeployment, PocStepOptions, poc_auction_step, poc_registry, poc_step};
pub use store::{DeploymentRecordStore, StoreAccess};
