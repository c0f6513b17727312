//! Deployment records written to the record store.

use alloy_core::{
    dyn_abi::DynSolValue,
    primitives::{Address, B256, Bytes, U256},
};
use serde::{Deserialize, Serialize};

use crate::chain::DeployReceipt;

/// A constructor argument recorded alongside a deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::From)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum ConstructorArg {
    Address(Address),
    Uint(U256),
    Bool(bool),
    String(String),
    Bytes(Bytes),
}

impl ConstructorArg {
    fn to_sol_value(&self) -> DynSolValue {
        match self {
            ConstructorArg::Address(address) => DynSolValue::Address(*address),
            ConstructorArg::Uint(value) => DynSolValue::Uint(*value, 256),
            ConstructorArg::Bool(value) => DynSolValue::Bool(*value),
            ConstructorArg::String(value) => DynSolValue::String(value.clone()),
            ConstructorArg::Bytes(value) => DynSolValue::Bytes(value.to_vec()),
        }
    }

    /// ABI-encode a constructor parameter list, as appended to the creation bytecode.
    pub fn abi_encode_params(args: &[ConstructorArg]) -> Vec<u8> {
        if args.is_empty() {
            return Vec::new();
        }
        DynSolValue::Tuple(args.iter().map(Self::to_sol_value).collect()).abi_encode_params()
    }
}

/// The deployed identity of one contract on one network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeployedContract {
    /// Name of the step that produced this record.
    pub name: String,
    /// Name of the compiled artifact the contract was created from.
    pub artifact: String,
    pub address: Address,
    #[serde(default)]
    pub constructor_args: Vec<ConstructorArg>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_hash: Option<B256>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub block_number: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_used: Option<u64>,
    /// SHA-256 of the init code (bytecode followed by encoded arguments).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub init_code_hash: Option<String>,
    /// Unix timestamp (seconds) of the deployment.
    pub deployed_at: i64,
}

impl DeployedContract {
    /// Create a record for `name` at `address`, using `name` as the artifact.
    pub fn new(name: impl Into<String>, address: Address, constructor_args: Vec<ConstructorArg>) -> Self {
        let name = name.into();
        Self {
            artifact: name.clone(),
            name,
            address,
            constructor_args,
            transaction_hash: None,
            block_number: None,
            gas_used: None,
            init_code_hash: None,
            deployed_at: chrono::Utc::now().timestamp(),
        }
    }

    pub fn with_artifact(mut self, artifact: impl Into<String>) -> Self {
        self.artifact = artifact.into();
        self
    }

    /// Copy transaction details from a deployment receipt.
    pub fn with_receipt(mut self, receipt: &DeployReceipt) -> Self {
        self.transaction_hash = Some(receipt.transaction_hash);
        self.block_number = receipt.block_number;
        self.gas_used = receipt.gas_used;
        self
    }

    pub fn with_init_code_hash(mut self, hash: impl Into<String>) -> Self {
        self.init_code_hash = Some(hash.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_args_encode_to_nothing() {
        assert!(ConstructorArg::abi_encode_params(&[]).is_empty());
    }

    #[test]
    fn test_address_arg_is_one_padded_word() {
        let address = Address::with_last_byte(0xab);
        let encoded = ConstructorArg::abi_encode_params(&[ConstructorArg::Address(address)]);

        assert_eq!(encoded.len(), 32);
        assert_eq!(&encoded[..12], &[0u8; 12]);
        assert_eq!(&encoded[12..], address.as_slice());
    }

    #[test]
    fn test_record_json_layout() {
        let record = DeployedContract::new(
            "POCAuction",
            Address::with_last_byte(2),
            vec![Address::with_last_byte(1).into()],
        );

        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["name"], "POCAuction");
        assert_eq!(json["artifact"], "POCAuction");
        assert_eq!(json["constructorArgs"][0]["type"], "address");
        assert!(json.get("transactionHash").is_none());

        let back: DeployedContract = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
