//! Init-code fingerprints used to detect unchanged deployments.

use sha2::{Digest, Sha256};

use crate::record::{ConstructorArg, DeployedContract};

/// The creation payload of a contract: bytecode followed by encoded arguments.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InitCode {
    bytes: Vec<u8>,
}

impl InitCode {
    pub fn new(bytecode: &[u8], args: &[ConstructorArg]) -> Self {
        let mut bytes = bytecode.to_vec();
        bytes.extend(ConstructorArg::abi_encode_params(args));
        Self { bytes }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.bytes
    }

    /// Hex-encoded SHA-256 of the init code.
    ///
    /// The same bytecode and arguments always produce the same fingerprint.
    pub fn fingerprint(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(&self.bytes);
        hex::encode(hasher.finalize())
    }

    /// Whether `record` was deployed from exactly this init code.
    pub fn matches(&self, record: &DeployedContract) -> bool {
        record.init_code_hash.as_deref() == Some(self.fingerprint().as_str())
    }
}

#[cfg(test)]
mod tests {
    use alloy_core::primitives::Address;

    use super::*;

    const BYTECODE: &[u8] = &[0x60, 0x80, 0x60, 0x40, 0x52];

    #[test]
    fn test_fingerprint_determinism() {
        let args = vec![ConstructorArg::Address(Address::with_last_byte(1))];
        let first = InitCode::new(BYTECODE, &args).fingerprint();
        let second = InitCode::new(BYTECODE, &args).fingerprint();

        assert_eq!(first, second, "Fingerprint should be deterministic");
        assert_eq!(first.len(), 64, "SHA-256 fingerprint should be 64 hex characters");
    }

    #[test]
    fn test_fingerprint_changes_with_args() {
        let first = InitCode::new(BYTECODE, &[Address::with_last_byte(1).into()]);
        let second = InitCode::new(BYTECODE, &[Address::with_last_byte(2).into()]);

        assert_ne!(
            first.fingerprint(),
            second.fingerprint(),
            "Fingerprint should change when constructor arguments change"
        );
    }

    #[test]
    fn test_fingerprint_changes_with_bytecode() {
        let first = InitCode::new(BYTECODE, &[]);
        let second = InitCode::new(&[0x60, 0x80], &[]);

        assert_ne!(first.fingerprint(), second.fingerprint());
    }

    #[test]
    fn test_matches_record() {
        let init_code = InitCode::new(BYTECODE, &[]);
        let record = DeployedContract::new("POC", Address::with_last_byte(9), vec![]);
        assert!(!init_code.matches(&record));

        let record = record.with_init_code_hash(init_code.fingerprint());
        assert!(init_code.matches(&record));
    }
}
