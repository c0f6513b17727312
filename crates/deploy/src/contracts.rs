//! Typed handles to the deployed POC token and auction.

use alloy_core::{
    primitives::{Address, U256},
    sol,
    sol_types::SolCall,
};

use crate::{
    chain::ChainClient,
    error::{DeployError, DeployResult},
    store::DeploymentRecordStore,
};

/// Record and artifact name of the token contract.
pub const POC: &str = "POC";
/// Record and artifact name of the auction contract.
pub const POC_AUCTION: &str = "POCAuction";

sol! {
    /// The read-only ERC-20 surface of the POC token.
    interface IPoc {
        function name() external view returns (string name);
        function symbol() external view returns (string symbol);
        function decimals() external view returns (uint8 decimals);
        function balanceOf(address account) external view returns (uint256 balance);
    }
}

/// Token metadata read from the POC contract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenMetadata {
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Handle bound to the deployed POC token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PocToken {
    pub address: Address,
}

impl PocToken {
    pub fn at(address: Address) -> Self {
        Self { address }
    }

    /// Bind to the POC record of `store`.
    pub fn from_store(store: &DeploymentRecordStore) -> DeployResult<Self> {
        Ok(Self::at(store.get(POC)?.address))
    }

    async fn call<C: SolCall>(&self, chain: &dyn ChainClient, call: C) -> anyhow::Result<C::Return> {
        let output = chain.call(self.address, call.abi_encode().into()).await?;
        Ok(C::abi_decode_returns(&output, true)?)
    }

    /// `balanceOf(account)`, reported as [`DeployError::Query`] on failure.
    pub async fn balance_of(&self, chain: &dyn ChainClient, account: Address) -> DeployResult<U256> {
        self.call(chain, IPoc::balanceOfCall { account })
            .await
            .map(|ret| ret.balance)
            .map_err(|e| DeployError::query(account, e))
    }

    pub async fn metadata(&self, chain: &dyn ChainClient) -> anyhow::Result<TokenMetadata> {
        let name = self.call(chain, IPoc::nameCall {}).await?.name;
        let symbol = self.call(chain, IPoc::symbolCall {}).await?.symbol;
        let decimals = self.call(chain, IPoc::decimalsCall {}).await?.decimals;
        Ok(TokenMetadata {
            name,
            symbol,
            decimals,
        })
    }
}

/// Handle bound to the deployed POC auction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PocAuction {
    pub address: Address,
    /// The token address the auction was constructed with, if recorded.
    pub token: Option<Address>,
}

impl PocAuction {
    /// Bind to the POCAuction record of `store`.
    pub fn from_store(store: &DeploymentRecordStore) -> DeployResult<Self> {
        let record = store.get(POC_AUCTION)?;
        let token = record.constructor_args.iter().find_map(|arg| match arg {
            crate::record::ConstructorArg::Address(address) => Some(*address),
            _ => None,
        });
        Ok(Self {
            address: record.address,
            token,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_balance_of_selector() {
        let data = IPoc::balanceOfCall {
            account: Address::with_last_byte(7),
        }
        .abi_encode();

        // keccak256("balanceOf(address)")[..4]
        assert_eq!(&data[..4], &[0x70, 0xa0, 0x82, 0x31]);
        assert_eq!(data.len(), 4 + 32);
        assert_eq!(data[35], 7);
    }

    #[test]
    fn test_handles_require_records() {
        let store = DeploymentRecordStore::ephemeral("localhost");
        assert!(PocToken::from_store(&store).unwrap_err().is_not_found());
        assert!(PocAuction::from_store(&store).unwrap_err().is_not_found());
    }

    #[test]
    fn test_auction_handle_reads_token_argument() {
        let mut store = DeploymentRecordStore::ephemeral("localhost");
        let token = Address::with_last_byte(1);
        store
            .put(
                POC_AUCTION,
                crate::DeployedContract::new(POC_AUCTION, Address::with_last_byte(2), vec![token.into()]),
            )
            .unwrap();

        let auction = PocAuction::from_store(&store).unwrap();
        assert_eq!(auction.address, Address::with_last_byte(2));
        assert_eq!(auction.token, Some(token));
    }
}
