// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! VIP-180 (fungible) and VIP-181 (non-fungible) token contracts.
//!
//! Reads go through simulated calls on the node; nothing here submits.

use alloy::{
    primitives::{Address, U256},
    sol,
    sol_types::SolCall,
};
use serde::Serialize;

use super::client::{ChainApi, ThorError};
use super::types::{to_hex, Clause};
use super::units::{format_amount, TOKEN_DECIMALS};

// Standard token interfaces using alloy's sol! macro
sol! {
    interface IVIP180 {
        function name() external view returns (string);
        function symbol() external view returns (string);
        function decimals() external view returns (uint8);
        function balanceOf(address account) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);

        event Transfer(address indexed from, address indexed to, uint256 value);
    }

    interface IVIP181 {
        function transferFrom(address from, address to, uint256 tokenId) external;
        function safeTransferFrom(address from, address to, uint256 tokenId) external;

        event Transfer(address indexed from, address indexed to, uint256 indexed tokenId);
    }
}

/// Name, symbol and decimals of a fungible token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenMetadata {
    pub address: String,
    pub name: String,
    pub symbol: String,
    pub decimals: u8,
}

/// Token balance of one holder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenBalance {
    #[serde(flatten)]
    pub token: TokenMetadata,
    pub balance_raw: String,
    pub balance_formatted: String,
}

/// VIP-180 contract bound to a chain.
pub struct TokenContract<'a> {
    chain: &'a dyn ChainApi,
    address: Address,
}

impl<'a> TokenContract<'a> {
    pub fn new(chain: &'a dyn ChainApi, address: Address) -> Self {
        Self { chain, address }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    async fn read<C: SolCall>(&self, call: C) -> Result<C::Return, ThorError> {
        let clause = Clause::new(Some(self.address), U256::ZERO, call.abi_encode().into());
        let result = self.chain.call(clause, None).await?;
        if result.reverted {
            return Err(ThorError::SimulationReverted(format!(
                "{}() on {}: {}",
                C::SIGNATURE,
                to_hex(self.address),
                result.vm_error
            )));
        }
        C::abi_decode_returns(&result.data).map_err(|e| {
            ThorError::Encoding(format!("bad {} return data: {e}", C::SIGNATURE))
        })
    }

    pub async fn name(&self) -> Result<String, ThorError> {
        self.read(IVIP180::nameCall {}).await
    }

    pub async fn symbol(&self) -> Result<String, ThorError> {
        self.read(IVIP180::symbolCall {}).await
    }

    pub async fn decimals(&self) -> Result<u8, ThorError> {
        self.read(IVIP180::decimalsCall {}).await
    }

    /// Fetch name, symbol and decimals concurrently.
    ///
    /// Contracts that omit an optional getter fall back to placeholders; only
    /// an unreachable node is an error.
    pub async fn metadata(&self) -> Result<TokenMetadata, ThorError> {
        let (name, symbol, decimals) = tokio::join!(self.name(), self.symbol(), self.decimals());
        Ok(TokenMetadata {
            address: to_hex(self.address),
            name: optional_getter(name)?.unwrap_or_else(|| "Unknown".to_string()),
            symbol: optional_getter(symbol)?.unwrap_or_else(|| "???".to_string()),
            decimals: optional_getter(decimals)?.unwrap_or(TOKEN_DECIMALS),
        })
    }

    pub async fn balance_of(&self, holder: Address) -> Result<TokenBalance, ThorError> {
        let (token, balance) = tokio::join!(
            self.metadata(),
            self.read(IVIP180::balanceOfCall { account: holder })
        );
        let (token, balance) = (token?, balance?);
        Ok(TokenBalance {
            balance_raw: balance.to_string(),
            balance_formatted: format_amount(balance, token.decimals),
            token,
        })
    }
}

fn optional_getter<T>(result: Result<T, ThorError>) -> Result<Option<T>, ThorError> {
    match result {
        Ok(value) => Ok(Some(value)),
        Err(e @ ThorError::ChainUnavailable(_)) => Err(e),
        Err(_) => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use alloy::sol_types::{SolEvent, SolValue};

    use super::*;
    use crate::blockchain::testing::FakeChain;

    fn token_chain() -> FakeChain {
        let chain = FakeChain::with_best(1);
        chain.respond_to(IVIP180::nameCall::SELECTOR, ("VeThor".to_string(),).abi_encode_params());
        chain.respond_to(IVIP180::symbolCall::SELECTOR, ("VTHO".to_string(),).abi_encode_params());
        chain.respond_to(IVIP180::decimalsCall::SELECTOR, (U256::from(18u8),).abi_encode_params());
        chain
    }

    #[tokio::test]
    async fn metadata_reads_all_getters() {
        let chain = token_chain();
        let token = TokenContract::new(&chain, Address::repeat_byte(7));
        let metadata = token.metadata().await.unwrap();
        assert_eq!(metadata.name, "VeThor");
        assert_eq!(metadata.symbol, "VTHO");
        assert_eq!(metadata.decimals, 18);
    }

    #[tokio::test]
    async fn metadata_falls_back_when_getters_are_missing() {
        let chain = FakeChain::with_best(1);
        let token = TokenContract::new(&chain, Address::repeat_byte(7));
        let metadata = token.metadata().await.unwrap();
        assert_eq!(metadata.symbol, "???");
        assert_eq!(metadata.decimals, 18);
    }

    #[tokio::test]
    async fn balance_is_formatted_with_token_decimals() {
        let chain = token_chain();
        chain.respond_to(
            IVIP180::balanceOfCall::SELECTOR,
            (U256::from(2_500_000_000_000_000_000u64),).abi_encode_params(),
        );
        let balance = TokenContract::new(&chain, Address::repeat_byte(7))
            .balance_of(Address::repeat_byte(9))
            .await
            .unwrap();
        assert_eq!(balance.balance_formatted, "2.5");
        assert_eq!(balance.balance_raw, "2500000000000000000");
    }

    #[test]
    fn transfer_selectors_are_standard() {
        assert_eq!(IVIP180::transferCall::SELECTOR, [0xa9, 0x05, 0x9c, 0xbb]);
        assert_eq!(IVIP180::approveCall::SELECTOR, [0x09, 0x5e, 0xa7, 0xb3]);
        assert_eq!(IVIP181::transferFromCall::SELECTOR, [0x23, 0xb8, 0x72, 0xdd]);
        assert_eq!(IVIP181::safeTransferFromCall::SELECTOR, [0x42, 0x84, 0x2e, 0x0e]);
    }

    #[test]
    fn fungible_and_nft_transfer_share_topic() {
        assert_eq!(
            IVIP180::Transfer::SIGNATURE_HASH,
            IVIP181::Transfer::SIGNATURE_HASH
        );
    }
}
