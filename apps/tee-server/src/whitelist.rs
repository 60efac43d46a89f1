// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Destination-address whitelist
//!
//! Transaction-bearing methods may only target a fixed set of pool
//! addresses configured at startup. Addresses are hex-normalized into
//! 20-byte canonical form before both insertion and lookup, so matching
//! is case-insensitive; the all-zero address is never valid.

use std::collections::HashSet;

use alloy_primitives::Address;
use tracing::{info, warn};

use crate::config::WhitelistConfig;
use crate::privy::data::SignerRpcRequest;

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum WhitelistError {
    #[error("invalid hex address: {0}")]
    InvalidAddress(String),
    #[error("whitelist has no valid addresses")]
    Empty,
}

/// Immutable set of permitted destination addresses.
#[derive(Debug)]
pub struct AddressWhitelist {
    addresses: HashSet<Address>,
}

impl AddressWhitelist {
    /// Build the whitelist from the configured pool list. Individual
    /// unparseable entries are skipped with a warning; an empty result is
    /// a startup failure.
    pub fn from_config(cfg: &WhitelistConfig) -> Result<Self, WhitelistError> {
        let mut addresses = HashSet::new();
        for pool in &cfg.whitelisted_pools {
            match parse_address(pool) {
                Ok(address) => {
                    addresses.insert(address);
                }
                Err(_) => warn!(address = %pool, "invalid address, will not be added to whitelist"),
            }
        }
        if addresses.is_empty() {
            return Err(WhitelistError::Empty);
        }
        info!(pools = addresses.len(), "initiated whitelist");
        Ok(Self { addresses })
    }

    pub fn contains(&self, address: Address) -> bool {
        self.addresses.contains(&address)
    }

    pub fn contains_str(&self, address: &str) -> bool {
        parse_address(address)
            .map(|addr| self.contains(addr))
            .unwrap_or(false)
    }

    /// Per-method destination rules:
    ///
    /// - `eth_signTransaction` / `eth_sendTransaction`: the transaction's
    ///   `to` must be whitelisted;
    /// - `personal_sign`: must not carry a transaction (it never does by
    ///   construction);
    /// - anything else: denied.
    pub fn verify_eth_request(&self, request: &SignerRpcRequest) -> bool {
        match request {
            SignerRpcRequest::EthSignTransaction { .. }
            | SignerRpcRequest::EthSendTransaction { .. } => request
                .transaction()
                .map(|tx| self.contains_str(&tx.to))
                .unwrap_or(false),
            SignerRpcRequest::PersonalSign { .. } => request.transaction().is_none(),
            _ => false,
        }
    }
}

/// Normalize a destination address: trim, case-fold, tolerate a missing
/// `0x` prefix, decode to 20 bytes, and reject the zero address.
pub fn parse_address(raw: &str) -> Result<Address, WhitelistError> {
    let trimmed = raw.trim().to_lowercase();
    let body = trimmed.strip_prefix("0x").unwrap_or(&trimmed);
    let bytes =
        hex::decode(body).map_err(|_| WhitelistError::InvalidAddress(raw.to_owned()))?;
    if bytes.len() != 20 {
        return Err(WhitelistError::InvalidAddress(raw.to_owned()));
    }
    let address = Address::from_slice(&bytes);
    if address == Address::ZERO {
        return Err(WhitelistError::InvalidAddress(raw.to_owned()));
    }
    Ok(address)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::privy::data::{EthTransaction, MessageParams, SolTransactionParams};

    const POOL_A: &str = "0x1234567890123456789012345678901234567890";
    const POOL_B: &str = "0xabcdefabcdefabcdefabcdefabcdefabcdefabcd";

    fn whitelist() -> AddressWhitelist {
        AddressWhitelist::from_config(&WhitelistConfig {
            whitelisted_pools: vec![POOL_A.into(), POOL_B.into()],
        })
        .unwrap()
    }

    fn tx_to(to: &str) -> EthTransaction {
        EthTransaction {
            to: to.into(),
            ..Default::default()
        }
    }

    #[test]
    fn membership_is_case_insensitive() {
        let wl = whitelist();
        assert!(wl.contains_str(POOL_A));
        assert!(wl.contains_str(&POOL_A.to_uppercase().replace("0X", "0x")));
        assert!(wl.contains_str("0xABCDEFabcdefABCDEFabcdefABCDEFabcdefABCD"));
        assert!(wl.contains_str("  0x1234567890123456789012345678901234567890  "));
    }

    #[test]
    fn unknown_addresses_are_rejected() {
        let wl = whitelist();
        assert!(!wl.contains_str("0x9999999999999999999999999999999999999999"));
        assert!(!wl.contains_str("not-an-address"));
        assert!(!wl.contains_str(""));
    }

    #[test]
    fn zero_address_is_never_valid() {
        assert_eq!(
            parse_address("0x0000000000000000000000000000000000000000"),
            Err(WhitelistError::InvalidAddress(
                "0x0000000000000000000000000000000000000000".into()
            ))
        );
        let wl = whitelist();
        assert!(!wl.contains_str("0x0000000000000000000000000000000000000000"));
    }

    #[test]
    fn empty_config_fails_startup() {
        let result = AddressWhitelist::from_config(&WhitelistConfig {
            whitelisted_pools: vec![],
        });
        assert_eq!(result.unwrap_err(), WhitelistError::Empty);

        // All-invalid entries count as empty too.
        let result = AddressWhitelist::from_config(&WhitelistConfig {
            whitelisted_pools: vec!["bogus".into(), "0x0".into()],
        });
        assert_eq!(result.unwrap_err(), WhitelistError::Empty);
    }

    #[test]
    fn invalid_entries_are_skipped_not_fatal() {
        let wl = AddressWhitelist::from_config(&WhitelistConfig {
            whitelisted_pools: vec!["bogus".into(), POOL_A.into()],
        })
        .unwrap();
        assert!(wl.contains_str(POOL_A));
    }

    #[test]
    fn sign_and_send_transactions_require_whitelisted_destination() {
        let wl = whitelist();

        let ok = SignerRpcRequest::eth_sign_transaction(tx_to(POOL_A));
        assert!(wl.verify_eth_request(&ok));

        let unknown = SignerRpcRequest::eth_sign_transaction(tx_to(
            "0x9999999999999999999999999999999999999999",
        ));
        assert!(!wl.verify_eth_request(&unknown));

        let send_ok = SignerRpcRequest::eth_send_transaction(tx_to(POOL_B), "eip155:1");
        assert!(wl.verify_eth_request(&send_ok));

        let send_unknown = SignerRpcRequest::eth_send_transaction(
            tx_to("0x9999999999999999999999999999999999999999"),
            "eip155:1",
        );
        assert!(!wl.verify_eth_request(&send_unknown));
    }

    #[test]
    fn personal_sign_is_accepted_without_transaction() {
        let wl = whitelist();
        let req = SignerRpcRequest::personal_sign("hello");
        assert!(wl.verify_eth_request(&req));
    }

    #[test]
    fn other_methods_are_denied() {
        let wl = whitelist();
        assert!(!wl.verify_eth_request(&SignerRpcRequest::secp256k1_sign("0xabc")));
        assert!(!wl.verify_eth_request(&SignerRpcRequest::SolSignMessage {
            params: MessageParams {
                message: "aGVsbG8=".into(),
                encoding: "base64".into(),
            }
        }));
        assert!(!wl.verify_eth_request(&SignerRpcRequest::SolSignTransaction {
            params: SolTransactionParams {
                transaction: "AQAB".into(),
                encoding: "base64".into(),
            }
        }));
    }
}
