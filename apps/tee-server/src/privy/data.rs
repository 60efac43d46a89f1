// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Wire data model for the custody-provider API and the signer's own
//! request surface.
//!
//! Requests are modeled as one tagged enum, [`SignerRpcRequest`], keyed on
//! the wire `method`; validation is a total match over the variants, so a
//! new method cannot be added without deciding its rules.

use serde::{Deserialize, Serialize};

/// Generic `{"message": ...}` payload used by health and error responses.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub message: String,
}

impl Message {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

// =============================================================================
// User records
// =============================================================================

/// The custody provider's user object.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrivyUser {
    #[serde(rename = "id")]
    pub privy_id: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub linked_accounts: Vec<LinkedAccount>,
    #[serde(default)]
    pub mfa_methods: Vec<serde_json::Value>,
    #[serde(default)]
    pub has_accepted_terms: bool,
    #[serde(default)]
    pub is_guest: bool,
}

impl PrivyUser {
    /// The first linked account that is both delegated and an ethereum
    /// wallet, if any.
    pub fn eth_delegated_wallet(&self) -> Option<&LinkedAccount> {
        self.linked_accounts
            .iter()
            .find(|acc| acc.delegated && acc.chain_type == "ethereum")
    }

    /// The first linked account that is both delegated and a solana
    /// wallet, if any.
    pub fn sol_delegated_wallet(&self) -> Option<&LinkedAccount> {
        self.linked_accounts
            .iter()
            .find(|acc| acc.delegated && acc.chain_type == "solana")
    }
}

/// A linked account: an email, a wallet, or any other identity the
/// provider attaches to a user. Wallet-specific fields default to empty
/// for non-wallet kinds.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LinkedAccount {
    #[serde(rename = "id", default, skip_serializing_if = "String::is_empty")]
    pub wallet_id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub verified_at: i64,
    #[serde(default)]
    pub first_verified_at: i64,
    #[serde(default)]
    pub latest_verified_at: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub address: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub wallet_index: i64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chain_id: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub chain_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub delegated: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wallet_client: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub wallet_client_type: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub connector_type: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub imported: bool,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub recovery_method: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub public_key: String,
}

fn is_zero(value: &i64) -> bool {
    *value == 0
}

// =============================================================================
// Wallet creation
// =============================================================================

/// Request body for creating a delegated wallet for a user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWalletRequest {
    pub wallets: Vec<CreateWalletData>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateWalletData {
    pub chain_type: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub additional_signers: Vec<AdditionalSigner>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdditionalSigner {
    pub signer_id: String,
}

impl CreateWalletRequest {
    /// An ethereum wallet whose signing authority is delegated to the
    /// enclave's key.
    pub fn delegated_eth(signer_id: &str) -> Self {
        Self {
            wallets: vec![CreateWalletData {
                chain_type: "ethereum".into(),
                additional_signers: vec![AdditionalSigner {
                    signer_id: signer_id.into(),
                }],
            }],
        }
    }
}

/// Response body from wallet creation; only the linked accounts matter.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateWalletResponse {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub linked_accounts: Vec<LinkedAccount>,
}

// =============================================================================
// Transactions and signing requests
// =============================================================================

/// Ethereum transaction shape shared by the signing and sending methods.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EthTransaction {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chain_id: Option<i64>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub data: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub from: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_fee_per_gas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_priority_fee_per_gas: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nonce: Option<i64>,
    pub to: String,
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub tx_type: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransactionParams {
    pub transaction: EthTransaction,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageParams {
    pub message: String,
    pub encoding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HashParams {
    pub hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolTransactionParams {
    pub transaction: String,
    pub encoding: String,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("incorrect transaction request method")]
    IncorrectMethod,
    #[error("missing to field in the transaction, it is required")]
    MissingTo,
    #[error("missing CAIP2 field in the transaction, it is required")]
    MissingCaip2,
    #[error("incorrect chainType field in the transaction, it is required")]
    WrongChainType,
    #[error("missing message field in the transaction, it is required")]
    MissingMessage,
    #[error("missing transaction data, it is required")]
    MissingTransaction,
    #[error("invalid encoding format, only {0} accepted")]
    WrongEncoding(&'static str),
    #[error("hash must be a 0x-prefixed 32-byte hex string")]
    InvalidHash,
}

/// Every RPC method the signer can dispatch to the custody provider,
/// tagged by the wire `method` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "method")]
pub enum SignerRpcRequest {
    #[serde(rename = "eth_signTransaction")]
    EthSignTransaction { params: TransactionParams },
    #[serde(rename = "eth_sendTransaction")]
    EthSendTransaction {
        caip2: String,
        chain_type: String,
        params: TransactionParams,
    },
    #[serde(rename = "personal_sign")]
    PersonalSign { params: MessageParams },
    #[serde(rename = "secp256k1_sign")]
    Secp256k1Sign { params: HashParams },
    #[serde(rename = "signMessage")]
    SolSignMessage { params: MessageParams },
    #[serde(rename = "signTransaction")]
    SolSignTransaction { params: SolTransactionParams },
    #[serde(rename = "signAndSendTransaction")]
    SolSignAndSendTransaction {
        caip2: String,
        params: SolTransactionParams,
    },
}

impl SignerRpcRequest {
    pub fn secp256k1_sign(hash: impl Into<String>) -> Self {
        Self::Secp256k1Sign {
            params: HashParams { hash: hash.into() },
        }
    }

    pub fn eth_sign_transaction(transaction: EthTransaction) -> Self {
        Self::EthSignTransaction {
            params: TransactionParams { transaction },
        }
    }

    pub fn eth_send_transaction(transaction: EthTransaction, caip2: impl Into<String>) -> Self {
        Self::EthSendTransaction {
            caip2: caip2.into(),
            chain_type: "ethereum".into(),
            params: TransactionParams { transaction },
        }
    }

    pub fn personal_sign(message: impl Into<String>) -> Self {
        Self::PersonalSign {
            params: MessageParams {
                message: message.into(),
                encoding: "utf-8".into(),
            },
        }
    }

    pub fn sol_sign_message(message: impl Into<String>) -> Self {
        Self::SolSignMessage {
            params: MessageParams {
                message: message.into(),
                encoding: "base64".into(),
            },
        }
    }

    /// The wire method tag.
    pub fn method(&self) -> &'static str {
        match self {
            Self::EthSignTransaction { .. } => "eth_signTransaction",
            Self::EthSendTransaction { .. } => "eth_sendTransaction",
            Self::PersonalSign { .. } => "personal_sign",
            Self::Secp256k1Sign { .. } => "secp256k1_sign",
            Self::SolSignMessage { .. } => "signMessage",
            Self::SolSignTransaction { .. } => "signTransaction",
            Self::SolSignAndSendTransaction { .. } => "signAndSendTransaction",
        }
    }

    /// The ethereum transaction carried by this request, if the method
    /// has one.
    pub fn transaction(&self) -> Option<&EthTransaction> {
        match self {
            Self::EthSignTransaction { params } | Self::EthSendTransaction { params, .. } => {
                Some(&params.transaction)
            }
            _ => None,
        }
    }

    /// Validate the request; a total match, so every method has explicit
    /// rules.
    pub fn validate(&self) -> Result<(), ValidationError> {
        match self {
            Self::EthSignTransaction { params } => {
                if params.transaction.to.is_empty() {
                    return Err(ValidationError::MissingTo);
                }
                Ok(())
            }
            Self::EthSendTransaction {
                caip2,
                chain_type,
                params,
            } => {
                if params.transaction.to.is_empty() {
                    return Err(ValidationError::MissingTo);
                }
                if caip2.is_empty() {
                    return Err(ValidationError::MissingCaip2);
                }
                if chain_type != "ethereum" {
                    return Err(ValidationError::WrongChainType);
                }
                Ok(())
            }
            Self::PersonalSign { params } => {
                if params.message.is_empty() {
                    return Err(ValidationError::MissingMessage);
                }
                if params.encoding != "utf-8" {
                    return Err(ValidationError::WrongEncoding("utf-8"));
                }
                Ok(())
            }
            Self::Secp256k1Sign { params } => validate_hash(&params.hash),
            Self::SolSignMessage { params } => {
                if params.message.is_empty() {
                    return Err(ValidationError::MissingMessage);
                }
                if params.encoding != "base64" {
                    return Err(ValidationError::WrongEncoding("base64"));
                }
                Ok(())
            }
            Self::SolSignTransaction { params } => {
                if params.transaction.is_empty() {
                    return Err(ValidationError::MissingTransaction);
                }
                if params.encoding != "base64" {
                    return Err(ValidationError::WrongEncoding("base64"));
                }
                Ok(())
            }
            Self::SolSignAndSendTransaction { caip2, params } => {
                if params.transaction.is_empty() {
                    return Err(ValidationError::MissingTransaction);
                }
                if caip2.is_empty() {
                    return Err(ValidationError::MissingCaip2);
                }
                if params.encoding != "base64" {
                    return Err(ValidationError::WrongEncoding("base64"));
                }
                Ok(())
            }
        }
    }
}

/// A 32-byte message hash as a `0x`-prefixed hex string.
pub fn validate_hash(hash: &str) -> Result<(), ValidationError> {
    let Some(body) = hash.strip_prefix("0x") else {
        return Err(ValidationError::InvalidHash);
    };
    match hex::decode(body) {
        Ok(bytes) if bytes.len() == 32 => Ok(()),
        _ => Err(ValidationError::InvalidHash),
    }
}

// =============================================================================
// Route request bodies
// =============================================================================

/// Body of the user-facing secp256k1 signing route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secp256k1SignRequest {
    pub method: String,
    pub params: HashParams,
}

impl Secp256k1SignRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.method != "secp256k1_sign" {
            return Err(ValidationError::IncorrectMethod);
        }
        validate_hash(&self.params.hash)
    }

    pub fn to_rpc(&self) -> SignerRpcRequest {
        SignerRpcRequest::secp256k1_sign(self.params.hash.clone())
    }
}

/// Body of the orchestrator-facing secp256k1 signing route. Carries the
/// target principal explicitly; without one, the enclave signs with the
/// operator's own claiming key instead of a delegated wallet.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AxalSecp256k1SignRequest {
    pub method: String,
    pub params: HashParams,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub privy_id: Option<String>,
}

impl AxalSecp256k1SignRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.method != "secp256k1_sign" {
            return Err(ValidationError::IncorrectMethod);
        }
        validate_hash(&self.params.hash)
    }

    pub fn to_rpc(&self) -> SignerRpcRequest {
        SignerRpcRequest::secp256k1_sign(self.params.hash.clone())
    }
}

// =============================================================================
// Responses
// =============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureData {
    pub signature: String,
    pub encoding: String,
}

/// Response to `secp256k1_sign` (and the operator's local `axal_sign`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Secp256k1SignResponse {
    pub method: String,
    pub data: SignatureData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedTransactionData {
    pub signed_transaction: String,
    pub encoding: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthSignTransactionResponse {
    pub method: String,
    pub data: SignedTransactionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendTransactionData {
    pub hash: String,
    pub caip2: String,
    pub transaction_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EthSendTransactionResponse {
    pub method: String,
    pub data: SendTransactionData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersonalSignResponse {
    pub method: String,
    pub data: SignatureData,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolSignTransactionResponse {
    pub method: String,
    pub data: SignedTransactionData,
}

pub type SolSignAndSendTransactionResponse = SolSignTransactionResponse;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolSignMessageResponse {
    pub method: String,
    pub data: SignatureData,
}

// =============================================================================
// Batch signing
// =============================================================================

/// Upper bound on batch size; larger batches are rejected outright.
pub const MAX_BATCH_REQUESTS: usize = 10_000;

/// A batch of signing operations submitted by the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSignRequest {
    pub signing_requests: Vec<SingleSignRequest>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SingleSignRequest {
    pub hash: String,
    pub privy_id: String,
    pub signing_type: String,
    /// Correlates responses with submitted items; echoed back verbatim.
    pub index: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSignResponse {
    pub total_requests: usize,
    pub successful_signs: usize,
    pub failed_signs: usize,
    pub signatures: Vec<SignatureResult>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignatureResult {
    pub index: i64,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signature: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum BatchValidationError {
    #[error("batch request cannot be empty")]
    Empty,
    #[error("batch request too large: max {MAX_BATCH_REQUESTS} requests, got {0}")]
    TooLarge(usize),
    #[error("hash is required for request {0}")]
    MissingHash(usize),
    #[error("hash must start with 0x for request {0}")]
    HashPrefix(usize),
    #[error("privy_id is required for request {0}")]
    MissingPrivyId(usize),
    #[error("invalid signing_type for request {0}: must be 'axal' or 'user'")]
    InvalidSigningType(usize),
}

impl BatchSignRequest {
    pub fn validate(&self) -> Result<(), BatchValidationError> {
        if self.signing_requests.is_empty() {
            return Err(BatchValidationError::Empty);
        }
        if self.signing_requests.len() > MAX_BATCH_REQUESTS {
            return Err(BatchValidationError::TooLarge(self.signing_requests.len()));
        }
        for (i, req) in self.signing_requests.iter().enumerate() {
            if req.hash.is_empty() {
                return Err(BatchValidationError::MissingHash(i));
            }
            if !req.hash.starts_with("0x") {
                return Err(BatchValidationError::HashPrefix(i));
            }
            if req.privy_id.is_empty() {
                return Err(BatchValidationError::MissingPrivyId(i));
            }
            if req.signing_type != "axal" && req.signing_type != "user" {
                return Err(BatchValidationError::InvalidSigningType(i));
            }
        }
        Ok(())
    }

    /// The pinned HMAC message for a batch: item hashes joined with `:`
    /// in submitted order.
    pub fn signing_message(&self) -> String {
        self.signing_requests
            .iter()
            .map(|req| req.hash.as_str())
            .collect::<Vec<_>>()
            .join(":")
    }
}
