// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Batch signing for the orchestrator.
//!
//! The whole batch is authenticated once: HMAC over the item hashes
//! joined with `":"` in submitted order. Items then execute one by one;
//! an individual failure is recorded in its slot and never aborts the
//! loop, so the response always accounts for every submitted index.

use tracing::warn;

use super::client::PrivyClient;
use super::data::{
    BatchSignRequest, BatchSignResponse, Secp256k1SignResponse, SignatureResult, SignerRpcRequest,
};
use crate::error::ApiError;

impl PrivyClient {
    /// Execute a validated batch of raw-hash signing operations.
    pub async fn axal_batch_secp256k1_sign(
        &self,
        batch: &BatchSignRequest,
        hmac_signature: &str,
    ) -> Result<BatchSignResponse, ApiError> {
        self.authenticate_axal(hmac_signature, &batch.signing_message())?;

        let total = batch.signing_requests.len();
        let mut signatures = Vec::with_capacity(total);
        let mut successful = 0usize;

        for item in &batch.signing_requests {
            let rpc = SignerRpcRequest::secp256k1_sign(item.hash.clone());
            match self
                .execute_privy_signing::<Secp256k1SignResponse>(&rpc, &item.privy_id)
                .await
            {
                Ok(response) => {
                    successful += 1;
                    signatures.push(SignatureResult {
                        index: item.index,
                        success: true,
                        signature: Some(response.data.signature),
                        error: None,
                    });
                }
                Err(err) => {
                    warn!(index = item.index, error = %err.message, "batch item failed");
                    signatures.push(SignatureResult {
                        index: item.index,
                        success: false,
                        signature: None,
                        error: Some(err.message),
                    });
                }
            }
        }

        Ok(BatchSignResponse {
            total_requests: total,
            successful_signs: successful,
            failed_signs: total - successful,
            signatures,
        })
    }
}
