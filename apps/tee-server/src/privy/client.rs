// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Upstream custody-provider client
//!
//! One client per process, built at startup and shared by every request
//! task. It owns the vsock-TLS transport to the provider, the pre-encoded
//! `Basic` credential, the user cache, and the destination whitelist.
//!
//! Delegated-signing calls carry a `privy-authorization-signature` header
//! computed over the canonical envelope of the exact body and URL being
//! sent; see [`crate::signing::envelope`].

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use http::{Request, StatusCode};
use http_body_util::Full;
use hyper::body::Bytes;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info, warn};

use super::data::{
    AxalSecp256k1SignRequest, CreateWalletRequest, CreateWalletResponse, LinkedAccount,
    PersonalSignResponse, PrivyUser, Secp256k1SignRequest, Secp256k1SignResponse,
    SignerRpcRequest, SolSignAndSendTransactionResponse, SolSignMessageResponse,
    SolSignTransactionResponse,
};
use super::user_cache::UserCache;
use crate::auth::{validate_jwt_and_extract_principal, verify_axal_signature};
use crate::config::TeeConfig;
use crate::error::ApiError;
use crate::signing::envelope::authorization_signature;
use crate::transport::{HttpResponse, TransportError, VsockTlsHttpClient};
use crate::whitelist::AddressWhitelist;

const PRIVY_API_HOST: &str = "api.privy.io";

/// Route templates for the provider endpoints the enclave invokes. URLs
/// are always built through these; never hand-concatenated.
pub(crate) struct PathTemplate(&'static str);

impl PathTemplate {
    pub(crate) fn build(&self, arg: &str) -> String {
        self.0.replacen("{}", arg, 1)
    }
}

pub(crate) const GET_USER_PATH: PathTemplate = PathTemplate("/v1/users/{}");
pub(crate) const SIGN_TX_PATH: PathTemplate = PathTemplate("/v1/wallets/{}/rpc");
pub(crate) const CREATE_WALLET_PATH: PathTemplate = PathTemplate("/v1/users/{}/wallets");

/// Shared client for the custody provider.
pub struct PrivyClient {
    base_url: String,
    http: VsockTlsHttpClient,
    tee: Arc<TeeConfig>,
    /// `base64(app_id ":" app_secret)`, computed once.
    authorization: String,
    user_cache: UserCache,
    whitelist: Arc<AddressWhitelist>,
}

impl PrivyClient {
    pub fn new(
        tee: Arc<TeeConfig>,
        whitelist: Arc<AddressWhitelist>,
    ) -> Result<Self, TransportError> {
        let http = VsockTlsHttpClient::new(tee.ports.privy_api_vsock_port, PRIVY_API_HOST)?;
        let authorization =
            BASE64.encode(format!("{}:{}", tee.privy.app_id, tee.privy.app_secret));
        info!(
            port = tee.ports.privy_api_vsock_port,
            "privy client initialized with vsock TLS transport"
        );
        Ok(Self {
            base_url: format!("https://{PRIVY_API_HOST}"),
            http,
            tee,
            authorization,
            user_cache: UserCache::with_defaults(),
            whitelist,
        })
    }

    // =========================================================================
    // Authentication boundary
    // =========================================================================

    /// Validate a user bearer token and return the principal ID.
    pub fn authenticate_user(&self, token: &str) -> Result<String, ApiError> {
        validate_jwt_and_extract_principal(
            token,
            &self.tee.privy.jwt_verification_key,
            &self.tee.privy.app_id,
            self.tee.environment,
        )
        .map_err(|err| {
            warn!(error = %err, "rejected user token");
            ApiError::invalid_jwt()
        })
    }

    /// Verify the orchestrator's HMAC signature over the pinned message.
    pub fn authenticate_axal(&self, signature_hex: &str, message: &str) -> Result<(), ApiError> {
        let Some(axal) = &self.tee.axal else {
            warn!("orchestrator secret is not configured in this environment");
            return Err(ApiError::invalid_hmac());
        };
        if verify_axal_signature(message, signature_hex, &axal.axal_request_secret_key) {
            Ok(())
        } else {
            warn!("rejected orchestrator hmac signature");
            Err(ApiError::invalid_hmac())
        }
    }

    // =========================================================================
    // User resolution
    // =========================================================================

    /// Authenticate a user token, then resolve (or lazily provision) the
    /// user's delegated ethereum wallet.
    pub async fn get_user(&self, token: &str) -> Result<PrivyUser, ApiError> {
        let privy_id = self.authenticate_user(token)?;
        self.resolve_user(&privy_id).await
    }

    /// Resolve a principal to a full user record with a delegated
    /// ethereum wallet, creating the wallet on first use. Results are
    /// memoized for a bounded TTL.
    pub async fn resolve_user(&self, privy_id: &str) -> Result<PrivyUser, ApiError> {
        if let Some(user) = self.user_cache.get(privy_id) {
            debug!(privy_id, "user cache hit");
            return Ok(user);
        }

        let mut user = self.get_user_record(privy_id).await?;
        if user.eth_delegated_wallet().is_none() {
            info!(privy_id, "user has no delegated eth wallet, creating one");
            let account = self.create_delegated_eth_wallet(privy_id).await?;
            user.linked_accounts.push(account);
        }

        self.user_cache.put(privy_id, user.clone());
        Ok(user)
    }

    /// Fetch the raw user record from the provider.
    pub async fn get_user_record(&self, privy_id: &str) -> Result<PrivyUser, ApiError> {
        let url = format!("{}{}", self.base_url, GET_USER_PATH.build(privy_id));
        let req = self
            .standard_request("GET", &url)
            .body(Full::new(Bytes::new()))
            .map_err(|_| ApiError::internal())?;

        let response = self.dispatch(req).await?;
        if response.status != StatusCode::OK {
            return Err(upstream_error(&response));
        }
        response.json().map_err(|err| {
            error!(error = %err, "failed to decode user record");
            ApiError::internal()
        })
    }

    /// Create a delegated ethereum wallet for a user, returning the new
    /// linked account.
    async fn create_delegated_eth_wallet(&self, privy_id: &str) -> Result<LinkedAccount, ApiError> {
        let url = format!("{}{}", self.base_url, CREATE_WALLET_PATH.build(privy_id));
        let body = CreateWalletRequest::delegated_eth(&self.tee.privy.delegated_actions_key_id);
        let payload = serde_json::to_vec(&body).map_err(|_| ApiError::internal())?;

        let req = self
            .standard_request("POST", &url)
            .body(Full::new(Bytes::from(payload)))
            .map_err(|_| ApiError::internal())?;

        let response = self.dispatch(req).await?;
        if response.status != StatusCode::OK {
            return Err(upstream_error(&response));
        }

        let created: CreateWalletResponse = response.json().map_err(|err| {
            error!(error = %err, "failed to decode wallet creation response");
            ApiError::internal()
        })?;

        created
            .linked_accounts
            .into_iter()
            .find(|acc| acc.delegated && acc.chain_type == "ethereum")
            .ok_or_else(|| {
                error!(privy_id, "wallet creation response carried no delegated eth wallet");
                ApiError::internal()
            })
    }

    // =========================================================================
    // Signing
    // =========================================================================

    /// Resolve the principal's delegated wallet and dispatch a signing
    /// request to it.
    pub async fn execute_privy_signing<T: DeserializeOwned>(
        &self,
        request: &SignerRpcRequest,
        privy_id: &str,
    ) -> Result<T, ApiError> {
        let user = self.resolve_user(privy_id).await?;
        let wallet_id = user
            .eth_delegated_wallet()
            .map(|wallet| wallet.wallet_id.clone())
            .filter(|id| !id.is_empty())
            .ok_or_else(ApiError::no_delegated_wallet)?;
        self.sign_rpc(request, &wallet_id).await
    }

    /// POST a signing request to a wallet's RPC endpoint, attaching the
    /// authorization envelope signature over the exact body and URL.
    pub async fn sign_rpc<T: DeserializeOwned>(
        &self,
        request: &SignerRpcRequest,
        wallet_id: &str,
    ) -> Result<T, ApiError> {
        let url = format!("{}{}", self.base_url, SIGN_TX_PATH.build(wallet_id));
        let body = serde_json::to_value(request).map_err(|_| ApiError::internal())?;

        let signature = authorization_signature(
            &body,
            "POST",
            &url,
            &self.tee.privy.app_id,
            &self.tee.privy.delegated_actions_key,
        )
        .map_err(|err| {
            error!(error = %err, "failed to compute authorization signature");
            ApiError::internal()
        })?;

        let payload = serde_json::to_vec(&body).map_err(|_| ApiError::internal())?;
        let req = self
            .standard_request("POST", &url)
            .header("privy-authorization-signature", signature)
            .body(Full::new(Bytes::from(payload)))
            .map_err(|_| ApiError::internal())?;

        let response = self.dispatch(req).await?;
        if response.status != StatusCode::OK {
            error!(status = %response.status, method = request.method(), "signing request rejected upstream");
            return Err(upstream_error(&response));
        }
        response.json().map_err(|err| {
            error!(error = %err, "failed to decode signing response");
            ApiError::internal()
        })
    }

    // =========================================================================
    // Route operations
    // =========================================================================

    /// User-initiated raw-hash signing; JWT auth.
    pub async fn user_secp256k1_sign(
        &self,
        token: &str,
        request: &Secp256k1SignRequest,
    ) -> Result<Secp256k1SignResponse, ApiError> {
        let privy_id = self.authenticate_user(token)?;
        self.execute_privy_signing(&request.to_rpc(), &privy_id).await
    }

    /// Orchestrator-initiated raw-hash signing; HMAC auth over the raw
    /// hash string. With a target principal the hash is signed by that
    /// principal's delegated wallet; without one, by the operator's own
    /// claiming key.
    pub async fn axal_secp256k1_sign(
        &self,
        signature_hex: &str,
        request: &AxalSecp256k1SignRequest,
    ) -> Result<Secp256k1SignResponse, ApiError> {
        self.authenticate_axal(signature_hex, &request.params.hash)?;
        match &request.privy_id {
            Some(privy_id) => self.execute_privy_signing(&request.to_rpc(), privy_id).await,
            None => self.sign_hash_with_claiming_wallet(&request.params.hash),
        }
    }

    /// `eth_signTransaction` for the authenticated user's delegated
    /// wallet; the destination must be whitelisted.
    pub async fn eth_sign_transaction(
        &self,
        token: &str,
        request: &SignerRpcRequest,
    ) -> Result<super::data::EthSignTransactionResponse, ApiError> {
        self.verify_eth_destination(request)?;
        let privy_id = self.authenticate_user(token)?;
        self.execute_privy_signing(request, &privy_id).await
    }

    /// `eth_sendTransaction` for the authenticated user's delegated
    /// wallet; the destination must be whitelisted.
    pub async fn eth_send_transaction(
        &self,
        token: &str,
        request: &SignerRpcRequest,
    ) -> Result<super::data::EthSendTransactionResponse, ApiError> {
        self.verify_eth_destination(request)?;
        let privy_id = self.authenticate_user(token)?;
        self.execute_privy_signing(request, &privy_id).await
    }

    /// `personal_sign` for the authenticated user's delegated wallet.
    pub async fn personal_sign(
        &self,
        token: &str,
        request: &SignerRpcRequest,
    ) -> Result<PersonalSignResponse, ApiError> {
        self.verify_eth_destination(request)?;
        let privy_id = self.authenticate_user(token)?;
        self.execute_privy_signing(request, &privy_id).await
    }

    /// Solana `signMessage` against an explicit wallet.
    pub async fn sol_sign_message(
        &self,
        request: &SignerRpcRequest,
        wallet_id: &str,
    ) -> Result<SolSignMessageResponse, ApiError> {
        self.sign_rpc(request, wallet_id).await
    }

    /// Solana `signTransaction` against an explicit wallet.
    pub async fn sol_sign_transaction(
        &self,
        request: &SignerRpcRequest,
        wallet_id: &str,
    ) -> Result<SolSignTransactionResponse, ApiError> {
        self.sign_rpc(request, wallet_id).await
    }

    /// Solana `signAndSendTransaction` against an explicit wallet.
    pub async fn sol_sign_and_send_transaction(
        &self,
        request: &SignerRpcRequest,
        wallet_id: &str,
    ) -> Result<SolSignAndSendTransactionResponse, ApiError> {
        self.sign_rpc(request, wallet_id).await
    }

    fn verify_eth_destination(&self, request: &SignerRpcRequest) -> Result<(), ApiError> {
        if self.whitelist.verify_eth_request(request) {
            Ok(())
        } else {
            warn!(method = request.method(), "destination rejected by whitelist");
            Err(ApiError::bad_request("tx data is invalid"))
        }
    }

    pub(crate) fn tee(&self) -> &TeeConfig {
        &self.tee
    }

    // =========================================================================
    // Plumbing
    // =========================================================================

    /// Builder with the headers attached to every provider request.
    fn standard_request(&self, method: &str, url: &str) -> http::request::Builder {
        Request::builder()
            .method(method)
            .uri(url)
            .header("privy-app-id", &self.tee.privy.app_id)
            .header("Authorization", format!("Basic {}", self.authorization))
            .header("Content-Type", "application/json")
    }

    async fn dispatch(&self, req: Request<Full<Bytes>>) -> Result<HttpResponse, ApiError> {
        self.http.request(req).await.map_err(|err| {
            error!(error = %err, "privy request failed in transport");
            ApiError::internal()
        })
    }
}

/// Decode the provider's structured error envelope; propagate its status
/// with the parsed `error` string, falling back to a fixed marker when
/// the body is not the expected shape.
fn upstream_error(response: &HttpResponse) -> ApiError {
    #[derive(Deserialize)]
    struct PrivyErrorBody {
        error: Option<String>,
    }

    let message = response
        .json::<PrivyErrorBody>()
        .ok()
        .and_then(|body| body.error)
        .unwrap_or_else(|| "Unable to parse Privy Error".to_owned());
    ApiError::upstream(response.status, message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_templates_build_urls() {
        assert_eq!(
            GET_USER_PATH.build("did:privy:u123"),
            "/v1/users/did:privy:u123"
        );
        assert_eq!(SIGN_TX_PATH.build("wallet-1"), "/v1/wallets/wallet-1/rpc");
        assert_eq!(
            CREATE_WALLET_PATH.build("did:privy:u123"),
            "/v1/users/did:privy:u123/wallets"
        );
    }

    #[test]
    fn upstream_error_parses_provider_envelope() {
        let response = HttpResponse {
            status: StatusCode::UNPROCESSABLE_ENTITY,
            body: Bytes::from_static(br#"{"error":"wallet is not delegated"}"#),
        };
        let err = upstream_error(&response);
        assert_eq!(err.status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(err.message, "wallet is not delegated");
    }

    #[test]
    fn upstream_error_falls_back_on_unparseable_bodies() {
        for body in [&b"<html>bad gateway</html>"[..], b"", b"{\"detail\":42}"] {
            let response = HttpResponse {
                status: StatusCode::BAD_GATEWAY,
                body: Bytes::copy_from_slice(body),
            };
            let err = upstream_error(&response);
            assert_eq!(err.status, StatusCode::BAD_GATEWAY);
            assert_eq!(err.message, "Unable to parse Privy Error");
        }
    }

    mod auth_boundary {
        use std::sync::Arc;

        use super::*;
        use crate::config::{
            AxalConfig, Environment, PortConfig, PrivyConfig, TeeConfig, WhitelistConfig,
        };
        use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
        use p256::pkcs8::{EncodePrivateKey, EncodePublicKey, LineEnding};
        use p256::SecretKey;
        use rand::rngs::OsRng;
        use serde::Serialize;

        const APP_ID: &str = "test-app";
        const HMAC_SECRET: &str = "orchestrator-secret";

        #[derive(Serialize)]
        struct Claims {
            sub: String,
            aud: String,
            iss: String,
            exp: i64,
            iat: i64,
        }

        fn client_with_keys() -> (PrivyClient, String) {
            let secret = SecretKey::random(&mut OsRng);
            let private_pem = secret.to_pkcs8_pem(LineEnding::LF).unwrap().to_string();
            let public_pem = secret.public_key().to_public_key_pem(LineEnding::LF).unwrap();

            let whitelist_cfg = WhitelistConfig {
                whitelisted_pools: vec!["0x1234567890123456789012345678901234567890".into()],
            };
            let tee = TeeConfig {
                environment: Environment::Dev,
                region: Default::default(),
                ports: PortConfig {
                    aws_secret_manager_vsock_port: 1,
                    privy_api_vsock_port: 1,
                    router_vsock_port: 1,
                    ec2_creds_vsock_port: 1,
                },
                whitelist: whitelist_cfg.clone(),
                aws_credentials: None,
                privy: PrivyConfig {
                    app_id: APP_ID.into(),
                    app_secret: "app-secret".into(),
                    delegated_actions_key: "unused".into(),
                    jwt_verification_key: public_pem,
                    delegated_actions_key_id: "kid".into(),
                },
                axal: Some(AxalConfig {
                    axal_request_secret_key: HMAC_SECRET.into(),
                    axal_claiming_wallet_pk: None,
                }),
            };
            let whitelist =
                Arc::new(crate::whitelist::AddressWhitelist::from_config(&whitelist_cfg).unwrap());
            let client = PrivyClient::new(Arc::new(tee), whitelist).unwrap();
            (client, private_pem)
        }

        fn token(private_pem: &str, sub: &str) -> String {
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .unwrap()
                .as_secs() as i64;
            let claims = Claims {
                sub: sub.into(),
                aud: APP_ID.into(),
                iss: "privy.io".into(),
                exp: now + 3600,
                iat: now,
            };
            encode(
                &Header::new(Algorithm::ES256),
                &claims,
                &EncodingKey::from_ec_pem(private_pem.as_bytes()).unwrap(),
            )
            .unwrap()
        }

        #[test]
        fn authenticate_user_extracts_principal() {
            let (client, private_pem) = client_with_keys();
            let token = token(&private_pem, "did:privy:u123");
            assert_eq!(client.authenticate_user(&token).unwrap(), "did:privy:u123");
        }

        #[test]
        fn authenticate_user_rejects_bad_tokens_with_401() {
            let (client, private_pem) = client_with_keys();

            let err = client.authenticate_user("not-a-jwt").unwrap_err();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);

            let err = client
                .authenticate_user(&token(&private_pem, "user_123"))
                .unwrap_err();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
            assert_eq!(err.message, "Unauthorized User - Invalid JWT");
        }

        #[test]
        fn authenticate_axal_verifies_hmac_over_the_raw_hash() {
            let (client, _) = client_with_keys();
            let hash = "0x59f6f0ad2299c02ceb64a7e1efb2d984dd0a3d9f7c914b2a766d313dfabad313";
            let signature = {
                use hmac::{Hmac, Mac};
                let mut mac =
                    Hmac::<sha2::Sha256>::new_from_slice(HMAC_SECRET.as_bytes()).unwrap();
                mac.update(hash.as_bytes());
                hex::encode(mac.finalize().into_bytes())
            };

            assert!(client.authenticate_axal(&signature, hash).is_ok());

            let err = client.authenticate_axal(&signature, "0xother").unwrap_err();
            assert_eq!(err.status, StatusCode::UNAUTHORIZED);
            assert_eq!(err.message, "Unauthorized User - Invalid HMAC");
        }
    }
}
