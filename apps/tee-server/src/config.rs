// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # TEE Configuration
//!
//! Process-wide configuration, loaded once at startup and immutable after.
//!
//! The on-disk part is a YAML file:
//!
//! ```yaml
//! environment: prod            # prod | staging | dev | local
//! region: us-east-2            # optional, defaults to us-east-2
//! ports:
//!   aws_secret_manager_vsock_port: 50001
//!   privy_api_vsock_port: 50002
//!   router_vsock_port: 50003
//!   ec2_creds_vsock_port: 50004    # may be zero in local
//! whitelist:
//!   whitelisted_pools:
//!     - "0x1234567890123456789012345678901234567890"
//! aws_credentials:             # local only
//!   access_key: AKIA...
//!   access_secret: ...
//!   region: us-east-2
//! ```
//!
//! The custody-provider (`privy`) and operator (`axal`) sections are never
//! stored on disk: they are fetched from AWS Secrets Manager during
//! bootstrap, through the enclave's vsock-tunneled TLS transport.

use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::aws::region::AwsRegion;
use crate::aws::secrets::SecretsManager;

/// Deployment environment tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Local,
    Dev,
    Staging,
    Prod,
}

impl Environment {
    /// Environments where token expiry is enforced. Dev and local accept
    /// expired tokens so deterministic test tokens keep working.
    pub fn enforces_token_expiry(self) -> bool {
        matches!(self, Environment::Staging | Environment::Prod)
    }

    /// Secret Manager name of the custody-provider config for this
    /// environment. Dev and local share the dev secret.
    pub fn privy_secret_name(self) -> &'static str {
        match self {
            Environment::Prod => "prod/privy",
            Environment::Staging => "staging/privy",
            Environment::Dev | Environment::Local => "dev/privy",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Environment::Local => "local",
            Environment::Dev => "dev",
            Environment::Staging => "staging",
            Environment::Prod => "prod",
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Vsock port map for the four host-proxied channels.
#[derive(Debug, Clone, Deserialize)]
pub struct PortConfig {
    pub aws_secret_manager_vsock_port: u32,
    pub privy_api_vsock_port: u32,
    pub router_vsock_port: u32,
    /// Instance-metadata proxy. May be zero in `local`, where static
    /// credentials come from the config file instead.
    #[serde(default)]
    pub ec2_creds_vsock_port: u32,
}

/// Destination-address whitelist, loaded at startup.
#[derive(Debug, Clone, Deserialize)]
pub struct WhitelistConfig {
    pub whitelisted_pools: Vec<String>,
}

/// Static AWS credentials for local development.
#[derive(Clone, Deserialize)]
pub struct AwsCredentialsConfig {
    pub access_key: String,
    pub access_secret: String,
    #[serde(default)]
    pub session_token: Option<String>,
    #[serde(default)]
    pub region: Option<AwsRegion>,
}

impl fmt::Debug for AwsCredentialsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AwsCredentialsConfig")
            .field("access_key", &self.access_key)
            .field("access_secret", &format_args!("<{} bytes>", self.access_secret.len()))
            .field("session_token", &self.session_token.as_ref().map(|t| t.len()))
            .field("region", &self.region)
            .finish()
    }
}

/// Custody-provider configuration, fetched from the secret store.
#[derive(Clone, Default, Deserialize)]
pub struct PrivyConfig {
    pub app_id: String,
    pub app_secret: String,
    /// PKCS#8 ECDSA P-256 key, base64, optionally prefixed `wallet-auth:`.
    pub delegated_actions_key: String,
    /// PEM ECDSA P-256 public key; may arrive single-line with spaces
    /// instead of newlines.
    pub jwt_verification_key: String,
    #[serde(rename = "key_id", default)]
    pub delegated_actions_key_id: String,
}

impl fmt::Debug for PrivyConfig {
    // Secret material never appears in logs, only lengths.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PrivyConfig")
            .field("app_id", &self.app_id)
            .field("app_secret", &format_args!("<{} bytes>", self.app_secret.len()))
            .field(
                "delegated_actions_key",
                &format_args!("<{} bytes>", self.delegated_actions_key.len()),
            )
            .field(
                "jwt_verification_key",
                &format_args!("<{} bytes>", self.jwt_verification_key.len()),
            )
            .field("delegated_actions_key_id", &self.delegated_actions_key_id)
            .finish()
    }
}

/// Operator ("Axal") configuration, fetched from the secret store in
/// non-local environments.
#[derive(Clone, Default, Deserialize)]
pub struct AxalConfig {
    pub axal_request_secret_key: String,
    /// Hex-encoded secp256k1 private key for on-chain claiming, optional.
    #[serde(default)]
    pub axal_claiming_wallet_pk: Option<String>,
}

impl fmt::Debug for AxalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AxalConfig")
            .field(
                "axal_request_secret_key",
                &format_args!("<{} bytes>", self.axal_request_secret_key.len()),
            )
            .field(
                "axal_claiming_wallet_pk",
                &self.axal_claiming_wallet_pk.as_ref().map(|k| k.len()),
            )
            .finish()
    }
}

/// Complete TEE configuration: the on-disk file plus the secrets fetched
/// during bootstrap.
#[derive(Debug, Clone)]
pub struct TeeConfig {
    pub environment: Environment,
    pub region: AwsRegion,
    pub ports: PortConfig,
    pub whitelist: WhitelistConfig,
    pub aws_credentials: Option<AwsCredentialsConfig>,
    pub privy: PrivyConfig,
    pub axal: Option<AxalConfig>,
}

/// The YAML file layout; everything else in [`TeeConfig`] is bootstrapped.
#[derive(Deserialize)]
struct TeeFileConfig {
    environment: Environment,
    #[serde(default)]
    region: Option<AwsRegion>,
    ports: PortConfig,
    whitelist: WhitelistConfig,
    #[serde(default)]
    aws_credentials: Option<AwsCredentialsConfig>,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config from {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse config from {path}: {source}")]
    Parse {
        path: String,
        source: serde_yaml::Error,
    },
    #[error("no port loaded from config: {0}")]
    MissingPort(&'static str),
    #[error("whitelist must contain at least one pool address")]
    EmptyWhitelist,
    #[error("could not fetch aws credentials from config file")]
    MissingAwsCredentials,
    #[error("secret missing required fields")]
    IncompleteSecret,
    #[error("failed to load {secret} from secrets manager: {source}")]
    SecretFetch {
        secret: String,
        source: crate::aws::AwsError,
    },
}

impl TeeConfig {
    /// Load and validate the on-disk part of the configuration. The
    /// custody-provider and operator sections stay empty until
    /// [`TeeConfig::bootstrap_secrets`] runs.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let file: TeeFileConfig =
            serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
                path: path.display().to_string(),
                source,
            })?;

        if file.ports.aws_secret_manager_vsock_port == 0 {
            return Err(ConfigError::MissingPort("aws_secret_manager_vsock_port"));
        }
        if file.ports.privy_api_vsock_port == 0 {
            return Err(ConfigError::MissingPort("privy_api_vsock_port"));
        }
        if file.ports.router_vsock_port == 0 {
            return Err(ConfigError::MissingPort("router_vsock_port"));
        }
        if file.environment != Environment::Local && file.ports.ec2_creds_vsock_port == 0 {
            return Err(ConfigError::MissingPort("ec2_creds_vsock_port"));
        }
        if file.whitelist.whitelisted_pools.is_empty() {
            return Err(ConfigError::EmptyWhitelist);
        }
        if file.environment == Environment::Local {
            match &file.aws_credentials {
                Some(creds) if !creds.access_key.is_empty() && !creds.access_secret.is_empty() => {}
                _ => return Err(ConfigError::MissingAwsCredentials),
            }
        }

        info!(environment = %file.environment, "loaded tee config");

        Ok(Self {
            environment: file.environment,
            region: file.region.unwrap_or_default(),
            ports: file.ports,
            whitelist: file.whitelist,
            aws_credentials: file.aws_credentials,
            privy: PrivyConfig::default(),
            axal: None,
        })
    }

    /// Fetch the custody-provider config, and in non-local environments the
    /// operator config, from the cloud secret store.
    pub async fn bootstrap_secrets(&mut self) -> Result<(), ConfigError> {
        let sm = SecretsManager::bootstrap(self)
            .await
            .map_err(|source| ConfigError::SecretFetch {
                secret: "credentials".into(),
                source,
            })?;

        if self.environment != Environment::Local {
            info!("loading axal operator config from secrets manager");
            let secret_name = format!("{}/axal", self.environment);
            let axal: AxalConfig = sm.load_config(&secret_name).await.map_err(|source| {
                ConfigError::SecretFetch {
                    secret: secret_name.clone(),
                    source,
                }
            })?;
            self.axal = Some(axal);
            info!("loaded axal operator config");
        }

        info!("loading privy config from secrets manager");
        let secret_name = self.environment.privy_secret_name();
        let privy: PrivyConfig =
            sm.load_config(secret_name)
                .await
                .map_err(|source| ConfigError::SecretFetch {
                    secret: secret_name.into(),
                    source,
                })?;

        if privy.app_id.is_empty()
            || privy.app_secret.is_empty()
            || privy.delegated_actions_key.is_empty()
            || privy.jwt_verification_key.is_empty()
        {
            return Err(ConfigError::IncompleteSecret);
        }

        self.privy = privy;
        info!("loaded privy config");
        Ok(())
    }
}
