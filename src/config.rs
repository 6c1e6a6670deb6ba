// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! once at startup into [`AppConfig`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `DATA_DIR` | Directory holding the status database | `/data` |
//! | `STATUS_DB_FILE` | Status database file name inside `DATA_DIR` | `status.redb` |
//! | `JWT_SECRET_KEY` | HS256 secret for session tokens | Required (fixed value with `dev` feature) |
//! | `COOKIE_SECURE` | Add `Secure` to the session cookie | `false` |
//! | `TLS_CERT_PATH` | PEM certificate chain; HTTPS when set with `TLS_KEY_PATH` | Optional |
//! | `TLS_KEY_PATH` | PEM private key | Optional |
//! | `LEDGER_RPC_URL` | RPC endpoint of the vault ledger network | Sepolia public RPC |
//! | `LEDGER_CONTRACT_ADDRESS` | Deployed `VaultStorage` contract | Sepolia deployment |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use alloy::signers::local::PrivateKeySigner;

use crate::blockchain::{LedgerError, VaultContractLedger, SEPOLIA, VAULT_CONTRACT_ADDRESS};

pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";

/// Environment variable name for the data directory path.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const STATUS_DB_FILE_ENV: &str = "STATUS_DB_FILE";
pub const JWT_SECRET_ENV: &str = "JWT_SECRET_KEY";
pub const COOKIE_SECURE_ENV: &str = "COOKIE_SECURE";
pub const TLS_CERT_PATH_ENV: &str = "TLS_CERT_PATH";
pub const TLS_KEY_PATH_ENV: &str = "TLS_KEY_PATH";
pub const LEDGER_RPC_URL_ENV: &str = "LEDGER_RPC_URL";
pub const LEDGER_CONTRACT_ENV: &str = "LEDGER_CONTRACT_ADDRESS";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";

pub const DEFAULT_HOST: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_DATA_DIR: &str = "/data";
pub const DEFAULT_STATUS_DB_FILE: &str = "status.redb";
pub const DEFAULT_LOG_FILTER: &str = "info,tower_http=debug";

/// Minimum accepted length of `JWT_SECRET_KEY`, in bytes.
pub const MIN_JWT_SECRET_LEN: usize = 32;

#[cfg(feature = "dev")]
const DEV_JWT_SECRET: &str = "paaskeeper-development-secret-do-not-deploy";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{name} is invalid: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TlsPaths {
    pub cert: PathBuf,
    pub key: PathBuf,
}

#[derive(Clone)]
pub struct AppConfig {
    pub bind_address: SocketAddr,
    pub data_dir: PathBuf,
    pub status_db_file: String,
    pub jwt_secret: Vec<u8>,
    pub cookie_secure: bool,
    pub tls: Option<TlsPaths>,
    pub ledger_rpc_url: String,
    pub ledger_contract: String,
    pub log_format: LogFormat,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("bind_address", &self.bind_address)
            .field("data_dir", &self.data_dir)
            .field("status_db_file", &self.status_db_file)
            .field("jwt_secret", &"<redacted>")
            .field("cookie_secure", &self.cookie_secure)
            .field("tls", &self.tls)
            .field("ledger_rpc_url", &self.ledger_rpc_url)
            .field("ledger_contract", &self.ledger_contract)
            .field("log_format", &self.log_format)
            .finish()
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Build the configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let var = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let host = var(HOST_ENV).unwrap_or_else(|| DEFAULT_HOST.to_string());
        let port = match var(PORT_ENV) {
            Some(raw) => raw.trim().parse::<u16>().map_err(|e| ConfigError::Invalid {
                name: PORT_ENV,
                reason: e.to_string(),
            })?,
            None => DEFAULT_PORT,
        };
        let bind_address = format!("{host}:{port}")
            .parse()
            .map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
                name: HOST_ENV,
                reason: e.to_string(),
            })?;

        let tls = match (var(TLS_CERT_PATH_ENV), var(TLS_KEY_PATH_ENV)) {
            (Some(cert), Some(key)) => Some(TlsPaths {
                cert: cert.into(),
                key: key.into(),
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing(TLS_KEY_PATH_ENV)),
            (None, Some(_)) => return Err(ConfigError::Missing(TLS_CERT_PATH_ENV)),
        };

        Ok(Self {
            bind_address,
            data_dir: var(DATA_DIR_ENV)
                .unwrap_or_else(|| DEFAULT_DATA_DIR.to_string())
                .into(),
            status_db_file: var(STATUS_DB_FILE_ENV)
                .unwrap_or_else(|| DEFAULT_STATUS_DB_FILE.to_string()),
            jwt_secret: jwt_secret(var(JWT_SECRET_ENV))?,
            cookie_secure: parse_bool(var(COOKIE_SECURE_ENV).as_deref()),
            tls,
            ledger_rpc_url: var(LEDGER_RPC_URL_ENV).unwrap_or_else(|| SEPOLIA.rpc_url.to_string()),
            ledger_contract: var(LEDGER_CONTRACT_ENV)
                .unwrap_or_else(|| VAULT_CONTRACT_ADDRESS.to_string()),
            log_format: match var(LOG_FORMAT_ENV).as_deref().map(str::trim) {
                Some(f) if f.eq_ignore_ascii_case("json") => LogFormat::Json,
                _ => LogFormat::Pretty,
            },
        })
    }

    pub fn status_db_path(&self) -> PathBuf {
        self.data_dir.join(&self.status_db_file)
    }

    /// Vault ledger on the configured network, writing as `signer`.
    pub fn vault_ledger(&self, signer: PrivateKeySigner) -> Result<VaultContractLedger, LedgerError> {
        VaultContractLedger::new(&self.ledger_rpc_url, &self.ledger_contract, signer)
    }
}

fn jwt_secret(raw: Option<String>) -> Result<Vec<u8>, ConfigError> {
    match raw {
        Some(secret) if secret.len() >= MIN_JWT_SECRET_LEN => Ok(secret.into_bytes()),
        Some(_) => Err(ConfigError::Invalid {
            name: JWT_SECRET_ENV,
            reason: format!("must be at least {MIN_JWT_SECRET_LEN} bytes"),
        }),
        #[cfg(feature = "dev")]
        None => Ok(DEV_JWT_SECRET.as_bytes().to_vec()),
        #[cfg(not(feature = "dev"))]
        None => Err(ConfigError::Missing(JWT_SECRET_ENV)),
    }
}

fn parse_bool(raw: Option<&str>) -> bool {
    matches!(
        raw.map(|v| v.trim().to_ascii_lowercase()).as_deref(),
        Some("1" | "true" | "yes" | "on")
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    fn load(vars: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|name| map.get(name).cloned())
    }

    #[test]
    fn defaults_apply() {
        let config = load(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert_eq!(config.bind_address.to_string(), "0.0.0.0:8080");
        assert_eq!(config.status_db_path(), PathBuf::from("/data/status.redb"));
        assert!(!config.cookie_secure);
        assert!(config.tls.is_none());
        assert_eq!(config.ledger_contract, VAULT_CONTRACT_ADDRESS);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn overrides_apply() {
        let config = load(&[
            (JWT_SECRET_ENV, SECRET),
            (HOST_ENV, "127.0.0.1"),
            (PORT_ENV, "9443"),
            (COOKIE_SECURE_ENV, "true"),
            (TLS_CERT_PATH_ENV, "/certs/server.pem"),
            (TLS_KEY_PATH_ENV, "/certs/server.key"),
            (LOG_FORMAT_ENV, "JSON"),
        ])
        .unwrap();
        assert_eq!(config.bind_address.to_string(), "127.0.0.1:9443");
        assert!(config.cookie_secure);
        assert_eq!(config.tls.unwrap().cert, PathBuf::from("/certs/server.pem"));
        assert_eq!(config.log_format, LogFormat::Json);
    }

    #[test]
    fn tls_paths_come_in_pairs() {
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET), (TLS_CERT_PATH_ENV, "/c.pem")]),
            Err(ConfigError::Missing(TLS_KEY_PATH_ENV))
        ));
    }

    #[test]
    fn rejects_bad_port_and_short_secret() {
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, SECRET), (PORT_ENV, "http")]),
            Err(ConfigError::Invalid { name: PORT_ENV, .. })
        ));
        assert!(matches!(
            load(&[(JWT_SECRET_ENV, "short")]),
            Err(ConfigError::Invalid { name: JWT_SECRET_ENV, .. })
        ));
    }

    #[cfg(not(feature = "dev"))]
    #[test]
    fn secret_is_required() {
        assert!(matches!(load(&[]), Err(ConfigError::Missing(JWT_SECRET_ENV))));
    }

    #[test]
    fn vault_ledger_uses_configured_contract() {
        let config = load(&[(JWT_SECRET_ENV, SECRET), (LEDGER_RPC_URL_ENV, "http://127.0.0.1:8545")])
            .unwrap();
        let ledger = config.vault_ledger(PrivateKeySigner::random()).unwrap();
        assert_eq!(
            ledger.contract_address().to_string().to_lowercase(),
            VAULT_CONTRACT_ADDRESS.to_lowercase()
        );
    }

    #[test]
    fn debug_redacts_secret() {
        let config = load(&[(JWT_SECRET_ENV, SECRET)]).unwrap();
        assert!(!format!("{config:?}").contains(SECRET));
    }
}
