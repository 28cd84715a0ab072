//! Validator account source
//!
//! Wraps the nonblocking `solana-client` RPC client for the two calls the
//! ledger needs: `getProgramAccounts` and `getMultipleAccounts`, both
//! base64-encoded.

use std::sync::Arc;
use std::time::Duration;

use aerospacer_core::{AccountId, RpcConfig, RpcError};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use solana_account_decoder::UiAccountEncoding;
use solana_client::client_error::{ClientError, ClientErrorKind};
use solana_client::nonblocking::rpc_client::RpcClient as SolanaRpcClient;
use solana_client::rpc_config::{RpcAccountInfoConfig, RpcProgramAccountsConfig};
use solana_client::rpc_filter::{Memcmp, RpcFilterType};
use solana_client::rpc_request::RpcError as SolanaRpcError;
use solana_sdk::commitment_config::CommitmentConfig;
use solana_sdk::pubkey::Pubkey;

use crate::{AccountFilter, AccountSource, KeyedAccount, Result};

/// `getMultipleAccounts` accepts at most this many keys per call
const MAX_MULTIPLE_ACCOUNTS: usize = 100;

/// RPC client for a Solana validator
#[derive(Clone)]
pub struct RpcClient {
    inner: Arc<SolanaRpcClient>,
    config: RpcConfig,
}

impl RpcClient {
    pub fn new(config: RpcConfig) -> Result<Self> {
        if !(config.url.starts_with("http://") || config.url.starts_with("https://")) {
            return Err(RpcError::Unreachable {
                url: format!("{}: not an http(s) endpoint", config.url),
            });
        }
        let inner = SolanaRpcClient::new_with_timeout_and_commitment(
            config.url.clone(),
            Duration::from_secs(config.timeout_secs),
            CommitmentConfig::confirmed(),
        );
        Ok(Self {
            inner: Arc::new(inner),
            config,
        })
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout_secs)
    }

    fn map_error(&self, method: &str, e: ClientError) -> RpcError {
        match e.kind() {
            ClientErrorKind::RpcError(SolanaRpcError::RpcResponseError { code, message, .. }) => {
                RpcError::ApiError {
                    code: *code,
                    message: message.clone(),
                }
            }
            ClientErrorKind::Reqwest(_) | ClientErrorKind::Io(_) => RpcError::Unreachable {
                url: format!("{}: {}", self.config.url, e),
            },
            _ => RpcError::ParseError(format!("{}: {}", method, e)),
        }
    }
}

#[async_trait]
impl AccountSource for RpcClient {
    async fn get_program_accounts(
        &self,
        program: &AccountId,
        filters: &[AccountFilter],
    ) -> Result<Vec<KeyedAccount>> {
        let config = program_accounts_config(filters);
        let request = async {
            self.inner
                .get_program_accounts_with_config(&program.to_pubkey(), config)
                .await
                .map_err(|e| self.map_error("getProgramAccounts", e))
        };
        let accounts = timed_request(self.timeout(), request).await?;
        tracing::debug!(program = %program, count = accounts.len(), "getProgramAccounts");

        Ok(accounts
            .into_iter()
            .map(|(address, account)| KeyedAccount::new(address.into(), account.data))
            .collect())
    }

    async fn get_multiple_accounts(&self, ids: &[AccountId]) -> Result<Vec<Option<Vec<u8>>>> {
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(MAX_MULTIPLE_ACCOUNTS) {
            let keys: Vec<Pubkey> = chunk.iter().map(AccountId::to_pubkey).collect();
            let request = async {
                self.inner
                    .get_multiple_accounts(&keys)
                    .await
                    .map_err(|e| self.map_error("getMultipleAccounts", e))
            };
            let accounts = timed_request(self.timeout(), request).await?;

            if accounts.len() != chunk.len() {
                return Err(RpcError::ParseError(format!(
                    "getMultipleAccounts: asked for {} accounts, got {}",
                    chunk.len(),
                    accounts.len()
                )));
            }
            out.extend(accounts.into_iter().map(|a| a.map(|a| a.data)));
        }
        Ok(out)
    }
}

fn to_rpc_filter(filter: &AccountFilter) -> RpcFilterType {
    match filter {
        AccountFilter::Memcmp { offset, bytes } => {
            RpcFilterType::Memcmp(Memcmp::new_raw_bytes(*offset, bytes.clone()))
        }
        AccountFilter::DataSize(size) => RpcFilterType::DataSize(*size as u64),
    }
}

fn program_accounts_config(filters: &[AccountFilter]) -> RpcProgramAccountsConfig {
    RpcProgramAccountsConfig {
        filters: Some(filters.iter().map(to_rpc_filter).collect()),
        account_config: RpcAccountInfoConfig {
            encoding: Some(UiAccountEncoding::Base64),
            commitment: Some(CommitmentConfig::confirmed()),
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Decode base64 return data from a simulated `get_price` call
pub fn decode_return_data(encoded: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(encoded.trim())
        .map_err(|e| RpcError::ParseError(format!("return data: {}", e)))
}

/// Bound an RPC future by `timeout`
async fn timed_request<T>(
    timeout: Duration,
    fut: impl std::future::Future<Output = Result<T>>,
) -> Result<T> {
    tokio::time::timeout(timeout, fut)
        .await
        .map_err(|_| RpcError::Timeout {
            secs: timeout.as_secs(),
        })?
}
