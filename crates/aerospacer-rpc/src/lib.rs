//! aerospacer-rpc: Account access for the ledger replica
//!
//! The ledger only ever needs raw account bytes. [`AccountSource`] is the
//! seam between the pure derivation code and the network. [`RpcClient`]
//! talks to a validator through `solana-client` and [`MemoryAccountSource`]
//! serves fixtures.

pub mod client;
pub mod memory;

use aerospacer_core::{AccountId, RpcError};
use async_trait::async_trait;

pub use client::{decode_return_data, RpcClient};
pub use memory::MemoryAccountSource;

/// Result type for account source operations
pub type Result<T> = std::result::Result<T, RpcError>;

/// An account's address paired with its raw data
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyedAccount {
    pub address: AccountId,
    pub data: Vec<u8>,
}

impl KeyedAccount {
    pub fn new(address: AccountId, data: Vec<u8>) -> Self {
        Self { address, data }
    }
}

/// Server-side filters for program account scans
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AccountFilter {
    /// Account data at `offset` must start with `bytes`
    Memcmp { offset: usize, bytes: Vec<u8> },
    /// Account data must be exactly this many bytes
    DataSize(usize),
}

impl AccountFilter {
    pub fn memcmp(offset: usize, bytes: impl Into<Vec<u8>>) -> Self {
        Self::Memcmp {
            offset,
            bytes: bytes.into(),
        }
    }

    /// Local evaluation, matching validator semantics
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            Self::Memcmp { offset, bytes } => data
                .get(*offset..)
                .map(|rest| rest.starts_with(bytes))
                .unwrap_or(false),
            Self::DataSize(size) => data.len() == *size,
        }
    }
}

/// Read-only access to on-chain accounts
#[async_trait]
pub trait AccountSource: Send + Sync {
    /// All accounts owned by `program` that pass every filter
    async fn get_program_accounts(
        &self,
        program: &AccountId,
        filters: &[AccountFilter],
    ) -> Result<Vec<KeyedAccount>>;

    /// One entry per requested id, in order; `None` marks a missing account
    async fn get_multiple_accounts(&self, ids: &[AccountId]) -> Result<Vec<Option<Vec<u8>>>>;

    async fn get_account(&self, id: &AccountId) -> Result<Option<Vec<u8>>> {
        let mut found = self.get_multiple_accounts(std::slice::from_ref(id)).await?;
        Ok(found.pop().flatten())
    }
}
