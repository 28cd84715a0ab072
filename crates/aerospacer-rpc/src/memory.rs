//! In-memory account source
//!
//! Holds accounts keyed by address with their owning program. Filters are
//! evaluated locally with the same semantics the validator applies.

use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use aerospacer_core::AccountId;
use async_trait::async_trait;

use crate::{AccountFilter, AccountSource, KeyedAccount, Result};

#[derive(Debug, Clone)]
struct StoredAccount {
    program: AccountId,
    data: Vec<u8>,
}

/// Account source backed by a map, for tests and offline replay
#[derive(Debug, Default)]
pub struct MemoryAccountSource {
    accounts: RwLock<BTreeMap<AccountId, StoredAccount>>,
}

impl MemoryAccountSource {
    pub fn new() -> Self {
        Self::default()
    }

    // Every mutation is a single map operation, so a panicking holder
    // cannot leave the map half-updated.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<AccountId, StoredAccount>> {
        self.accounts.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<AccountId, StoredAccount>> {
        self.accounts.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Insert or replace an account
    pub fn insert(&self, program: AccountId, address: AccountId, data: Vec<u8>) {
        self.write().insert(address, StoredAccount { program, data });
    }

    pub fn remove(&self, address: &AccountId) -> bool {
        self.write().remove(address).is_some()
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[async_trait]
impl AccountSource for MemoryAccountSource {
    async fn get_program_accounts(
        &self,
        program: &AccountId,
        filters: &[AccountFilter],
    ) -> Result<Vec<KeyedAccount>> {
        let accounts = self.read();
        Ok(accounts
            .iter()
            .filter(|(_, stored)| stored.program == *program)
            .filter(|(_, stored)| filters.iter().all(|f| f.matches(&stored.data)))
            .map(|(address, stored)| KeyedAccount::new(*address, stored.data.clone()))
            .collect())
    }

    async fn get_multiple_accounts(&self, ids: &[AccountId]) -> Result<Vec<Option<Vec<u8>>>> {
        let accounts = self.read();
        Ok(ids
            .iter()
            .map(|id| accounts.get(id).map(|stored| stored.data.clone()))
            .collect())
    }
}
