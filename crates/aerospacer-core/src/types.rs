//! Core type definitions for the Aerospacer ledger replica

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use solana_sdk::pubkey::Pubkey;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Account identifier (32 bytes, base58-encoded when displayed)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct AccountId(pub [u8; 32]);

/// Errors while parsing a base58 account identifier
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AccountIdError {
    #[error("Invalid base58 character {0:?}")]
    InvalidCharacter(char),

    #[error("Invalid base58: {0}")]
    InvalidBase58(String),

    #[error("Account id must be 32 bytes, got {0}")]
    InvalidLength(usize),
}

impl From<bs58::decode::Error> for AccountIdError {
    fn from(e: bs58::decode::Error) -> Self {
        match e {
            bs58::decode::Error::InvalidCharacter { character, .. } => {
                AccountIdError::InvalidCharacter(character)
            }
            other => AccountIdError::InvalidBase58(other.to_string()),
        }
    }
}

impl AccountId {
    pub const LEN: usize = 32;

    pub fn new(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Build from a slice, which must be exactly 32 bytes
    pub fn from_slice(bytes: &[u8]) -> Option<Self> {
        let arr: [u8; 32] = bytes.try_into().ok()?;
        Some(Self(arr))
    }

    pub fn to_base58(&self) -> String {
        bs58::encode(self.0).into_string()
    }

    pub fn to_pubkey(&self) -> Pubkey {
        Pubkey::new_from_array(self.0)
    }

    /// Program-derived address for `seeds` under this program id, with its bump
    pub fn find_program_address(&self, seeds: &[&[u8]]) -> (AccountId, u8) {
        let (address, bump) = Pubkey::find_program_address(seeds, &self.to_pubkey());
        (address.into(), bump)
    }
}

impl From<Pubkey> for AccountId {
    fn from(pubkey: Pubkey) -> Self {
        Self(pubkey.to_bytes())
    }
}

impl From<AccountId> for Pubkey {
    fn from(id: AccountId) -> Self {
        id.to_pubkey()
    }
}

impl AsRef<[u8]> for AccountId {
    fn as_ref(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_base58())
    }
}

impl FromStr for AccountId {
    type Err = AccountIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let bytes = bs58::decode(s).into_vec()?;
        let len = bytes.len();
        Self::from_slice(&bytes).ok_or(AccountIdError::InvalidLength(len))
    }
}

impl Serialize for AccountId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_base58())
    }
}

impl<'de> Deserialize<'de> for AccountId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(serde::de::Error::custom)
    }
}

/// Solana cluster
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    #[default]
    Devnet,
    Testnet,
    Mainnet,
}

impl Network {
    pub fn default_rpc_url(&self) -> &'static str {
        match self {
            Network::Devnet => "https://api.devnet.solana.com",
            Network::Testnet => "https://api.testnet.solana.com",
            Network::Mainnet => "https://api.mainnet-beta.solana.com",
        }
    }
}

impl fmt::Display for Network {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Network::Devnet => write!(f, "devnet"),
            Network::Testnet => write!(f, "testnet"),
            Network::Mainnet => write!(f, "mainnet"),
        }
    }
}
