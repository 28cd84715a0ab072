//! Account Record Decoding
//!
//! Fixed-layout decoders for every account kind the ledger reads. Layouts
//! are Anchor/Borsh: an 8-byte discriminator, little-endian integers,
//! 32-byte raw account ids, strings as a u32 length prefix plus UTF-8
//! bytes, and u128 values as two u64 limbs (low first).
//!
//! `decode` takes the kind from the caller (it knows which query produced
//! the bytes) and skips the discriminator; `decode_checked` verifies it.
//! Both borrow the input and never mutate it. Trailing bytes beyond the
//! last field (account padding) are ignored.

use aerospacer_core::units::{u128_from_limbs, u128_to_limbs};
use aerospacer_core::{AccountId, DecodeError};
use num_bigint::BigUint;

use crate::constants::discriminators;

/// Account kinds this crate can decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordKind {
    Debt,
    Collateral,
    Ratio,
    Stake,
    PoolSnapshot,
    UserCollateralSnapshot,
    ProtocolState,
    /// Oracle `get_price` return data (no discriminator)
    OraclePrice,
}

impl RecordKind {
    /// On-chain type name
    pub fn name(&self) -> &'static str {
        match self {
            Self::Debt => "UserDebtAmount",
            Self::Collateral => "UserCollateralAmount",
            Self::Ratio => "LiquidityThreshold",
            Self::Stake => "UserStakeAmount",
            Self::PoolSnapshot => "StabilityPoolSnapshot",
            Self::UserCollateralSnapshot => "UserCollateralSnapshot",
            Self::ProtocolState => "StateAccount",
            Self::OraclePrice => "PriceResponse",
        }
    }

    pub fn discriminator(&self) -> Option<[u8; 8]> {
        match self {
            Self::Debt => Some(discriminators::USER_DEBT_AMOUNT),
            Self::Collateral => Some(discriminators::USER_COLLATERAL_AMOUNT),
            Self::Ratio => Some(discriminators::LIQUIDITY_THRESHOLD),
            Self::Stake => Some(discriminators::USER_STAKE_AMOUNT),
            Self::PoolSnapshot => Some(discriminators::STABILITY_POOL_SNAPSHOT),
            Self::UserCollateralSnapshot => Some(discriminators::USER_COLLATERAL_SNAPSHOT),
            Self::ProtocolState => Some(discriminators::STATE_ACCOUNT),
            Self::OraclePrice => None,
        }
    }

    /// Smallest valid encoding, with every string empty
    pub fn min_len(&self) -> usize {
        match self {
            Self::Debt => 8 + 32 + 8,
            Self::Collateral => 8 + 32 + 4 + 8,
            Self::Ratio => 8 + 32 + 8,
            Self::Stake => 8 + 32 + 8 + 16 + 8 + 8,
            Self::PoolSnapshot => 8 + 4 + 16 + 8 + 8,
            Self::UserCollateralSnapshot => 8 + 32 + 4 + 16 + 8,
            Self::ProtocolState => 8 + 32 * 5 + 8 + 1 + 32 + 8 + 8 + 8 + 16 + 8,
            Self::OraclePrice => 4 + 8 + 1 + 8 + 8 + 4,
        }
    }
}

// ===== Record types =====

/// Per-owner debt (`UserDebtAmount`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DebtRecord {
    pub owner: AccountId,
    /// aUSD minor units
    pub amount: u64,
}

/// Per-owner, per-denom collateral (`UserCollateralAmount`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollateralRecord {
    pub owner: AccountId,
    pub denom: String,
    pub amount: u64,
}

/// Stored collateralization ratio (`LiquidityThreshold`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RatioRecord {
    pub owner: AccountId,
    /// 1e6-scaled percent
    pub ratio: u64,
}

/// Stability pool deposit (`UserStakeAmount`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StakeRecord {
    pub owner: AccountId,
    pub amount: u64,
    /// P at the time of the last deposit/withdrawal
    pub scale_snapshot: BigUint,
    pub epoch_snapshot: u64,
    pub last_update_block: u64,
}

/// Per-denom pool gain factor (`StabilityPoolSnapshot`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolSnapshotRecord {
    pub denom: String,
    /// S
    pub gain_factor: BigUint,
    pub total_collateral_gained: u64,
    pub epoch: u64,
}

/// Per-owner, per-denom gain bookkeeping (`UserCollateralSnapshot`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserCollateralSnapshotRecord {
    pub owner: AccountId,
    pub denom: String,
    /// S at the time of the last claim
    pub gain_factor_snapshot: BigUint,
    /// Gain already credited but not yet withdrawn
    pub pending_gain: u64,
}

/// Global protocol state (`StateAccount`)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProtocolStateRecord {
    pub admin: AccountId,
    pub oracle_program: AccountId,
    pub oracle_state: AccountId,
    pub fee_distributor: AccountId,
    pub fee_state: AccountId,
    pub minimum_collateral_ratio: u64,
    pub protocol_fee: u8,
    pub stable_coin_mint: AccountId,
    pub stable_coin_code_id: u64,
    pub total_debt: u64,
    pub total_stake: u64,
    /// P
    pub scale_factor: BigUint,
    pub epoch: u64,
}

/// Oracle price answer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OraclePrice {
    pub denom: String,
    pub price: i64,
    /// Decimals of `price` when used in collateral value math
    pub decimal: u8,
    pub timestamp: i64,
    pub confidence: u64,
    pub exponent: i32,
}

impl OraclePrice {
    /// Human USD price: `price * 10^exponent`
    pub fn usd(&self) -> f64 {
        self.price as f64 * 10f64.powi(self.exponent)
    }
}

/// A decoded account of any supported kind
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Record {
    Debt(DebtRecord),
    Collateral(CollateralRecord),
    Ratio(RatioRecord),
    Stake(StakeRecord),
    PoolSnapshot(PoolSnapshotRecord),
    UserCollateralSnapshot(UserCollateralSnapshotRecord),
    ProtocolState(ProtocolStateRecord),
    OraclePrice(OraclePrice),
}

impl Record {
    pub fn kind(&self) -> RecordKind {
        match self {
            Self::Debt(_) => RecordKind::Debt,
            Self::Collateral(_) => RecordKind::Collateral,
            Self::Ratio(_) => RecordKind::Ratio,
            Self::Stake(_) => RecordKind::Stake,
            Self::PoolSnapshot(_) => RecordKind::PoolSnapshot,
            Self::UserCollateralSnapshot(_) => RecordKind::UserCollateralSnapshot,
            Self::ProtocolState(_) => RecordKind::ProtocolState,
            Self::OraclePrice(_) => RecordKind::OraclePrice,
        }
    }

    /// Encode with the on-chain layout, including the discriminator
    pub fn encode(&self) -> Vec<u8> {
        let mut w = ByteWriter::for_kind(self.kind());
        match self {
            Self::Debt(r) => {
                w.account_id(&r.owner);
                w.u64(r.amount);
            }
            Self::Collateral(r) => {
                w.account_id(&r.owner);
                w.string(&r.denom);
                w.u64(r.amount);
            }
            Self::Ratio(r) => {
                w.account_id(&r.owner);
                w.u64(r.ratio);
            }
            Self::Stake(r) => {
                w.account_id(&r.owner);
                w.u64(r.amount);
                w.u128(&r.scale_snapshot);
                w.u64(r.epoch_snapshot);
                w.u64(r.last_update_block);
            }
            Self::PoolSnapshot(r) => {
                w.string(&r.denom);
                w.u128(&r.gain_factor);
                w.u64(r.total_collateral_gained);
                w.u64(r.epoch);
            }
            Self::UserCollateralSnapshot(r) => {
                w.account_id(&r.owner);
                w.string(&r.denom);
                w.u128(&r.gain_factor_snapshot);
                w.u64(r.pending_gain);
            }
            Self::ProtocolState(r) => {
                w.account_id(&r.admin);
                w.account_id(&r.oracle_program);
                w.account_id(&r.oracle_state);
                w.account_id(&r.fee_distributor);
                w.account_id(&r.fee_state);
                w.u64(r.minimum_collateral_ratio);
                w.bytes(&[r.protocol_fee]);
                w.account_id(&r.stable_coin_mint);
                w.u64(r.stable_coin_code_id);
                w.u64(r.total_debt);
                w.u64(r.total_stake);
                w.u128(&r.scale_factor);
                w.u64(r.epoch);
            }
            Self::OraclePrice(r) => {
                w.string(&r.denom);
                w.bytes(&r.price.to_le_bytes());
                w.bytes(&[r.decimal]);
                w.bytes(&r.timestamp.to_le_bytes());
                w.u64(r.confidence);
                w.bytes(&r.exponent.to_le_bytes());
            }
        }
        w.finish()
    }
}

// ===== Decoding =====

/// Decode `bytes` as `kind`, skipping the discriminator
pub fn decode(bytes: &[u8], kind: RecordKind) -> Result<Record, DecodeError> {
    Ok(match kind {
        RecordKind::Debt => Record::Debt(decode_debt(bytes)?),
        RecordKind::Collateral => Record::Collateral(decode_collateral(bytes)?),
        RecordKind::Ratio => Record::Ratio(decode_ratio(bytes)?),
        RecordKind::Stake => Record::Stake(decode_stake(bytes)?),
        RecordKind::PoolSnapshot => Record::PoolSnapshot(decode_pool_snapshot(bytes)?),
        RecordKind::UserCollateralSnapshot => {
            Record::UserCollateralSnapshot(decode_user_collateral_snapshot(bytes)?)
        }
        RecordKind::ProtocolState => Record::ProtocolState(decode_protocol_state(bytes)?),
        RecordKind::OraclePrice => Record::OraclePrice(decode_oracle_price(bytes)?),
    })
}

/// Like [`decode`], but rejects data whose discriminator does not match `kind`
pub fn decode_checked(bytes: &[u8], kind: RecordKind) -> Result<Record, DecodeError> {
    if let Some(expected) = kind.discriminator() {
        let found = bytes.get(..8).ok_or(DecodeError::TooShort {
            kind: kind.name(),
            expected: kind.min_len(),
            found: bytes.len(),
        })?;
        if found != expected.as_slice() {
            return Err(DecodeError::DiscriminatorMismatch {
                kind: kind.name(),
                expected: hex::encode(expected),
                found: hex::encode(found),
            });
        }
    }
    decode(bytes, kind)
}

pub fn decode_debt(bytes: &[u8]) -> Result<DebtRecord, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::Debt)?;
    Ok(DebtRecord {
        owner: r.account_id()?,
        amount: r.u64()?,
    })
}

pub fn decode_collateral(bytes: &[u8]) -> Result<CollateralRecord, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::Collateral)?;
    Ok(CollateralRecord {
        owner: r.account_id()?,
        denom: r.string()?,
        amount: r.u64()?,
    })
}

pub fn decode_ratio(bytes: &[u8]) -> Result<RatioRecord, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::Ratio)?;
    Ok(RatioRecord {
        owner: r.account_id()?,
        ratio: r.u64()?,
    })
}

pub fn decode_stake(bytes: &[u8]) -> Result<StakeRecord, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::Stake)?;
    Ok(StakeRecord {
        owner: r.account_id()?,
        amount: r.u64()?,
        scale_snapshot: r.u128()?,
        epoch_snapshot: r.u64()?,
        last_update_block: r.u64()?,
    })
}

pub fn decode_pool_snapshot(bytes: &[u8]) -> Result<PoolSnapshotRecord, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::PoolSnapshot)?;
    Ok(PoolSnapshotRecord {
        denom: r.string()?,
        gain_factor: r.u128()?,
        total_collateral_gained: r.u64()?,
        epoch: r.u64()?,
    })
}

pub fn decode_user_collateral_snapshot(
    bytes: &[u8],
) -> Result<UserCollateralSnapshotRecord, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::UserCollateralSnapshot)?;
    Ok(UserCollateralSnapshotRecord {
        owner: r.account_id()?,
        denom: r.string()?,
        gain_factor_snapshot: r.u128()?,
        pending_gain: r.u64()?,
    })
}

pub fn decode_protocol_state(bytes: &[u8]) -> Result<ProtocolStateRecord, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::ProtocolState)?;
    Ok(ProtocolStateRecord {
        admin: r.account_id()?,
        oracle_program: r.account_id()?,
        oracle_state: r.account_id()?,
        fee_distributor: r.account_id()?,
        fee_state: r.account_id()?,
        minimum_collateral_ratio: r.u64()?,
        protocol_fee: r.u8()?,
        stable_coin_mint: r.account_id()?,
        stable_coin_code_id: r.u64()?,
        total_debt: r.u64()?,
        total_stake: r.u64()?,
        scale_factor: r.u128()?,
        epoch: r.u64()?,
    })
}

pub fn decode_oracle_price(bytes: &[u8]) -> Result<OraclePrice, DecodeError> {
    let mut r = ByteReader::for_kind(bytes, RecordKind::OraclePrice)?;
    Ok(OraclePrice {
        denom: r.string()?,
        price: i64::from_le_bytes(r.array()?),
        decimal: r.u8()?,
        timestamp: i64::from_le_bytes(r.array()?),
        confidence: r.u64()?,
        exponent: i32::from_le_bytes(r.array()?),
    })
}

/// Bounds-checked little-endian cursor over borrowed account data
struct ByteReader<'a> {
    kind: &'static str,
    data: &'a [u8],
    offset: usize,
}

impl<'a> ByteReader<'a> {
    /// Check the minimum length and position past the discriminator
    fn for_kind(data: &'a [u8], kind: RecordKind) -> Result<Self, DecodeError> {
        if data.len() < kind.min_len() {
            return Err(DecodeError::TooShort {
                kind: kind.name(),
                expected: kind.min_len(),
                found: data.len(),
            });
        }
        let offset = if kind.discriminator().is_some() { 8 } else { 0 };
        Ok(Self {
            kind: kind.name(),
            data,
            offset,
        })
    }

    fn take(&mut self, length: usize) -> Result<&'a [u8], DecodeError> {
        let available = self.data.len().saturating_sub(self.offset);
        if length > available {
            return Err(DecodeError::LengthOverrun {
                kind: self.kind,
                offset: self.offset,
                length,
                available,
            });
        }
        let slice = &self.data[self.offset..self.offset + length];
        self.offset += length;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, DecodeError> {
        Ok(self.take(1)?[0])
    }

    fn u32(&mut self) -> Result<u32, DecodeError> {
        Ok(u32::from_le_bytes(self.array()?))
    }

    fn u64(&mut self) -> Result<u64, DecodeError> {
        Ok(u64::from_le_bytes(self.array()?))
    }

    fn u128(&mut self) -> Result<BigUint, DecodeError> {
        let low = self.u64()?;
        let high = self.u64()?;
        Ok(u128_from_limbs(low, high))
    }

    fn account_id(&mut self) -> Result<AccountId, DecodeError> {
        Ok(AccountId::new(self.array()?))
    }

    fn string(&mut self) -> Result<String, DecodeError> {
        let length = self.u32()? as usize;
        let start = self.offset;
        let bytes = self.take(length)?;
        std::str::from_utf8(bytes)
            .map(str::to_owned)
            .map_err(|_| DecodeError::InvalidUtf8 {
                kind: self.kind,
                offset: start,
            })
    }
}

struct ByteWriter {
    buf: Vec<u8>,
}

impl ByteWriter {
    fn for_kind(kind: RecordKind) -> Self {
        let mut buf = Vec::with_capacity(kind.min_len() + 16);
        if let Some(disc) = kind.discriminator() {
            buf.extend_from_slice(&disc);
        }
        Self { buf }
    }

    fn bytes(&mut self, b: &[u8]) {
        self.buf.extend_from_slice(b);
    }

    fn u64(&mut self, v: u64) {
        self.bytes(&v.to_le_bytes());
    }

    /// Values wider than 128 bits cannot come from a decoder; they saturate
    fn u128(&mut self, v: &BigUint) {
        let (low, high) = u128_to_limbs(v).unwrap_or((u64::MAX, u64::MAX));
        self.u64(low);
        self.u64(high);
    }

    fn account_id(&mut self, id: &AccountId) {
        self.bytes(id.as_bytes());
    }

    fn string(&mut self, s: &str) {
        self.bytes(&(s.len() as u32).to_le_bytes());
        self.bytes(s.as_bytes());
    }

    fn finish(self) -> Vec<u8> {
        self.buf
    }
}
