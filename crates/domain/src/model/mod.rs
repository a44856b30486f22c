//! Data structures and helpers shared across the API, monitor and listener.

use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::{ParsePubkeyError, Pubkey};
use strum_macros::{AsRefStr, Display, EnumString};
use thiserror::Error;

/// Asset kinds the monitor knows how to look up.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
)]
#[strum(ascii_case_insensitive)]
pub enum AssetType {
    #[serde(rename = "USDC")]
    #[strum(serialize = "USDC")]
    Usdc,
    #[serde(rename = "SOL")]
    #[strum(serialize = "SOL")]
    Sol,
}

impl AssetType {
    /// Lookup order used when a request does not pick an asset.
    pub const ALL: [AssetType; 2] = [AssetType::Usdc, AssetType::Sol];

    pub fn as_str(self) -> &'static str {
        match self {
            AssetType::Usdc => "USDC",
            AssetType::Sol => "SOL",
        }
    }

    /// Expands an optional filter into the assets polled on every tick.
    pub fn selection(filter: Option<AssetType>) -> Vec<AssetType> {
        match filter {
            Some(asset) => vec![asset],
            None => Self::ALL.to_vec(),
        }
    }
}

/// A transfer observed on chain and persisted by the monitor. Field names on
/// the wire match what downstream listeners already consume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    #[serde(rename = "txHash")]
    pub tx_hash: String,
    pub from: String,
    pub to: String,
    /// Decimal amount (token units for USDC, SOL for native transfers).
    pub amount: f64,
    /// The monitored address the transfer was found for.
    pub address: String,
    /// Unix seconds of the containing block, `0` when unknown.
    pub time: i64,
    #[serde(rename = "type")]
    pub asset: AssetType,
}

impl TransactionRecord {
    /// Block time as a timestamp, `None` when the node did not report one.
    pub fn block_time(&self) -> Option<DateTime<Utc>> {
        if self.time <= 0 {
            return None;
        }
        DateTime::from_timestamp(self.time, 0)
    }
}

/// Body exchanged between the monitor and the notification listener.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    #[serde(default)]
    pub transactions: Vec<TransactionRecord>,
}

/// Errors emitted when a user-supplied address fails validation.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AddressFormatError {
    #[error("address does not decode to a 32-byte public key")]
    WrongLength,
    #[error("address is not valid base58")]
    NonBase58,
}

impl From<ParsePubkeyError> for AddressFormatError {
    fn from(value: ParsePubkeyError) -> Self {
        match value {
            ParsePubkeyError::WrongSize => AddressFormatError::WrongLength,
            ParsePubkeyError::Invalid => AddressFormatError::NonBase58,
        }
    }
}

/// Parses the supplied string as a base58 Solana public key.
pub fn validate_address(address: &str) -> Result<Pubkey, AddressFormatError> {
    Ok(Pubkey::from_str(address)?)
}

/// Address whose incoming transfers are being watched.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct WatchedAddress {
    raw: String,
    key: Pubkey,
}

impl WatchedAddress {
    pub fn parse(address: &str) -> Result<Self, AddressFormatError> {
        let trimmed = address.trim();
        let key = validate_address(trimmed)?;
        Ok(Self {
            raw: trimmed.to_owned(),
            key,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn pubkey(&self) -> &Pubkey {
        &self.key
    }
}

impl std::fmt::Display for WatchedAddress {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.raw)
    }
}
