//! Sale records and the CSV line codec
//!
//! One record per line: `timestamp,amount,currency,address,memo`,
//! newline-terminated, UTF-8. The memo is the only free-text field and is
//! rejected if it contains the delimiter or a line break — an append-only
//! log gets no quoting layer.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

/// Identifier of an appended record: its 0-based position in the log.
pub type RecordId = u64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RecordError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("Unrecognized currency code: {0}")]
    InvalidCurrency(String),
    #[error("Address must not be empty")]
    EmptyAddress,
    #[error("Address contains a reserved character")]
    InvalidAddress,
    #[error("Memo contains a reserved character")]
    InvalidMemo,
    #[error("Malformed record line: {0}")]
    Malformed(String),
}

/// A fiat amount in minor units (cents). Non-negative by construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct FiatAmount(u64);

impl FiatAmount {
    pub const ZERO: FiatAmount = FiatAmount(0);

    pub fn from_minor_units(cents: u64) -> Self {
        Self(cents)
    }

    pub fn minor_units(&self) -> u64 {
        self.0
    }

    pub fn checked_add(&self, other: FiatAmount) -> Option<FiatAmount> {
        self.0.checked_add(other.0).map(FiatAmount)
    }

    /// Parse a decimal string (`"5"`, `"5.5"`, `"5.00"`) into minor units.
    /// At most two fraction digits; no sign, no grouping.
    pub fn parse(s: &str) -> Result<Self, RecordError> {
        let bad = || RecordError::InvalidAmount(s.to_string());

        let (whole, frac) = match s.split_once('.') {
            Some((_, f)) if f.is_empty() => return Err(bad()),
            Some((w, f)) => (w, f),
            None => (s, ""),
        };
        if whole.is_empty() || frac.len() > 2 {
            return Err(bad());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit())
            || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(bad());
        }

        let units: u64 = whole.parse().map_err(|_| bad())?;
        let cents_part: u64 = match frac.len() {
            0 => 0,
            1 => frac.parse::<u64>().map_err(|_| bad())? * 10,
            _ => frac.parse().map_err(|_| bad())?,
        };

        units
            .checked_mul(100)
            .and_then(|c| c.checked_add(cents_part))
            .map(FiatAmount)
            .ok_or_else(bad)
    }
}

impl std::fmt::Display for FiatAmount {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{:02}", self.0 / 100, self.0 % 100)
    }
}

impl Serialize for FiatAmount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for FiatAmount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        u64::deserialize(deserializer).map(FiatAmount)
    }
}

/// An ISO-4217-style currency code: exactly three ASCII uppercase letters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CurrencyCode([u8; 3]);

impl CurrencyCode {
    pub fn parse(s: &str) -> Result<Self, RecordError> {
        let bytes = s.as_bytes();
        if bytes.len() != 3 || !bytes.iter().all(|b| b.is_ascii_uppercase()) {
            return Err(RecordError::InvalidCurrency(s.to_string()));
        }
        Ok(Self([bytes[0], bytes[1], bytes[2]]))
    }

    pub fn as_str(&self) -> &str {
        // Valid by construction: three ASCII uppercase bytes
        std::str::from_utf8(&self.0).expect("currency code is ASCII")
    }
}

impl std::fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for CurrencyCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for CurrencyCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        CurrencyCode::parse(&s).map_err(serde::de::Error::custom)
    }
}

/// One completed sale. Immutable once appended to the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaleRecord {
    /// Unix timestamp (seconds) of the point-of-sale confirmation
    pub timestamp: u64,
    pub amount: FiatAmount,
    pub currency: CurrencyCode,
    /// The receiving address the payer was shown
    pub address: String,
    pub memo: Option<String>,
}

impl SaleRecord {
    pub fn new(
        timestamp: u64,
        amount: FiatAmount,
        currency: CurrencyCode,
        address: String,
        memo: Option<String>,
    ) -> Self {
        Self {
            timestamp,
            amount,
            currency,
            address,
            memo,
        }
    }

    /// Check the append preconditions: address non-empty, no field able to
    /// break the line format.
    pub fn validate(&self) -> Result<(), RecordError> {
        if self.address.is_empty() {
            return Err(RecordError::EmptyAddress);
        }
        if self.address.contains([',', '\n', '\r']) {
            return Err(RecordError::InvalidAddress);
        }
        if let Some(memo) = &self.memo {
            if memo.contains([',', '\n', '\r']) {
                return Err(RecordError::InvalidMemo);
            }
        }
        Ok(())
    }

    /// Encode as one CSV line, newline-terminated.
    pub fn to_csv_line(&self) -> String {
        format!(
            "{},{},{},{},{}\n",
            self.timestamp,
            self.amount,
            self.currency,
            self.address,
            self.memo.as_deref().unwrap_or("")
        )
    }

    /// Parse one CSV line (without the trailing newline).
    pub fn from_csv_line(line: &str) -> Result<Self, RecordError> {
        let fields: Vec<&str> = line.split(',').collect();
        if fields.len() != 5 {
            return Err(RecordError::Malformed(format!(
                "expected 5 fields, got {}",
                fields.len()
            )));
        }

        let timestamp: u64 = fields[0]
            .parse()
            .map_err(|_| RecordError::Malformed(format!("bad timestamp: {}", fields[0])))?;
        let amount = FiatAmount::parse(fields[1])?;
        let currency = CurrencyCode::parse(fields[2])?;
        let address = fields[3].to_string();
        let memo = if fields[4].is_empty() {
            None
        } else {
            Some(fields[4].to_string())
        };

        let record = Self {
            timestamp,
            amount,
            currency,
            address,
            memo,
        };
        record.validate()?;
        Ok(record)
    }
}
