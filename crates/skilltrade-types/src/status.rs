use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use tracing::warn;

/// Server-owned lifecycle of a match. Spellings from the API are matched
/// case-insensitively; anything unrecognized is kept verbatim in `Unknown`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MatchStatus {
    /// Matched, no trade requested yet.
    Pending,
    /// One side asked to start a trade and waits for the other.
    PendingTrade,
    InTrade,
    Completed,
    Cancelled,
    Unknown(String),
}

/// Uppercases and maps `-` and spaces to `_`, so `in-trade`, `In Trade` and
/// `IN_TRADE` compare equal.
fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '-' | ' ' => '_',
            c => c.to_ascii_uppercase(),
        })
        .collect()
}

impl MatchStatus {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "PENDING" => Self::Pending,
            "PENDING_TRADE" => Self::PendingTrade,
            "IN_TRADE" => Self::InTrade,
            "COMPLETED" => Self::Completed,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            _ => {
                warn!("Unrecognized match status '{}' from API", raw);
                Self::Unknown(raw.to_string())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::PendingTrade => "PENDING_TRADE",
            Self::InTrade => "IN_TRADE",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown(raw) => raw,
        }
    }
}

impl fmt::Display for MatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for MatchStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for MatchStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

/// Lifecycle of a trade's progress record, parsed like [`MatchStatus`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub enum TradeState {
    #[default]
    Pending,
    /// Both sides agreed; tasks are being marked off.
    Accepted,
    Completed,
    Cancelled,
    Unknown(String),
}

impl TradeState {
    pub fn parse(raw: &str) -> Self {
        match normalize(raw).as_str() {
            "PENDING" => Self::Pending,
            "ACCEPTED" | "IN_TRADE" => Self::Accepted,
            "COMPLETED" => Self::Completed,
            "CANCELLED" | "CANCELED" => Self::Cancelled,
            _ => {
                warn!("Unrecognized trade status '{}' from API", raw);
                Self::Unknown(raw.to_string())
            }
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "PENDING",
            Self::Accepted => "ACCEPTED",
            Self::Completed => "COMPLETED",
            Self::Cancelled => "CANCELLED",
            Self::Unknown(raw) => raw,
        }
    }

    /// No further transitions are expected from the server.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl fmt::Display for TradeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for TradeState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for TradeState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}
