//! Common type definitions: blocks, transactions and ticket records

use crate::error::{LedgerError, Result};
use crate::utils;
use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use std::fmt;

/// Block hash type (lowercase hex SHA-256 digest)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BlockHash(pub String);

impl BlockHash {
    /// The sentinel previous hash carried by the genesis block
    pub fn genesis_parent() -> Self {
        Self("0".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for BlockHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for BlockHash {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// A transfer between two identities, optionally referencing a ticket tracker
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub sender: String,
    pub receiver: String,
    pub amount: u64,
    pub ticket: Option<String>,
}

impl Transaction {
    pub fn new(
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        ticket: Option<String>,
    ) -> Self {
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            amount,
            ticket,
        }
    }

    /// Fixed field set used by the canonical block encoding
    pub fn to_canonical_value(&self) -> Value {
        json!({
            "sender": self.sender,
            "receiver": self.receiver,
            "amount": self.amount,
            "ticket": self.ticket,
        })
    }
}

/// One ownership snapshot of a ticket.
///
/// Ownership changes append a new record in a later block; the record found
/// in the highest block is the current one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TicketRecord {
    #[serde(rename = "Tracker")]
    pub tracker: String,
    #[serde(rename = "Company")]
    pub company: String,
    #[serde(rename = "Origin")]
    pub origin: String,
    #[serde(rename = "Destination")]
    pub destination: String,
    #[serde(rename = "Date&hour", with = "utils::date_time_format")]
    pub date_time: NaiveDateTime,
    #[serde(rename = "Seat")]
    pub seat: String,
    #[serde(rename = "Owner")]
    pub owner: String,
}

impl TicketRecord {
    pub const TRACKER: &'static str = "Tracker";
    pub const COMPANY: &'static str = "Company";
    pub const ORIGIN: &'static str = "Origin";
    pub const DESTINATION: &'static str = "Destination";
    pub const DATE_TIME: &'static str = "Date&hour";
    pub const SEAT: &'static str = "Seat";
    pub const OWNER: &'static str = "Owner";

    /// Same ticket, new owner
    pub fn with_owner(&self, owner: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            ..self.clone()
        }
    }

    /// Convert to the external field mapping
    pub fn to_field_map(&self) -> Map<String, Value> {
        let mut map = Map::new();
        map.insert(Self::TRACKER.into(), Value::String(self.tracker.clone()));
        map.insert(Self::COMPANY.into(), Value::String(self.company.clone()));
        map.insert(Self::ORIGIN.into(), Value::String(self.origin.clone()));
        map.insert(
            Self::DESTINATION.into(),
            Value::String(self.destination.clone()),
        );
        map.insert(
            Self::DATE_TIME.into(),
            Value::String(utils::format_date_time(&self.date_time)),
        );
        map.insert(Self::SEAT.into(), Value::String(self.seat.clone()));
        map.insert(Self::OWNER.into(), Value::String(self.owner.clone()));
        map
    }

    /// Build a record from an external field mapping.
    ///
    /// Every field except `Owner` is required; a missing owner falls back to
    /// `default_owner`. Numeric values are accepted for string fields.
    pub fn from_field_map(map: &Map<String, Value>, default_owner: &str) -> Result<Self> {
        let owner = match map.get(Self::OWNER) {
            None | Some(Value::Null) => default_owner.to_string(),
            Some(_) => required_field(map, Self::OWNER)?,
        };
        Self::with_fields(map, owner)
    }

    /// Build a freshly issued record. Any `Owner` in the mapping is ignored:
    /// new tickets always start with `issuer` and move only by purchase.
    pub fn issue(map: &Map<String, Value>, issuer: &str) -> Result<Self> {
        Self::with_fields(map, issuer.to_string())
    }

    fn with_fields(map: &Map<String, Value>, owner: String) -> Result<Self> {
        let date_raw = required_field(map, Self::DATE_TIME)?;
        let date_time = utils::parse_date_time(&date_raw)
            .ok_or_else(|| LedgerError::malformed(Self::DATE_TIME))?;

        Ok(Self {
            tracker: required_field(map, Self::TRACKER)?,
            company: required_field(map, Self::COMPANY)?,
            origin: required_field(map, Self::ORIGIN)?,
            destination: required_field(map, Self::DESTINATION)?,
            date_time,
            seat: required_field(map, Self::SEAT)?,
            owner,
        })
    }

    /// Fixed field set used by the canonical block encoding
    pub fn to_canonical_value(&self) -> Value {
        Value::Object(self.to_field_map())
    }
}

/// Read a string-like field from a request mapping
pub(crate) fn required_field(map: &Map<String, Value>, field: &str) -> Result<String> {
    match map.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) => Ok(n.to_string()),
        _ => Err(LedgerError::malformed(field)),
    }
}

/// One committed unit of the ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Block {
    pub index: u64,
    pub timestamp: String,
    pub proof: u64,
    pub previous_hash: BlockHash,
    pub transactions: Vec<Transaction>,
    pub tickets: Vec<TicketRecord>,
}

impl Block {
    /// Block contents as a JSON value with a fixed field set.
    ///
    /// Objects are emitted with sorted keys, so the encoding does not depend
    /// on how the block was built.
    pub fn to_canonical_value(&self) -> Value {
        json!({
            "index": self.index,
            "timestamp": self.timestamp,
            "proof": self.proof,
            "previous_hash": self.previous_hash.as_str(),
            "transactions": self
                .transactions
                .iter()
                .map(Transaction::to_canonical_value)
                .collect::<Vec<_>>(),
            "tickets": self
                .tickets
                .iter()
                .map(TicketRecord::to_canonical_value)
                .collect::<Vec<_>>(),
        })
    }

    pub fn is_genesis(&self) -> bool {
        self.index == 1
    }
}

/// A chain as reported by a node
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChainSnapshot {
    pub chain: Vec<Block>,
    pub length: usize,
}

impl ChainSnapshot {
    pub fn new(chain: Vec<Block>) -> Self {
        let length = chain.len();
        Self { chain, length }
    }

    /// Reported length agrees with the blocks actually sent
    pub fn is_consistent(&self) -> bool {
        self.length == self.chain.len()
    }
}
