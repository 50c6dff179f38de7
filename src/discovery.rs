//! Registered peer set

use crate::error::{NetworkError, Result};
use indexmap::IndexSet;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A peer location normalized to `host:port`
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PeerAddress(String);

impl PeerAddress {
    /// Normalize an address, stripping any scheme and path.
    ///
    /// `http://10.0.0.2:5001/get_chain`, `10.0.0.2:5001/` and `10.0.0.2:5001`
    /// all normalize to `10.0.0.2:5001`.
    pub fn parse(raw: &str) -> Result<Self> {
        let invalid = |reason: &str| NetworkError::InvalidAddress {
            address: raw.to_string(),
            reason: reason.to_string(),
        };

        let trimmed = raw.trim();
        let without_scheme = match trimmed.find("://") {
            Some(pos) => &trimmed[pos + 3..],
            None => trimmed,
        };
        let authority = without_scheme
            .split(['/', '?', '#'])
            .next()
            .unwrap_or_default();
        let authority = authority.rsplit('@').next().unwrap_or_default();

        let (host, port) = authority
            .rsplit_once(':')
            .ok_or_else(|| invalid("missing port"))?;
        if host.is_empty() {
            return Err(invalid("missing host").into());
        }
        port.parse::<u16>().map_err(|_| invalid("invalid port"))?;

        Ok(Self(format!("{}:{}", host, port)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Deduplicated set of registered peers.
///
/// Enumeration follows registration order, which makes reconciliation
/// tie-breaking deterministic.
#[derive(Debug, Clone, Default)]
pub struct PeerSet {
    peers: IndexSet<PeerAddress>,
}

impl PeerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer; returns false if it was already registered
    pub fn insert(&mut self, peer: PeerAddress) -> bool {
        self.peers.insert(peer)
    }

    /// Normalize and register every address; nothing is added if any is invalid
    pub fn register_all<I, S>(&mut self, addresses: I) -> Result<Vec<PeerAddress>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let parsed = addresses
            .into_iter()
            .map(|raw| PeerAddress::parse(raw.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        for peer in &parsed {
            self.insert(peer.clone());
        }
        Ok(parsed)
    }

    pub fn iter(&self) -> impl Iterator<Item = &PeerAddress> {
        self.peers.iter()
    }

    /// Peers in enumeration order
    pub fn to_vec(&self) -> Vec<PeerAddress> {
        self.peers.iter().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.peers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peers.is_empty()
    }
}
