//! Networking: node identity and fetching chains from peers

use crate::discovery::PeerAddress;
use crate::error::{LedgerError, NetworkError, Result};
use crate::protocol::{Request, Response};
use crate::types::ChainSnapshot;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::net::TcpStream;
use tokio_util::codec::{Framed, LinesCodec};
use uuid::Uuid;

/// Maximum accepted length of one protocol line
pub const MAX_LINE_LENGTH: usize = 64 * 1024 * 1024;

/// Unique identifier for a node; also the miner identity credited with rewards
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct NodeId(Uuid);

impl NodeId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

impl Default for NodeId {
    fn default() -> Self {
        Self::new()
    }
}

/// Source of peers' chains used by reconciliation
#[async_trait]
pub trait ChainFetcher: Send + Sync {
    /// Fetch the chain a peer currently reports
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<ChainSnapshot>;
}

/// Fetches chains over the line-delimited JSON protocol
#[derive(Debug, Clone)]
pub struct TcpChainFetcher {
    timeout: Duration,
}

impl TcpChainFetcher {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }
}

impl Default for TcpChainFetcher {
    fn default() -> Self {
        Self::new(Duration::from_secs(5))
    }
}

#[async_trait]
impl ChainFetcher for TcpChainFetcher {
    async fn fetch_chain(&self, peer: &PeerAddress) -> Result<ChainSnapshot> {
        let unreachable = |reason: String| {
            LedgerError::Network(NetworkError::PeerUnreachable {
                peer: peer.to_string(),
                reason,
            })
        };

        match send_request(peer.as_str(), &Request::GetChain, self.timeout).await {
            Ok(Response::Chain { chain, length }) => Ok(ChainSnapshot { chain, length }),
            Ok(other) => Err(unreachable(format!("unexpected response: {:?}", other))),
            Err(e) => Err(unreachable(e.to_string())),
        }
    }
}

/// Send one request to a node and wait for its response
pub async fn send_request(addr: &str, request: &Request, timeout: Duration) -> Result<Response> {
    tokio::time::timeout(timeout, exchange(addr, request))
        .await
        .map_err(|_| LedgerError::Network(NetworkError::Timeout { duration: timeout }))?
}

async fn exchange(addr: &str, request: &Request) -> Result<Response> {
    let stream = TcpStream::connect(addr).await?;
    let mut framed = Framed::new(stream, LinesCodec::new_with_max_length(MAX_LINE_LENGTH));
    framed.send(request.to_line()?).await?;
    match framed.next().await {
        Some(line) => Response::from_line(&line?),
        None => Err(LedgerError::Network(NetworkError::ConnectionClosed {
            peer: addr.to_string(),
        })),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_node_id_is_compact_and_unique() {
        let a = NodeId::new();
        let b = NodeId::new();
        assert_ne!(a, b);
        assert_eq!(a.to_string().len(), 32);
        assert!(!a.to_string().contains('-'));
    }

    #[tokio::test]
    async fn test_fetch_from_closed_port_is_unreachable() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let fetcher = TcpChainFetcher::new(Duration::from_millis(500));
        let peer = PeerAddress::parse(&addr.to_string()).unwrap();
        match fetcher.fetch_chain(&peer).await {
            Err(LedgerError::Network(NetworkError::PeerUnreachable { peer: p, .. })) => {
                assert_eq!(p, addr.to_string())
            },
            other => panic!("expected unreachable, got {:?}", other),
        }
    }
}
