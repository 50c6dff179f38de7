//! Peer chain replacement.
//!
//! Every registered peer is asked for its chain concurrently. Answers are then
//! evaluated in peer enumeration order, so the outcome does not depend on which
//! peer answers first. A peer that cannot be reached, or that reports a chain
//! failing validation, is skipped without aborting the scan.

use crate::consensus::{is_preferred, ChainValidator};
use crate::discovery::PeerAddress;
use crate::error::{LedgerError, NetworkError, Result};
use crate::network::ChainFetcher;
use crate::types::{Block, ChainSnapshot};
use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

/// The longest valid chain found during a scan
#[derive(Debug, Clone)]
pub struct Candidate {
    pub peer: PeerAddress,
    pub chain: Vec<Block>,
}

/// Result of one reconciliation round
#[derive(Debug, Clone)]
pub struct ReconcileOutcome {
    /// The local chain was replaced
    pub replaced: bool,
    /// The chain after reconciliation
    pub chain: Arc<Vec<Block>>,
    /// Peer whose chain was adopted
    pub adopted_from: Option<PeerAddress>,
}

/// Scans peers for a strictly longer valid chain
pub struct ChainSynchronizer {
    fetcher: Arc<dyn ChainFetcher>,
    validator: ChainValidator,
}

impl ChainSynchronizer {
    pub fn new(fetcher: Arc<dyn ChainFetcher>, validator: ChainValidator) -> Self {
        Self { fetcher, validator }
    }

    /// Check a peer's answer; a shorter or equal chain yields `Ok(None)`
    fn evaluate(
        &self,
        peer: &PeerAddress,
        snapshot: ChainSnapshot,
        best_len: usize,
    ) -> Result<Option<Vec<Block>>> {
        let invalid = |reason: String| {
            LedgerError::Network(NetworkError::PeerInvalidChain {
                peer: peer.to_string(),
                reason,
            })
        };

        if !snapshot.is_consistent() {
            return Err(invalid(format!(
                "reported length {} but sent {} blocks",
                snapshot.length,
                snapshot.chain.len()
            )));
        }
        if !is_preferred(snapshot.length, best_len) {
            return Ok(None);
        }
        self.validator
            .check(&snapshot.chain)
            .map_err(|fault| invalid(fault.to_string()))?;
        Ok(Some(snapshot.chain))
    }

    /// Find the longest valid chain strictly longer than `local_len`.
    ///
    /// Ties between peers go to the one enumerated first.
    pub async fn best_candidate(
        &self,
        peers: &[PeerAddress],
        local_len: usize,
    ) -> Option<Candidate> {
        let answers = join_all(peers.iter().map(|peer| self.fetcher.fetch_chain(peer))).await;

        let mut best: Option<Candidate> = None;
        let mut best_len = local_len;
        for (peer, answer) in peers.iter().zip(answers) {
            let outcome = answer.and_then(|snapshot| self.evaluate(peer, snapshot, best_len));
            match outcome {
                Ok(Some(chain)) => {
                    debug!(peer = %peer, length = chain.len(), "New best candidate chain");
                    best_len = chain.len();
                    best = Some(Candidate {
                        peer: peer.clone(),
                        chain,
                    });
                },
                Ok(None) => debug!(peer = %peer, "Peer chain is not longer, skipping"),
                Err(e) => warn!(peer = %peer, error = %e, "Skipping peer"),
            }
        }
        best
    }
}
