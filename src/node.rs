//! Ledger node implementation
//!
//! `LedgerNode` owns the ledger and the registered peers behind a single
//! mutex. Proof-of-work searches and peer fetches run outside the lock; only
//! the final check-and-commit steps hold it.

use crate::{
    config::NodeConfig,
    consensus::{is_preferred, ChainValidator},
    crypto::{hash::hash_block, pow::ProofOfWork},
    discovery::{PeerAddress, PeerSet},
    error::{LedgerError, Result},
    ledger::Ledger,
    network::{ChainFetcher, NodeId, TcpChainFetcher},
    sync::{ChainSynchronizer, ReconcileOutcome},
    tickets::{self, PurchaseRequest},
    types::{Block, ChainSnapshot, TicketRecord},
};
use serde_json::{Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info};

/// Everything guarded by the node lock
#[derive(Debug, Default)]
struct NodeState {
    ledger: Ledger,
    peers: PeerSet,
}

/// A ledger participant: stages entries, mines blocks and reconciles with peers
pub struct LedgerNode {
    /// Unique identifier for this node, credited with mining rewards
    id: NodeId,

    /// Ledger and peer set
    state: Mutex<NodeState>,

    /// Bumped whenever the chain changes; in-flight searches watch it
    epoch: Arc<AtomicU64>,

    pow: ProofOfWork,

    validator: ChainValidator,

    synchronizer: ChainSynchronizer,

    /// Node configuration
    config: NodeConfig,
}

impl LedgerNode {
    /// Create a node with default settings
    pub fn new_default() -> Result<Self> {
        Self::builder().build()
    }

    /// Create a builder for this node
    pub fn builder() -> LedgerNodeBuilder {
        LedgerNodeBuilder::new()
    }

    /// Get the node's ID
    pub fn id(&self) -> &NodeId {
        &self.id
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    pub fn validator(&self) -> &ChainValidator {
        &self.validator
    }

    /// Snapshot of the current chain
    pub async fn chain(&self) -> Arc<Vec<Block>> {
        self.state.lock().await.ledger.chain()
    }

    /// Chain and its length, as served to peers
    pub async fn snapshot(&self) -> ChainSnapshot {
        ChainSnapshot::new(self.chain().await.to_vec())
    }

    /// Last block of the chain
    pub async fn tip(&self) -> Block {
        self.state.lock().await.ledger.tip().clone()
    }

    /// Validate the local chain
    pub async fn is_valid(&self) -> bool {
        let chain = self.chain().await;
        self.validator.is_valid(&chain)
    }

    /// Entries waiting for the next block
    pub async fn pending(&self) -> (usize, usize) {
        let state = self.state.lock().await;
        (
            state.ledger.pending_transactions().len(),
            state.ledger.pending_tickets().len(),
        )
    }

    /// Stage a transaction; returns the index it will be mined into
    pub async fn add_transaction(
        &self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        ticket: Option<String>,
    ) -> u64 {
        let mut state = self.state.lock().await;
        state.ledger.add_transaction(sender, receiver, amount, ticket)
    }

    /// Stage a ticket record; returns the index it will be mined into
    pub async fn add_ticket(&self, ticket: TicketRecord) -> Result<u64> {
        let mut state = self.state.lock().await;
        if self.config.unique_trackers
            && tickets::is_issued(
                &state.ledger.chain(),
                state.ledger.pending_tickets(),
                &ticket.tracker,
            )
        {
            return Err(LedgerError::TicketAlreadyIssued {
                tracker: ticket.tracker,
            });
        }
        Ok(state.ledger.add_ticket(ticket))
    }

    /// Issue a new ticket from its field mapping, owned by the default owner
    pub async fn issue_ticket(&self, fields: &Map<String, Value>) -> Result<u64> {
        let ticket = TicketRecord::issue(fields, &self.config.default_ticket_owner)?;
        let index = self.add_ticket(ticket.clone()).await?;
        info!(tracker = %ticket.tracker, owner = %ticket.owner, index, "Ticket issued");
        Ok(index)
    }

    /// Buy a ticket from its current owner.
    ///
    /// Stages the payment and the record naming the buyer as owner; on any
    /// rejection the pending pools are left untouched.
    pub async fn purchase_ticket(&self, request: &PurchaseRequest) -> Result<u64> {
        let mut state = self.state.lock().await;
        let (payment, record) = request.plan(&state.ledger.chain())?;
        let index = state.ledger.add_transaction(
            payment.sender,
            payment.receiver,
            payment.amount,
            payment.ticket,
        );
        state.ledger.add_ticket(record);
        info!(
            tracker = %request.tracker,
            buyer = %request.buyer,
            seller = %request.seller,
            index,
            "Ticket purchase staged"
        );
        Ok(index)
    }

    /// Current records of the tickets owned by `owner`
    pub async fn tickets_by_owner(&self, owner: &str) -> Vec<TicketRecord> {
        let chain = self.chain().await;
        tickets::tickets_by_owner(&chain, owner)
    }

    /// Mine a block on top of the current tip.
    ///
    /// The search runs without holding the lock. If the tip changes before
    /// the proof is committed, the search restarts from the new tip.
    pub async fn mine(&self) -> Result<Block> {
        loop {
            let (previous_proof, previous_hash, epoch) = {
                let state = self.state.lock().await;
                let tip = state.ledger.tip();
                (tip.proof, hash_block(tip), self.epoch.load(Ordering::SeqCst))
            };

            debug!(previous_proof, "Mining started");
            let watched = Arc::clone(&self.epoch);
            let found = self
                .pow
                .solve_blocking(previous_proof, move || {
                    watched.load(Ordering::SeqCst) != epoch
                })
                .await?;

            let Some(proof) = found else {
                debug!("Chain changed during search, restarting");
                continue;
            };

            let mut state = self.state.lock().await;
            if hash_block(state.ledger.tip()) != previous_hash {
                debug!("Tip moved before commit, restarting");
                continue;
            }

            state.ledger.add_transaction(
                self.config.reward_sender.clone(),
                self.id.to_string(),
                self.config.reward,
                None,
            );
            let block = state.ledger.create_block(proof, previous_hash);
            self.epoch.fetch_add(1, Ordering::SeqCst);
            info!(index = block.index, proof, "Block mined");
            return Ok(block);
        }
    }

    /// Normalize and register peers; returns the full peer set
    pub async fn register_peers<I, S>(&self, addresses: I) -> Result<Vec<PeerAddress>>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut state = self.state.lock().await;
        let added = state.peers.register_all(addresses)?;
        debug!(count = added.len(), total = state.peers.len(), "Peers registered");
        Ok(state.peers.to_vec())
    }

    /// Registered peers in enumeration order
    pub async fn peers(&self) -> Vec<PeerAddress> {
        self.state.lock().await.peers.to_vec()
    }

    /// Adopt the longest valid chain offered by a registered peer.
    ///
    /// Peers are queried outside the lock. The replacement decision is taken
    /// again under the lock against the chain as it is then, so a block
    /// committed meanwhile is never overwritten by a chain that is no longer
    /// longer.
    pub async fn reconcile(&self) -> ReconcileOutcome {
        let (peers, local_len) = {
            let state = self.state.lock().await;
            (state.peers.to_vec(), state.ledger.len())
        };

        let candidate = self.synchronizer.best_candidate(&peers, local_len).await;

        let mut state = self.state.lock().await;
        match candidate {
            Some(candidate) if is_preferred(candidate.chain.len(), state.ledger.len()) => {
                let length = candidate.chain.len();
                let discarded = state.ledger.replace_chain(candidate.chain);
                self.epoch.fetch_add(1, Ordering::SeqCst);
                info!(
                    peer = %candidate.peer,
                    length,
                    discarded,
                    "Chain replaced by longer peer chain"
                );
                ReconcileOutcome {
                    replaced: true,
                    chain: state.ledger.chain(),
                    adopted_from: Some(candidate.peer),
                }
            },
            Some(candidate) => {
                info!(
                    peer = %candidate.peer,
                    local = state.ledger.len(),
                    "Local chain grew during reconciliation, keeping it"
                );
                ReconcileOutcome {
                    replaced: false,
                    chain: state.ledger.chain(),
                    adopted_from: None,
                }
            },
            None => ReconcileOutcome {
                replaced: false,
                chain: state.ledger.chain(),
                adopted_from: None,
            },
        }
    }
}

/// Builder for ledger nodes
pub struct LedgerNodeBuilder {
    id: Option<NodeId>,
    config: NodeConfig,
    fetcher: Option<Arc<dyn ChainFetcher>>,
}

impl LedgerNodeBuilder {
    /// Create a new node builder
    pub fn new() -> Self {
        Self {
            id: None,
            config: NodeConfig::default(),
            fetcher: None,
        }
    }

    /// Set the node ID
    pub fn with_id(mut self, id: NodeId) -> Self {
        self.id = Some(id);
        self
    }

    /// Set the node configuration
    pub fn with_config(mut self, config: NodeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set how peer chains are fetched
    pub fn with_fetcher(mut self, fetcher: Arc<dyn ChainFetcher>) -> Self {
        self.fetcher = Some(fetcher);
        self
    }

    /// Set the puzzle difficulty
    pub fn difficulty(mut self, difficulty: u32) -> Self {
        self.config.difficulty = difficulty;
        self
    }

    /// Build the node
    pub fn build(self) -> Result<LedgerNode> {
        self.config.validate()?;

        let fetcher = self
            .fetcher
            .unwrap_or_else(|| Arc::new(TcpChainFetcher::new(self.config.peer_timeout())));
        let pow = ProofOfWork::with_config(self.config.pow_config());
        let validator = ChainValidator::new(pow.clone());

        let mut state = NodeState::default();
        state.peers.register_all(&self.config.peers)?;

        Ok(LedgerNode {
            id: self.id.unwrap_or_default(),
            state: Mutex::new(state),
            epoch: Arc::new(AtomicU64::new(0)),
            pow,
            synchronizer: ChainSynchronizer::new(fetcher, validator.clone()),
            validator,
            config: self.config,
        })
    }
}

impl Default for LedgerNodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
