//! Ledger state: the chain and the pending pools
//!
//! `Ledger` is plain single-owner state. Concurrent access goes through
//! [`LedgerNode`](crate::node::LedgerNode), which keeps it behind one lock.

use crate::types::{Block, BlockHash, TicketRecord, Transaction};
use crate::utils;
use std::sync::Arc;
use tracing::info;

/// Proof stored in the genesis block
pub const GENESIS_PROOF: u64 = 1;

/// Append-only chain plus the transactions and tickets waiting for the next block
#[derive(Debug, Clone)]
pub struct Ledger {
    chain: Arc<Vec<Block>>,
    pending_transactions: Vec<Transaction>,
    pending_tickets: Vec<TicketRecord>,
}

impl Ledger {
    /// Create a ledger holding only the genesis block
    pub fn new() -> Self {
        let mut ledger = Self {
            chain: Arc::new(Vec::new()),
            pending_transactions: Vec::new(),
            pending_tickets: Vec::new(),
        };
        ledger.create_block(GENESIS_PROOF, BlockHash::genesis_parent());
        ledger
    }

    /// Stage a transaction; returns the index of the block it will land in
    pub fn add_transaction(
        &mut self,
        sender: impl Into<String>,
        receiver: impl Into<String>,
        amount: u64,
        ticket: Option<String>,
    ) -> u64 {
        self.pending_transactions
            .push(Transaction::new(sender, receiver, amount, ticket));
        self.next_index()
    }

    /// Stage a ticket record; returns the index of the block it will land in
    pub fn add_ticket(&mut self, ticket: TicketRecord) -> u64 {
        self.pending_tickets.push(ticket);
        self.next_index()
    }

    /// Commit the pending pools into a new block and append it.
    ///
    /// The proof is trusted: callers obtain it from the proof-of-work engine
    /// against the current tip before calling this.
    pub fn create_block(&mut self, proof: u64, previous_hash: BlockHash) -> Block {
        let block = Block {
            index: self.next_index(),
            timestamp: utils::current_timestamp(),
            proof,
            previous_hash,
            transactions: std::mem::take(&mut self.pending_transactions),
            tickets: std::mem::take(&mut self.pending_tickets),
        };
        info!(
            index = block.index,
            proof = block.proof,
            transactions = block.transactions.len(),
            tickets = block.tickets.len(),
            "Block created"
        );
        Arc::make_mut(&mut self.chain).push(block.clone());
        block
    }

    /// Last block of the chain
    pub fn tip(&self) -> &Block {
        // The chain always holds at least the genesis block
        &self.chain[self.chain.len() - 1]
    }

    /// Snapshot of the chain; later appends do not affect it
    pub fn chain(&self) -> Arc<Vec<Block>> {
        Arc::clone(&self.chain)
    }

    pub fn len(&self) -> usize {
        self.chain.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chain.is_empty()
    }

    /// Index the next created block will receive
    pub fn next_index(&self) -> u64 {
        self.chain.len() as u64 + 1
    }

    pub fn pending_transactions(&self) -> &[Transaction] {
        &self.pending_transactions
    }

    pub fn pending_tickets(&self) -> &[TicketRecord] {
        &self.pending_tickets
    }

    /// Swap in a whole new chain. Pending pools are kept; an empty chain is ignored.
    ///
    /// Returns the number of local blocks that were not part of the new chain.
    pub fn replace_chain(&mut self, chain: Vec<Block>) -> usize {
        if chain.is_empty() {
            return 0;
        }
        let common = self
            .chain
            .iter()
            .zip(chain.iter())
            .take_while(|(ours, theirs)| ours == theirs)
            .count();
        let discarded = self.chain.len() - common;
        self.chain = Arc::new(chain);
        discarded
    }
}

impl Default for Ledger {
    fn default() -> Self {
        Self::new()
    }
}
