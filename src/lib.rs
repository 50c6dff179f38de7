//! TicketChain - a minimal proof-of-work ledger for transfers and ticket
//! ownership records, with longest-valid-chain reconciliation across peers.

// Modules
pub mod config;
pub mod consensus;
pub mod crypto;
pub mod discovery;
pub mod error;
pub mod ledger;
pub mod network;
pub mod node;
pub mod protocol;
pub mod server;
pub mod sync;
pub mod tickets;
pub mod types;
pub mod utils;

// Re-exports
pub use config::NodeConfig;
pub use consensus::ChainValidator;
pub use crypto::{hash_block, ProofOfWork};
pub use discovery::{PeerAddress, PeerSet};
pub use error::{LedgerError, Result};
pub use ledger::Ledger;
pub use network::{ChainFetcher, NodeId, TcpChainFetcher};
pub use node::LedgerNode;
pub use sync::ReconcileOutcome;
pub use tickets::PurchaseRequest;
pub use types::{Block, BlockHash, ChainSnapshot, TicketRecord, Transaction};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

/// Default address a node listens on
pub const DEFAULT_LISTEN_ADDR: &str = "127.0.0.1:5002";

/// Leading hex zeros required by the puzzle by default
pub const DEFAULT_DIFFICULTY: u32 = 4;

/// Amount credited to a miner per block by default
pub const DEFAULT_REWARD: u64 = 1;
