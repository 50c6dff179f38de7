//! Wire messages exchanged between nodes and clients.
//!
//! Each message is one JSON object per line, tagged by `type`.

use crate::discovery::PeerAddress;
use crate::error::Result;
use crate::types::{Block, TicketRecord};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Logical operations a node serves
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Request {
    GetChain,
    MineBlock,
    IsValid,
    IssueTicket {
        #[serde(default)]
        ticket: Map<String, Value>,
    },
    BuyTicket {
        #[serde(default)]
        purchase: Map<String, Value>,
    },
    ConnectNode {
        #[serde(default)]
        nodes: Option<Vec<String>>,
    },
    ReplaceChain,
    GetTickets {
        owner: String,
    },
}

/// Node answers, one per request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Response {
    Chain {
        chain: Vec<Block>,
        length: usize,
    },
    Mined {
        block: Block,
    },
    Valid {
        valid: bool,
    },
    /// An entry was staged and will land in block `index`
    Queued {
        index: u64,
    },
    Peers {
        total_nodes: Vec<PeerAddress>,
    },
    Replaced {
        replaced: bool,
        chain: Vec<Block>,
    },
    Tickets {
        owner: String,
        tickets: Vec<TicketRecord>,
    },
    Error {
        message: String,
    },
}

impl Request {
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }
}

impl Response {
    pub fn to_line(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_line(line: &str) -> Result<Self> {
        Ok(serde_json::from_str(line)?)
    }

    pub fn error(message: impl Into<String>) -> Self {
        Response::Error {
            message: message.into(),
        }
    }
}
