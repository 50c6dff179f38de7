//! Ticket ownership queries and purchase planning
//!
//! A tracker's history is the sequence of its records across the chain. All
//! lookups scan blocks newest to oldest, so the first record seen for a
//! tracker is its current state.

use crate::error::{LedgerError, Result};
use crate::types::{required_field, Block, TicketRecord, Transaction};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;

/// Most recent record for `tracker`, if any block carries one
pub fn find_latest<'a>(chain: &'a [Block], tracker: &str) -> Option<&'a TicketRecord> {
    chain
        .iter()
        .rev()
        .flat_map(|block| block.tickets.iter())
        .find(|ticket| ticket.tracker == tracker)
}

/// Current records of every ticket whose latest owner is `owner`, newest first
pub fn tickets_by_owner(chain: &[Block], owner: &str) -> Vec<TicketRecord> {
    let mut seen = HashSet::new();
    chain
        .iter()
        .rev()
        .flat_map(|block| block.tickets.iter())
        .filter(|ticket| seen.insert(ticket.tracker.clone()))
        .filter(|ticket| ticket.owner == owner)
        .cloned()
        .collect()
}

/// True if the tracker appears on chain or among `pending` records
pub fn is_issued(chain: &[Block], pending: &[TicketRecord], tracker: &str) -> bool {
    pending.iter().any(|ticket| ticket.tracker == tracker) || find_latest(chain, tracker).is_some()
}

/// A request to move a ticket from its current owner to a buyer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PurchaseRequest {
    /// Becomes the ticket's owner
    pub buyer: String,
    /// Must be the ticket's current owner
    pub seller: String,
    pub amount: u64,
    pub tracker: String,
}

impl PurchaseRequest {
    pub const BUYER: &'static str = "buyer";
    pub const SELLER: &'static str = "seller";
    pub const AMOUNT: &'static str = "amount";
    pub const TRACKER: &'static str = "tracker";

    pub fn new(
        buyer: impl Into<String>,
        seller: impl Into<String>,
        amount: u64,
        tracker: impl Into<String>,
    ) -> Self {
        Self {
            buyer: buyer.into(),
            seller: seller.into(),
            amount,
            tracker: tracker.into(),
        }
    }

    /// Validate a purchase payload, rejecting it if any field is missing
    pub fn from_fields(map: &Map<String, Value>) -> Result<Self> {
        let amount = map
            .get(Self::AMOUNT)
            .and_then(Value::as_u64)
            .ok_or_else(|| LedgerError::malformed(Self::AMOUNT))?;
        Ok(Self {
            buyer: required_field(map, Self::BUYER)?,
            seller: required_field(map, Self::SELLER)?,
            amount,
            tracker: required_field(map, Self::TRACKER)?,
        })
    }

    /// Check the purchase against the chain and produce the entries to stage:
    /// the payment from buyer to seller and the record naming the new owner.
    pub fn plan(&self, chain: &[Block]) -> Result<(Transaction, TicketRecord)> {
        let current = find_latest(chain, &self.tracker).ok_or_else(|| {
            LedgerError::TicketNotFound {
                tracker: self.tracker.clone(),
            }
        })?;

        if current.owner != self.seller {
            return Err(LedgerError::OwnershipMismatch {
                tracker: self.tracker.clone(),
                expected: self.seller.clone(),
                actual: current.owner.clone(),
            });
        }

        let payment = Transaction::new(
            self.buyer.clone(),
            self.seller.clone(),
            self.amount,
            Some(self.tracker.clone()),
        );
        Ok((payment, current.with_owner(self.buyer.clone())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BlockHash;
    use crate::utils::parse_date_time;
    use serde_json::json;

    fn ticket(tracker: &str, owner: &str) -> TicketRecord {
        TicketRecord {
            tracker: tracker.to_string(),
            company: "Renfe".to_string(),
            origin: "MAD".to_string(),
            destination: "SVQ".to_string(),
            date_time: parse_date_time("2024-06-01 09:00:00").unwrap(),
            seat: "4A".to_string(),
            owner: owner.to_string(),
        }
    }

    fn block(index: u64, tickets: Vec<TicketRecord>) -> Block {
        Block {
            index,
            timestamp: String::new(),
            proof: index,
            previous_hash: BlockHash::from("x"),
            transactions: vec![],
            tickets,
        }
    }

    fn chain() -> Vec<Block> {
        vec![
            block(1, vec![]),
            block(2, vec![ticket("A", "Company"), ticket("B", "Company")]),
            block(3, vec![ticket("A", "bob")]),
        ]
    }

    #[test]
    fn test_find_latest_prefers_newest_block() {
        let chain = chain();
        assert_eq!(find_latest(&chain, "A").unwrap().owner, "bob");
        assert_eq!(find_latest(&chain, "B").unwrap().owner, "Company");
        assert!(find_latest(&chain, "C").is_none());
    }

    #[test]
    fn test_tickets_by_owner_ignores_superseded_records() {
        let chain = chain();
        let company: Vec<_> = tickets_by_owner(&chain, "Company")
            .into_iter()
            .map(|t| t.tracker)
            .collect();
        assert_eq!(company, vec!["B".to_string()]);
        assert_eq!(tickets_by_owner(&chain, "bob").len(), 1);
        assert!(tickets_by_owner(&chain, "carol").is_empty());
    }

    #[test]
    fn test_plan_rejects_wrong_seller() {
        let request = PurchaseRequest::new("carol", "Company", 10, "A");
        match request.plan(&chain()) {
            Err(LedgerError::OwnershipMismatch { actual, .. }) => assert_eq!(actual, "bob"),
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn test_plan_unknown_tracker() {
        let request = PurchaseRequest::new("carol", "Company", 10, "Z");
        assert!(matches!(
            request.plan(&chain()),
            Err(LedgerError::TicketNotFound { .. })
        ));
    }

    #[test]
    fn test_plan_moves_ownership_to_buyer() {
        let request = PurchaseRequest::new("carol", "bob", 10, "A");
        let (payment, record) = request.plan(&chain()).unwrap();
        assert_eq!(payment.sender, "carol");
        assert_eq!(payment.receiver, "bob");
        assert_eq!(payment.ticket.as_deref(), Some("A"));
        assert_eq!(record.owner, "carol");
        assert_eq!(record.seat, "4A");
    }

    #[test]
    fn test_purchase_payload_requires_every_field() {
        let full = json!({"buyer": "x", "seller": "y", "amount": 3, "tracker": "A"});
        let map = full.as_object().unwrap();
        assert_eq!(
            PurchaseRequest::from_fields(map).unwrap(),
            PurchaseRequest::new("x", "y", 3, "A")
        );

        for field in ["buyer", "seller", "amount", "tracker"] {
            let mut partial = map.clone();
            partial.remove(field);
            match PurchaseRequest::from_fields(&partial) {
                Err(LedgerError::MalformedRequest { field: f }) => assert_eq!(f, field),
                other => panic!("expected malformed {}, got {:?}", field, other),
            }
        }
    }
}
