use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use ticketchain::{
    error::NetworkError, Block, BlockHash, ChainFetcher, ChainSnapshot, LedgerError, LedgerNode,
    PeerAddress,
};
use tokio::time::{sleep, Duration};

/// Canned peer answers, optionally delayed to shuffle arrival order
#[derive(Default)]
struct MockFetcher {
    chains: HashMap<String, ChainSnapshot>,
    delays_ms: HashMap<String, u64>,
}

impl MockFetcher {
    fn with_chain(mut self, peer: &str, chain: Vec<Block>) -> Self {
        self.chains.insert(peer.to_string(), ChainSnapshot::new(chain));
        self
    }

    fn with_snapshot(mut self, peer: &str, snapshot: ChainSnapshot) -> Self {
        self.chains.insert(peer.to_string(), snapshot);
        self
    }

    fn with_delay(mut self, peer: &str, delay_ms: u64) -> Self {
        self.delays_ms.insert(peer.to_string(), delay_ms);
        self
    }
}

#[async_trait]
impl ChainFetcher for MockFetcher {
    async fn fetch_chain(&self, peer: &PeerAddress) -> ticketchain::Result<ChainSnapshot> {
        if let Some(delay) = self.delays_ms.get(peer.as_str()) {
            sleep(Duration::from_millis(*delay)).await;
        }
        self.chains.get(peer.as_str()).cloned().ok_or_else(|| {
            LedgerError::Network(NetworkError::PeerUnreachable {
                peer: peer.to_string(),
                reason: "connection refused".to_string(),
            })
        })
    }
}

/// A chain of `length` blocks mined by an independent node
async fn mined_chain(length: usize) -> Result<Vec<Block>> {
    let node = LedgerNode::builder().difficulty(2).build()?;
    while node.chain().await.len() < length {
        node.mine().await?;
    }
    Ok(node.chain().await.to_vec())
}

async fn local_node(length: usize, fetcher: MockFetcher) -> Result<LedgerNode> {
    let node = LedgerNode::builder()
        .difficulty(2)
        .with_fetcher(Arc::new(fetcher))
        .build()?;
    while node.chain().await.len() < length {
        node.mine().await?;
    }
    Ok(node)
}

#[tokio::test]
async fn test_adopts_longest_valid_chain() -> Result<()> {
    let long = mined_chain(5).await?;
    let fetcher = MockFetcher::default()
        .with_chain("short:1", mined_chain(2).await?)
        .with_chain("long:1", long.clone())
        .with_chain("same:1", mined_chain(3).await?);
    let node = local_node(3, fetcher).await?;
    node.register_peers(["http://short:1", "down:1", "http://long:1/", "same:1"])
        .await?;

    let outcome = node.reconcile().await;

    assert!(outcome.replaced);
    assert_eq!(outcome.chain.len(), 5);
    assert_eq!(outcome.adopted_from.map(|p| p.to_string()), Some("long:1".to_string()));
    assert_eq!(node.chain().await.as_slice(), long.as_slice());
    assert!(node.is_valid().await);
    Ok(())
}

#[tokio::test]
async fn test_keeps_chain_when_no_peer_is_longer() -> Result<()> {
    let fetcher = MockFetcher::default()
        .with_chain("a:1", mined_chain(3).await?)
        .with_chain("b:1", mined_chain(2).await?);
    let node = local_node(3, fetcher).await?;
    node.register_peers(["a:1", "b:1", "down:1"]).await?;
    let before = node.chain().await;

    let outcome = node.reconcile().await;

    assert!(!outcome.replaced);
    assert!(outcome.adopted_from.is_none());
    assert_eq!(outcome.chain.as_slice(), before.as_slice());
    assert_eq!(node.chain().await.as_slice(), before.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_unreachable_peer_does_not_block_adoption() -> Result<()> {
    let long = mined_chain(5).await?;
    let fetcher = MockFetcher::default().with_chain("good:1", long.clone());
    let node = local_node(3, fetcher).await?;
    node.register_peers(["gone:1", "gone:2", "good:1"]).await?;

    let outcome = node.reconcile().await;

    assert!(outcome.replaced);
    assert_eq!(node.chain().await.len(), 5);
    Ok(())
}

#[tokio::test]
async fn test_longer_invalid_chain_is_skipped() -> Result<()> {
    let mut forged = mined_chain(7).await?;
    forged[3].previous_hash = BlockHash::from("forged");
    let honest = mined_chain(5).await?;

    let fetcher = MockFetcher::default()
        .with_chain("forger:1", forged)
        .with_chain("honest:1", honest.clone());
    let node = local_node(3, fetcher).await?;
    node.register_peers(["forger:1", "honest:1"]).await?;

    let outcome = node.reconcile().await;

    assert!(outcome.replaced);
    assert_eq!(node.chain().await.as_slice(), honest.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_misreported_length_is_skipped() -> Result<()> {
    let chain = mined_chain(3).await?;
    let lying = ChainSnapshot {
        chain: chain.clone(),
        length: 10,
    };
    let fetcher = MockFetcher::default().with_snapshot("liar:1", lying);
    let node = local_node(2, fetcher).await?;
    node.register_peers(["liar:1"]).await?;

    let outcome = node.reconcile().await;

    assert!(!outcome.replaced);
    assert_eq!(node.chain().await.len(), 2);
    Ok(())
}

#[tokio::test]
async fn test_tie_goes_to_first_enumerated_peer() -> Result<()> {
    let first = mined_chain(4).await?;
    let second = mined_chain(4).await?;
    assert_ne!(first, second);

    // The first peer answers last; enumeration order must still win
    let fetcher = MockFetcher::default()
        .with_chain("first:1", first.clone())
        .with_delay("first:1", 150)
        .with_chain("second:1", second);
    let node = local_node(2, fetcher).await?;
    node.register_peers(["first:1", "second:1"]).await?;

    let outcome = node.reconcile().await;

    assert!(outcome.replaced);
    assert_eq!(outcome.adopted_from.map(|p| p.to_string()), Some("first:1".to_string()));
    assert_eq!(node.chain().await.as_slice(), first.as_slice());
    Ok(())
}

#[tokio::test]
async fn test_block_mined_during_fetch_is_kept() -> Result<()> {
    // One block longer than local when the fetch starts, equal by the time it lands
    let fetcher = MockFetcher::default()
        .with_chain("slow:1", mined_chain(3).await?)
        .with_delay("slow:1", 300);
    let node = local_node(2, fetcher).await?;
    node.register_peers(["slow:1"]).await?;

    let (outcome, mined) = tokio::join!(node.reconcile(), async {
        sleep(Duration::from_millis(50)).await;
        node.mine().await
    });
    let mined = mined?;

    assert!(!outcome.replaced);
    assert!(outcome.adopted_from.is_none());
    let chain = node.chain().await;
    assert_eq!(chain.len(), 3);
    assert_eq!(chain[2], mined);
    assert!(node.is_valid().await);
    Ok(())
}

#[tokio::test]
async fn test_pending_entries_survive_replacement() -> Result<()> {
    let fetcher = MockFetcher::default().with_chain("long:1", mined_chain(4).await?);
    let node = local_node(2, fetcher).await?;
    node.register_peers(["long:1"]).await?;
    node.add_transaction("alice", "bob", 3, None).await;

    assert!(node.reconcile().await.replaced);
    assert_eq!(node.pending().await, (1, 0));

    let block = node.mine().await?;
    assert_eq!(block.index, 5);
    assert_eq!(block.transactions[0].sender, "alice");
    assert!(node.is_valid().await);
    Ok(())
}

#[tokio::test]
async fn test_no_peers_is_a_no_op() -> Result<()> {
    let node = local_node(2, MockFetcher::default()).await?;
    let outcome = node.reconcile().await;
    assert!(!outcome.replaced);
    assert_eq!(outcome.chain.len(), 2);
    Ok(())
}
