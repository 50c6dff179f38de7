//! Hash utilities and the canonical block digest

use crate::types::{Block, BlockHash};
use sha2::{Digest, Sha256};

/// Compute SHA-256 hash
pub fn sha256(data: &[u8]) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute SHA-256 hash and return as hex string
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(sha256(data))
}

/// Deterministic byte encoding of a block: compact JSON with sorted keys.
///
/// Key order comes from serde_json's default `BTreeMap`-backed `Map`; the
/// `preserve_order` feature must stay off or every digest changes.
pub fn canonical_bytes(block: &Block) -> Vec<u8> {
    block.to_canonical_value().to_string().into_bytes()
}

/// Canonical hash of a block.
///
/// Structurally equal blocks always produce the same digest, on any node.
pub fn hash_block(block: &Block) -> BlockHash {
    BlockHash(sha256_hex(&canonical_bytes(block)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Transaction;

    fn block() -> Block {
        Block {
            index: 2,
            timestamp: "2024-01-01 00:00:00.000000".to_string(),
            proof: 533,
            previous_hash: BlockHash::from("abc"),
            transactions: vec![Transaction::new("system", "miner", 1, None)],
            tickets: vec![],
        }
    }

    #[test]
    fn test_sha256_known_vector() {
        assert_eq!(
            sha256_hex(b"abc"),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[test]
    fn test_canonical_encoding_sorts_keys() {
        let encoded = String::from_utf8(canonical_bytes(&block())).unwrap();
        let index_pos = encoded.find("\"index\"").unwrap();
        let proof_pos = encoded.find("\"proof\"").unwrap();
        let tickets_pos = encoded.find("\"tickets\"").unwrap();
        assert!(index_pos < proof_pos && proof_pos < tickets_pos);
        assert!(!encoded.contains("\": "));
    }

    #[test]
    fn test_canonical_encoding_is_pinned() {
        let encoded = String::from_utf8(canonical_bytes(&block())).unwrap();
        assert_eq!(
            encoded,
            r#"{"index":2,"previous_hash":"abc","proof":533,"tickets":[],"timestamp":"2024-01-01 00:00:00.000000","transactions":[{"amount":1,"receiver":"miner","sender":"system","ticket":null}]}"#
        );
        assert_eq!(
            hash_block(&block()).as_str(),
            "24dcde3382528d63339cc3c9948a179b4253bbe92a2fbbb80ac90ceac33a1360"
        );
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = block();
        let mut b = block();
        b.proof += 1;
        assert_ne!(hash_block(&a), hash_block(&b));
        assert_eq!(hash_block(&a).as_str().len(), 64);
    }
}
