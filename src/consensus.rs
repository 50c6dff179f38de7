//! Chain validation and the longest-chain rule

use crate::crypto::hash::hash_block;
use crate::crypto::pow::ProofOfWork;
use crate::types::Block;
use std::fmt;

/// Why a chain was rejected
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChainFault {
    /// `previous_hash` of the block at `index` does not match its predecessor
    BrokenLink { index: u64 },
    /// Proof of the block at `index` does not solve its predecessor's puzzle
    BadProof { index: u64 },
}

impl fmt::Display for ChainFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChainFault::BrokenLink { index } => write!(f, "block {} has a broken hash link", index),
            ChainFault::BadProof { index } => write!(f, "block {} has an invalid proof", index),
        }
    }
}

/// Verifies hash linkage and puzzle validity across a chain
#[derive(Debug, Clone, Default)]
pub struct ChainValidator {
    pow: ProofOfWork,
}

impl ChainValidator {
    pub fn new(pow: ProofOfWork) -> Self {
        Self { pow }
    }

    /// Walk consecutive pairs and report the first fault found
    pub fn check(&self, chain: &[Block]) -> Result<(), ChainFault> {
        for pair in chain.windows(2) {
            let (prev, cur) = (&pair[0], &pair[1]);
            if cur.previous_hash != hash_block(prev) {
                return Err(ChainFault::BrokenLink { index: cur.index });
            }
            if !self.pow.verify(cur.proof, prev.proof) {
                return Err(ChainFault::BadProof { index: cur.index });
            }
        }
        Ok(())
    }

    /// True when every block links to and solves the puzzle of its predecessor.
    /// Chains of length 0 or 1 are trivially valid.
    pub fn is_valid(&self, chain: &[Block]) -> bool {
        self.check(chain).is_ok()
    }

    pub fn pow(&self) -> &ProofOfWork {
        &self.pow
    }
}

/// Strict longest-chain preference: ties never replace
pub fn is_preferred(candidate_len: usize, best_len: usize) -> bool {
    candidate_len > best_len
}
