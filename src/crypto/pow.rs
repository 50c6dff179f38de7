//! Proof of Work implementation
//!
//! The puzzle for a new block depends only on the previous block's proof: a
//! candidate `p` solves it when the SHA-256 hex digest of the decimal string
//! of `p² - previous²` starts with `difficulty` zero characters.

use crate::crypto::hash::sha256_hex;
use crate::error::{LedgerError, Result};
use serde::{Deserialize, Serialize};
use tokio::task;

/// How many candidates are tried between cancellation checks
const CANCEL_CHECK_INTERVAL: u64 = 4096;

/// Proof of Work parameters and configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProofOfWorkConfig {
    /// Difficulty target (number of leading hex zeros required)
    pub difficulty: u32,
}

impl Default for ProofOfWorkConfig {
    fn default() -> Self {
        Self { difficulty: 4 }
    }
}

/// Deterministic brute-force puzzle solver
#[derive(Debug, Clone)]
pub struct ProofOfWork {
    config: ProofOfWorkConfig,
}

impl ProofOfWork {
    /// Create a new Proof of Work instance with default configuration
    pub fn new() -> Self {
        Self {
            config: ProofOfWorkConfig::default(),
        }
    }

    /// Create a new Proof of Work instance with custom configuration
    pub fn with_config(config: ProofOfWorkConfig) -> Self {
        Self { config }
    }

    /// Create a simple PoW with specified difficulty
    pub fn with_difficulty(difficulty: u32) -> Self {
        Self {
            config: ProofOfWorkConfig { difficulty },
        }
    }

    /// Decimal string of `proof² - previous²`, sign included.
    ///
    /// `None` when the square difference does not fit in 128 bits; such a
    /// proof can never be accepted.
    pub fn puzzle_input(proof: u64, previous: u64) -> Option<String> {
        let (hi, lo, negative) = if proof >= previous {
            (proof, previous, false)
        } else {
            (previous, proof, true)
        };
        let diff = (hi - lo) as u128;
        let sum = hi as u128 + lo as u128;
        let magnitude = diff.checked_mul(sum)?;

        Some(if negative {
            format!("-{}", magnitude)
        } else {
            magnitude.to_string()
        })
    }

    /// Hex digest checked against the difficulty prefix
    pub fn puzzle_digest(proof: u64, previous: u64) -> Option<String> {
        Self::puzzle_input(proof, previous).map(|input| sha256_hex(input.as_bytes()))
    }

    /// Check if hash meets difficulty requirement
    fn meets_difficulty(hash: &str, difficulty: u32) -> bool {
        let difficulty = difficulty as usize;
        hash.len() >= difficulty && hash.bytes().take(difficulty).all(|b| b == b'0')
    }

    /// Does `proof` solve the puzzle posed by `previous`
    pub fn verify(&self, proof: u64, previous: u64) -> bool {
        Self::puzzle_digest(proof, previous)
            .map(|digest| Self::meets_difficulty(&digest, self.config.difficulty))
            .unwrap_or(false)
    }

    /// Search candidates 1, 2, 3, ... and return the first that solves the puzzle.
    ///
    /// Pure and deterministic; runs until a solution is found.
    pub fn solve(&self, previous: u64) -> u64 {
        let mut candidate = 1u64;
        while !self.verify(candidate, previous) {
            candidate += 1;
        }
        candidate
    }

    /// Same search as [`solve`](Self::solve), abandoned once `is_stale` reports true.
    pub fn solve_until<F>(&self, previous: u64, is_stale: F) -> Option<u64>
    where
        F: Fn() -> bool,
    {
        let mut candidate = 1u64;
        loop {
            if self.verify(candidate, previous) {
                return Some(candidate);
            }
            if candidate % CANCEL_CHECK_INTERVAL == 0 && is_stale() {
                return None;
            }
            candidate = candidate.checked_add(1)?;
        }
    }

    /// Run the search on the blocking pool so async callers stay responsive
    pub async fn solve_blocking<F>(&self, previous: u64, is_stale: F) -> Result<Option<u64>>
    where
        F: Fn() -> bool + Send + 'static,
    {
        let pow = self.clone();
        task::spawn_blocking(move || pow.solve_until(previous, is_stale))
            .await
            .map_err(|e| LedgerError::Io(std::io::Error::other(e)))
    }

    /// Get the current difficulty
    pub fn difficulty(&self) -> u32 {
        self.config.difficulty
    }
}

impl Default for ProofOfWork {
    fn default() -> Self {
        Self::new()
    }
}
