//! Cryptographic primitives for ledger operations

pub mod hash;
pub mod pow;

pub use hash::{hash_block, sha256_hex};
pub use pow::{ProofOfWork, ProofOfWorkConfig};
