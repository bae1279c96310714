pub mod bincode;

use sha2::{Digest, Sha256};

pub type Bytes = Vec<u8>;
pub type FullHash = [u8; 32];

pub fn full_hash(hash: &[u8]) -> FullHash {
    let mut full = FullHash::default();
    full.copy_from_slice(hash);
    full
}

/// SHA-256d of the raw name bytes, in digest byte order. The name is never
/// re-encoded before hashing.
pub fn compute_name_hash(name: &[u8]) -> FullHash {
    let first = Sha256::digest(name);
    full_hash(&Sha256::digest(&first[..])[..])
}
