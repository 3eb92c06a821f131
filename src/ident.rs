//! Entry id derivation.
//!
//! An entry id is the SHA-256 of a random salt, the owning log id, a
//! per-generator sequence number and the raw line, rendered as 64 lowercase
//! hex characters. The sequence keeps ids distinct within one generator even
//! for identical lines; across runs distinctness rests on the random salt
//! and is probabilistic. The `entries.entry_id` primary key rejects the
//! (astronomically unlikely) collision as a store error.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Length of every id produced by [`entry_id`].
pub const ENTRY_ID_LEN: usize = 64;

/// Pure digest over the random salt and the line identity.
pub fn entry_id(random: &[u8; 16], log_id: i64, seq: u64, line: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(random);
    hasher.update(log_id.to_string().as_bytes());
    hasher.update(seq.to_le_bytes());
    hasher.update(line.as_bytes());
    hex::encode(hasher.finalize())
}

/// Stateful generator owned by the single consuming task of a run.
#[derive(Debug, Default)]
pub struct EntryIdGenerator {
    seq: u64,
}

impl EntryIdGenerator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_id(&mut self, log_id: i64, line: &str) -> String {
        let random = *Uuid::new_v4().as_bytes();
        let id = entry_id(&random, log_id, self.seq, line);
        self.seq += 1;
        id
    }
}
