//! Short random primary keys.

use crate::backend::IdMaker;
use uuid::Uuid;

const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Default id length, matching a `CHAR(8)` key column.
pub const DEFAULT_ID_LEN: usize = 8;

/// Generates fixed-width base-62 ids from random UUID bits.
#[derive(Debug, Clone, Copy)]
pub struct ShortId {
    len: usize,
}

impl ShortId {
    /// Create a generator for ids of `len` characters (at most 21).
    pub fn new(len: usize) -> Self {
        Self { len: len.clamp(1, 21) }
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

impl Default for ShortId {
    fn default() -> Self {
        Self::new(DEFAULT_ID_LEN)
    }
}

impl IdMaker for ShortId {
    fn next_id(&self) -> String {
        let mut bits = Uuid::new_v4().as_u128();
        let mut id = String::with_capacity(self.len);
        for _ in 0..self.len {
            id.push(ALPHABET[(bits % 62) as usize] as char);
            bits /= 62;
        }
        id
    }
}
