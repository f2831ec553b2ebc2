//! Query-local primitive mailbox.
//!
//! The octree and the uniform grid register a primitive in every cell
//! its box overlaps, so a single ray can encounter the same primitive
//! several times. The mailbox records which primitive indices have
//! already been tested during the current query. It lives on the
//! traversal stack of one query and is never written into shared
//! primitives, so concurrent read-only queries from multiple threads
//! stay race-free.

/// Visited set keyed by primitive index, scoped to one ray query.
pub struct Mailbox {
    visited: Vec<bool>,
}

impl Mailbox {
    /// Create a mailbox for a primitive list of the given length.
    pub fn new(len: usize) -> Self {
        Self {
            visited: vec![false; len],
        }
    }

    /// Mark a primitive as tested. Returns true the first time the
    /// index is seen in this query, false on every repeat.
    #[inline]
    pub fn visit(&mut self, index: usize) -> bool {
        debug_assert!(index < self.visited.len(), "primitive index out of range");
        if self.visited[index] {
            false
        } else {
            self.visited[index] = true;
            true
        }
    }
}
