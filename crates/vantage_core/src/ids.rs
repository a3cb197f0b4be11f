//! # Entity Identifier Allocation
//!
//! Monotonic, never-reused identifiers for synchronized entities.
//!
//! ## Design
//!
//! - One atomic counter, no lock
//! - Identifiers only ever grow, so an id is never handed out twice
//! - Zero is reserved as the "no entity" marker

use std::sync::atomic::{AtomicU64, Ordering};

/// Lock-free monotonic identifier allocator.
#[derive(Debug)]
pub struct IdAllocator {
    /// Next identifier to hand out.
    next: AtomicU64,
}

impl IdAllocator {
    /// Creates an allocator whose first identifier is 1.
    #[must_use]
    pub const fn new() -> Self {
        Self::starting_at(1)
    }

    /// Creates an allocator whose first identifier is `first`.
    ///
    /// A `first` of zero is bumped to 1.
    #[must_use]
    pub const fn starting_at(first: u64) -> Self {
        let first = if first == 0 { 1 } else { first };
        Self {
            next: AtomicU64::new(first),
        }
    }

    /// Allocates the next identifier.
    ///
    /// Returns `None` once the id space is exhausted. Identifiers are never
    /// recycled, so exhaustion is permanent for this allocator.
    pub fn allocate(&self) -> Option<u64> {
        let result = self
            .next
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |id| id.checked_add(1));
        match result {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::error!("entity id space exhausted");
                None
            }
        }
    }

    /// Returns the identifier the next `allocate` call would hand out.
    #[inline]
    #[must_use]
    pub fn peek(&self) -> u64 {
        self.next.load(Ordering::Acquire)
    }
}

impl Default for IdAllocator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;
    use std::sync::Arc;
    use std::thread;

    #[test]
    fn test_ids_are_monotonic() {
        let ids = IdAllocator::new();
        assert_eq!(ids.allocate(), Some(1));
        assert_eq!(ids.allocate(), Some(2));
        assert_eq!(ids.peek(), 3);
    }

    #[test]
    fn test_zero_is_never_allocated() {
        let ids = IdAllocator::starting_at(0);
        assert_eq!(ids.allocate(), Some(1));
    }

    #[test]
    fn test_exhaustion() {
        let ids = IdAllocator::starting_at(u64::MAX - 1);
        assert_eq!(ids.allocate(), Some(u64::MAX - 1));
        assert_eq!(ids.allocate(), None);
        assert_eq!(ids.allocate(), None);
    }

    #[test]
    fn test_concurrent_allocation_is_unique() {
        let ids = Arc::new(IdAllocator::new());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ids = Arc::clone(&ids);
                thread::spawn(move || {
                    (0..1000).filter_map(|_| ids.allocate()).collect::<Vec<_>>()
                })
            })
            .collect();

        let mut seen = HashSet::new();
        for handle in handles {
            for id in handle.join().unwrap() {
                assert!(seen.insert(id), "duplicate id {id}");
            }
        }
        assert_eq!(seen.len(), 8000);
    }
}
