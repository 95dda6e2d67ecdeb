//! Connection ID generation

use crate::ConnectionId;
use std::sync::atomic::{self, AtomicU32};

/// Thread-safe monotonically increasing ID generator
///
/// IDs start at 1 and are never reused within a process.
pub struct IdGenerator {
    next_id: AtomicU32,
}

impl IdGenerator {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU32::new(1),
        }
    }

    /// Get the next available ID
    pub fn next_id(&self) -> ConnectionId {
        ConnectionId::new(self.next_id.fetch_add(1, atomic::Ordering::Relaxed))
    }
}

impl Default for IdGenerator {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_id_generation() {
        let gen = IdGenerator::new();
        let id1 = gen.next_id();
        let id2 = gen.next_id();
        assert_ne!(id1, id2);
        assert_eq!(id1.get(), 1);
    }

    #[test]
    fn test_ids_unique_across_threads() {
        let gen = Arc::new(IdGenerator::new());
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let gen = gen.clone();
                std::thread::spawn(move || (0..100).map(|_| gen.next_id().get()).collect::<Vec<_>>())
            })
            .collect();

        let mut all: Vec<u32> = handles.into_iter().flat_map(|h| h.join().unwrap()).collect();
        all.sort_unstable();
        all.dedup();
        assert_eq!(all.len(), 400);
    }
}
