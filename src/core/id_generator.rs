// Snowflake-style document ids: 64 bits, time-ordered, unique per node.
// Format: [timestamp:42][node_id:10][sequence:12]

use std::sync::atomic::{AtomicU64, Ordering};

use super::types::current_time_millis;

const MAX_NODE_ID: u16 = 1024;
const MAX_SEQUENCE: u64 = 4096;

#[derive(Debug)]
pub struct IdGenerator {
    node_id: u16,
    sequence: AtomicU64,
    last_timestamp: AtomicU64,
}

impl IdGenerator {
    pub fn new(node_id: u16) -> Self {
        assert!(node_id < MAX_NODE_ID, "Node ID must be less than 1024");

        Self {
            node_id,
            sequence: AtomicU64::new(0),
            last_timestamp: AtomicU64::new(0),
        }
    }

    /// Generate the next unique id. Ids generated on the same node are
    /// strictly increasing.
    pub fn next_id(&self) -> i64 {
        let now = current_time_millis() as u64;
        let last = self.last_timestamp.load(Ordering::Relaxed);

        let sequence = if now == last {
            let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
            if seq >= MAX_SEQUENCE {
                // Sequence exhausted for this millisecond
                std::thread::sleep(std::time::Duration::from_millis(1));
                self.sequence.store(0, Ordering::Relaxed);
                return self.next_id();
            }
            seq
        } else {
            self.last_timestamp.store(now, Ordering::Relaxed);
            self.sequence.store(1, Ordering::Relaxed);
            0
        };

        let id = ((now & 0x3FF_FFFF_FFFF) << 22)
            | ((self.node_id as u64) << 12)
            | (sequence & 0xFFF);

        id as i64
    }

    /// Extract the node id embedded in an id
    pub fn extract_node_id(id: i64) -> u16 {
        ((id as u64) >> 12 & 0x3FF) as u16
    }

    /// Extract the millisecond timestamp embedded in an id
    pub fn extract_timestamp(id: i64) -> u64 {
        (id as u64) >> 22
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_unique_and_positive() {
        let generator = IdGenerator::new(3);

        let id1 = generator.next_id();
        let id2 = generator.next_id();
        let id3 = generator.next_id();

        assert!(id1 > 0);
        assert_ne!(id1, id2);
        assert_ne!(id2, id3);
        assert!(id1 < id2 && id2 < id3);
    }

    #[test]
    fn test_node_id_and_timestamp_roundtrip() {
        let generator = IdGenerator::new(500);
        let before = current_time_millis() as u64;
        let id = generator.next_id();

        assert_eq!(IdGenerator::extract_node_id(id), 500);
        let embedded = IdGenerator::extract_timestamp(id);
        assert!(embedded >= (before & 0x3FF_FFFF_FFFF));
    }

    #[test]
    #[should_panic]
    fn test_node_id_out_of_range() {
        IdGenerator::new(1024);
    }
}
