//! Per-decode context threaded explicitly through every dissector call, and
//! the one piece of genuinely shared mutable state: the per-conversation
//! classification cache.

use std::collections::HashMap;
use std::sync::Mutex;

use serde::Serialize;

use crate::registry::Registry;

/// Direction of the link the message was captured on. Conditions some field
/// interpretations (e.g. BSSGP QoS precedence labels).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum LinkDirection {
    Uplink,
    Downlink,
    Either,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UeClassification {
    /// Packet number that established the classification.
    pub packet: u64,
    pub nbiot: bool,
}

/// Cross-packet classification state, keyed by UE identity. Packets of the
/// same conversation may be decoded out of order by different worker threads,
/// so inserts are first-writer-wins behind a lock.
#[derive(Debug, Default)]
pub struct ConversationCache {
    inner: Mutex<HashMap<u64, UeClassification>>,
}

impl ConversationCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a classification for a UE unless one already exists.
    pub fn classify(&self, ue_id: u64, packet: u64, nbiot: bool) {
        let mut map = self.inner.lock().expect("conversation cache poisoned");
        map.entry(ue_id)
            .or_insert(UeClassification { packet, nbiot });
    }

    pub fn is_nbiot(&self, ue_id: u64) -> Option<bool> {
        let map = self.inner.lock().expect("conversation cache poisoned");
        map.get(&ue_id).map(|c| c.nbiot)
    }
}

/// Everything a decode needs besides the bytes themselves. Replaces the
/// file-scope packet-info globals of classic dissector code so independent
/// messages can decode concurrently.
pub struct DecodeContext<'a> {
    pub direction: LinkDirection,
    pub packet_number: u64,
    pub registry: &'a Registry,
    pub conversations: Option<&'a ConversationCache>,
    /// UE identity discovered while decoding the current message (S1AP sets
    /// this from MME-UE-S1AP-ID so later IEs can consult the cache).
    pub ue_id: Option<u64>,
}

impl<'a> DecodeContext<'a> {
    pub fn new(registry: &'a Registry) -> Self {
        DecodeContext {
            direction: LinkDirection::Either,
            packet_number: 0,
            registry,
            conversations: None,
            ue_id: None,
        }
    }

    pub fn with_direction(mut self, direction: LinkDirection) -> Self {
        self.direction = direction;
        self
    }

    pub fn with_conversations(mut self, cache: &'a ConversationCache) -> Self {
        self.conversations = Some(cache);
        self
    }

    pub fn with_packet_number(mut self, packet_number: u64) -> Self {
        self.packet_number = packet_number;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification_is_first_writer_wins() {
        let cache = ConversationCache::new();
        assert_eq!(cache.is_nbiot(7), None);
        cache.classify(7, 1, true);
        cache.classify(7, 9, false);
        assert_eq!(cache.is_nbiot(7), Some(true));
        assert_eq!(cache.is_nbiot(8), None);
    }

    #[test]
    fn test_concurrent_classification() {
        use std::sync::Arc;
        let cache = Arc::new(ConversationCache::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = Arc::clone(&cache);
                std::thread::spawn(move || {
                    for ue in 0..100u64 {
                        cache.classify(ue, i, ue % 2 == 0);
                        let _ = cache.is_nbiot(ue);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        for ue in 0..100 {
            assert_eq!(cache.is_nbiot(ue), Some(ue % 2 == 0));
        }
    }
}
