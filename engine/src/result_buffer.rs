// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Result Buffer (C4)
//!
//! Reorders out-of-order hash results into index-monotonic
//! `ChunkHashed` events, then derives `AllChunksHashed` and
//! `FileHashed`.

use std::collections::HashMap;
use std::sync::Arc;
use upload_engine_domain::{HashResult, HashService, HashedChunk, UploadEvent};

/// The Result Buffer component. Owns the reorder map exclusively for
/// the lifetime of one upload.
pub struct ResultBuffer {
    total: u32,
    next_expected_index: u32,
    pending: HashMap<u32, HashResult>,
    chunk_hashes: Vec<Option<String>>,
    hash_service: Arc<dyn HashService>,
    all_emitted: bool,
}

impl ResultBuffer {
    pub fn new(total: u32, hash_service: Arc<dyn HashService>) -> Self {
        Self {
            total,
            next_expected_index: 0,
            pending: HashMap::new(),
            chunk_hashes: vec![None; total as usize],
            hash_service,
            all_emitted: false,
        }
    }

    /// Feeds in one worker result, returning the events it unlocks (in
    /// emission order). May return zero, one, or several `ChunkHashed`
    /// events plus the terminal `AllChunksHashed`/`FileHashed` pair
    /// when the buffer completes.
    pub fn add_result(&mut self, result: HashResult) -> Vec<UploadEvent> {
        let mut events = Vec::new();
        self.pending.insert(result.index, result);

        while let Some(ready) = self.pending.remove(&self.next_expected_index) {
            self.chunk_hashes[ready.index as usize] = Some(ready.hash.clone());
            events.push(UploadEvent::ChunkHashed(HashedChunk {
                index: ready.index,
                start: ready.range.start,
                end: ready.range.end,
                hash: ready.hash,
            }));
            self.next_expected_index += 1;

            if self.next_expected_index == self.total {
                break;
            }
        }

        if self.next_expected_index == self.total && !self.all_emitted {
            self.all_emitted = true;
            events.push(UploadEvent::AllChunksHashed);

            // Every slot must be filled by construction: the loop above
            // only reaches next_expected_index == total once every
            // index 0..total has passed through it.
            let hashes: Vec<String> = self.chunk_hashes.iter().map(|h| h.clone().expect("all chunk hashes present by construction")).collect();
            let file_hash = self.hash_service.digest_chunk_hashes(&hashes);
            events.push(UploadEvent::FileHashed { file_hash });
        }

        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use upload_engine_domain::value_objects::ChunkRange;
    use upload_engine_domain::Md5HashService;

    fn range(index: u32, start: u64, end: u64) -> ChunkRange {
        ChunkRange { index, start, end }
    }

    fn result(index: u32, hash: &str, r: ChunkRange) -> HashResult {
        HashResult {
            index,
            hash: hash.to_string(),
            range: r,
        }
    }

    #[test]
    fn in_order_results_emit_immediately() {
        let mut buf = ResultBuffer::new(2, Arc::new(Md5HashService));
        let events = buf.add_result(result(0, "h0", range(0, 0, 100)));
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], UploadEvent::ChunkHashed(_)));

        let events = buf.add_result(result(1, "h1", range(1, 100, 200)));
        // ChunkHashed(1), AllChunksHashed, FileHashed
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], UploadEvent::ChunkHashed(_)));
        assert!(matches!(events[1], UploadEvent::AllChunksHashed));
        assert!(matches!(events[2], UploadEvent::FileHashed { .. }));
    }

    #[test]
    fn out_of_order_results_are_reordered() {
        let mut buf = ResultBuffer::new(3, Arc::new(Md5HashService));

        let events = buf.add_result(result(2, "h2", range(2, 200, 300)));
        assert!(events.is_empty());

        let events = buf.add_result(result(0, "h0", range(0, 0, 100)));
        assert_eq!(events.len(), 1);
        assert!(matches!(&events[0], UploadEvent::ChunkHashed(c) if c.index == 0));

        let events = buf.add_result(result(1, "h1", range(1, 100, 200)));
        assert_eq!(events.len(), 4); // ChunkHashed(1), ChunkHashed(2), AllChunksHashed, FileHashed
        assert!(matches!(&events[0], UploadEvent::ChunkHashed(c) if c.index == 1));
        assert!(matches!(&events[1], UploadEvent::ChunkHashed(c) if c.index == 2));
    }

    #[test]
    fn file_hash_is_independent_of_arrival_order() {
        let svc = Arc::new(Md5HashService);

        let mut in_order = ResultBuffer::new(2, svc.clone());
        in_order.add_result(result(0, "h0", range(0, 0, 100)));
        let events_a = in_order.add_result(result(1, "h1", range(1, 100, 200)));

        let mut reordered = ResultBuffer::new(2, svc);
        reordered.add_result(result(1, "h1", range(1, 100, 200)));
        let events_b = reordered.add_result(result(0, "h0", range(0, 0, 100)));

        let hash_a = events_a.iter().find_map(|e| match e {
            UploadEvent::FileHashed { file_hash } => Some(file_hash.clone()),
            _ => None,
        });
        let hash_b = events_b.iter().find_map(|e| match e {
            UploadEvent::FileHashed { file_hash } => Some(file_hash.clone()),
            _ => None,
        });
        assert_eq!(hash_a, hash_b);
    }
}
