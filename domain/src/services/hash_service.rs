// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Hash Service
//!
//! The digest primitive: `digest(bytes) -> hex-string, MD5-equivalent`.
//! CPU-bound, therefore synchronous: async execution of this trait is
//! an infrastructure concern (the Worker Pool runs it inside
//! `spawn_blocking`), not a domain one.

/// Computes the MD5-equivalent digest of a byte slice.
pub trait HashService: Send + Sync {
    /// Lowercase hex digest, 32 characters.
    fn digest(&self, bytes: &[u8]) -> String;

    /// The file-level hash: `digest(concat(chunk_hash_0 .. chunk_hash_{N-1}))`
    /// over the ASCII hex strings.
    fn digest_chunk_hashes(&self, chunk_hashes: &[String]) -> String {
        let concatenated = chunk_hashes.concat();
        self.digest(concatenated.as_bytes())
    }
}

/// The shipped `HashService`, backed by the `md-5` crate.
#[derive(Debug, Default, Clone, Copy)]
pub struct Md5HashService;

impl HashService for Md5HashService {
    fn digest(&self, bytes: &[u8]) -> String {
        use md5::{Digest, Md5};
        let mut hasher = Md5::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}
