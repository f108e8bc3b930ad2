// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Byte Source Implementations
//!
//! Concrete `ByteSource` adapters: a `tokio::fs`-backed file source for
//! production use, and an in-memory source for tests.

use async_trait::async_trait;
use std::io::SeekFrom;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::File;
use tokio::io::{AsyncReadExt, AsyncSeekExt};
use tokio::sync::Mutex;
use upload_engine_domain::{ByteSource, UploadError};

/// Reads byte ranges from a file on disk.
///
/// A single `tokio::sync::Mutex`-guarded file handle is shared across
/// concurrent readers. This serializes the seek+read pair per call but
/// keeps only one open file descriptor regardless of worker count;
/// callers needing genuine parallel disk I/O can open one
/// `FileByteSource` per worker instead.
pub struct FileByteSource {
    path: PathBuf,
    file: Mutex<File>,
    len: u64,
}

impl FileByteSource {
    pub async fn open(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let path = path.as_ref().to_path_buf();
        let file = File::open(&path).await.map_err(|e| UploadError::invalid_argument(format!("cannot open {}: {e}", path.display())))?;
        let len = file
            .metadata()
            .await
            .map_err(|e| UploadError::invalid_argument(format!("cannot stat {}: {e}", path.display())))?
            .len();
        Ok(Self {
            path,
            file: Mutex::new(file),
            len,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ByteSource for FileByteSource {
    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, UploadError> {
        let mut buf = vec![0u8; (end - start) as usize];
        let mut file = self.file.lock().await;
        file.seek(SeekFrom::Start(start))
            .await
            .map_err(|e| UploadError::invalid_argument(format!("seek failed: {e}")))?;
        file.read_exact(&mut buf).await.map_err(|e| UploadError::invalid_argument(format!("read failed: {e}")))?;
        Ok(buf)
    }

    fn len(&self) -> u64 {
        self.len
    }
}

/// An in-memory byte source, used by tests and scenario fixtures.
pub struct InMemoryByteSource {
    bytes: Arc<Vec<u8>>,
}

impl InMemoryByteSource {
    pub fn new(bytes: Vec<u8>) -> Self {
        Self { bytes: Arc::new(bytes) }
    }
}

#[async_trait]
impl ByteSource for InMemoryByteSource {
    async fn read_range(&self, start: u64, end: u64) -> Result<Vec<u8>, UploadError> {
        let (start, end) = (start as usize, end as usize);
        if end > self.bytes.len() || start > end {
            return Err(UploadError::invalid_argument("range out of bounds"));
        }
        Ok(self.bytes[start..end].to_vec())
    }

    fn len(&self) -> u64 {
        self.bytes.len() as u64
    }
}
