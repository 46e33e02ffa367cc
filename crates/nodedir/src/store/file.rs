// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! File-backed backend: one file per key with atomic writes.
//!
//! File names are the base64url encoding of the key, so free-form country
//! codes never escape the state directory.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

use crate::error::StoreError;
use crate::store::{BoxFuture, KvBackend};

#[derive(Debug)]
pub struct FileKv {
    dir: PathBuf,
    seq: AtomicU32,
}

impl FileKv {
    /// Open (creating if needed) a state directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        tracing::debug!(dir = %dir.display(), "file store opened");
        Ok(Self { dir, seq: AtomicU32::new(0) })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(URL_SAFE_NO_PAD.encode(key.as_bytes()))
    }
}

fn decode_name(name: &str) -> Option<String> {
    let bytes = URL_SAFE_NO_PAD.decode(name).ok()?;
    String::from_utf8(bytes).ok()
}

impl KvBackend for FileKv {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        Box::pin(async move {
            match tokio::fs::read_to_string(self.path_for(key)).await {
                Ok(value) => Ok(Some(value)),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
                // Non-UTF-8 contents are garbage, not an outage.
                Err(e) if e.kind() == std::io::ErrorKind::InvalidData => Ok(Some(String::new())),
                Err(e) => Err(e.into()),
            }
        })
    }

    /// Write to a unique temp file then rename over the target, so a
    /// concurrent reader sees either the old or the new value.
    fn put<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        Box::pin(async move {
            let path = self.path_for(key);
            let seq = self.seq.fetch_add(1, Ordering::Relaxed);
            let tmp_name = format!(
                ".{}.{}.{}.tmp",
                path.file_name().unwrap_or_default().to_string_lossy(),
                std::process::id(),
                seq,
            );
            let tmp_path = path.with_file_name(tmp_name);
            tokio::fs::write(&tmp_path, value).await?;
            tokio::fs::rename(&tmp_path, &path).await?;
            Ok(())
        })
    }

    fn list<'a>(&'a self, prefix: &'a str) -> BoxFuture<'a, Result<Vec<String>, StoreError>> {
        Box::pin(async move {
            let mut keys = Vec::new();
            let mut entries = tokio::fs::read_dir(&self.dir).await?;
            while let Some(entry) = entries.next_entry().await? {
                let name = entry.file_name();
                let Some(key) = name.to_str().and_then(decode_name) else {
                    continue;
                };
                if key.starts_with(prefix) {
                    keys.push(key);
                }
            }
            keys.sort();
            Ok(keys)
        })
    }
}

#[cfg(test)]
#[path = "file_tests.rs"]
mod tests;
