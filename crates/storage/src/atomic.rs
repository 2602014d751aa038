// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Atomic temp-file-plus-rename writes, shared by every JSON document this
//! crate persists (plan state, app state, permission cache — all "small
//! JSON documents written from a worker task", per SPEC_FULL §6).

use std::io;
use std::path::Path;

/// Serialize `value` to pretty JSON and write it to `path` atomically: a
/// sibling temp file is written first and then renamed over `path`, so a
/// reader never observes a partially-written document and a crash mid-write
/// leaves the previous version intact.
pub fn atomic_write_json<T: serde::Serialize>(path: &Path, value: &T) -> io::Result<()> {
    let parent = path.parent().ok_or_else(|| {
        io::Error::new(io::ErrorKind::InvalidInput, "path has no parent directory")
    })?;
    std::fs::create_dir_all(parent)?;

    let bytes = serde_json::to_vec_pretty(value)
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

    let tmp_path = parent.join(format!(
        ".{}.tmp-{}",
        path.file_name().and_then(|n| n.to_str()).unwrap_or("doc"),
        std::process::id()
    ));
    std::fs::write(&tmp_path, &bytes)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read and deserialize a JSON document at `path`, returning `default()`
/// when the file does not exist (first-run / fresh repo). Any other I/O
/// or parse error is propagated.
pub fn read_json_or_default<T: serde::de::DeserializeOwned + Default>(
    path: &Path,
) -> io::Result<T> {
    match std::fs::read(path) {
        Ok(bytes) => serde_json::from_slice(&bytes)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e)),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(T::default()),
        Err(e) => Err(e),
    }
}

#[cfg(test)]
#[path = "atomic_tests.rs"]
mod tests;
