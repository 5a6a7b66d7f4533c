//! JSON document helpers over `tokio::fs`.
//!
//! A missing file or directory reads as absent, and removing one that is
//! already gone succeeds. Writes go to a sibling `.tmp` file that is then
//! renamed over the target, so a reader never sees a half-written
//! document. Callers serialize writers to the same path.

use axon_core::error::JournalError;
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::io::ErrorKind;
use std::path::Path;

/// Encode a key into a safe filename.
pub(crate) fn key_to_filename(key: &str) -> String {
    let mut encoded = String::new();
    for ch in key.chars() {
        match ch {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '-' | '_' | '.' => encoded.push(ch),
            _ => {
                let mut buf = [0u8; 4];
                for byte in ch.encode_utf8(&mut buf).as_bytes() {
                    encoded.push_str(&format!("%{byte:02X}"));
                }
            }
        }
    }
    format!("{encoded}.json")
}

fn io_error(e: std::io::Error) -> JournalError {
    JournalError::Adapter(e.to_string())
}

fn serde_error(e: serde_json::Error) -> JournalError {
    JournalError::Serialization(e.to_string())
}

pub(crate) async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>, JournalError> {
    match tokio::fs::read(path).await {
        Ok(bytes) => serde_json::from_slice(&bytes).map(Some).map_err(serde_error),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(io_error(e)),
    }
}

pub(crate) async fn write_json<T: Serialize>(
    path: &Path,
    value: &T,
    pretty: bool,
) -> Result<(), JournalError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await.map_err(io_error)?;
    }
    let contents = if pretty {
        serde_json::to_vec_pretty(value)
    } else {
        serde_json::to_vec(value)
    }
    .map_err(serde_error)?;

    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    tokio::fs::write(&tmp, contents).await.map_err(io_error)?;
    tokio::fs::rename(&tmp, path).await.map_err(io_error)
}

pub(crate) async fn remove_file(path: &Path) -> Result<(), JournalError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(e)),
    }
}

pub(crate) async fn remove_dir(path: &Path) -> Result<(), JournalError> {
    match tokio::fs::remove_dir_all(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
        Err(e) => Err(io_error(e)),
    }
}

/// Every `.json` document directly inside `dir`, in no particular order.
pub(crate) async fn read_dir_json<T: DeserializeOwned>(dir: &Path) -> Result<Vec<T>, JournalError> {
    let mut entries = match tokio::fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(vec![]),
        Err(e) => return Err(io_error(e)),
    };

    let mut docs = Vec::new();
    while let Some(entry) = entries.next_entry().await.map_err(io_error)? {
        let path = entry.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            // Removed between listing and reading.
            if let Some(doc) = read_json(&path).await? {
                docs.push(doc);
            }
        }
    }
    Ok(docs)
}
