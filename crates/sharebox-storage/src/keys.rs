//! Shared remote id generation for storage backends.

use crate::traits::{StorageError, StorageResult};
use std::path::Path;
use uuid::Uuid;

/// Object name for `local_path`: the file name itself, or a fresh uuid that
/// keeps the extension.
pub fn object_name(local_path: &Path, preserve_name: bool) -> StorageResult<String> {
    let file_name = local_path
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            StorageError::InvalidKey(format!("{} has no file name", local_path.display()))
        })?;

    if preserve_name {
        return Ok(file_name.to_string());
    }

    Ok(match extension(file_name) {
        Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
        None => Uuid::new_v4().to_string(),
    })
}

/// `{folder}/{name}`, or just `name` without a folder.
pub fn remote_id(folder: Option<&str>, name: &str) -> String {
    match folder.map(|f| f.trim_matches('/')).filter(|f| !f.is_empty()) {
        Some(folder) => format!("{}/{}", folder, name),
        None => name.to_string(),
    }
}

/// Reject ids that could escape the store's namespace.
pub fn validate_remote_id(remote_id: &str) -> StorageResult<()> {
    if remote_id.is_empty()
        || remote_id.starts_with('/')
        || remote_id.split('/').any(|segment| segment == ".." || segment.is_empty())
        || remote_id.contains('\\')
    {
        return Err(StorageError::InvalidKey(format!(
            "Remote id '{}' contains invalid characters",
            remote_id
        )));
    }
    Ok(())
}

/// Lowercased extension of an object name.
pub fn extension(name: &str) -> Option<String> {
    Path::new(name)
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_lowercase())
}
