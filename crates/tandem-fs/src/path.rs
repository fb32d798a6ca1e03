use crate::error::{FsError, FsResult};

/// Check that `name` is usable as a single directory entry name.
pub fn validate_name(name: &str) -> FsResult<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains(['/', '\0']) {
        return Err(FsError::InvalidName(name.to_string()));
    }
    Ok(())
}

/// Split a slash-separated path into validated segments. Leading and
/// trailing slashes are ignored.
pub fn split_path(path: &str) -> FsResult<Vec<&str>> {
    let trimmed = path.trim_matches('/');
    if trimmed.is_empty() {
        return Err(FsError::InvalidName(path.to_string()));
    }
    let segments: Vec<&str> = trimmed.split('/').collect();
    for segment in &segments {
        validate_name(segment).map_err(|_| FsError::InvalidName(path.to_string()))?;
    }
    Ok(segments)
}
