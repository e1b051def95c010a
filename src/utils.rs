//! Naming helpers for source URLs and output artifacts

use crate::error::{FetchError, Result};
use chrono::{DateTime, Utc};

/// Suffix identifying a zstd-compressed tar archive
pub const TAR_ZST_SUFFIX: &str = ".tar.zst";

/// Name used when the URL carries no usable path segment
const FALLBACK_BASE_NAME: &str = "archive";

/// Derive the logical base name of an archive from its URL
///
/// Takes the last non-empty path segment (percent-decoded) and strips the exact,
/// case-sensitive `.tar.zst` suffix when present. Any other name is returned unchanged.
///
/// # Examples
///
/// ```
/// use repackage::utils::derive_base_name;
///
/// assert_eq!(derive_base_name("https://example.com/data/file1.tar.zst").unwrap(), "file1");
/// assert_eq!(derive_base_name("https://example.com/archive.zip").unwrap(), "archive.zip");
/// ```
pub fn derive_base_name(url: &str) -> Result<String> {
    let parsed = url::Url::parse(url).map_err(|e| FetchError::InvalidUrl {
        url: url.to_string(),
        reason: e.to_string(),
    })?;

    let Some(segment) = parsed
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).next_back())
    else {
        return Ok(FALLBACK_BASE_NAME.to_string());
    };

    let segment = urlencoding::decode(segment)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| segment.to_string());

    Ok(strip_tar_zst_suffix(&segment).to_string())
}

/// Strip `.tar.zst` from a file name if it ends with exactly that suffix
///
/// A name that is nothing but the suffix is left alone so the result is never empty.
pub fn strip_tar_zst_suffix(name: &str) -> &str {
    match name.strip_suffix(TAR_ZST_SUFFIX) {
        Some(stem) if !stem.is_empty() => stem,
        _ => name,
    }
}

/// File name under which a converted archive is delivered
pub fn output_file_name(base_name: &str) -> String {
    format!("{}.zip", base_name)
}

/// Object key under which a converted archive is stored
///
/// Format: `{prefix}{base_name}-{YYYYMMDDTHHMMSSZ}.zip`. The base name is made
/// into a single key segment first (see [`key_segment`]), so the key always stays
/// under `prefix`.
pub fn object_key(prefix: &str, base_name: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}{}-{}.zip",
        prefix,
        key_segment(base_name),
        at.format("%Y%m%dT%H%M%SZ")
    )
}

/// Turn a base name into one path segment
///
/// Separators (`/`, `\`) become `_`. A name that is only dots or empty is
/// replaced by the fallback name.
pub fn key_segment(base_name: &str) -> String {
    let segment = base_name.replace(['/', '\\'], "_");
    if segment.chars().all(|c| c == '.') {
        FALLBACK_BASE_NAME.to_string()
    } else {
        segment
    }
}
