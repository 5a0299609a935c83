//! Dotted plugin versions: normalization, the publish-time patch bump, and
//! semantic ordering.

use crate::errors::{Result, StoreError};
use semver::{Version, VersionReq};
use std::cmp::Ordering;

/// Parse `1`, `1.2` or `1.2.3` into three numeric components (missing ones are 0).
pub fn components(version: &str) -> Result<[u64; 3]> {
    let parts: Vec<&str> = version.trim().split('.').collect();
    if parts.len() > 3 {
        return Err(StoreError::MalformedVersion(version.to_string()));
    }
    let mut out = [0u64; 3];
    for (slot, part) in out.iter_mut().zip(&parts) {
        if part.is_empty() || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(StoreError::MalformedVersion(version.to_string()));
        }
        *slot = part
            .parse()
            .map_err(|_| StoreError::MalformedVersion(version.to_string()))?;
    }
    Ok(out)
}

/// Pad to `major.minor.patch`.
pub fn normalize(version: &str) -> Result<String> {
    let [major, minor, patch] = components(version)?;
    Ok(format!("{major}.{minor}.{patch}"))
}

/// Pad to three components and increment only the patch.
pub fn increment_patch(version: &str) -> Result<String> {
    let [major, minor, patch] = components(version)?;
    let next = patch
        .checked_add(1)
        .ok_or_else(|| StoreError::MalformedVersion(version.to_string()))?;
    Ok(format!("{major}.{minor}.{next}"))
}

pub fn parse(version: &str) -> Result<Version> {
    let [major, minor, patch] = components(version)?;
    Ok(Version::new(major, minor, patch))
}

/// Numeric ordering of two dotted versions (`1.10.0 > 1.9.0`).
pub fn compare(a: &str, b: &str) -> Result<Ordering> {
    Ok(parse(a)?.cmp(&parse(b)?))
}

/// True if `remote` is strictly newer than `local`.
pub fn is_newer(remote: &str, local: &str) -> Result<bool> {
    Ok(compare(remote, local)? == Ordering::Greater)
}

/// Check `version` against a requirement such as `>=1.0` or `^2`.
pub fn satisfies(version: &str, requirement: &str) -> Result<bool> {
    let req = VersionReq::parse(requirement.trim())
        .map_err(|e| StoreError::MalformedVersion(format!("{requirement}: {e}")))?;
    Ok(req.matches(&parse(version)?))
}
