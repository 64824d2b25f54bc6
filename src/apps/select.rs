//! Version and package selection rules.
//!
//! Remote collections here are tens of entries at most, so a linear scan over
//! the fetched list is all the structure these rules need.
use crate::api::types::{Version, VersionStatus};

/// Case-insensitive exact match on the version name.
pub fn version_by_name<'a>(versions: &'a [Version], name: &str) -> Option<&'a Version> {
    versions
        .iter()
        .find(|version| version.name.eq_ignore_ascii_case(name))
}

/// Most recent version whose status has reached `min_status`.
///
/// Ties on the version date keep the last entry in server order, matching the
/// console UI's own pick.
pub fn latest_version_with_status(
    versions: &[Version],
    min_status: VersionStatus,
) -> Option<&Version> {
    versions
        .iter()
        .filter(|version| version.status >= min_status)
        .max_by_key(|version| version.version_date)
}

/// The selection rule every command shares: an explicit name wins, otherwise
/// fall back to the most recent qualifying version.
pub fn select_version<'a>(
    versions: &'a [Version],
    name: Option<&str>,
    min_status: VersionStatus,
) -> Option<&'a Version> {
    match name {
        Some(name) => version_by_name(versions, name),
        None => latest_version_with_status(versions, min_status),
    }
}

#[cfg(test)]
#[path = "select_tests.rs"]
mod tests;
