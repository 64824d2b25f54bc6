use super::{latest_version_with_status, select_version, version_by_name};
use crate::api::types::{Version, VersionStatus};
use chrono::{DateTime, Utc};

fn version(name: &str, status: VersionStatus, date: &str) -> Version {
    Version {
        guid: format!("guid-{name}"),
        name: name.to_string(),
        status,
        version_date: DateTime::parse_from_rfc3339(date)
            .expect("test date")
            .with_timezone(&Utc),
    }
}

fn sample() -> Vec<Version> {
    vec![
        version("v1", VersionStatus::Delivered, "2024-01-10T00:00:00Z"),
        version("v2", VersionStatus::Analyzed, "2024-02-20T00:00:00Z"),
        version("v3", VersionStatus::Opened, "2024-03-30T00:00:00Z"),
    ]
}

#[test]
fn name_match_is_case_insensitive_and_ignores_dates() {
    let versions = sample();
    // v1 is older and lower-status than v2; the explicit name still wins.
    let picked = version_by_name(&versions, "V1").expect("match");
    assert_eq!(picked.name, "v1");
    assert!(version_by_name(&versions, "v9").is_none());
}

#[test]
fn latest_qualifying_version_wins_without_a_name() {
    let versions = sample();
    let picked =
        latest_version_with_status(&versions, VersionStatus::Delivered).expect("qualifying");
    // v3 is newest but only Opened; v2 is the newest with status >= Delivered.
    assert_eq!(picked.name, "v2");
}

#[test]
fn no_qualifying_version_yields_none() {
    let versions = [version("v1", VersionStatus::Opened, "2024-01-01T00:00:00Z")];
    assert!(latest_version_with_status(&versions, VersionStatus::Delivered).is_none());
    assert!(latest_version_with_status(&[], VersionStatus::Opened).is_none());
}

#[test]
fn min_status_is_inclusive() {
    let versions = [version("v1", VersionStatus::Delivered, "2024-01-01T00:00:00Z")];
    let picked =
        latest_version_with_status(&versions, VersionStatus::Delivered).expect("inclusive");
    assert_eq!(picked.name, "v1");
}

#[test]
fn date_ties_keep_the_last_entry_in_server_order() {
    let versions = [
        version("first", VersionStatus::Analyzed, "2024-05-01T12:00:00Z"),
        version("second", VersionStatus::Analyzed, "2024-05-01T12:00:00Z"),
    ];
    let picked =
        latest_version_with_status(&versions, VersionStatus::Delivered).expect("qualifying");
    assert_eq!(picked.name, "second");
}

#[test]
fn select_version_prefers_the_explicit_name() {
    let versions = sample();
    let named = select_version(&versions, Some("v1"), VersionStatus::Delivered).expect("named");
    assert_eq!(named.name, "v1");

    let fallback = select_version(&versions, None, VersionStatus::Delivered).expect("fallback");
    assert_eq!(fallback.name, "v2");
}
