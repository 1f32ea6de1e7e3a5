//! Reconciles dist-tags into per-version display rows
//!
//! Every function here is pure: it reads a snapshot and returns freshly
//! allocated output without touching its arguments.

use crate::version::semver::{PrereleaseOrdering, compare_versions, parse_version};
use crate::version::types::{DistTags, TaggedVersionRow, VersionToTagsMap};

/// The tag that always sorts first
pub const LATEST_TAG: &str = "latest";

/// Sort tag names with `latest` first and the rest in ascending lexical order.
pub fn sort_tags(tags: &[String]) -> Vec<String> {
    let mut sorted = tags.to_vec();
    sorted.sort_by(|a, b| {
        (a != LATEST_TAG)
            .cmp(&(b != LATEST_TAG))
            .then_with(|| a.cmp(b))
    });
    sorted
}

/// Group tag names under the version they resolve to.
///
/// Groups appear in the order their version is first encountered, and each
/// group is ordered with [`sort_tags`].
pub fn build_version_to_tags_map(dist_tags: &DistTags) -> VersionToTagsMap {
    let mut grouped = VersionToTagsMap::new();
    for (tag, version) in dist_tags {
        grouped
            .entry(version.clone())
            .or_default()
            .push(tag.clone());
    }

    for tags in grouped.values_mut() {
        *tags = sort_tags(tags);
    }
    grouped
}

/// Build one row per distinct version, newest first, ranking prereleases lexically.
pub fn build_tagged_version_rows(dist_tags: &DistTags) -> Vec<TaggedVersionRow> {
    build_tagged_version_rows_with(dist_tags, PrereleaseOrdering::Lexical)
}

/// Build one row per distinct version, newest first.
///
/// Versions that parse to the same tuple (for example two unparseable strings
/// that both fall back to `0.0.0`) keep the order in which they were first
/// encountered in `dist_tags`.
pub fn build_tagged_version_rows_with(
    dist_tags: &DistTags,
    ordering: PrereleaseOrdering,
) -> Vec<TaggedVersionRow> {
    let mut ranked: Vec<_> = build_version_to_tags_map(dist_tags)
        .into_iter()
        .map(|(version, tags)| (parse_version(&version), version, tags))
        .collect();

    // sort_by is stable, which keeps encounter order for equal ranks
    ranked.sort_by(|(a, _, _), (b, _, _)| compare_versions(b, a, ordering));

    ranked
        .into_iter()
        .map(|(_, version, tags)| TaggedVersionRow::new(version, tags))
        .collect()
}

/// Return `tags` in their original order without any name listed in `excluded`.
pub fn filter_excluded_tags(tags: &[String], excluded: &[String]) -> Vec<String> {
    tags.iter()
        .filter(|tag| !excluded.contains(tag))
        .cloned()
        .collect()
}

/// Drop excluded tag names from a snapshot before it is reconciled.
///
/// A version reachable only through excluded tags disappears from the result.
pub fn exclude_dist_tags(dist_tags: &DistTags, excluded: &[String]) -> DistTags {
    if excluded.is_empty() {
        return dist_tags.clone();
    }

    let names: Vec<String> = dist_tags.keys().cloned().collect();
    filter_excluded_tags(&names, excluded)
        .into_iter()
        .filter_map(|tag| {
            let version = dist_tags.get(&tag)?.clone();
            Some((tag, version))
        })
        .collect()
}
