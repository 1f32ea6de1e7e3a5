//! Text and JSON output for reconciled dist-tag rows

use std::fmt::Write;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::version::semver::{PrereleaseOrdering, prerelease_channel};
use crate::version::tags::{build_tagged_version_rows_with, exclude_dist_tags};
use crate::version::types::{PackageDistTags, TaggedVersionRow};

/// Label shown in the channel column for stable releases
const STABLE_CHANNEL: &str = "stable";

/// A package's rows ready for display
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PackageView {
    pub name: String,
    pub rows: Vec<RowView>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RowView {
    #[serde(flatten)]
    pub row: TaggedVersionRow,
    /// Prerelease channel, empty for stable releases
    pub channel: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub published: Option<DateTime<Utc>>,
}

/// Reconcile a snapshot into display rows, hiding `excluded` tags
pub fn package_view(
    package: &PackageDistTags,
    excluded: &[String],
    ordering: PrereleaseOrdering,
) -> PackageView {
    let dist_tags = exclude_dist_tags(&package.dist_tags, excluded);
    let rows = build_tagged_version_rows_with(&dist_tags, ordering)
        .into_iter()
        .map(|row| RowView {
            channel: prerelease_channel(&row.version),
            published: package.published_at(&row.version),
            row,
        })
        .collect();

    PackageView {
        name: package.name.clone(),
        rows,
    }
}

/// Render a package view as an aligned plain-text table
pub fn render_table(view: &PackageView) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "{}", view.name);

    if view.rows.is_empty() {
        let _ = writeln!(out, "  (no dist-tags)");
        return out;
    }

    let version_width = view
        .rows
        .iter()
        .map(|r| r.row.version.chars().count())
        .max()
        .unwrap_or_default();
    let channel_width = view
        .rows
        .iter()
        .map(|r| channel_label(r).chars().count())
        .max()
        .unwrap_or_default();

    for row in &view.rows {
        let published = row
            .published
            .map(|dt| dt.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| "-".to_string());
        let _ = writeln!(
            out,
            "  {:<vw$}  {:<cw$}  {:<10}  {}",
            row.row.version,
            channel_label(row),
            published,
            row.row.tags.join(", "),
            vw = version_width,
            cw = channel_width,
        );
    }
    out
}

/// Render package views as pretty-printed JSON
pub fn render_json(views: &[PackageView]) -> serde_json::Result<String> {
    serde_json::to_string_pretty(views)
}

fn channel_label(row: &RowView) -> &str {
    if row.channel.is_empty() {
        STABLE_CHANNEL
    } else {
        &row.channel
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::version::types::DistTags;
    use std::collections::HashMap;

    fn package(entries: &[(&str, &str)]) -> PackageDistTags {
        let dist_tags: DistTags = entries
            .iter()
            .map(|(tag, version)| (tag.to_string(), version.to_string()))
            .collect();
        PackageDistTags::new("demo", dist_tags)
    }

    #[test]
    fn package_view_attaches_channel_and_publish_time() {
        let published_at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let snapshot = package(&[("latest", "2.0.0"), ("beta", "3.0.0-beta.1")])
            .with_published(HashMap::from([("2.0.0".to_string(), published_at)]));

        let view = package_view(&snapshot, &[], PrereleaseOrdering::Lexical);

        assert_eq!(view.rows.len(), 2);
        assert_eq!(view.rows[0].row.version, "3.0.0-beta.1");
        assert_eq!(view.rows[0].channel, "beta");
        assert_eq!(view.rows[0].published, None);
        assert_eq!(view.rows[1].channel, "");
        assert_eq!(view.rows[1].published, Some(published_at));
    }

    #[test]
    fn package_view_hides_excluded_tags() {
        let snapshot = package(&[("latest", "2.0.0"), ("next", "3.0.0-rc.1")]);

        let view = package_view(&snapshot, &["next".to_string()], PrereleaseOrdering::Lexical);

        assert_eq!(view.rows.len(), 1);
        assert_eq!(view.rows[0].row.primary_tag, "latest");
    }

    #[test]
    fn render_table_aligns_columns() {
        let published_at = DateTime::parse_from_rfc3339("2024-05-01T12:00:00Z")
            .unwrap()
            .with_timezone(&Utc);
        let snapshot = package(&[
            ("latest", "2.0.0"),
            ("stable", "2.0.0"),
            ("beta", "3.0.0-beta.1"),
        ])
        .with_published(HashMap::from([("2.0.0".to_string(), published_at)]));
        let view = package_view(&snapshot, &[], PrereleaseOrdering::Lexical);

        let table = render_table(&view);

        assert_eq!(
            table,
            "demo\n\
             \x20 3.0.0-beta.1  beta    -           beta\n\
             \x20 2.0.0         stable  2024-05-01  latest, stable\n"
        );
    }

    #[test]
    fn render_table_aligns_non_ascii_columns_by_character() {
        let snapshot = package(&[("latest", "2.0.0"), ("beta", "1.0.0-β.1")]);
        let view = package_view(&snapshot, &[], PrereleaseOrdering::Lexical);

        let table = render_table(&view);

        assert_eq!(
            table,
            "demo\n\
             \x20 2.0.0      stable  -           latest\n\
             \x20 1.0.0-β.1  β       -           beta\n"
        );
    }

    #[test]
    fn render_table_notes_empty_packages() {
        let view = package_view(&package(&[]), &[], PrereleaseOrdering::Lexical);

        assert_eq!(render_table(&view), "demo\n  (no dist-tags)\n");
    }

    #[test]
    fn render_json_flattens_rows() {
        let view = package_view(
            &package(&[("latest", "1.0.0")]),
            &[],
            PrereleaseOrdering::Lexical,
        );

        let json: serde_json::Value = serde_json::from_str(&render_json(&[view]).unwrap()).unwrap();

        assert_eq!(
            json,
            serde_json::json!([{
                "name": "demo",
                "rows": [{
                    "id": "version:1.0.0",
                    "version": "1.0.0",
                    "primaryTag": "latest",
                    "tags": ["latest"],
                    "channel": ""
                }]
            }])
        );
    }
}
