//! Common types for dist-tag reconciliation

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Tag name mapped to the raw version string it points at.
///
/// Iteration order is the order the registry listed the tags in.
pub type DistTags = IndexMap<String, String>;

/// Raw version string mapped to the sorted tag names resolving to it
pub type VersionToTagsMap = IndexMap<String, Vec<String>>;

/// One display row per distinct resolved version
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaggedVersionRow {
    /// `"version:"` followed by the version string
    pub id: String,
    pub version: String,
    /// First entry of `tags`
    pub primary_tag: String,
    /// Tags pointing at `version`, `latest` first then lexical
    pub tags: Vec<String>,
}

impl TaggedVersionRow {
    pub fn new(version: String, tags: Vec<String>) -> Self {
        let primary_tag = tags.first().cloned().unwrap_or_default();
        Self {
            id: format!("version:{}", version),
            version,
            primary_tag,
            tags,
        }
    }
}

/// Snapshot of a package's dist-tags as fetched from a registry
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PackageDistTags {
    pub name: String,
    pub dist_tags: DistTags,
    /// Publish timestamps keyed by version
    pub published: HashMap<String, DateTime<Utc>>,
}

impl PackageDistTags {
    /// Creates a snapshot without publish timestamps
    pub fn new(name: impl Into<String>, dist_tags: DistTags) -> Self {
        Self {
            name: name.into(),
            dist_tags,
            published: HashMap::new(),
        }
    }

    /// Attaches publish timestamps to the snapshot
    pub fn with_published(mut self, published: HashMap<String, DateTime<Utc>>) -> Self {
        self.published = published;
        self
    }

    /// Resolve a dist tag to its version
    pub fn resolve_dist_tag(&self, tag: &str) -> Option<&str> {
        self.dist_tags.get(tag).map(|s| s.as_str())
    }

    /// Returns the publish time of a version, if the registry reported one
    pub fn published_at(&self, version: &str) -> Option<DateTime<Utc>> {
        self.published.get(version).copied()
    }

    pub fn is_empty(&self) -> bool {
        self.dist_tags.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tagged_version_row_uses_first_tag_as_primary() {
        let row = TaggedVersionRow::new(
            "2.0.0".to_string(),
            vec!["latest".to_string(), "stable".to_string()],
        );

        assert_eq!(row.id, "version:2.0.0");
        assert_eq!(row.primary_tag, "latest");
    }

    #[test]
    fn tagged_version_row_serializes_with_camel_case_keys() {
        let row = TaggedVersionRow::new("1.0.0".to_string(), vec!["legacy".to_string()]);

        let json = serde_json::to_value(&row).unwrap();

        assert_eq!(
            json,
            serde_json::json!({
                "id": "version:1.0.0",
                "version": "1.0.0",
                "primaryTag": "legacy",
                "tags": ["legacy"]
            })
        );
    }

    #[test]
    fn resolve_dist_tag_returns_version_for_known_tag() {
        let mut dist_tags = DistTags::new();
        dist_tags.insert("latest".to_string(), "4.17.21".to_string());
        let package = PackageDistTags::new("lodash", dist_tags);

        assert_eq!(package.resolve_dist_tag("latest"), Some("4.17.21"));
        assert_eq!(package.resolve_dist_tag("next"), None);
    }
}
