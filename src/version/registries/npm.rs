//! npm registry API implementation

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::version::error::RegistryError;
use crate::version::registry::Registry;
use crate::version::types::{DistTags, PackageDistTags};

/// Keys in the `time` object that are not versions
const NON_VERSION_TIME_KEYS: &[&str] = &["created", "modified"];

/// Response from npm registry API
#[derive(Debug, Deserialize)]
struct NpmPackageResponse {
    #[serde(rename = "dist-tags", default)]
    dist_tags: DistTags,
    /// Version publish timestamps (version -> ISO 8601 timestamp)
    #[serde(default)]
    time: HashMap<String, String>,
}

/// Registry implementation for npm registry API
pub struct NpmRegistry {
    client: reqwest::Client,
    base_url: String,
}

impl NpmRegistry {
    /// Creates a new NpmRegistry against `base_url` with a per-request timeout
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, RegistryError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("dist-tags/", env!("CARGO_PKG_VERSION")))
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Encode package name for URL (handles scoped packages)
    fn encode_package_name(package_name: &str) -> String {
        if package_name.starts_with('@') {
            // Scoped package: @scope/name -> @scope%2Fname
            package_name.replace('/', "%2F")
        } else {
            package_name.to_string()
        }
    }

    fn retry_after_secs(response: &reqwest::Response) -> Option<u64> {
        response
            .headers()
            .get(reqwest::header::RETRY_AFTER)?
            .to_str()
            .ok()?
            .trim()
            .parse()
            .ok()
    }
}

fn parse_publish_times(time: HashMap<String, String>) -> HashMap<String, DateTime<Utc>> {
    time.into_iter()
        .filter(|(key, _)| !NON_VERSION_TIME_KEYS.contains(&key.as_str()))
        .filter_map(|(version, ts)| {
            DateTime::parse_from_rfc3339(&ts)
                .inspect_err(|e| debug!("Skipping publish time for {}: {}", version, e))
                .ok()
                .map(|dt| (version, dt.with_timezone(&Utc)))
        })
        .collect()
}

#[async_trait::async_trait]
impl Registry for NpmRegistry {
    async fn fetch_dist_tags(
        &self,
        package_name: &str,
    ) -> Result<PackageDistTags, RegistryError> {
        let encoded_name = Self::encode_package_name(package_name);
        let url = format!("{}/{}", self.base_url, encoded_name);

        let response = self.client.get(&url).send().await?;

        let status = response.status();

        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(RegistryError::NotFound(package_name.to_string()));
        }

        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            let retry_after_secs = Self::retry_after_secs(&response);
            warn!("npm registry rate limited request: {}", url);
            return Err(RegistryError::RateLimited { retry_after_secs });
        }

        if !status.is_success() {
            warn!("npm registry returned status {}: {}", status, url);
            return Err(RegistryError::InvalidResponse(format!(
                "Unexpected status: {}",
                status
            )));
        }

        let package_info: NpmPackageResponse = response.json().await.map_err(|e| {
            warn!("Failed to parse npm registry response: {}", e);
            RegistryError::InvalidResponse(e.to_string())
        })?;

        debug!(
            "Fetched {} dist-tags for {}",
            package_info.dist_tags.len(),
            package_name
        );

        Ok(PackageDistTags::new(package_name, package_info.dist_tags)
            .with_published(parse_publish_times(package_info.time)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Server;

    fn registry(url: &str) -> NpmRegistry {
        NpmRegistry::new(url, Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn fetch_dist_tags_preserves_registry_order() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/react")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "name": "react",
                    "dist-tags": {
                        "latest": "18.3.1",
                        "next": "19.0.0-rc-1",
                        "canary": "19.0.0-canary-2",
                        "beta": "19.0.0-beta-3"
                    },
                    "versions": {}
                }"#,
            )
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_dist_tags("react")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "react");
        assert_eq!(
            result.dist_tags.keys().collect::<Vec<_>>(),
            vec!["latest", "next", "canary", "beta"]
        );
        assert_eq!(result.resolve_dist_tag("latest"), Some("18.3.1"));
    }

    #[tokio::test]
    async fn fetch_dist_tags_reads_publish_times() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/lodash")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{
                    "dist-tags": { "latest": "4.17.21" },
                    "time": {
                        "created": "2012-04-23T16:37:11.912Z",
                        "modified": "2024-01-01T00:00:00.000Z",
                        "4.17.21": "2021-02-20T15:42:16.891Z",
                        "4.17.20": "not a timestamp"
                    }
                }"#,
            )
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_dist_tags("lodash")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.published.len(), 1);
        assert_eq!(
            result.published_at("4.17.21").map(|dt| dt.to_rfc3339()),
            Some("2021-02-20T15:42:16.891+00:00".to_string())
        );
    }

    #[tokio::test]
    async fn fetch_dist_tags_returns_not_found_for_nonexistent_package() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/nonexistent-package")
            .with_status(404)
            .with_header("content-type", "application/json")
            .with_body(r#"{"error": "Not found"}"#)
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_dist_tags("nonexistent-package")
            .await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::NotFound(_))));
    }

    #[tokio::test]
    async fn fetch_dist_tags_reports_rate_limit_with_retry_after() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/busy")
            .with_status(429)
            .with_header("retry-after", "30")
            .create_async()
            .await;

        let result = registry(&server.url()).fetch_dist_tags("busy").await;

        mock.assert_async().await;
        assert!(matches!(
            result,
            Err(RegistryError::RateLimited {
                retry_after_secs: Some(30)
            })
        ));
    }

    #[tokio::test]
    async fn fetch_dist_tags_handles_scoped_package() {
        let mut server = Server::new_async().await;

        // Scoped packages use URL encoding: @types/node -> @types%2Fnode
        let mock = server
            .mock("GET", "/@types%2Fnode")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"dist-tags": {"latest": "20.0.0", "ts5.0": "20.0.0"}}"#)
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_dist_tags("@types/node")
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(result.name, "@types/node");
        assert_eq!(result.dist_tags.len(), 2);
    }

    #[tokio::test]
    async fn fetch_dist_tags_returns_invalid_response_for_malformed_body() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/broken")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let result = registry(&server.url()).fetch_dist_tags("broken").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fetch_dist_tags_returns_invalid_response_for_server_error() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/flaky")
            .with_status(503)
            .create_async()
            .await;

        let result = registry(&server.url()).fetch_dist_tags("flaky").await;

        mock.assert_async().await;
        assert!(matches!(result, Err(RegistryError::InvalidResponse(_))));
    }

    #[tokio::test]
    async fn fetch_dist_tags_returns_empty_for_package_without_tags() {
        let mut server = Server::new_async().await;

        let mock = server
            .mock("GET", "/unpublished")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"name": "unpublished"}"#)
            .create_async()
            .await;

        let result = registry(&server.url())
            .fetch_dist_tags("unpublished")
            .await
            .unwrap();

        mock.assert_async().await;
        assert!(result.is_empty());
    }
}
