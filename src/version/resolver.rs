//! Cache-first resolution of dist-tag snapshots

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::config::FETCH_STAGGER_DELAY_MS;
use crate::version::cache::DistTagStore;
use crate::version::error::{RegistryError, ResolveError};
use crate::version::registry::Registry;
use crate::version::types::PackageDistTags;

/// Serves dist-tag snapshots from the cache, falling back to the registry
/// when the cached copy is missing or older than the refresh interval.
pub struct DistTagResolver<S: DistTagStore> {
    store: Arc<S>,
    registry: Arc<dyn Registry>,
}

impl<S: DistTagStore> DistTagResolver<S> {
    pub fn new(store: Arc<S>, registry: Arc<dyn Registry>) -> Self {
        Self { store, registry }
    }

    /// Resolve the dist-tags of one package.
    ///
    /// Handles:
    /// - Fresh cache hits, including remembered not-found packages
    /// - Fetching and saving a new snapshot
    /// - Serving a stale snapshot when the registry is unreachable
    pub async fn resolve(
        &self,
        package_name: &str,
        force_refresh: bool,
    ) -> Result<PackageDistTags, ResolveError> {
        if !force_refresh && self.store.is_fresh(package_name)? {
            if self.store.is_not_found(package_name)? {
                debug!("{} is cached as not found", package_name);
                return Err(RegistryError::NotFound(package_name.to_string()).into());
            }
            if let Some(cached) = self.store.load(package_name)? {
                debug!("Serving {} from cache", package_name);
                return Ok(cached);
            }
        }

        match self.registry.fetch_dist_tags(package_name).await {
            Ok(package) => {
                let _ = self.store.save(&package).inspect_err(|e| {
                    error!("Failed to save dist-tags for {}: {}", package_name, e)
                });
                info!(
                    "Fetched {} dist-tags for {}",
                    package.dist_tags.len(),
                    package_name
                );
                Ok(package)
            }
            Err(RegistryError::NotFound(name)) => {
                info!(
                    "Package not found: {}. Marking as not found to skip future fetches.",
                    name
                );
                let _ = self.store.mark_not_found(package_name).inspect_err(|e| {
                    error!("Failed to mark {} as not found: {}", package_name, e)
                });
                Err(RegistryError::NotFound(name).into())
            }
            Err(e) => {
                warn!("Failed to fetch {}: {}", package_name, e);
                match self.store.load(package_name) {
                    Ok(Some(stale)) => {
                        warn!("Serving stale cached dist-tags for {}", package_name);
                        Ok(stale)
                    }
                    Ok(None) => Err(e.into()),
                    Err(cache_err) => {
                        error!(
                            "Failed to load stale dist-tags for {}: {}",
                            package_name, cache_err
                        );
                        Err(e.into())
                    }
                }
            }
        }
    }

    /// Resolve several packages concurrently, returning results in input order.
    ///
    /// Fetches start staggered to avoid rate limiting.
    pub async fn resolve_all(
        &self,
        package_names: &[String],
        force_refresh: bool,
    ) -> Vec<(String, Result<PackageDistTags, ResolveError>)> {
        let futures = package_names.iter().enumerate().map(|(i, name)| {
            let delay = Duration::from_millis(FETCH_STAGGER_DELAY_MS * i as u64);
            async move {
                sleep(delay).await;
                (name.clone(), self.resolve(name, force_refresh).await)
            }
        });

        join_all(futures).await
    }
}
