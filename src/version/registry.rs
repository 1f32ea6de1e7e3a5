//! Registry trait for fetching dist-tags from various sources

#[cfg(test)]
use mockall::automock;

use crate::version::error::RegistryError;
use crate::version::types::PackageDistTags;

/// Trait for fetching dist-tag snapshots from a registry
#[cfg_attr(test, automock)]
#[async_trait::async_trait]
pub trait Registry: Send + Sync {
    /// Fetches the current dist-tags for a package
    ///
    /// # Arguments
    /// * `package_name` - The name of the package (e.g., "@types/node")
    ///
    /// # Returns
    /// * `Ok(PackageDistTags)` - Tags in registry order plus known publish times
    /// * `Err(RegistryError)` - If the fetch fails
    async fn fetch_dist_tags(&self, package_name: &str)
    -> Result<PackageDistTags, RegistryError>;
}
