//! Index trait for fetching release data of a package

use async_trait::async_trait;

use crate::package::error::IndexError;
use crate::package::types::ReleaseRecord;

/// Trait for fetching the releases of a package from a remote index
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PackageIndex: Send + Sync {
    /// Fetches every release of a package from the index
    ///
    /// # Arguments
    /// * `package_name` - The name of the package, matched case-sensitively
    ///
    /// # Returns
    /// * `Ok(releases)` - One record per version, in the order the index lists them.
    ///   Empty when the index does not know the package.
    /// * `Err(IndexError)` - If the index could not be queried or answered unexpectedly
    async fn fetch_releases(&self, package_name: &str) -> Result<Vec<ReleaseRecord>, IndexError>;
}
