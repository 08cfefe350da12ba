//! Repository trait over cached packages and their releases

use chrono::{DateTime, Utc};

use crate::package::error::CacheError;
use crate::package::types::{Package, Release, ReleaseRecord};

/// Storage the resolver reads and refreshes
pub trait PackageRepository {
    fn find_by_name(&self, name: &str) -> Result<Option<Package>, CacheError>;

    /// Creates a package whose `last_updated` is `now`
    fn create_package(&mut self, name: &str, now: DateTime<Utc>) -> Result<Package, CacheError>;

    /// Sets `last_updated` of an existing package to `now`
    fn update_package_timestamp(
        &mut self,
        package: &Package,
        now: DateTime<Utc>,
    ) -> Result<Package, CacheError>;

    /// Deletes every release of the package, then inserts `releases`, atomically
    fn replace_releases(
        &mut self,
        package_id: i64,
        releases: &[ReleaseRecord],
    ) -> Result<(), CacheError>;

    /// Release with the greatest timestamp
    fn latest_release(&self, package_id: i64) -> Result<Option<Release>, CacheError>;

    fn count_releases(&self, package_id: i64) -> Result<u64, CacheError>;

    fn count_yanked_releases(&self, package_id: i64) -> Result<u64, CacheError>;

    /// Stores a fresh fetch: creates or touches the package, then replaces its releases.
    ///
    /// Implementations backed by a transactional store should override this so the
    /// timestamp bump and the release swap commit together.
    fn refresh_package(
        &mut self,
        name: &str,
        releases: &[ReleaseRecord],
        now: DateTime<Utc>,
    ) -> Result<Package, CacheError> {
        let package = match self.find_by_name(name)? {
            Some(package) => self.update_package_timestamp(&package, now)?,
            None => self.create_package(name, now)?,
        };
        self.replace_releases(package.id, releases)?;
        Ok(package)
    }
}
