//! Cache-or-refresh resolution of package statistics
//!
//! A package is served from the local cache while its last refresh is younger
//! than the cache TTL. Otherwise (or when forced) its releases are fetched from
//! the index and swapped into the cache before the statistics are computed.
//! A failed fetch is reported as is: stale data never stands in for it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::TimeDelta;
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, info, warn};

use crate::package::cache::Cache;
use crate::package::clock::{Clock, SystemClock};
use crate::package::error::{CacheError, ResolveError};
use crate::package::index::PackageIndex;
use crate::package::repository::PackageRepository;
use crate::package::stats::humanize_release_date;
use crate::package::types::{
    LastRelease, Package, PackageInfo, ReleaseStats, ResolveOptions,
};

type RefreshLocks = Mutex<HashMap<String, Arc<AsyncMutex<()>>>>;

/// Shared handle on the refresh lock of one package name.
///
/// Dropping it, whether the refresh finished, failed or was cancelled, removes
/// the table entry once no other caller holds or awaits the lock.
struct RefreshLockHandle<'a> {
    locks: &'a RefreshLocks,
    name: &'a str,
    lock: Arc<AsyncMutex<()>>,
}

impl<'a> RefreshLockHandle<'a> {
    fn acquire(locks: &'a RefreshLocks, name: &'a str) -> Result<Self, CacheError> {
        let lock = locks
            .lock()
            .map_err(|_| CacheError::Poisoned)?
            .entry(name.to_string())
            .or_default()
            .clone();
        Ok(Self { locks, name, lock })
    }

    fn lock(&self) -> &AsyncMutex<()> {
        &self.lock
    }
}

impl Drop for RefreshLockHandle<'_> {
    fn drop(&mut self) {
        let Ok(mut locks) = self.locks.lock() else {
            return;
        };
        // Handles are only cloned under this guard: the table and this handle
        // account for two references when nobody else is waiting
        if locks
            .get(self.name)
            .is_some_and(|lock| Arc::ptr_eq(lock, &self.lock) && Arc::strong_count(lock) == 2)
        {
            locks.remove(self.name);
        }
    }
}

pub struct Resolver<I, R = Cache> {
    index: I,
    repository: Arc<Mutex<R>>,
    cache_ttl: TimeDelta,
    clock: Arc<dyn Clock>,
    /// One lock per package name being refreshed
    refresh_locks: RefreshLocks,
}

impl<I, R> Resolver<I, R>
where
    I: PackageIndex,
    R: PackageRepository,
{
    pub fn new(index: I, repository: Arc<Mutex<R>>, cache_ttl: TimeDelta) -> Self {
        Self {
            index,
            repository,
            cache_ttl,
            clock: Arc::new(SystemClock),
            refresh_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn cache_ttl(&self) -> TimeDelta {
        self.cache_ttl
    }

    /// Resolves a package and shapes its statistics for the presentation layer
    pub async fn package_info(
        &self,
        name: &str,
        options: ResolveOptions,
    ) -> Result<PackageInfo, ResolveError> {
        let stats = self.resolve(name, options.force_refresh).await?;

        let last_release = if options.human_readable {
            LastRelease::Humanized(humanize_release_date(
                stats.last_release,
                self.clock.now().naive_utc(),
            ))
        } else {
            LastRelease::At(stats.last_release)
        };

        Ok(PackageInfo {
            last_release,
            n_versions: stats.n_versions,
            n_versions_yanked: stats.n_versions_yanked,
        })
    }

    /// Returns the statistics of `name`, refreshing the cache from the index when
    /// it is missing, older than the TTL, or `force_refresh` is set.
    ///
    /// # Errors
    /// * `UpstreamUnavailable` - a refresh was needed and the index could not answer
    /// * `UnknownPackage` - the package has no release
    pub async fn resolve(
        &self,
        name: &str,
        force_refresh: bool,
    ) -> Result<ReleaseStats, ResolveError> {
        if name.trim().is_empty() {
            return Err(ResolveError::UnknownPackage(name.to_string()));
        }

        let cached = self.repository()?.find_by_name(name)?;

        let package = match cached {
            Some(package) if !force_refresh && self.is_fresh(&package) => {
                debug!("Serving {} from cache", name);
                package
            }
            _ => self.refresh(name, force_refresh).await?,
        };

        self.stats_for(&package)
    }

    fn is_fresh(&self, package: &Package) -> bool {
        self.clock.now() - package.last_updated <= self.cache_ttl
    }

    async fn refresh(&self, name: &str, force_refresh: bool) -> Result<Package, ResolveError> {
        let handle = RefreshLockHandle::acquire(&self.refresh_locks, name)?;
        self.refresh_locked(handle.lock(), name, force_refresh).await
    }

    async fn refresh_locked(
        &self,
        lock: &AsyncMutex<()>,
        name: &str,
        force_refresh: bool,
    ) -> Result<Package, ResolveError> {
        let _guard = lock.lock().await;

        if !force_refresh {
            // Someone else may have refreshed it while we were waiting
            let cached = self.repository()?.find_by_name(name)?;
            if let Some(package) = cached.filter(|package| self.is_fresh(package)) {
                debug!("{} was refreshed concurrently", name);
                return Ok(package);
            }
        }

        info!("Fetching releases of {} from the package index", name);
        let releases = self.index.fetch_releases(name).await.map_err(|e| {
            warn!("Failed to refresh {}: {}", name, e);
            ResolveError::UpstreamUnavailable(e)
        })?;

        let now = self.clock.now();
        let package = self.repository()?.refresh_package(name, &releases, now)?;
        debug!("Cached {} releases of {}", releases.len(), name);

        Ok(package)
    }

    fn stats_for(&self, package: &Package) -> Result<ReleaseStats, ResolveError> {
        let repository = self.repository()?;

        let Some(last_release) = repository.latest_release(package.id)? else {
            debug!("{} has no release", package.name);
            return Err(ResolveError::UnknownPackage(package.name.clone()));
        };
        let n_versions = repository.count_releases(package.id)?;
        let n_versions_yanked = repository.count_yanked_releases(package.id)?;

        Ok(ReleaseStats {
            last_release: last_release.released_at,
            n_versions,
            n_versions_yanked,
        })
    }

    fn repository(&self) -> Result<MutexGuard<'_, R>, CacheError> {
        self.repository.lock().map_err(|_| CacheError::Poisoned)
    }

    #[cfg(test)]
    fn pending_refresh_locks(&self) -> usize {
        self.refresh_locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}
