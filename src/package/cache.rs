use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use rusqlite::{Connection, OptionalExtension, params};
use tracing::{debug, info};

use crate::package::error::CacheError;
use crate::package::repository::PackageRepository;
use crate::package::types::{Package, Release, ReleaseRecord};

const SCHEMA: &str = r#"
    PRAGMA foreign_keys = ON;

    CREATE TABLE IF NOT EXISTS packages (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        name TEXT NOT NULL UNIQUE,
        last_updated INTEGER NOT NULL
    );

    CREATE TABLE IF NOT EXISTS releases (
        id INTEGER PRIMARY KEY AUTOINCREMENT,
        package_id INTEGER NOT NULL,
        version TEXT NOT NULL,
        released_at INTEGER NOT NULL,
        yanked INTEGER NOT NULL DEFAULT 0,
        FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE
    );

    CREATE INDEX IF NOT EXISTS idx_releases_package_id ON releases(package_id);
    CREATE INDEX IF NOT EXISTS idx_releases_released_at ON releases(package_id, released_at);
"#;

/// SQLite-backed cache of packages and their releases
pub struct Cache {
    conn: Connection,
}

impl Cache {
    pub fn new(db_path: &Path) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;
        debug!("Database connection established");

        Self::with_connection(conn)
    }

    /// Cache that lives as long as the process
    pub fn in_memory() -> Result<Self, CacheError> {
        info!("Initializing in-memory cache database");
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self, CacheError> {
        let cache = Self { conn };
        cache.create_schema()?;
        info!("Cache initialized successfully");
        Ok(cache)
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        self.conn
            .execute_batch(SCHEMA)
            .map_err(|e| CacheError::SchemaCreation(e.to_string()))?;

        debug!("Database schema created successfully");
        Ok(())
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, CacheError> {
        let count: i64 = self
            .conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1",
                params![table_name],
                |row| row.get(0),
            )
            .map_err(|e| CacheError::Query(e.to_string()))?;

        Ok(count > 0)
    }
}

impl PackageRepository for Cache {
    fn find_by_name(&self, name: &str) -> Result<Option<Package>, CacheError> {
        find_package(&self.conn, name)
    }

    fn create_package(&mut self, name: &str, now: DateTime<Utc>) -> Result<Package, CacheError> {
        insert_package(&self.conn, name, now)
    }

    fn update_package_timestamp(
        &mut self,
        package: &Package,
        now: DateTime<Utc>,
    ) -> Result<Package, CacheError> {
        touch_package(&self.conn, package, now)
    }

    fn replace_releases(
        &mut self,
        package_id: i64,
        releases: &[ReleaseRecord],
    ) -> Result<(), CacheError> {
        let tx = self.conn.transaction()?;
        swap_releases(&tx, package_id, releases)?;
        tx.commit()?;
        Ok(())
    }

    fn latest_release(&self, package_id: i64) -> Result<Option<Release>, CacheError> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, package_id, version, released_at, yanked
                FROM releases
                WHERE package_id = ?1
                ORDER BY released_at DESC, id ASC
                LIMIT 1
                "#,
                params![package_id],
                |row| {
                    Ok((
                        row.get::<_, i64>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, i64>(3)?,
                        row.get::<_, bool>(4)?,
                    ))
                },
            )
            .optional()
            .map_err(|e| CacheError::Query(e.to_string()))?;

        row.map(|(id, package_id, version, released_at, yanked)| {
            Ok(Release {
                id,
                package_id,
                version,
                released_at: micros_to_naive(released_at)?,
                yanked,
            })
        })
        .transpose()
    }

    fn count_releases(&self, package_id: i64) -> Result<u64, CacheError> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM releases WHERE package_id = ?1",
            package_id,
        )
    }

    fn count_yanked_releases(&self, package_id: i64) -> Result<u64, CacheError> {
        count(
            &self.conn,
            "SELECT COUNT(*) FROM releases WHERE package_id = ?1 AND yanked = 1",
            package_id,
        )
    }

    fn refresh_package(
        &mut self,
        name: &str,
        releases: &[ReleaseRecord],
        now: DateTime<Utc>,
    ) -> Result<Package, CacheError> {
        let tx = self.conn.transaction()?;

        let package = match find_package(&tx, name)? {
            Some(package) => touch_package(&tx, &package, now)?,
            None => insert_package(&tx, name, now)?,
        };
        swap_releases(&tx, package.id, releases)?;

        tx.commit()?;
        debug!(
            "Stored {} releases for {} (package id {})",
            releases.len(),
            name,
            package.id
        );
        Ok(package)
    }
}

fn find_package(conn: &Connection, name: &str) -> Result<Option<Package>, CacheError> {
    let row = conn
        .query_row(
            "SELECT id, name, last_updated FROM packages WHERE name = ?1",
            params![name],
            |row| {
                Ok((
                    row.get::<_, i64>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                ))
            },
        )
        .optional()
        .map_err(|e| CacheError::Query(e.to_string()))?;

    row.map(|(id, name, last_updated)| {
        Ok(Package {
            id,
            name,
            last_updated: millis_to_utc(last_updated)?,
        })
    })
    .transpose()
}

fn insert_package(conn: &Connection, name: &str, now: DateTime<Utc>) -> Result<Package, CacheError> {
    // Stored at millisecond precision, so hand back what a later read would see
    let last_updated = now.timestamp_millis();

    conn.execute(
        "INSERT INTO packages (name, last_updated) VALUES (?1, ?2)",
        params![name, last_updated],
    )
    .map_err(|e| CacheError::Query(e.to_string()))?;

    Ok(Package {
        id: conn.last_insert_rowid(),
        name: name.to_string(),
        last_updated: millis_to_utc(last_updated)?,
    })
}

fn touch_package(
    conn: &Connection,
    package: &Package,
    now: DateTime<Utc>,
) -> Result<Package, CacheError> {
    let last_updated = now.timestamp_millis();

    let updated = conn
        .execute(
            "UPDATE packages SET last_updated = ?1 WHERE id = ?2",
            params![last_updated, package.id],
        )
        .map_err(|e| CacheError::Query(e.to_string()))?;

    if updated == 0 {
        return Err(CacheError::Query(format!(
            "package {} (id {}) no longer exists",
            package.name, package.id
        )));
    }

    Ok(Package {
        last_updated: millis_to_utc(last_updated)?,
        ..package.clone()
    })
}

fn swap_releases(
    conn: &Connection,
    package_id: i64,
    releases: &[ReleaseRecord],
) -> Result<(), CacheError> {
    conn.execute(
        "DELETE FROM releases WHERE package_id = ?1",
        params![package_id],
    )
    .map_err(|e| CacheError::Query(e.to_string()))?;

    let mut stmt = conn
        .prepare(
            "INSERT INTO releases (package_id, version, released_at, yanked) VALUES (?1, ?2, ?3, ?4)",
        )
        .map_err(|e| CacheError::Query(e.to_string()))?;

    for release in releases {
        stmt.execute(params![
            package_id,
            release.version,
            release.uploaded_at.and_utc().timestamp_micros(),
            release.yanked,
        ])
        .map_err(|e| CacheError::Query(e.to_string()))?;
    }

    Ok(())
}

fn count(conn: &Connection, sql: &str, package_id: i64) -> Result<u64, CacheError> {
    let count: i64 = conn
        .query_row(sql, params![package_id], |row| row.get(0))
        .map_err(|e| CacheError::Query(e.to_string()))?;

    u64::try_from(count).map_err(|e| CacheError::Query(e.to_string()))
}

fn millis_to_utc(millis: i64) -> Result<DateTime<Utc>, CacheError> {
    DateTime::from_timestamp_millis(millis)
        .ok_or_else(|| CacheError::Query(format!("timestamp out of range: {millis}")))
}

fn micros_to_naive(micros: i64) -> Result<NaiveDateTime, CacheError> {
    DateTime::from_timestamp_micros(micros)
        .map(|dt| dt.naive_utc())
        .ok_or_else(|| CacheError::Query(format!("timestamp out of range: {micros}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveDate, TimeZone};

    fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(14, 27, 16)
            .unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn pkg_release_2022() -> Vec<ReleaseRecord> {
        vec![
            ReleaseRecord::new("v1.2.10", at(2022, 8, 9), false),
            ReleaseRecord::new("v1.1.1", at(2021, 6, 9), true),
            ReleaseRecord::new("v1.1.0", at(2021, 5, 9), true),
            ReleaseRecord::new("v0.2.0", at(2020, 5, 9), false),
            ReleaseRecord::new("v0.1.0", at(2020, 4, 9), false),
            ReleaseRecord::new("v0.0.4", at(2020, 4, 10), false),
        ]
    }

    #[test]
    fn in_memory_creates_required_tables() {
        let cache = Cache::in_memory().unwrap();

        assert!(cache.table_exists("packages").unwrap());
        assert!(cache.table_exists("releases").unwrap());
        assert!(!cache.table_exists("versions").unwrap());
    }

    #[test]
    fn create_package_is_found_by_name() {
        let mut cache = Cache::in_memory().unwrap();

        let created = cache.create_package("requests", now()).unwrap();
        let found = cache.find_by_name("requests").unwrap();

        assert_eq!(found, Some(created));
        assert_eq!(found.unwrap().last_updated, now());
    }

    #[test]
    fn find_by_name_is_case_sensitive() {
        let mut cache = Cache::in_memory().unwrap();
        cache.create_package("Django", now()).unwrap();

        assert!(cache.find_by_name("django").unwrap().is_none());
    }

    #[test]
    fn create_package_rejects_duplicate_names() {
        let mut cache = Cache::in_memory().unwrap();
        cache.create_package("requests", now()).unwrap();

        let result = cache.create_package("requests", now());

        assert!(matches!(result, Err(CacheError::Query(_))));
    }

    #[test]
    fn update_package_timestamp_moves_last_updated() {
        let mut cache = Cache::in_memory().unwrap();
        let package = cache.create_package("requests", now()).unwrap();
        let later = now() + chrono::TimeDelta::hours(30);

        let updated = cache.update_package_timestamp(&package, later).unwrap();

        assert_eq!(updated.id, package.id);
        assert_eq!(updated.last_updated, later);
        assert_eq!(
            cache.find_by_name("requests").unwrap().unwrap().last_updated,
            later
        );
    }

    #[test]
    fn stats_queries_read_release_set() {
        let mut cache = Cache::in_memory().unwrap();
        let package = cache.create_package("pkg_release_2022", now()).unwrap();
        cache
            .replace_releases(package.id, &pkg_release_2022())
            .unwrap();

        let latest = cache.latest_release(package.id).unwrap().unwrap();

        assert_eq!(latest.version, "v1.2.10");
        assert_eq!(latest.released_at, at(2022, 8, 9));
        assert!(!latest.yanked);
        assert_eq!(cache.count_releases(package.id).unwrap(), 6);
        assert_eq!(cache.count_yanked_releases(package.id).unwrap(), 2);
    }

    #[test]
    fn stats_queries_on_package_without_releases() {
        let mut cache = Cache::in_memory().unwrap();
        let package = cache.create_package("pkg_no_release", now()).unwrap();

        assert!(cache.latest_release(package.id).unwrap().is_none());
        assert_eq!(cache.count_releases(package.id).unwrap(), 0);
        assert_eq!(cache.count_yanked_releases(package.id).unwrap(), 0);
    }

    #[test]
    fn replace_releases_drops_previous_set() {
        let mut cache = Cache::in_memory().unwrap();
        let package = cache.create_package("requests", now()).unwrap();
        cache
            .replace_releases(package.id, &pkg_release_2022())
            .unwrap();

        cache
            .replace_releases(
                package.id,
                &[ReleaseRecord::new("2.0.0", at(2023, 1, 1), false)],
            )
            .unwrap();

        let latest = cache.latest_release(package.id).unwrap().unwrap();
        assert_eq!(latest.version, "2.0.0");
        assert_eq!(cache.count_releases(package.id).unwrap(), 1);
        assert_eq!(cache.count_yanked_releases(package.id).unwrap(), 0);
    }

    #[test]
    fn replace_releases_only_touches_its_package() {
        let mut cache = Cache::in_memory().unwrap();
        let first = cache.create_package("first", now()).unwrap();
        let second = cache.create_package("second", now()).unwrap();
        cache
            .replace_releases(first.id, &pkg_release_2022())
            .unwrap();
        cache
            .replace_releases(second.id, &pkg_release_2022())
            .unwrap();

        cache.replace_releases(first.id, &[]).unwrap();

        assert_eq!(cache.count_releases(first.id).unwrap(), 0);
        assert_eq!(cache.count_releases(second.id).unwrap(), 6);
    }

    #[test]
    fn latest_release_prefers_first_inserted_on_equal_timestamps() {
        let mut cache = Cache::in_memory().unwrap();
        let package = cache.create_package("twins", now()).unwrap();
        cache
            .replace_releases(
                package.id,
                &[
                    ReleaseRecord::new("1.0.0", at(2022, 1, 1), false),
                    ReleaseRecord::new("1.0.0.post1", at(2022, 1, 1), false),
                ],
            )
            .unwrap();

        let latest = cache.latest_release(package.id).unwrap().unwrap();

        assert_eq!(latest.version, "1.0.0");
    }

    #[test]
    fn refresh_package_creates_then_updates_in_place() {
        let mut cache = Cache::in_memory().unwrap();

        let created = cache
            .refresh_package("requests", &pkg_release_2022(), now())
            .unwrap();
        let later = now() + chrono::TimeDelta::days(2);
        let refreshed = cache
            .refresh_package(
                "requests",
                &[ReleaseRecord::new("3.0.0", at(2023, 12, 1), true)],
                later,
            )
            .unwrap();

        assert_eq!(refreshed.id, created.id);
        assert_eq!(refreshed.last_updated, later);
        assert_eq!(cache.count_releases(created.id).unwrap(), 1);
        assert_eq!(cache.count_yanked_releases(created.id).unwrap(), 1);
    }

    #[test]
    fn refresh_package_with_no_releases_keeps_package_row() {
        let mut cache = Cache::in_memory().unwrap();

        let package = cache.refresh_package("ghost", &[], now()).unwrap();

        assert_eq!(cache.find_by_name("ghost").unwrap(), Some(package.clone()));
        assert_eq!(cache.count_releases(package.id).unwrap(), 0);
    }

    #[test]
    fn update_package_timestamp_fails_for_missing_row() {
        let mut cache = Cache::in_memory().unwrap();
        let ghost = Package {
            id: 42,
            name: "ghost".to_string(),
            last_updated: now(),
        };

        let result = cache.update_package_timestamp(&ghost, now());

        assert!(matches!(result, Err(CacheError::Query(_))));
    }
}
