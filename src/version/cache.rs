use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Utc};
#[cfg(test)]
use mockall::automock;
use rusqlite::{Connection, OptionalExtension};
use tracing::{debug, info};

use crate::version::error::CacheError;
use crate::version::types::{DistTags, PackageDistTags};

/// Trait for storing and retrieving dist-tag snapshots
#[cfg_attr(test, automock)]
pub trait DistTagStore: Send + Sync + 'static {
    /// Load the cached snapshot for a package.
    ///
    /// Returns `None` for packages never cached or marked as not found.
    fn load(&self, package_name: &str) -> Result<Option<PackageDistTags>, CacheError>;

    /// Replace the cached snapshot for a package
    fn save(&self, package: &PackageDistTags) -> Result<(), CacheError>;

    /// Whether the package was written within the refresh interval
    fn is_fresh(&self, package_name: &str) -> Result<bool, CacheError>;

    /// Remember that the registry does not know this package
    fn mark_not_found(&self, package_name: &str) -> Result<(), CacheError>;

    fn is_not_found(&self, package_name: &str) -> Result<bool, CacheError>;

    /// Remove every cached package, returning how many were dropped
    fn clear(&self) -> Result<usize, CacheError>;
}

pub struct Cache {
    conn: Mutex<Connection>,
    refresh_interval: i64,
}

impl Cache {
    pub fn new(db_path: &Path, refresh_interval: i64) -> Result<Self, CacheError> {
        info!("Initializing cache database at {:?}", db_path);

        let conn = Connection::open(db_path)?;

        // Enable WAL mode for better concurrency
        conn.pragma_update(None, "journal_mode", "WAL")?;
        conn.pragma_update(None, "synchronous", "NORMAL")?;

        debug!("Database connection established");

        let cache = Self {
            conn: Mutex::new(conn),
            refresh_interval,
        };

        cache.create_schema()?;
        info!("Cache initialized successfully");

        Ok(cache)
    }

    /// Acquire database connection lock with proper error handling
    fn lock_conn(&self) -> Result<MutexGuard<'_, Connection>, CacheError> {
        self.conn.lock().map_err(|_| CacheError::LockPoisoned)
    }

    fn current_timestamp_ms() -> i64 {
        Utc::now().timestamp_millis()
    }

    fn create_schema(&self) -> Result<(), CacheError> {
        debug!("Creating database schema");

        let conn = self.lock_conn()?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS packages (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_name TEXT NOT NULL UNIQUE,
                updated_at INTEGER NOT NULL,
                not_found INTEGER NOT NULL DEFAULT 0
            )
            "#,
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS dist_tags (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                package_id INTEGER NOT NULL,
                tag_name TEXT NOT NULL,
                version TEXT NOT NULL,
                position INTEGER NOT NULL,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
                UNIQUE(package_id, tag_name)
            )
            "#,
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_dist_tags_package_id ON dist_tags(package_id)",
            [],
        )?;

        conn.execute(
            r#"
            CREATE TABLE IF NOT EXISTS publish_times (
                package_id INTEGER NOT NULL,
                version TEXT NOT NULL,
                published_at INTEGER NOT NULL,
                FOREIGN KEY (package_id) REFERENCES packages(id) ON DELETE CASCADE,
                PRIMARY KEY (package_id, version)
            )
            "#,
            [],
        )?;

        debug!("Database schema created successfully");
        Ok(())
    }

    fn package_id(conn: &Connection, package_name: &str) -> Result<Option<i64>, CacheError> {
        let id = conn
            .query_row(
                "SELECT id FROM packages WHERE package_name = ?1 AND not_found = 0",
                [package_name],
                |row| row.get(0),
            )
            .optional()?;
        Ok(id)
    }
}

impl DistTagStore for Cache {
    fn load(&self, package_name: &str) -> Result<Option<PackageDistTags>, CacheError> {
        let conn = self.lock_conn()?;

        let Some(package_id) = Self::package_id(&conn, package_name)? else {
            return Ok(None);
        };

        let mut stmt = conn.prepare(
            "SELECT tag_name, version FROM dist_tags WHERE package_id = ?1 ORDER BY position",
        )?;
        let dist_tags = stmt
            .query_map([package_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
            })?
            .collect::<Result<DistTags, _>>()?;

        let mut stmt =
            conn.prepare("SELECT version, published_at FROM publish_times WHERE package_id = ?1")?;
        let published: HashMap<String, DateTime<Utc>> = stmt
            .query_map([package_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?
            .into_iter()
            .filter_map(|(version, ms)| DateTime::from_timestamp_millis(ms).map(|dt| (version, dt)))
            .collect();

        debug!(
            "Loaded {} dist-tags for {} from cache",
            dist_tags.len(),
            package_name
        );

        Ok(Some(
            PackageDistTags::new(package_name, dist_tags).with_published(published),
        ))
    }

    fn save(&self, package: &PackageDistTags) -> Result<(), CacheError> {
        debug!(
            "Saving {} dist-tags for {}",
            package.dist_tags.len(),
            package.name
        );

        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO packages (package_name, updated_at, not_found)
            VALUES (?1, ?2, 0)
            ON CONFLICT(package_name) DO UPDATE SET
                updated_at = excluded.updated_at,
                not_found = 0
            "#,
            (&package.name, now),
        )?;

        let package_id: i64 = tx.query_row(
            "SELECT id FROM packages WHERE package_name = ?1",
            [&package.name],
            |row| row.get(0),
        )?;

        // Replace the previous snapshot wholesale
        tx.execute("DELETE FROM dist_tags WHERE package_id = ?1", [package_id])?;
        tx.execute(
            "DELETE FROM publish_times WHERE package_id = ?1",
            [package_id],
        )?;

        {
            let mut stmt = tx.prepare(
                "INSERT INTO dist_tags (package_id, tag_name, version, position) VALUES (?1, ?2, ?3, ?4)",
            )?;
            for (position, (tag_name, version)) in package.dist_tags.iter().enumerate() {
                stmt.execute((package_id, tag_name, version, position as i64))?;
            }

            let mut stmt = tx.prepare(
                "INSERT INTO publish_times (package_id, version, published_at) VALUES (?1, ?2, ?3)",
            )?;
            for (version, published_at) in &package.published {
                stmt.execute((package_id, version, published_at.timestamp_millis()))?;
            }
        }

        tx.commit()?;

        debug!("Successfully saved dist-tags for {}", package.name);
        Ok(())
    }

    fn is_fresh(&self, package_name: &str) -> Result<bool, CacheError> {
        let threshold = Self::current_timestamp_ms() - self.refresh_interval;

        let conn = self.lock_conn()?;
        let updated_at: Option<i64> = conn
            .query_row(
                "SELECT updated_at FROM packages WHERE package_name = ?1",
                [package_name],
                |row| row.get(0),
            )
            .optional()?;

        Ok(updated_at.is_some_and(|updated_at| updated_at > threshold))
    }

    fn mark_not_found(&self, package_name: &str) -> Result<(), CacheError> {
        let now = Self::current_timestamp_ms();

        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute(
            r#"
            INSERT INTO packages (package_name, updated_at, not_found)
            VALUES (?1, ?2, 1)
            ON CONFLICT(package_name) DO UPDATE SET
                updated_at = excluded.updated_at,
                not_found = 1
            "#,
            (package_name, now),
        )?;
        tx.execute(
            "DELETE FROM dist_tags WHERE package_id IN (SELECT id FROM packages WHERE package_name = ?1)",
            [package_name],
        )?;
        tx.execute(
            "DELETE FROM publish_times WHERE package_id IN (SELECT id FROM packages WHERE package_name = ?1)",
            [package_name],
        )?;

        tx.commit()?;
        Ok(())
    }

    fn is_not_found(&self, package_name: &str) -> Result<bool, CacheError> {
        let conn = self.lock_conn()?;
        let not_found: bool = conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM packages WHERE package_name = ?1 AND not_found = 1)",
            [package_name],
            |row| row.get(0),
        )?;

        Ok(not_found)
    }

    fn clear(&self) -> Result<usize, CacheError> {
        let mut conn = self.lock_conn()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM dist_tags", [])?;
        tx.execute("DELETE FROM publish_times", [])?;
        let removed = tx.execute("DELETE FROM packages", [])?;

        tx.commit()?;
        info!("Cleared {} cached packages", removed);
        Ok(removed)
    }
}
