use std::path::Path;
use std::sync::Arc;

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};

use crate::book::DependencyBook;
use crate::error::CacheError;

/// Row-count and timestamp-range occupancy summary for the cache,
/// supplementing the operations spec.md §4.5 names explicitly.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CacheStats {
    pub row_count: i64,
    pub oldest_last_changed: Option<i64>,
    pub newest_last_changed: Option<i64>,
}

/// Durable `(recipe_kind, paramhash) -> DependencyBook` store (spec
/// §4.5). Backed by SQLite via `rusqlite`; every query runs on the
/// blocking thread pool since `rusqlite::Connection` is a synchronous
/// API.
#[derive(Clone)]
pub struct DependencyCache {
    conn: Arc<Mutex<Connection>>,
}

impl DependencyCache {
    /// Create/open the store and its schema (spec §4.5 `open(path)`).
    pub async fn open(path: impl AsRef<Path> + Send + 'static) -> Result<Self, CacheError> {
        let path = path.as_ref().to_owned();
        let conn = tokio::task::spawn_blocking(move || -> Result<Connection, CacheError> {
            let conn = Connection::open(path)?;
            conn.execute_batch(
                "CREATE TABLE IF NOT EXISTS dependency_books (
                    recipe_kind TEXT NOT NULL,
                    paramhash TEXT NOT NULL,
                    host TEXT NOT NULL,
                    dep_book TEXT NOT NULL,
                    ts INTEGER NOT NULL,
                    PRIMARY KEY (recipe_kind, paramhash)
                );",
            )?;
            Ok(conn)
        })
        .await??;
        Ok(DependencyCache {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// In-memory store, handy for tests and for `--dry-run`-style
    /// invocations that should never persist across processes.
    pub fn open_in_memory() -> Result<Self, CacheError> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS dependency_books (
                recipe_kind TEXT NOT NULL,
                paramhash TEXT NOT NULL,
                host TEXT NOT NULL,
                dep_book TEXT NOT NULL,
                ts INTEGER NOT NULL,
                PRIMARY KEY (recipe_kind, paramhash)
            );",
        )?;
        Ok(DependencyCache {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// `inquire(recipe) -> (row_id, book) | None` (spec §4.5).
    pub async fn inquire(&self, recipe_kind: &str, paramhash: &str) -> Result<Option<(i64, DependencyBook)>, CacheError> {
        let conn = self.conn.clone();
        let recipe_kind = recipe_kind.to_owned();
        let paramhash = paramhash.to_owned();
        tokio::task::spawn_blocking(move || -> Result<Option<(i64, DependencyBook)>, CacheError> {
            let conn = conn.lock();
            let row: Option<(i64, String)> = conn
                .query_row(
                    "SELECT rowid, dep_book FROM dependency_books WHERE recipe_kind = ?1 AND paramhash = ?2",
                    params![recipe_kind, paramhash],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )
                .optional()?;
            match row {
                Some((row_id, json)) => Ok(Some((row_id, serde_json::from_str(&json)?))),
                None => Ok(None),
            }
        })
        .await?
    }

    /// `register(recipe, book)` — upsert on the primary key (spec
    /// §4.5).
    pub async fn register(&self, recipe_kind: &str, paramhash: &str, host: &str, book: &DependencyBook, now: i64) -> Result<(), CacheError> {
        let conn = self.conn.clone();
        let recipe_kind = recipe_kind.to_owned();
        let paramhash = paramhash.to_owned();
        let host = host.to_owned();
        let json = serde_json::to_string(book)?;
        tokio::task::spawn_blocking(move || -> Result<(), CacheError> {
            let conn = conn.lock();
            conn.execute(
                "INSERT INTO dependency_books (recipe_kind, paramhash, host, dep_book, ts)
                 VALUES (?1, ?2, ?3, ?4, ?5)
                 ON CONFLICT (recipe_kind, paramhash) DO UPDATE SET
                    host = excluded.host,
                    dep_book = excluded.dep_book,
                    ts = excluded.ts",
                params![recipe_kind, paramhash, host, json, now],
            )?;
            Ok(())
        })
        .await?
    }

    /// `renew(row_id)` — bump timestamp only (spec §4.5).
    pub async fn renew(&self, row_id: i64, now: i64) -> Result<(), CacheError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<(), CacheError> {
            let conn = conn.lock();
            conn.execute("UPDATE dependency_books SET ts = ?1 WHERE rowid = ?2", params![now, row_id])?;
            Ok(())
        })
        .await?
    }

    /// `sweep_old(host, cutoff)` — delete stale rows, reserved for
    /// partial-execution support (spec §4.5).
    pub async fn sweep_old(&self, host: &str, cutoff: i64) -> Result<u64, CacheError> {
        let conn = self.conn.clone();
        let host = host.to_owned();
        tokio::task::spawn_blocking(move || -> Result<u64, CacheError> {
            let conn = conn.lock();
            let deleted = conn.execute(
                "DELETE FROM dependency_books WHERE host = ?1 AND ts < ?2",
                params![host, cutoff],
            )?;
            Ok(deleted as u64)
        })
        .await?
    }

    /// Row count and `last_changed` timestamp range across the whole
    /// cache.
    pub async fn stats(&self) -> Result<CacheStats, CacheError> {
        let conn = self.conn.clone();
        tokio::task::spawn_blocking(move || -> Result<CacheStats, CacheError> {
            let conn = conn.lock();
            let (row_count, oldest, newest): (i64, Option<i64>, Option<i64>) = conn.query_row(
                "SELECT COUNT(*), MIN(ts), MAX(ts) FROM dependency_books",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )?;
            Ok(CacheStats {
                row_count,
                oldest_last_changed: oldest,
                newest_last_changed: newest,
            })
        })
        .await?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn register_then_inquire_round_trips() {
        let cache = DependencyCache::open_in_memory().unwrap();
        let mut book = DependencyBook::new();
        book.last_changed = 42;
        cache.register("install_package", "abc123", "web1", &book, 100).await.unwrap();

        let (row_id, got) = cache.inquire("install_package", "abc123").await.unwrap().unwrap();
        assert_eq!(got.last_changed, 42);
        assert!(row_id > 0);
    }

    #[tokio::test]
    async fn inquire_miss_returns_none() {
        let cache = DependencyCache::open_in_memory().unwrap();
        assert!(cache.inquire("install_package", "nope").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn register_upserts_on_primary_key() {
        let cache = DependencyCache::open_in_memory().unwrap();
        let book_a = DependencyBook::new();
        cache.register("k", "p", "web1", &book_a, 1).await.unwrap();
        let mut book_b = DependencyBook::new();
        book_b.ignored = true;
        cache.register("k", "p", "web1", &book_b, 2).await.unwrap();

        let (_, got) = cache.inquire("k", "p").await.unwrap().unwrap();
        assert!(got.ignored);
        let stats = cache.stats().await.unwrap();
        assert_eq!(stats.row_count, 1);
    }

    #[tokio::test]
    async fn sweep_old_deletes_stale_rows_for_host() {
        let cache = DependencyCache::open_in_memory().unwrap();
        cache.register("k", "p1", "web1", &DependencyBook::new(), 1).await.unwrap();
        cache.register("k", "p2", "web1", &DependencyBook::new(), 100).await.unwrap();
        cache.register("k", "p3", "web2", &DependencyBook::new(), 1).await.unwrap();

        let deleted = cache.sweep_old("web1", 50).await.unwrap();
        assert_eq!(deleted, 1);
        assert!(cache.inquire("k", "p1").await.unwrap().is_none());
        assert!(cache.inquire("k", "p2").await.unwrap().is_some());
        assert!(cache.inquire("k", "p3").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn renew_bumps_timestamp_without_changing_book() {
        let cache = DependencyCache::open_in_memory().unwrap();
        cache.register("k", "p", "web1", &DependencyBook::new(), 1).await.unwrap();
        let (row_id, _) = cache.inquire("k", "p").await.unwrap().unwrap();
        cache.renew(row_id, 999).await.unwrap();

        let deleted = cache.sweep_old("web1", 500).await.unwrap();
        assert_eq!(deleted, 0, "renewed row must survive a cutoff below its new ts");
    }
}
