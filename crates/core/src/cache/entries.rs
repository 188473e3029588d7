//! Cache generation and entry operations.
//!
//! A generation is a named namespace of stored responses. Entries are
//! keyed by request identity within a generation; lookup can be scoped
//! to one generation or search every generation in creation order.

use super::connection::CacheStore;
use crate::Error;
use serde::{Deserialize, Serialize};
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite;

/// A stored response, keyed by request identity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheEntry {
    pub key: String,
    pub method: String,
    pub url: String,
    pub status: u16,
    /// Response headers as a JSON object of string values.
    pub headers_json: Option<String>,
    pub body: Vec<u8>,
    pub stored_at: String,
}

impl CacheEntry {
    /// Build an entry for a response, computing its key and timestamp.
    pub fn new(method: &str, url: &str, status: u16, headers_json: Option<String>, body: Vec<u8>) -> Self {
        Self {
            key: super::hash::cache_key(method, url),
            method: method.to_ascii_uppercase(),
            url: url.to_string(),
            status,
            headers_json,
            body,
            stored_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Read one stored header value by (lowercase) name.
    pub fn header(&self, name: &str) -> Option<String> {
        let headers: serde_json::Value = serde_json::from_str(self.headers_json.as_deref()?).ok()?;
        headers.get(name).and_then(|v| v.as_str()).map(|s| s.to_string())
    }
}

fn entry_from_row(row: &rusqlite::Row<'_>) -> Result<CacheEntry, rusqlite::Error> {
    Ok(CacheEntry {
        key: row.get(0)?,
        method: row.get(1)?,
        url: row.get(2)?,
        status: row.get::<_, i64>(3)? as u16,
        headers_json: row.get(4)?,
        body: row.get(5)?,
        stored_at: row.get(6)?,
    })
}

impl CacheStore {
    /// Ensure a generation with this name exists.
    ///
    /// Creating an existing generation is a no-op, so install can reuse
    /// a previously populated generation.
    pub async fn create_cache(&self, name: &str) -> Result<(), Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT OR IGNORE INTO caches (name, created_at) VALUES (?1, ?2)",
                    params![name, chrono::Utc::now().to_rfc3339()],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Enumerate generation names in creation order.
    pub async fn cache_names(&self) -> Result<Vec<String>, Error> {
        self.conn
            .call(|conn| -> Result<Vec<String>, Error> {
                let mut stmt = conn.prepare("SELECT name FROM caches ORDER BY rowid")?;
                let names = stmt
                    .query_map([], |row| row.get(0))?
                    .collect::<Result<Vec<String>, _>>()?;
                Ok(names)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete a generation and every entry stored in it.
    ///
    /// Returns whether the generation existed.
    pub async fn delete_cache(&self, name: &str) -> Result<bool, Error> {
        let name = name.to_string();
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let deleted = conn.execute("DELETE FROM caches WHERE name = ?1", params![name])?;
                Ok(deleted > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Insert or replace an entry in a generation.
    ///
    /// Uses UPSERT semantics keyed by (generation, key): two concurrent
    /// stores of the same resource resolve to the later write.
    pub async fn put_entry(&self, cache_name: &str, entry: &CacheEntry) -> Result<(), Error> {
        let cache_name = cache_name.to_string();
        let entry = entry.clone();
        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO entries (cache_name, key, method, url, status, headers_json, body, stored_at)
                     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
                     ON CONFLICT(cache_name, key) DO UPDATE SET
                        method = excluded.method,
                        url = excluded.url,
                        status = excluded.status,
                        headers_json = excluded.headers_json,
                        body = excluded.body,
                        stored_at = excluded.stored_at",
                    params![
                        cache_name,
                        entry.key,
                        entry.method,
                        entry.url,
                        entry.status as i64,
                        entry.headers_json,
                        entry.body,
                        entry.stored_at,
                    ],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry by key across every generation.
    ///
    /// Generations are searched in creation order and the first match
    /// wins, so an entry cached in an older generation is still served
    /// until that generation is deleted.
    pub async fn match_entry(&self, key: &str) -> Result<Option<CacheEntry>, Error> {
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT e.key, e.method, e.url, e.status, e.headers_json, e.body, e.stored_at
                     FROM entries e
                     JOIN caches c ON c.name = e.cache_name
                     WHERE e.key = ?1
                     ORDER BY c.rowid
                     LIMIT 1",
                )?;
                let result = stmt.query_row(params![key], entry_from_row);

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Look up an entry by key within a single generation.
    pub async fn match_entry_in(&self, cache_name: &str, key: &str) -> Result<Option<CacheEntry>, Error> {
        let cache_name = cache_name.to_string();
        let key = key.to_string();
        self.conn
            .call(move |conn| -> Result<Option<CacheEntry>, Error> {
                let mut stmt = conn.prepare(
                    "SELECT key, method, url, status, headers_json, body, stored_at
                     FROM entries WHERE cache_name = ?1 AND key = ?2",
                )?;
                let result = stmt.query_row(params![cache_name, key], entry_from_row);

                match result {
                    Ok(entry) => Ok(Some(entry)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)
    }

    /// Number of entries stored in a generation.
    pub async fn count_entries(&self, cache_name: &str) -> Result<u64, Error> {
        let cache_name = cache_name.to_string();
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM entries WHERE cache_name = ?1",
                    params![cache_name],
                    |row| row.get(0),
                )?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }
}
