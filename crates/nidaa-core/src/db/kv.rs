//! Key-value operations over the `kv_store` table.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};

impl Database {
    /// Get the raw value stored under a key.
    pub fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self
            .conn
            .query_row("SELECT value FROM kv_store WHERE key = ?", [key], |row| {
                row.get(0)
            })
            .optional()?)
    }

    /// Insert or replace the value under a key.
    pub fn put_value(&self, key: &str, value: &str) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO kv_store (key, value, updated_at)
            VALUES (?1, ?2, datetime('now'))
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at
            "#,
            params![key, value],
        )?;
        Ok(())
    }

    /// Remove a key. Returns whether it existed.
    pub fn delete_value(&self, key: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?", [key])?;
        Ok(rows_affected > 0)
    }

    /// Get and deserialize a JSON value.
    pub fn get_json<T: serde::de::DeserializeOwned>(&self, key: &str) -> DbResult<Option<T>> {
        self.get_value(key)?
            .map(|raw| serde_json::from_str(&raw).map_err(Into::into))
            .transpose()
    }

    /// Serialize and store a JSON value.
    pub fn put_json<T: serde::Serialize>(&self, key: &str, value: &T) -> DbResult<()> {
        let raw = serde_json::to_string(value)?;
        self.put_value(key, &raw)
    }

    /// SQLite data version; changes when another connection commits.
    pub fn data_version(&self) -> DbResult<i64> {
        Ok(self
            .conn
            .query_row("PRAGMA data_version", [], |row| row.get(0))?)
    }
}
