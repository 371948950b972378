use anyhow::Context;
use rusqlite::{Connection, OptionalExtension};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::Path;

pub const KEY_CLASSES: &str = "classes";
pub const KEY_TEACHER_NAME: &str = "teacherName";
pub const KEY_NOTICES: &str = "notices";
pub const KEY_HOMEWORK: &str = "homework";

pub const DB_FILE: &str = "classroom.sqlite3";

/// Key-value persistence collaborator. Values are serialized JSON snapshots.
pub trait KvStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn set(&mut self, key: &str, blob: &str) -> anyhow::Result<()>;
    fn remove(&mut self, key: &str) -> anyhow::Result<()>;

    fn describe(&self) -> String;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KvStore for MemoryStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, blob: &str) -> anyhow::Result<()> {
        self.entries.insert(key.to_string(), blob.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.entries.remove(key);
        Ok(())
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

pub struct SqliteStore {
    conn: Connection,
    path: std::path::PathBuf,
}

impl SqliteStore {
    pub fn open(workspace: &Path) -> anyhow::Result<Self> {
        std::fs::create_dir_all(workspace).with_context(|| {
            format!("failed to create workspace {}", workspace.to_string_lossy())
        })?;
        let path = workspace.join(DB_FILE);
        let conn = Connection::open(&path)
            .with_context(|| format!("failed to open {}", path.to_string_lossy()))?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS kv(
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL,
                updated_at TEXT
            )",
            [],
        )?;

        Ok(Self { conn, path })
    }
}

impl KvStore for SqliteStore {
    fn get(&self, key: &str) -> anyhow::Result<Option<String>> {
        let v = self
            .conn
            .query_row("SELECT value FROM kv WHERE key = ?", [key], |r| r.get(0))
            .optional()?;
        Ok(v)
    }

    fn set(&mut self, key: &str, blob: &str) -> anyhow::Result<()> {
        let now = chrono::Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO kv(key, value, updated_at) VALUES(?, ?, ?)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value, updated_at = excluded.updated_at",
            (key, blob, &now),
        )?;
        Ok(())
    }

    fn remove(&mut self, key: &str) -> anyhow::Result<()> {
        self.conn.execute("DELETE FROM kv WHERE key = ?", [key])?;
        Ok(())
    }

    fn describe(&self) -> String {
        self.path.to_string_lossy().to_string()
    }
}

/// Loads a JSON blob, substituting the default for absent, unreadable or malformed data.
pub fn load_or_default<T>(store: &dyn KvStore, key: &str) -> T
where
    T: DeserializeOwned + Default,
{
    let blob = match store.get(key) {
        Ok(Some(b)) => b,
        Ok(None) => return T::default(),
        Err(e) => {
            tracing::warn!(key, error = %e, "failed to read stored blob, using empty default");
            return T::default();
        }
    };
    match serde_json::from_str::<T>(&blob) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(key, error = %e, "stored blob is malformed, using empty default");
            T::default()
        }
    }
}

pub fn save_json<T: Serialize + ?Sized>(
    store: &mut dyn KvStore,
    key: &str,
    value: &T,
) -> anyhow::Result<()> {
    let blob = serde_json::to_string(value).with_context(|| format!("failed to serialize {key}"))?;
    store
        .set(key, &blob)
        .with_context(|| format!("failed to write {key}"))
}
