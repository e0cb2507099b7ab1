use super::{normalize_library, LibraryStore, StoreError};
use crate::types::{BookRecord, Library};
use log::{debug, warn};
use rusqlite::{params, Connection};
use std::path::{Path, PathBuf};

/// SQLite 存储
///
/// 每本书一行，segments 以 JSON 数组存放。`save` 在一个事务里替换整张表
pub struct SqliteStore {
    path: PathBuf,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    fn open(&self) -> Result<Connection, StoreError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        Ok(init_db(&self.path)?)
    }
}

pub fn init_db<P: AsRef<Path>>(path: P) -> rusqlite::Result<Connection> {
    let conn = Connection::open(path)?;

    conn.execute("PRAGMA encoding = 'UTF-8'", [])?;

    conn.execute(
        "CREATE TABLE IF NOT EXISTS books (
            title TEXT PRIMARY KEY,
            segments TEXT NOT NULL,
            current_index INTEGER NOT NULL DEFAULT 0,
            total_segments INTEGER NOT NULL
        )",
        [],
    )?;

    Ok(conn)
}

impl LibraryStore for SqliteStore {
    fn load(&self) -> Result<Library, StoreError> {
        if !self.path.exists() {
            debug!("{} does not exist, starting with an empty library", self.path.display());
            return Ok(Library::new());
        }

        let conn = self.open()?;
        let mut stmt =
            conn.prepare("SELECT title, segments, current_index, total_segments FROM books")?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, i64>(2)?,
                row.get::<_, i64>(3)?,
            ))
        })?;

        let mut library = Library::new();
        for row in rows {
            let (title, segments_json, current_index, total_segments) = row?;
            let segments: Vec<String> = serde_json::from_str(&segments_json)?;
            library.insert(
                title,
                BookRecord {
                    segments,
                    current_index: current_index.max(0) as usize,
                    total_segments: total_segments.max(0) as usize,
                },
            );
        }

        for title in normalize_library(&mut library) {
            warn!("book '{}' had an inconsistent cursor and was normalized", title);
        }

        debug!("loaded {} books from {}", library.len(), self.path.display());
        Ok(library)
    }

    fn save(&self, library: &Library) -> Result<(), StoreError> {
        let mut conn = self.open()?;
        let tx = conn.transaction()?;

        tx.execute("DELETE FROM books", [])?;
        for (title, record) in library {
            let segments_json = serde_json::to_string(&record.segments)?;
            tx.execute(
                "INSERT INTO books (title, segments, current_index, total_segments) VALUES (?1, ?2, ?3, ?4)",
                params![
                    title,
                    segments_json,
                    record.current_index as i64,
                    record.total_segments as i64
                ],
            )?;
        }

        tx.commit()?;
        debug!("saved {} books to {}", library.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("sqlite:{}", self.path.display())
    }
}
