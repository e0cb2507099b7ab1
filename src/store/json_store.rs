use super::{normalize_library, LibraryStore, StoreError};
use crate::types::Library;
use log::{debug, warn};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// JSON 文件存储
///
/// 顶层对象的键是书名，值是 `{segments, current_index, total_segments}`
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl LibraryStore for JsonFileStore {
    fn load(&self) -> Result<Library, StoreError> {
        if !self.path.exists() {
            debug!("{} does not exist, starting with an empty library", self.path.display());
            return Ok(Library::new());
        }

        let content = fs::read_to_string(&self.path)?;
        let mut library: Library = serde_json::from_str(&content)?;

        for title in normalize_library(&mut library) {
            warn!("book '{}' had an inconsistent cursor and was normalized", title);
        }

        debug!("loaded {} books from {}", library.len(), self.path.display());
        Ok(library)
    }

    fn save(&self, library: &Library) -> Result<(), StoreError> {
        // 写临时文件再改名，避免写到一半留下损坏的文件
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&dir)?;

        let json = serde_json::to_string_pretty(library)?;
        let mut tmp = NamedTempFile::new_in(&dir)?;
        tmp.write_all(json.as_bytes())?;
        tmp.flush()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("saved {} books to {}", library.len(), self.path.display());
        Ok(())
    }

    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::BookRecord;
    use tempfile::TempDir;

    fn store_in(dir: &TempDir) -> JsonFileStore {
        JsonFileStore::new(dir.path().join("books_data.json"))
    }

    #[test]
    fn test_missing_file_is_empty_library() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let library = store.load().unwrap();
        assert!(library.is_empty());
    }

    #[test]
    fn test_save_then_load() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut library = Library::new();
        let mut record = BookRecord::new(vec!["one".to_string(), "two".to_string()]);
        record.current_index = 1;
        library.insert("Dune".to_string(), record.clone());

        store.save(&library).unwrap();
        let loaded = store.load().unwrap();

        assert_eq!(loaded.len(), 1);
        assert_eq!(loaded["Dune"], record);
    }

    #[test]
    fn test_saved_file_is_pretty_and_keeps_non_ascii() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);

        let mut library = Library::new();
        library.insert(
            "一只特立独行的猪".to_string(),
            BookRecord::new(vec!["第一章 开始".to_string()]),
        );
        store.save(&library).unwrap();

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("一只特立独行的猪"));
        assert!(raw.contains("第一章 开始"));
        assert!(raw.contains("\n  \""));
        assert!(raw.contains("\"current_index\": 0"));
    }

    #[test]
    fn test_malformed_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(store.path(), "{ not json").unwrap();

        let result = store.load();
        assert!(matches!(result, Err(StoreError::Json(_))));
    }

    #[test]
    fn test_reads_file_written_by_hand() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        fs::write(
            store.path(),
            r#"{
  "Moby Dick": {
    "segments": ["Call me Ishmael.", "Some years ago"],
    "current_index": 1,
    "total_segments": 2
  }
}"#,
        )
        .unwrap();

        let library = store.load().unwrap();
        assert_eq!(library["Moby Dick"].current_index, 1);
        assert_eq!(library["Moby Dick"].segments[0], "Call me Ishmael.");
    }

    #[test]
    fn test_save_creates_parent_directory() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::new(dir.path().join("nested").join("books.json"));

        store.save(&Library::new()).unwrap();
        assert!(store.path().exists());
    }
}
