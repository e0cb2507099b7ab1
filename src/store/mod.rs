// 书库持久化
// 整库读出、整库写回；后端可替换

use crate::types::Library;
use thiserror::Error;

pub mod json_store;
pub mod sqlite_store;

pub use json_store::JsonFileStore;
pub use sqlite_store::SqliteStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO错误: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON 格式错误: {0}")]
    Json(#[from] serde_json::Error),
    #[error("数据库错误: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// LibraryStore trait
///
/// 书库的唯一事实来源。每次操作前 `load`，每次修改后立即 `save`
pub trait LibraryStore {
    /// 读出整个书库，存储不存在时返回空书库
    fn load(&self) -> Result<Library, StoreError>;

    /// 写回整个书库
    fn save(&self, library: &Library) -> Result<(), StoreError>;

    /// 存储位置描述（用于日志）
    fn describe(&self) -> String;
}

impl<S: LibraryStore + ?Sized> LibraryStore for Box<S> {
    fn load(&self) -> Result<Library, StoreError> {
        (**self).load()
    }

    fn save(&self, library: &Library) -> Result<(), StoreError> {
        (**self).save(library)
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

/// 修正读出的记录，返回被修正的书名
pub(crate) fn normalize_library(library: &mut Library) -> Vec<String> {
    library
        .iter_mut()
        .filter_map(|(title, record)| record.normalize().then(|| title.clone()))
        .collect()
}
