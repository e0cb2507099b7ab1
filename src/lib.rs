// Book Shuffler
// 把书切成约 5000 词的片段，每次随机挑一本未读完的书给出下一段，
// 并在段与段之间附上 "Where we left off" 回顾

pub mod cli;
pub mod config;
pub mod library;
pub mod llm;
pub mod logger;
pub mod render;
pub mod segmenter;
pub mod store;
pub mod summarizer;
pub mod txt_loader;
pub mod types;


// 重新导出主要类型
pub use cli::{run, Cli, Command};
pub use config::Config;
pub use library::{progress_of, IngestReport, LibraryController, LibraryError, NextUnread};
pub use llm::{Credential, GeminiClient, LlmError, TextGenerator};
pub use segmenter::{FallbackStrategy, Segmenter, SEGMENT_WORD_COUNT};
pub use store::{JsonFileStore, LibraryStore, SqliteStore, StoreError};
pub use summarizer::{Summarizer, FALLBACK_RECAP};
pub use types::{BookRecord, Library, ReadingState, Recap, Selection};
