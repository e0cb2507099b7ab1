use crate::llm::gemini::{DEFAULT_API_BASE, DEFAULT_MODEL};
use crate::segmenter::{SEGMENT_TOLERANCE, SEGMENT_WORD_COUNT};
use crate::store::{JsonFileStore, LibraryStore, SqliteStore};
use crate::summarizer::{CURRENT_CONTEXT_WORDS, PREVIOUS_CONTEXT_WORDS};
use config::{Config as CConfig, Environment, File, FileFormat, Map};
use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// 未指定 --config 时尝试读取的文件
pub const DEFAULT_CONFIG_FILE: &str = "book_shuffler.toml";

/// 环境变量前缀，如 SHUFFLER_DATA_FILE
pub const ENV_PREFIX: &str = "SHUFFLER";

/// 可以由环境变量覆盖的键
pub const ENV_KEYS: &[&str] = &[
    "data_file",
    "backend",
    "model",
    "api_base",
    "segment_word_count",
    "segment_tolerance",
    "recap_previous_words",
    "recap_current_words",
    "request_timeout_secs",
];

#[derive(Error, Debug)]
#[error("无法解析配置: {0}")]
pub struct ConfigError(String);

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    Json,
    Sqlite,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub data_file: PathBuf,
    pub backend: Backend,
    pub model: String,
    pub api_base: String,
    pub segment_word_count: usize,
    pub segment_tolerance: usize,
    pub recap_previous_words: usize,
    pub recap_current_words: usize,
    /// 不设置表示外部调用不限时
    pub request_timeout_secs: Option<u64>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_file: PathBuf::from("books_data.json"),
            backend: Backend::Json,
            model: DEFAULT_MODEL.to_string(),
            api_base: DEFAULT_API_BASE.to_string(),
            segment_word_count: SEGMENT_WORD_COUNT,
            segment_tolerance: SEGMENT_TOLERANCE,
            recap_previous_words: PREVIOUS_CONTEXT_WORDS,
            recap_current_words: CURRENT_CONTEXT_WORDS,
            request_timeout_secs: None,
        }
    }
}

impl Config {
    pub fn from_toml_str(toml_str: &str) -> Result<Config, ConfigError> {
        let config = CConfig::builder()
            .add_source(File::from_str(toml_str, FileFormat::Toml))
            .build()?
            .try_deserialize::<Config>()?;
        Ok(config)
    }

    /// 默认值 -> 配置文件 -> 环境变量
    ///
    /// # 参数
    /// - `path`: 显式指定的配置文件（必须存在）；None 时尝试 [`DEFAULT_CONFIG_FILE`]
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        Self::load_with_env(path, std::env::vars())
    }

    /// 同 [`load`](Self::load)，环境变量由调用方提供
    ///
    /// 未知的 `SHUFFLER_*` 变量只记录警告，不会导致失败
    pub fn load_with_env<I>(path: Option<&Path>, vars: I) -> Result<Config, ConfigError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let file = match path {
            Some(path) => File::from(path).format(FileFormat::Toml).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE)
                .format(FileFormat::Toml)
                .required(false),
        };

        let env = Environment::with_prefix(ENV_PREFIX)
            .try_parsing(true)
            .source(Some(known_env_vars(vars)));

        let config = CConfig::builder()
            .add_source(file)
            .add_source(env)
            .build()?
            .try_deserialize::<Config>()?;
        Ok(config)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }

    /// 按配置打开存储后端
    pub fn open_store(&self) -> Box<dyn LibraryStore> {
        match self.backend {
            Backend::Json => Box::new(JsonFileStore::new(&self.data_file)),
            Backend::Sqlite => Box::new(SqliteStore::new(&self.data_file)),
        }
    }
}

/// 只保留 [`ENV_KEYS`] 中的 `SHUFFLER_*` 变量
fn known_env_vars<I>(vars: I) -> Map<String, String>
where
    I: IntoIterator<Item = (String, String)>,
{
    let prefix = format!("{}_", ENV_PREFIX);

    vars.into_iter()
        .filter(|(key, _)| {
            let rest = match key.get(..prefix.len()) {
                Some(head) if head.eq_ignore_ascii_case(&prefix) => &key[prefix.len()..],
                _ => return false,
            };
            let known = ENV_KEYS.contains(&rest.to_ascii_lowercase().as_str());
            if !known {
                warn!("ignoring unknown environment variable {}", key);
            }
            known
        })
        .collect()
}
