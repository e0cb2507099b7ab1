use encoding_rs::{Encoding, GBK, UTF_8};
use log::warn;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LoadError {
    #[error("读取文件失败: {0}")]
    Io(#[from] std::io::Error),
    #[error("无法从路径推断书名: {0}")]
    NoTitle(String),
}

/// 上传的书籍文本
#[derive(Debug, Clone)]
pub struct UploadedBook {
    pub title: String,
    pub content: String,
    /// 实际使用的编码名，如 "UTF-8"、"GBK"
    pub encoding: &'static str,
    /// 解码时是否替换过无效字节
    pub lossy: bool,
}

/// TXT 加载器
///
/// 候选编码依次为：BOM 指明的编码、UTF-8、GBK。
/// 都无法无损解码时按 UTF-8 解码并替换无效字节
#[derive(Clone)]
pub struct TxtLoader {
    legacy_encodings: Vec<&'static Encoding>,
}

impl TxtLoader {
    pub fn new() -> Self {
        Self {
            legacy_encodings: vec![GBK],
        }
    }

    /// 读取文件，书名取文件名去掉 `.txt` 后缀
    pub fn load(&self, file_path: &Path) -> Result<UploadedBook, LoadError> {
        let title = title_from_path(file_path)
            .ok_or_else(|| LoadError::NoTitle(file_path.display().to_string()))?;
        let bytes = fs::read(file_path)?;
        let (content, encoding, lossy) = self.decode(&bytes);

        if lossy {
            warn!("'{}' was not valid {}, invalid bytes were replaced", title, encoding.name());
        }

        Ok(UploadedBook {
            title,
            content,
            encoding: encoding.name(),
            lossy,
        })
    }

    /// 解码字节
    ///
    /// # 返回
    /// (文本, 使用的编码, 是否有替换)
    pub fn decode(&self, bytes: &[u8]) -> (String, &'static Encoding, bool) {
        if let Some((encoding, _bom_length)) = Encoding::for_bom(bytes) {
            let (content, had_errors) = encoding.decode_with_bom_removal(bytes);
            return (content.into_owned(), encoding, had_errors);
        }

        if let Ok(text) = std::str::from_utf8(bytes) {
            return (text.to_string(), UTF_8, false);
        }

        for &encoding in &self.legacy_encodings {
            if let Some(text) = encoding.decode_without_bom_handling_and_without_replacement(bytes) {
                return (text.into_owned(), encoding, false);
            }
        }

        let (content, had_errors) = UTF_8.decode_without_bom_handling(bytes);
        (content.into_owned(), UTF_8, had_errors)
    }
}

impl Default for TxtLoader {
    fn default() -> Self {
        Self::new()
    }
}

/// 从文件名得到书名："Dune.txt" -> "Dune"
pub fn title_from_path(path: &Path) -> Option<String> {
    let name = path.file_name()?.to_str()?;
    let title = name.strip_suffix(".txt").unwrap_or(name).trim();
    if title.is_empty() {
        None
    } else {
        Some(title.to_string())
    }
}
