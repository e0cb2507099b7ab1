use crate::llm::TextGenerator;
use crate::segmenter::{SegmentSource, Segmenter};
use crate::store::{LibraryStore, StoreError};
use crate::types::{BookRecord, Library, Selection};
use log::{error, info};
use rand::seq::SliceRandom;
use rand::Rng;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("保存书库失败: {0}")]
    Persistence(#[from] StoreError),
    #[error("《{0}》没有可用的文本，未生成任何片段")]
    EmptySegmentation(String),
    #[error("书库中没有《{0}》")]
    UnknownBook(String),
}

/// 导入结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestReport {
    pub title: String,
    pub total_segments: usize,
    pub source: SegmentSource,
    /// 是否覆盖了同名旧记录
    pub replaced: bool,
}

/// `next_unread` 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextUnread {
    Segment(Selection),
    /// 书库为空
    EmptyLibrary,
    /// 所有书都已读完
    Exhausted,
}

impl NextUnread {
    pub fn into_selection(self) -> Option<Selection> {
        match self {
            NextUnread::Segment(selection) => Some(selection),
            _ => None,
        }
    }
}

/// 书库 / 阅读进度控制器
///
/// 每个操作都从存储读出整库、修改、立即写回，不在内存中保留状态。
/// 没有加锁：并发调用会互相覆盖写入
pub struct LibraryController<S: LibraryStore> {
    store: S,
}

impl<S: LibraryStore> LibraryController<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// 读出书库，读失败时记录错误并按空书库处理
    fn load(&self) -> Library {
        match self.store.load() {
            Ok(library) => library,
            Err(e) => {
                error!("could not load library from {}: {}", self.store.describe(), e);
                Library::new()
            }
        }
    }

    fn save(&self, library: &Library) -> Result<(), LibraryError> {
        self.store.save(library).map_err(|e| {
            error!("could not save library to {}: {}", self.store.describe(), e);
            LibraryError::from(e)
        })
    }

    /// 书库快照
    pub fn snapshot(&self) -> Library {
        self.load()
    }

    /// 导入一本书：分段、创建游标为 0 的记录并保存。同名书籍直接覆盖
    pub fn ingest<G: TextGenerator>(
        &self,
        segmenter: &Segmenter<G>,
        title: &str,
        full_text: &str,
    ) -> Result<IngestReport, LibraryError> {
        let segmentation = segmenter.segment_with_source(title, full_text);
        self.store_segments(title, segmentation.segments, segmentation.source)
    }

    /// 不调用外部服务，按词数切分后导入
    pub fn ingest_locally<G: TextGenerator>(
        &self,
        segmenter: &Segmenter<G>,
        title: &str,
        full_text: &str,
    ) -> Result<IngestReport, LibraryError> {
        let segmentation = segmenter.segment_locally(title, full_text);
        self.store_segments(title, segmentation.segments, segmentation.source)
    }

    fn store_segments(
        &self,
        title: &str,
        segments: Vec<String>,
        source: SegmentSource,
    ) -> Result<IngestReport, LibraryError> {
        if segments.is_empty() {
            return Err(LibraryError::EmptySegmentation(title.to_string()));
        }

        let record = BookRecord::new(segments);
        let total_segments = record.total_segments;

        let mut library = self.load();
        let replaced = library.insert(title.to_string(), record).is_some();
        self.save(&library)?;

        info!("ingested '{}' with {} segments (replaced: {})", title, total_segments, replaced);
        Ok(IngestReport {
            title: title.to_string(),
            total_segments,
            source,
            replaced,
        })
    }

    /// 随机挑一本未读完的书，返回它的下一个片段并推进游标
    pub fn next_unread(&self) -> Result<NextUnread, LibraryError> {
        self.next_unread_with_rng(&mut rand::thread_rng())
    }

    /// 同 [`next_unread`](Self::next_unread)，随机源由调用方提供
    pub fn next_unread_with_rng<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<NextUnread, LibraryError> {
        let mut library = self.load();
        if library.is_empty() {
            return Ok(NextUnread::EmptyLibrary);
        }

        // 每次调用都重新计算可选集合
        let eligible: Vec<&String> = library
            .iter()
            .filter(|(_, record)| record.has_unread())
            .map(|(title, _)| title)
            .collect();

        let title = match eligible.choose(rng) {
            Some(title) => (*title).clone(),
            None => return Ok(NextUnread::Exhausted),
        };

        let record = match library.get_mut(&title) {
            Some(record) => record,
            None => return Ok(NextUnread::Exhausted),
        };

        let index = record.current_index;
        let selection = Selection {
            title: title.clone(),
            segment_text: record.segments[index].clone(),
            segment_index: index,
            total_segments: record.total_segments,
            is_first: index == 0,
            previous_segment: index.checked_sub(1).map(|prev| record.segments[prev].clone()),
        };
        record.current_index = index + 1;

        self.save(&library)?;

        info!(
            "serving '{}' segment {}/{}",
            selection.title,
            index + 1,
            selection.total_segments
        );
        Ok(NextUnread::Segment(selection))
    }

    /// 某本书的阅读进度百分比
    pub fn progress(&self, title: &str) -> Result<f64, LibraryError> {
        self.load()
            .get(title)
            .map(progress_of)
            .ok_or_else(|| LibraryError::UnknownBook(title.to_string()))
    }

    /// 重置某本书的进度，书不存在时不做任何事
    ///
    /// # 返回
    /// 是否找到了这本书
    pub fn reset(&self, title: &str) -> Result<bool, LibraryError> {
        let mut library = self.load();
        match library.get_mut(title) {
            Some(record) => {
                record.current_index = 0;
                self.save(&library)?;
                info!("reset progress of '{}'", title);
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// 删除某本书，书不存在时不做任何事
    ///
    /// # 返回
    /// 是否找到了这本书
    pub fn delete(&self, title: &str) -> Result<bool, LibraryError> {
        let mut library = self.load();
        if library.remove(title).is_none() {
            return Ok(false);
        }
        self.save(&library)?;
        info!("deleted '{}'", title);
        Ok(true)
    }

    /// 重置所有书的进度
    ///
    /// # 返回
    /// 书库中的书数
    pub fn reset_all(&self) -> Result<usize, LibraryError> {
        let mut library = self.load();
        if library.is_empty() {
            return Ok(0);
        }
        for record in library.values_mut() {
            record.current_index = 0;
        }
        self.save(&library)?;
        info!("reset progress of all {} books", library.len());
        Ok(library.len())
    }
}

/// 阅读进度百分比 [0, 100]
pub fn progress_of(record: &BookRecord) -> f64 {
    record.progress()
}
