use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// 书库：书名 -> 书籍记录
///
/// 书名即唯一键，同名书籍会被覆盖
pub type Library = BTreeMap<String, BookRecord>;

/// 书籍记录
///
/// 一本已分段的书及其阅读游标
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// 按顺序排列的片段，创建后不再修改
    pub segments: Vec<String>,
    /// 下一个待读片段的下标，等于 total_segments 表示已读完
    pub current_index: usize,
    /// 片段总数，创建时固定
    pub total_segments: usize,
}

impl BookRecord {
    /// 由分段结果创建新记录，游标从 0 开始
    pub fn new(segments: Vec<String>) -> Self {
        let total_segments = segments.len();
        Self {
            segments,
            current_index: 0,
            total_segments,
        }
    }

    /// 是否还有未读片段
    pub fn has_unread(&self) -> bool {
        self.current_index < self.total_segments
    }

    /// 阅读进度百分比 [0, 100]
    pub fn progress(&self) -> f64 {
        if self.total_segments == 0 {
            return 0.0;
        }
        self.current_index as f64 / self.total_segments as f64 * 100.0
    }

    /// 当前阅读状态
    pub fn state(&self) -> ReadingState {
        if self.current_index == 0 {
            ReadingState::Unstarted
        } else if self.current_index < self.total_segments {
            ReadingState::InProgress
        } else {
            ReadingState::Complete
        }
    }

    /// 修正从存储中读出的不一致字段
    ///
    /// # 返回
    /// 是否做了修正
    pub fn normalize(&mut self) -> bool {
        let mut changed = false;
        if self.total_segments != self.segments.len() {
            self.total_segments = self.segments.len();
            changed = true;
        }
        if self.current_index > self.total_segments {
            self.current_index = self.total_segments;
            changed = true;
        }
        changed
    }
}

/// 阅读状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingState {
    Unstarted,
    InProgress,
    Complete,
}

impl ReadingState {
    pub fn label(&self) -> &'static str {
        match self {
            ReadingState::Unstarted => "unstarted",
            ReadingState::InProgress => "in progress",
            ReadingState::Complete => "complete",
        }
    }
}

/// 一次"给我点东西读"的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selection {
    pub title: String,
    pub segment_text: String,
    /// 片段下标（从 0 开始）
    pub segment_index: usize,
    pub total_segments: usize,
    pub is_first: bool,
    /// 上一个片段，首个片段时为 None
    pub previous_segment: Option<String>,
}

/// "Where we left off" 回顾
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recap {
    pub text: String,
    pub model: String,
    pub generated_at: DateTime<Utc>,
    /// 是否为服务失败时的固定兜底文本
    pub fallback: bool,
}
