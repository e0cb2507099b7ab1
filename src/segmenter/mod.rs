// Segmenter 模块
// 把整本书切成约 5000 词的连续片段：优先交给外部服务，失败时按词数切分

pub mod fallback_strategy;
pub mod response_parser;

pub use fallback_strategy::{FallbackStrategy, SEGMENT_WORD_COUNT};
pub use response_parser::ResponseParser;

use crate::llm::TextGenerator;
use log::{info, warn};

/// 默认允许的词数浮动
pub const SEGMENT_TOLERANCE: usize = 500;

/// 片段来源
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentSource {
    /// 外部服务分段
    Service,
    /// 本地按词数切分
    Fallback,
}

/// 分段结果
#[derive(Debug, Clone)]
pub struct Segmentation {
    pub segments: Vec<String>,
    pub source: SegmentSource,
}

pub struct Segmenter<G: TextGenerator> {
    generator: G,
    fallback: FallbackStrategy,
    parser: ResponseParser,
    tolerance: usize,
}

impl<G: TextGenerator> Segmenter<G> {
    pub fn new(generator: G) -> Self {
        Self::with_settings(generator, SEGMENT_WORD_COUNT, SEGMENT_TOLERANCE)
    }

    /// # 参数
    /// - `generator`: 外部文本服务
    /// - `words_per_segment`: 目标每段词数（本地切分时为精确值）
    /// - `tolerance`: 外部分段允许的浮动
    pub fn with_settings(generator: G, words_per_segment: usize, tolerance: usize) -> Self {
        Self {
            generator,
            fallback: FallbackStrategy::with_words_per_segment(words_per_segment),
            parser: ResponseParser::new(),
            tolerance,
        }
    }

    /// 分段，文本非空时结果一定非空
    pub fn segment(&self, title: &str, full_text: &str) -> Vec<String> {
        self.segment_with_source(title, full_text).segments
    }

    /// 分段并返回使用了哪条路径
    pub fn segment_with_source(&self, title: &str, full_text: &str) -> Segmentation {
        if full_text.split_whitespace().next().is_none() {
            return Segmentation {
                segments: Vec::new(),
                source: SegmentSource::Fallback,
            };
        }

        let prompt = self.build_prompt(title, full_text);
        let result = self
            .generator
            .generate(&prompt)
            .and_then(|response| self.parser.parse(&response));

        match result {
            Ok(segments) => {
                info!("'{}' split into {} segments by {}", title, segments.len(), self.generator.model_name());
                Segmentation {
                    segments,
                    source: SegmentSource::Service,
                }
            }
            Err(e) => {
                warn!("segmenting '{}' with the service failed, using word-count split: {}", title, e);
                self.segment_locally(title, full_text)
            }
        }
    }

    /// 不调用服务，直接按词数切分
    pub fn segment_locally(&self, title: &str, full_text: &str) -> Segmentation {
        let segments = self.fallback.apply(full_text);
        info!(
            "'{}' split into {} segments of {} words",
            title,
            segments.len(),
            self.fallback.words_per_segment()
        );
        Segmentation {
            segments,
            source: SegmentSource::Fallback,
        }
    }

    fn build_prompt(&self, title: &str, full_text: &str) -> String {
        let words = self.fallback.words_per_segment();
        format!(
            r#"You are given a book titled "{title}". Please analyze the content and divide it into logical segments where each segment contains approximately {words} words.

Each segment should:
- End at a natural break point (chapter end, scene break, or paragraph boundary)
- Contain roughly {words} words (can vary by ±{tolerance} words for natural breaks)
- Be a complete narrative unit
- Follow the previous segment directly, without overlapping or skipping any text

Return ONLY a JSON array of strings, where each string is one segment of the book, in reading order and covering the entire text. Do not include any other text or explanation.

Book content:
{full_text}

Return format: ["segment1 text...", "segment2 text...", "segment3 text..."]
"#,
            tolerance = self.tolerance,
        )
    }
}
