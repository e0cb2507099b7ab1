/// 默认每段词数
pub const SEGMENT_WORD_COUNT: usize = 5000;

/// Fallback Strategy
/// 外部分段失败时使用的确定性按词数切分
pub struct FallbackStrategy {
    words_per_segment: usize,
}

impl FallbackStrategy {
    pub fn new() -> Self {
        Self::with_words_per_segment(SEGMENT_WORD_COUNT)
    }

    /// 指定每段词数，0 按 1 处理
    pub fn with_words_per_segment(words_per_segment: usize) -> Self {
        Self {
            words_per_segment: words_per_segment.max(1),
        }
    }

    pub fn words_per_segment(&self) -> usize {
        self.words_per_segment
    }

    /// 应用降级策略
    ///
    /// 按空白切词，每满 `words_per_segment` 个词输出一段（单空格连接），
    /// 剩余的词作为最后一段
    ///
    /// # 参数
    /// - `text`: 全书文本
    ///
    /// # 返回
    /// 片段列表，文本没有词时为空
    pub fn apply(&self, text: &str) -> Vec<String> {
        let mut segments = Vec::new();
        let mut buffer: Vec<&str> = Vec::with_capacity(self.words_per_segment);

        for word in text.split_whitespace() {
            buffer.push(word);
            if buffer.len() == self.words_per_segment {
                segments.push(buffer.join(" "));
                buffer.clear();
            }
        }

        if !buffer.is_empty() {
            segments.push(buffer.join(" "));
        }

        segments
    }
}

impl Default for FallbackStrategy {
    fn default() -> Self {
        Self::new()
    }
}
