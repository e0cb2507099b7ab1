use crate::llm::TextGenerator;
use crate::types::Recap;
use chrono::Utc;
use log::warn;

/// 回顾文本的固定前缀
pub const RECAP_LABEL: &str = "Where we left off:";

/// 服务失败时返回的回顾
pub const FALLBACK_RECAP: &str = "Where we left off: Continuing from the previous segment...";

pub const PREVIOUS_CONTEXT_WORDS: usize = 1000;
pub const CURRENT_CONTEXT_WORDS: usize = 500;

/// Summarizer
/// 为相邻两个片段生成不超过两句的衔接回顾，从不向外报错
pub struct Summarizer<G: TextGenerator> {
    generator: G,
    previous_words: usize,
    current_words: usize,
}

impl<G: TextGenerator> Summarizer<G> {
    pub fn new(generator: G) -> Self {
        Self::with_context(generator, PREVIOUS_CONTEXT_WORDS, CURRENT_CONTEXT_WORDS)
    }

    /// # 参数
    /// - `previous_words`: 取上一段末尾的词数
    /// - `current_words`: 取当前段开头的词数
    pub fn with_context(generator: G, previous_words: usize, current_words: usize) -> Self {
        Self {
            generator,
            previous_words,
            current_words,
        }
    }

    /// 生成回顾文本，失败时返回 [`FALLBACK_RECAP`]
    pub fn summarize(&self, title: &str, previous_segment: &str, current_segment: &str) -> String {
        self.recap(title, previous_segment, current_segment).text
    }

    /// 生成回顾，附带模型和时间信息
    pub fn recap(&self, title: &str, previous_segment: &str, current_segment: &str) -> Recap {
        let prompt = self.build_prompt(title, previous_segment, current_segment);

        let (text, fallback) = match self.generator.generate(&prompt) {
            Ok(reply) if !reply.trim().is_empty() => (reply.trim().to_string(), false),
            Ok(_) => {
                warn!("recap for '{}' came back empty, using fallback", title);
                (FALLBACK_RECAP.to_string(), true)
            }
            Err(e) => {
                warn!("generating recap for '{}' failed, using fallback: {}", title, e);
                (FALLBACK_RECAP.to_string(), true)
            }
        };

        Recap {
            text,
            model: self.generator.model_name().to_string(),
            generated_at: Utc::now(),
            fallback,
        }
    }

    fn build_prompt(&self, title: &str, previous_segment: &str, current_segment: &str) -> String {
        let previous_context = last_words(previous_segment, self.previous_words);
        let current_context = first_words(current_segment, self.current_words);

        format!(
            r#"You are reading a book titled "{title}".

Based on where we left off and what comes next, write a 2-line summary (maximum 2 sentences) that reminds the reader what was happening.

Previous section ended with:
{previous_context}

Current section begins with:
{current_context}

Write a concise 2-line summary starting with "{RECAP_LABEL}" that bridges these sections.
"#
        )
    }
}

/// 取最后 n 个词（按空白切分）
pub fn last_words(text: &str, n: usize) -> String {
    let words: Vec<&str> = text.split_whitespace().collect();
    let start = words.len().saturating_sub(n);
    words[start..].join(" ")
}

/// 取前 n 个词（按空白切分）
pub fn first_words(text: &str, n: usize) -> String {
    text.split_whitespace().take(n).collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use std::cell::RefCell;

    struct RecordingGenerator {
        reply: Option<String>,
        prompts: RefCell<Vec<String>>,
    }

    impl RecordingGenerator {
        fn new(reply: Option<&str>) -> Self {
            Self {
                reply: reply.map(str::to_string),
                prompts: RefCell::new(Vec::new()),
            }
        }
    }

    impl TextGenerator for RecordingGenerator {
        fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.borrow_mut().push(prompt.to_string());
            self.reply.clone().ok_or(LlmError::EmptyResponse)
        }

        fn model_name(&self) -> &str {
            "recording"
        }
    }

    fn numbered(prefix: &str, n: usize) -> String {
        (0..n).map(|i| format!("{}{}", prefix, i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_last_and_first_words() {
        assert_eq!(last_words("a b c d", 2), "c d");
        assert_eq!(last_words("a b", 5), "a b");
        assert_eq!(first_words("a\nb  c d", 3), "a b c");
        assert_eq!(first_words("", 3), "");
    }

    #[test]
    fn test_context_is_bounded_by_words() {
        let generator = RecordingGenerator::new(Some("Where we left off: things happened."));
        let summarizer = Summarizer::new(&generator);

        summarizer.summarize("Bounded", &numbered("p", 1200), &numbered("c", 800));

        let prompts = generator.prompts.borrow();
        let prompt = &prompts[0];
        assert!(prompt.contains("p200 p201"));
        assert!(!prompt.contains("p199 "));
        assert!(prompt.contains("p1199"));
        assert!(prompt.contains("c0 c1"));
        assert!(prompt.contains("c499"));
        assert!(!prompt.contains("c500"));
        assert!(prompt.contains("\"Bounded\""));
        assert!(prompt.contains("starting with \"Where we left off:\""));
    }

    #[test]
    fn test_reply_is_trimmed() {
        let generator = RecordingGenerator::new(Some("\n Where we left off: Ahab swore revenge. \n"));
        let summarizer = Summarizer::new(&generator);

        let recap = summarizer.recap("Moby Dick", "prev", "curr");
        assert_eq!(recap.text, "Where we left off: Ahab swore revenge.");
        assert_eq!(recap.model, "recording");
        assert!(!recap.fallback);
    }

    #[test]
    fn test_failure_returns_fallback() {
        let generator = RecordingGenerator::new(None);
        let summarizer = Summarizer::new(&generator);

        let recap = summarizer.recap("Any", "prev", "curr");
        assert_eq!(recap.text, FALLBACK_RECAP);
        assert!(recap.fallback);
    }

    #[test]
    fn test_blank_reply_returns_fallback() {
        let generator = RecordingGenerator::new(Some("   "));
        let summarizer = Summarizer::new(&generator);

        assert_eq!(summarizer.summarize("Any", "prev", "curr"), FALLBACK_RECAP);
    }
}
