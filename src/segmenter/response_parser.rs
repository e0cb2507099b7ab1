use crate::llm::LlmError;
use regex::Regex;

/// 分段响应解析器
///
/// 去掉包裹的 Markdown 代码块标记后按 JSON 字符串数组解析
pub struct ResponseParser {
    opening_fence: Regex,
    closing_fence: Regex,
}

impl ResponseParser {
    pub fn new() -> Self {
        Self {
            opening_fence: Regex::new(r"^```(?:json)?").expect("valid opening fence pattern"),
            closing_fence: Regex::new(r"```$").expect("valid closing fence pattern"),
        }
    }

    /// 去掉首尾的 ``` / ```json 标记
    pub fn strip_code_fences<'a>(&self, response: &'a str) -> &'a str {
        let mut text = response.trim();
        if let Some(m) = self.opening_fence.find(text) {
            text = &text[m.end()..];
        }
        if let Some(m) = self.closing_fence.find(text) {
            text = &text[..m.start()];
        }
        text.trim()
    }

    /// 解析分段结果
    ///
    /// # 返回
    /// 非空字符串数组；空数组或格式不对时返回 Parse 错误
    pub fn parse(&self, response: &str) -> Result<Vec<String>, LlmError> {
        let body = self.strip_code_fences(response);
        let segments: Vec<String> =
            serde_json::from_str(body).map_err(|e| LlmError::Parse(e.to_string()))?;

        if segments.is_empty() {
            return Err(LlmError::Parse("分段结果为空数组".to_string()));
        }
        Ok(segments)
    }
}

impl Default for ResponseParser {
    fn default() -> Self {
        Self::new()
    }
}
