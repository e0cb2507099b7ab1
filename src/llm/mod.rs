// 外部文本生成服务
// 只把它当作 prompt 进、文本出的黑盒

use thiserror::Error;

pub mod gemini;

pub use gemini::GeminiClient;

#[derive(Error, Debug)]
pub enum LlmError {
    #[error("缺少 API 密钥")]
    MissingCredential,
    #[error("HTTP 请求失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("服务返回错误 {status}: {message}")]
    Api { status: u16, message: String },
    #[error("服务返回了空内容")]
    EmptyResponse,
    #[error("响应解析失败: {0}")]
    Parse(String),
}

/// 调用方提供的 API 密钥
///
/// 空白字符串视为没有密钥
#[derive(Clone)]
pub struct Credential(String);

impl Credential {
    pub fn new(secret: impl Into<String>) -> Option<Self> {
        let secret = secret.into();
        let trimmed = secret.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("Credential(***)")
    }
}

/// TextGenerator trait
///
/// 分段和回顾都通过它调用外部服务
pub trait TextGenerator {
    /// 发送 prompt，返回生成的文本
    fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// 模型名称（记录在回顾里）
    fn model_name(&self) -> &str;
}

impl<G: TextGenerator + ?Sized> TextGenerator for &G {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate(prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

impl<G: TextGenerator + ?Sized> TextGenerator for Box<G> {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate(prompt)
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }
}

/// 不调用任何服务的生成器，始终失败，调用方走本地兜底
pub struct OfflineGenerator;

impl TextGenerator for OfflineGenerator {
    fn generate(&self, _prompt: &str) -> Result<String, LlmError> {
        Err(LlmError::MissingCredential)
    }

    fn model_name(&self) -> &str {
        "offline"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_credential_is_rejected() {
        assert!(Credential::new("").is_none());
        assert!(Credential::new("   \n").is_none());
    }

    #[test]
    fn test_credential_is_trimmed_and_hidden() {
        let credential = Credential::new("  secret-key ").unwrap();
        assert_eq!(credential.expose(), "secret-key");
        assert_eq!(format!("{:?}", credential), "Credential(***)");
    }

    #[test]
    fn test_offline_generator_always_fails() {
        let result = OfflineGenerator.generate("anything");
        assert!(matches!(result, Err(LlmError::MissingCredential)));
    }
}
