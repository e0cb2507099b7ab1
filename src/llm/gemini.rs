use super::{Credential, LlmError, TextGenerator};
use log::debug;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

#[derive(Serialize)]
struct GenerateRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Deserialize, Debug)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize, Debug)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Deserialize, Debug)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize, Debug)]
struct CandidatePart {
    #[serde(default)]
    text: String,
}

/// Gemini generateContent 客户端
///
/// 阻塞调用；未配置超时时请求可以一直挂起
pub struct GeminiClient {
    client: Client,
    credential: Option<Credential>,
    api_base: String,
    model: String,
}

impl GeminiClient {
    /// 创建客户端
    ///
    /// # 参数
    /// - `credential`: API 密钥，None 时所有调用直接失败
    /// - `api_base`: API 根地址
    /// - `model`: 模型名称
    /// - `timeout`: 请求超时，None 表示不限时
    pub fn new(
        credential: Option<Credential>,
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout: Option<Duration>,
    ) -> Result<Self, LlmError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            credential,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.api_base, self.model)
    }

    fn request_body(prompt: &str) -> GenerateRequest<'_> {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        }
    }

    /// 从响应中取出第一个候选的全部文本
    fn extract_text(response: GenerateResponse) -> Result<String, LlmError> {
        let text: String = response
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .map(|content| content.parts.into_iter().map(|part| part.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(LlmError::EmptyResponse);
        }
        Ok(text)
    }
}

impl TextGenerator for GeminiClient {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let credential = self.credential.as_ref().ok_or(LlmError::MissingCredential)?;

        debug!("calling {} with a {}-byte prompt", self.model, prompt.len());

        let response = self
            .client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .json(&Self::request_body(prompt))
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: GenerateResponse = response
            .json()
            .map_err(|e| LlmError::Parse(e.to_string()))?;

        Self::extract_text(body)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}
