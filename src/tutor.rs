use crate::content::{Catalog, Chapter, Volume};
use crate::formula;
use crate::search;
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

const BASE_PROMPT: &str = "You are a friendly physics tutor for university students. \
Explain step by step, show the relevant formula, and keep answers short.";

/// 离线模式下最多推荐的章节数
const MAX_SUGGESTIONS: usize = 3;

#[derive(Error, Debug)]
pub enum TutorError {
    #[error("问题不能为空")]
    EmptyQuestion,
    #[error("请求助教服务失败: {0}")]
    Http(#[from] reqwest::Error),
    #[error("助教服务返回错误状态: {0}")]
    Status(u16),
    #[error("助教服务返回空回答")]
    EmptyResponse,
}

/// 助教服务配置
#[derive(Debug, Clone)]
pub struct TutorConfig {
    /// OpenAI 兼容的 chat completions 地址；为空时使用离线回答
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    pub model: String,
    pub timeout: Duration,
    pub max_tokens: u32,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key: None,
            model: "gpt-4o-mini".to_string(),
            timeout: Duration::from_secs(30),
            max_tokens: 512,
        }
    }
}

impl TutorConfig {
    pub fn is_online(&self) -> bool {
        self.endpoint.is_some() && self.api_key.is_some()
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: u32,
}

#[derive(Deserialize)]
struct CompletionResponse {
    #[serde(default)]
    choices: Vec<CompletionChoice>,
}

#[derive(Deserialize)]
struct CompletionChoice {
    message: ChatMessage,
}

/// 由章节生成系统提示词
pub fn chapter_prompt(chapter: &Chapter) -> String {
    let mut prompt = format!(
        "{}\n\nThe student is studying the chapter \"{}\".\nSummary: {}",
        BASE_PROMPT, chapter.title, chapter.summary
    );

    if !chapter.key_formulas.is_empty() {
        prompt.push_str("\nKey formulas:");
        for f in &chapter.key_formulas {
            let text = formula::to_plain_text(&formula::render(&f.formula));
            prompt.push_str(&format!("\n- {}: {}", f.name, text));
        }
    }
    prompt
}

/// 已配置的助教服务
struct Backend {
    client: Client,
    endpoint: String,
    api_key: String,
}

/// AI 助教会话
///
/// 保存对话历史；未配置服务时给出指向目录内容的离线回答
pub struct Tutor {
    config: TutorConfig,
    backend: Option<Backend>,
    history: Vec<ChatMessage>,
}

impl Tutor {
    pub fn new(config: TutorConfig) -> Result<Self, TutorError> {
        let backend = match (&config.endpoint, &config.api_key) {
            (Some(endpoint), Some(api_key)) => Some(Backend {
                client: Client::builder().timeout(config.timeout).build()?,
                endpoint: endpoint.clone(),
                api_key: api_key.clone(),
            }),
            _ => {
                info!("Tutor endpoint not configured, answering offline");
                None
            }
        };

        Ok(Self {
            config,
            backend,
            history: vec![ChatMessage::new(Role::System, BASE_PROMPT)],
        })
    }

    pub fn is_online(&self) -> bool {
        self.backend.is_some()
    }

    pub fn history(&self) -> &[ChatMessage] {
        &self.history
    }

    /// 切换当前章节，重置对话
    pub fn focus_chapter(&mut self, chapter: &Chapter) {
        self.history = vec![ChatMessage::new(Role::System, chapter_prompt(chapter))];
    }

    pub fn reset(&mut self) {
        self.history.truncate(1);
    }

    /// 提问
    ///
    /// # 参数
    /// - `question`: 学生的问题
    /// - `catalog`: 离线回答时用于检索的目录
    ///
    /// # 返回
    /// 助教回答；在线请求失败时返回错误，对话历史不变
    pub fn ask(&mut self, question: &str, catalog: &Catalog) -> Result<String, TutorError> {
        let question = question.trim();
        if question.is_empty() {
            return Err(TutorError::EmptyQuestion);
        }

        self.history.push(ChatMessage::new(Role::User, question));
        let answer = match &self.backend {
            Some(backend) => self.complete(backend),
            None => Ok(offline_answer(question, catalog)),
        };

        match answer {
            Ok(answer) => {
                self.history
                    .push(ChatMessage::new(Role::Assistant, answer.clone()));
                Ok(answer)
            }
            Err(e) => {
                warn!("Tutor request failed: {}", e);
                self.history.pop();
                Err(e)
            }
        }
    }

    fn complete(&self, backend: &Backend) -> Result<String, TutorError> {
        let body = CompletionRequest {
            model: &self.config.model,
            messages: &self.history,
            max_tokens: self.config.max_tokens,
        };

        debug!("Sending {} messages to {}", self.history.len(), backend.endpoint);
        let response = backend
            .client
            .post(&backend.endpoint)
            .bearer_auth(&backend.api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(TutorError::Status(status.as_u16()));
        }

        let parsed: CompletionResponse = response.json()?;
        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content.trim().to_string())
            .filter(|content| !content.is_empty())
            .ok_or(TutorError::EmptyResponse)
    }
}

/// 离线回答：按问题中的关键词在各分卷中检索章节
pub fn offline_answer(question: &str, catalog: &Catalog) -> String {
    let keywords: Vec<String> = question
        .split(|c: char| !c.is_alphanumeric() && c != '\'')
        .filter(|w| w.chars().count() >= 4)
        .map(|w| w.to_lowercase())
        .collect();

    let mut suggestions: Vec<(Volume, &Chapter)> = Vec::new();
    'volumes: for volume in Volume::ALL {
        for keyword in &keywords {
            for chapter in search::filter_chapters(catalog.chapters(volume), keyword) {
                if suggestions.len() >= MAX_SUGGESTIONS {
                    break 'volumes;
                }
                if !suggestions
                    .iter()
                    .any(|(v, c)| *v == volume && c.id == chapter.id)
                {
                    suggestions.push((volume, chapter));
                }
            }
        }
    }

    if suggestions.is_empty() {
        return format!(
            "The AI tutor is offline right now, so I can't answer \"{}\" directly. \
Try searching the chapters or formulas for a key term.",
            question
        );
    }

    let mut answer = format!(
        "The AI tutor is offline right now. These chapters look relevant to \"{}\":",
        question
    );
    for (volume, chapter) in suggestions {
        answer.push_str(&format!("\n- [{}] {}: {}", volume, chapter.title, chapter.summary));
    }
    answer
}
