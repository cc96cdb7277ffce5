use std::env;
use std::sync::Arc;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use storage::repository::CourseRepository;
use study_core::model::{Course, CourseId};

use crate::error::TutorError;

/// Older turns beyond this are dropped before the request is sent.
pub const MAX_HISTORY_TURNS: usize = 20;

const BASE_PROMPT: &str = "You are a patient study tutor for Nigerian university students. \
     Explain step by step, check understanding with a short question, and keep answers concise.";

#[derive(Clone)]
pub struct TutorConfig {
    pub base_url: String,
    pub api_key: String,
    pub model: String,
}

impl std::fmt::Debug for TutorConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TutorConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .field("model", &self.model)
            .finish()
    }
}

impl TutorConfig {
    /// Read `STUDY_AI_API_KEY`, `STUDY_AI_BASE_URL` and `STUDY_AI_MODEL`.
    ///
    /// Returns `None` when no key is set, which disables the tutor.
    #[must_use]
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Same as [`TutorConfig::from_env`] over an arbitrary variable source.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let api_key = lookup("STUDY_AI_API_KEY").filter(|key| !key.trim().is_empty())?;
        let base_url =
            lookup("STUDY_AI_BASE_URL").unwrap_or_else(|| "https://api.openai.com/v1".into());
        let model = lookup("STUDY_AI_MODEL").unwrap_or_else(|| "gpt-4o-mini".into());
        Some(Self {
            base_url,
            api_key,
            model,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: TurnRole,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TutorReply {
    pub reply: String,
    pub model: String,
}

/// Thin proxy to an OpenAI-compatible chat completion endpoint.
#[derive(Clone)]
pub struct TutorService {
    client: Client,
    config: Option<TutorConfig>,
    courses: Arc<dyn CourseRepository>,
}

impl TutorService {
    #[must_use]
    pub fn new(config: Option<TutorConfig>, courses: Arc<dyn CourseRepository>) -> Self {
        Self {
            client: Client::new(),
            config,
            courses,
        }
    }

    #[must_use]
    pub fn enabled(&self) -> bool {
        self.config.is_some()
    }

    /// Ask the tutor, optionally in the context of a course.
    ///
    /// # Errors
    ///
    /// Returns `TutorError` when the tutor is disabled, the message is empty,
    /// the course is unknown, the request fails, or the response is empty.
    pub async fn chat(
        &self,
        course_id: Option<CourseId>,
        message: &str,
        history: &[ChatTurn],
    ) -> Result<TutorReply, TutorError> {
        let config = self.config.as_ref().ok_or(TutorError::Disabled)?;
        let message = message.trim();
        if message.is_empty() {
            return Err(TutorError::EmptyMessage);
        }
        let course = match course_id {
            Some(id) => Some(
                self.courses
                    .get_course(id)
                    .await?
                    .ok_or(TutorError::CourseNotFound)?,
            ),
            None => None,
        };

        let url = format!(
            "{}/chat/completions",
            config.base_url.trim_end_matches('/')
        );
        let payload = ChatRequest {
            model: config.model.clone(),
            messages: build_messages(course.as_ref(), history, message),
            temperature: 0.4,
        };

        let response = self
            .client
            .post(url)
            .bearer_auth(&config.api_key)
            .json(&payload)
            .send()
            .await?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "tutor upstream rejected request");
            return Err(TutorError::HttpStatus(response.status()));
        }

        let body: ChatResponse = response.json().await?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or(TutorError::EmptyResponse)?;

        Ok(TutorReply {
            reply: content,
            model: body.model.unwrap_or_else(|| config.model.clone()),
        })
    }
}

fn system_prompt(course: Option<&Course>) -> String {
    match course {
        Some(course) => format!(
            "{BASE_PROMPT} The student is studying {} ({}).",
            course.code(),
            course.title()
        ),
        None => BASE_PROMPT.to_string(),
    }
}

fn build_messages(course: Option<&Course>, history: &[ChatTurn], message: &str) -> Vec<ChatMessage> {
    let skip = history.len().saturating_sub(MAX_HISTORY_TURNS);
    let mut messages = Vec::with_capacity(history.len() - skip + 2);
    messages.push(ChatMessage {
        role: "system",
        content: system_prompt(course),
    });
    for turn in &history[skip..] {
        messages.push(ChatMessage {
            role: match turn.role {
                TurnRole::User => "user",
                TurnRole::Assistant => "assistant",
            },
            content: turn.content.clone(),
        });
    }
    messages.push(ChatMessage {
        role: "user",
        content: message.to_string(),
    });
    messages
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use study_core::model::{CourseDraft, UserId};
    use study_core::time::fixed_now;

    fn course() -> Course {
        Course::new(
            CourseId::new(1),
            CourseDraft {
                code: "CSC301".into(),
                title: "Data Structures".into(),
                description: None,
                department: None,
                level: None,
                semester: None,
            },
            UserId::new(1),
            fixed_now(),
        )
        .unwrap()
    }

    #[test]
    fn system_prompt_names_the_course() {
        let prompt = system_prompt(Some(&course()));
        assert!(prompt.ends_with("The student is studying CSC301 (Data Structures)."));
        assert_eq!(system_prompt(None), BASE_PROMPT);
    }

    #[test]
    fn history_is_trimmed_to_the_latest_turns() {
        let history: Vec<ChatTurn> = (0..30)
            .map(|i| ChatTurn {
                role: if i % 2 == 0 {
                    TurnRole::User
                } else {
                    TurnRole::Assistant
                },
                content: format!("turn {i}"),
            })
            .collect();
        let messages = build_messages(None, &history, "next");
        assert_eq!(messages.len(), MAX_HISTORY_TURNS + 2);
        assert_eq!(messages[0].role, "system");
        assert_eq!(messages[1].content, "turn 10");
        assert_eq!(messages[1].role, "user");
        assert_eq!(messages.last().unwrap().content, "next");
    }

    #[test]
    fn chat_response_parses_without_model() {
        let body: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":" hi "}}]}"#).unwrap();
        assert!(body.model.is_none());
        assert_eq!(body.choices[0].message.content.as_deref(), Some(" hi "));
    }

    #[test]
    fn config_requires_a_non_blank_key() {
        assert!(TutorConfig::from_lookup(|_| None).is_none());
        assert!(
            TutorConfig::from_lookup(|k| (k == "STUDY_AI_API_KEY").then(|| "  ".to_string()))
                .is_none()
        );
        let config =
            TutorConfig::from_lookup(|k| (k == "STUDY_AI_API_KEY").then(|| "sk-test".to_string()))
                .unwrap();
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert_eq!(config.model, "gpt-4o-mini");
    }
}
