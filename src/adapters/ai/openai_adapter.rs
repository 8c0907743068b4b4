//! OpenAI-compatible symptom classifier.
//!
//! Supports OpenAI API, Azure OpenAI, and local Ollama instances.
//! Implements `ClassifierPort` with markdown stripping before JSON parsing.
//! Output is advisory: the triage service validates it and ignores it on failure.

use crate::domain::{Category, ClassifierOutput, DomainError, LanguageCode};
use crate::ports::ClassifierPort;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// OpenAI-compatible classifier adapter.
///
/// Can be configured to work with:
/// - OpenAI API (api.openai.com)
/// - Azure OpenAI
/// - Ollama (localhost)
/// - Any OpenAI-compatible API
pub struct OpenAiClassifier {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClassifier {
    /// Create a new classifier adapter.
    ///
    /// # Arguments
    /// * `api_url` - API endpoint (e.g., "https://api.openai.com/v1/chat/completions")
    /// * `api_key` - API key (can be empty for local Ollama)
    /// * `model` - Model name (e.g., "gpt-4o-mini", "llama3.2")
    pub fn new(api_url: String, api_key: String, model: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url,
            api_key,
            model,
        }
    }

    /// System prompt listing the closed category set and the JSON schema.
    fn system_prompt() -> String {
        let codes: Vec<&str> = Category::ALL.iter().map(|c| c.code()).collect();
        format!(
            r#"You classify a patient's own description of their symptoms for a first-aid triage tool.
You do not diagnose.

## Your Task
1. Pick exactly one category code from: {codes}.
   Use GENERAL when nothing else fits.
2. List red flags: short phrases for signs that need emergency care right now
   (e.g. "not breathing", "unconscious", "stroke signs"). Use an empty list when there are none.
3. Extract how long the symptoms have lasted, if the text says so.

## Output Format
You MUST respond with valid JSON only. No markdown, no explanations outside JSON.

```json
{{
  "category": "CHEST",
  "red_flags": ["pain spreading to left arm"],
  "duration": "2 hours (or null)"
}}
```"#,
            codes = codes.join(", ")
        )
    }

    fn user_prompt(text: &str, language: &LanguageCode) -> String {
        format!(
            "Language: {}\nPatient description:\n{}",
            language, text
        )
    }

    /// Sanitize JSON response from LLM.
    ///
    /// LLMs sometimes wrap JSON in markdown code blocks. This strips them.
    fn sanitize_json(raw_text: &str) -> String {
        let trimmed = raw_text.trim();

        // ```json ... ``` or ``` ... ```
        if trimmed.starts_with("```") {
            let without_prefix = trimmed
                .strip_prefix("```json")
                .or_else(|| trimmed.strip_prefix("```"))
                .unwrap_or(trimmed);

            if let Some(end_idx) = without_prefix.rfind("```") {
                return without_prefix[..end_idx].trim().to_string();
            }
            return without_prefix.trim().to_string();
        }

        // Prose around a bare object
        if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}')) {
            if start < end {
                return trimmed[start..=end].to_string();
            }
        }

        trimmed.to_string()
    }
}

/// OpenAI API request structure.
#[derive(Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// OpenAI API response structure.
#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: MessageContent,
}

#[derive(Deserialize)]
struct MessageContent {
    content: String,
}

#[async_trait::async_trait]
impl ClassifierPort for OpenAiClassifier {
    async fn classify(
        &self,
        text: &str,
        language: &LanguageCode,
    ) -> Result<ClassifierOutput, DomainError> {
        info!(
            text_len = text.len(),
            language = %language,
            "sending symptoms to classifier"
        );

        let request = ChatRequest {
            model: self.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Self::system_prompt(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Self::user_prompt(text, language),
                },
            ],
            temperature: 0.0,
            response_format: Some(ResponseFormat {
                format_type: "json_object".to_string(),
            }),
        };

        let response = self
            .client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .await
            .map_err(|e| DomainError::DependencyUnavailable(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            warn!(status = %status, body = %text, "classifier API returned error");
            return Err(DomainError::DependencyUnavailable(format!(
                "API error {}: {}",
                status,
                text.chars().take(200).collect::<String>()
            )));
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            DomainError::DependencyUnavailable(format!("Failed to parse API response: {}", e))
        })?;

        let raw_content = chat_response
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .ok_or_else(|| {
                DomainError::DependencyUnavailable("No response choices returned".to_string())
            })?;

        debug!(raw_len = raw_content.len(), "received classifier response");

        let clean_json = Self::sanitize_json(&raw_content);
        let output: ClassifierOutput = serde_json::from_str(&clean_json).map_err(|e| {
            warn!(error = %e, json = %clean_json.chars().take(200).collect::<String>(), "JSON parse failed");
            DomainError::DependencyUnavailable(format!("Failed to parse LLM JSON: {}", e))
        })?;

        info!(
            category = output.category.as_deref().unwrap_or("-"),
            red_flags = output.red_flags.len(),
            "classification complete"
        );

        Ok(output)
    }
}
