// src/services/enrichment.rs

//! Post enrichment: tag classification and lookup-or-create of enrichment records.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use unicode_segmentation::UnicodeSegmentation;

use crate::error::{AppError, Result};
use crate::models::{EnrichmentConfig, EnrichmentRecord, PostKey};
use crate::storage::{DocumentStore, ENRICHMENT_COLLECTION, TAG_COLLECTION, document_id};

/// Answer stored until a real one is generated.
pub const DEFAULT_ANSWER: &str = "답변 생성 대기 중";

/// Tag used when classification is unavailable.
pub const DEFAULT_TAG: &str = "기타";

const TAGGER_PROMPT: &str = "너는 게시물 태그 분석 전문가야. \
[] 사이의 글을 읽고 태그로 나눠. 예를 들어 정치, IT, 연애, 핫딜 같은 식으로. \
반드시 [\"연애\",\"유머\",\"핫딜\"] 형식의 JSON 배열만 반환해.";

/// External classification step returning tags for a post text.
#[async_trait]
pub trait Enricher: Send + Sync {
    async fn classify(&self, text: &str) -> Result<Vec<String>>;
}

/// Enricher that always answers with the default tag.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlaceholderEnricher;

#[async_trait]
impl Enricher for PlaceholderEnricher {
    async fn classify(&self, _text: &str) -> Result<Vec<String>> {
        Ok(vec![DEFAULT_TAG.to_string()])
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

/// Tagger backed by an OpenAI-compatible chat-completions endpoint.
pub struct ChatTagger {
    client: Client,
    api_base: String,
    model: String,
    api_key: String,
}

impl ChatTagger {
    pub fn new(
        client: Client,
        api_base: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into(),
            model: model.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from config, reading the key from the configured environment variable.
    pub fn from_config(client: Client, config: &EnrichmentConfig) -> Result<Self> {
        let api_key = std::env::var(&config.api_key_env).map_err(|_| {
            AppError::config(format!("{} is not set", config.api_key_env))
        })?;
        Ok(Self::new(client, &config.api_base, &config.model, api_key))
    }
}

#[async_trait]
impl Enricher for ChatTagger {
    async fn classify(&self, text: &str) -> Result<Vec<String>> {
        let url = format!("{}/chat/completions", self.api_base.trim_end_matches('/'));
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: Some(TAGGER_PROMPT.to_string()),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: Some(format!("[{text}]")),
                },
            ],
            temperature: 0.0,
        };

        log::debug!("Tag classification request to {} ({})", url, self.model);
        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::enrichment(format!(
                "chat completion failed ({status}): {body}"
            )));
        }

        let response: ChatResponse = response.json().await?;
        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| AppError::enrichment("empty chat completion"))?;

        parse_tags(&content)
    }
}

/// Parse a JSON tag array (or `{"tags": [...]}`), tolerating code fences.
pub fn parse_tags(content: &str) -> Result<Vec<String>> {
    let trimmed = content.trim();
    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.strip_suffix("```"))
        .unwrap_or(trimmed)
        .trim();

    let value: Value = serde_json::from_str(unfenced)
        .map_err(|e| AppError::enrichment(format!("unparsable tags '{unfenced}': {e}")))?;
    let items = match value {
        Value::Array(items) => items,
        Value::Object(mut fields) => match fields.remove("tags") {
            Some(Value::Array(items)) => items,
            _ => return Err(AppError::enrichment("no tags array in response")),
        },
        _ => return Err(AppError::enrichment("tags response is not an array")),
    };

    let mut tags: Vec<String> = Vec::new();
    for tag in items.iter().filter_map(Value::as_str).map(str::trim) {
        if !tag.is_empty() && !tags.iter().any(|t| t == tag) {
            tags.push(tag.to_string());
        }
    }
    Ok(tags)
}

/// Truncate to at most `max` grapheme clusters.
fn truncate_graphemes(text: &str, max: usize) -> String {
    text.graphemes(true).take(max).collect()
}

/// Lookup-or-create of enrichment records keyed by `(board_id, site)`.
pub struct EnrichmentResolver<'a> {
    store: &'a dyn DocumentStore,
    enricher: &'a dyn Enricher,
    max_chars: usize,
}

impl<'a> EnrichmentResolver<'a> {
    pub fn new(store: &'a dyn DocumentStore, enricher: &'a dyn Enricher, max_chars: usize) -> Self {
        Self {
            store,
            enricher,
            max_chars,
        }
    }

    /// Identifier of the enrichment record for `key`, creating it if absent.
    ///
    /// Classification failures fall back to the default tag and never fail
    /// the call; only store errors do.
    pub async fn resolve(&self, key: &PostKey, text: &str) -> Result<String> {
        let filter = json!({
            "board_id": key.board_id(),
            "site": key.site,
        });

        let existing = self.store.find(ENRICHMENT_COLLECTION, &filter).await?;
        if let Some(id) = existing.first().and_then(document_id) {
            log::debug!("Reusing enrichment {} for {}", id, key);
            return Ok(id);
        }

        let input = truncate_graphemes(text, self.max_chars);
        let tags = match self.enricher.classify(&input).await {
            Ok(tags) if !tags.is_empty() => tags,
            Ok(_) => vec![DEFAULT_TAG.to_string()],
            Err(e) => {
                log::warn!("Tag classification failed for {}: {}. Using default tag.", key, e);
                vec![DEFAULT_TAG.to_string()]
            }
        };

        for tag in &tags {
            if let Err(e) = self.register_tag(tag).await {
                log::warn!("Failed to register tag '{}': {}", tag, e);
            }
        }

        let record = EnrichmentRecord {
            board_id: key.board_id(),
            site: key.site,
            answer: DEFAULT_ANSWER.to_string(),
            tag: tags,
        };
        let id = self
            .store
            .insert_one(ENRICHMENT_COLLECTION, serde_json::to_value(&record)?)
            .await?;
        log::debug!("Created enrichment {} for {}", id, key);
        Ok(id)
    }

    async fn register_tag(&self, tag: &str) -> Result<()> {
        let filter = json!({ "name": tag });
        if self.store.find(TAG_COLLECTION, &filter).await?.is_empty() {
            self.store.insert_one(TAG_COLLECTION, filter).await?;
        }
        Ok(())
    }
}
