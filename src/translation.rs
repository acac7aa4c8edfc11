//! Protected translation handler.

use crate::payload::{ErrorPayload, STATUS_INTERNAL_ERROR};
use crate::pipeline::{Pipeline, PipelineError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

/// How long a translation stays cached.
pub const DEFAULT_CACHE_TTL: Duration = Duration::from_secs(3600);

/// Translation failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslationError {
    /// The request was malformed. Never reaches the pipeline.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// The translator failed.
    #[error("Translation failed: {0}")]
    Failed(String),
}

impl TranslationError {
    /// 400 for a malformed request, 500 for a translator failure.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::InvalidRequest(_) => 400,
            Self::Failed(_) => STATUS_INTERNAL_ERROR,
        }
    }

    /// Error body with the failure detail.
    pub fn payload(&self) -> ErrorPayload {
        match self {
            Self::InvalidRequest(details) => ErrorPayload::failed("Invalid request", details.clone()),
            Self::Failed(details) => ErrorPayload::failed("Translation failed", details.clone()),
        }
    }
}

/// Status and body for any error [`TranslationService::translate`] returns.
pub fn error_response(err: &PipelineError<TranslationError>) -> (u16, ErrorPayload) {
    match err {
        PipelineError::Operation(e) => (e.status_code(), e.payload()),
        rejected => match (rejected.status_code(), rejected.payload()) {
            (Some(status), Some(payload)) => (status, payload),
            _ => (STATUS_INTERNAL_ERROR, ErrorPayload::failed("Translation failed", rejected.to_string())),
        },
    }
}

fn default_source_lang() -> String {
    "auto".to_string()
}

fn default_target_lang() -> String {
    "en".to_string()
}

/// Inbound request body: `{"text": "...", "sourceLang": "auto", "targetLang": "en"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationRequest {
    /// Text to translate. Must not be blank.
    pub text: String,
    /// Source language code, `auto` to detect.
    #[serde(rename = "sourceLang", alias = "source_lang", default = "default_source_lang")]
    pub source_lang: String,
    /// Target language code.
    #[serde(rename = "targetLang", alias = "target_lang", default = "default_target_lang")]
    pub target_lang: String,
}

impl TranslationRequest {
    /// Request from `auto` into `en`.
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            source_lang: default_source_lang(),
            target_lang: default_target_lang(),
        }
    }

    /// Set the source language.
    pub fn with_source_lang(mut self, lang: impl Into<String>) -> Self {
        self.source_lang = lang.into();
        self
    }

    /// Set the target language.
    pub fn with_target_lang(mut self, lang: impl Into<String>) -> Self {
        self.target_lang = lang.into();
        self
    }

    /// Cache key: `translation:{text}:{source_lang}:{target_lang}`.
    pub fn cache_key(&self) -> String {
        format!("translation:{}:{}:{}", self.text, self.source_lang, self.target_lang)
    }
}

/// Outbound response body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TranslationResponse {
    /// The original text.
    pub text: String,
    /// The translator's output.
    pub translated: String,
    /// Source language as requested.
    pub source_lang: String,
    /// Target language as requested.
    pub target_lang: String,
}

/// A translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source_lang` into `target_lang`.
    async fn translate(&self, text: &str, source_lang: &str, target_lang: &str) -> Result<String, TranslationError>;
}

/// Placeholder backend that prefixes the input.
#[derive(Debug, Clone, Copy, Default)]
pub struct EchoTranslator;

#[async_trait]
impl Translator for EchoTranslator {
    async fn translate(&self, text: &str, _source_lang: &str, _target_lang: &str) -> Result<String, TranslationError> {
        Ok(format!("Translated: {}", text))
    }
}

/// The translation endpoint behind a [`Pipeline`].
#[derive(Clone)]
pub struct TranslationService {
    pipeline: Pipeline,
    translator: Arc<dyn Translator>,
    cache_ttl: Duration,
}

impl TranslationService {
    /// Service using [`EchoTranslator`].
    pub fn new(pipeline: Pipeline) -> Self {
        Self::with_translator(pipeline, Arc::new(EchoTranslator))
    }

    /// Service using a custom backend.
    pub fn with_translator(pipeline: Pipeline, translator: Arc<dyn Translator>) -> Self {
        Self {
            pipeline,
            translator,
            cache_ttl: DEFAULT_CACHE_TTL,
        }
    }

    /// Override how long translations stay cached.
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache_ttl = ttl;
        self
    }

    /// The pipeline every translation runs behind.
    pub fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Translate `request` on behalf of `client_key`.
    ///
    /// # Errors
    ///
    /// Rejections from the pipeline, an empty `text`, or a translator failure.
    pub async fn translate(
        &self,
        client_key: &str,
        request: TranslationRequest,
    ) -> Result<TranslationResponse, PipelineError<TranslationError>> {
        if request.text.trim().is_empty() {
            return Err(PipelineError::Operation(TranslationError::InvalidRequest(
                "text must not be empty".to_string(),
            )));
        }

        let cache_key = request.cache_key();
        debug!(client = client_key, key = %cache_key, "Translation requested");

        let translator = Arc::clone(&self.translator);
        let result = self
            .pipeline
            .execute(client_key, &cache_key, self.cache_ttl, move || async move {
                let translated = translator
                    .translate(&request.text, &request.source_lang, &request.target_lang)
                    .await?;
                Ok::<_, TranslationError>(TranslationResponse {
                    text: request.text,
                    translated,
                    source_lang: request.source_lang,
                    target_lang: request.target_lang,
                })
            })
            .await;

        if let Err(PipelineError::Operation(e)) = &result {
            error!(client = client_key, error = %e, "Translation failed");
        }
        result
    }
}

impl std::fmt::Debug for TranslationService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TranslationService")
            .field("pipeline", &self.pipeline)
            .field("cache_ttl", &self.cache_ttl)
            .finish()
    }
}
