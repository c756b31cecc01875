//! HTTP grading transport.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::instrument;
use uuid::Uuid;

use lessonquiz_core::error::{PolicyViolation, SubmitError, ValidationError};
use lessonquiz_core::model::{AnswerEntry, GradeResult};
use lessonquiz_core::traits::{GradeTransport, SubmitRequest};

use crate::config::ClientConfig;

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const IDEMPOTENCY_HEADER: &str = "Idempotency-Key";

/// Submits attempts to `POST {base}/lessons/{lessonId}/quiz/submit`.
///
/// The attempt id travels in the body and as the idempotency key, so a
/// resent request can never produce a second graded attempt.
pub struct HttpTransport {
    base_url: String,
    token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(base_url: &str, token: Option<String>, timeout: Option<Duration>) -> Result<Self> {
        let timeout = timeout.unwrap_or(Duration::from_secs(DEFAULT_TIMEOUT_SECS));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.filter(|t| !t.is_empty()),
            timeout,
            client,
        })
    }

    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        let server_url = config
            .server_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .context("no server_url configured (set it in lessonquiz.toml or LESSONQUIZ_SERVER)")?;
        Self::new(
            server_url,
            config.token.clone(),
            Some(Duration::from_secs(config.timeout_secs)),
        )
    }

    fn submit_url(&self, lesson_id: &str) -> String {
        format!("{}/lessons/{}/quiz/submit", self.base_url, lesson_id)
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitBody<'a> {
    attempt_id: Uuid,
    answers: &'a [AnswerEntry],
}

/// Response envelope used by the grading service for every status.
#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    data: Option<GradeResult>,
}

#[async_trait]
impl GradeTransport for HttpTransport {
    fn name(&self) -> &str {
        "http"
    }

    #[instrument(skip(self, request), fields(lesson = %request.lesson_id, attempt = %request.attempt_id))]
    async fn submit(&self, request: &SubmitRequest) -> Result<GradeResult, SubmitError> {
        let body = SubmitBody {
            attempt_id: request.attempt_id,
            answers: &request.answers,
        };

        let mut builder = self
            .client
            .post(self.submit_url(&request.lesson_id))
            .header(IDEMPOTENCY_HEADER, request.attempt_id.to_string())
            .json(&body);
        if let Some(token) = &self.token {
            builder = builder.bearer_auth(token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                SubmitError::Network(format!(
                    "request timed out after {}s",
                    self.timeout.as_secs()
                ))
            } else {
                SubmitError::Network(e.to_string())
            }
        })?;

        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| SubmitError::Network(format!("failed to read response: {e}")))?;
        let envelope = serde_json::from_str::<Envelope>(&text).ok();
        let message = || {
            envelope
                .as_ref()
                .and_then(|e| e.message.clone())
                .unwrap_or_else(|| text.clone())
        };

        match status {
            200..=299 => envelope
                .as_ref()
                .and_then(|e| e.data.clone())
                .ok_or_else(|| SubmitError::Server {
                    status,
                    message: format!("response carried no grade: {text}"),
                }),
            409 => match envelope.as_ref().and_then(|e| e.data.clone()) {
                Some(original) => {
                    tracing::info!("server reports attempt already graded");
                    Err(SubmitError::AlreadySubmitted(Box::new(original)))
                }
                None => Err(SubmitError::Server {
                    status,
                    message: message(),
                }),
            },
            400 | 422 => Err(ValidationError::Malformed(message()).into()),
            403 | 429 => Err(PolicyViolation::Refused(message()).into()),
            404 => Err(SubmitError::AttemptNotFound(request.attempt_id)),
            _ => {
                tracing::warn!(status, "grading service returned an error");
                Err(SubmitError::Server {
                    status,
                    message: message(),
                })
            }
        }
    }
}
