use std::future::Future;
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use reqwest::StatusCode;
use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crate::config::{AppConfig, RetryPolicy};
use crate::error::ExtractionError;
use crate::models::ModelRequest;

const PROVIDER_PREFIX: &str = "openrouter:";
const DETAIL_LIMIT: usize = 200;

/// Calls the chat-completions endpoint, walking the candidate models in order.
pub struct ExtractionClient {
  http: reqwest::Client,
  endpoint: String,
  attribution: HeaderMap,
  api_key: Option<String>,
  candidates: Vec<String>,
  policy: RetryPolicy,
  temperature: f32,
}

#[derive(Serialize, Debug, Clone, PartialEq)]
struct ChatMessage {
  role: String,
  content: serde_json::Value,
}

#[derive(Serialize)]
struct ResponseFormat {
  #[serde(rename = "type")]
  kind: &'static str,
}

#[derive(Serialize)]
struct ChatPayload<'a> {
  model: &'a str,
  messages: &'a [ChatMessage],
  temperature: f32,
  #[serde(skip_serializing_if = "Option::is_none")]
  response_format: Option<ResponseFormat>,
}

/// Per-candidate progress. Only `Trying` issues a call; every other state hands over
/// to the next candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CandidateState {
  Trying(u32),
  RateLimited,
  ServerErrorExhausted,
  Terminal,
}

fn next_state(err: &ExtractionError, attempt: u32, budget: u32) -> CandidateState {
  match err {
    ExtractionError::RateLimited { .. } => CandidateState::RateLimited,
    ExtractionError::TransientUpstream { .. } if attempt + 1 < budget => CandidateState::Trying(attempt + 1),
    ExtractionError::TransientUpstream { .. } => CandidateState::ServerErrorExhausted,
    _ => CandidateState::Terminal,
  }
}

/// Runs `call` against each candidate in order until one returns content. Backoff
/// sleeps on the calling task before every retry of the same model.
async fn walk_candidates<'a, F, Fut>(
  candidates: &'a [String],
  policy: &RetryPolicy,
  mut call: F,
) -> Result<String, ExtractionError>
where
  F: FnMut(&'a str) -> Fut,
  Fut: Future<Output = Result<String, ExtractionError>>,
{
  let mut attempts = 0usize;
  let mut last_error = None;

  for model_id in candidates {
    let model = upstream_model(model_id);
    let mut state = CandidateState::Trying(0);

    while let CandidateState::Trying(attempt) = state {
      let delay = policy.delay_for(attempt);
      if !delay.is_zero() {
        debug!(model, attempt, delay_ms = delay.as_millis() as u64, "backing off");
        tokio::time::sleep(delay).await;
      }

      attempts += 1;
      match call(model).await {
        Ok(content) => {
          info!(model, attempt, attempts, "model call succeeded");
          return Ok(content);
        }
        Err(err) => {
          state = next_state(&err, attempt, policy.attempts);
          warn!(model, attempt, status = ?err.status(), next = ?state, "model call failed: {err}");
          last_error = Some(err);
        }
      }
    }
  }

  Err(ExtractionError::ExhaustedCandidates {
    attempts,
    last: Box::new(last_error.unwrap_or(ExtractionError::NoCandidates)),
  })
}

impl ExtractionClient {
  pub fn new(config: &AppConfig, api_key: Option<String>) -> anyhow::Result<Self> {
    let http = reqwest::Client::builder()
      .timeout(Duration::from_secs(config.request_timeout_secs))
      .build()?;

    let mut attribution = HeaderMap::new();
    attribution.insert("HTTP-Referer", HeaderValue::from_str(&config.referer)?);
    attribution.insert("X-Title", HeaderValue::from_str(&config.title)?);

    Ok(Self {
      http,
      endpoint: config.endpoint.clone(),
      attribution,
      api_key: api_key.filter(|k| !k.trim().is_empty()),
      candidates: config.model_ids(),
      policy: config.retry_policy(),
      temperature: config.temperature,
    })
  }

  pub async fn invoke(&self, request: &ModelRequest) -> Result<String, ExtractionError> {
    self.invoke_with(request, None).await
  }

  /// Like [`invoke`](Self::invoke); a caller-supplied bearer token replaces the configured key.
  #[instrument(name = "model_invoke", skip_all, fields(kind = request.kind.as_str(), request_id = %uuid::Uuid::new_v4()))]
  pub async fn invoke_with(
    &self,
    request: &ModelRequest,
    bearer: Option<&str>,
  ) -> Result<String, ExtractionError> {
    if self.candidates.is_empty() {
      return Err(ExtractionError::NoCandidates);
    }
    let key = bearer
      .filter(|t| !t.trim().is_empty())
      .or(self.api_key.as_deref())
      .ok_or(ExtractionError::MissingCredential)?;
    let mut auth = HeaderValue::from_str(&format!("Bearer {}", key.trim()))
      .map_err(|_| ExtractionError::MissingCredential)?;
    auth.set_sensitive(true);

    let messages = build_messages(request);
    walk_candidates(&self.candidates, &self.policy, |model| {
      self.attempt(model, &messages, request.json_mode, &auth)
    })
    .await
  }

  async fn attempt(
    &self,
    model: &str,
    messages: &[ChatMessage],
    json_mode: bool,
    auth: &HeaderValue,
  ) -> Result<String, ExtractionError> {
    let payload = ChatPayload {
      model,
      messages,
      temperature: self.temperature,
      response_format: json_mode.then_some(ResponseFormat { kind: "json_object" }),
    };

    let resp = self
      .http
      .post(&self.endpoint)
      .headers(self.attribution.clone())
      .header(AUTHORIZATION, auth.clone())
      .json(&payload)
      .send()
      .await
      .map_err(|err| ExtractionError::TransientUpstream {
        model: model.to_string(),
        status: None,
        detail: err.to_string(),
      })?;

    let status = resp.status();
    if !status.is_success() {
      let text = resp
        .text()
        .await
        .unwrap_or_else(|_| "OpenRouter request failed.".to_string());
      return Err(classify_status(model, status, &text));
    }

    let body = resp
      .json::<serde_json::Value>()
      .await
      .map_err(|err| ExtractionError::TransientUpstream {
        model: model.to_string(),
        status: Some(status.as_u16()),
        detail: format!("unreadable response body: {err}"),
      })?;

    match body["choices"][0]["message"]["content"].as_str() {
      Some(content) if !content.trim().is_empty() => Ok(content.to_string()),
      _ => Err(ExtractionError::TransientUpstream {
        model: model.to_string(),
        status: Some(status.as_u16()),
        detail: "No content in response".to_string(),
      }),
    }
  }
}

fn classify_status(model: &str, status: StatusCode, body: &str) -> ExtractionError {
  let detail: String = body.chars().take(DETAIL_LIMIT).collect();
  if status == StatusCode::TOO_MANY_REQUESTS {
    ExtractionError::RateLimited {
      model: model.to_string(),
    }
  } else if status.is_server_error() {
    ExtractionError::TransientUpstream {
      model: model.to_string(),
      status: Some(status.as_u16()),
      detail,
    }
  } else {
    ExtractionError::NonRetryableRequest {
      model: model.to_string(),
      status: status.as_u16(),
      detail,
    }
  }
}

fn upstream_model(model_id: &str) -> &str {
  model_id.strip_prefix(PROVIDER_PREFIX).unwrap_or(model_id)
}

fn build_messages(request: &ModelRequest) -> Vec<ChatMessage> {
  let mut result = Vec::new();
  if let Some(system) = &request.system {
    result.push(ChatMessage {
      role: "system".to_string(),
      content: serde_json::json!(system),
    });
  }

  let text = request.user_text();
  let content = match &request.image {
    Some(img) => serde_json::json!([
      { "type": "text", "text": text },
      { "type": "image_url", "image_url": { "url": img.data_url() } }
    ]),
    None => serde_json::json!(text),
  };
  result.push(ChatMessage {
    role: "user".to_string(),
    content,
  });
  result
}
