use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExtractionError {
  /// HTTP >= 500, transport failure, or a success body without message content.
  #[error("upstream failure on {model}: {detail}")]
  TransientUpstream {
    model: String,
    status: Option<u16>,
    detail: String,
  },
  #[error("rate limited on {model}")]
  RateLimited { model: String },
  #[error("request rejected by {model} ({status}): {detail}")]
  NonRetryableRequest {
    model: String,
    status: u16,
    detail: String,
  },
  #[error("all candidate models failed after {attempts} attempts; last error: {last}")]
  ExhaustedCandidates {
    attempts: usize,
    last: Box<ExtractionError>,
  },
  #[error("no candidate models configured")]
  NoCandidates,
  #[error("OpenRouter key missing. Set OPENROUTER_API_KEY or store it in the keyring.")]
  MissingCredential,
}

impl ExtractionError {
  pub fn status(&self) -> Option<u16> {
    match self {
      ExtractionError::TransientUpstream { status, .. } => *status,
      ExtractionError::RateLimited { .. } => Some(429),
      ExtractionError::NonRetryableRequest { status, .. } => Some(*status),
      ExtractionError::ExhaustedCandidates { last, .. } => last.status(),
      ExtractionError::NoCandidates | ExtractionError::MissingCredential => None,
    }
  }
}

#[derive(Debug, Error)]
pub enum NormalizeError {
  #[error("model output is not valid JSON: {0}")]
  MalformedOutput(String),
  #[error("expected a {expected} payload, got {actual}")]
  UnexpectedPayload {
    expected: &'static str,
    actual: &'static str,
  },
}

#[derive(Debug, Error)]
pub enum RecommendError {
  #[error("No room data available for recommendations")]
  NoRoomContext,
  #[error(transparent)]
  Extraction(#[from] ExtractionError),
  #[error(transparent)]
  Normalize(#[from] NormalizeError),
}

#[derive(Debug, Error)]
pub enum AnalysisError {
  #[error(transparent)]
  Extraction(#[from] ExtractionError),
  #[error(transparent)]
  Normalize(#[from] NormalizeError),
  #[error(transparent)]
  Storage(#[from] anyhow::Error),
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn exhausted_error_carries_last_cause() {
    let err = ExtractionError::ExhaustedCandidates {
      attempts: 9,
      last: Box::new(ExtractionError::TransientUpstream {
        model: "m3".to_string(),
        status: Some(503),
        detail: "unavailable".to_string(),
      }),
    };
    assert_eq!(err.status(), Some(503));
    let message = err.to_string();
    assert!(message.contains("9 attempts"));
    assert!(message.contains("m3"));
  }
}
