use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::models::ModelInfo;

pub const OPENROUTER_ENDPOINT: &str = "https://openrouter.ai/api/v1/chat/completions";

#[derive(Serialize, Deserialize, Clone, Debug)]
#[serde(default)]
pub struct AppConfig {
  pub endpoint: String,
  pub referer: String,
  pub title: String,
  pub candidate_models: Vec<ModelInfo>,
  pub attempts_per_model: u32,
  pub backoff_base_ms: u64,
  pub temperature: f32,
  pub request_timeout_secs: u64,
  pub bind_addr: String,
  pub catalog_path: String,
  pub room_size_feet: f64,
}

impl Default for AppConfig {
  fn default() -> Self {
    Self {
      endpoint: OPENROUTER_ENDPOINT.to_string(),
      referer: "http://localhost:3000".to_string(),
      title: "Voxel Room Architect".to_string(),
      candidate_models: vec![
        ModelInfo {
          id: "openrouter:google/gemini-3-flash-preview".to_string(),
          label: "Gemini 3 Flash".to_string(),
          capability: "vision".to_string(),
        },
        ModelInfo {
          id: "openrouter:meta-llama/llama-3.2-90b-vision-instruct:free".to_string(),
          label: "Llama 3.2 90B (vision)".to_string(),
          capability: "vision".to_string(),
        },
        ModelInfo {
          id: "openrouter:anthropic/claude-3.5-sonnet".to_string(),
          label: "Claude 3.5 Sonnet".to_string(),
          capability: "vision".to_string(),
        },
      ],
      attempts_per_model: 3,
      backoff_base_ms: 1000,
      temperature: 0.7,
      request_timeout_secs: 120,
      bind_addr: "127.0.0.1:3000".to_string(),
      catalog_path: "marketplace-products.json".to_string(),
      room_size_feet: 12.0,
    }
  }
}

/// Attempt budget and backoff schedule applied to each candidate model.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RetryPolicy {
  pub attempts: u32,
  pub base_delay: Duration,
}

impl RetryPolicy {
  /// Wait before attempt `attempt` (0-based): `base * 2^attempt`, none before the first.
  pub fn delay_for(&self, attempt: u32) -> Duration {
    if attempt == 0 {
      return Duration::ZERO;
    }
    self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
  }
}

impl AppConfig {
  pub fn retry_policy(&self) -> RetryPolicy {
    RetryPolicy {
      attempts: self.attempts_per_model.max(1),
      base_delay: Duration::from_millis(self.backoff_base_ms),
    }
  }

  pub fn model_ids(&self) -> Vec<String> {
    self.candidate_models.iter().map(|m| m.id.clone()).collect()
  }
}

pub fn load_or_init(path: &Path) -> anyhow::Result<AppConfig> {
  if path.exists() {
    let data = std::fs::read_to_string(path)
      .with_context(|| format!("reading config {}", path.display()))?;
    let config: AppConfig = serde_json::from_str(&data)
      .with_context(|| format!("parsing config {}", path.display()))?;
    Ok(config)
  } else {
    let config = AppConfig::default();
    save_config(path, &config)?;
    Ok(config)
  }
}

pub fn save_config(path: &Path, config: &AppConfig) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(config)?;
  std::fs::write(path, json).with_context(|| format!("writing config {}", path.display()))?;
  Ok(())
}
