use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::routing::post;
use axum::{Json, Router};

use crate::config::AppConfig;
use crate::models::ModelInfo;

type Script = dyn Fn(&str, usize) -> (u16, serde_json::Value) + Send + Sync;

#[derive(Clone, Debug)]
pub struct Hit {
  pub model: String,
  pub authorization: Option<String>,
  pub referer: Option<String>,
  pub title: Option<String>,
  pub body: serde_json::Value,
}

struct MockState {
  script: Box<Script>,
  hits: Mutex<Vec<Hit>>,
}

/// Scripted chat-completions upstream. The script gets the model name and how many
/// earlier calls that model has received.
pub struct MockUpstream {
  addr: SocketAddr,
  state: Arc<MockState>,
}

impl MockUpstream {
  pub async fn start<F>(script: F) -> Self
  where
    F: Fn(&str, usize) -> (u16, serde_json::Value) + Send + Sync + 'static,
  {
    let state = Arc::new(MockState {
      script: Box::new(script),
      hits: Mutex::new(Vec::new()),
    });
    let app = Router::new()
      .route("/v1/chat/completions", post(completions))
      .with_state(state.clone());
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
      let _ = axum::serve(listener, app).await;
    });
    Self { addr, state }
  }

  pub fn endpoint(&self) -> String {
    format!("http://{}/v1/chat/completions", self.addr)
  }

  pub fn hits(&self) -> Vec<Hit> {
    self.state.hits.lock().unwrap().clone()
  }

  pub fn hit_count(&self) -> usize {
    self.state.hits.lock().unwrap().len()
  }

  pub fn hits_for(&self, model: &str) -> usize {
    self.hits().iter().filter(|h| h.model == model).count()
  }
}

async fn completions(
  State(state): State<Arc<MockState>>,
  headers: HeaderMap,
  Json(body): Json<serde_json::Value>,
) -> (StatusCode, Json<serde_json::Value>) {
  let header = |name: &str| headers.get(name).and_then(|v| v.to_str().ok()).map(str::to_string);
  let model = body["model"].as_str().unwrap_or_default().to_string();

  let nth = {
    let mut hits = state.hits.lock().unwrap();
    let nth = hits.iter().filter(|h| h.model == model).count();
    hits.push(Hit {
      model: model.clone(),
      authorization: header("authorization"),
      referer: header("http-referer"),
      title: header("x-title"),
      body,
    });
    nth
  };

  let (status, reply) = (state.script)(&model, nth);
  (StatusCode::from_u16(status).unwrap(), Json(reply))
}

pub fn chat_reply(content: &str) -> serde_json::Value {
  serde_json::json!({ "choices": [{ "message": { "role": "assistant", "content": content } }] })
}

/// Three candidates, three attempts each, no backoff wait.
pub fn test_config(endpoint: &str) -> AppConfig {
  let candidate = |id: &str| ModelInfo {
    id: id.to_string(),
    label: id.to_string(),
    capability: "vision".to_string(),
  };
  AppConfig {
    endpoint: endpoint.to_string(),
    candidate_models: vec![candidate("model-a"), candidate("model-b"), candidate("model-c")],
    backoff_base_ms: 0,
    request_timeout_secs: 5,
    ..AppConfig::default()
  }
}
