use std::net::TcpListener;
use std::sync::Arc;
use std::time::Instant;

use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::http::{header::AUTHORIZATION, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use tokio::sync::Mutex;
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, warn};

use crate::analysis;
use crate::catalog::Catalog;
use crate::client::ExtractionClient;
use crate::config::AppConfig;
use crate::error::{AnalysisError, ExtractionError, RecommendError};
use crate::models::{
  AnalyzeRoomResponse, ImageData, LayoutRequest, ModelsResponse, ObjectImageRequest,
  RecommendRequest, RoomImageRequest,
};
use crate::normalize::furniture_descriptor;
use crate::placement::Layout;
use crate::recommend::{self, RoomContext};
use crate::storage;

const UPLOAD_LIMIT_BYTES: usize = 20 * 1024 * 1024;

pub struct RouterState {
  pub started_at: Instant,
  pub config: AppConfig,
  pub client: ExtractionClient,
  pub catalog: Catalog,
  pub db: Arc<Mutex<rusqlite::Connection>>,
}

pub fn app(state: RouterState) -> Router {
  Router::new()
    .route("/health", get(health))
    .route("/v1/models", get(models))
    .route("/api/analyze-room", post(analyze_room_upload))
    .route("/v1/layout", post(layout))
    .route("/v1/room", post(room))
    .route("/v1/object", post(object))
    .route("/v1/room-state", post(room_state_extract).get(room_state_cached))
    .route("/v1/recommend", post(recommend_products))
    .route("/v1/intent", post(intent))
    .layer(DefaultBodyLimit::max(UPLOAD_LIMIT_BYTES))
    .layer(CorsLayer::new().allow_origin(Any).allow_methods(Any).allow_headers(Any))
    .with_state(Arc::new(state))
}

pub async fn run_router(listener: TcpListener, state: RouterState) -> anyhow::Result<()> {
  listener.set_nonblocking(true)?;
  let listener = tokio::net::TcpListener::from_std(listener)?;
  info!(addr = %listener.local_addr()?, "router listening");
  axum::serve(listener, app(state)).await?;
  Ok(())
}

async fn health(State(state): State<Arc<RouterState>>) -> Json<serde_json::Value> {
  let uptime = state.started_at.elapsed().as_millis();
  Json(serde_json::json!({
    "status": "ok",
    "version": env!("CARGO_PKG_VERSION"),
    "uptime_ms": uptime
  }))
}

async fn models(State(state): State<Arc<RouterState>>) -> Json<ModelsResponse> {
  Json(ModelsResponse {
    candidates: state.config.candidate_models.clone(),
    attempts_per_model: state.config.attempts_per_model,
  })
}

async fn analyze_room_upload(State(state): State<Arc<RouterState>>, multipart: Multipart) -> Response {
  let image = match read_image_field(multipart).await {
    Ok(image) => image,
    Err(message) => return error_response(StatusCode::BAD_REQUEST, "image_missing", &message),
  };

  let analysis = analysis::analyze_furniture(&state.client, image).await;
  let body = match analysis.fallback_reason {
    None => AnalyzeRoomResponse {
      success: true,
      room_data: Some(analysis.descriptors),
      fallback_data: None,
      placements: analysis.placements,
      error: None,
    },
    Some(reason) => AnalyzeRoomResponse {
      success: false,
      room_data: None,
      fallback_data: Some(analysis.descriptors),
      placements: analysis.placements,
      error: Some(reason),
    },
  };
  (StatusCode::OK, Json(body)).into_response()
}

async fn read_image_field(mut multipart: Multipart) -> Result<ImageData, String> {
  while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
    if field.name() != Some("image") {
      continue;
    }
    let mime = field.content_type().unwrap_or("image/jpeg").to_string();
    if !mime.starts_with("image/") {
      return Err(format!("Unsupported upload type {mime}."));
    }
    let bytes = field.bytes().await.map_err(|e| e.to_string())?;
    if bytes.is_empty() {
      return Err("Uploaded image is empty.".to_string());
    }
    return Ok(ImageData::from_bytes(&mime, &bytes));
  }
  Err("No image uploaded.".to_string())
}

async fn layout(Json(req): Json<LayoutRequest>) -> Response {
  let mut descriptors: Vec<_> = req.items.iter().map(furniture_descriptor).collect();
  let mut layout = Layout::resolve(&descriptors);
  if let Some(index) = req.remove {
    if layout.remove(index).is_none() {
      return error_response(StatusCode::BAD_REQUEST, "index_out_of_range", "No placed item at that index.");
    }
    descriptors.remove(index);
  }
  let body = serde_json::json!({ "items": descriptors, "placements": layout.items() });
  (StatusCode::OK, Json(body)).into_response()
}

async fn room(State(state): State<Arc<RouterState>>, Json(req): Json<RoomImageRequest>) -> Response {
  let size = req.size_feet.unwrap_or(state.config.room_size_feet);
  match analysis::analyze_room(&state.client, req.image, size).await {
    Ok(room) => (StatusCode::OK, Json(room)).into_response(),
    Err(err) => analysis_error(err),
  }
}

async fn object(State(state): State<Arc<RouterState>>, Json(req): Json<ObjectImageRequest>) -> Response {
  let spawn = req.spawn_position.unwrap_or([0.0, 0.0, 0.0]);
  match analysis::analyze_single_object(&state.client, req.image, spawn).await {
    Ok(object) => (StatusCode::OK, Json(object)).into_response(),
    Err(err) => analysis_error(err),
  }
}

async fn room_state_extract(
  State(state): State<Arc<RouterState>>,
  Json(req): Json<RoomImageRequest>,
) -> Response {
  let size = req.size_feet.unwrap_or(state.config.room_size_feet);
  match analysis::extract_room_state(&state.client, &state.db, req.image, size).await {
    Ok(room_state) => (StatusCode::OK, Json(room_state)).into_response(),
    Err(err) => analysis_error(err),
  }
}

async fn room_state_cached(State(state): State<Arc<RouterState>>) -> Response {
  match storage::load_room_state(&state.db).await {
    Ok(Some(room_state)) => (StatusCode::OK, Json(room_state)).into_response(),
    Ok(None) => error_response(StatusCode::NOT_FOUND, "room_state_missing", "No room state cached yet."),
    Err(err) => error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage_failed", &err.to_string()),
  }
}

async fn recommend_products(
  State(state): State<Arc<RouterState>>,
  headers: HeaderMap,
  Json(req): Json<RecommendRequest>,
) -> Response {
  let query = req.query.trim();
  if query.is_empty() {
    return error_response(StatusCode::BAD_REQUEST, "query_missing", "Query is empty.");
  }
  let cached = cached_room_state(&state).await;
  let ctx = RoomContext {
    live_room: req.room.as_ref(),
    cached: cached.as_ref(),
    room_size_feet: req.size_feet.unwrap_or(state.config.room_size_feet),
  };
  let bearer = bearer_token(&headers);

  match recommend::match_products(&state.client, query, &ctx, &state.catalog, bearer).await {
    Ok(recs) => (StatusCode::OK, Json(recs)).into_response(),
    Err(err) => recommend_error(err),
  }
}

async fn intent(
  State(state): State<Arc<RouterState>>,
  headers: HeaderMap,
  Json(req): Json<RecommendRequest>,
) -> Response {
  let query = req.query.trim();
  if query.is_empty() {
    return error_response(StatusCode::BAD_REQUEST, "query_missing", "Query is empty.");
  }
  let cached = cached_room_state(&state).await;
  let ctx = RoomContext {
    live_room: req.room.as_ref(),
    cached: cached.as_ref(),
    room_size_feet: req.size_feet.unwrap_or(state.config.room_size_feet),
  };

  match recommend::parse_intent(&state.client, query, &ctx, bearer_token(&headers)).await {
    Ok(intent) => (StatusCode::OK, Json(intent)).into_response(),
    Err(err) => recommend_error(err),
  }
}

async fn cached_room_state(state: &RouterState) -> Option<crate::models::RoomState> {
  match storage::load_room_state(&state.db).await {
    Ok(cached) => cached,
    Err(err) => {
      warn!("could not read cached room state: {err}");
      None
    }
  }
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
  headers
    .get(AUTHORIZATION)
    .and_then(|v| v.to_str().ok())
    .and_then(|v| v.strip_prefix("Bearer "))
    .map(str::trim)
    .filter(|t| !t.is_empty())
}

fn error_response(status: StatusCode, code: &str, message: &str) -> Response {
  let body = Json(serde_json::json!({ "error": message, "code": code }));
  (status, body).into_response()
}

fn extraction_error(err: &ExtractionError) -> Response {
  match err {
    ExtractionError::MissingCredential => {
      error_response(StatusCode::BAD_REQUEST, "key_missing", &err.to_string())
    }
    ExtractionError::NoCandidates => {
      error_response(StatusCode::INTERNAL_SERVER_ERROR, "models_missing", &err.to_string())
    }
    _ => error_response(StatusCode::BAD_GATEWAY, "upstream_failed", &err.to_string()),
  }
}

fn analysis_error(err: AnalysisError) -> Response {
  match &err {
    AnalysisError::Extraction(inner) => extraction_error(inner),
    AnalysisError::Normalize(_) => {
      error_response(StatusCode::BAD_GATEWAY, "malformed_output", &err.to_string())
    }
    AnalysisError::Storage(_) => {
      error_response(StatusCode::INTERNAL_SERVER_ERROR, "storage_failed", &err.to_string())
    }
  }
}

fn recommend_error(err: RecommendError) -> Response {
  match &err {
    RecommendError::NoRoomContext => {
      error_response(StatusCode::BAD_REQUEST, "no_room_context", &err.to_string())
    }
    RecommendError::Extraction(inner) => extraction_error(inner),
    RecommendError::Normalize(_) => {
      error_response(StatusCode::BAD_GATEWAY, "malformed_output", &err.to_string())
    }
  }
}
