use rusqlite::Connection;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::client::ExtractionClient;
use crate::error::{AnalysisError, NormalizeError};
use crate::fallback::{fallback_furniture, FALLBACK_VERSION};
use crate::models::{ImageData, ModelRequest, PayloadKind, RoomData, RoomState, VoxelObject};
use crate::normalize::{normalize, ExtractionResult, NormalizeContext};
use crate::placement::{resolve, FurnitureDescriptor, PlacedItem};
use crate::prompts;
use crate::storage;

async fn extract(
  client: &ExtractionClient,
  request: &ModelRequest,
  ctx: &NormalizeContext,
) -> Result<ExtractionResult, AnalysisError> {
  let raw = client.invoke(request).await?;
  Ok(normalize(&raw, request.kind, ctx)?)
}

fn unexpected(expected: PayloadKind, actual: &ExtractionResult) -> AnalysisError {
  NormalizeError::UnexpectedPayload {
    expected: expected.as_str(),
    actual: actual.kind().as_str(),
  }
  .into()
}

pub async fn analyze_room(
  client: &ExtractionClient,
  image: ImageData,
  size_feet: f64,
) -> Result<RoomData, AnalysisError> {
  let request = ModelRequest::vision(
    PayloadKind::Room,
    image,
    prompts::room_prompt(size_feet),
    prompts::room_schema(),
  );
  match extract(client, &request, &NormalizeContext::now(size_feet)).await? {
    ExtractionResult::Room(room) => {
      info!(objects = room.objects.len(), "room reconstructed");
      Ok(room)
    }
    other => Err(unexpected(PayloadKind::Room, &other)),
  }
}

pub async fn analyze_single_object(
  client: &ExtractionClient,
  image: ImageData,
  spawn_position: [f64; 3],
) -> Result<VoxelObject, AnalysisError> {
  let request = ModelRequest::vision(
    PayloadKind::SingleObject,
    image,
    prompts::object_prompt(),
    prompts::object_schema(),
  );
  let ctx = NormalizeContext::now(0.0).with_spawn(spawn_position);
  match extract(client, &request, &ctx).await? {
    ExtractionResult::SingleObject(object) => Ok(object),
    other => Err(unexpected(PayloadKind::SingleObject, &other)),
  }
}

/// Extracts the room description and replaces the cached copy with it.
pub async fn extract_room_state(
  client: &ExtractionClient,
  db: &Mutex<Connection>,
  image: ImageData,
  size_feet: f64,
) -> Result<RoomState, AnalysisError> {
  let request = ModelRequest::vision(
    PayloadKind::RoomState,
    image,
    prompts::room_state_prompt(size_feet),
    prompts::room_state_schema(),
  );
  let state = match extract(client, &request, &NormalizeContext::now(size_feet)).await? {
    ExtractionResult::RoomState(state) => state,
    other => return Err(unexpected(PayloadKind::RoomState, &other)),
  };
  storage::save_room_state(db, &state).await?;
  info!(
    items = state.existing_items.len(),
    zones = state.empty_zones.len(),
    theme = %state.theme,
    "room state cached"
  );
  Ok(state)
}

#[derive(Debug, Clone, PartialEq)]
pub struct FurnitureAnalysis {
  pub descriptors: Vec<FurnitureDescriptor>,
  pub placements: Vec<PlacedItem>,
  /// Set when the canned list was substituted; carries the underlying failure.
  pub fallback_reason: Option<String>,
}

/// Never fails: any upstream or parse problem yields the canned furniture list.
pub async fn analyze_furniture(client: &ExtractionClient, image: ImageData) -> FurnitureAnalysis {
  let request = ModelRequest::vision(
    PayloadKind::FurnitureLayout,
    image,
    prompts::FURNITURE_PROMPT.to_string(),
    prompts::furniture_schema(),
  );
  let ctx = NormalizeContext::now(0.0);

  let (descriptors, fallback_reason) = match extract(client, &request, &ctx).await {
    Ok(ExtractionResult::FurnitureLayout(items)) if !items.is_empty() => (items, None),
    Ok(ExtractionResult::FurnitureLayout(_)) => {
      warn!(version = FALLBACK_VERSION, "model listed no furniture, serving fallback");
      (fallback_furniture(), Some("no furniture detected".to_string()))
    }
    Ok(other) => {
      let err = unexpected(PayloadKind::FurnitureLayout, &other);
      warn!(version = FALLBACK_VERSION, "serving fallback furniture: {err}");
      (fallback_furniture(), Some(err.to_string()))
    }
    Err(err) => {
      warn!(version = FALLBACK_VERSION, "serving fallback furniture: {err}");
      (fallback_furniture(), Some(err.to_string()))
    }
  };

  let placements = resolve(&descriptors);
  FurnitureAnalysis {
    descriptors,
    placements,
    fallback_reason,
  }
}
