use std::sync::Arc;

use base64::Engine;
use serde::{Deserialize, Serialize};

use crate::catalog::Product;
use crate::placement::{FurnitureDescriptor, PlacedItem};

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ImageData {
  pub mime: String,
  pub base64: String,
}

impl ImageData {
  pub fn from_bytes(mime: &str, bytes: &[u8]) -> Self {
    Self {
      mime: mime.to_string(),
      base64: base64::engine::general_purpose::STANDARD.encode(bytes),
    }
  }

  /// Inline `data:` URL accepted by vision models as an `image_url` part.
  pub fn data_url(&self) -> String {
    format!("data:{};base64,{}", self.mime, self.base64)
  }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PayloadKind {
  Room,
  SingleObject,
  RoomState,
  ProductQuery,
  Intent,
  FurnitureLayout,
}

impl PayloadKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      PayloadKind::Room => "room",
      PayloadKind::SingleObject => "single_object",
      PayloadKind::RoomState => "room_state",
      PayloadKind::ProductQuery => "product_query",
      PayloadKind::Intent => "intent",
      PayloadKind::FurnitureLayout => "furniture_layout",
    }
  }
}

/// JSON schema handed to the model alongside the prompt.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(transparent)]
pub struct SchemaDescriptor(pub serde_json::Value);

impl SchemaDescriptor {
  pub fn pretty(&self) -> String {
    serde_json::to_string_pretty(&self.0).unwrap_or_else(|_| self.0.to_string())
  }
}

/// One outbound model call. Built once and reused unchanged for every attempt.
#[derive(Clone, Debug)]
pub struct ModelRequest {
  pub kind: PayloadKind,
  pub image: Option<ImageData>,
  pub system: Option<String>,
  pub prompt: String,
  pub schema: Option<SchemaDescriptor>,
  pub json_mode: bool,
}

impl ModelRequest {
  pub fn vision(kind: PayloadKind, image: ImageData, prompt: String, schema: SchemaDescriptor) -> Self {
    Self {
      kind,
      image: Some(image),
      system: None,
      prompt,
      schema: Some(schema),
      json_mode: true,
    }
  }

  pub fn text(kind: PayloadKind, system: &str, prompt: String) -> Self {
    Self {
      kind,
      image: None,
      system: Some(system.to_string()),
      prompt,
      schema: None,
      json_mode: false,
    }
  }

  pub fn user_text(&self) -> String {
    match &self.schema {
      Some(schema) => format!(
        "{}\n\nYou MUST respond with valid JSON matching this schema:\n{}",
        self.prompt,
        schema.pretty()
      ),
      None => self.prompt.clone(),
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ModelInfo {
  pub id: String,
  pub label: String,
  pub capability: String,
}

#[derive(Serialize, Deserialize)]
pub struct ModelsResponse {
  pub candidates: Vec<ModelInfo>,
  pub attempts_per_model: u32,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoxelPart {
  pub offset: [f64; 3],
  pub dimensions: [f64; 3],
  pub color: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VoxelObject {
  pub id: String,
  pub name: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub position: [f64; 3],
  pub rotation: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub color: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub description: Option<String>,
  pub visible: bool,
  pub parts: Vec<VoxelPart>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct FloorSize {
  pub width: f64,
  pub depth: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomData {
  pub wall_color: String,
  pub floor_color: String,
  pub dimensions: FloorSize,
  pub objects: Vec<VoxelObject>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct Point3 {
  pub x: f64,
  pub y: f64,
  pub z: f64,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct ItemSize {
  pub width: f64,
  pub depth: f64,
  pub height: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ExistingItem {
  pub id: String,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub product_id: Option<String>,
  pub name: String,
  pub category: String,
  pub position: Point3,
  pub dimensions: ItemSize,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct EmptyZone {
  pub id: String,
  #[serde(rename = "type")]
  pub kind: String,
  pub description: String,
  pub position: Point3,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct RoomExtent {
  pub length: f64,
  pub width: f64,
  pub height: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RoomState {
  pub id: String,
  pub name: String,
  pub dimensions: RoomExtent,
  pub theme: String,
  pub color_palette: Vec<String>,
  pub existing_items: Vec<ExistingItem>,
  pub empty_zones: Vec<EmptyZone>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct SuggestedPosition {
  pub x: f64,
  pub y: f64,
  pub z: f64,
  pub rotation: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Alternative {
  pub product_id: String,
  pub reason: String,
  pub product: Option<Arc<Product>>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationItem {
  pub product_id: String,
  pub reasoning: String,
  pub compatibility_score: f64,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub suggested_position: Option<SuggestedPosition>,
  pub alternatives: Vec<Alternative>,
  pub product: Option<Arc<Product>>,
  /// Scene position for dropping the matched product into the room.
  #[serde(skip_serializing_if = "Option::is_none")]
  pub spawn_position: Option<[f64; 3]>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recommendations {
  pub recommendations: Vec<RecommendationItem>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub overall_rationale: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum IntentKind {
  Replace,
  Add,
  Style,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueryIntent {
  pub intent: IntentKind,
  pub item_type: Option<String>,
  pub location: Option<String>,
  pub current_item_id: Option<String>,
  pub additional_context: String,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RoomImageRequest {
  pub image: ImageData,
  pub size_feet: Option<f64>,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct ObjectImageRequest {
  pub image: ImageData,
  pub spawn_position: Option<[f64; 3]>,
}

#[derive(Serialize, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
  pub query: String,
  pub room: Option<RoomData>,
  pub size_feet: Option<f64>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LayoutRequest {
  pub items: Vec<serde_json::Value>,
  /// Index of a placed item to delete after resolving.
  pub remove: Option<usize>,
}

#[derive(Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeRoomResponse {
  pub success: bool,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub room_data: Option<Vec<FurnitureDescriptor>>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub fallback_data: Option<Vec<FurnitureDescriptor>>,
  pub placements: Vec<PlacedItem>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub error: Option<String>,
}
