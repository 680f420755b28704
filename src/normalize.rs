//! Turns free-form model text into schema-complete values.
//!
//! Parsing is lenient (code fences and leading commentary are tolerated) and every
//! field the downstream types require is filled with a fixed default when the model
//! leaves it out or sends the wrong JSON type.

use serde_json::Value;
use tracing::warn;

use crate::error::NormalizeError;
use crate::models::{
  Alternative, EmptyZone, ExistingItem, FloorSize, IntentKind, ItemSize, PayloadKind, Point3,
  QueryIntent, RecommendationItem, Recommendations, RoomData, RoomExtent, RoomState,
  SuggestedPosition, VoxelObject, VoxelPart,
};
use crate::placement::{FurnitureDescriptor, NormalizedDimensions, PlacementZone, SizeClass};

pub const DEFAULT_COMPATIBILITY_SCORE: f64 = 0.85;
pub const DEFAULT_THEME: &str = "modern";
pub const DEFAULT_WALL_COLOR: &str = "#cbd5e1";
pub const DEFAULT_FLOOR_COLOR: &str = "#94a3b8";
pub const DEFAULT_ITEM_COLOR: &str = "#888888";
pub const DEFAULT_FURNITURE_EXTENT: f64 = crate::placement::DEFAULT_EXTENT;
pub const WALL_HEIGHT_INCHES: f64 = 96.0;

pub fn default_palette() -> Vec<String> {
  vec!["white".to_string(), "gray".to_string(), "black".to_string()]
}

/// Inputs that defaults depend on. `created_at_ms` seeds every synthesized id.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NormalizeContext {
  pub created_at_ms: i64,
  pub room_size_feet: f64,
  pub spawn_position: [f64; 3],
}

impl NormalizeContext {
  pub fn now(room_size_feet: f64) -> Self {
    Self {
      created_at_ms: chrono::Utc::now().timestamp_millis(),
      room_size_feet,
      spawn_position: [0.0, 0.0, 0.0],
    }
  }

  pub fn with_spawn(mut self, spawn_position: [f64; 3]) -> Self {
    self.spawn_position = spawn_position;
    self
  }
}

#[derive(Clone, Debug, PartialEq)]
pub enum ExtractionResult {
  Room(RoomData),
  SingleObject(VoxelObject),
  RoomState(RoomState),
  ProductQuery(Recommendations),
  Intent(QueryIntent),
  FurnitureLayout(Vec<FurnitureDescriptor>),
}

impl ExtractionResult {
  pub fn kind(&self) -> PayloadKind {
    match self {
      ExtractionResult::Room(_) => PayloadKind::Room,
      ExtractionResult::SingleObject(_) => PayloadKind::SingleObject,
      ExtractionResult::RoomState(_) => PayloadKind::RoomState,
      ExtractionResult::ProductQuery(_) => PayloadKind::ProductQuery,
      ExtractionResult::Intent(_) => PayloadKind::Intent,
      ExtractionResult::FurnitureLayout(_) => PayloadKind::FurnitureLayout,
    }
  }
}

/// Parses `raw` and coerces it into the result for `kind`.
///
/// The first candidate value whose JSON shape fits `kind` wins. Text that holds no
/// complete JSON value is `MalformedOutput`; JSON of the wrong shape is `UnexpectedPayload`.
pub fn normalize(
  raw: &str,
  kind: PayloadKind,
  ctx: &NormalizeContext,
) -> Result<ExtractionResult, NormalizeError> {
  let cleaned = strip_code_fences(raw);
  let mut mismatch = None;
  for value in candidate_values(cleaned) {
    if !fits(kind, &value) {
      mismatch.get_or_insert(json_type(&value));
      continue;
    }
    return Ok(match kind {
      PayloadKind::Room => ExtractionResult::Room(room_from_value(&value, ctx)),
      PayloadKind::SingleObject => ExtractionResult::SingleObject(object_from_value(&value, ctx)),
      PayloadKind::RoomState => ExtractionResult::RoomState(room_state_from_value(&value, ctx)),
      PayloadKind::ProductQuery => ExtractionResult::ProductQuery(recommendations_from_value(&value)),
      PayloadKind::Intent => ExtractionResult::Intent(intent_from_value(&value)),
      PayloadKind::FurnitureLayout => ExtractionResult::FurnitureLayout(furniture_from_value(&value)),
    });
  }
  Err(match mismatch {
    Some(actual) => NormalizeError::UnexpectedPayload {
      expected: kind.as_str(),
      actual,
    },
    None => malformed(cleaned),
  })
}

fn fits(kind: PayloadKind, value: &Value) -> bool {
  match kind {
    PayloadKind::FurnitureLayout => value.is_array() || value.is_object(),
    PayloadKind::ProductQuery => value.get("recommendations").is_some_and(Value::is_array),
    _ => value.is_object(),
  }
}

fn json_type(value: &Value) -> &'static str {
  match value {
    Value::Null => "null",
    Value::Bool(_) => "boolean",
    Value::Number(_) => "number",
    Value::String(_) => "string",
    Value::Array(_) => "array",
    Value::Object(_) => "object",
  }
}

fn malformed(cleaned: &str) -> NormalizeError {
  let preview: String = cleaned.chars().take(120).collect();
  NormalizeError::MalformedOutput(preview)
}

/// Removes a surrounding code fence (bare or language-tagged) and whitespace.
pub fn strip_code_fences(raw: &str) -> &str {
  let mut text = raw.trim();
  if let Some(rest) = text.strip_prefix("```") {
    let tag_len = rest
      .find(|c: char| !c.is_ascii_alphanumeric())
      .unwrap_or(rest.len());
    text = &rest[tag_len..];
  }
  if let Some(rest) = text.trim_end().strip_suffix("```") {
    text = rest;
  }
  text.trim()
}

pub fn parse_model_json(raw: &str) -> Result<Value, NormalizeError> {
  let cleaned = strip_code_fences(raw);
  candidate_values(cleaned).next().ok_or_else(|| malformed(cleaned))
}

/// The whole text, then each top-level span, that parses as JSON.
fn candidate_values(cleaned: &str) -> impl Iterator<Item = Value> + '_ {
  std::iter::once(cleaned)
    .chain(top_level_spans(cleaned))
    .filter_map(|text| serde_json::from_str::<Value>(text).ok())
}

/// Balanced `{..}` / `[..]` spans that are not nested in another span, in order.
///
/// Scanning stops at the first bracket that never closes, so a reply cut off midway
/// yields nothing from inside its unclosed outer value.
fn top_level_spans(text: &str) -> impl Iterator<Item = &str> {
  let mut cursor = 0;
  std::iter::from_fn(move || {
    let start = cursor + text[cursor..].find(['{', '['])?;
    match span_end(&text[start..]) {
      Some(end) => {
        cursor = start + end;
        Some(&text[start..cursor])
      }
      None => {
        cursor = text.len();
        None
      }
    }
  })
}

fn span_end(text: &str) -> Option<usize> {
  let mut stack = Vec::new();
  let mut in_string = false;
  let mut escaped = false;
  for (i, c) in text.char_indices() {
    if in_string {
      match c {
        _ if escaped => escaped = false,
        '\\' => escaped = true,
        '"' => in_string = false,
        _ => {}
      }
      continue;
    }
    match c {
      '"' => in_string = true,
      '{' => stack.push('}'),
      '[' => stack.push(']'),
      '}' | ']' => {
        if stack.pop() != Some(c) {
          return None;
        }
        if stack.is_empty() {
          return Some(i + c.len_utf8());
        }
      }
      _ => {}
    }
  }
  None
}

fn text(value: &Value, key: &str) -> Option<String> {
  value
    .get(key)
    .and_then(Value::as_str)
    .map(str::trim)
    .filter(|s| !s.is_empty())
    .map(str::to_string)
}

fn number(value: Option<&Value>) -> Option<f64> {
  value.and_then(Value::as_f64).filter(|n| n.is_finite())
}

fn list<'a>(value: &'a Value, key: &str) -> &'a [Value] {
  value
    .get(key)
    .and_then(Value::as_array)
    .map(Vec::as_slice)
    .unwrap_or(&[])
}

fn triple(value: Option<&Value>, fallback: [f64; 3]) -> [f64; 3] {
  match value {
    Some(Value::Array(items)) if items.len() >= 3 => {
      let mut out = fallback;
      for (slot, item) in out.iter_mut().zip(items) {
        if let Some(n) = number(Some(item)) {
          *slot = n;
        }
      }
      out
    }
    Some(obj @ Value::Object(_)) => [
      number(obj.get("x")).unwrap_or(fallback[0]),
      number(obj.get("y")).unwrap_or(fallback[1]),
      number(obj.get("z")).unwrap_or(fallback[2]),
    ],
    _ => fallback,
  }
}

fn point(value: Option<&Value>) -> Point3 {
  let [x, y, z] = triple(value, [0.0, 0.0, 0.0]);
  Point3 { x, y, z }
}

fn item_size(value: Option<&Value>) -> ItemSize {
  let dim = |key: &str| number(value.and_then(|v| v.get(key))).filter(|n| *n > 0.0).unwrap_or(1.0);
  ItemSize {
    width: dim("width"),
    depth: dim("depth"),
    height: dim("height"),
  }
}

pub fn is_hex_color(color: &str) -> bool {
  let Some(hex) = color.strip_prefix('#') else {
    return false;
  };
  matches!(hex.len(), 3 | 6 | 8) && hex.chars().all(|c| c.is_ascii_hexdigit())
}

fn parts(value: &Value, fallback_color: &str) -> Vec<VoxelPart> {
  list(value, "parts")
    .iter()
    .map(|part| VoxelPart {
      offset: triple(part.get("offset"), [0.0, 0.0, 0.0]),
      dimensions: triple(part.get("dimensions"), [1.0, 1.0, 1.0]),
      color: text(part, "color").unwrap_or_else(|| fallback_color.to_string()),
    })
    .collect()
}

fn voxel_object(value: &Value, id: String, position: [f64; 3], rotation: f64) -> VoxelObject {
  let kind = text(value, "type").unwrap_or_else(|| "generic".to_string());
  let color = text(value, "color");
  let part_color = color.clone().unwrap_or_else(|| DEFAULT_ITEM_COLOR.to_string());
  VoxelObject {
    id,
    name: text(value, "name").unwrap_or_else(|| kind.clone()),
    parts: parts(value, &part_color),
    kind,
    position,
    rotation,
    color,
    description: text(value, "description"),
    visible: true,
  }
}

pub fn room_from_value(value: &Value, ctx: &NormalizeContext) -> RoomData {
  let objects = list(value, "objects")
    .iter()
    .enumerate()
    .map(|(idx, obj)| {
      let id = text(obj, "id").unwrap_or_else(|| format!("room-obj-{idx}-{}", ctx.created_at_ms));
      let position = triple(obj.get("position"), [0.0, 0.0, 0.0]);
      let rotation = number(obj.get("rotation")).unwrap_or(0.0);
      voxel_object(obj, id, position, rotation)
    })
    .collect();

  RoomData {
    wall_color: text(value, "wallColor").unwrap_or_else(|| DEFAULT_WALL_COLOR.to_string()),
    floor_color: text(value, "floorColor").unwrap_or_else(|| DEFAULT_FLOOR_COLOR.to_string()),
    dimensions: FloorSize {
      width: ctx.room_size_feet,
      depth: ctx.room_size_feet,
    },
    objects,
  }
}

pub fn object_from_value(value: &Value, ctx: &NormalizeContext) -> VoxelObject {
  let id = format!("toolbox-{}", ctx.created_at_ms);
  voxel_object(value, id, ctx.spawn_position, 0.0)
}

pub fn room_state_from_value(value: &Value, ctx: &NormalizeContext) -> RoomState {
  let ts = ctx.created_at_ms;
  let existing_items = list(value, "existingItems")
    .iter()
    .enumerate()
    .map(|(idx, item)| ExistingItem {
      id: format!("item_{idx}_{ts}"),
      product_id: text(item, "productId"),
      name: text(item, "name").unwrap_or_else(|| "Item".to_string()),
      category: text(item, "category").unwrap_or_else(|| "decor".to_string()),
      position: point(item.get("position")),
      dimensions: item_size(item.get("dimensions")),
    })
    .collect();
  let empty_zones = list(value, "emptyZones")
    .iter()
    .enumerate()
    .map(|(idx, zone)| EmptyZone {
      id: format!("zone_{idx}_{ts}"),
      kind: text(zone, "type").unwrap_or_else(|| "floor".to_string()),
      description: text(zone, "description").unwrap_or_default(),
      position: point(zone.get("position")),
    })
    .collect();

  let palette: Vec<String> = list(value, "colorPalette")
    .iter()
    .filter_map(Value::as_str)
    .map(str::to_string)
    .collect();

  let inches = ctx.room_size_feet * 12.0;
  RoomState {
    id: format!("room_{ts}"),
    name: text(value, "name").unwrap_or_else(|| "Room".to_string()),
    dimensions: RoomExtent {
      length: inches,
      width: inches,
      height: WALL_HEIGHT_INCHES,
    },
    theme: text(value, "theme").unwrap_or_else(|| DEFAULT_THEME.to_string()),
    color_palette: if palette.is_empty() { default_palette() } else { palette },
    existing_items,
    empty_zones,
  }
}

pub fn compatibility_score(value: Option<&Value>) -> f64 {
  number(value)
    .map(|score| score.clamp(0.0, 1.0))
    .unwrap_or(DEFAULT_COMPATIBILITY_SCORE)
}

pub fn recommendations_from_value(value: &Value) -> Recommendations {
  let entries = match value {
    Value::Array(items) => items.as_slice(),
    _ => list(value, "recommendations"),
  };

  let recommendations = entries
    .iter()
    .filter_map(|rec| {
      let Some(product_id) = text(rec, "productId") else {
        warn!("dropping recommendation without productId");
        return None;
      };
      let suggested_position = rec.get("suggestedPosition").filter(|p| p.is_object()).map(|p| {
        SuggestedPosition {
          x: number(p.get("x")).unwrap_or(0.0),
          y: number(p.get("y")).unwrap_or(0.0),
          z: number(p.get("z")).unwrap_or(0.0),
          rotation: number(p.get("rotation")).unwrap_or(0.0),
        }
      });
      let alternatives = list(rec, "alternatives")
        .iter()
        .filter_map(|alt| {
          Some(Alternative {
            product_id: text(alt, "productId")?,
            reason: text(alt, "reason").unwrap_or_default(),
            product: None,
          })
        })
        .collect();
      Some(RecommendationItem {
        product_id,
        reasoning: text(rec, "reasoning").unwrap_or_default(),
        compatibility_score: compatibility_score(rec.get("compatibilityScore")),
        suggested_position,
        alternatives,
        product: None,
        spawn_position: None,
      })
    })
    .collect();

  Recommendations {
    recommendations,
    overall_rationale: text(value, "overallRationale"),
  }
}

pub fn intent_from_value(value: &Value) -> QueryIntent {
  let intent = match text(value, "intent").map(|s| s.to_ascii_lowercase()).as_deref() {
    Some("replace") => IntentKind::Replace,
    Some("style") => IntentKind::Style,
    _ => IntentKind::Add,
  };
  QueryIntent {
    intent,
    item_type: text(value, "itemType"),
    location: text(value, "location"),
    current_item_id: text(value, "currentItemId"),
    additional_context: text(value, "additionalContext").unwrap_or_default(),
  }
}

pub fn furniture_from_value(value: &Value) -> Vec<FurnitureDescriptor> {
  let entries = match value {
    Value::Array(items) => items.as_slice(),
    _ => ["furniture", "items", "objects"]
      .iter()
      .map(|key| list(value, key))
      .find(|items| !items.is_empty())
      .unwrap_or(&[]),
  };
  entries.iter().map(furniture_descriptor).collect()
}

pub fn furniture_descriptor(value: &Value) -> FurnitureDescriptor {
  let position = value.get("position");
  let label = |axis: &str| position.and_then(|p| p.get(axis)).and_then(Value::as_str);
  let extent = |key: &str| {
    number(value.get("dimensions").and_then(|d| d.get(key)))
      .map(NormalizedDimensions::clamp_extent)
      .unwrap_or(DEFAULT_FURNITURE_EXTENT)
  };
  FurnitureDescriptor {
    kind: text(value, "type")
      .map(|t| t.to_ascii_lowercase().replace(' ', "_"))
      .unwrap_or_else(|| "generic".to_string()),
    position: PlacementZone::from_labels(label("x"), label("z")),
    size: SizeClass::from_label(value.get("size").and_then(Value::as_str)),
    color: text(value, "color")
      .filter(|c| is_hex_color(c))
      .unwrap_or_else(|| DEFAULT_ITEM_COLOR.to_string()),
    dimensions: NormalizedDimensions {
      width: extent("width"),
      height: extent("height"),
      depth: extent("depth"),
    },
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::placement::{ZoneX, ZoneZ};

  fn ctx() -> NormalizeContext {
    NormalizeContext {
      created_at_ms: 1_700_000_000_000,
      room_size_feet: 12.0,
      spawn_position: [1.0, 0.5, 2.0],
    }
  }

  #[test]
  fn strips_tagged_and_bare_fences() {
    assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("  ```\n[1,2]\n```  "), "[1,2]");
    assert_eq!(strip_code_fences("```json{\"a\":1}```"), "{\"a\":1}");
    assert_eq!(strip_code_fences("{\"a\":1}"), "{\"a\":1}");
  }

  #[test]
  fn recovers_json_after_leading_commentary() {
    let raw = "Sure! Here is the furniture I found: [{\"type\":\"desk\"}] Hope it helps.";
    let value = parse_model_json(raw).unwrap();
    assert_eq!(value, serde_json::json!([{ "type": "desk" }]));
  }

  #[test]
  fn skips_unparsable_spans_and_respects_strings() {
    let raw = "note {not json} then {\"text\":\"a } inside [ a string\"}";
    let value = parse_model_json(raw).unwrap();
    assert_eq!(value["text"], "a } inside [ a string");
  }

  #[test]
  fn unrecoverable_text_is_malformed() {
    let err = parse_model_json("I could not see any furniture.").unwrap_err();
    assert!(matches!(err, NormalizeError::MalformedOutput(_)));
    assert!(parse_model_json("{\"open\": [1, 2").is_err());
  }

  #[test]
  fn room_defaults_fill_every_required_field() {
    let raw = r#"{"objects":[{"name":"Desk","type":"desk","position":[1,0,2]},{"id":"keep","type":"lamp"}]}"#;
    let ExtractionResult::Room(room) = normalize(raw, PayloadKind::Room, &ctx()).unwrap() else {
      panic!("expected room");
    };
    assert_eq!(room.wall_color, DEFAULT_WALL_COLOR);
    assert_eq!(room.floor_color, DEFAULT_FLOOR_COLOR);
    assert_eq!(room.dimensions, FloorSize { width: 12.0, depth: 12.0 });
    assert_eq!(room.objects[0].id, "room-obj-0-1700000000000");
    assert_eq!(room.objects[0].position, [1.0, 0.0, 2.0]);
    assert_eq!(room.objects[0].rotation, 0.0);
    assert!(room.objects[0].visible);
    assert!(room.objects[0].parts.is_empty());
    assert_eq!(room.objects[1].id, "keep");
    assert_eq!(room.objects[1].name, "lamp");
  }

  #[test]
  fn single_object_uses_spawn_position_and_fresh_id() {
    let raw = r##"{"name":"Chair","type":"chair","color":"#ff0000","parts":[{"offset":[0,1,0],"dimensions":[1,1]}]}"##;
    let ExtractionResult::SingleObject(obj) = normalize(raw, PayloadKind::SingleObject, &ctx()).unwrap() else {
      panic!("expected object");
    };
    assert_eq!(obj.id, "toolbox-1700000000000");
    assert_eq!(obj.position, [1.0, 0.5, 2.0]);
    assert_eq!(obj.rotation, 0.0);
    assert_eq!(obj.parts.len(), 1);
    assert_eq!(obj.parts[0].offset, [0.0, 1.0, 0.0]);
    assert_eq!(obj.parts[0].dimensions, [1.0, 1.0, 1.0]);
    assert_eq!(obj.parts[0].color, "#ff0000");
  }

  #[test]
  fn room_state_defaults_and_ids() {
    let raw = r#"{"existingItems":[{"name":"Sofa","category":"seating"},{"name":"Lamp","position":{"x":2,"y":0,"z":3}}],"emptyZones":[{"type":"corner","description":"sunny"}]}"#;
    let ExtractionResult::RoomState(state) = normalize(raw, PayloadKind::RoomState, &ctx()).unwrap() else {
      panic!("expected room state");
    };
    assert_eq!(state.id, "room_1700000000000");
    assert_eq!(state.name, "Room");
    assert_eq!(state.theme, "modern");
    assert_eq!(state.color_palette, default_palette());
    assert_eq!(state.dimensions, RoomExtent { length: 144.0, width: 144.0, height: 96.0 });
    assert_eq!(state.existing_items[0].id, "item_0_1700000000000");
    assert_eq!(state.existing_items[1].id, "item_1_1700000000000");
    assert_eq!(state.existing_items[0].position, Point3::default());
    assert_eq!(state.existing_items[0].dimensions, ItemSize { width: 1.0, depth: 1.0, height: 1.0 });
    assert_eq!(state.existing_items[1].position.z, 3.0);
    assert_eq!(state.empty_zones[0].id, "zone_0_1700000000000");
    assert_eq!(state.empty_zones[0].kind, "corner");
  }

  #[test]
  fn wrong_shape_is_an_unexpected_payload() {
    let err = normalize("[1,2,3]", PayloadKind::RoomState, &ctx()).unwrap_err();
    assert!(matches!(
      err,
      NormalizeError::UnexpectedPayload {
        expected: "room_state",
        actual: "array"
      }
    ));
    let err = normalize("{\"items\":[]}", PayloadKind::ProductQuery, &ctx()).unwrap_err();
    assert!(matches!(err, NormalizeError::UnexpectedPayload { actual: "object", .. }));
  }

  #[test]
  fn cut_off_room_state_is_malformed() {
    let raw = r#"{"name":"Den","theme":"boho","colorPalette":["black","white"],"existingItems":[{"name":"Sofa","category":"seat"#;
    let err = normalize(raw, PayloadKind::RoomState, &ctx()).unwrap_err();
    assert!(matches!(err, NormalizeError::MalformedOutput(_)));
  }

  #[test]
  fn cut_off_recommendations_are_malformed() {
    let raw = r#"Here you go: {"recommendations":[{"productId":"prod_001","reasoning":"green"},{"productId":"prod_002","reas"#;
    let err = normalize(raw, PayloadKind::ProductQuery, &ctx()).unwrap_err();
    assert!(matches!(err, NormalizeError::MalformedOutput(_)));
  }

  #[test]
  fn bracketed_aside_before_the_reply_is_skipped() {
    let raw = r#"Matches [see notes] below: {"recommendations":[{"productId":"prod_003"}]}"#;
    let ExtractionResult::ProductQuery(recs) = normalize(raw, PayloadKind::ProductQuery, &ctx()).unwrap() else {
      panic!("expected recommendations");
    };
    assert_eq!(recs.recommendations[0].product_id, "prod_003");
  }

  #[test]
  fn fenced_recommendation_gets_default_score() {
    let raw = "```json\n{\"recommendations\":[{\"productId\":\"prod_001\",\"reasoning\":\"fits theme\"}]}\n```";
    let ExtractionResult::ProductQuery(recs) = normalize(raw, PayloadKind::ProductQuery, &ctx()).unwrap() else {
      panic!("expected recommendations");
    };
    assert_eq!(recs.recommendations.len(), 1);
    let rec = &recs.recommendations[0];
    assert_eq!(rec.product_id, "prod_001");
    assert_eq!(rec.reasoning, "fits theme");
    assert_eq!(rec.compatibility_score, 0.85);
    assert!(rec.alternatives.is_empty());
    assert!(rec.product.is_none());
  }

  #[test]
  fn scores_are_clamped_and_extras_kept() {
    let raw = r#"{"recommendations":[
      {"productId":"a","compatibilityScore":1.7,"suggestedPosition":{"x":1,"y":0,"z":2},"alternatives":[{"productId":"b","reason":"cheaper"},{"reason":"no id"}]},
      {"productId":"c","compatibilityScore":"high"},
      {"reasoning":"no id"}
    ],"overallRationale":"green"}"#;
    let recs = recommendations_from_value(&parse_model_json(raw).unwrap());
    assert_eq!(recs.recommendations.len(), 2);
    assert_eq!(recs.recommendations[0].compatibility_score, 1.0);
    assert_eq!(recs.recommendations[0].suggested_position.unwrap().z, 2.0);
    assert_eq!(recs.recommendations[0].alternatives.len(), 1);
    assert_eq!(recs.recommendations[1].compatibility_score, 0.85);
    assert_eq!(recs.overall_rationale.as_deref(), Some("green"));
  }

  #[test]
  fn intent_defaults_to_add() {
    let intent = intent_from_value(&serde_json::json!({ "intent": "Replace", "itemType": "chair", "location": null }));
    assert_eq!(intent.intent, IntentKind::Replace);
    assert_eq!(intent.item_type.as_deref(), Some("chair"));
    assert!(intent.location.is_none());
    assert_eq!(intent_from_value(&serde_json::json!({ "intent": "dance" })).intent, IntentKind::Add);
  }

  #[test]
  fn furniture_descriptors_are_coerced() {
    let raw = r##"{"furniture":[
      {"type":"Side Table","position":{"x":"right","z":"front"},"size":"small","color":"#abc","dimensions":{"width":0.1,"height":-1}},
      {"type":"desk","position":{"x":"upstairs","z":"back"},"color":"brown"}
    ]}"##;
    let items = furniture_from_value(&parse_model_json(raw).unwrap());
    assert_eq!(items.len(), 2);
    assert_eq!(items[0].kind, "side_table");
    assert_eq!(items[0].position, PlacementZone { x: ZoneX::Right, z: ZoneZ::Front });
    assert_eq!(items[0].size, SizeClass::Small);
    assert_eq!(items[0].color, "#abc");
    assert_eq!(items[0].dimensions.width, 0.1);
    assert_eq!(items[0].dimensions.height, DEFAULT_FURNITURE_EXTENT);
    assert_eq!(items[1].position, PlacementZone::default());
    assert_eq!(items[1].size, SizeClass::Medium);
    assert_eq!(items[1].color, DEFAULT_ITEM_COLOR);
  }

  #[test]
  fn furniture_extents_stay_within_the_room() {
    let item = furniture_descriptor(&serde_json::json!({
      "type": "rug",
      "dimensions": { "width": 4, "height": 1e308, "depth": 0 }
    }));
    assert_eq!(item.dimensions.width, 1.0);
    assert_eq!(item.dimensions.height, 1.0);
    assert_eq!(item.dimensions.depth, DEFAULT_FURNITURE_EXTENT);
  }
}
