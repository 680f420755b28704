//! Catalog-grounded product recommendations for a described room.

use tracing::{debug, info};

use crate::catalog::{Catalog, Product};
use crate::client::ExtractionClient;
use crate::error::{NormalizeError, RecommendError};
use crate::models::{
  ModelRequest, PayloadKind, QueryIntent, Recommendations, RoomData, RoomState,
};
use crate::normalize::{normalize, ExtractionResult, NormalizeContext, DEFAULT_THEME};
use crate::prompts::{INTENT_SYSTEM_PROMPT, RECOMMEND_SYSTEM_PROMPT};

const DEFAULT_PALETTE_LABEL: &str = "neutral";
const EMPTY_ROOM_LABEL: &str = "empty";

/// What the matcher knows about the room. Either source is enough.
#[derive(Clone, Copy, Debug)]
pub struct RoomContext<'a> {
  pub live_room: Option<&'a RoomData>,
  pub cached: Option<&'a RoomState>,
  pub room_size_feet: f64,
}

impl RoomContext<'_> {
  pub fn is_empty(&self) -> bool {
    self.live_room.is_none() && self.cached.is_none()
  }

  fn existing_items(&self) -> String {
    let from_state = self
      .cached
      .map(|s| s.existing_items.iter().map(|i| i.name.as_str()).collect::<Vec<_>>())
      .unwrap_or_default();
    let names = if from_state.is_empty() {
      self
        .live_room
        .map(|r| r.objects.iter().map(|o| o.name.as_str()).collect::<Vec<_>>())
        .unwrap_or_default()
    } else {
      from_state
    };
    if names.is_empty() {
      EMPTY_ROOM_LABEL.to_string()
    } else {
      names.join(", ")
    }
  }

  fn theme(&self) -> &str {
    self
      .cached
      .map(|s| s.theme.as_str())
      .filter(|t| !t.is_empty())
      .unwrap_or(DEFAULT_THEME)
  }

  fn palette(&self) -> String {
    match self.cached {
      Some(state) if !state.color_palette.is_empty() => state.color_palette.join(", "),
      _ => DEFAULT_PALETTE_LABEL.to_string(),
    }
  }
}

pub fn build_prompt(query: &str, ctx: &RoomContext<'_>, catalog: &Catalog) -> String {
  let products =
    serde_json::to_string_pretty(&catalog.summaries()).unwrap_or_else(|_| "[]".to_string());
  let size = ctx.room_size_feet;
  format!(
    "User wants: \"{query}\"
Room size: {size}x{size} feet
Room theme: {theme}
Color palette: {palette}
Current items: {items}

Available products:
{products}

Recommend 2-3 best matching products as JSON only:",
    theme = ctx.theme(),
    palette = ctx.palette(),
    items = ctx.existing_items(),
  )
}

/// Attaches catalog records to every recommendation and alternative whose id matches.
pub fn resolve_products(recs: &mut Recommendations, catalog: &Catalog, room_size_feet: f64) {
  for rec in &mut recs.recommendations {
    rec.product = catalog.find(&rec.product_id);
    rec.spawn_position = rec.product.as_deref().map(|p| spawn_position(p, room_size_feet));
    if rec.product.is_none() {
      debug!(product_id = %rec.product_id, "recommended product not in catalog");
    }
    for alt in &mut rec.alternatives {
      alt.product = catalog.find(&alt.product_id);
    }
  }
}

/// Ranked recommendations in the order the model gave them.
///
/// Fails with [`RecommendError::NoRoomContext`] before any network call when the room is
/// unknown. `bearer` replaces the configured upstream key for this call only.
pub async fn match_products(
  client: &ExtractionClient,
  query: &str,
  ctx: &RoomContext<'_>,
  catalog: &Catalog,
  bearer: Option<&str>,
) -> Result<Recommendations, RecommendError> {
  if ctx.is_empty() {
    return Err(RecommendError::NoRoomContext);
  }

  let request = ModelRequest::text(
    PayloadKind::ProductQuery,
    RECOMMEND_SYSTEM_PROMPT,
    build_prompt(query, ctx, catalog),
  );
  let raw = client.invoke_with(&request, bearer).await?;
  let norm_ctx = NormalizeContext::now(ctx.room_size_feet);
  let mut recs = match normalize(&raw, PayloadKind::ProductQuery, &norm_ctx)? {
    ExtractionResult::ProductQuery(recs) => recs,
    other => {
      return Err(
        NormalizeError::UnexpectedPayload {
          expected: PayloadKind::ProductQuery.as_str(),
          actual: other.kind().as_str(),
        }
        .into(),
      )
    }
  };

  resolve_products(&mut recs, catalog, ctx.room_size_feet);
  info!(
    count = recs.recommendations.len(),
    matched = recs.recommendations.iter().filter(|r| r.product.is_some()).count(),
    "recommendations ready"
  );
  Ok(recs)
}

pub async fn parse_intent(
  client: &ExtractionClient,
  query: &str,
  ctx: &RoomContext<'_>,
  bearer: Option<&str>,
) -> Result<QueryIntent, RecommendError> {
  if ctx.is_empty() {
    return Err(RecommendError::NoRoomContext);
  }

  let prompt = format!(
    "Query: \"{query}\"\n\nRoom has: {}\nTheme: {}\n\nReturn JSON only:",
    ctx.existing_items(),
    ctx.theme()
  );
  let request = ModelRequest::text(PayloadKind::Intent, INTENT_SYSTEM_PROMPT, prompt);
  let raw = client.invoke_with(&request, bearer).await?;
  match normalize(&raw, PayloadKind::Intent, &NormalizeContext::now(ctx.room_size_feet))? {
    ExtractionResult::Intent(intent) => Ok(intent),
    other => Err(
      NormalizeError::UnexpectedPayload {
        expected: PayloadKind::Intent.as_str(),
        actual: other.kind().as_str(),
      }
      .into(),
    ),
  }
}

/// Where a freshly added product appears: room center, lifted by half its height in feet.
pub fn spawn_position(product: &Product, room_size_feet: f64) -> [f64; 3] {
  [
    room_size_feet / 2.0,
    product.dimensions.height / 24.0,
    room_size_feet / 2.0,
  ]
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::models::{FloorSize, VoxelObject};
  use crate::normalize::room_state_from_value;
  use crate::test_support::{chat_reply, test_config, MockUpstream};

  const CATALOG: &str = r#"[
    {"id":"prod_001","name":"Fiddle Leaf Fig","category":"plants","tags":["plant","green"],
     "description":"A very long description","dimensions":{"width":18,"depth":18,"height":60}},
    {"id":"prod_002","name":"Arc Lamp","category":"lighting","tags":["lamp"]},
    {"id":"prod_003","name":"Wool Rug","category":"decor","tags":["rug"]}
  ]"#;

  fn catalog() -> Catalog {
    Catalog::from_json(CATALOG).unwrap()
  }

  fn cached_state() -> RoomState {
    let ctx = NormalizeContext {
      created_at_ms: 1,
      room_size_feet: 12.0,
      spawn_position: [0.0; 3],
    };
    room_state_from_value(
      &serde_json::json!({
        "theme": "scandinavian-minimalist",
        "colorPalette": ["white", "oak"],
        "existingItems": [{ "name": "Sofa" }, { "name": "Bookshelf" }]
      }),
      &ctx,
    )
  }

  fn live_room() -> RoomData {
    RoomData {
      wall_color: "#ffffff".to_string(),
      floor_color: "#000000".to_string(),
      dimensions: FloorSize { width: 12.0, depth: 12.0 },
      objects: vec![VoxelObject {
        id: "o1".to_string(),
        name: "Desk".to_string(),
        kind: "desk".to_string(),
        position: [0.0; 3],
        rotation: 0.0,
        color: None,
        description: None,
        visible: true,
        parts: Vec::new(),
      }],
    }
  }

  fn client_for(upstream: &MockUpstream) -> ExtractionClient {
    ExtractionClient::new(&test_config(&upstream.endpoint()), Some("sk-config".to_string())).unwrap()
  }

  #[tokio::test]
  async fn fenced_reply_resolves_against_catalog() {
    let reply = "```json\n{\"recommendations\":[{\"productId\":\"prod_001\",\"reasoning\":\"fits theme\"}]}\n```";
    let upstream = MockUpstream::start(move |_, _| (200, chat_reply(reply))).await;
    let client = client_for(&upstream);
    let state = cached_state();
    let ctx = RoomContext {
      live_room: None,
      cached: Some(&state),
      room_size_feet: 12.0,
    };

    let recs = match_products(&client, "a tall plant", &ctx, &catalog(), None).await.unwrap();

    assert_eq!(recs.recommendations.len(), 1);
    let rec = &recs.recommendations[0];
    assert_eq!(rec.compatibility_score, 0.85);
    assert_eq!(rec.reasoning, "fits theme");
    assert_eq!(rec.product.as_ref().map(|p| p.name.as_str()), Some("Fiddle Leaf Fig"));
    assert_eq!(rec.spawn_position, Some([6.0, 2.5, 6.0]));
  }

  #[tokio::test]
  async fn missing_context_fails_without_calling_upstream() {
    let upstream = MockUpstream::start(|_, _| (200, chat_reply("{}"))).await;
    let client = client_for(&upstream);
    let ctx = RoomContext {
      live_room: None,
      cached: None,
      room_size_feet: 12.0,
    };

    let err = match_products(&client, "lamp", &ctx, &catalog(), None).await.unwrap_err();

    assert!(matches!(err, RecommendError::NoRoomContext));
    assert_eq!(err.to_string(), "No room data available for recommendations");
    assert_eq!(upstream.hit_count(), 0);
  }

  #[tokio::test]
  async fn keeps_model_order_and_leaves_unknown_products_unresolved() {
    let reply = r#"{"recommendations":[
      {"productId":"prod_999","reasoning":"ghost","compatibilityScore":0.4},
      {"productId":"prod_002","reasoning":"bright","compatibilityScore":0.95,
       "alternatives":[{"productId":"prod_003","reason":"softer"}]}
    ],"overallRationale":"light it up"}"#;
    let upstream = MockUpstream::start(move |_, _| (200, chat_reply(reply))).await;
    let client = client_for(&upstream);
    let room = live_room();
    let ctx = RoomContext {
      live_room: Some(&room),
      cached: None,
      room_size_feet: 12.0,
    };

    let recs = match_products(&client, "lighting", &ctx, &catalog(), None).await.unwrap();

    let ids: Vec<_> = recs.recommendations.iter().map(|r| r.product_id.as_str()).collect();
    assert_eq!(ids, ["prod_999", "prod_002"]);
    assert!(recs.recommendations[0].product.is_none());
    assert!(recs.recommendations[0].spawn_position.is_none());
    let alt = &recs.recommendations[1].alternatives[0];
    assert_eq!(alt.product.as_ref().map(|p| p.id.as_str()), Some("prod_003"));
    assert_eq!(recs.overall_rationale.as_deref(), Some("light it up"));
  }

  #[tokio::test]
  async fn prose_reply_surfaces_malformed_output() {
    let upstream = MockUpstream::start(|_, _| (200, chat_reply("I would suggest a lamp."))).await;
    let client = client_for(&upstream);
    let room = live_room();
    let ctx = RoomContext {
      live_room: Some(&room),
      cached: None,
      room_size_feet: 12.0,
    };

    let err = match_products(&client, "lamp", &ctx, &catalog(), None).await.unwrap_err();
    assert!(matches!(err, RecommendError::Normalize(NormalizeError::MalformedOutput(_))));
  }

  #[tokio::test]
  async fn cut_off_reply_surfaces_malformed_output() {
    let reply = "{\"recommendations\":[{\"productId\":\"prod_001\",\"reasoning\":\"green\"},{\"productId\":\"prod_002\",\"reas";
    let upstream = MockUpstream::start(move |_, _| (200, chat_reply(reply))).await;
    let client = client_for(&upstream);
    let room = live_room();
    let ctx = RoomContext {
      live_room: Some(&room),
      cached: None,
      room_size_feet: 12.0,
    };

    let err = match_products(&client, "plant", &ctx, &catalog(), None).await.unwrap_err();
    assert!(matches!(err, RecommendError::Normalize(NormalizeError::MalformedOutput(_))));
  }

  #[tokio::test]
  async fn session_token_and_system_prompt_are_sent() {
    let upstream = MockUpstream::start(|_, _| (200, chat_reply("{\"recommendations\":[]}"))).await;
    let client = client_for(&upstream);
    let room = live_room();
    let ctx = RoomContext {
      live_room: Some(&room),
      cached: None,
      room_size_feet: 12.0,
    };

    match_products(&client, "rug", &ctx, &catalog(), Some("session-123")).await.unwrap();

    let hit = &upstream.hits()[0];
    assert_eq!(hit.authorization.as_deref(), Some("Bearer session-123"));
    assert_eq!(hit.body["messages"][0]["role"], "system");
    assert!(hit.body.get("response_format").is_none());
  }

  #[test]
  fn prompt_embeds_context_and_reduced_catalog() {
    let state = cached_state();
    let ctx = RoomContext {
      live_room: None,
      cached: Some(&state),
      room_size_feet: 12.0,
    };
    let prompt = build_prompt("a cozy corner", &ctx, &catalog());

    assert!(prompt.starts_with("User wants: \"a cozy corner\"\nRoom size: 12x12 feet\n"));
    assert!(prompt.contains("Room theme: scandinavian-minimalist"));
    assert!(prompt.contains("Color palette: white, oak"));
    assert!(prompt.contains("Current items: Sofa, Bookshelf"));
    assert!(prompt.contains("\"id\": \"prod_003\""));
    assert!(!prompt.contains("A very long description"));
  }

  #[test]
  fn prompt_falls_back_to_live_room_and_defaults() {
    let room = live_room();
    let ctx = RoomContext {
      live_room: Some(&room),
      cached: None,
      room_size_feet: 10.0,
    };
    let prompt = build_prompt("x", &ctx, &Catalog::default());

    assert!(prompt.contains("Room theme: modern"));
    assert!(prompt.contains("Color palette: neutral"));
    assert!(prompt.contains("Current items: Desk"));
  }

  #[tokio::test]
  async fn intent_defaults_unknown_kinds_to_add() {
    let reply = "{\"intent\":\"teleport\",\"itemType\":\"plant\",\"location\":\"corner\",\"additionalContext\":\"green\"}";
    let upstream = MockUpstream::start(move |_, _| (200, chat_reply(reply))).await;
    let client = client_for(&upstream);
    let state = cached_state();
    let ctx = RoomContext {
      live_room: None,
      cached: Some(&state),
      room_size_feet: 12.0,
    };

    let intent = parse_intent(&client, "put a plant in the corner", &ctx, None).await.unwrap();

    assert_eq!(intent.intent, crate::models::IntentKind::Add);
    assert_eq!(intent.item_type.as_deref(), Some("plant"));
    assert_eq!(intent.location.as_deref(), Some("corner"));
    let prompt = upstream.hits()[0].body["messages"][1]["content"].as_str().unwrap().to_string();
    assert!(prompt.contains("Room has: Sofa, Bookshelf"));
  }

  #[test]
  fn spawn_position_centers_product() {
    let catalog = catalog();
    let fig = catalog.find("prod_001").unwrap();
    assert_eq!(spawn_position(&fig, 12.0), [6.0, 2.5, 6.0]);
  }
}
