use serde_json::json;

use crate::models::SchemaDescriptor;

const BASE_RULES: &str = "\
The style must strictly match \"Classic Detailed Voxel Art\".
Sub-parts MUST touch or overlap (structural integrity).
Use vibrant, clean colors that represent the real object's materials.";

pub fn room_prompt(size_feet: f64) -> String {
  format!(
    "Analyze this room photo and reconstruct it as a 3D modular isometric voxel environment.
The room is approximately {size_feet}x{size_feet} feet.
{BASE_RULES}
Assign objects positions on a grid where 1 unit = 1 foot.
Ensure major furniture pieces are correctly scaled relative to each other and the {size_feet}ft room size.
Return JSON with wallColor, floorColor, and objects array."
  )
}

pub fn object_prompt() -> String {
  format!(
    "Analyze the MAIN SINGLE OBJECT in this photo. Reconstruct it as a high-fidelity 3D voxel module with a \"Voxel Toy\" aesthetic.
{BASE_RULES}
Scaling: Assume the object is a standard size for its type (e.g., a chair is ~1.5x1.5x3 units, a desk is ~4x2x2.5 units). 1 unit = 1 foot.
Focus on the object's most recognizable silhouette and features.
Use 20-40 well-placed blocks to create a stylized version.
Ignore the background environment completely.
Return JSON with a single object definition (name, type, parts, color, description)."
  )
}

pub fn room_state_prompt(size_feet: f64) -> String {
  format!(
    "Analyze this room photo and extract detailed information about the space and existing furniture.
The room is approximately {size_feet}x{size_feet} feet.

Return a JSON object with:
1. name: A descriptive name for the room (e.g., \"Modern Living Room\")
2. theme: The interior design style (e.g., \"scandinavian-minimalist\", \"industrial\", \"bohemian\", \"modern-glam\")
3. colorPalette: Array of 4-5 primary colors used in the room
4. existingItems: Array of furniture/objects visible, each with:
   - name: Item name
   - category: Category (seating, tables, storage, decor, lighting, etc.)
   - position: Estimated x,y,z coordinates in feet
   - dimensions: width, depth, height in feet
5. emptyZones: Array of empty spaces suitable for decoration, each with:
   - type: \"corner\", \"wall\", \"floor\", \"nook\"
   - description: Brief description of the location and lighting
   - position: Estimated x,y,z coordinates

Be specific and detailed. Position coordinates should be relative to a grid where the room is {size_feet}x{size_feet} feet."
  )
}

pub const FURNITURE_PROMPT: &str = "\
Analyze this room image and list every piece of furniture you can see.
Return ONLY a JSON array. Each element must have:
- type: one of desk, chair, bed, monitor, keyboard, plant, lamp, shelf, rug, picture_frame, curtain, sofa, bookshelf, side_table
- position: {\"x\": \"left\" | \"center\" | \"right\", \"z\": \"front\" | \"middle\" | \"back\"}
- size: \"small\" | \"medium\" | \"large\"
- color: hex color such as \"#8B6F47\"
- dimensions: {\"width\", \"height\", \"depth\"} as fractions of the room size between 0 and 1";

pub const RECOMMEND_SYSTEM_PROMPT: &str = "\
You are an interior design AI recommending products from a marketplace.
CRITICAL: Return ONLY valid JSON with NO markdown, NO backticks, NO explanations.

Format:
{
  \"recommendations\": [
    {
      \"productId\": \"prod_XXX\",
      \"reasoning\": \"1-2 sentences why this fits\",
      \"compatibilityScore\": 0.9,
      \"suggestedPosition\": {\"x\": 10, \"y\": 0, \"z\": 10, \"rotation\": 0},
      \"alternatives\": [{\"productId\": \"prod_YYY\", \"reason\": \"alternative reason\"}]
    }
  ],
  \"overallRationale\": \"Summary of recommendations\"
}
Only productId and reasoning are required.";

pub const INTENT_SYSTEM_PROMPT: &str = "\
You are a query parser for a 3D room marketplace. Extract intent and requirements.

CRITICAL: Return ONLY valid JSON with NO markdown formatting, NO backticks, NO explanations.

Format:
{
  \"intent\": \"replace\" | \"add\" | \"style\",
  \"itemType\": \"chair\" | \"plant\" | \"lighting\" | \"decor\" | \"wall-art\",
  \"location\": \"corner\" | \"wall\" | null,
  \"currentItemId\": null,
  \"additionalContext\": \"brief context\"
}";

fn part_schema() -> serde_json::Value {
  json!({
    "type": "array",
    "items": {
      "type": "object",
      "properties": {
        "offset": { "type": "array", "items": { "type": "number" } },
        "dimensions": { "type": "array", "items": { "type": "number" } },
        "color": { "type": "string" }
      },
      "required": ["offset", "dimensions", "color"]
    }
  })
}

fn point_schema() -> serde_json::Value {
  json!({
    "type": "object",
    "properties": { "x": { "type": "number" }, "y": { "type": "number" }, "z": { "type": "number" } }
  })
}

pub fn room_schema() -> SchemaDescriptor {
  SchemaDescriptor(json!({
    "type": "object",
    "properties": {
      "wallColor": { "type": "string" },
      "floorColor": { "type": "string" },
      "objects": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "id": { "type": "string" },
            "name": { "type": "string" },
            "type": { "type": "string" },
            "position": { "type": "array", "items": { "type": "number" }, "minItems": 3, "maxItems": 3 },
            "rotation": { "type": "number" },
            "color": { "type": "string" },
            "description": { "type": "string" },
            "parts": part_schema()
          },
          "required": ["name", "type", "position", "parts"]
        }
      }
    },
    "required": ["wallColor", "floorColor", "objects"]
  }))
}

pub fn object_schema() -> SchemaDescriptor {
  SchemaDescriptor(json!({
    "type": "object",
    "properties": {
      "name": { "type": "string" },
      "type": { "type": "string" },
      "color": { "type": "string" },
      "description": { "type": "string" },
      "parts": part_schema()
    },
    "required": ["name", "type", "parts"]
  }))
}

pub fn room_state_schema() -> SchemaDescriptor {
  SchemaDescriptor(json!({
    "type": "object",
    "properties": {
      "name": { "type": "string" },
      "theme": { "type": "string" },
      "colorPalette": { "type": "array", "items": { "type": "string" } },
      "existingItems": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "name": { "type": "string" },
            "category": { "type": "string" },
            "position": point_schema(),
            "dimensions": {
              "type": "object",
              "properties": {
                "width": { "type": "number" },
                "depth": { "type": "number" },
                "height": { "type": "number" }
              }
            }
          }
        }
      },
      "emptyZones": {
        "type": "array",
        "items": {
          "type": "object",
          "properties": {
            "type": { "type": "string" },
            "description": { "type": "string" },
            "position": point_schema()
          }
        }
      }
    },
    "required": ["name", "theme", "colorPalette", "existingItems", "emptyZones"]
  }))
}

pub fn furniture_schema() -> SchemaDescriptor {
  SchemaDescriptor(json!({
    "type": "array",
    "items": {
      "type": "object",
      "properties": {
        "type": { "type": "string" },
        "position": {
          "type": "object",
          "properties": {
            "x": { "enum": ["left", "center", "right"] },
            "z": { "enum": ["front", "middle", "back"] }
          }
        },
        "size": { "enum": ["small", "medium", "large"] },
        "color": { "type": "string" },
        "dimensions": {
          "type": "object",
          "properties": {
            "width": { "type": "number" },
            "height": { "type": "number" },
            "depth": { "type": "number" }
          }
        }
      },
      "required": ["type", "position", "size", "color", "dimensions"]
    }
  }))
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn prompts_embed_room_size() {
    assert!(room_prompt(12.0).contains("approximately 12x12 feet"));
    assert!(room_state_prompt(9.5).contains("the room is 9.5x9.5 feet"));
  }

  #[test]
  fn schemas_declare_required_fields() {
    assert_eq!(room_schema().0["required"], json!(["wallColor", "floorColor", "objects"]));
    assert_eq!(object_schema().0["required"], json!(["name", "type", "parts"]));
    assert_eq!(room_state_schema().0["required"].as_array().map(Vec::len), Some(5));
    assert_eq!(furniture_schema().0["type"], "array");
  }
}
