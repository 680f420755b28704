use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct ProductDimensions {
  pub width: f64,
  pub depth: f64,
  pub height: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
  pub id: String,
  pub name: String,
  pub category: String,
  pub subcategory: String,
  pub price: f64,
  pub dimensions: ProductDimensions,
  pub colors: Vec<String>,
  pub styles: Vec<String>,
  pub description: String,
  pub tags: Vec<String>,
  pub image_url: String,
}

/// Reduced projection embedded in prompts.
#[derive(Serialize, Debug, PartialEq)]
pub struct ProductSummary<'a> {
  pub id: &'a str,
  pub name: &'a str,
  pub category: &'a str,
  pub tags: &'a [String],
}

/// Read-only product list, loaded once at startup.
#[derive(Clone, Debug, Default)]
pub struct Catalog {
  products: Vec<Arc<Product>>,
}

impl Catalog {
  pub fn new(products: Vec<Product>) -> Self {
    Self {
      products: products.into_iter().map(Arc::new).collect(),
    }
  }

  pub fn from_json(json: &str) -> anyhow::Result<Self> {
    let products: Vec<Product> = serde_json::from_str(json)?;
    Ok(Self::new(products))
  }

  /// A missing file yields an empty catalog; a present but invalid one is an error.
  pub fn load(path: &Path) -> anyhow::Result<Self> {
    if !path.exists() {
      warn!(path = %path.display(), "catalog file missing, starting with an empty catalog");
      return Ok(Self::default());
    }
    let data = std::fs::read_to_string(path)
      .with_context(|| format!("reading catalog {}", path.display()))?;
    let catalog = Self::from_json(&data).with_context(|| format!("parsing catalog {}", path.display()))?;
    info!(products = catalog.len(), "catalog loaded");
    Ok(catalog)
  }

  pub fn find(&self, id: &str) -> Option<Arc<Product>> {
    self.products.iter().find(|p| p.id == id).cloned()
  }

  pub fn summaries(&self) -> Vec<ProductSummary<'_>> {
    self
      .products
      .iter()
      .map(|p| ProductSummary {
        id: &p.id,
        name: &p.name,
        category: &p.category,
        tags: &p.tags,
      })
      .collect()
  }

  pub fn len(&self) -> usize {
    self.products.len()
  }

  pub fn is_empty(&self) -> bool {
    self.products.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const SAMPLE: &str = r#"[
    {"id":"prod_001","name":"Fiddle Leaf Fig","category":"plants","subcategory":"floor","price":89.0,
     "dimensions":{"width":18,"depth":18,"height":60},"colors":["green"],"styles":["boho"],
     "description":"Tall indoor plant","tags":["plant","green"],"imageUrl":"/img/fig.png"},
    {"id":"prod_002","name":"Arc Lamp","category":"lighting"}
  ]"#;

  #[test]
  fn parses_products_with_missing_fields() {
    let catalog = Catalog::from_json(SAMPLE).unwrap();
    assert_eq!(catalog.len(), 2);
    let lamp = catalog.find("prod_002").unwrap();
    assert_eq!(lamp.price, 0.0);
    assert!(lamp.tags.is_empty());
    assert!(catalog.find("prod_999").is_none());
  }

  #[test]
  fn summaries_omit_descriptions_and_images() {
    let catalog = Catalog::from_json(SAMPLE).unwrap();
    let json = serde_json::to_value(catalog.summaries()).unwrap();
    assert_eq!(json[0], serde_json::json!({ "id": "prod_001", "name": "Fiddle Leaf Fig", "category": "plants", "tags": ["plant", "green"] }));
    assert!(json[0].get("description").is_none());
  }

  #[test]
  fn missing_file_loads_empty() {
    let dir = tempfile::tempdir().unwrap();
    let catalog = Catalog::load(&dir.path().join("nope.json")).unwrap();
    assert!(catalog.is_empty());
  }
}
