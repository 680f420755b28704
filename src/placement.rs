//! Maps zone-labelled furniture onto concrete scene coordinates.
//!
//! The floor is a 3x3 grid of zones. Items sharing a zone are spread along X around the
//! zone anchor, and every item is lifted so its lowest geometry sits on the floor plane.

use serde::{Deserialize, Serialize};

use crate::models::Point3;

/// Scene units per normalized room width.
pub const ROOM_SCALE: f64 = 10.0;
pub const ZONE_ANCHOR_FRACTION: f64 = 0.35;
pub const GROUP_SPACING: f64 = 1.5;
pub const FLOOR_EPSILON: f64 = 0.01;
/// Extent used when a normalized dimension is missing, zero or unusable.
pub const DEFAULT_EXTENT: f64 = 0.2;

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZoneX {
  Left,
  #[default]
  Center,
  Right,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum ZoneZ {
  Front,
  #[default]
  Middle,
  Back,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub struct PlacementZone {
  pub x: ZoneX,
  pub z: ZoneZ,
}

impl PlacementZone {
  /// Anything outside the nine known label pairs collapses to center-middle.
  pub fn from_labels(x: Option<&str>, z: Option<&str>) -> Self {
    let x = match x.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
      Some("left") => Some(ZoneX::Left),
      Some("center") => Some(ZoneX::Center),
      Some("right") => Some(ZoneX::Right),
      _ => None,
    };
    let z = match z.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
      Some("front") => Some(ZoneZ::Front),
      Some("middle") => Some(ZoneZ::Middle),
      Some("back") => Some(ZoneZ::Back),
      _ => None,
    };
    match (x, z) {
      (Some(x), Some(z)) => Self { x, z },
      _ => Self::default(),
    }
  }

  pub fn anchor(&self, scale: f64) -> (f64, f64) {
    let reach = scale * ZONE_ANCHOR_FRACTION;
    let x = match self.x {
      ZoneX::Left => -reach,
      ZoneX::Center => 0.0,
      ZoneX::Right => reach,
    };
    let z = match self.z {
      ZoneZ::Front => reach,
      ZoneZ::Middle => 0.0,
      ZoneZ::Back => -reach,
    };
    (x, z)
  }

  fn bucket(&self) -> usize {
    let x = match self.x {
      ZoneX::Left => 0,
      ZoneX::Center => 1,
      ZoneX::Right => 2,
    };
    let z = match self.z {
      ZoneZ::Front => 0,
      ZoneZ::Middle => 1,
      ZoneZ::Back => 2,
    };
    x * 3 + z
  }
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum SizeClass {
  Small,
  #[default]
  Medium,
  Large,
}

impl SizeClass {
  pub fn from_label(label: Option<&str>) -> Self {
    match label.map(|s| s.trim().to_ascii_lowercase()).as_deref() {
      Some("small") => SizeClass::Small,
      Some("large") => SizeClass::Large,
      _ => SizeClass::Medium,
    }
  }
}

/// Fractions of the room size.
#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct NormalizedDimensions {
  pub width: f64,
  pub height: f64,
  pub depth: f64,
}

impl NormalizedDimensions {
  /// Keeps `value` inside (0, 1]. Non-finite and non-positive values take `DEFAULT_EXTENT`.
  pub fn clamp_extent(value: f64) -> f64 {
    if value.is_finite() && value > 0.0 {
      value.min(1.0)
    } else {
      DEFAULT_EXTENT
    }
  }

  pub fn clamped(self) -> Self {
    Self {
      width: Self::clamp_extent(self.width),
      height: Self::clamp_extent(self.height),
      depth: Self::clamp_extent(self.depth),
    }
  }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct FurnitureDescriptor {
  #[serde(rename = "type")]
  pub kind: String,
  pub position: PlacementZone,
  pub size: SizeClass,
  pub color: String,
  pub dimensions: NormalizedDimensions,
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq)]
pub struct Aabb {
  pub min: Point3,
  pub max: Point3,
}

impl Aabb {
  fn around(center: Point3, half: [f64; 3]) -> Self {
    Self {
      min: Point3 {
        x: center.x - half[0],
        y: center.y - half[1],
        z: center.z - half[2],
      },
      max: Point3 {
        x: center.x + half[0],
        y: center.y + half[1],
        z: center.z + half[2],
      },
    }
  }

  fn union(self, other: Aabb) -> Aabb {
    Aabb {
      min: Point3 {
        x: self.min.x.min(other.min.x),
        y: self.min.y.min(other.min.y),
        z: self.min.z.min(other.min.z),
      },
      max: Point3 {
        x: self.max.x.max(other.max.x),
        y: self.max.y.max(other.max.y),
        z: self.max.z.max(other.max.z),
      },
    }
  }

  fn translate(self, by: Point3) -> Aabb {
    Aabb {
      min: Point3 {
        x: self.min.x + by.x,
        y: self.min.y + by.y,
        z: self.min.z + by.z,
      },
      max: Point3 {
        x: self.max.x + by.x,
        y: self.max.y + by.y,
        z: self.max.z + by.z,
      },
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Primitive {
  Box {
    center: Point3,
    size: [f64; 3],
  },
  Cylinder {
    center: Point3,
    radius_top: f64,
    radius_bottom: f64,
    height: f64,
  },
}

impl Primitive {
  pub fn bounds(&self) -> Aabb {
    match *self {
      Primitive::Box { center, size } => Aabb::around(center, [size[0] / 2.0, size[1] / 2.0, size[2] / 2.0]),
      Primitive::Cylinder {
        center,
        radius_top,
        radius_bottom,
        height,
      } => {
        let r = radius_top.max(radius_bottom);
        Aabb::around(center, [r, height / 2.0, r])
      }
    }
  }
}

fn at(x: f64, y: f64, z: f64) -> Point3 {
  Point3 { x, y, z }
}

fn cuboid(center: Point3, w: f64, h: f64, d: f64) -> Primitive {
  Primitive::Box {
    center,
    size: [w, h, d],
  }
}

fn four_legs(parts: &mut Vec<Primitive>, spread_x: f64, spread_z: f64, thickness: f64, height: f64) {
  for sx in [-1.0, 1.0] {
    for sz in [-1.0, 1.0] {
      parts.push(cuboid(at(sx * spread_x, height / 2.0, sz * spread_z), thickness, height, thickness));
    }
  }
}

/// Box/cylinder composition for one furniture type, in local space. Every composition
/// has a part whose bottom face is at y = 0.
pub fn furniture_geometry(kind: &str, dims: &NormalizedDimensions, scale: f64) -> Vec<Primitive> {
  let (w, h, d) = (dims.width * scale, dims.height * scale, dims.depth * scale);
  let mut parts = Vec::new();
  match kind {
    "desk" => {
      parts.push(cuboid(at(0.0, h * 0.5, 0.0), w, h * 0.2, d));
      four_legs(&mut parts, w * 0.4, d * 0.4, 0.2, h * 0.8);
    }
    "chair" => {
      parts.push(cuboid(at(0.0, h * 0.4, 0.0), w * 0.8, h * 0.15, d * 0.8));
      parts.push(cuboid(at(0.0, h * 0.65, -d * 0.35), w * 0.8, h * 0.5, d * 0.1));
      four_legs(&mut parts, w * 0.3, d * 0.3, 0.15, h * 0.4);
    }
    "bed" => {
      parts.push(cuboid(at(0.0, h * 0.5, 0.0), w, h * 0.3, d));
      parts.push(cuboid(at(0.0, h * 0.1, 0.0), w, h * 0.2, d));
    }
    "monitor" => {
      parts.push(cuboid(at(0.0, h * 0.6, 0.0), w, h * 0.7, d * 0.3));
      parts.push(cuboid(at(0.0, h * 0.6, d * 0.16), w * 0.9, h * 0.6, 0.05));
      parts.push(cuboid(at(0.0, h * 0.15, 0.0), 0.3, h * 0.3, 0.3));
    }
    "keyboard" => {
      parts.push(cuboid(at(0.0, h * 0.5, 0.0), w, h, d));
      parts.push(cuboid(at(0.0, h * 0.55, 0.0), w * 0.9, 0.1, d * 0.9));
    }
    "plant" => {
      parts.push(Primitive::Cylinder {
        center: at(0.0, h * 0.15, 0.0),
        radius_top: w * 0.4,
        radius_bottom: w * 0.3,
        height: h * 0.3,
      });
      let radius = w * 0.3;
      for i in 0..5 {
        let angle = std::f64::consts::TAU * i as f64 / 5.0;
        parts.push(cuboid(at(angle.cos() * radius, h * 0.5, angle.sin() * radius), 0.3, 0.3, 0.3));
      }
    }
    "lamp" => {
      parts.push(Primitive::Cylinder {
        center: at(0.0, h * 0.075, 0.0),
        radius_top: w * 0.5,
        radius_bottom: w * 0.6,
        height: h * 0.15,
      });
      parts.push(Primitive::Cylinder {
        center: at(0.0, h * 0.45, 0.0),
        radius_top: 0.1,
        radius_bottom: 0.1,
        height: h * 0.6,
      });
      parts.push(Primitive::Cylinder {
        center: at(0.0, h * 0.875, 0.0),
        radius_top: w * 0.8,
        radius_bottom: w * 0.5,
        height: h * 0.25,
      });
    }
    "picture_frame" => {
      parts.push(cuboid(at(0.0, h * 0.5, 0.0), w, h, d));
      parts.push(cuboid(at(0.0, h * 0.5, d * 0.51), w * 0.8, h * 0.8, 0.05));
    }
    "sofa" => {
      parts.push(cuboid(at(0.0, h * 0.2125, 0.0), w, h * 0.425, d * 0.7));
      parts.push(cuboid(at(0.0, h * 0.4, -d * 0.27), w, h * 0.8, d * 0.15));
      parts.push(cuboid(at(-w * 0.45, h * 0.325, 0.0), w * 0.1, h * 0.65, d * 0.7));
      parts.push(cuboid(at(w * 0.45, h * 0.325, 0.0), w * 0.1, h * 0.65, d * 0.7));
    }
    "bookshelf" => {
      parts.push(cuboid(at(0.0, h * 0.5, 0.0), w, h, d));
      for i in 1..4 {
        parts.push(cuboid(at(0.0, h / 4.0 * i as f64, 0.0), w * 0.95, 0.1, d * 0.9));
      }
    }
    "side_table" => {
      parts.push(cuboid(at(0.0, h * 0.9, 0.0), w, h * 0.15, d));
      four_legs(&mut parts, w * 0.4, d * 0.4, 0.15, h * 0.85);
    }
    // shelf, rug, curtain and anything unrecognised
    _ => parts.push(cuboid(at(0.0, h * 0.5, 0.0), w, h, d)),
  }
  parts
}

pub fn local_bounds(parts: &[Primitive]) -> Aabb {
  parts
    .iter()
    .map(Primitive::bounds)
    .reduce(Aabb::union)
    .unwrap_or_else(|| Aabb::around(Point3::default(), [0.0, 0.0, 0.0]))
}

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Default)]
pub struct GroupOffset {
  pub dx: f64,
  pub dz: f64,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PlacedItem {
  pub source_index: usize,
  #[serde(rename = "type")]
  pub kind: String,
  pub zone: PlacementZone,
  pub size: SizeClass,
  pub color: String,
  pub normalized_dimensions: NormalizedDimensions,
  pub resolved_position: Point3,
  pub group_offset: GroupOffset,
  pub bounds: Aabb,
}

/// In-zone X offset for slot `index` of `count` items sharing a zone.
pub fn group_offset(index: usize, count: usize) -> GroupOffset {
  if count <= 1 {
    return GroupOffset::default();
  }
  GroupOffset {
    dx: (index as f64 - (count as f64 - 1.0) / 2.0) * GROUP_SPACING,
    dz: 0.0,
  }
}

/// One generation pass worth of placed items, indexed contiguously from 0.
#[derive(Serialize, Clone, Debug, PartialEq, Default)]
pub struct Layout {
  items: Vec<PlacedItem>,
}

impl Layout {
  pub fn resolve(descriptors: &[FurnitureDescriptor]) -> Self {
    let mut counts = [0usize; 9];
    let slots: Vec<usize> = descriptors
      .iter()
      .map(|d| {
        let bucket = d.position.bucket();
        let slot = counts[bucket];
        counts[bucket] += 1;
        slot
      })
      .collect();

    let items = descriptors
      .iter()
      .zip(slots)
      .enumerate()
      .map(|(index, (desc, slot))| {
        let offset = group_offset(slot, counts[desc.position.bucket()]);
        place(index, desc, offset)
      })
      .collect();
    Self { items }
  }

  pub fn items(&self) -> &[PlacedItem] {
    &self.items
  }

  pub fn into_items(self) -> Vec<PlacedItem> {
    self.items
  }

  /// Drops one item and renumbers the ones after it so indices stay contiguous.
  pub fn remove(&mut self, index: usize) -> Option<PlacedItem> {
    if index >= self.items.len() {
      return None;
    }
    let removed = self.items.remove(index);
    for (i, item) in self.items.iter_mut().enumerate().skip(index) {
      item.source_index = i;
    }
    Some(removed)
  }
}

fn place(index: usize, desc: &FurnitureDescriptor, offset: GroupOffset) -> PlacedItem {
  let dims = desc.dimensions.clamped();
  let parts = furniture_geometry(&desc.kind, &dims, ROOM_SCALE);
  let local = local_bounds(&parts);
  let (anchor_x, anchor_z) = desc.position.anchor(ROOM_SCALE);
  let position = Point3 {
    x: anchor_x + offset.dx,
    y: -local.min.y + FLOOR_EPSILON,
    z: anchor_z + offset.dz,
  };

  PlacedItem {
    source_index: index,
    kind: desc.kind.clone(),
    zone: desc.position,
    size: desc.size,
    color: desc.color.clone(),
    normalized_dimensions: dims,
    resolved_position: position,
    group_offset: offset,
    bounds: local.translate(position),
  }
}

pub fn resolve(descriptors: &[FurnitureDescriptor]) -> Vec<PlacedItem> {
  Layout::resolve(descriptors).into_items()
}
