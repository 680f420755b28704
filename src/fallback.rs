//! Canned furniture list served when image analysis cannot produce one.

use crate::placement::{
  FurnitureDescriptor, NormalizedDimensions, PlacementZone, SizeClass, ZoneX, ZoneZ,
};

/// Bump when the table below changes; fixtures pin against it.
pub const FALLBACK_VERSION: u32 = 1;

type Row = (&'static str, ZoneX, ZoneZ, SizeClass, &'static str, [f64; 3]);

const ROWS: [Row; 15] = [
  ("desk", ZoneX::Center, ZoneZ::Back, SizeClass::Large, "#FFFFFF", [0.4, 0.15, 0.3]),
  ("chair", ZoneX::Center, ZoneZ::Middle, SizeClass::Medium, "#FF6B9D", [0.15, 0.2, 0.15]),
  ("monitor", ZoneX::Center, ZoneZ::Back, SizeClass::Medium, "#2C3E50", [0.2, 0.15, 0.05]),
  ("keyboard", ZoneX::Center, ZoneZ::Back, SizeClass::Small, "#34495E", [0.15, 0.02, 0.05]),
  ("bed", ZoneX::Left, ZoneZ::Back, SizeClass::Large, "#E8D5C4", [0.35, 0.12, 0.45]),
  ("lamp", ZoneX::Left, ZoneZ::Back, SizeClass::Small, "#F4D03F", [0.06, 0.3, 0.06]),
  ("plant", ZoneX::Right, ZoneZ::Front, SizeClass::Medium, "#27AE60", [0.1, 0.25, 0.1]),
  ("bookshelf", ZoneX::Right, ZoneZ::Back, SizeClass::Large, "#8B6F47", [0.25, 0.45, 0.1]),
  ("rug", ZoneX::Center, ZoneZ::Middle, SizeClass::Large, "#D7BDE2", [0.5, 0.01, 0.4]),
  ("sofa", ZoneX::Left, ZoneZ::Front, SizeClass::Large, "#5D6D7E", [0.4, 0.18, 0.18]),
  ("side_table", ZoneX::Left, ZoneZ::Front, SizeClass::Small, "#A0522D", [0.1, 0.12, 0.1]),
  ("picture_frame", ZoneX::Right, ZoneZ::Middle, SizeClass::Small, "#F5B041", [0.12, 0.15, 0.02]),
  ("curtain", ZoneX::Right, ZoneZ::Middle, SizeClass::Medium, "#AED6F1", [0.3, 0.5, 0.02]),
  ("shelf", ZoneX::Right, ZoneZ::Front, SizeClass::Medium, "#D5DBDB", [0.2, 0.1, 0.08]),
  ("plant", ZoneX::Left, ZoneZ::Middle, SizeClass::Small, "#1E8449", [0.08, 0.15, 0.08]),
];

pub fn fallback_furniture() -> Vec<FurnitureDescriptor> {
  ROWS
    .iter()
    .map(|&(kind, x, z, size, color, [width, height, depth])| FurnitureDescriptor {
      kind: kind.to_string(),
      position: PlacementZone { x, z },
      size,
      color: color.to_string(),
      dimensions: NormalizedDimensions { width, height, depth },
    })
    .collect()
}
