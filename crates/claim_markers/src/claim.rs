use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

pub type PlayerId = Uuid;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorldId(pub String);

impl WorldId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockPos {
    pub x: i32,
    pub y: i32,
    pub z: i32,
}

impl BlockPos {
    pub const fn new(x: i32, y: i32, z: i32) -> Self {
        Self { x, y, z }
    }

    /// `"x, y, z"`, the form used inside marker ids.
    pub fn to_short_string(self) -> String {
        format!("{}, {}, {}", self.x, self.y, self.z)
    }
}

#[derive(Debug, Clone, Copy, Deserialize)]
struct RawClaimBox {
    min: BlockPos,
    max: BlockPos,
}

/// Axis-aligned claim bounds. Construction orders each axis so `min <= max`
/// always holds, including for deserialized boxes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RawClaimBox")]
pub struct ClaimBox {
    min: BlockPos,
    max: BlockPos,
}

impl From<RawClaimBox> for ClaimBox {
    fn from(raw: RawClaimBox) -> Self {
        ClaimBox::new(raw.min, raw.max)
    }
}

impl ClaimBox {
    pub fn new(a: BlockPos, b: BlockPos) -> Self {
        Self {
            min: BlockPos::new(a.x.min(b.x), a.y.min(b.y), a.z.min(b.z)),
            max: BlockPos::new(a.x.max(b.x), a.y.max(b.y), a.z.max(b.z)),
        }
    }

    /// Box of `radius` blocks around `origin` on every axis, clamped to the
    /// coordinate range.
    pub fn around(origin: BlockPos, radius: i32) -> Self {
        let radius = radius.saturating_abs();
        Self::new(
            BlockPos::new(
                origin.x.saturating_sub(radius),
                origin.y.saturating_sub(radius),
                origin.z.saturating_sub(radius),
            ),
            BlockPos::new(
                origin.x.saturating_add(radius),
                origin.y.saturating_add(radius),
                origin.z.saturating_add(radius),
            ),
        )
    }

    pub fn min(&self) -> BlockPos {
        self.min
    }

    pub fn max(&self) -> BlockPos {
        self.max
    }

    pub fn x_range(&self) -> [f64; 2] {
        [f64::from(self.min.x), f64::from(self.max.x)]
    }

    pub fn y_range(&self) -> [f64; 2] {
        [f64::from(self.min.y), f64::from(self.max.y)]
    }

    pub fn z_range(&self) -> [f64; 2] {
        [f64::from(self.min.z), f64::from(self.max.z)]
    }
}

/// Visual resource a head image is cut from.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum HeadTexture {
    #[default]
    None,
    /// Direct skin image URL.
    Url(String),
    /// Base64 texture property as carried by game profiles.
    Encoded(String),
}

/// Anything the label shows as a head image followed by a display name.
pub trait HeadTextured {
    fn display_name(&self) -> &str;
    fn head_texture(&self) -> &HeadTexture;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimType {
    pub name: String,
    #[serde(default)]
    pub texture: HeadTexture,
}

impl HeadTextured for ClaimType {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn head_texture(&self) -> &HeadTexture {
        &self.texture
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Augment {
    pub name: String,
    #[serde(default)]
    pub texture: HeadTexture,
}

impl HeadTextured for Augment {
    fn display_name(&self) -> &str {
        &self.name
    }

    fn head_texture(&self) -> &HeadTexture {
        &self.texture
    }
}

/// A claim as reported by the registry. `world` and `origin` never change
/// for the lifetime of a claim; everything else may.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Claim {
    pub world: WorldId,
    pub origin: BlockPos,
    #[serde(rename = "type")]
    pub claim_type: ClaimType,
    pub bounds: ClaimBox,
    #[serde(default)]
    pub owners: BTreeSet<PlayerId>,
    #[serde(default)]
    pub trusted: BTreeSet<PlayerId>,
    #[serde(default)]
    pub augments: BTreeMap<String, Augment>,
}

impl Claim {
    pub fn new(world: WorldId, origin: BlockPos, claim_type: ClaimType, bounds: ClaimBox) -> Self {
        Self {
            world,
            origin,
            claim_type,
            bounds,
            owners: BTreeSet::new(),
            trusted: BTreeSet::new(),
            augments: BTreeMap::new(),
        }
    }

    pub fn has_augments(&self) -> bool {
        !self.augments.is_empty()
    }

    /// True when `player` is an owner or trusted member.
    pub fn references(&self, player: PlayerId) -> bool {
        self.owners.contains(&player) || self.trusted.contains(&player)
    }
}

/// Read side of the claim registry, queried at reconciliation and when a
/// player's name changes.
pub trait ClaimRegistry {
    fn worlds(&self) -> Vec<WorldId>;
    fn claims_in(&self, world: &WorldId) -> Vec<Claim>;
    /// Display name the map service knows the world by, if loaded.
    fn world_name(&self, world: &WorldId) -> Option<String>;
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn claim_box_orders_each_axis() {
        let bounds = ClaimBox::new(BlockPos::new(5, -3, 9), BlockPos::new(-2, 10, 1));
        assert_eq!(bounds.min(), BlockPos::new(-2, -3, 1));
        assert_eq!(bounds.max(), BlockPos::new(5, 10, 9));
        assert_eq!(bounds.x_range(), [-2.0, 5.0]);
        assert_eq!(bounds.z_range(), [1.0, 9.0]);
    }

    #[test]
    fn deserialized_box_is_normalized() {
        let bounds: ClaimBox = serde_json::from_value(json!({
            "min": { "x": 4, "y": 0, "z": 4 },
            "max": { "x": 0, "y": 8, "z": 0 }
        }))
        .expect("box");
        assert_eq!(bounds.min(), BlockPos::new(0, 0, 0));
        assert_eq!(bounds.max(), BlockPos::new(4, 8, 4));
    }

    #[test]
    fn around_clamps_at_coordinate_limits() {
        let edge = ClaimBox::around(BlockPos::new(i32::MAX, 0, i32::MIN), i32::MIN);
        assert_eq!(edge.min(), BlockPos::new(0, i32::MIN + 1, i32::MIN));
        assert_eq!(edge.max(), BlockPos::new(i32::MAX, i32::MAX, -1));
    }

    #[test]
    fn references_checks_owners_and_trusted() {
        let owner = Uuid::from_u128(1);
        let guest = Uuid::from_u128(2);
        let stranger = Uuid::from_u128(3);
        let origin = BlockPos::new(0, 64, 0);
        let mut claim = Claim::new(
            WorldId::new("minecraft:overworld"),
            origin,
            ClaimType {
                name: "Farm".to_string(),
                texture: HeadTexture::None,
            },
            ClaimBox::around(origin, 8),
        );
        claim.owners.insert(owner);
        claim.trusted.insert(guest);

        assert!(claim.references(owner));
        assert!(claim.references(guest));
        assert!(!claim.references(stranger));
    }

    #[test]
    fn head_texture_uses_tagged_json() {
        let texture: HeadTexture =
            serde_json::from_value(json!({ "kind": "url", "value": "http://skins/a.png" }))
                .expect("texture");
        assert_eq!(texture, HeadTexture::Url("http://skins/a.png".to_string()));
    }
}
