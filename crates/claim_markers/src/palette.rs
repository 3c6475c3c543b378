use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::claim::{BlockPos, Claim};

/// Concrete block palette, in block order.
pub const DEFAULT_PALETTE: [Rgb; 16] = [
    Rgb(0xcfd5d6),
    Rgb(0xe06101),
    Rgb(0xa9309f),
    Rgb(0x2489c7),
    Rgb(0xf1af15),
    Rgb(0x5ea918),
    Rgb(0xd5658f),
    Rgb(0x373a3e),
    Rgb(0x7d7d73),
    Rgb(0x157788),
    Rgb(0x64209c),
    Rgb(0x2d2f8f),
    Rgb(0x603c20),
    Rgb(0x495b24),
    Rgb(0x8e2121),
    Rgb(0x080a0f),
];

const HASH_MASK: i32 = 0xFFFF;

/// 24-bit `0xRRGGBB` color. Serialized as six hex digits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Rgb(pub u32);

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RgbParseError {
    #[error("color must be six hex digits, got '{raw}'")]
    BadLength { raw: String },
    #[error("color contains a non-hex digit: '{raw}'")]
    NotHex { raw: String },
}

impl Rgb {
    pub fn parse(raw: &str) -> Result<Self, RgbParseError> {
        let digits = raw
            .strip_prefix('#')
            .or_else(|| raw.strip_prefix("0x"))
            .unwrap_or(raw);
        if digits.len() != 6 {
            return Err(RgbParseError::BadLength {
                raw: raw.to_string(),
            });
        }
        if !digits.chars().all(|ch| ch.is_ascii_hexdigit()) {
            return Err(RgbParseError::NotHex {
                raw: raw.to_string(),
            });
        }
        u32::from_str_radix(digits, 16)
            .map(Rgb)
            .map_err(|_| RgbParseError::NotHex {
                raw: raw.to_string(),
            })
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:06x}", self.0 & 0xFF_FFFF)
    }
}

impl TryFrom<String> for Rgb {
    type Error = RgbParseError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Rgb::parse(&raw)
    }
}

impl From<Rgb> for String {
    fn from(color: Rgb) -> Self {
        color.to_string()
    }
}

/// Ordered, never-empty color list. An empty list deserializes to the
/// default palette.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Rgb>", into = "Vec<Rgb>")]
pub struct Palette(Vec<Rgb>);

impl Default for Palette {
    fn default() -> Self {
        Self(DEFAULT_PALETTE.to_vec())
    }
}

impl From<Vec<Rgb>> for Palette {
    fn from(colors: Vec<Rgb>) -> Self {
        if colors.is_empty() {
            Self::default()
        } else {
            Self(colors)
        }
    }
}

impl From<Palette> for Vec<Rgb> {
    fn from(palette: Palette) -> Self {
        palette.0
    }
}

impl Palette {
    pub fn colors(&self) -> &[Rgb] {
        &self.0
    }

    pub fn index_for(&self, origin: BlockPos) -> usize {
        let masked = origin_hash(origin) & HASH_MASK;
        masked as usize % self.0.len()
    }

    pub fn color_for(&self, origin: BlockPos) -> Rgb {
        self.0[self.index_for(origin)]
    }

    pub fn claim_color(&self, claim: &Claim) -> Rgb {
        self.color_for(claim.origin)
    }
}

/// Integer-vector hash over the origin only. Wrapping 32-bit arithmetic keeps
/// it identical on every platform and every run.
pub fn origin_hash(origin: BlockPos) -> i32 {
    origin
        .y
        .wrapping_add(origin.z.wrapping_mul(31))
        .wrapping_mul(31)
        .wrapping_add(origin.x)
}
