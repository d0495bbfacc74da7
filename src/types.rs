//! Type-safe value types for resolution selection.
//!
//! Host inputs arrive as strings and integers. These enums and the
//! `Resolution` pair give them compile-time shape so the search and the
//! facades can match exhaustively instead of comparing strings.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumIter, EnumString};

use crate::error::ResolutionError;
use crate::logic::radial::{PATCH_SIZE, VAE_STRIDE};

/// A width/height pair in pixels.
///
/// Serialized as a two-element array (`[1280, 720]`) so resolution tables
/// stay compact in JSON.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "(u32, u32)", into = "(u32, u32)")]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// Attention patches per frame after VAE downsampling and patch embedding.
    ///
    /// `(height / 8) * (width / 8) / 4`, integer arithmetic throughout.
    pub fn patches_per_frame(&self) -> u64 {
        let lat_h = u64::from(self.height / VAE_STRIDE);
        let lat_w = u64::from(self.width / VAE_STRIDE);
        lat_h * lat_w / u64::from(PATCH_SIZE * PATCH_SIZE)
    }

    /// Whether the joint patch count divides evenly by `block_size`.
    pub fn is_radial_compatible(&self, block_size: BlockSize) -> bool {
        self.patches_per_frame() % u64::from(block_size.get()) == 0
    }

    pub fn is_square(&self) -> bool {
        self.width == self.height
    }

    pub fn pixel_area(&self) -> u64 {
        u64::from(self.width) * u64::from(self.height)
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self { width, height }
    }
}

impl From<Resolution> for (u32, u32) {
    fn from(res: Resolution) -> Self {
        (res.width, res.height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Parses `"WIDTHxHEIGHT"`.
///
/// Exactly one `x` separator is required; each side is trimmed and must be
/// a positive integer.
impl FromStr for Resolution {
    type Err = ResolutionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('x').collect();
        let &[width, height] = parts.as_slice() else {
            return Err(ResolutionError::invalid_preset(
                s,
                format!("expected exactly one 'x' separator, found {}", parts.len() - 1),
            ));
        };

        let parse_side = |side: &str, name: &str| -> Result<u32, ResolutionError> {
            let value: u32 = side.trim().parse().map_err(|e| {
                let reason = format!("{} '{}' is not an integer: {}", name, side, e);
                ResolutionError::invalid_preset(s, reason)
            })?;
            if value == 0 {
                let reason = format!("{} must be positive", name);
                return Err(ResolutionError::invalid_preset(s, reason));
            }
            Ok(value)
        };

        Ok(Self {
            width: parse_side(width, "width")?,
            height: parse_side(height, "height")?,
        })
    }
}

/// Quality tier within an aspect ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Quality {
    #[strum(serialize = "HQ")]
    HQ,
    #[strum(serialize = "MQ")]
    MQ,
    #[strum(serialize = "LQ")]
    LQ,
}

/// Direction the compatibility search prefers when adjusting a dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum RadialMode {
    /// Prefer the nearest compatible size at or above the target
    #[default]
    Upscale,
    /// Prefer the nearest compatible size at or below the target
    Downscale,
    /// Nearest compatible size in either direction
    Closest,
}

/// Radial attention kernel block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(try_from = "u32", into = "u32")]
pub enum BlockSize {
    #[strum(serialize = "64")]
    B64,
    #[default]
    #[strum(serialize = "128")]
    B128,
}

impl BlockSize {
    pub const fn get(self) -> u32 {
        match self {
            Self::B64 => 64,
            Self::B128 => 128,
        }
    }
}

impl TryFrom<u32> for BlockSize {
    type Error = ResolutionError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        match value {
            64 => Ok(Self::B64),
            128 => Ok(Self::B128),
            other => Err(ResolutionError::InvalidBlockSize(other)),
        }
    }
}

impl From<BlockSize> for u32 {
    fn from(block_size: BlockSize) -> Self {
        block_size.get()
    }
}

/// How the square-input branch picks among accepted candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum SquareScan {
    /// Best candidate in the whole scan window for the requested mode
    #[default]
    Nearest,
    /// First accepted candidate in ascending scan order (legacy behavior)
    FirstMatch,
}

#[cfg(test)]
mod tests {
    use super::*;
    use strum::IntoEnumIterator;

    #[test]
    fn test_resolution_display() {
        assert_eq!(Resolution::new(1280, 720).to_string(), "1280x720");
    }

    #[test]
    fn test_resolution_parse_valid() {
        assert_eq!("1280x720".parse::<Resolution>().unwrap(), Resolution::new(1280, 720));
        assert_eq!(" 832 x 480 ".parse::<Resolution>().unwrap(), Resolution::new(832, 480));
    }

    #[test]
    fn test_resolution_parse_rejects_garbage() {
        assert!("abcx def".parse::<Resolution>().is_err());
        assert!("1280".parse::<Resolution>().is_err());
        assert!("1280x720x2".parse::<Resolution>().is_err());
        assert!("1280X720".parse::<Resolution>().is_err());
        assert!("0x720".parse::<Resolution>().is_err());
        assert!("-1280x720".parse::<Resolution>().is_err());
        assert!("".parse::<Resolution>().is_err());
    }

    #[test]
    fn test_patches_per_frame() {
        // 1280x720 -> 160 * 90 / 4
        assert_eq!(Resolution::new(1280, 720).patches_per_frame(), 3600);
        assert_eq!(Resolution::new(1024, 1024).patches_per_frame(), 4096);
    }

    #[test]
    fn test_is_radial_compatible() {
        assert!(Resolution::new(1024, 1024).is_radial_compatible(BlockSize::B128));
        assert!(!Resolution::new(624, 624).is_radial_compatible(BlockSize::B64));
        assert!(Resolution::new(640, 640).is_radial_compatible(BlockSize::B64));
    }

    #[test]
    fn test_resolution_serializes_as_pair() {
        let json = serde_json::to_string(&Resolution::new(960, 960)).unwrap();
        assert_eq!(json, "[960,960]");
        let back: Resolution = serde_json::from_str("[544,704]").unwrap();
        assert_eq!(back, Resolution::new(544, 704));
    }

    #[test]
    fn test_quality_roundtrip() {
        for quality in Quality::iter() {
            let parsed: Quality = quality.to_string().parse().unwrap();
            assert_eq!(parsed, quality);
        }
        assert!("UHQ".parse::<Quality>().is_err());
    }

    #[test]
    fn test_radial_mode_strings() {
        assert_eq!(RadialMode::Upscale.to_string(), "upscale");
        assert_eq!("closest".parse::<RadialMode>().unwrap(), RadialMode::Closest);
        assert_eq!(RadialMode::default(), RadialMode::Upscale);
    }

    #[test]
    fn test_block_size_conversions() {
        assert_eq!(BlockSize::try_from(64).unwrap(), BlockSize::B64);
        assert_eq!(BlockSize::try_from(128).unwrap(), BlockSize::B128);
        assert!(matches!(BlockSize::try_from(96), Err(ResolutionError::InvalidBlockSize(96))));
        assert_eq!("64".parse::<BlockSize>().unwrap(), BlockSize::B64);
        assert_eq!(BlockSize::default().get(), 128);
        assert_eq!(serde_json::to_string(&BlockSize::B64).unwrap(), "64");
        assert!(serde_json::from_str::<BlockSize>("32").is_err());
    }

    #[test]
    fn test_square_scan_strings() {
        assert_eq!(SquareScan::FirstMatch.to_string(), "first-match");
        assert_eq!("nearest".parse::<SquareScan>().unwrap(), SquareScan::Nearest);
    }
}
