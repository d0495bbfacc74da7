//! Wan2.2 resolution presets.
//!
//! Two pieces live here:
//!
//! - [`PresetsNode`]: the node contract. It receives a `"WIDTHxHEIGHT"`
//!   string and returns the parsed pair, or [`DEFAULT_PRESET`] when the
//!   string is malformed. It never applies radial adjustment.
//! - [`PresetCatalog`]: the curated master list the host's dropdowns are
//!   narrowed from. Each entry is flagged for the model families it suits:
//!   `rule16` for the 14B models, `rule32` for the 5B model.
//!
//! The node does not consult the catalog. Whatever string arrives is parsed
//! on its own merits.

use strum::{Display, EnumIter, EnumString, IntoEnumIterator};

use crate::observer::{ResolutionObserver, TracingObserver};
use crate::types::Resolution;

/// Returned when the resolution string cannot be parsed.
pub const DEFAULT_PRESET: Resolution = Resolution::new(1280, 720);

/// Model family selector of the presets node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[derive(Display, EnumString, EnumIter)]
pub enum PresetMode {
    #[default]
    #[strum(serialize = "Wan2.2 - 14B Models (I2V/T2V)")]
    Wan14B,
    #[strum(serialize = "Wan2.2 - 5B Model (TI2V)")]
    Wan5B,
}

impl PresetMode {
    /// Side divisibility the model's VAE requires.
    pub fn divisor(&self) -> u32 {
        match self {
            Self::Wan14B => 16,
            Self::Wan5B => 32,
        }
    }

    /// Hint shown next to the mode selector.
    pub fn vae_hint(&self) -> &'static str {
        match self {
            Self::Wan14B => "CRITICAL INFO: Use Wan2.1 VAE. Resolutions must be divisible by 16.",
            Self::Wan5B => "CRITICAL INFO: Use Wan2.2 VAE. Resolutions must be divisible by 32.",
        }
    }

    fn accepts(&self, preset: &Preset) -> bool {
        match self {
            Self::Wan14B => preset.rule16,
            Self::Wan5B => preset.rule32,
        }
    }
}

/// One curated resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preset {
    pub resolution: Resolution,
    pub aspect_ratio: &'static str,
    pub rule16: bool,
    pub rule32: bool,
}

const fn preset(
    width: u32,
    height: u32,
    aspect_ratio: &'static str,
    rule16: bool,
    rule32: bool,
) -> Preset {
    Preset {
        resolution: Resolution::new(width, height),
        aspect_ratio,
        rule16,
        rule32,
    }
}

/// Aspect ratio labels in display order.
pub const PRESET_ASPECT_ORDER: &[&str] = &[
    "16:9 Landscape",
    "9:16 Portrait",
    "4:3 Landscape",
    "3:4 Portrait",
    "3:2 Landscape",
    "2:3 Portrait",
    "1:1 Square",
    "21:9 Cinematic",
];

/// Curated master list.
pub const MASTER_PRESETS: &[Preset] = &[
    // 1:1 Square
    preset(480, 480, "1:1 Square", true, true),
    preset(512, 512, "1:1 Square", true, true),
    preset(768, 768, "1:1 Square", true, true),
    preset(896, 896, "1:1 Square", true, true),
    preset(1024, 1024, "1:1 Square", true, true),
    preset(1280, 1280, "1:1 Square", true, true),
    preset(1440, 1440, "1:1 Square", true, true),
    // 16:9 Landscape
    preset(512, 288, "16:9 Landscape", true, true),
    preset(768, 432, "16:9 Landscape", true, false),
    preset(896, 512, "16:9 Landscape", true, true),
    preset(1024, 576, "16:9 Landscape", true, true),
    // Official 5B HD
    preset(1280, 704, "16:9 Landscape", true, true),
    // Official 14B HD
    preset(1280, 720, "16:9 Landscape", true, false),
    preset(1344, 768, "16:9 Landscape", true, true),
    preset(1536, 864, "16:9 Landscape", true, false),
    preset(1600, 896, "16:9 Landscape", true, true),
    // 9:16 Portrait
    preset(288, 512, "9:16 Portrait", true, true),
    preset(432, 768, "9:16 Portrait", true, false),
    preset(512, 896, "9:16 Portrait", true, true),
    preset(576, 1024, "9:16 Portrait", true, true),
    preset(704, 1280, "9:16 Portrait", true, true),
    preset(720, 1280, "9:16 Portrait", true, false),
    preset(768, 1344, "9:16 Portrait", true, true),
    preset(864, 1536, "9:16 Portrait", true, false),
    preset(896, 1600, "9:16 Portrait", true, true),
    // 4:3 Landscape
    preset(512, 384, "4:3 Landscape", true, true),
    preset(640, 480, "4:3 Landscape", true, true),
    preset(768, 576, "4:3 Landscape", true, true),
    preset(960, 720, "4:3 Landscape", true, false),
    preset(1024, 768, "4:3 Landscape", true, true),
    preset(1152, 864, "4:3 Landscape", true, true),
    preset(1280, 960, "4:3 Landscape", true, true),
    preset(1408, 1056, "4:3 Landscape", true, true),
    preset(1536, 1152, "4:3 Landscape", true, true),
    preset(1600, 1200, "4:3 Landscape", true, true),
    // 3:4 Portrait
    preset(384, 512, "3:4 Portrait", true, true),
    preset(480, 640, "3:4 Portrait", true, true),
    preset(576, 768, "3:4 Portrait", true, true),
    preset(720, 960, "3:4 Portrait", true, false),
    preset(768, 1024, "3:4 Portrait", true, true),
    preset(864, 1152, "3:4 Portrait", true, true),
    preset(960, 1280, "3:4 Portrait", true, true),
    preset(1056, 1408, "3:4 Portrait", true, true),
    preset(1152, 1536, "3:4 Portrait", true, true),
    preset(1200, 1600, "3:4 Portrait", true, true),
    // 3:2 Landscape
    preset(480, 320, "3:2 Landscape", true, true),
    preset(720, 480, "3:2 Landscape", true, false),
    preset(768, 512, "3:2 Landscape", true, true),
    preset(960, 640, "3:2 Landscape", true, true),
    preset(1152, 768, "3:2 Landscape", true, true),
    preset(1200, 800, "3:2 Landscape", true, false),
    preset(1344, 896, "3:2 Landscape", true, true),
    preset(1440, 960, "3:2 Landscape", true, true),
    preset(1536, 1024, "3:2 Landscape", true, true),
    // 2:3 Portrait
    preset(320, 480, "2:3 Portrait", true, true),
    preset(480, 720, "2:3 Portrait", true, false),
    preset(512, 768, "2:3 Portrait", true, true),
    preset(640, 960, "2:3 Portrait", true, true),
    preset(768, 1152, "2:3 Portrait", true, true),
    preset(800, 1200, "2:3 Portrait", true, false),
    preset(896, 1344, "2:3 Portrait", true, true),
    preset(960, 1440, "2:3 Portrait", true, true),
    preset(1024, 1536, "2:3 Portrait", true, true),
    // 21:9 Cinematic (approx)
    preset(1024, 432, "21:9 Cinematic", true, false),
    preset(1280, 544, "21:9 Cinematic", true, false),
    preset(1536, 656, "21:9 Cinematic", true, false),
    preset(1792, 768, "21:9 Cinematic", true, true),
    preset(2048, 880, "21:9 Cinematic", true, false),
];

/// Filtered views over [`MASTER_PRESETS`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PresetCatalog {
    presets: &'static [Preset],
}

impl Default for PresetCatalog {
    fn default() -> Self {
        Self {
            presets: MASTER_PRESETS,
        }
    }
}

impl PresetCatalog {
    pub fn modes() -> impl Iterator<Item = PresetMode> {
        PresetMode::iter()
    }

    /// Aspect ratios with at least one preset valid for `mode`, in display order.
    pub fn aspect_ratios(&self, mode: PresetMode) -> Vec<&'static str> {
        PRESET_ASPECT_ORDER
            .iter()
            .copied()
            .filter(|aspect| {
                self.presets
                    .iter()
                    .any(|preset| preset.aspect_ratio == *aspect && mode.accepts(preset))
            })
            .collect()
    }

    /// Presets valid for `mode` and `aspect_ratio`, smallest pixel area first.
    pub fn resolutions(&self, mode: PresetMode, aspect_ratio: &str) -> Vec<Resolution> {
        let mut resolutions: Vec<Resolution> = self
            .presets
            .iter()
            .filter(|preset| preset.aspect_ratio == aspect_ratio && mode.accepts(preset))
            .map(|preset| preset.resolution)
            .collect();
        resolutions.sort_by_key(Resolution::pixel_area);
        resolutions
    }

    /// Preferred initial choice for the resolution dropdown.
    ///
    /// The first 720p-tall, 1280-tall or 1280-wide entry, otherwise the
    /// middle of the list.
    pub fn default_resolution(&self, mode: PresetMode, aspect_ratio: &str) -> Option<Resolution> {
        let resolutions = self.resolutions(mode, aspect_ratio);
        resolutions
            .iter()
            .copied()
            .find(|res| res.height == 720 || res.height == 1280 || res.width == 1280)
            .or_else(|| resolutions.get(resolutions.len() / 2).copied())
    }
}

/// Presets node: parses the selected `"WIDTHxHEIGHT"` string.
pub struct PresetsNode {
    observer: Box<dyn ResolutionObserver>,
}

impl Default for PresetsNode {
    fn default() -> Self {
        Self {
            observer: Box::new(TracingObserver),
        }
    }
}

impl PresetsNode {
    pub fn new(observer: Box<dyn ResolutionObserver>) -> Self {
        Self { observer }
    }

    /// Resolve the node inputs to a width and height.
    ///
    /// `mode` and `aspect_ratio` only drive the host's dropdown filtering;
    /// the result depends on `resolution` alone.
    pub fn get_resolution(&self, _mode: &str, _aspect_ratio: &str, resolution: &str) -> Resolution {
        match resolution.parse::<Resolution>() {
            Ok(parsed) => parsed,
            Err(err) => {
                self.observer.preset_parse_failed(&err, DEFAULT_PRESET);
                DEFAULT_PRESET
            }
        }
    }
}
