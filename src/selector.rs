//! Resolution selector (legacy curated-table node)
//!
//! Resolves `(model family, aspect ratio, quality)` against a
//! [`ResolutionTable`] and optionally passes the result through the radial
//! attention search.
//!
//! # Fallback Rules
//!
//! | Situation | Result |
//! |-----------|--------|
//! | Aspect ratio missing for the family | Mapped fallback, else first in table order |
//! | Family has no aspect ratios | [`DEFAULT_RESOLUTION`] |
//! | Unknown family or quality tier | [`DEFAULT_RESOLUTION`] |
//! | Unknown radial mode string | `closest` |
//! | Unsupported block size | 128 |
//!
//! Every fallback is reported to the observer. Nothing is returned as an
//! error: the host always receives a width and a height.

use crate::error::{ResolutionError, Result};
use crate::logic::radial::RadialSettings;
use crate::observer::{ResolutionObserver, TracingObserver};
use crate::table::ResolutionTable;
use crate::types::{BlockSize, Quality, RadialMode, Resolution};

/// Returned when no table entry can be resolved.
pub const DEFAULT_RESOLUTION: Resolution = Resolution::new(832, 480);

/// Preferred substitutes for aspect ratios a family does not define.
pub const ASPECT_RATIO_FALLBACKS: &[(&str, &str)] = &[
    ("Cinematic", "Horizontal"),
    ("Square", "Squarish"),
    ("Landscape", "Horizontal"),
    ("Portrait", "Vertical"),
    ("Wide", "Horizontal"),
    ("Tall", "Vertical"),
    ("UltraWide", "Horizontal"),
    ("UltraTall", "Vertical"),
];

/// Display order of aspect ratio options; anything else follows alphabetically.
pub const ASPECT_RATIO_ORDER: &[&str] = &[
    "Horizontal",
    "Vertical",
    "Squarish",
    "Square",
    "Cinematic",
    "Landscape",
    "Portrait",
    "Wide",
    "Tall",
    "UltraWide",
    "UltraTall",
];

/// Mapped fallback for `aspect_ratio`, if one is defined.
pub fn fallback_aspect_ratio(aspect_ratio: &str) -> Option<&'static str> {
    ASPECT_RATIO_FALLBACKS
        .iter()
        .find(|(from, _)| *from == aspect_ratio)
        .map(|(_, to)| *to)
}

/// Raw inputs as the host delivers them to the selector node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorNodeInputs {
    pub mode: String,
    pub aspect_ratio: String,
    pub quality: String,
    pub enable_radial_attention: bool,
    pub radial_mode: String,
    pub block_size: u32,
}

impl SelectorNodeInputs {
    /// Required inputs with the optional ones at their defaults.
    pub fn new(
        mode: impl Into<String>,
        aspect_ratio: impl Into<String>,
        quality: impl Into<String>,
    ) -> Self {
        Self {
            mode: mode.into(),
            aspect_ratio: aspect_ratio.into(),
            quality: quality.into(),
            enable_radial_attention: false,
            radial_mode: RadialMode::default().to_string(),
            block_size: BlockSize::default().get(),
        }
    }

    pub fn with_radial(mut self, radial_mode: impl Into<String>, block_size: u32) -> Self {
        self.enable_radial_attention = true;
        self.radial_mode = radial_mode.into();
        self.block_size = block_size;
        self
    }
}

/// Curated-table resolution selector.
pub struct ResolutionSelector {
    table: ResolutionTable,
    observer: Box<dyn ResolutionObserver>,
}

impl Default for ResolutionSelector {
    fn default() -> Self {
        Self::new(ResolutionTable::builtin())
    }
}

impl std::fmt::Debug for ResolutionSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolutionSelector")
            .field("families", &self.table.family_names())
            .finish_non_exhaustive()
    }
}

impl ResolutionSelector {
    /// Selector over `table`, reporting through [`TracingObserver`].
    pub fn new(table: ResolutionTable) -> Self {
        Self {
            table,
            observer: Box::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Box<dyn ResolutionObserver>) -> Self {
        self.observer = observer;
        self
    }

    pub fn table(&self) -> &ResolutionTable {
        &self.table
    }

    /// Mode options in table order.
    pub fn mode_names(&self) -> Vec<&str> {
        self.table.family_names()
    }

    /// Every aspect ratio any family defines, in display order.
    pub fn aspect_ratio_names(&self) -> Vec<&str> {
        let mut all: Vec<&str> = self
            .table
            .families()
            .iter()
            .flat_map(|family| family.aspect_ratio_names())
            .collect();
        all.sort_unstable();
        all.dedup();

        let mut ordered: Vec<&str> = ASPECT_RATIO_ORDER
            .iter()
            .copied()
            .filter(|name| all.contains(name))
            .collect();
        ordered.extend(all.into_iter().filter(|name| !ASPECT_RATIO_ORDER.contains(name)));
        ordered
    }

    /// Select a resolution, optionally adjusted for radial attention.
    ///
    /// Never fails; see the module docs for the fallback rules.
    pub fn get_resolution(
        &self,
        model_family: &str,
        aspect_ratio: &str,
        quality: &str,
        radial: Option<&RadialSettings>,
    ) -> Resolution {
        let base = match self.resolve(model_family, aspect_ratio, quality) {
            Ok(resolution) => resolution,
            Err(ResolutionError::NoAspectRatios(family)) => {
                self.observer.family_without_aspect_ratios(&family, DEFAULT_RESOLUTION);
                return DEFAULT_RESOLUTION;
            }
            Err(err) => {
                self.observer.lookup_failed(&err, DEFAULT_RESOLUTION);
                return DEFAULT_RESOLUTION;
            }
        };

        match radial {
            Some(settings) if settings.enabled => settings.adjust(base, self.observer.as_ref()),
            _ => base,
        }
    }

    /// Resolve raw node inputs, interpreting the optional radial fields.
    pub fn resolve_node_inputs(&self, inputs: &SelectorNodeInputs) -> Resolution {
        let radial = inputs.enable_radial_attention.then(|| {
            RadialSettings::enabled(
                self.radial_mode(&inputs.radial_mode),
                self.block_size(inputs.block_size),
            )
        });

        self.get_resolution(&inputs.mode, &inputs.aspect_ratio, &inputs.quality, radial.as_ref())
    }

    /// Table lookup with aspect-ratio substitution.
    fn resolve(&self, model_family: &str, aspect_ratio: &str, quality: &str) -> Result<Resolution> {
        let family = self
            .table
            .family(model_family)
            .ok_or_else(|| ResolutionError::UnknownModelFamily(model_family.to_string()))?;

        let aspect_ratio = if family.aspect_ratio(aspect_ratio).is_some() {
            aspect_ratio
        } else {
            let available = family.aspect_ratio_names();
            let Some(first) = available.first().copied() else {
                return Err(ResolutionError::NoAspectRatios(model_family.to_string()));
            };
            let substitute = fallback_aspect_ratio(aspect_ratio)
                .filter(|fallback| available.contains(fallback))
                .unwrap_or(first);
            self.observer
                .aspect_ratio_substituted(model_family, aspect_ratio, substitute, &available);
            substitute
        };

        let tier: Quality = quality.parse().map_err(|_| {
            ResolutionError::missing_quality(model_family, aspect_ratio, quality)
        })?;

        self.table.lookup(model_family, aspect_ratio, tier)
    }

    fn radial_mode(&self, value: &str) -> RadialMode {
        value.parse().unwrap_or_else(|_| {
            let substitute = RadialMode::Closest;
            let err = ResolutionError::InvalidRadialMode(value.to_string());
            self.observer.input_substituted(&err, &substitute.to_string());
            substitute
        })
    }

    fn block_size(&self, value: u32) -> BlockSize {
        BlockSize::try_from(value).unwrap_or_else(|err| {
            let substitute = BlockSize::default();
            self.observer.input_substituted(&err, &substitute.to_string());
            substitute
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observer::NoopObserver;

    fn selector() -> ResolutionSelector {
        ResolutionSelector::default().with_observer(Box::new(NoopObserver))
    }

    #[test]
    fn test_direct_lookup() {
        let selector = selector();
        assert_eq!(
            selector.get_resolution("T2V14B", "Horizontal", "MQ", None),
            Resolution::new(1088, 832)
        );
        assert_eq!(
            selector.get_resolution("KONTEXT", "Squarish", "LQ", None),
            Resolution::new(880, 1184)
        );
    }

    #[test]
    fn test_cinematic_falls_back_to_horizontal() {
        let selector = selector();
        assert_eq!(
            selector.get_resolution("T2V14B", "Cinematic", "HQ", None),
            Resolution::new(1280, 720)
        );
    }

    #[test]
    fn test_square_falls_back_to_squarish() {
        let selector = selector();
        assert_eq!(
            selector.get_resolution("IMG", "Square", "MQ", None),
            Resolution::new(1024, 1024)
        );
    }

    #[test]
    fn test_unmapped_aspect_uses_first_available() {
        let selector = selector();
        // KONTEXT lists Vertical first
        assert_eq!(
            selector.get_resolution("KONTEXT", "Panorama", "HQ", None),
            Resolution::new(672, 1568)
        );
    }

    #[test]
    fn test_mapped_fallback_missing_uses_first_available() {
        let selector = selector();
        // QWEN has no Horizontal; first is Square
        assert_eq!(
            selector.get_resolution("QWEN", "Cinematic", "LQ", None),
            Resolution::new(512, 512)
        );
    }

    #[test]
    fn test_unknown_family_defaults() {
        let selector = selector();
        assert_eq!(selector.get_resolution("SDXL", "Horizontal", "HQ", None), DEFAULT_RESOLUTION);
    }

    #[test]
    fn test_unknown_quality_defaults() {
        let selector = selector();
        assert_eq!(
            selector.get_resolution("T2V14B", "Horizontal", "UHQ", None),
            DEFAULT_RESOLUTION
        );
    }

    #[test]
    fn test_radial_disabled_settings_are_ignored() {
        let selector = selector();
        let settings = RadialSettings::default();
        assert_eq!(
            selector.get_resolution("I2V720p", "Squarish", "HQ", Some(&settings)),
            Resolution::new(624, 624)
        );
    }

    #[test]
    fn test_qwen_wide_radial_upscale() {
        let selector = selector();
        let settings = RadialSettings::enabled(RadialMode::Upscale, BlockSize::B128);
        // Base 1280x640; 1280 is block aligned, 640 exhausts its window and stays
        assert_eq!(
            selector.get_resolution("QWEN", "Wide", "MQ", Some(&settings)),
            Resolution::new(1280, 640)
        );
    }

    #[test]
    fn test_node_inputs_defaults() {
        let inputs = SelectorNodeInputs::new("T2V14B", "Horizontal", "HQ");
        assert!(!inputs.enable_radial_attention);
        assert_eq!(inputs.radial_mode, "upscale");
        assert_eq!(inputs.block_size, 128);
        assert_eq!(selector().resolve_node_inputs(&inputs), Resolution::new(1280, 720));
    }

    #[test]
    fn test_node_inputs_radial() {
        let inputs =
            SelectorNodeInputs::new("I2V720p", "Squarish", "HQ").with_radial("upscale", 64);
        assert_eq!(selector().resolve_node_inputs(&inputs), Resolution::new(640, 640));
    }

    #[test]
    fn test_node_inputs_invalid_radial_fields() {
        // Unknown mode behaves as closest; 96 becomes 128
        let inputs =
            SelectorNodeInputs::new("T2V14B", "Horizontal", "HQ").with_radial("sideways", 96);
        assert_eq!(selector().resolve_node_inputs(&inputs), Resolution::new(1280, 768));
    }

    #[test]
    fn test_mode_names_in_table_order() {
        let selector = selector();
        assert_eq!(selector.mode_names().first(), Some(&"I2V720p"));
        assert_eq!(selector.mode_names().len(), 7);
    }

    #[test]
    fn test_aspect_ratio_names_order() {
        let selector = selector();
        assert_eq!(selector.aspect_ratio_names(), ASPECT_RATIO_ORDER.to_vec());
    }

    #[test]
    fn test_fallback_aspect_ratio_mapping() {
        assert_eq!(fallback_aspect_ratio("UltraTall"), Some("Vertical"));
        assert_eq!(fallback_aspect_ratio("Horizontal"), None);
    }
}
