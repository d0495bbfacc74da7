//! Resolution table: model family -> aspect ratio -> quality tier -> resolution.
//!
//! The table is an immutable value built once (the built-in legacy table
//! or a JSON file) and handed to the selector. Families and aspect ratios
//! keep their insertion order, which makes "first available aspect ratio"
//! deterministic.
//!
//! # JSON shape
//!
//! ```json
//! {"families": [
//!   {"name": "T2V14B", "aspect_ratios": [
//!     {"name": "Horizontal", "tiers": {"HQ": [1280, 720], "MQ": [1088, 832], "LQ": [832, 480]}}
//!   ]}
//! ]}
//! ```

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::{ResolutionError, Result};
use crate::types::{Quality, Resolution};

/// Built-in table as `(family, [(aspect ratio, [HQ, MQ, LQ])])`.
const BUILTIN: &[(&str, &[(&str, [(u32, u32); 3])])] = &[
    (
        "I2V720p",
        &[
            ("Horizontal", [(1280, 720), (832, 480), (704, 544)]),
            ("Vertical", [(720, 1280), (480, 832), (544, 704)]),
            ("Squarish", [(624, 624), (624, 624), (624, 624)]),
        ],
    ),
    (
        "I2V480p",
        &[
            ("Horizontal", [(832, 480), (704, 544), (704, 544)]),
            ("Vertical", [(480, 832), (544, 704), (544, 704)]),
            ("Squarish", [(624, 624), (624, 624), (624, 624)]),
        ],
    ),
    (
        "T2V14B",
        &[
            ("Horizontal", [(1280, 720), (1088, 832), (832, 480)]),
            ("Vertical", [(720, 1280), (832, 1088), (480, 832)]),
            ("Squarish", [(960, 960), (624, 624), (544, 704)]),
        ],
    ),
    (
        "T2V1.3B",
        &[
            ("Horizontal", [(832, 480), (704, 544), (704, 544)]),
            ("Vertical", [(480, 832), (544, 704), (544, 704)]),
            ("Squarish", [(624, 624), (624, 624), (624, 624)]),
        ],
    ),
    (
        "IMG",
        &[
            ("Horizontal", [(1600, 900), (1280, 720), (1024, 576)]),
            ("Vertical", [(900, 1600), (720, 1280), (576, 1024)]),
            ("Squarish", [(1600, 1600), (1024, 1024), (512, 512)]),
            // ~2.35:1
            ("Cinematic", [(1600, 688), (1280, 550), (1024, 440)]),
        ],
    ),
    (
        "KONTEXT",
        &[
            ("Vertical", [(672, 1568), (720, 1456), (832, 1248)]),
            ("Horizontal", [(1568, 672), (1456, 720), (1248, 832)]),
            ("Squarish", [(1024, 1024), (944, 1104), (880, 1184)]),
        ],
    ),
    (
        "QWEN",
        &[
            ("Square", [(1024, 1024), (768, 768), (512, 512)]),
            ("Landscape", [(1280, 720), (1024, 768), (832, 624)]),
            ("Portrait", [(720, 1280), (768, 1024), (624, 832)]),
            ("Wide", [(1536, 768), (1280, 640), (1024, 512)]),
            ("Tall", [(768, 1536), (640, 1280), (512, 1024)]),
            ("UltraWide", [(1792, 768), (1536, 640), (1280, 544)]),
            ("UltraTall", [(768, 1792), (640, 1536), (544, 1280)]),
        ],
    ),
];

/// Quality tiers defined for one aspect ratio.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AspectRatioEntry {
    pub name: String,
    pub tiers: BTreeMap<Quality, Resolution>,
}

/// Aspect ratios defined for one model family, in table order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ModelFamily {
    pub name: String,
    #[serde(default)]
    pub aspect_ratios: Vec<AspectRatioEntry>,
}

impl ModelFamily {
    pub fn aspect_ratio(&self, name: &str) -> Option<&AspectRatioEntry> {
        self.aspect_ratios.iter().find(|entry| entry.name == name)
    }

    pub fn aspect_ratio_names(&self) -> Vec<&str> {
        self.aspect_ratios.iter().map(|entry| entry.name.as_str()).collect()
    }
}

/// One `(family, aspect ratio, quality) -> resolution` leaf.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf<'a> {
    pub model_family: &'a str,
    pub aspect_ratio: &'a str,
    pub quality: Quality,
    pub resolution: Resolution,
}

/// Immutable nested resolution table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ResolutionTable {
    families: Vec<ModelFamily>,
}

impl Default for ResolutionTable {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ResolutionTable {
    /// Build a table from families, validating its structure.
    pub fn new(families: Vec<ModelFamily>) -> Result<Self> {
        let table = Self { families };
        table.validate()?;
        Ok(table)
    }

    /// The curated table shipped with the selector.
    pub fn builtin() -> Self {
        let families = BUILTIN
            .iter()
            .map(|(family, aspects)| ModelFamily {
                name: (*family).to_string(),
                aspect_ratios: aspects
                    .iter()
                    .map(|(aspect, [hq, mq, lq])| AspectRatioEntry {
                        name: (*aspect).to_string(),
                        tiers: BTreeMap::from([
                            (Quality::HQ, Resolution::from(*hq)),
                            (Quality::MQ, Resolution::from(*mq)),
                            (Quality::LQ, Resolution::from(*lq)),
                        ]),
                    })
                    .collect(),
            })
            .collect();
        Self { families }
    }

    pub fn families(&self) -> &[ModelFamily] {
        &self.families
    }

    pub fn family(&self, name: &str) -> Option<&ModelFamily> {
        self.families.iter().find(|family| family.name == name)
    }

    pub fn family_names(&self) -> Vec<&str> {
        self.families.iter().map(|family| family.name.as_str()).collect()
    }

    /// Resolve a leaf, naming the first missing level on failure.
    pub fn lookup(
        &self,
        model_family: &str,
        aspect_ratio: &str,
        quality: Quality,
    ) -> Result<Resolution> {
        let family = self
            .family(model_family)
            .ok_or_else(|| ResolutionError::UnknownModelFamily(model_family.to_string()))?;
        let entry = family
            .aspect_ratio(aspect_ratio)
            .ok_or_else(|| ResolutionError::unknown_aspect_ratio(model_family, aspect_ratio))?;
        entry.tiers.get(&quality).copied().ok_or_else(|| {
            ResolutionError::missing_quality(model_family, aspect_ratio, quality.to_string())
        })
    }

    /// All leaves in table order.
    pub fn leaves(&self) -> impl Iterator<Item = Leaf<'_>> {
        self.families.iter().flat_map(|family| {
            family.aspect_ratios.iter().flat_map(move |entry| {
                entry.tiers.iter().map(move |(&quality, &resolution)| Leaf {
                    model_family: &family.name,
                    aspect_ratio: &entry.name,
                    quality,
                    resolution,
                })
            })
        })
    }

    /// New table of identical shape with every leaf passed through `f`.
    pub fn map_leaves<F>(&self, mut f: F) -> Self
    where
        F: FnMut(&str, &str, Quality, Resolution) -> Resolution,
    {
        let families = self
            .families
            .iter()
            .map(|family| ModelFamily {
                name: family.name.clone(),
                aspect_ratios: family
                    .aspect_ratios
                    .iter()
                    .map(|entry| AspectRatioEntry {
                        name: entry.name.clone(),
                        tiers: entry
                            .tiers
                            .iter()
                            .map(|(&quality, &resolution)| {
                                (quality, f(&family.name, &entry.name, quality, resolution))
                            })
                            .collect(),
                    })
                    .collect(),
            })
            .collect();
        Self { families }
    }

    /// Check structural invariants.
    ///
    /// - at least one family
    /// - family names unique, aspect ratio names unique per family
    /// - every resolution has positive width and height
    ///
    /// Families without aspect ratios and aspect ratios missing some tiers
    /// are allowed; the selector handles both at lookup time.
    pub fn validate(&self) -> Result<()> {
        if self.families.is_empty() {
            return Err(ResolutionError::invalid_table("table defines no model families"));
        }

        let mut family_names = HashSet::new();
        for family in &self.families {
            if family.name.trim().is_empty() {
                return Err(ResolutionError::invalid_table("model family name is empty"));
            }
            if !family_names.insert(family.name.as_str()) {
                return Err(ResolutionError::invalid_table(format!(
                    "duplicate model family '{}'",
                    family.name
                )));
            }

            let mut aspect_names = HashSet::new();
            for entry in &family.aspect_ratios {
                if !aspect_names.insert(entry.name.as_str()) {
                    return Err(ResolutionError::invalid_table(format!(
                        "duplicate aspect ratio '{}' in '{}'",
                        entry.name, family.name
                    )));
                }
                for (quality, resolution) in &entry.tiers {
                    if resolution.width == 0 || resolution.height == 0 {
                        return Err(ResolutionError::invalid_table(format!(
                            "{}-{}-{} has a zero dimension ({})",
                            family.name, entry.name, quality, resolution
                        )));
                    }
                }
            }
        }

        Ok(())
    }

    /// Parse and validate a table from JSON text.
    pub fn from_json(json: &str) -> Result<Self> {
        let table: Self = serde_json::from_str(json)?;
        table.validate()?;
        Ok(table)
    }

    /// Load and validate a table from a JSON file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// Pretty-printed JSON form.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}
