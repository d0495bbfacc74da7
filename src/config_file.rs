//! Configuration file handling for the selector.
//!
//! A config file sets the radial attention defaults and may replace the
//! built-in resolution table. Every field is optional:
//!
//! ```json
//! {
//!   "radial": {"enabled": true, "mode": "closest", "block_size": 64},
//!   "table": {"families": [ ... ]}
//! }
//! ```

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::logic::radial::RadialSettings;
use crate::observer::ResolutionObserver;
use crate::selector::ResolutionSelector;
use crate::table::ResolutionTable;

/// Selector configuration that can be saved/loaded
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SelectorConfig {
    pub radial: RadialSettings,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<ResolutionTable>,
}

impl SelectorConfig {
    /// Create a configuration with the built-in table and default radial settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if let Some(table) = &self.table {
            table.validate().context("Custom resolution table is invalid")?;
        }
        Ok(())
    }

    /// The table in effect: the custom one if present, otherwise the built-in one
    pub fn table(&self) -> ResolutionTable {
        self.table.clone().unwrap_or_else(ResolutionTable::builtin)
    }

    /// Build a selector over the configured table
    pub fn build_selector(&self, observer: Box<dyn ResolutionObserver>) -> ResolutionSelector {
        ResolutionSelector::new(self.table()).with_observer(observer)
    }
}
