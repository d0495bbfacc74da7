//! Resolution Selector Library
//!
//! Curated resolution tables for video/image generation models and a search
//! that adjusts resolutions so the per-frame patch count fits the radial
//! attention block size.

pub mod cli;
pub mod config_file;
pub mod error;
pub mod logic;
pub mod observer;
pub mod presets;
pub mod selector;
pub mod table;
pub mod types;

// Re-export main types for convenience
pub use config_file::SelectorConfig;
pub use error::ResolutionError;
pub use observer::{NoopObserver, ResolutionObserver, TracingObserver};
pub use presets::{PresetCatalog, PresetMode, PresetsNode, DEFAULT_PRESET};
pub use selector::{ResolutionSelector, SelectorNodeInputs, DEFAULT_RESOLUTION};
pub use table::ResolutionTable;
pub use types::{BlockSize, Quality, RadialMode, Resolution, SquareScan};

// Radial attention search
pub use logic::radial::{
    calculate_radial_compatible_resolution, find_compatible_dimension, radial_resolutions,
    update_resolutions_for_radial_attention, RadialSettings, RadialTableUpdate,
};
