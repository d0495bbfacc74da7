//! Injectable diagnostics for the resolution facades.
//!
//! Every non-fatal event the selector, the presets node and the batch
//! update produce is reported through [`ResolutionObserver`]. All methods
//! default to doing nothing, so an observer only overrides what it cares
//! about.
//!
//! # Contract
//!
//! - Observers never influence the returned resolution.
//! - Calls may arrive from several threads at once; implementors must be
//!   `Send + Sync`.

use crate::error::ResolutionError;
use crate::types::{BlockSize, Resolution};

/// Receiver for diagnostic events.
pub trait ResolutionObserver: Send + Sync {
    /// An aspect ratio was not available and another one was used instead.
    fn aspect_ratio_substituted(
        &self,
        _model_family: &str,
        _requested: &str,
        _substitute: &str,
        _available: &[&str],
    ) {
    }

    /// The model family has no aspect ratios; the default resolution is used.
    fn family_without_aspect_ratios(&self, _model_family: &str, _default: Resolution) {}

    /// A table lookup failed; the default resolution is used.
    fn lookup_failed(&self, _error: &ResolutionError, _default: Resolution) {}

    /// A host input could not be interpreted and was replaced by `substitute`.
    fn input_substituted(&self, _error: &ResolutionError, _substitute: &str) {}

    /// A "WIDTHxHEIGHT" string could not be parsed.
    fn preset_parse_failed(&self, _error: &ResolutionError, _default: Resolution) {}

    /// No candidate in the search window satisfied the block size.
    fn search_exhausted(&self, _target: u32, _block_size: BlockSize, _fallback: u32) {}

    /// A table leaf was changed by the batch radial update.
    fn leaf_adjusted(
        &self,
        _path: &str,
        _from: Resolution,
        _to: Resolution,
        _block_size: BlockSize,
    ) {
    }
}

/// Observer that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopObserver;

impl ResolutionObserver for NoopObserver {}

/// Observer that emits `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingObserver;

impl ResolutionObserver for TracingObserver {
    fn aspect_ratio_substituted(
        &self,
        model_family: &str,
        requested: &str,
        substitute: &str,
        available: &[&str],
    ) {
        tracing::warn!(
            model_family,
            requested,
            substitute,
            "'{}' aspect ratio not available for '{}' mode. \
             Available options: {}. Using '{}' instead.",
            requested,
            model_family,
            available.join(", "),
            substitute
        );
    }

    fn family_without_aspect_ratios(&self, model_family: &str, default: Resolution) {
        tracing::error!(
            model_family,
            %default,
            "No aspect ratios available for mode '{}'",
            model_family
        );
    }

    fn lookup_failed(&self, error: &ResolutionError, default: Resolution) {
        tracing::error!(%default, "Error getting resolution: {}", error);
    }

    fn input_substituted(&self, error: &ResolutionError, substitute: &str) {
        tracing::warn!(substitute, "{}. Using '{}' instead.", error, substitute);
    }

    fn preset_parse_failed(&self, error: &ResolutionError, default: Resolution) {
        tracing::error!("{}. Defaulting to {}.", error, default);
    }

    fn search_exhausted(&self, target: u32, block_size: BlockSize, fallback: u32) {
        tracing::debug!(
            target_size = target,
            block_size = block_size.get(),
            fallback,
            "No block-aligned size in search window, keeping VAE alignment only"
        );
    }

    fn leaf_adjusted(&self, path: &str, from: Resolution, to: Resolution, block_size: BlockSize) {
        tracing::info!(
            "Radial Attention (block_size={}): {}: {} -> {}",
            block_size,
            path,
            from,
            to
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_observer_accepts_all_events() {
        let observer = NoopObserver;
        observer.aspect_ratio_substituted("T2V14B", "Cinematic", "Horizontal", &["Horizontal"]);
        observer.family_without_aspect_ratios("EMPTY", Resolution::new(832, 480));
        observer.search_exhausted(624, BlockSize::B128, 624);
    }

    #[test]
    fn test_tracing_observer_without_subscriber() {
        // No subscriber installed: events are dropped, nothing panics.
        let observer = TracingObserver;
        let err = ResolutionError::invalid_preset("abcx def", "not an integer");
        observer.preset_parse_failed(&err, Resolution::new(1280, 720));
        observer.leaf_adjusted(
            "I2V720p-Squarish-HQ",
            Resolution::new(624, 624),
            Resolution::new(640, 640),
            BlockSize::B64,
        );
    }

    #[test]
    fn test_observers_are_object_safe() {
        let observers: Vec<Box<dyn ResolutionObserver>> =
            vec![Box::new(NoopObserver), Box::new(TracingObserver)];
        for observer in &observers {
            observer.input_substituted(&ResolutionError::InvalidBlockSize(96), "128");
        }
    }
}
