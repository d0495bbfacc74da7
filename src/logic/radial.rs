//! Radial-attention compatible resolution search
//!
//! The radial attention kernel processes each frame in blocks of 64 or 128
//! patches. A frame of `width x height` pixels yields
//! `(height / 8) * (width / 8) / 4` patches after VAE downsampling (stride 8)
//! and patch embedding (2x2), and that count must divide evenly by the
//! block size.
//!
//! # Search
//!
//! - **Per dimension**: candidates in `[max(8, base - 64), base + 80)` step 8,
//!   where `base` is the target rounded down to a multiple of 8. A candidate
//!   qualifies when `(size / 8)^2 / 4` is a multiple of the block size.
//! - **Square inputs**: latent sizes within 8 steps of the target are scanned
//!   first so both sides move together.
//! - **Exhaustion**: when nothing qualifies the result keeps VAE alignment
//!   only. This is not an error; callers must not assume block alignment.
//!
//! Pure integer arithmetic, no I/O.

use serde::{Deserialize, Serialize};

use crate::observer::{NoopObserver, ResolutionObserver};
use crate::table::ResolutionTable;
use crate::types::{BlockSize, Quality, RadialMode, Resolution, SquareScan};

/// VAE spatial downsampling stride for height/width.
pub const VAE_STRIDE: u32 = 8;

/// Patch embedding size for height/width.
pub const PATCH_SIZE: u32 = 2;

/// Combined alignment unit of the attention grid.
pub const RADIAL_ALIGNMENT: u32 = VAE_STRIDE * PATCH_SIZE;

/// Search window below the aligned base, in pixels.
pub const SEARCH_BELOW: u32 = 64;

/// Search window above the aligned base (exclusive), in pixels.
pub const SEARCH_ABOVE: u32 = 80;

/// Latent steps scanned on each side of a square target.
pub const SQUARE_SCAN_RADIUS: i64 = 8;

// ============================================================================
// Per-dimension search
// ============================================================================

/// Outcome of a single-dimension search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DimensionMatch {
    /// Size whose squared patch count divides by the block size
    Compatible(u32),
    /// Nothing in the window qualified; only VAE alignment holds
    AlignedOnly(u32),
}

impl DimensionMatch {
    pub fn value(self) -> u32 {
        match self {
            Self::Compatible(v) | Self::AlignedOnly(v) => v,
        }
    }

    pub fn is_compatible(self) -> bool {
        matches!(self, Self::Compatible(_))
    }
}

/// Whether a side of `size` pixels, squared, yields a patch count that is a
/// multiple of `block_size`.
pub fn is_block_aligned(size: u32, block_size: BlockSize) -> bool {
    lat_is_block_aligned(u64::from(size / VAE_STRIDE), block_size)
}

fn lat_is_block_aligned(lat: u64, block_size: BlockSize) -> bool {
    let patches = lat * lat / u64::from(PATCH_SIZE * PATCH_SIZE);
    patches % u64::from(block_size.get()) == 0
}

/// `target` rounded down to a multiple of the VAE stride.
pub fn vae_aligned_base(target: u32) -> u32 {
    (target / VAE_STRIDE) * VAE_STRIDE
}

/// Candidate sizes examined for `target`, ascending.
pub fn search_window(target: u32) -> impl Iterator<Item = u32> {
    let base = vae_aligned_base(target);
    let start = base.saturating_sub(SEARCH_BELOW).max(VAE_STRIDE);
    (start..base.saturating_add(SEARCH_ABOVE)).step_by(VAE_STRIDE as usize)
}

/// Search one dimension, reporting whether block alignment was reached.
pub fn search_dimension(target: u32, mode: RadialMode, block_size: BlockSize) -> DimensionMatch {
    let mut candidates: Vec<(u32, u32)> = search_window(target)
        .filter(|&size| is_block_aligned(size, block_size))
        .map(|size| (size.abs_diff(target), size))
        .collect();

    // By distance, then by size, so equal distances favor the smaller size
    candidates.sort_unstable();

    let (nearest, farthest) = match candidates.as_slice() {
        [] => return DimensionMatch::AlignedOnly(vae_aligned_base(target).max(VAE_STRIDE)),
        [(_, only)] => (*only, *only),
        [(_, first), .., (_, last)] => (*first, *last),
    };
    let mut sizes = candidates.iter().map(|&(_, size)| size);

    let size = match mode {
        RadialMode::Upscale => sizes.find(|&size| size >= target).unwrap_or(farthest),
        RadialMode::Downscale => sizes.find(|&size| size <= target).unwrap_or(nearest),
        RadialMode::Closest => nearest,
    };
    DimensionMatch::Compatible(size)
}

/// Adjust a single dimension so its squared patch count divides by `block_size`.
///
/// Falls back to the VAE-aligned target when the window holds no candidate.
pub fn find_compatible_dimension(target: u32, mode: RadialMode, block_size: BlockSize) -> u32 {
    search_dimension(target, mode, block_size).value()
}

// ============================================================================
// Square scan
// ============================================================================

/// Accepted square sizes within [`SQUARE_SCAN_RADIUS`] latent steps of `side`, ascending.
fn square_candidates(side: u32, block_size: BlockSize) -> Vec<u32> {
    let target_lat = i64::from(side / VAE_STRIDE);
    (-SQUARE_SCAN_RADIUS..=SQUARE_SCAN_RADIUS)
        .map(|offset| target_lat + offset)
        .filter(|&lat| lat > 0)
        .filter(|&lat| lat_is_block_aligned(lat as u64, block_size))
        .filter_map(|lat| u32::try_from(lat * i64::from(VAE_STRIDE)).ok())
        .collect()
}

fn scan_square(
    side: u32,
    mode: RadialMode,
    block_size: BlockSize,
    policy: SquareScan,
) -> Option<u32> {
    let candidates = square_candidates(side, block_size);

    match policy {
        SquareScan::FirstMatch => {
            let original_aligned = is_block_aligned(side, block_size);
            candidates.into_iter().find(|&size| match mode {
                RadialMode::Upscale => size >= side,
                RadialMode::Downscale => size <= side,
                // An already compliant side is only replaced by itself
                RadialMode::Closest => !original_aligned || size == side,
            })
        }
        SquareScan::Nearest => match mode {
            RadialMode::Upscale => candidates.into_iter().filter(|&size| size >= side).min(),
            RadialMode::Downscale => candidates.into_iter().filter(|&size| size <= side).max(),
            RadialMode::Closest => {
                candidates.into_iter().min_by_key(|&size| (size.abs_diff(side), size))
            }
        },
    }
}

// ============================================================================
// Resolution search
// ============================================================================

/// Make `(width, height)` radial-attention compatible.
///
/// Uses the default [`SquareScan`] policy and discards diagnostics. See
/// [`RadialSettings::adjust`] for the configurable form.
pub fn calculate_radial_compatible_resolution(
    width: u32,
    height: u32,
    mode: RadialMode,
    block_size: BlockSize,
) -> (u32, u32) {
    let settings = RadialSettings {
        enabled: true,
        mode,
        block_size,
        square_scan: SquareScan::default(),
    };
    settings.adjust(Resolution::new(width, height), &NoopObserver).into()
}

/// Radial attention options as exposed to the host and the config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RadialSettings {
    pub enabled: bool,
    pub mode: RadialMode,
    pub block_size: BlockSize,
    pub square_scan: SquareScan,
}

impl Default for RadialSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            mode: RadialMode::Upscale,
            block_size: BlockSize::B128,
            square_scan: SquareScan::Nearest,
        }
    }
}

impl RadialSettings {
    /// Settings with adjustment switched on.
    pub fn enabled(mode: RadialMode, block_size: BlockSize) -> Self {
        Self {
            enabled: true,
            mode,
            block_size,
            ..Self::default()
        }
    }

    pub fn with_square_scan(mut self, square_scan: SquareScan) -> Self {
        self.square_scan = square_scan;
        self
    }

    /// Adjust `resolution` regardless of `enabled`.
    ///
    /// Square inputs are scanned jointly first. If that finds nothing and
    /// the input is already compliant and VAE aligned it is returned
    /// unchanged; otherwise each side is searched on its own.
    pub fn adjust(&self, resolution: Resolution, observer: &dyn ResolutionObserver) -> Resolution {
        let Resolution { width, height } = resolution;

        if resolution.is_square() {
            if let Some(side) = scan_square(width, self.mode, self.block_size, self.square_scan) {
                return Resolution::new(side, side);
            }
            // Unchanged only when the side is already a multiple of the VAE stride
            if width % VAE_STRIDE == 0 && is_block_aligned(width, self.block_size) {
                return resolution;
            }
        }

        Resolution::new(self.dimension(width, observer), self.dimension(height, observer))
    }

    fn dimension(&self, target: u32, observer: &dyn ResolutionObserver) -> u32 {
        match search_dimension(target, self.mode, self.block_size) {
            DimensionMatch::Compatible(size) => size,
            DimensionMatch::AlignedOnly(size) => {
                observer.search_exhausted(target, self.block_size, size);
                size
            }
        }
    }
}

// ============================================================================
// Batch table update
// ============================================================================

/// A table leaf changed by [`update_resolutions_for_radial_attention`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LeafChange {
    pub model_family: String,
    pub aspect_ratio: String,
    pub quality: Quality,
    pub from: Resolution,
    pub to: Resolution,
}

impl LeafChange {
    /// `family-aspect-quality` label used in diagnostics.
    pub fn path(&self) -> String {
        format!("{}-{}-{}", self.model_family, self.aspect_ratio, self.quality)
    }
}

/// Result of a batch update: the new table plus what changed.
#[derive(Debug, Clone)]
pub struct RadialTableUpdate {
    pub table: ResolutionTable,
    pub changes: Vec<LeafChange>,
}

/// Apply the compatibility search to every leaf of `table`.
///
/// The input is left untouched; the returned table has the same families,
/// aspect ratios and quality tiers in the same order. Each changed leaf is
/// recorded and reported to `observer`.
pub fn update_resolutions_for_radial_attention(
    table: &ResolutionTable,
    settings: &RadialSettings,
    observer: &dyn ResolutionObserver,
) -> RadialTableUpdate {
    let mut changes = Vec::new();

    let updated = table.map_leaves(|family, aspect_ratio, quality, original| {
        let adjusted = settings.adjust(original, observer);
        if adjusted != original {
            let change = LeafChange {
                model_family: family.to_string(),
                aspect_ratio: aspect_ratio.to_string(),
                quality,
                from: original,
                to: adjusted,
            };
            observer.leaf_adjusted(&change.path(), original, adjusted, settings.block_size);
            changes.push(change);
        }
        adjusted
    });

    RadialTableUpdate {
        table: updated,
        changes,
    }
}

/// Radial-compatible variant of the built-in table.
pub fn radial_resolutions(
    settings: &RadialSettings,
    observer: &dyn ResolutionObserver,
) -> RadialTableUpdate {
    update_resolutions_for_radial_attention(&ResolutionTable::builtin(), settings, observer)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn legacy(mode: RadialMode, block_size: BlockSize) -> RadialSettings {
        RadialSettings::enabled(mode, block_size).with_square_scan(SquareScan::FirstMatch)
    }

    #[test]
    fn test_radial_alignment_constant() {
        assert_eq!(RADIAL_ALIGNMENT, 16);
    }

    #[test]
    fn test_search_window_bounds() {
        let window: Vec<u32> = search_window(624).collect();
        assert_eq!(window.first(), Some(&560));
        assert_eq!(window.last(), Some(&696));
        assert!(window.iter().all(|size| size % VAE_STRIDE == 0));
    }

    #[test]
    fn test_search_window_clamps_low_targets() {
        let window: Vec<u32> = search_window(20).collect();
        assert_eq!(window.first(), Some(&8));
        assert_eq!(window.last(), Some(&88));
    }

    #[test]
    fn test_find_dimension_closest() {
        assert_eq!(find_compatible_dimension(720, RadialMode::Closest, BlockSize::B128), 768);
        assert_eq!(find_compatible_dimension(1088, RadialMode::Closest, BlockSize::B64), 1032);
        assert_eq!(find_compatible_dimension(440, RadialMode::Closest, BlockSize::B64), 384);
    }

    #[test]
    fn test_find_dimension_upscale() {
        assert_eq!(find_compatible_dimension(1088, RadialMode::Upscale, BlockSize::B64), 1152);
        assert_eq!(find_compatible_dimension(440, RadialMode::Upscale, BlockSize::B64), 512);
        assert_eq!(find_compatible_dimension(480, RadialMode::Upscale, BlockSize::B128), 512);
    }

    #[test]
    fn test_find_dimension_upscale_without_larger_candidate_takes_farthest() {
        // Only 768 qualifies between 768 and 904
        assert_eq!(find_compatible_dimension(832, RadialMode::Upscale, BlockSize::B128), 768);
    }

    #[test]
    fn test_find_dimension_downscale() {
        assert_eq!(find_compatible_dimension(1088, RadialMode::Downscale, BlockSize::B64), 1032);
        assert_eq!(find_compatible_dimension(832, RadialMode::Downscale, BlockSize::B64), 768);
    }

    #[test]
    fn test_find_dimension_downscale_without_smaller_candidate_takes_closest() {
        assert_eq!(find_compatible_dimension(624, RadialMode::Downscale, BlockSize::B64), 640);
    }

    #[test]
    fn test_find_dimension_exhausted_keeps_alignment() {
        let result = search_dimension(624, RadialMode::Upscale, BlockSize::B128);
        assert_eq!(result, DimensionMatch::AlignedOnly(624));
        assert!(!result.is_compatible());

        // Unaligned target falls back to its aligned base
        assert_eq!(find_compatible_dimension(628, RadialMode::Closest, BlockSize::B128), 624);
    }

    #[test]
    fn test_square_624_upscale() {
        for (block_size, expected) in [(BlockSize::B64, 640), (BlockSize::B128, 624)] {
            let (w, h) =
                calculate_radial_compatible_resolution(624, 624, RadialMode::Upscale, block_size);
            assert_eq!((w, h), (expected, expected));
        }
    }

    #[test]
    fn test_square_624_downscale_128_falls_back_to_alignment() {
        let result = calculate_radial_compatible_resolution(
            624,
            624,
            RadialMode::Downscale,
            BlockSize::B128,
        );
        assert_eq!(result, (624, 624));
    }

    #[test]
    fn test_square_already_compatible_is_kept() {
        for mode in [RadialMode::Upscale, RadialMode::Downscale, RadialMode::Closest] {
            let result = calculate_radial_compatible_resolution(1024, 1024, mode, BlockSize::B64);
            assert_eq!(result, (1024, 1024), "mode {mode}");
        }
    }

    #[test]
    fn test_square_nearest_closest_prefers_minimum_distance() {
        let result =
            calculate_radial_compatible_resolution(960, 960, RadialMode::Closest, BlockSize::B64);
        assert_eq!(result, (1016, 1016));
    }

    #[test]
    fn test_square_first_match_policy() {
        let observer = NoopObserver;
        let square = |side| Resolution::new(side, side);

        // Lowest accepted size wins, even over a compliant original
        let settings = legacy(RadialMode::Downscale, BlockSize::B64);
        assert_eq!(settings.adjust(square(1024), &observer), square(1016));

        let settings = legacy(RadialMode::Closest, BlockSize::B64);
        assert_eq!(settings.adjust(square(960), &observer), square(896));
        assert_eq!(settings.adjust(square(1024), &observer), square(1024));

        let settings = legacy(RadialMode::Upscale, BlockSize::B64);
        assert_eq!(settings.adjust(square(960), &observer), square(1016));
    }

    #[test]
    fn test_square_idempotent() {
        let closest = |side| {
            calculate_radial_compatible_resolution(side, side, RadialMode::Closest, BlockSize::B64)
        };
        let once = closest(1024);
        let twice = closest(once.0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_non_square_independent_dimensions() {
        let result =
            calculate_radial_compatible_resolution(1280, 720, RadialMode::Upscale, BlockSize::B128);
        assert_eq!(result, (1280, 768));

        let result =
            calculate_radial_compatible_resolution(1088, 832, RadialMode::Closest, BlockSize::B64);
        assert_eq!(result, (1032, 768));
    }

    #[test]
    fn test_adjust_reports_exhaustion() {
        use std::sync::Mutex;

        #[derive(Default)]
        struct Exhaustions(Mutex<Vec<u32>>);

        impl ResolutionObserver for Exhaustions {
            fn search_exhausted(&self, target: u32, _block_size: BlockSize, _fallback: u32) {
                self.0.lock().unwrap().push(target);
            }
        }

        let observer = Exhaustions::default();
        let settings = RadialSettings::enabled(RadialMode::Upscale, BlockSize::B128);
        let result = settings.adjust(Resolution::new(624, 624), &observer);
        assert_eq!(result, Resolution::new(624, 624));
        assert_eq!(*observer.0.lock().unwrap(), vec![624, 624]);
    }

    #[test]
    fn test_unaligned_compliant_square_is_realigned() {
        // 1028 / 8 = 128 latents is compliant, but 1028 is not a multiple of 8
        for scan in [SquareScan::Nearest, SquareScan::FirstMatch] {
            for mode in [RadialMode::Upscale, RadialMode::Downscale, RadialMode::Closest] {
                let settings =
                    RadialSettings::enabled(mode, BlockSize::B128).with_square_scan(scan);
                let result = settings.adjust(Resolution::new(1028, 1028), &NoopObserver);
                assert_eq!(result, Resolution::new(1024, 1024), "mode {mode}, scan {scan}");
            }
        }
    }

    #[test]
    fn test_small_square_stays_positive() {
        let result =
            calculate_radial_compatible_resolution(8, 8, RadialMode::Downscale, BlockSize::B128);
        assert!(result.0 >= VAE_STRIDE);
        assert_eq!(result.0, result.1);
    }

    #[test]
    fn test_radial_settings_default() {
        let settings = RadialSettings::default();
        assert!(!settings.enabled);
        assert_eq!(settings.mode, RadialMode::Upscale);
        assert_eq!(settings.block_size, BlockSize::B128);
        assert_eq!(settings.square_scan, SquareScan::Nearest);
    }

    #[test]
    fn test_radial_settings_json() {
        let json = r#"{"enabled": true, "mode": "closest", "block_size": 64}"#;
        let settings: RadialSettings = serde_json::from_str(json).unwrap();
        assert_eq!(settings, RadialSettings::enabled(RadialMode::Closest, BlockSize::B64));

        let legacy: RadialSettings =
            serde_json::from_str(r#"{"square_scan": "first-match"}"#).unwrap();
        assert_eq!(legacy.square_scan, SquareScan::FirstMatch);

        assert!(serde_json::from_str::<RadialSettings>(r#"{"block_size": 96}"#).is_err());
        assert!(serde_json::from_str::<RadialSettings>(r#"{"blocksize": 64}"#).is_err());
    }

    #[test]
    fn test_update_preserves_shape_and_input() {
        let table = ResolutionTable::builtin();
        let settings = RadialSettings::enabled(RadialMode::Closest, BlockSize::B64);
        let update = update_resolutions_for_radial_attention(&table, &settings, &NoopObserver);

        assert_eq!(table, ResolutionTable::builtin());
        assert_eq!(update.table.family_names(), table.family_names());
        for family in table.families() {
            let updated = update.table.family(&family.name).unwrap();
            assert_eq!(updated.aspect_ratio_names(), family.aspect_ratio_names());
        }
        assert_eq!(update.table.leaves().count(), table.leaves().count());
    }

    #[test]
    fn test_update_honours_square_scan() {
        let lookup = |scan| {
            let settings =
                RadialSettings::enabled(RadialMode::Closest, BlockSize::B64).with_square_scan(scan);
            radial_resolutions(&settings, &NoopObserver)
                .table
                .lookup("T2V14B", "Squarish", Quality::HQ)
                .unwrap()
        };
        assert_eq!(lookup(SquareScan::Nearest), Resolution::new(1016, 1016));
        assert_eq!(lookup(SquareScan::FirstMatch), Resolution::new(896, 896));
    }

    #[test]
    fn test_update_records_changes() {
        let settings = RadialSettings::enabled(RadialMode::Closest, BlockSize::B64);
        let update = radial_resolutions(&settings, &NoopObserver);

        let squarish = update.changes.iter().find(|c| c.path() == "I2V720p-Squarish-HQ").unwrap();
        assert_eq!(squarish.from, Resolution::new(624, 624));
        assert_eq!(squarish.to, Resolution::new(640, 640));
        assert_eq!(squarish.path(), "I2V720p-Squarish-HQ");

        for change in &update.changes {
            assert_ne!(change.from, change.to);
            let leaf = update
                .table
                .lookup(&change.model_family, &change.aspect_ratio, change.quality)
                .unwrap();
            assert_eq!(leaf, change.to);
        }

        // 1024x1024 is already compliant and must not be listed
        assert!(!update.changes.iter().any(|c| c.path() == "IMG-Squarish-MQ"));
    }
}
