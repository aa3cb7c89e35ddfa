//! Transit duration estimator: maps a destination postal code to seconds.

use rand::Rng;
use std::ops::RangeInclusive;

/// Duration band selected by the first character of a normalized postal code.
///
/// - `K` -> Express, 20..=30s
/// - `L` / `M` -> Regional, 30..=40s
/// - anything else (including empty) -> Standard, 75..=100s
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DurationBand {
    Express,
    Regional,
    Standard,
}

impl DurationBand {
    /// Pick the band for a raw postal code (normalization happens here).
    pub fn for_postal_code(postal_code: &str) -> Self {
        match normalize_postal_code(postal_code).chars().next() {
            Some('K') => DurationBand::Express,
            Some('L') | Some('M') => DurationBand::Regional,
            _ => DurationBand::Standard,
        }
    }

    /// Closed range of seconds for this band.
    pub fn range(self) -> RangeInclusive<u32> {
        match self {
            DurationBand::Express => 20..=30,
            DurationBand::Regional => 30..=40,
            DurationBand::Standard => 75..=100,
        }
    }

    /// Draw a duration uniformly from the band.
    pub fn sample<R: Rng + ?Sized>(self, rng: &mut R) -> u32 {
        rng.gen_range(self.range())
    }
}

/// Uppercase and drop all whitespace.
pub fn normalize_postal_code(postal_code: &str) -> String {
    postal_code
        .chars()
        .filter(|c| !c.is_whitespace())
        .flat_map(char::to_uppercase)
        .collect()
}

/// Estimate transit seconds using the thread-local RNG.
pub fn estimate_transit(postal_code: &str) -> u32 {
    estimate_transit_with(postal_code, &mut rand::thread_rng())
}

/// Estimate transit seconds with a caller-supplied RNG.
pub fn estimate_transit_with<R: Rng + ?Sized>(postal_code: &str, rng: &mut R) -> u32 {
    DurationBand::for_postal_code(postal_code).sample(rng)
}
