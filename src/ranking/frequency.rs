use serde::{Deserialize, Serialize};

/// Occurrences per 10,000 tokens; 0 when there are no tokens
pub fn per_10k(count: u64, total: u64) -> f64 {
    if total == 0 {
        return 0.0;
    }
    10_000.0 * count as f64 / total as f64
}

/// Display rounding used on lemma pages
pub fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

/// log2 of a term's relative frequency in a scope over its relative frequency
/// in the core sub-corpus. Absent unless the term occurs more than once in the
/// scope and at least once in the core.
pub fn log_ratio(local: u64, local_total: u64, core: u64, core_total: u64) -> Option<f64> {
    if local <= 1 || core == 0 || local_total == 0 || core_total == 0 {
        return None;
    }
    let local_rel = local as f64 / local_total as f64;
    let core_rel = core as f64 / core_total as f64;
    Some((local_rel / core_rel).log2())
}

/// Inclusive bounds on core frequency per 10k, applied as a core_count range
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CoreBand {
    pub min_core_freq: Option<f64>,
    pub max_core_freq: Option<f64>,
}

impl CoreBand {
    pub fn new(min_core_freq: Option<f64>, max_core_freq: Option<f64>) -> Self {
        CoreBand { min_core_freq, max_core_freq }
    }

    pub fn is_open(&self) -> bool {
        self.min_core_freq.is_none() && self.max_core_freq.is_none()
    }

    /// Absolute core_count bounds for the given core total
    pub fn count_bounds(&self, core_total: u64) -> (f64, f64) {
        let to_count = |freq: f64| freq * core_total as f64 / 10_000.0;
        (
            self.min_core_freq.map_or(f64::NEG_INFINITY, to_count),
            self.max_core_freq.map_or(f64::INFINITY, to_count),
        )
    }

    pub fn contains(&self, core_count: u64, core_total: u64) -> bool {
        let (min, max) = self.count_bounds(core_total);
        let count = core_count as f64;
        count >= min && count <= max
    }

    /// Cache key form; f64 has no `Hash`
    pub fn key(&self) -> (Option<u64>, Option<u64>) {
        (self.min_core_freq.map(f64::to_bits), self.max_core_freq.map(f64::to_bits))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyness_example() {
        assert_eq!(per_10k(5, 1000), 50.0);
        assert_eq!(per_10k(50, 100_000), 5.0);
        let k = log_ratio(5, 1000, 50, 100_000).unwrap();
        assert!((k - 10f64.log2()).abs() < 1e-9);
        assert_eq!(round1(k), 3.3);
    }

    #[test]
    fn keyness_guards() {
        assert!(log_ratio(1, 1000, 50, 100_000).is_none());
        assert!(log_ratio(5, 1000, 0, 100_000).is_none());
        assert!(log_ratio(5, 0, 50, 100_000).is_none());
        assert!(log_ratio(5, 1000, 50, 0).is_none());
        assert_eq!(per_10k(0, 0), 0.0);
    }

    #[test]
    fn band_converts_to_counts() {
        let band = CoreBand::new(Some(1.0), Some(10.0));
        assert_eq!(band.count_bounds(100_000), (10.0, 100.0));
        assert!(band.contains(10, 100_000));
        assert!(band.contains(100, 100_000));
        assert!(!band.contains(9, 100_000));
        assert!(!band.contains(101, 100_000));
        assert!(CoreBand::default().contains(0, 0));
    }
}
