//! Block distortion metrics driving motion search and mode decisions.

/// Per-sample cost model shared by every comparison the encoder makes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MetricKind {
    /// Sum of absolute differences.
    #[default]
    Sad,
    /// Sum of squared differences.
    Ssd,
}

#[inline]
fn sample_cost(kind: MetricKind, diff: i32) -> u32 {
    match kind {
        MetricKind::Sad => diff.unsigned_abs(),
        MetricKind::Ssd => (diff * diff) as u32,
    }
}

/// Distortion between two equal-sized blocks.
///
/// Exact while the running total stays within `bound`; once the total
/// exceeds the bound the function may return early with any value above it.
/// Callers needing the exact value pass `u32::MAX`.
pub fn block_distortion(kind: MetricKind, a: &[u8], b: &[u8], bound: u32) -> u32 {
    debug_assert_eq!(a.len(), b.len());
    let mut total = 0u32;
    for (chunk_a, chunk_b) in a.chunks(16).zip(b.chunks(16)) {
        for (&pa, &pb) in chunk_a.iter().zip(chunk_b) {
            total += sample_cost(kind, pa as i32 - pb as i32);
        }
        if total > bound {
            return total;
        }
    }
    total
}

/// Deviation of a block about its own (rounded) mean, in the same units as
/// `block_distortion`. Stands in for the cost of coding the block without
/// any prediction.
pub fn block_deviation(kind: MetricKind, a: &[u8]) -> u32 {
    debug_assert!(!a.is_empty());
    let len = a.len() as u32;
    let mean = (a.iter().map(|&p| p as u32).sum::<u32>() + len / 2) / len;
    a.iter()
        .map(|&p| sample_cost(kind, p as i32 - mean as i32))
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_blocks_have_zero_distortion() {
        let a = [93u8; 256];
        assert_eq!(block_distortion(MetricKind::Sad, &a, &a, u32::MAX), 0);
        assert_eq!(block_distortion(MetricKind::Ssd, &a, &a, u32::MAX), 0);
    }

    #[test]
    fn known_difference_values() {
        let a = [10u8; 64];
        let b = [7u8; 64];
        assert_eq!(block_distortion(MetricKind::Sad, &a, &b, u32::MAX), 192);
        assert_eq!(block_distortion(MetricKind::Ssd, &a, &b, u32::MAX), 576);
    }

    #[test]
    fn bounded_result_still_exceeds_bound() {
        let a = [200u8; 256];
        let b = [0u8; 256];
        let d = block_distortion(MetricKind::Sad, &a, &b, 10);
        assert!(d > 10);
    }

    #[test]
    fn result_exact_when_within_bound() {
        let a: Vec<u8> = (0..64).map(|i| (i * 3) as u8).collect();
        let b: Vec<u8> = (0..64).map(|i| (i * 2) as u8).collect();
        let exact = block_distortion(MetricKind::Ssd, &a, &b, u32::MAX);
        assert_eq!(block_distortion(MetricKind::Ssd, &a, &b, exact), exact);
    }

    #[test]
    fn flat_block_has_zero_deviation() {
        let a = [77u8; 256];
        assert_eq!(block_deviation(MetricKind::Sad, &a), 0);
        assert_eq!(block_deviation(MetricKind::Ssd, &a), 0);
    }

    #[test]
    fn two_valued_block_deviation() {
        let mut a = [0u8; 64];
        a[32..].fill(64);
        // mean 32
        assert_eq!(block_deviation(MetricKind::Sad, &a), 2048);
        assert_eq!(block_deviation(MetricKind::Ssd, &a), 65536);
    }

    #[test]
    fn deviation_rounds_the_mean() {
        let mut a = [10u8; 64];
        a[32..].fill(11);
        // mean rounds up to 11
        assert_eq!(block_deviation(MetricKind::Sad, &a), 32);
    }
}
