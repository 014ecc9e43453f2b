use super::PriceSeries;

/// Resolve the price sample nearest to `timestamp_secs`.
///
/// The block timestamp is converted to milliseconds and matched against the
/// series under a left-to-right scan minimizing absolute distance; ties keep
/// the earliest-encountered sample, so resolution is deterministic for any
/// fixed series order.
///
/// Returns `None` on an empty series. Callers are expected to have excluded
/// unpriced tokens already, so `None` never surfaces past the valuation
/// engine.
pub fn resolve_nearest(series: &PriceSeries, timestamp_secs: u64) -> Option<f64> {
    let target_ms = (timestamp_secs as i64) * 1000;

    let mut best: Option<(i64, f64)> = None;

    for &(ts, price) in series {
        let distance = (ts - target_ms).abs();
        match best {
            Some((best_distance, _)) if distance >= best_distance => {},
            _ => best = Some((distance, price)),
        }
    }

    best.map(|(_, price)| price)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_series_has_no_price() {
        assert_eq!(resolve_nearest(&vec![], 1_590_000_000), None);
    }

    #[test]
    fn picks_the_nearest_sample() {
        let series = vec![
            (1_000_000, 1.0),
            (2_000_000, 2.0),
            (3_000_000, 3.0),
        ];
        // 1900 s -> 1_900_000 ms, closest to the middle sample
        assert_eq!(resolve_nearest(&series, 1_900), Some(2.0));
    }

    #[test]
    fn exact_match_wins() {
        let series = vec![(1_000_000, 1.0), (2_000_000, 2.0)];
        assert_eq!(resolve_nearest(&series, 2_000), Some(2.0));
    }

    #[test]
    fn ties_resolve_to_the_earliest_sample() {
        // 1500 s -> 1_500_000 ms is equidistant from both samples
        let series = vec![(1_000_000, 1.0), (2_000_000, 2.0)];
        assert_eq!(resolve_nearest(&series, 1_500), Some(1.0));
    }

    #[test]
    fn unordered_series_still_resolves() {
        let series = vec![(3_000_000, 3.0), (1_000_000, 1.0), (2_000_000, 2.0)];
        assert_eq!(resolve_nearest(&series, 1_100), Some(1.0));
    }
}
