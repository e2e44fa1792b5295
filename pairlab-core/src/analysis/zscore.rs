//! Rolling z-score of the spread.

/// Z-score of each observation against its trailing window (inclusive).
///
/// Uses the sample standard deviation (ddof = 1). The first `window - 1`
/// entries are `None`, as is any entry whose window has zero dispersion.
/// A `window` below 2 yields all `None`.
pub fn rolling_zscore(spread: &[f64], window: usize) -> Vec<Option<f64>> {
    let mut out = vec![None; spread.len()];
    if window < 2 || spread.len() < window {
        return out;
    }

    for end in window - 1..spread.len() {
        let slice = &spread[end + 1 - window..=end];
        let first = slice[0];
        if slice.iter().all(|v| *v == first) {
            continue;
        }
        let mean = slice.iter().sum::<f64>() / window as f64;
        let var = slice.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (window - 1) as f64;
        let std = var.sqrt();
        if std > 0.0 && std.is_finite() {
            out[end] = Some((spread[end] - mean) / std);
        }
    }
    out
}
