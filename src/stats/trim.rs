//! Symmetric trimming of noisy sample series
//!
//! A trim fraction `f` removes `floor(len * 2f)` values in total, half from
//! each end of the sorted series. When that total is odd the two innermost
//! survivors at the boundary are folded into their mean, so the result is
//! always `len - floor(len * 2f)` values long.

use tracing::warn;

/// Largest accepted trim fraction (exclusive).
pub const MAX_TRIM_FRACTION: f64 = 0.5;

/// Normalize a trim fraction.
///
/// Returns `None` when no trimming should happen: the fraction is zero, or
/// it would remove half of the series or more.
pub fn effective_fraction(fraction: f64) -> Option<f64> {
    let fraction = fraction.abs();
    if fraction == 0.0 || fraction.is_nan() {
        return None;
    }
    if fraction >= MAX_TRIM_FRACTION {
        warn!("Won't trim a series by {:.0}% or more per side ({}), using it untrimmed", MAX_TRIM_FRACTION * 100.0, fraction);
        return None;
    }
    Some(fraction)
}

/// Trim `values` symmetrically by `fraction`.
pub fn trim(values: &[f64], fraction: f64) -> Vec<f64> {
    let Some(fraction) = effective_fraction(fraction) else {
        return values.to_vec();
    };
    if values.is_empty() {
        return Vec::new();
    }

    let remove_total = (values.len() as f64 * (2.0 * fraction)).floor() as usize;
    let fold = remove_total % 2 == 1;
    let per_side = remove_total / 2;

    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);

    let mut kept: Vec<f64> = sorted[per_side..sorted.len() - per_side].to_vec();
    if fold {
        // remove_total < len, so at least two values survive here
        if let Some(last) = kept.pop() {
            kept[0] = kept[0] / 2.0 + last / 2.0;
        }
    }
    kept
}

/// Arithmetic mean of the trimmed series.
pub fn trimmed_average(values: &[f64], fraction: f64) -> Option<f64> {
    super::mean(&trim(values, fraction))
}

/// Maximum of the trimmed series.
pub fn trimmed_max(values: &[f64], fraction: f64) -> Option<f64> {
    super::max(&trim(values, fraction))
}
