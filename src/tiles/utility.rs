/// Sums values in a total order so the result does not depend on the order
/// the values arrived in.
pub fn stable_sum(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    sorted.iter().sum()
}

/// Arithmetic mean of `values`, or `None` when there is nothing to average.
pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Some(stable_sum(values) / values.len() as f64)
}
