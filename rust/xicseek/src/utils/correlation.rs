use crate::errors::DataProcessingError;

fn check_same_len(a: &[f32], b: &[f32], context: &str) -> Result<(), DataProcessingError> {
    if a.len() != b.len() || a.is_empty() {
        return Err(DataProcessingError::ExpectedSlicesSameLength {
            expected: a.len(),
            other: b.len(),
            context: context.to_string(),
        });
    }
    Ok(())
}

/// Pearson correlation of two equal length slices.
///
/// Returns `NaN` when either slice has zero variance.
///
/// # Example
///
/// ```
/// use xicseek::utils::correlation::pearson_correlation;
///
/// let a = vec![1.0, 2.0, 3.0];
/// let b = vec![2.0, 4.0, 6.0];
/// let result = pearson_correlation(&a, &b).unwrap();
/// assert!((result - 1.0).abs() < 1e-6);
/// ```
pub fn pearson_correlation(a: &[f32], b: &[f32]) -> Result<f32, DataProcessingError> {
    check_same_len(a, b, "pearson_correlation")?;
    let n = a.len() as f64;
    let mean_a = a.iter().map(|&x| x as f64).sum::<f64>() / n;
    let mean_b = b.iter().map(|&x| x as f64).sum::<f64>() / n;

    let mut cov = 0.0;
    let mut var_a = 0.0;
    let mut var_b = 0.0;
    for (&x, &y) in a.iter().zip(b.iter()) {
        let dx = x as f64 - mean_a;
        let dy = y as f64 - mean_b;
        cov += dx * dy;
        var_a += dx * dx;
        var_b += dy * dy;
    }
    if var_a == 0.0 || var_b == 0.0 {
        return Ok(f32::NAN);
    }
    Ok((cov / (var_a.sqrt() * var_b.sqrt())) as f32)
}

/// Ranks with ties sharing their average rank (1-based).
fn average_ranks(values: &[f32]) -> Vec<f32> {
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&i, &j| values[i].total_cmp(&values[j]));
    let mut ranks = vec![0.0f32; values.len()];
    let mut start = 0;
    while start < order.len() {
        let mut end = start + 1;
        while end < order.len() && values[order[end]] == values[order[start]] {
            end += 1;
        }
        let avg = (start + end + 1) as f32 / 2.0;
        for &idx in order[start..end].iter() {
            ranks[idx] = avg;
        }
        start = end;
    }
    ranks
}

/// Spearman rank correlation.
pub fn spearman_correlation(a: &[f32], b: &[f32]) -> Result<f32, DataProcessingError> {
    check_same_len(a, b, "spearman_correlation")?;
    pearson_correlation(&average_ranks(a), &average_ranks(b))
}

fn standardize(x: &[f32]) -> Option<Vec<f64>> {
    let n = x.len() as f64;
    let mean = x.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = x.iter().map(|&v| (v as f64 - mean).powi(2)).sum::<f64>() / n;
    if var <= 0.0 {
        return None;
    }
    let sd = var.sqrt();
    Some(x.iter().map(|&v| (v as f64 - mean) / sd).collect())
}

/// Best normalized cross-correlation of two traces over lags in
/// `-max_lag..=max_lag`.
///
/// Returns `(lag, correlation)` where a positive lag means `b` trails
/// `a`. Flat traces yield `(0, 0.0)`.
pub fn max_cross_correlation(
    a: &[f32],
    b: &[f32],
    max_lag: usize,
) -> Result<(i32, f32), DataProcessingError> {
    check_same_len(a, b, "max_cross_correlation")?;
    let (za, zb) = match (standardize(a), standardize(b)) {
        (Some(za), Some(zb)) => (za, zb),
        _ => return Ok((0, 0.0)),
    };
    let n = za.len() as i64;
    let max_lag = (max_lag as i64).min(n - 1);

    let mut best = (0i32, f64::NEG_INFINITY);
    // Walk lags from 0 outwards so ties prefer the smallest shift.
    let lags = std::iter::once(0).chain((1..=max_lag).flat_map(|l| [l, -l]));
    for lag in lags {
        let mut acc = 0.0;
        for i in 0..n {
            let j = i + lag;
            if j < 0 || j >= n {
                continue;
            }
            acc += za[i as usize] * zb[j as usize];
        }
        let value = acc / n as f64;
        if value > best.1 {
            best = (lag as i32, value);
        }
    }
    Ok((best.0, best.1 as f32))
}
