//! Fisher linear discriminant.

use super::LabelledGroup;
use crate::errors::CalibrationError;
use tracing::warn;

const PIVOT_EPS: f64 = 1e-12;

/// Solves `a x = b` in place by Gaussian elimination with partial
/// pivoting. `a` is row-major `n x n`.
fn solve(mut a: Vec<f64>, mut b: Vec<f64>) -> Result<Vec<f64>, CalibrationError> {
    let n = b.len();
    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i * n + col].abs().total_cmp(&a[j * n + col].abs()))
            .unwrap_or(col);
        if a[pivot_row * n + col].abs() < PIVOT_EPS {
            return Err(CalibrationError::SingularScatterMatrix { n_features: n });
        }
        if pivot_row != col {
            for k in 0..n {
                a.swap(col * n + k, pivot_row * n + k);
            }
            b.swap(col, pivot_row);
        }
        for row in (col + 1)..n {
            let factor = a[row * n + col] / a[col * n + col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row * n + k] -= factor * a[col * n + k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row * n + k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row * n + row];
    }
    Ok(x)
}

fn class_mean<'a>(rows: impl Iterator<Item = &'a [f64]>, n_features: usize) -> (Vec<f64>, usize) {
    let mut mean = vec![0.0; n_features];
    let mut count = 0;
    for row in rows {
        for (m, v) in mean.iter_mut().zip(row.iter()) {
            *m += v;
        }
        count += 1;
    }
    if count > 0 {
        mean.iter_mut().for_each(|m| *m /= count as f64);
    }
    (mean, count)
}

fn add_scatter<'a>(scatter: &mut [f64], rows: impl Iterator<Item = &'a [f64]>, mu: &[f64]) {
    let n = mu.len();
    for row in rows {
        for i in 0..n {
            let di = row[i] - mu[i];
            for j in 0..n {
                scatter[i * n + j] += di * (row[j] - mu[j]);
            }
        }
    }
}

/// Discriminant direction `(S_w + ridge I)^-1 (mu_target - mu_decoy)`,
/// scaled to unit L1 norm.
///
/// Targets project to higher values than decoys.
pub fn fit_lda(examples: &[LabelledGroup], ridge: f64) -> Result<Vec<f64>, CalibrationError> {
    let n_features = examples.first().map(|x| x.features.len()).unwrap_or(0);
    let targets = || {
        examples
            .iter()
            .filter(|x| x.label.is_target())
            .map(|x| x.features.as_slice())
    };
    let decoys = || {
        examples
            .iter()
            .filter(|x| x.label.is_decoy())
            .map(|x| x.features.as_slice())
    };
    let (mu_t, n_t) = class_mean(targets(), n_features);
    let (mu_d, n_d) = class_mean(decoys(), n_features);

    // Pooled within-class scatter.
    let mut scatter = vec![0.0; n_features * n_features];
    add_scatter(&mut scatter, targets(), &mu_t);
    add_scatter(&mut scatter, decoys(), &mu_d);
    let dof = (n_t + n_d).saturating_sub(2).max(1) as f64;
    scatter.iter_mut().for_each(|x| *x /= dof);
    for i in 0..n_features {
        scatter[i * n_features + i] += ridge;
    }

    let diff: Vec<f64> = mu_t.iter().zip(mu_d.iter()).map(|(t, d)| t - d).collect();
    let mut coefs = solve(scatter, diff)?;
    let norm: f64 = coefs.iter().map(|x| x.abs()).sum();
    if norm > 0.0 && norm.is_finite() {
        coefs.iter_mut().for_each(|x| *x /= norm);
    } else {
        warn!("Discriminant has no separating direction, all weights are zero");
    }
    Ok(coefs)
}
