/// Spacing between consecutive isotope peaks, in Da.
pub const NEUTRON_SPACING: f64 = 1.003355;

/// Relative abundances of the first `n` isotopes of a peptide of the
/// given neutral mass, normalized to sum to one.
///
/// Poisson approximation where the expected number of heavy atoms
/// grows linearly with mass.
pub fn expected_isotope_envelope(mass: f64, n: usize) -> Vec<f32> {
    let lambda = (0.000594 * mass - 0.03091).max(1e-6);
    let mut out = Vec::with_capacity(n);
    let mut term = (-lambda).exp();
    for k in 0..n {
        if k > 0 {
            term *= lambda / k as f64;
        }
        out.push(term);
    }
    let total: f64 = out.iter().sum();
    out.into_iter().map(|x| (x / total) as f32).collect()
}

/// m/z of isotope `offset` (may be negative) of a precursor.
pub fn isotope_mz(mono_mz: f64, charge: u8, offset: i8) -> f64 {
    mono_mz + (offset as f64) * NEUTRON_SPACING / (charge.max(1) as f64)
}
