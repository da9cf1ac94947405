mod chi;
mod info;

pub use chi::{chi_square_alpha, noncentral_chi_square_cdf, normal_sf};
pub use info::{PROB_MIN, entropy, max_entropy, transmission};

/// `2 * N * ln 2 * T`: the likelihood-ratio statistic G² in natural units,
/// from a transmission measured in bits.
pub fn likelihood_ratio(sample_size: f64, transmission_bits: f64) -> f64 {
    2.0 * sample_size * std::f64::consts::LN_2 * transmission_bits
}

/// `LR - 2 * ddf`. Lower is better; simpler models (larger ddf) are
/// rewarded.
pub fn aic(lr: f64, ddf: f64) -> f64 {
    lr - 2.0 * ddf
}

/// `LR - ddf * ln N`.
pub fn bic(lr: f64, ddf: f64, sample_size: f64) -> f64 {
    lr - ddf * sample_size.ln()
}

/// Pearson chi-square `N * sum((p_obs - p_exp)^2 / p_exp)`, skipping cells
/// with zero expectation.
pub fn pearson_chi_square(
    observed: &crate::table::Table,
    expected: &crate::table::Table,
    sample_size: f64,
) -> f64 {
    let mut total = 0.0;
    for (key, exp) in expected.iter() {
        if *exp <= 0.0 {
            continue;
        }
        let obs = observed.get(key).unwrap_or(0.0);
        let diff = obs - exp;
        total += diff * diff / exp;
    }
    sample_size * total
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lr_is_zero_for_zero_transmission() {
        assert_eq!(likelihood_ratio(1000.0, 0.0), 0.0);
    }

    #[test]
    fn lr_scales_with_sample_size() {
        let t = 0.00151;
        let lr = likelihood_ratio(1008.0, t);
        assert!((lr - 2.110).abs() < 0.01);
    }

    #[test]
    fn criteria_reward_simplicity() {
        // identical fit, simpler model (larger ddf) scores lower
        assert!(aic(10.0, 4.0) < aic(10.0, 2.0));
        assert!(bic(10.0, 4.0, 1000.0) < bic(10.0, 2.0, 1000.0));
    }
}
