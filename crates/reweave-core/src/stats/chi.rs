use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

/// Degrees of freedom at which the exact distributions give way to normal
/// approximations.
const LARGE_DF: f64 = 100.0;

/// Upper tail of the standard normal.
pub fn normal_sf(z: f64) -> f64 {
    Normal::standard().sf(z)
}

/// Upper-tail p-value of a chi-square statistic. Exact survival function
/// below `LARGE_DF`; the Wilson-Hilferty cube-root normal approximation at
/// or above it. Tails clamp at 0 and 1.
pub fn chi_square_alpha(x: f64, df: f64) -> f64 {
    if df <= 0.0 {
        return 1.0;
    }
    if x <= 0.0 {
        return 1.0;
    }
    let alpha = if df < LARGE_DF {
        match ChiSquared::new(df) {
            Ok(dist) => dist.sf(x),
            Err(_) => return 1.0,
        }
    } else {
        let z = wilson_hilferty(x, df);
        normal_sf(z)
    };
    alpha.clamp(0.0, 1.0)
}

/// `z = ((x/df)^(1/3) - (1 - 2/(9 df))) / sqrt(2/(9 df))`.
fn wilson_hilferty(x: f64, df: f64) -> f64 {
    let nine_df = 9.0 * df;
    ((x / df).cbrt() - (1.0 - 2.0 / nine_df)) / (2.0 / nine_df).sqrt()
}

/// CDF of the non-central chi-square: a Poisson-weighted mixture of
/// central chi-squares, truncated once the accumulated Poisson mass
/// reaches `1 - 1e-15`. Falls back to a normal approximation for large
/// degrees of freedom.
pub fn noncentral_chi_square_cdf(x: f64, df: f64, lambda: f64) -> f64 {
    if x <= 0.0 {
        return 0.0;
    }
    if df >= LARGE_DF {
        let mean = df + lambda;
        let sd = (2.0 * (df + 2.0 * lambda)).sqrt();
        return (1.0 - normal_sf((x - mean) / sd)).clamp(0.0, 1.0);
    }

    const MASS_TARGET: f64 = 1.0 - 1e-15;
    const MAX_TERMS: usize = 10_000;

    let half_lambda = lambda / 2.0;
    let mut weight = (-half_lambda).exp();
    let mut mass = weight;
    let mut cdf = 0.0;

    for j in 0..MAX_TERMS {
        let freedom = df + 2.0 * j as f64;
        if weight > 0.0 {
            if let Ok(dist) = ChiSquared::new(freedom) {
                cdf += weight * dist.cdf(x);
            }
        }
        if mass >= MASS_TARGET {
            break;
        }
        weight *= half_lambda / (j as f64 + 1.0);
        mass += weight;
    }
    cdf.clamp(0.0, 1.0)
}
