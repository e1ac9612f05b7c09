//! Black-Scholes-Merton closed form for European vanillas.
//!
//! Carried as the convergence reference for the lattice and Monte Carlo
//! engines; both converge to this price as `steps` (respectively `paths`)
//! grow. References: Hull (11th ed.) Ch. 15.

use crate::core::OptionType;
use crate::math::normal_cdf;

/// Black-Scholes-Merton spot-option price with continuous dividend yield.
///
/// Parameters:
/// - `s`: current spot price.
/// - `k`: strike price.
/// - `r`: continuously compounded risk-free rate.
/// - `q`: continuous dividend yield.
/// - `sigma`: annualized volatility.
/// - `t`: time to expiry in years.
///
/// Edge cases: `t <= 0` returns intrinsic value; `sigma <= 0` returns the
/// discounted deterministic forward payoff.
pub fn black_scholes_price(
    option_type: OptionType,
    s: f64,
    k: f64,
    r: f64,
    q: f64,
    sigma: f64,
    t: f64,
) -> f64 {
    if t <= 0.0 {
        return option_type.intrinsic(s, k);
    }
    let df_r = (-r * t).exp();
    let df_q = (-q * t).exp();
    if sigma <= 0.0 {
        return match option_type {
            OptionType::Call => (s * df_q - k * df_r).max(0.0),
            OptionType::Put => (k * df_r - s * df_q).max(0.0),
        };
    }

    let sig_sqrt_t = sigma * t.sqrt();
    let d1 = ((s / k).ln() + (r - q + 0.5 * sigma * sigma) * t) / sig_sqrt_t;
    let d2 = d1 - sig_sqrt_t;

    match option_type {
        OptionType::Call => s * df_q * normal_cdf(d1) - k * df_r * normal_cdf(d2),
        OptionType::Put => k * df_r * normal_cdf(-d2) - s * df_q * normal_cdf(-d1),
    }
}
