//! Free-function pricing API consumed by collaborators (CLIs, web forms).
//!
//! These wrappers construct the trait-based engines with the requested
//! discretization parameters; callers that need lattice diagnostics or
//! engine reuse should instantiate the engines directly.

pub mod european;

use crate::core::{PricingEngine, PricingError, PricingResult};
use crate::engines::monte_carlo::{MonteCarloEngine, PayoffEvaluator};
use crate::engines::tree::BinomialTreeEngine;
use crate::instruments::VanillaOption;
use crate::market::Market;

pub use crate::core::types::OptionType;

/// Prices a vanilla option on a CRR binomial tree.
///
/// # Examples
/// ```
/// use lattice_pricer::instruments::VanillaOption;
/// use lattice_pricer::market::Market;
/// use lattice_pricer::pricing::price_option;
///
/// let market = Market::builder()
///     .spot(100.0)
///     .rate(0.05)
///     .volatility(0.2)
///     .build()
///     .unwrap();
/// let option = VanillaOption::european_call(100.0, 1.0);
/// let result = price_option(&market, &option, 500).unwrap();
/// assert!(result.price > 0.0);
/// ```
pub fn price_option(
    market: &Market,
    option: &VanillaOption,
    steps: usize,
) -> Result<PricingResult, PricingError> {
    BinomialTreeEngine::new(steps).price(option, market)
}

/// Prices an arbitrary payoff by Monte Carlo simulation of GBM paths.
///
/// `maturity` is the path horizon in years; the payoff receives the terminal
/// price and the full path (`steps + 1` prices starting at spot). Passing
/// `seed: Some(_)` makes the result reproducible for identical arguments.
pub fn price_monte_carlo(
    market: &Market,
    maturity: f64,
    steps: usize,
    paths: usize,
    payoff: &PayoffEvaluator,
    seed: Option<u64>,
) -> Result<PricingResult, PricingError> {
    let mut engine = MonteCarloEngine::new(paths, steps);
    if let Some(seed) = seed {
        engine = engine.with_seed(seed);
    }
    engine.price(market, maturity, payoff)
}
