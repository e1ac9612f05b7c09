//! Cox-Ross-Rubinstein binomial lattice engine.
//!
//! Builds a recombining tree with `u = exp(vol * sqrt(dt))`, `d = 1/u` and
//! risk-neutral up-probability `p = (exp((r - q) * dt) - d) / (u - d)`, then
//! runs backward induction to the root. American contracts compare the
//! discounted continuation value against intrinsic value at the current
//! node's underlying price.
//!
//! References: Cox-Ross-Rubinstein (1979), Hull (11th ed.) Ch. 13 and the
//! backward-induction recursion around Eq. (13.10).
//!
//! Numerical considerations: `p` strictly outside `[0, 1]` (possible for
//! extreme volatility/step combinations) is rejected as arbitrage-inconsistent
//! before any induction runs; `p` exactly at a boundary is still arbitrage-free
//! and accepted. No clamping is applied for step counts large enough that
//! `u^steps` overflows; bounding `steps` against maturity and volatility is
//! the caller's responsibility.

use crate::core::{
    Lattice, LatticeNode, OptionType, PricingEngine, PricingError, PricingResult,
};
use crate::instruments::vanilla::VanillaOption;
use crate::market::Market;

/// Cox-Ross-Rubinstein binomial tree engine.
#[derive(Debug, Clone)]
pub struct BinomialTreeEngine {
    /// Number of tree steps.
    pub steps: usize,
    /// Retain the full node lattice in the result.
    pub keep_lattice: bool,
}

impl BinomialTreeEngine {
    /// Creates a tree engine with the given number of steps.
    pub fn new(steps: usize) -> Self {
        Self {
            steps,
            keep_lattice: false,
        }
    }

    /// Requests retention of the full node lattice for diagnostics.
    ///
    /// Lattice retention costs O(steps^2) memory; the default pricing path
    /// keeps a single rolling column.
    pub fn with_lattice(mut self) -> Self {
        self.keep_lattice = true;
        self
    }
}

#[inline(always)]
fn intrinsic(option_type: OptionType, spot: f64, strike: f64) -> f64 {
    option_type.intrinsic(spot, strike)
}

impl PricingEngine<VanillaOption> for BinomialTreeEngine {
    fn price(
        &self,
        instrument: &VanillaOption,
        market: &Market,
    ) -> Result<PricingResult, PricingError> {
        instrument.validate()?;

        if self.steps == 0 {
            return Err(PricingError::InvalidParameter(
                "binomial steps must be > 0".to_string(),
            ));
        }

        let vol = market.volatility;
        let dt = instrument.expiry / self.steps as f64;

        // u == d collapses the tree to a single deterministic chain; forming
        // p would divide by zero.
        if vol == 0.0 {
            return Ok(self.price_deterministic(instrument, market, dt));
        }

        let u = (vol * dt.sqrt()).exp();
        let d = 1.0 / u;
        let growth = ((market.rate - market.dividend_yield) * dt).exp();
        let p = (growth - d) / (u - d);
        if !p.is_finite() || !(0.0..=1.0).contains(&p) {
            return Err(PricingError::ArbitrageInconsistentTree(format!(
                "risk-neutral probability {p:.6} outside [0, 1] \
                 (rate={}, dividend_yield={}, volatility={}, steps={})",
                market.rate, market.dividend_yield, vol, self.steps
            )));
        }

        let disc = (-market.rate * dt).exp();
        let is_american = instrument.is_american();

        if self.keep_lattice {
            return Ok(self.price_with_lattice(instrument, market, u, d, p, disc, is_american));
        }

        // Multiplicative recurrence replaces O(steps^2) powf() calls:
        // spot * u^j * d^(steps-j) = spot * d^steps * (u/d)^j.
        let ratio = u / d;
        let disc_p = disc * p;
        let disc_1mp = disc * (1.0 - p);

        let mut values = vec![0.0_f64; self.steps + 1];
        {
            let mut st = market.spot * d.powi(self.steps as i32);
            for value in values.iter_mut() {
                *value = intrinsic(instrument.option_type, st, instrument.strike);
                st *= ratio;
            }
        }

        let mut base = market.spot * d.powi((self.steps - 1) as i32);
        for t in (0..self.steps).rev() {
            if is_american {
                let mut st = base;
                for j in 0..=t {
                    let continuation = disc_p.mul_add(values[j + 1], disc_1mp * values[j]);
                    let exercise = intrinsic(instrument.option_type, st, instrument.strike);
                    values[j] = continuation.max(exercise);
                    st *= ratio;
                }
            } else {
                for j in 0..=t {
                    values[j] = disc_p.mul_add(values[j + 1], disc_1mp * values[j]);
                }
            }
            base *= u;
        }

        Ok(PricingResult::from_price(values[0]))
    }
}

impl BinomialTreeEngine {
    /// Zero-volatility fallback: the lattice collapses to the deterministic
    /// forward path `S_t = spot * exp((r - q) * t * dt)`, one node per step.
    fn price_deterministic(
        &self,
        instrument: &VanillaOption,
        market: &Market,
        dt: f64,
    ) -> PricingResult {
        let disc = (-market.rate * dt).exp();
        let terminal = market.forward(self.steps as f64 * dt);
        let payoff = instrument.intrinsic(terminal);

        let mut columns = if self.keep_lattice {
            Vec::with_capacity(self.steps + 1)
        } else {
            Vec::new()
        };
        if self.keep_lattice {
            columns.push(vec![LatticeNode {
                underlying: terminal,
                continuation: payoff,
                exercise: payoff,
                value: payoff,
            }]);
        }

        let mut value = payoff;
        for t in (0..self.steps).rev() {
            let st = market.forward(t as f64 * dt);
            let continuation = disc * value;
            let exercise = instrument.intrinsic(st);
            value = if instrument.is_american() {
                continuation.max(exercise)
            } else {
                continuation
            };
            if self.keep_lattice {
                columns.push(vec![LatticeNode {
                    underlying: st,
                    continuation,
                    exercise,
                    value,
                }]);
            }
        }

        let lattice = if self.keep_lattice {
            columns.reverse();
            Some(Lattice::from_columns(columns))
        } else {
            None
        };

        PricingResult {
            price: value,
            stderr: None,
            lattice,
        }
    }

    /// Induction variant that materializes every node for diagnostics.
    #[allow(clippy::too_many_arguments)]
    fn price_with_lattice(
        &self,
        instrument: &VanillaOption,
        market: &Market,
        u: f64,
        d: f64,
        p: f64,
        disc: f64,
        is_american: bool,
    ) -> PricingResult {
        let ratio = u / d;
        let disc_p = disc * p;
        let disc_1mp = disc * (1.0 - p);

        let mut columns: Vec<Vec<LatticeNode>> = Vec::with_capacity(self.steps + 1);

        let mut terminal = Vec::with_capacity(self.steps + 1);
        let mut st = market.spot * d.powi(self.steps as i32);
        for _ in 0..=self.steps {
            let payoff = intrinsic(instrument.option_type, st, instrument.strike);
            terminal.push(LatticeNode {
                underlying: st,
                continuation: payoff,
                exercise: payoff,
                value: payoff,
            });
            st *= ratio;
        }
        columns.push(terminal);

        for t in (0..self.steps).rev() {
            let prev = columns.last().expect("terminal column present");
            let mut column = Vec::with_capacity(t + 1);
            let mut st = market.spot * d.powi(t as i32);
            for j in 0..=t {
                let continuation = disc_p.mul_add(prev[j + 1].value, disc_1mp * prev[j].value);
                let exercise = intrinsic(instrument.option_type, st, instrument.strike);
                let value = if is_american {
                    continuation.max(exercise)
                } else {
                    continuation
                };
                column.push(LatticeNode {
                    underlying: st,
                    continuation,
                    exercise,
                    value,
                });
                st *= ratio;
            }
            columns.push(column);
        }

        columns.reverse();
        let price = columns[0][0].value;

        PricingResult {
            price,
            stderr: None,
            lattice: Some(Lattice::from_columns(columns)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_market(spot: f64, rate: f64, vol: f64) -> Market {
        Market::builder()
            .spot(spot)
            .rate(rate)
            .volatility(vol)
            .build()
            .expect("valid market")
    }

    #[test]
    fn one_step_tree_matches_closed_form() {
        let market = flat_market(100.0, 0.05, 0.2);
        let option = VanillaOption::european_call(100.0, 1.0);

        let result = BinomialTreeEngine::new(1)
            .price(&option, &market)
            .expect("pricing succeeds");

        let u = (0.2_f64).exp();
        let d = 1.0 / u;
        let p = (0.05_f64.exp() - d) / (u - d);
        let expected = (-0.05_f64).exp()
            * (p * (100.0 * u - 100.0).max(0.0) + (1.0 - p) * (100.0 * d - 100.0).max(0.0));
        assert_relative_eq!(result.price, expected, epsilon = 1e-14);
    }

    #[test]
    fn zero_steps_is_invalid() {
        let market = flat_market(100.0, 0.05, 0.2);
        let option = VanillaOption::european_call(100.0, 1.0);
        let err = BinomialTreeEngine::new(0)
            .price(&option, &market)
            .unwrap_err();
        assert!(matches!(err, PricingError::InvalidParameter(_)));
    }

    #[test]
    fn lattice_is_only_retained_on_request() {
        let market = flat_market(100.0, 0.05, 0.2);
        let option = VanillaOption::european_call(100.0, 1.0);

        let plain = BinomialTreeEngine::new(10)
            .price(&option, &market)
            .expect("pricing succeeds");
        assert!(plain.lattice.is_none());

        let with_lattice = BinomialTreeEngine::new(10)
            .with_lattice()
            .price(&option, &market)
            .expect("pricing succeeds");
        let lattice = with_lattice.lattice.expect("lattice retained");
        assert_eq!(lattice.steps(), 10);
        assert_eq!(lattice.column(10).unwrap().len(), 11);
        assert_relative_eq!(lattice.root().value, plain.price, epsilon = 1e-12);
    }

    #[test]
    fn lattice_and_rolling_paths_agree_for_american() {
        let market = flat_market(50.0, 0.03, 0.4);
        let option = VanillaOption::american_put(55.0, 1.0);

        let plain = BinomialTreeEngine::new(64)
            .price(&option, &market)
            .expect("pricing succeeds");
        let with_lattice = BinomialTreeEngine::new(64)
            .with_lattice()
            .price(&option, &market)
            .expect("pricing succeeds");

        assert_relative_eq!(plain.price, with_lattice.price, epsilon = 1e-10);
    }

    #[test]
    fn recombining_terminal_prices_pair_up() {
        let market = flat_market(100.0, 0.05, 0.2);
        let option = VanillaOption::european_call(100.0, 1.0);

        let result = BinomialTreeEngine::new(4)
            .with_lattice()
            .price(&option, &market)
            .expect("pricing succeeds");
        let lattice = result.lattice.expect("lattice retained");

        // u * d == 1 exactly, so the middle terminal node sits at spot.
        let terminal = lattice.column(4).unwrap();
        assert_relative_eq!(terminal[2].underlying, 100.0, epsilon = 1e-9);
    }

    #[test]
    fn out_of_range_probability_is_rejected_before_induction() {
        // Original regression case: strongly negative rate with tiny vol.
        let market = flat_market(100.0, -0.5, 0.01);
        let option = VanillaOption::european_call(100.0, 1.0);

        let err = BinomialTreeEngine::new(10)
            .price(&option, &market)
            .unwrap_err();
        assert!(matches!(err, PricingError::ArbitrageInconsistentTree(_)));
        assert!(err.to_string().contains("risk-neutral probability"));
    }

    #[test]
    fn zero_volatility_reduces_to_discounted_forward_payoff() {
        let market = Market::builder()
            .spot(100.0)
            .rate(0.05)
            .dividend_yield(0.01)
            .volatility(0.0)
            .build()
            .expect("valid market");
        let option = VanillaOption::european_call(90.0, 2.0);

        let result = BinomialTreeEngine::new(100)
            .price(&option, &market)
            .expect("pricing succeeds");

        let forward = 100.0 * (0.04_f64 * 2.0).exp();
        let expected = (-0.05_f64 * 2.0).exp() * (forward - 90.0);
        assert_relative_eq!(result.price, expected, epsilon = 1e-10);
    }

    #[test]
    fn zero_volatility_american_put_exercises_immediately_when_deep_itm() {
        // With no volatility and positive carry the put's forward intrinsic
        // decays, so immediate exercise dominates.
        let market = flat_market(50.0, 0.05, 0.0);
        let option = VanillaOption::american_put(80.0, 1.0);

        let result = BinomialTreeEngine::new(50)
            .price(&option, &market)
            .expect("pricing succeeds");
        assert_relative_eq!(result.price, 30.0, epsilon = 1e-10);
    }
}
