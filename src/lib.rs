//! Lattice-pricer is a small quantitative-finance library for vanilla option
//! pricing with a Cox-Ross-Rubinstein binomial tree engine and a generic
//! Monte Carlo engine driven by caller-supplied payoff evaluators.
//!
//! The crate covers two independent backends over a shared market snapshot:
//! - [`engines::tree::BinomialTreeEngine`]: recombining CRR lattice with
//!   backward induction, optional American early exercise, and opt-in
//!   retention of the full node lattice for diagnostics.
//! - [`engines::monte_carlo::MonteCarloEngine`]: geometric-Brownian-motion
//!   path simulation under the risk-neutral measure, with an arbitrary
//!   payoff evaluated per path, discounted and averaged with a standard
//!   error estimate.
//!
//! References used across modules:
//! - Cox, Ross, and Rubinstein (1979) for the lattice parameterization.
//! - Hull, *Options, Futures, and Other Derivatives* (11th ed.), Ch. 13 and 25.
//! - Glasserman (2004) for Monte Carlo estimators.
//!
//! Numerical considerations:
//! - Tree convergence is first- to second-order in step count; extreme
//!   volatility/step combinations can push the risk-neutral probability
//!   outside `[0, 1]`, which is rejected rather than silently clamped.
//! - MC confidence intervals are sampling-driven; cost is `O(steps * paths)`
//!   with no variance reduction.
//!
//! # Feature Flags
//! - `parallel`: enables Rayon-powered parallel Monte Carlo trials.
//! - `serde`: enables serde derives on the public data types.
//!
//! # Quick Start
//! Price a European call on a CRR tree:
//! ```rust
//! use lattice_pricer::core::PricingEngine;
//! use lattice_pricer::engines::tree::BinomialTreeEngine;
//! use lattice_pricer::instruments::VanillaOption;
//! use lattice_pricer::market::Market;
//!
//! let market = Market::builder()
//!     .spot(100.0)
//!     .rate(0.05)
//!     .volatility(0.2)
//!     .build()
//!     .unwrap();
//! let option = VanillaOption::european_call(100.0, 1.0);
//! let result = BinomialTreeEngine::new(200).price(&option, &market).unwrap();
//! assert!(result.price > 10.0 && result.price < 11.0);
//! ```
//!
//! Price with Monte Carlo and a custom payoff:
//! ```rust
//! use lattice_pricer::engines::monte_carlo::{MonteCarloEngine, payoff_fn};
//! use lattice_pricer::market::Market;
//!
//! let market = Market::builder()
//!     .spot(100.0)
//!     .rate(0.05)
//!     .volatility(0.2)
//!     .build()
//!     .unwrap();
//! let payoff = payoff_fn(|terminal, _path| (terminal - 100.0).max(0.0));
//! let engine = MonteCarloEngine::new(20_000, 50).with_seed(42);
//! let result = engine.price(&market, 1.0, &payoff).unwrap();
//! assert!(result.stderr.unwrap() > 0.0);
//! ```

pub mod core;
pub mod engines;
pub mod instruments;
pub mod market;
pub mod math;
pub mod pricing;
