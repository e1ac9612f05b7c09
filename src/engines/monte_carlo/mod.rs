//! Monte Carlo pricing engine with caller-supplied payoff evaluators.

pub mod mc_engine;

pub use mc_engine::{
    GbmPathGenerator, MonteCarloEngine, PayoffEvaluator, payoff_fn, vanilla_payoff,
};
