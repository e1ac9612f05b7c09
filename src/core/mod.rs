//! Core traits, common domain types, and library-wide result/error structures.

use thiserror::Error;

use crate::market::Market;

pub mod types;

pub use types::*;

/// Common trait implemented by every priceable instrument.
pub trait Instrument: std::fmt::Debug {
    /// Returns a short type identifier for diagnostics and bindings.
    fn instrument_type(&self) -> &str;
}

/// Pricing engine abstraction over an instrument type.
pub trait PricingEngine<I: Instrument> {
    /// Prices an instrument under the provided market state.
    fn price(&self, instrument: &I, market: &Market) -> Result<PricingResult, PricingError>;
}

/// One lattice node at a (time step, up-move count) coordinate.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LatticeNode {
    /// Underlying price at this node.
    pub underlying: f64,
    /// Discounted risk-neutral expectation of the two successor values.
    /// Equals the settled value at expiry.
    pub continuation: f64,
    /// Intrinsic value at this node's underlying price.
    pub exercise: f64,
    /// Settled node value after the hold-or-exercise decision.
    pub value: f64,
}

/// Triangular binomial lattice retained for diagnostics.
///
/// Column `t` holds `t + 1` nodes indexed by the number of up moves, with the
/// root at column 0.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Lattice {
    columns: Vec<Vec<LatticeNode>>,
}

impl Lattice {
    pub(crate) fn from_columns(columns: Vec<Vec<LatticeNode>>) -> Self {
        Self { columns }
    }

    /// Number of time steps spanned by the lattice.
    pub fn steps(&self) -> usize {
        self.columns.len().saturating_sub(1)
    }

    /// Node at (time step, up-move count), if within the triangle.
    pub fn node(&self, step: usize, up_moves: usize) -> Option<&LatticeNode> {
        self.columns.get(step)?.get(up_moves)
    }

    /// Root node of the lattice.
    pub fn root(&self) -> &LatticeNode {
        &self.columns[0][0]
    }

    /// All nodes in a time-step column, ordered by up-move count.
    pub fn column(&self, step: usize) -> Option<&[LatticeNode]> {
        self.columns.get(step).map(Vec::as_slice)
    }
}

/// Unified engine result payload.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PricingResult {
    /// Present value.
    pub price: f64,
    /// Standard error (Monte Carlo only).
    pub stderr: Option<f64>,
    /// Full node lattice (binomial only, opt-in via `with_lattice`).
    pub lattice: Option<Lattice>,
}

impl PricingResult {
    /// Result carrying only a price.
    pub fn from_price(price: f64) -> Self {
        Self {
            price,
            stderr: None,
            lattice: None,
        }
    }
}

/// Engine and model errors surfaced by the API.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PricingError {
    /// A constructor or pricing-call parameter violated its bound.
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
    /// The computed risk-neutral probability fell strictly outside `[0, 1]`.
    #[error("arbitrage-inconsistent tree: {0}")]
    ArbitrageInconsistentTree(String),
    /// A caller-supplied payoff evaluator failed or returned a non-finite value.
    #[error("payoff evaluation failed: {0}")]
    PayoffEvaluation(String),
}
