//! Pricing engine implementations.

pub mod monte_carlo;
pub mod tree;
