//! Instrument contract definitions.

pub mod vanilla;

pub use vanilla::VanillaOption;
