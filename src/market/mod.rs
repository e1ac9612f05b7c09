//! Market data snapshot shared by all pricing engines.
//!
//! [`Market`] is a validated, immutable bundle of spot, risk-free rate, flat
//! volatility, and continuous dividend yield, constructed through
//! [`MarketBuilder`]. Zero volatility is accepted: both engines degenerate to
//! deterministic forward pricing rather than dividing by zero.

use crate::core::PricingError;

/// Market snapshot used by all pricing engines.
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Market {
    /// Spot price.
    pub spot: f64,
    /// Continuously compounded risk-free rate.
    pub rate: f64,
    /// Annualized flat volatility.
    pub volatility: f64,
    /// Continuously compounded dividend yield.
    pub dividend_yield: f64,
}

impl Market {
    /// Starts a market builder.
    ///
    /// # Examples
    /// ```
    /// use lattice_pricer::market::Market;
    ///
    /// let market = Market::builder()
    ///     .spot(100.0)
    ///     .rate(0.05)
    ///     .volatility(0.2)
    ///     .build()
    ///     .unwrap();
    /// assert_eq!(market.spot, 100.0);
    /// ```
    #[inline]
    pub fn builder() -> MarketBuilder {
        MarketBuilder::default()
    }

    /// Forward price of the underlying at a future time `t` (year fraction),
    /// `spot * exp((rate - dividend_yield) * t)`.
    #[inline]
    pub fn forward(&self, t: f64) -> f64 {
        self.spot * ((self.rate - self.dividend_yield) * t).exp()
    }
}

/// Builder for [`Market`].
#[derive(Debug, Clone, Default)]
pub struct MarketBuilder {
    spot: Option<f64>,
    rate: Option<f64>,
    volatility: Option<f64>,
    dividend_yield: Option<f64>,
}

impl MarketBuilder {
    /// Sets the spot price.
    #[inline]
    pub fn spot(mut self, spot: f64) -> Self {
        self.spot = Some(spot);
        self
    }

    /// Sets the flat risk-free rate.
    #[inline]
    pub fn rate(mut self, rate: f64) -> Self {
        self.rate = Some(rate);
        self
    }

    /// Sets the flat volatility.
    #[inline]
    pub fn volatility(mut self, volatility: f64) -> Self {
        self.volatility = Some(volatility);
        self
    }

    /// Sets the continuous dividend yield.
    #[inline]
    pub fn dividend_yield(mut self, dividend_yield: f64) -> Self {
        self.dividend_yield = Some(dividend_yield);
        self
    }

    /// Validates and builds a [`Market`].
    ///
    /// # Errors
    /// Returns [`PricingError::InvalidParameter`] when:
    /// - `spot` is missing or `<= 0`
    /// - `volatility` is missing, negative, or non-finite
    pub fn build(self) -> Result<Market, PricingError> {
        let spot = self
            .spot
            .ok_or_else(|| PricingError::InvalidParameter("market spot is required".to_string()))?;
        if !spot.is_finite() || spot <= 0.0 {
            return Err(PricingError::InvalidParameter(format!(
                "market spot must be > 0, got {spot}"
            )));
        }

        let volatility = self.volatility.ok_or_else(|| {
            PricingError::InvalidParameter("market volatility is required".to_string())
        })?;
        if !volatility.is_finite() || volatility < 0.0 {
            return Err(PricingError::InvalidParameter(format!(
                "market volatility must be >= 0, got {volatility}"
            )));
        }

        Ok(Market {
            spot,
            rate: self.rate.unwrap_or(0.0),
            volatility,
            dividend_yield: self.dividend_yield.unwrap_or(0.0),
        })
    }
}
