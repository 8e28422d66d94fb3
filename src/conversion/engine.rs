// ABOUTME: Credits <-> cycles conversion with ceiling semantics and a fallback rate.
// ABOUTME: Guarantees promised credit amounts are never under-delivered.

/// One trillion cycles, the reference quantity the rate is quoted against.
pub const TRILLION: u128 = 1_000_000_000_000;

/// Fallback rate: 1 trillion cycles = 1000 credits.
///
/// Used when the platform's pricing config cannot be reached. The live
/// rate is a configuration value, not a contract.
pub const DEFAULT_CREDITS_PER_TRILLION: u64 = 1_000;

/// Exchange rate between credits and cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConversionRate {
    credits_per_trillion: u64,
    approximate: bool,
}

impl ConversionRate {
    /// An exact rate sourced from the platform's pricing config.
    ///
    /// A zero rate would make every conversion divide by zero; it is
    /// clamped to 1 rather than rejected, since conversion must never
    /// fail outright.
    pub fn exact(credits_per_trillion: u64) -> Self {
        Self {
            credits_per_trillion: credits_per_trillion.max(1),
            approximate: false,
        }
    }

    /// The hard-coded approximate rate used when pricing is unreachable.
    pub fn fallback() -> Self {
        Self {
            credits_per_trillion: DEFAULT_CREDITS_PER_TRILLION,
            approximate: true,
        }
    }

    /// True when this rate is the hard-coded fallback rather than the
    /// authoritative pricing-config value. Callers surface this as a
    /// "prices are approximate" note, nothing more.
    pub fn is_approximate(&self) -> bool {
        self.approximate
    }

    /// Credits per trillion cycles.
    pub fn credits_per_trillion(&self) -> u64 {
        self.credits_per_trillion
    }
}

impl Default for ConversionRate {
    fn default() -> Self {
        Self::fallback()
    }
}

/// Result of a round-trip conversion check.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ConversionCheck {
    /// Cycles required to deliver the promised credits.
    pub cycles_needed: u128,
    /// Credits those cycles convert back to.
    pub achieved_credits: u64,
    /// achieved / promised. Logged for diagnostics; anything >= 1.0 is
    /// acceptable (small over-delivery is fine, under-delivery is not).
    pub accuracy: f64,
}

/// Pure credits/cycles converter at a fixed rate.
#[derive(Debug, Clone, Copy)]
pub struct CreditConverter {
    rate: ConversionRate,
}

impl CreditConverter {
    pub fn new(rate: ConversionRate) -> Self {
        Self { rate }
    }

    /// Converter on the hard-coded approximate rate.
    pub fn with_fallback_rate() -> Self {
        Self::new(ConversionRate::fallback())
    }

    pub fn rate(&self) -> ConversionRate {
        self.rate
    }

    /// Minimum cycles that convert back to at least `credits`.
    ///
    /// Rounds up: a promised credit amount must never be under-delivered,
    /// over-delivery by a fractional credit is acceptable.
    pub fn credits_to_cycles(&self, credits: u64) -> u128 {
        let rate = self.rate.credits_per_trillion as u128;
        div_ceil(credits as u128 * TRILLION, rate)
    }

    /// Canonical forward conversion, floor.
    pub fn cycles_to_credits(&self, cycles: u128) -> u64 {
        let rate = self.rate.credits_per_trillion as u128;
        let credits = cycles.saturating_mul(rate) / TRILLION;
        u64::try_from(credits).unwrap_or(u64::MAX)
    }

    /// Minimum credits whose cycle conversion covers `cycles`.
    ///
    /// The planner prices a member this way: the credit figure it quotes
    /// must buy at least the cycles the member needs.
    pub fn credits_covering_cycles(&self, cycles: u128) -> u64 {
        let rate = self.rate.credits_per_trillion as u128;
        let credits = div_ceil(cycles.saturating_mul(rate), TRILLION);
        u64::try_from(credits).unwrap_or(u64::MAX)
    }

    /// Run the round trip for `promised` credits and report how close the
    /// achieved amount lands. Callers log the ratio; only
    /// `achieved < promised` would be a defect, and the ceiling in
    /// [`credits_to_cycles`](Self::credits_to_cycles) rules that out.
    pub fn verify(&self, promised: u64) -> ConversionCheck {
        let cycles_needed = self.credits_to_cycles(promised);
        let achieved_credits = self.cycles_to_credits(cycles_needed);
        let accuracy = if promised == 0 {
            1.0
        } else {
            achieved_credits as f64 / promised as f64
        };
        ConversionCheck {
            cycles_needed,
            achieved_credits,
            accuracy,
        }
    }
}

impl Default for CreditConverter {
    fn default() -> Self {
        Self::with_fallback_rate()
    }
}

fn div_ceil(numerator: u128, denominator: u128) -> u128 {
    numerator / denominator + u128::from(numerator % denominator != 0)
}
