// ABOUTME: Conversion module - credits/cycles arithmetic for server pairs.
// ABOUTME: Pure, infallible math; no I/O.

mod engine;

pub use engine::{
    ConversionCheck, ConversionRate, CreditConverter, DEFAULT_CREDITS_PER_TRILLION, TRILLION,
};
