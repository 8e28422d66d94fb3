// ABOUTME: Server-pair configuration planner - budget to (memory, duration) sizing.
// ABOUTME: First-fit walk over an ordered candidate table, half the budget per member.

use crate::conversion::CreditConverter;
use crate::error::PlanError;

/// Enforced minimum memory per member, in GB.
pub const MIN_MEMORY_GB: u32 = 1;

/// Duration the base rate is quoted against, in days.
pub const BASELINE_DURATION_DAYS: u32 = 30;

/// Cycles one member burns per GB over the baseline duration.
const BASE_CYCLES_PER_GB_BASELINE: u128 = 2_000_000_000_000;

/// Fixed operational buffer added to every member regardless of size.
const OPERATIONAL_BUFFER_CYCLES: u128 = 200_000_000_000;

/// Candidate (memory GB, duration days) configurations, in preference
/// order: standard duration at minimum memory first, then shorter
/// durations, and only then more memory. The first candidate that fits
/// the per-member budget wins; this is product policy, not a
/// maximization, so the order must be preserved.
pub const CANDIDATE_CONFIGS: &[(u32, u32)] = &[(1, 30), (1, 21), (1, 14), (1, 7), (2, 30)];

/// A feasible server-pair configuration.
///
/// A pair always means two symmetric members (a front-facing and a
/// back-facing resource) provisioned together, so all totals are twice
/// the per-member figures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PairConfig {
    pub memory_gb: u32,
    pub duration_days: u32,
    /// Cycles one member needs, operational buffer included.
    pub cycles_per_member: u128,
    /// Minimum credits that cover `cycles_per_member`.
    pub credits_per_member: u64,
    /// Cycles for both members.
    pub total_cycles: u128,
}

impl PairConfig {
    /// Total credits for both members.
    pub fn total_credits(&self) -> u64 {
        self.credits_per_member.saturating_mul(2)
    }
}

/// Plans server-pair configurations under a credit budget.
#[derive(Debug, Clone, Copy)]
pub struct PairPlanner {
    converter: CreditConverter,
}

impl PairPlanner {
    pub fn new(converter: CreditConverter) -> Self {
        Self { converter }
    }

    pub fn converter(&self) -> &CreditConverter {
        &self.converter
    }

    /// Cycles one member of the given size needs.
    ///
    /// Memory below the enforced minimum is floored to 1 GB. Duration
    /// scales linearly off the 30-day baseline rate.
    pub fn member_cycles(&self, memory_gb: u32, duration_days: u32) -> u128 {
        let memory = memory_gb.max(MIN_MEMORY_GB) as u128;
        let burn =
            BASE_CYCLES_PER_GB_BASELINE * memory * duration_days as u128
                / BASELINE_DURATION_DAYS as u128;
        burn + OPERATIONAL_BUFFER_CYCLES
    }

    /// Per-member credit cost of the given size.
    pub fn member_credits(&self, memory_gb: u32, duration_days: u32) -> u64 {
        self.converter
            .credits_covering_cycles(self.member_cycles(memory_gb, duration_days))
    }

    /// Pick the richest feasible configuration for `total_credits`.
    ///
    /// The budget is split in half between the two members, then the
    /// candidate table is walked in declared order and the first
    /// configuration whose per-member credit cost fits is returned. If
    /// none fits, the error states the total required for the baseline
    /// (1 GB, 30 d) pair so the caller can show the shortfall.
    pub fn plan_from_budget(&self, total_credits: u64) -> Result<PairConfig, PlanError> {
        let per_member_budget = total_credits / 2;

        for &(memory_gb, duration_days) in CANDIDATE_CONFIGS {
            let cycles_per_member = self.member_cycles(memory_gb, duration_days);
            let credits_per_member = self.converter.credits_covering_cycles(cycles_per_member);
            if credits_per_member <= per_member_budget {
                return Ok(PairConfig {
                    memory_gb,
                    duration_days,
                    cycles_per_member,
                    credits_per_member,
                    total_cycles: cycles_per_member * 2,
                });
            }
        }

        let required = self
            .member_credits(MIN_MEMORY_GB, BASELINE_DURATION_DAYS)
            .saturating_mul(2);
        Err(PlanError::InsufficientCredits {
            available: total_credits,
            required,
        })
    }
}

impl Default for PairPlanner {
    fn default() -> Self {
        Self::new(CreditConverter::with_fallback_rate())
    }
}
