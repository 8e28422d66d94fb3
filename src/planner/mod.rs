// ABOUTME: Planner module - picks a feasible server-pair configuration for a budget.
// ABOUTME: Ordered first-fit search over the product's candidate table.

mod planner;

pub use planner::{
    PairConfig, PairPlanner, BASELINE_DURATION_DAYS, CANDIDATE_CONFIGS, MIN_MEMORY_GB,
};
