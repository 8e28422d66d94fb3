// ABOUTME: Prelude module - convenient imports for common use cases.
// ABOUTME: Use `use tandem::prelude::*;` to get started quickly.

pub use crate::assignment::{
    AssignmentChange, AssignmentCoordinator, AssignmentMirror, MirrorSnapshot, PersistFailureHook,
};
pub use crate::conversion::{ConversionCheck, ConversionRate, CreditConverter};
pub use crate::error::{FailureKind, PlanError, PlatformError, ProvisionError, TandemError};
pub use crate::planner::{PairConfig, PairPlanner};
pub use crate::platform::{
    HttpPlatformClient, Identity, InfraProgress, InfraRequest, InfraResponse, PlatformClient,
    PoolKind, PricingSnapshot, ProjectDraft, ProvisionEvent, ServerPair,
};
pub use crate::provision::{
    Orchestrator, PairCreation, Phase, ProgressSink, ProgressUpdate, ProvisionContext,
};
