// ABOUTME: Provisioning context normalization - collapses optional UI-supplied
// ABOUTME: state into one canonical struct before any remote call is issued.

use crate::error::ProvisionError;
use crate::platform::{Identity, PoolKind, PricingSnapshot};

/// State the UI layers hand to the orchestrator: whatever subset of
/// identity, pricing, and preferences they currently hold.
///
/// Normalized exactly once per operation; nothing downstream re-derives
/// defaults from it.
#[derive(Debug, Clone, Default)]
pub struct ProvisionContext {
    pub identity: Option<Identity>,
    pub pricing: Option<PricingSnapshot>,
    pub pool: Option<PoolKind>,
    pub enable_hosting: Option<bool>,
}

impl ProvisionContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_identity(mut self, identity: Identity) -> Self {
        self.identity = Some(identity);
        self
    }

    pub fn with_pricing(mut self, pricing: PricingSnapshot) -> Self {
        self.pricing = Some(pricing);
        self
    }

    pub fn with_pool(mut self, pool: PoolKind) -> Self {
        self.pool = Some(pool);
        self
    }

    pub fn with_hosting(mut self, enable: bool) -> Self {
        self.enable_hosting = Some(enable);
        self
    }

    /// Collapse into the canonical form.
    ///
    /// Fails on a missing identity; a missing pricing snapshot is kept
    /// as `None` so operations that do not price anything still run, and
    /// the ones that do reject it via [`ReadyContext::pricing`].
    pub fn normalize(&self) -> Result<ReadyContext, ProvisionError> {
        let identity = self
            .identity
            .clone()
            .ok_or(ProvisionError::MissingIdentity)?;
        Ok(ReadyContext {
            identity,
            pricing: self.pricing,
            pool: self.pool.unwrap_or_default(),
            enable_hosting: self.enable_hosting.unwrap_or(true),
        })
    }
}

/// Canonical, fully defaulted provisioning context.
#[derive(Debug, Clone)]
pub struct ReadyContext {
    pub identity: Identity,
    pricing: Option<PricingSnapshot>,
    pub pool: PoolKind,
    pub enable_hosting: bool,
}

impl ReadyContext {
    /// The pricing snapshot, required where anything is priced. Absence
    /// is a precondition failure reported before any remote call.
    pub fn pricing(&self) -> Result<PricingSnapshot, ProvisionError> {
        self.pricing.ok_or(ProvisionError::MissingPricing)
    }
}
