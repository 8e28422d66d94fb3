// ABOUTME: Data types exchanged with the remote hosting platform.
// ABOUTME: Projects, server pairs, pricing, identity, and provisioning payloads.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversion::ConversionRate;

/// Placeholder the platform returns when a pair's identifier is not yet
/// known at response time. Treated as missing by the orchestrator.
pub const PAIR_ID_UNRESOLVED: &str = "pending-pair";

/// A project waiting to be created on the platform.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectDraft {
    /// Client-generated identifier, stable across retries.
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl ProjectDraft {
    /// New draft with a generated id.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Two bound compute resources provisioned and billed together: a
/// front-facing member serving the UI and a back-facing member running
/// the project's services.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerPair {
    pub pair_id: String,
    pub name: String,
    pub frontend_id: String,
    pub backend_id: String,
    /// Unix millis at creation, assigned by the platform.
    pub created_at_ms: u64,
    pub credits_allocated: u64,
    /// Project currently bound to this pair, if any. Rebound only
    /// through coordinator-mediated moves; never mutated directly.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub current_project_id: Option<String>,
}

/// An authenticated platform identity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    /// The platform's opaque principal string.
    pub principal: String,
}

impl Identity {
    pub fn new(principal: impl Into<String>) -> Self {
        Self {
            principal: principal.into(),
        }
    }
}

/// Pricing snapshot fetched from the platform's config service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricingSnapshot {
    /// Credits charged per trillion cycles.
    pub credits_per_trillion_cycles: u64,
}

impl PricingSnapshot {
    /// The exact conversion rate this snapshot quotes.
    pub fn rate(&self) -> ConversionRate {
        ConversionRate::exact(self.credits_per_trillion_cycles)
    }
}

/// Which capacity pool a pair is provisioned from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoolKind {
    #[default]
    Standard,
    Performance,
}

/// Request payload for paired infrastructure creation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InfraRequest {
    /// Display name for the new pair.
    pub name: String,
    /// Total credits to spend on the pair (both members).
    pub credits: u64,
    pub project_id: String,
    pub project_name: String,
    pub memory_gb: u32,
    pub duration_days: u32,
    /// Pricing the credits were quoted against, so the platform can
    /// detect a stale quote.
    pub pricing: PricingSnapshot,
    pub enable_hosting: bool,
    pub pool: PoolKind,
}

/// Response from paired infrastructure creation.
///
/// `pair_id` is not always trustworthy: the platform sometimes returns
/// it empty or as [`PAIR_ID_UNRESOLVED`] even though the pair was
/// created. The member identifiers are reliable and support the
/// orchestrator's fallback lookup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InfraResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pair_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frontend_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub backend_id: Option<String>,
    /// False when the infrastructure exists but public hosting could not
    /// be configured; a recoverable condition, not a failure.
    #[serde(default)]
    pub hosting_configured: bool,
}
