// ABOUTME: Defines the PlatformClient trait - the abstraction layer between
// ABOUTME: the provisioning core and the remote hosting platform.

use std::sync::Arc;

use async_trait::async_trait;

use super::types::{Identity, InfraRequest, InfraResponse, ProjectDraft, ServerPair};
use crate::error::PlatformError;

/// Callback for the provisioning endpoint's own 0-100 sub-progress.
/// The orchestrator maps it into the run's overall progress band.
pub type InfraProgress = Arc<dyn Fn(u8) + Send + Sync>;

/// Sub-progress callback that discards updates.
pub fn discard_infra_progress() -> InfraProgress {
    Arc::new(|_| {})
}

/// Trait for platform client implementations.
///
/// The platform is the final arbiter of every operation here; this core
/// issues requests and interprets results, it owns no wire format.
#[async_trait]
pub trait PlatformClient: Send + Sync {
    /// Create a project. Idempotent on the draft's client-generated id.
    async fn create_project(
        &self,
        draft: &ProjectDraft,
        auth: &Identity,
    ) -> Result<(), PlatformError>;

    /// Create a server pair bound to a project, streaming the platform's
    /// sub-progress through `progress` while the call runs.
    async fn create_pair_infrastructure(
        &self,
        request: &InfraRequest,
        auth: &Identity,
        progress: InfraProgress,
    ) -> Result<InfraResponse, PlatformError>;

    /// All pairs currently bound to a project. Used only for the
    /// identifier-resolution fallback after provisioning.
    async fn list_project_pairs(
        &self,
        project_id: &str,
        auth: &Identity,
    ) -> Result<Vec<ServerPair>, PlatformError>;

    /// Move a pair to another project. `from` is the pair's current
    /// project, `None` when it is unassigned.
    async fn move_pair(
        &self,
        pair_id: &str,
        from: Option<&str>,
        to: &str,
        auth: &Identity,
    ) -> Result<(), PlatformError>;

    /// Read a project's durably stored selected pair.
    async fn read_selected_pair(
        &self,
        project_id: &str,
        auth: &Identity,
    ) -> Result<Option<String>, PlatformError>;

    /// Durably store a project's selected pair.
    async fn write_selected_pair(
        &self,
        project_id: &str,
        pair_id: &str,
        auth: &Identity,
    ) -> Result<(), PlatformError>;

    /// Remove a project's selected pair from durable storage.
    async fn clear_selected_pair(
        &self,
        project_id: &str,
        auth: &Identity,
    ) -> Result<(), PlatformError>;
}
