// ABOUTME: Provisioning orchestrator - creates a project, binds a server pair to it,
// ABOUTME: and reports phase/percent progress while tolerating partial failure.

use std::sync::Arc;

use crate::assignment::AssignmentCoordinator;
use crate::conversion::CreditConverter;
use crate::error::{FailureKind, ProvisionError};
use crate::planner::PairPlanner;
use crate::platform::{
    Identity, InfraRequest, InfraResponse, PlatformClient, ProjectDraft, ServerPair,
    PAIR_ID_UNRESOLVED,
};
use super::context::ProvisionContext;
use super::progress::{map_sub_progress, Phase, ProgressSink, ProgressUpdate};

/// Outcome of a paired provisioning run.
///
/// Discriminated result rather than `Result`: UI layers render `error`
/// directly and must be able to see a degraded success (`success` true
/// with an explanatory `error`) without unwrapping anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PairCreation {
    pub success: bool,
    /// Identifier of the new pair; `None` on failure, and on the
    /// degraded success where provisioning worked but the identifier
    /// could not be resolved.
    pub server_pair_id: Option<String>,
    pub frontend_id: Option<String>,
    pub backend_id: Option<String>,
    pub error: Option<String>,
}

impl PairCreation {
    fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            server_pair_id: None,
            frontend_id: None,
            backend_id: None,
            error: Some(error.into()),
        }
    }
}

/// Drives the multi-phase provisioning workflow.
///
/// Each run executes its remote steps strictly in sequence; nothing is
/// retried automatically and nothing is rolled back. A project without
/// infrastructure is an accepted terminal state after a mid-run failure.
pub struct Orchestrator {
    client: Arc<dyn PlatformClient>,
    assignments: Arc<AssignmentCoordinator>,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn PlatformClient>, assignments: Arc<AssignmentCoordinator>) -> Self {
        Self {
            client,
            assignments,
        }
    }

    /// Create a project and a new server pair for it.
    ///
    /// Preconditions (checked before any remote call): the context must
    /// normalize with an identity and pricing, and `credits` must cover
    /// a feasible pair configuration. Hosting failure after successful
    /// infrastructure creation is reported as an `error`-phase progress
    /// event but still counts as success.
    pub async fn create_with_new_pair(
        &self,
        draft: &ProjectDraft,
        pair_name: &str,
        credits: u64,
        ctx: &ProvisionContext,
        progress: ProgressSink,
    ) -> PairCreation {
        // Preconditions, all local. A rejected run must leave no trace.
        let ready = match ctx.normalize() {
            Ok(ready) => ready,
            Err(e) => return PairCreation::failed(e.to_string()),
        };
        let pricing = match ready.pricing() {
            Ok(pricing) => pricing,
            Err(e) => return PairCreation::failed(e.to_string()),
        };
        let rate = pricing.rate();
        let converter = CreditConverter::new(rate);
        let plan = match PairPlanner::new(converter).plan_from_budget(credits) {
            Ok(plan) => plan,
            Err(e) => return PairCreation::failed(e.to_string()),
        };

        let check = converter.verify(plan.credits_per_member);
        tracing::debug!(
            credits_per_member = plan.credits_per_member,
            cycles_per_member = %plan.cycles_per_member,
            accuracy = check.accuracy,
            approximate = rate.is_approximate(),
            "planned server pair configuration"
        );

        emit(&progress, Phase::Setup, "Creating project", 0);
        if let Err(e) = self.client.create_project(draft, &ready.identity).await {
            let err = ProvisionError::ProjectCreate(e);
            emit(&progress, Phase::Error, err.to_string(), 0);
            return PairCreation::failed(err.to_string());
        }
        emit(&progress, Phase::Setup, "Provisioning server pair", 25);

        let request = InfraRequest {
            name: pair_name.to_string(),
            credits: plan.total_credits(),
            project_id: draft.id.clone(),
            project_name: draft.name.clone(),
            memory_gb: plan.memory_gb,
            duration_days: plan.duration_days,
            pricing,
            enable_hosting: ready.enable_hosting,
            pool: ready.pool,
        };

        let sub_sink = nested_progress(progress.clone());
        let response = match self
            .client
            .create_pair_infrastructure(&request, &ready.identity, sub_sink)
            .await
        {
            Ok(response) => response,
            Err(e) => {
                emit(&progress, Phase::Error, failure_advice(e.kind()), 100);
                return PairCreation::failed(ProvisionError::Infrastructure(e).to_string());
            }
        };

        // The platform's returned pair id is not always trustworthy;
        // fall back to matching member ids against the project's pairs.
        let pair_id = match response.pair_id.as_deref().filter(|id| is_resolved_id(id)) {
            Some(id) => Some(id.to_string()),
            None => {
                self.resolve_pair_id(&draft.id, &ready.identity, &response)
                    .await
            }
        };

        let mut error = None;
        match &pair_id {
            Some(id) => self.assignments.set(&draft.id, id).await,
            None => {
                // Degraded success: project and infrastructure exist, the
                // in-process binding is stale until the user refreshes.
                tracing::warn!(project = %draft.id, "provisioned pair id unresolved");
                error = Some(
                    "server pair created, but its identifier could not be resolved; \
                     refresh the project to pick it up"
                        .to_string(),
                );
            }
        }

        if response.hosting_configured {
            emit(&progress, Phase::Complete, "Server pair ready", 100);
        } else {
            emit(
                &progress,
                Phase::Error,
                "Server pair created, but public hosting needs manual configuration",
                100,
            );
            error.get_or_insert_with(|| {
                "public hosting could not be configured; finish setup manually".to_string()
            });
        }

        PairCreation {
            success: true,
            server_pair_id: pair_id,
            frontend_id: response.frontend_id,
            backend_id: response.backend_id,
            error,
        }
    }

    /// Create a project and rebind an existing pair to it.
    ///
    /// Issues exactly one move request; the previous project loses the
    /// pair as part of that single platform-side move.
    pub async fn assign_existing_pair(
        &self,
        draft: &ProjectDraft,
        pair: &ServerPair,
        ctx: &ProvisionContext,
        progress: ProgressSink,
    ) -> bool {
        let ready = match ctx.normalize() {
            Ok(ready) => ready,
            Err(e) => {
                emit(&progress, Phase::Error, e.to_string(), 0);
                return false;
            }
        };

        emit(&progress, Phase::Setup, "Creating project", 0);
        if let Err(e) = self.client.create_project(draft, &ready.identity).await {
            emit(
                &progress,
                Phase::Error,
                ProvisionError::ProjectCreate(e).to_string(),
                0,
            );
            return false;
        }

        emit(&progress, Phase::Setup, "Attaching server pair", 50);
        let from = pair.current_project_id.as_deref();
        if let Err(e) = self
            .client
            .move_pair(&pair.pair_id, from, &draft.id, &ready.identity)
            .await
        {
            emit(
                &progress,
                Phase::Error,
                ProvisionError::Reassign(e).to_string(),
                50,
            );
            return false;
        }

        self.assignments.set(&draft.id, &pair.pair_id).await;
        emit(&progress, Phase::Complete, "Server pair attached", 100);
        true
    }

    /// Create a project with no compute binding at all.
    pub async fn create_without_pair(
        &self,
        draft: &ProjectDraft,
        ctx: &ProvisionContext,
        progress: ProgressSink,
    ) -> bool {
        let ready = match ctx.normalize() {
            Ok(ready) => ready,
            Err(e) => {
                emit(&progress, Phase::Error, e.to_string(), 0);
                return false;
            }
        };

        emit(&progress, Phase::Setup, "Creating project", 0);
        if let Err(e) = self.client.create_project(draft, &ready.identity).await {
            emit(
                &progress,
                Phase::Error,
                ProvisionError::ProjectCreate(e).to_string(),
                0,
            );
            return false;
        }

        emit(&progress, Phase::Complete, "Project created", 100);
        true
    }

    /// Secondary lookup for a pair whose creation response carried no
    /// usable identifier: the side-effected member ids are still
    /// discoverable through the project's pair list.
    async fn resolve_pair_id(
        &self,
        project_id: &str,
        auth: &Identity,
        response: &InfraResponse,
    ) -> Option<String> {
        let frontend = response.frontend_id.as_deref();
        let backend = response.backend_id.as_deref();
        if frontend.is_none() && backend.is_none() {
            return None;
        }

        let pairs = match self.client.list_project_pairs(project_id, auth).await {
            Ok(pairs) => pairs,
            Err(e) => {
                tracing::warn!(project = %project_id, error = %e, "pair lookup failed");
                return None;
            }
        };

        pairs
            .into_iter()
            .find(|pair| {
                let frontend_match = frontend.map(|id| pair.frontend_id == id);
                let backend_match = backend.map(|id| pair.backend_id == id);
                match (frontend_match, backend_match) {
                    (Some(fe), Some(be)) => fe && be,
                    (Some(fe), None) => fe,
                    (None, Some(be)) => be,
                    (None, None) => false,
                }
            })
            .map(|pair| pair.pair_id)
            .filter(|id| is_resolved_id(id))
    }
}

/// A returned pair id counts only if it is non-empty and not the
/// platform's placeholder.
fn is_resolved_id(id: &str) -> bool {
    !id.trim().is_empty() && id != PAIR_ID_UNRESOLVED
}

fn emit(progress: &ProgressSink, phase: Phase, status: impl Into<String>, percent: u8) {
    progress(ProgressUpdate::new(phase, status, percent));
}

/// Wrap the run's sink so the collaborator's 0-100 sub-progress lands in
/// the 25-100 band with the right phase and status line.
fn nested_progress(progress: ProgressSink) -> crate::platform::InfraProgress {
    Arc::new(move |sub_percent| {
        let (phase, percent) = map_sub_progress(sub_percent);
        let status = match phase {
            Phase::Hosting => "Configuring public hosting",
            _ => "Provisioning server pair",
        };
        progress(ProgressUpdate::new(phase, status, percent));
    })
}

/// User-facing advice for a classified provisioning failure.
fn failure_advice(kind: FailureKind) -> &'static str {
    match kind {
        FailureKind::Wallet => "Wallet unavailable; reconnect your wallet and retry",
        FailureKind::Payment => "Payment failed; top up your credit balance and retry",
        FailureKind::Cycles => "Compute allocation failed; retry in a moment",
        FailureKind::Hosting => "Hosting configuration failed; the pair may need manual setup",
        FailureKind::Other => "Server pair provisioning failed",
    }
}
