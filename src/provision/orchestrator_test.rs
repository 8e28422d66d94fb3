// ABOUTME: Tests for the provisioning orchestrator.
// ABOUTME: Covers preconditions, progress ordering, fallback resolution, and hosting failure.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::orchestrator::Orchestrator;
use super::progress::{collecting_sink, Phase};
use crate::assignment::AssignmentCoordinator;
use crate::error::PlatformError;
use crate::platform::{
    Identity, InfraProgress, InfraRequest, InfraResponse, PlatformClient, PricingSnapshot,
    ProjectDraft, ServerPair, PAIR_ID_UNRESOLVED,
};
use super::context::ProvisionContext;

/// Scriptable fake platform for orchestrator runs.
#[derive(Default)]
struct FakePlatform {
    fail_project_create: bool,
    /// Error message for the infrastructure call, or None for success.
    infra_error: Option<String>,
    /// Response returned on infrastructure success.
    infra_response: InfraResponse,
    /// Sub-progress percents the provisioning call reports while running.
    progress_script: Vec<u8>,
    /// Pairs returned by the fallback lookup.
    project_pairs: Vec<ServerPair>,

    created_projects: Mutex<Vec<String>>,
    infra_requests: Mutex<Vec<InfraRequest>>,
    infra_calls: AtomicUsize,
    list_calls: AtomicUsize,
    moves: Mutex<Vec<(String, Option<String>, String)>>,
    selected: Mutex<HashMap<String, String>>,
}

impl FakePlatform {
    fn remote_calls(&self) -> usize {
        self.created_projects.lock().unwrap().len()
            + self.infra_calls.load(Ordering::SeqCst)
            + self.list_calls.load(Ordering::SeqCst)
            + self.moves.lock().unwrap().len()
    }
}

#[async_trait]
impl PlatformClient for FakePlatform {
    async fn create_project(
        &self,
        draft: &ProjectDraft,
        _auth: &Identity,
    ) -> Result<(), PlatformError> {
        if self.fail_project_create {
            return Err(PlatformError::call("project quota exceeded"));
        }
        self.created_projects.lock().unwrap().push(draft.id.clone());
        Ok(())
    }

    async fn create_pair_infrastructure(
        &self,
        request: &InfraRequest,
        _auth: &Identity,
        progress: InfraProgress,
    ) -> Result<InfraResponse, PlatformError> {
        self.infra_calls.fetch_add(1, Ordering::SeqCst);
        self.infra_requests.lock().unwrap().push(request.clone());
        for &percent in &self.progress_script {
            progress(percent);
        }
        match &self.infra_error {
            Some(message) => Err(PlatformError::call(message.clone())),
            None => Ok(self.infra_response.clone()),
        }
    }

    async fn list_project_pairs(
        &self,
        _project_id: &str,
        _auth: &Identity,
    ) -> Result<Vec<ServerPair>, PlatformError> {
        self.list_calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.project_pairs.clone())
    }

    async fn move_pair(
        &self,
        pair_id: &str,
        from: Option<&str>,
        to: &str,
        _auth: &Identity,
    ) -> Result<(), PlatformError> {
        self.moves.lock().unwrap().push((
            pair_id.to_string(),
            from.map(str::to_string),
            to.to_string(),
        ));
        Ok(())
    }

    async fn read_selected_pair(
        &self,
        project_id: &str,
        _auth: &Identity,
    ) -> Result<Option<String>, PlatformError> {
        Ok(self.selected.lock().unwrap().get(project_id).cloned())
    }

    async fn write_selected_pair(
        &self,
        project_id: &str,
        pair_id: &str,
        _auth: &Identity,
    ) -> Result<(), PlatformError> {
        self.selected
            .lock()
            .unwrap()
            .insert(project_id.to_string(), pair_id.to_string());
        Ok(())
    }

    async fn clear_selected_pair(
        &self,
        project_id: &str,
        _auth: &Identity,
    ) -> Result<(), PlatformError> {
        self.selected.lock().unwrap().remove(project_id);
        Ok(())
    }
}

fn pair(pair_id: &str, frontend_id: &str, backend_id: &str) -> ServerPair {
    ServerPair {
        pair_id: pair_id.to_string(),
        name: "test pair".to_string(),
        frontend_id: frontend_id.to_string(),
        backend_id: backend_id.to_string(),
        created_at_ms: 1_700_000_000_000,
        credits_allocated: 4_400,
        current_project_id: None,
    }
}

fn full_context() -> ProvisionContext {
    ProvisionContext::new()
        .with_identity(Identity::new("test-principal"))
        .with_pricing(PricingSnapshot {
            credits_per_trillion_cycles: 1_000,
        })
}

fn harness(platform: FakePlatform) -> (Orchestrator, Arc<AssignmentCoordinator>, Arc<FakePlatform>) {
    let platform = Arc::new(platform);
    let assignments = Arc::new(AssignmentCoordinator::new(
        platform.clone(),
        Identity::new("test-principal"),
    ));
    let orchestrator = Orchestrator::new(platform.clone(), assignments.clone());
    (orchestrator, assignments, platform)
}

#[tokio::test]
async fn test_happy_path_emits_ordered_progress_and_binds_pair() {
    let (orchestrator, assignments, platform) = harness(FakePlatform {
        infra_response: InfraResponse {
            pair_id: Some("pair-1".to_string()),
            frontend_id: Some("fe-1".to_string()),
            backend_id: Some("be-1".to_string()),
            hosting_configured: true,
        },
        progress_script: vec![10, 40, 60, 100],
        ..FakePlatform::default()
    });

    let draft = ProjectDraft::new("demo");
    let (sink, seen) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&draft, "demo pair", 10_000, &full_context(), sink)
        .await;

    assert!(result.success);
    assert_eq!(result.server_pair_id.as_deref(), Some("pair-1"));
    assert_eq!(result.error, None);

    let updates = seen.lock().unwrap().clone();
    assert_eq!(updates.first().map(|u| (u.phase, u.percent)), Some((Phase::Setup, 0)));
    let mut prev = 0;
    for update in &updates {
        assert!(update.percent >= prev, "regressed at {:?}", update);
        prev = update.percent;
    }
    let last = updates.last().unwrap();
    assert_eq!((last.phase, last.percent), (Phase::Complete, 100));
    // The collaborator crossing 50% flips the run into the hosting phase.
    assert!(updates.iter().any(|u| u.phase == Phase::Hosting));

    // The planned config sized the request: (1GB, 30d) at 2200/member.
    let request = platform.infra_requests.lock().unwrap()[0].clone();
    assert_eq!(request.credits, 4_400);
    assert_eq!((request.memory_gb, request.duration_days), (1, 30));
    assert!(request.enable_hosting);

    assert_eq!(assignments.get(&draft.id).await.as_deref(), Some("pair-1"));
    // The fallback lookup never ran; the returned id was trustworthy.
    assert_eq!(platform.list_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_missing_identity_rejected_before_any_remote_call() {
    let (orchestrator, _, platform) = harness(FakePlatform::default());
    let ctx = ProvisionContext::new().with_pricing(PricingSnapshot {
        credits_per_trillion_cycles: 1_000,
    });

    let (sink, _) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 10_000, &ctx, sink)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("identity"));
    assert_eq!(platform.remote_calls(), 0);
}

#[tokio::test]
async fn test_missing_pricing_rejected_before_any_remote_call() {
    let (orchestrator, _, platform) = harness(FakePlatform::default());
    let ctx = ProvisionContext::new().with_identity(Identity::new("p"));

    let (sink, _) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 10_000, &ctx, sink)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("pricing"));
    assert_eq!(platform.remote_calls(), 0);
}

#[tokio::test]
async fn test_insufficient_budget_rejected_before_any_remote_call() {
    let (orchestrator, _, platform) = harness(FakePlatform::default());

    let (sink, seen) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 500, &full_context(), sink)
        .await;

    assert!(!result.success);
    let message = result.error.unwrap();
    // The stated minimum is both members at the (1GB, 30d) baseline.
    assert!(message.contains("4400"), "message: {message}");
    assert_eq!(platform.remote_calls(), 0);
    // The run never started, so no progress was emitted either.
    assert!(seen.lock().unwrap().is_empty());
}

#[tokio::test]
async fn test_project_create_failure_aborts_run() {
    let (orchestrator, _, platform) = harness(FakePlatform {
        fail_project_create: true,
        ..FakePlatform::default()
    });

    let (sink, seen) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 10_000, &full_context(), sink)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("project creation failed"));
    assert_eq!(platform.infra_calls.load(Ordering::SeqCst), 0);
    assert_eq!(seen.lock().unwrap().last().unwrap().phase, Phase::Error);
}

#[tokio::test]
async fn test_infrastructure_failure_reports_classified_advice() {
    let (orchestrator, _, _) = harness(FakePlatform {
        infra_error: Some("wallet canister unreachable".to_string()),
        ..FakePlatform::default()
    });

    let (sink, seen) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 10_000, &full_context(), sink)
        .await;

    assert!(!result.success);
    assert!(result.error.unwrap().contains("wallet"));

    let updates = seen.lock().unwrap().clone();
    let last = updates.last().unwrap();
    assert_eq!(last.phase, Phase::Error);
    assert!(last.status.contains("Wallet"));
}

#[tokio::test]
async fn test_untrustworthy_pair_id_resolved_by_member_lookup() {
    let (orchestrator, assignments, platform) = harness(FakePlatform {
        infra_response: InfraResponse {
            pair_id: Some(PAIR_ID_UNRESOLVED.to_string()),
            frontend_id: Some("fe-1".to_string()),
            backend_id: Some("be-1".to_string()),
            hosting_configured: true,
        },
        project_pairs: vec![pair("pair-other", "fe-9", "be-9"), pair("pair-real", "fe-1", "be-1")],
        ..FakePlatform::default()
    });

    let draft = ProjectDraft::new("demo");
    let (sink, _) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&draft, "p", 10_000, &full_context(), sink)
        .await;

    assert!(result.success);
    assert_eq!(result.server_pair_id.as_deref(), Some("pair-real"));
    assert_eq!(result.error, None);
    assert_eq!(platform.list_calls.load(Ordering::SeqCst), 1);
    assert_eq!(assignments.get(&draft.id).await.as_deref(), Some("pair-real"));
}

#[tokio::test]
async fn test_empty_pair_id_also_triggers_fallback() {
    let (orchestrator, _, platform) = harness(FakePlatform {
        infra_response: InfraResponse {
            pair_id: Some("  ".to_string()),
            frontend_id: Some("fe-1".to_string()),
            backend_id: None,
            hosting_configured: true,
        },
        project_pairs: vec![pair("pair-real", "fe-1", "be-1")],
        ..FakePlatform::default()
    });

    let (sink, _) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 10_000, &full_context(), sink)
        .await;

    assert!(result.success);
    assert_eq!(result.server_pair_id.as_deref(), Some("pair-real"));
    assert_eq!(platform.list_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unresolvable_pair_id_degrades_but_succeeds() {
    let (orchestrator, assignments, _) = harness(FakePlatform {
        infra_response: InfraResponse {
            pair_id: None,
            frontend_id: Some("fe-1".to_string()),
            backend_id: Some("be-1".to_string()),
            hosting_configured: true,
        },
        // Fallback lookup finds nothing matching.
        project_pairs: vec![pair("pair-other", "fe-9", "be-9")],
        ..FakePlatform::default()
    });

    let draft = ProjectDraft::new("demo");
    let (sink, _) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&draft, "p", 10_000, &full_context(), sink)
        .await;

    // Infrastructure exists; only the bookkeeping is stale.
    assert!(result.success);
    assert_eq!(result.server_pair_id, None);
    assert!(result.error.unwrap().contains("refresh"));
    assert_eq!(assignments.get(&draft.id).await, None);
}

#[tokio::test]
async fn test_hosting_failure_is_recoverable_success() {
    let (orchestrator, _, _) = harness(FakePlatform {
        infra_response: InfraResponse {
            pair_id: Some("pair-1".to_string()),
            frontend_id: Some("fe-1".to_string()),
            backend_id: Some("be-1".to_string()),
            hosting_configured: false,
        },
        ..FakePlatform::default()
    });

    let (sink, seen) = collecting_sink();
    let result = orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 10_000, &full_context(), sink)
        .await;

    assert!(result.success);
    assert_eq!(result.server_pair_id.as_deref(), Some("pair-1"));
    assert!(result.error.unwrap().contains("manual"));

    let updates = seen.lock().unwrap().clone();
    let last = updates.last().unwrap();
    assert_eq!((last.phase, last.percent), (Phase::Error, 100));
    assert!(last.status.contains("manual"));
}

#[tokio::test]
async fn test_assign_existing_pair_issues_one_move() {
    let (orchestrator, assignments, platform) = harness(FakePlatform::default());

    let mut existing = pair("pair-9", "fe-9", "be-9");
    existing.current_project_id = Some("old-project".to_string());

    let draft = ProjectDraft::new("demo");
    let (sink, seen) = collecting_sink();
    let moved = orchestrator
        .assign_existing_pair(&draft, &existing, &full_context(), sink)
        .await;

    assert!(moved);
    let moves = platform.moves.lock().unwrap().clone();
    assert_eq!(moves.len(), 1);
    assert_eq!(moves[0].0, "pair-9");
    assert_eq!(moves[0].1.as_deref(), Some("old-project"));
    assert_eq!(moves[0].2, draft.id);

    assert_eq!(assignments.get(&draft.id).await.as_deref(), Some("pair-9"));
    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.phase, last.percent), (Phase::Complete, 100));
}

#[tokio::test]
async fn test_create_without_pair_creates_project_only() {
    let (orchestrator, _, platform) = harness(FakePlatform::default());

    let ctx = ProvisionContext::new().with_identity(Identity::new("p"));
    let (sink, seen) = collecting_sink();
    let created = orchestrator
        .create_without_pair(&ProjectDraft::new("demo"), &ctx, sink)
        .await;

    assert!(created);
    assert_eq!(platform.created_projects.lock().unwrap().len(), 1);
    assert_eq!(platform.infra_calls.load(Ordering::SeqCst), 0);
    let last = seen.lock().unwrap().last().cloned().unwrap();
    assert_eq!((last.phase, last.percent), (Phase::Complete, 100));
}

#[tokio::test]
async fn test_pool_and_hosting_preferences_forwarded() {
    use crate::platform::PoolKind;

    let (orchestrator, _, platform) = harness(FakePlatform {
        infra_response: InfraResponse {
            pair_id: Some("pair-1".to_string()),
            hosting_configured: true,
            ..InfraResponse::default()
        },
        ..FakePlatform::default()
    });

    let ctx = full_context().with_pool(PoolKind::Performance).with_hosting(false);
    let (sink, _) = collecting_sink();
    orchestrator
        .create_with_new_pair(&ProjectDraft::new("demo"), "p", 10_000, &ctx, sink)
        .await;

    let request = platform.infra_requests.lock().unwrap()[0].clone();
    assert_eq!(request.pool, PoolKind::Performance);
    assert!(!request.enable_hosting);
}
