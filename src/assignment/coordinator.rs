// ABOUTME: Assignment coordinator - single source of truth for project/pair bindings.
// ABOUTME: Shares in-flight remote reads, persists writes as detached tasks.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use futures::future::{BoxFuture, Shared};
use futures::FutureExt;
use tokio::sync::{broadcast, Mutex};

use super::mirror::AssignmentMirror;
use crate::error::PlatformError;
use crate::platform::{Identity, PlatformClient};

/// A change to the project/server-pair binding, broadcast to in-process
/// subscribers so UI surfaces can react without polling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssignmentChange {
    pub project_id: String,
    /// `None` when the binding was removed.
    pub pair_id: Option<String>,
}

/// Callback invoked when a detached durable write fails. The failure is
/// logged regardless; the hook exists so callers (and tests) can observe
/// that the attempt happened and failed.
pub type PersistFailureHook = Arc<dyn Fn(&str, &PlatformError) + Send + Sync>;

type SharedRead = Shared<BoxFuture<'static, Result<Option<String>, String>>>;

struct InflightRead {
    project_id: String,
    generation: u64,
    future: SharedRead,
}

struct CoordinatorState {
    /// Bindings written locally this session. Reads of these are
    /// authoritative (read-your-writes); everything else goes remote.
    bindings: HashMap<String, String>,
    /// The coordinator's single in-flight remote read, if any.
    inflight: Option<InflightRead>,
    next_generation: u64,
}

/// Single source of truth for the current project/server-pair binding.
///
/// `get` never serves a stale remote answer: a miss on the local map
/// triggers a fresh remote read, and concurrent callers share the one
/// read already in flight instead of issuing duplicates. Remote results
/// are not cached past that request's lifetime.
///
/// `set`/`remove` update local state synchronously and persist durably
/// from a detached task; persistence failure is logged and reported to
/// an optional hook, never to the caller, and never rolls the local
/// update back. Last writer wins; there is no cross-process conflict
/// resolution.
///
/// Every instance owns its own in-flight handle and broadcast channel,
/// so tests can run any number of coordinators without shared state.
pub struct AssignmentCoordinator {
    client: Arc<dyn PlatformClient>,
    identity: Identity,
    state: Mutex<CoordinatorState>,
    changes: broadcast::Sender<AssignmentChange>,
    mirror: Option<Arc<AssignmentMirror>>,
    on_persist_failure: Option<PersistFailureHook>,
    last_update_ms: AtomicU64,
}

impl AssignmentCoordinator {
    pub fn new(client: Arc<dyn PlatformClient>, identity: Identity) -> Self {
        let (changes, _) = broadcast::channel(32);
        Self {
            client,
            identity,
            state: Mutex::new(CoordinatorState {
                bindings: HashMap::new(),
                inflight: None,
                next_generation: 0,
            }),
            changes,
            mirror: None,
            on_persist_failure: None,
            last_update_ms: AtomicU64::new(0),
        }
    }

    /// Mirror the assignment map to a local file, best-effort.
    pub fn with_mirror(mut self, mirror: AssignmentMirror) -> Self {
        self.mirror = Some(Arc::new(mirror));
        self
    }

    /// Observe failed durable writes (they are logged either way).
    pub fn with_persist_failure_hook(mut self, hook: PersistFailureHook) -> Self {
        self.on_persist_failure = Some(hook);
        self
    }

    /// The pair currently bound to `project_id`, if any.
    ///
    /// A binding written locally this session wins immediately. Otherwise
    /// the durable answer is fetched fresh, joining the in-flight read
    /// when one is already pending for the same query. A failed remote
    /// read is logged and answered with `None`.
    pub async fn get(&self, project_id: &str) -> Option<String> {
        loop {
            let (read, generation, ours) = {
                let mut state = self.state.lock().await;
                if let Some(pair) = state.bindings.get(project_id) {
                    return Some(pair.clone());
                }
                match &state.inflight {
                    Some(inflight) if inflight.project_id == project_id => {
                        (inflight.future.clone(), inflight.generation, true)
                    }
                    // A read for some other project holds the slot; wait
                    // for it rather than running two remote reads at once.
                    Some(inflight) => (inflight.future.clone(), inflight.generation, false),
                    None => {
                        let generation = state.next_generation;
                        state.next_generation += 1;
                        let future = self.start_read(project_id);
                        state.inflight = Some(InflightRead {
                            project_id: project_id.to_string(),
                            generation,
                            future: future.clone(),
                        });
                        (future, generation, true)
                    }
                }
            };

            let result = read.await;

            {
                let mut state = self.state.lock().await;
                if matches!(&state.inflight, Some(i) if i.generation == generation) {
                    state.inflight = None;
                }
            }

            if !ours {
                continue;
            }

            return match result {
                Ok(pair) => pair,
                Err(message) => {
                    tracing::warn!(project = %project_id, error = %message, "assignment read failed");
                    None
                }
            };
        }
    }

    /// Bind `pair_id` to `project_id`.
    ///
    /// The local update is visible to `get` before this returns; the
    /// durable write happens in a detached task and is not awaited.
    pub async fn set(&self, project_id: &str, pair_id: &str) {
        let snapshot = {
            let mut state = self.state.lock().await;
            state
                .bindings
                .insert(project_id.to_string(), pair_id.to_string());
            state.bindings.clone()
        };
        let stamp = self.touch();
        let _ = self.changes.send(AssignmentChange {
            project_id: project_id.to_string(),
            pair_id: Some(pair_id.to_string()),
        });
        self.spawn_persist(
            project_id.to_string(),
            Some(pair_id.to_string()),
            snapshot,
            stamp,
        );
    }

    /// Clear `project_id`'s binding.
    pub async fn remove(&self, project_id: &str) {
        let snapshot = {
            let mut state = self.state.lock().await;
            state.bindings.remove(project_id);
            state.bindings.clone()
        };
        let stamp = self.touch();
        let _ = self.changes.send(AssignmentChange {
            project_id: project_id.to_string(),
            pair_id: None,
        });
        self.spawn_persist(project_id.to_string(), None, snapshot, stamp);
    }

    /// Receive binding-change notifications without polling.
    pub fn subscribe(&self) -> broadcast::Receiver<AssignmentChange> {
        self.changes.subscribe()
    }

    /// Strictly increasing timestamp of the last local change. Used by
    /// UI layers for cache busting only, never for conflict resolution.
    pub fn last_update_millis(&self) -> u64 {
        self.last_update_ms.load(Ordering::SeqCst)
    }

    fn start_read(&self, project_id: &str) -> SharedRead {
        let client = self.client.clone();
        let identity = self.identity.clone();
        let project = project_id.to_string();
        async move {
            client
                .read_selected_pair(&project, &identity)
                .await
                .map_err(|e| e.to_string())
        }
        .boxed()
        .shared()
    }

    fn spawn_persist(
        &self,
        project_id: String,
        pair_id: Option<String>,
        snapshot: HashMap<String, String>,
        stamp: u64,
    ) {
        let client = self.client.clone();
        let identity = self.identity.clone();
        let hook = self.on_persist_failure.clone();
        let mirror = self.mirror.clone();
        tokio::spawn(async move {
            if let Some(mirror) = mirror {
                mirror.save(&snapshot, stamp).await;
            }
            let result = match pair_id.as_deref() {
                Some(pair) => client.write_selected_pair(&project_id, pair, &identity).await,
                None => client.clear_selected_pair(&project_id, &identity).await,
            };
            if let Err(e) = result {
                tracing::warn!(project = %project_id, error = %e, "durable assignment write failed");
                if let Some(hook) = hook {
                    hook(&project_id, &e);
                }
            }
        });
    }

    fn touch(&self) -> u64 {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0);
        let mut prev = self.last_update_ms.load(Ordering::SeqCst);
        loop {
            let next = now.max(prev + 1);
            match self.last_update_ms.compare_exchange(
                prev,
                next,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return next,
                Err(actual) => prev = actual,
            }
        }
    }
}
