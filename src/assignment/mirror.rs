// ABOUTME: Best-effort local mirror of the assignment map for offline resilience.
// ABOUTME: Never authoritative; on disagreement the platform's durable answer wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// On-disk snapshot format.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MirrorSnapshot {
    pub assignments: HashMap<String, String>,
    pub last_update_ms: u64,
}

/// Writes assignment snapshots to a local JSON file.
///
/// Write failures are logged at debug level and otherwise ignored; a
/// broken mirror must never break an assignment update. The snapshot is
/// only read through [`load`](Self::load) — it is never folded back into
/// the coordinator's live state.
#[derive(Debug, Clone)]
pub struct AssignmentMirror {
    path: PathBuf,
}

impl AssignmentMirror {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Persist a snapshot, best-effort.
    pub async fn save(&self, assignments: &HashMap<String, String>, last_update_ms: u64) {
        let snapshot = MirrorSnapshot {
            assignments: assignments.clone(),
            last_update_ms,
        };
        if let Err(e) = self.write_snapshot(&snapshot).await {
            tracing::debug!(path = %self.path.display(), error = %e, "assignment mirror write failed");
        }
    }

    /// Read the last written snapshot, if one exists and parses.
    pub async fn load(&self) -> Option<MirrorSnapshot> {
        let bytes = tokio::fs::read(&self.path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }

    async fn write_snapshot(&self, snapshot: &MirrorSnapshot) -> anyhow::Result<()> {
        let json = serde_json::to_vec_pretty(snapshot)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }
        tokio::fs::write(&self.path, json).await?;
        Ok(())
    }
}
