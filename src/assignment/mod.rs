// ABOUTME: Assignment module - tracks which server pair is bound to which project.
// ABOUTME: Deduplicated reads, optimistic local writes, eventual durable persistence.

mod coordinator;
mod mirror;

pub use coordinator::{AssignmentChange, AssignmentCoordinator, PersistFailureHook};
pub use mirror::{AssignmentMirror, MirrorSnapshot};
