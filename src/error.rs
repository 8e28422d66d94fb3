// ABOUTME: Defines all error types for the tandem library using thiserror.
// ABOUTME: Each subsystem has its own error enum, unified under TandemError.

/// Top-level error type for the tandem library.
#[derive(Debug, thiserror::Error)]
pub enum TandemError {
    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    #[error("Platform error: {0}")]
    Platform(#[from] PlatformError),
}

/// Errors from server-pair configuration planning.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// The budget cannot cover even the baseline pair configuration.
    ///
    /// `required` is the total credit cost of two members at the
    /// baseline 1 GB / 30 day candidate, so callers can render
    /// "you need N more credits".
    #[error("a server pair requires at least {required} credits ({available} available)")]
    InsufficientCredits { available: u64, required: u64 },
}

/// Errors from provisioning workflow preconditions and remote steps.
#[derive(Debug, thiserror::Error)]
pub enum ProvisionError {
    /// No authenticated identity in the provisioning context.
    #[error("no authenticated identity; sign in before provisioning")]
    MissingIdentity,

    /// No pricing reference in the provisioning context.
    #[error("pricing information unavailable; cannot size a server pair")]
    MissingPricing,

    #[error(transparent)]
    Plan(#[from] PlanError),

    /// Project creation failed; nothing else was attempted.
    #[error("project creation failed: {0}")]
    ProjectCreate(#[source] PlatformError),

    /// Infrastructure creation failed after the project was created.
    /// The project is not rolled back.
    #[error("server pair provisioning failed: {0}")]
    Infrastructure(#[source] PlatformError),

    /// Rebinding an existing pair to another project failed.
    #[error("server pair reassignment failed: {0}")]
    Reassign(#[source] PlatformError),
}

/// Errors from the external platform collaborator.
///
/// Remote failures are classified into a [`FailureKind`] exactly once,
/// at the client boundary; callers branch on the tag for user messaging
/// and never re-parse message text.
#[derive(Debug, thiserror::Error)]
pub enum PlatformError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("{kind} failure: {message}")]
    Call { kind: FailureKind, message: String },

    #[error("Deserialization error: {0}")]
    Deserialize(#[from] serde_json::Error),

    #[error("Provisioning stream closed unexpectedly")]
    StreamClosed,
}

impl PlatformError {
    /// Build a `Call` error, classifying the platform's message text.
    pub fn call(message: impl Into<String>) -> Self {
        let message = message.into();
        PlatformError::Call {
            kind: FailureKind::classify(&message),
            message,
        }
    }

    /// The classified failure category, `Other` for transport-level errors.
    pub fn kind(&self) -> FailureKind {
        match self {
            PlatformError::Call { kind, .. } => *kind,
            _ => FailureKind::Other,
        }
    }
}

/// Category of a remote platform failure, used purely for user-facing
/// messaging, never for control flow.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    /// Wallet or ledger unavailable / unauthorized.
    Wallet,
    /// Payment rejected or balance too low.
    Payment,
    /// Compute-resource (cycles) allocation failed.
    Cycles,
    /// Public hosting configuration failed.
    Hosting,
    /// Anything else.
    Other,
}

impl FailureKind {
    /// Classify a platform error message by its text.
    ///
    /// The platform reports failures as free-form strings; this is the
    /// single place that text is inspected.
    pub fn classify(message: &str) -> Self {
        let msg = message.to_lowercase();
        if msg.contains("wallet") || msg.contains("ledger") {
            FailureKind::Wallet
        } else if msg.contains("payment") || msg.contains("balance") || msg.contains("funds") {
            FailureKind::Payment
        } else if msg.contains("cycles") || msg.contains("compute allowance") {
            FailureKind::Cycles
        } else if msg.contains("hosting") || msg.contains("domain") {
            FailureKind::Hosting
        } else {
            FailureKind::Other
        }
    }
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FailureKind::Wallet => write!(f, "wallet"),
            FailureKind::Payment => write!(f, "payment"),
            FailureKind::Cycles => write!(f, "cycles"),
            FailureKind::Hosting => write!(f, "hosting"),
            FailureKind::Other => write!(f, "platform"),
        }
    }
}
