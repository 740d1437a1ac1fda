//! Structured readiness status returned by upstream collaborators.

/// Outcome of a single attempt against a collaborator that may still be
/// materializing its input.
///
/// `Waiting` is not an error: it is the only signal that schedules a retry.
/// Only this discriminator drives control flow, never message text.
#[derive(Debug, Clone, PartialEq)]
pub enum DependencyStatus<T> {
    /// Result is available.
    Ready(T),
    /// The upstream artifact does not exist yet.
    Waiting { estimated_seconds: Option<u64> },
    /// Unrecoverable for this attempt.
    Failed { reason: String },
}

impl<T> DependencyStatus<T> {
    pub fn waiting() -> Self {
        Self::Waiting {
            estimated_seconds: None,
        }
    }

    pub fn failed(reason: impl Into<String>) -> Self {
        Self::Failed {
            reason: reason.into(),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    pub fn is_waiting(&self) -> bool {
        matches!(self, Self::Waiting { .. })
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ready(_) => "ready",
            Self::Waiting { .. } => "waiting_for_dependency",
            Self::Failed { .. } => "failed",
        }
    }

    /// Transform the ready payload, keeping the other variants.
    pub fn map<U, F>(self, f: F) -> DependencyStatus<U>
    where
        F: FnOnce(T) -> U,
    {
        match self {
            Self::Ready(value) => DependencyStatus::Ready(f(value)),
            Self::Waiting { estimated_seconds } => DependencyStatus::Waiting { estimated_seconds },
            Self::Failed { reason } => DependencyStatus::Failed { reason },
        }
    }
}
