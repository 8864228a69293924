use thiserror::Error;

/// Authentication failure against an external catalog.
///
/// Distinct from transient network trouble: a provider that reports one of
/// these is unusable until a fresh credential exchange succeeds, so the
/// batch loop stops routing calls to it for the remainder of the run.
#[derive(Debug, Clone, Error)]
pub enum AuthError {
    #[error("credentials not configured: {0}")]
    Missing(&'static str),

    #[error("credentials rejected: {0}")]
    Rejected(String),
}
