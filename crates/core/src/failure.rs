use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How a provider-side failure should be treated by the caller.
///
/// `QuotaExceeded` and `Transient` are retryable later; `Fatal` is not.
/// Nothing in the core retries automatically; the kinds exist so callers
/// can choose.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum FailureKind {
    QuotaExceeded,
    Transient,
    Fatal,
}

impl std::fmt::Display for FailureKind {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            FailureKind::QuotaExceeded => "quota-exceeded",
            FailureKind::Transient => "transient",
            FailureKind::Fatal => "fatal",
        };
        formatter.write_str(label)
    }
}

/// A classified provider-side failure. Every embedding or generation error
/// reaching a caller has passed through this type, so callers never branch
/// on raw HTTP payload shapes.
#[derive(Debug, Clone, Error)]
#[error("{kind} failure from {provider}: {message}")]
pub struct ProviderFailure {
    pub provider: String,
    pub kind: FailureKind,
    pub message: String,
}

impl ProviderFailure {
    pub fn new(provider: impl Into<String>, kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            kind,
            message: message.into(),
        }
    }

    pub fn from_status(provider: &str, status: StatusCode, detail: &str) -> Self {
        Self::new(
            provider,
            classify_status(status),
            format!("request returned {status}: {detail}"),
        )
    }

    pub fn from_transport(provider: &str, error: &reqwest::Error) -> Self {
        Self::new(provider, classify_transport(error), error.to_string())
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self.kind, FailureKind::QuotaExceeded | FailureKind::Transient)
    }
}

pub fn classify_status(status: StatusCode) -> FailureKind {
    if status == StatusCode::TOO_MANY_REQUESTS {
        FailureKind::QuotaExceeded
    } else if status == StatusCode::REQUEST_TIMEOUT || status.is_server_error() {
        FailureKind::Transient
    } else {
        FailureKind::Fatal
    }
}

pub fn classify_transport(error: &reqwest::Error) -> FailureKind {
    if error.is_timeout() || error.is_connect() {
        FailureKind::Transient
    } else {
        FailureKind::Fatal
    }
}

#[cfg(test)]
mod tests {
    use super::{classify_status, FailureKind, ProviderFailure};
    use reqwest::StatusCode;

    #[test]
    fn rate_limiting_maps_to_quota_exceeded() {
        assert_eq!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            FailureKind::QuotaExceeded
        );
    }

    #[test]
    fn server_errors_and_timeouts_are_transient() {
        assert_eq!(
            classify_status(StatusCode::INTERNAL_SERVER_ERROR),
            FailureKind::Transient
        );
        assert_eq!(
            classify_status(StatusCode::SERVICE_UNAVAILABLE),
            FailureKind::Transient
        );
        assert_eq!(
            classify_status(StatusCode::REQUEST_TIMEOUT),
            FailureKind::Transient
        );
    }

    #[test]
    fn client_errors_are_fatal() {
        assert_eq!(classify_status(StatusCode::BAD_REQUEST), FailureKind::Fatal);
        assert_eq!(classify_status(StatusCode::NOT_FOUND), FailureKind::Fatal);
        assert_eq!(classify_status(StatusCode::UNAUTHORIZED), FailureKind::Fatal);
    }

    #[test]
    fn retryability_follows_kind() {
        let quota = ProviderFailure::new("test", FailureKind::QuotaExceeded, "slow down");
        let fatal = ProviderFailure::new("test", FailureKind::Fatal, "bad input");
        assert!(quota.is_retryable());
        assert!(!fatal.is_retryable());
    }
}
