use thiserror::Error;

use crate::provider::ProviderId;

/// Classification shared by every failure the core can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// No credential configured for the provider.
    NotConfigured,
    /// Network failure or timeout.
    Transport,
    /// Non-success status or an error payload from the provider.
    ProviderRejected,
    /// Response body could not be decoded.
    Unparseable,
    /// Durable storage refused a read or write.
    StorageFailure,
    /// Valid response with nothing in it.
    NoData,
}

impl ErrorKind {
    /// Degraded message shown in place of a section that failed.
    pub fn user_message(&self) -> &'static str {
        match self {
            ErrorKind::NotConfigured => "Not configured. Add an API key with `travel configure`.",
            ErrorKind::Transport => "Could not reach the service. Check your connection.",
            ErrorKind::ProviderRejected => "The service rejected the request.",
            ErrorKind::Unparseable => "The service returned an unexpected response.",
            ErrorKind::StorageFailure => "Could not save your change. Previous state kept.",
            ErrorKind::NoData => "No data available.",
        }
    }
}

/// A failed provider call, already translated at the adapter boundary.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{provider}: {message}")]
pub struct ProviderError {
    pub kind: ErrorKind,
    pub provider: ProviderId,
    pub message: String,
}

impl ProviderError {
    pub fn new(kind: ErrorKind, provider: ProviderId, message: impl Into<String>) -> Self {
        Self {
            kind,
            provider,
            message: message.into(),
        }
    }

    pub fn not_configured(provider: ProviderId) -> Self {
        Self::new(
            ErrorKind::NotConfigured,
            provider,
            format!("no API key configured for provider '{provider}'"),
        )
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

/// Failure of the durable storage layer. Never fatal: callers keep their
/// previous state and surface it as a notice.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to read '{key}': {source}")]
    Read {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write '{key}': {source}")]
    Write {
        key: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize '{key}': {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("storage unavailable: {0}")]
    Unavailable(String),
}

impl StorageError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::StorageFailure
    }
}

/// Rejected search input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueryError {
    #[error("No destination specified.")]
    Empty,
}
