//! Error taxonomy for the extraction core
//!
//! The variants matter as much as the messages: the retry executor retries
//! `Transport` only, the pagination engine recovers `SessionExpired` once by
//! reframing the cursor, and everything else is fatal to the stream.

use thiserror::Error;

/// Errors raised by the document-store client and the pagination engine.
#[derive(Debug, Error)]
pub enum ElasticError {
    /// Network or I/O failure while talking to Elasticsearch. Retryable.
    #[error("transport failure: {source}")]
    Transport {
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// The point-in-time backing the cursor expired or is unknown to the
    /// cluster. Recovered once per search by reframing the cursor.
    #[error("point in time expired: {reason}")]
    SessionExpired { reason: String },

    /// Elasticsearch rejected the request for a non-session reason.
    #[error("elasticsearch returned {status}: {reason}")]
    Api { status: u16, reason: String },

    /// A response body that does not match the expected search shape.
    #[error("unexpected elasticsearch response: {0}")]
    UnexpectedResponse(String),

    /// Invalid cursor or engine configuration. Raised before any remote
    /// call and never retried.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// A persisted cursor offset that cannot be decoded. The stream cannot
    /// resume safely from a guessed position, so this is fatal at load time.
    #[error("cursor offset serialization: {0}")]
    Serde(#[from] serde_json::Error),
}

impl ElasticError {
    /// Wrap a lower-level failure as a retryable transport error.
    pub fn transport(source: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Transport {
            source: Box::new(source),
        }
    }

    /// True when the retry executor should attempt the call again.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Transport { .. })
    }

    /// True when the session lifecycle should reframe the cursor.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Self::SessionExpired { .. })
    }
}
