use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors that can end a single unit of work. Anything else (signal sub-sources, delivery)
/// is absorbed where it happens.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PipelineError {
    #[error("insufficient history for {code}: need {required} daily bars, got {available}")]
    DataUnavailable {
        code: String,
        required: usize,
        available: usize,
    },

    #[error("upstream request failed: {0}")]
    Upstream(String),

    #[error("malformed upstream response: {0}")]
    MalformedResponse(String),

    #[error("narrative backend returned HTTP {status_code}: {body}")]
    Backend { status_code: u16, body: String },

    #[error("narrative backend response missing content: {0}")]
    BackendProtocol(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::DataUnavailable { .. } => ErrorKind::DataUnavailable,
            Self::Upstream(_) => ErrorKind::UpstreamError,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::Backend { .. } => ErrorKind::BackendError,
            Self::BackendProtocol(_) => ErrorKind::BackendProtocolError,
        }
    }

    pub fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedResponse(message.into())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    DataUnavailable,
    UpstreamError,
    MalformedResponse,
    BackendError,
    BackendProtocolError,
}

impl ErrorKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::DataUnavailable => "DataUnavailable",
            Self::UpstreamError => "UpstreamError",
            Self::MalformedResponse => "MalformedResponse",
            Self::BackendError => "BackendError",
            Self::BackendProtocolError => "BackendProtocolError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kind_projection_matches_variant() {
        let err = PipelineError::Backend {
            status_code: 500,
            body: "oops".to_string(),
        };
        assert_eq!(err.kind(), ErrorKind::BackendError);
        assert_eq!(err.to_string(), "narrative backend returned HTTP 500: oops");

        let err = PipelineError::DataUnavailable {
            code: "999999".to_string(),
            required: 21,
            available: 4,
        };
        assert_eq!(err.kind(), ErrorKind::DataUnavailable);
        assert!(err.to_string().contains("got 4"));
    }
}
