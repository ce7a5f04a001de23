//! Typed errors for the harvesting library.
//!
//! Per-target errors ([`FetchError`], [`ExtractError`]) are recorded against
//! their sitemap and never abort a run. [`Failure`] is the serialisable
//! summary kept in the per-sitemap status map.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Why fetching a sitemap failed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FetchError {
    /// Transport failure: DNS, refused connection, timeout, truncated body.
    #[error("network error: {message}")]
    Network { message: String },

    /// The server answered with a status >= 400.
    #[error("HTTP {status}")]
    Http { status: u16 },

    /// The (decoded) response body grew past the configured limit.
    #[error("response body exceeds {limit} bytes")]
    BodyTooLarge { limit: u64 },
}

impl FetchError {
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Self::Network { .. } | Self::BodyTooLarge { .. } => FailureKind::NetworkError,
            Self::Http { .. } => FailureKind::HttpError,
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        // Walk the source chain so "error sending request" carries the real cause.
        let mut message = err.to_string();
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            message.push_str(": ");
            message.push_str(&cause.to_string());
            source = cause.source();
        }
        Self::Network { message }
    }
}

/// Why a fetched document could not be parsed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractError {
    /// The content is not tag-structured markup at all.
    #[error("malformed XML: {reason}")]
    MalformedXml { reason: String },
}

impl ExtractError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedXml {
            reason: reason.into(),
        }
    }

    pub fn kind(&self) -> FailureKind {
        FailureKind::MalformedXml
    }
}

/// Invalid harvesting configuration.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ConfigError {
    #[error("concurrency must be greater than 0, got {0}")]
    InvalidConcurrency(usize),

    #[error("retry max_attempts must be greater than 0, got {0}")]
    InvalidMaxAttempts(u32),

    #[error("timeout_ms must be greater than 0")]
    InvalidTimeout,

    #[error("jitter_factor must be within 0.0..=1.0, got {0}")]
    InvalidJitter(f64),

    #[error("backoff_multiplier must be a finite number >= 1.0, got {0}")]
    InvalidBackoffMultiplier(f64),

    #[error("max_body_bytes must be greater than 0")]
    InvalidBodyLimit,
}

/// Misuse of a [`crate::pipeline::Pipeline`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("pipeline has already been started")]
    AlreadyStarted,
}

/// Category of a per-target failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FailureKind {
    NetworkError,
    HttpError,
    MalformedXml,
    /// The run was cancelled before this target was dispatched.
    Cancelled,
    /// The worker handling this target panicked.
    WorkerPanic,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetworkError => "NetworkError",
            Self::HttpError => "HttpError",
            Self::MalformedXml => "MalformedXml",
            Self::Cancelled => "Cancelled",
            Self::WorkerPanic => "WorkerPanic",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A recorded per-target failure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn cancelled() -> Self {
        Self::new(FailureKind::Cancelled, "run cancelled before dispatch")
    }
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

impl From<&FetchError> for Failure {
    fn from(err: &FetchError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}

impl From<&ExtractError> for Failure {
    fn from(err: &ExtractError) -> Self {
        Self::new(err.kind(), err.to_string())
    }
}
