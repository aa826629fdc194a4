//! Error types for the scan pipeline.

use std::fmt;
use thiserror::Error;

/// Rejected domain input.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("Domain is required")]
    Required,

    #[error("Invalid domain format")]
    InvalidFormat,
}

/// Errors raised by an AI provider call.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Configuration error (missing API key, invalid settings)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Network error (connection failed, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Non-success response from the backend
    #[error("{provider} API error: {status} {reason}")]
    Api {
        provider: String,
        status: u16,
        reason: String,
    },

    /// Response body could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Unknown AI provider: {0}")]
    UnknownProvider(String),
}

/// Structural problems in provider text.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("no JSON found in response")]
    NoJson,

    #[error("no JSON array found in response")]
    NoJsonArray,

    #[error("invalid JSON structure")]
    InvalidStructure,

    #[error("response is not an array")]
    NotAnArray,

    #[error("malformed JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Persistence failures.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("store lock poisoned")]
    Poisoned,

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("corrupt record {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("injected failure: {0}")]
    Injected(String),
}

/// Pipeline stage that produced a parse failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Discovery,
    Analysis,
    Recommendations,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Discovery => "Discovery",
            Self::Analysis => "Analysis",
            Self::Recommendations => "Recommendations",
        })
    }
}

/// Any failure of a scan.
#[derive(Debug, Error)]
pub enum ScanError {
    /// Rejected input; nothing was persisted
    #[error(transparent)]
    Validation(#[from] DomainError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error("{stage}: {source}")]
    Parse {
        stage: Stage,
        #[source]
        source: ParseError,
    },

    #[error("{context}: {source}")]
    Storage {
        context: &'static str,
        #[source]
        source: StoreError,
    },
}

impl ScanError {
    pub fn parse(stage: Stage, source: impl Into<ParseError>) -> Self {
        Self::Parse {
            stage,
            source: source.into(),
        }
    }

    pub fn storage(context: &'static str, source: StoreError) -> Self {
        Self::Storage { context, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_is_tagged_with_stage() {
        let err = ScanError::parse(Stage::Discovery, ParseError::NoJson);
        assert_eq!(err.to_string(), "Discovery: no JSON found in response");
    }

    #[test]
    fn test_provider_error_passes_through_verbatim() {
        let err: ScanError = ProviderError::Api {
            provider: "perplexity".into(),
            status: 429,
            reason: "Too Many Requests".into(),
        }
        .into();
        assert_eq!(err.to_string(), "perplexity API error: 429 Too Many Requests");
    }

    #[test]
    fn test_storage_error_carries_context() {
        let err = ScanError::storage("Failed to create scan", StoreError::NotFound("x".into()));
        assert_eq!(err.to_string(), "Failed to create scan: record not found: x");
    }
}
