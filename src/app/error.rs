use std::fmt;

use thiserror::Error;

/// Which sync pipeline an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Episodes,
    Sources,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Episodes => "episodes",
            Stage::Sources => "sources",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    Timeout,
    Status(u16),
    Transport(String),
}

impl fmt::Display for FetchCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FetchCause::Timeout => f.write_str("timeout"),
            FetchCause::Status(code) => write!(f, "HTTP {}", code),
            FetchCause::Transport(msg) => f.write_str(msg),
        }
    }
}

/// A failed remote retrieval. Never retried by the fetcher itself.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Failed to fetch {stage} from {url}: {cause}")]
pub struct FetchError {
    pub stage: Stage,
    pub url: String,
    pub cause: FetchCause,
}

impl FetchError {
    pub fn from_reqwest(stage: Stage, url: &str, err: reqwest::Error) -> Self {
        let cause = if err.is_timeout() {
            FetchCause::Timeout
        } else if let Some(status) = err.status() {
            FetchCause::Status(status.as_u16())
        } else {
            FetchCause::Transport(err.to_string())
        };

        Self {
            stage,
            url: url.to_string(),
            cause,
        }
    }
}

#[derive(Error, Debug)]
pub enum PodcacheError {
    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Store unavailable: {0}")]
    StoreUnavailable(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl PodcacheError {
    /// Whether the error means the backing store cannot be used at all.
    pub fn is_unavailable(&self) -> bool {
        matches!(
            self,
            PodcacheError::StoreUnavailable(_) | PodcacheError::Database(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, PodcacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_error_display_includes_stage_and_cause() {
        let err = FetchError {
            stage: Stage::Episodes,
            url: "https://example.com/items".into(),
            cause: FetchCause::Status(502),
        };
        assert_eq!(
            err.to_string(),
            "Failed to fetch episodes from https://example.com/items: HTTP 502"
        );

        let err = FetchError {
            stage: Stage::Sources,
            url: "https://example.com/opml".into(),
            cause: FetchCause::Timeout,
        };
        assert!(err.to_string().ends_with("timeout"));
    }

    #[test]
    fn test_unavailable_classification() {
        assert!(PodcacheError::StoreUnavailable("gone".into()).is_unavailable());
        assert!(PodcacheError::Database(rusqlite::Error::InvalidQuery).is_unavailable());
        assert!(!PodcacheError::NotFound("x".into()).is_unavailable());
    }
}
