// MIT License - Copyright (c) 2026 Peter Wright

use std::path::PathBuf;

/// All errors that can occur in the spc-web-bridge library.
#[derive(Debug, thiserror::Error)]
pub enum SpcError {
    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("state directory {} is not usable", path.display())]
    StateDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no panel session available")]
    NoSession,

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("panel returned HTTP {code}")]
    Status { code: u16 },

    #[error("page {page} has no '{action}' button for entity {entity}")]
    ActionNotFound {
        page: &'static str,
        action: &'static str,
        entity: String,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("session cache format error: {0}")]
    CacheFormat(#[from] serde_json::Error),
}

impl SpcError {
    /// Whether this error is transient and the next tick should simply retry.
    ///
    /// Only configuration errors and an unusable state directory are fatal;
    /// everything else is recoverable by the next scan or command.
    pub fn is_transient(&self) -> bool {
        !matches!(self, SpcError::Config(_) | SpcError::StateDir { .. })
    }
}

pub type Result<T> = std::result::Result<T, SpcError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(SpcError::NoSession.is_transient());
        assert!(SpcError::Status { code: 503 }.is_transient());
        assert!(!SpcError::Config("bad qos".into()).is_transient());
        assert!(
            !SpcError::StateDir {
                path: "/var/lib/acre_exp".into(),
                source: std::io::Error::from(std::io::ErrorKind::PermissionDenied),
            }
            .is_transient()
        );
    }
}
