use thiserror::Error;

pub type Result<T> = std::result::Result<T, KustoError>;

#[derive(Debug, Error)]
pub enum KustoError {
    #[error("Dependency injector not initialized. Call initialize() first.")]
    NotInitialized,

    #[error("Failed to load {name}: {source}")]
    LoadFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Ambiguous exports for {name}: {}", .candidates.join(", "))]
    AmbiguousExport {
        name: String,
        candidates: Vec<String>,
    },

    #[error("Failed to realize {name}: {source}")]
    RealizeFailed {
        name: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Server error: {0}")]
    Server(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl KustoError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }
}

impl axum::response::IntoResponse for KustoError {
    fn into_response(self) -> axum::response::Response {
        let status = match &self {
            KustoError::Config { .. } | KustoError::NotInitialized => {
                axum::http::StatusCode::SERVICE_UNAVAILABLE
            }
            _ => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, self.to_string()).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ambiguous_message_lists_candidates() {
        let err = KustoError::AmbiguousExport {
            name: "user".to_string(),
            candidates: vec!["helper".to_string(), "format".to_string()],
        };
        assert_eq!(err.to_string(), "Ambiguous exports for user: helper, format");
    }
}
