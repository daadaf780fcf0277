use reqwest::StatusCode;
use thiserror::Error;

/// Failure of a single page fetch
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// Timeouts, connection resets, overloaded servers
    #[error("transient transport failure: {0}")]
    Transient(String),

    #[error("resource not found (HTTP {0})")]
    NotFound(u16),

    #[error("request rejected (HTTP {0})")]
    Rejected(u16),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("rendering failed: {0}")]
    Rendering(String),
}

impl FetchError {
    /// Only transient failures are worth another attempt
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Transient(_))
    }

    /// Classify a non-success HTTP status
    pub fn from_status(status: StatusCode) -> Self {
        let code = status.as_u16();
        match status {
            StatusCode::NOT_FOUND | StatusCode::GONE => Self::NotFound(code),
            StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
                Self::Transient(format!("HTTP {code}"))
            }
            s if s.is_server_error() => Self::Transient(format!("HTTP {code}")),
            _ => Self::Rejected(code),
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_builder() {
            return Self::InvalidRequest(err.to_string());
        }

        match err.status() {
            Some(status) => Self::from_status(status),
            None => Self::Transient(err.to_string()),
        }
    }
}

/// Programming or configuration errors; these abort a run
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },

    #[error("invalid selector `{selector}` for {site}")]
    InvalidSelector { site: String, selector: String },

    #[error("no site adapter registered for competitor {0}")]
    UnknownCompetitor(String),

    #[error("{0} requires a rendering transport but none is available")]
    MissingRenderer(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(FetchError::from_status(StatusCode::NOT_FOUND), FetchError::NotFound(404));
        assert_eq!(FetchError::from_status(StatusCode::GONE), FetchError::NotFound(410));
        assert!(FetchError::from_status(StatusCode::BAD_GATEWAY).is_transient());
        assert!(FetchError::from_status(StatusCode::TOO_MANY_REQUESTS).is_transient());
        assert_eq!(FetchError::from_status(StatusCode::FORBIDDEN), FetchError::Rejected(403));
        assert!(!FetchError::NotFound(404).is_transient());
        assert!(!FetchError::Rendering("crash".into()).is_transient());
    }
}
