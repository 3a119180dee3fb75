//! HTTP client abstraction for search sources

#[cfg(feature = "http")]
mod client;

#[cfg(feature = "http")]
pub use client::HttpClient;

use std::collections::HashMap;
use std::time::Duration;

use thiserror::Error;

use crate::retry::Transient;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum HttpError {
    #[error("Request failed: {message}")]
    RequestFailed { message: String },
    #[error("Invalid URL: {url}")]
    InvalidUrl { url: String },
    #[error("Timeout")]
    Timeout,
    #[error("Rate limited")]
    RateLimited { retry_after: Option<Duration> },
    #[error("HTTP status {status}")]
    Status { status: u16 },
    #[error("Parse error: {message}")]
    ParseError { message: String },
}

impl Transient for HttpError {
    /// Network trouble, timeouts, rate limits and 5xx are worth retrying
    fn is_transient(&self) -> bool {
        match self {
            HttpError::RequestFailed { .. } | HttpError::Timeout | HttpError::RateLimited { .. } => {
                true
            }
            HttpError::Status { status } => *status >= 500,
            HttpError::InvalidUrl { .. } | HttpError::ParseError { .. } => false,
        }
    }

    fn retry_after(&self) -> Option<Duration> {
        match self {
            HttpError::RateLimited { retry_after } => *retry_after,
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
    pub headers: HashMap<String, String>,
}

impl HttpResponse {
    /// Turn non-2xx responses into errors
    pub fn error_for_status(self) -> Result<Self, HttpError> {
        if (200..300).contains(&self.status) {
            Ok(self)
        } else {
            Err(HttpError::Status {
                status: self.status,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(HttpError::Timeout.is_transient());
        assert!(HttpError::Status { status: 503 }.is_transient());
        assert!(!HttpError::Status { status: 404 }.is_transient());
        assert!(!HttpError::ParseError {
            message: "bad".to_string()
        }
        .is_transient());
        assert_eq!(
            HttpError::RateLimited {
                retry_after: Some(Duration::from_secs(3))
            }
            .retry_after(),
            Some(Duration::from_secs(3))
        );
    }

    #[test]
    fn test_error_for_status() {
        let ok = HttpResponse {
            status: 200,
            body: String::new(),
            headers: HashMap::new(),
        };
        assert!(ok.error_for_status().is_ok());

        let server_error = HttpResponse {
            status: 502,
            body: String::new(),
            headers: HashMap::new(),
        };
        assert_eq!(
            server_error.error_for_status().unwrap_err(),
            HttpError::Status { status: 502 }
        );
    }
}
