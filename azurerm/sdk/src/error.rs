//! Error types for Resource Manager requests

use std::fmt;

use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The error envelope returned by most Resource Manager endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorEnvelope {
    pub error: OdataError,
}

/// An OData style error body, `{"code": ..., "message": ..., "details": [...]}`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OdataError {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub details: Vec<OdataError>,
}

impl fmt::Display for OdataError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.code, &self.message) {
            (Some(code), Some(message)) => write!(f, "{code}: {message}")?,
            (Some(code), None) => write!(f, "{code}")?,
            (None, Some(message)) => write!(f, "{message}")?,
            (None, None) => write!(f, "unknown error")?,
        }
        for detail in &self.details {
            write!(f, "\n  - {detail}")?;
        }
        Ok(())
    }
}

pub type Result<T> = core::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("sending {method} request to {url}: {source}")]
    Transport {
        method: String,
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("unexpected status {status} for {method} {url} with {}", describe_body(.error, .body))]
    UnexpectedStatus {
        status: StatusCode,
        method: String,
        url: String,
        error: Option<OdataError>,
        body: String,
    },

    #[error("decoding response from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("encoding request body: {0}")]
    Encode(#[source] serde_json::Error),

    #[error("building request URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("obtaining an access token: {0}")]
    Authorization(String),

    #[error("long running operation finished with status {status:?}{}", .error.as_ref().map(|e| format!(": {e}")).unwrap_or_default())]
    PollingFailed {
        status: String,
        error: Option<OdataError>,
    },

    #[error("long running operation was cancelled before it completed")]
    PollingCancelled,

    #[error("the environment {0:?} is not known")]
    UnknownEnvironment(String),

    #[error(transparent)]
    Id(#[from] azurerm_ids::ParseError),
}

fn describe_body(error: &Option<OdataError>, body: &str) -> String {
    match error {
        Some(error) => format!("error: {error}"),
        None if body.is_empty() => "an empty response body".to_string(),
        None => format!("response body: {body}"),
    }
}

impl Error {
    /// The HTTP status for errors produced by an unexpected response
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Error::UnexpectedStatus { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn was_not_found(&self) -> bool {
        self.status() == Some(StatusCode::NOT_FOUND)
    }

    pub fn was_conflict(&self) -> bool {
        self.status() == Some(StatusCode::CONFLICT)
    }

    pub fn was_throttled(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    /// The ARM error code, e.g. `ResourceGroupNotFound`
    pub fn code(&self) -> Option<&str> {
        match self {
            Error::UnexpectedStatus { error, .. } | Error::PollingFailed { error, .. } => {
                error.as_ref().and_then(|e| e.code.as_deref())
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_decodes_nested_details() {
        let body = r#"{"error":{"code":"InvalidTemplate","message":"bad","details":[{"code":"Inner","message":"worse"}]}}"#;
        let envelope: ErrorEnvelope = serde_json::from_str(body).unwrap();

        assert_eq!(envelope.error.code.as_deref(), Some("InvalidTemplate"));
        assert_eq!(envelope.error.details.len(), 1);
        assert_eq!(envelope.error.to_string(), "InvalidTemplate: bad\n  - Inner: worse");
    }

    #[test]
    fn unexpected_status_mentions_code() {
        let err = Error::UnexpectedStatus {
            status: StatusCode::NOT_FOUND,
            method: "GET".to_string(),
            url: "https://management.azure.com/x".to_string(),
            error: Some(OdataError {
                code: Some("ResourceGroupNotFound".to_string()),
                message: Some("Resource group 'rg' could not be found.".to_string()),
                ..Default::default()
            }),
            body: String::new(),
        };

        assert!(err.was_not_found());
        assert!(!err.was_conflict());
        assert_eq!(err.code(), Some("ResourceGroupNotFound"));
        assert!(err.to_string().contains("404 Not Found"));
        assert!(err.to_string().contains("ResourceGroupNotFound: Resource group 'rg' could not be found."));
    }

    #[test]
    fn unexpected_status_falls_back_to_raw_body() {
        let err = Error::UnexpectedStatus {
            status: StatusCode::BAD_GATEWAY,
            method: "PUT".to_string(),
            url: "https://management.azure.com/x".to_string(),
            error: None,
            body: "<html>gateway</html>".to_string(),
        };

        assert!(err.to_string().ends_with("response body: <html>gateway</html>"));
    }
}
