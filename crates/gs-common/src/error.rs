//! Error types for the GeoServer configuration client.

use thiserror::Error;

/// Result type alias using GsError.
pub type GsResult<T> = Result<T, GsError>;

/// Primary error type for catalog operations.
#[derive(Debug, Error)]
pub enum GsError {
    // === Field Errors ===
    /// A present XML element could not be parsed into its declared type.
    #[error("Cannot convert field '{field}': {message}")]
    Conversion { field: String, message: String },

    #[error("Unknown field '{field}' for resource type '{resource_type}'")]
    UnknownField {
        resource_type: String,
        field: String,
    },

    #[error("Field '{field}' expects a {expected} value")]
    TypeMismatch { field: String, expected: String },

    // === Remote Errors ===
    /// Any non-success HTTP status, or a request that never produced a response.
    #[error("{}", failed_request_message(.status, .url, .body))]
    FailedRequest {
        status: Option<u16>,
        url: String,
        body: String,
    },

    #[error("Server gave an unparseable response for [{url}]: {message}")]
    MalformedResponse { url: String, message: String },

    // === Catalog Errors ===
    #[error("Conflicting data: {0}")]
    ConflictingData(String),

    #[error("Ambiguous request: {0}")]
    AmbiguousRequest(String),

    #[error("Upload failed: {0}")]
    Upload(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

fn failed_request_message(status: &Option<u16>, url: &str, body: &str) -> String {
    match status {
        Some(code) => format!("Request to {} failed: {}, {}", url, code, body),
        None => format!("Request to {} failed without a response: {}", url, body),
    }
}

impl GsError {
    pub fn conversion(field: impl Into<String>, message: impl Into<String>) -> Self {
        GsError::Conversion {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn failed_request(status: u16, url: impl Into<String>, body: impl Into<String>) -> Self {
        GsError::FailedRequest {
            status: Some(status),
            url: url.into(),
            body: body.into(),
        }
    }

    /// The HTTP status carried by a failed request, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            GsError::FailedRequest { status, .. } => *status,
            _ => None,
        }
    }

    /// True when the server answered 404.
    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// True when the response body mentions a missing workspace.
    ///
    /// Listing endpoints under a deleted workspace answer with a plain text
    /// body rather than a 404 on some server versions.
    pub fn is_missing_workspace(&self, workspace: &str) -> bool {
        match self {
            GsError::FailedRequest { body, .. } => {
                let body = body.to_lowercase();
                body.contains("no such workspace")
                    || body.contains(&format!("workspace {} not found", workspace.to_lowercase()))
            }
            _ => false,
        }
    }
}

impl From<serde_json::Error> for GsError {
    fn from(err: serde_json::Error) -> Self {
        GsError::MalformedResponse {
            url: String::new(),
            message: format!("JSON error: {}", err),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_detection() {
        let err = GsError::failed_request(404, "http://localhost/rest/layers/x.xml", "No such layer");
        assert!(err.is_not_found());
        assert_eq!(err.status(), Some(404));

        let refused = GsError::FailedRequest {
            status: None,
            url: "http://localhost/rest".to_string(),
            body: "connection refused".to_string(),
        };
        assert!(!refused.is_not_found());
        assert_eq!(refused.status(), None);
    }

    #[test]
    fn test_missing_workspace_detection() {
        let err = GsError::failed_request(404, "u", "No such workspace: 'gone'");
        assert!(err.is_missing_workspace("gone"));

        let err = GsError::failed_request(404, "u", "Workspace Gone not found");
        assert!(err.is_missing_workspace("gone"));

        let err = GsError::failed_request(500, "u", "boom");
        assert!(!err.is_missing_workspace("gone"));
    }

    #[test]
    fn test_display_carries_status_and_body() {
        let err = GsError::failed_request(500, "http://h/rest/x", "internal");
        let msg = err.to_string();
        assert!(msg.contains("500"));
        assert!(msg.contains("internal"));
    }
}
