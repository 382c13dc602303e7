use serde_json::{json, Value};

pub type ResourceResult<T> = Result<T, ResourceError>;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Failure of a resource operation, classified by who is at fault
#[derive(Debug, thiserror::Error)]
pub enum ResourceError {
    /// The request was malformed or missing required content
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    /// The resource exists already, or is not at the expected revision
    #[error("{0}")]
    PreconditionFailed(String),

    /// A collaborator behind the provider failed; the cause is kept
    #[error("{message}")]
    InternalServerError { message: String, source: BoxError },

    /// The provider deliberately does not implement the operation
    #[error("{0}")]
    NotSupported(String),
}

impl ResourceError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn precondition_failed(message: impl Into<String>) -> Self {
        Self::PreconditionFailed(message.into())
    }

    pub fn not_supported() -> Self {
        Self::NotSupported("Operation is not supported".to_string())
    }

    pub fn unknown_action(action: &str) -> Self {
        Self::NotSupported(format!("Unknown action {}", action))
    }

    /// Wrap a collaborator failure as a server-side fault
    pub fn internal<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::InternalServerError {
            message: error.to_string(),
            source: Box::new(error),
        }
    }

    /// HTTP-style status code
    pub fn code(&self) -> u16 {
        match self {
            Self::BadRequest(_) => 400,
            Self::NotFound(_) => 404,
            Self::PreconditionFailed(_) => 412,
            Self::InternalServerError { .. } => 500,
            Self::NotSupported(_) => 501,
        }
    }

    pub fn reason(&self) -> &'static str {
        match self {
            Self::BadRequest(_) => "Bad Request",
            Self::NotFound(_) => "Not Found",
            Self::PreconditionFailed(_) => "Precondition Failed",
            Self::InternalServerError { .. } => "Internal Server Error",
            Self::NotSupported(_) => "Not Implemented",
        }
    }

    /// True when the client caused the failure
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.code())
    }

    pub fn is_server_error(&self) -> bool {
        self.code() >= 500
    }

    /// `{"code", "reason", "message"}` rendering
    pub fn to_json(&self) -> Value {
        json!({
            "code": self.code(),
            "reason": self.reason(),
            "message": self.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn test_codes_and_classes() {
        let error = ResourceError::bad_request("Field to is not specified");
        assert_eq!(error.code(), 400);
        assert!(error.is_client_error());
        assert_eq!(error.to_string(), "Field to is not specified");

        let error = ResourceError::unknown_action("delete");
        assert_eq!(error.code(), 501);
        assert_eq!(error.to_string(), "Unknown action delete");
        assert!(!error.is_client_error());
    }

    #[test]
    fn test_internal_keeps_source() {
        let cause = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "connection refused");
        let error = ResourceError::internal(cause);

        assert!(error.is_server_error());
        assert_eq!(error.to_string(), "connection refused");
        assert!(error.source().is_some());
    }

    #[test]
    fn test_to_json() {
        let value = ResourceError::not_found("gone").to_json();
        assert_eq!(
            value,
            json!({"code": 404, "reason": "Not Found", "message": "gone"})
        );
    }
}
