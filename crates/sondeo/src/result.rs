//! Result and error types for Sondeo.

use thiserror::Error;

/// Result type for Sondeo operations
pub type SondeoResult<T> = Result<T, SondeoError>;

/// Errors that can occur in Sondeo
#[derive(Debug, Error)]
pub enum SondeoError {
    /// Browser launch error
    #[error("Failed to launch browser: {message}")]
    BrowserLaunchError {
        /// Error message
        message: String,
    },

    /// Page error
    #[error("Page error: {message}")]
    PageError {
        /// Error message
        message: String,
    },

    /// Navigation error
    #[error("Navigation to {url} failed: {message}")]
    NavigationError {
        /// URL that failed
        url: String,
        /// Error message
        message: String,
    },

    /// Operation timed out
    #[error("Operation timed out after {ms}ms")]
    Timeout {
        /// Timeout in milliseconds
        ms: u64,
    },

    /// In-page script evaluation failed (malformed selector, detached frame)
    #[error("Script evaluation failed: {message}")]
    ScriptError {
        /// Error message
        message: String,
    },

    /// A candidate selector could not be built
    #[error("Invalid selector: {message}")]
    InvalidSelector {
        /// Error message
        message: String,
    },

    /// Every candidate for a logical field was tried and none was usable
    #[error("Field '{field}' not found on {page} (tried: {})", .tried.join(", "))]
    FieldNotFound {
        /// Page or operation the field belongs to
        page: String,
        /// Logical field name
        field: String,
        /// Locator expressions tried, in order
        tried: Vec<String>,
    },

    /// The element resolved but the action on it failed
    #[error("{action} on field '{field}' via {selector} failed: {message}")]
    ActionFailed {
        /// Logical field name
        field: String,
        /// Locator expression the handle was bound to
        selector: String,
        /// Action name (fill, click, select, check)
        action: String,
        /// Underlying engine message
        message: String,
    },

    /// The caller supplied a field the operation does not declare
    #[error("Operation '{operation}' has no field named '{field}'")]
    UnknownField {
        /// Operation name
        operation: String,
        /// Field name supplied by the caller
        field: String,
    },

    /// The caller supplied a value the field cannot take
    #[error("Invalid value '{value}' for field '{field}' (expected one of: {expected})")]
    InvalidValue {
        /// Logical field name
        field: String,
        /// Supplied value
        value: String,
        /// Accepted values
        expected: String,
    },

    /// Verdict did not pass under the operation's policy
    #[error("Operation '{operation}' did not succeed: {verdict}")]
    OperationFailed {
        /// Operation name
        operation: String,
        /// Rendered verdict with the signal that decided it
        verdict: String,
    },

    /// Screenshot error
    #[error("Screenshot failed: {message}")]
    ScreenshotError {
        /// Error message
        message: String,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl SondeoError {
    /// Create a page error
    #[must_use]
    pub fn page(message: impl Into<String>) -> Self {
        Self::PageError {
            message: message.into(),
        }
    }

    /// Create a script error
    #[must_use]
    pub fn script(message: impl Into<String>) -> Self {
        Self::ScriptError {
            message: message.into(),
        }
    }

    /// Whether this error is a resolution or action failure on a field
    #[must_use]
    pub const fn is_field_error(&self) -> bool {
        matches!(self, Self::FieldNotFound { .. } | Self::ActionFailed { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_not_found_lists_candidates() {
        let err = SondeoError::FieldNotFound {
            page: "login".to_string(),
            field: "username".to_string(),
            tried: vec!["#username".to_string(), "input[name=\"username\"]".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'username'"));
        assert!(msg.contains("login"));
        assert!(msg.contains("#username, input[name=\"username\"]"));
        assert!(err.is_field_error());
    }

    #[test]
    fn test_action_failed_names_selector() {
        let err = SondeoError::ActionFailed {
            field: "submit".to_string(),
            selector: "#login_button".to_string(),
            action: "click".to_string(),
            message: "node detached".to_string(),
        };
        assert!(err.to_string().starts_with("click on field 'submit'"));
        assert!(err.is_field_error());
    }

    #[test]
    fn test_operation_failed_is_not_field_error() {
        let err = SondeoError::OperationFailed {
            operation: "create_member".to_string(),
            verdict: "failure (error banner)".to_string(),
        };
        assert!(!err.is_field_error());
        assert!(err.to_string().contains("create_member"));
    }

    #[test]
    fn test_io_error_from() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: SondeoError = io_err.into();
        assert!(err.to_string().contains("I/O"));
    }
}
