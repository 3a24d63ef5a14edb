use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error {status}: {message}")]
    Api { status: u16, message: String },

    #[error("{0} is not a valid name of a GitHub repository")]
    InvalidRepoName(String),

    #[error("Commit parsing error: {0}")]
    CommitParse(String),

    #[error("Git command failed: {0}")]
    Git(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Input is missing column `{0}`")]
    MissingColumn(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// HTTP status code carried by the error, if any
    pub fn status(&self) -> Option<u16> {
        match self {
            Error::Api { status, .. } => Some(*status),
            Error::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Get a sanitized error message safe for logging
    /// Filters out potentially sensitive information
    pub fn log_safe(&self) -> String {
        match self {
            // HTTP errors might contain authenticated URLs
            Error::Http(_) => "External HTTP request failed".to_string(),

            Error::Config(msg) | Error::Internal(msg) => {
                let lower = msg.to_lowercase();
                if lower.contains("token") || lower.contains("password") || lower.contains("secret")
                {
                    "Error details redacted".to_string()
                } else {
                    self.to_string()
                }
            }

            _ => self.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_from_api_error() {
        let err = Error::Api {
            status: 422,
            message: "Validation Failed".to_string(),
        };
        assert_eq!(err.status(), Some(422));
        assert_eq!(Error::NotFound("x".to_string()).status(), None);
    }

    #[test]
    fn test_log_safe_redacts_tokens() {
        let err = Error::Config("Invalid token: abc123".to_string());
        assert_eq!(err.log_safe(), "Error details redacted");

        let err = Error::Config("Invalid HTTP_TIMEOUT value".to_string());
        assert_eq!(err.log_safe(), "Configuration error: Invalid HTTP_TIMEOUT value");
    }
}
