use std::fmt;

use protocol::CodecError;

/// Coarse classification of a failed call, used by the aggregation layer and
/// in log lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureKind {
    Network,
    Auth,
    Server,
    Rejected,
    MalformedPayload,
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FailureKind::Network => "network",
            FailureKind::Auth => "auth",
            FailureKind::Server => "server",
            FailureKind::Rejected => "rejected",
            FailureKind::MalformedPayload => "malformed-payload",
        };
        f.write_str(label)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// Bad input, detected locally or refused by the backend on register.
    #[error("{0}")]
    Validation(String),

    /// Bad credentials at login.
    #[error("{0}")]
    Auth(String),

    /// Wrong, malformed or expired email verification code.
    #[error("{0}")]
    Verification(String),

    /// 401 on an authenticated call. The session has already been cleared.
    #[error("Session expired. Please login to continue.")]
    AuthExpired,

    #[error("Network error: {message}")]
    Network { message: String, timeout: bool },

    #[error("Server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// 4xx other than 401.
    #[error("Request rejected ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("Malformed payload: {0}")]
    MalformedPayload(#[from] CodecError),

    #[error("Invalid session: token is empty")]
    InvalidSession,

    #[error("Configuration error: {0}")]
    Config(String),
}

impl ClientError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ClientError::Network { .. } => FailureKind::Network,
            ClientError::AuthExpired
            | ClientError::Auth(_)
            | ClientError::InvalidSession => FailureKind::Auth,
            ClientError::Server { .. } | ClientError::Config(_) => FailureKind::Server,
            ClientError::Validation(_)
            | ClientError::Verification(_)
            | ClientError::Rejected { .. } => FailureKind::Rejected,
            ClientError::MalformedPayload(_) => FailureKind::MalformedPayload,
        }
    }

    /// Message suitable for inline display next to a form.
    pub fn user_message(&self) -> String {
        match self {
            ClientError::Rejected { message, .. } | ClientError::Server { message, .. } => {
                message.clone()
            }
            other => other.to_string(),
        }
    }

    pub fn is_auth_expired(&self) -> bool {
        matches!(self, ClientError::AuthExpired)
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn kinds_match_taxonomy() {
        assert_eq!(ClientError::AuthExpired.kind(), FailureKind::Auth);
        assert_eq!(
            ClientError::Network {
                message: "timed out".into(),
                timeout: true
            }
            .kind(),
            FailureKind::Network
        );
        assert_eq!(
            ClientError::Server {
                status: 503,
                message: "down".into()
            }
            .kind(),
            FailureKind::Server
        );
        assert_eq!(
            ClientError::MalformedPayload(CodecError::Missing).kind(),
            FailureKind::MalformedPayload
        );
    }

    #[test]
    fn user_message_strips_status_prefix() {
        let err = ClientError::Rejected {
            status: 400,
            message: "Email already in use".into(),
        };
        assert_eq!(err.user_message(), "Email already in use");
        assert_eq!(
            ClientError::Verification("Invalid verification code".into()).user_message(),
            "Invalid verification code"
        );
    }

    #[test]
    fn failure_kind_display() {
        assert_eq!(FailureKind::MalformedPayload.to_string(), "malformed-payload");
    }
}
