//! Gateway error types.

use derive_more::{Display, Error};
use tracing::{error, instrument, warn};

/// What went wrong with a remote call.
#[derive(Debug, Clone, PartialEq, Eq, Display)]
pub enum GatewayErrorKind {
    /// The network could not deliver the message, or the reply was unusable.
    #[display("Remote call failed: {}", _0)]
    RemoteCall(String),
    /// The remote process answered with error output.
    #[display("{}", _0)]
    RemoteRejection(String),
}

/// Remote call error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("{} at {}:{}", kind, file, line)]
pub struct GatewayError {
    /// Error kind.
    pub kind: GatewayErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl GatewayError {
    /// Creates a transport-level error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn remote_call(message: impl Into<String>) -> Self {
        let message = message.into();
        error!(error_message = %message, "Remote call failed");
        Self::with_kind(GatewayErrorKind::RemoteCall(message))
    }

    /// Creates an error carrying the remote process's rejection text.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn rejection(message: impl Into<String>) -> Self {
        let message = message.into();
        warn!(error_message = %message, "Remote process rejected action");
        Self::with_kind(GatewayErrorKind::RemoteRejection(message))
    }

    #[track_caller]
    fn with_kind(kind: GatewayErrorKind) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Whether the remote process explicitly rejected the action.
    pub fn is_rejection(&self) -> bool {
        matches!(self.kind, GatewayErrorKind::RemoteRejection(_))
    }

    /// Message suitable for showing to the player.
    pub fn user_message(&self) -> String {
        match &self.kind {
            GatewayErrorKind::RemoteRejection(message) => message.clone(),
            GatewayErrorKind::RemoteCall(_) => "Something went wrong, please try again.".to_string(),
        }
    }
}

impl From<reqwest::Error> for GatewayError {
    #[track_caller]
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::remote_call(format!("Timed out: {}", err))
        } else {
            Self::remote_call(format!("HTTP error: {}", err))
        }
    }
}

impl From<serde_json::Error> for GatewayError {
    #[track_caller]
    fn from(err: serde_json::Error) -> Self {
        Self::remote_call(format!("Undecodable response: {}", err))
    }
}
