//! Provisioning error types.

use crate::config::ConfigError;
use crate::gateway::GatewayError;
use derive_more::{Display, Error};
use tracing::{error, instrument};

/// What stopped game creation.
#[derive(Debug, Clone, Display)]
pub enum ProvisioningErrorKind {
    /// The router already knows a game with this name.
    #[display("Game with name {} already registered", _0)]
    NameTaken(String),
    /// A single remote call failed.
    #[display("{}", _0)]
    Gateway(GatewayError),
    /// A retried step kept failing.
    #[display("{} failed after {} attempts: {}", step, attempts, last)]
    RetriesExhausted {
        /// Step that was retried.
        step: &'static str,
        /// Attempts made.
        attempts: u32,
        /// Last failure.
        last: String,
    },
    /// A provisioning artifact could not be fetched.
    #[display("Artifact unavailable: {}", _0)]
    Artifact(String),
    /// Required configuration is missing.
    #[display("{}", _0)]
    Config(ConfigError),
}

/// Provisioning error with location tracking.
#[derive(Debug, Clone, Display, Error)]
#[display("Provisioning error: {} at {}:{}", kind, file, line)]
pub struct ProvisioningError {
    /// Error kind.
    pub kind: ProvisioningErrorKind,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ProvisioningError {
    /// Creates a new provisioning error.
    #[track_caller]
    #[instrument(skip(kind))]
    pub fn new(kind: ProvisioningErrorKind) -> Self {
        error!(error = %kind, "Provisioning failed");
        let loc = std::panic::Location::caller();
        Self {
            kind,
            line: loc.line(),
            file: loc.file(),
        }
    }

    /// Whether the name was already taken.
    pub fn is_name_taken(&self) -> bool {
        matches!(self.kind, ProvisioningErrorKind::NameTaken(_))
    }
}

impl From<GatewayError> for ProvisioningError {
    #[track_caller]
    fn from(err: GatewayError) -> Self {
        Self::new(ProvisioningErrorKind::Gateway(err))
    }
}

impl From<ConfigError> for ProvisioningError {
    #[track_caller]
    fn from(err: ConfigError) -> Self {
        Self::new(ProvisioningErrorKind::Config(err))
    }
}
