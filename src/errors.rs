use chrono::{DateTime, Utc};
use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum CmError {
    #[error("I/O error: {0}")]
    #[diagnostic(code(consentd::io))]
    Io(#[from] std::io::Error),

    #[error("Config error: {0}")]
    #[diagnostic(code(consentd::config))]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    #[diagnostic(code(consentd::serde))]
    Serde(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    #[diagnostic(code(consentd::db))]
    Db(#[from] sea_orm::DbErr),

    #[error("JOSE error: {0}")]
    #[diagnostic(code(consentd::jose))]
    Jose(String),

    /// The consent request token was not signed by any trusted key.
    #[error("Signature verification failed against every trusted key")]
    #[diagnostic(code(consentd::invalid_signature))]
    InvalidSignature,

    /// The token verified but its payload is not a usable consent request.
    #[error("Invalid consent request: {0}")]
    #[diagnostic(code(consentd::invalid_consent_request))]
    InvalidConsentRequest(String),

    /// A stored record claims to be from the future relative to `now`.
    #[error("Clock skew: record created at {created_at} is later than now ({now})")]
    #[diagnostic(code(consentd::clock_skew))]
    ClockSkew {
        created_at: DateTime<Utc>,
        now: DateTime<Utc>,
    },

    #[error("{0}")]
    #[diagnostic(code(consentd::other))]
    Other(String),
}

impl From<josekit::JoseError> for CmError {
    fn from(value: josekit::JoseError) -> Self {
        CmError::Jose(value.to_string())
    }
}
