use thiserror::Error;

pub type VaultResult<T> = Result<T, VaultError>;

/// Failures surfaced by vault operations.
///
/// All of them are recoverable: the caller retries with a new explicit
/// action. `AuthenticationFailure` carries no detail: a wrong passphrase and
/// a tampered blob look the same to the end user.
#[derive(Debug, Error)]
pub enum VaultError {
    #[error("passphrase must be at least {min} characters")]
    PassphraseTooShort { min: usize },

    #[error("passphrase confirmation does not match")]
    PassphraseMismatch,

    #[error("login failed")]
    AuthenticationFailure,

    #[error("malformed vault: {0}")]
    MalformedVault(String),

    #[error("invalid record: {0}")]
    Validation(String),

    #[error("record not found: {0}")]
    NotFound(String),

    #[error("no vault exists")]
    NoVault,

    #[error("a vault already exists")]
    VaultExists,

    #[error("vault is locked")]
    Locked,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}
