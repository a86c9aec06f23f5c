use thiserror::Error;

/// Failures of the derivation engine and the site record policy.
///
/// Boundary code carries these inside `anyhow::Error`; `main` downcasts to
/// tell a silent abort apart from a reportable failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DerivationError {
    #[error("invalid site record: {0}")]
    InvalidRecord(String),

    #[error("site nickname should be at least {min} characters, got `{nick}`")]
    InvalidNickname { nick: String, min: usize },

    /// Creation with an identity field still at its placeholder value.
    #[error("{field} left as default value `{placeholder}`. If you mean it, use --force | -f to make this change")]
    UnconfirmedDefault {
        field: &'static str,
        placeholder: &'static str,
    },

    #[error("site `{0}` is already in the config file, use --force | -f flag to modify existing site")]
    WouldOverwrite(String),

    #[error("site `{0}` not present in the config")]
    UnknownSite(String),

    /// The derived password does not hash to the stored check digest:
    /// wrong master secret or an edited record.
    #[error("check digest mismatch: wrong master secret or modified site record")]
    CheckMismatch,

    #[error("aborted by user")]
    AbortedByUser,
}
