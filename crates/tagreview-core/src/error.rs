use std::fmt;

use crate::model::{ParseActionError, RowId};
use crate::store::StoreError;

/// Machine-readable error codes for scripts and agents driving the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    NotConfigured,
    ConfigParseError,
    RowNotFound,
    InvalidAction,
    LoadFailed,
    SaveFailed,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::NotConfigured => "E1001",
            Self::ConfigParseError => "E1002",
            Self::RowNotFound => "E2001",
            Self::InvalidAction => "E2005",
            Self::LoadFailed => "E4001",
            Self::SaveFailed => "E4002",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::NotConfigured => "Remote store not configured",
            Self::ConfigParseError => "Config file parse error",
            Self::RowNotFound => "Row not found",
            Self::InvalidAction => "Invalid action value",
            Self::LoadFailed => "Loading rows failed",
            Self::SaveFailed => "Saving changes failed",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::NotConfigured => Some(
                "Set TAGREVIEW_URL (or SUPABASE_URL) or add [store] url to .tagreview/config.toml.",
            ),
            Self::ConfigParseError => Some("Fix syntax in .tagreview/config.toml and retry."),
            Self::RowNotFound => Some("Run `tagreview list` to see the ids currently in the table."),
            Self::InvalidAction => Some("Use one of: approved, reject, unset."),
            Self::LoadFailed => Some("Check the store URL, API key, and network, then retry."),
            Self::SaveFailed => {
                Some("Pending edits were kept. Retry the save once the store is reachable.")
            }
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Errors surfaced by review operations.
#[derive(Debug, thiserror::Error)]
pub enum ReviewError {
    /// The remote listing failed; nothing can be shown.
    #[error("error fetching tags: {0}")]
    Load(#[source] StoreError),

    /// One or more row updates failed during a save.
    #[error("error saving {failed} record(s) of {total}")]
    Save {
        /// Number of update calls that failed.
        failed: usize,
        /// Number of update calls issued.
        total: usize,
    },

    /// Action text outside the enumeration.
    #[error(transparent)]
    Validation(#[from] ParseActionError),

    /// An edit referenced a row that is not loaded.
    #[error("row {0} not found")]
    RowNotFound(RowId),

    /// No store URL was configured.
    #[error("remote store URL is not configured")]
    NotConfigured,
}

impl ReviewError {
    #[must_use]
    pub const fn error_code(&self) -> ErrorCode {
        match self {
            Self::Load(_) => ErrorCode::LoadFailed,
            Self::Save { .. } => ErrorCode::SaveFailed,
            Self::Validation(_) => ErrorCode::InvalidAction,
            Self::RowNotFound(_) => ErrorCode::RowNotFound,
            Self::NotConfigured => ErrorCode::NotConfigured,
        }
    }

    /// Remediation text for operators.
    #[must_use]
    pub fn suggestion(&self) -> String {
        self.error_code()
            .hint()
            .unwrap_or("No suggestion available.")
            .to_string()
    }
}
