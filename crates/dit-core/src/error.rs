use std::fmt;
use std::io;
use std::path::PathBuf;

/// Machine-readable error codes for scripts and agents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    RecordNotFound,
    RecordParseError,
    MissingExternalId,
    RecordWriteFailed,
    LockContention,
    InternalUnexpected,
}

impl ErrorCode {
    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::RecordNotFound => "E2001",
            Self::RecordParseError => "E2002",
            Self::MissingExternalId => "E3001",
            Self::RecordWriteFailed => "E5001",
            Self::LockContention => "E5002",
            Self::InternalUnexpected => "E9001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::RecordNotFound => "Record not found",
            Self::RecordParseError => "Record file could not be parsed",
            Self::MissingExternalId => "Imported record has no external id",
            Self::RecordWriteFailed => "Record write failed",
            Self::LockContention => "Lock contention",
            Self::InternalUnexpected => "Internal unexpected error",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix the TOML syntax in the config file named in the error."),
            Self::RecordNotFound => None,
            Self::RecordParseError => Some("Repair or remove the YAML file named in the error."),
            Self::MissingExternalId => {
                Some("Imported records must carry the foreign tracker's id as external_id.")
            }
            Self::RecordWriteFailed => Some("Check disk space and write permissions."),
            Self::LockContention => Some("Wait for the other import run to finish, then retry."),
            Self::InternalUnexpected => Some("Retry once. If persistent, report a bug with logs."),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Failures raised by a record store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("failed to write {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to encode record for {}: {source}", .path.display())]
    Encode {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("no record at {}", .path.display())]
    NotFound { path: PathBuf },
}

impl StoreError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Machine-readable code associated with this store error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Io { .. } => ErrorCode::RecordWriteFailed,
            Self::Encode { .. } => ErrorCode::InternalUnexpected,
            Self::Parse { .. } => ErrorCode::RecordParseError,
            Self::NotFound { .. } => ErrorCode::RecordNotFound,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ErrorCode, StoreError};
    use std::collections::HashSet;
    use std::io;

    #[test]
    fn all_codes_are_unique() {
        let all = [
            ErrorCode::ConfigParseError,
            ErrorCode::RecordNotFound,
            ErrorCode::RecordParseError,
            ErrorCode::MissingExternalId,
            ErrorCode::RecordWriteFailed,
            ErrorCode::LockContention,
            ErrorCode::InternalUnexpected,
        ];

        let mut seen = HashSet::new();
        for code in all {
            assert!(seen.insert(code.code()), "duplicate code {}", code.code());
        }
    }

    #[test]
    fn code_format_is_machine_friendly() {
        let code = ErrorCode::MissingExternalId.code();
        assert_eq!(code.len(), 5);
        assert!(code.starts_with('E'));
        assert!(code.chars().skip(1).all(|c| c.is_ascii_digit()));
    }

    #[test]
    fn store_io_error_names_the_path() {
        let err = StoreError::io(
            "/tmp/issues/x-abc1234/issue.yaml",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.code(), ErrorCode::RecordWriteFailed);
        assert!(err.to_string().contains("x-abc1234/issue.yaml"));
        assert!(err.code().hint().is_some());
    }
}
