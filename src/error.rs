//! Error taxonomy for the graph engine.
//!
//! [`MindError`] is what every core operation returns. Durable-store failures
//! carry the entity that was being written; mirror-store failures use the
//! separate [`MirrorWriteError`] so they can never be confused with a fatal
//! error on the way up. [`sanitize_message`] strips filesystem paths before an
//! error is shown to a caller.

use regex::Regex;
use std::sync::LazyLock;

/// Crate-wide result alias.
pub type Result<T, E = MindError> = std::result::Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum MindError {
    /// Malformed or out-of-range caller input. Rejected before storage is touched.
    #[error("{message}")]
    Validation {
        message: String,
        /// The threshold or limit that caused the rejection, when there is one.
        limit: Option<f64>,
    },

    /// An entity explicitly requested by identity does not exist.
    #[error("{0} not found")]
    NotFound(String),

    /// The durable backend rejected a write. The whole unit of work was rolled back.
    #[error("durable write failed for {entity}: {source}")]
    DurableWrite {
        entity: String,
        #[source]
        source: rusqlite::Error,
    },

    /// Read or schema failure on either backend.
    #[error("storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("catalog error: {0}")]
    Catalog(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// An optional augmentation service failed or is not configured.
    #[error("augmentation unavailable: {0}")]
    Augment(String),
}

impl MindError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            limit: None,
        }
    }

    pub fn validation_with_limit(message: impl Into<String>, limit: f64) -> Self {
        Self::Validation {
            message: message.into(),
            limit: Some(limit),
        }
    }

    pub fn durable(entity: impl Into<String>, source: rusqlite::Error) -> Self {
        Self::DurableWrite {
            entity: entity.into(),
            source,
        }
    }

    /// The limit attached to a validation failure.
    pub fn limit(&self) -> Option<f64> {
        match self {
            Self::Validation { limit, .. } => *limit,
            _ => None,
        }
    }

    /// Caller-facing message with internal paths removed.
    pub fn sanitized(&self) -> String {
        sanitize_message(&self.to_string())
    }
}

/// A failed write to the fast (mirror) backend. Never fatal; the durable write
/// already succeeded.
#[derive(Debug, thiserror::Error)]
#[error("mirror write failed for {entity}: {source}")]
pub struct MirrorWriteError {
    pub entity: String,
    #[source]
    pub source: rusqlite::Error,
}

static UNIX_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(^|[\s"'(=:])(?:/[^/\s"']+)+/"#).expect("static regex")
});

static WINDOWS_PATH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\b[a-z]:\\(?:[^\\\s"']+(?: [^\\\s"':]+)*\\)*"#).expect("static regex")
});

/// Strip directory components of absolute paths, keeping the file name.
///
/// `"open /home/admin/app/data.db failed"` becomes `"open data.db failed"`.
pub fn sanitize_message(message: &str) -> String {
    let without_windows = WINDOWS_PATH.replace_all(message, "");
    UNIX_PATH.replace_all(&without_windows, "$1").into_owned()
}
