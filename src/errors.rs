use thiserror::Error;

/// Boxed cause attached to initialization and operation failures.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All errors that can occur in Lockbox.
///
/// The first four variants are the vault's own failure modes; callers are
/// expected to match on them. The remaining ones belong to the outer
/// layers (builder, settings file, CLI).
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Vault errors ---
    /// The vault could not be brought into a usable state.
    #[error("Vault initialization failed: {message}")]
    Initialization {
        message: String,
        #[source]
        source: Option<BoxError>,
    },

    /// The persisted file is malformed or its MAC does not match.
    #[error("Vault file is corrupted: {0}")]
    Corrupted(String),

    /// A single operation failed; the vault remains usable.
    #[error("{message}")]
    Operation {
        message: String,
        #[source]
        source: BoxError,
    },

    /// The entry is not in the vault (or is stale).
    #[error("No such key '{0}' in the vault")]
    NotFound(String),

    // --- Builder / config errors ---
    #[error("Invalid vault configuration: {0}")]
    InvalidConfig(String),

    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl VaultError {
    /// Build an `Initialization` error with an underlying cause.
    pub fn initialization(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Initialization {
            message: message.into(),
            source: Some(source.into()),
        }
    }

    /// Build an `Operation` error with an underlying cause.
    pub fn operation(message: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Operation {
            message: message.into(),
            source: source.into(),
        }
    }

    /// Shorthand for a structural `Corrupted` error.
    pub fn corrupted(detail: impl Into<String>) -> Self {
        Self::Corrupted(detail.into())
    }

    /// Returns `true` for the corruption variant.
    pub fn is_corrupted(&self) -> bool {
        matches!(self, Self::Corrupted(_))
    }
}

/// Convenience type alias for Lockbox results.
pub type Result<T> = std::result::Result<T, VaultError>;
