//! Error types for object pooling
use thiserror::Error;

/// Boxed error returned by a pool's create callback.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Result type for pool operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for pool construction, population and checkout
#[derive(Error, Debug)]
pub enum Error {
    /// Pool configuration is invalid
    #[error("Configuration error: {message}")]
    Configuration {
        /// The error message
        message: String,
    },

    /// A mandatory lifecycle callback was not supplied
    #[error("Missing required '{callback}' callback")]
    MissingCallback {
        /// Name of the absent callback (`create`, `take` or `release`)
        callback: &'static str,
    },

    /// The create callback failed to produce a new item
    #[error("Failed to create pooled item: {source}")]
    Create {
        /// The underlying error
        #[source]
        source: BoxError,
    },

    /// An item's owning pool was assigned a second time
    #[error("Item is already bound to pool {owner}")]
    AlreadyBound {
        /// The pool the item was first bound to
        owner: String,
    },

    /// No pool is registered under the given name
    #[error("Unknown pool '{pool}'")]
    UnknownPool {
        /// The requested pool name
        pool: String,
    },

    /// A pool with the given name is already registered
    #[error("Pool '{pool}' is already registered")]
    DuplicatePool {
        /// The duplicated pool name
        pool: String,
    },
}

impl Error {
    /// Create a configuration error
    pub fn configuration<S: Into<String>>(message: S) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Wrap a create-callback failure
    pub fn create<E: Into<BoxError>>(source: E) -> Self {
        Self::Create {
            source: source.into(),
        }
    }

    /// Whether the create callback failed.
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(self, Self::Create { .. })
    }

    /// Get the pool name associated with this error (if any)
    #[must_use]
    pub fn pool(&self) -> Option<&str> {
        match self {
            Self::UnknownPool { pool } | Self::DuplicatePool { pool } => Some(pool),
            _ => None,
        }
    }
}
