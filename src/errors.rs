use std::fmt;

/// Pipeline-specific error types.
#[derive(Debug)]
pub enum PipelineError {
    /// A primary source (loan CSV or customer table) could not be loaded.
    /// Always fatal to the run.
    SourceLoad(String),
    /// Database-related errors.
    Database(sqlx::Error),
    /// A credit-score fetch failed after retries. Recoverable at the
    /// record level: the caller degrades that record to null score fields.
    RemoteFetch(String),
    /// A local artifact (snapshot or transformed output) could not be written.
    Storage(String),
    /// Object-store upload failed. Recoverable: the local artifact remains valid.
    Publish(String),
    /// Validation issues exceeded the configured gate threshold.
    QualityGate(String),
    /// Error with context chain for better debugging.
    WithContext {
        /// The underlying source of the error.
        source: Box<PipelineError>,
        /// Additional context message.
        context: String,
    },
}

impl fmt::Display for PipelineError {
    /// Formats the error for display.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineError::SourceLoad(msg) => write!(f, "Source load failed: {}", msg),
            PipelineError::Database(e) => write!(f, "Database error: {}", e),
            PipelineError::RemoteFetch(msg) => write!(f, "Remote fetch failed: {}", msg),
            PipelineError::Storage(msg) => write!(f, "Storage error: {}", msg),
            PipelineError::Publish(msg) => write!(f, "Publish failed: {}", msg),
            PipelineError::QualityGate(msg) => write!(f, "Quality gate: {}", msg),
            PipelineError::WithContext { source, context } => {
                write!(f, "{}: {}", context, source)
            }
        }
    }
}

impl std::error::Error for PipelineError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            PipelineError::Database(e) => Some(e),
            PipelineError::WithContext { source, .. } => Some(source.as_ref()),
            _ => None,
        }
    }
}

impl From<sqlx::Error> for PipelineError {
    /// Converts a `sqlx::Error` into a `PipelineError`.
    fn from(err: sqlx::Error) -> Self {
        PipelineError::Database(err)
    }
}

impl From<reqwest::Error> for PipelineError {
    /// Converts a `reqwest::Error` into a `PipelineError`.
    fn from(err: reqwest::Error) -> Self {
        PipelineError::RemoteFetch(err.to_string())
    }
}

impl From<std::io::Error> for PipelineError {
    /// Converts a filesystem error into a `PipelineError`.
    fn from(err: std::io::Error) -> Self {
        PipelineError::Storage(err.to_string())
    }
}

/// Extension trait for adding context to errors.
/// Similar to `anyhow::Context` but for our `PipelineError` type.
pub trait ResultExt<T> {
    /// Add context to an error.
    ///
    /// # Arguments
    ///
    /// * `context` - The context message to add.
    fn context(self, context: impl Into<String>) -> Result<T, PipelineError>;

    /// Add context lazily (only evaluated on error).
    ///
    /// # Arguments
    ///
    /// * `f` - A closure that produces the context message.
    #[allow(dead_code)]
    fn with_context<F>(self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T, PipelineError> {
    fn context(self, context: impl Into<String>) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(e),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(e),
            context: f(),
        })
    }
}

/// Extension for sqlx::Error to add context
impl<T> ResultExt<T> for Result<T, sqlx::Error> {
    fn context(self, context: impl Into<String>) -> Result<T, PipelineError> {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(PipelineError::Database(e)),
            context: context.into(),
        })
    }

    fn with_context<F>(self, f: F) -> Result<T, PipelineError>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| PipelineError::WithContext {
            source: Box::new(PipelineError::Database(e)),
            context: f(),
        })
    }
}
