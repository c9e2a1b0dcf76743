pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A required option is missing from every layer, or a collaborator
    /// (client, tool) is not available.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The job could not be encoded, a token could not be decoded, or a
    /// stored payload failed its integrity check.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// A function path or registry key does not resolve.
    #[error("resolution error: {0}")]
    Resolution(String),

    #[error("backend `{backend}` failed to submit the job: {source}")]
    Submission {
        backend: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("storage error: {0}")]
    Storage(#[source] anyhow::Error),

    #[error("job `{func}` failed: {source}")]
    Job {
        func: String,
        #[source]
        source: anyhow::Error,
    },
}

impl Error {
    pub(crate) fn submission(backend: &str, source: impl Into<anyhow::Error>) -> Self {
        Error::Submission {
            backend: backend.to_string(),
            source: source.into(),
        }
    }
}
