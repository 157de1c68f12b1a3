use thiserror::Error;

/// Structural failures of the pipeline. None of these are retried.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("source unavailable: {url}: {reason}")]
    SourceUnavailable { url: String, reason: String },
    #[error("malformed input: {0}")]
    MalformedInput(String),
    #[error("empty result: {0}")]
    EmptyResult(String),
    #[error("count for zone '{zone}' is {count}, log10 needs a positive count")]
    DomainError { zone: String, count: i64 },
    #[error("{context}: {source}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

impl PipelineError {
    pub fn malformed(msg: impl Into<String>) -> Self {
        PipelineError::MalformedInput(msg.into())
    }

    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        PipelineError::Io {
            context: context.into(),
            source,
        }
    }
}

pub type Result<T, E = PipelineError> = std::result::Result<T, E>;
