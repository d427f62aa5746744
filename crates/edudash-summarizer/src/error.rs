//! Error types for the summarizer client.

/// Errors that can occur while building or sending a processing request.
///
/// [`SummarizerClient::process`](crate::SummarizerClient::process) folds
/// all of these into a failed [`ProcessResponse`](crate::ProcessResponse).
#[derive(Debug, thiserror::Error)]
pub enum SummarizerError {
    /// The upload has no file name or no content.
    #[error("file is empty")]
    EmptyUpload,

    /// Reading the upload from disk failed.
    #[error("could not read file: {0}")]
    Io(#[from] std::io::Error),

    /// The request could not be sent or the response not read.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The endpoint answered but reported a failure.
    #[error("{0}")]
    Rejected(String),
}
