//! Request and response types for the processing endpoint.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::SummarizerError;

// ---------------------------------------------------------------------------
// Upload
// ---------------------------------------------------------------------------

/// A document to process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Upload {
    pub file_name: String,
    /// MIME type sent with the file part. The endpoint sniffs content
    /// when this is `None`.
    pub mime: Option<String>,
    pub bytes: Vec<u8>,
}

impl Upload {
    pub fn new(file_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            file_name: file_name.into(),
            mime: None,
            bytes: bytes.into(),
        }
    }

    pub fn mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }

    /// Reads a file from disk. The upload is named after the file.
    pub async fn from_path(path: impl AsRef<Path>) -> Result<Self, SummarizerError> {
        let path = path.as_ref();
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Ok(Self::new(file_name, bytes))
    }

    /// Rejects uploads the endpoint would refuse anyway.
    pub fn validate(&self) -> Result<(), SummarizerError> {
        if self.file_name.trim().is_empty() || self.bytes.is_empty() {
            return Err(SummarizerError::EmptyUpload);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Response
// ---------------------------------------------------------------------------

/// One section of a processed document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default, alias = "heading")]
    pub title: String,
    #[serde(default, alias = "summary")]
    pub content: String,
}

/// The structured result of processing a document.
///
/// Every list defaults to empty so a sparse payload still decodes.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSummary {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub sections: Vec<Section>,
    #[serde(default)]
    pub topics: Vec<String>,
    #[serde(default)]
    pub insights: Vec<String>,
    #[serde(default)]
    pub action_items: Vec<String>,
    /// Free-form mind map tree; rendered by the caller.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mindmap: Option<serde_json::Value>,
    /// Extracted plain text of the document.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// The endpoint's response envelope.
///
/// ```rust
/// use edudash_summarizer::ProcessResponse;
///
/// let failed = ProcessResponse::failure("bad file");
/// assert!(!failed.success);
/// assert_eq!(failed.error.as_deref(), Some("bad file"));
/// ```
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ProcessResponse {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<DocumentSummary>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ProcessResponse {
    pub fn success(data: DocumentSummary) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error.into()),
        }
    }

    /// Converts the envelope into a `Result`.
    ///
    /// A `success: true` response without `data` is treated as a
    /// failure: there is nothing to show.
    pub fn into_result(self) -> Result<DocumentSummary, SummarizerError> {
        match (self.success, self.data) {
            (true, Some(data)) => Ok(data),
            (true, None) => Err(SummarizerError::Rejected("response carried no data".into())),
            (false, _) => Err(SummarizerError::Rejected(
                self.error.unwrap_or_else(|| "unknown error".into()),
            )),
        }
    }
}
