//! HTTP client for the processing endpoint.

use edudash_protocol::UserId;
use reqwest::multipart::{Form, Part};

use crate::{ProcessResponse, SummarizerError, Upload};

/// Talks to one processing endpoint.
///
/// Cheap to clone: `reqwest::Client` is reference-counted internally.
#[derive(Debug, Clone)]
pub struct SummarizerClient {
    http: reqwest::Client,
    endpoint: String,
}

impl SummarizerClient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self::with_client(reqwest::Client::new(), endpoint)
    }

    pub fn with_client(http: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            http,
            endpoint: endpoint.into(),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Uploads `upload` on behalf of `user` and returns the endpoint's
    /// verdict.
    ///
    /// Never fails: every error becomes `{ success: false, error }`. The
    /// request is not sent at all for an empty upload.
    pub async fn process(&self, upload: Upload, user: &UserId, access_token: &str) -> ProcessResponse {
        let file_name = upload.file_name.clone();
        match self.send(upload, user, access_token).await {
            Ok(response) => {
                if response.success {
                    tracing::info!(%file_name, user_id = %user, "document processed");
                } else {
                    tracing::warn!(%file_name, user_id = %user, error = ?response.error, "processing failed");
                }
                response
            }
            Err(e) => {
                tracing::warn!(%file_name, user_id = %user, error = %e, "processing request failed");
                ProcessResponse::failure(e.to_string())
            }
        }
    }

    async fn send(&self, upload: Upload, user: &UserId, access_token: &str) -> Result<ProcessResponse, SummarizerError> {
        upload.validate()?;

        let mut part = Part::bytes(upload.bytes).file_name(upload.file_name);
        if let Some(mime) = &upload.mime {
            part = part.mime_str(mime)?;
        }
        let form = Form::new()
            .part("file", part)
            .text("userId", user.to_string());

        let resp = self
            .http
            .post(&self.endpoint)
            .bearer_auth(access_token)
            .multipart(form)
            .send()
            .await?;
        let status = resp.status().as_u16();
        let body = resp.bytes().await?;

        Ok(interpret_response(status, &body))
    }
}

/// Maps a raw HTTP status and body to a [`ProcessResponse`].
///
/// - 2xx: the body is the envelope itself.
/// - anything else: the message comes from a JSON `{"error": ...}` body
///   when there is one, else `Request failed with status <code>`.
///
/// ```rust
/// use edudash_summarizer::interpret_response;
///
/// let r = interpret_response(500, br#"{"error":"bad file"}"#);
/// assert!(!r.success);
/// assert_eq!(r.error.as_deref(), Some("bad file"));
/// ```
pub fn interpret_response(status: u16, body: &[u8]) -> ProcessResponse {
    if (200..300).contains(&status) {
        return serde_json::from_slice::<ProcessResponse>(body).unwrap_or_else(|e| {
            tracing::warn!(status, error = %e, "unreadable processing response");
            ProcessResponse::failure("Invalid response from server")
        });
    }

    let message = serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(|e| e.as_str()).map(str::to_owned))
        .filter(|m| !m.is_empty());
    ProcessResponse::failure(message.unwrap_or_else(|| format!("Request failed with status {status}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interpret_success_envelope() {
        let body = br#"{"success":true,"data":{"title":"Cells","summary":"s","topics":["biology"]}}"#;

        let r = interpret_response(200, body);

        assert!(r.success);
        let data = r.data.unwrap();
        assert_eq!(data.title, "Cells");
        assert_eq!(data.topics, vec!["biology"]);
    }

    #[test]
    fn test_interpret_500_with_json_error() {
        let r = interpret_response(500, br#"{"error":"bad file"}"#);
        assert_eq!(r, ProcessResponse::failure("bad file"));
    }

    #[test]
    fn test_interpret_non_json_error_body_uses_status() {
        let r = interpret_response(502, b"<html>Bad Gateway</html>");
        assert_eq!(r.error.as_deref(), Some("Request failed with status 502"));
    }

    #[test]
    fn test_interpret_json_without_error_field_uses_status() {
        let r = interpret_response(404, br#"{"message":"nope"}"#);
        assert_eq!(r.error.as_deref(), Some("Request failed with status 404"));
    }

    #[test]
    fn test_interpret_2xx_garbage_is_failure() {
        let r = interpret_response(200, b"not json");
        assert!(!r.success);
    }

    #[test]
    fn test_interpret_2xx_envelope_reporting_failure_passes_through() {
        let r = interpret_response(200, br#"{"success":false,"error":"unsupported format"}"#);
        assert_eq!(r.error.as_deref(), Some("unsupported format"));
    }
}
