//! Client for the remote document-processing endpoint.
//!
//! The endpoint takes an uploaded document and returns a structured
//! summary: title, summary, sections, topics, insights, action items and
//! an optional mind map. The service itself is external; this crate only
//! speaks its request/response contract.
//!
//! Failures are values, not errors: [`SummarizerClient::process`] always
//! returns a [`ProcessResponse`], with `success == false` and a readable
//! `error` when anything went wrong (rejected upload, transport failure,
//! non-2xx status). Callers that prefer `Result` use
//! [`ProcessResponse::into_result`].

mod client;
mod error;
mod types;

pub use client::{SummarizerClient, interpret_response};
pub use error::SummarizerError;
pub use types::{DocumentSummary, ProcessResponse, Section, Upload};
