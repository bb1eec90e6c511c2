//! Publishing adapters.
//!
//! - [`zenodo`] - versioned dataset deposits with a DOI, plus citations
//! - [`github`] - code-hosting releases with the files attached
//!
//! Both take their configuration explicitly (see [`crate::config`]) and
//! return [`PublishError`]s that the pipeline treats as non-fatal.

pub mod github;
pub mod zenodo;

use std::path::Path;

use crate::error::{PublishError, PublishResult};

pub use github::{GitHubPublisher, Release, ReleaseRequest};
pub use zenodo::{
    citation_from_parts, DepositMetadata, DepositRequest, Deposition, MetadataOverrides,
    ZenodoPublisher,
};

/// Turn a non-success response into [`PublishError::Api`].
pub(crate) async fn ensure_success(
    service: &'static str,
    response: reqwest::Response,
) -> PublishResult<reqwest::Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(PublishError::Api {
        service,
        status: status.as_u16(),
        body,
    })
}

/// File name used for an uploaded attachment.
pub(crate) fn attachment_name(path: &Path) -> PublishResult<String> {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(str::to_string)
        .ok_or_else(|| {
            PublishError::Io(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("no file name in '{}'", path.display()),
            ))
        })
}
