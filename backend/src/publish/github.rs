//! GitHub release publisher.
//!
//! Creates a release for a dataset tag and attaches the tidy table, the
//! raw source and the parser source as release assets.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::{attachment_name, ensure_success};
use crate::config::{GitHubConfig, GITHUB_API_VERSION};
use crate::error::PublishResult;
use crate::logs::{log_info, log_info_indent, log_success, log_warning};

const SERVICE: &str = "GitHub";

/// What to release.
#[derive(Debug, Clone, Default)]
pub struct ReleaseRequest {
    pub tag: String,
    pub title: Option<String>,
    pub body: Option<String>,
    pub draft: bool,
    pub prerelease: bool,
    /// Appended to the body as a citation section.
    pub doi: Option<String>,
    /// Files to attach. Missing files are skipped.
    pub assets: Vec<PathBuf>,
}

impl ReleaseRequest {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Self::default()
        }
    }

    pub fn resolved_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| format!("Dataset Release: {}", self.tag))
    }

    pub fn resolved_body(&self) -> String {
        let mut body = self.body.clone().unwrap_or_else(|| {
            format!(
                "Dataset release created on {}",
                Utc::now().format("%Y-%m-%d")
            )
        });
        if let Some(ref doi) = self.doi {
            body.push_str(&format!(
                "\n\n## Digital Object Identifier\n\nThis dataset is also available with DOI: [{doi}](https://doi.org/{doi})"
            ));
        }
        body
    }
}

#[derive(Debug, Serialize)]
struct CreateRelease<'a> {
    tag_name: &'a str,
    name: String,
    body: String,
    draft: bool,
    prerelease: bool,
}

/// A created release (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct Release {
    pub id: u64,
    #[serde(default)]
    pub html_url: String,
    pub upload_url: String,
    #[serde(default)]
    pub assets: Vec<ReleaseAsset>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReleaseAsset {
    pub id: u64,
    pub name: String,
    #[serde(default)]
    pub browser_download_url: String,
}

/// GitHub REST client for one repository.
#[derive(Clone)]
pub struct GitHubPublisher {
    config: GitHubConfig,
    client: reqwest::Client,
}

impl GitHubPublisher {
    pub fn new(config: GitHubConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    fn request(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        builder
            .header("Accept", "application/vnd.github+json")
            .header("Authorization", format!("Bearer {}", self.config.token))
            .header("X-GitHub-Api-Version", GITHUB_API_VERSION)
            .header("User-Agent", concat!("legistats/", env!("CARGO_PKG_VERSION")))
    }

    /// Create the release, then upload every existing asset.
    pub async fn create_release(&self, request: &ReleaseRequest) -> PublishResult<Release> {
        log_info(format!(
            "🏷️  Creating release {} on {}/{}",
            request.tag, self.config.owner, self.config.repo
        ));

        let payload = CreateRelease {
            tag_name: &request.tag,
            name: request.resolved_title(),
            body: request.resolved_body(),
            draft: request.draft,
            prerelease: request.prerelease,
        };

        let response = self
            .request(self.client.post(format!("{}/releases", self.config.repo_url())))
            .json(&payload)
            .send()
            .await?;
        let mut release: Release = ensure_success(SERVICE, response).await?.json().await?;

        for path in &request.assets {
            if !path.exists() {
                log_warning(format!("Skipping missing asset {}", path.display()));
                continue;
            }
            let asset = self.upload_asset(&release.upload_url, path).await?;
            release.assets.push(asset);
        }

        log_success(format!(
            "Release {} created with {} asset(s)",
            request.tag,
            release.assets.len()
        ));
        Ok(release)
    }

    async fn upload_asset(&self, upload_url: &str, path: &Path) -> PublishResult<ReleaseAsset> {
        let filename = attachment_name(path)?;
        let bytes = tokio::fs::read(path).await?;
        log_info_indent(format!("Attaching {} ({} bytes)", filename, bytes.len()), 1);

        let response = self
            .request(self.client.post(asset_upload_url(upload_url)))
            .query(&[("name", filename.as_str())])
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }
}

/// Strip the `{?name,label}` URI template suffix from an upload URL.
pub fn asset_upload_url(upload_url: &str) -> &str {
    upload_url.split('{').next().unwrap_or(upload_url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::tempdir;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> GitHubPublisher {
        let config = GitHubConfig::from_repository(Some("gh-token".into()), "eurlex/stats")
            .unwrap()
            .with_api_base(server.uri());
        GitHubPublisher::new(config)
    }

    #[test]
    fn test_upload_url_template_stripped() {
        assert_eq!(
            asset_upload_url("https://uploads.github.com/repos/o/r/releases/1/assets{?name,label}"),
            "https://uploads.github.com/repos/o/r/releases/1/assets"
        );
        assert_eq!(asset_upload_url("https://x/assets"), "https://x/assets");
    }

    #[test]
    fn test_default_title_and_doi_body() {
        let mut request = ReleaseRequest::new("dataset-2023_05");
        request.body = Some("Monthly data".into());
        request.doi = Some("10.5281/zenodo.42".into());

        assert_eq!(request.resolved_title(), "Dataset Release: dataset-2023_05");
        let body = request.resolved_body();
        assert!(body.starts_with("Monthly data\n\n## Digital Object Identifier"));
        assert!(body.contains("[10.5281/zenodo.42](https://doi.org/10.5281/zenodo.42)"));
    }

    #[tokio::test]
    async fn test_release_with_assets() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let csv = dir.path().join("legislative_acts_2023_05.csv");
        std::fs::write(&csv, "year,month\n").unwrap();

        Mock::given(method("POST"))
            .and(path("/repos/eurlex/stats/releases"))
            .and(header("Authorization", "Bearer gh-token"))
            .and(body_partial_json(json!({ "tag_name": "dataset-2023_05", "draft": false })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 1,
                "html_url": "https://github.com/eurlex/stats/releases/tag/dataset-2023_05",
                "upload_url": format!("{}/uploads/releases/1/assets{{?name,label}}", server.uri())
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/uploads/releases/1/assets"))
            .and(query_param("name", "legislative_acts_2023_05.csv"))
            .and(header("Content-Type", "application/octet-stream"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 11,
                "name": "legislative_acts_2023_05.csv"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = ReleaseRequest::new("dataset-2023_05");
        request.assets = vec![csv, dir.path().join("not_there.rs")];

        let release = publisher(&server).create_release(&request).await.unwrap();
        assert_eq!(release.assets.len(), 1);
        assert_eq!(release.assets[0].name, "legislative_acts_2023_05.csv");
    }

    #[tokio::test]
    async fn test_release_conflict_is_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/repos/eurlex/stats/releases"))
            .respond_with(ResponseTemplate::new(422).set_body_string("already_exists"))
            .mount(&server)
            .await;

        let err = publisher(&server)
            .create_release(&ReleaseRequest::new("dataset-2023_05"))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("already_exists"));
    }
}
