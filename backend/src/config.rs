//! Publisher configuration.
//!
//! Credentials and endpoints are resolved once by the CLI (flags, then
//! environment / `.env`) and handed to the publishers at construction.
//! Publishers never read the environment themselves.

use crate::error::{PublishError, PublishResult};

/// Production Zenodo REST API.
pub const ZENODO_API: &str = "https://zenodo.org/api";

/// Zenodo sandbox REST API.
pub const ZENODO_SANDBOX_API: &str = "https://sandbox.zenodo.org/api";

/// Resolver used to fetch citation metadata for a DOI.
pub const DOI_RESOLVER: &str = "https://doi.org";

/// GitHub REST API.
pub const GITHUB_API: &str = "https://api.github.com";

/// GitHub API version header value.
pub const GITHUB_API_VERSION: &str = "2022-11-28";

/// Settings for the dataset registry publisher.
#[derive(Debug, Clone)]
pub struct ZenodoConfig {
    pub token: String,
    pub api_base: String,
    pub doi_resolver: String,
}

impl ZenodoConfig {
    /// Sandbox unless `production` is set.
    pub fn new(token: Option<String>, production: bool) -> PublishResult<Self> {
        let token = non_empty(token).ok_or(PublishError::MissingToken("Zenodo"))?;
        let api_base = if production { ZENODO_API } else { ZENODO_SANDBOX_API };
        Ok(Self {
            token,
            api_base: api_base.to_string(),
            doi_resolver: DOI_RESOLVER.to_string(),
        })
    }

    /// Token-less settings, enough for citation lookups through the DOI resolver.
    pub fn anonymous() -> Self {
        Self {
            token: String::new(),
            api_base: ZENODO_SANDBOX_API.to_string(),
            doi_resolver: DOI_RESOLVER.to_string(),
        }
    }

    /// Point the publisher at another API root (mock servers, mirrors).
    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn with_doi_resolver(mut self, resolver: impl Into<String>) -> Self {
        self.doi_resolver = resolver.into().trim_end_matches('/').to_string();
        self
    }

    pub fn is_sandbox(&self) -> bool {
        self.api_base == ZENODO_SANDBOX_API
    }
}

/// Settings for the release publisher.
#[derive(Debug, Clone)]
pub struct GitHubConfig {
    pub token: String,
    pub owner: String,
    pub repo: String,
    pub api_base: String,
}

impl GitHubConfig {
    pub fn new(token: Option<String>, owner: &str, repo: &str) -> PublishResult<Self> {
        let token = non_empty(token).ok_or(PublishError::MissingToken("GitHub"))?;
        if owner.is_empty() || repo.is_empty() {
            return Err(PublishError::InvalidRepository(format!("{}/{}", owner, repo)));
        }
        Ok(Self {
            token,
            owner: owner.to_string(),
            repo: repo.to_string(),
            api_base: GITHUB_API.to_string(),
        })
    }

    /// Build from an `owner/name` slug such as `GITHUB_REPOSITORY`.
    pub fn from_repository(token: Option<String>, repository: &str) -> PublishResult<Self> {
        match repository.trim().split_once('/') {
            Some((owner, repo)) if !repo.contains('/') => Self::new(token, owner, repo),
            _ => Err(PublishError::InvalidRepository(repository.to_string())),
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = api_base.into().trim_end_matches('/').to_string();
        self
    }

    pub fn repo_url(&self) -> String {
        format!("{}/repos/{}/{}", self.api_base, self.owner, self.repo)
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}
