//! Zenodo dataset registry publisher.
//!
//! Creates (or versions) a deposition, uploads the tidy table and its
//! companion files to the deposition bucket, publishes it and returns the
//! minted DOI. Also formats citations for a DOI.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use legistats::config::ZenodoConfig;
//! use legistats::publish::{DepositRequest, ZenodoPublisher};
//!
//! let publisher = ZenodoPublisher::new(ZenodoConfig::new(Some(token), false)?);
//! let request = DepositRequest::new("data/legislative_acts_2023_05.csv", "2023_05");
//! let deposition = publisher.create_or_update_deposit(&request).await?;
//! let citation = publisher.generate_citation(&deposition.doi, None).await?;
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::{Path, PathBuf};

use super::{attachment_name, ensure_success};
use crate::config::ZenodoConfig;
use crate::error::{PublishError, PublishResult};
use crate::logs::{log_info, log_info_indent, log_success, log_warning};
use crate::models::{format_dataset_date, Citation};
use crate::validation::validate_deposit_metadata;

const SERVICE: &str = "Zenodo";

/// Default creator when none is given.
pub const DEFAULT_CREATOR: &str = "EurLex Legal Acts Statistics Project";

/// Default keywords of every deposit.
pub const DEFAULT_KEYWORDS: [&str; 5] = ["EU", "legislation", "statistics", "legal acts", "EurLex"];

/// A deposit creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Creator {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub affiliation: Option<String>,
}

impl Creator {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            affiliation: None,
        }
    }
}

/// Deposition metadata as sent to the registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DepositMetadata {
    pub title: String,
    pub description: String,
    pub upload_type: String,
    pub creators: Vec<Creator>,
    pub access_right: String,
    pub license: String,
    pub keywords: Vec<String>,
    pub publication_date: String,
}

impl DepositMetadata {
    /// Defaults for a monthly dataset, e.g. `"2023_05"` → "May 2023".
    pub fn defaults(dataset_date: &str, parsing_timestamp: Option<&str>) -> Self {
        let period = format_dataset_date(dataset_date);
        let title = match parsing_timestamp {
            Some(ts) => format!("EU Legislative Acts Statistics - {} (Parsed: {})", period, ts),
            None => format!("EU Legislative Acts Statistics - {}", period),
        };
        let description = match parsing_timestamp {
            Some(ts) => format!(
                "Monthly statistics of EU legislative acts for {}. Parsed on {}.",
                period, ts
            ),
            None => format!("Monthly statistics of EU legislative acts for {}.", period),
        };

        Self {
            title,
            description,
            upload_type: "dataset".to_string(),
            creators: vec![Creator::named(DEFAULT_CREATOR)],
            access_right: "open".to_string(),
            license: "cc-by".to_string(),
            keywords: DEFAULT_KEYWORDS.iter().map(|k| k.to_string()).collect(),
            publication_date: Utc::now().format("%Y-%m-%d").to_string(),
        }
    }

    /// Replace defaults with whatever the user supplied.
    pub fn merged(mut self, overrides: &MetadataOverrides) -> Self {
        if let Some(ref title) = overrides.title {
            self.title = title.clone();
        }
        if let Some(ref description) = overrides.description {
            self.description = description.clone();
        }
        if let Some(ref creators) = overrides.creators {
            self.creators = creators.iter().map(Creator::named).collect();
        }
        if let Some(ref keywords) = overrides.keywords {
            self.keywords = keywords.clone();
        }
        if let Some(ref license) = overrides.license {
            self.license = license.clone();
        }
        self
    }

    /// Creator names joined for citations.
    pub fn authors(&self) -> String {
        self.creators
            .iter()
            .map(|c| c.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

/// User-supplied metadata. `None` keeps the default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MetadataOverrides {
    pub title: Option<String>,
    pub description: Option<String>,
    pub creators: Option<Vec<String>>,
    pub keywords: Option<Vec<String>>,
    pub license: Option<String>,
}

impl MetadataOverrides {
    /// Split a comma separated CLI list, dropping blanks.
    pub fn split_list(value: &str) -> Vec<String> {
        value
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// What to deposit.
#[derive(Debug, Clone)]
pub struct DepositRequest {
    /// Tidy table (always uploaded).
    pub csv_path: PathBuf,
    /// Dataset date string, `YYYY_MM` by convention.
    pub dataset_date: String,
    pub parsing_timestamp: Option<String>,
    /// Raw source copy, parser source, ... Missing files are skipped.
    pub companion_files: Vec<PathBuf>,
    pub overrides: MetadataOverrides,
    /// Version this deposition instead of creating a new one.
    pub existing_deposit_id: Option<u64>,
}

impl DepositRequest {
    pub fn new(csv_path: impl Into<PathBuf>, dataset_date: impl Into<String>) -> Self {
        Self {
            csv_path: csv_path.into(),
            dataset_date: dataset_date.into(),
            parsing_timestamp: None,
            companion_files: Vec::new(),
            overrides: MetadataOverrides::default(),
            existing_deposit_id: None,
        }
    }

    pub fn metadata(&self) -> DepositMetadata {
        DepositMetadata::defaults(&self.dataset_date, self.parsing_timestamp.as_deref())
            .merged(&self.overrides)
    }
}

/// Deposition as returned by the API (only the fields we use).
#[derive(Debug, Clone, Deserialize)]
pub struct Deposition {
    pub id: u64,
    /// Empty until published.
    #[serde(default)]
    pub doi: String,
    #[serde(default)]
    pub links: DepositionLinks,
    #[serde(default)]
    pub files: Vec<DepositionFile>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DepositionLinks {
    pub bucket: Option<String>,
    pub latest_draft: Option<String>,
    #[serde(rename = "self")]
    pub self_link: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DepositionFile {
    pub id: String,
    pub filename: String,
    #[serde(default)]
    pub links: DepositionLinks,
}

/// Zenodo REST client.
#[derive(Clone)]
pub struct ZenodoPublisher {
    config: ZenodoConfig,
    client: reqwest::Client,
}

impl ZenodoPublisher {
    pub fn new(config: ZenodoConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    pub fn config(&self) -> &ZenodoConfig {
        &self.config
    }

    fn depositions_url(&self) -> String {
        format!("{}/deposit/depositions", self.config.api_base)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.config.token)
    }

    /// Create a new deposit, or a new version of `existing_deposit_id`,
    /// upload the files and publish it.
    pub async fn create_or_update_deposit(
        &self,
        request: &DepositRequest,
    ) -> PublishResult<Deposition> {
        let metadata = request.metadata();
        let metadata_json = serde_json::to_value(&metadata)?;
        validate_deposit_metadata(&metadata_json).map_err(PublishError::InvalidMetadata)?;

        log_info(format!(
            "📡 {} deposit on {}",
            if request.existing_deposit_id.is_some() { "Versioning" } else { "Creating" },
            self.config.api_base
        ));

        let draft = match request.existing_deposit_id {
            Some(id) => self.new_version(id, &metadata_json).await?,
            None => self.create_deposition(&metadata_json).await?,
        };
        log_info_indent(format!("Draft deposition: {}", draft.id), 1);

        let bucket = draft
            .links
            .bucket
            .clone()
            .ok_or_else(|| PublishError::InvalidResponse("deposition has no bucket link".into()))?;

        self.upload_file(&bucket, &request.csv_path).await?;
        for path in &request.companion_files {
            if path.exists() {
                self.upload_file(&bucket, path).await?;
            } else {
                log_warning(format!("Skipping missing attachment {}", path.display()));
            }
        }

        let published = self.publish(draft.id).await?;
        if published.doi.is_empty() {
            return Err(PublishError::InvalidResponse(
                "published deposition carries no DOI".into(),
            ));
        }
        log_success(format!("DOI minted: {}", published.doi));
        Ok(published)
    }

    async fn create_deposition(&self, metadata: &Value) -> PublishResult<Deposition> {
        let response = self
            .client
            .post(self.depositions_url())
            .header("Authorization", self.bearer())
            .json(&json!({ "metadata": metadata }))
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        Ok(response.json().await?)
    }

    /// Open a new version draft, clear inherited files, set metadata.
    async fn new_version(&self, deposit_id: u64, metadata: &Value) -> PublishResult<Deposition> {
        let response = self
            .client
            .post(format!(
                "{}/{}/actions/newversion",
                self.depositions_url(),
                deposit_id
            ))
            .header("Authorization", self.bearer())
            .send()
            .await?;
        let response = ensure_success(SERVICE, response).await?;
        let parent: Deposition = response.json().await?;

        let draft_url = parent.links.latest_draft.ok_or_else(|| {
            PublishError::InvalidResponse("new version has no latest_draft link".into())
        })?;

        let response = self
            .client
            .get(&draft_url)
            .header("Authorization", self.bearer())
            .send()
            .await?;
        let draft: Deposition = ensure_success(SERVICE, response).await?.json().await?;

        for file in &draft.files {
            let url = file.links.self_link.clone().unwrap_or_else(|| {
                format!("{}/{}/files/{}", self.depositions_url(), draft.id, file.id)
            });
            log_info_indent(format!("Removing inherited file {}", file.filename), 1);
            let response = self
                .client
                .delete(url)
                .header("Authorization", self.bearer())
                .send()
                .await?;
            ensure_success(SERVICE, response).await?;
        }

        let response = self
            .client
            .put(format!("{}/{}", self.depositions_url(), draft.id))
            .header("Authorization", self.bearer())
            .json(&json!({ "metadata": metadata }))
            .send()
            .await?;
        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    async fn upload_file(&self, bucket_url: &str, path: &Path) -> PublishResult<()> {
        let filename = attachment_name(path)?;
        let bytes = tokio::fs::read(path).await?;
        log_info_indent(format!("Uploading {} ({} bytes)", filename, bytes.len()), 1);

        let response = self
            .client
            .put(format!("{}/{}", bucket_url.trim_end_matches('/'), filename))
            .header("Authorization", self.bearer())
            .header("Content-Type", "application/octet-stream")
            .body(bytes)
            .send()
            .await?;
        ensure_success(SERVICE, response).await?;
        Ok(())
    }

    async fn publish(&self, deposit_id: u64) -> PublishResult<Deposition> {
        let response = self
            .client
            .post(format!(
                "{}/{}/actions/publish",
                self.depositions_url(),
                deposit_id
            ))
            .header("Authorization", self.bearer())
            .send()
            .await?;
        Ok(ensure_success(SERVICE, response).await?.json().await?)
    }

    /// Citation strings for `doi`.
    ///
    /// Uses `known` metadata when given, otherwise asks the DOI resolver
    /// for CSL-JSON.
    pub async fn generate_citation(
        &self,
        doi: &str,
        known: Option<&DepositMetadata>,
    ) -> PublishResult<Citation> {
        if let Some(metadata) = known {
            return Ok(citation_from_parts(
                doi,
                &metadata.authors(),
                &metadata.title,
                &metadata.publication_date,
            ));
        }

        let response = self
            .client
            .get(format!("{}/{}", self.config.doi_resolver, doi))
            .header("Accept", "application/vnd.citationstyles.csl+json")
            .send()
            .await?;
        let csl: CslItem = ensure_success("DOI resolver", response).await?.json().await?;

        Ok(citation_from_parts(
            doi,
            &csl.authors(),
            &csl.title,
            &csl.year(),
        ))
    }
}

/// Minimal CSL-JSON item.
#[derive(Debug, Deserialize)]
struct CslItem {
    #[serde(default)]
    title: String,
    #[serde(default)]
    author: Vec<CslName>,
    #[serde(default)]
    issued: Option<CslDate>,
}

#[derive(Debug, Deserialize)]
struct CslName {
    literal: Option<String>,
    family: Option<String>,
    given: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CslDate {
    #[serde(rename = "date-parts", default)]
    date_parts: Vec<Vec<Value>>,
}

impl CslItem {
    fn authors(&self) -> String {
        self.author
            .iter()
            .filter_map(|a| match (&a.literal, &a.family, &a.given) {
                (Some(literal), _, _) => Some(literal.clone()),
                (None, Some(family), Some(given)) => Some(format!("{}, {}", family, given)),
                (None, Some(family), None) => Some(family.clone()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(", ")
    }

    fn year(&self) -> String {
        self.issued
            .as_ref()
            .and_then(|d| d.date_parts.first())
            .and_then(|parts| parts.first())
            .map(|y| match y {
                Value::String(s) => s.clone(),
                other => other.to_string(),
            })
            .unwrap_or_default()
    }
}

/// Format APA, MLA, Chicago and BibTeX citations.
///
/// `date` may be a full `YYYY-MM-DD` date or just a year; only the year is used.
pub fn citation_from_parts(doi: &str, authors: &str, title: &str, date: &str) -> Citation {
    let year: String = date.chars().take(4).collect();
    let key = doi.replace('/', "_");

    Citation {
        apa: format!("{}. ({}). {}. DOI: {}", authors, year, title, doi),
        mla: format!("{}. \"{}.\" {}. DOI: {}", authors, title, year, doi),
        chicago: format!("{}. {}. \"{}.\" DOI: {}", authors, year, title, doi),
        bibtex: format!(
            "@dataset{{{key},\n  title = {{{title}}},\n  author = {{{authors}}},\n  year = {{{year}}},\n  publisher = {{Zenodo}},\n  doi = {{{doi}}}\n}}"
        ),
        doi: doi.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn publisher(server: &MockServer) -> ZenodoPublisher {
        let config = ZenodoConfig::new(Some("secret".into()), false)
            .unwrap()
            .with_api_base(server.uri())
            .with_doi_resolver(format!("{}/doi", server.uri()));
        ZenodoPublisher::new(config)
    }

    #[test]
    fn test_default_metadata() {
        let metadata = DepositMetadata::defaults("2023_05", None);
        assert_eq!(metadata.title, "EU Legislative Acts Statistics - May 2023");
        assert_eq!(
            metadata.description,
            "Monthly statistics of EU legislative acts for May 2023."
        );
        assert_eq!(metadata.license, "cc-by");
        assert_eq!(metadata.creators, vec![Creator::named(DEFAULT_CREATOR)]);
        assert_eq!(metadata.keywords.len(), 5);
    }

    #[test]
    fn test_timestamp_in_title() {
        let metadata = DepositMetadata::defaults("2023_05", Some("2023-06-01 10:00"));
        assert!(metadata.title.ends_with("(Parsed: 2023-06-01 10:00)"));
        assert!(metadata.description.ends_with("Parsed on 2023-06-01 10:00."));
    }

    #[test]
    fn test_overrides_replace_fields() {
        let overrides = MetadataOverrides {
            title: Some("Custom".into()),
            creators: Some(MetadataOverrides::split_list("Ada, Grace ,")),
            ..Default::default()
        };
        let metadata = DepositMetadata::defaults("2023_05", None).merged(&overrides);

        assert_eq!(metadata.title, "Custom");
        assert_eq!(metadata.authors(), "Ada, Grace");
        assert_eq!(metadata.license, "cc-by");
    }

    #[test]
    fn test_citation_formats() {
        let citation = citation_from_parts(
            "10.5281/zenodo.42",
            "EurLex Legal Acts Statistics Project",
            "EU Legislative Acts Statistics - May 2023",
            "2023-06-01",
        );
        assert_eq!(
            citation.apa,
            "EurLex Legal Acts Statistics Project. (2023). EU Legislative Acts Statistics - May 2023. DOI: 10.5281/zenodo.42"
        );
        assert!(citation.mla.contains("\"EU Legislative Acts Statistics - May 2023.\" 2023."));
        assert!(citation.bibtex.starts_with("@dataset{10.5281_zenodo.42,"));
        assert!(citation.bibtex.contains("year = {2023}"));
    }

    #[tokio::test]
    async fn test_create_upload_publish() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let csv = dir.path().join("legislative_acts_2023_05.csv");
        std::fs::write(&csv, "year,month\n").unwrap();

        Mock::given(method("POST"))
            .and(path("/deposit/depositions"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 7,
                "doi": "",
                "links": { "bucket": format!("{}/files/bucket-7", server.uri()) }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/files/bucket-7/legislative_acts_2023_05.csv"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/deposit/depositions/7/actions/publish"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "id": 7,
                "doi": "10.5072/zenodo.7"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut request = DepositRequest::new(&csv, "2023_05");
        request.companion_files.push(dir.path().join("missing_raw.csv"));

        let deposition = publisher(&server)
            .create_or_update_deposit(&request)
            .await
            .unwrap();
        assert_eq!(deposition.doi, "10.5072/zenodo.7");
    }

    #[tokio::test]
    async fn test_new_version_replaces_files() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let csv = dir.path().join("legislative_acts_2023_06.csv");
        std::fs::write(&csv, "year,month\n").unwrap();

        Mock::given(method("POST"))
            .and(path("/deposit/depositions/7/actions/newversion"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 7,
                "links": { "latest_draft": format!("{}/deposit/depositions/8", server.uri()) }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/deposit/depositions/8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 8,
                "links": { "bucket": format!("{}/files/bucket-8", server.uri()) },
                "files": [{ "id": "f1", "filename": "legislative_acts_2023_05.csv" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("DELETE"))
            .and(path("/deposit/depositions/8/files/f1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/deposit/depositions/8"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 8,
                "links": { "bucket": format!("{}/files/bucket-8", server.uri()) }
            })))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("PUT"))
            .and(path("/files/bucket-8/legislative_acts_2023_06.csv"))
            .respond_with(ResponseTemplate::new(201))
            .expect(1)
            .mount(&server)
            .await;

        Mock::given(method("POST"))
            .and(path("/deposit/depositions/8/actions/publish"))
            .respond_with(ResponseTemplate::new(202).set_body_json(json!({
                "id": 8,
                "doi": "10.5072/zenodo.8"
            })))
            .mount(&server)
            .await;

        let mut request = DepositRequest::new(&csv, "2023_06");
        request.existing_deposit_id = Some(7);

        let deposition = publisher(&server)
            .create_or_update_deposit(&request)
            .await
            .unwrap();
        assert_eq!(deposition.id, 8);
        assert_eq!(deposition.doi, "10.5072/zenodo.8");
    }

    #[tokio::test]
    async fn test_api_error_surfaces_status() {
        let server = MockServer::start().await;
        let dir = tempdir().unwrap();
        let csv = dir.path().join("legislative_acts_2023_05.csv");
        std::fs::write(&csv, "year\n").unwrap();

        Mock::given(method("POST"))
            .and(path("/deposit/depositions"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = publisher(&server)
            .create_or_update_deposit(&DepositRequest::new(&csv, "2023_05"))
            .await
            .unwrap_err();
        assert!(matches!(err, PublishError::Api { status: 403, .. }));
    }

    #[tokio::test]
    async fn test_citation_from_resolver() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/doi/10.5072/zenodo.7"))
            .and(header("Accept", "application/vnd.citationstyles.csl+json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "EU Legislative Acts Statistics - May 2023",
                "author": [{ "literal": "EurLex Legal Acts Statistics Project" }],
                "issued": { "date-parts": [[2023, 6, 1]] }
            })))
            .mount(&server)
            .await;

        let citation = publisher(&server)
            .generate_citation("10.5072/zenodo.7", None)
            .await
            .unwrap();
        assert_eq!(
            citation.chicago,
            "EurLex Legal Acts Statistics Project. 2023. \"EU Legislative Acts Statistics - May 2023.\" DOI: 10.5072/zenodo.7"
        );
    }

    #[tokio::test]
    async fn test_citation_lookup_without_token() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/doi/10.5281/zenodo.9"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "title": "EU Legislative Acts Statistics - April 2023",
                "author": [{ "family": "Doe", "given": "Jane" }],
                "issued": { "date-parts": [["2023"]] }
            })))
            .expect(1)
            .mount(&server)
            .await;

        let config = ZenodoConfig::anonymous().with_doi_resolver(format!("{}/doi", server.uri()));
        let citation = ZenodoPublisher::new(config)
            .generate_citation("10.5281/zenodo.9", None)
            .await
            .unwrap();
        assert!(citation.apa.starts_with("Doe, Jane. (2023)."));

        let requests = server.received_requests().await.unwrap();
        assert!(requests[0].headers.get("authorization").is_none());
    }
}
