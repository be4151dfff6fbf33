//! Journal metadata lookup against the Crossref REST API.
//!
//! `GET {base_url}/journals/{issn}` returns the journal's title, publisher,
//! ISSN list, and DOI counts. The tool reports those as plain text so an
//! agent can cite them next to the Qualis data from the catalog search.

use std::sync::LazyLock;
use std::time::Duration;

use async_trait::async_trait;
use regex::Regex;
use serde::Deserialize;
use sucupira_core::{CoreError, ParamKind, ParamSpec, Result, Tool, ToolArgs};
use tracing::{debug, info, warn};

/// The public Crossref API.
pub const CROSSREF_BASE_URL: &str = "https://api.crossref.org";

const SERVICE: &str = "crossref";
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const UNAVAILABLE: &str = "not available";

static ISSN_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d{4})-?(\d{3}[\dXx])$").unwrap_or_else(|e| panic!("{e}")));

/// Normalize an ISSN to `NNNN-NNNX`, accepting the form without hyphen.
pub fn normalize_issn(raw: &str) -> Option<String> {
    let caps = ISSN_PATTERN.captures(raw.trim())?;
    Some(format!("{}-{}", &caps[1], caps[2].to_ascii_uppercase()))
}

#[derive(Debug, Deserialize)]
struct JournalResponse {
    #[serde(default)]
    message: JournalMessage,
}

#[derive(Debug, Default, Deserialize)]
struct JournalMessage {
    title: Option<String>,
    publisher: Option<String>,
    #[serde(rename = "ISSN", default)]
    issn: Vec<String>,
    #[serde(default)]
    counts: DoiCounts,
}

#[derive(Debug, Default, Deserialize)]
struct DoiCounts {
    #[serde(rename = "total-dois", default)]
    total_dois: u64,
    #[serde(rename = "current-dois", default)]
    current_dois: u64,
}

/// Journal facts extracted from a Crossref response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JournalInfo {
    pub title: String,
    pub publisher: String,
    pub issn: Vec<String>,
    pub total_dois: u64,
    pub current_dois: u64,
}

impl JournalInfo {
    /// Parse the body of a `/journals/{issn}` response.
    pub fn from_json(body: &str) -> Result<Self> {
        let response: JournalResponse = serde_json::from_str(body)
            .map_err(|e| CoreError::external(SERVICE, format!("failed to parse response: {e}")))?;
        let message = response.message;
        Ok(Self {
            title: message.title.unwrap_or_else(|| UNAVAILABLE.to_string()),
            publisher: message.publisher.unwrap_or_else(|| UNAVAILABLE.to_string()),
            issn: message.issn,
            total_dois: message.counts.total_dois,
            current_dois: message.counts.current_dois,
        })
    }

    pub fn render(&self) -> String {
        format!(
            "Journal information:\nTitle: {}\nPublisher: {}\nISSN: {}\nTotal articles: {}\nActive articles: {}",
            self.title,
            self.publisher,
            self.issn.join(", "),
            self.total_dois,
            self.current_dois,
        )
    }
}

/// Builder for [`CrossrefJournalTool`].
#[derive(Debug, Clone)]
pub struct CrossrefJournalToolBuilder {
    base_url: String,
    timeout: Duration,
    mailto: Option<String>,
}

impl Default for CrossrefJournalToolBuilder {
    fn default() -> Self {
        Self { base_url: CROSSREF_BASE_URL.to_string(), timeout: DEFAULT_TIMEOUT, mailto: None }
    }
}

impl CrossrefJournalToolBuilder {
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Contact address sent as `mailto`, which routes requests to Crossref's
    /// "polite" pool.
    pub fn mailto(mut self, mailto: impl Into<String>) -> Self {
        self.mailto = Some(mailto.into());
        self
    }

    pub fn build(self) -> Result<CrossrefJournalTool> {
        if self.timeout.is_zero() {
            return Err(CoreError::InvalidArgument("timeout must be greater than zero".into()));
        }
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| CoreError::InvalidArgument(format!("failed to build HTTP client: {e}")))?;
        Ok(CrossrefJournalTool {
            client,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            mailto: self.mailto,
        })
    }
}

/// Looks up a journal on Crossref by ISSN.
#[derive(Debug, Clone)]
pub struct CrossrefJournalTool {
    client: reqwest::Client,
    base_url: String,
    mailto: Option<String>,
}

impl CrossrefJournalTool {
    pub fn builder() -> CrossrefJournalToolBuilder {
        CrossrefJournalToolBuilder::default()
    }

    /// A tool against the public API with a 10 s timeout.
    pub fn new() -> Result<Self> {
        Self::builder().build()
    }

    pub async fn lookup(&self, issn: &str) -> Result<JournalInfo> {
        let issn = normalize_issn(issn)
            .ok_or_else(|| CoreError::InvalidArgument(format!("'{issn}' is not a valid ISSN")))?;
        let url = format!("{}/journals/{issn}", self.base_url);
        debug!(%url, "querying crossref");

        let mut request = self.client.get(&url);
        if let Some(mailto) = &self.mailto {
            request = request.query(&[("mailto", mailto)]);
        }
        let response = request.send().await.map_err(|e| {
            warn!(error = %e, "crossref request failed");
            CoreError::external(SERVICE, format!("request failed: {e}"))
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(CoreError::external(SERVICE, format!("API returned {status} for ISSN {issn}")));
        }
        let body = response
            .text()
            .await
            .map_err(|e| CoreError::external(SERVICE, format!("failed to read response: {e}")))?;
        JournalInfo::from_json(&body)
    }
}

#[async_trait]
impl Tool for CrossrefJournalTool {
    fn name(&self) -> &str {
        "crossref_journal"
    }

    fn description(&self) -> &str {
        "Retrieves information about an academic journal from Crossref using its ISSN. \
         Returns title, publisher, ISSNs, total articles, and active articles."
    }

    fn parameters(&self) -> Vec<ParamSpec> {
        vec![ParamSpec::required("issn", ParamKind::String, "Journal ISSN, e.g. 0034-8910")]
    }

    async fn execute(&self, args: ToolArgs) -> Result<String> {
        let issn = args.require_str("issn")?;
        let info = self.lookup(issn).await?;
        info!(issn, title = %info.title, "crossref lookup completed");
        Ok(info.render())
    }
}
