//! Read-only GitHub REST client for one account: repository metadata,
//! languages, commit/contributor/PR counts, and README bodies.

use std::collections::HashMap;

use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

use crate::error::AssistantError;

const GITHUB_API: &str = "https://api.github.com";
const ACCEPT_HEADER: &str = "application/vnd.github.v3+json";
const USER_AGENT: &str = "Portfolio-Chatbot";

/// Live repository statistics. Derived entirely from the provider and never
/// persisted beyond the context cache window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitRepoStats {
    pub stars: u64,
    pub forks: u64,
    pub commits: u64,
    pub contributors: u64,
    pub issues: u64,
    pub pull_requests: u64,
    pub languages: HashMap<String, u64>,
    pub last_updated: String,
}

/// A successful provider payload with the rate-limit header surfaced
/// alongside it. The remaining count is informational only.
#[derive(Debug, Clone)]
pub struct ApiPayload<T> {
    pub data: T,
    pub rate_limit_remaining: Option<u32>,
}

/// Seam for the source-hosting provider so tests can substitute fakes.
#[async_trait::async_trait]
pub trait GitProvider: Send + Sync {
    async fn repository_stats(&self, repo: &str) -> Result<GitRepoStats, AssistantError>;

    async fn repository_readme(&self, repo: &str) -> Result<String, AssistantError>;
}

pub struct GitHubClient {
    client: reqwest::Client,
    token: String,
    username: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RepoMetadata {
    stargazers_count: u64,
    forks_count: u64,
    open_issues_count: u64,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct ReadmePayload {
    content: String,
}

impl GitHubClient {
    pub fn new(token: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            token: token.into(),
            username: username.into(),
            base_url: GITHUB_API.to_string(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        self.client
            .get(format!("{}{}", self.base_url, endpoint))
            .header("Authorization", format!("token {}", self.token))
            .header("Accept", ACCEPT_HEADER)
            .header("User-Agent", USER_AGENT)
    }

    /// GET an endpoint and deserialize the JSON body, carrying the
    /// `X-RateLimit-Remaining` header along with it.
    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
    ) -> Result<ApiPayload<T>, AssistantError> {
        let response = self.request(endpoint).send().await?;

        let status = response.status();
        let rate_limit_remaining = rate_limit_remaining(&response);

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AssistantError::provider(status.as_u16(), body));
        }

        let data = response.json::<T>().await?;

        Ok(ApiPayload {
            data,
            rate_limit_remaining,
        })
    }

    /// Commit count via pagination metadata: request one commit per page and
    /// read the last page number from the `Link` header. Falls back to the
    /// body length when the header is absent, and to zero on any failure.
    async fn commit_count(&self, repo: &str) -> u64 {
        let endpoint = format!("/repos/{}/{}/commits?per_page=1", self.username, repo);

        let response = match self.request(&endpoint).send().await {
            Ok(r) => r,
            Err(e) => {
                warn!(repo, error = %e, "commit count fetch failed");
                return 0;
            }
        };

        if let Some(link) = response
            .headers()
            .get("Link")
            .and_then(|v| v.to_str().ok())
        {
            if let Some(count) = parse_last_page(link) {
                return count;
            }
        }

        match response.json::<Vec<Value>>().await {
            Ok(commits) => commits.len() as u64,
            Err(_) => 0,
        }
    }

    async fn contributor_count(&self, repo: &str) -> u64 {
        let endpoint = format!("/repos/{}/{}/contributors", self.username, repo);
        match self.get_json::<Vec<Value>>(&endpoint).await {
            Ok(payload) => payload.data.len() as u64,
            Err(_) => 0,
        }
    }

    /// Lenient by design: the count degrades to the first-page list length,
    /// and to zero when the response is not a list at all.
    async fn pull_request_count(&self, repo: &str) -> u64 {
        let endpoint = format!(
            "/repos/{}/{}/pulls?state=all&per_page=1",
            self.username, repo
        );
        match self.get_json::<Value>(&endpoint).await {
            Ok(payload) => payload
                .data
                .as_array()
                .map(|list| list.len() as u64)
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    /// Stats for every repo in the allow-list, dropping individual failures.
    pub async fn all_repository_stats(&self, repos: &[String]) -> HashMap<String, GitRepoStats> {
        let mut results = HashMap::new();
        for repo in repos {
            let repo = repo.trim();
            match self.repository_stats(repo).await {
                Ok(stats) => {
                    results.insert(repo.to_string(), stats);
                }
                Err(e) => {
                    warn!(repo, error = %e, "skipping repository stats");
                }
            }
        }
        results
    }

    /// Code search scoped to one repository.
    pub async fn search_code(&self, repo: &str, query: &str) -> Result<Value, AssistantError> {
        let endpoint = format!(
            "/search/code?q={}+repo:{}/{}",
            urlencoding::encode(query),
            self.username,
            repo
        );
        Ok(self.get_json::<Value>(&endpoint).await?.data)
    }
}

#[async_trait::async_trait]
impl GitProvider for GitHubClient {
    async fn repository_stats(&self, repo: &str) -> Result<GitRepoStats, AssistantError> {
        let metadata_endpoint = format!("/repos/{}/{}", self.username, repo);
        let languages_endpoint = format!("/repos/{}/{}/languages", self.username, repo);

        // Metadata and language failures fail the whole call; the count
        // sub-fetches degrade to zero individually.
        let (metadata, languages, commits, contributors, pull_requests) = tokio::join!(
            self.get_json::<RepoMetadata>(&metadata_endpoint),
            self.get_json::<HashMap<String, u64>>(&languages_endpoint),
            self.commit_count(repo),
            self.contributor_count(repo),
            self.pull_request_count(repo),
        );

        let metadata = metadata?;
        let languages = languages?;

        debug!(
            repo,
            rate_limit_remaining = ?metadata.rate_limit_remaining,
            "fetched repository stats"
        );

        Ok(GitRepoStats {
            stars: metadata.data.stargazers_count,
            forks: metadata.data.forks_count,
            commits,
            contributors,
            issues: metadata.data.open_issues_count,
            pull_requests,
            languages: languages.data,
            last_updated: metadata.data.updated_at,
        })
    }

    async fn repository_readme(&self, repo: &str) -> Result<String, AssistantError> {
        let endpoint = format!("/repos/{}/{}/readme", self.username, repo);

        let payload = match self.get_json::<ReadmePayload>(&endpoint).await {
            Ok(p) => p,
            Err(_) => return Err(AssistantError::NotFound("README not found".into())),
        };

        decode_readme(&payload.data.content)
    }
}

/// Extract the last page number from a GitHub `Link` pagination header.
fn parse_last_page(link_header: &str) -> Option<u64> {
    let re = regex::Regex::new(r#"page=(\d+)>; rel="last""#).unwrap();
    re.captures(link_header)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// README bodies arrive base64-encoded with embedded newlines.
fn decode_readme(content: &str) -> Result<String, AssistantError> {
    let cleaned: String = content.chars().filter(|c| *c != '\n').collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(cleaned.as_bytes())
        .map_err(|e| AssistantError::NotFound(format!("Malformed README content: {e}")))?;
    String::from_utf8(bytes)
        .map_err(|e| AssistantError::NotFound(format!("Malformed README content: {e}")))
}

fn rate_limit_remaining(response: &reqwest::Response) -> Option<u32> {
    response
        .headers()
        .get("X-RateLimit-Remaining")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
}
