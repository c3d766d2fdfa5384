use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::chat::ConversationContext;
use crate::context::catalog::{self, CatalogEntry, CATALOG, QUERY_KEYWORDS};
use crate::error::{AssistantError, Result};
use crate::github::{GitProvider, GitRepoStats};

/// Default cache lifetime. Thirty minutes, matching the upstream refresh
/// cadence for repository statistics.
const DEFAULT_CACHE_EXPIRY: Duration = Duration::from_secs(30 * 60);

/// How much README text is forwarded into a prompt context block.
const README_EXCERPT_LEN: usize = 2000;

/// A catalog entry merged with live repository data.
#[derive(Debug, Clone)]
pub struct ProjectContext {
    pub id: String,
    pub name: String,
    pub description: String,
    pub technologies: Vec<String>,
    pub lines: u64,
    pub github_url: String,
    pub demo_url: Option<String>,
    pub readme: Option<String>,
    pub stats: Option<GitRepoStats>,
    pub highlights: Vec<String>,
}

/// Resolves queries to project facts, merging the static catalog with live
/// provider data. Cached with a single shared staleness timestamp: any
/// successful fetch refreshes validity for the whole cache.
pub struct ProjectContextStore {
    provider: Arc<dyn GitProvider>,
    catalog: &'static [CatalogEntry],
    projects: HashMap<String, ProjectContext>,
    readmes: HashMap<String, String>,
    last_update: Option<Instant>,
    cache_expiry: Duration,
}

impl ProjectContextStore {
    pub fn new(provider: Arc<dyn GitProvider>) -> Self {
        Self {
            provider,
            catalog: CATALOG,
            projects: HashMap::new(),
            readmes: HashMap::new(),
            last_update: None,
            cache_expiry: DEFAULT_CACHE_EXPIRY,
        }
    }

    pub fn with_catalog(mut self, catalog: &'static [CatalogEntry]) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_cache_expiry(mut self, expiry: Duration) -> Self {
        self.cache_expiry = expiry;
        self
    }

    fn cache_valid(&self) -> bool {
        match self.last_update {
            Some(at) => at.elapsed() < self.cache_expiry,
            None => false,
        }
    }

    fn entry_by_id(&self, id: &str) -> Option<&'static CatalogEntry> {
        self.catalog.iter().find(|e| e.id == id)
    }

    /// Fetch (or serve from cache) the merged context for one project.
    /// Partial provider failures leave the corresponding field unset rather
    /// than failing the whole call.
    pub async fn get_project_context(&mut self, project_id: &str) -> Result<ProjectContext> {
        if self.cache_valid() {
            if let Some(cached) = self.projects.get(project_id) {
                return Ok(cached.clone());
            }
        }

        let entry = self
            .entry_by_id(project_id)
            .ok_or_else(|| AssistantError::NotFound(format!("Project not found: {project_id}")))?;

        let cached_readme = if self.cache_valid() {
            self.readmes.get(entry.repo).cloned()
        } else {
            None
        };

        let readme_fut = async {
            match cached_readme {
                Some(readme) => Ok(readme),
                None => self.provider.repository_readme(entry.repo).await,
            }
        };

        // Fixed two-wide fan-out: stats and README, joined before returning.
        let (stats, readme) = tokio::join!(self.provider.repository_stats(entry.repo), readme_fut);

        let stats = match stats {
            Ok(s) => Some(s),
            Err(e) => {
                warn!(repo = entry.repo, error = %e, "repository stats unavailable");
                None
            }
        };
        let readme = match readme {
            Ok(r) => Some(r),
            Err(e) => {
                debug!(repo = entry.repo, error = %e, "README unavailable");
                None
            }
        };

        if let Some(ref readme) = readme {
            self.readmes.insert(entry.repo.to_string(), readme.clone());
        }

        let context = ProjectContext {
            id: entry.id.to_string(),
            name: entry.name.to_string(),
            description: entry.description.to_string(),
            technologies: entry.technologies.iter().map(|t| t.to_string()).collect(),
            lines: entry.lines,
            github_url: entry.github_url.to_string(),
            demo_url: entry.demo_url.map(str::to_string),
            readme,
            stats,
            highlights: entry.highlights.iter().map(|h| h.to_string()).collect(),
        };

        self.projects
            .insert(project_id.to_string(), context.clone());
        self.last_update = Some(Instant::now());

        Ok(context)
    }

    /// Contexts for every catalog project. Entries that individually fail
    /// are dropped; the call itself never fails.
    pub async fn get_all_projects_context(&mut self) -> Vec<ProjectContext> {
        let ids: Vec<&'static str> = self.catalog.iter().map(|e| e.id).collect();

        let mut projects = Vec::with_capacity(ids.len());
        for id in ids {
            match self.get_project_context(id).await {
                Ok(context) => projects.push(context),
                Err(e) => warn!(project = id, error = %e, "skipping project context"),
            }
        }
        projects
    }

    /// Build the retrieval block for one query. A query naming a specific
    /// project gets that project's detailed block; anything else (including
    /// a failed fetch for the matched project) gets the general overview.
    pub async fn build_context_for_query(
        &mut self,
        query: &str,
        _context: &ConversationContext,
    ) -> String {
        let lower = query.to_lowercase();

        let matched_repo = QUERY_KEYWORDS
            .iter()
            .find(|(keyword, _)| lower.contains(keyword))
            .map(|(_, repo)| *repo);

        if let Some(repo) = matched_repo {
            if let Some(entry) = catalog::entry_by_repo(repo) {
                match self.get_project_context(entry.id).await {
                    Ok(project) => return detailed_block(&project),
                    Err(e) => {
                        warn!(project = entry.id, error = %e, "falling back to overview context")
                    }
                }
            }
        }

        overview_block(&self.get_all_projects_context().await)
    }

    /// Drop every cached entry and reset the shared timestamp. Subsequent
    /// calls are full re-fetches.
    pub fn clear_cache(&mut self) {
        self.projects.clear();
        self.readmes.clear();
        self.last_update = None;
    }

    /// Canned follow-up suggestions keyed on broad query themes.
    pub fn project_suggestions(&self, query: &str) -> Vec<String> {
        let lower = query.to_lowercase();
        let mut suggestions = Vec::new();

        if lower.contains("project") || lower.contains("work") {
            suggestions.extend([
                "Tell me about the Event Manager project".to_string(),
                "What's special about GitIQ?".to_string(),
                "How was this portfolio website built?".to_string(),
            ]);
        }

        if lower.contains("technical") || lower.contains("code") {
            suggestions.extend([
                "What technologies does Dhruba use?".to_string(),
                "How does the AI orchestration work?".to_string(),
                "Show me the architecture of GitIQ".to_string(),
            ]);
        }

        if lower.contains("ai") || lower.contains("artificial intelligence") {
            suggestions.extend([
                "How does Dhruba collaborate with AI?".to_string(),
                "What's the AI development methodology?".to_string(),
                "Which AI providers are used in projects?".to_string(),
            ]);
        }

        suggestions.truncate(3);
        suggestions
    }
}

fn detailed_block(project: &ProjectContext) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "\nDETAILED PROJECT CONTEXT for {}:\n",
        project.name
    ));
    out.push_str(&format!("- Description: {}\n", project.description));
    out.push_str(&format!(
        "- Technologies: {}\n",
        project.technologies.join(", ")
    ));
    out.push_str(&format!(
        "- Lines of Code: {}\n",
        format_thousands(project.lines)
    ));
    out.push_str(&format!("- GitHub: {}\n", project.github_url));
    if let Some(ref demo) = project.demo_url {
        out.push_str(&format!("- Demo: {}\n", demo));
    }

    if let Some(ref stats) = project.stats {
        out.push_str(&format!(
            "- GitHub Stats: {} stars, {} forks, {} commits\n",
            stats.stars, stats.forks, stats.commits
        ));
        let languages: Vec<&str> = stats.languages.keys().map(String::as_str).collect();
        out.push_str(&format!("- Languages: {}\n", languages.join(", ")));
    }

    out.push_str("- Key Highlights:\n");
    for highlight in &project.highlights {
        out.push_str(&format!("  • {}\n", highlight));
    }

    if let Some(ref readme) = project.readme {
        let excerpt: String = readme.chars().take(README_EXCERPT_LEN).collect();
        out.push_str(&format!("\nREADME CONTENT:\n{}...\n", excerpt));
    }

    out
}

fn overview_block(projects: &[ProjectContext]) -> String {
    let mut out = String::new();

    out.push_str("\nALL PROJECTS OVERVIEW:\n");
    for project in projects {
        out.push_str(&format!("\n{}:\n", project.name));
        out.push_str(&format!("- {}\n", project.description));
        out.push_str(&format!(
            "- {} lines of code\n",
            format_thousands(project.lines)
        ));
        let tech: Vec<&str> = project
            .technologies
            .iter()
            .take(3)
            .map(String::as_str)
            .collect();
        out.push_str(&format!("- Tech: {}\n", tech.join(", ")));
    }

    out
}

/// 75000 → "75,000".
fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AssistantError;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Provider fake that counts calls and can fail specific repos.
    struct FakeProvider {
        stats_calls: AtomicUsize,
        readme_calls: AtomicUsize,
        fail_repo: Option<&'static str>,
    }

    impl FakeProvider {
        fn new() -> Self {
            Self {
                stats_calls: AtomicUsize::new(0),
                readme_calls: AtomicUsize::new(0),
                fail_repo: None,
            }
        }

        fn failing_for(repo: &'static str) -> Self {
            Self {
                fail_repo: Some(repo),
                ..Self::new()
            }
        }
    }

    #[async_trait::async_trait]
    impl GitProvider for FakeProvider {
        async fn repository_stats(&self, repo: &str) -> Result<GitRepoStats> {
            self.stats_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_repo == Some(repo) {
                return Err(AssistantError::provider(500, "boom"));
            }
            Ok(GitRepoStats {
                stars: 12,
                forks: 3,
                commits: 347,
                contributors: 2,
                issues: 1,
                pull_requests: 5,
                languages: HashMap::from([("TypeScript".to_string(), 90_000)]),
                last_updated: "2025-06-01T00:00:00Z".to_string(),
            })
        }

        async fn repository_readme(&self, repo: &str) -> Result<String> {
            self.readme_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_repo == Some(repo) {
                return Err(AssistantError::NotFound("README not found".into()));
            }
            Ok(format!("# {repo}\nLong readme body."))
        }
    }

    fn store_with(provider: Arc<FakeProvider>) -> ProjectContextStore {
        ProjectContextStore::new(provider)
    }

    #[tokio::test]
    async fn caches_merged_context() {
        let provider = Arc::new(FakeProvider::new());
        let mut store = store_with(provider.clone());

        let first = store.get_project_context("gitiq").await.unwrap();
        assert_eq!(first.name, "GitIQ - AI Repository Insights");
        assert_eq!(first.stats.as_ref().unwrap().commits, 347);
        assert!(first.readme.is_some());

        store.get_project_context("gitiq").await.unwrap();
        assert_eq!(provider.stats_calls.load(Ordering::SeqCst), 1);
        assert_eq!(provider.readme_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn expired_cache_refetches() {
        let provider = Arc::new(FakeProvider::new());
        let mut store = store_with(provider.clone()).with_cache_expiry(Duration::ZERO);

        store.get_project_context("gitiq").await.unwrap();
        store.get_project_context("gitiq").await.unwrap();
        assert_eq!(provider.stats_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn clear_cache_forces_refetch() {
        let provider = Arc::new(FakeProvider::new());
        let mut store = store_with(provider.clone());

        store.get_project_context("gitiq").await.unwrap();
        store.clear_cache();
        store.get_project_context("gitiq").await.unwrap();
        assert_eq!(provider.stats_calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn unknown_project_is_not_found() {
        let mut store = store_with(Arc::new(FakeProvider::new()));
        assert!(matches!(
            store.get_project_context("no-such-project").await,
            Err(AssistantError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn partial_provider_failure_leaves_fields_unset() {
        let provider = Arc::new(FakeProvider::failing_for("GitIQ"));
        let mut store = store_with(provider);

        let context = store.get_project_context("gitiq").await.unwrap();
        assert!(context.stats.is_none());
        assert!(context.readme.is_none());
        assert_eq!(context.lines, 40_000);
    }

    #[tokio::test]
    async fn all_projects_never_fails_as_a_whole() {
        let provider = Arc::new(FakeProvider::failing_for("GitIQ"));
        let mut store = store_with(provider);

        let projects = store.get_all_projects_context().await;
        // The failing repo only loses its live fields, not its entry.
        assert_eq!(projects.len(), 3);
    }

    #[tokio::test]
    async fn query_naming_a_project_gets_detailed_block() {
        let mut store = store_with(Arc::new(FakeProvider::new()));
        let ctx = ConversationContext::default();

        let block = store
            .build_context_for_query("tell me about the event manager", &ctx)
            .await;
        assert!(block.contains("DETAILED PROJECT CONTEXT for NIT Silchar Event Manager"));
        assert!(block.contains("https://github.com/DhrubaAgarwalla/NITS-Event-Managment"));
        assert!(block.contains("75,000"));
    }

    #[tokio::test]
    async fn general_query_gets_overview_block() {
        let mut store = store_with(Arc::new(FakeProvider::new()));
        let ctx = ConversationContext::default();

        let block = store
            .build_context_for_query("what do you offer overall", &ctx)
            .await;
        assert!(block.contains("ALL PROJECTS OVERVIEW"));
        assert!(block.contains("NIT Silchar Event Manager"));
        assert!(block.contains("GitIQ - AI Repository Insights"));
        assert!(block.contains("AI-Orchestrated Portfolio"));
    }

    #[test]
    fn thousands_formatting() {
        assert_eq!(format_thousands(75_000), "75,000");
        assert_eq!(format_thousands(999), "999");
        assert_eq!(format_thousands(1_234_567), "1,234,567");
    }

    #[test]
    fn suggestions_capped_at_three() {
        let store = store_with(Arc::new(FakeProvider::new()));
        let suggestions = store.project_suggestions("technical details of your ai projects");
        assert_eq!(suggestions.len(), 3);
        assert!(store.project_suggestions("hmm").is_empty());
    }
}
