//! Writes per-site snapshot files.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Serialize;

use super::Collection;
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::SiteSettings;
use crate::site::{HostInfo, LocalStore, ResolveRequest, SiteResolver};

/// What happened to one snapshot file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "camelCase")]
pub enum SnapshotOutcome {
    /// Real data was written
    Written { entries: usize },
    /// The default value was written in place of the data
    FallbackWritten { reason: String },
    /// Not even the default could be written
    Failed { reason: String },
}

impl SnapshotOutcome {
    pub fn is_success(&self) -> bool {
        !matches!(self, SnapshotOutcome::Failed { .. })
    }
}

/// How many collections must succeed for a run to pass.
#[derive(Debug, Clone, Copy, Default)]
pub struct SuccessPolicy {
    min_successes: Option<usize>,
}

impl SuccessPolicy {
    /// `None` keeps the default of half the collections, rounded up.
    pub fn new(min_successes: Option<usize>) -> Self {
        Self { min_successes }
    }

    pub fn required(&self, total: usize) -> usize {
        self.min_successes
            .unwrap_or_else(|| total.div_ceil(2))
            .min(total)
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionResult {
    pub collection: Collection,
    pub file: String,
    #[serde(flatten)]
    pub outcome: SnapshotOutcome,
}

/// Summary of a full regeneration.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotReport {
    pub site_id: String,
    pub results: Vec<CollectionResult>,
    pub successful: usize,
    pub required: usize,
    pub success: bool,
}

impl SnapshotReport {
    fn new(
        site_id: String,
        outcomes: Vec<(Collection, SnapshotOutcome)>,
        policy: SuccessPolicy,
    ) -> Self {
        let successful = outcomes.iter().filter(|(_, o)| o.is_success()).count();
        let required = policy.required(outcomes.len());
        let results = outcomes
            .into_iter()
            .map(|(collection, outcome)| CollectionResult {
                collection,
                file: collection.file_name().to_string(),
                outcome,
            })
            .collect();

        Self {
            site_id,
            results,
            successful,
            required,
            success: successful >= required,
        }
    }

    pub fn outcome(&self, collection: Collection) -> Option<&SnapshotOutcome> {
        self.results
            .iter()
            .find(|r| r.collection == collection)
            .map(|r| &r.outcome)
    }
}

/// Mirrors site content into JSON files.
pub struct SnapshotGenerator {
    repo: Arc<Repository>,
    resolver: Arc<SiteResolver>,
    output_dir: PathBuf,
    policy: SuccessPolicy,
    host: Option<HostInfo>,
    store: Option<Arc<dyn LocalStore>>,
}

impl SnapshotGenerator {
    pub fn new(
        repo: Arc<Repository>,
        resolver: Arc<SiteResolver>,
        output_dir: impl Into<PathBuf>,
        policy: SuccessPolicy,
    ) -> Self {
        Self {
            repo,
            resolver,
            output_dir: output_dir.into(),
            policy,
            host: None,
            store: None,
        }
    }

    /// Host used for domain lookup when no site id is supplied.
    pub fn with_host(mut self, host: Option<HostInfo>) -> Self {
        self.host = host;
        self
    }

    /// Store the resolved site id is cached in between runs.
    pub fn with_store(mut self, store: Arc<dyn LocalStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Regenerate every snapshot file for a site.
    ///
    /// Without a site id the resolver runs, and may create a site. That
    /// creation failing is the only error returned; everything else is
    /// reported per collection.
    pub async fn generate_all(&self, site_id: Option<&str>) -> Result<SnapshotReport, AppError> {
        let site_id = match site_id.filter(|id| !id.is_empty()) {
            Some(id) => id.to_string(),
            None => {
                let resolution = self.resolver.resolve(&self.resolve_request()).await?;
                tracing::info!(
                    "Using site {} ({:?}) for static generation",
                    resolution.site_id,
                    resolution.source
                );
                resolution.site_id
            }
        };

        let (navigation, pages, templates, settings) = tokio::join!(
            self.generate_navigation_file(Some(&site_id)),
            self.generate_pages_file(Some(&site_id)),
            self.generate_templates_file(Some(&site_id)),
            self.generate_settings_file(Some(&site_id))
        );

        let report = SnapshotReport::new(
            site_id,
            vec![
                (Collection::Navigation, navigation),
                (Collection::Pages, pages),
                (Collection::Templates, templates),
                (Collection::Settings, settings),
            ],
            self.policy,
        );

        tracing::info!(
            "Generated {}/{} static files for site {}",
            report.successful,
            report.results.len(),
            report.site_id
        );
        if !report.success {
            tracing::warn!(
                "Static generation below threshold: {} of {} required",
                report.successful,
                report.required
            );
        }

        Ok(report)
    }

    pub async fn generate_navigation_file(&self, site_id: Option<&str>) -> SnapshotOutcome {
        let collection = Collection::Navigation;
        let Some(site_id) = self.tenant(site_id).await else {
            return self.write_fallback(collection, "no site configured").await;
        };

        match self.repo.list_navigation(&site_id).await {
            Ok(items) => self.write_collection(collection, &items, items.len()).await,
            Err(e) => self.write_fallback(collection, &e.to_string()).await,
        }
    }

    pub async fn generate_pages_file(&self, site_id: Option<&str>) -> SnapshotOutcome {
        let collection = Collection::Pages;
        let Some(site_id) = self.tenant(site_id).await else {
            return self.write_fallback(collection, "no site configured").await;
        };

        match self.repo.list_pages(&site_id).await {
            Ok(pages) => self.write_collection(collection, &pages, pages.len()).await,
            Err(e) => self.write_fallback(collection, &e.to_string()).await,
        }
    }

    pub async fn generate_templates_file(&self, site_id: Option<&str>) -> SnapshotOutcome {
        let collection = Collection::Templates;
        let Some(site_id) = self.tenant(site_id).await else {
            return self.write_fallback(collection, "no site configured").await;
        };

        match self.repo.list_templates(&site_id).await {
            Ok(templates) => {
                self.write_collection(collection, &templates, templates.len())
                    .await
            }
            Err(e) => self.write_fallback(collection, &e.to_string()).await,
        }
    }

    pub async fn generate_settings_file(&self, site_id: Option<&str>) -> SnapshotOutcome {
        let collection = Collection::Settings;
        let Some(site_id) = self.tenant(site_id).await else {
            return self.write_fallback(collection, "no site configured").await;
        };

        match self.repo.get_site(&site_id).await {
            Ok(site) => {
                let settings = SiteSettings::from_site(site.as_ref());
                self.write_collection(collection, &settings, 1).await
            }
            Err(e) => self.write_fallback(collection, &e.to_string()).await,
        }
    }

    fn resolve_request(&self) -> ResolveRequest<'_> {
        ResolveRequest {
            host: self.host.as_ref(),
            store: self.store.as_deref(),
            ..ResolveRequest::default()
        }
    }

    /// The explicit site id, or an existing one from the resolver. Never creates.
    async fn tenant(&self, site_id: Option<&str>) -> Option<String> {
        match site_id.filter(|id| !id.is_empty()) {
            Some(id) => Some(id.to_string()),
            None => self
                .resolver
                .find_existing(&self.resolve_request())
                .await
                .map(|r| r.site_id),
        }
    }

    async fn write_collection<T: Serialize>(
        &self,
        collection: Collection,
        value: &T,
        entries: usize,
    ) -> SnapshotOutcome {
        match self.write_json(collection, value).await {
            Ok(path) => {
                tracing::info!(
                    "Static {} file generated: {:?} ({} entries)",
                    collection.file_name(),
                    path,
                    entries
                );
                SnapshotOutcome::Written { entries }
            }
            Err(e) => {
                tracing::error!("Error writing {}: {}", collection.file_name(), e);
                self.write_fallback(collection, &e.to_string()).await
            }
        }
    }

    async fn write_fallback(&self, collection: Collection, reason: &str) -> SnapshotOutcome {
        match self.write_json(collection, &collection.default_value()).await {
            Ok(_) => {
                tracing::warn!("Wrote default {} ({})", collection.file_name(), reason);
                SnapshotOutcome::FallbackWritten {
                    reason: reason.to_string(),
                }
            }
            Err(e) => {
                tracing::error!("Failed to write fallback {}: {}", collection.file_name(), e);
                SnapshotOutcome::Failed {
                    reason: e.to_string(),
                }
            }
        }
    }

    async fn write_json<T: Serialize>(
        &self,
        collection: Collection,
        value: &T,
    ) -> Result<PathBuf, AppError> {
        tokio::fs::create_dir_all(&self.output_dir).await?;
        let path = self.output_dir.join(collection.file_name());
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| AppError::Internal(format!("Failed to serialize snapshot: {}", e)))?;
        tokio::fs::write(&path, bytes).await?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::models::{
        Block, CreateNavigationItemRequest, CreatePageRequest, LinkKind, NewSite, PageStatus,
    };
    use crate::site::{Environment, MemoryStore};
    use serde_json::{json, Map, Value};
    use tempfile::TempDir;

    struct Fixture {
        repo: Arc<Repository>,
        generator: SnapshotGenerator,
        out_dir: PathBuf,
        _temp_dir: TempDir,
    }

    async fn fixture(env: Environment) -> Fixture {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        let repo = Arc::new(Repository::new(pool));
        let resolver = Arc::new(SiteResolver::new(repo.clone(), env));
        let out_dir = temp_dir.path().join("public").join("generated");
        let generator =
            SnapshotGenerator::new(repo.clone(), resolver, &out_dir, SuccessPolicy::default());
        Fixture {
            repo,
            generator,
            out_dir,
            _temp_dir: temp_dir,
        }
    }

    async fn add_site(repo: &Repository, id: &str) {
        let mut settings = Map::new();
        settings.insert("theme".to_string(), json!("ocean"));
        repo.create_site(&NewSite {
            id: Some(id.to_string()),
            name: "Site A".to_string(),
            domain: "a.example.com".to_string(),
            owner_email: "owner@example.com".to_string(),
            plan: "free".to_string(),
            settings,
        })
        .await
        .unwrap();
    }

    fn read_json(dir: &Path, collection: Collection) -> Value {
        let bytes = std::fs::read(dir.join(collection.file_name())).unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_zero_pages_writes_empty_array() {
        let f = fixture(Environment::default()).await;
        add_site(&f.repo, "site-a").await;

        let outcome = f.generator.generate_pages_file(Some("site-a")).await;
        assert_eq!(outcome, SnapshotOutcome::Written { entries: 0 });
        assert_eq!(read_json(&f.out_dir, Collection::Pages), json!([]));
    }

    #[tokio::test]
    async fn test_pages_snapshot_matches_rows() {
        let f = fixture(Environment::default()).await;
        add_site(&f.repo, "site-a").await;
        for slug in ["home", "about", "contact"] {
            f.repo
                .create_page(
                    "site-a",
                    &CreatePageRequest {
                        title: slug.to_string(),
                        slug: slug.to_string(),
                        description: None,
                        status: PageStatus::Published,
                        blocks: vec![Block::new(format!("{}-hero", slug), "hero")],
                        header_template_id: None,
                        footer_template_id: None,
                        page_template_id: None,
                    },
                )
                .await
                .unwrap();
        }

        f.generator.generate_pages_file(Some("site-a")).await;

        let snapshot = read_json(&f.out_dir, Collection::Pages);
        let mut slugs: Vec<&str> = snapshot
            .as_array()
            .unwrap()
            .iter()
            .map(|p| p["slug"].as_str().unwrap())
            .collect();
        slugs.sort_unstable();
        assert_eq!(slugs, vec!["about", "contact", "home"]);
    }

    #[tokio::test]
    async fn test_navigation_query_error_writes_fallback() {
        let f = fixture(Environment::default()).await;
        add_site(&f.repo, "site-a").await;
        sqlx::query("DROP TABLE navigation_items")
            .execute(f.repo.pool())
            .await
            .unwrap();

        let outcome = f.generator.generate_navigation_file(Some("site-a")).await;
        assert!(matches!(outcome, SnapshotOutcome::FallbackWritten { .. }));
        assert!(outcome.is_success());
        assert_eq!(read_json(&f.out_dir, Collection::Navigation), json!([]));
    }

    #[tokio::test]
    async fn test_no_site_writes_default_settings() {
        let f = fixture(Environment::default()).await;

        let outcome = f.generator.generate_settings_file(None).await;
        assert!(matches!(outcome, SnapshotOutcome::FallbackWritten { .. }));
        let settings = read_json(&f.out_dir, Collection::Settings);
        assert_eq!(settings["siteName"], "My Site");
        assert_eq!(settings["siteDescription"], "Welcome to my site");

        // The per-collection path never creates a site
        assert!(f
            .repo
            .get_active_site_by_domain("localhost")
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_settings_snapshot_from_site() {
        let f = fixture(Environment::default()).await;
        add_site(&f.repo, "site-a").await;

        f.generator.generate_settings_file(Some("site-a")).await;
        let settings = read_json(&f.out_dir, Collection::Settings);
        assert_eq!(
            settings,
            json!({
                "theme": "ocean",
                "siteName": "Site A",
                "siteDescription": "",
                "domain": "a.example.com"
            })
        );
    }

    #[tokio::test]
    async fn test_generate_all_counts_half_as_success() {
        let f = fixture(Environment::default()).await;
        add_site(&f.repo, "site-a").await;
        f.repo
            .create_navigation_item(
                "site-a",
                &CreateNavigationItemRequest {
                    label: "Home".to_string(),
                    kind: LinkKind::External,
                    href: Some("/".to_string()),
                    page_id: None,
                    order: 0,
                    is_visible: true,
                },
            )
            .await
            .unwrap();

        let report = f.generator.generate_all(Some("site-a")).await.unwrap();
        assert!(report.success);
        assert_eq!(report.successful, 4);
        assert_eq!(report.required, 2);
        assert_eq!(
            report.outcome(Collection::Navigation),
            Some(&SnapshotOutcome::Written { entries: 1 })
        );
        for collection in Collection::ALL {
            assert!(f.out_dir.join(collection.file_name()).exists());
        }
    }

    #[tokio::test]
    async fn test_generate_all_fails_when_nothing_can_be_written() {
        let temp_dir = TempDir::new().unwrap();
        let f = fixture(Environment::default()).await;
        // A regular file where the output directory should be
        let blocked = temp_dir.path().join("blocked");
        std::fs::write(&blocked, "").unwrap();
        let resolver = Arc::new(SiteResolver::new(f.repo.clone(), Environment::default()));
        let generator =
            SnapshotGenerator::new(f.repo.clone(), resolver, &blocked, SuccessPolicy::default());

        let report = generator.generate_all(Some("site-a")).await.unwrap();
        assert!(!report.success);
        assert_eq!(report.successful, 0);
        assert!(report
            .results
            .iter()
            .all(|r| matches!(r.outcome, SnapshotOutcome::Failed { .. })));
    }

    #[tokio::test]
    async fn test_generate_all_resolves_and_persists_site() {
        let f = fixture(Environment::default()).await;
        let store = Arc::new(MemoryStore::new());
        let resolver = Arc::new(SiteResolver::new(f.repo.clone(), Environment::default()));
        let generator = SnapshotGenerator::new(
            f.repo.clone(),
            resolver,
            &f.out_dir,
            SuccessPolicy::default(),
        )
        .with_store(store.clone());

        let first = generator.generate_all(None).await.unwrap();
        let second = generator.generate_all(None).await.unwrap();
        assert_eq!(first.site_id, second.site_id);
        assert!(second.success);

        // Starter templates from site creation end up in the snapshot
        let templates = read_json(&f.out_dir, Collection::Templates);
        assert_eq!(templates.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_generation_shares_one_site() {
        let f = fixture(Environment::default()).await;
        let resolver = Arc::new(SiteResolver::new(f.repo.clone(), Environment::default()));
        let generator = SnapshotGenerator::new(
            f.repo.clone(),
            resolver,
            &f.out_dir,
            SuccessPolicy::default(),
        )
        .with_store(Arc::new(MemoryStore::new()));

        let (first, second) = tokio::join!(generator.generate_all(None), generator.generate_all(None));
        assert_eq!(first.unwrap().site_id, second.unwrap().site_id);

        let sites: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sites")
            .fetch_one(f.repo.pool())
            .await
            .unwrap();
        assert_eq!(sites, 1);
    }

    fn report_with_failures(failed: usize) -> SnapshotReport {
        let outcomes = Collection::ALL
            .into_iter()
            .enumerate()
            .map(|(i, collection)| {
                let outcome = if i < failed {
                    SnapshotOutcome::Failed {
                        reason: "permission denied".to_string(),
                    }
                } else {
                    SnapshotOutcome::Written { entries: 1 }
                };
                (collection, outcome)
            })
            .collect();
        SnapshotReport::new("site-a".to_string(), outcomes, SuccessPolicy::default())
    }

    #[test]
    fn test_two_of_four_is_still_success() {
        let report = report_with_failures(2);
        assert_eq!(report.successful, 2);
        assert_eq!(report.required, 2);
        assert!(report.success);
    }

    #[test]
    fn test_one_of_four_is_failure() {
        let report = report_with_failures(3);
        assert_eq!(report.successful, 1);
        assert!(!report.success);
    }

    #[test]
    fn test_fallbacks_count_toward_threshold() {
        let outcomes = vec![
            (
                Collection::Navigation,
                SnapshotOutcome::FallbackWritten {
                    reason: "no such table".to_string(),
                },
            ),
            (
                Collection::Pages,
                SnapshotOutcome::FallbackWritten {
                    reason: "no such table".to_string(),
                },
            ),
            (
                Collection::Templates,
                SnapshotOutcome::Failed {
                    reason: "read-only".to_string(),
                },
            ),
            (
                Collection::Settings,
                SnapshotOutcome::Failed {
                    reason: "read-only".to_string(),
                },
            ),
        ];
        let report = SnapshotReport::new("site-a".to_string(), outcomes, SuccessPolicy::default());
        assert!(report.success);

        let strict = SnapshotReport::new(
            "site-a".to_string(),
            report
                .results
                .iter()
                .map(|r| (r.collection, r.outcome.clone()))
                .collect(),
            SuccessPolicy::new(Some(3)),
        );
        assert!(!strict.success);
    }

    #[test]
    fn test_success_policy() {
        assert_eq!(SuccessPolicy::default().required(4), 2);
        assert_eq!(SuccessPolicy::default().required(3), 2);
        assert_eq!(SuccessPolicy::new(Some(4)).required(4), 4);
        assert_eq!(SuccessPolicy::new(Some(9)).required(4), 4);
    }

    #[test]
    fn test_report_serialization() {
        let report = SnapshotReport::new(
            "site-a".to_string(),
            vec![
                (Collection::Pages, SnapshotOutcome::Written { entries: 3 }),
                (
                    Collection::Settings,
                    SnapshotOutcome::Failed {
                        reason: "disk full".to_string(),
                    },
                ),
            ],
            SuccessPolicy::default(),
        );
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["siteId"], "site-a");
        assert_eq!(value["success"], true);
        assert_eq!(value["results"][0]["status"], "written");
        assert_eq!(value["results"][0]["entries"], 3);
        assert_eq!(value["results"][1]["file"], "settings.json");
        assert_eq!(value["results"][1]["reason"], "disk full");
    }
}
