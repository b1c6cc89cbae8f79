//! Ordered strategy chain that turns an execution context into a site id.

use std::sync::Arc;

use serde::Serialize;
use serde_json::{json, Map};
use tokio::sync::Mutex;

use super::{Environment, ExecutionContext, HostInfo, LocalStore, SITE_ID_KEY};
use crate::db::Repository;
use crate::errors::AppError;
use crate::models::{
    starter_templates, NewSite, Site, DEFAULT_SITE_DESCRIPTION, DEFAULT_SITE_NAME, DEFAULT_THEME,
};

/// Where a resolved site id came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Strategy {
    Override,
    Environment,
    LocalStore,
    Domain,
    DeploymentProject,
    Created,
}

/// Lookup sources tried before falling back to creating a site.
pub const LOOKUP_ORDER: [Strategy; 5] = [
    Strategy::Override,
    Strategy::Environment,
    Strategy::LocalStore,
    Strategy::Domain,
    Strategy::DeploymentProject,
];

/// Result of a successful resolution.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub site_id: String,
    pub source: Strategy,
}

/// Inputs for one resolution.
#[derive(Clone, Copy, Default)]
pub struct ResolveRequest<'a> {
    /// Caller-supplied id; always wins when present
    pub override_id: Option<&'a str>,
    pub context: ExecutionContext,
    pub host: Option<&'a HostInfo>,
    /// Cache for the resolved id; lookups that find a site write back to it
    pub store: Option<&'a dyn LocalStore>,
}

impl<'a> ResolveRequest<'a> {
    pub fn with_override(site_id: Option<&'a str>) -> Self {
        Self {
            override_id: site_id,
            ..Self::default()
        }
    }
}

/// Resolves the active site.
pub struct SiteResolver {
    repo: Arc<Repository>,
    env: Environment,
    /// Serialises the find-else-create path so concurrent callers share one site
    create_lock: Mutex<()>,
}

impl SiteResolver {
    pub fn new(repo: Arc<Repository>, env: Environment) -> Self {
        Self {
            repo,
            env,
            create_lock: Mutex::new(()),
        }
    }

    /// Try every lookup source in order without creating anything.
    pub async fn find_existing(&self, request: &ResolveRequest<'_>) -> Option<Resolution> {
        for strategy in LOOKUP_ORDER {
            if let Some(site_id) = self.try_strategy(strategy, request).await {
                tracing::debug!("Resolved site {} via {:?}", site_id, strategy);
                return Some(Resolution {
                    site_id,
                    source: strategy,
                });
            }
        }
        None
    }

    /// Resolve the site, creating a default one when nothing matches.
    ///
    /// Lookup failures are absorbed; only a failed site creation is an error.
    pub async fn resolve(&self, request: &ResolveRequest<'_>) -> Result<Resolution, AppError> {
        if let Some(resolution) = self.find_existing(request).await {
            return Ok(resolution);
        }

        let _guard = self.create_lock.lock().await;
        // Another caller may have created the site while we waited
        if let Some(resolution) = self.find_existing(request).await {
            return Ok(resolution);
        }

        let site = self.create_default_site(request).await?;
        Ok(Resolution {
            site_id: site.id,
            source: Strategy::Created,
        })
    }

    async fn try_strategy(&self, strategy: Strategy, request: &ResolveRequest<'_>) -> Option<String> {
        match strategy {
            Strategy::Override => request
                .override_id
                .filter(|id| !id.is_empty())
                .map(str::to_string),
            Strategy::Environment => {
                let site_id = self.env.site_id(request.context)?;
                if self.site_exists(site_id).await {
                    Some(site_id.to_string())
                } else {
                    tracing::warn!("Configured site id {} not found in database", site_id);
                    None
                }
            }
            Strategy::LocalStore => self.from_local_store(request.store?).await,
            Strategy::Domain => self.from_domain(request.host?, request.store).await,
            Strategy::DeploymentProject => {
                let site_id = self.env.deployment().derived_site_id()?;
                if self.site_exists(&site_id).await {
                    tracing::info!("Reusing deployment site {}", site_id);
                    remember(request.store, &site_id);
                    Some(site_id)
                } else {
                    None
                }
            }
            Strategy::Created => None,
        }
    }

    async fn from_local_store(&self, store: &dyn LocalStore) -> Option<String> {
        let stored = store.get(SITE_ID_KEY)?;
        if self.site_exists(&stored).await {
            return Some(stored);
        }

        tracing::warn!("Discarding cached site id {}", stored);
        store.remove(SITE_ID_KEY);
        None
    }

    async fn from_domain(&self, host: &HostInfo, store: Option<&dyn LocalStore>) -> Option<String> {
        for domain in host.candidate_domains() {
            match self.repo.get_active_site_by_domain(&domain).await {
                Ok(Some(site)) => {
                    tracing::info!("Found site by domain: {} -> {}", domain, site.id);
                    remember(store, &site.id);
                    return Some(site.id);
                }
                Ok(None) => tracing::debug!("No site for domain {}", domain),
                Err(e) => tracing::warn!("Domain lookup for {} failed: {}", domain, e),
            }
        }
        None
    }

    async fn site_exists(&self, site_id: &str) -> bool {
        match self.repo.get_site(site_id).await {
            Ok(site) => site.is_some(),
            Err(e) => {
                tracing::warn!("Site lookup for {} failed: {}", site_id, e);
                false
            }
        }
    }

    async fn created_elsewhere(&self, site_id: Option<&str>) -> Option<Site> {
        self.repo.get_site(site_id?).await.ok().flatten()
    }

    async fn create_default_site(&self, request: &ResolveRequest<'_>) -> Result<Site, AppError> {
        let deployment = self.env.deployment();

        let name = if deployment.is_vercel {
            format!("Vercel Site ({})", deployment.environment_name())
        } else {
            DEFAULT_SITE_NAME.to_string()
        };
        let domain = deployment
            .url
            .clone()
            .or_else(|| request.host.map(|h| h.as_str().to_string()))
            .unwrap_or_else(|| "localhost".to_string());

        let mut settings = Map::new();
        settings.insert("siteName".to_string(), json!(name));
        settings.insert("siteDescription".to_string(), json!(DEFAULT_SITE_DESCRIPTION));
        settings.insert("theme".to_string(), json!(DEFAULT_THEME));
        if let Some(project_id) = &deployment.project_id {
            settings.insert("vercelProjectId".to_string(), json!(project_id));
            settings.insert(
                "vercelEnvironment".to_string(),
                json!(deployment.environment_name()),
            );
        }

        let new_site = NewSite {
            id: deployment.derived_site_id(),
            name,
            domain,
            owner_email: self.env.owner_email().to_string(),
            plan: "free".to_string(),
            settings,
        };

        tracing::info!(
            "No site found, creating default site {:?} for domain {}",
            new_site.name,
            new_site.domain
        );
        let site = match self.repo.create_site(&new_site).await {
            Ok(site) => site,
            Err(e) => {
                // A derived id may have been inserted by another process in the meantime
                if let Some(site) = self.created_elsewhere(new_site.id.as_deref()).await {
                    tracing::info!("Site {} was created concurrently, reusing it", site.id);
                    remember(request.store, &site.id);
                    return Ok(site);
                }
                return Err(AppError::SiteCreation(format!(
                    "Failed to configure site: {}",
                    e
                )));
            }
        };

        remember(request.store, &site.id);
        install_starter_templates(&self.repo, &site.id).await;

        if deployment.derived_site_id().is_none() {
            tracing::warn!(
                "Created site {}; set CMS_SITE_ID={} and PUBLIC_CMS_SITE_ID={} to pin it across deployments",
                site.id,
                site.id,
                site.id
            );
        }

        Ok(site)
    }
}

/// Insert the built-in templates for a new site. Returns how many were created.
pub async fn install_starter_templates(repo: &Repository, site_id: &str) -> usize {
    let mut created = 0;
    for template in starter_templates() {
        match repo.create_template(site_id, &template).await {
            Ok(_) => created += 1,
            Err(e) => tracing::warn!(
                "Failed to create starter template {:?} for site {}: {}",
                template.name,
                site_id,
                e
            ),
        }
    }
    created
}

fn remember(store: Option<&dyn LocalStore>, site_id: &str) {
    if let Some(store) = store {
        store.set(SITE_ID_KEY, site_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::init_database;
    use crate::site::MemoryStore;
    use tempfile::TempDir;

    async fn setup(env: Environment) -> (SiteResolver, Arc<Repository>, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let pool = init_database(&temp_dir.path().join("test.sqlite"))
            .await
            .unwrap();
        let repo = Arc::new(Repository::new(pool));
        (SiteResolver::new(repo.clone(), env), repo, temp_dir)
    }

    async fn add_site(repo: &Repository, id: &str, domain: &str) {
        repo.create_site(&NewSite {
            id: Some(id.to_string()),
            name: id.to_string(),
            domain: domain.to_string(),
            owner_email: "owner@example.com".to_string(),
            plan: "free".to_string(),
            settings: Map::new(),
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_override_wins_without_lookup() {
        let env = Environment::from_pairs([("CMS_SITE_ID", "env-site")]);
        let (resolver, _repo, _dir) = setup(env).await;

        let resolution = resolver
            .resolve(&ResolveRequest::with_override(Some("batch-site")))
            .await
            .unwrap();
        assert_eq!(resolution.site_id, "batch-site");
        assert_eq!(resolution.source, Strategy::Override);
    }

    #[tokio::test]
    async fn test_environment_id_is_verified() {
        let env = Environment::from_pairs([("CMS_SITE_ID", "env-site")]);
        let (resolver, repo, _dir) = setup(env).await;

        assert!(resolver
            .find_existing(&ResolveRequest::default())
            .await
            .is_none());

        add_site(&repo, "env-site", "env.test").await;
        let resolution = resolver
            .find_existing(&ResolveRequest::default())
            .await
            .unwrap();
        assert_eq!(resolution.source, Strategy::Environment);
        assert_eq!(resolution.site_id, "env-site");
    }

    #[tokio::test]
    async fn test_client_context_reads_public_variable() {
        let env = Environment::from_pairs([
            ("CMS_SITE_ID", "server-site"),
            ("PUBLIC_CMS_SITE_ID", "client-site"),
        ]);
        let (resolver, repo, _dir) = setup(env).await;
        add_site(&repo, "server-site", "s.test").await;
        add_site(&repo, "client-site", "c.test").await;

        let request = ResolveRequest {
            context: ExecutionContext::Client,
            ..ResolveRequest::default()
        };
        let resolution = resolver.find_existing(&request).await.unwrap();
        assert_eq!(resolution.site_id, "client-site");
    }

    #[tokio::test]
    async fn test_stale_cached_id_is_discarded() {
        let (resolver, repo, _dir) = setup(Environment::default()).await;
        add_site(&repo, "site-a", "a.example.com").await;

        let store = MemoryStore::new();
        store.set(SITE_ID_KEY, "deleted-site");
        let host = HostInfo::parse("a.example.com").unwrap();
        let request = ResolveRequest {
            host: Some(&host),
            store: Some(&store),
            ..ResolveRequest::default()
        };

        let resolution = resolver.find_existing(&request).await.unwrap();
        assert_eq!(resolution.source, Strategy::Domain);
        assert_eq!(resolution.site_id, "site-a");
        // Domain match replaced the stale entry
        assert_eq!(store.get(SITE_ID_KEY).as_deref(), Some("site-a"));

        let again = resolver.find_existing(&request).await.unwrap();
        assert_eq!(again.source, Strategy::LocalStore);
        assert_eq!(again.site_id, "site-a");
    }

    #[tokio::test]
    async fn test_domain_matches_host_with_port() {
        let (resolver, repo, _dir) = setup(Environment::default()).await;
        add_site(&repo, "dev-site", "localhost:3000").await;

        let host = HostInfo::parse("localhost:3000").unwrap();
        let request = ResolveRequest {
            host: Some(&host),
            ..ResolveRequest::default()
        };
        let resolution = resolver.find_existing(&request).await.unwrap();
        assert_eq!(resolution.site_id, "dev-site");
    }

    #[tokio::test]
    async fn test_unknown_domain_falls_through() {
        let (resolver, repo, _dir) = setup(Environment::default()).await;
        add_site(&repo, "site-a", "a.example.com").await;

        let host = HostInfo::parse("unknown.example.com").unwrap();
        let request = ResolveRequest {
            host: Some(&host),
            ..ResolveRequest::default()
        };
        assert!(resolver.find_existing(&request).await.is_none());
    }

    #[tokio::test]
    async fn test_lookup_errors_are_not_fatal() {
        let env = Environment::from_pairs([("CMS_SITE_ID", "env-site")]);
        let (resolver, repo, _dir) = setup(env).await;
        sqlx::query("DROP TABLE sites")
            .execute(repo.pool())
            .await
            .unwrap();

        let host = HostInfo::parse("a.example.com").unwrap();
        let store = MemoryStore::new();
        store.set(SITE_ID_KEY, "cached");
        let request = ResolveRequest {
            host: Some(&host),
            store: Some(&store),
            ..ResolveRequest::default()
        };
        assert!(resolver.find_existing(&request).await.is_none());

        // Creation is the one failure that surfaces
        let err = resolver.resolve(&request).await.unwrap_err();
        assert!(matches!(err, AppError::SiteCreation(_)));
    }

    #[tokio::test]
    async fn test_deployment_site_is_created_then_reused() {
        let env = Environment::from_pairs([
            ("VERCEL", "1"),
            ("VERCEL_PROJECT_ID", "prj_42"),
            ("VERCEL_ENV", "preview"),
            ("VERCEL_URL", "acme-preview.vercel.app"),
        ]);
        let (resolver, repo, _dir) = setup(env).await;

        let first = resolver.resolve(&ResolveRequest::default()).await.unwrap();
        assert_eq!(first.site_id, "vercel-prj_42");
        assert_eq!(first.source, Strategy::Created);

        let site = repo.get_site("vercel-prj_42").await.unwrap().unwrap();
        assert_eq!(site.name, "Vercel Site (preview)");
        assert_eq!(site.domain, "acme-preview.vercel.app");
        assert_eq!(site.setting_str("vercelProjectId"), Some("prj_42"));
        assert_eq!(repo.list_templates(&site.id).await.unwrap().len(), 2);

        let second = resolver.resolve(&ResolveRequest::default()).await.unwrap();
        assert_eq!(second.site_id, first.site_id);
        assert_eq!(second.source, Strategy::DeploymentProject);
    }

    #[tokio::test]
    async fn test_created_site_is_persisted_for_next_call() {
        let (resolver, repo, _dir) = setup(Environment::default()).await;
        let store = MemoryStore::new();
        let request = ResolveRequest {
            store: Some(&store),
            ..ResolveRequest::default()
        };

        let first = resolver.resolve(&request).await.unwrap();
        assert_eq!(first.source, Strategy::Created);
        let site = repo.get_site(&first.site_id).await.unwrap().unwrap();
        assert_eq!(site.name, "My Site");
        assert_eq!(site.domain, "localhost");
        assert_eq!(site.owner_email, "admin@example.com");

        let second = resolver.resolve(&request).await.unwrap();
        assert_eq!(second.site_id, first.site_id);
        assert_eq!(second.source, Strategy::LocalStore);
    }

    async fn count_sites(repo: &Repository) -> i64 {
        sqlx::query_scalar("SELECT COUNT(*) FROM sites")
            .fetch_one(repo.pool())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_concurrent_resolve_creates_one_site() {
        let (resolver, repo, _dir) = setup(Environment::default()).await;
        let store = MemoryStore::new();
        let request = ResolveRequest {
            store: Some(&store),
            ..ResolveRequest::default()
        };

        let (first, second) = tokio::join!(resolver.resolve(&request), resolver.resolve(&request));
        let (first, second) = (first.unwrap(), second.unwrap());

        assert_eq!(first.site_id, second.site_id);
        assert_eq!(count_sites(&repo).await, 1);
    }

    #[tokio::test]
    async fn test_deployment_site_created_by_another_resolver_is_reused() {
        let env = Environment::from_pairs([("VERCEL", "1"), ("VERCEL_PROJECT_ID", "prj_7")]);
        let (resolver, repo, _dir) = setup(env.clone()).await;
        // Separate resolvers share the database but not the creation lock
        let other = SiteResolver::new(repo.clone(), env);

        let first_request = ResolveRequest::default();
        let second_request = ResolveRequest::default();
        let (first, second) = tokio::join!(
            resolver.resolve(&first_request),
            other.resolve(&second_request)
        );

        assert_eq!(first.unwrap().site_id, "vercel-prj_7");
        assert_eq!(second.unwrap().site_id, "vercel-prj_7");
        assert_eq!(count_sites(&repo).await, 1);
    }
}
