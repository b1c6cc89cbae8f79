//! Database repository for site content.
//!
//! Every content query takes the owning site id explicitly.

use chrono::Utc;
use serde_json::{Map, Value};
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    parse_blocks, CreateNavigationItemRequest, CreatePageRequest, CreateTemplateRequest, LinkKind,
    NavigationItem, NewSite, Page, PageStatus, Site, SiteStatus, Template, TemplateKind,
};

const SITE_COLUMNS: &str =
    "id, name, domain, status, owner_email, plan, settings, created_at, updated_at";
const PAGE_COLUMNS: &str = "id, title, slug, description, status, blocks, header_template_id, footer_template_id, page_template_id, created_at, updated_at";
const TEMPLATE_COLUMNS: &str =
    "id, name, description, type, blocks, is_built_in, created_at, updated_at";

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    #[cfg(test)]
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    // ==================== SITE OPERATIONS ====================

    /// Get a site by ID.
    pub async fn get_site(&self, id: &str) -> Result<Option<Site>, AppError> {
        let row = sqlx::query(&format!("SELECT {} FROM sites WHERE id = ?", SITE_COLUMNS))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.as_ref().map(site_from_row))
    }

    /// Get the oldest active site registered for an exact domain string.
    pub async fn get_active_site_by_domain(&self, domain: &str) -> Result<Option<Site>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM sites WHERE domain = ? AND status = ? ORDER BY created_at LIMIT 1",
            SITE_COLUMNS
        ))
        .bind(domain)
        .bind(SiteStatus::Active.as_str())
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(site_from_row))
    }

    /// Create a new active site.
    pub async fn create_site(&self, request: &NewSite) -> Result<Site, AppError> {
        let id = request
            .id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let now = Utc::now().to_rfc3339();
        let settings_json = serde_json::to_string(&request.settings)?;

        sqlx::query(
            "INSERT INTO sites (id, name, domain, status, owner_email, plan, settings, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.domain)
        .bind(SiteStatus::Active.as_str())
        .bind(&request.owner_email)
        .bind(&request.plan)
        .bind(&settings_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Site {
            id,
            name: request.name.clone(),
            domain: request.domain.clone(),
            status: SiteStatus::Active,
            owner_email: request.owner_email.clone(),
            plan: request.plan.clone(),
            settings: request.settings.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    // ==================== PAGE OPERATIONS ====================

    /// List a site's pages, most recently updated first.
    pub async fn list_pages(&self, site_id: &str) -> Result<Vec<Page>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM pages WHERE site_id = ? ORDER BY updated_at DESC, created_at DESC",
            PAGE_COLUMNS
        ))
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(page_from_row).collect())
    }

    /// Get a page by slug within a site.
    pub async fn get_page_by_slug(
        &self,
        site_id: &str,
        slug: &str,
    ) -> Result<Option<Page>, AppError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM pages WHERE site_id = ? AND slug = ?",
            PAGE_COLUMNS
        ))
        .bind(site_id)
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.as_ref().map(page_from_row))
    }

    /// Create a new page.
    pub async fn create_page(
        &self,
        site_id: &str,
        request: &CreatePageRequest,
    ) -> Result<Page, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let blocks_json = serde_json::to_string(&request.blocks)?;

        sqlx::query(
            r#"INSERT INTO pages (
                id, site_id, title, slug, description, status, blocks,
                header_template_id, footer_template_id, page_template_id, created_at, updated_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
        )
        .bind(&id)
        .bind(site_id)
        .bind(&request.title)
        .bind(&request.slug)
        .bind(&request.description)
        .bind(request.status.as_str())
        .bind(&blocks_json)
        .bind(&request.header_template_id)
        .bind(&request.footer_template_id)
        .bind(&request.page_template_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Page {
            id,
            title: request.title.clone(),
            slug: request.slug.clone(),
            description: request.description.clone(),
            status: request.status,
            blocks: request.blocks.clone(),
            header_template_id: request.header_template_id.clone(),
            footer_template_id: request.footer_template_id.clone(),
            page_template_id: request.page_template_id.clone(),
            created_at: now.clone(),
            updated_at: now,
        })
    }

    /// Change a page's publication state.
    pub async fn set_page_status(
        &self,
        site_id: &str,
        page_id: &str,
        status: PageStatus,
    ) -> Result<Page, AppError> {
        let now = Utc::now().to_rfc3339();
        let result = sqlx::query(
            "UPDATE pages SET status = ?, updated_at = ? WHERE id = ? AND site_id = ?",
        )
        .bind(status.as_str())
        .bind(&now)
        .bind(page_id)
        .bind(site_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Page {} not found", page_id)));
        }

        let row = sqlx::query(&format!("SELECT {} FROM pages WHERE id = ?", PAGE_COLUMNS))
            .bind(page_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(page_from_row(&row))
    }

    /// Delete a page.
    pub async fn delete_page(&self, site_id: &str, page_id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM pages WHERE id = ? AND site_id = ?")
            .bind(page_id)
            .bind(site_id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("Page {} not found", page_id)));
        }
        Ok(())
    }

    // ==================== NAVIGATION OPERATIONS ====================

    /// List a site's visible navigation entries in display order.
    pub async fn list_navigation(&self, site_id: &str) -> Result<Vec<NavigationItem>, AppError> {
        let rows = sqlx::query(
            "SELECT id, label, type, href, page_id, order_index, is_visible FROM navigation_items WHERE site_id = ? AND is_visible = 1 ORDER BY order_index ASC"
        )
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(navigation_from_row).collect())
    }

    /// Create a navigation entry.
    pub async fn create_navigation_item(
        &self,
        site_id: &str,
        request: &CreateNavigationItemRequest,
    ) -> Result<NavigationItem, AppError> {
        let id = uuid::Uuid::new_v4().to_string();

        sqlx::query(
            "INSERT INTO navigation_items (id, site_id, label, type, href, page_id, order_index, is_visible) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(site_id)
        .bind(&request.label)
        .bind(request.kind.as_str())
        .bind(&request.href)
        .bind(&request.page_id)
        .bind(request.order)
        .bind(request.is_visible as i32)
        .execute(&self.pool)
        .await?;

        Ok(NavigationItem {
            id,
            label: request.label.clone(),
            kind: request.kind,
            href: request.href.clone(),
            page_id: request.page_id.clone(),
            order: request.order,
            is_visible: request.is_visible,
        })
    }

    // ==================== TEMPLATE OPERATIONS ====================

    /// List a site's templates, most recently updated first.
    pub async fn list_templates(&self, site_id: &str) -> Result<Vec<Template>, AppError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM templates WHERE site_id = ? ORDER BY updated_at DESC, created_at DESC",
            TEMPLATE_COLUMNS
        ))
        .bind(site_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.iter().map(template_from_row).collect())
    }

    /// Create a template.
    pub async fn create_template(
        &self,
        site_id: &str,
        request: &CreateTemplateRequest,
    ) -> Result<Template, AppError> {
        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();
        let blocks_json = serde_json::to_string(&request.blocks)?;

        sqlx::query(
            "INSERT INTO templates (id, site_id, name, description, type, blocks, is_built_in, created_at, updated_at) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"
        )
        .bind(&id)
        .bind(site_id)
        .bind(&request.name)
        .bind(&request.description)
        .bind(request.kind.as_str())
        .bind(&blocks_json)
        .bind(request.is_built_in as i32)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(Template {
            id,
            name: request.name.clone(),
            description: request.description.clone(),
            kind: request.kind,
            blocks: request.blocks.clone(),
            is_built_in: request.is_built_in,
            created_at: now.clone(),
            updated_at: now,
        })
    }
}

// Helper functions for row conversion

fn site_from_row(row: &sqlx::sqlite::SqliteRow) -> Site {
    let status: String = row.get("status");
    let settings_str: Option<String> = row.get("settings");
    Site {
        id: row.get("id"),
        name: row.get("name"),
        domain: row.get("domain"),
        status: SiteStatus::parse(&status).unwrap_or(SiteStatus::Inactive),
        owner_email: row.get("owner_email"),
        plan: row.get("plan"),
        settings: settings_str.map(|s| parse_json_object(&s)).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn page_from_row(row: &sqlx::sqlite::SqliteRow) -> Page {
    let status: String = row.get("status");
    let blocks_str: Option<String> = row.get("blocks");
    Page {
        id: row.get("id"),
        title: row.get("title"),
        slug: row.get("slug"),
        description: row.get("description"),
        status: PageStatus::parse(&status).unwrap_or(PageStatus::Draft),
        blocks: parse_blocks(blocks_str.as_deref()),
        header_template_id: row.get("header_template_id"),
        footer_template_id: row.get("footer_template_id"),
        page_template_id: row.get("page_template_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn navigation_from_row(row: &sqlx::sqlite::SqliteRow) -> NavigationItem {
    let kind: String = row.get("type");
    let is_visible: i32 = row.get("is_visible");
    NavigationItem {
        id: row.get("id"),
        label: row.get("label"),
        kind: LinkKind::parse(&kind).unwrap_or(LinkKind::External),
        href: row.get("href"),
        page_id: row.get("page_id"),
        order: row.get("order_index"),
        is_visible: is_visible != 0,
    }
}

fn template_from_row(row: &sqlx::sqlite::SqliteRow) -> Template {
    let kind: String = row.get("type");
    let is_built_in: i32 = row.get("is_built_in");
    let blocks_str: Option<String> = row.get("blocks");
    Template {
        id: row.get("id"),
        name: row.get("name"),
        description: row.get("description"),
        kind: TemplateKind::parse(&kind).unwrap_or(TemplateKind::Page),
        blocks: parse_blocks(blocks_str.as_deref()),
        is_built_in: is_built_in != 0,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

fn parse_json_object(s: &str) -> Map<String, Value> {
    serde_json::from_str(s).unwrap_or_default()
}
