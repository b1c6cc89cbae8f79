//! Page model.

use serde::{Deserialize, Serialize};

use super::Block;

/// Publication state of a page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PageStatus {
    Draft,
    Published,
}

impl PageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PageStatus::Draft => "draft",
            PageStatus::Published => "published",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PageStatus::Draft),
            "published" => Some(PageStatus::Published),
            _ => None,
        }
    }
}

/// A content document belonging to one site.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page {
    pub id: String,
    pub title: String,
    pub slug: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub status: PageStatus,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub header_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub footer_template_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_template_id: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a page.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePageRequest {
    pub title: String,
    pub slug: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_status")]
    pub status: PageStatus,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub header_template_id: Option<String>,
    #[serde(default)]
    pub footer_template_id: Option<String>,
    #[serde(default)]
    pub page_template_id: Option<String>,
}

fn default_status() -> PageStatus {
    PageStatus::Draft
}

/// Request body for changing a page's publication state.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePageStatusRequest {
    pub status: PageStatus,
}

/// A page as served to visitors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishedPage {
    #[serde(flatten)]
    pub page: Page,
    /// True when the page has no blocks to render yet
    pub under_construction: bool,
}

/// Find the page served for `slug`. Drafts are treated as missing.
pub fn find_published<'a>(pages: &'a [Page], slug: &str) -> Option<&'a Page> {
    pages
        .iter()
        .find(|p| p.slug == slug)
        .filter(|p| p.status == PageStatus::Published)
}

impl PublishedPage {
    pub fn new(page: Page) -> Self {
        let under_construction = page.blocks.is_empty();
        Self {
            page,
            under_construction,
        }
    }
}
