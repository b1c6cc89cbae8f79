//! Navigation menu model.

use serde::{Deserialize, Serialize};

/// Where a navigation entry points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    Internal,
    External,
}

impl LinkKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LinkKind::Internal => "internal",
            LinkKind::External => "external",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "internal" => Some(LinkKind::Internal),
            "external" => Some(LinkKind::External),
            _ => None,
        }
    }
}

/// A single menu entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NavigationItem {
    pub id: String,
    pub label: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub href: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page_id: Option<String>,
    pub order: i64,
    pub is_visible: bool,
}

/// Request body for creating a navigation entry.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateNavigationItemRequest {
    pub label: String,
    #[serde(rename = "type")]
    pub kind: LinkKind,
    #[serde(default)]
    pub href: Option<String>,
    #[serde(default)]
    pub page_id: Option<String>,
    #[serde(default)]
    pub order: i64,
    #[serde(default = "default_visible")]
    pub is_visible: bool,
}

fn default_visible() -> bool {
    true
}

impl CreateNavigationItemRequest {
    /// Check that the link target matches the link kind.
    pub fn validate(&self) -> Result<(), String> {
        if self.label.trim().is_empty() {
            return Err("Label is required".to_string());
        }
        match self.kind {
            LinkKind::Internal if self.page_id.as_deref().map_or(true, str::is_empty) => {
                Err("Internal links require pageId".to_string())
            }
            LinkKind::External if self.href.as_deref().map_or(true, str::is_empty) => {
                Err("External links require href".to_string())
            }
            _ => Ok(()),
        }
    }
}
