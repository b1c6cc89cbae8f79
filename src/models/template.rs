//! Template model.

use serde::{Deserialize, Serialize};

use super::Block;

/// Where a template is placed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Page,
    Header,
    Footer,
}

impl TemplateKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TemplateKind::Page => "page",
            TemplateKind::Header => "header",
            TemplateKind::Footer => "footer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "page" => Some(TemplateKind::Page),
            "header" => Some(TemplateKind::Header),
            "footer" => Some(TemplateKind::Footer),
            _ => None,
        }
    }
}

/// A reusable block sequence.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Template {
    pub id: String,
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    #[serde(default)]
    pub blocks: Vec<Block>,
    /// System default rather than user-created
    pub is_built_in: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Request body for creating a template.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTemplateRequest {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(rename = "type")]
    pub kind: TemplateKind,
    #[serde(default)]
    pub blocks: Vec<Block>,
    #[serde(default)]
    pub is_built_in: bool,
}

/// Built-in header and footer installed on every new site.
pub fn starter_templates() -> Vec<CreateTemplateRequest> {
    vec![
        CreateTemplateRequest {
            name: "Default Header".to_string(),
            description: Some("Site title with the main navigation".to_string()),
            kind: TemplateKind::Header,
            blocks: vec![Block::new("starter-header", "header").with_prop("showNavigation", true)],
            is_built_in: true,
        },
        CreateTemplateRequest {
            name: "Default Footer".to_string(),
            description: Some("Copyright line and footer links".to_string()),
            kind: TemplateKind::Footer,
            blocks: vec![Block::new("starter-footer", "footer").with_prop("showCopyright", true)],
            is_built_in: true,
        },
    ]
}
