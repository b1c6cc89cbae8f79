//! Static JSON snapshots of site content.
//!
//! Snapshots are disposable projections of the database written for CDN
//! delivery. Writing and reading both degrade to empty defaults on error.

mod generator;
mod reader;

pub use generator::*;
pub use reader::*;

use serde::Serialize;
use serde_json::Value;

use crate::models::SiteSettings;

/// One snapshot file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Collection {
    Navigation,
    Pages,
    Templates,
    Settings,
}

impl Collection {
    pub const ALL: [Collection; 4] = [
        Collection::Navigation,
        Collection::Pages,
        Collection::Templates,
        Collection::Settings,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            Collection::Navigation => "navigation.json",
            Collection::Pages => "pages.json",
            Collection::Templates => "templates.json",
            Collection::Settings => "settings.json",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        let name = s.strip_suffix(".json").unwrap_or(s);
        Collection::ALL
            .into_iter()
            .find(|c| c.file_name().strip_suffix(".json") == Some(name))
    }

    /// Content written when the real data cannot be produced.
    pub fn default_value(&self) -> Value {
        match self {
            Collection::Settings => {
                serde_json::to_value(SiteSettings::default()).unwrap_or(Value::Null)
            }
            _ => Value::Array(Vec::new()),
        }
    }
}
