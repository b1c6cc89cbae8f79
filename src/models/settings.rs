//! Public site settings projection.

use serde::{Deserialize, Serialize};

use super::Site;

pub const DEFAULT_SITE_NAME: &str = "My Site";
pub const DEFAULT_SITE_DESCRIPTION: &str = "Welcome to my site";
pub const DEFAULT_THEME: &str = "default";

/// The subset of site configuration exposed to the renderer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteSettings {
    pub theme: String,
    pub site_name: String,
    pub site_description: String,
    #[serde(default)]
    pub domain: String,
}

impl Default for SiteSettings {
    fn default() -> Self {
        Self {
            theme: DEFAULT_THEME.to_string(),
            site_name: DEFAULT_SITE_NAME.to_string(),
            site_description: DEFAULT_SITE_DESCRIPTION.to_string(),
            domain: String::new(),
        }
    }
}

impl SiteSettings {
    /// Project a site row, or the empty projection when the row is missing.
    pub fn from_site(site: Option<&Site>) -> Self {
        let Some(site) = site else {
            return Self {
                site_description: String::new(),
                ..Self::default()
            };
        };

        Self {
            theme: site.setting_str("theme").unwrap_or(DEFAULT_THEME).to_string(),
            site_name: if site.name.is_empty() {
                DEFAULT_SITE_NAME.to_string()
            } else {
                site.name.clone()
            },
            site_description: site
                .setting_str("description")
                .unwrap_or_default()
                .to_string(),
            domain: site.domain.clone(),
        }
    }
}
