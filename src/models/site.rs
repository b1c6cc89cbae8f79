//! Site (tenant) model.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Lifecycle status of a site row.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SiteStatus {
    Active,
    Inactive,
}

impl SiteStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SiteStatus::Active => "active",
            SiteStatus::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(SiteStatus::Active),
            "inactive" => Some(SiteStatus::Inactive),
            _ => None,
        }
    }
}

/// An isolated customer installation.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Site {
    pub id: String,
    pub name: String,
    pub domain: String,
    pub status: SiteStatus,
    pub owner_email: String,
    pub plan: String,
    #[serde(default)]
    pub settings: Map<String, Value>,
    pub created_at: String,
    pub updated_at: String,
}

impl Site {
    pub fn is_active(&self) -> bool {
        self.status == SiteStatus::Active
    }

    /// Look up a string-valued entry in the settings mapping.
    pub fn setting_str(&self, key: &str) -> Option<&str> {
        self.settings.get(key).and_then(Value::as_str)
    }
}

/// Values for a new site row.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSite {
    /// Explicit id; a UUID is generated when absent
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub domain: String,
    pub owner_email: String,
    #[serde(default = "default_plan")]
    pub plan: String,
    #[serde(default)]
    pub settings: Map<String, Value>,
}

fn default_plan() -> String {
    "free".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_site_defaults() {
        let request: NewSite = serde_json::from_value(serde_json::json!({
            "name": "Acme",
            "domain": "acme.test",
            "ownerEmail": "ops@acme.test"
        }))
        .unwrap();
        assert!(request.id.is_none());
        assert_eq!(request.plan, "free");
        assert!(request.settings.is_empty());
    }

    #[test]
    fn test_status_round_trip() {
        assert_eq!(SiteStatus::parse("active"), Some(SiteStatus::Active));
        assert_eq!(SiteStatus::Inactive.as_str(), "inactive");
        assert_eq!(SiteStatus::parse("archived"), None);
    }
}
