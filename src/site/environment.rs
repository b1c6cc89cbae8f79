//! Process environment and request host inputs to site resolution.

use std::collections::HashMap;
use std::env;

/// Server-only variables naming the site, in priority order.
pub const SERVER_SITE_ID_VARS: [&str; 2] = ["CMS_SITE_ID", "DEFAULT_SITE_ID"];
/// Variable safe to expose to client code.
pub const PUBLIC_SITE_ID_VAR: &str = "PUBLIC_CMS_SITE_ID";

const DEPLOYMENT_VARS: [&str; 5] = [
    "VERCEL",
    "VERCEL_PROJECT_ID",
    "VERCEL_ENV",
    "VERCEL_URL",
    "DEFAULT_OWNER_EMAIL",
];

/// Which side of the deployment is asking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ExecutionContext {
    #[default]
    Server,
    Client,
}

/// Snapshot of the environment variables resolution cares about.
#[derive(Debug, Clone, Default)]
pub struct Environment {
    vars: HashMap<String, String>,
}

impl Environment {
    /// Capture the relevant variables from the running process.
    pub fn from_process() -> Self {
        let mut vars = HashMap::new();
        for key in SERVER_SITE_ID_VARS
            .into_iter()
            .chain([PUBLIC_SITE_ID_VAR])
            .chain(DEPLOYMENT_VARS)
        {
            if let Ok(value) = env::var(key) {
                vars.insert(key.to_string(), value);
            }
        }
        Self { vars }
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            vars: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Non-empty value of a variable.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// The configured site id visible to the given context.
    pub fn site_id(&self, context: ExecutionContext) -> Option<&str> {
        match context {
            ExecutionContext::Server => SERVER_SITE_ID_VARS.iter().find_map(|key| self.get(key)),
            ExecutionContext::Client => self.get(PUBLIC_SITE_ID_VAR),
        }
    }

    pub fn deployment(&self) -> Deployment {
        Deployment {
            is_vercel: self.get("VERCEL").is_some(),
            project_id: self.get("VERCEL_PROJECT_ID").map(str::to_string),
            environment: self.get("VERCEL_ENV").map(str::to_string),
            url: self.get("VERCEL_URL").map(str::to_string),
        }
    }

    pub fn owner_email(&self) -> &str {
        self.get("DEFAULT_OWNER_EMAIL").unwrap_or("admin@example.com")
    }
}

/// Identity of the hosting deployment, when the platform provides one.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Deployment {
    pub is_vercel: bool,
    pub project_id: Option<String>,
    pub environment: Option<String>,
    pub url: Option<String>,
}

impl Deployment {
    /// Stable site id derived from the project, so redeploys land on the same site.
    pub fn derived_site_id(&self) -> Option<String> {
        if !self.is_vercel {
            return None;
        }
        self.project_id
            .as_deref()
            .map(|project| format!("vercel-{}", project))
    }

    pub fn environment_name(&self) -> &str {
        self.environment.as_deref().unwrap_or("production")
    }
}

/// The host a request arrived on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInfo {
    host: String,
    hostname: String,
    port: Option<String>,
}

impl HostInfo {
    /// Parse a `Host` header value such as `example.com` or `localhost:3000`.
    pub fn parse(host: &str) -> Option<Self> {
        let host = host.trim();
        if host.is_empty() {
            return None;
        }

        let (hostname, port) = match host.rsplit_once(':') {
            Some((name, port))
                if !name.is_empty()
                    && !port.is_empty()
                    && port.bytes().all(|b| b.is_ascii_digit()) =>
            {
                (name.to_string(), Some(port.to_string()))
            }
            _ => (host.to_string(), None),
        };

        Some(Self {
            host: host.to_string(),
            hostname,
            port,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.host
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Domain strings to try, in order. Matching is literal; no case folding.
    pub fn candidate_domains(&self) -> Vec<String> {
        let mut candidates = vec![self.hostname.clone(), self.host.clone()];
        if let Some(port) = &self.port {
            candidates.push(format!("{}:{}", self.hostname, port));
        }

        let mut seen = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            if !seen.contains(&candidate) {
                seen.push(candidate);
            }
        }
        seen
    }
}
