//! Router environment context: environment variables drive router
//! behavior, but are threaded in as an explicit context rather than read
//! from process globals inside the pure core.

use std::collections::BTreeMap;

/// The subset of process environment the router's filters consult,
/// captured by the caller (CLI/worker) and passed in explicitly.
#[derive(Debug, Clone, Default)]
pub struct RouterEnv {
    pub vars: BTreeMap<String, String>,
}

impl RouterEnv {
    pub fn from_process() -> Self {
        let mut vars = BTreeMap::new();
        for (k, v) in std::env::vars() {
            vars.insert(k, v);
        }
        Self { vars }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.vars.get(key).map(String::as_str)
    }

    pub fn is_production(&self) -> bool {
        self.get("NODE_ENV") == Some("production")
    }

    pub fn test_mode(&self) -> bool {
        self.get("TEST_MODE") == Some("true")
    }

    pub fn safety_allow_prod(&self) -> bool {
        self.get("SAFETY_ALLOW_PROD") == Some("true")
    }

    pub fn has_key(&self, env_var: &str) -> bool {
        self.vars.get(env_var).is_some_and(|v| !v.is_empty())
    }
}

/// Hints passed by the caller to influence candidate ordering.
#[derive(Debug, Clone, Default)]
pub struct RouterHints {
    pub crawl: Option<CrawlHint>,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct CrawlHint {
    pub pages: Option<u32>,
    pub depth: Option<u32>,
}

impl CrawlHint {
    /// Scale beyond primary limits for `web.crawl`: pages>100 or depth>2.
    pub fn beyond_primary_limits(&self) -> bool {
        self.pages.is_some_and(|p| p > 100) || self.depth.is_some_and(|d| d > 2)
    }
}
