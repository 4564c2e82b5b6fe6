//! Flow configuration. Values are public; the managed namespace root is the
//! read-only feature flag the namespace resolver consults.

use std::time::Duration;

const DEFAULT_NAMESPACE_DEBOUNCE_MS: u64 = 500;
const DEFAULT_LANDING_ROUTE: &str = "vault.cluster";

pub const ROOT_TOKEN_WARNING: &str = "You have logged in with a root token. As a security precaution, this root token will not be stored by your browser and you will need to re-authenticate after the window is closed or refreshed.";

#[derive(Clone, Debug)]
pub struct FlowConfig {
    managed_namespace_root: Option<String>,
    namespace_debounce: Duration,
    landing_route: String,
    root_token_warning: String,
}

impl FlowConfig {
    #[must_use]
    pub fn new() -> Self {
        Self {
            managed_namespace_root: None,
            namespace_debounce: Duration::from_millis(DEFAULT_NAMESPACE_DEBOUNCE_MS),
            landing_route: DEFAULT_LANDING_ROUTE.to_string(),
            root_token_warning: ROOT_TOKEN_WARNING.to_string(),
        }
    }

    /// Sets the managed namespace root; blank values leave it unset.
    #[must_use]
    pub fn with_managed_namespace_root(mut self, root: Option<&str>) -> Self {
        self.managed_namespace_root = root.and_then(normalize_root);
        self
    }

    #[must_use]
    pub fn with_namespace_debounce(mut self, quiet: Duration) -> Self {
        self.namespace_debounce = quiet;
        self
    }

    #[must_use]
    pub fn with_landing_route(mut self, route: String) -> Self {
        self.landing_route = route;
        self
    }

    #[must_use]
    pub fn with_root_token_warning(mut self, message: String) -> Self {
        self.root_token_warning = message;
        self
    }

    #[must_use]
    pub fn managed_namespace_root(&self) -> Option<&str> {
        self.managed_namespace_root.as_deref()
    }

    #[must_use]
    pub fn namespace_debounce(&self) -> Duration {
        self.namespace_debounce
    }

    #[must_use]
    pub fn landing_route(&self) -> &str {
        &self.landing_route
    }

    #[must_use]
    pub fn root_token_warning(&self) -> &str {
        &self.root_token_warning
    }
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self::new()
    }
}

fn normalize_root(value: &str) -> Option<String> {
    let trimmed = value.trim().trim_matches('/');
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
