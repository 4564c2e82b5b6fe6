//! Session context shared between the login flow and its host. It replaces
//! implicit two-way bindings: every write goes through a setter on
//! [`SessionContext`].

use tokio::sync::Mutex;
use url::form_urlencoded;

/// Query parameters the login route understands.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryParam {
    AuthMethod,
    OidcProvider,
    MountPath,
    Namespace,
}

impl QueryParam {
    /// Accepts the URL keys (`with`, `o`, `at`, `namespace`) and the names the
    /// login form reports.
    #[must_use]
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "with" | "authType" | "authMethod" => Some(Self::AuthMethod),
            "o" | "oidcProvider" => Some(Self::OidcProvider),
            "at" | "mountPath" => Some(Self::MountPath),
            "namespace" => Some(Self::Namespace),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::AuthMethod => "with",
            Self::OidcProvider => "o",
            Self::MountPath => "at",
            Self::Namespace => "namespace",
        }
    }
}

/// Point-in-time copy of the session context.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct SessionSnapshot {
    pub redirect_to: Option<String>,
    pub auth_method: String,
    pub oidc_provider: String,
    pub mount_path: String,
    pub namespace: String,
}

#[derive(Debug, Default)]
pub struct SessionContext {
    inner: Mutex<SessionSnapshot>,
}

impl SessionContext {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a context from a login URL query string such as
    /// `with=oidc&o=okta&at=sso&namespace=admin%2Fteam1`.
    #[must_use]
    pub fn from_query(query: &str) -> Self {
        let mut snapshot = SessionSnapshot::default();
        for (key, value) in form_urlencoded::parse(query.trim_start_matches('?').as_bytes()) {
            if let Some(param) = QueryParam::from_key(&key) {
                apply(&mut snapshot, param, value.into_owned());
            }
        }
        Self {
            inner: Mutex::new(snapshot),
        }
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.lock().await.clone()
    }

    /// Records where to go once the login completes.
    pub async fn set_redirect_to(&self, target: Option<String>) {
        self.inner.lock().await.redirect_to = target.filter(|t| !t.trim().is_empty());
    }

    /// Consumes the redirect target; it is a one-shot value.
    pub async fn take_redirect_to(&self) -> Option<String> {
        self.inner.lock().await.redirect_to.take()
    }

    pub async fn set_param(&self, param: QueryParam, value: String) {
        apply(&mut *self.inner.lock().await, param, value);
    }

    pub async fn namespace(&self) -> String {
        self.inner.lock().await.namespace.clone()
    }

    pub async fn set_namespace(&self, namespace: String) {
        self.inner.lock().await.namespace = namespace;
    }
}

fn apply(snapshot: &mut SessionSnapshot, param: QueryParam, value: String) {
    match param {
        QueryParam::AuthMethod => snapshot.auth_method = value,
        QueryParam::OidcProvider => snapshot.oidc_provider = value,
        QueryParam::MountPath => snapshot.mount_path = value,
        QueryParam::Namespace => snapshot.namespace = value,
    }
}
