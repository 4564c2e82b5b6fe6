//! Post-login finalization: redirect resolution, navigation settlement and the
//! root-token warning.

use crate::auth::LoginSuccess;
use crate::config::FlowConfig;
use crate::error::{Error, Result};
use crate::services::{Navigator, Notifier, SessionState};
use crate::session::{QueryParam, SessionContext};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, info, instrument};
use url::form_urlencoded;

/// Navigation destination after login.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Route {
    /// Destination captured before login; it already encodes its namespace.
    Redirect(String),
    /// Landing route with an explicit namespace parameter.
    Landing { name: String, namespace: String },
}

impl Route {
    #[must_use]
    pub fn redirect(target: &str) -> Self {
        Self::Redirect(target.to_string())
    }

    #[must_use]
    pub fn landing(name: &str, namespace: &str) -> Self {
        Self::Landing {
            name: name.to_string(),
            namespace: namespace.to_string(),
        }
    }

    #[must_use]
    pub fn href(&self) -> String {
        match self {
            Self::Redirect(target) => target.clone(),
            Self::Landing { name, namespace } => {
                let query = form_urlencoded::Serializer::new(String::new())
                    .append_pair(QueryParam::Namespace.as_str(), namespace)
                    .finish();
                format!("{name}?{query}")
            }
        }
    }
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.href())
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Landing {
    /// Navigation settled and was still the latest one.
    Settled { route: Route, root_warning: bool },
    /// Navigation settled after a newer one had started; no side effects ran.
    Superseded { route: Route },
}

impl Landing {
    #[must_use]
    pub fn route(&self) -> &Route {
        match self {
            Self::Settled { route, .. } | Self::Superseded { route } => route,
        }
    }
}

pub struct Finalizer {
    landing_route: String,
    warning: String,
    session: Arc<SessionContext>,
    navigator: Arc<dyn Navigator>,
    notifier: Arc<dyn Notifier>,
    state: Arc<dyn SessionState>,
    latest: AtomicU64,
}

impl Finalizer {
    #[must_use]
    pub fn new(
        config: &FlowConfig,
        session: Arc<SessionContext>,
        navigator: Arc<dyn Navigator>,
        notifier: Arc<dyn Notifier>,
        state: Arc<dyn SessionState>,
    ) -> Self {
        Self {
            landing_route: config.landing_route().to_string(),
            warning: config.root_token_warning().to_string(),
            session,
            navigator,
            notifier,
            state,
            latest: AtomicU64::new(0),
        }
    }

    /// Navigates to the redirect target (consuming it) or to the landing
    /// route, then raises the root-token warning once navigation settled.
    ///
    /// Only the most recent navigation drives the warning; an older one that
    /// settles late reports [`Landing::Superseded`].
    ///
    /// # Errors
    /// Returns [`Error::Navigation`] if the navigation does not settle. The
    /// warning is not raised in that case.
    #[instrument(skip(self, success), fields(is_root = success.is_root, namespace = %success.namespace))]
    pub async fn finalize(&self, success: &LoginSuccess) -> Result<Landing> {
        let route = match self.session.take_redirect_to().await {
            Some(target) => Route::Redirect(target),
            None => Route::landing(&self.landing_route, &success.namespace),
        };

        let ticket = self.latest.fetch_add(1, Ordering::SeqCst) + 1;

        self.navigator
            .transition_to(&route)
            .await
            .map_err(|source| Error::Navigation {
                target: route.href(),
                source,
            })?;

        if self.latest.load(Ordering::SeqCst) != ticket {
            debug!(%route, "navigation superseded before it settled");
            return Ok(Landing::Superseded { route });
        }

        if success.is_root {
            self.state.set_root_token(true);
            self.notifier.warning(&self.warning);
        }

        info!(%route, "login finalized");

        Ok(Landing::Settled {
            route,
            root_warning: success.is_root,
        })
    }
}
