//! Login controller: the handlers a UI layer calls while the login route is
//! active. It owns the MFA phase and the namespace debouncer and shares the
//! session context with its host.

use crate::auth::finalize::{Finalizer, Landing};
use crate::auth::{AuthPhase, AuthResponse, Credentials, MfaRequirement};
use crate::config::FlowConfig;
use crate::error::{Error, Result};
use crate::namespace::{self, Debounce, Debouncer, Ticket};
use crate::services::{NamespaceService, Navigator, Notifier, PermissionsService, SessionState};
use crate::session::{QueryParam, SessionContext};
use std::sync::Arc;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument};

/// Collaborators wired into an [`AuthController`].
#[derive(Clone)]
pub struct Services {
    pub navigator: Arc<dyn Navigator>,
    pub notifier: Arc<dyn Notifier>,
    pub namespaces: Arc<dyn NamespaceService>,
    pub permissions: Arc<dyn PermissionsService>,
    pub state: Arc<dyn SessionState>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NamespaceUpdate {
    Committed(String),
    Superseded,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamUpdate {
    Namespace(NamespaceUpdate),
    Applied(QueryParam),
    Ignored,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LoginFlags {
    pub cancel_auth: bool,
    pub waiting_for_okta_number_challenge: bool,
}

pub struct AuthController {
    config: FlowConfig,
    session: Arc<SessionContext>,
    services: Services,
    sanitize: fn(&str) -> String,
    debouncer: Debouncer,
    namespace_commit: Mutex<()>,
    finalizer: Finalizer,
    phase: Mutex<AuthPhase>,
    mfa_errors: Mutex<Option<Vec<String>>>,
    flags: Mutex<LoginFlags>,
}

impl AuthController {
    #[must_use]
    pub fn new(config: FlowConfig, session: Arc<SessionContext>, services: Services) -> Self {
        let finalizer = Finalizer::new(
            &config,
            Arc::clone(&session),
            Arc::clone(&services.navigator),
            Arc::clone(&services.notifier),
            Arc::clone(&services.state),
        );

        Self {
            debouncer: Debouncer::new(config.namespace_debounce()),
            namespace_commit: Mutex::new(()),
            config,
            session,
            services,
            sanitize: namespace::sanitize_path,
            finalizer,
            phase: Mutex::new(AuthPhase::default()),
            mfa_errors: Mutex::new(None),
            flags: Mutex::new(LoginFlags::default()),
        }
    }

    /// Replaces the namespace sanitizer.
    #[must_use]
    pub fn with_sanitizer(mut self, sanitize: fn(&str) -> String) -> Self {
        self.sanitize = sanitize;
        self
    }

    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.config
    }

    #[must_use]
    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    /// Editable form of the tracked namespace; never shows the managed root.
    pub async fn namespace_input(&self) -> String {
        namespace::editable_namespace(
            &self.session.namespace().await,
            self.config.managed_namespace_root(),
        )
    }

    /// Debounced namespace update. Only the most recent call within the quiet
    /// period commits; earlier ones return [`NamespaceUpdate::Superseded`].
    ///
    /// # Errors
    /// Returns [`Error::NamespaceCommit`] if the namespace service rejects the
    /// path. The tracked namespace is left unchanged and nothing is retried.
    pub async fn on_namespace_input_changed(&self, value: &str) -> Result<NamespaceUpdate> {
        let ticket = self.debouncer.start();
        self.update_namespace(ticket, value).await
    }

    /// Starts a debounced namespace update in the background. The update is
    /// ordered against other edits when this is called, not when the task
    /// first runs.
    pub fn spawn_namespace_input(
        self: &Arc<Self>,
        value: String,
    ) -> JoinHandle<Result<NamespaceUpdate>> {
        let ticket = self.debouncer.start();
        let controller = Arc::clone(self);
        tokio::spawn(async move { controller.update_namespace(ticket, &value).await })
    }

    /// Background variant of [`AuthController::on_query_param_changed`] with
    /// the same ordering guarantee as [`AuthController::spawn_namespace_input`].
    pub fn spawn_query_param(
        self: &Arc<Self>,
        key: String,
        value: String,
    ) -> JoinHandle<Result<ParamUpdate>> {
        let controller = Arc::clone(self);
        if QueryParam::from_key(&key) == Some(QueryParam::Namespace) {
            let ticket = self.debouncer.start();
            return tokio::spawn(async move {
                Ok::<_, Error>(ParamUpdate::Namespace(
                    controller.update_namespace(ticket, &value).await?,
                ))
            });
        }
        tokio::spawn(async move { controller.on_query_param_changed(&key, &value).await })
    }

    /// Commits are serialized and re-checked against the ticket once the
    /// namespace service returns, so a slow older commit never replaces the
    /// tracked namespace after a newer edit.
    #[instrument(skip(self, ticket))]
    async fn update_namespace(&self, ticket: Ticket, value: &str) -> Result<NamespaceUpdate> {
        if self.debouncer.wait_for(ticket).await == Debounce::Superseded {
            return Ok(NamespaceUpdate::Superseded);
        }

        let _commit = self.namespace_commit.lock().await;
        if !self.debouncer.is_current(ticket) {
            return Ok(NamespaceUpdate::Superseded);
        }

        let namespace = namespace::full_namespace_with(
            value,
            self.config.managed_namespace_root(),
            self.sanitize,
        );

        self.services
            .namespaces
            .set_namespace(&namespace, true)
            .await
            .map_err(|source| Error::NamespaceCommit {
                namespace: namespace.clone(),
                source,
            })?;

        if !self.debouncer.is_current(ticket) {
            debug!(namespace, "newer edit arrived during commit");
            return Ok(NamespaceUpdate::Superseded);
        }
        self.session.set_namespace(namespace.clone()).await;

        info!(namespace, "namespace committed");

        Ok(NamespaceUpdate::Committed(namespace))
    }

    /// # Errors
    /// Propagates namespace commit failures for the `namespace` parameter.
    pub async fn on_query_param_changed(&self, key: &str, value: &str) -> Result<ParamUpdate> {
        match QueryParam::from_key(key) {
            Some(QueryParam::Namespace) => Ok(ParamUpdate::Namespace(
                self.on_namespace_input_changed(value).await?,
            )),
            Some(param) => {
                self.session.set_param(param, value.to_string()).await;
                Ok(ParamUpdate::Applied(param))
            }
            None => {
                debug!(key, "ignoring unknown query parameter");
                Ok(ParamUpdate::Ignored)
            }
        }
    }

    /// Routes a credential submission result. Returns `None` while an MFA
    /// challenge is pending; otherwise the login is finalized right away.
    ///
    /// # Errors
    /// Returns [`Error::Navigation`] if the post-login navigation fails.
    #[instrument(skip(self, response, data), fields(mfa = response.requires_mfa()))]
    pub async fn on_auth_response(
        &self,
        response: AuthResponse,
        backend: &str,
        data: Credentials,
    ) -> Result<Option<Landing>> {
        let success = self.phase.lock().await.receive(response, backend, data);

        match success {
            Some(success) => Ok(Some(self.finalizer.finalize(&success).await?)),
            None => {
                info!(backend, "MFA required, waiting for challenge");
                Ok(None)
            }
        }
    }

    /// Completes a pending MFA challenge with the backend's final response.
    ///
    /// # Errors
    /// Returns [`Error::MfaNotPending`] without navigating if no challenge is
    /// pending, or [`Error::Navigation`] if the navigation fails.
    #[instrument(skip(self, response))]
    pub async fn on_mfa_success(&self, response: AuthResponse) -> Result<Landing> {
        let success = self.phase.lock().await.resolve_mfa(response)?;
        *self.mfa_errors.lock().await = None;
        self.finalizer.finalize(&success).await
    }

    /// Retains errors reported by the MFA sub-flow until dismissed.
    pub async fn set_mfa_errors(&self, errors: Vec<String>) {
        *self.mfa_errors.lock().await = Some(errors);
    }

    pub async fn mfa_errors(&self) -> Option<Vec<String>> {
        self.mfa_errors.lock().await.clone()
    }

    /// Abandons the pending challenge along with its errors.
    pub async fn on_mfa_error_dismiss(&self) {
        self.phase.lock().await.abandon();
        *self.mfa_errors.lock().await = None;
    }

    /// Final-success path: starts loading permission paths and warns right
    /// away if the stored session is already flagged as root.
    ///
    /// The returned handle resolves with the permission load result.
    pub fn on_auth_success(&self) -> JoinHandle<Result<()>> {
        let permissions = Arc::clone(&self.services.permissions);
        let load = tokio::spawn(async move { permissions.load_paths().await.map_err(Error::Permissions) });

        if self.services.state.authenticated_is_root_token() {
            self.services.notifier.warning(self.config.root_token_warning());
        }

        load
    }

    pub async fn cancel_authentication(&self) {
        {
            let mut flags = self.flags.lock().await;
            flags.cancel_auth = true;
            flags.waiting_for_okta_number_challenge = false;
        }
        if self.phase.lock().await.abandon() {
            debug!("pending MFA challenge cancelled");
        }
        *self.mfa_errors.lock().await = None;
    }

    pub async fn set_waiting_for_okta_number_challenge(&self, waiting: bool) {
        self.flags.lock().await.waiting_for_okta_number_challenge = waiting;
    }

    pub async fn flags(&self) -> LoginFlags {
        *self.flags.lock().await
    }

    pub async fn is_mfa_pending(&self) -> bool {
        self.phase.lock().await.is_mfa_pending()
    }

    pub async fn mfa_requirement(&self) -> Option<MfaRequirement> {
        self.phase
            .lock()
            .await
            .mfa_auth_data()
            .map(|data| data.mfa_requirement.clone())
    }

    pub async fn mfa_backend(&self) -> Option<String> {
        self.phase
            .lock()
            .await
            .mfa_auth_data()
            .map(|data| data.backend.clone())
    }
}
