//! Replays a login event script against in-memory services and prints what
//! the flow did as JSON.

use crate::auth::{AuthResponse, Credentials};
use crate::config::FlowConfig;
use crate::controller::{AuthController, NamespaceUpdate, ParamUpdate, Services};
use crate::services::SessionState;
use crate::services::memory::{
    MemoryNamespaceService, MemoryNotifier, MemoryPermissions, MemorySessionState,
    ScriptedNavigator,
};
use crate::session::SessionContext;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

#[derive(Debug)]
pub struct Args {
    pub script: PathBuf,
    pub settle_after: Duration,
    pub config: FlowConfig,
}

#[derive(Debug, Default, Deserialize)]
pub struct Script {
    /// Login URL query string, example: `with=userpass&namespace=admin%2Fteam1`.
    #[serde(default)]
    pub query: String,
    /// Root flag already stored with the authenticated session.
    #[serde(default)]
    pub authenticated_root: bool,
    /// Navigation targets that never settle.
    #[serde(default)]
    pub failing_routes: Vec<String>,
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    NamespaceInput {
        value: String,
    },
    QueryParam {
        key: String,
        value: String,
    },
    Redirect {
        target: String,
    },
    AuthResponse {
        response: AuthResponse,
        backend: String,
        #[serde(default)]
        data: Value,
    },
    MfaSuccess {
        response: AuthResponse,
    },
    MfaError {
        errors: Vec<String>,
    },
    MfaDismiss,
    AuthSuccess,
    Cancel,
    Wait {
        ms: u64,
    },
}

impl Event {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::NamespaceInput { .. } => "namespace_input",
            Self::QueryParam { .. } => "query_param",
            Self::Redirect { .. } => "redirect",
            Self::AuthResponse { .. } => "auth_response",
            Self::MfaSuccess { .. } => "mfa_success",
            Self::MfaError { .. } => "mfa_error",
            Self::MfaDismiss => "mfa_dismiss",
            Self::AuthSuccess => "auth_success",
            Self::Cancel => "cancel",
            Self::Wait { .. } => "wait",
        }
    }
}

#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct Summary {
    pub committed_namespaces: Vec<String>,
    pub namespace_input: String,
    pub navigations_started: Vec<String>,
    pub navigations_settled: Vec<String>,
    pub warnings: Vec<String>,
    pub permission_loads: usize,
    pub root_token: bool,
    pub mfa_pending: bool,
    pub mfa_errors: Option<Vec<String>>,
    pub errors: Vec<String>,
}

/// Handle the replay action
///
/// # Errors
/// Returns an error if the script cannot be read or parsed.
pub async fn execute(args: Args) -> Result<()> {
    let raw = tokio::fs::read_to_string(&args.script)
        .await
        .with_context(|| format!("failed to read {}", args.script.display()))?;
    let script: Script = serde_json::from_str(&raw)
        .with_context(|| format!("invalid script {}", args.script.display()))?;

    let summary = run(script, args.config, args.settle_after).await;

    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}

fn describe(err: crate::Error) -> String {
    format!("{:#}", anyhow::Error::from(err))
}

/// Runs every event in order. Namespace edits run in the background so later
/// events can supersede them, but they are ordered when their event is read;
/// everything else is awaited in place. Errors are
/// collected into the summary rather than aborting the replay.
pub async fn run(script: Script, config: FlowConfig, settle_after: Duration) -> Summary {
    let navigator = Arc::new(ScriptedNavigator::new(settle_after));
    for route in &script.failing_routes {
        navigator.fail_on(route);
    }
    let notifier = Arc::new(MemoryNotifier::new());
    let namespaces = Arc::new(MemoryNamespaceService::new());
    let permissions = Arc::new(MemoryPermissions::new());
    let state = Arc::new(MemorySessionState::new());
    state.set_authenticated_root_token(script.authenticated_root);

    let services = Services {
        navigator: navigator.clone(),
        notifier: notifier.clone(),
        namespaces: namespaces.clone(),
        permissions: permissions.clone(),
        state: state.clone(),
    };
    let session = Arc::new(SessionContext::from_query(&script.query));
    let controller = Arc::new(AuthController::new(config, session, services));

    let mut errors = Vec::new();
    let mut background: Vec<JoinHandle<Option<String>>> = Vec::new();

    for event in script.events {
        debug!(event = event.name(), "replaying");
        match event {
            Event::NamespaceInput { value } => {
                let update = controller.spawn_namespace_input(value);
                background.push(tokio::spawn(async move {
                    match update.await {
                        Ok(result) => result.err().map(describe),
                        Err(e) => Some(format!("namespace task failed: {e}")),
                    }
                }));
            }
            Event::QueryParam { key, value } => {
                let update = controller.spawn_query_param(key, value);
                background.push(tokio::spawn(async move {
                    match update.await {
                        Ok(Ok(ParamUpdate::Namespace(NamespaceUpdate::Committed(ns)))) => {
                            info!(namespace = ns, "namespace parameter applied");
                            None
                        }
                        Ok(Ok(_)) => None,
                        Ok(Err(e)) => Some(describe(e)),
                        Err(e) => Some(format!("query parameter task failed: {e}")),
                    }
                }));
            }
            Event::Redirect { target } => {
                controller.session().set_redirect_to(Some(target)).await;
            }
            Event::AuthResponse {
                response,
                backend,
                data,
            } => {
                let data = Credentials::from_json(&data);
                if let Err(e) = controller.on_auth_response(response, &backend, data).await {
                    errors.push(describe(e));
                }
            }
            Event::MfaSuccess { response } => {
                if let Err(e) = controller.on_mfa_success(response).await {
                    errors.push(describe(e));
                }
            }
            Event::MfaError { errors: reported } => controller.set_mfa_errors(reported).await,
            Event::MfaDismiss => controller.on_mfa_error_dismiss().await,
            Event::AuthSuccess => match controller.on_auth_success().await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => {
                    error!("permission load failed: {}", e);
                    errors.push(describe(e));
                }
                Err(e) => errors.push(format!("permission load task failed: {e}")),
            },
            Event::Cancel => controller.cancel_authentication().await,
            Event::Wait { ms } => sleep(Duration::from_millis(ms)).await,
        }
    }

    for handle in background {
        match handle.await {
            Ok(Some(e)) => errors.push(e),
            Ok(None) => {}
            Err(e) => errors.push(format!("namespace task failed: {e}")),
        }
    }

    Summary {
        committed_namespaces: namespaces.committed().into_iter().map(|(ns, _)| ns).collect(),
        namespace_input: controller.namespace_input().await,
        navigations_started: navigator.started(),
        navigations_settled: navigator.settled(),
        warnings: notifier.warnings(),
        permission_loads: permissions.loads(),
        root_token: state.is_root_token(),
        mfa_pending: controller.is_mfa_pending().await,
        mfa_errors: controller.mfa_errors().await,
        errors,
    }
}
