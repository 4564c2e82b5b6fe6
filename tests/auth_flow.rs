use anyhow::Result;
use authflow::auth::finalize::{Landing, Route};
use authflow::auth::Credentials;
use authflow::controller::{NamespaceUpdate, ParamUpdate, Services};
use authflow::services::memory::{
    MemoryNamespaceService, MemoryNotifier, MemoryPermissions, MemorySessionState,
    ScriptedNavigator,
};
use authflow::services::SessionState;
use authflow::session::SessionContext;
use authflow::{AuthController, AuthResponse, Error, FlowConfig};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

const SETTLE: Duration = Duration::from_millis(200);

struct Harness {
    navigator: Arc<ScriptedNavigator>,
    notifier: Arc<MemoryNotifier>,
    namespaces: Arc<MemoryNamespaceService>,
    permissions: Arc<MemoryPermissions>,
    state: Arc<MemorySessionState>,
    controller: Arc<AuthController>,
}

fn harness(config: FlowConfig) -> Harness {
    let navigator = Arc::new(ScriptedNavigator::new(SETTLE));
    let notifier = Arc::new(MemoryNotifier::new());
    let namespaces = Arc::new(MemoryNamespaceService::new());
    let permissions = Arc::new(MemoryPermissions::new());
    let state = Arc::new(MemorySessionState::new());
    let services = Services {
        navigator: navigator.clone(),
        notifier: notifier.clone(),
        namespaces: namespaces.clone(),
        permissions: permissions.clone(),
        state: state.clone(),
    };
    let controller = Arc::new(AuthController::new(
        config,
        Arc::new(SessionContext::new()),
        services,
    ));

    Harness {
        navigator,
        notifier,
        namespaces,
        permissions,
        state,
        controller,
    }
}

fn response(is_root: bool, namespace: &str) -> AuthResponse {
    AuthResponse {
        is_root,
        namespace: namespace.to_string(),
        mfa_requirement: None,
    }
}

fn mfa_response(namespace: &str) -> Result<AuthResponse> {
    Ok(serde_json::from_value(json!({
        "isRoot": false,
        "namespace": namespace,
        "mfa_requirement": {
            "mfa_request_id": "d0c9eec7-6921-8cc0-be62-202b289ef163",
            "mfa_constraints": {
                "okta": { "any": [ { "type": "okta", "id": "e2fa6e43", "uses_passcode": false } ] }
            }
        }
    }))?)
}

#[tokio::test(start_paused = true)]
async fn rapid_namespace_edits_commit_only_the_last() -> Result<()> {
    let h = harness(FlowConfig::new().with_managed_namespace_root(Some("admin")));

    let mut tasks = Vec::new();
    for value in ["/a", "/b", "/c"] {
        let controller = Arc::clone(&h.controller);
        tasks.push(tokio::spawn(async move {
            controller.on_namespace_input_changed(value).await
        }));
        sleep(Duration::from_millis(200)).await;
    }

    let mut outcomes = Vec::new();
    for task in tasks {
        outcomes.push(task.await??);
    }

    assert_eq!(
        outcomes,
        vec![
            NamespaceUpdate::Superseded,
            NamespaceUpdate::Superseded,
            NamespaceUpdate::Committed("admin/c".to_string()),
        ]
    );
    assert_eq!(h.namespaces.committed(), vec![("admin/c".to_string(), true)]);
    assert_eq!(h.controller.namespace_input().await, "/c");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn slow_older_commit_never_overrides_newer_edit() -> Result<()> {
    let h = harness(FlowConfig::new());
    h.namespaces.set_latency("old", Duration::from_millis(2000));
    h.namespaces.set_latency("new", Duration::from_millis(10));

    let older = h.controller.spawn_namespace_input("old".to_string());
    sleep(Duration::from_millis(600)).await;
    let newer = h.controller.spawn_namespace_input("new".to_string());

    assert_eq!(older.await??, NamespaceUpdate::Superseded);
    assert_eq!(newer.await??, NamespaceUpdate::Committed("new".to_string()));

    let committed: Vec<_> = h.namespaces.committed().into_iter().map(|(ns, _)| ns).collect();
    assert_eq!(committed, vec!["old", "new"]);
    assert_eq!(h.controller.session().namespace().await, "new");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn spawned_edits_are_ordered_when_started() -> Result<()> {
    let h = harness(FlowConfig::new());

    let first = h.controller.spawn_namespace_input("a".to_string());
    let second = h.controller.spawn_query_param("namespace".to_string(), "b".to_string());
    let third = h.controller.spawn_namespace_input("c".to_string());

    assert_eq!(first.await??, NamespaceUpdate::Superseded);
    assert_eq!(
        second.await??,
        ParamUpdate::Namespace(NamespaceUpdate::Superseded)
    );
    assert_eq!(third.await??, NamespaceUpdate::Committed("c".to_string()));
    assert_eq!(h.namespaces.committed(), vec![("c".to_string(), true)]);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn managed_root_example_commits_after_quiet_period() -> Result<()> {
    let h = harness(FlowConfig::new().with_managed_namespace_root(Some("admin")));
    h.controller
        .session()
        .set_namespace("admin/team1".to_string())
        .await;
    assert_eq!(h.controller.namespace_input().await, "/team1");

    let controller = Arc::clone(&h.controller);
    let edit = tokio::spawn(async move { controller.on_namespace_input_changed("/team2").await });

    sleep(Duration::from_millis(499)).await;
    assert!(h.namespaces.committed().is_empty());

    assert_eq!(
        edit.await??,
        NamespaceUpdate::Committed("admin/team2".to_string())
    );
    assert_eq!(h.controller.session().namespace().await, "admin/team2");
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn direct_root_login_lands_and_warns_once() -> Result<()> {
    let h = harness(FlowConfig::new());

    let landing = h
        .controller
        .on_auth_response(response(true, "ns1"), "token", Credentials::new())
        .await?;

    assert_eq!(
        landing,
        Some(Landing::Settled {
            route: Route::landing("vault.cluster", "ns1"),
            root_warning: true,
        })
    );
    assert_eq!(h.navigator.started(), vec!["vault.cluster?namespace=ns1"]);
    assert_eq!(h.notifier.warnings().len(), 1);
    assert!(h.state.is_root_token());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn mfa_defers_finalization_until_success() -> Result<()> {
    let h = harness(FlowConfig::new());
    let data = Credentials::new()
        .with("username", "bob")
        .with("password", "hunter2");

    let landing = h
        .controller
        .on_auth_response(mfa_response("ns1")?, "okta", data)
        .await?;

    assert_eq!(landing, None);
    assert!(h.controller.is_mfa_pending().await);
    assert_eq!(h.controller.mfa_backend().await.as_deref(), Some("okta"));
    assert_eq!(
        h.controller
            .mfa_requirement()
            .await
            .map(|r| r.mfa_request_id),
        Some("d0c9eec7-6921-8cc0-be62-202b289ef163".to_string())
    );
    sleep(Duration::from_secs(5)).await;
    assert!(h.navigator.started().is_empty());

    let landing = h.controller.on_mfa_success(response(false, "ns1")).await?;

    assert_eq!(landing.route(), &Route::landing("vault.cluster", "ns1"));
    assert_eq!(h.navigator.started().len(), 1);
    assert!(!h.controller.is_mfa_pending().await);
    assert!(h.notifier.warnings().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn dismissed_mfa_never_finalizes() -> Result<()> {
    let h = harness(FlowConfig::new());
    h.controller
        .on_auth_response(mfa_response("ns1")?, "userpass", Credentials::new())
        .await?;
    h.controller
        .set_mfa_errors(vec!["TOTP passcode is invalid".to_string()])
        .await;

    h.controller.on_mfa_error_dismiss().await;

    assert!(!h.controller.is_mfa_pending().await);
    assert_eq!(h.controller.mfa_errors().await, None);
    assert!(matches!(
        h.controller.on_mfa_success(response(false, "ns1")).await,
        Err(Error::MfaNotPending)
    ));
    assert!(h.navigator.started().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn cancelled_mfa_never_finalizes() -> Result<()> {
    let h = harness(FlowConfig::new());
    h.controller
        .on_auth_response(mfa_response("ns1")?, "okta", Credentials::new())
        .await?;
    h.controller.set_waiting_for_okta_number_challenge(true).await;

    h.controller.cancel_authentication().await;

    let flags = h.controller.flags().await;
    assert!(flags.cancel_auth);
    assert!(!flags.waiting_for_okta_number_challenge);
    assert!(!h.controller.is_mfa_pending().await);
    assert!(h.navigator.started().is_empty());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn redirect_target_is_used_once() -> Result<()> {
    let h = harness(FlowConfig::new());
    h.controller
        .session()
        .set_redirect_to(Some("/foo".to_string()))
        .await;

    h.controller
        .on_auth_response(response(false, "ns1"), "token", Credentials::new())
        .await?;
    h.controller
        .on_auth_response(response(false, "ns1"), "token", Credentials::new())
        .await?;

    assert_eq!(
        h.navigator.started(),
        vec!["/foo", "vault.cluster?namespace=ns1"]
    );
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn failed_navigation_surfaces_and_suppresses_warning() -> Result<()> {
    let h = harness(FlowConfig::new());
    h.navigator.fail_on("vault.cluster?namespace=ns1");

    let result = h
        .controller
        .on_auth_response(response(true, "ns1"), "token", Credentials::new())
        .await;

    assert!(matches!(result, Err(Error::Navigation { .. })));
    assert!(h.notifier.warnings().is_empty());
    assert!(!h.state.is_root_token());
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn superseded_navigation_does_not_warn() -> Result<()> {
    let h = harness(FlowConfig::new());

    let controller = Arc::clone(&h.controller);
    let first = tokio::spawn(async move {
        controller
            .on_auth_response(response(true, "ns1"), "token", Credentials::new())
            .await
    });
    sleep(Duration::from_millis(50)).await;
    assert!(h.notifier.warnings().is_empty());

    let second = h
        .controller
        .on_auth_response(response(true, "ns2"), "token", Credentials::new())
        .await?;
    let first = first.await??;

    assert!(matches!(first, Some(Landing::Superseded { .. })));
    assert!(matches!(
        second,
        Some(Landing::Settled {
            root_warning: true,
            ..
        })
    ));
    assert_eq!(h.notifier.warnings().len(), 1);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn auth_success_and_settled_navigation_both_warn() -> Result<()> {
    let h = harness(FlowConfig::new());
    h.state.set_authenticated_root_token(true);

    h.controller
        .on_auth_response(response(true, "ns1"), "token", Credentials::new())
        .await?;
    h.controller.on_auth_success().await??;

    assert_eq!(h.permissions.loads(), 1);
    assert_eq!(h.notifier.warnings().len(), 2);
    Ok(())
}
