//! In-memory collaborators. They record every call so the replay command can
//! report what happened and tests can assert on it.

use super::{NamespaceService, Navigator, Notifier, PermissionsService, SessionState};
use crate::auth::finalize::Route;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::sleep;
use tracing::{info, warn};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Debug, Default)]
pub struct MemoryNotifier {
    warnings: Mutex<Vec<String>>,
}

impl MemoryNotifier {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn warnings(&self) -> Vec<String> {
        lock(&self.warnings).clone()
    }
}

impl Notifier for MemoryNotifier {
    fn warning(&self, message: &str) {
        warn!("{message}");
        lock(&self.warnings).push(message.to_string());
    }
}

/// Navigator whose transitions settle after a fixed delay. Hrefs listed with
/// [`ScriptedNavigator::fail_on`] never settle and report an error instead.
#[derive(Debug, Default)]
pub struct ScriptedNavigator {
    settle_after: Duration,
    failing: Mutex<HashSet<String>>,
    started: Mutex<Vec<String>>,
    settled: Mutex<Vec<String>>,
}

impl ScriptedNavigator {
    #[must_use]
    pub fn new(settle_after: Duration) -> Self {
        Self {
            settle_after,
            ..Self::default()
        }
    }

    pub fn fail_on(&self, href: &str) {
        lock(&self.failing).insert(href.to_string());
    }

    /// Hrefs in the order transitions started.
    #[must_use]
    pub fn started(&self) -> Vec<String> {
        lock(&self.started).clone()
    }

    /// Hrefs in the order transitions settled.
    #[must_use]
    pub fn settled(&self) -> Vec<String> {
        lock(&self.settled).clone()
    }
}

#[async_trait]
impl Navigator for ScriptedNavigator {
    async fn transition_to(&self, route: &Route) -> Result<()> {
        let href = route.href();
        lock(&self.started).push(href.clone());

        sleep(self.settle_after).await;

        if lock(&self.failing).contains(&href) {
            return Err(anyhow!("transition to {href} aborted"));
        }

        lock(&self.settled).push(href);
        Ok(())
    }
}

/// Namespace store. Paths registered with
/// [`MemoryNamespaceService::set_latency`] take that long to commit.
#[derive(Debug, Default)]
pub struct MemoryNamespaceService {
    fail: AtomicBool,
    latency: Mutex<HashMap<String, Duration>>,
    committed: Mutex<Vec<(String, bool)>>,
}

impl MemoryNamespaceService {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    pub fn set_latency(&self, path: &str, latency: Duration) {
        lock(&self.latency).insert(path.to_string(), latency);
    }

    /// Committed namespaces with their user-initiated flag.
    #[must_use]
    pub fn committed(&self) -> Vec<(String, bool)> {
        lock(&self.committed).clone()
    }
}

#[async_trait]
impl NamespaceService for MemoryNamespaceService {
    async fn set_namespace(&self, path: &str, user_initiated: bool) -> Result<()> {
        let latency = lock(&self.latency).get(path).copied();
        if let Some(latency) = latency {
            sleep(latency).await;
        }
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("namespace store unavailable"));
        }
        info!(namespace = path, user_initiated, "namespace set");
        lock(&self.committed).push((path.to_string(), user_initiated));
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemoryPermissions {
    fail: AtomicBool,
    loads: AtomicUsize,
}

impl MemoryPermissions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    #[must_use]
    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PermissionsService for MemoryPermissions {
    async fn load_paths(&self) -> Result<()> {
        self.loads.fetch_add(1, Ordering::SeqCst);
        if self.fail.load(Ordering::SeqCst) {
            return Err(anyhow!("permission paths unavailable"));
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
pub struct MemorySessionState {
    is_root_token: AtomicBool,
    authenticated_is_root_token: AtomicBool,
}

impl MemorySessionState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_authenticated_root_token(&self, is_root: bool) {
        self.authenticated_is_root_token.store(is_root, Ordering::SeqCst);
    }
}

impl SessionState for MemorySessionState {
    fn is_root_token(&self) -> bool {
        self.is_root_token.load(Ordering::SeqCst)
    }

    fn set_root_token(&self, is_root: bool) {
        self.is_root_token.store(is_root, Ordering::SeqCst);
    }

    fn authenticated_is_root_token(&self) -> bool {
        self.authenticated_is_root_token.load(Ordering::SeqCst)
    }
}
