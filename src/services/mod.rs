//! Collaborators the login flow drives but does not own.

pub mod memory;

use crate::auth::finalize::Route;
use anyhow::Result;
use async_trait::async_trait;

/// Fire-and-forget user notifications.
pub trait Notifier: Send + Sync {
    fn warning(&self, message: &str);
}

#[async_trait]
pub trait Navigator: Send + Sync {
    /// Starts a transition to `route` and resolves once it and every redirect
    /// it triggers have settled.
    ///
    /// # Errors
    /// Returns an error if the transition is aborted or never settles.
    async fn transition_to(&self, route: &Route) -> Result<()>;
}

#[async_trait]
pub trait NamespaceService: Send + Sync {
    /// Makes `path` the active namespace for the whole session.
    ///
    /// # Errors
    /// Returns an error if the namespace cannot be stored.
    async fn set_namespace(&self, path: &str, user_initiated: bool) -> Result<()>;
}

#[async_trait]
pub trait PermissionsService: Send + Sync {
    /// Loads the permission paths of the authenticated session.
    ///
    /// # Errors
    /// Returns an error if the paths cannot be fetched.
    async fn load_paths(&self) -> Result<()>;
}

/// Session-wide auth flags.
pub trait SessionState: Send + Sync {
    fn is_root_token(&self) -> bool;
    fn set_root_token(&self, is_root: bool);
    /// Root flag persisted with the authenticated session data.
    fn authenticated_is_root_token(&self) -> bool;
}
