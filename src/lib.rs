//! Post-login orchestration for a browser session.
//!
//! Flow Overview:
//! 1) The namespace input is debounced, sanitized and committed as a fully
//!    qualified path (the managed root, when configured, is re-attached).
//! 2) An auth response either completes the login or parks an MFA challenge
//!    until the MFA sub-flow reports success, dismissal or cancellation.
//! 3) A completed login navigates to the one-shot redirect target or to the
//!    landing route, and only after that navigation settles raises the
//!    root-token warning.
//!
//! Routers, notifications, namespace storage and permission loading are
//! collaborators described in [`services`].

pub mod auth;
pub mod cli;
pub mod config;
pub mod controller;
pub mod error;
pub mod namespace;
pub mod services;
pub mod session;

pub use auth::{AuthPhase, AuthResponse, MfaAuthData, MfaRequirement};
pub use config::FlowConfig;
pub use controller::AuthController;
pub use error::{Error, Result};
