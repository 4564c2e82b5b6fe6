//! Auth outcome types and the dispatcher state machine.
//!
//! A response carrying an MFA requirement parks the submission in
//! [`AuthPhase::MfaPending`]; nothing is finalized until the MFA sub-flow
//! reports success. Dismissal or cancellation drops the parked submission and
//! leaves the session unauthenticated.

pub mod finalize;

use crate::error::{Error, Result};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Result of a credential submission.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct AuthResponse {
    #[serde(default, alias = "isRoot")]
    pub is_root: bool,
    #[serde(default)]
    pub namespace: String,
    #[serde(default)]
    pub mfa_requirement: Option<MfaRequirement>,
}

impl AuthResponse {
    /// # Errors
    /// Returns an error if `json` is not a valid auth response.
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    #[must_use]
    pub fn requires_mfa(&self) -> bool {
        self.mfa_requirement.is_some()
    }
}

/// MFA challenge issued by the auth backend.
#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MfaRequirement {
    pub mfa_request_id: String,
    #[serde(default)]
    pub mfa_constraints: BTreeMap<String, MfaConstraint>,
}

impl MfaRequirement {
    /// Every method that can satisfy one of the constraints.
    pub fn methods(&self) -> impl Iterator<Item = &MfaMethod> {
        self.mfa_constraints.values().flat_map(|c| c.any.iter())
    }
}

#[derive(Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct MfaConstraint {
    #[serde(default)]
    pub any: Vec<MfaMethod>,
}

#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
pub struct MfaMethod {
    #[serde(rename = "type")]
    pub method_type: String,
    pub id: String,
    #[serde(default)]
    pub uses_passcode: bool,
}

/// Submitted credential fields. Values are kept secret and never printed.
#[derive(Debug, Default)]
pub struct Credentials(BTreeMap<String, SecretString>);

impl Credentials {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, key: &str, value: &str) -> Self {
        self.0.insert(key.to_string(), SecretString::from(value.to_string()));
        self
    }

    /// Collects the string fields of a JSON object; other values are skipped.
    #[must_use]
    pub fn from_json(value: &Value) -> Self {
        let fields = value
            .as_object()
            .map(|object| {
                object
                    .iter()
                    .filter_map(|(key, value)| {
                        value
                            .as_str()
                            .map(|v| (key.clone(), SecretString::from(v.to_string())))
                    })
                    .collect()
            })
            .unwrap_or_default();
        Self(fields)
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&SecretString> {
        self.0.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// Everything the MFA sub-flow needs to continue the original submission.
#[derive(Debug)]
pub struct MfaAuthData {
    pub mfa_requirement: MfaRequirement,
    pub backend: String,
    pub data: Credentials,
}

/// Completed login handed to the finalizer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LoginSuccess {
    pub is_root: bool,
    pub namespace: String,
}

impl From<AuthResponse> for LoginSuccess {
    fn from(response: AuthResponse) -> Self {
        Self {
            is_root: response.is_root,
            namespace: response.namespace,
        }
    }
}

#[derive(Debug, Default)]
pub enum AuthPhase {
    #[default]
    Direct,
    MfaPending(MfaAuthData),
}

impl AuthPhase {
    #[must_use]
    pub fn is_mfa_pending(&self) -> bool {
        matches!(self, Self::MfaPending(_))
    }

    #[must_use]
    pub fn mfa_auth_data(&self) -> Option<&MfaAuthData> {
        match self {
            Self::MfaPending(data) => Some(data),
            Self::Direct => None,
        }
    }

    /// Handles a credential submission result. Returns the login to finalize,
    /// or `None` when an MFA challenge has been parked.
    ///
    /// A new submission replaces any challenge still pending.
    pub fn receive(
        &mut self,
        response: AuthResponse,
        backend: &str,
        data: Credentials,
    ) -> Option<LoginSuccess> {
        match response.mfa_requirement {
            Some(mfa_requirement) => {
                *self = Self::MfaPending(MfaAuthData {
                    mfa_requirement,
                    backend: backend.to_string(),
                    data,
                });
                None
            }
            None => {
                *self = Self::Direct;
                Some(LoginSuccess {
                    is_root: response.is_root,
                    namespace: response.namespace,
                })
            }
        }
    }

    /// Handles the MFA sub-flow's final response.
    ///
    /// # Errors
    /// Returns [`Error::MfaNotPending`] if no challenge is parked.
    pub fn resolve_mfa(&mut self, response: AuthResponse) -> Result<LoginSuccess> {
        if !self.is_mfa_pending() {
            return Err(Error::MfaNotPending);
        }
        *self = Self::Direct;
        Ok(response.into())
    }

    /// Drops a parked challenge. Returns whether one was pending.
    pub fn abandon(&mut self) -> bool {
        matches!(std::mem::take(self), Self::MfaPending(_))
    }
}
