//! Login gate.
//!
//! Users are configured under `[users.<login>]` with a display name, a role
//! and either a SHA-256 digest of the password or the password itself.
//! A [`Session`] is the explicit per-run login context carried by the app.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::visits::VisitId;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AuthError {
    #[error("Invalid login or password")]
    InvalidCredentials,

    #[error("User '{0}' has no password configured")]
    NoPassword(String),
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[default]
    Viewer,
}

impl Role {
    pub fn label(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Viewer => "viewer",
        }
    }
}

/// A configured user as read from the config file.
#[derive(Clone, Default, Deserialize)]
pub struct UserEntry {
    pub name: String,
    #[serde(default)]
    pub password_sha256: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub role: Role,
}

impl fmt::Debug for UserEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserEntry")
            .field("name", &self.name)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

/// An authenticated user's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct User {
    pub login: String,
    pub name: String,
    pub role: Role,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Lowercase hex SHA-256 of `password`.
pub fn password_digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// The set of users allowed to log in.
#[derive(Debug, Clone, Default)]
pub struct UserDirectory {
    users: BTreeMap<String, UserEntry>,
}

impl UserDirectory {
    pub fn new(users: BTreeMap<String, UserEntry>) -> Self {
        let users = users
            .into_iter()
            .map(|(login, entry)| (login.trim().to_lowercase(), entry))
            .collect();
        Self { users }
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    /// Check a login/password pair.
    ///
    /// Logins are matched case-insensitively. A stored digest takes
    /// precedence over a plain password.
    pub fn verify(&self, login: &str, password: &str) -> Result<User, AuthError> {
        let login = login.trim().to_lowercase();
        let entry = self.users.get(&login).ok_or_else(|| {
            warn!(login = %login, "Login attempt for unknown user");
            AuthError::InvalidCredentials
        })?;

        let matches = match (&entry.password_sha256, &entry.password) {
            (Some(digest), _) => digest.trim().eq_ignore_ascii_case(&password_digest(password)),
            (None, Some(plain)) => plain == password,
            (None, None) => return Err(AuthError::NoPassword(login)),
        };

        if !matches {
            warn!(login = %login, "Wrong password");
            return Err(AuthError::InvalidCredentials);
        }

        info!(login = %login, role = entry.role.label(), "User authenticated");
        Ok(User {
            name: if entry.name.is_empty() {
                login.clone()
            } else {
                entry.name.clone()
            },
            login,
            role: entry.role,
        })
    }
}

/// Login state for one run of the dashboard.
#[derive(Debug, Clone, Default)]
pub struct Session {
    user: Option<User>,
    visit_id: Option<VisitId>,
}

impl Session {
    pub fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    pub fn user(&self) -> Option<&User> {
        self.user.as_ref()
    }

    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    /// The open visit, when the visit log accepted the login.
    pub fn visit_id(&self) -> Option<VisitId> {
        self.visit_id
    }

    pub fn login(&mut self, user: User, visit_id: Option<VisitId>) {
        self.user = Some(user);
        self.visit_id = visit_id;
    }

    /// Clear the session, returning the visit that should be closed.
    pub fn logout(&mut self) -> Option<VisitId> {
        self.user = None;
        self.visit_id.take()
    }
}
