//! Sign-in Upsert
//!
//! Handles the callback payload the mail-based identity provider delivers
//! after it has verified a magic link.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::user::{NewUser, UserRecord, UserStore};

/// Payload supplied by the identity provider after link verification
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct VerifiedSignIn {
    /// Verified email address
    pub email: String,

    /// Display name, if the provider has one
    #[serde(default)]
    pub name: Option<String>,
}

/// Result of a sign-in upsert
#[derive(Clone, Debug)]
pub struct SignInOutcome {
    pub user: UserRecord,
    pub created: bool,
}

/// Normalize an email for lookup and storage
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Idempotent upsert: look up by email, create only if absent.
///
/// Calls the store at most once for the lookup and at most once for the
/// create; a repeat sign-in with the same email leaves the store unchanged.
pub fn upsert_user(store: &dyn UserStore, signin: &VerifiedSignIn) -> Result<SignInOutcome> {
    let email = normalize_email(&signin.email);

    if let Some(existing) = store.get_user_by_email(&email)? {
        tracing::debug!(email = %email, "Sign-in for existing user");
        return Ok(SignInOutcome {
            user: existing,
            created: false,
        });
    }

    let user = store.create_user(NewUser {
        email: email.clone(),
        name: signin.name.clone(),
    })?;

    tracing::info!(user_id = %user.id, email = %email, "Created user from sign-in");

    Ok(SignInOutcome {
        user,
        created: true,
    })
}
