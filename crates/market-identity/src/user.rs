//! User Records
//!
//! User storage behind the [`UserStore`] trait. Records created from a
//! sign-in are never anonymous and their identity fields are never
//! overwritten by later sign-ins.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;
use uuid::Uuid;

use crate::error::Result;

/// A user record
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct UserRecord {
    /// User ID
    pub id: Uuid,

    /// Normalized email address
    pub email: String,

    /// Display name, if the identity provider supplied one
    pub name: Option<String>,

    /// Whether this is a guest record without a verified identity
    pub is_anonymous: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

/// Fields for creating a user record
#[derive(Clone, Debug)]
pub struct NewUser {
    pub email: String,
    pub name: Option<String>,
}

impl UserRecord {
    /// Create a verified (non-anonymous) record
    pub fn from_new(new: NewUser) -> Self {
        Self {
            id: Uuid::new_v4(),
            email: new.email,
            name: new.name,
            is_anonymous: false,
            created_at: Utc::now(),
        }
    }
}

/// User storage trait
pub trait UserStore: Send + Sync {
    /// Look up a user by normalized email
    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>>;

    /// Create a user record. Must not overwrite an existing record for the
    /// same email; implementations return the existing record instead.
    fn create_user(&self, new: NewUser) -> Result<UserRecord>;
}

/// In-memory user store (for development)
pub struct MemoryUserStore {
    users: RwLock<HashMap<String, UserRecord>>,
}

impl Default for MemoryUserStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self {
            users: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records
    pub fn len(&self) -> usize {
        self.users.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl UserStore for MemoryUserStore {
    fn get_user_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        let users = self.users.read().unwrap();
        Ok(users.get(email).cloned())
    }

    fn create_user(&self, new: NewUser) -> Result<UserRecord> {
        let mut users = self.users.write().unwrap();

        if let Some(existing) = users.get(&new.email) {
            return Ok(existing.clone());
        }

        let user = UserRecord::from_new(new);
        users.insert(user.email.clone(), user.clone());
        Ok(user)
    }
}
