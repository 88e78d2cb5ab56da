// User directory: resolves a user id to the contact details the mail and
// short-message channels need.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use crate::db::Database;

/// Where a user can be reached. Either field may be missing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Contact {
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// Look up a user's contact details. `Ok(None)` means the user is unknown.
    async fn contact(&self, user_id: &str) -> Result<Option<Contact>>;
}

/// Directory backed by the `users` table.
pub struct DatabaseDirectory {
    db: Arc<dyn Database>,
}

impl DatabaseDirectory {
    pub fn new(db: Arc<dyn Database>) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserDirectory for DatabaseDirectory {
    async fn contact(&self, user_id: &str) -> Result<Option<Contact>> {
        let user = self.db.get_user(user_id).await?;
        Ok(user.map(|u| Contact {
            email: u.email.filter(|e| !e.is_empty()),
            phone: u.phone.filter(|p| !p.is_empty()),
        }))
    }
}

/// Fixed in-memory directory for callers without a database, such as tests.
#[derive(Default)]
pub struct StaticDirectory {
    entries: HashMap<String, Contact>,
}

impl StaticDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_contact(mut self, user_id: impl Into<String>, contact: Contact) -> Self {
        self.entries.insert(user_id.into(), contact);
        self
    }
}

#[async_trait]
impl UserDirectory for StaticDirectory {
    async fn contact(&self, user_id: &str) -> Result<Option<Contact>> {
        Ok(self.entries.get(user_id).cloned())
    }
}
