//! User persistence.
//!
//! Handlers only see the [`UserStore`] trait; the server wires in
//! [`PgUserStore`] and the tests use [`MemoryUserStore`].

mod memory;
mod postgres;

pub use memory::MemoryUserStore;
pub use postgres::PgUserStore;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt::Debug;
use uuid::Uuid;

/// A stored user.
#[derive(Debug, Clone, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    /// argon2 PHC string, never the raw password.
    #[serde(skip_serializing)]
    pub password: String,
    pub created_at: DateTime<Utc>,
}

/// Data needed to insert a user. The password is already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub password_hash: String,
}

#[async_trait]
pub trait UserStore: Send + Sync + Debug {
    /// Exact, case-sensitive username lookup.
    async fn username_exists(&self, username: &str) -> Result<bool>;

    /// Insert a user.
    ///
    /// # Errors
    /// Fails if the username is taken or the backend is unavailable.
    async fn create_user(&self, new_user: NewUser) -> Result<User>;

    /// Cheap liveness check used by `/health`.
    async fn ping(&self) -> Result<()>;
}
