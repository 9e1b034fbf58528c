use super::{NewUser, User, UserStore};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{debug, instrument};
use uuid::Uuid;

/// Process-local store, nothing survives a restart.
#[derive(Debug, Default)]
pub struct MemoryUserStore {
    users: RwLock<Vec<User>>,
}

impl MemoryUserStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn len(&self) -> usize {
        self.users.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.users.read().await.is_empty()
    }

    pub async fn find(&self, username: &str) -> Option<User> {
        self.users
            .read()
            .await
            .iter()
            .find(|user| user.username == username)
            .cloned()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn username_exists(&self, username: &str) -> Result<bool> {
        Ok(self
            .users
            .read()
            .await
            .iter()
            .any(|user| user.username == username))
    }

    #[instrument(skip(self, new_user), fields(username = %new_user.username))]
    async fn create_user(&self, new_user: NewUser) -> Result<User> {
        let mut users = self.users.write().await;

        // same guarantee as the unique index in sql/schema.sql
        if users.iter().any(|user| user.username == new_user.username) {
            return Err(anyhow!("username already exists: {}", new_user.username));
        }

        let user = User {
            id: Uuid::now_v7(),
            username: new_user.username,
            password: new_user.password_hash,
            created_at: Utc::now(),
        };

        users.push(user.clone());

        debug!("user stored in memory, {} total", users.len());

        Ok(user)
    }

    async fn ping(&self) -> Result<()> {
        Ok(())
    }
}
