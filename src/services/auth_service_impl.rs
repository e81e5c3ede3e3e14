//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::{Store, User};
use crate::domain::UserId;
use crate::services::auth_service::{AuthError, AuthService, UserInfo};
use async_trait::async_trait;
use tracing::info;

const NAME_LENGTH: std::ops::RangeInclusive<usize> = 3..=50;

pub struct SeaOrmAuthService {
    store: Store,
    security: SecurityConfig,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, security: SecurityConfig) -> Self {
        Self { store, security }
    }
}

fn info_from(user: User) -> UserInfo {
    UserInfo {
        id: user.id,
        name: user.name,
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(
        &self,
        name: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<UserInfo, AuthError> {
        let name = name.trim();
        if !NAME_LENGTH.contains(&name.chars().count()) {
            return Err(AuthError::Validation(
                "Name must be between 3 and 50 characters".to_string(),
            ));
        }
        if password.chars().count() < self.security.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.security.min_password_length
            )));
        }

        if self.store.get_user_by_name(name).await?.is_some() {
            return Err(AuthError::NameTaken);
        }

        let user = self
            .store
            .create_user(name, email, password, &self.security)
            .await?;

        info!(user_id = %user.id, "Registered user {}", user.name);
        Ok(info_from(user))
    }

    async fn login(&self, name: &str, password: &str) -> Result<UserInfo, AuthError> {
        self.store
            .verify_user_password(name, password)
            .await?
            .map(info_from)
            .ok_or(AuthError::InvalidCredentials)
    }

    async fn get_user(&self, id: UserId) -> Result<Option<UserInfo>, AuthError> {
        Ok(self.store.get_user(id).await?.map(info_from))
    }
}
