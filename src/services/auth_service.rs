//! Domain service for user accounts.
//!
//! Accounts only serve to attribute comments; no geodata endpoint requires one.

use serde::Serialize;
use thiserror::Error;

use crate::domain::UserId;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("User name already taken")]
    NameTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

/// Public part of an account, as shown next to comments.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UserInfo {
    pub id: UserId,
    pub name: String,
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Creates an account.
    ///
    /// # Errors
    ///
    /// - Returns [`AuthError::NameTaken`] if the name exists
    /// - Returns [`AuthError::Validation`] for short passwords or names
    async fn register(
        &self,
        name: &str,
        email: Option<&str>,
        password: &str,
    ) -> Result<UserInfo, AuthError>;

    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] if login fails.
    async fn login(&self, name: &str, password: &str) -> Result<UserInfo, AuthError>;

    async fn get_user(&self, id: UserId) -> Result<Option<UserInfo>, AuthError>;
}
