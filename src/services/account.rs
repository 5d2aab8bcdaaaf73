//! Account lifecycle: register, login, logout, rename, password change.
//! Every operation that issues or destroys a token keeps the token cache
//! (`account:{id}`, TTL 24h) in step with the account row.

use crate::cache::{keys, CacheClient};
use crate::error::{AppError, AppResult};
use crate::models::{Account, AccountView};
use crate::repository::accounts::AccountRepository;
use crate::security::password::{hash_password, verify_password};
use crate::security::token::TokenKeys;
use crate::services::is_unique_violation;
use std::time::Duration;

const TOKEN_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

#[derive(Clone)]
pub struct AccountService {
    repo: AccountRepository,
    cache: Option<CacheClient>,
    tokens: TokenKeys,
}

impl AccountService {
    pub fn new(repo: AccountRepository, cache: Option<CacheClient>, tokens: TokenKeys) -> Self {
        Self { repo, cache, tokens }
    }

    pub async fn register(&self, username: &str, password: &str) -> AppResult<AccountView> {
        let username = username.trim();
        if username.is_empty() {
            return Err(AppError::BadRequest("username is required".into()));
        }
        if password.is_empty() {
            return Err(AppError::BadRequest("password is required".into()));
        }

        let password_hash = hash_password(password)?;
        match self.repo.create(username, &password_hash).await {
            Ok(account) => Ok(AccountView::from(&account)),
            Err(e) if is_unique_violation(&e) => {
                Err(AppError::Conflict("username already exists".into()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Issues a fresh token, stores it as the single active token and mirrors
    /// it into the cache.
    pub async fn login(&self, username: &str, password: &str) -> AppResult<String> {
        let account = self
            .repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::BadRequest("invalid username or password".into()))?;

        if !verify_password(password, &account.password_hash)? {
            return Err(AppError::BadRequest("invalid username or password".into()));
        }

        let token = self.tokens.generate(account.id, &account.username)?;
        self.repo.set_token(account.id, &token).await?;
        self.cache_token(account.id, &token).await;
        Ok(token)
    }

    /// Clearing the stored token revokes the session everywhere; the cache
    /// entry goes first so a stale copy cannot re-admit the old token.
    pub async fn logout(&self, account_id: i64) -> AppResult<()> {
        let account = self
            .repo
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AppError::NotFound("account not found".into()))?;

        if account.token.is_empty() {
            return Ok(());
        }

        self.drop_cached_token(account.id).await;
        self.repo.clear_token(account.id).await?;
        Ok(())
    }

    /// Rename re-issues the token (claims embed the username), so the old
    /// token is revoked the moment the transaction commits.
    pub async fn rename(&self, account_id: i64, new_username: &str) -> AppResult<String> {
        let new_username = new_username.trim();
        if new_username.is_empty() {
            return Err(AppError::BadRequest("new_username is required".into()));
        }

        let token = self.tokens.generate(account_id, new_username)?;
        match self.repo.rename_with_token(account_id, new_username, &token).await {
            Ok(true) => {}
            Ok(false) => return Err(AppError::NotFound("account not found".into())),
            Err(e) if is_unique_violation(&e) => {
                return Err(AppError::Conflict("username already exists".into()))
            }
            Err(e) => return Err(e.into()),
        }

        self.cache_token(account_id, &token).await;
        Ok(token)
    }

    /// Verifies the old password, stores the new hash, then logs the account
    /// out so the active token is invalidated.
    pub async fn change_password(
        &self,
        username: &str,
        old_password: &str,
        new_password: &str,
    ) -> AppResult<()> {
        if new_password.is_empty() {
            return Err(AppError::BadRequest("new_password is required".into()));
        }

        let account = self
            .repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::BadRequest("invalid username or password".into()))?;

        if !verify_password(old_password, &account.password_hash)? {
            return Err(AppError::BadRequest("invalid username or password".into()));
        }

        let password_hash = hash_password(new_password)?;
        self.repo.change_password(account.id, &password_hash).await?;
        self.logout(account.id).await
    }

    pub async fn find_by_id(&self, id: i64) -> AppResult<AccountView> {
        let account = self
            .repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::BadRequest("account not found".into()))?;
        Ok(AccountView::from(&account))
    }

    pub async fn find_by_username(&self, username: &str) -> AppResult<AccountView> {
        let account = self
            .repo
            .find_by_username(username)
            .await?
            .ok_or_else(|| AppError::BadRequest("account not found".into()))?;
        Ok(AccountView::from(&account))
    }

    pub fn views(accounts: &[Account]) -> Vec<AccountView> {
        accounts.iter().map(AccountView::from).collect()
    }

    async fn cache_token(&self, account_id: i64, token: &str) {
        if let Some(cache) = &self.cache {
            let key = keys::account_token(account_id);
            if let Err(e) = cache.set_bytes(&key, token.as_bytes(), TOKEN_CACHE_TTL).await {
                tracing::warn!(error = %e, account_id, "failed to cache session token");
            }
        }
    }

    async fn drop_cached_token(&self, account_id: i64) {
        if let Some(cache) = &self.cache {
            let key = keys::account_token(account_id);
            if let Err(e) = cache.del(&key).await {
                tracing::warn!(error = %e, account_id, "failed to drop cached session token");
            }
        }
    }
}
