//! Follow graph writes and listings. Follow/unfollow publish a state event
//! and fall back to the direct edge write when the publish fails. No
//! popularity delta is attributed to follow activity.

use crate::error::{AppError, AppResult};
use crate::events::{EventPublisher, SocialEvent};
use crate::models::AccountView;
use crate::repository::accounts::AccountRepository;
use crate::repository::social::SocialRepository;
use crate::services::account::AccountService;

#[derive(Clone)]
pub struct SocialService {
    repo: SocialRepository,
    accounts: AccountRepository,
    events: Option<EventPublisher>,
}

impl SocialService {
    pub fn new(
        repo: SocialRepository,
        accounts: AccountRepository,
        events: Option<EventPublisher>,
    ) -> Self {
        Self {
            repo,
            accounts,
            events,
        }
    }

    pub async fn follow(&self, follower_id: i64, vlogger_id: i64) -> AppResult<()> {
        self.ensure_both_exist(follower_id, vlogger_id).await?;

        if follower_id == vlogger_id {
            return Err(AppError::BadRequest("can not follow self".into()));
        }
        if self.repo.is_followed(follower_id, vlogger_id).await? {
            return Err(AppError::BadRequest("already followed".into()));
        }

        if let Some(events) = &self.events {
            let evt = SocialEvent::follow(follower_id, vlogger_id);
            if events.publish_social(&evt).await.is_ok() {
                return Ok(());
            }
        }

        // Direct write; a concurrent duplicate is absorbed by the constraint.
        self.repo.follow(follower_id, vlogger_id).await?;
        Ok(())
    }

    pub async fn unfollow(&self, follower_id: i64, vlogger_id: i64) -> AppResult<()> {
        self.ensure_both_exist(follower_id, vlogger_id).await?;

        if !self.repo.is_followed(follower_id, vlogger_id).await? {
            return Err(AppError::BadRequest("not followed".into()));
        }

        if let Some(events) = &self.events {
            let evt = SocialEvent::unfollow(follower_id, vlogger_id);
            if events.publish_social(&evt).await.is_ok() {
                return Ok(());
            }
        }

        self.repo.unfollow(follower_id, vlogger_id).await?;
        Ok(())
    }

    pub async fn is_followed(&self, follower_id: i64, vlogger_id: i64) -> AppResult<bool> {
        self.ensure_both_exist(follower_id, vlogger_id).await?;
        Ok(self.repo.is_followed(follower_id, vlogger_id).await?)
    }

    pub async fn followers(&self, vlogger_id: i64) -> AppResult<Vec<AccountView>> {
        self.ensure_exists(vlogger_id).await?;
        let accounts = self.repo.followers_of(vlogger_id).await?;
        Ok(AccountService::views(&accounts))
    }

    pub async fn vloggers(&self, follower_id: i64) -> AppResult<Vec<AccountView>> {
        self.ensure_exists(follower_id).await?;
        let accounts = self.repo.vloggers_of(follower_id).await?;
        Ok(AccountService::views(&accounts))
    }

    async fn ensure_both_exist(&self, follower_id: i64, vlogger_id: i64) -> AppResult<()> {
        self.ensure_exists(follower_id).await?;
        self.ensure_exists(vlogger_id).await
    }

    async fn ensure_exists(&self, account_id: i64) -> AppResult<()> {
        self.accounts
            .find_by_id(account_id)
            .await?
            .map(|_| ())
            .ok_or_else(|| AppError::BadRequest("account not found".into()))
    }
}
