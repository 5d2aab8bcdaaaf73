//! Bearer-token gates.
//!
//! A token is admitted only while it matches the account's single active
//! token. The cache is consulted first; a miss falls back to the account row
//! and repopulates the cache (TTL 24h), so losing the cache never locks out
//! live sessions. A cache entry holding a *different* token means the session
//! was revoked by a newer login, rename, logout or password change.

use crate::cache::keys;
use crate::error::AppError;
use crate::state::AppState;
use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use std::time::Duration;

const TOKEN_CACHE_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Authenticated caller, inserted into request extensions by the gates.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub account_id: i64,
    pub username: String,
}

/// Possibly-anonymous caller for the soft-gated feed endpoints.
#[derive(Debug, Clone, Default)]
pub struct Viewer(pub Option<CurrentUser>);

impl Viewer {
    /// 0 means anonymous.
    pub fn account_id(&self) -> i64 {
        self.0.as_ref().map(|u| u.account_id).unwrap_or(0)
    }
}

/// Hard gate: a valid, current token is required.
pub async fn require_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers())?
        .ok_or(AppError::Unauthorized("missing authorization header"))?;
    let user = authenticate(&state, &token).await?;
    req.extensions_mut().insert(Viewer(Some(user.clone())));
    req.extensions_mut().insert(user);
    Ok(next.run(req).await)
}

/// Soft gate: no header means anonymous, but a malformed or stale token is
/// still rejected rather than silently downgraded.
pub async fn soft_auth(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    match bearer_token(req.headers())? {
        None => {
            req.extensions_mut().insert(Viewer(None));
            Ok(next.run(req).await)
        }
        Some(token) => {
            let user = authenticate(&state, &token).await?;
            req.extensions_mut().insert(Viewer(Some(user)));
            Ok(next.run(req).await)
        }
    }
}

/// Ok(None) when the header is absent; error when present but malformed.
fn bearer_token(headers: &HeaderMap) -> Result<Option<String>, AppError> {
    let Some(value) = headers.get(AUTHORIZATION) else {
        return Ok(None);
    };
    let value = value
        .to_str()
        .map_err(|_| AppError::Unauthorized("invalid authorization header"))?;
    let mut parts = value.splitn(2, ' ');
    match (parts.next(), parts.next()) {
        (Some(scheme), Some(token)) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Ok(Some(token.to_string()))
        }
        _ => Err(AppError::Unauthorized("invalid authorization header")),
    }
}

async fn authenticate(state: &AppState, token: &str) -> Result<CurrentUser, AppError> {
    let claims = state.tokens.parse(token)?;
    let key = keys::account_token(claims.account_id);

    if let Some(cache) = &state.cache {
        match cache.get_bytes(&key).await {
            Ok(cached) => {
                if cached != token.as_bytes() {
                    return Err(AppError::Unauthorized("token has been revoked"));
                }
                return Ok(CurrentUser {
                    account_id: claims.account_id,
                    username: claims.username,
                });
            }
            // Miss and transport failure both fall through to the DB check.
            Err(_) => {}
        }
    }

    let account = state
        .accounts
        .find_by_id(claims.account_id)
        .await?
        .filter(|a| !a.token.is_empty() && a.token == token)
        .ok_or(AppError::Unauthorized("token has been revoked"))?;

    if let Some(cache) = &state.cache {
        if let Err(e) = cache.set_bytes(&key, token.as_bytes(), TOKEN_CACHE_TTL).await {
            tracing::warn!(error = %e, "failed to repopulate token cache");
        }
    }

    Ok(CurrentUser {
        account_id: account.id,
        username: account.username,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers_with(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn absent_header_is_anonymous() {
        assert!(bearer_token(&HeaderMap::new()).unwrap().is_none());
    }

    #[test]
    fn bearer_is_extracted_case_insensitively() {
        let token = bearer_token(&headers_with("bearer abc.def.ghi")).unwrap();
        assert_eq!(token.as_deref(), Some("abc.def.ghi"));
    }

    #[test]
    fn malformed_header_is_rejected() {
        assert!(bearer_token(&headers_with("Basic abc")).is_err());
        assert!(bearer_token(&headers_with("Bearer")).is_err());
        assert!(bearer_token(&headers_with("Bearer ")).is_err());
    }

    #[test]
    fn viewer_defaults_to_anonymous() {
        assert_eq!(Viewer::default().account_id(), 0);
        let viewer = Viewer(Some(CurrentUser {
            account_id: 9,
            username: "x".into(),
        }));
        assert_eq!(viewer.account_id(), 9);
    }
}
