//! 요청에서 인증된 사용자 확인
//!
//! `Authorization: Bearer <token>` 헤더 또는 `hsc_session` 쿠키의 세션 토큰을
//! 저장소의 세션 테이블로 확인한다. 세션 발급(매직 링크)은 이 서비스 밖에서 한다.
use crate::bidding::model::Identity;
use crate::error::MarketError;
use crate::state::AppState;
use async_trait::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;
use chrono::Utc;

pub const SESSION_COOKIE: &str = "hsc_session";

/// 인증된 사용자 extractor
pub struct AuthUser(pub Identity);

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

fn cookie_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == SESSION_COOKIE)
        .map(|(_, token)| token.trim())
        .filter(|token| !token.is_empty())
}

pub fn session_token(headers: &HeaderMap) -> Option<&str> {
    bearer_token(headers).or_else(|| cookie_token(headers))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = MarketError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers).ok_or(MarketError::Unauthenticated)?;
        let identity = state
            .store
            .resolve_session(token, Utc::now())
            .await?
            .ok_or(MarketError::Unauthenticated)?;
        Ok(AuthUser(identity))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn prefers_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer abc"));
        headers.insert(COOKIE, HeaderValue::from_static("hsc_session=def"));
        assert_eq!(session_token(&headers), Some("abc"));
    }

    #[test]
    fn reads_session_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            COOKIE,
            HeaderValue::from_static("theme=dark; hsc_session=xyz; lang=en"),
        );
        assert_eq!(session_token(&headers), Some("xyz"));
    }

    #[test]
    fn missing_or_empty_token() {
        let mut headers = HeaderMap::new();
        assert_eq!(session_token(&headers), None);
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer "));
        assert_eq!(session_token(&headers), None);
    }
}
