// region:    --- Imports
use crate::auth::AuthUser;
use crate::bidding::commands::{
    handle_cancel_bid, handle_payment_confirmed, handle_submit_bid, PaymentConfirmation,
    SubmitBidCommand,
};
use crate::bidding::model::BidAction;
use crate::error::MarketError;
use crate::market::week::WeekWindow;
use crate::query;
use crate::state::AppState;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use chrono::{NaiveDate, Utc};
use serde::Deserialize;
use subtle::ConstantTimeEq;
use tracing::{info, warn};

// endregion: --- Imports

pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

/// 상수 시간 비교 (길이가 다르면 즉시 false)
fn secrets_match(expected: &str, provided: &str) -> bool {
    expected.as_bytes().ct_eq(provided.as_bytes()).into()
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, MarketError> {
    body.map(|Json(value)| value).map_err(|e| {
        warn!("{:<12} --> 잘못된 요청 본문: {}", "Handler", e);
        MarketError::MalformedPayload
    })
}

fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, MarketError> {
    params.map(|Query(value)| value).map_err(|e| {
        warn!("{:<12} --> 잘못된 조회 파라미터: {}", "Handler", e);
        MarketError::MalformedPayload
    })
}

fn action_message(action: BidAction) -> &'static str {
    match action {
        BidAction::Created => "Bid placed successfully",
        BidAction::Updated => "Bid updated successfully",
        BidAction::Replayed => "Payment already applied",
    }
}

// region:    --- Command Handlers

/// 입찰 요청 처리
pub async fn handle_bid(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<SubmitBidCommand>, JsonRejection>,
) -> Result<impl IntoResponse, MarketError> {
    let cmd = payload(body)?;
    let outcome = handle_submit_bid(
        cmd,
        &identity,
        state.store.as_ref(),
        state.publisher.as_ref(),
        Utc::now(),
    )
    .await?;

    let status = match outcome.action {
        BidAction::Created => StatusCode::CREATED,
        _ => StatusCode::OK,
    };
    Ok((
        status,
        Json(serde_json::json!({
            "message": action_message(outcome.action),
            "action": outcome.action,
            "bid": outcome.bid,
        })),
    ))
}

#[derive(Debug, Deserialize)]
pub struct CancelBidRequest {
    pub bid_id: Option<i64>,
}

/// 입찰 취소 요청 처리
pub async fn handle_cancel(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
    body: Result<Json<CancelBidRequest>, JsonRejection>,
) -> Result<impl IntoResponse, MarketError> {
    let bid_id = payload(body)?
        .bid_id
        .ok_or(MarketError::MissingField("bid_id"))?;
    let bid = handle_cancel_bid(
        bid_id,
        &identity,
        state.store.as_ref(),
        state.publisher.as_ref(),
        Utc::now(),
    )
    .await?;

    Ok(Json(serde_json::json!({
        "message": "Bid cancelled",
        "bid": bid,
    })))
}

/// 결제 확인 웹훅 처리
pub async fn handle_payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Result<Json<PaymentConfirmation>, JsonRejection>,
) -> Result<impl IntoResponse, MarketError> {
    let provided = headers
        .get(WEBHOOK_SECRET_HEADER)
        .and_then(|value| value.to_str().ok());
    let authorized = match (state.config.webhook_secret.as_deref(), provided) {
        (Some(expected), Some(provided)) => secrets_match(expected, provided),
        _ => false,
    };
    if !authorized {
        warn!("{:<12} --> 웹훅 인증 실패", "Handler");
        return Err(MarketError::Unauthenticated);
    }

    let confirmation = payload(body)?;
    let outcome = handle_payment_confirmed(
        confirmation,
        state.store.as_ref(),
        state.publisher.as_ref(),
        Utc::now(),
    )
    .await?;

    Ok(Json(serde_json::json!({
        "message": action_message(outcome.action),
        "action": outcome.action,
        "bid": outcome.bid,
    })))
}

// endregion: --- Command Handlers

// region:    --- Query Handlers

#[derive(Debug, Deserialize)]
pub struct MarketParams {
    pub week_start: Option<NaiveDate>,
}

#[derive(Debug, Deserialize)]
pub struct SlotParams {
    pub date: Option<NaiveDate>,
}

fn week_for(date: Option<NaiveDate>) -> WeekWindow {
    match date {
        Some(date) => WeekWindow::containing(date),
        None => WeekWindow::current(Utc::now()),
    }
}

/// 시장 상태 조회
pub async fn handle_get_market(
    State(state): State<AppState>,
    params: Result<Query<MarketParams>, QueryRejection>,
) -> Result<impl IntoResponse, MarketError> {
    let week = week_for(query_params(params)?.week_start);
    let market =
        query::handlers::get_market_state(state.store.as_ref(), week, Utc::now()).await?;
    Ok(Json(market))
}

/// 슬롯 및 가격 조회
pub async fn handle_get_slots(
    State(state): State<AppState>,
    params: Result<Query<SlotParams>, QueryRejection>,
) -> Result<impl IntoResponse, MarketError> {
    let week = week_for(query_params(params)?.date);
    let board = query::handlers::get_slot_board(state.store.as_ref(), week, Utc::now()).await?;
    Ok(Json(board))
}

/// 내 입찰 목록 조회
pub async fn handle_get_my_bids(
    State(state): State<AppState>,
    AuthUser(identity): AuthUser,
) -> Result<impl IntoResponse, MarketError> {
    info!(
        "{:<12} --> 내 입찰 조회 user_id: {}",
        "HandlerQuery", identity.user_id
    );
    let bids = query::handlers::get_user_bids(state.store.as_ref(), identity.user_id).await?;
    Ok(Json(bids))
}

pub async fn handle_health() -> impl IntoResponse {
    (StatusCode::OK, "ok")
}

// endregion: --- Query Handlers

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn webhook_secret_comparison() {
        assert!(secrets_match("test-secret", "test-secret"));
        assert!(!secrets_match("test-secret", "test-secreT"));
        assert!(!secrets_match("test-secret", "test"));
        assert!(!secrets_match("test-secret", ""));
    }
}
