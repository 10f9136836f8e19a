/// 광고 입찰 관련 커맨드 처리
/// 1. 입찰 (신규 또는 갱신)
/// 2. 입찰 취소
/// 3. 결제 확인 반영
// region:    --- Imports
use super::model::{Bid, BidAction, BidOutcome, Identity, ListingType, Money};
use super::validator::validate_bid;
use crate::database::{AdStore, BidDraft};
use crate::error::MarketError;
use crate::market::events::AdMarketEvent;
use crate::market::week::WeekWindow;
use crate::message_broker::EventPublisher;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
// endregion: --- Imports

// region:    --- Commands
/// 입찰 명령
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SubmitBidCommand {
    pub listing_id: i64,
    pub weekly_bid_amount: Money,
    #[serde(default)]
    pub max_auto_bid: Option<Money>,
    #[serde(default)]
    pub auto_renew: bool,
}

/// 결제 확인 (결제 대행사 웹훅, 체크아웃 메타데이터에서 복사된 값)
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct PaymentConfirmation {
    pub payment_id: String,
    pub listing_id: i64,
    pub user_id: i64,
    pub weekly_bid_amount: Money,
    #[serde(default)]
    pub max_auto_bid: Option<Money>,
    #[serde(default)]
    pub auto_renew: bool,
}

async fn publish(publisher: &dyn EventPublisher, event: AdMarketEvent) {
    if let Err(e) = publisher.publish(&event).await {
        warn!(
            "{:<12} --> 이벤트 발행 실패 ({}): {}",
            "Command",
            event.event_type(),
            e
        );
    }
}

/// 검증 -> 게시글 소유권 확인 -> 이번 주 upsert
async fn place_bid(
    cmd: SubmitBidCommand,
    user_id: i64,
    payment_id: Option<String>,
    store: &dyn AdStore,
    now: DateTime<Utc>,
) -> Result<BidOutcome, MarketError> {
    validate_bid(cmd.weekly_bid_amount, cmd.max_auto_bid)?;

    // 광고 게시글이 아니거나 다른 사용자 소유이면 존재하지 않는 것으로 처리
    let listing = store
        .find_listing(cmd.listing_id)
        .await?
        .filter(|listing| listing.user_id == user_id)
        .filter(|listing| listing.listing_type == ListingType::Advertise)
        .ok_or(MarketError::NotFound)?;

    let draft = BidDraft {
        listing_id: listing.id,
        user_id,
        weekly_bid_amount: cmd.weekly_bid_amount,
        max_auto_bid: cmd.max_auto_bid,
        auto_renew: cmd.auto_renew,
        week: WeekWindow::current(now),
        payment_id,
        submitted_at: now,
    };
    store.submit_bid(draft).await
}

/// 1. 입찰
pub async fn handle_submit_bid(
    cmd: SubmitBidCommand,
    identity: &Identity,
    store: &dyn AdStore,
    publisher: &dyn EventPublisher,
    now: DateTime<Utc>,
) -> Result<BidOutcome, MarketError> {
    info!("{:<12} --> 입찰 요청 처리 시작: {:?}", "Command", cmd);

    let outcome = place_bid(cmd, identity.user_id, None, store, now).await?;
    let event = match outcome.action {
        BidAction::Created => Some(AdMarketEvent::bid_created(&outcome.bid, now)),
        BidAction::Updated => Some(AdMarketEvent::bid_updated(&outcome.bid, now)),
        BidAction::Replayed => None,
    };
    if let Some(event) = event {
        publish(publisher, event).await;
    }

    info!(
        "{:<12} --> 입찰 처리 완료: bid_id={}, action={:?}, position={:?}",
        "Command", outcome.bid.id, outcome.action, outcome.bid.current_position
    );
    Ok(outcome)
}

/// 2. 입찰 취소
pub async fn handle_cancel_bid(
    bid_id: i64,
    identity: &Identity,
    store: &dyn AdStore,
    publisher: &dyn EventPublisher,
    now: DateTime<Utc>,
) -> Result<Bid, MarketError> {
    info!(
        "{:<12} --> 입찰 취소 요청: bid_id={}, user_id={}",
        "Command", bid_id, identity.user_id
    );

    let bid = store.cancel_bid(bid_id, identity.user_id, now).await?;
    publish(publisher, AdMarketEvent::bid_cancelled(&bid, now)).await;
    Ok(bid)
}

/// 3. 결제 확인 반영 (같은 payment_id 는 한 번만 반영)
pub async fn handle_payment_confirmed(
    confirmation: PaymentConfirmation,
    store: &dyn AdStore,
    publisher: &dyn EventPublisher,
    now: DateTime<Utc>,
) -> Result<BidOutcome, MarketError> {
    info!(
        "{:<12} --> 결제 확인 처리: payment_id={}, listing_id={}",
        "Command", confirmation.payment_id, confirmation.listing_id
    );

    let payment_id = confirmation.payment_id.clone();
    let cmd = SubmitBidCommand {
        listing_id: confirmation.listing_id,
        weekly_bid_amount: confirmation.weekly_bid_amount,
        max_auto_bid: confirmation.max_auto_bid,
        auto_renew: confirmation.auto_renew,
    };
    let outcome = place_bid(
        cmd,
        confirmation.user_id,
        Some(payment_id.clone()),
        store,
        now,
    )
    .await?;

    if outcome.action == BidAction::Replayed {
        info!(
            "{:<12} --> 이미 처리된 결제: payment_id={}",
            "Command", payment_id
        );
        return Ok(outcome);
    }

    let bid_event = match outcome.action {
        BidAction::Created => AdMarketEvent::bid_created(&outcome.bid, now),
        _ => AdMarketEvent::bid_updated(&outcome.bid, now),
    };
    publish(publisher, bid_event).await;
    publish(
        publisher,
        AdMarketEvent::PaymentApplied {
            payment_id,
            bid_id: outcome.bid.id,
            listing_id: outcome.bid.listing_id,
            timestamp: now,
        },
    )
    .await;
    Ok(outcome)
}

// endregion: --- Commands
