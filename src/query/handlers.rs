// region:    --- Imports
use crate::bidding::model::{Bid, ListedBid, Money};
use crate::database::AdStore;
use crate::error::MarketError;
use crate::market::allocator::{self, Slot};
use crate::market::week::WeekWindow;
use chrono::{DateTime, NaiveDate, Utc};
use serde::Serialize;
use tracing::info;

// endregion: --- Imports

// region:    --- Views
/// 주간 광고 시장 스냅샷 (저장하지 않음)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketState {
    pub current_top_bid: Money,
    pub price_to_beat: Money,
    pub total_active_bids: usize,
    pub positions: Vec<MarketPosition>,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketPosition {
    pub position: Option<i32>,
    pub bid_id: i64,
    pub listing_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
    pub weekly_bid_amount: Money,
    pub effective_amount: Money,
    pub auto_renew: bool,
}

impl From<&ListedBid> for MarketPosition {
    fn from(listed: &ListedBid) -> Self {
        Self {
            position: listed.bid.current_position,
            bid_id: listed.bid.id,
            listing_id: listed.listing.listing_id,
            title: listed.listing.title.clone(),
            location: listed.listing.location.clone(),
            image_url: listed.listing.image_url.clone(),
            weekly_bid_amount: listed.bid.weekly_bid_amount,
            effective_amount: listed.bid.effective_amount,
            auto_renew: listed.bid.auto_renew,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotBoard {
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub slots: Vec<Slot>,
}
// endregion: --- Views

// region:    --- Query Handlers

/// 주간 시장 상태 조회
pub async fn get_market_state(
    store: &dyn AdStore,
    week: WeekWindow,
    now: DateTime<Utc>,
) -> Result<MarketState, MarketError> {
    info!(
        "{:<12} --> 시장 상태 조회 week_start: {}",
        "Query", week.week_start
    );
    let listed = store.market_bids(week, now.date_naive()).await?;

    let top_bid = listed.iter().map(|l| l.bid.effective_amount).max();
    Ok(MarketState {
        current_top_bid: top_bid.unwrap_or(Money::ZERO),
        price_to_beat: allocator::price_to_beat(top_bid),
        total_active_bids: listed.len(),
        positions: listed.iter().map(MarketPosition::from).collect(),
        week_start: week.week_start,
        week_end: week.week_end,
    })
}

/// 주간 슬롯 및 가격 조회
pub async fn get_slot_board(
    store: &dyn AdStore,
    week: WeekWindow,
    now: DateTime<Utc>,
) -> Result<SlotBoard, MarketError> {
    info!("{:<12} --> 슬롯 조회 week_start: {}", "Query", week.week_start);
    let listed = store.market_bids(week, now.date_naive()).await?;
    Ok(SlotBoard {
        week_start: week.week_start,
        week_end: week.week_end,
        slots: allocator::allocate_slots(&listed),
    })
}

/// 사용자 입찰 목록 조회
pub async fn get_user_bids(store: &dyn AdStore, user_id: i64) -> Result<Vec<Bid>, MarketError> {
    info!("{:<12} --> 사용자 입찰 조회 user_id: {}", "Query", user_id);
    store.user_bids(user_id).await
}

// endregion: --- Query Handlers
