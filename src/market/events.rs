use crate::bidding::model::{Bid, Money};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// 광고 시장 이벤트 (Kafka 로 발행)
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type")]
pub enum AdMarketEvent {
    // 신규 입찰
    BidCreated {
        bid_id: i64,
        listing_id: i64,
        user_id: i64,
        weekly_bid_amount: Money,
        effective_amount: Money,
        week_start: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    // 기존 입찰 금액 변경
    BidUpdated {
        bid_id: i64,
        listing_id: i64,
        user_id: i64,
        weekly_bid_amount: Money,
        effective_amount: Money,
        week_start: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    // 입찰 취소
    BidCancelled {
        bid_id: i64,
        listing_id: i64,
        user_id: i64,
        week_start: NaiveDate,
        timestamp: DateTime<Utc>,
    },
    // 결제 확인 후 입찰 반영
    PaymentApplied {
        payment_id: String,
        bid_id: i64,
        listing_id: i64,
        timestamp: DateTime<Utc>,
    },
    // 자동 갱신
    BidsRenewed {
        week_start: NaiveDate,
        renewed: u64,
        timestamp: DateTime<Utc>,
    },
}

impl AdMarketEvent {
    pub fn bid_created(bid: &Bid, timestamp: DateTime<Utc>) -> Self {
        AdMarketEvent::BidCreated {
            bid_id: bid.id,
            listing_id: bid.listing_id,
            user_id: bid.user_id,
            weekly_bid_amount: bid.weekly_bid_amount,
            effective_amount: bid.effective_amount,
            week_start: bid.week_start,
            timestamp,
        }
    }

    pub fn bid_updated(bid: &Bid, timestamp: DateTime<Utc>) -> Self {
        AdMarketEvent::BidUpdated {
            bid_id: bid.id,
            listing_id: bid.listing_id,
            user_id: bid.user_id,
            weekly_bid_amount: bid.weekly_bid_amount,
            effective_amount: bid.effective_amount,
            week_start: bid.week_start,
            timestamp,
        }
    }

    pub fn bid_cancelled(bid: &Bid, timestamp: DateTime<Utc>) -> Self {
        AdMarketEvent::BidCancelled {
            bid_id: bid.id,
            listing_id: bid.listing_id,
            user_id: bid.user_id,
            week_start: bid.week_start,
            timestamp,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            AdMarketEvent::BidCreated { .. } => "BidCreated",
            AdMarketEvent::BidUpdated { .. } => "BidUpdated",
            AdMarketEvent::BidCancelled { .. } => "BidCancelled",
            AdMarketEvent::PaymentApplied { .. } => "PaymentApplied",
            AdMarketEvent::BidsRenewed { .. } => "BidsRenewed",
        }
    }

    /// Kafka 메시지 키 (게시글 단위 순서 보장)
    pub fn key(&self) -> String {
        match self {
            AdMarketEvent::BidCreated { listing_id, .. }
            | AdMarketEvent::BidUpdated { listing_id, .. }
            | AdMarketEvent::BidCancelled { listing_id, .. }
            | AdMarketEvent::PaymentApplied { listing_id, .. } => listing_id.to_string(),
            AdMarketEvent::BidsRenewed { week_start, .. } => week_start.to_string(),
        }
    }
}
