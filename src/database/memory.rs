//! 메모리 기반 광고 시장 저장소 (테스트, 로컬 실행용)
//!
//! 모든 연산이 하나의 뮤텍스 안에서 실행되므로 PostgreSQL 구현의
//! upsert + 주간 잠금과 같은 원자성을 가진다.
// region:    --- Imports
use super::{AdStore, BidDraft};
use crate::bidding::model::{
    Bid, BidAction, BidOutcome, BidStatus, Identity, ListedBid, Listing, ListingSummary,
};
use crate::error::MarketError;
use crate::market::allocator::{self, BidEntry, Placement};
use crate::market::week::WeekWindow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use std::collections::{HashMap, HashSet};
use tokio::sync::Mutex;

// endregion: --- Imports

#[derive(Default)]
struct MemoryState {
    next_bid_id: i64,
    bids: Vec<Bid>,
    listings: HashMap<i64, Listing>,
    sessions: HashMap<String, (Identity, DateTime<Utc>)>,
    payments: HashMap<String, i64>,
}

impl MemoryState {
    fn find_bid(&self, bid_id: i64) -> Option<&Bid> {
        self.bids.iter().find(|bid| bid.id == bid_id)
    }

    fn next_id(&mut self) -> i64 {
        self.next_bid_id += 1;
        self.next_bid_id
    }

    /// 해당 주 전체 재계산
    fn recompute_week(&mut self, week: WeekWindow, today: NaiveDate) {
        let entries = self
            .bids
            .iter()
            .filter(|bid| bid.week_start == week.week_start && bid.is_active_on(today))
            .map(BidEntry::from)
            .collect();
        let placements: HashMap<i64, Placement> = allocator::recompute(entries)
            .into_iter()
            .map(|placement| (placement.bid_id, placement))
            .collect();

        for bid in self
            .bids
            .iter_mut()
            .filter(|bid| bid.week_start == week.week_start)
        {
            match placements.get(&bid.id) {
                Some(placement) => {
                    bid.current_position = Some(placement.position);
                    bid.effective_amount = placement.effective_amount;
                }
                None if bid.status != BidStatus::Active => bid.current_position = None,
                None => {}
            }
        }
    }
}

pub struct MemoryAdStore {
    state: Mutex<MemoryState>,
}

impl Default for MemoryAdStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryAdStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(MemoryState::default()),
        }
    }

    pub async fn insert_listing(&self, listing: Listing) {
        self.state.lock().await.listings.insert(listing.id, listing);
    }

    pub async fn insert_session(
        &self,
        token: impl Into<String>,
        identity: Identity,
        expires_at: DateTime<Utc>,
    ) {
        self.state
            .lock()
            .await
            .sessions
            .insert(token.into(), (identity, expires_at));
    }

    /// 저장된 모든 입찰 (상태 무관)
    pub async fn all_bids(&self) -> Vec<Bid> {
        self.state.lock().await.bids.clone()
    }
}

#[async_trait]
impl AdStore for MemoryAdStore {
    async fn resolve_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>, MarketError> {
        let state = self.state.lock().await;
        Ok(state
            .sessions
            .get(token)
            .filter(|(_, expires_at)| *expires_at > now)
            .map(|(identity, _)| identity.clone()))
    }

    async fn find_listing(&self, listing_id: i64) -> Result<Option<Listing>, MarketError> {
        Ok(self.state.lock().await.listings.get(&listing_id).cloned())
    }

    async fn submit_bid(&self, draft: BidDraft) -> Result<BidOutcome, MarketError> {
        let mut state = self.state.lock().await;

        if let Some(payment_id) = draft.payment_id.as_deref() {
            let replayed = state
                .payments
                .get(payment_id)
                .and_then(|bid_id| state.find_bid(*bid_id))
                .cloned();
            if let Some(bid) = replayed {
                return Ok(BidOutcome {
                    bid,
                    action: BidAction::Replayed,
                });
            }
        }

        let existing = state.bids.iter().position(|bid| {
            bid.listing_id == draft.listing_id
                && bid.week_start == draft.week.week_start
                && bid.status == BidStatus::Active
        });

        let (bid_id, action) = match existing {
            Some(index) => {
                let bid = &mut state.bids[index];
                bid.weekly_bid_amount = draft.weekly_bid_amount;
                bid.effective_amount = draft.weekly_bid_amount;
                bid.max_auto_bid = draft.max_auto_bid;
                bid.auto_renew = draft.auto_renew;
                bid.updated_at = draft.submitted_at;
                (bid.id, BidAction::Updated)
            }
            None => {
                let id = state.next_id();
                state.bids.push(Bid {
                    id,
                    listing_id: draft.listing_id,
                    user_id: draft.user_id,
                    weekly_bid_amount: draft.weekly_bid_amount,
                    effective_amount: draft.weekly_bid_amount,
                    max_auto_bid: draft.max_auto_bid,
                    auto_renew: draft.auto_renew,
                    current_position: None,
                    status: BidStatus::Active,
                    week_start: draft.week.week_start,
                    week_end: draft.week.week_end,
                    created_at: draft.submitted_at,
                    updated_at: draft.submitted_at,
                });
                (id, BidAction::Created)
            }
        };

        if let Some(payment_id) = draft.payment_id {
            state.payments.entry(payment_id).or_insert(bid_id);
        }

        state.recompute_week(draft.week, draft.submitted_at.date_naive());

        let bid = state.find_bid(bid_id).cloned().ok_or(MarketError::NotFound)?;
        Ok(BidOutcome { bid, action })
    }

    async fn cancel_bid(
        &self,
        bid_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Bid, MarketError> {
        let mut state = self.state.lock().await;
        let index = state
            .bids
            .iter()
            .position(|bid| bid.id == bid_id && bid.user_id == user_id)
            .ok_or(MarketError::NotFound)?;

        let bid = &mut state.bids[index];
        if !matches!(bid.status, BidStatus::Active | BidStatus::Paused) {
            return Ok(bid.clone());
        }
        bid.status = BidStatus::Cancelled;
        bid.current_position = None;
        bid.updated_at = now;
        let week = WeekWindow::containing(bid.week_start);

        state.recompute_week(week, now.date_naive());
        Ok(state.bids[index].clone())
    }

    async fn market_bids(
        &self,
        week: WeekWindow,
        today: NaiveDate,
    ) -> Result<Vec<ListedBid>, MarketError> {
        let state = self.state.lock().await;
        let mut listed: Vec<ListedBid> = state
            .bids
            .iter()
            .filter(|bid| {
                bid.is_active_on(today)
                    && bid.week_start <= week.week_end
                    && bid.week_end >= week.week_start
            })
            .filter_map(|bid| {
                let listing = state.listings.get(&bid.listing_id)?;
                Some(ListedBid {
                    bid: bid.clone(),
                    listing: ListingSummary {
                        listing_id: listing.id,
                        title: listing.title.clone(),
                        location: listing.location.clone(),
                        image_url: listing.image_url.clone(),
                    },
                })
            })
            .collect();

        listed.sort_by(|a, b| {
            let position = |bid: &Bid| bid.current_position.unwrap_or(i32::MAX);
            position(&a.bid)
                .cmp(&position(&b.bid))
                .then_with(|| a.bid.created_at.cmp(&b.bid.created_at))
                .then_with(|| a.bid.id.cmp(&b.bid.id))
        });
        Ok(listed)
    }

    async fn user_bids(&self, user_id: i64) -> Result<Vec<Bid>, MarketError> {
        let state = self.state.lock().await;
        let mut bids: Vec<Bid> = state
            .bids
            .iter()
            .filter(|bid| bid.user_id == user_id)
            .cloned()
            .collect();
        bids.sort_by(|a, b| {
            b.week_start
                .cmp(&a.week_start)
                .then_with(|| b.created_at.cmp(&a.created_at))
                .then_with(|| b.id.cmp(&a.id))
        });
        Ok(bids)
    }

    async fn renew_bids(&self, week: WeekWindow, now: DateTime<Utc>) -> Result<u64, MarketError> {
        let mut state = self.state.lock().await;
        let previous = week.previous();

        let taken: HashSet<i64> = state
            .bids
            .iter()
            .filter(|bid| bid.week_start == week.week_start)
            .map(|bid| bid.listing_id)
            .collect();

        let mut seen = HashSet::new();
        let renewals: Vec<Bid> = state
            .bids
            .iter()
            .filter(|bid| {
                bid.week_start == previous.week_start
                    && bid.auto_renew
                    && matches!(bid.status, BidStatus::Active | BidStatus::Expired)
                    && !taken.contains(&bid.listing_id)
            })
            .filter(|bid| seen.insert(bid.listing_id))
            .cloned()
            .collect();

        let renewed = renewals.len() as u64;
        for source in renewals {
            let id = state.next_id();
            state.bids.push(Bid {
                id,
                effective_amount: source.weekly_bid_amount,
                current_position: None,
                status: BidStatus::Active,
                week_start: week.week_start,
                week_end: week.week_end,
                created_at: now,
                updated_at: now,
                ..source
            });
        }

        if renewed > 0 {
            state.recompute_week(week, now.date_naive());
        }
        Ok(renewed)
    }

    async fn expire_bids(&self, now: DateTime<Utc>) -> Result<u64, MarketError> {
        let mut state = self.state.lock().await;
        let today = now.date_naive();
        let mut expired = 0;
        for bid in state
            .bids
            .iter_mut()
            .filter(|bid| bid.status == BidStatus::Active && bid.week_end < today)
        {
            bid.status = BidStatus::Expired;
            bid.current_position = None;
            bid.updated_at = now;
            expired += 1;
        }
        Ok(expired)
    }
}
