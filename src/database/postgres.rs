// region:    --- Imports
use super::{AdStore, BidDraft, DatabaseManager};
use crate::bidding::model::{
    Bid, BidAction, BidOutcome, BidRow, BidStatus, Identity, ListedBid, ListedBidRow, Listing,
    ListingRow,
};
use crate::error::MarketError;
use crate::market::allocator::{self, BidEntry};
use crate::market::week::WeekWindow;
use crate::query::queries;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgConnection;
use std::sync::Arc;
use tracing::{debug, info};

// endregion: --- Imports

/// ad_bids upsert 결과 행 (xmax = 0 이면 신규 삽입)
#[derive(sqlx::FromRow)]
struct UpsertRow {
    #[sqlx(flatten)]
    bid: BidRow,
    inserted: bool,
}

// region:    --- Postgres Store
/// PostgreSQL 광고 시장 저장소
pub struct PgAdStore {
    db: Arc<DatabaseManager>,
}

impl PgAdStore {
    pub fn new(db: Arc<DatabaseManager>) -> Self {
        Self { db }
    }
}

/// 같은 주를 변경하는 트랜잭션 직렬화
async fn lock_week(conn: &mut PgConnection, week: &WeekWindow) -> Result<(), sqlx::Error> {
    sqlx::query(queries::LOCK_WEEK)
        .bind(week.lock_key())
        .execute(conn)
        .await?;
    Ok(())
}

/// 해당 주의 전체 활성 입찰로 순위를 다시 계산해 기록
async fn recompute_week(
    conn: &mut PgConnection,
    week: WeekWindow,
    today: NaiveDate,
) -> Result<usize, sqlx::Error> {
    let rows = sqlx::query_as::<_, BidRow>(queries::LOCK_ACTIVE_WEEK_BIDS)
        .bind(week.week_start)
        .bind(today)
        .fetch_all(&mut *conn)
        .await?;

    let entries = rows
        .iter()
        .map(|row| BidEntry {
            bid_id: row.id,
            weekly_bid_amount: row.weekly_bid_cents,
            max_auto_bid: row.max_auto_bid_cents,
            created_at: row.created_at,
        })
        .collect();
    let placements = allocator::recompute(entries);

    let ids: Vec<i64> = placements.iter().map(|p| p.bid_id).collect();
    let positions: Vec<i32> = placements.iter().map(|p| p.position).collect();
    let amounts: Vec<i64> = placements
        .iter()
        .map(|p| p.effective_amount.cents())
        .collect();

    sqlx::query(queries::APPLY_PLACEMENTS)
        .bind(ids)
        .bind(positions)
        .bind(amounts)
        .execute(&mut *conn)
        .await?;

    sqlx::query(queries::CLEAR_INACTIVE_POSITIONS)
        .bind(week.week_start)
        .execute(&mut *conn)
        .await?;

    debug!(
        "{:<12} --> 순위 재계산 완료: week_start={}, bids={}",
        "Store",
        week.week_start,
        placements.len()
    );
    Ok(placements.len())
}

async fn fetch_bid(conn: &mut PgConnection, bid_id: i64) -> Result<Bid, sqlx::Error> {
    sqlx::query_as::<_, BidRow>(queries::GET_BID)
        .bind(bid_id)
        .fetch_one(conn)
        .await?
        .try_into()
}

/// 결제 잠금 -> 결제 재전송 확인 -> 주간 잠금 -> upsert -> 결제 기록 -> 재계산
async fn submit_in_tx(conn: &mut PgConnection, draft: BidDraft) -> Result<BidOutcome, MarketError> {
    if let Some(payment_id) = draft.payment_id.as_deref() {
        // 같은 결제의 동시 전송은 여기서 순서대로 처리되고, 뒤의 요청은 기존 입찰을 받는다
        sqlx::query(queries::LOCK_PAYMENT)
            .bind(payment_id)
            .execute(&mut *conn)
            .await?;

        let replayed = sqlx::query_as::<_, BidRow>(queries::GET_PAYMENT_BID)
            .bind(payment_id)
            .fetch_optional(&mut *conn)
            .await?;
        if let Some(row) = replayed {
            return Ok(BidOutcome {
                bid: row.try_into()?,
                action: BidAction::Replayed,
            });
        }
    }

    lock_week(&mut *conn, &draft.week).await?;

    let row = sqlx::query_as::<_, UpsertRow>(queries::UPSERT_ACTIVE_BID)
        .bind(draft.listing_id)
        .bind(draft.user_id)
        .bind(draft.weekly_bid_amount)
        .bind(draft.max_auto_bid)
        .bind(draft.auto_renew)
        .bind(draft.week.week_start)
        .bind(draft.week.week_end)
        .bind(draft.submitted_at)
        .fetch_one(&mut *conn)
        .await?;
    let bid_id = row.bid.id;
    let action = if row.inserted {
        BidAction::Created
    } else {
        BidAction::Updated
    };

    if let Some(payment_id) = draft.payment_id.as_deref() {
        sqlx::query(queries::INSERT_PAYMENT)
            .bind(payment_id)
            .bind(bid_id)
            .bind(draft.submitted_at)
            .execute(&mut *conn)
            .await?;
    }

    recompute_week(&mut *conn, draft.week, draft.submitted_at.date_naive())
        .await
        .map_err(MarketError::MarketRecalculation)?;

    let bid = fetch_bid(&mut *conn, bid_id).await?;
    Ok(BidOutcome { bid, action })
}

async fn cancel_in_tx(
    conn: &mut PgConnection,
    bid_id: i64,
    user_id: i64,
    now: DateTime<Utc>,
) -> Result<Bid, MarketError> {
    let existing: Bid = sqlx::query_as::<_, BidRow>(queries::GET_OWNED_BID)
        .bind(bid_id)
        .bind(user_id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or(MarketError::NotFound)?
        .try_into()?;

    // 이미 취소/만료된 입찰은 그대로 반환
    if !matches!(existing.status, BidStatus::Active | BidStatus::Paused) {
        return Ok(existing);
    }

    let week = WeekWindow::containing(existing.week_start);
    lock_week(&mut *conn, &week).await?;

    let cancelled = sqlx::query_as::<_, BidRow>(queries::CANCEL_BID)
        .bind(bid_id)
        .bind(user_id)
        .bind(now)
        .fetch_optional(&mut *conn)
        .await?;
    let Some(cancelled) = cancelled else {
        // 잠금 대기 중 다른 요청이 먼저 상태를 바꿈
        return Ok(fetch_bid(&mut *conn, bid_id).await?);
    };

    recompute_week(&mut *conn, week, now.date_naive())
        .await
        .map_err(MarketError::MarketRecalculation)?;

    Ok(cancelled.try_into()?)
}

async fn renew_in_tx(
    conn: &mut PgConnection,
    week: WeekWindow,
    now: DateTime<Utc>,
) -> Result<u64, MarketError> {
    lock_week(&mut *conn, &week).await?;

    let renewed = sqlx::query(queries::RENEW_BIDS)
        .bind(week.previous().week_start)
        .bind(week.week_start)
        .bind(week.week_end)
        .bind(now)
        .execute(&mut *conn)
        .await?
        .rows_affected();

    if renewed > 0 {
        recompute_week(&mut *conn, week, now.date_naive())
            .await
            .map_err(MarketError::MarketRecalculation)?;
    }
    Ok(renewed)
}

#[async_trait]
impl AdStore for PgAdStore {
    async fn resolve_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>, MarketError> {
        let identity = sqlx::query_as::<_, Identity>(queries::GET_SESSION_IDENTITY)
            .bind(token)
            .bind(now)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(identity)
    }

    async fn find_listing(&self, listing_id: i64) -> Result<Option<Listing>, MarketError> {
        let row = sqlx::query_as::<_, ListingRow>(queries::GET_LISTING)
            .bind(listing_id)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(row.map(Listing::try_from).transpose()?)
    }

    async fn submit_bid(&self, draft: BidDraft) -> Result<BidOutcome, MarketError> {
        info!(
            "{:<12} --> 입찰 저장: listing_id={}, week_start={}",
            "Store", draft.listing_id, draft.week.week_start
        );
        self.db
            .transaction(move |tx| Box::pin(submit_in_tx(&mut **tx, draft)))
            .await
    }

    async fn cancel_bid(
        &self,
        bid_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Bid, MarketError> {
        info!(
            "{:<12} --> 입찰 취소: bid_id={}, user_id={}",
            "Store", bid_id, user_id
        );
        self.db
            .transaction(move |tx| Box::pin(cancel_in_tx(&mut **tx, bid_id, user_id, now)))
            .await
    }

    async fn market_bids(
        &self,
        week: WeekWindow,
        today: NaiveDate,
    ) -> Result<Vec<ListedBid>, MarketError> {
        let rows = sqlx::query_as::<_, ListedBidRow>(queries::GET_MARKET_BIDS)
            .bind(week.week_start)
            .bind(week.week_end)
            .bind(today)
            .fetch_all(self.db.pool())
            .await?;
        let bids = rows
            .into_iter()
            .map(ListedBid::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bids)
    }

    async fn user_bids(&self, user_id: i64) -> Result<Vec<Bid>, MarketError> {
        let rows = sqlx::query_as::<_, BidRow>(queries::GET_USER_BIDS)
            .bind(user_id)
            .fetch_all(self.db.pool())
            .await?;
        let bids = rows
            .into_iter()
            .map(Bid::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bids)
    }

    async fn renew_bids(&self, week: WeekWindow, now: DateTime<Utc>) -> Result<u64, MarketError> {
        self.db
            .transaction(move |tx| Box::pin(renew_in_tx(&mut **tx, week, now)))
            .await
    }

    async fn expire_bids(&self, now: DateTime<Utc>) -> Result<u64, MarketError> {
        let expired = sqlx::query(queries::EXPIRE_BIDS)
            .bind(now.date_naive())
            .bind(now)
            .execute(self.db.pool())
            .await?
            .rows_affected();
        Ok(expired)
    }
}
// endregion: --- Postgres Store
