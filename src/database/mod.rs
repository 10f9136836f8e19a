// region:    --- Imports
use crate::bidding::model::{Bid, BidOutcome, Identity, ListedBid, Listing, Money};
use crate::config::Config;
use crate::error::MarketError;
use crate::market::week::WeekWindow;
use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

pub mod memory;
pub mod postgres;

pub use memory::MemoryAdStore;
pub use postgres::PgAdStore;

// endregion: --- Imports

// region:    --- Ad Store
/// 입찰 저장 요청 (검증 및 소유권 확인 이후)
#[derive(Debug, Clone)]
pub struct BidDraft {
    pub listing_id: i64,
    pub user_id: i64,
    pub weekly_bid_amount: Money,
    pub max_auto_bid: Option<Money>,
    pub auto_renew: bool,
    pub week: WeekWindow,
    /// 결제 확인으로 들어온 입찰이면 결제 ID
    pub payment_id: Option<String>,
    pub submitted_at: DateTime<Utc>,
}

/// 광고 시장 저장소
///
/// 입찰 변경과 해당 주의 순위 재계산은 하나의 원자적 단위로 처리해야 한다.
#[async_trait]
pub trait AdStore: Send + Sync {
    /// 세션 토큰 -> 사용자
    async fn resolve_session(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<Identity>, MarketError>;

    async fn find_listing(&self, listing_id: i64) -> Result<Option<Listing>, MarketError>;

    /// (listing, week) 활성 입찰 생성 또는 갱신 + 순위 재계산
    async fn submit_bid(&self, draft: BidDraft) -> Result<BidOutcome, MarketError>;

    /// 소유자 확인 후 취소 + 순위 재계산
    async fn cancel_bid(
        &self,
        bid_id: i64,
        user_id: i64,
        now: DateTime<Utc>,
    ) -> Result<Bid, MarketError>;

    /// 주간 활성 입찰 (저장된 순위 순)
    async fn market_bids(
        &self,
        week: WeekWindow,
        today: NaiveDate,
    ) -> Result<Vec<ListedBid>, MarketError>;

    async fn user_bids(&self, user_id: i64) -> Result<Vec<Bid>, MarketError>;

    /// 이전 주의 auto_renew 입찰을 주어진 주로 복사, 복사된 수 반환
    async fn renew_bids(&self, week: WeekWindow, now: DateTime<Utc>) -> Result<u64, MarketError>;

    /// 기간이 지난 활성 입찰을 expired 로 전환
    async fn expire_bids(&self, now: DateTime<Utc>) -> Result<u64, MarketError>;
}
// endregion: --- Ad Store

// region:    --- Database Manager
pub struct DatabaseManager {
    pub pool: Arc<PgPool>,
}

impl DatabaseManager {
    /// 데이터베이스 매니저 생성
    pub async fn new(config: &Config) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await?;
        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    /// 트랜잭션 실행
    pub async fn transaction<F, R, E>(&self, f: F) -> Result<R, E>
    where
        F: for<'c> FnOnce(
            &'c mut sqlx::Transaction<'_, sqlx::Postgres>,
        ) -> Pin<Box<dyn Future<Output = Result<R, E>> + Send + 'c>>,
        E: From<sqlx::Error>,
    {
        let mut tx = self.pool.begin().await?;
        let result = f(&mut tx).await;
        match result {
            Ok(r) => {
                tx.commit().await?;
                Ok(r)
            }
            Err(e) => {
                tx.rollback().await?;
                Err(e)
            }
        }
    }

    /// 스키마 생성 (IF NOT EXISTS 이므로 반복 실행 가능)
    pub async fn initialize_database(&self) -> Result<(), sqlx::Error> {
        let create_schema_sql = include_str!("../../sql/01-create-schema.sql");
        self.execute_multi_query(create_schema_sql).await
    }

    /// 여러 쿼리 실행
    async fn execute_multi_query(&self, sql: &str) -> Result<(), sqlx::Error> {
        for query in sql.split(';') {
            let query = query.trim();
            if !query.is_empty() {
                sqlx::query(query).execute(&*self.pool).await?;
            }
        }
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}
// endregion: --- Database Manager
