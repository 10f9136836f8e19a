/// 광고 입찰 정리 스케줄러
/// 활성 여부는 조회 시 week_end 로 판단하므로 이 작업이 없어도 결과는 같다.
/// 저장된 상태를 expired 로 정리하고 auto_renew 입찰을 이번 주로 갱신한다.
// region:    --- Imports
use crate::database::AdStore;
use crate::error::MarketError;
use crate::market::events::AdMarketEvent;
use crate::market::week::WeekWindow;
use crate::message_broker::EventPublisher;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tokio::time::{interval, Duration};
use tracing::{debug, error, info};

// endregion: --- Imports

// region:    --- Market Scheduler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SweepReport {
    pub renewed: u64,
    pub expired: u64,
}

/// 광고 입찰 정리 스케줄러
pub struct MarketScheduler {
    store: Arc<dyn AdStore>,
    publisher: Arc<dyn EventPublisher>,
    period: Duration,
}

impl MarketScheduler {
    pub fn new(
        store: Arc<dyn AdStore>,
        publisher: Arc<dyn EventPublisher>,
        period: Duration,
    ) -> Self {
        Self {
            store,
            publisher,
            period,
        }
    }

    /// 스케줄러 시작
    pub fn start(self) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = interval(self.period);
            loop {
                interval.tick().await;
                if let Err(e) = self.sweep(Utc::now()).await {
                    error!(
                        "{:<12} --> 입찰 정리 중 오류 발생: {:?}",
                        "Scheduler", e
                    );
                }
            }
        })
    }

    /// 1. 이전 주 auto_renew 입찰 갱신 2. 기간 지난 입찰 만료
    pub async fn sweep(&self, now: DateTime<Utc>) -> Result<SweepReport, MarketError> {
        let week = WeekWindow::current(now);

        let renewed = self.store.renew_bids(week, now).await?;
        if renewed > 0 {
            info!(
                "{:<12} --> 자동 갱신된 입찰: {} (week_start={})",
                "Scheduler", renewed, week.week_start
            );
            let event = AdMarketEvent::BidsRenewed {
                week_start: week.week_start,
                renewed,
                timestamp: now,
            };
            if let Err(e) = self.publisher.publish(&event).await {
                error!("{:<12} --> 이벤트 발행 실패: {}", "Scheduler", e);
            }
        }

        let expired = self.store.expire_bids(now).await?;

        debug!(
            "{:<12} --> 입찰 정리 완료: renewed={}, expired={}",
            "Scheduler", renewed, expired
        );
        Ok(SweepReport { renewed, expired })
    }
}
// endregion: --- Market Scheduler
