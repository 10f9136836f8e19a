pub mod allocator;
pub mod events;
pub mod week;

use crate::bidding::model::Money;

/// 주간 광고 기본 요금 ($5.00)
pub const BASE_RATE: Money = Money::from_cents(500);

/// 경쟁 입찰 증분 ($5.00)
pub const COMPETITIVE_INCREMENT: Money = Money::from_cents(500);

/// 주간 노출 슬롯 수
pub const SLOT_COUNT: usize = 5;
