use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, Mul};
use std::str::FromStr;

// region:    --- Money
/// 금액 (센트 단위 정수로 저장, JSON 에서는 통화 단위 소수로 표현)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, sqlx::Type)]
#[sqlx(transparent)]
pub struct Money(i64);

impl Money {
    pub const ZERO: Money = Money(0);

    pub const fn from_cents(cents: i64) -> Self {
        Self(cents)
    }

    pub const fn cents(self) -> i64 {
        self.0
    }

    /// 통화 단위(예: 4.99)를 센트로 변환. 유한하지 않은 값은 거부
    pub fn from_units(units: f64) -> Option<Self> {
        if !units.is_finite() {
            return None;
        }
        let cents = (units * 100.0).round();
        if cents.abs() > i64::MAX as f64 {
            return None;
        }
        Some(Self(cents as i64))
    }

    pub fn as_units(self) -> f64 {
        self.0 as f64 / 100.0
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, rhs: Money) -> Money {
        Money(self.0.saturating_add(rhs.0))
    }
}

impl Mul<i64> for Money {
    type Output = Money;

    fn mul(self, rhs: i64) -> Money {
        Money(self.0.saturating_mul(rhs))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        write!(f, "{}${}.{:02}", sign, abs / 100, abs % 100)
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.as_units())
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let units = f64::deserialize(deserializer)?;
        Money::from_units(units)
            .ok_or_else(|| serde::de::Error::custom("amount must be a finite number"))
    }
}
// endregion: --- Money

// region:    --- Bid
/// 입찰 상태
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Active,
    Paused,
    Cancelled,
    Expired,
}

impl BidStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BidStatus::Active => "active",
            BidStatus::Paused => "paused",
            BidStatus::Cancelled => "cancelled",
            BidStatus::Expired => "expired",
        }
    }
}

impl FromStr for BidStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(BidStatus::Active),
            "paused" => Ok(BidStatus::Paused),
            "cancelled" => Ok(BidStatus::Cancelled),
            "expired" => Ok(BidStatus::Expired),
            other => Err(format!("unknown bid status: {other}")),
        }
    }
}

/// 주간 광고 입찰
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    pub id: i64,
    pub listing_id: i64,
    pub user_id: i64,
    /// 사용자가 제출한 주간 입찰 금액
    pub weekly_bid_amount: Money,
    /// 자동 입찰 반영 금액 (순위 재계산 결과, 제출 금액 이상)
    pub effective_amount: Money,
    pub max_auto_bid: Option<Money>,
    pub auto_renew: bool,
    pub current_position: Option<i32>,
    pub status: BidStatus,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Bid {
    /// status=active 이고 week_end 가 지나지 않은 입찰
    pub fn is_active_on(&self, today: NaiveDate) -> bool {
        self.status == BidStatus::Active && self.week_end >= today
    }
}

/// ad_bids 테이블 행
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct BidRow {
    pub id: i64,
    pub listing_id: i64,
    pub user_id: i64,
    pub weekly_bid_cents: Money,
    pub effective_amount_cents: Money,
    pub max_auto_bid_cents: Option<Money>,
    pub auto_renew: bool,
    pub current_position: Option<i32>,
    pub status: String,
    pub week_start: NaiveDate,
    pub week_end: NaiveDate,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<BidRow> for Bid {
    type Error = sqlx::Error;

    fn try_from(row: BidRow) -> Result<Self, Self::Error> {
        let status = row.status.parse().map_err(|e: String| sqlx::Error::ColumnDecode {
            index: "status".to_string(),
            source: e.into(),
        })?;
        Ok(Bid {
            id: row.id,
            listing_id: row.listing_id,
            user_id: row.user_id,
            weekly_bid_amount: row.weekly_bid_cents,
            effective_amount: row.effective_amount_cents,
            max_auto_bid: row.max_auto_bid_cents,
            auto_renew: row.auto_renew,
            current_position: row.current_position,
            status,
            week_start: row.week_start,
            week_end: row.week_end,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// 입찰 결과 구분
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BidAction {
    Created,
    Updated,
    /// 이미 처리된 결제의 재전송
    Replayed,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BidOutcome {
    pub bid: Bid,
    pub action: BidAction,
}
// endregion: --- Bid

// region:    --- Listing
/// 게시글 유형
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListingType {
    Advertise,
    Sale,
    Wanted,
    Service,
    Other,
}

impl FromStr for ListingType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "advertise" => Ok(ListingType::Advertise),
            "sale" => Ok(ListingType::Sale),
            "wanted" => Ok(ListingType::Wanted),
            "service" => Ok(ListingType::Service),
            "other" => Ok(ListingType::Other),
            other => Err(format!("unknown listing type: {other}")),
        }
    }
}

/// 게시글 (광고 입찰 대상)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Listing {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub listing_type: ListingType,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListingRow {
    pub id: i64,
    pub user_id: i64,
    pub title: String,
    pub listing_type: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

impl TryFrom<ListingRow> for Listing {
    type Error = sqlx::Error;

    fn try_from(row: ListingRow) -> Result<Self, Self::Error> {
        let listing_type = row
            .listing_type
            .parse()
            .map_err(|e: String| sqlx::Error::ColumnDecode {
                index: "listing_type".to_string(),
                source: e.into(),
            })?;
        Ok(Listing {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            listing_type,
            location: row.location,
            image_url: row.image_url,
        })
    }
}

/// 시장 화면에 노출되는 게시글 정보
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListingSummary {
    pub listing_id: i64,
    pub title: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

/// 입찰 + 게시글 표시 정보
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ListedBid {
    pub bid: Bid,
    pub listing: ListingSummary,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ListedBidRow {
    #[sqlx(flatten)]
    pub bid: BidRow,
    pub title: String,
    pub location: Option<String>,
    pub image_url: Option<String>,
}

impl TryFrom<ListedBidRow> for ListedBid {
    type Error = sqlx::Error;

    fn try_from(row: ListedBidRow) -> Result<Self, Self::Error> {
        let listing = ListingSummary {
            listing_id: row.bid.listing_id,
            title: row.title,
            location: row.location,
            image_url: row.image_url,
        };
        Ok(ListedBid {
            bid: row.bid.try_into()?,
            listing,
        })
    }
}
// endregion: --- Listing

// region:    --- Identity
/// 인증된 사용자
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Identity {
    pub user_id: i64,
    pub email: String,
    pub is_admin: bool,
}
// endregion: --- Identity
