//! 주간 입찰 순위 계산 및 광고 슬롯 배정
//!
//! 순위는 항상 해당 주의 전체 활성 입찰로부터 다시 계산한다.
//! 저장된 current_position 은 이 결과의 캐시일 뿐이다.
// region:    --- Imports
use super::{BASE_RATE, COMPETITIVE_INCREMENT, SLOT_COUNT};
use crate::bidding::model::{Bid, ListedBid, ListingSummary, Money};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::cmp::Ordering;

// endregion: --- Imports

// region:    --- Ranking
/// 순위 계산 입력
#[derive(Debug, Clone, PartialEq)]
pub struct BidEntry {
    pub bid_id: i64,
    pub weekly_bid_amount: Money,
    pub max_auto_bid: Option<Money>,
    pub created_at: DateTime<Utc>,
}

impl BidEntry {
    /// 자동 입찰 상한까지 포함한 최대 도달 금액
    fn reach(&self) -> Money {
        self.max_auto_bid
            .map_or(self.weekly_bid_amount, |max| max.max(self.weekly_bid_amount))
    }
}

impl From<&Bid> for BidEntry {
    fn from(bid: &Bid) -> Self {
        Self {
            bid_id: bid.id,
            weekly_bid_amount: bid.weekly_bid_amount,
            max_auto_bid: bid.max_auto_bid,
            created_at: bid.created_at,
        }
    }
}

/// 순위 계산 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Placement {
    pub bid_id: i64,
    pub position: i32,
    /// 자동 입찰까지 반영한 실제 노출 금액 (재계산마다 다시 만들어진다)
    pub effective_amount: Money,
}

/// 금액 내림차순, 동일 금액은 먼저 생성된 입찰 우선
fn rank_order(a: &(BidEntry, Money), b: &(BidEntry, Money)) -> Ordering {
    b.1.cmp(&a.1)
        .then_with(|| a.0.created_at.cmp(&b.0.created_at))
        .then_with(|| a.0.bid_id.cmp(&b.0.bid_id))
}

fn place(mut priced: Vec<(BidEntry, Money)>) -> Vec<Placement> {
    priced.sort_by(rank_order);
    priced
        .into_iter()
        .zip(1..)
        .map(|((entry, effective_amount), position)| Placement {
            bid_id: entry.bid_id,
            position,
            effective_amount,
        })
        .collect()
}

/// 1 부터 N 까지 순위 부여 (제출 금액 그대로)
pub fn rank_bids(entries: Vec<BidEntry>) -> Vec<Placement> {
    place(
        entries
            .into_iter()
            .map(|entry| {
                let amount = entry.weekly_bid_amount;
                (entry, amount)
            })
            .collect(),
    )
}

/// 자동 입찰 반영 금액 (entries 와 같은 순서)
///
/// 최대 도달 금액이 가장 높은 입찰이 1위를 차지한다. 그 입찰은 나머지 입찰의
/// 최대 도달 금액 + 경쟁 증분까지만 올라가며, 자신의 상한을 넘지 않는다.
/// 나머지 입찰은 제출 금액 그대로다. 입력만으로 결정되므로 이력과 무관하다.
pub fn auto_bid_amounts(entries: &[BidEntry]) -> Vec<Money> {
    let mut amounts: Vec<Money> = entries.iter().map(|e| e.weekly_bid_amount).collect();

    let leader_index = entries
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| {
            b.reach()
                .cmp(&a.reach())
                .then_with(|| a.created_at.cmp(&b.created_at))
                .then_with(|| a.bid_id.cmp(&b.bid_id))
        })
        .map(|(index, _)| index);
    let Some(leader_index) = leader_index else {
        return amounts;
    };

    let rival_reach = entries
        .iter()
        .enumerate()
        .filter(|(index, _)| *index != leader_index)
        .map(|(_, entry)| entry.reach())
        .max();
    let Some(rival_reach) = rival_reach else {
        return amounts;
    };

    let leader = &entries[leader_index];
    let target = leader.reach().min(rival_reach + COMPETITIVE_INCREMENT);
    if target > leader.weekly_bid_amount {
        amounts[leader_index] = target;
    }
    amounts
}

/// 전체 재계산: 자동 입찰 반영 후 순위 부여
pub fn recompute(entries: Vec<BidEntry>) -> Vec<Placement> {
    let amounts = auto_bid_amounts(&entries);
    place(entries.into_iter().zip(amounts).collect())
}
// endregion: --- Ranking

// region:    --- Pricing
/// 1위를 차지하기 위한 최소 금액
pub fn price_to_beat(top_bid: Option<Money>) -> Money {
    match top_bid {
        Some(top) => top + COMPETITIVE_INCREMENT,
        None => BASE_RATE,
    }
}

/// 특정 슬롯 진입 가격
///
/// 점유된 슬롯은 현재 점유자 금액 + 증분, 빈 슬롯은 기본 요금 + 증분 × 점유 슬롯 수
pub fn bump_price(occupant: Option<Money>, occupied_count: usize) -> Money {
    match occupant {
        Some(price) => price + COMPETITIVE_INCREMENT,
        None => BASE_RATE + COMPETITIVE_INCREMENT * occupied_count as i64,
    }
}
// endregion: --- Pricing

// region:    --- Slots
const SLOT_DETAILS: [(&str, &str); SLOT_COUNT] = [
    (
        "Top Spot",
        "First business ad shown on the home page and every category page",
    ),
    ("Premium", "Second position on the home page and category pages"),
    ("Featured", "Third position on the home page and category pages"),
    ("Spotlight", "Fourth position, shown in the category sidebar"),
    ("Standard", "Fifth position, shown in the category sidebar"),
];

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SlotOccupant {
    pub bid_id: i64,
    pub effective_amount: Money,
    pub listing: ListingSummary,
}

/// 주간 광고 슬롯
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Slot {
    pub position: i32,
    pub label: &'static str,
    pub description: &'static str,
    pub occupied: bool,
    pub occupant: Option<SlotOccupant>,
    pub price: Money,
}

/// 순위 순으로 정렬된 입찰을 5 개 슬롯에 배정
pub fn allocate_slots(ranked: &[ListedBid]) -> Vec<Slot> {
    let occupied_count = ranked.len().min(SLOT_COUNT);
    SLOT_DETAILS
        .iter()
        .zip(1..)
        .map(|(&(label, description), position)| {
            let occupant = ranked.get(position as usize - 1).map(|listed| SlotOccupant {
                bid_id: listed.bid.id,
                effective_amount: listed.bid.effective_amount,
                listing: listed.listing.clone(),
            });
            let price = bump_price(
                occupant.as_ref().map(|o| o.effective_amount),
                occupied_count,
            );
            Slot {
                position,
                label,
                description,
                occupied: occupant.is_some(),
                occupant,
                price,
            }
        })
        .collect()
}
// endregion: --- Slots

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bidding::model::BidStatus;
    use chrono::{Duration, NaiveDate, TimeZone};

    fn dollars(units: i64) -> Money {
        Money::from_cents(units * 100)
    }

    fn entry(bid_id: i64, amount: i64, max: Option<i64>, minute: i64) -> BidEntry {
        BidEntry {
            bid_id,
            weekly_bid_amount: dollars(amount),
            max_auto_bid: max.map(dollars),
            created_at: Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap()
                + Duration::minutes(minute),
        }
    }

    fn listed(bid_id: i64, amount: i64) -> ListedBid {
        let week_start = NaiveDate::from_ymd_opt(2024, 6, 3).unwrap();
        let created_at = Utc.with_ymd_and_hms(2024, 6, 3, 9, 0, 0).unwrap();
        ListedBid {
            bid: Bid {
                id: bid_id,
                listing_id: bid_id * 10,
                user_id: 1,
                weekly_bid_amount: dollars(amount),
                effective_amount: dollars(amount),
                max_auto_bid: None,
                auto_renew: false,
                current_position: None,
                status: BidStatus::Active,
                week_start,
                week_end: week_start + Duration::days(6),
                created_at,
                updated_at: created_at,
            },
            listing: ListingSummary {
                listing_id: bid_id * 10,
                title: format!("Listing {bid_id}"),
                location: None,
                image_url: None,
            },
        }
    }

    #[test]
    fn ties_go_to_the_earlier_bid() {
        let placements = rank_bids(vec![
            entry(1, 10, None, 0),
            entry(2, 15, None, 1),
            entry(3, 15, None, 2),
        ]);
        let order: Vec<_> = placements.iter().map(|p| (p.bid_id, p.position)).collect();
        assert_eq!(order, vec![(2, 1), (3, 2), (1, 3)]);
    }

    #[test]
    fn ranks_continue_past_visible_slots() {
        let entries = (1..=7).map(|id| entry(id, 5 + id, None, id)).collect();
        let placements = rank_bids(entries);
        assert_eq!(placements.len(), 7);
        assert_eq!(placements.last().map(|p| (p.bid_id, p.position)), Some((1, 7)));
    }

    #[test]
    fn price_to_beat_defaults_to_base_rate() {
        assert_eq!(price_to_beat(None), dollars(5));
        assert_eq!(price_to_beat(Some(dollars(20))), dollars(25));
    }

    #[test]
    fn auto_bid_outbids_up_to_rival_reach() {
        let entries = vec![entry(1, 10, Some(30), 0), entry(2, 5, Some(50), 1)];
        assert_eq!(auto_bid_amounts(&entries), vec![dollars(10), dollars(35)]);

        let placements = recompute(entries);
        assert_eq!(placements[0].bid_id, 2);
        assert_eq!(placements[0].effective_amount, dollars(35));
    }

    #[test]
    fn lone_auto_bidder_pays_its_own_bid() {
        let entries = vec![entry(2, 5, Some(50), 1)];
        assert_eq!(auto_bid_amounts(&entries), vec![dollars(5)]);
    }

    #[test]
    fn auto_bid_never_exceeds_ceiling() {
        let placements = recompute(vec![entry(1, 10, Some(12), 0), entry(2, 11, None, 1)]);
        assert_eq!(placements[0].bid_id, 1);
        assert_eq!(placements[0].effective_amount, dollars(12));
    }

    #[test]
    fn bids_without_ceiling_are_left_alone() {
        let placements = recompute(vec![entry(1, 10, None, 0), entry(2, 20, None, 1)]);
        assert_eq!(placements[0].effective_amount, dollars(20));
        assert_eq!(placements[1].effective_amount, dollars(10));
    }

    #[test]
    fn slots_price_occupied_and_vacant_positions() {
        let slots = allocate_slots(&[listed(1, 20), listed(2, 10)]);
        assert_eq!(slots.len(), SLOT_COUNT);
        assert!(slots[0].occupied);
        assert_eq!(slots[0].price, dollars(25));
        assert_eq!(slots[1].price, dollars(15));
        assert!(!slots[2].occupied);
        // 5 + 5 * 2
        assert_eq!(slots[2].price, dollars(15));
        assert_eq!(slots[4].position, 5);
    }

    #[test]
    fn empty_market_slots_cost_base_rate() {
        let slots = allocate_slots(&[]);
        assert!(slots.iter().all(|s| !s.occupied && s.price == dollars(5)));
    }
}
