use super::model::Money;
use crate::error::ValidationError;
use crate::market::BASE_RATE;

/// 입찰 금액 검증 (I/O 없음)
pub fn validate_bid(
    weekly_bid_amount: Money,
    max_auto_bid: Option<Money>,
) -> Result<(), ValidationError> {
    if weekly_bid_amount < BASE_RATE {
        return Err(ValidationError::InvalidAmount { minimum: BASE_RATE });
    }
    if let Some(ceiling) = max_auto_bid {
        if ceiling < weekly_bid_amount {
            return Err(ValidationError::InvalidAutoBidCeiling);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_bids_below_base_rate() {
        assert_eq!(
            validate_bid(Money::from_cents(499), None),
            Err(ValidationError::InvalidAmount { minimum: BASE_RATE })
        );
        assert_eq!(validate_bid(Money::from_cents(500), None), Ok(()));
    }

    #[test]
    fn auto_bid_ceiling_must_cover_weekly_amount() {
        assert_eq!(
            validate_bid(Money::from_cents(1000), Some(Money::from_cents(999))),
            Err(ValidationError::InvalidAutoBidCeiling)
        );
        assert_eq!(
            validate_bid(Money::from_cents(1000), Some(Money::from_cents(1000))),
            Ok(())
        );
    }
}
