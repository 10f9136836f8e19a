use crate::bidding::model::Money;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;
use tracing::error;

/// 입찰 입력 검증 오류 (사용자가 수정 가능)
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Weekly bid amount must be at least {minimum}")]
    InvalidAmount { minimum: Money },

    #[error("Max auto-bid must be greater than or equal to the weekly bid amount")]
    InvalidAutoBidCeiling,
}

#[derive(Error, Debug)]
pub enum MarketError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Malformed payload")]
    MalformedPayload,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Authentication required")]
    Unauthenticated,

    // 존재 여부와 소유권 실패를 구분하지 않는다
    #[error("Not found")]
    NotFound,

    #[error("Something went wrong, please try again")]
    Persistence(#[from] sqlx::Error),

    #[error("Ad market is temporarily unavailable, please try again")]
    MarketRecalculation(#[source] sqlx::Error),
}

impl MarketError {
    pub fn code(&self) -> &'static str {
        match self {
            MarketError::Validation(ValidationError::InvalidAmount { .. }) => "INVALID_AMOUNT",
            MarketError::Validation(ValidationError::InvalidAutoBidCeiling) => {
                "INVALID_AUTO_BID_CEILING"
            }
            MarketError::MalformedPayload => "MALFORMED_PAYLOAD",
            MarketError::MissingField(_) => "MISSING_FIELD",
            MarketError::Unauthenticated => "UNAUTHENTICATED",
            MarketError::NotFound => "NOT_FOUND",
            MarketError::Persistence(_) => "PERSISTENCE_ERROR",
            MarketError::MarketRecalculation(_) => "MARKET_UNAVAILABLE",
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            MarketError::Validation(_)
            | MarketError::MalformedPayload
            | MarketError::MissingField(_) => StatusCode::BAD_REQUEST,
            MarketError::Unauthenticated => StatusCode::UNAUTHORIZED,
            MarketError::NotFound => StatusCode::NOT_FOUND,
            MarketError::Persistence(_) => StatusCode::INTERNAL_SERVER_ERROR,
            MarketError::MarketRecalculation(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

impl IntoResponse for MarketError {
    fn into_response(self) -> Response {
        // 내부 저장소 오류 내용은 로그에만 남긴다
        match &self {
            MarketError::Persistence(e) => error!("{:<12} --> 저장소 오류: {:?}", "Error", e),
            MarketError::MarketRecalculation(e) => {
                error!("{:<12} --> 순위 재계산 실패: {:?}", "Error", e)
            }
            _ => {}
        }

        let body = Json(serde_json::json!({
            "error": self.to_string(),
            "code": self.code(),
        }));
        (self.status(), body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_do_not_leak_details() {
        let err = MarketError::Persistence(sqlx::Error::Protocol("relation ad_bids".into()));
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!err.to_string().contains("ad_bids"));
    }

    #[test]
    fn validation_message_names_the_minimum() {
        let err = MarketError::from(ValidationError::InvalidAmount {
            minimum: Money::from_cents(500),
        });
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        assert_eq!(err.code(), "INVALID_AMOUNT");
        assert!(err.to_string().contains("$5.00"));
    }
}
