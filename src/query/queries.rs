/// 세션 토큰으로 사용자 조회
pub const GET_SESSION_IDENTITY: &str = r#"
    SELECT u.id AS user_id, u.email, u.is_admin
    FROM sessions s
    JOIN users u ON u.id = s.user_id
    WHERE s.token = $1 AND s.expires_at > $2
"#;

/// 게시글 조회
pub const GET_LISTING: &str =
    "SELECT id, user_id, title, listing_type, location, image_url FROM listings WHERE id = $1";

/// 입찰 조회 (소유자 기준)
pub const GET_OWNED_BID: &str = r#"
    SELECT id, listing_id, user_id, weekly_bid_cents, effective_amount_cents, max_auto_bid_cents,
           auto_renew, current_position, status, week_start, week_end, created_at, updated_at
    FROM ad_bids
    WHERE id = $1 AND user_id = $2
"#;

/// 사용자 입찰 목록
pub const GET_USER_BIDS: &str = r#"
    SELECT id, listing_id, user_id, weekly_bid_cents, effective_amount_cents, max_auto_bid_cents,
           auto_renew, current_position, status, week_start, week_end, created_at, updated_at
    FROM ad_bids
    WHERE user_id = $1
    ORDER BY week_start DESC, created_at DESC, id DESC
"#;

/// 주간 단위 advisory lock (트랜잭션 종료 시 해제)
pub const LOCK_WEEK: &str = "SELECT pg_advisory_xact_lock($1)";

/// 결제 ID 단위 advisory lock (같은 결제의 동시 재전송 직렬화)
pub const LOCK_PAYMENT: &str = "SELECT pg_advisory_xact_lock(hashtextextended($1, 0))";

/// 입찰 생성 또는 갱신 (listing_id, week_start, status=active 유일 인덱스 기준)
pub const UPSERT_ACTIVE_BID: &str = r#"
    INSERT INTO ad_bids (listing_id, user_id, weekly_bid_cents, effective_amount_cents,
                         max_auto_bid_cents, auto_renew, status, week_start, week_end,
                         created_at, updated_at)
    VALUES ($1, $2, $3, $3, $4, $5, 'active', $6, $7, $8, $8)
    ON CONFLICT (listing_id, week_start) WHERE status = 'active'
    DO UPDATE SET weekly_bid_cents = EXCLUDED.weekly_bid_cents,
                  effective_amount_cents = EXCLUDED.weekly_bid_cents,
                  max_auto_bid_cents = EXCLUDED.max_auto_bid_cents,
                  auto_renew = EXCLUDED.auto_renew,
                  updated_at = EXCLUDED.updated_at
    RETURNING id, listing_id, user_id, weekly_bid_cents, effective_amount_cents, max_auto_bid_cents,
              auto_renew, current_position, status, week_start, week_end, created_at, updated_at,
              (xmax = 0) AS inserted
"#;

/// 입찰 취소
pub const CANCEL_BID: &str = r#"
    UPDATE ad_bids
    SET status = 'cancelled', current_position = NULL, updated_at = $3
    WHERE id = $1 AND user_id = $2 AND status IN ('active', 'paused')
    RETURNING id, listing_id, user_id, weekly_bid_cents, effective_amount_cents, max_auto_bid_cents,
              auto_renew, current_position, status, week_start, week_end, created_at, updated_at
"#;

/// 처리된 결제의 입찰 조회
pub const GET_PAYMENT_BID: &str = r#"
    SELECT b.id, b.listing_id, b.user_id, b.weekly_bid_cents, b.effective_amount_cents,
           b.max_auto_bid_cents, b.auto_renew, b.current_position, b.status, b.week_start,
           b.week_end, b.created_at, b.updated_at
    FROM ad_payments p
    JOIN ad_bids b ON b.id = p.bid_id
    WHERE p.payment_id = $1
"#;

/// 결제 기록
pub const INSERT_PAYMENT: &str = r#"
    INSERT INTO ad_payments (payment_id, bid_id, processed_at)
    VALUES ($1, $2, $3)
"#;

/// 재계산 대상 활성 입찰 (행 잠금)
pub const LOCK_ACTIVE_WEEK_BIDS: &str = r#"
    SELECT id, listing_id, user_id, weekly_bid_cents, effective_amount_cents, max_auto_bid_cents,
           auto_renew, current_position, status, week_start, week_end, created_at, updated_at
    FROM ad_bids
    WHERE week_start = $1 AND status = 'active' AND week_end >= $2
    FOR UPDATE
"#;

/// 순위 및 금액 일괄 갱신
pub const APPLY_PLACEMENTS: &str = r#"
    UPDATE ad_bids AS b
    SET current_position = v.position, effective_amount_cents = v.amount
    FROM UNNEST($1::BIGINT[], $2::INT[], $3::BIGINT[]) AS v(id, position, amount)
    WHERE b.id = v.id
"#;

/// 비활성 입찰 순위 제거
pub const CLEAR_INACTIVE_POSITIONS: &str = r#"
    UPDATE ad_bids
    SET current_position = NULL
    WHERE week_start = $1 AND status <> 'active' AND current_position IS NOT NULL
"#;

/// 주간 시장 조회 (저장된 순위 오름차순, 미배정은 마지막)
pub const GET_MARKET_BIDS: &str = r#"
    SELECT b.id, b.listing_id, b.user_id, b.weekly_bid_cents, b.effective_amount_cents,
           b.max_auto_bid_cents, b.auto_renew, b.current_position, b.status, b.week_start,
           b.week_end, b.created_at, b.updated_at,
           l.title, l.location, l.image_url
    FROM ad_bids b
    JOIN listings l ON l.id = b.listing_id
    WHERE b.status = 'active'
      AND b.week_end >= $3
      AND b.week_start <= $2
      AND b.week_end >= $1
    ORDER BY b.current_position ASC NULLS LAST, b.created_at ASC, b.id ASC
"#;

/// 자동 갱신: 이전 주의 auto_renew 입찰을 이번 주로 복사
/// 이번 주에 어떤 상태든 입찰이 있는 게시글은 제외 (취소를 되돌리지 않음)
pub const RENEW_BIDS: &str = r#"
    INSERT INTO ad_bids (listing_id, user_id, weekly_bid_cents, effective_amount_cents,
                         max_auto_bid_cents, auto_renew, status, week_start, week_end,
                         created_at, updated_at)
    SELECT p.listing_id, p.user_id, p.weekly_bid_cents, p.weekly_bid_cents, p.max_auto_bid_cents,
           TRUE, 'active', $2, $3, $4, $4
    FROM ad_bids p
    WHERE p.week_start = $1
      AND p.auto_renew
      AND p.status IN ('active', 'expired')
      AND NOT EXISTS (
          SELECT 1 FROM ad_bids c WHERE c.listing_id = p.listing_id AND c.week_start = $2
      )
    ON CONFLICT (listing_id, week_start) WHERE status = 'active' DO NOTHING
"#;

/// 기간이 지난 활성 입찰 만료 처리
pub const EXPIRE_BIDS: &str = r#"
    UPDATE ad_bids
    SET status = 'expired', current_position = NULL, updated_at = $2
    WHERE status = 'active' AND week_end < $1
"#;

/// 입찰 단건 조회
pub const GET_BID: &str = r#"
    SELECT id, listing_id, user_id, weekly_bid_cents, effective_amount_cents, max_auto_bid_cents,
           auto_renew, current_position, status, week_start, week_end, created_at, updated_at
    FROM ad_bids
    WHERE id = $1
"#;
