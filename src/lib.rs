//! HSC 커뮤니티 광고 게시판의 주간 비즈니스 광고 입찰 서비스.
//!
//! 광고 게시글은 매주(월요일 ~ 일요일, UTC) 5 개의 노출 슬롯을 두고 경쟁 입찰한다.
//! 순위는 입찰이 바뀔 때마다 해당 주 전체 활성 입찰로부터 다시 계산한다.
pub mod auth;
pub mod bidding;
pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod market;
pub mod message_broker;
pub mod query;
pub mod scheduler;
pub mod server;
pub mod state;
