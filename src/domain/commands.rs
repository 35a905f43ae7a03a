use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{BookId, ReservationId, UserId};

// コマンドは未検証の入力をそのまま運ぶ。
// 日付は文字列のまま受け取り、フィールド単位の検証はアプリケーション層で行う。

/// コマンド：予約を作成する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreateReservation {
    pub user_id: Option<UserId>,
    pub book_id: Option<BookId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<bool>,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：予約を更新する
///
/// 変更可能なのは期間とステータスのみ（許可リスト）。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateReservation {
    pub reservation_id: ReservationId,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

/// コマンド：書籍を予約する
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveBook {
    pub book_id: BookId,
    pub user_id: Option<UserId>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub requested_at: DateTime<Utc>,
}

/// コマンド：予約をキャンセルする
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CancelReservation {
    pub reservation_id: ReservationId,
}
