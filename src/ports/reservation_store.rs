use crate::domain::{Book, Reservation, ReservationChanges, ReservationId, ReservationTransition};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 書き込みの結果
///
/// ストレージ障害は`Err`で返し、業務上の失敗はこの列挙で返す。
/// `Saved`以外の場合、書き込みは一切適用されていない。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Saved(Reservation),
    /// 更新対象の予約が存在しない（並行して削除された場合を含む）
    ReservationNotFound,
    /// 確保・解放対象の書籍が存在しない
    BookNotFound,
    /// 書籍が既に確保されている
    BookUnavailable,
}

/// 一覧表示用：予約と関連する書籍
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationWithBook {
    pub reservation: Reservation,
    pub book: Option<Book>,
}

/// 予約ストアポート
///
/// 予約・書籍の貸出可能フラグ・確定ログ（reserve_books）の3つを
/// 1つの単位として書き込む。各書き込みメソッドは原子的であり、
/// 途中で失敗した場合はすべてロールバックされる。
#[async_trait]
pub trait ReservationStore: Send + Sync {
    /// 全予約を関連書籍付きで取得する（作成日時順）
    async fn list_with_books(&self) -> Result<Vec<ReservationWithBook>>;

    /// IDで予約を取得する
    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;

    /// 新しい予約を書き込む
    ///
    /// `AvailabilityChange::Claim`の場合、書籍が貸出可能なときだけ
    /// フラグをfalseにし、そうでなければ`BookUnavailable`を返す。
    async fn insert(&self, transition: ReservationTransition) -> Result<WriteOutcome>;

    /// 既存の予約に変更を適用する
    ///
    /// 書籍フラグの変更は、ストア内でロックして読み取った現在の予約から
    /// 計算する（`domain::reservation::apply_changes`）。呼び出し側が
    /// 事前に読んだ予約の状態は使わない。
    async fn update(
        &self,
        reservation_id: ReservationId,
        changes: ReservationChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<WriteOutcome>;

    /// 予約を削除する
    ///
    /// 削除した予約が有効だった場合は書籍を解放する。
    /// 確定ログは削除しない。存在しない場合は`None`。
    async fn remove(&self, reservation_id: ReservationId) -> Result<Option<Reservation>>;
}
