use crate::domain::{Book, BookId};
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 書籍リポジトリポート
///
/// 予約コンテキストが参照するのは書籍の存在と貸出可能フラグのみ。
/// フラグの書き換えは予約と同一トランザクションで行う必要があるため、
/// このポートには含めず`ReservationStore`側で行う。
#[async_trait]
pub trait BookRepository: Send + Sync {
    /// IDで書籍を取得する
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>>;
}
