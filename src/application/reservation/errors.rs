use crate::domain::ValidationErrors;
use std::fmt;
use thiserror::Error;

/// 永続化障害が発生した操作
///
/// クライアントへの汎用メッセージとログの文脈に使用する。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    ListReservations,
    CreateReservation,
    GetReservation,
    UpdateReservation,
    DeleteReservation,
    ReserveBook,
    CancelReservation,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::ListReservations => "list the reservations",
            Operation::CreateReservation => "create the reservation",
            Operation::GetReservation => "load the reservation",
            Operation::UpdateReservation => "update the reservation",
            Operation::DeleteReservation => "delete the reservation",
            Operation::ReserveBook => "reserve the book",
            Operation::CancelReservation => "cancel the reservation",
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 予約管理アプリケーション層のエラー
#[derive(Debug, Error)]
pub enum ReservationApplicationError {
    /// 入力が不正（必須項目の欠落、日付形式、存在しない参照先）
    #[error("Validation failed: {0}")]
    Validation(ValidationErrors),

    /// 予約が見つからない
    #[error("Reservation not found")]
    ReservationNotFound,

    /// 書籍が見つからない
    #[error("Book not found")]
    BookNotFound,

    /// 書籍が既に予約されている
    #[error("The book is not available for reservation")]
    BookNotAvailable,

    /// ストアのエラー（書き込みはロールバック済み）
    #[error("Failed to {operation}")]
    Persistence {
        operation: Operation,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// UserDirectoryのエラー
    #[error("User directory error")]
    UserDirectoryError(#[source] Box<dyn std::error::Error + Send + Sync>),
}

/// アプリケーション層の Result型
pub type Result<T> = std::result::Result<T, ReservationApplicationError>;
