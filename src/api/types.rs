use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    Book, BookId, Reservation, ReservationId, UserId, ValidationErrors, commands::*,
};
use crate::ports::ReservationWithBook;

/// 予約作成リクエスト（POST /reservations）
///
/// 必須項目の欠落はJSONのデシリアライズではなく検証で報告するため、
/// すべてのフィールドを`Option`で受け取る。
#[derive(Debug, Default, Deserialize)]
pub struct CreateReservationRequest {
    pub user_id: Option<Uuid>,
    pub book_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<bool>,
}

impl CreateReservationRequest {
    pub fn to_command(self, requested_at: DateTime<Utc>) -> CreateReservation {
        CreateReservation {
            user_id: self.user_id.map(UserId::from_uuid),
            book_id: self.book_id.map(BookId::from_uuid),
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            requested_at,
        }
    }
}

/// 予約更新リクエスト（PUT /reservations/:id）
///
/// 許可リスト：ここに無いフィールド（user_id, book_id など）は無視される。
#[derive(Debug, Default, Deserialize)]
pub struct UpdateReservationRequest {
    pub start_date: Option<String>,
    pub end_date: Option<String>,
    pub status: Option<bool>,
}

impl UpdateReservationRequest {
    pub fn to_command(
        self,
        reservation_id: ReservationId,
        updated_at: DateTime<Utc>,
    ) -> UpdateReservation {
        UpdateReservation {
            reservation_id,
            start_date: self.start_date,
            end_date: self.end_date,
            status: self.status,
            updated_at,
        }
    }
}

/// 書籍予約リクエスト（POST /books/:id/reserve）
#[derive(Debug, Default, Deserialize)]
pub struct ReserveBookRequest {
    pub user_id: Option<Uuid>,
    pub start_date: Option<String>,
    pub end_date: Option<String>,
}

impl ReserveBookRequest {
    pub fn to_command(self, book_id: BookId, requested_at: DateTime<Utc>) -> ReserveBook {
        ReserveBook {
            book_id,
            user_id: self.user_id.map(UserId::from_uuid),
            start_date: self.start_date,
            end_date: self.end_date,
            requested_at,
        }
    }
}

/// 予約レスポンス
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationResponse {
    pub id: Uuid,
    pub user_id: Uuid,
    pub book_id: Uuid,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Reservation> for ReservationResponse {
    fn from(reservation: Reservation) -> Self {
        Self {
            id: reservation.id.value(),
            user_id: reservation.user_id.value(),
            book_id: reservation.book_id.value(),
            start_date: reservation.start_date,
            end_date: reservation.end_date,
            status: reservation.status,
            created_at: reservation.created_at,
            updated_at: reservation.updated_at,
        }
    }
}

/// 書籍レスポンス（一覧で予約に埋め込まれる）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookResponse {
    pub id: Uuid,
    pub title: String,
    pub available: bool,
}

impl From<Book> for BookResponse {
    fn from(book: Book) -> Self {
        Self {
            id: book.id.value(),
            title: book.title,
            available: book.available,
        }
    }
}

/// 予約一覧の要素（GET /reservations）
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReservationWithBookResponse {
    #[serde(flatten)]
    pub reservation: ReservationResponse,
    pub book: Option<BookResponse>,
}

impl From<ReservationWithBook> for ReservationWithBookResponse {
    fn from(item: ReservationWithBook) -> Self {
        Self {
            reservation: ReservationResponse::from(item.reservation),
            book: item.book.map(BookResponse::from),
        }
    }
}

/// メッセージのみのレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// エラーレスポンス
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub code: String,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            error: message.into(),
        }
    }
}

/// 検証エラーレスポンス
#[derive(Debug, Serialize)]
pub struct ValidationErrorResponse {
    pub errors: ValidationErrors,
}
