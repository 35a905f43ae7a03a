use crate::application::reservation::ReservationApplicationError;
use crate::domain::ValidationErrors;
use axum::{
    Json,
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use super::types::{ErrorResponse, ValidationErrorResponse};

/// API層のエラー型
///
/// アプリケーション層のエラーをラップし、HTTPレスポンスへのマッピングを提供する。
#[derive(Debug)]
pub struct ApiError(ReservationApplicationError);

impl From<ReservationApplicationError> for ApiError {
    fn from(err: ReservationApplicationError) -> Self {
        ApiError(err)
    }
}

/// 不正なJSONボディは検証エラー（400）として扱う
impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError(ReservationApplicationError::Validation(
            ValidationErrors::single("body", rejection.body_text()),
        ))
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self.0 {
            // 400 Bad Request - 入力不正（フィールドごとのエラーを返す）
            ReservationApplicationError::Validation(errors) => {
                let body = Json(ValidationErrorResponse { errors });
                return (StatusCode::BAD_REQUEST, body).into_response();
            }

            // 400 Bad Request - 書籍が既に予約済み
            ReservationApplicationError::BookNotAvailable => (
                StatusCode::BAD_REQUEST,
                "BOOK_NOT_AVAILABLE",
                "The book is not available for reservation".to_string(),
            ),

            // 404 Not Found
            ReservationApplicationError::ReservationNotFound => (
                StatusCode::NOT_FOUND,
                "RESERVATION_NOT_FOUND",
                "Reservation not found".to_string(),
            ),
            ReservationApplicationError::BookNotFound => (
                StatusCode::NOT_FOUND,
                "BOOK_NOT_FOUND",
                "Book not found".to_string(),
            ),

            // 500 Internal Server Error - システム障害
            // 内部エラーの詳細はログに記録し、クライアントには一般的なメッセージのみを返す
            ReservationApplicationError::Persistence { operation, source } => {
                tracing::error!(%operation, error = %source, "Persistence error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "PERSISTENCE_ERROR",
                    format!("Failed to {}.", operation),
                )
            }
            ReservationApplicationError::UserDirectoryError(source) => {
                tracing::error!(error = %source, "User directory error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "USER_DIRECTORY_ERROR",
                    "User directory error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse::new(code, message));
        (status, body).into_response()
    }
}
