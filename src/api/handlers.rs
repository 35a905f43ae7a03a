use crate::application::reservation::{
    ReservationApplicationError, ServiceDependencies, cancel_reservation as execute_cancel_reservation,
    create_reservation as execute_create_reservation,
    delete_reservation as execute_delete_reservation, get_reservation as execute_get_reservation,
    list_reservations as execute_list_reservations, reserve_book as execute_reserve_book,
    update_reservation as execute_update_reservation,
};
use crate::domain::{
    commands::CancelReservation,
    value_objects::{BookId, ReservationId},
};
use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    http::StatusCode,
};
use std::sync::Arc;
use uuid::Uuid;

use super::{
    error::ApiError,
    types::{
        CreateReservationRequest, MessageResponse, ReservationResponse,
        ReservationWithBookResponse, ReserveBookRequest, UpdateReservationRequest,
    },
};

// ============================================================================
// State
// ============================================================================

/// ハンドラー間で共有されるアプリケーション状態
#[derive(Clone)]
pub struct AppState {
    pub service_deps: ServiceDependencies,
}

// ============================================================================
// Reservation CRUD
// ============================================================================

/// GET /reservations - 予約一覧（関連書籍付き）
pub async fn list_reservations(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<ReservationWithBookResponse>>, ApiError> {
    let reservations = execute_list_reservations(&state.service_deps).await?;

    Ok(Json(
        reservations
            .into_iter()
            .map(ReservationWithBookResponse::from)
            .collect(),
    ))
}

/// POST /reservations - 予約を作成
///
/// `status: true` の場合は書籍を確保する（`POST /books/:id/reserve` と同じ不変条件）。
pub async fn create_reservation(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateReservationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    let Json(req) = payload?;
    let cmd = req.to_command(chrono::Utc::now());

    let reservation = execute_create_reservation(&state.service_deps, cmd).await?;

    Ok((StatusCode::CREATED, Json(ReservationResponse::from(reservation))))
}

/// GET /reservations/:id - 予約詳細
pub async fn get_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation = execute_get_reservation(
        &state.service_deps,
        ReservationId::from_uuid(reservation_id),
    )
    .await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

/// PUT /reservations/:id - 予約を更新（start_date, end_date, status のみ）
pub async fn update_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
    payload: Result<Json<UpdateReservationRequest>, JsonRejection>,
) -> Result<Json<ReservationResponse>, ApiError> {
    let reservation_id = ReservationId::from_uuid(reservation_id);

    // 存在しない予約はボディの内容に関わらず404
    let Json(req) = match payload {
        Ok(json) => json,
        Err(rejection) => {
            execute_get_reservation(&state.service_deps, reservation_id).await?;
            return Err(rejection.into());
        }
    };
    let cmd = req.to_command(reservation_id, chrono::Utc::now());

    let reservation = execute_update_reservation(&state.service_deps, cmd).await?;

    Ok(Json(ReservationResponse::from(reservation)))
}

/// DELETE /reservations/:id - 予約を削除
pub async fn delete_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    execute_delete_reservation(
        &state.service_deps,
        ReservationId::from_uuid(reservation_id),
    )
    .await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Domain operations
// ============================================================================

/// POST /books/:id/reserve - 書籍を予約
///
/// - 書籍が存在しない: 404
/// - 書籍が予約済み、または入力不正: 400
/// - 永続化エラー: 500（ロールバック済み）
pub async fn reserve_book(
    State(state): State<Arc<AppState>>,
    Path(book_id): Path<Uuid>,
    payload: Result<Json<ReserveBookRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ReservationResponse>), ApiError> {
    // ボディが不正でも書籍の存在・貸出可能性のチェックを先に行う
    let (req, rejection) = match payload {
        Ok(Json(req)) => (req, None),
        Err(rejection) => (ReserveBookRequest::default(), Some(rejection)),
    };
    let cmd = req.to_command(BookId::from_uuid(book_id), chrono::Utc::now());

    let reservation = match execute_reserve_book(&state.service_deps, cmd).await {
        Err(ReservationApplicationError::Validation(mut errors)) => {
            if let Some(rejection) = rejection {
                errors.add("body", rejection.body_text());
            }
            return Err(ReservationApplicationError::Validation(errors).into());
        }
        result => result?,
    };

    Ok((StatusCode::CREATED, Json(ReservationResponse::from(reservation))))
}

/// POST /reservations/:id/cancel - 予約をキャンセル
///
/// 書籍を貸出可能に戻し、予約を削除する。確定ログは残る。
pub async fn cancel_reservation(
    State(state): State<Arc<AppState>>,
    Path(reservation_id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    let cmd = CancelReservation {
        reservation_id: ReservationId::from_uuid(reservation_id),
    };

    execute_cancel_reservation(&state.service_deps, cmd).await?;

    Ok(Json(MessageResponse::new(
        "Reservation canceled successfully",
    )))
}
