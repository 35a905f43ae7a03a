use crate::domain::{
    self, Reservation, ReservationId, UserId, ValidationErrors, commands::*,
    reservation::ReservationPeriod, validation,
};
use crate::ports::*;
use std::sync::Arc;

use super::errors::{Operation, ReservationApplicationError, Result};

/// サービスの依存関係
///
/// 関数型DDDの原則に従い、データ構造として定義。
/// 各操作は純粋な関数としてこの構造体を受け取る。
#[derive(Clone)]
pub struct ServiceDependencies {
    pub reservation_store: Arc<dyn ReservationStore>,
    pub book_repository: Arc<dyn BookRepository>,
    pub user_directory: Arc<dyn UserDirectory>,
}

fn persistence(
    operation: Operation,
) -> impl FnOnce(Box<dyn std::error::Error + Send + Sync>) -> ReservationApplicationError {
    move |source| ReservationApplicationError::Persistence { operation, source }
}

/// ストアの書き込み結果をアプリケーション層の結果に変換する
fn into_saved(outcome: WriteOutcome) -> Result<Reservation> {
    match outcome {
        WriteOutcome::Saved(reservation) => Ok(reservation),
        WriteOutcome::ReservationNotFound => Err(ReservationApplicationError::ReservationNotFound),
        WriteOutcome::BookNotFound => Err(ReservationApplicationError::BookNotFound),
        WriteOutcome::BookUnavailable => Err(ReservationApplicationError::BookNotAvailable),
    }
}

/// 利用者の存在確認（存在しない場合はエラーを蓄積する）
async fn check_user_exists(
    user_directory: &Arc<dyn UserDirectory>,
    user_id: UserId,
    errors: &mut ValidationErrors,
) -> Result<()> {
    let exists = user_directory
        .exists(user_id)
        .await
        .map_err(ReservationApplicationError::UserDirectoryError)?;

    if !exists {
        errors.add("user_id", validation::unknown_reference_message("user_id"));
    }
    Ok(())
}

/// 予約一覧を取得する（関連書籍付き、ページングなし）
pub async fn list_reservations(deps: &ServiceDependencies) -> Result<Vec<ReservationWithBook>> {
    deps.reservation_store
        .list_with_books()
        .await
        .map_err(persistence(Operation::ListReservations))
}

/// 予約をIDで取得する
pub async fn get_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    deps.reservation_store
        .find_by_id(reservation_id)
        .await
        .map_err(persistence(Operation::GetReservation))?
        .ok_or(ReservationApplicationError::ReservationNotFound)
}

/// 予約を作成する
///
/// 検証ルール（すべてのエラーをまとめて返す）：
/// - user_id, book_id, start_date, end_date は必須
/// - 日付は有効な形式であること
/// - user_id, book_id が存在すること
///
/// `status = true` の場合は `reserve_book` と同じく書籍を確保する。
/// 書籍が既に確保されていれば `BookNotAvailable`。
pub async fn create_reservation(
    deps: &ServiceDependencies,
    cmd: CreateReservation,
) -> Result<Reservation> {
    let mut errors = ValidationErrors::new();

    let user_id = validation::require(&mut errors, "user_id", cmd.user_id);
    let book_id = validation::require(&mut errors, "book_id", cmd.book_id);
    let period = domain::reservation::parse_period(
        &mut errors,
        cmd.start_date.as_deref(),
        cmd.end_date.as_deref(),
    );

    if let Some(user_id) = user_id {
        check_user_exists(&deps.user_directory, user_id, &mut errors).await?;
    }

    if let Some(book_id) = book_id {
        let book = deps
            .book_repository
            .find_by_id(book_id)
            .await
            .map_err(persistence(Operation::CreateReservation))?;

        if book.is_none() {
            errors.add("book_id", validation::unknown_reference_message("book_id"));
        }
    }

    let (user_id, book_id, period) = match (user_id, book_id, period) {
        (Some(user_id), Some(book_id), Some(period)) if errors.is_empty() => {
            (user_id, book_id, period)
        }
        _ => return Err(ReservationApplicationError::Validation(errors)),
    };

    let transition = domain::reservation::open_reservation(
        user_id,
        book_id,
        period,
        cmd.status.unwrap_or(false),
        cmd.requested_at,
    );

    let outcome = deps
        .reservation_store
        .insert(transition)
        .await
        .map_err(persistence(Operation::CreateReservation))?;
    let reservation = into_saved(outcome)?;

    tracing::info!(
        reservation_id = %reservation.id,
        book_id = %reservation.book_id,
        status = reservation.status,
        "Reservation created"
    );

    Ok(reservation)
}

/// 予約を更新する
///
/// 変更可能なフィールドは start_date, end_date, status のみ。
/// ステータスの変更は書籍の貸出可能フラグに反映される。
/// 反映内容はストアが書き込み時点の予約から計算するため、
/// 同じ予約への並行した更新があってもフラグは予約と一致する。
pub async fn update_reservation(
    deps: &ServiceDependencies,
    cmd: UpdateReservation,
) -> Result<Reservation> {
    // 存在しない予約は入力の内容に関わらず404
    deps.reservation_store
        .find_by_id(cmd.reservation_id)
        .await
        .map_err(persistence(Operation::UpdateReservation))?
        .ok_or(ReservationApplicationError::ReservationNotFound)?;

    let changes = domain::reservation::parse_changes(
        cmd.start_date.as_deref(),
        cmd.end_date.as_deref(),
        cmd.status,
    )
    .map_err(ReservationApplicationError::Validation)?;

    let outcome = deps
        .reservation_store
        .update(cmd.reservation_id, changes, cmd.updated_at)
        .await
        .map_err(persistence(Operation::UpdateReservation))?;
    let reservation = into_saved(outcome)?;

    tracing::info!(
        reservation_id = %reservation.id,
        status = reservation.status,
        "Reservation updated"
    );

    Ok(reservation)
}

/// 予約を削除する
///
/// 有効な予約だった場合は書籍も解放される。
pub async fn delete_reservation(
    deps: &ServiceDependencies,
    reservation_id: ReservationId,
) -> Result<Reservation> {
    let removed = deps
        .reservation_store
        .remove(reservation_id)
        .await
        .map_err(persistence(Operation::DeleteReservation))?
        .ok_or(ReservationApplicationError::ReservationNotFound)?;

    tracing::info!(reservation_id = %removed.id, "Reservation deleted");

    Ok(removed)
}

/// 書籍を予約する
///
/// チェック順序：
/// 1. 書籍が存在すること（404）
/// 2. 書籍が貸出可能であること（400）
/// 3. 入力の検証（400）
///
/// 書籍の確保・予約の作成・確定ログの追記は1トランザクションで行われる。
/// 並行して同じ書籍を予約した場合、条件付き更新により1件だけが成功する。
pub async fn reserve_book(deps: &ServiceDependencies, cmd: ReserveBook) -> Result<Reservation> {
    let book = deps
        .book_repository
        .find_by_id(cmd.book_id)
        .await
        .map_err(persistence(Operation::ReserveBook))?
        .ok_or(ReservationApplicationError::BookNotFound)?;

    if !book.available {
        return Err(ReservationApplicationError::BookNotAvailable);
    }

    let mut errors = ValidationErrors::new();
    let user_id = validation::require(&mut errors, "user_id", cmd.user_id);
    let period = domain::reservation::parse_period(
        &mut errors,
        cmd.start_date.as_deref(),
        cmd.end_date.as_deref(),
    );

    if let Some(user_id) = user_id {
        check_user_exists(&deps.user_directory, user_id, &mut errors).await?;
    }

    let (user_id, period): (UserId, ReservationPeriod) = match (user_id, period) {
        (Some(user_id), Some(period)) if errors.is_empty() => (user_id, period),
        _ => return Err(ReservationApplicationError::Validation(errors)),
    };

    let transition =
        domain::reservation::open_reservation(user_id, book.id, period, true, cmd.requested_at);

    let outcome = deps
        .reservation_store
        .insert(transition)
        .await
        .map_err(persistence(Operation::ReserveBook))?;
    let reservation = into_saved(outcome)?;

    tracing::info!(
        reservation_id = %reservation.id,
        book_id = %reservation.book_id,
        "Book reserved"
    );

    Ok(reservation)
}

/// 予約をキャンセルする
///
/// - 予約が存在すること（404）
/// - 予約の書籍が存在すること（404）
///
/// 予約の削除と書籍の解放は1トランザクションで行われる。
/// 確定ログ（reserve_books）は残る。
pub async fn cancel_reservation(
    deps: &ServiceDependencies,
    cmd: CancelReservation,
) -> Result<Reservation> {
    let reservation = deps
        .reservation_store
        .find_by_id(cmd.reservation_id)
        .await
        .map_err(persistence(Operation::CancelReservation))?
        .ok_or(ReservationApplicationError::ReservationNotFound)?;

    deps.book_repository
        .find_by_id(reservation.book_id)
        .await
        .map_err(persistence(Operation::CancelReservation))?
        .ok_or(ReservationApplicationError::BookNotFound)?;

    let removed = deps
        .reservation_store
        .remove(reservation.id)
        .await
        .map_err(persistence(Operation::CancelReservation))?
        .ok_or(ReservationApplicationError::ReservationNotFound)?;

    tracing::info!(
        reservation_id = %removed.id,
        book_id = %removed.book_id,
        "Reservation canceled"
    );

    Ok(removed)
}
