use crate::domain::{
    AvailabilityChange, Book, BookId, Reservation, ReservationChanges, ReservationId,
    ReservationTransition, ReserveBookRecord, UserId,
    reservation::{apply_changes, removal_effect},
};
use crate::ports::reservation_store::{
    ReservationStore as ReservationStoreTrait, ReservationWithBook, Result, WriteOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool, Row, postgres::PgRow};
use uuid::Uuid;

/// PostgreSQLの行データをReservationに変換する
fn map_row_to_reservation(row: &PgRow) -> Result<Reservation> {
    Ok(Reservation {
        id: ReservationId::from_uuid(row.try_get("id")?),
        user_id: UserId::from_uuid(row.try_get("user_id")?),
        book_id: BookId::from_uuid(row.try_get("book_id")?),
        start_date: row.try_get("start_date")?,
        end_date: row.try_get("end_date")?,
        status: row.try_get("status")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// LEFT JOINした書籍列を変換する（書籍が存在しない場合は`None`）
fn map_row_to_joined_book(row: &PgRow) -> Result<Option<Book>> {
    let book_ref: Option<Uuid> = row.try_get("book_ref")?;
    let Some(book_ref) = book_ref else {
        return Ok(None);
    };

    Ok(Some(Book {
        id: BookId::from_uuid(book_ref),
        title: row.try_get::<Option<String>, _>("book_title")?.unwrap_or_default(),
        available: row
            .try_get::<Option<bool>, _>("book_available")?
            .unwrap_or_default(),
    }))
}

/// 書籍行をロックし、貸出可能フラグの変更を適用する
///
/// `SELECT ... FOR UPDATE` により同じ書籍への並行した確保は直列化される。
/// 先に確保したトランザクションがコミットすると、後続は`available = false`を
/// 読み取り`BookUnavailable`となる。
///
/// 適用できない場合は書き込みを中断すべき結果を返す。
async fn apply_availability(
    conn: &mut PgConnection,
    book_id: BookId,
    change: Option<AvailabilityChange>,
) -> Result<Option<WriteOutcome>> {
    let available: Option<bool> =
        sqlx::query_scalar("SELECT available FROM books WHERE id = $1 FOR UPDATE")
            .bind(book_id.value())
            .fetch_optional(&mut *conn)
            .await?;

    let Some(available) = available else {
        return Ok(Some(WriteOutcome::BookNotFound));
    };

    let next = match change {
        Some(AvailabilityChange::Claim) if !available => {
            return Ok(Some(WriteOutcome::BookUnavailable));
        }
        Some(AvailabilityChange::Claim) => false,
        Some(AvailabilityChange::Release) => true,
        None => return Ok(None),
    };

    sqlx::query("UPDATE books SET available = $2 WHERE id = $1")
        .bind(book_id.value())
        .bind(next)
        .execute(&mut *conn)
        .await?;

    Ok(None)
}

/// 予約の書籍IDを取得し、その書籍行をロックする
///
/// 予約の書籍IDは変更されないため、ロック前に読み取ってよい。
async fn lock_book_of(
    conn: &mut PgConnection,
    reservation_id: ReservationId,
) -> Result<Option<Uuid>> {
    let book_id: Option<Uuid> =
        sqlx::query_scalar("SELECT book_id FROM reservations WHERE id = $1")
            .bind(reservation_id.value())
            .fetch_optional(&mut *conn)
            .await?;
    let Some(book_id) = book_id else {
        return Ok(None);
    };

    sqlx::query("SELECT id FROM books WHERE id = $1 FOR UPDATE")
        .bind(book_id)
        .fetch_optional(&mut *conn)
        .await?;

    Ok(Some(book_id))
}

async fn append_record(conn: &mut PgConnection, record: &ReserveBookRecord) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO reserve_books (request_id, book_id, recorded_at)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(record.request_id.value())
    .bind(record.book_id.value())
    .bind(record.recorded_at)
    .execute(&mut *conn)
    .await?;

    Ok(())
}

/// ReservationStoreのPostgreSQL実装
///
/// 書き込みはすべて1トランザクション内で行う。
/// 途中で`Err`または`Saved`以外の結果を返した場合、
/// トランザクションはコミットされずにドロップされ、ロールバックされる。
///
/// ロック順序は常に books → reservations。
pub struct ReservationStore {
    pool: PgPool,
}

impl ReservationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ReservationStoreTrait for ReservationStore {
    async fn list_with_books(&self) -> Result<Vec<ReservationWithBook>> {
        let rows = sqlx::query(
            r#"
            SELECT
                r.id,
                r.user_id,
                r.book_id,
                r.start_date,
                r.end_date,
                r.status,
                r.created_at,
                r.updated_at,
                b.id AS book_ref,
                b.title AS book_title,
                b.available AS book_available
            FROM reservations r
            LEFT JOIN books b ON b.id = r.book_id
            ORDER BY r.created_at ASC, r.id ASC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| -> Result<ReservationWithBook> {
                Ok(ReservationWithBook {
                    reservation: map_row_to_reservation(row)?,
                    book: map_row_to_joined_book(row)?,
                })
            })
            .collect()
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let row = sqlx::query(
            r#"
            SELECT id, user_id, book_id, start_date, end_date, status, created_at, updated_at
            FROM reservations
            WHERE id = $1
            "#,
        )
        .bind(reservation_id.value())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(map_row_to_reservation).transpose()
    }

    async fn insert(&self, transition: ReservationTransition) -> Result<WriteOutcome> {
        let reservation = transition.reservation;
        let mut tx = self.pool.begin().await?;

        if let Some(outcome) =
            apply_availability(&mut tx, reservation.book_id, transition.availability).await?
        {
            return Ok(outcome);
        }

        sqlx::query(
            r#"
            INSERT INTO reservations (
                id,
                user_id,
                book_id,
                start_date,
                end_date,
                status,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(reservation.id.value())
        .bind(reservation.user_id.value())
        .bind(reservation.book_id.value())
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(reservation.status)
        .bind(reservation.created_at)
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(record) = &transition.record {
            append_record(&mut tx, record).await?;
        }

        tx.commit().await?;
        Ok(WriteOutcome::Saved(reservation))
    }

    async fn update(
        &self,
        reservation_id: ReservationId,
        changes: ReservationChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let mut tx = self.pool.begin().await?;

        if lock_book_of(&mut tx, reservation_id).await?.is_none() {
            return Ok(WriteOutcome::ReservationNotFound);
        }

        // 現在の状態はロックした行から読む（並行した更新の結果を反映する）
        let row = sqlx::query(
            r#"
            SELECT id, user_id, book_id, start_date, end_date, status, created_at, updated_at
            FROM reservations
            WHERE id = $1
            FOR UPDATE
            "#,
        )
        .bind(reservation_id.value())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(WriteOutcome::ReservationNotFound);
        };
        let current = map_row_to_reservation(&row)?;

        let transition = apply_changes(&current, changes, updated_at);
        let reservation = transition.reservation;

        if let Some(outcome) =
            apply_availability(&mut tx, reservation.book_id, transition.availability).await?
        {
            return Ok(outcome);
        }

        sqlx::query(
            r#"
            UPDATE reservations
            SET start_date = $2,
                end_date = $3,
                status = $4,
                updated_at = $5
            WHERE id = $1
            "#,
        )
        .bind(reservation.id.value())
        .bind(reservation.start_date)
        .bind(reservation.end_date)
        .bind(reservation.status)
        .bind(reservation.updated_at)
        .execute(&mut *tx)
        .await?;

        if let Some(record) = &transition.record {
            append_record(&mut tx, record).await?;
        }

        tx.commit().await?;
        Ok(WriteOutcome::Saved(reservation))
    }

    async fn remove(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let mut tx = self.pool.begin().await?;

        // ロック順序を守るため、削除前に書籍行をロックする
        if lock_book_of(&mut tx, reservation_id).await?.is_none() {
            return Ok(None);
        }

        let row = sqlx::query(
            r#"
            DELETE FROM reservations
            WHERE id = $1
            RETURNING id, user_id, book_id, start_date, end_date, status, created_at, updated_at
            "#,
        )
        .bind(reservation_id.value())
        .fetch_optional(&mut *tx)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let removed = map_row_to_reservation(&row)?;

        if let Some(change) = removal_effect(&removed) {
            // 書籍の存在は外部キーで保証される
            apply_availability(&mut tx, removed.book_id, Some(change)).await?;
        }

        tx.commit().await?;
        Ok(Some(removed))
    }
}
