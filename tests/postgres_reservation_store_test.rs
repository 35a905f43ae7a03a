//! PostgreSQLアダプターのテスト
//!
//! 実行には PostgreSQL が必要:
//! `DATABASE_URL=postgres://... cargo test -- --ignored`

use chrono::{NaiveDate, Utc};
use library_reservations::adapters::postgres::{
    PostgresBookRepository, PostgresReservationStore, PostgresUserDirectory,
};
use library_reservations::application::reservation::{
    ReservationApplicationError, ServiceDependencies, cancel_reservation, reserve_book,
    update_reservation,
};
use library_reservations::domain::commands::*;
use library_reservations::domain::reservation::{ReservationPeriod, open_reservation};
use library_reservations::domain::value_objects::*;
use library_reservations::ports::*;
use serial_test::serial;
use sqlx::PgPool;
use std::sync::Arc;

mod common;

/// データベースのクリーンアップ
///
/// テストの独立性を保つため、各テスト前にすべてのデータを削除します。
async fn cleanup_database(pool: &PgPool) {
    sqlx::query("TRUNCATE TABLE reserve_books, reservations, books, users CASCADE")
        .execute(pool)
        .await
        .expect("Failed to truncate tables");
}

async fn insert_user(pool: &PgPool) -> UserId {
    let user_id = UserId::new();
    sqlx::query("INSERT INTO users (id, name) VALUES ($1, 'test user')")
        .bind(user_id.value())
        .execute(pool)
        .await
        .expect("Failed to insert user");
    user_id
}

async fn insert_book(pool: &PgPool, available: bool) -> BookId {
    let book_id = BookId::new();
    sqlx::query("INSERT INTO books (id, title, available) VALUES ($1, 'Solaris', $2)")
        .bind(book_id.value())
        .bind(available)
        .execute(pool)
        .await
        .expect("Failed to insert book");
    book_id
}

async fn is_available(pool: &PgPool, book_id: BookId) -> bool {
    sqlx::query_scalar("SELECT available FROM books WHERE id = $1")
        .bind(book_id.value())
        .fetch_one(pool)
        .await
        .expect("Failed to read book")
}

async fn record_count(pool: &PgPool, reservation_id: ReservationId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reserve_books WHERE request_id = $1")
        .bind(reservation_id.value())
        .fetch_one(pool)
        .await
        .expect("Failed to count records")
}

async fn active_count(pool: &PgPool, book_id: BookId) -> i64 {
    sqlx::query_scalar("SELECT COUNT(*) FROM reservations WHERE book_id = $1 AND status")
        .bind(book_id.value())
        .fetch_one(pool)
        .await
        .expect("Failed to count reservations")
}

async fn setup(pool: &PgPool) -> ServiceDependencies {
    cleanup_database(pool).await;

    ServiceDependencies {
        reservation_store: Arc::new(PostgresReservationStore::new(pool.clone())),
        book_repository: Arc::new(PostgresBookRepository::new(pool.clone())),
        user_directory: Arc::new(PostgresUserDirectory::new(pool.clone())),
    }
}

fn reserve_cmd(book_id: BookId, user_id: UserId) -> ReserveBook {
    ReserveBook {
        book_id,
        user_id: Some(user_id),
        start_date: Some("2025-09-01".to_string()),
        end_date: Some("2025-09-08".to_string()),
        requested_at: Utc::now(),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_insert_and_find_reservation() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let user_id = insert_user(&pool).await;
    let book_id = insert_book(&pool, true).await;

    let period = ReservationPeriod {
        start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 9, 8).unwrap(),
    };
    let transition = open_reservation(user_id, book_id, period, false, Utc::now());
    let id = transition.reservation.id;

    let outcome = deps.reservation_store.insert(transition).await.unwrap();
    assert!(matches!(outcome, WriteOutcome::Saved(_)));

    let found = deps.reservation_store.find_by_id(id).await.unwrap().unwrap();
    assert_eq!(found.user_id, user_id);
    assert_eq!(found.start_date, period.start_date);
    assert!(!found.status);
    assert!(is_available(&pool, book_id).await);

    let listed = deps.reservation_store.list_with_books().await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].book.as_ref().map(|b| b.id), Some(book_id));
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_reserve_and_cancel_roundtrip() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let user_id = insert_user(&pool).await;
    let book_id = insert_book(&pool, true).await;

    let reservation = reserve_book(&deps, reserve_cmd(book_id, user_id))
        .await
        .unwrap();

    assert!(!is_available(&pool, book_id).await);
    assert_eq!(record_count(&pool, reservation.id).await, 1);

    cancel_reservation(
        &deps,
        CancelReservation {
            reservation_id: reservation.id,
        },
    )
    .await
    .unwrap();

    assert!(is_available(&pool, book_id).await);
    assert!(
        deps.reservation_store
            .find_by_id(reservation.id)
            .await
            .unwrap()
            .is_none()
    );

    // 確定ログは残る
    assert_eq!(record_count(&pool, reservation.id).await, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_claim_on_unavailable_book_is_rolled_back() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let user_id = insert_user(&pool).await;
    let book_id = insert_book(&pool, false).await;

    let period = ReservationPeriod {
        start_date: NaiveDate::from_ymd_opt(2025, 9, 1).unwrap(),
        end_date: NaiveDate::from_ymd_opt(2025, 9, 8).unwrap(),
    };
    let transition = open_reservation(user_id, book_id, period, true, Utc::now());
    let id = transition.reservation.id;

    let outcome = deps.reservation_store.insert(transition).await.unwrap();

    assert_eq!(outcome, WriteOutcome::BookUnavailable);
    assert!(deps.reservation_store.find_by_id(id).await.unwrap().is_none());
    assert_eq!(record_count(&pool, id).await, 0);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_reserve_only_one_succeeds() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let book_id = insert_book(&pool, true).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let user_id = insert_user(&pool).await;
        let deps = deps.clone();
        handles.push(tokio::spawn(async move {
            reserve_book(&deps, reserve_cmd(book_id, user_id)).await
        }));
    }

    let results = futures::future::join_all(handles).await;

    let succeeded = results
        .iter()
        .filter(|result| matches!(result, Ok(Ok(_))))
        .count();
    let rejected = results
        .iter()
        .filter(|result| {
            matches!(
                result,
                Ok(Err(ReservationApplicationError::BookNotAvailable))
            )
        })
        .count();

    assert_eq!(succeeded, 1);
    assert_eq!(rejected, 4);
    assert!(!is_available(&pool, book_id).await);

    assert_eq!(active_count(&pool, book_id).await, 1);
}

fn deactivate_cmd(reservation_id: ReservationId) -> UpdateReservation {
    UpdateReservation {
        reservation_id,
        start_date: None,
        end_date: None,
        status: Some(false),
        updated_at: Utc::now(),
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_repeated_deactivation_racing_reserve_keeps_book_claimed() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let book_id = insert_book(&pool, true).await;

    let first = reserve_book(&deps, reserve_cmd(book_id, insert_user(&pool).await))
        .await
        .unwrap();
    update_reservation(&deps, deactivate_cmd(first.id))
        .await
        .unwrap();
    assert!(is_available(&pool, book_id).await);

    // 無効化の再送と別の利用者の予約が並行する
    let second_user = insert_user(&pool).await;
    let repeat = {
        let deps = deps.clone();
        tokio::spawn(async move { update_reservation(&deps, deactivate_cmd(first.id)).await })
    };
    let reserve = {
        let deps = deps.clone();
        tokio::spawn(async move { reserve_book(&deps, reserve_cmd(book_id, second_user)).await })
    };

    let repeated = repeat.await.unwrap().unwrap();
    let second = reserve.await.unwrap().unwrap();

    assert!(!repeated.status);
    assert!(second.status);
    assert!(!is_available(&pool, book_id).await);
    assert_eq!(active_count(&pool, book_id).await, 1);
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_concurrent_deactivations_and_reserve_keep_availability_consistent() {
    let pool = common::create_test_pool().await;

    for _ in 0..10 {
        let deps = setup(&pool).await;
        let book_id = insert_book(&pool, true).await;
        let first = reserve_book(&deps, reserve_cmd(book_id, insert_user(&pool).await))
            .await
            .unwrap();
        let second_user = insert_user(&pool).await;

        let mut updates = Vec::new();
        for _ in 0..2 {
            let deps = deps.clone();
            updates.push(tokio::spawn(async move {
                update_reservation(&deps, deactivate_cmd(first.id)).await
            }));
        }
        let reserve = {
            let deps = deps.clone();
            tokio::spawn(async move { reserve_book(&deps, reserve_cmd(book_id, second_user)).await })
        };

        for result in futures::future::join_all(updates).await {
            result.unwrap().unwrap();
        }
        match reserve.await.unwrap() {
            Ok(_) | Err(ReservationApplicationError::BookNotAvailable) => {}
            Err(e) => panic!("unexpected error: {:?}", e),
        }

        let active = active_count(&pool, book_id).await;
        assert!(active <= 1);
        assert_eq!(is_available(&pool, book_id).await, active == 0);
    }
}

#[tokio::test]
#[serial]
#[ignore = "requires PostgreSQL (DATABASE_URL)"]
async fn test_user_directory_exists() {
    let pool = common::create_test_pool().await;
    let deps = setup(&pool).await;
    let user_id = insert_user(&pool).await;

    assert!(deps.user_directory.exists(user_id).await.unwrap());
    assert!(!deps.user_directory.exists(UserId::new()).await.unwrap());
}
