use crate::domain::{
    AvailabilityChange, Book, BookId, Reservation, ReservationChanges, ReservationId,
    ReservationTransition, ReserveBookRecord,
    reservation::{apply_changes, removal_effect},
};
use crate::ports::book_repository::BookRepository;
use crate::ports::reservation_store::{
    ReservationStore, ReservationWithBook, Result, WriteOutcome,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

#[derive(Default)]
struct State {
    books: HashMap<BookId, Book>,
    reservations: HashMap<ReservationId, Reservation>,
    records: Vec<ReserveBookRecord>,
    fail_next_write: bool,
}

impl State {
    /// 書籍フラグの変更が適用可能か確認する（まだ変更しない）
    fn check_availability(
        &self,
        book_id: BookId,
        change: Option<AvailabilityChange>,
    ) -> Option<WriteOutcome> {
        match (change, self.books.get(&book_id)) {
            (Some(AvailabilityChange::Claim), None) => Some(WriteOutcome::BookNotFound),
            (Some(AvailabilityChange::Claim), Some(book)) if !book.available => {
                Some(WriteOutcome::BookUnavailable)
            }
            _ => None,
        }
    }

    fn apply_availability(&mut self, book_id: BookId, change: Option<AvailabilityChange>) {
        let Some(book) = self.books.get_mut(&book_id) else {
            return;
        };
        match change {
            Some(AvailabilityChange::Claim) => book.available = false,
            Some(AvailabilityChange::Release) => book.available = true,
            None => {}
        }
    }

    fn take_injected_failure(&mut self) -> Result<()> {
        if std::mem::take(&mut self.fail_next_write) {
            return Err("injected write failure".into());
        }
        Ok(())
    }
}

/// 書籍と予約をメモリ上に保持するストア
///
/// 1つのMutexで全状態を保護し、各操作をロック内で完結させることで
/// PostgreSQL実装のトランザクションと同じ原子性を提供する。
/// テストとローカル実行用。
pub struct LibraryStore {
    state: Mutex<State>,
}

impl LibraryStore {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(State::default()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| "in-memory library store lock poisoned".into())
    }

    /// 書籍を登録する
    pub fn add_book(&self, book: Book) {
        if let Ok(mut state) = self.lock() {
            state.books.insert(book.id, book);
        }
    }

    /// 書籍の現在の状態
    pub fn book(&self, book_id: BookId) -> Option<Book> {
        self.lock().ok()?.books.get(&book_id).cloned()
    }

    /// 確定ログ全体（記録順）
    pub fn all_records(&self) -> Vec<ReserveBookRecord> {
        self.lock()
            .map(|state| state.records.clone())
            .unwrap_or_default()
    }

    /// 予約に紐づく確定ログ（記録順）
    pub fn reserve_records(&self, reservation_id: ReservationId) -> Vec<ReserveBookRecord> {
        self.all_records()
            .into_iter()
            .filter(|record| record.request_id == reservation_id)
            .collect()
    }

    /// 次の書き込みを失敗させる（何も適用されない）
    pub fn fail_next_write(&self) {
        if let Ok(mut state) = self.lock() {
            state.fail_next_write = true;
        }
    }
}

impl Default for LibraryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BookRepository for LibraryStore {
    async fn find_by_id(&self, book_id: BookId) -> Result<Option<Book>> {
        Ok(self.lock()?.books.get(&book_id).cloned())
    }
}

#[async_trait]
impl ReservationStore for LibraryStore {
    async fn list_with_books(&self) -> Result<Vec<ReservationWithBook>> {
        let state = self.lock()?;

        let mut reservations: Vec<ReservationWithBook> = state
            .reservations
            .values()
            .map(|reservation| ReservationWithBook {
                reservation: reservation.clone(),
                book: state.books.get(&reservation.book_id).cloned(),
            })
            .collect();
        reservations.sort_by_key(|item| item.reservation.created_at);

        Ok(reservations)
    }

    async fn find_by_id(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        Ok(self.lock()?.reservations.get(&reservation_id).cloned())
    }

    async fn insert(&self, transition: ReservationTransition) -> Result<WriteOutcome> {
        let mut state = self.lock()?;
        let reservation = transition.reservation;

        if !state.books.contains_key(&reservation.book_id) {
            return Ok(WriteOutcome::BookNotFound);
        }
        if let Some(outcome) = state.check_availability(reservation.book_id, transition.availability)
        {
            return Ok(outcome);
        }
        state.take_injected_failure()?;

        state.apply_availability(reservation.book_id, transition.availability);
        state
            .reservations
            .insert(reservation.id, reservation.clone());
        state.records.extend(transition.record);

        Ok(WriteOutcome::Saved(reservation))
    }

    async fn update(
        &self,
        reservation_id: ReservationId,
        changes: ReservationChanges,
        updated_at: DateTime<Utc>,
    ) -> Result<WriteOutcome> {
        let mut state = self.lock()?;

        let Some(current) = state.reservations.get(&reservation_id).cloned() else {
            return Ok(WriteOutcome::ReservationNotFound);
        };
        let transition = apply_changes(&current, changes, updated_at);
        let reservation = transition.reservation;

        if let Some(outcome) = state.check_availability(reservation.book_id, transition.availability)
        {
            return Ok(outcome);
        }
        state.take_injected_failure()?;

        state.apply_availability(reservation.book_id, transition.availability);
        state
            .reservations
            .insert(reservation.id, reservation.clone());
        state.records.extend(transition.record);

        Ok(WriteOutcome::Saved(reservation))
    }

    async fn remove(&self, reservation_id: ReservationId) -> Result<Option<Reservation>> {
        let mut state = self.lock()?;

        if !state.reservations.contains_key(&reservation_id) {
            return Ok(None);
        }
        state.take_injected_failure()?;

        let removed = state.reservations.remove(&reservation_id);
        if let Some(reservation) = &removed {
            state.apply_availability(reservation.book_id, removal_effect(reservation));
        }

        Ok(removed)
    }
}
