use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{self, ValidationErrors};
use super::{BookId, ReservationId, UserId};

/// 予約 - 利用者と書籍を期間で結びつける
///
/// 不変条件：
/// - 書籍の`available`がfalseであるのは、その書籍に`status = true`の予約が
///   存在する場合に限る
/// - この不変条件はストアが書籍フラグと予約を同一トランザクションで
///   書き込むことで維持される
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reservation {
    pub id: ReservationId,
    pub user_id: UserId,
    pub book_id: BookId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// true = 確定（有効）
    pub status: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        self.status
    }
}

/// 予約確定ログ（reserve_books）の1行
///
/// 追記専用。予約がキャンセルされても残る。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReserveBookRecord {
    pub request_id: ReservationId,
    pub book_id: BookId,
    pub recorded_at: DateTime<Utc>,
}

/// 予約の書き込みに伴う書籍の貸出可能フラグの変更
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AvailabilityChange {
    /// `available = true`の場合のみfalseにする（条件付き更新）
    Claim,
    /// `available = true`に戻す
    Release,
}

/// 予約の書き込み計画
///
/// ドメイン関数が計算し、ストアが1トランザクションで適用する。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReservationTransition {
    pub reservation: Reservation,
    pub availability: Option<AvailabilityChange>,
    pub record: Option<ReserveBookRecord>,
}

/// 検証済みの予約期間
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReservationPeriod {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// 検証済みの変更内容（許可リスト）
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReservationChanges {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub status: Option<bool>,
}

fn confirmation_record(reservation: &Reservation, at: DateTime<Utc>) -> ReserveBookRecord {
    ReserveBookRecord {
        request_id: reservation.id,
        book_id: reservation.book_id,
        recorded_at: at,
    }
}

/// 純粋関数：予約を作成する
///
/// - `status = true`の場合は書籍を確保し、確定ログを1行追記する
/// - `status = false`の場合は予約行のみ
pub fn open_reservation(
    user_id: UserId,
    book_id: BookId,
    period: ReservationPeriod,
    status: bool,
    requested_at: DateTime<Utc>,
) -> ReservationTransition {
    let reservation = Reservation {
        id: ReservationId::new(),
        user_id,
        book_id,
        start_date: period.start_date,
        end_date: period.end_date,
        status,
        created_at: requested_at,
        updated_at: requested_at,
    };

    let (availability, record) = if status {
        (
            Some(AvailabilityChange::Claim),
            Some(confirmation_record(&reservation, requested_at)),
        )
    } else {
        (None, None)
    };

    ReservationTransition {
        reservation,
        availability,
        record,
    }
}

/// 純粋関数：変更を適用する
///
/// ステータスの遷移に応じて書籍フラグを変更する：
/// - false → true: 確保 + 確定ログ追記
/// - true → false: 解放
/// - 変化なし: 書籍への副作用なし
pub fn apply_changes(
    current: &Reservation,
    changes: ReservationChanges,
    updated_at: DateTime<Utc>,
) -> ReservationTransition {
    let mut reservation = current.clone();
    if let Some(start_date) = changes.start_date {
        reservation.start_date = start_date;
    }
    if let Some(end_date) = changes.end_date {
        reservation.end_date = end_date;
    }
    if let Some(status) = changes.status {
        reservation.status = status;
    }
    reservation.updated_at = updated_at;

    let (availability, record) = match (current.status, reservation.status) {
        (false, true) => (
            Some(AvailabilityChange::Claim),
            Some(confirmation_record(&reservation, updated_at)),
        ),
        (true, false) => (Some(AvailabilityChange::Release), None),
        _ => (None, None),
    };

    ReservationTransition {
        reservation,
        availability,
        record,
    }
}

/// 予約を削除する際の書籍フラグの変更
///
/// 有効な予約だけが書籍を確保しているため、解放もその場合に限る。
pub fn removal_effect(reservation: &Reservation) -> Option<AvailabilityChange> {
    reservation
        .is_active()
        .then_some(AvailabilityChange::Release)
}

/// 予約期間の入力を検証する
///
/// 両方の日付が必須。エラーは`errors`に蓄積される。
pub fn parse_period(
    errors: &mut ValidationErrors,
    start_date: Option<&str>,
    end_date: Option<&str>,
) -> Option<ReservationPeriod> {
    let start_date = validation::require_date(errors, "start_date", start_date);
    let end_date = validation::require_date(errors, "end_date", end_date);

    Some(ReservationPeriod {
        start_date: start_date?,
        end_date: end_date?,
    })
}

/// 更新入力を検証する（指定されたフィールドのみ）
pub fn parse_changes(
    start_date: Option<&str>,
    end_date: Option<&str>,
    status: Option<bool>,
) -> Result<ReservationChanges, ValidationErrors> {
    let mut errors = ValidationErrors::new();
    let start_date = validation::optional_date(&mut errors, "start_date", start_date);
    let end_date = validation::optional_date(&mut errors, "end_date", end_date);

    errors.into_result(ReservationChanges {
        start_date,
        end_date,
        status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn period() -> ReservationPeriod {
        ReservationPeriod {
            start_date: date(2025, 4, 1),
            end_date: date(2025, 4, 15),
        }
    }

    #[test]
    fn test_open_confirmed_reservation_claims_book() {
        let now = Utc::now();
        let transition = open_reservation(UserId::new(), BookId::new(), period(), true, now);

        assert!(transition.reservation.is_active());
        assert_eq!(transition.availability, Some(AvailabilityChange::Claim));

        let record = transition.record.unwrap();
        assert_eq!(record.request_id, transition.reservation.id);
        assert_eq!(record.book_id, transition.reservation.book_id);
        assert_eq!(record.recorded_at, now);
    }

    #[test]
    fn test_open_pending_reservation_has_no_side_effects() {
        let transition = open_reservation(UserId::new(), BookId::new(), period(), false, Utc::now());

        assert!(!transition.reservation.is_active());
        assert_eq!(transition.availability, None);
        assert_eq!(transition.record, None);
    }

    #[test]
    fn test_apply_changes_merges_only_given_fields() {
        let opened = open_reservation(UserId::new(), BookId::new(), period(), true, Utc::now());
        let later = Utc::now();

        let changes = ReservationChanges {
            end_date: Some(date(2025, 4, 30)),
            ..Default::default()
        };
        let transition = apply_changes(&opened.reservation, changes, later);

        assert_eq!(transition.reservation.start_date, date(2025, 4, 1));
        assert_eq!(transition.reservation.end_date, date(2025, 4, 30));
        assert!(transition.reservation.status);
        assert_eq!(transition.reservation.updated_at, later);
        assert_eq!(transition.reservation.created_at, opened.reservation.created_at);
        assert_eq!(transition.availability, None);
        assert_eq!(transition.record, None);
    }

    #[test]
    fn test_apply_changes_activation_claims_book() {
        let opened = open_reservation(UserId::new(), BookId::new(), period(), false, Utc::now());

        let changes = ReservationChanges {
            status: Some(true),
            ..Default::default()
        };
        let transition = apply_changes(&opened.reservation, changes, Utc::now());

        assert_eq!(transition.availability, Some(AvailabilityChange::Claim));
        assert!(transition.record.is_some());
    }

    #[test]
    fn test_apply_changes_deactivation_releases_book() {
        let opened = open_reservation(UserId::new(), BookId::new(), period(), true, Utc::now());

        let changes = ReservationChanges {
            status: Some(false),
            ..Default::default()
        };
        let transition = apply_changes(&opened.reservation, changes, Utc::now());

        assert_eq!(transition.availability, Some(AvailabilityChange::Release));
        assert_eq!(transition.record, None);
    }

    #[test]
    fn test_removal_effect() {
        let active = open_reservation(UserId::new(), BookId::new(), period(), true, Utc::now());
        let pending = open_reservation(UserId::new(), BookId::new(), period(), false, Utc::now());

        assert_eq!(
            removal_effect(&active.reservation),
            Some(AvailabilityChange::Release)
        );
        assert_eq!(removal_effect(&pending.reservation), None);
    }

    #[test]
    fn test_parse_period_requires_both_dates() {
        let mut errors = ValidationErrors::new();
        let parsed = parse_period(&mut errors, Some("2025-04-01"), None);

        assert!(parsed.is_none());
        assert!(errors.contains("end_date"));
        assert!(!errors.contains("start_date"));
    }

    #[test]
    fn test_parse_changes_rejects_malformed_date() {
        let result = parse_changes(Some("yesterday"), None, Some(true));

        let errors = result.unwrap_err();
        assert!(errors.contains("start_date"));
    }

    #[test]
    fn test_parse_changes_empty_is_ok() {
        let changes = parse_changes(None, None, None).unwrap();
        assert_eq!(changes, ReservationChanges::default());
    }
}
