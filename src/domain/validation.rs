use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// フィールド単位の入力エラー集合
///
/// すべてのフィールドを検証してからまとめて返すため、
/// 最初のエラーで打ち切らずに蓄積する。
/// JSONでは `{"field": ["message", ...]}` の形で表現される。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// 単一のエラーだけを持つ集合を作成する
    pub fn single(field: impl Into<String>, message: impl Into<String>) -> Self {
        let mut errors = Self::new();
        errors.add(field, message);
        errors
    }

    pub fn add(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.entry(field.into()).or_default().push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// 指定フィールドのエラーメッセージ
    pub fn field(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// エラーがなければ`Ok(value)`、あれば`Err(self)`
    pub fn into_result<T>(self, value: T) -> Result<T, Self> {
        if self.is_empty() {
            Ok(value)
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, messages) in &self.0 {
            for message in messages {
                if !first {
                    f.write_str("; ")?;
                }
                write!(f, "{}: {}", field, message)?;
                first = false;
            }
        }
        Ok(())
    }
}

pub fn required_message(field: &str) -> String {
    format!("The {} field is required.", field)
}

pub fn invalid_date_message(field: &str) -> String {
    format!("The {} is not a valid date.", field)
}

pub fn unknown_reference_message(field: &str) -> String {
    format!("The selected {} is invalid.", field)
}

/// 日付文字列をパースする
///
/// 受け付ける形式:
/// - `YYYY-MM-DD`
/// - `YYYY-MM-DD HH:MM:SS`
/// - RFC 3339 タイムスタンプ（日付部分のみ使用）
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();

    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Some(date);
    }
    if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S") {
        return Some(datetime.date());
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|datetime| datetime.date_naive())
}

/// 必須フィールドの存在確認
pub fn require<T>(errors: &mut ValidationErrors, field: &str, value: Option<T>) -> Option<T> {
    if value.is_none() {
        errors.add(field, required_message(field));
    }
    value
}

/// 必須の日付フィールドを検証してパースする
pub fn require_date(
    errors: &mut ValidationErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<NaiveDate> {
    match raw {
        None => {
            errors.add(field, required_message(field));
            None
        }
        Some(raw) => optional_date(errors, field, Some(raw)),
    }
}

/// 任意の日付フィールドを検証してパースする（未指定は`None`でエラーなし）
pub fn optional_date(
    errors: &mut ValidationErrors,
    field: &str,
    raw: Option<&str>,
) -> Option<NaiveDate> {
    let raw = raw?;
    let parsed = parse_date(raw);
    if parsed.is_none() {
        errors.add(field, invalid_date_message(field));
    }
    parsed
}
