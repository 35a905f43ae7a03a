use serde::{Deserialize, Serialize};

use super::BookId;

/// 書籍
///
/// 書籍の詳細はカタログ側が所有する。予約コンテキストが読み書きするのは
/// `available`（貸出可能フラグ）のみ。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    pub id: BookId,
    pub title: String,
    /// 有効な予約がない場合のみtrue
    pub available: bool,
}

impl Book {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            id: BookId::new(),
            title: title.into(),
            available: true,
        }
    }
}
