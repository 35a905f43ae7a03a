use crate::domain::UserId;
use async_trait::async_trait;

pub type Result<T> = std::result::Result<T, Box<dyn std::error::Error + Send + Sync>>;

/// 利用者ディレクトリポート
///
/// 利用者は別モジュールが所有する。予約コンテキストが必要とするのは
/// IDが既存の利用者を指すかどうかのみ。
#[async_trait]
pub trait UserDirectory: Send + Sync {
    /// 利用者が存在するか確認する
    ///
    /// 予約を書き込む前の`user_id`の検証に使用する。
    async fn exists(&self, user_id: UserId) -> Result<bool>;
}
